//! Coffee House Core - Shared types library.
//!
//! This crate provides common types used across all Coffee House components:
//! - `storefront` - Cart, checkout, and payment client library
//! - `cli` - Terminal front-end for browsing the cart and placing orders
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no storage access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, emails, phones,
//!   payment methods, and language codes

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
