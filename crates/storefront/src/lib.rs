//! Coffee House storefront client library.
//!
//! Cart aggregation, order totals, checkout validation, the KHQR payment
//! session, and order submission against the Coffee House backend. Front-ends
//! (the `coffee` CLI, tests) drive everything through these modules.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod config;
pub mod error;
pub mod order;
pub mod payment;
pub mod preferences;
mod sequence;
pub mod state;
pub mod storage;
pub mod totals;
