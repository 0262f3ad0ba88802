//! Persisted cart store with change notification.

use coffee_house_core::ProductId;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, instrument, warn};

use super::{Cart, Product};
use crate::storage::{SharedStore, StorageError, keys};
use crate::totals::{OrderTotals, PricingPolicy, compute_totals};

/// Errors from cart mutations.
///
/// A failed mutation leaves both the in-memory cart and the stored copy at
/// their previous value.
#[derive(Debug, Error)]
pub enum CartError {
    /// The cart could not be written to storage.
    #[error("failed to persist cart: {0}")]
    Storage(#[from] StorageError),

    /// The cart could not be serialized.
    #[error("failed to serialize cart: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Single owner of the browsing session's cart.
///
/// Every mutation writes the full cart to the `cart` slot before returning,
/// then publishes the new cart to subscribers (e.g. a header badge).
pub struct CartStore {
    cart: Cart,
    storage: SharedStore,
    changes: watch::Sender<Cart>,
}

impl CartStore {
    /// Open the store, restoring the cart from storage.
    ///
    /// A missing or unreadable slot yields an empty cart.
    #[must_use]
    pub fn open(storage: SharedStore) -> Self {
        let cart = load(&storage);
        let (changes, _) = watch::channel(cart.clone());
        Self {
            cart,
            storage,
            changes,
        }
    }

    /// Current cart.
    #[must_use]
    pub const fn cart(&self) -> &Cart {
        &self.cart
    }

    /// Totals for the current cart, recomputed on every call.
    #[must_use]
    pub fn totals(&self, policy: &PricingPolicy) -> OrderTotals {
        compute_totals(&self.cart, policy)
    }

    /// Subscribe to cart changes. The receiver starts at the current cart.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Cart> {
        self.changes.subscribe()
    }

    /// Whether the product has a line in the cart.
    #[must_use]
    pub fn contains(&self, id: ProductId) -> bool {
        self.cart.get(id).is_some()
    }

    /// Quantity of the product in the cart, `0` if absent.
    #[must_use]
    pub fn quantity_of(&self, id: ProductId) -> u32 {
        self.cart.get(id).map_or(0, |line| line.quantity)
    }

    /// Add one unit of `product`.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart cannot be persisted.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub fn add(&mut self, product: &Product) -> Result<(), CartError> {
        let mut next = self.cart.clone();
        next.add_product(product);
        self.commit(next)
    }

    /// Set a line's quantity. Zero or less removes the line; an absent
    /// product is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart cannot be persisted.
    #[instrument(skip(self))]
    pub fn set_quantity(&mut self, id: ProductId, quantity: i64) -> Result<(), CartError> {
        if quantity <= 0 {
            return self.remove(id);
        }

        let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
        let mut next = self.cart.clone();
        if next.replace_quantity(id, quantity) {
            self.commit(next)
        } else {
            Ok(())
        }
    }

    /// Remove a product's line; no-op if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart cannot be persisted.
    #[instrument(skip(self))]
    pub fn remove(&mut self, id: ProductId) -> Result<(), CartError> {
        let mut next = self.cart.clone();
        if next.remove(id) {
            self.commit(next)
        } else {
            Ok(())
        }
    }

    /// Empty the cart and erase the stored copy.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored copy cannot be erased.
    #[instrument(skip(self))]
    pub fn clear(&mut self) -> Result<(), CartError> {
        self.storage.remove(keys::CART)?;
        self.cart = Cart::new();
        self.changes.send_replace(Cart::new());
        debug!("Cart cleared");
        Ok(())
    }

    /// Reload the cart from storage, picking up writes made by another
    /// store sharing the same slot. Subscribers are notified if it changed.
    pub fn resync(&mut self) {
        let stored = load(&self.storage);
        if stored != self.cart {
            self.cart = stored;
            self.changes.send_replace(self.cart.clone());
            debug!(lines = self.cart.len(), "Cart resynchronized from storage");
        }
    }

    fn commit(&mut self, next: Cart) -> Result<(), CartError> {
        let json = serde_json::to_string(&next)?;
        self.storage.set(keys::CART, &json)?;
        self.cart = next;
        self.changes.send_replace(self.cart.clone());
        debug!(lines = self.cart.len(), "Cart persisted");
        Ok(())
    }
}

fn load(storage: &SharedStore) -> Cart {
    let raw = match storage.get(keys::CART) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Cart::new(),
        Err(e) => {
            warn!(error = %e, "Failed to read stored cart, starting empty");
            return Cart::new();
        }
    };

    serde_json::from_str(&raw).unwrap_or_else(|e| {
        warn!(error = %e, "Stored cart is malformed, starting empty");
        Cart::new()
    })
}
