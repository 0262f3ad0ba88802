//! Cart model and the persisted cart store.
//!
//! A cart is an ordered list of [`CartLine`]s, one per product, in the order
//! products were first added. Quantities are always at least one; setting a
//! quantity to zero removes the line instead.

mod store;

use coffee_house_core::ProductId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub use store::{CartError, CartStore};

/// A catalog product as returned by the backend, the input to
/// [`CartStore::add`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// One product entry in the cart with an aggregated quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    /// Product ID, unique within the cart.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Unit price.
    pub price: Decimal,
    /// Quantity, never zero.
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CartLine {
    /// Create a line for `product` with quantity one.
    #[must_use]
    pub fn from_product(product: &Product) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            price: product.price,
            quantity: 1,
            image_url: product.image_url.clone(),
            description: product.description.clone(),
        }
    }

    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

/// Ordered collection of cart lines.
///
/// Serializes as a plain JSON array of lines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<CartLine>", into = "Vec<CartLine>")]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// Create an empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Lines in first-added order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Iterate lines in first-added order.
    pub fn iter(&self) -> std::slice::Iter<'_, CartLine> {
        self.lines.iter()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of distinct products.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Look up the line for a product.
    #[must_use]
    pub fn get(&self, id: ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.id == id)
    }

    /// Add one unit of `product`, merging into an existing line.
    pub(crate) fn add_product(&mut self, product: &Product) {
        if let Some(line) = self.lines.iter_mut().find(|line| line.id == product.id) {
            line.quantity = line.quantity.saturating_add(1);
        } else {
            self.lines.push(CartLine::from_product(product));
        }
    }

    /// Replace a line's quantity in place. Returns `false` if the product is
    /// not in the cart or the quantity is unchanged.
    pub(crate) fn replace_quantity(&mut self, id: ProductId, quantity: u32) -> bool {
        debug_assert!(quantity > 0);
        match self.lines.iter_mut().find(|line| line.id == id) {
            Some(line) if line.quantity != quantity => {
                line.quantity = quantity;
                true
            }
            _ => false,
        }
    }

    /// Remove a product's line. Returns `false` if it was absent.
    pub(crate) fn remove(&mut self, id: ProductId) -> bool {
        let before = self.lines.len();
        self.lines.retain(|line| line.id != id);
        self.lines.len() != before
    }
}

impl From<Vec<CartLine>> for Cart {
    /// Build a cart from raw lines, restoring the invariants: zero-quantity
    /// lines are dropped and duplicate product IDs merge into the first
    /// occurrence.
    fn from(raw: Vec<CartLine>) -> Self {
        let mut lines: Vec<CartLine> = Vec::with_capacity(raw.len());
        for line in raw.into_iter().filter(|line| line.quantity > 0) {
            if let Some(existing) = lines.iter_mut().find(|l| l.id == line.id) {
                existing.quantity = existing.quantity.saturating_add(line.quantity);
            } else {
                lines.push(line);
            }
        }
        Self { lines }
    }
}

impl From<Cart> for Vec<CartLine> {
    fn from(cart: Cart) -> Self {
        cart.lines
    }
}

impl<'a> IntoIterator for &'a Cart {
    type Item = &'a CartLine;
    type IntoIter = std::slice::Iter<'a, CartLine>;

    fn into_iter(self) -> Self::IntoIter {
        self.lines.iter()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn product(id: i64, price: &str) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            price: price.parse().unwrap(),
            image_url: None,
            description: None,
        }
    }

    #[test]
    fn test_add_appends_in_first_added_order() {
        let mut cart = Cart::new();
        cart.add_product(&product(2, "3.00"));
        cart.add_product(&product(1, "4.00"));
        cart.add_product(&product(2, "3.00"));

        let ids: Vec<i64> = cart.iter().map(|l| l.id.as_i64()).collect();
        assert_eq!(ids, vec![2, 1]);
        assert_eq!(cart.get(ProductId::new(2)).unwrap().quantity, 2);
    }

    #[test]
    fn test_line_total() {
        let mut line = CartLine::from_product(&product(1, "5.00"));
        line.quantity = 3;
        assert_eq!(line.line_total(), "15.00".parse::<Decimal>().unwrap());
    }

    #[test]
    fn test_deserialize_restores_invariants() {
        let json = r#"[
            {"id": 1, "name": "Latte", "price": "4.50", "quantity": 1},
            {"id": 2, "name": "Mocha", "price": "5.00", "quantity": 0},
            {"id": 1, "name": "Latte", "price": "4.50", "quantity": 2}
        ]"#;
        let cart: Cart = serde_json::from_str(json).unwrap();
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.get(ProductId::new(1)).unwrap().quantity, 3);
    }

    #[test]
    fn test_deserialize_accepts_numeric_prices() {
        let json = r#"[{"id": 1, "name": "Latte", "price": 4.5, "quantity": 1, "image_url": "/img/latte.png"}]"#;
        let cart: Cart = serde_json::from_str(json).unwrap();
        let line = cart.get(ProductId::new(1)).unwrap();
        assert_eq!(line.price, "4.5".parse::<Decimal>().unwrap());
        assert_eq!(line.image_url.as_deref(), Some("/img/latte.png"));
    }

    #[test]
    fn test_serializes_as_array() {
        let mut cart = Cart::new();
        cart.add_product(&product(1, "4.50"));
        let json = serde_json::to_value(&cart).unwrap();
        assert!(json.is_array());
        assert_eq!(json[0]["quantity"], 1);
    }
}
