//! Order totals derived from a cart.
//!
//! Everything here is a pure function of the cart and a [`PricingPolicy`].
//! Values stay exact; [`format_currency`] is the only place that rounds.

use coffee_house_core::Price;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::cart::Cart;

/// Tax and delivery rules applied to a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricingPolicy {
    /// Fraction of the subtotal charged as tax (0.10 = 10%).
    pub tax_rate: Decimal,
    /// Subtotal at or above which delivery is free.
    pub free_delivery_threshold: Decimal,
    /// Flat delivery fee below the threshold.
    pub delivery_fee: Decimal,
}

impl Default for PricingPolicy {
    /// 10% tax, free delivery from $50.00, otherwise $2.99.
    fn default() -> Self {
        Self {
            tax_rate: Decimal::new(10, 2),
            free_delivery_threshold: Decimal::new(5000, 2),
            delivery_fee: Decimal::new(299, 2),
        }
    }
}

/// Derived totals for a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub delivery: Decimal,
    pub total: Decimal,
}

impl OrderTotals {
    /// Whether the cart qualified for free delivery.
    #[must_use]
    pub fn is_free_delivery(&self) -> bool {
        self.delivery.is_zero()
    }
}

/// Compute subtotal, tax, delivery, and total for `cart`.
///
/// An empty cart yields zero for every field, including delivery.
#[must_use]
pub fn compute_totals(cart: &Cart, policy: &PricingPolicy) -> OrderTotals {
    let subtotal: Decimal = cart.iter().map(crate::cart::CartLine::line_total).sum();
    let tax = subtotal * policy.tax_rate;
    let delivery = if cart.is_empty() || subtotal >= policy.free_delivery_threshold {
        Decimal::ZERO
    } else {
        policy.delivery_fee
    };

    OrderTotals {
        subtotal,
        tax,
        delivery,
        total: subtotal + tax + delivery,
    }
}

/// Total number of units in the cart (header badge count).
#[must_use]
pub fn item_count(cart: &Cart) -> u64 {
    cart.iter().map(|line| u64::from(line.quantity)).sum()
}

/// Format an amount as USD for display, e.g. `$13.99`.
#[must_use]
pub fn format_currency(amount: Decimal) -> String {
    Price::usd(amount).display()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use coffee_house_core::ProductId;

    use super::*;
    use crate::cart::CartLine;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn cart_of(lines: &[(i64, &str, u32)]) -> Cart {
        lines
            .iter()
            .map(|&(id, price, quantity)| CartLine {
                id: ProductId::new(id),
                name: format!("Item {id}"),
                price: dec(price),
                quantity,
                image_url: None,
                description: None,
            })
            .collect::<Vec<_>>()
            .into()
    }

    #[test]
    fn test_reference_scenario() {
        let cart = cart_of(&[(1, "5.00", 2)]);
        let totals = compute_totals(&cart, &PricingPolicy::default());

        assert_eq!(totals.subtotal, dec("10.00"));
        assert_eq!(totals.tax, dec("1.00"));
        assert_eq!(totals.delivery, dec("2.99"));
        assert_eq!(totals.total, dec("13.99"));
        assert_eq!(format_currency(totals.total), "$13.99");
    }

    #[test]
    fn test_empty_cart_is_all_zero() {
        let totals = compute_totals(&Cart::new(), &PricingPolicy::default());
        assert!(totals.subtotal.is_zero());
        assert!(totals.tax.is_zero());
        assert!(totals.delivery.is_zero());
        assert!(totals.total.is_zero());
    }

    #[test]
    fn test_free_delivery_boundary() {
        let policy = PricingPolicy::default();

        let at = compute_totals(&cart_of(&[(1, "50.00", 1)]), &policy);
        assert_eq!(at.delivery, Decimal::ZERO);
        assert!(at.is_free_delivery());

        let below = compute_totals(&cart_of(&[(1, "49.99", 1)]), &policy);
        assert_eq!(below.delivery, dec("2.99"));
        assert!(!below.is_free_delivery());
    }

    #[test]
    fn test_total_identity_and_purity() {
        let cart = cart_of(&[(1, "3.33", 3), (2, "0.10", 7), (3, "12.49", 1)]);
        let policy = PricingPolicy::default();

        let first = compute_totals(&cart, &policy);
        let second = compute_totals(&cart, &policy);

        assert_eq!(first, second);
        assert_eq!(first.total, first.subtotal + first.tax + first.delivery);
    }

    #[test]
    fn test_intermediate_values_are_not_rounded() {
        let cart = cart_of(&[(1, "0.05", 1)]);
        let totals = compute_totals(&cart, &PricingPolicy::default());
        assert_eq!(totals.tax, dec("0.005"));
        assert_eq!(format_currency(totals.tax), "$0.01");
    }

    #[test]
    fn test_custom_policy() {
        let policy = PricingPolicy {
            tax_rate: dec("0.2"),
            free_delivery_threshold: dec("10"),
            delivery_fee: dec("5"),
        };
        let totals = compute_totals(&cart_of(&[(1, "10.00", 1)]), &policy);
        assert_eq!(totals.tax, dec("2"));
        assert_eq!(totals.delivery, Decimal::ZERO);
        assert_eq!(totals.total, dec("12"));
    }

    #[test]
    fn test_item_count() {
        let cart = cart_of(&[(1, "1.00", 2), (2, "1.00", 3)]);
        assert_eq!(item_count(&cart), 5);
        assert_eq!(item_count(&Cart::new()), 0);
    }
}
