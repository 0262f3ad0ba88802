//! Command implementations.

pub mod account;
pub mod cart;
pub mod checkout;

use std::io::{self, Write};

use coffee_house_storefront::cart::Cart;
use coffee_house_storefront::totals::{OrderTotals, format_currency, item_count};
use rust_decimal::Decimal;

/// Print the cart lines and totals.
fn write_cart(
    out: &mut impl Write,
    cart: &Cart,
    totals: &OrderTotals,
    tax_rate: Decimal,
) -> io::Result<()> {
    if cart.is_empty() {
        return writeln!(out, "Your cart is empty");
    }

    for line in cart {
        writeln!(
            out,
            "{:>4}  {:<28} {:>3} x {:>9} = {:>10}",
            line.id,
            line.name,
            line.quantity,
            format_currency(line.price),
            format_currency(line.line_total()),
        )?;
    }

    let delivery = if totals.is_free_delivery() {
        "FREE".to_string()
    } else {
        format_currency(totals.delivery)
    };
    let tax_percent = (tax_rate * Decimal::ONE_HUNDRED).normalize();

    writeln!(out)?;
    writeln!(out, "Items:       {}", item_count(cart))?;
    writeln!(out, "Subtotal:    {}", format_currency(totals.subtotal))?;
    writeln!(out, "Tax ({tax_percent}%):  {}", format_currency(totals.tax))?;
    writeln!(out, "Delivery:    {delivery}")?;
    writeln!(out, "Total:       {}", format_currency(totals.total))
}
