//! Catalog and cart commands.

use std::io::Write;

use coffee_house_core::ProductId;
use coffee_house_storefront::error::{AppError, add_breadcrumb};
use coffee_house_storefront::state::AppState;
use coffee_house_storefront::totals::format_currency;
use tracing::info;

use super::write_cart;
use crate::CliError;

/// List catalog products.
pub async fn products(state: &AppState) -> Result<(), CliError> {
    let products = state.api().products().await.map_err(AppError::from)?;
    let mut out = std::io::stdout().lock();

    if products.is_empty() {
        writeln!(out, "No products available")?;
        return Ok(());
    }

    for product in &products {
        writeln!(
            out,
            "{:>4}  {:<28} {:>9}",
            product.id,
            product.name,
            format_currency(product.price)
        )?;
        if let Some(url) = state.api().image_url(product.image_url.as_deref()) {
            writeln!(out, "      {url}")?;
        }
    }
    Ok(())
}

/// Show the cart with totals.
pub fn show(state: &AppState) -> Result<(), CliError> {
    let cart = state.cart_store();
    let pricing = state.config().pricing;
    let totals = cart.totals(&pricing);
    write_cart(&mut std::io::stdout().lock(), cart.cart(), &totals, pricing.tax_rate)?;
    Ok(())
}

/// Add one unit of a product, looked up in the catalog.
pub async fn add(state: &AppState, product_id: ProductId) -> Result<(), CliError> {
    let product = state
        .api()
        .product(product_id)
        .await
        .map_err(|e| match e.status() {
            Some(404) => AppError::NotFound(format!("product {product_id}")),
            _ => AppError::from(e),
        })?;

    let mut cart = state.cart_store();
    cart.add(&product).map_err(AppError::from)?;
    let id = product_id.to_string();
    add_breadcrumb("cart", "Added product", Some(&[("product_id", id.as_str())]));
    info!(product_id = %product_id, "Added to cart");

    writeln!(
        std::io::stdout(),
        "Added {} ({} in cart)",
        product.name,
        cart.quantity_of(product_id)
    )?;
    Ok(())
}

/// Set a line's quantity.
pub fn set(state: &AppState, product_id: ProductId, quantity: i64) -> Result<(), CliError> {
    let mut cart = state.cart_store();
    if !cart.contains(product_id) {
        return Err(AppError::NotFound(format!("product {product_id} in cart")).into());
    }
    cart.set_quantity(product_id, quantity)
        .map_err(AppError::from)?;

    let mut out = std::io::stdout();
    match cart.quantity_of(product_id) {
        0 => writeln!(out, "Removed product {product_id}")?,
        n => writeln!(out, "Product {product_id} quantity set to {n}")?,
    }
    Ok(())
}

/// Remove a product from the cart.
pub fn remove(state: &AppState, product_id: ProductId) -> Result<(), CliError> {
    let mut cart = state.cart_store();
    let present = cart.contains(product_id);
    cart.remove(product_id).map_err(AppError::from)?;

    if present {
        writeln!(std::io::stdout(), "Removed product {product_id}")?;
    } else {
        writeln!(std::io::stdout(), "Product {product_id} was not in the cart")?;
    }
    Ok(())
}

/// Empty the cart.
pub fn clear(state: &AppState) -> Result<(), CliError> {
    state.cart_store().clear().map_err(AppError::from)?;
    writeln!(std::io::stdout(), "Cart cleared")?;
    Ok(())
}
