//! Order history, language, and session commands.

use std::io::Write;

use coffee_house_core::{Email, Language, Phone};
use coffee_house_storefront::error::{AppError, clear_sentry_user};
use coffee_house_storefront::state::AppState;
use coffee_house_storefront::totals::format_currency;
use secrecy::SecretString;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::CliError;

/// List orders placed with the given contact details.
pub async fn orders(state: &AppState, phone: &str, email: Option<&str>) -> Result<(), CliError> {
    let phone = Phone::parse(phone).map_err(|e| AppError::BadRequest(e.to_string()))?;
    let email = email
        .filter(|e| !e.trim().is_empty())
        .map(Email::parse)
        .transpose()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let orders = state
        .api()
        .customer_orders(&phone, email.as_ref())
        .await
        .map_err(AppError::from)?;

    let mut out = std::io::stdout().lock();
    if orders.is_empty() {
        writeln!(out, "No orders found")?;
        return Ok(());
    }

    for order in &orders {
        let number = order
            .order_number
            .as_deref()
            .map(|n| format!(" ({n})"))
            .unwrap_or_default();
        let date = order
            .created_at
            .map(|at| at.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        let total = order
            .total_amount
            .map(format_currency)
            .unwrap_or_default();
        writeln!(
            out,
            "Order #{}{number}  {date}  {}  {total}",
            order.id,
            order.status_label()
        )?;
        for item in &order.items {
            let name = item
                .product_name
                .clone()
                .or_else(|| item.product_id.map(|id| format!("product {id}")))
                .unwrap_or_default();
            writeln!(out, "    {} x {name}", item.quantity)?;
        }
    }
    Ok(())
}

/// Show or set the interface language.
pub fn language(state: &AppState, code: Option<&str>) -> Result<(), CliError> {
    let languages = state.languages();
    let mut out = std::io::stdout();

    let Some(code) = code else {
        writeln!(out, "{}", languages.language())?;
        return Ok(());
    };

    let language = Language::from_code(code)
        .ok_or_else(|| AppError::BadRequest(format!("Unsupported language: {code}")))?;
    languages.set(language).map_err(AppError::from)?;
    writeln!(out, "Language set to {language}")?;
    Ok(())
}

/// Read a session token from standard input and store it.
pub async fn login(state: &AppState) -> Result<(), CliError> {
    writeln!(std::io::stderr(), "Paste your access token and press Enter:")?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let token = lines.next_line().await?.unwrap_or_default();
    let token = token.trim();
    if token.is_empty() {
        return Err(AppError::BadRequest("No token given".to_string()).into());
    }

    state
        .tokens()
        .set(&SecretString::from(token.to_string()))
        .map_err(AppError::from)?;
    writeln!(std::io::stdout(), "Signed in")?;
    Ok(())
}

/// Forget the session token.
pub fn logout(state: &AppState) -> Result<(), CliError> {
    state.tokens().clear().map_err(AppError::from)?;
    clear_sentry_user();
    writeln!(std::io::stdout(), "Signed out")?;
    Ok(())
}
