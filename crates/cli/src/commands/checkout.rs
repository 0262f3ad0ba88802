//! Checkout, including the interactive KHQR payment screen.

use std::io::{self, Write};
use std::sync::Arc;

use coffee_house_core::PaymentMethod;
use coffee_house_storefront::checkout::{CheckoutSession, Field, SubmitAction};
use coffee_house_storefront::error::AppError;
use coffee_house_storefront::order::OrderSubmitter;
use coffee_house_storefront::payment::{
    PaymentControls, PaymentFlow, PaymentGateway, PaymentOutcome, PaymentRequest, PaymentSession,
    PaymentStatus,
};
use coffee_house_storefront::state::AppState;
use coffee_house_storefront::totals::format_currency;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use super::write_cart;
use crate::CliError;

/// Seconds between countdown reminders on the payment screen.
const REMINDER_EVERY_SECS: u32 = 30;

/// Checkout input collected from the command line.
pub struct Details {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub address: String,
    pub payment: PaymentMethod,
    pub notes: Option<String>,
}

/// Validate the details, pay if needed, and place the order.
pub async fn run(state: &AppState, details: Details) -> Result<(), CliError> {
    let mut cart = state.cart_store();
    let pricing = state.config().pricing;

    let mut session = CheckoutSession::new(pricing);
    session.set_field(Field::CustomerName, &details.name);
    session.set_field(Field::CustomerPhone, &details.phone);
    session.set_field(Field::CustomerEmail, &details.email);
    session.set_field(Field::DeliveryAddress, &details.address);
    session.set_payment_method(details.payment);
    if let Some(notes) = &details.notes {
        session.set_notes(notes);
    }

    let order = match session.submit(cart.cart()).map_err(AppError::from)? {
        SubmitAction::PlaceOrder(order) => order,
        SubmitAction::AwaitPayment(request) => {
            let mut out = io::stdout().lock();
            write_cart(&mut out, cart.cart(), &cart.totals(&pricing), pricing.tax_rate)?;
            writeln!(out)?;
            drop(out);

            match pay(state, request).await? {
                PaymentOutcome::Paid(confirmation) => session
                    .complete_payment(cart.cart(), confirmation)
                    .map_err(AppError::from)?,
                PaymentOutcome::Cancelled => {
                    writeln!(io::stdout(), "Payment cancelled. Your cart was not changed.")?;
                    return Ok(());
                }
            }
        }
    };

    let receipt = OrderSubmitter::new(state.api())
        .submit(&mut cart, order)
        .await
        .map_err(AppError::from)?;

    let mut out = io::stdout().lock();
    writeln!(out, "Order placed successfully!")?;
    writeln!(out, "Order #{} ({})", receipt.id, session.order_number())?;
    writeln!(out, "Payment: {}", details.payment.label())?;
    if let Some(total) = receipt.total_amount {
        writeln!(out, "Total charged: {}", format_currency(total))?;
    }
    Ok(())
}

/// Run the KHQR payment screen until paid or cancelled.
async fn pay(state: &AppState, request: PaymentRequest) -> Result<PaymentOutcome, CliError> {
    let gateway: Arc<dyn PaymentGateway> = Arc::new(state.api().clone());
    let amount = request.amount;
    let (flow, controls) = PaymentFlow::new(gateway, request, state.config().payment);
    let mut snapshots = flow.subscribe();
    let run = tokio::spawn(flow.run());
    info!(amount = %amount, "KHQR payment started");

    let mut screen = Screen::new(format_currency(amount));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let session = snapshots.borrow_and_update().clone();
                screen.render(&mut io::stdout().lock(), &session)?;
            }
            line = lines.next_line(), if stdin_open => {
                match line? {
                    Some(input) => handle_input(&controls, input.trim())?,
                    None => {
                        stdin_open = false;
                        controls.cancel();
                    }
                }
            }
        }
    }

    run.await
        .map_err(|e| CliError::from(AppError::Internal(format!("payment task failed: {e}"))))
}

fn handle_input(controls: &PaymentControls, input: &str) -> io::Result<()> {
    match input {
        "" => {
            controls.confirm();
        }
        "r" | "R" => {
            controls.refresh();
        }
        "q" | "Q" => {
            controls.cancel();
        }
        _ => writeln!(
            io::stdout(),
            "Press Enter once you have paid, 'r' to refresh the code, or 'q' to cancel."
        )?,
    }
    Ok(())
}

/// Terminal projection of a payment session.
struct Screen {
    amount: String,
    last_status: Option<PaymentStatus>,
}

impl Screen {
    const fn new(amount: String) -> Self {
        Self {
            amount,
            last_status: None,
        }
    }

    fn render(&mut self, out: &mut impl Write, session: &PaymentSession) -> io::Result<()> {
        let status = session.status();
        if self.last_status.as_ref() == Some(status) {
            let remaining = session.remaining_secs();
            if session.is_counting() && remaining % REMINDER_EVERY_SECS == 0 {
                writeln!(out, "Time remaining: {}", session.countdown_label())?;
            }
            return Ok(());
        }
        self.last_status = Some(status.clone());

        match status {
            PaymentStatus::Initializing => writeln!(out, "Preparing KHQR payment...")?,
            PaymentStatus::AwaitingPayment => {
                writeln!(out, "Scan to pay {} with your banking app", self.amount)?;
                if let Some(merchant) = session.merchant() {
                    writeln!(
                        out,
                        "Merchant: {} ({}, {})",
                        merchant.merchant_name, merchant.merchant_city, merchant.country_code
                    )?;
                }
                if let Some(qr) = session.qr() {
                    writeln!(out, "KHQR: {}", qr.qr)?;
                }
                writeln!(out, "Time remaining: {}", session.countdown_label())?;
                writeln!(
                    out,
                    "Press Enter once you have paid, 'r' to refresh the code, or 'q' to cancel."
                )?;
            }
            PaymentStatus::Verifying { .. } => writeln!(out, "Verifying payment...")?,
            PaymentStatus::Completed { transaction_id } => {
                writeln!(out, "Payment verified ({transaction_id})")?;
            }
            PaymentStatus::Expired | PaymentStatus::Error { .. } => {
                if let Some(message) = session.last_error() {
                    writeln!(out, "{message}")?;
                }
                writeln!(out, "Press 'r' to refresh the code or 'q' to cancel.")?;
            }
            PaymentStatus::Cancelled => {}
        }
        Ok(())
    }
}
