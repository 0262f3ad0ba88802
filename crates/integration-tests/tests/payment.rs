//! KHQR payment sessions against the mock backend.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::Arc;
use std::time::Duration;

use coffee_house_core::{PaymentMethod, ProductId};
use coffee_house_integration_tests::{MockBackend, Responses};
use coffee_house_storefront::checkout::{CheckoutSession, Field, SubmitAction};
use coffee_house_storefront::config::StorefrontConfig;
use coffee_house_storefront::order::OrderSubmitter;
use coffee_house_storefront::payment::{
    PaymentFlow, PaymentGateway, PaymentOutcome, PaymentRequest, PaymentSession, PaymentStatus,
};
use coffee_house_storefront::state::AppState;
use coffee_house_storefront::storage::MemoryStore;
use rust_decimal::Decimal;
use tokio::sync::watch;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

fn app_with(config: StorefrontConfig) -> AppState {
    AppState::with_storage(config, MemoryStore::shared()).unwrap()
}

async fn khqr_checkout(state: &AppState) -> (CheckoutSession, PaymentRequest) {
    let product = state.api().product(ProductId::new(1)).await.unwrap();
    let mut cart = state.cart_store();
    cart.add(&product).unwrap();
    cart.add(&product).unwrap();

    let mut session = CheckoutSession::new(state.config().pricing);
    session.set_field(Field::CustomerName, "Dara Sok");
    session.set_field(Field::CustomerPhone, "0123456789");
    session.set_field(Field::DeliveryAddress, "St. 51, Phnom Penh");
    session.set_payment_method(PaymentMethod::Khqr);

    let SubmitAction::AwaitPayment(request) = session.submit(cart.cart()).unwrap() else {
        panic!("KHQR orders wait for payment");
    };
    (session, request)
}

fn gateway(state: &AppState) -> Arc<dyn PaymentGateway> {
    Arc::new(state.api().clone())
}

async fn wait_until(
    snapshots: &mut watch::Receiver<PaymentSession>,
    done: impl FnMut(&PaymentSession) -> bool,
) -> PaymentSession {
    timeout(WAIT, snapshots.wait_for(done))
        .await
        .unwrap()
        .unwrap()
        .clone()
}

#[tokio::test]
async fn test_khqr_payment_places_paid_order() {
    let backend = MockBackend::start().await.unwrap();
    let state = app_with(StorefrontConfig::new(backend.api_url()));
    let (mut checkout, request) = khqr_checkout(&state).await;
    assert_eq!(request.amount, Decimal::new(1399, 2));
    assert_eq!(&request.bill_number, checkout.order_number());

    let (flow, controls) = PaymentFlow::new(gateway(&state), request, state.config().payment);
    let mut snapshots = flow.subscribe();
    let run = tokio::spawn(flow.run());

    let shown = wait_until(&mut snapshots, |s| {
        *s.status() == PaymentStatus::AwaitingPayment
    })
    .await;
    assert_eq!(shown.remaining_secs(), 300);
    assert_eq!(shown.merchant().unwrap().merchant_name, "Coffee House");
    let qr = shown.qr().unwrap();
    assert_eq!(qr.qr, format!("KHQR|{}|13.99", checkout.order_number()));
    assert_eq!(qr.md5.as_deref(), Some("d41d8cd9"));

    assert!(controls.confirm());
    let outcome = timeout(WAIT, run).await.unwrap().unwrap();
    let PaymentOutcome::Paid(confirmation) = outcome else {
        panic!("expected a verified payment, got {outcome:?}");
    };
    let transaction_id = confirmation.transaction_id.clone();

    let mut cart = state.cart_store();
    let order = checkout.complete_payment(cart.cart(), confirmation).unwrap();
    OrderSubmitter::new(state.api())
        .submit(&mut cart, order)
        .await
        .unwrap();
    assert!(state.cart_store().cart().is_empty());

    let generated = backend.requests_to("khqr/generate");
    assert_eq!(generated.len(), 1);
    assert_eq!(generated[0].query["amount"], "13.99");
    assert_eq!(generated[0].query["bill_number"], checkout.order_number().as_str());

    let verified = backend.requests_under("khqr/verify/");
    assert_eq!(verified.len(), 1);
    assert_eq!(verified[0].path, format!("khqr/verify/{transaction_id}"));

    let sent = backend.requests_to("orders/guest");
    assert_eq!(sent.len(), 1);
    let body = sent[0].body.clone().unwrap();
    assert_eq!(body["payment_method"], "khqr");
    assert_eq!(body["payment_status"], true);
    let sent_id = body["transaction_id"].as_str().unwrap();
    assert!(sent_id.starts_with("KHQR-"));
    assert_eq!(sent_id, transaction_id.as_str());
}

#[tokio::test]
async fn test_declined_payment_can_be_retried_after_refresh() {
    let backend = MockBackend::with_responses(Responses {
        verify_success: false,
        ..Responses::default()
    })
    .await
    .unwrap();
    let state = app_with(StorefrontConfig::new(backend.api_url()));
    let (_checkout, request) = khqr_checkout(&state).await;

    let (flow, controls) = PaymentFlow::new(gateway(&state), request, state.config().payment);
    let mut snapshots = flow.subscribe();
    let run = tokio::spawn(flow.run());

    wait_until(&mut snapshots, |s| *s.status() == PaymentStatus::AwaitingPayment).await;
    controls.confirm();
    let failed = wait_until(&mut snapshots, |s| {
        matches!(s.status(), PaymentStatus::Error { .. })
    })
    .await;
    assert_eq!(
        failed.last_error(),
        Some("Payment verification failed. Please try again.")
    );
    assert!(failed.can_refresh());
    assert!(!failed.can_confirm());

    backend.update(|r| r.verify_success = true);
    controls.refresh();
    let reissued = wait_until(&mut snapshots, |s| {
        *s.status() == PaymentStatus::AwaitingPayment
    })
    .await;
    assert_eq!(reissued.remaining_secs(), reissued.window_secs());

    controls.confirm();
    let outcome = timeout(WAIT, run).await.unwrap().unwrap();
    assert!(matches!(outcome, PaymentOutcome::Paid(_)));
    assert_eq!(backend.requests_under("khqr/verify/").len(), 2);
    assert_eq!(backend.requests_to("khqr/generate").len(), 1);
}

#[tokio::test]
async fn test_cancel_leaves_cart_and_sends_no_order() {
    let backend = MockBackend::start().await.unwrap();
    let state = app_with(StorefrontConfig::new(backend.api_url()));
    let (_checkout, request) = khqr_checkout(&state).await;

    let (flow, controls) = PaymentFlow::new(gateway(&state), request, state.config().payment);
    let mut snapshots = flow.subscribe();
    let run = tokio::spawn(flow.run());

    wait_until(&mut snapshots, |s| *s.status() == PaymentStatus::AwaitingPayment).await;
    controls.cancel();
    let outcome = timeout(WAIT, run).await.unwrap().unwrap();

    assert_eq!(outcome, PaymentOutcome::Cancelled);
    assert_eq!(*snapshots.borrow().status(), PaymentStatus::Cancelled);
    assert_eq!(state.cart_store().quantity_of(ProductId::new(1)), 2);
    assert!(backend.requests_under("khqr/verify/").is_empty());
    assert!(backend.requests_to("orders/guest").is_empty());
}

#[tokio::test]
async fn test_static_qr_skips_generation() {
    let backend = MockBackend::start().await.unwrap();
    let mut config = StorefrontConfig::new(backend.api_url());
    config.static_qr = Some("/static/khqr/shop.png".to_string());
    let state = app_with(config);
    let (_checkout, request) = khqr_checkout(&state).await;

    let (flow, controls) = PaymentFlow::new(gateway(&state), request, state.config().payment);
    let mut snapshots = flow.subscribe();
    let run = tokio::spawn(flow.run());

    let shown = wait_until(&mut snapshots, |s| {
        *s.status() == PaymentStatus::AwaitingPayment
    })
    .await;
    assert_eq!(shown.qr().unwrap().qr, "/static/khqr/shop.png");
    assert!(backend.requests_to("khqr/generate").is_empty());

    drop(controls);
    let outcome = timeout(WAIT, run).await.unwrap().unwrap();
    assert_eq!(outcome, PaymentOutcome::Cancelled);
}

#[tokio::test]
async fn test_missing_merchant_info_still_shows_code() {
    let backend = MockBackend::with_responses(Responses {
        merchant: None,
        ..Responses::default()
    })
    .await
    .unwrap();
    let state = app_with(StorefrontConfig::new(backend.api_url()));
    let (_checkout, request) = khqr_checkout(&state).await;

    let (flow, controls) = PaymentFlow::new(gateway(&state), request, state.config().payment);
    let mut snapshots = flow.subscribe();
    let run = tokio::spawn(flow.run());

    let shown = wait_until(&mut snapshots, |s| {
        *s.status() == PaymentStatus::AwaitingPayment
    })
    .await;
    assert!(shown.merchant().is_none());
    assert!(shown.qr().is_some());

    controls.cancel();
    timeout(WAIT, run).await.unwrap().unwrap();
}

#[tokio::test]
async fn test_merchant_info_is_cached() {
    let backend = MockBackend::start().await.unwrap();
    let state = app_with(StorefrontConfig::new(backend.api_url()));

    let first = state.api().merchant_info().await.unwrap();
    let second = state.api().merchant_info().await.unwrap();

    assert_eq!(first, second);
    assert_eq!(backend.requests_to("khqr/merchant-info").len(), 1);
}
