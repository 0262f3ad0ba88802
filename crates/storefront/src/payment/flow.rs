//! Async driver for a [`PaymentSession`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info, instrument, warn};

use super::session::{DEFAULT_WINDOW_SECS, PaymentSession, RefreshOutcome, TickOutcome};
use super::{
    MerchantInfo, PaymentConfirmation, PaymentGateway, PaymentRequest, QrPayload, TransactionId,
    VerificationResult,
};
use crate::api::ApiError;

const DECLINED_MESSAGE: &str = "Payment verification failed. Please try again.";

/// Customer input to a running flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentCommand {
    /// "I have paid".
    Confirm,
    /// Re-issue the QR with a full window.
    Refresh,
    /// Leave the payment screen.
    Cancel,
}

/// How a flow ended. Produced exactly once per flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    Paid(PaymentConfirmation),
    Cancelled,
}

/// Timing for a payment flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentSettings {
    /// Seconds a displayed QR stays valid.
    pub window_secs: u32,
    /// Countdown resolution.
    pub tick: Duration,
}

impl Default for PaymentSettings {
    fn default() -> Self {
        Self {
            window_secs: DEFAULT_WINDOW_SECS,
            tick: Duration::from_secs(1),
        }
    }
}

/// Handle for sending [`PaymentCommand`]s to a running flow.
///
/// Dropping every handle cancels the flow.
#[derive(Debug, Clone)]
pub struct PaymentControls {
    commands: mpsc::UnboundedSender<PaymentCommand>,
}

impl PaymentControls {
    /// Returns `false` once the flow has finished.
    pub fn confirm(&self) -> bool {
        self.send(PaymentCommand::Confirm)
    }

    /// Returns `false` once the flow has finished.
    pub fn refresh(&self) -> bool {
        self.send(PaymentCommand::Refresh)
    }

    /// Returns `false` once the flow has finished.
    pub fn cancel(&self) -> bool {
        self.send(PaymentCommand::Cancel)
    }

    pub fn send(&self, command: PaymentCommand) -> bool {
        self.commands.send(command).is_ok()
    }
}

enum Resolution {
    Setup {
        merchant: Option<MerchantInfo>,
        qr: Result<QrPayload, ApiError>,
    },
    Verification {
        transaction_id: TransactionId,
        result: Result<VerificationResult, ApiError>,
    },
}

/// Runs one payment session against a [`PaymentGateway`].
///
/// The flow owns the countdown and at most one in-flight backend call
/// (setup or verification). Each state change is published as a
/// [`PaymentSession`] snapshot.
pub struct PaymentFlow {
    gateway: Arc<dyn PaymentGateway>,
    request: PaymentRequest,
    settings: PaymentSettings,
    commands: mpsc::UnboundedReceiver<PaymentCommand>,
    snapshots: watch::Sender<PaymentSession>,
}

impl PaymentFlow {
    #[must_use]
    pub fn new(
        gateway: Arc<dyn PaymentGateway>,
        request: PaymentRequest,
        settings: PaymentSettings,
    ) -> (Self, PaymentControls) {
        let (tx, commands) = mpsc::unbounded_channel();
        let (snapshots, _) = watch::channel(PaymentSession::new(settings.window_secs));
        let flow = Self {
            gateway,
            request,
            settings,
            commands,
            snapshots,
        };
        (flow, PaymentControls { commands: tx })
    }

    /// Subscribe to session snapshots.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<PaymentSession> {
        self.snapshots.subscribe()
    }

    /// Drive the session until it is paid or cancelled.
    #[instrument(
        skip(self),
        fields(bill_number = %self.request.bill_number, amount = %self.request.amount)
    )]
    pub async fn run(self) -> PaymentOutcome {
        let Self {
            gateway,
            request,
            settings,
            mut commands,
            snapshots,
        } = self;

        let mut session = PaymentSession::new(settings.window_secs);
        let mut pending = Some(spawn_setup(&gateway, &request));
        let mut ticker = time::interval_at(Instant::now() + settings.tick, settings.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            // Commands first: a queued cancel beats a finished backend call.
            tokio::select! {
                biased;

                command = commands.recv() => match command {
                    Some(PaymentCommand::Confirm) => {
                        let transaction_id = TransactionId::generate();
                        match session.begin_verification(transaction_id.clone()) {
                            Ok(()) => {
                                info!(%transaction_id, "Verifying KHQR payment");
                                pending = Some(spawn_verification(&gateway, transaction_id));
                            }
                            Err(e) => debug!(error = %e, "Ignoring payment confirmation"),
                        }
                    }
                    Some(PaymentCommand::Refresh) => match session.refresh() {
                        Ok(RefreshOutcome::Reissued) => {
                            debug!("KHQR code re-issued");
                            ticker.reset();
                        }
                        Ok(RefreshOutcome::NeedsSetup) => {
                            pending = Some(spawn_setup(&gateway, &request));
                        }
                        Err(e) => debug!(error = %e, "Ignoring refresh"),
                    },
                    Some(PaymentCommand::Cancel) | None => {
                        if let Some(handle) = pending.take() {
                            handle.abort();
                        }
                        if let Err(e) = session.cancel() {
                            debug!(error = %e, "Cancel after completion");
                        }
                        info!("KHQR payment cancelled");
                        snapshots.send_replace(session);
                        return PaymentOutcome::Cancelled;
                    }
                },
                joined = wait_for(&mut pending) => {
                    pending = None;
                    if let Some(confirmation) = resolve(&mut session, joined) {
                        snapshots.send_replace(session);
                        return PaymentOutcome::Paid(confirmation);
                    }
                    if session.is_counting() {
                        ticker.reset();
                    }
                }
                _ = ticker.tick(), if session.is_counting() => {
                    if session.tick() == TickOutcome::Expired {
                        info!("KHQR payment window expired");
                    }
                }
            }

            snapshots.send_replace(session.clone());
        }
    }
}

fn spawn_setup(
    gateway: &Arc<dyn PaymentGateway>,
    request: &PaymentRequest,
) -> JoinHandle<Resolution> {
    let gateway = Arc::clone(gateway);
    let request = request.clone();
    tokio::spawn(async move {
        let merchant = match gateway.merchant_info().await {
            Ok(merchant) => Some(merchant),
            Err(e) => {
                warn!(error = %e, "Merchant info unavailable");
                None
            }
        };
        let qr = gateway.request_qr(&request).await;
        Resolution::Setup { merchant, qr }
    })
}

fn spawn_verification(
    gateway: &Arc<dyn PaymentGateway>,
    transaction_id: TransactionId,
) -> JoinHandle<Resolution> {
    let gateway = Arc::clone(gateway);
    tokio::spawn(async move {
        let result = gateway.verify_payment(&transaction_id).await;
        Resolution::Verification {
            transaction_id,
            result,
        }
    })
}

async fn wait_for(pending: &mut Option<JoinHandle<Resolution>>) -> Result<Resolution, JoinError> {
    match pending {
        Some(handle) => handle.await,
        None => std::future::pending().await,
    }
}

/// Apply a finished backend call to the session.
fn resolve(
    session: &mut PaymentSession,
    joined: Result<Resolution, JoinError>,
) -> Option<PaymentConfirmation> {
    let resolution = match joined {
        Ok(resolution) => resolution,
        Err(e) => {
            error!(error = %e, "Payment task failed");
            abandon(session, &format!("Payment failed: {e}"));
            return None;
        }
    };

    let applied = match resolution {
        Resolution::Setup { merchant, qr } => match qr {
            Ok(qr) => session.initialized(qr, merchant),
            Err(e) => {
                warn!(error = %e, "Failed to obtain KHQR code");
                session.setup_failed(format!("Failed to initialize payment: {}", detail_of(&e)))
            }
        },
        Resolution::Verification {
            transaction_id,
            result,
        } => match result {
            Ok(VerificationResult { success: true, .. }) => {
                return match session.verification_succeeded(&transaction_id) {
                    Ok(confirmation) => {
                        info!(%transaction_id, "KHQR payment verified");
                        Some(confirmation)
                    }
                    Err(e) => {
                        debug!(error = %e, "Discarding verification result");
                        None
                    }
                };
            }
            Ok(VerificationResult { message, .. }) => {
                info!(%transaction_id, message = ?message, "KHQR payment not confirmed");
                session.verification_failed(&transaction_id, DECLINED_MESSAGE)
            }
            Err(e) => {
                warn!(%transaction_id, error = %e, "KHQR verification request failed");
                session.verification_failed(
                    &transaction_id,
                    format!("Payment verification failed: {}", detail_of(&e)),
                )
            }
        },
    };

    if let Err(e) = applied {
        debug!(error = %e, "Discarding backend result");
    }
    None
}

/// Move a session whose backend task died into `Error`.
fn abandon(session: &mut PaymentSession, reason: &str) {
    let status = session.status().clone();
    let applied = match status {
        super::PaymentStatus::Initializing => session.setup_failed(reason),
        super::PaymentStatus::Verifying { transaction_id } => {
            session.verification_failed(&transaction_id, reason)
        }
        _ => Ok(()),
    };
    if let Err(e) = applied {
        debug!(error = %e, "Discarding task failure");
    }
}

fn detail_of(error: &ApiError) -> String {
    error
        .detail()
        .map_or_else(|| error.to_string(), str::to_owned)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use tokio::sync::Notify;

    use super::*;
    use crate::checkout::OrderNumber;
    use crate::payment::PaymentStatus;

    /// Gateway whose verification answers come from a script.
    #[derive(Default)]
    struct FakeGateway {
        merchant_fails: bool,
        qr_fails: bool,
        verify_results: Mutex<Vec<bool>>,
        verify_calls: AtomicUsize,
        verify_answers: AtomicUsize,
        qr_calls: AtomicUsize,
        /// When set, verification waits for this before answering.
        gate: Option<Arc<Notify>>,
    }

    #[async_trait]
    impl PaymentGateway for FakeGateway {
        async fn merchant_info(&self) -> Result<MerchantInfo, ApiError> {
            if self.merchant_fails {
                return Err(ApiError::Api {
                    status: 503,
                    detail: None,
                });
            }
            Ok(MerchantInfo {
                merchant_name: "Coffee House".to_string(),
                merchant_city: "Phnom Penh".to_string(),
                country_code: "KH".to_string(),
            })
        }

        async fn request_qr(&self, _request: &PaymentRequest) -> Result<QrPayload, ApiError> {
            self.qr_calls.fetch_add(1, Ordering::SeqCst);
            if self.qr_fails {
                return Err(ApiError::Api {
                    status: 502,
                    detail: Some("bank offline".to_string()),
                });
            }
            Ok(QrPayload {
                qr: "khqr-payload".to_string(),
                md5: None,
            })
        }

        async fn verify_payment(
            &self,
            _transaction_id: &TransactionId,
        ) -> Result<VerificationResult, ApiError> {
            self.verify_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            let success = self.verify_results.lock().unwrap().pop().unwrap_or(true);
            self.verify_answers.fetch_add(1, Ordering::SeqCst);
            Ok(VerificationResult {
                success,
                message: None,
            })
        }
    }

    fn request() -> PaymentRequest {
        PaymentRequest {
            amount: Decimal::new(1399, 2),
            bill_number: OrderNumber::generate(),
        }
    }

    fn start(
        gateway: Arc<FakeGateway>,
    ) -> (
        JoinHandle<PaymentOutcome>,
        PaymentControls,
        watch::Receiver<PaymentSession>,
    ) {
        let (flow, controls) = PaymentFlow::new(gateway, request(), PaymentSettings::default());
        let snapshots = flow.subscribe();
        (tokio::spawn(flow.run()), controls, snapshots)
    }

    async fn wait_until(
        snapshots: &mut watch::Receiver<PaymentSession>,
        predicate: impl FnMut(&PaymentSession) -> bool,
    ) -> PaymentSession {
        snapshots.wait_for(predicate).await.unwrap().clone()
    }

    #[tokio::test(start_paused = true)]
    async fn test_confirm_and_verify_pays() {
        let gateway = Arc::new(FakeGateway::default());
        let (run, controls, mut snapshots) = start(Arc::clone(&gateway));

        let ready = wait_until(&mut snapshots, PaymentSession::can_confirm).await;
        assert_eq!(ready.merchant().unwrap().merchant_name, "Coffee House");
        assert!(controls.confirm());

        match run.await.unwrap() {
            PaymentOutcome::Paid(confirmation) => {
                assert!(confirmation.payment_status);
                assert!(confirmation.transaction_id.as_str().starts_with("KHQR-"));
            }
            PaymentOutcome::Cancelled => panic!("expected payment"),
        }
        assert_eq!(gateway.verify_calls.load(Ordering::SeqCst), 1);
        assert!(matches!(
            snapshots.borrow().status(),
            PaymentStatus::Completed { .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expires_without_success() {
        let gateway = Arc::new(FakeGateway::default());
        let (run, controls, mut snapshots) = start(Arc::clone(&gateway));

        let started = Instant::now();
        let expired = wait_until(&mut snapshots, |s| {
            *s.status() == PaymentStatus::Expired
        })
        .await;

        assert_eq!(started.elapsed(), Duration::from_secs(300));
        assert_eq!(expired.remaining_secs(), 0);
        assert_eq!(
            expired.last_error(),
            Some("Payment QR code expired. Please generate a new one.")
        );

        assert!(controls.confirm());
        assert!(controls.cancel());
        assert_eq!(run.await.unwrap(), PaymentOutcome::Cancelled);
        assert_eq!(gateway.verify_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_discards_late_verification() {
        let gate = Arc::new(Notify::new());
        let gateway = Arc::new(FakeGateway {
            gate: Some(Arc::clone(&gate)),
            ..FakeGateway::default()
        });
        let (run, controls, mut snapshots) = start(Arc::clone(&gateway));

        wait_until(&mut snapshots, PaymentSession::can_confirm).await;
        controls.confirm();
        wait_until(&mut snapshots, |s| {
            matches!(s.status(), PaymentStatus::Verifying { .. })
        })
        .await;

        controls.cancel();
        gate.notify_waiters();

        assert_eq!(run.await.unwrap(), PaymentOutcome::Cancelled);
        assert_eq!(snapshots.borrow().status(), &PaymentStatus::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_queued_cancel_beats_finished_verification() {
        for _ in 0..32 {
            let gate = Arc::new(Notify::new());
            let gateway = Arc::new(FakeGateway {
                gate: Some(Arc::clone(&gate)),
                ..FakeGateway::default()
            });
            let (flow, controls) = PaymentFlow::new(
                Arc::clone(&gateway) as Arc<dyn PaymentGateway>,
                request(),
                PaymentSettings::default(),
            );
            let mut snapshots = flow.subscribe();
            let mut run = Box::pin(flow.run());

            tokio::select! {
                outcome = run.as_mut() => panic!("flow ended early: {outcome:?}"),
                _ = snapshots.wait_for(PaymentSession::can_confirm) => {}
            }
            controls.confirm();
            tokio::select! {
                outcome = run.as_mut() => panic!("flow ended early: {outcome:?}"),
                _ = snapshots.wait_for(|s| matches!(s.status(), PaymentStatus::Verifying { .. })) => {}
            }

            // Let the verification finish while the flow is not being polled.
            gate.notify_one();
            while gateway.verify_answers.load(Ordering::SeqCst) == 0 {
                tokio::task::yield_now().await;
            }
            controls.cancel();

            assert_eq!(run.await, PaymentOutcome::Cancelled);
            assert_eq!(snapshots.borrow().status(), &PaymentStatus::Cancelled);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_verification_in_flight() {
        let gate = Arc::new(Notify::new());
        let gateway = Arc::new(FakeGateway {
            gate: Some(Arc::clone(&gate)),
            ..FakeGateway::default()
        });
        let (run, controls, mut snapshots) = start(Arc::clone(&gateway));

        wait_until(&mut snapshots, PaymentSession::can_confirm).await;
        controls.confirm();
        controls.confirm();
        controls.confirm();
        wait_until(&mut snapshots, |s| {
            matches!(s.status(), PaymentStatus::Verifying { .. })
        })
        .await;
        tokio::task::yield_now().await;
        gate.notify_one();

        assert!(matches!(run.await.unwrap(), PaymentOutcome::Paid(_)));
        assert_eq!(gateway.verify_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_declined_then_refresh_resets_window() {
        let gateway = Arc::new(FakeGateway {
            verify_results: Mutex::new(vec![true, false]),
            ..FakeGateway::default()
        });
        let (run, controls, mut snapshots) = start(Arc::clone(&gateway));

        wait_until(&mut snapshots, PaymentSession::can_confirm).await;
        time::sleep(Duration::from_millis(120_500)).await;
        assert!(snapshots.borrow().remaining_secs() < 300);

        controls.confirm();
        let declined = wait_until(&mut snapshots, |s| {
            matches!(s.status(), PaymentStatus::Error { .. })
        })
        .await;
        assert_eq!(
            declined.last_error(),
            Some("Payment verification failed. Please try again.")
        );

        controls.refresh();
        let refreshed = wait_until(&mut snapshots, PaymentSession::can_confirm).await;
        assert_eq!(refreshed.remaining_secs(), 300);
        assert_eq!(refreshed.last_error(), None);
        assert_eq!(gateway.qr_calls.load(Ordering::SeqCst), 1);

        controls.confirm();
        assert!(matches!(run.await.unwrap(), PaymentOutcome::Paid(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_setup_failure_and_best_effort_merchant() {
        let gateway = Arc::new(FakeGateway {
            merchant_fails: true,
            qr_fails: true,
            ..FakeGateway::default()
        });
        let (run, controls, mut snapshots) = start(Arc::clone(&gateway));

        let failed = wait_until(&mut snapshots, |s| {
            matches!(s.status(), PaymentStatus::Error { .. })
        })
        .await;
        assert_eq!(
            failed.last_error(),
            Some("Failed to initialize payment: bank offline")
        );
        assert!(failed.merchant().is_none());

        controls.refresh();
        loop {
            snapshots.changed().await.unwrap();
            let failed_again = matches!(snapshots.borrow().status(), PaymentStatus::Error { .. });
            if failed_again && gateway.qr_calls.load(Ordering::SeqCst) == 2 {
                break;
            }
        }

        drop(controls);
        assert_eq!(run.await.unwrap(), PaymentOutcome::Cancelled);
    }
}
