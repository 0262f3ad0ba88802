//! Payment session state machine.

use std::fmt;

use thiserror::Error;

use super::{MerchantInfo, PaymentConfirmation, QrPayload, TransactionId};

/// Default validity window for a displayed QR code, in seconds.
pub const DEFAULT_WINDOW_SECS: u32 = 300;

/// Shown when the window elapses without a verified payment.
pub const EXPIRED_MESSAGE: &str = "Payment QR code expired. Please generate a new one.";

/// Where a payment session is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentStatus {
    /// Fetching merchant details and the QR payload.
    Initializing,
    /// QR displayed, countdown running, waiting for "I have paid".
    AwaitingPayment,
    /// One verification call is in flight.
    Verifying { transaction_id: TransactionId },
    /// Verified. Terminal.
    Completed { transaction_id: TransactionId },
    /// The window elapsed. Recoverable via refresh.
    Expired,
    /// Setup or verification failed. Recoverable via refresh.
    Error { reason: String },
    /// Torn down by the customer. Terminal.
    Cancelled,
}

impl PaymentStatus {
    /// Short name used in logs and transition errors.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Initializing => "initializing",
            Self::AwaitingPayment => "awaiting_payment",
            Self::Verifying { .. } => "verifying",
            Self::Completed { .. } => "completed",
            Self::Expired => "expired",
            Self::Error { .. } => "error",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether the session can no longer change.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::Cancelled)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A transition that the current state does not allow.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("cannot {action} while {status}")]
    NotAllowed {
        action: &'static str,
        status: &'static str,
    },

    /// A verification result for an attempt that is no longer current.
    #[error("stale verification result for {0}")]
    Stale(TransactionId),
}

/// Result of one countdown tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Still counting; seconds remaining.
    Counting(u32),
    /// This tick exhausted the window.
    Expired,
    /// Not counting in the current state.
    Idle,
}

/// What a refresh led to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The existing QR payload is shown again with a full window.
    Reissued,
    /// There was no payload to reuse; setup must run again.
    NeedsSetup,
}

/// A single KHQR payment attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentSession {
    status: PaymentStatus,
    window_secs: u32,
    remaining_secs: u32,
    qr: Option<QrPayload>,
    merchant: Option<MerchantInfo>,
    last_transaction: Option<TransactionId>,
}

impl PaymentSession {
    /// A session in `Initializing` with the given window.
    #[must_use]
    pub const fn new(window_secs: u32) -> Self {
        Self {
            status: PaymentStatus::Initializing,
            window_secs,
            remaining_secs: window_secs,
            qr: None,
            merchant: None,
            last_transaction: None,
        }
    }

    #[must_use]
    pub const fn status(&self) -> &PaymentStatus {
        &self.status
    }

    #[must_use]
    pub const fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    #[must_use]
    pub const fn window_secs(&self) -> u32 {
        self.window_secs
    }

    #[must_use]
    pub const fn qr(&self) -> Option<&QrPayload> {
        self.qr.as_ref()
    }

    #[must_use]
    pub const fn merchant(&self) -> Option<&MerchantInfo> {
        self.merchant.as_ref()
    }

    /// Reference of the most recent verification attempt.
    #[must_use]
    pub const fn transaction_id(&self) -> Option<&TransactionId> {
        self.last_transaction.as_ref()
    }

    /// Message for the error banner, if one should be shown.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        match &self.status {
            PaymentStatus::Error { reason } => Some(reason),
            PaymentStatus::Expired => Some(EXPIRED_MESSAGE),
            _ => None,
        }
    }

    /// Whether the countdown is running.
    #[must_use]
    pub const fn is_counting(&self) -> bool {
        matches!(self.status, PaymentStatus::AwaitingPayment)
    }

    /// Whether the "I have paid" control is enabled.
    #[must_use]
    pub const fn can_confirm(&self) -> bool {
        self.is_counting()
    }

    /// Whether the "refresh QR" control is enabled.
    #[must_use]
    pub const fn can_refresh(&self) -> bool {
        matches!(
            self.status,
            PaymentStatus::AwaitingPayment | PaymentStatus::Expired | PaymentStatus::Error { .. }
        )
    }

    /// Remaining time as `m:ss`.
    #[must_use]
    pub fn countdown_label(&self) -> String {
        format!("{}:{:02}", self.remaining_secs / 60, self.remaining_secs % 60)
    }

    /// Setup finished: show the QR and start the countdown.
    ///
    /// # Errors
    ///
    /// Returns an error unless the session is initializing.
    pub fn initialized(
        &mut self,
        qr: QrPayload,
        merchant: Option<MerchantInfo>,
    ) -> Result<(), TransitionError> {
        self.require(matches!(self.status, PaymentStatus::Initializing), "initialize")?;
        self.qr = Some(qr);
        if merchant.is_some() {
            self.merchant = merchant;
        }
        self.remaining_secs = self.window_secs;
        self.status = PaymentStatus::AwaitingPayment;
        Ok(())
    }

    /// Setup failed.
    ///
    /// # Errors
    ///
    /// Returns an error unless the session is initializing.
    pub fn setup_failed(&mut self, reason: impl Into<String>) -> Result<(), TransitionError> {
        self.require(matches!(self.status, PaymentStatus::Initializing), "fail setup")?;
        self.status = PaymentStatus::Error {
            reason: reason.into(),
        };
        Ok(())
    }

    /// Advance the countdown by one second.
    pub fn tick(&mut self) -> TickOutcome {
        if !self.is_counting() {
            return TickOutcome::Idle;
        }

        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs == 0 {
            self.status = PaymentStatus::Expired;
            TickOutcome::Expired
        } else {
            TickOutcome::Counting(self.remaining_secs)
        }
    }

    /// The customer claims to have paid; start verifying `transaction_id`.
    ///
    /// # Errors
    ///
    /// Returns an error unless a payment is awaited. This is what keeps
    /// verification calls from overlapping.
    pub fn begin_verification(
        &mut self,
        transaction_id: TransactionId,
    ) -> Result<(), TransitionError> {
        self.require(self.can_confirm(), "verify")?;
        self.last_transaction = Some(transaction_id.clone());
        self.status = PaymentStatus::Verifying { transaction_id };
        Ok(())
    }

    /// The verification call for `transaction_id` succeeded.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::Stale`] if that attempt is no longer the
    /// one in flight, e.g. because the session was cancelled meanwhile.
    pub fn verification_succeeded(
        &mut self,
        transaction_id: &TransactionId,
    ) -> Result<PaymentConfirmation, TransitionError> {
        self.require_in_flight(transaction_id)?;
        self.status = PaymentStatus::Completed {
            transaction_id: transaction_id.clone(),
        };
        Ok(PaymentConfirmation::khqr(transaction_id.clone()))
    }

    /// The verification call for `transaction_id` failed or was declined.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::Stale`] if that attempt is no longer the
    /// one in flight.
    pub fn verification_failed(
        &mut self,
        transaction_id: &TransactionId,
        reason: impl Into<String>,
    ) -> Result<(), TransitionError> {
        self.require_in_flight(transaction_id)?;
        self.status = PaymentStatus::Error {
            reason: reason.into(),
        };
        Ok(())
    }

    /// Show the QR again with a full window.
    ///
    /// The existing payload is reused; if there is none, the session goes
    /// back to `Initializing`.
    ///
    /// # Errors
    ///
    /// Returns an error while verifying or once terminal.
    pub fn refresh(&mut self) -> Result<RefreshOutcome, TransitionError> {
        self.require(self.can_refresh(), "refresh")?;
        self.remaining_secs = self.window_secs;
        if self.qr.is_some() {
            self.status = PaymentStatus::AwaitingPayment;
            Ok(RefreshOutcome::Reissued)
        } else {
            self.status = PaymentStatus::Initializing;
            Ok(RefreshOutcome::NeedsSetup)
        }
    }

    /// Tear the session down. Cancelling twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the payment already completed.
    pub fn cancel(&mut self) -> Result<(), TransitionError> {
        self.require(
            !matches!(self.status, PaymentStatus::Completed { .. }),
            "cancel",
        )?;
        self.status = PaymentStatus::Cancelled;
        Ok(())
    }

    fn require(&self, allowed: bool, action: &'static str) -> Result<(), TransitionError> {
        if allowed {
            Ok(())
        } else {
            Err(TransitionError::NotAllowed {
                action,
                status: self.status.name(),
            })
        }
    }

    fn require_in_flight(&self, transaction_id: &TransactionId) -> Result<(), TransitionError> {
        match &self.status {
            PaymentStatus::Verifying {
                transaction_id: current,
            } if current == transaction_id => Ok(()),
            _ => Err(TransitionError::Stale(transaction_id.clone())),
        }
    }
}

impl Default for PaymentSession {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_SECS)
    }
}
