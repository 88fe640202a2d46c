//! # Notifications
//!
//! Fire-and-forget messages sent after a booking, cancellation or transfer
//! has committed. A failing notifier never undoes financial state: the
//! engine logs the failure and moves on.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

use marquee_core::Money;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationEvent {
    BookingConfirmed {
        booking_id: String,
        booking_number: String,
        member_id: String,
        showing_id: String,
        seats: usize,
        total: Money,
    },
    BookingCancelled {
        booking_id: String,
        booking_number: String,
        member_id: String,
        refunded: Money,
    },
    TransferCompleted {
        from_member_id: String,
        to_member_id: String,
        amount: Money,
    },
}

#[derive(Debug, Error)]
#[error("Notification failed: {0}")]
pub struct NotifyError(pub String);

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: &NotificationEvent) -> Result<(), NotifyError>;
}

/// Sends `event` and swallows any failure after logging it.
pub(crate) async fn dispatch(notifier: &dyn Notifier, event: NotificationEvent) {
    if let Err(e) = notifier.notify(&event).await {
        warn!(error = %e, ?event, "Notifier failed; state already committed");
    }
}

/// Default notifier: writes each event to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify(&self, event: &NotificationEvent) -> Result<(), NotifyError> {
        info!(?event, "Notification");
        Ok(())
    }
}

/// Keeps every event it receives. Can be told to fail each call.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<NotificationEvent>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records events, then reports failure.
    pub fn failing() -> Self {
        RecordingNotifier {
            events: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub async fn events(&self) -> Vec<NotificationEvent> {
        self.events.lock().await.clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, event: &NotificationEvent) -> Result<(), NotifyError> {
        self.events.lock().await.push(event.clone());
        if self.fail {
            return Err(NotifyError("mail relay unavailable".to_string()));
        }
        Ok(())
    }
}
