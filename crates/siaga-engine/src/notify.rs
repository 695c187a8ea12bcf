//! # Notification Collaborator
//!
//! The engine raises domain events; delivery (mail, SMS, push) is
//! entirely the collaborator's concern. Failures are logged and never
//! retried synchronously — a broken notification channel must not block
//! a sweep.

use serde::Serialize;
use thiserror::Error;

use siaga_core::{BookingId, PaymentId};

/// A domain event raised by the lifecycle engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum NotificationEvent {
    /// A booking was cancelled.
    BookingCancelled { booking_id: BookingId },
    /// A booking completed its service.
    BookingCompleted { booking_id: BookingId },
    /// A scheduled booking's payment deadline lapsed.
    BookingPaymentFailed { booking_id: BookingId },
    /// A payment attempt expired before settlement.
    PaymentExpired {
        booking_id: BookingId,
        payment_id: PaymentId,
    },
    /// Reminder for a scheduled booking's staged payment.
    PaymentReminder {
        booking_id: BookingId,
        payment_id: PaymentId,
    },
    /// Reminder for an unpaid emergency booking.
    EmergencyPaymentReminder {
        booking_id: BookingId,
        payment_id: PaymentId,
    },
}

impl NotificationEvent {
    /// The booking this event concerns.
    pub fn booking_id(&self) -> BookingId {
        match self {
            Self::BookingCancelled { booking_id }
            | Self::BookingCompleted { booking_id }
            | Self::BookingPaymentFailed { booking_id }
            | Self::PaymentExpired { booking_id, .. }
            | Self::PaymentReminder { booking_id, .. }
            | Self::EmergencyPaymentReminder { booking_id, .. } => *booking_id,
        }
    }
}

/// Delivery handoff failed.
#[derive(Error, Debug)]
#[error("notification delivery failed: {0}")]
pub struct NotifyError(pub String);

/// The notification collaborator interface.
pub trait Notifier: Send + Sync {
    /// Hand an event to the delivery layer. Fire-and-forget from the
    /// engine's perspective: errors are logged by the caller, never
    /// retried within a sweep.
    fn notify(&self, event: &NotificationEvent) -> Result<(), NotifyError>;
}

/// Default notifier: logs each event through `tracing`.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, event: &NotificationEvent) -> Result<(), NotifyError> {
        tracing::info!(booking_id = %event.booking_id(), event = ?event, "notification");
        Ok(())
    }
}

/// Test notifier that records every event it receives.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    events: parking_lot::Mutex<Vec<NotificationEvent>>,
}

impl RecordingNotifier {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events received so far.
    pub fn events(&self) -> Vec<NotificationEvent> {
        self.events.lock().clone()
    }

    /// Number of events received.
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Whether no events were received.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, event: &NotificationEvent) -> Result<(), NotifyError> {
        self.events.lock().push(event.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_notifier_captures_events() {
        let notifier = RecordingNotifier::new();
        let event = NotificationEvent::BookingCancelled {
            booking_id: BookingId::new(),
        };
        notifier.notify(&event).unwrap();
        assert_eq!(notifier.events(), vec![event]);
    }

    #[test]
    fn event_serializes_with_tag() {
        let event = NotificationEvent::PaymentExpired {
            booking_id: BookingId::new(),
            payment_id: PaymentId::new(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "payment_expired");
    }
}
