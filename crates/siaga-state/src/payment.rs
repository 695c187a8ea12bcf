//! # Payment Records
//!
//! A payment is one attempt to collect money for a booking. A booking can
//! accumulate several attempts over its lifetime (an expired invoice is
//! replaced by a fresh one), but at most one attempt of a given kind may
//! be open at a time — [`PaymentStatus::is_open`] defines "open", and the
//! store enforces the at-most-one rule on creation.
//!
//! ## Transitions
//!
//! ```text
//! Pending ──▶ Paid | Failed | Expired     (all three terminal)
//! ```
//!
//! A gateway callback marks a `Pending` payment `Paid` at any time; the
//! deadline sweep marks it `Expired` once `expires_at` lapses. Whichever
//! lands first wins — the loser's transition is rejected.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use siaga_core::{BookingId, Money, PaymentId};

use crate::booking::StateError;

// ─── Kind and Status ─────────────────────────────────────────────────

/// Which stage of the two-phase payment this record collects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentKind {
    /// The 30% downpayment that confirms a scheduled booking.
    DownPayment,
    /// The remaining balance (or the whole amount for emergencies).
    FullPayment,
}

impl PaymentKind {
    /// Canonical string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DownPayment => "down_payment",
            Self::FullPayment => "full_payment",
        }
    }
}

/// Status of a payment attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    /// Awaiting settlement by the gateway.
    Pending,
    /// Settled (terminal).
    Paid,
    /// Rejected by the gateway (terminal).
    Failed,
    /// Deadline lapsed before settlement (terminal).
    Expired,
}

impl PaymentStatus {
    /// Return the canonical string representation of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Paid => "PAID",
            Self::Failed => "FAILED",
            Self::Expired => "EXPIRED",
        }
    }

    /// Whether this attempt still occupies the "one open payment per
    /// kind" slot. `Paid` counts — a settled payment must not be
    /// silently duplicated by a second attempt of the same kind.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Pending | Self::Paid)
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── The Payment ─────────────────────────────────────────────────────

/// One payment attempt for a booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    /// Unique payment identifier.
    pub id: PaymentId,
    /// The booking this payment belongs to.
    pub booking_id: BookingId,
    /// Downpayment or full payment.
    pub kind: PaymentKind,
    /// Current status.
    pub status: PaymentStatus,
    /// Amount to collect.
    pub amount: Money,
    /// When this attempt stops being payable.
    pub expires_at: Option<DateTime<Utc>>,
    /// Last time a reminder was sent for this payment.
    pub last_reminder_at: Option<DateTime<Utc>>,
    /// How many reminders have been sent.
    pub reminder_count: u32,
    /// When the attempt was created.
    pub created_at: DateTime<Utc>,
    /// When the attempt settled, if it did.
    pub paid_at: Option<DateTime<Utc>>,
}

impl Payment {
    /// Create a new pending payment attempt.
    pub fn new(
        booking_id: BookingId,
        kind: PaymentKind,
        amount: Money,
        expires_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: PaymentId::new(),
            booking_id,
            kind,
            status: PaymentStatus::Pending,
            amount,
            expires_at,
            last_reminder_at: None,
            reminder_count: 0,
            created_at: now,
            paid_at: None,
        }
    }

    /// Whether this payment is pending and past its expiry.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == PaymentStatus::Pending
            && self.expires_at.is_some_and(|deadline| now > deadline)
    }

    /// Settle this payment (gateway callback input).
    ///
    /// # Errors
    ///
    /// Rejected unless the payment is `Pending` — a payment that already
    /// expired cannot be resurrected by a late callback.
    pub fn mark_paid(&mut self, now: DateTime<Utc>) -> Result<(), StateError> {
        self.guard_pending(PaymentStatus::Paid)?;
        self.status = PaymentStatus::Paid;
        self.paid_at = Some(now);
        Ok(())
    }

    /// Expire this payment (deadline sweep input).
    ///
    /// # Errors
    ///
    /// Rejected unless the payment is `Pending`. A second sweep run
    /// hitting an already-expired record gets an error it can treat as
    /// "someone else won" and skip.
    pub fn mark_expired(&mut self) -> Result<(), StateError> {
        self.guard_pending(PaymentStatus::Expired)?;
        self.status = PaymentStatus::Expired;
        Ok(())
    }

    /// Fail this payment (gateway rejection input).
    ///
    /// # Errors
    ///
    /// Rejected unless the payment is `Pending`.
    pub fn mark_failed(&mut self) -> Result<(), StateError> {
        self.guard_pending(PaymentStatus::Failed)?;
        self.status = PaymentStatus::Failed;
        Ok(())
    }

    /// Whether a reminder may be sent at `now` given the cool-down
    /// window. `force` bypasses the window but never the pending check.
    pub fn is_reminder_due(&self, now: DateTime<Utc>, cooldown: Duration, force: bool) -> bool {
        if self.status != PaymentStatus::Pending {
            return false;
        }
        if force {
            return true;
        }
        match self.last_reminder_at {
            None => true,
            Some(last) => now - last >= cooldown,
        }
    }

    /// Record that a reminder was sent now.
    pub fn record_reminder(&mut self, now: DateTime<Utc>) {
        self.last_reminder_at = Some(now);
        self.reminder_count += 1;
    }

    fn guard_pending(&self, to: PaymentStatus) -> Result<(), StateError> {
        if self.status != PaymentStatus::Pending {
            return Err(StateError::InvalidTransition {
                from: self.status.to_string(),
                to: to.to_string(),
                reason: "payment is no longer pending".to_string(),
            });
        }
        Ok(())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 20, 12, 0, 0).unwrap()
    }

    fn pending_payment() -> Payment {
        Payment::new(
            BookingId::new(),
            PaymentKind::DownPayment,
            Money::from_minor(300_000),
            Some(t0() + Duration::hours(24)),
            t0(),
        )
    }

    #[test]
    fn new_payment_is_pending() {
        let p = pending_payment();
        assert_eq!(p.status, PaymentStatus::Pending);
        assert_eq!(p.reminder_count, 0);
        assert!(p.last_reminder_at.is_none());
    }

    #[test]
    fn expiry_requires_pending_and_lapsed_deadline() {
        let p = pending_payment();
        assert!(!p.is_expired(t0()));
        assert!(!p.is_expired(t0() + Duration::hours(24)));
        assert!(p.is_expired(t0() + Duration::hours(24) + Duration::minutes(1)));
    }

    #[test]
    fn paid_payment_is_never_expired() {
        let mut p = pending_payment();
        p.mark_paid(t0()).unwrap();
        assert!(!p.is_expired(t0() + Duration::days(30)));
    }

    #[test]
    fn late_callback_cannot_resurrect_expired_payment() {
        let mut p = pending_payment();
        p.mark_expired().unwrap();
        let err = p.mark_paid(t0()).unwrap_err();
        assert!(matches!(err, StateError::InvalidTransition { .. }));
        assert_eq!(p.status, PaymentStatus::Expired);
        assert!(p.paid_at.is_none());
    }

    #[test]
    fn double_expire_is_rejected() {
        let mut p = pending_payment();
        p.mark_expired().unwrap();
        assert!(p.mark_expired().is_err());
    }

    #[test]
    fn open_slot_covers_pending_and_paid() {
        assert!(PaymentStatus::Pending.is_open());
        assert!(PaymentStatus::Paid.is_open());
        assert!(!PaymentStatus::Failed.is_open());
        assert!(!PaymentStatus::Expired.is_open());
    }

    // ── Cool-down window ──────────────────────────────────────────────

    #[test]
    fn first_reminder_is_always_due() {
        let p = pending_payment();
        assert!(p.is_reminder_due(t0(), Duration::hours(6), false));
    }

    #[test]
    fn reminder_respects_cooldown() {
        let mut p = pending_payment();
        p.record_reminder(t0());
        assert_eq!(p.reminder_count, 1);

        // One hour later: inside the 6h window.
        assert!(!p.is_reminder_due(t0() + Duration::hours(1), Duration::hours(6), false));
        // Seven hours later: window elapsed.
        assert!(p.is_reminder_due(t0() + Duration::hours(7), Duration::hours(6), false));
    }

    #[test]
    fn force_bypasses_cooldown_but_not_pending_check() {
        let mut p = pending_payment();
        p.record_reminder(t0());
        assert!(p.is_reminder_due(t0() + Duration::hours(1), Duration::hours(6), true));

        p.mark_paid(t0()).unwrap();
        assert!(!p.is_reminder_due(t0() + Duration::days(1), Duration::hours(6), true));
    }
}
