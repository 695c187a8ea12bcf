//! # Booking State Machine
//!
//! The booking lifecycle, enforced at runtime against an explicit
//! transition table. Sweep candidates are loaded from storage, so the
//! status is not known at compile time — [`BookingStatus`] provides the
//! runtime-checked machine, and [`Booking::try_transition`] is the only
//! way a status ever changes.
//!
//! ## Allowed Transitions
//!
//! ```text
//! Pending ──────┐
//!               ├──▶ Confirmed ──▶ Dispatched ──▶ Arrived ──▶ Completed
//! Scheduled ────┘        │
//!    │    │              │
//!    │    └──────────────┼────────▶ Cancelled ◀── PaymentFailed
//!    │                   │              ▲              ▲
//!    └───────────────────┴──────────────┘              │
//!         (Pending / Scheduled / Confirmed may also fail payment)
//! ```
//!
//! `Completed` and `Cancelled` are terminal. A booking that has been
//! dispatched can no longer be cancelled — the crew is already on the
//! road and the run must play out to `Arrived`/`Completed`.
//!
//! ## Invariants
//!
//! - A rejected transition mutates nothing.
//! - A fully-paid booking never moves to `Cancelled` or `PaymentFailed`
//!   for [`TransitionCause::NonPayment`].
//! - Every accepted transition appends one [`TransitionRecord`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use siaga_core::{AmbulanceId, BookingId, DriverId, Money, UserId};

// ─── Status ──────────────────────────────────────────────────────────

/// Lifecycle status of a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    /// Emergency booking awaiting dispatch confirmation.
    Pending,
    /// Scheduled booking awaiting its downpayment.
    Scheduled,
    /// Payment cleared (or emergency accepted) — resources may be assigned.
    Confirmed,
    /// Crew is on the road.
    Dispatched,
    /// Crew has arrived at the patient.
    Arrived,
    /// Service finished (terminal).
    Completed,
    /// Booking cancelled (terminal).
    Cancelled,
    /// A payment deadline lapsed; awaiting cancellation or manual rescue.
    PaymentFailed,
}

impl BookingStatus {
    /// Return the canonical string representation of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Scheduled => "SCHEDULED",
            Self::Confirmed => "CONFIRMED",
            Self::Dispatched => "DISPATCHED",
            Self::Arrived => "ARRIVED",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
            Self::PaymentFailed => "PAYMENT_FAILED",
        }
    }

    /// Whether this status is terminal (no further transitions allowed).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// The statuses reachable from this one.
    pub fn valid_transitions(&self) -> &'static [BookingStatus] {
        match self {
            Self::Pending => &[Self::Confirmed, Self::Cancelled, Self::PaymentFailed],
            Self::Scheduled => &[Self::Confirmed, Self::Cancelled, Self::PaymentFailed],
            Self::Confirmed => &[Self::Dispatched, Self::Cancelled, Self::PaymentFailed],
            Self::Dispatched => &[Self::Arrived],
            Self::Arrived => &[Self::Completed],
            Self::PaymentFailed => &[Self::Cancelled],
            Self::Completed | Self::Cancelled => &[],
        }
    }

    /// Whether a booking in this status may still be cancelled for
    /// non-payment. Dispatched and later stages are never eligible —
    /// the service has already started.
    pub fn is_cancellable_for_non_payment(&self) -> bool {
        matches!(self, Self::Pending | Self::Scheduled | Self::Confirmed)
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Kind and Priority ───────────────────────────────────────────────

/// Triage priority of an emergency booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Critical,
    Urgent,
    Normal,
}

/// What kind of booking this is.
///
/// Emergency bookings dispatch immediately and may receive service before
/// payment clears. Scheduled bookings are confirmed by a staged payment
/// (downpayment, then final payment) and carry the corresponding deadlines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BookingKind {
    /// Immediate dispatch with a triage priority.
    Emergency { priority: Priority },
    /// Pre-booked transport at a fixed time.
    Scheduled { scheduled_at: DateTime<Utc> },
}

impl BookingKind {
    /// Whether this is an emergency booking.
    pub fn is_emergency(&self) -> bool {
        matches!(self, Self::Emergency { .. })
    }
}

// ─── Transition Cause and Record ─────────────────────────────────────

/// Why a transition is being applied.
///
/// The cause gates the fully-paid invariant: a booking whose bill is
/// settled can still be cancelled by its user, but never for
/// [`TransitionCause::NonPayment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionCause {
    /// A payment deadline or payment record expired.
    NonPayment,
    /// Requested by the booking user.
    UserRequest,
    /// Applied by an operator or the normal service flow.
    Operational,
}

impl TransitionCause {
    /// Canonical string form, used in logs and transition records.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NonPayment => "non_payment",
            Self::UserRequest => "user_request",
            Self::Operational => "operational",
        }
    }
}

/// Record of a single status change in the booking lifecycle.
///
/// Every accepted transition is logged with its timestamp and cause,
/// giving operators an audit trail of how the booking got here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// Status before the transition.
    pub from_status: BookingStatus,
    /// Status after the transition.
    pub to_status: BookingStatus,
    /// When the transition was applied (UTC).
    pub timestamp: DateTime<Utc>,
    /// Why the transition was applied.
    pub cause: TransitionCause,
}

// ─── Errors ──────────────────────────────────────────────────────────

/// Errors raised by the booking and payment state machines.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    /// Attempted transition is not allowed by the state machine.
    #[error("invalid state transition: {from} -> {to}: {reason}")]
    InvalidTransition {
        /// Current status name.
        from: String,
        /// Attempted target status name.
        to: String,
        /// Why the transition was rejected.
        reason: String,
    },
}

impl StateError {
    fn invalid(from: impl std::fmt::Display, to: impl std::fmt::Display, reason: &str) -> Self {
        Self::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
            reason: reason.to_string(),
        }
    }
}

// ─── The Booking ─────────────────────────────────────────────────────

/// An ambulance booking.
///
/// Mutated only through [`Booking::try_transition`] and the resource
/// assignment methods; the status field is public for reading and
/// serialization, but callers go through the state machine so the
/// transition log and lifecycle timestamps stay consistent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    /// Unique booking identifier.
    pub id: BookingId,
    /// Human-facing booking code (e.g. `AMB-20260823-00042`).
    pub code: String,
    /// The requesting user.
    pub user_id: UserId,
    /// Emergency or scheduled, with kind-specific fields.
    pub kind: BookingKind,
    /// Current lifecycle status.
    pub status: BookingStatus,

    /// Assigned driver, if any.
    pub driver_id: Option<DriverId>,
    /// Assigned ambulance, if any.
    pub ambulance_id: Option<AmbulanceId>,

    /// Base service price.
    pub base_price: Money,
    /// Distance-dependent price component.
    pub distance_price: Money,
    /// Total amount due (base + distance).
    pub total_amount: Money,
    /// Whether the downpayment has cleared.
    pub is_downpayment_paid: bool,
    /// Whether the booking is fully paid.
    pub is_fully_paid: bool,

    /// Downpayment deadline (scheduled bookings only).
    pub dp_payment_deadline: Option<DateTime<Utc>>,
    /// Final-payment deadline (scheduled bookings, after the downpayment).
    pub final_payment_deadline: Option<DateTime<Utc>>,

    /// When the booking was requested.
    pub requested_at: DateTime<Utc>,
    /// When the crew was dispatched.
    pub dispatched_at: Option<DateTime<Utc>>,
    /// When the crew arrived at the patient.
    pub arrived_at: Option<DateTime<Utc>>,
    /// When the service completed.
    pub completed_at: Option<DateTime<Utc>>,
    /// When the booking was cancelled.
    pub cancelled_at: Option<DateTime<Utc>>,
    /// Last mutation time.
    pub updated_at: DateTime<Utc>,

    /// Audit trail of every accepted transition.
    pub transition_log: Vec<TransitionRecord>,
}

impl Booking {
    /// Create a new emergency booking in `Pending` status.
    pub fn new_emergency(
        code: impl Into<String>,
        user_id: UserId,
        priority: Priority,
        base_price: Money,
        distance_price: Money,
        now: DateTime<Utc>,
    ) -> Result<Self, siaga_core::CoreError> {
        let total = base_price.checked_add(distance_price)?;
        Ok(Self {
            id: BookingId::new(),
            code: code.into(),
            user_id,
            kind: BookingKind::Emergency { priority },
            status: BookingStatus::Pending,
            driver_id: None,
            ambulance_id: None,
            base_price,
            distance_price,
            total_amount: total,
            is_downpayment_paid: false,
            is_fully_paid: false,
            dp_payment_deadline: None,
            final_payment_deadline: None,
            requested_at: now,
            dispatched_at: None,
            arrived_at: None,
            completed_at: None,
            cancelled_at: None,
            updated_at: now,
            transition_log: Vec::new(),
        })
    }

    /// Create a new scheduled booking in `Scheduled` status with a
    /// downpayment deadline.
    pub fn new_scheduled(
        code: impl Into<String>,
        user_id: UserId,
        scheduled_at: DateTime<Utc>,
        base_price: Money,
        distance_price: Money,
        dp_payment_deadline: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Self, siaga_core::CoreError> {
        let total = base_price.checked_add(distance_price)?;
        Ok(Self {
            id: BookingId::new(),
            code: code.into(),
            user_id,
            kind: BookingKind::Scheduled { scheduled_at },
            status: BookingStatus::Scheduled,
            driver_id: None,
            ambulance_id: None,
            base_price,
            distance_price,
            total_amount: total,
            is_downpayment_paid: false,
            is_fully_paid: false,
            dp_payment_deadline: Some(dp_payment_deadline),
            final_payment_deadline: None,
            requested_at: now,
            dispatched_at: None,
            arrived_at: None,
            completed_at: None,
            cancelled_at: None,
            updated_at: now,
            transition_log: Vec::new(),
        })
    }

    /// The downpayment due for this booking (computed, never stored).
    pub fn downpayment_amount(&self) -> Money {
        self.total_amount.downpayment()
    }

    /// Whether a driver or ambulance is linked.
    pub fn has_resource(&self) -> bool {
        self.driver_id.is_some() || self.ambulance_id.is_some()
    }

    /// Whether this booking received emergency service ahead of payment:
    /// emergency kind, the crew has at least arrived, and the bill is not
    /// settled. Derived, never stored.
    pub fn is_unpaid_emergency(&self) -> bool {
        self.kind.is_emergency()
            && matches!(self.status, BookingStatus::Arrived | BookingStatus::Completed)
            && !self.is_fully_paid
    }

    /// Attempt a status transition.
    ///
    /// Validates the target against the transition table and the
    /// fully-paid guard *before* mutating anything. On success, updates
    /// the status, stamps the matching lifecycle timestamp, appends a
    /// [`TransitionRecord`], and bumps `updated_at`.
    ///
    /// # Errors
    ///
    /// [`StateError::InvalidTransition`] when the booking is terminal,
    /// the edge is not in the table, or a fully-paid booking is pushed
    /// toward `Cancelled`/`PaymentFailed` for non-payment. The booking
    /// is unchanged on error.
    pub fn try_transition(
        &mut self,
        to: BookingStatus,
        cause: TransitionCause,
        now: DateTime<Utc>,
    ) -> Result<(), StateError> {
        let from = self.status;

        if from.is_terminal() {
            return Err(StateError::invalid(from, to, "booking is terminal"));
        }
        if !from.valid_transitions().contains(&to) {
            return Err(StateError::invalid(from, to, "transition not permitted"));
        }
        if matches!(to, BookingStatus::Cancelled | BookingStatus::PaymentFailed)
            && cause == TransitionCause::NonPayment
            && self.is_fully_paid
        {
            return Err(StateError::invalid(
                from,
                to,
                "booking is fully paid and cannot lapse for non-payment",
            ));
        }

        self.status = to;
        match to {
            BookingStatus::Dispatched => self.dispatched_at = Some(now),
            BookingStatus::Arrived => self.arrived_at = Some(now),
            BookingStatus::Completed => self.completed_at = Some(now),
            BookingStatus::Cancelled => self.cancelled_at = Some(now),
            _ => {}
        }
        self.transition_log.push(TransitionRecord {
            from_status: from,
            to_status: to,
            timestamp: now,
            cause,
        });
        self.updated_at = now;
        Ok(())
    }

    /// Link a driver to this booking.
    ///
    /// # Errors
    ///
    /// Rejected on terminal bookings — resource links are frozen once a
    /// booking completes or is cancelled.
    pub fn assign_driver(
        &mut self,
        driver_id: DriverId,
        now: DateTime<Utc>,
    ) -> Result<(), StateError> {
        if self.status.is_terminal() {
            return Err(StateError::invalid(
                self.status,
                self.status,
                "cannot assign a driver to a terminal booking",
            ));
        }
        self.driver_id = Some(driver_id);
        self.updated_at = now;
        Ok(())
    }

    /// Link an ambulance to this booking.
    ///
    /// # Errors
    ///
    /// Rejected on terminal bookings, like [`Booking::assign_driver`].
    pub fn assign_ambulance(
        &mut self,
        ambulance_id: AmbulanceId,
        now: DateTime<Utc>,
    ) -> Result<(), StateError> {
        if self.status.is_terminal() {
            return Err(StateError::invalid(
                self.status,
                self.status,
                "cannot assign an ambulance to a terminal booking",
            ));
        }
        self.ambulance_id = Some(ambulance_id);
        self.updated_at = now;
        Ok(())
    }

    /// Record a cleared downpayment: flips the flag and arms the
    /// final-payment deadline.
    pub fn record_downpayment_paid(
        &mut self,
        final_payment_deadline: DateTime<Utc>,
        now: DateTime<Utc>,
    ) {
        self.is_downpayment_paid = true;
        self.final_payment_deadline = Some(final_payment_deadline);
        self.updated_at = now;
    }

    /// Record full settlement of the booking.
    pub fn record_fully_paid(&mut self, now: DateTime<Utc>) {
        self.is_downpayment_paid = true;
        self.is_fully_paid = true;
        self.updated_at = now;
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
