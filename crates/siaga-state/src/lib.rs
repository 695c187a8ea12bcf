//! # siaga-state — Booking Lifecycle State Machine
//!
//! Domain entities and the runtime-checked state machines of the SIAGA
//! booking engine. State names are enums, not strings — an unknown status
//! cannot be represented, and every transition is validated against an
//! explicit table before any field is mutated.
//!
//! ## State Machines
//!
//! - **Booking** (`booking.rs`):
//!   `Pending/Scheduled → Confirmed → Dispatched → Arrived → Completed`
//!   with `Cancelled` and `PaymentFailed` branches. `Completed` and
//!   `Cancelled` are terminal — a terminal booking rejects every further
//!   transition and leaves all fields unchanged.
//!
//! - **Payment** (`payment.rs`): `Pending → Paid | Failed | Expired`.
//!   A gateway callback may mark a payment `Paid` at any time while it
//!   is `Pending`; the deadline sweep marks it `Expired` instead.
//!
//! - **Resource** (`resource.rs`): driver/ambulance availability
//!   (`Available`, `OnDuty`, `Maintenance`, `Inactive`). Release targets
//!   `Available` only and never overrides the manual `Maintenance` and
//!   `Inactive` workflows.
//!
//! ## Design
//!
//! Transitions are rejected *before* mutation: a failed
//! [`Booking::try_transition`] is guaranteed to leave the record
//! byte-identical to its pre-call state. Every accepted transition is
//! appended to the booking's [`TransitionRecord`] log, giving operators
//! an audit trail of how a booking reached its current status.

pub mod booking;
pub mod payment;
pub mod resource;

// ─── Booking re-exports ─────────────────────────────────────────────

pub use booking::{
    Booking, BookingKind, BookingStatus, Priority, StateError, TransitionCause, TransitionRecord,
};

// ─── Payment re-exports ─────────────────────────────────────────────

pub use payment::{Payment, PaymentKind, PaymentStatus};

// ─── Resource re-exports ────────────────────────────────────────────

pub use resource::{Ambulance, Driver, ResourceStatus};
