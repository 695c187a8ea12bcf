//! Sweep run reports.
//!
//! Every sweep returns a report instead of a bare `Result`: entity
//! failures are counted, not propagated, so a partially failed run is
//! still a successful run of the sweep itself.

use serde::Serialize;

/// Outcome of one auto-cancellation sweep run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Whether the run itself completed (candidate scan succeeded).
    pub success: bool,
    /// Whether the run was skipped because another was in flight.
    pub skipped: bool,
    /// Bookings moved to `Cancelled` or `PaymentFailed`.
    pub cancelled_count: u64,
    /// Payment attempts marked `Expired`.
    pub payments_expired: u64,
    /// Drivers and ambulances returned to the pool.
    pub resources_released: u64,
    /// Entities that errored and were skipped.
    pub failed_count: u64,
    /// Query-stage error that aborted the run, if any.
    pub error: Option<String>,
}

impl SweepReport {
    /// Report for a run that was skipped due to overlap.
    pub fn skipped() -> Self {
        Self {
            success: true,
            skipped: true,
            ..Self::default()
        }
    }
}

/// Outcome of one payment-reminder sweep run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReminderReport {
    /// Whether the run itself completed.
    pub success: bool,
    /// Whether the run was skipped because another was in flight.
    pub skipped: bool,
    /// Reminders actually emitted.
    pub reminders_sent: u64,
    /// Entities that errored and were skipped.
    pub failed_count: u64,
    /// Query-stage error that aborted the run, if any.
    pub error: Option<String>,
}

impl ReminderReport {
    /// Report for a run that was skipped due to overlap.
    pub fn skipped() -> Self {
        Self {
            success: true,
            skipped: true,
            ..Self::default()
        }
    }
}
