//! # Payment Deadline Tracker
//!
//! Pure classification of deadline breaches. Three rules apply
//! independently to a booking:
//!
//! 1. **Downpayment deadline** — `dp_payment_deadline` lapsed and the
//!    downpayment has not cleared.
//! 2. **Final-payment deadline** — `final_payment_deadline` lapsed and
//!    the booking is not fully paid. Armed only after the downpayment.
//! 3. **Payment-record expiry** — the booking's open pending payment
//!    attempt has its own `expires_at` in the past.
//!
//! A single booking can breach more than one rule at once (a lapsed
//! downpayment deadline usually coincides with an expired downpayment
//! invoice); the sweeper handles each breach idempotently, so reporting
//! both is harmless. Classification never mutates anything — the sweeper
//! re-validates every breach under the store's write lock before acting.

use chrono::{DateTime, Utc};

use siaga_core::PaymentId;
use siaga_state::{Booking, Payment};

/// One deadline rule a booking has breached at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeadlineBreach {
    /// The downpayment deadline lapsed before the downpayment cleared.
    DpDeadline,
    /// The final-payment deadline lapsed before full settlement.
    FinalDeadline,
    /// An open payment attempt expired before settlement.
    PaymentExpired(PaymentId),
}

/// Classify every deadline breach for `booking` at `now`.
///
/// `open_payment` is the booking's most recent pending payment attempt,
/// if any — the caller looks it up because classification stays pure.
/// Bookings no longer eligible for non-payment cancellation (dispatched,
/// terminal) never breach the booking-level rules, but their payment
/// records can still expire.
pub fn classify(
    booking: &Booking,
    open_payment: Option<&Payment>,
    now: DateTime<Utc>,
) -> Vec<DeadlineBreach> {
    let mut breaches = Vec::new();

    if booking.status.is_cancellable_for_non_payment() && !booking.is_fully_paid {
        if !booking.is_downpayment_paid
            && booking
                .dp_payment_deadline
                .is_some_and(|deadline| now > deadline)
        {
            breaches.push(DeadlineBreach::DpDeadline);
        }
        if booking
            .final_payment_deadline
            .is_some_and(|deadline| now > deadline)
        {
            breaches.push(DeadlineBreach::FinalDeadline);
        }
    }

    if let Some(payment) = open_payment {
        if payment.booking_id == booking.id && payment.is_expired(now) {
            breaches.push(DeadlineBreach::PaymentExpired(payment.id));
        }
    }

    breaches
}

// ─── Tests ───────────────────────────────────────────────────────────
