//! # Typed Domain Stores
//!
//! Thin typed wrappers over [`Store`](crate::store::Store) exposing the
//! query shapes the lifecycle engine needs — find-candidates-for-
//! cancellation, find-expired-pending-payments, find-bookings-awaiting-
//! reminder — plus the idempotent payment-creation rule.

use chrono::{DateTime, Utc};

use siaga_core::{AmbulanceId, BookingId, DriverId, Money, PaymentId};
use siaga_state::{
    Ambulance, Booking, BookingStatus, Driver, Payment, PaymentKind, PaymentStatus,
};

use crate::store::Store;

// ─── Bookings ────────────────────────────────────────────────────────

/// Store of bookings keyed by [`BookingId`].
#[derive(Debug, Clone, Default)]
pub struct BookingStore {
    inner: Store<BookingId, Booking>,
}

impl BookingStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a booking, returning the previous record if the id existed.
    pub fn insert(&self, booking: Booking) -> Option<Booking> {
        self.inner.insert(booking.id, booking)
    }

    /// Fetch a booking by id.
    pub fn get(&self, id: &BookingId) -> Option<Booking> {
        self.inner.get(id)
    }

    /// List all bookings.
    pub fn list(&self) -> Vec<Booking> {
        self.inner.list()
    }

    /// Number of bookings.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Atomically read-validate-update a booking under one write lock.
    /// This is the compare-and-set entry point for status transitions.
    pub fn try_update<R, E>(
        &self,
        id: &BookingId,
        f: impl FnOnce(&mut Booking) -> Result<R, E>,
    ) -> Option<Result<R, E>> {
        self.inner.try_update(id, f)
    }

    /// Bookings still eligible for non-payment cancellation:
    /// `Pending`, `Scheduled`, or `Confirmed`. Dispatched and later
    /// stages never appear here.
    pub fn cancellation_candidates(&self) -> Vec<Booking> {
        self.inner
            .filter(|b| b.status.is_cancellable_for_non_payment())
    }

    /// Emergency bookings whose crew has at least arrived — the
    /// population the emergency payment-reminder rule scans.
    pub fn emergency_reminder_candidates(&self) -> Vec<Booking> {
        self.inner.filter(|b| {
            b.kind.is_emergency()
                && matches!(b.status, BookingStatus::Arrived | BookingStatus::Completed)
        })
    }
}

// ─── Payments ────────────────────────────────────────────────────────

/// Store of payment attempts keyed by [`PaymentId`].
#[derive(Debug, Clone, Default)]
pub struct PaymentStore {
    inner: Store<PaymentId, Payment>,
}

impl PaymentStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a payment record directly (hydration path).
    pub fn insert(&self, payment: Payment) -> Option<Payment> {
        self.inner.insert(payment.id, payment)
    }

    /// Fetch a payment by id.
    pub fn get(&self, id: &PaymentId) -> Option<Payment> {
        self.inner.get(id)
    }

    /// List all payments.
    pub fn list(&self) -> Vec<Payment> {
        self.inner.list()
    }

    /// Atomically read-validate-update a payment under one write lock.
    /// The reminder cool-down check-and-record and the expiry
    /// compare-and-set both go through here.
    pub fn try_update<R, E>(
        &self,
        id: &PaymentId,
        f: impl FnOnce(&mut Payment) -> Result<R, E>,
    ) -> Option<Result<R, E>> {
        self.inner.try_update(id, f)
    }

    /// Idempotently open a payment attempt.
    ///
    /// At most one open (`Pending` or `Paid`) payment of a given kind
    /// may exist per booking: if one already does, it is returned
    /// unchanged instead of creating a duplicate invoice.
    pub fn open_payment(
        &self,
        booking_id: BookingId,
        kind: PaymentKind,
        amount: Money,
        expires_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Payment {
        if let Some(existing) = self
            .inner
            .filter(|p| p.booking_id == booking_id && p.kind == kind && p.status.is_open())
            .into_iter()
            .next()
        {
            return existing;
        }
        let payment = Payment::new(booking_id, kind, amount, expires_at, now);
        self.inner.insert(payment.id, payment.clone());
        payment
    }

    /// All payment attempts for a booking, oldest first.
    pub fn for_booking(&self, booking_id: &BookingId) -> Vec<Payment> {
        let mut payments = self.inner.filter(|p| p.booking_id == *booking_id);
        payments.sort_by_key(|p| p.created_at);
        payments
    }

    /// The most recent pending attempt for a booking, if any. Earlier
    /// attempts are already terminal and no longer matter.
    pub fn latest_pending_for_booking(&self, booking_id: &BookingId) -> Option<Payment> {
        self.inner
            .filter(|p| p.booking_id == *booking_id && p.status == PaymentStatus::Pending)
            .into_iter()
            .max_by_key(|p| p.created_at)
    }

    /// Pending payments whose `expires_at` has lapsed at `now`.
    pub fn expired_pending(&self, now: DateTime<Utc>) -> Vec<Payment> {
        self.inner.filter(|p| p.is_expired(now))
    }

    /// Pending payments, for the scheduled-booking reminder rule
    /// (keyed by payment id — the engine filters by booking status).
    pub fn pending(&self) -> Vec<Payment> {
        self.inner.filter(|p| p.status == PaymentStatus::Pending)
    }
}

// ─── Resources ───────────────────────────────────────────────────────

/// Store of drivers keyed by [`DriverId`].
#[derive(Debug, Clone, Default)]
pub struct DriverStore {
    inner: Store<DriverId, Driver>,
}

impl DriverStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a driver.
    pub fn insert(&self, driver: Driver) -> Option<Driver> {
        self.inner.insert(driver.id, driver)
    }

    /// Fetch a driver by id.
    pub fn get(&self, id: &DriverId) -> Option<Driver> {
        self.inner.get(id)
    }

    /// List all drivers.
    pub fn list(&self) -> Vec<Driver> {
        self.inner.list()
    }

    /// Update a driver in place. `None` when the record is missing.
    pub fn update(&self, id: &DriverId, f: impl FnOnce(&mut Driver)) -> Option<Driver> {
        self.inner.update(id, f)
    }
}

/// Store of ambulances keyed by [`AmbulanceId`].
#[derive(Debug, Clone, Default)]
pub struct AmbulanceStore {
    inner: Store<AmbulanceId, Ambulance>,
}

impl AmbulanceStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an ambulance.
    pub fn insert(&self, ambulance: Ambulance) -> Option<Ambulance> {
        self.inner.insert(ambulance.id, ambulance)
    }

    /// Fetch an ambulance by id.
    pub fn get(&self, id: &AmbulanceId) -> Option<Ambulance> {
        self.inner.get(id)
    }

    /// List all ambulances.
    pub fn list(&self) -> Vec<Ambulance> {
        self.inner.list()
    }

    /// Update an ambulance in place. `None` when the record is missing.
    pub fn update(&self, id: &AmbulanceId, f: impl FnOnce(&mut Ambulance)) -> Option<Ambulance> {
        self.inner.update(id, f)
    }
}

// ─── Aggregate ───────────────────────────────────────────────────────

/// All domain stores, cloned cheaply (each clone shares the same maps).
#[derive(Debug, Clone, Default)]
pub struct Stores {
    /// Bookings.
    pub bookings: BookingStore,
    /// Payment attempts.
    pub payments: PaymentStore,
    /// Drivers.
    pub drivers: DriverStore,
    /// Ambulances.
    pub ambulances: AmbulanceStore,
}

impl Stores {
    /// Create a fresh, empty set of stores.
    pub fn new() -> Self {
        Self::default()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use siaga_core::UserId;
    use siaga_state::{Priority, TransitionCause};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 20, 8, 0, 0).unwrap()
    }

    fn emergency_booking() -> Booking {
        Booking::new_emergency(
            "AMB-1",
            UserId::new(),
            Priority::Normal,
            Money::from_minor(100),
            Money::from_minor(0),
            t0(),
        )
        .unwrap()
    }

    #[test]
    fn cancellation_candidates_exclude_dispatched_and_terminal() {
        let store = BookingStore::new();

        let pending = emergency_booking();
        let pending_id = pending.id;
        store.insert(pending);

        let mut dispatched = emergency_booking();
        dispatched
            .try_transition(BookingStatus::Confirmed, TransitionCause::Operational, t0())
            .unwrap();
        dispatched
            .try_transition(BookingStatus::Dispatched, TransitionCause::Operational, t0())
            .unwrap();
        store.insert(dispatched);

        let mut cancelled = emergency_booking();
        cancelled
            .try_transition(BookingStatus::Cancelled, TransitionCause::UserRequest, t0())
            .unwrap();
        store.insert(cancelled);

        let candidates = store.cancellation_candidates();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].id, pending_id);
    }

    #[test]
    fn open_payment_is_idempotent_per_kind() {
        let store = PaymentStore::new();
        let booking_id = BookingId::new();

        let first = store.open_payment(
            booking_id,
            PaymentKind::DownPayment,
            Money::from_minor(300),
            None,
            t0(),
        );
        let second = store.open_payment(
            booking_id,
            PaymentKind::DownPayment,
            Money::from_minor(999),
            None,
            t0(),
        );
        assert_eq!(first.id, second.id);
        assert_eq!(second.amount.minor(), 300);

        // A different kind opens its own slot.
        let full = store.open_payment(
            booking_id,
            PaymentKind::FullPayment,
            Money::from_minor(700),
            None,
            t0(),
        );
        assert_ne!(full.id, first.id);
        assert_eq!(store.for_booking(&booking_id).len(), 2);
    }

    #[test]
    fn expired_slot_reopens() {
        let store = PaymentStore::new();
        let booking_id = BookingId::new();

        let first = store.open_payment(
            booking_id,
            PaymentKind::FullPayment,
            Money::from_minor(500),
            Some(t0()),
            t0(),
        );
        store
            .try_update(&first.id, |p| p.mark_expired())
            .unwrap()
            .unwrap();

        let replacement = store.open_payment(
            booking_id,
            PaymentKind::FullPayment,
            Money::from_minor(500),
            None,
            t0() + chrono::Duration::hours(1),
        );
        assert_ne!(replacement.id, first.id);
    }

    #[test]
    fn latest_pending_picks_most_recent() {
        let store = PaymentStore::new();
        let booking_id = BookingId::new();

        let old = store.open_payment(
            booking_id,
            PaymentKind::DownPayment,
            Money::from_minor(1),
            None,
            t0(),
        );
        store
            .try_update(&old.id, |p| p.mark_expired())
            .unwrap()
            .unwrap();
        let newer = store.open_payment(
            booking_id,
            PaymentKind::DownPayment,
            Money::from_minor(1),
            None,
            t0() + chrono::Duration::hours(2),
        );

        let latest = store.latest_pending_for_booking(&booking_id).unwrap();
        assert_eq!(latest.id, newer.id);
    }
}
