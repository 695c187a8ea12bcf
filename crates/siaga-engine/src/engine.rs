//! # The Lifecycle Engine
//!
//! Owns the stores, the sweep overlap lock, the notification
//! collaborator, and the optional Postgres write-through, and exposes
//! the operations that move bookings through their lifecycle:
//!
//! - [`LifecycleEngine::run_auto_cancellation_sweep`] — expire lapsed
//!   payment attempts and lapse the bookings that breached a deadline.
//! - [`LifecycleEngine::run_payment_reminder_sweep`] — emit payment
//!   reminders under the cool-down window.
//! - [`LifecycleEngine::apply_payment_settlement`] — gateway callback:
//!   settle a payment and advance the owning booking.
//! - [`LifecycleEngine::transition_booking`] — operator/user driven
//!   transitions, with resource release on terminal statuses.
//!
//! Sweeps never abort on a bad record: each booking and payment is
//! processed in isolation, failures are counted in the report, and the
//! batch continues.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use thiserror::Error;

use siaga_core::{BookingId, PaymentId};
use siaga_state::{
    Booking, BookingStatus, Payment, PaymentKind, ResourceStatus, StateError, TransitionCause,
};
use siaga_store::{db, StoreError, Stores, SweepLock};

use crate::config::EngineConfig;
use crate::deadline::{classify, DeadlineBreach};
use crate::notify::{NotificationEvent, Notifier};
use crate::release::{release_for_booking, ReleaseOutcome};
use crate::report::{ReminderReport, SweepReport};

// ─── Errors ──────────────────────────────────────────────────────────

/// Errors surfaced by the engine's request-driven operations. The
/// sweeps report failures instead of returning them.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The referenced record does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// A state machine rule rejected the operation.
    #[error(transparent)]
    State(#[from] StateError),
    /// Storage failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

// ─── The Engine ──────────────────────────────────────────────────────

/// The booking lifecycle engine.
///
/// Cheap to clone: the stores, lock, and notifier are all shared
/// handles, so the periodic runner and a request handler can drive the
/// same engine concurrently.
#[derive(Clone)]
pub struct LifecycleEngine {
    stores: Stores,
    sweep_lock: SweepLock,
    notifier: Arc<dyn Notifier>,
    pool: Option<PgPool>,
    config: EngineConfig,
}

impl LifecycleEngine {
    /// Create an engine over the given stores.
    pub fn new(
        stores: Stores,
        notifier: Arc<dyn Notifier>,
        pool: Option<PgPool>,
        config: EngineConfig,
    ) -> Self {
        Self {
            stores,
            sweep_lock: SweepLock::new(),
            notifier,
            pool,
            config,
        }
    }

    /// The underlying stores.
    pub fn stores(&self) -> &Stores {
        &self.stores
    }

    /// The engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn emit(&self, event: NotificationEvent) {
        if let Err(e) = self.notifier.notify(&event) {
            tracing::warn!(booking_id = %event.booking_id(), error = %e, "notification failed");
        }
    }

    // ─── Auto-cancellation sweep ─────────────────────────────────────

    /// Run one auto-cancellation sweep at `now`.
    ///
    /// For every booking still eligible for non-payment cancellation,
    /// classify its deadline breaches; expire breached payment attempts,
    /// then lapse the booking — emergencies go straight to `Cancelled`,
    /// scheduled bookings to `PaymentFailed`. Lapsed bookings get their
    /// resources released. A residual pass expires lapsed payment
    /// attempts whose bookings are past the cancellable stages.
    ///
    /// Idempotent: everything the first run changed is invisible to the
    /// second, so an immediate re-run reports zeros.
    pub async fn run_auto_cancellation_sweep(&self, now: DateTime<Utc>) -> SweepReport {
        let Some(_guard) = self.sweep_lock.try_auto_cancel() else {
            tracing::debug!("auto-cancellation sweep already in flight, skipping");
            return SweepReport::skipped();
        };

        let mut report = SweepReport {
            success: true,
            ..SweepReport::default()
        };

        for booking in self.stores.bookings.cancellation_candidates() {
            let open = self.stores.payments.latest_pending_for_booking(&booking.id);
            let breaches = classify(&booking, open.as_ref(), now);
            if breaches.is_empty() {
                continue;
            }

            for breach in &breaches {
                if let DeadlineBreach::PaymentExpired(payment_id) = breach {
                    self.expire_payment(booking.id, *payment_id, &mut report).await;
                }
            }

            self.lapse_booking(&booking, now, &mut report).await;
        }

        // Residual pass: expired attempts on bookings past the
        // cancellable stages (dispatched, terminal) still close out.
        for payment in self.stores.payments.expired_pending(now) {
            self.expire_payment(payment.booking_id, payment.id, &mut report)
                .await;
        }

        tracing::info!(
            cancelled = report.cancelled_count,
            payments_expired = report.payments_expired,
            resources_released = report.resources_released,
            failed = report.failed_count,
            "auto-cancellation sweep finished"
        );
        report
    }

    /// Mark one payment attempt expired, in memory and write-through.
    /// Losing the compare-and-set (already settled or already expired)
    /// is benign.
    async fn expire_payment(
        &self,
        booking_id: BookingId,
        payment_id: PaymentId,
        report: &mut SweepReport,
    ) {
        let result = self
            .stores
            .payments
            .try_update(&payment_id, |p| p.mark_expired());
        match result {
            Some(Ok(())) => {
                report.payments_expired += 1;
                self.emit(NotificationEvent::PaymentExpired {
                    booking_id,
                    payment_id,
                });
            }
            Some(Err(e)) => {
                tracing::debug!(payment_id = %payment_id, error = %e, "expiry lost the race");
                return;
            }
            None => {
                tracing::warn!(payment_id = %payment_id, "payment vanished mid-sweep");
                report.failed_count += 1;
                return;
            }
        }

        if let Some(pool) = &self.pool {
            match db::payments::expire_if_pending(pool, payment_id).await {
                Ok(true) => {}
                Ok(false) => {
                    tracing::debug!(payment_id = %payment_id, "payment row already closed");
                }
                Err(e) => {
                    tracing::warn!(payment_id = %payment_id, error = %e, "expiry write-through failed");
                    report.failed_count += 1;
                }
            }
        }
    }

    /// Lapse one booking that breached a deadline. Re-validated under
    /// the store's write lock: the transition table and the fully-paid
    /// guard are checked against the locked record, so a concurrent
    /// settlement or user cancellation simply wins.
    async fn lapse_booking(&self, booking: &Booking, now: DateTime<Utc>, report: &mut SweepReport) {
        let target = if booking.kind.is_emergency() {
            BookingStatus::Cancelled
        } else {
            BookingStatus::PaymentFailed
        };

        let result = self.stores.bookings.try_update(&booking.id, |b| {
            let from = b.status;
            b.try_transition(target, TransitionCause::NonPayment, now)?;
            Ok::<_, StateError>((from, b.clone()))
        });
        let (from, updated) = match result {
            Some(Ok(pair)) => pair,
            Some(Err(e)) => {
                tracing::debug!(booking_id = %booking.id, error = %e, "lapse lost the race");
                return;
            }
            None => {
                tracing::warn!(booking_id = %booking.id, "booking vanished mid-sweep");
                report.failed_count += 1;
                return;
            }
        };
        report.cancelled_count += 1;

        match target {
            BookingStatus::Cancelled => {
                self.emit(NotificationEvent::BookingCancelled {
                    booking_id: updated.id,
                });
            }
            _ => {
                self.emit(NotificationEvent::BookingPaymentFailed {
                    booking_id: updated.id,
                });
            }
        }

        // Either way the service will not proceed: free the crew.
        let outcome = release_for_booking(&self.stores.drivers, &self.stores.ambulances, &updated);
        report.resources_released +=
            u64::from(outcome.driver_released) + u64::from(outcome.ambulance_released);
        if let Err(e) = self.persist_release(&updated, outcome).await {
            tracing::warn!(booking_id = %updated.id, error = %e, "release write-through failed");
            report.failed_count += 1;
        }

        if let Err(e) = self.persist_booking_transition(from, &updated).await {
            tracing::warn!(booking_id = %updated.id, error = %e, "transition write-through failed");
            report.failed_count += 1;
        }
    }

    // ─── Reminder sweep ──────────────────────────────────────────────

    /// Run one payment-reminder sweep at `now`.
    ///
    /// Two rules:
    ///
    /// 1. **Unpaid emergencies** — emergency bookings whose crew has at
    ///    least arrived with an unsettled bill. If no pending payment
    ///    attempt exists, one is opened for the outstanding balance.
    /// 2. **Scheduled flows** — pending downpayment/final-payment
    ///    attempts on scheduled bookings still in `Scheduled` or
    ///    `Confirmed`.
    ///
    /// Each reminder is gated by the per-payment cool-down window;
    /// `force` bypasses the window (manual re-send) but never reminds a
    /// non-pending payment. The check-and-record runs under one write
    /// lock, so two overlapping sweeps cannot double-send.
    pub async fn run_payment_reminder_sweep(
        &self,
        now: DateTime<Utc>,
        force: bool,
    ) -> ReminderReport {
        let Some(_guard) = self.sweep_lock.try_reminder() else {
            tracing::debug!("reminder sweep already in flight, skipping");
            return ReminderReport::skipped();
        };

        let mut report = ReminderReport {
            success: true,
            ..ReminderReport::default()
        };

        // Rule 1: unpaid emergencies.
        for booking in self.stores.bookings.emergency_reminder_candidates() {
            if !booking.is_unpaid_emergency() {
                continue;
            }
            let payment = match self.stores.payments.latest_pending_for_booking(&booking.id) {
                Some(p) => p,
                None => match self.open_outstanding_payment(&booking, now).await {
                    Ok(p) => p,
                    Err(e) => {
                        tracing::warn!(booking_id = %booking.id, error = %e,
                            "failed to open payment for unpaid emergency");
                        report.failed_count += 1;
                        continue;
                    }
                },
            };
            self.send_reminder(&booking, &payment, now, force, true, &mut report)
                .await;
        }

        // Rule 2: scheduled flows.
        for payment in self.stores.payments.pending() {
            let Some(booking) = self.stores.bookings.get(&payment.booking_id) else {
                tracing::warn!(payment_id = %payment.id, booking_id = %payment.booking_id,
                    "pending payment references a missing booking");
                report.failed_count += 1;
                continue;
            };
            if booking.kind.is_emergency() || booking.is_fully_paid {
                continue;
            }
            if !matches!(
                booking.status,
                BookingStatus::Scheduled | BookingStatus::Confirmed
            ) {
                continue;
            }
            self.send_reminder(&booking, &payment, now, force, false, &mut report)
                .await;
        }

        tracing::info!(
            reminders_sent = report.reminders_sent,
            failed = report.failed_count,
            force,
            "reminder sweep finished"
        );
        report
    }

    /// Atomically check the cool-down and record the reminder, then
    /// notify and write through.
    async fn send_reminder(
        &self,
        booking: &Booking,
        payment: &Payment,
        now: DateTime<Utc>,
        force: bool,
        emergency: bool,
        report: &mut ReminderReport,
    ) {
        let cooldown = self.config.reminder_cooldown;
        let result = self.stores.payments.try_update(&payment.id, |p| {
            if p.is_reminder_due(now, cooldown, force) {
                p.record_reminder(now);
                Ok::<_, StateError>(Some(p.clone()))
            } else {
                Ok(None)
            }
        });
        let updated = match result {
            Some(Ok(Some(p))) => p,
            Some(Ok(None)) | Some(Err(_)) => return,
            None => {
                tracing::warn!(payment_id = %payment.id, "payment vanished mid-sweep");
                report.failed_count += 1;
                return;
            }
        };
        report.reminders_sent += 1;

        let event = if emergency {
            NotificationEvent::EmergencyPaymentReminder {
                booking_id: booking.id,
                payment_id: updated.id,
            }
        } else {
            NotificationEvent::PaymentReminder {
                booking_id: booking.id,
                payment_id: updated.id,
            }
        };
        self.emit(event);

        if let Some(pool) = &self.pool {
            if let Err(e) = db::payments::record_reminder(
                pool,
                updated.id,
                now,
                updated.reminder_count,
            )
            .await
            {
                tracing::warn!(payment_id = %updated.id, error = %e,
                    "reminder write-through failed");
                report.failed_count += 1;
            }
        }
    }

    /// Idempotently open a payment attempt for a booking's outstanding
    /// balance, with write-through for a newly created record.
    async fn open_outstanding_payment(
        &self,
        booking: &Booking,
        now: DateTime<Utc>,
    ) -> Result<Payment, StoreError> {
        let amount = if booking.is_downpayment_paid {
            booking.total_amount.final_payment()
        } else {
            booking.total_amount
        };
        let already_open = self
            .stores
            .payments
            .for_booking(&booking.id)
            .iter()
            .any(|p| p.kind == PaymentKind::FullPayment && p.status.is_open());
        let payment = self.stores.payments.open_payment(
            booking.id,
            PaymentKind::FullPayment,
            amount,
            None,
            now,
        );
        if !already_open {
            if let Some(pool) = &self.pool {
                db::payments::insert(pool, &payment).await?;
            }
        }
        Ok(payment)
    }

    // ─── Settlement ──────────────────────────────────────────────────

    /// Apply a gateway settlement callback for `payment_id` at `now`.
    ///
    /// Settles the payment (rejected if it already expired — a late
    /// callback never resurrects a closed attempt), then advances the
    /// owning booking:
    ///
    /// - **Downpayment**: flips the flag, arms the final-payment
    ///   deadline from [`EngineConfig::final_payment_window`], confirms
    ///   a `Scheduled` booking, and opens the final-payment attempt.
    /// - **Full payment**: marks the booking fully paid; a booking not
    ///   yet confirmed is confirmed.
    ///
    /// Returns the booking as it stands after the settlement.
    pub async fn apply_payment_settlement(
        &self,
        payment_id: PaymentId,
        now: DateTime<Utc>,
    ) -> Result<Booking, EngineError> {
        let result = self.stores.payments.try_update(&payment_id, |p| {
            p.mark_paid(now)?;
            Ok::<_, StateError>(p.clone())
        });
        let payment = match result {
            Some(Ok(p)) => p,
            Some(Err(e)) => return Err(e.into()),
            None => return Err(EngineError::NotFound(format!("payment {payment_id}"))),
        };

        if let Some(pool) = &self.pool {
            let won = db::payments::mark_paid_if_pending(pool, payment.id, now)
                .await
                .map_err(StoreError::from)?;
            if !won {
                tracing::debug!(payment_id = %payment.id, "payment row already closed");
            }
        }

        let final_deadline = now + self.config.final_payment_window;
        let result = self.stores.bookings.try_update(&payment.booking_id, |b| {
            let from = b.status;
            match payment.kind {
                PaymentKind::DownPayment => {
                    b.record_downpayment_paid(final_deadline, now);
                }
                PaymentKind::FullPayment => {
                    b.record_fully_paid(now);
                }
            }
            if matches!(
                b.status,
                BookingStatus::Pending | BookingStatus::Scheduled
            ) {
                b.try_transition(BookingStatus::Confirmed, TransitionCause::Operational, now)?;
            }
            Ok::<_, StateError>((from, b.clone()))
        });
        let (from, booking) = match result {
            Some(Ok(pair)) => pair,
            Some(Err(e)) => return Err(e.into()),
            None => {
                return Err(EngineError::NotFound(format!(
                    "booking {}",
                    payment.booking_id
                )))
            }
        };

        if let Some(pool) = &self.pool {
            db::bookings::update_payment_flags(pool, &booking)
                .await
                .map_err(StoreError::from)?;
            if booking.status != from {
                self.persist_booking_transition(from, &booking).await?;
            }
        }

        // The downpayment confirms the booking; the remainder gets its
        // own attempt, expiring with the final-payment deadline.
        if payment.kind == PaymentKind::DownPayment && !booking.is_fully_paid {
            let already_open = self
                .stores
                .payments
                .for_booking(&booking.id)
                .iter()
                .any(|p| p.kind == PaymentKind::FullPayment && p.status.is_open());
            let final_payment = self.stores.payments.open_payment(
                booking.id,
                PaymentKind::FullPayment,
                booking.total_amount.final_payment(),
                Some(final_deadline),
                now,
            );
            if !already_open {
                if let Some(pool) = &self.pool {
                    db::payments::insert(pool, &final_payment)
                        .await
                        .map_err(StoreError::from)?;
                }
            }
        }

        Ok(booking)
    }

    // ─── Operator/user transitions ───────────────────────────────────

    /// Apply a request-driven transition (dispatch, arrival, completion,
    /// user cancellation). Terminal statuses release the booking's
    /// resources and raise the matching notification.
    pub async fn transition_booking(
        &self,
        booking_id: BookingId,
        to: BookingStatus,
        cause: TransitionCause,
        now: DateTime<Utc>,
    ) -> Result<Booking, EngineError> {
        let result = self.stores.bookings.try_update(&booking_id, |b| {
            let from = b.status;
            b.try_transition(to, cause, now)?;
            Ok::<_, StateError>((from, b.clone()))
        });
        let (from, booking) = match result {
            Some(Ok(pair)) => pair,
            Some(Err(e)) => return Err(e.into()),
            None => return Err(EngineError::NotFound(format!("booking {booking_id}"))),
        };

        match booking.status {
            BookingStatus::Cancelled => self.emit(NotificationEvent::BookingCancelled {
                booking_id: booking.id,
            }),
            BookingStatus::Completed => self.emit(NotificationEvent::BookingCompleted {
                booking_id: booking.id,
            }),
            _ => {}
        }

        if booking.status.is_terminal() || booking.status == BookingStatus::PaymentFailed {
            let outcome =
                release_for_booking(&self.stores.drivers, &self.stores.ambulances, &booking);
            self.persist_release(&booking, outcome)
                .await
                .map_err(EngineError::Store)?;
        }

        self.persist_booking_transition(from, &booking)
            .await
            .map_err(EngineError::Store)?;

        Ok(booking)
    }

    // ─── Write-through helpers ───────────────────────────────────────

    async fn persist_booking_transition(
        &self,
        from: BookingStatus,
        booking: &Booking,
    ) -> Result<(), StoreError> {
        if let Some(pool) = &self.pool {
            let won = db::bookings::update_status_cas(pool, from, booking).await?;
            if !won {
                tracing::debug!(booking_id = %booking.id, from = %from,
                    "booking row already transitioned elsewhere");
            }
        }
        Ok(())
    }

    async fn persist_release(
        &self,
        booking: &Booking,
        outcome: ReleaseOutcome,
    ) -> Result<(), StoreError> {
        let Some(pool) = &self.pool else {
            return Ok(());
        };
        if outcome.driver_released {
            if let Some(driver_id) = booking.driver_id {
                db::resources::set_driver_status_if(
                    pool,
                    driver_id,
                    ResourceStatus::OnDuty,
                    ResourceStatus::Available,
                )
                .await?;
            }
        }
        if outcome.ambulance_released {
            if let Some(ambulance_id) = booking.ambulance_id {
                db::resources::set_ambulance_status_if(
                    pool,
                    ambulance_id,
                    ResourceStatus::OnDuty,
                    ResourceStatus::Available,
                )
                .await?;
            }
        }
        Ok(())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use siaga_core::{Money, UserId};
    use siaga_state::{Ambulance, Driver, Priority};

    use crate::notify::RecordingNotifier;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 22, 6, 0, 0).unwrap()
    }

    fn engine() -> (LifecycleEngine, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::new());
        let engine = LifecycleEngine::new(
            Stores::new(),
            notifier.clone(),
            None,
            EngineConfig::default(),
        );
        (engine, notifier)
    }

    fn seed_scheduled(engine: &LifecycleEngine) -> (Booking, Payment) {
        let booking = Booking::new_scheduled(
            "AMB-20260822-00001",
            UserId::new(),
            t0() + Duration::days(4),
            Money::from_minor(700_000),
            Money::from_minor(300_000),
            t0() + Duration::hours(24),
            t0(),
        )
        .unwrap();
        let payment = engine.stores().payments.open_payment(
            booking.id,
            PaymentKind::DownPayment,
            booking.downpayment_amount(),
            Some(t0() + Duration::hours(24)),
            t0(),
        );
        engine.stores().bookings.insert(booking.clone());
        (booking, payment)
    }

    fn seed_pending_emergency(engine: &LifecycleEngine) -> (Booking, Payment) {
        let mut booking = Booking::new_emergency(
            "AMB-20260822-00002",
            UserId::new(),
            Priority::Critical,
            Money::from_minor(500_000),
            Money::from_minor(150_000),
            t0(),
        )
        .unwrap();

        let mut driver = Driver::new("Budi");
        driver.status = ResourceStatus::OnDuty;
        booking.assign_driver(driver.id, t0()).unwrap();
        engine.stores().drivers.insert(driver);

        let mut ambulance = Ambulance::new("B 4412 AMB");
        ambulance.status = ResourceStatus::OnDuty;
        booking.assign_ambulance(ambulance.id, t0()).unwrap();
        engine.stores().ambulances.insert(ambulance);

        let payment = engine.stores().payments.open_payment(
            booking.id,
            PaymentKind::FullPayment,
            booking.total_amount,
            Some(t0() + Duration::hours(2)),
            t0(),
        );
        engine.stores().bookings.insert(booking.clone());
        (booking, payment)
    }

    // ── Auto-cancellation ─────────────────────────────────────────────

    #[tokio::test]
    async fn lapsed_downpayment_fails_scheduled_booking() {
        let (engine, notifier) = engine();
        let (booking, payment) = seed_scheduled(&engine);

        let report = engine
            .run_auto_cancellation_sweep(t0() + Duration::hours(25))
            .await;
        assert!(report.success);
        assert_eq!(report.cancelled_count, 1);
        assert_eq!(report.payments_expired, 1);
        assert_eq!(report.failed_count, 0);

        let after = engine.stores().bookings.get(&booking.id).unwrap();
        assert_eq!(after.status, BookingStatus::PaymentFailed);
        assert_eq!(
            engine.stores().payments.get(&payment.id).unwrap().status,
            siaga_state::PaymentStatus::Expired
        );

        let events = notifier.events();
        assert!(events.contains(&NotificationEvent::PaymentExpired {
            booking_id: booking.id,
            payment_id: payment.id,
        }));
        assert!(events.contains(&NotificationEvent::BookingPaymentFailed {
            booking_id: booking.id,
        }));
    }

    #[tokio::test]
    async fn sweep_is_idempotent() {
        let (engine, notifier) = engine();
        seed_scheduled(&engine);

        let now = t0() + Duration::hours(25);
        let first = engine.run_auto_cancellation_sweep(now).await;
        assert_eq!(first.cancelled_count, 1);
        let events_after_first = notifier.len();

        let second = engine.run_auto_cancellation_sweep(now).await;
        assert!(second.success);
        assert_eq!(second.cancelled_count, 0);
        assert_eq!(second.payments_expired, 0);
        assert_eq!(notifier.len(), events_after_first);
    }

    #[tokio::test]
    async fn expired_invoice_cancels_emergency_and_releases_resources() {
        let (engine, notifier) = engine();
        let (booking, payment) = seed_pending_emergency(&engine);

        let report = engine
            .run_auto_cancellation_sweep(t0() + Duration::hours(3))
            .await;
        assert_eq!(report.cancelled_count, 1);
        assert_eq!(report.payments_expired, 1);
        assert_eq!(report.resources_released, 2);

        let after = engine.stores().bookings.get(&booking.id).unwrap();
        assert_eq!(after.status, BookingStatus::Cancelled);
        // Links stay for history; the roster is freed.
        assert!(after.has_resource());
        let driver = engine.stores().drivers.get(&after.driver_id.unwrap()).unwrap();
        assert_eq!(driver.status, ResourceStatus::Available);
        let ambulance = engine
            .stores()
            .ambulances
            .get(&after.ambulance_id.unwrap())
            .unwrap();
        assert_eq!(ambulance.status, ResourceStatus::Available);

        assert!(notifier.events().contains(&NotificationEvent::PaymentExpired {
            booking_id: booking.id,
            payment_id: payment.id,
        }));
        assert!(notifier
            .events()
            .contains(&NotificationEvent::BookingCancelled {
                booking_id: booking.id,
            }));
    }

    #[tokio::test]
    async fn final_deadline_breach_fails_booking_and_frees_the_crew() {
        let (engine, _) = engine();
        let (booking, payment) = seed_scheduled(&engine);
        engine
            .apply_payment_settlement(payment.id, t0() + Duration::hours(1))
            .await
            .unwrap();

        let mut driver = Driver::new("Sari");
        driver.status = ResourceStatus::OnDuty;
        let driver_id = driver.id;
        engine.stores().drivers.insert(driver);
        engine
            .stores()
            .bookings
            .try_update(&booking.id, |b| b.assign_driver(driver_id, t0()))
            .unwrap()
            .unwrap();

        // Past the 72h final-payment window.
        let report = engine
            .run_auto_cancellation_sweep(t0() + Duration::hours(1) + Duration::hours(73))
            .await;
        assert_eq!(report.cancelled_count, 1);
        assert_eq!(report.resources_released, 1);

        let after = engine.stores().bookings.get(&booking.id).unwrap();
        assert_eq!(after.status, BookingStatus::PaymentFailed);
        assert_eq!(
            engine.stores().drivers.get(&driver_id).unwrap().status,
            ResourceStatus::Available
        );
    }

    #[tokio::test]
    async fn nothing_happens_before_the_deadline() {
        let (engine, notifier) = engine();
        let (booking, _) = seed_scheduled(&engine);

        let report = engine
            .run_auto_cancellation_sweep(t0() + Duration::hours(23))
            .await;
        assert!(report.success);
        assert_eq!(report.cancelled_count, 0);
        assert_eq!(report.payments_expired, 0);
        assert!(notifier.is_empty());
        assert_eq!(
            engine.stores().bookings.get(&booking.id).unwrap().status,
            BookingStatus::Scheduled
        );
    }

    #[tokio::test]
    async fn fully_paid_booking_is_untouchable() {
        let (engine, _) = engine();
        let (booking, payment) = seed_scheduled(&engine);
        engine
            .stores()
            .payments
            .try_update(&payment.id, |p| p.mark_paid(t0()))
            .unwrap()
            .unwrap();
        engine
            .stores()
            .bookings
            .try_update(&booking.id, |b| {
                b.record_fully_paid(t0());
                Ok::<_, StateError>(())
            })
            .unwrap()
            .unwrap();

        let report = engine
            .run_auto_cancellation_sweep(t0() + Duration::days(30))
            .await;
        assert_eq!(report.cancelled_count, 0);
        assert_eq!(
            engine.stores().bookings.get(&booking.id).unwrap().status,
            BookingStatus::Scheduled
        );
    }

    // ── Reminders ─────────────────────────────────────────────────────

    #[tokio::test]
    async fn reminder_respects_cooldown_and_force() {
        let (engine, notifier) = engine();
        let (booking, payment) = seed_scheduled(&engine);

        let first = engine.run_payment_reminder_sweep(t0(), false).await;
        assert_eq!(first.reminders_sent, 1);
        assert!(notifier.events().contains(&NotificationEvent::PaymentReminder {
            booking_id: booking.id,
            payment_id: payment.id,
        }));

        // One hour later: inside the 6h window.
        let second = engine
            .run_payment_reminder_sweep(t0() + Duration::hours(1), false)
            .await;
        assert_eq!(second.reminders_sent, 0);

        // Force bypasses the window.
        let forced = engine
            .run_payment_reminder_sweep(t0() + Duration::hours(1), true)
            .await;
        assert_eq!(forced.reminders_sent, 1);

        // Past the window, it flows again.
        let later = engine
            .run_payment_reminder_sweep(t0() + Duration::hours(8), false)
            .await;
        assert_eq!(later.reminders_sent, 1);

        assert_eq!(
            engine
                .stores()
                .payments
                .get(&payment.id)
                .unwrap()
                .reminder_count,
            3
        );
    }

    #[tokio::test]
    async fn unpaid_emergency_gets_a_payment_and_a_reminder() {
        let (engine, notifier) = engine();
        let mut booking = Booking::new_emergency(
            "AMB-20260822-00003",
            UserId::new(),
            Priority::Urgent,
            Money::from_minor(400_000),
            Money::from_minor(100_000),
            t0(),
        )
        .unwrap();
        for to in [
            BookingStatus::Confirmed,
            BookingStatus::Dispatched,
            BookingStatus::Arrived,
        ] {
            booking
                .try_transition(to, TransitionCause::Operational, t0())
                .unwrap();
        }
        engine.stores().bookings.insert(booking.clone());

        let report = engine.run_payment_reminder_sweep(t0(), false).await;
        assert_eq!(report.reminders_sent, 1);

        let opened = engine
            .stores()
            .payments
            .latest_pending_for_booking(&booking.id)
            .unwrap();
        assert_eq!(opened.kind, PaymentKind::FullPayment);
        assert_eq!(opened.amount.minor(), 500_000);
        assert!(notifier
            .events()
            .contains(&NotificationEvent::EmergencyPaymentReminder {
                booking_id: booking.id,
                payment_id: opened.id,
            }));

        // Settled emergencies stop reminding.
        engine
            .apply_payment_settlement(opened.id, t0() + Duration::hours(1))
            .await
            .unwrap();
        let quiet = engine
            .run_payment_reminder_sweep(t0() + Duration::days(1), true)
            .await;
        assert_eq!(quiet.reminders_sent, 0);
    }

    #[tokio::test]
    async fn paid_booking_gets_no_scheduled_reminder() {
        let (engine, _) = engine();
        let (_, payment) = seed_scheduled(&engine);
        engine
            .apply_payment_settlement(payment.id, t0() + Duration::hours(1))
            .await
            .unwrap();

        // The final-payment attempt is now pending; only it reminds.
        let report = engine
            .run_payment_reminder_sweep(t0() + Duration::hours(2), false)
            .await;
        assert_eq!(report.reminders_sent, 1);
    }

    // ── Settlement ────────────────────────────────────────────────────

    #[tokio::test]
    async fn downpayment_settlement_confirms_and_opens_final_payment() {
        let (engine, _) = engine();
        let (booking, payment) = seed_scheduled(&engine);

        let settled_at = t0() + Duration::hours(2);
        let after = engine
            .apply_payment_settlement(payment.id, settled_at)
            .await
            .unwrap();

        assert_eq!(after.status, BookingStatus::Confirmed);
        assert!(after.is_downpayment_paid);
        assert!(!after.is_fully_paid);
        assert_eq!(
            after.final_payment_deadline,
            Some(settled_at + Duration::hours(72))
        );

        let attempts = engine.stores().payments.for_booking(&booking.id);
        assert_eq!(attempts.len(), 2);
        let final_payment = attempts
            .iter()
            .find(|p| p.kind == PaymentKind::FullPayment)
            .unwrap();
        // 1_000_000 total, 300_000 downpayment.
        assert_eq!(final_payment.amount.minor(), 700_000);
        assert_eq!(
            final_payment.expires_at,
            Some(settled_at + Duration::hours(72))
        );
    }

    #[tokio::test]
    async fn full_settlement_immunizes_against_the_sweep() {
        let (engine, _) = engine();
        let (booking, payment) = seed_scheduled(&engine);

        engine
            .apply_payment_settlement(payment.id, t0() + Duration::hours(1))
            .await
            .unwrap();
        let final_payment = engine
            .stores()
            .payments
            .latest_pending_for_booking(&booking.id)
            .unwrap();
        let after = engine
            .apply_payment_settlement(final_payment.id, t0() + Duration::hours(2))
            .await
            .unwrap();
        assert!(after.is_fully_paid);

        let report = engine
            .run_auto_cancellation_sweep(t0() + Duration::days(30))
            .await;
        assert_eq!(report.cancelled_count, 0);
        assert_eq!(
            engine.stores().bookings.get(&booking.id).unwrap().status,
            BookingStatus::Confirmed
        );
    }

    #[tokio::test]
    async fn late_callback_after_expiry_is_rejected() {
        let (engine, _) = engine();
        let (booking, payment) = seed_scheduled(&engine);

        engine
            .run_auto_cancellation_sweep(t0() + Duration::hours(25))
            .await;

        let err = engine
            .apply_payment_settlement(payment.id, t0() + Duration::hours(26))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::State(_)));
        assert_eq!(
            engine.stores().bookings.get(&booking.id).unwrap().status,
            BookingStatus::PaymentFailed
        );
    }

    #[tokio::test]
    async fn settling_unknown_payment_is_not_found() {
        let (engine, _) = engine();
        let err = engine
            .apply_payment_settlement(PaymentId::new(), t0())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    // ── Operator transitions ──────────────────────────────────────────

    #[tokio::test]
    async fn completion_releases_resources_and_notifies() {
        let (engine, notifier) = engine();
        let (booking, payment) = seed_pending_emergency(&engine);
        engine
            .apply_payment_settlement(payment.id, t0())
            .await
            .unwrap();

        for to in [
            BookingStatus::Dispatched,
            BookingStatus::Arrived,
            BookingStatus::Completed,
        ] {
            engine
                .transition_booking(booking.id, to, TransitionCause::Operational, t0())
                .await
                .unwrap();
        }

        let after = engine.stores().bookings.get(&booking.id).unwrap();
        assert_eq!(after.status, BookingStatus::Completed);
        let driver = engine.stores().drivers.get(&after.driver_id.unwrap()).unwrap();
        assert_eq!(driver.status, ResourceStatus::Available);
        assert!(notifier
            .events()
            .contains(&NotificationEvent::BookingCompleted {
                booking_id: booking.id,
            }));
    }

    #[tokio::test]
    async fn invalid_operator_transition_is_rejected() {
        let (engine, _) = engine();
        let (booking, _) = seed_scheduled(&engine);
        let err = engine
            .transition_booking(
                booking.id,
                BookingStatus::Dispatched,
                TransitionCause::Operational,
                t0(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::State(_)));
    }
}
