//! # Periodic Sweep Runner
//!
//! Drives both sweeps on a fixed tokio interval until shutdown is
//! signalled. The overlap lock inside the engine makes a slow sweep and
//! the next tick safe; missed ticks are skipped rather than bursted.

use chrono::Utc;
use tokio::sync::watch;
use tokio::time::{interval, Duration, MissedTickBehavior};

use crate::engine::LifecycleEngine;

/// Run the auto-cancellation and reminder sweeps every `period` until
/// `shutdown` flips to `true`.
pub async fn run_periodic(
    engine: LifecycleEngine,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tracing::info!(period_secs = period.as_secs(), "periodic sweeps started");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let now = Utc::now();
                let sweep = engine.run_auto_cancellation_sweep(now).await;
                if !sweep.skipped {
                    tracing::debug!(?sweep, "auto-cancellation tick");
                }
                let reminders = engine.run_payment_reminder_sweep(now, false).await;
                if !reminders.skipped {
                    tracing::debug!(?reminders, "reminder tick");
                }
            }
            result = shutdown.changed() => {
                if result.is_err() || *shutdown.borrow() {
                    tracing::info!("periodic sweeps stopping");
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::{Duration as ChronoDuration, TimeZone};
    use siaga_core::{Money, UserId};
    use siaga_state::{Booking, BookingStatus};
    use siaga_store::Stores;

    use crate::config::EngineConfig;
    use crate::notify::RecordingNotifier;

    #[tokio::test]
    async fn runner_sweeps_and_stops_on_shutdown() {
        let t0 = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let stores = Stores::new();
        // A long-lapsed scheduled booking: the first tick must fail it.
        let booking = Booking::new_scheduled(
            "AMB-20200101-00001",
            UserId::new(),
            t0 + ChronoDuration::days(1),
            Money::from_minor(100),
            Money::from_minor(0),
            t0 + ChronoDuration::hours(1),
            t0,
        )
        .unwrap();
        let booking_id = booking.id;
        stores.bookings.insert(booking);

        let engine = LifecycleEngine::new(
            stores,
            Arc::new(RecordingNotifier::new()),
            None,
            EngineConfig::default(),
        );

        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(run_periodic(
            engine.clone(),
            Duration::from_millis(10),
            rx,
        ));

        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(true).unwrap();
        handle.await.unwrap();

        assert_eq!(
            engine.stores().bookings.get(&booking_id).unwrap().status,
            BookingStatus::PaymentFailed
        );
    }
}
