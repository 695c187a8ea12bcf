//! `siaga seed` — demo data for local development.
//!
//! Seeds a small fleet plus one emergency and one scheduled booking with
//! their opening payment attempts, written through to the database when
//! one is configured. The deadlines are short so the sweeps have
//! something to chew on within a development session.

use anyhow::Context;
use chrono::{Duration, Utc};
use clap::Args;
use sqlx::PgPool;

use siaga_core::{Money, UserId};
use siaga_engine::LifecycleEngine;
use siaga_state::{Ambulance, Booking, Driver, PaymentKind, Priority};
use siaga_store::db;

use crate::print_report;

/// Arguments for the `seed` subcommand.
#[derive(Args, Debug)]
pub struct SeedArgs {
    /// How many drivers and ambulances to create.
    #[arg(long, default_value_t = 3)]
    pub fleet_size: u32,

    /// Hours until the scheduled booking's downpayment deadline.
    #[arg(long, default_value_t = 1)]
    pub dp_deadline_hours: i64,
}

/// Seed the stores (and the database, when configured).
pub async fn run_seed(
    args: &SeedArgs,
    engine: &LifecycleEngine,
    pool: Option<&PgPool>,
) -> anyhow::Result<u8> {
    let now = Utc::now();
    let stores = engine.stores();

    for n in 1..=args.fleet_size {
        let driver = Driver::new(format!("Driver {n:02}"));
        if let Some(pool) = pool {
            db::resources::insert_driver(pool, &driver)
                .await
                .context("failed to persist seeded driver")?;
        }
        stores.drivers.insert(driver);

        let ambulance = Ambulance::new(format!("B {:04} AMB", 7000 + n));
        if let Some(pool) = pool {
            db::resources::insert_ambulance(pool, &ambulance)
                .await
                .context("failed to persist seeded ambulance")?;
        }
        stores.ambulances.insert(ambulance);
    }

    let stamp = now.format("%Y%m%d");

    let emergency = Booking::new_emergency(
        format!("AMB-{stamp}-00001"),
        UserId::new(),
        Priority::Urgent,
        Money::from_minor(500_000),
        Money::from_minor(150_000),
        now,
    )?;
    let emergency_invoice = stores.payments.open_payment(
        emergency.id,
        PaymentKind::FullPayment,
        emergency.total_amount,
        Some(now + Duration::hours(args.dp_deadline_hours)),
        now,
    );
    if let Some(pool) = pool {
        db::bookings::insert(pool, &emergency)
            .await
            .context("failed to persist seeded emergency booking")?;
        db::payments::insert(pool, &emergency_invoice)
            .await
            .context("failed to persist seeded emergency invoice")?;
    }
    stores.bookings.insert(emergency.clone());

    let scheduled = Booking::new_scheduled(
        format!("AMB-{stamp}-00002"),
        UserId::new(),
        now + Duration::days(2),
        Money::from_minor(700_000),
        Money::from_minor(300_000),
        now + Duration::hours(args.dp_deadline_hours),
        now,
    )?;
    let downpayment = stores.payments.open_payment(
        scheduled.id,
        PaymentKind::DownPayment,
        scheduled.downpayment_amount(),
        Some(now + Duration::hours(args.dp_deadline_hours)),
        now,
    );
    if let Some(pool) = pool {
        db::bookings::insert(pool, &scheduled)
            .await
            .context("failed to persist seeded scheduled booking")?;
        db::payments::insert(pool, &downpayment)
            .await
            .context("failed to persist seeded downpayment")?;
    }
    stores.bookings.insert(scheduled.clone());

    print_report(&serde_json::json!({
        "fleet_size": args.fleet_size,
        "emergency_booking": emergency.id,
        "emergency_invoice": emergency_invoice.id,
        "scheduled_booking": scheduled.id,
        "downpayment": downpayment.id,
        "dp_deadline": scheduled.dp_payment_deadline,
    }))?;
    Ok(0)
}
