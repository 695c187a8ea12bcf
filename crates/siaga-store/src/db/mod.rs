//! # Postgres Write-Through
//!
//! The database layer is **optional**. When `DATABASE_URL` is set, every
//! booking transition, payment status change, and resource release is
//! written through to PostgreSQL, and the in-memory stores are hydrated
//! from it on startup. When absent, the engine operates in
//! in-memory-only mode (suitable for development and testing).
//!
//! State machine constraints are enforced at the application layer; the
//! SQL layer contributes the conditional updates
//! (`UPDATE ... WHERE status = $expected`) whose `rows_affected` tells a
//! sweep whether it won the compare-and-set or should skip the record.

pub mod bookings;
pub mod payments;
pub mod resources;

use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::stores::Stores;
use crate::StoreError;

/// Initialize the database connection pool and run migrations.
///
/// Returns `None` if `DATABASE_URL` is not set (in-memory-only mode).
/// Returns `Err` if the URL is set but the connection or migration fails.
pub async fn init_pool() -> Result<Option<PgPool>, sqlx::Error> {
    let url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            tracing::warn!(
                "DATABASE_URL not set — running in-memory only mode. \
                 State will not survive restarts."
            );
            return Ok(None);
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(&url)
        .await?;

    tracing::info!("Connected to PostgreSQL");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    Ok(Some(pool))
}

/// Load all persisted records into the in-memory stores on startup.
///
/// Rows that fail to decode are logged and skipped — one corrupt row
/// must not prevent the rest of the fleet from loading.
pub async fn hydrate(stores: &Stores, pool: &PgPool) -> Result<(), StoreError> {
    let bookings = bookings::load_all(pool).await?;
    let booking_count = bookings.len();
    for b in bookings {
        stores.bookings.insert(b);
    }

    let payments = payments::load_all(pool).await?;
    let payment_count = payments.len();
    for p in payments {
        stores.payments.insert(p);
    }

    let drivers = resources::load_all_drivers(pool).await?;
    let driver_count = drivers.len();
    for d in drivers {
        stores.drivers.insert(d);
    }

    let ambulances = resources::load_all_ambulances(pool).await?;
    let ambulance_count = ambulances.len();
    for a in ambulances {
        stores.ambulances.insert(a);
    }

    tracing::info!(
        bookings = booking_count,
        payments = payment_count,
        drivers = driver_count,
        ambulances = ambulance_count,
        "Hydrated in-memory stores from database"
    );
    Ok(())
}
