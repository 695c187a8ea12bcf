//! # siaga-cli — Command-Line Interface
//!
//! Provides the `siaga` binary for operating the booking lifecycle
//! engine:
//!
//! - `siaga sweep` — one auto-cancellation sweep, report on stdout.
//! - `siaga remind` — one payment-reminder sweep (`--force` bypasses
//!   the cool-down window).
//! - `siaga run` — the periodic runner, both sweeps on an interval
//!   until Ctrl-C.
//! - `siaga seed` — demo fleet and bookings for local development.
//!
//! All commands connect to PostgreSQL when `DATABASE_URL` is set and
//! hydrate the in-memory stores from it; without it they operate on an
//! empty in-memory state (mostly useful with `seed` piped into `run`
//! in one process, or for smoke-testing the wiring).

pub mod remind;
pub mod run;
pub mod seed;
pub mod sweep;

use std::sync::Arc;

use anyhow::Context;
use sqlx::PgPool;

use siaga_engine::{EngineConfig, LifecycleEngine, LogNotifier};
use siaga_store::{db, Stores};

/// Build the engine: optional pool, hydration, config from env.
pub async fn init_engine() -> anyhow::Result<(LifecycleEngine, Option<PgPool>)> {
    let pool = db::init_pool()
        .await
        .context("failed to initialize database pool")?;

    let stores = Stores::new();
    if let Some(pool) = &pool {
        db::hydrate(&stores, pool)
            .await
            .context("failed to hydrate stores from database")?;
    }

    let engine = LifecycleEngine::new(
        stores,
        Arc::new(LogNotifier),
        pool.clone(),
        EngineConfig::from_env(),
    );
    Ok((engine, pool))
}

/// Pretty-print a report as JSON on stdout.
pub fn print_report<T: serde::Serialize>(report: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(report).context("failed to serialize report")?;
    println!("{json}");
    Ok(())
}
