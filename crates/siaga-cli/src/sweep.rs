//! `siaga sweep` — run one auto-cancellation sweep.

use chrono::Utc;
use clap::Args;

use siaga_engine::LifecycleEngine;

use crate::print_report;

/// Arguments for the `sweep` subcommand.
#[derive(Args, Debug)]
pub struct SweepArgs {}

/// Run one auto-cancellation sweep and print the report.
pub async fn run_sweep(_args: &SweepArgs, engine: &LifecycleEngine) -> anyhow::Result<u8> {
    let report = engine.run_auto_cancellation_sweep(Utc::now()).await;
    print_report(&report)?;
    Ok(if report.success { 0 } else { 1 })
}
