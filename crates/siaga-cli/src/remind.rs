//! `siaga remind` — run one payment-reminder sweep.

use chrono::Utc;
use clap::Args;

use siaga_engine::LifecycleEngine;

use crate::print_report;

/// Arguments for the `remind` subcommand.
#[derive(Args, Debug)]
pub struct RemindArgs {
    /// Send reminders even inside the cool-down window.
    #[arg(long)]
    pub force: bool,
}

/// Run one reminder sweep and print the report.
pub async fn run_remind(args: &RemindArgs, engine: &LifecycleEngine) -> anyhow::Result<u8> {
    let report = engine.run_payment_reminder_sweep(Utc::now(), args.force).await;
    print_report(&report)?;
    Ok(if report.success { 0 } else { 1 })
}
