//! `siaga run` — the periodic runner.

use clap::Args;
use tokio::sync::watch;

use siaga_engine::{runner, LifecycleEngine};

/// Arguments for the `run` subcommand.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Seconds between sweep ticks.
    #[arg(long, default_value_t = 60)]
    pub interval_secs: u64,
}

/// Drive both sweeps on an interval until Ctrl-C.
pub async fn run_runner(args: &RunArgs, engine: &LifecycleEngine) -> anyhow::Result<u8> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let handle = tokio::spawn(runner::run_periodic(
        engine.clone(),
        std::time::Duration::from_secs(args.interval_secs),
        shutdown_rx,
    ));

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received");
    shutdown_tx.send(true)?;
    handle.await?;

    Ok(0)
}
