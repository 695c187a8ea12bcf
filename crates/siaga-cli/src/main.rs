//! # siaga CLI entry point
//!
//! Parses command-line arguments, initializes tracing and the engine,
//! and dispatches to the subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use siaga_cli::remind::{run_remind, RemindArgs};
use siaga_cli::run::{run_runner, RunArgs};
use siaga_cli::seed::{run_seed, SeedArgs};
use siaga_cli::sweep::{run_sweep, SweepArgs};

/// SIAGA booking lifecycle engine.
///
/// Deadline sweeps, payment reminders, and the periodic runner for the
/// ambulance booking portal. Connects to PostgreSQL via `DATABASE_URL`
/// when set; otherwise operates on in-memory state only.
#[derive(Parser, Debug)]
#[command(name = "siaga", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON lines instead of human-readable text.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one auto-cancellation sweep and print the report.
    Sweep(SweepArgs),

    /// Run one payment-reminder sweep and print the report.
    Remind(RemindArgs),

    /// Run both sweeps periodically until Ctrl-C.
    Run(RunArgs),

    /// Seed demo fleet and bookings for local development.
    Seed(SeedArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    if cli.log_json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }

    let (engine, pool) = match siaga_cli::init_engine().await {
        Ok(pair) => pair,
        Err(e) => {
            tracing::error!("{e:#}");
            return ExitCode::from(1);
        }
    };

    let result = match cli.command {
        Commands::Sweep(args) => run_sweep(&args, &engine).await,
        Commands::Remind(args) => run_remind(&args, &engine).await,
        Commands::Run(args) => run_runner(&args, &engine).await,
        Commands::Seed(args) => run_seed(&args, &engine, pool.as_ref()).await,
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parse_sweep() {
        let cli = Cli::try_parse_from(["siaga", "sweep"]).unwrap();
        assert!(matches!(cli.command, Commands::Sweep(_)));
    }

    #[test]
    fn cli_parse_remind_force() {
        let cli = Cli::try_parse_from(["siaga", "remind", "--force"]).unwrap();
        if let Commands::Remind(args) = cli.command {
            assert!(args.force);
        } else {
            panic!("expected remind");
        }
    }

    #[test]
    fn cli_parse_remind_defaults() {
        let cli = Cli::try_parse_from(["siaga", "remind"]).unwrap();
        if let Commands::Remind(args) = cli.command {
            assert!(!args.force);
        } else {
            panic!("expected remind");
        }
    }

    #[test]
    fn cli_parse_run_interval() {
        let cli = Cli::try_parse_from(["siaga", "run", "--interval-secs", "5"]).unwrap();
        if let Commands::Run(args) = cli.command {
            assert_eq!(args.interval_secs, 5);
        } else {
            panic!("expected run");
        }
    }

    #[test]
    fn cli_parse_run_default_interval() {
        let cli = Cli::try_parse_from(["siaga", "run"]).unwrap();
        if let Commands::Run(args) = cli.command {
            assert_eq!(args.interval_secs, 60);
        } else {
            panic!("expected run");
        }
    }

    #[test]
    fn cli_parse_seed_options() {
        let cli = Cli::try_parse_from([
            "siaga",
            "seed",
            "--fleet-size",
            "5",
            "--dp-deadline-hours",
            "2",
        ])
        .unwrap();
        if let Commands::Seed(args) = cli.command {
            assert_eq!(args.fleet_size, 5);
            assert_eq!(args.dp_deadline_hours, 2);
        } else {
            panic!("expected seed");
        }
    }

    #[test]
    fn cli_parse_verbose_levels() {
        let cli = Cli::try_parse_from(["siaga", "-vv", "sweep"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn cli_parse_no_subcommand_errors() {
        assert!(Cli::try_parse_from(["siaga"]).is_err());
    }
}
