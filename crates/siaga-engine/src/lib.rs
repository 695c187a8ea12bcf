//! # siaga-engine — Booking Lifecycle Engine
//!
//! The automated half of the booking lifecycle: everything that happens
//! to a booking because time passed, rather than because a user clicked.
//!
//! ## Components
//!
//! - **Deadline tracker** (`deadline.rs`): pure classification of
//!   deadline breaches — downpayment deadline, final-payment deadline,
//!   and payment-record expiry are three independent rules.
//! - **Auto-cancellation sweeper** ([`LifecycleEngine::run_auto_cancellation_sweep`]):
//!   expires lapsed payments, cancels/fails the owning bookings through
//!   the state machine, and frees their resources. Idempotent — a second
//!   run right after the first finds zero candidates.
//! - **Resource release coordinator** (`release.rs`): returns drivers
//!   and ambulances to `Available` exactly once, tolerating dangling
//!   links.
//! - **Reminder scheduler** ([`LifecycleEngine::run_payment_reminder_sweep`]):
//!   emits payment reminders under a cool-down window, keyed per booking
//!   for unpaid emergencies and per payment for scheduled flows.
//! - **Periodic runner** (`runner.rs`): tokio interval loop invoking
//!   both sweeps until shutdown.
//!
//! ## Concurrency
//!
//! Every status mutation goes through the stores' single-write-lock
//! `try_update`, so overlapping sweeps compare-and-set rather than
//! read-then-write. Entity failures are isolated: one bad booking is
//! logged and skipped, the batch continues, and only a query-stage
//! persistence failure aborts a run.

pub mod config;
pub mod deadline;
pub mod engine;
pub mod notify;
pub mod release;
pub mod report;
pub mod runner;

pub use config::EngineConfig;
pub use deadline::DeadlineBreach;
pub use engine::{EngineError, LifecycleEngine};
pub use notify::{LogNotifier, NotificationEvent, Notifier, NotifyError, RecordingNotifier};
pub use release::ReleaseOutcome;
pub use report::{ReminderReport, SweepReport};
