//! # siaga-store — Persistence Layer
//!
//! The operational source of truth is a set of thread-safe in-memory
//! stores; PostgreSQL is an optional write-through used for durability
//! and startup hydration.
//!
//! ## Architecture
//!
//! - [`store::Store`] — generic keyed store over a `parking_lot::RwLock`
//!   map. Its [`store::Store::try_update`] runs read-validate-update
//!   under a single write lock, which is what makes booking transitions
//!   compare-and-set rather than read-then-write.
//! - [`stores`] — typed stores exposing exactly the query shapes the
//!   engine needs: cancellation candidates, expired pending payments,
//!   reminder candidates.
//! - [`sweep_lock::SweepLock`] — non-blocking overlap guard so a slow
//!   sweep and a freshly scheduled one never interleave.
//! - [`db`] — optional Postgres write-through (`DATABASE_URL`), with
//!   conditional `UPDATE ... WHERE status = $expected` statements whose
//!   `rows_affected` doubles as the conflict signal.
//!
//! The record maps are `parking_lot` locks, never held across `.await`
//! points; the sweep lock is `tokio::sync` because its guard spans a
//! whole async sweep run.

pub mod db;
pub mod error;
pub mod store;
pub mod stores;
pub mod sweep_lock;

pub use error::StoreError;
pub use store::Store;
pub use stores::{AmbulanceStore, BookingStore, DriverStore, PaymentStore, Stores};
pub use sweep_lock::SweepLock;
