//! # siaga-core — Domain Primitives
//!
//! Core building blocks shared by every crate in the SIAGA stack:
//!
//! - **Identity newtypes** (`identity.rs`): UUID-backed identifiers for
//!   bookings, payments, drivers, ambulances, and users. Each is a
//!   distinct type — you cannot pass a [`DriverId`] where an
//!   [`AmbulanceId`] is expected.
//!
//! - **Money** (`money.rs`): amounts in integer minor units (rupiah).
//!   Floats never appear in domain data; the downpayment split is
//!   integer arithmetic with an explicit rounding rule.
//!
//! - **Errors** (`error.rs`): the shared `thiserror` hierarchy.

pub mod error;
pub mod identity;
pub mod money;

pub use error::CoreError;
pub use identity::{AmbulanceId, BookingId, DriverId, PaymentId, UserId};
pub use money::{Money, DOWNPAYMENT_PERCENT};
