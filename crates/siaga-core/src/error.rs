//! # Error Types
//!
//! Shared error hierarchy for the SIAGA stack. All errors use `thiserror`
//! for derive-based `Display` and `Error` implementations. Domain crates
//! define their own error enums (state transitions in `siaga-state`,
//! storage in `siaga-store`) and convert into these only where a shared
//! surface is needed.

use thiserror::Error;

/// Errors raised by the core primitive types.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Monetary arithmetic overflowed.
    #[error("amount arithmetic overflow")]
    AmountOverflow,
}
