//! # Storage Errors

use thiserror::Error;

/// Errors raised by the persistence layer.
///
/// Compare-and-set losses are not errors here — the in-memory stores
/// surface them through `try_update`'s closure result, and the SQL layer
/// through `rows_affected`.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The Postgres write-through failed. Fatal at the query stage of a
    /// sweep; logged-and-skipped per record otherwise.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}
