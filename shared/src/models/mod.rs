//! Data models
//!
//! Shared between the reservation server and its clients (via API).
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! All IDs are `i64`, all instants are UTC epoch milliseconds.

pub mod customer;
pub mod dining_table;
pub mod menu_item;
pub mod order;
pub mod reservation;

// Re-exports
pub use customer::*;
pub use dining_table::*;
pub use menu_item::*;
pub use order::*;
pub use reservation::*;

use thiserror::Error;

/// A status column held text no enum variant matches
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} status: {value}")]
pub struct ParseStatusError {
    kind: &'static str,
    value: String,
}

impl ParseStatusError {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}
