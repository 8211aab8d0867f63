//! Database access layer
//!
//! Free functions over `sqlx` executors. Reads accept any executor (pool or
//! open transaction); functions meant to run under a booking transaction
//! take `&mut PgConnection`.

pub mod customers;
pub mod menu;
pub mod orders;
pub mod reservations;
pub mod tables;

pub use crate::error::BoxError;
