//! Shared types for the reservation service
//!
//! Error types, API response structures and the table / reservation
//! records exchanged between the server and its clients.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use axum::Json;
pub use http;
pub use serde::{Deserialize, Serialize};
