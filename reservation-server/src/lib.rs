//! reservation-server: table availability, booking and table state sweeps
//!
//! - `booking`: pure scheduling core (windows, first-fit, sweep plans)
//! - `db`: PostgreSQL queries
//! - `services`: transactional booking operations
//! - `scheduler`: periodic table sweeper
//! - `api`: axum HTTP surface

pub mod api;
pub mod booking;
pub mod config;
pub mod db;
pub mod error;
pub mod logger;
pub mod scheduler;
pub mod services;
pub mod state;
pub mod tasks;

pub use config::Config;
pub use error::{BoxError, ServiceError, ServiceResult};
pub use state::AppState;
