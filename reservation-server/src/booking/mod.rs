//! Reservation scheduling core
//!
//! Pure functions over loaded snapshots: no I/O happens here, the service
//! layer loads rows (under lock when writing) and applies the outcome.

pub mod allocator;
pub mod rules;
pub mod sweep;
pub mod window;

pub use allocator::{SeatRequest, assign_table, available_tables, find_first_fit};
pub use rules::BookingRules;
pub use sweep::{SweepPlan, plan_sweep};
pub use window::TimeWindow;
