//! Business services
//!
//! Handlers delegate every booking write here; plain reads go straight to
//! `crate::db`.

pub mod booking;
