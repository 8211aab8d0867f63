//! Table availability and first-fit assignment
//!
//! Works on snapshots loaded by the caller (inside the booking transaction),
//! so the same code answers availability queries and guards inserts.

use shared::error::{AppError, ErrorCode};
use shared::models::{DiningTable, Reservation, TableStatus};

use super::window::TimeWindow;

/// What a booking needs from a table
#[derive(Debug, Clone, Copy)]
pub struct SeatRequest {
    pub party_size: i32,
    pub window: TimeWindow,
    /// Reservation being rescheduled; its own slot never conflicts
    pub exclude_reservation: Option<i64>,
}

/// First active reservation on `table_id` overlapping the request window
pub fn conflicting_reservation<'a>(
    table_id: i64,
    request: &SeatRequest,
    reservations: &'a [Reservation],
) -> Option<&'a Reservation> {
    reservations.iter().find(|r| {
        r.table_id == table_id
            && r.status.is_active()
            && Some(r.id) != request.exclude_reservation
            && TimeWindow::of(r).overlaps(&request.window)
    })
}

pub fn is_table_free(table_id: i64, request: &SeatRequest, reservations: &[Reservation]) -> bool {
    conflicting_reservation(table_id, request, reservations).is_none()
}

/// Bookable tables big enough for the party, smallest first (ties by id)
pub fn candidate_tables(tables: &[DiningTable], party_size: i32) -> Vec<&DiningTable> {
    let mut candidates: Vec<&DiningTable> = tables
        .iter()
        .filter(|t| t.is_bookable() && t.capacity >= party_size)
        .collect();
    candidates.sort_by_key(|t| (t.capacity, t.id));
    candidates
}

/// Greedy smallest-fit: the first candidate without an overlapping booking
pub fn find_first_fit<'a>(
    tables: &'a [DiningTable],
    reservations: &[Reservation],
    request: &SeatRequest,
) -> Option<&'a DiningTable> {
    candidate_tables(tables, request.party_size)
        .into_iter()
        .find(|t| is_table_free(t.id, request, reservations))
}

/// Every candidate without an overlapping booking, smallest first
pub fn available_tables<'a>(
    tables: &'a [DiningTable],
    reservations: &[Reservation],
    request: &SeatRequest,
) -> Vec<&'a DiningTable> {
    candidate_tables(tables, request.party_size)
        .into_iter()
        .filter(|t| is_table_free(t.id, request, reservations))
        .collect()
}

/// Validate an explicitly chosen table against the request
pub fn check_requested_table(
    table: &DiningTable,
    reservations: &[Reservation],
    request: &SeatRequest,
) -> Result<(), AppError> {
    if !table.is_active {
        return Err(AppError::with_message(
            ErrorCode::TableNotFound,
            format!("Table {} is not in service", table.id),
        )
        .with_detail("table_id", table.id));
    }

    if table.status == TableStatus::Maintenance {
        return Err(AppError::new(ErrorCode::TableUnderMaintenance).with_detail("table_id", table.id));
    }

    if request.party_size > table.capacity {
        return Err(AppError::with_message(
            ErrorCode::TableCapacityExceeded,
            format!(
                "Party of {} does not fit table {} (capacity {})",
                request.party_size, table.name, table.capacity
            ),
        )
        .with_detail("table_id", table.id)
        .with_detail("capacity", table.capacity));
    }

    if let Some(existing) = conflicting_reservation(table.id, request, reservations) {
        return Err(AppError::new(ErrorCode::ReservationConflict)
            .with_detail("table_id", table.id)
            .with_detail("conflicting_reservation_id", existing.id));
    }

    Ok(())
}

/// Pick the table for a booking: the requested one if given, else first fit
pub fn assign_table<'a>(
    tables: &'a [DiningTable],
    reservations: &[Reservation],
    request: &SeatRequest,
    requested_table: Option<i64>,
) -> Result<&'a DiningTable, AppError> {
    match requested_table {
        Some(table_id) => {
            let table = tables
                .iter()
                .find(|t| t.id == table_id)
                .ok_or_else(|| {
                    AppError::new(ErrorCode::TableNotFound).with_detail("table_id", table_id)
                })?;
            check_requested_table(table, reservations, request)?;
            Ok(table)
        }
        None => find_first_fit(tables, reservations, request).ok_or_else(|| {
            AppError::new(ErrorCode::NoTableAvailable)
                .with_detail("party_size", request.party_size)
                .with_detail("start_at", request.window.start())
                .with_detail("end_at", request.window.end())
        }),
    }
}
