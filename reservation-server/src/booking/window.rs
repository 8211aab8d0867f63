//! Half-open time windows over epoch milliseconds

use serde::Serialize;
use shared::error::{AppError, ErrorCode};
use shared::models::Reservation;
use shared::util::{MINUTE_MS, format_millis};

/// `[start, end)` in UTC epoch milliseconds, `start < end` always holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    start: i64,
    end: i64,
}

impl TimeWindow {
    pub fn new(start: i64, end: i64) -> Result<Self, AppError> {
        if end <= start {
            return Err(AppError::with_message(
                ErrorCode::InvalidTimeWindow,
                format!(
                    "Reservation must end after it starts ({} >= {})",
                    format_millis(start),
                    format_millis(end)
                ),
            ));
        }
        Ok(Self { start, end })
    }

    pub fn from_start_and_minutes(start: i64, minutes: i64) -> Result<Self, AppError> {
        Self::new(start, start.saturating_add(minutes.saturating_mul(MINUTE_MS)))
    }

    /// Window occupied by a stored reservation
    pub fn of(reservation: &Reservation) -> Self {
        // Rows are written through `new`, the CHECK constraint guards the rest.
        Self {
            start: reservation.start_at,
            end: reservation.end_at,
        }
    }

    pub fn start(&self) -> i64 {
        self.start
    }

    pub fn end(&self) -> i64 {
        self.end
    }

    /// `self.start < other.end && self.end > other.start`
    ///
    /// Back-to-back windows (one ends exactly when the other starts) do not
    /// overlap, so a table can be turned over at the boundary.
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start < other.end && self.end > other.start
    }

    pub fn contains_instant(&self, at: i64) -> bool {
        self.start <= at && at < self.end
    }

    /// Saturates at `i64::MAX` for windows spanning most of the i64 range
    pub fn duration_ms(&self) -> i64 {
        self.end.saturating_sub(self.start)
    }

    pub fn duration_minutes(&self) -> i64 {
        self.duration_ms() / MINUTE_MS
    }
}
