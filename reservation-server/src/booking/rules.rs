//! Booking request validation

use shared::error::{AppError, ErrorCode};
use shared::models::{CustomerInput, PreOrderItem};
use shared::util::minutes;

use super::window::TimeWindow;

/// Limits applied to every booking and reschedule
#[derive(Debug, Clone)]
pub struct BookingRules {
    pub default_duration_minutes: i64,
    pub max_duration_minutes: i64,
    pub max_party_size: i32,
    pub max_advance_days: i64,
    /// How far in the past a start time may lie (clock skew, slow forms)
    pub past_grace_minutes: i64,
    /// How soon before its start a reservation holds its table
    pub lookahead_minutes: i64,
}

impl Default for BookingRules {
    fn default() -> Self {
        Self {
            default_duration_minutes: 120,
            max_duration_minutes: 360,
            max_party_size: 20,
            max_advance_days: 90,
            past_grace_minutes: 5,
            lookahead_minutes: 30,
        }
    }
}

impl BookingRules {
    pub fn lookahead_ms(&self) -> i64 {
        minutes(self.lookahead_minutes)
    }

    pub fn check_party_size(&self, party_size: i32) -> Result<(), AppError> {
        if party_size < 1 {
            return Err(AppError::with_message(
                ErrorCode::InvalidPartySize,
                "Party size must be at least 1",
            ));
        }
        if party_size > self.max_party_size {
            return Err(AppError::with_message(
                ErrorCode::InvalidPartySize,
                format!("Party size must not exceed {}", self.max_party_size),
            )
            .with_detail("max_party_size", self.max_party_size));
        }
        Ok(())
    }

    /// Build the window, defaulting the end, and enforce duration/horizon limits
    pub fn resolve_window(
        &self,
        start_at: i64,
        end_at: Option<i64>,
        now: i64,
    ) -> Result<TimeWindow, AppError> {
        let window = match end_at {
            Some(end) => TimeWindow::new(start_at, end)?,
            None => TimeWindow::from_start_and_minutes(start_at, self.default_duration_minutes)?,
        };

        if window.duration_ms() > minutes(self.max_duration_minutes) {
            return Err(AppError::with_message(
                ErrorCode::InvalidTimeWindow,
                format!(
                    "Reservation may last at most {} minutes",
                    self.max_duration_minutes
                ),
            )
            .with_detail("max_duration_minutes", self.max_duration_minutes));
        }

        if window.start() < now.saturating_sub(minutes(self.past_grace_minutes)) {
            return Err(AppError::with_message(
                ErrorCode::InvalidTimeWindow,
                "Reservation cannot start in the past",
            ));
        }

        let horizon = now.saturating_add(minutes(self.max_advance_days.saturating_mul(24 * 60)));
        if window.start() > horizon {
            return Err(AppError::with_message(
                ErrorCode::InvalidTimeWindow,
                format!(
                    "Reservations open at most {} days ahead",
                    self.max_advance_days
                ),
            )
            .with_detail("max_advance_days", self.max_advance_days));
        }

        Ok(window)
    }
}

pub fn check_customer(customer: &CustomerInput) -> Result<(), AppError> {
    if customer.name.trim().is_empty() {
        return Err(AppError::with_message(
            ErrorCode::RequiredField,
            "Customer name is required",
        )
        .with_detail("field", "customer.name"));
    }
    if customer.normalized_phone().len() < 6 {
        return Err(AppError::validation("Customer phone is invalid").with_detail("field", "customer.phone"));
    }
    Ok(())
}

pub fn check_pre_order(items: &[PreOrderItem]) -> Result<(), AppError> {
    for item in items {
        if item.quantity < 1 {
            return Err(AppError::with_message(
                ErrorCode::ValueOutOfRange,
                "Pre-order quantity must be at least 1",
            )
            .with_detail("menu_item_id", item.menu_item_id));
        }
    }
    Ok(())
}
