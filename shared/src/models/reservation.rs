//! Reservation Model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ParseStatusError;
use super::customer::CustomerInput;
use super::order::OrderDetail;

/// Reservation lifecycle
///
/// ```text
/// PENDING ──► CONFIRMED ──► SEATED ──► COMPLETED
///    │            │
///    ├────────────┴──► CANCELLED
///    └────────────┴──► NO_SHOW
/// ```
///
/// `PENDING` may also go straight to `SEATED` (walk-in with a booking).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    #[default]
    Pending,
    Confirmed,
    Seated,
    Completed,
    Cancelled,
    NoShow,
}

impl ReservationStatus {
    /// Text stored in the `reservations.status` column
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Confirmed => "CONFIRMED",
            Self::Seated => "SEATED",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
            Self::NoShow => "NO_SHOW",
        }
    }

    /// Statuses that hold the table for their window
    pub const ACTIVE: [ReservationStatus; 3] = [Self::Pending, Self::Confirmed, Self::Seated];

    /// Whether this reservation still blocks its table
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed | Self::Seated)
    }

    pub const fn is_terminal(&self) -> bool {
        !self.is_active()
    }

    pub fn can_transition_to(&self, next: ReservationStatus) -> bool {
        use ReservationStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Pending, Seated)
                | (Pending, Cancelled)
                | (Pending, NoShow)
                | (Confirmed, Seated)
                | (Confirmed, Cancelled)
                | (Confirmed, NoShow)
                | (Seated, Completed)
        )
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReservationStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "CONFIRMED" => Ok(Self::Confirmed),
            "SEATED" => Ok(Self::Seated),
            "COMPLETED" => Ok(Self::Completed),
            "CANCELLED" => Ok(Self::Cancelled),
            "NO_SHOW" => Ok(Self::NoShow),
            other => Err(ParseStatusError::new("reservation", other)),
        }
    }
}

impl TryFrom<String> for ReservationStatus {
    type Error = ParseStatusError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Reservation entity
///
/// `start_at`/`end_at` are UTC epoch milliseconds; the window is half-open.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Reservation {
    pub id: i64,
    pub table_id: i64,
    pub customer_id: i64,
    pub party_size: i32,
    pub start_at: i64,
    pub end_at: i64,
    #[cfg_attr(feature = "db", sqlx(try_from = "String"))]
    pub status: ReservationStatus,
    pub note: Option<String>,
    /// Pre-order attached at booking time
    pub order_id: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Line of a pre-order submitted with a booking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreOrderItem {
    pub menu_item_id: i64,
    pub quantity: i32,
    pub note: Option<String>,
}

/// Create reservation payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationCreate {
    pub customer: CustomerInput,
    pub party_size: i32,
    pub start_at: i64,
    /// Defaults to `start_at` plus the configured default duration
    pub end_at: Option<i64>,
    /// Explicit table choice; first-fit assignment when absent
    pub table_id: Option<i64>,
    pub note: Option<String>,
    #[serde(default)]
    pub pre_order: Vec<PreOrderItem>,
}

/// Reschedule / edit reservation payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReservationUpdate {
    pub party_size: Option<i32>,
    pub start_at: Option<i64>,
    pub end_at: Option<i64>,
    pub table_id: Option<i64>,
    pub note: Option<String>,
}

/// Reservation list filter
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReservationQuery {
    /// Only reservations ending after this instant
    pub from: Option<i64>,
    /// Only reservations starting before this instant
    pub to: Option<i64>,
    pub status: Option<ReservationStatus>,
    pub table_id: Option<i64>,
}

/// Availability lookup parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityQuery {
    pub party_size: i32,
    pub start_at: i64,
    pub end_at: Option<i64>,
}

/// Result of a successful booking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingResult {
    pub reservation: Reservation,
    pub table_name: String,
    pub order: Option<OrderDetail>,
}
