//! Dining Table Model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ParseStatusError;

/// Table occupancy state maintained by bookings and the sweeper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TableStatus {
    #[default]
    Free,
    Reserved,
    Maintenance,
}

impl TableStatus {
    /// Text stored in the `dining_tables.status` column
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "FREE",
            Self::Reserved => "RESERVED",
            Self::Maintenance => "MAINTENANCE",
        }
    }
}

impl fmt::Display for TableStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TableStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FREE" => Ok(Self::Free),
            "RESERVED" => Ok(Self::Reserved),
            "MAINTENANCE" => Ok(Self::Maintenance),
            other => Err(ParseStatusError::new("table", other)),
        }
    }
}

impl TryFrom<String> for TableStatus {
    type Error = ParseStatusError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Dining table entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct DiningTable {
    pub id: i64,
    pub name: String,
    pub capacity: i32,
    #[cfg_attr(feature = "db", sqlx(try_from = "String"))]
    pub status: TableStatus,
    /// Free-form placement hint ("terrace", "window")
    pub location: Option<String>,
    pub is_active: bool,
}

impl DiningTable {
    /// Whether the table can be offered to a new booking at all
    pub fn is_bookable(&self) -> bool {
        self.is_active && self.status != TableStatus::Maintenance
    }
}

/// Change table status payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableStatusUpdate {
    pub status: TableStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_text_roundtrip() {
        for status in [
            TableStatus::Free,
            TableStatus::Reserved,
            TableStatus::Maintenance,
        ] {
            assert_eq!(status.as_str().parse::<TableStatus>(), Ok(status));
        }
        assert!("BROKEN".parse::<TableStatus>().is_err());
    }

    #[test]
    fn test_status_serde_matches_column_text() {
        let json = serde_json::to_string(&TableStatus::Maintenance).unwrap();
        assert_eq!(json, "\"MAINTENANCE\"");
    }

    #[test]
    fn test_is_bookable() {
        let mut table = DiningTable {
            id: 1,
            name: "T1".into(),
            capacity: 4,
            status: TableStatus::Reserved,
            location: None,
            is_active: true,
        };
        assert!(table.is_bookable());

        table.status = TableStatus::Maintenance;
        assert!(!table.is_bookable());

        table.status = TableStatus::Free;
        table.is_active = false;
        assert!(!table.is_bookable());
    }
}
