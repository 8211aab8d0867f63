//! Customer Model

use serde::{Deserialize, Serialize};

/// Customer entity, identified by phone number
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Customer {
    pub id: i64,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub created_at: i64,
}

/// Customer contact supplied with a booking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerInput {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
}

impl CustomerInput {
    /// Phone with spaces, dashes and parentheses stripped
    pub fn normalized_phone(&self) -> String {
        self.phone
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '(' | ')' | '.'))
            .collect()
    }
}
