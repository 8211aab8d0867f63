//! Reservation server configuration
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | DATABASE_URL | (required) | PostgreSQL connection URL |
//! | HTTP_PORT | 8080 | HTTP listen port |
//! | ENVIRONMENT | development | development / staging / production |
//! | LOG_LEVEL | info | Default tracing filter when RUST_LOG is unset |
//! | LOG_JSON | false | JSON log lines instead of human-readable ones |
//! | LOG_DIR | (unset) | Also write daily-rotated log files here |
//! | DB_MAX_CONNECTIONS | 10 | Pool size |
//! | SWEEP_INTERVAL_SECS | 60 | Table status sweep period |
//! | RESERVATION_LOOKAHEAD_MINUTES | 30 | How early a booking holds its table |
//! | DEFAULT_RESERVATION_MINUTES | 120 | Duration when no end time is given |
//! | MAX_RESERVATION_MINUTES | 360 | Longest allowed booking |
//! | MAX_PARTY_SIZE | 20 | Largest party accepted |
//! | MAX_ADVANCE_DAYS | 90 | Booking horizon |
//! | PAST_GRACE_MINUTES | 5 | Tolerance for start times slightly in the past |

use std::str::FromStr;

use crate::booking::BookingRules;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL
    pub database_url: String,
    /// HTTP port
    pub http_port: u16,
    /// Environment: development | staging | production
    pub environment: String,
    pub log_level: String,
    pub log_json: bool,
    pub log_dir: Option<String>,
    pub db_max_connections: u32,
    /// Seconds between two sweeper passes
    pub sweep_interval_secs: u64,
    pub rules: BookingRules,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, BoxError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, BoxError> {
        let database_url = lookup("DATABASE_URL")
            .filter(|s| !s.is_empty())
            .ok_or("DATABASE_URL must be set")?;

        let defaults = BookingRules::default();
        let rules = BookingRules {
            default_duration_minutes: parse_or(
                &lookup,
                "DEFAULT_RESERVATION_MINUTES",
                defaults.default_duration_minutes,
            )?,
            max_duration_minutes: parse_or(
                &lookup,
                "MAX_RESERVATION_MINUTES",
                defaults.max_duration_minutes,
            )?,
            max_party_size: parse_or(&lookup, "MAX_PARTY_SIZE", defaults.max_party_size)?,
            max_advance_days: parse_or(&lookup, "MAX_ADVANCE_DAYS", defaults.max_advance_days)?,
            past_grace_minutes: parse_or(
                &lookup,
                "PAST_GRACE_MINUTES",
                defaults.past_grace_minutes,
            )?,
            lookahead_minutes: parse_or(
                &lookup,
                "RESERVATION_LOOKAHEAD_MINUTES",
                defaults.lookahead_minutes,
            )?,
        };

        if rules.default_duration_minutes <= 0
            || rules.default_duration_minutes > rules.max_duration_minutes
        {
            return Err(format!(
                "DEFAULT_RESERVATION_MINUTES must be in 1..={}",
                rules.max_duration_minutes
            )
            .into());
        }
        if rules.lookahead_minutes < 0 {
            return Err("RESERVATION_LOOKAHEAD_MINUTES must not be negative".into());
        }

        let sweep_interval_secs = parse_or(&lookup, "SWEEP_INTERVAL_SECS", 60u64)?;
        if sweep_interval_secs == 0 {
            return Err("SWEEP_INTERVAL_SECS must be positive".into());
        }

        Ok(Self {
            database_url,
            http_port: parse_or(&lookup, "HTTP_PORT", 8080u16)?,
            environment: lookup("ENVIRONMENT").unwrap_or_else(|| "development".into()),
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".into()),
            log_json: parse_or(&lookup, "LOG_JSON", false)?,
            log_dir: lookup("LOG_DIR").filter(|s| !s.is_empty()),
            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 10u32)?,
            sweep_interval_secs,
            rules,
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

/// Parse `key` if present; a present but malformed value is an error
fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T, BoxError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| format!("{key}: invalid value {raw:?}: {e}").into()),
        _ => Ok(default),
    }
}
