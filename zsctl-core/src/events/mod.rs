//! ZScaler notification log inspection
//!
//! The ZScaler client records notification events in a SQLite database under
//! the user's home directory. The latest `Internet Security` event decides
//! whether the feature is currently on or off.

use std::path::PathBuf;

use chrono::NaiveDateTime;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::Row;
use tracing::{info, warn};

use crate::error::EventLogError;
use crate::types::{SecurityEvent, SecurityStatus};

/// Formats accepted for the notification log's `Time` column
///
/// The client writes 12-hour clock values with an AM/PM marker, but rows
/// carrying a 24-hour hour field show up too. Tried in order.
const EVENT_TIME_FORMATS: &[&str] = &["%a, %b %d %Y %I:%M:%S %p", "%a, %b %d %Y %H:%M:%S %p"];

/// Prefix shared by all Internet Security notifications
const EVENT_NAME_PREFIX: &str = "Internet Security";

/// Known notification names and the status they signal
///
/// ZScaler writes several distinct names that all mean "on"; kept as a
/// mapping table so a new variant is a one-line change.
const SECURITY_EVENT_STATUS: &[(&str, SecurityStatus)] = &[
    ("Internet Security Up", SecurityStatus::On),
    ("Internet Security Disabled", SecurityStatus::On),
    ("Internet Security Enabled", SecurityStatus::On),
    ("Internet Security On", SecurityStatus::On),
    ("Internet Security Off", SecurityStatus::Off),
];

/// Default location of the ZScaler notification database
pub fn default_db_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".Zscaler/DB/ZscalerApp.db")
}

/// Parse a notification timestamp, accepting either hour convention
pub fn parse_event_time(time: &str) -> Result<NaiveDateTime, EventLogError> {
    EVENT_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(time, format).ok())
        .ok_or_else(|| EventLogError::BadTimestamp {
            time: time.to_string(),
            message: "does not match any known notification time format".to_string(),
        })
}

/// Map a notification name onto a security status
///
/// Names outside the mapping table are a hard error; guessing would mask a
/// third-party behavior change.
pub fn classify_event(name: &str) -> Result<SecurityStatus, EventLogError> {
    SECURITY_EVENT_STATUS
        .iter()
        .find(|(known, _)| *known == name)
        .map(|(_, status)| *status)
        .ok_or_else(|| EventLogError::UnrecognizedEvent {
            name: name.to_string(),
        })
}

/// Classifies the Internet Security feature from the notification log
#[derive(Debug, Clone)]
pub struct SecurityFeatureMonitor {
    db_path: PathBuf,
}

impl SecurityFeatureMonitor {
    /// Monitor over the stock ZScaler database location
    pub fn new() -> Self {
        Self::at_path(default_db_path())
    }

    /// Monitor over an explicit database path
    pub fn at_path(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }

    /// Current status of the Internet Security feature
    ///
    /// A missing database or an empty result set is `Unknown`, never an
    /// error; the client may simply not have written any events yet.
    pub async fn current_status(&self) -> Result<SecurityStatus, EventLogError> {
        if !self.db_path.exists() {
            warn!("ZScaler DB not found at {:?}", self.db_path);
            return Ok(SecurityStatus::Unknown);
        }

        let mut events = self.read_events().await?;
        events.sort_by(|a, b| a.time.cmp(&b.time));

        let Some(last) = events.last() else {
            warn!(
                "no notifications found in ZScaler DB ({:?}) that start with {EVENT_NAME_PREFIX:?}",
                self.db_path
            );
            return Ok(SecurityStatus::Unknown);
        };

        info!("last event found in DB: {:?} at {}", last.name, last.time);
        classify_event(&last.name)
    }

    /// Read all Internet Security events with parsed timestamps
    async fn read_events(&self) -> Result<Vec<SecurityEvent>, EventLogError> {
        let options = SqliteConnectOptions::new()
            .filename(&self.db_path)
            .read_only(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| EventLogError::QueryFailed {
                message: format!("connect to {:?}: {e}", self.db_path),
            })?;

        let rows = sqlx::query(
            "SELECT Time, NotificationName FROM ZAppNotifications WHERE NotificationName LIKE ?",
        )
        .bind(format!("{EVENT_NAME_PREFIX} %"))
        .fetch_all(&pool)
        .await
        .map_err(|e| EventLogError::QueryFailed {
            message: e.to_string(),
        })?;

        let mut events = Vec::with_capacity(rows.len());
        for row in rows {
            let time: String = row.try_get("Time").map_err(|e| EventLogError::QueryFailed {
                message: e.to_string(),
            })?;
            let name: String =
                row.try_get("NotificationName")
                    .map_err(|e| EventLogError::QueryFailed {
                        message: e.to_string(),
                    })?;

            let parsed = parse_event_time(&time)?;
            events.push(SecurityEvent { name, time: parsed });
        }

        pool.close().await;
        Ok(events)
    }
}

impl Default for SecurityFeatureMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_on_synonyms_map_to_on() {
        for name in [
            "Internet Security Up",
            "Internet Security Disabled",
            "Internet Security Enabled",
            "Internet Security On",
        ] {
            assert_eq!(classify_event(name).unwrap(), SecurityStatus::On);
        }
    }

    #[test]
    fn test_off_maps_to_off() {
        assert_eq!(
            classify_event("Internet Security Off").unwrap(),
            SecurityStatus::Off
        );
    }

    #[test]
    fn test_unknown_name_is_a_hard_error() {
        let err = classify_event("Internet Security Paused").unwrap_err();
        assert!(matches!(err, EventLogError::UnrecognizedEvent { .. }));
    }

    #[test]
    fn test_morning_timestamp_parses() {
        let parsed = parse_event_time("Mon, Jan 01 2024 10:00:00 AM").unwrap();
        assert_eq!(parsed.format("%Y-%m-%d %H:%M:%S").to_string(), "2024-01-01 10:00:00");
    }

    #[test]
    fn test_afternoon_timestamp_parses_as_twelve_hour_clock() {
        let parsed = parse_event_time("Mon, Jan 01 2024 01:00:00 PM").unwrap();
        assert_eq!(parsed.format("%Y-%m-%d %H:%M:%S").to_string(), "2024-01-01 13:00:00");
    }

    #[test]
    fn test_twenty_four_hour_field_with_consistent_marker_parses() {
        let parsed = parse_event_time("Mon, Jan 01 2024 14:30:00 PM").unwrap();
        assert_eq!(parsed.format("%Y-%m-%d %H:%M:%S").to_string(), "2024-01-01 14:30:00");
    }

    #[test]
    fn test_garbage_timestamp_is_a_hard_error() {
        let err = parse_event_time("yesterday-ish").unwrap_err();
        assert!(matches!(err, EventLogError::BadTimestamp { .. }));
    }
}
