//! Bridge-opening events.
//!
//! [`EventRecord`] is the loose shape accepted from the external event source
//! (the mobile app's store or a JSON export). [`Event`] is the validated form
//! the engine works on: it always has an open time and never closes before it
//! opened.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single bridge opening.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Event {
    pub id: String,
    pub bridge_id: String,
    pub open_time: DateTime<Utc>,
    /// `None` while the bridge is still open.
    #[serde(default)]
    pub close_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration_minutes: f64,
}

impl Event {
    /// Create a currently-open event.
    pub fn new(
        id: impl Into<String>,
        bridge_id: impl Into<String>,
        open_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            bridge_id: bridge_id.into(),
            open_time,
            close_time: None,
            duration_minutes: 0.0,
        }
    }

    /// Set the close time and derive the duration from it.
    pub fn closed_at(mut self, close_time: DateTime<Utc>) -> Self {
        self.duration_minutes = (close_time - self.open_time).num_seconds() as f64 / 60.0;
        self.close_time = Some(close_time);
        self
    }

    /// Whether the bridge is still open.
    pub fn is_open(&self) -> bool {
        self.close_time.is_none()
    }

    /// Check the close-after-open invariant.
    pub fn validate(&self) -> Result<(), MalformedEvent> {
        match self.close_time {
            Some(close) if close < self.open_time => Err(MalformedEvent {
                id: self.id.clone(),
                reason: MalformedEventReason::CloseBeforeOpen,
            }),
            _ => Ok(()),
        }
    }
}

/// Event as delivered by the external source.
///
/// Accepts both `snake_case` and the app's `camelCase` field names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EventRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default, alias = "bridgeId", alias = "entityId")]
    pub bridge_id: String,
    #[serde(default, alias = "openDateTime", alias = "openTime")]
    pub open_time: Option<DateTime<Utc>>,
    #[serde(default, alias = "closeDateTime", alias = "closeTime")]
    pub close_time: Option<DateTime<Utc>>,
    #[serde(default, alias = "minutesOpen", alias = "durationMinutes")]
    pub duration_minutes: Option<f64>,
}

/// Why an event was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MalformedEventReason {
    MissingOpenTime,
    CloseBeforeOpen,
}

impl std::fmt::Display for MalformedEventReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MalformedEventReason::MissingOpenTime => write!(f, "missing open time"),
            MalformedEventReason::CloseBeforeOpen => write!(f, "close time precedes open time"),
        }
    }
}

/// A record the engine skipped. Never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed event '{id}': {reason}")]
pub struct MalformedEvent {
    pub id: String,
    pub reason: MalformedEventReason,
}

impl TryFrom<EventRecord> for Event {
    type Error = MalformedEvent;

    fn try_from(record: EventRecord) -> Result<Self, Self::Error> {
        let open_time = record.open_time.ok_or_else(|| MalformedEvent {
            id: record.id.clone(),
            reason: MalformedEventReason::MissingOpenTime,
        })?;

        let duration_minutes = match (record.duration_minutes, record.close_time) {
            (Some(d), _) if d.is_finite() => d,
            (_, Some(close)) => (close - open_time).num_seconds() as f64 / 60.0,
            _ => 0.0,
        };

        let event = Event {
            id: record.id,
            bridge_id: record.bridge_id,
            open_time,
            close_time: record.close_time,
            duration_minutes,
        };
        event.validate()?;
        Ok(event)
    }
}
