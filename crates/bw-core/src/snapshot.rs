//! Immutable, validated, sorted view of an event log.
//!
//! Every analysis runs against one [`EventSnapshot`]. Construction drops
//! malformed records (counted, never fatal), sorts by `(open_time, id)`, and
//! fixes a SHA-256 digest that keys the recommendation cache.

use bw_common::{Event, EventRecord, MalformedEvent, MalformedEventReason};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::logging::event_names;

/// Per-reason counts of skipped records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MalformedCounts {
    pub missing_open_time: usize,
    pub close_before_open: usize,
}

impl MalformedCounts {
    fn record(&mut self, reason: MalformedEventReason) {
        match reason {
            MalformedEventReason::MissingOpenTime => self.missing_open_time += 1,
            MalformedEventReason::CloseBeforeOpen => self.close_before_open += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.missing_open_time + self.close_before_open
    }
}

/// Sorted, validated events plus their digest.
#[derive(Debug, Clone)]
pub struct EventSnapshot {
    events: Vec<Event>,
    malformed: MalformedCounts,
    digest: String,
}

impl EventSnapshot {
    /// Build from already-typed events, dropping any that close before they open.
    pub fn new(events: Vec<Event>) -> Self {
        let mut malformed = MalformedCounts::default();
        let valid = events
            .into_iter()
            .filter_map(|e| match e.validate() {
                Ok(()) => Some(e),
                Err(err) => {
                    note_malformed(&mut malformed, &err);
                    None
                }
            })
            .collect();
        Self::assemble(valid, malformed)
    }

    /// Build from wire records.
    pub fn from_records(records: Vec<EventRecord>) -> Self {
        let mut malformed = MalformedCounts::default();
        let valid = records
            .into_iter()
            .filter_map(|r| match Event::try_from(r) {
                Ok(e) => Some(e),
                Err(err) => {
                    note_malformed(&mut malformed, &err);
                    None
                }
            })
            .collect();
        Self::assemble(valid, malformed)
    }

    /// Parse a JSON array of records.
    pub fn from_json(json: &str) -> bw_common::Result<Self> {
        let records: Vec<EventRecord> = serde_json::from_str(json)?;
        Ok(Self::from_records(records))
    }

    fn assemble(mut events: Vec<Event>, malformed: MalformedCounts) -> Self {
        events.sort_by(|a, b| a.open_time.cmp(&b.open_time).then_with(|| a.id.cmp(&b.id)));
        if malformed.total() > 0 {
            warn!(
                target: event_names::INGEST_MALFORMED,
                skipped = malformed.total(),
                missing_open_time = malformed.missing_open_time,
                close_before_open = malformed.close_before_open,
                "skipped malformed events"
            );
        }
        let digest = digest_events(&events);
        Self {
            events,
            malformed,
            digest,
        }
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn malformed(&self) -> MalformedCounts {
        self.malformed
    }

    /// SHA-256 hex digest over the canonical sorted events.
    pub fn digest(&self) -> &str {
        &self.digest
    }

    pub fn first_open(&self) -> Option<DateTime<Utc>> {
        self.events.first().map(|e| e.open_time)
    }

    pub fn last_open(&self) -> Option<DateTime<Utc>> {
        self.events.last().map(|e| e.open_time)
    }

    /// Time from the first to the last opening (zero for fewer than two).
    pub fn span(&self) -> Duration {
        match (self.first_open(), self.last_open()) {
            (Some(first), Some(last)) => last - first,
            _ => Duration::zero(),
        }
    }

    pub fn span_days(&self) -> f64 {
        self.span().num_seconds() as f64 / 86_400.0
    }
}

fn note_malformed(counts: &mut MalformedCounts, err: &MalformedEvent) {
    counts.record(err.reason);
    tracing::debug!(id = %err.id, reason = %err.reason, "dropping malformed event");
}

fn digest_events(events: &[Event]) -> String {
    let mut hasher = Sha256::new();
    for e in events {
        hasher.update(e.id.as_bytes());
        hasher.update(b"\x1f");
        hasher.update(e.bridge_id.as_bytes());
        hasher.update(b"\x1f");
        hasher.update(e.open_time.timestamp_millis().to_le_bytes());
        match e.close_time {
            Some(close) => hasher.update(close.timestamp_millis().to_le_bytes()),
            None => hasher.update(b"open"),
        }
        hasher.update(e.duration_minutes.to_bits().to_le_bytes());
        hasher.update(b"\x1e");
    }
    hex::encode(hasher.finalize())
}
