//! Caller-owned recommendation cache.
//!
//! Entries are keyed by the snapshot digest and the config fingerprint, so a
//! change to either the events or the analysis settings misses. Entries also
//! expire after `max_age`, because urgency depends on the wall clock.

use std::collections::HashMap;

use bw_common::RefreshIntervalRecommendation;
use chrono::{DateTime, Duration, Utc};
use tracing::trace;

use crate::engine::RefreshAnalyzer;
use crate::snapshot::EventSnapshot;

/// Default entry lifetime.
pub const DEFAULT_MAX_AGE_MINUTES: i64 = 5;
/// Default number of entries kept.
pub const DEFAULT_CAPACITY: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    snapshot_digest: String,
    config_fingerprint: String,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    recommendation: RefreshIntervalRecommendation,
    inserted_at: DateTime<Utc>,
}

/// Hit/miss counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

/// Recommendation cache with max-age and capacity eviction.
#[derive(Debug)]
pub struct RecommendationCache {
    entries: HashMap<CacheKey, CacheEntry>,
    max_age: Duration,
    capacity: usize,
    stats: CacheStats,
}

impl Default for RecommendationCache {
    fn default() -> Self {
        Self::new(Duration::minutes(DEFAULT_MAX_AGE_MINUTES), DEFAULT_CAPACITY)
    }
}

impl RecommendationCache {
    /// A capacity of zero is treated as one.
    pub fn new(max_age: Duration, capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            max_age,
            capacity: capacity.max(1),
            stats: CacheStats::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Fresh entry for the pair, if any. Expired entries are dropped.
    pub fn get(
        &mut self,
        snapshot_digest: &str,
        config_fingerprint: &str,
        now: DateTime<Utc>,
    ) -> Option<RefreshIntervalRecommendation> {
        let key = CacheKey {
            snapshot_digest: snapshot_digest.to_string(),
            config_fingerprint: config_fingerprint.to_string(),
        };
        let fresh = match self.entries.get(&key) {
            Some(entry) if now - entry.inserted_at <= self.max_age => {
                Some(entry.recommendation.clone())
            }
            Some(_) => {
                self.entries.remove(&key);
                self.stats.evictions += 1;
                None
            }
            None => None,
        };
        if fresh.is_some() {
            self.stats.hits += 1;
        } else {
            self.stats.misses += 1;
        }
        fresh
    }

    pub fn insert(
        &mut self,
        snapshot_digest: &str,
        config_fingerprint: &str,
        recommendation: RefreshIntervalRecommendation,
        now: DateTime<Utc>,
    ) {
        self.evict_expired(now);
        let key = CacheKey {
            snapshot_digest: snapshot_digest.to_string(),
            config_fingerprint: config_fingerprint.to_string(),
        };
        if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity {
            self.evict_oldest();
        }
        self.entries.insert(
            key,
            CacheEntry {
                recommendation,
                inserted_at: now,
            },
        );
    }

    /// Cached recommendation, computing and storing it on a miss.
    pub fn get_or_compute(
        &mut self,
        analyzer: &RefreshAnalyzer,
        snapshot: &EventSnapshot,
        now: DateTime<Utc>,
    ) -> RefreshIntervalRecommendation {
        if let Some(hit) = self.get(snapshot.digest(), analyzer.fingerprint(), now) {
            trace!(digest = snapshot.digest(), "recommendation cache hit");
            return hit;
        }
        let rec = analyzer.recommend(snapshot, now);
        self.insert(snapshot.digest(), analyzer.fingerprint(), rec.clone(), now);
        rec
    }

    fn evict_expired(&mut self, now: DateTime<Utc>) {
        let before = self.entries.len();
        let max_age = self.max_age;
        self.entries.retain(|_, e| now - e.inserted_at <= max_age);
        self.stats.evictions += (before - self.entries.len()) as u64;
    }

    fn evict_oldest(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, e)| e.inserted_at)
            .map(|(k, _)| k.clone());
        if let Some(key) = oldest {
            self.entries.remove(&key);
            self.stats.evictions += 1;
        }
    }
}
