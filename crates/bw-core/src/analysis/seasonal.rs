//! Seasonal pattern detection over hour-of-day, weekday, and month bins.
//!
//! A grouping is *patterned* when its bin counts are both dispersed
//! (`CoV > cov_threshold`) and peaked (`max ≥ peak_ratio × mean`). Groupings
//! are only evaluated once the log spans enough time to fill them; a week of
//! data says nothing about months.

use std::collections::BTreeSet;

use bw_common::SeasonalPattern;
use bw_config::SeasonalConfig;
use bw_math::{coefficient_of_variation, mean, std_dev};
use chrono::{DateTime, Datelike, FixedOffset, Offset, Timelike, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::snapshot::EventSnapshot;

/// Bin statistics for one grouping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupingStats {
    /// Event count per bin (hours 0..24, ISO weekdays 1..=7, months 1..=12).
    pub counts: Vec<f64>,
    pub mean: f64,
    pub std_dev: f64,
    pub coefficient_of_variation: f64,
    /// `max / mean`, 0 when empty.
    pub peak_ratio: f64,
    /// Whether the span and event count allowed evaluating this grouping.
    pub evaluated: bool,
    pub patterned: bool,
}

impl GroupingStats {
    fn from_counts(counts: Vec<f64>, evaluated: bool, config: &SeasonalConfig) -> Self {
        let m = mean(&counts);
        let max = counts.iter().copied().fold(0.0, f64::max);
        let cov = coefficient_of_variation(&counts);
        let peak_ratio = if m > 0.0 { max / m } else { 0.0 };
        let patterned =
            evaluated && m > 0.0 && cov > config.cov_threshold && max >= config.peak_ratio * m;
        Self {
            std_dev: std_dev(&counts),
            counts,
            mean: m,
            coefficient_of_variation: cov,
            peak_ratio,
            evaluated,
            patterned,
        }
    }

    /// Bin labels whose count reaches `factor × mean`. `first_label` is the
    /// label of bin 0.
    fn bins_at_least(&self, factor: f64, first_label: u8) -> BTreeSet<u8> {
        if !self.evaluated || self.mean <= 0.0 {
            return BTreeSet::new();
        }
        let threshold = factor * self.mean;
        self.counts
            .iter()
            .enumerate()
            .filter(|(_, c)| **c >= threshold)
            .map(|(i, _)| i as u8 + first_label)
            .collect()
    }
}

/// Result of seasonal analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonalAnalysis {
    /// Highest-precedence qualifying pattern, or `none`.
    pub dominant: SeasonalPattern,
    /// Qualifying patterns in precedence order, or `[none]`.
    pub patterns: Vec<SeasonalPattern>,
    pub hourly: GroupingStats,
    pub daily: GroupingStats,
    pub monthly: GroupingStats,
    /// Hours of day (0..=23).
    pub peak_hours: BTreeSet<u8>,
    /// ISO weekdays (1 = Monday).
    pub busy_weekdays: BTreeSet<u8>,
    /// Months (1..=12).
    pub busy_months: BTreeSet<u8>,
    pub utc_offset_minutes: i32,
}

impl SeasonalAnalysis {
    pub fn has_pattern(&self) -> bool {
        self.dominant != SeasonalPattern::None
    }

    /// CoV of the dominant grouping (0 without a pattern).
    pub fn dominant_cov(&self) -> f64 {
        match self.dominant {
            SeasonalPattern::Hourly => self.hourly.coefficient_of_variation,
            SeasonalPattern::Daily => self.daily.coefficient_of_variation,
            SeasonalPattern::Monthly => self.monthly.coefficient_of_variation,
            SeasonalPattern::None => 0.0,
        }
    }

    /// Whether `now` falls in a busy bin of the dominant grouping.
    pub fn is_peak(&self, now: DateTime<Utc>) -> bool {
        let local = to_local(now, self.utc_offset_minutes);
        match self.dominant {
            SeasonalPattern::Hourly => self.peak_hours.contains(&(local.hour() as u8)),
            SeasonalPattern::Daily => self
                .busy_weekdays
                .contains(&(local.weekday().number_from_monday() as u8)),
            SeasonalPattern::Monthly => self.busy_months.contains(&(local.month() as u8)),
            SeasonalPattern::None => false,
        }
    }

    /// Whether `now` is one of the peak hours, regardless of dominance.
    pub fn is_peak_hour(&self, now: DateTime<Utc>) -> bool {
        let local = to_local(now, self.utc_offset_minutes);
        self.peak_hours.contains(&(local.hour() as u8))
    }

    /// Whether `now` is one of the busy weekdays, regardless of dominance.
    pub fn is_busy_weekday(&self, now: DateTime<Utc>) -> bool {
        let local = to_local(now, self.utc_offset_minutes);
        self.busy_weekdays
            .contains(&(local.weekday().number_from_monday() as u8))
    }

    /// Short description of the dominant peak window for reasoning text.
    pub fn describe_peak(&self) -> String {
        let list = |set: &BTreeSet<u8>, suffix: &str| {
            set.iter()
                .map(|v| format!("{v}{suffix}"))
                .collect::<Vec<_>>()
                .join(", ")
        };
        match self.dominant {
            SeasonalPattern::Hourly => format!("peak hours {}", list(&self.peak_hours, ":00")),
            SeasonalPattern::Daily => format!("busy weekdays {}", list(&self.busy_weekdays, "")),
            SeasonalPattern::Monthly => format!("busy months {}", list(&self.busy_months, "")),
            SeasonalPattern::None => "no peak window".to_string(),
        }
    }
}

/// Buckets events by local hour, weekday, and month.
#[derive(Debug, Clone, Default)]
pub struct SeasonalPatternAnalyzer {
    config: SeasonalConfig,
}

impl SeasonalPatternAnalyzer {
    pub fn new(config: SeasonalConfig) -> Self {
        Self { config }
    }

    pub fn analyze(&self, snapshot: &EventSnapshot) -> SeasonalAnalysis {
        let offset = self.config.utc_offset_minutes;
        let mut hours = vec![0.0; 24];
        let mut weekdays = vec![0.0; 7];
        let mut months = vec![0.0; 12];

        for event in snapshot.events() {
            let local = to_local(event.open_time, offset);
            hours[local.hour() as usize] += 1.0;
            weekdays[local.weekday().num_days_from_monday() as usize] += 1.0;
            months[local.month0() as usize] += 1.0;
        }

        let enough_events = snapshot.len() >= self.config.min_events;
        let span_days = snapshot.span_days();
        let c = &self.config;

        let hourly = GroupingStats::from_counts(
            hours,
            enough_events && span_days >= c.min_span_days_hourly,
            c,
        );
        let daily = GroupingStats::from_counts(
            weekdays,
            enough_events && span_days >= c.min_span_days_daily,
            c,
        );
        let monthly = GroupingStats::from_counts(
            months,
            enough_events && span_days >= c.min_span_days_monthly,
            c,
        );

        let mut patterns: Vec<SeasonalPattern> = [
            (SeasonalPattern::Hourly, hourly.patterned),
            (SeasonalPattern::Daily, daily.patterned),
            (SeasonalPattern::Monthly, monthly.patterned),
        ]
        .into_iter()
        .filter(|(_, patterned)| *patterned)
        .map(|(p, _)| p)
        .collect();
        let dominant = patterns.first().copied().unwrap_or(SeasonalPattern::None);
        if patterns.is_empty() {
            patterns.push(SeasonalPattern::None);
        }

        let analysis = SeasonalAnalysis {
            dominant,
            patterns,
            peak_hours: hourly.bins_at_least(c.peak_hour_factor, 0),
            busy_weekdays: daily.bins_at_least(c.busy_weekday_factor, 1),
            busy_months: monthly.bins_at_least(c.busy_month_factor, 1),
            hourly,
            daily,
            monthly,
            utc_offset_minutes: offset,
        };
        debug!(
            dominant = %analysis.dominant,
            hourly_cov = analysis.hourly.coefficient_of_variation,
            daily_cov = analysis.daily.coefficient_of_variation,
            span_days,
            "seasonal analysis complete"
        );
        analysis
    }
}

pub(crate) fn to_local(t: DateTime<Utc>, offset_minutes: i32) -> DateTime<FixedOffset> {
    // Validation bounds the offset to ±14h; fall back to UTC otherwise.
    let offset = FixedOffset::east_opt(offset_minutes * 60).unwrap_or_else(|| Utc.fix());
    t.with_timezone(&offset)
}
