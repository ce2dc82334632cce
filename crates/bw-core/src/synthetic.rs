//! Seeded synthetic event logs.
//!
//! Used by tests, benchmarks, and `bw-core simulate`. Every generator is
//! deterministic for a given seed and start time.

use bw_common::Event;
use chrono::{DateTime, Datelike, Duration, TimeZone, Timelike, Utc};
use clap::ValueEnum;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Minutes each synthetic opening lasts.
pub const OPEN_MINUTES: i64 = 8;

/// Local hours used by the commute pattern.
pub const COMMUTE_HOURS: [i64; 6] = [7, 8, 9, 16, 17, 18];

/// Shape of a generated log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Scenario {
    /// Exponential inter-arrivals at a fixed rate.
    Poisson,
    /// Exactly periodic openings.
    Regular,
    /// Weekday rush-hour openings.
    Commute,
    /// Rate jumps 6x halfway through.
    RegimeShift,
}

/// Parameters for [`generate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticConfig {
    pub scenario: Scenario,
    pub count: usize,
    pub seed: u64,
    pub start: DateTime<Utc>,
    /// Mean spacing for `poisson` and `regular`, and the pre-shift spacing
    /// for `regime_shift`.
    pub mean_interval_seconds: f64,
    pub bridge_id: String,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            scenario: Scenario::Poisson,
            count: 300,
            seed: 42,
            start: default_start(),
            mean_interval_seconds: 3_600.0,
            bridge_id: "fremont".to_string(),
        }
    }
}

/// Monday 2024-01-01 00:00 UTC.
pub fn default_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// Generate a log for `config`.
pub fn generate(config: &SyntheticConfig) -> Vec<Event> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let bridge = config.bridge_id.as_str();
    match config.scenario {
        Scenario::Poisson => {
            let rate = 1.0 / config.mean_interval_seconds.max(1.0);
            poisson(&mut rng, rate, config.count, config.start, bridge)
        }
        Scenario::Regular => regular(
            config.mean_interval_seconds,
            config.count,
            config.start,
            bridge,
        ),
        Scenario::Commute => commute(config.count, config.start, bridge),
        Scenario::RegimeShift => {
            let before = config.count / 2;
            let mut deltas = jittered(&mut rng, config.mean_interval_seconds, 0.1, before);
            deltas.extend(jittered(
                &mut rng,
                config.mean_interval_seconds / 6.0,
                0.1,
                config.count.saturating_sub(before + 1),
            ));
            from_deltas(&deltas, config.start, bridge)
        }
    }
}

/// Events with exponential inter-arrivals at `rate` per second.
pub fn poisson(
    rng: &mut StdRng,
    rate: f64,
    count: usize,
    start: DateTime<Utc>,
    bridge: &str,
) -> Vec<Event> {
    let deltas = exponential(rng, rate, count.saturating_sub(1));
    from_deltas(&deltas, start, bridge)
}

/// `count` exponential deltas at `rate` per second, by inversion.
pub fn exponential(rng: &mut StdRng, rate: f64, count: usize) -> Vec<f64> {
    (0..count)
        .map(|_| {
            let u: f64 = rng.random();
            -(1.0 - u).ln() / rate
        })
        .collect()
}

/// Events exactly `interval_seconds` apart.
pub fn regular(
    interval_seconds: f64,
    count: usize,
    start: DateTime<Utc>,
    bridge: &str,
) -> Vec<Event> {
    let deltas = vec![interval_seconds; count.saturating_sub(1)];
    from_deltas(&deltas, start, bridge)
}

/// `count` deltas uniformly within `base × (1 ± jitter)`.
pub fn jittered(rng: &mut StdRng, base: f64, jitter: f64, count: usize) -> Vec<f64> {
    (0..count)
        .map(|_| base * (1.0 + jitter * (2.0 * rng.random::<f64>() - 1.0)))
        .collect()
}

/// One opening per commute hour on weekdays, starting the day of `start`.
///
/// Minutes vary as `(k × 7) mod 20` so openings never collide.
pub fn commute(count: usize, start: DateTime<Utc>, bridge: &str) -> Vec<Event> {
    let midnight = start - Duration::seconds(i64::from(start.num_seconds_from_midnight()));
    let mut events = Vec::with_capacity(count);
    let mut day = 0i64;
    while events.len() < count {
        let date = midnight + Duration::days(day);
        if date.weekday().number_from_monday() <= 5 {
            for hour in COMMUTE_HOURS {
                if events.len() == count {
                    break;
                }
                let minute = (events.len() as i64 * 7) % 20;
                let open = date + Duration::hours(hour) + Duration::minutes(minute);
                events.push(opening(events.len(), bridge, open));
            }
        }
        day += 1;
    }
    events
}

/// Events whose consecutive open times differ by `deltas`; `deltas.len() + 1`
/// events in total.
pub fn from_deltas(deltas: &[f64], start: DateTime<Utc>, bridge: &str) -> Vec<Event> {
    let mut events = Vec::with_capacity(deltas.len() + 1);
    let mut t = start;
    events.push(opening(0, bridge, t));
    for (i, d) in deltas.iter().enumerate() {
        t += Duration::milliseconds((d * 1_000.0).round() as i64);
        events.push(opening(i + 1, bridge, t));
    }
    events
}

fn opening(index: usize, bridge: &str, open: DateTime<Utc>) -> Event {
    Event::new(format!("{bridge}-{index}"), bridge, open)
        .closed_at(open + Duration::minutes(OPEN_MINUTES))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_log() {
        let config = SyntheticConfig::default();
        assert_eq!(generate(&config), generate(&config));
        let other = SyntheticConfig {
            seed: 7,
            ..SyntheticConfig::default()
        };
        assert_ne!(generate(&config), generate(&other));
    }

    #[test]
    fn test_counts() {
        for scenario in Scenario::value_variants() {
            let config = SyntheticConfig {
                scenario: *scenario,
                count: 101,
                ..SyntheticConfig::default()
            };
            assert_eq!(generate(&config).len(), 101, "{scenario:?}");
        }
    }

    #[test]
    fn test_regular_spacing() {
        let events = regular(600.0, 4, default_start(), "b");
        assert_eq!(events[3].open_time - events[0].open_time, Duration::minutes(30));
        assert!(events.iter().all(|e| !e.is_open()));
    }

    #[test]
    fn test_commute_only_weekday_rush_hours() {
        let events = commute(200, default_start(), "b");
        for e in &events {
            assert!(e.open_time.weekday().number_from_monday() <= 5);
            assert!(COMMUTE_HOURS.contains(&i64::from(e.open_time.hour())));
        }
    }

    #[test]
    fn test_jitter_bounds() {
        let mut rng = StdRng::seed_from_u64(1);
        let deltas = jittered(&mut rng, 1_000.0, 0.1, 500);
        assert!(deltas.iter().all(|d| (900.0..=1_100.0).contains(d)));
    }

    #[test]
    fn test_exponential_mean() {
        let mut rng = StdRng::seed_from_u64(3);
        let deltas = exponential(&mut rng, 1.0 / 600.0, 5_000);
        assert_eq!(deltas.len(), 5_000);
        assert!(deltas.iter().all(|d| *d >= 0.0));
        let mean = deltas.iter().sum::<f64>() / deltas.len() as f64;
        assert!((mean - 600.0).abs() < 30.0, "{mean}");
    }
}
