//! Change-point detection on the inter-arrival series.
//!
//! Deltas of a Poisson process are exponential, so both detectors score
//! samples against an exponential reference fitted on a calibration prefix
//! of the current segment (mean `μ₀ = 1/λ₀`):
//!
//! - two one-sided CUSUMs of the log-likelihood ratio for the rate moving
//!   to `ρλ₀` or `λ₀/ρ`, alarming above `h`;
//! - an EWMA of standardized `ln δ`, alarming when `|E| > L·√(α/(2-α))`.
//!
//! A CUSUM alarm is confirmed when the EWMA leaves its band the same way
//! within the agreement window, no earlier than the CUSUM's own change
//! estimate, and the best two-rate split around it beats a single rate by
//! `2 ln Λ ≥ min_split_statistic`. The split is the reported index;
//! detection re-calibrates from there.

use bw_common::PatternStability;
use bw_config::ChangePointConfig;
use bw_math::{coefficient_of_variation, mean, std_dev};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::inter_arrival::InterArrivalStats;

/// Deltas are taken at millisecond resolution; logs never see less.
const MIN_DELTA_SECONDS: f64 = 1e-3;

/// Which way the event rate moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeDirection {
    /// Deltas shrank: openings became more frequent.
    RateIncrease,
    /// Deltas grew: openings became rarer.
    RateDecrease,
}

impl std::fmt::Display for ChangeDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeDirection::RateIncrease => write!(f, "increase"),
            ChangeDirection::RateDecrease => write!(f, "decrease"),
        }
    }
}

/// A confirmed change in the inter-arrival process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangePoint {
    /// Index of the first post-change delta.
    pub index: usize,
    /// Open time of the event ending that delta.
    pub at: Option<DateTime<Utc>>,
    pub cusum_alarm: usize,
    pub ewma_alarm: usize,
    pub direction: ChangeDirection,
    /// `2 ln Λ` of the split against a single rate.
    pub likelihood_ratio: f64,
    /// Starts within the last `recent_fraction` of the series.
    pub recent: bool,
    pub mean_before: f64,
    pub mean_after: f64,
}

impl ChangePoint {
    /// New rate over old rate (`> 1` for an increase).
    pub fn rate_ratio(&self) -> f64 {
        if self.mean_after > 0.0 {
            self.mean_before / self.mean_after
        } else {
            1.0
        }
    }
}

/// Detector output plus the derived stability classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeDetection {
    /// A recent change was confirmed.
    pub change_detected: bool,
    /// Index of that change.
    pub change_index: Option<usize>,
    /// Every confirmed change, oldest first.
    pub changes: Vec<ChangePoint>,
    pub stability: PatternStability,
    pub sample_count: usize,
    pub coefficient_of_variation: f64,
    /// All deltas identical.
    pub degenerate: bool,
    /// CUSUM alarms raised, confirmed or not.
    pub cusum_alarms: usize,
    /// EWMA excursions beyond the control band.
    pub ewma_alarms: usize,
}

impl ChangeDetection {
    pub fn has_change(&self) -> bool {
        !self.changes.is_empty()
    }

    pub fn latest(&self) -> Option<&ChangePoint> {
        self.changes.last()
    }

    /// The latest change, when it is recent.
    pub fn recent_change(&self) -> Option<&ChangePoint> {
        self.latest().filter(|change| change.recent)
    }

    /// Samples since the latest change, or the whole series without one.
    pub fn post_change_samples(&self) -> usize {
        match self.latest() {
            Some(change) => self.sample_count.saturating_sub(change.index),
            None => self.sample_count,
        }
    }
}

/// Exponential reference fitted on a calibration prefix.
#[derive(Debug, Clone, Copy)]
struct Reference {
    mean: f64,
    log_mean: f64,
    log_sigma: f64,
}

impl Reference {
    fn calibrate(prefix: &[f64], log_sigma_floor: f64) -> Option<Self> {
        let mu = mean(prefix);
        if !(mu.is_finite() && mu > 0.0) {
            return None;
        }
        let logs: Vec<f64> = prefix.iter().map(|&d| log_delta(d)).collect();
        Some(Self {
            mean: mu,
            log_mean: mean(&logs),
            log_sigma: std_dev(&logs).max(log_sigma_floor),
        })
    }
}

fn log_delta(delta: f64) -> f64 {
    delta.max(MIN_DELTA_SECONDS).ln()
}

/// One-sided CUSUM of a per-sample log-likelihood ratio.
#[derive(Debug, Clone, Copy)]
struct Cusum {
    sum: f64,
    last_zero: usize,
}

impl Cusum {
    fn new(last_zero: usize) -> Self {
        Self { sum: 0.0, last_zero }
    }

    fn push(&mut self, i: usize, llr: f64) {
        self.sum = (self.sum + llr).max(0.0);
        if self.sum == 0.0 {
            self.last_zero = i;
        }
    }
}

/// Latest excursion of the EWMA beyond one side of its band.
#[derive(Debug, Clone, Copy, Default)]
struct Excursion {
    outside: bool,
    start: Option<usize>,
}

impl Excursion {
    /// Returns true when a new excursion begins at `i`.
    fn update(&mut self, i: usize, outside: bool) -> bool {
        let began = outside && !self.outside;
        if began {
            self.start = Some(i);
        }
        self.outside = outside;
        began
    }
}

/// Alarm raised by one of the CUSUMs.
#[derive(Debug, Clone, Copy)]
struct CusumAlarm {
    at: usize,
    change: usize,
    direction: ChangeDirection,
}

#[derive(Debug, Clone, Copy, Default)]
struct AlarmTally {
    cusum: usize,
    ewma: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ChangePointDetector {
    config: ChangePointConfig,
}

impl ChangePointDetector {
    pub fn new(config: ChangePointConfig) -> Self {
        Self { config }
    }

    pub fn detect(&self, stats: &InterArrivalStats) -> ChangeDetection {
        let deltas = &stats.deltas;
        let n = deltas.len();
        let cov = coefficient_of_variation(deltas);
        let degenerate = n >= 2 && std_dev(deltas) == 0.0;

        let (mut changes, tally) = self.scan(deltas);
        let bounds: Vec<usize> = std::iter::once(0)
            .chain(changes.iter().map(|c| c.index))
            .chain(std::iter::once(n))
            .collect();
        let recent_from = n.saturating_sub((self.config.recent_fraction * n as f64).ceil() as usize);
        for (i, change) in changes.iter_mut().enumerate() {
            change.mean_before = mean(&deltas[bounds[i]..bounds[i + 1]]);
            change.mean_after = mean(&deltas[bounds[i + 1]..bounds[i + 2]]);
            change.at = stats.delta_times.get(change.index).copied();
            change.recent = change.index >= recent_from;
        }

        let stability = self.classify(n, degenerate, &changes, cov);
        let recent = changes.last().filter(|c| c.recent).map(|c| c.index);
        debug!(
            samples = n,
            changes = changes.len(),
            recent_change = ?recent,
            cusum_alarms = tally.cusum,
            ewma_alarms = tally.ewma,
            cov,
            stability = %stability,
            "change detection complete"
        );
        ChangeDetection {
            change_detected: recent.is_some(),
            change_index: recent,
            changes,
            stability,
            sample_count: n,
            coefficient_of_variation: cov,
            degenerate,
            cusum_alarms: tally.cusum,
            ewma_alarms: tally.ewma,
        }
    }

    /// Several changes mark the series very unstable whatever their age; a
    /// single change only counts while it is recent.
    fn classify(
        &self,
        n: usize,
        degenerate: bool,
        changes: &[ChangePoint],
        cov: f64,
    ) -> PatternStability {
        let c = &self.config;
        if n < 2 {
            PatternStability::Unknown
        } else if degenerate {
            PatternStability::VeryStable
        } else if changes.len() >= 2 || cov > c.very_unstable_cov {
            PatternStability::VeryUnstable
        } else if changes.last().is_some_and(|change| change.recent) {
            PatternStability::Unstable
        } else if cov < c.very_stable_cov {
            PatternStability::VeryStable
        } else {
            PatternStability::Stable
        }
    }

    /// Confirmed change points over the whole series.
    fn scan(&self, deltas: &[f64]) -> (Vec<ChangePoint>, AlarmTally) {
        let mut changes = Vec::new();
        let mut tally = AlarmTally::default();
        let window = (self.config.agreement_window_fraction * deltas.len() as f64).floor() as usize;
        let mut start = 0;
        while let Some(change) = self.scan_segment(deltas, start, window, &mut tally) {
            debug!(
                index = change.index,
                cusum_alarm = change.cusum_alarm,
                ewma_alarm = change.ewma_alarm,
                likelihood_ratio = change.likelihood_ratio,
                direction = %change.direction,
                "change point confirmed"
            );
            start = change.index;
            changes.push(change);
        }
        (changes, tally)
    }

    /// First confirmed change in `deltas[start..]`, indices absolute.
    fn scan_segment(
        &self,
        deltas: &[f64],
        start: usize,
        window: usize,
        tally: &mut AlarmTally,
    ) -> Option<ChangePoint> {
        let c = &self.config;
        let segment = &deltas[start..];
        let calibration = c
            .min_calibration_samples
            .max((c.calibration_fraction * segment.len() as f64).ceil() as usize)
            .max(2);
        if segment.len() <= calibration {
            return None;
        }
        let reference = Reference::calibrate(&segment[..calibration], c.log_sigma_floor)?;

        let rho = c.rate_shift_factor;
        let ln_rho = rho.ln();
        let ewma_limit = c.ewma_l * (c.ewma_alpha / (2.0 - c.ewma_alpha)).sqrt();

        let mut faster = Cusum::new(calibration - 1);
        let mut slower = Cusum::new(calibration - 1);
        let mut ewma: f64 = 0.0;
        let mut high = Excursion::default();
        let mut low = Excursion::default();
        let mut pending: Option<CusumAlarm> = None;

        for (i, &delta) in segment.iter().enumerate().skip(calibration) {
            let x = (delta / reference.mean).min(1.0 + c.residual_clip);
            let z = ((log_delta(delta) - reference.log_mean) / reference.log_sigma)
                .clamp(-c.residual_clip, c.residual_clip);

            ewma = c.ewma_alpha * z + (1.0 - c.ewma_alpha) * ewma;
            if high.update(i, ewma > ewma_limit) {
                tally.ewma += 1;
            }
            if low.update(i, ewma < -ewma_limit) {
                tally.ewma += 1;
            }

            if pending.is_none() {
                // ln f(δ; λ₁) - ln f(δ; λ₀) with δ in units of μ₀.
                faster.push(i, ln_rho - (rho - 1.0) * x);
                slower.push(i, (1.0 - 1.0 / rho) * x - ln_rho);
                pending = if faster.sum > c.cusum_h {
                    Some(CusumAlarm {
                        at: i,
                        change: faster.last_zero + 1,
                        direction: ChangeDirection::RateIncrease,
                    })
                } else if slower.sum > c.cusum_h {
                    Some(CusumAlarm {
                        at: i,
                        change: slower.last_zero + 1,
                        direction: ChangeDirection::RateDecrease,
                    })
                } else {
                    None
                };
                if pending.is_some() {
                    tally.cusum += 1;
                }
            }

            let Some(alarm) = pending else {
                continue;
            };
            let excursion = match alarm.direction {
                ChangeDirection::RateIncrease => low.start,
                ChangeDirection::RateDecrease => high.start,
            };
            let agreed = excursion.filter(|&e| e >= alarm.change && e.abs_diff(alarm.at) <= window);

            if let Some(e) = agreed {
                let end = segment.len().min(alarm.at + window + 1);
                let lo = alarm.change.saturating_sub(window).max(1);
                match best_split(&segment[..end], lo, alarm.at) {
                    Some((split, statistic)) if statistic >= c.min_split_statistic => {
                        return Some(ChangePoint {
                            index: start + split,
                            at: None,
                            cusum_alarm: start + alarm.at,
                            ewma_alarm: start + e,
                            direction: alarm.direction,
                            likelihood_ratio: statistic,
                            recent: false,
                            mean_before: 0.0,
                            mean_after: 0.0,
                        });
                    }
                    split => {
                        debug!(
                            cusum_alarm = start + alarm.at,
                            statistic = ?split.map(|(_, s)| s),
                            "change rejected by split test"
                        );
                        pending = None;
                    }
                }
            } else if i >= alarm.at + window {
                pending = None;
            }

            if pending.is_none() {
                // Unconfirmed: restart both detectors after the alarm.
                faster = Cusum::new(i);
                slower = Cusum::new(i);
                ewma = 0.0;
                high = Excursion::default();
                low = Excursion::default();
            }
        }
        None
    }
}

/// Best single split of `deltas` under a piecewise-exponential model,
/// searched over `lo..=hi`. Returns the split and `2 ln Λ` against one rate.
fn best_split(deltas: &[f64], lo: usize, hi: usize) -> Option<(usize, f64)> {
    let n = deltas.len();
    let mut prefix = Vec::with_capacity(n + 1);
    let mut sum = 0.0;
    prefix.push(sum);
    for &d in deltas {
        sum += d;
        prefix.push(sum);
    }
    let total = prefix[n];
    if n < 2 || total <= 0.0 {
        return None;
    }

    // Profile log-likelihood up to constants: -k ln(mean₁) - (n-k) ln(mean₂).
    let mut best: Option<(usize, f64)> = None;
    for k in lo.max(1)..=hi.min(n - 1) {
        let before = prefix[k] / k as f64;
        let after = (total - prefix[k]) / (n - k) as f64;
        if before <= 0.0 || after <= 0.0 {
            continue;
        }
        let ll = -(k as f64) * before.ln() - (n - k) as f64 * after.ln();
        match best {
            Some((_, b)) if b >= ll => {}
            _ => best = Some((k, ll)),
        }
    }
    let null = -(n as f64) * (total / n as f64).ln();
    best.map(|(k, ll)| (k, 2.0 * (ll - null)))
}
