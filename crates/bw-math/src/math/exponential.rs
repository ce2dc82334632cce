//! Exponential distribution helpers for inter-arrival modelling.
//!
//! For a homogeneous Poisson process with rate `λ`, inter-arrival times are
//! `Exp(λ)`. The maximum-likelihood estimate from `n` positive samples is
//! `λ̂ = n / Σ xᵢ`.

/// Maximum-likelihood rate estimate. `None` unless at least one sample is
/// positive and finite.
pub fn rate_mle(samples: &[f64]) -> Option<f64> {
    let mut n = 0usize;
    let mut total = 0.0;
    for &x in samples {
        if x.is_finite() && x > 0.0 {
            n += 1;
            total += x;
        }
    }
    if n == 0 || total <= 0.0 {
        return None;
    }
    Some(n as f64 / total)
}

/// CDF `1 − exp(−λx)` for `x ≥ 0`.
pub fn cdf(x: f64, rate: f64) -> f64 {
    if x <= 0.0 || rate <= 0.0 {
        return 0.0;
    }
    -(-rate * x).exp_m1()
}

/// Quantile function `−ln(1 − p) / λ`.
pub fn quantile(p: f64, rate: f64) -> Option<f64> {
    if !(0.0..1.0).contains(&p) || rate <= 0.0 {
        return None;
    }
    Some(-(-p).ln_1p() / rate)
}

/// Log-likelihood of the samples under `Exp(rate)`.
pub fn log_likelihood(samples: &[f64], rate: f64) -> f64 {
    if rate <= 0.0 {
        return f64::NEG_INFINITY;
    }
    let ln_rate = rate.ln();
    samples
        .iter()
        .filter(|x| x.is_finite() && **x >= 0.0)
        .map(|&x| ln_rate - rate * x)
        .sum()
}
