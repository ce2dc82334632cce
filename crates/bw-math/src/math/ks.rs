//! Two-sample Kolmogorov–Smirnov test.
//!
//! The statistic is the largest vertical gap between the two empirical CDFs:
//! ```text
//! D = sup_x |F₁(x) − F₂(x)|
//! ```
//! The p-value uses the asymptotic Kolmogorov distribution with the usual
//! small-sample correction on the effective size `nₑ = n₁n₂ / (n₁ + n₂)`:
//! ```text
//! p ≈ Q_KS((√nₑ + 0.12 + 0.11/√nₑ) · D)
//! Q_KS(λ) = 2 Σ_{j≥1} (−1)^{j−1} exp(−2 j² λ²)
//! ```

use crate::math::quantile::sorted_finite;

const Q_KS_EPS1: f64 = 1e-6;
const Q_KS_EPS2: f64 = 1e-16;
const Q_KS_MAX_TERMS: usize = 100;

/// Two-sample KS statistic `D ∈ [0, 1]`. Ties are stepped together so
/// identical samples give exactly zero.
///
/// Returns `None` when either sample has no finite values.
pub fn statistic(a: &[f64], b: &[f64]) -> Option<f64> {
    let a = sorted_finite(a);
    let b = sorted_finite(b);
    if a.is_empty() || b.is_empty() {
        return None;
    }
    let (n1, n2) = (a.len() as f64, b.len() as f64);
    let (mut i, mut j) = (0usize, 0usize);
    let mut d: f64 = 0.0;
    while i < a.len() && j < b.len() {
        let x = a[i].min(b[j]);
        while i < a.len() && a[i] <= x {
            i += 1;
        }
        while j < b.len() && b[j] <= x {
            j += 1;
        }
        d = d.max((i as f64 / n1 - j as f64 / n2).abs());
    }
    Some(d)
}

/// Complementary Kolmogorov distribution `Q_KS(λ)`.
pub fn kolmogorov_q(lambda: f64) -> f64 {
    if !lambda.is_finite() {
        return 0.0;
    }
    // The alternating series converges slowly near zero, where Q is 1.
    if lambda < 0.2 {
        return 1.0;
    }
    let a2 = -2.0 * lambda * lambda;
    let mut fac = 2.0;
    let mut sum = 0.0;
    let mut prev_term = 0.0;
    for j in 1..=Q_KS_MAX_TERMS {
        let jf = j as f64;
        let term = fac * (a2 * jf * jf).exp();
        sum += term;
        if term.abs() <= Q_KS_EPS1 * prev_term || term.abs() <= Q_KS_EPS2 * sum {
            return sum.clamp(0.0, 1.0);
        }
        fac = -fac;
        prev_term = term.abs();
    }
    // Failed to converge: only happens for tiny λ, already handled above.
    1.0
}

/// Asymptotic p-value for statistic `d` with sample sizes `n1`, `n2`.
pub fn p_value(d: f64, n1: usize, n2: usize) -> f64 {
    if n1 == 0 || n2 == 0 {
        return 1.0;
    }
    let ne = (n1 as f64 * n2 as f64) / (n1 + n2) as f64;
    let sqrt_ne = ne.sqrt();
    kolmogorov_q((sqrt_ne + 0.12 + 0.11 / sqrt_ne) * d)
}

/// Result of a two-sample test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KsTest {
    pub statistic: f64,
    pub p_value: f64,
    pub n1: usize,
    pub n2: usize,
}

/// Run the full two-sample test. `None` if either side is empty.
pub fn two_sample(a: &[f64], b: &[f64]) -> Option<KsTest> {
    let d = statistic(a, b)?;
    let n1 = a.iter().filter(|v| v.is_finite()).count();
    let n2 = b.iter().filter(|v| v.is_finite()).count();
    Some(KsTest {
        statistic: d,
        p_value: p_value(d, n1, n2),
        n1,
        n2,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_samples_zero_statistic() {
        let a = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(statistic(&a, &a), Some(0.0));
        let t = two_sample(&a, &a).unwrap();
        assert_eq!(t.p_value, 1.0);
    }

    #[test]
    fn test_all_ties_zero_statistic() {
        let a = vec![3600.0; 50];
        let b = vec![3600.0; 70];
        assert_eq!(statistic(&a, &b), Some(0.0));
    }

    #[test]
    fn test_disjoint_samples() {
        let a: Vec<f64> = (0..50).map(|i| i as f64).collect();
        let b: Vec<f64> = (100..150).map(|i| i as f64).collect();
        let t = two_sample(&a, &b).unwrap();
        assert_eq!(t.statistic, 1.0);
        assert!(t.p_value < 1e-6, "p={}", t.p_value);
    }

    #[test]
    fn test_kolmogorov_q_known_values() {
        // Q_KS(1.36) ≈ 0.049 (the classic 5% critical value).
        let q = kolmogorov_q(1.36);
        assert!((q - 0.0494).abs() < 0.002, "q={q}");
        assert_eq!(kolmogorov_q(0.0), 1.0);
        assert!(kolmogorov_q(5.0) < 1e-10);
    }

    #[test]
    fn test_p_value_monotone_in_d() {
        let p1 = p_value(0.1, 100, 100);
        let p2 = p_value(0.2, 100, 100);
        let p3 = p_value(0.4, 100, 100);
        assert!(p1 > p2 && p2 > p3);
    }

    #[test]
    fn test_empty_side() {
        assert!(statistic(&[], &[1.0]).is_none());
        assert!(two_sample(&[1.0], &[]).is_none());
    }
}
