//! Statistical primitives for hypothesis validation.
//!
//! Provides the two-sample Welch test, Cohen's d, Pearson correlation and
//! the distribution functions behind their p-values. Everything here works
//! on summary statistics, never on raw rows.

use serde::{Deserialize, Serialize};

/// Mean, variance and size of one sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SampleSummary {
    pub mean: f64,
    pub variance: f64,
    pub n: u64,
}

impl SampleSummary {
    #[must_use]
    pub const fn new(mean: f64, variance: f64, n: u64) -> Self {
        Self { mean, variance, n }
    }
}

/// Result of a two-sample Welch t-test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WelchTest {
    /// t statistic, positive when the first sample's mean is larger
    pub statistic: f64,
    /// Welch-Satterthwaite degrees of freedom
    pub degrees_of_freedom: f64,
    /// Two-tailed p-value
    pub p_value: f64,
}

/// Two-sample t-test without assuming equal variances.
///
/// Returns `None` when the test cannot run: either sample has fewer than two
/// observations, or both variances are zero so the standard error vanishes.
///
/// # Examples
/// ```
/// use adsight_core::stats::{welch_t_test, SampleSummary};
///
/// let current = SampleSummary::new(0.0142, 0.008_f64.powi(2), 245);
/// let previous = SampleSummary::new(0.0189, 0.008_f64.powi(2), 238);
/// let test = welch_t_test(&current, &previous).unwrap();
/// assert!(test.statistic < 0.0);
/// assert!(test.p_value < 0.001);
/// ```
#[must_use]
pub fn welch_t_test(a: &SampleSummary, b: &SampleSummary) -> Option<WelchTest> {
    if a.n < 2 || b.n < 2 {
        return None;
    }

    let n_a = a.n as f64;
    let n_b = b.n as f64;
    let se_a = a.variance / n_a;
    let se_b = b.variance / n_b;
    let se_sq = se_a + se_b;
    if !se_sq.is_finite() || se_sq < f64::EPSILON * f64::EPSILON {
        return None;
    }

    let statistic = (a.mean - b.mean) / se_sq.sqrt();
    let df = se_sq * se_sq / (se_a * se_a / (n_a - 1.0) + se_b * se_b / (n_b - 1.0));
    let p_value = students_t_two_tailed(statistic, df);

    Some(WelchTest {
        statistic,
        degrees_of_freedom: df,
        p_value,
    })
}

/// Standardized mean difference `(a - b) / pooled_sd` (Cohen's d).
///
/// Returns 0.0 when the pooled standard deviation is zero.
#[must_use]
pub fn cohens_d(a: &SampleSummary, b: &SampleSummary) -> f64 {
    if a.n + b.n < 3 {
        return 0.0;
    }

    let n_a = a.n as f64;
    let n_b = b.n as f64;
    let pooled_variance =
        ((n_a - 1.0).max(0.0) * a.variance + (n_b - 1.0).max(0.0) * b.variance) / (n_a + n_b - 2.0);
    let pooled_sd = pooled_variance.sqrt();
    if !pooled_sd.is_finite() || pooled_sd < f64::EPSILON {
        return 0.0;
    }

    (a.mean - b.mean) / pooled_sd
}

/// Calculates the Pearson correlation coefficient between two series.
///
/// Returns `None` for mismatched lengths, fewer than two points, or when
/// either series is constant, since r is undefined without variance.
#[must_use]
pub fn pearson_correlation(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }
    let is_constant = |s: &[f64]| s.iter().all(|v| v.to_bits() == s[0].to_bits());
    if is_constant(x) || is_constant(y) {
        return None;
    }

    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let mut covariance = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;

    for (xi, yi) in x.iter().zip(y.iter()) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        covariance += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    let denominator = (var_x * var_y).sqrt();
    if !denominator.is_finite() || denominator <= 0.0 {
        return None;
    }

    Some(covariance / denominator)
}

/// Two-tailed p-value for a correlation of `r` over `n` pairs.
///
/// Uses `t = r * sqrt(n-2) / sqrt(1 - r^2)` with n-2 degrees of freedom.
/// `None` when n < 3.
#[must_use]
pub fn correlation_p_value(r: f64, n: usize) -> Option<f64> {
    if n < 3 {
        return None;
    }

    let r_clamped = r.clamp(-0.999_999, 0.999_999);
    let df = n as f64 - 2.0;
    let t_stat = r_clamped * (df / (1.0 - r_clamped * r_clamped)).sqrt();
    Some(students_t_two_tailed(t_stat, df))
}

/// Two-tailed p-value of Student's t distribution, `P(|T| >= |t|)`.
#[must_use]
pub fn students_t_two_tailed(t: f64, df: f64) -> f64 {
    if t.is_nan() || df <= 0.0 || df.is_nan() {
        return 1.0;
    }
    if t.is_infinite() {
        return 0.0;
    }

    let x = df / (df + t * t);
    regularized_incomplete_beta(df / 2.0, 0.5, x).clamp(0.0, 1.0)
}

/// Natural log of the gamma function for x > 0 (Lanczos, g = 7).
fn ln_gamma(x: f64) -> f64 {
    const G: f64 = 7.0;
    const COEFFS: [f64; 9] = [
        0.999_999_999_999_809_9,
        676.520_368_121_885_1,
        -1_259.139_216_722_402_8,
        771.323_428_777_653_1,
        -176.615_029_162_140_6,
        12.507_343_278_686_905,
        -0.138_571_095_265_720_12,
        9.984_369_578_019_572e-6,
        1.505_632_735_149_311_6e-7,
    ];

    let x = x - 1.0;
    let t = x + G + 0.5;
    let series = COEFFS
        .iter()
        .enumerate()
        .skip(1)
        .fold(COEFFS[0], |acc, (i, c)| acc + c / (x + i as f64));

    0.5 * (2.0 * std::f64::consts::PI).ln() + (x + 0.5) * t.ln() - t + series.ln()
}

/// Regularized incomplete beta function `I_x(a, b)`.
fn regularized_incomplete_beta(a: f64, b: f64, x: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }

    let ln_front = ln_gamma(a + b) - ln_gamma(a) - ln_gamma(b) + a * x.ln() + b * (1.0 - x).ln();
    let front = ln_front.exp();

    // The continued fraction converges fastest on this side of the mode
    if x < (a + 1.0) / (a + b + 2.0) {
        front * beta_continued_fraction(a, b, x) / a
    } else {
        1.0 - front * beta_continued_fraction(b, a, 1.0 - x) / b
    }
}

/// Continued fraction for the incomplete beta (modified Lentz).
fn beta_continued_fraction(a: f64, b: f64, x: f64) -> f64 {
    const MAX_ITERATIONS: usize = 300;
    const TOLERANCE: f64 = 3.0e-14;
    const TINY: f64 = 1.0e-300;

    let nudge = |v: f64| if v.abs() < TINY { TINY } else { v };

    let qab = a + b;
    let qap = a + 1.0;
    let qam = a - 1.0;

    let mut c = 1.0;
    let mut d = 1.0 / nudge(1.0 - qab * x / qap);
    let mut h = d;

    for m in 1..=MAX_ITERATIONS {
        let m = m as f64;
        let m2 = 2.0 * m;

        let even = m * (b - m) * x / ((qam + m2) * (a + m2));
        d = 1.0 / nudge(1.0 + even * d);
        c = nudge(1.0 + even / c);
        h *= d * c;

        let odd = -(a + m) * (qab + m) * x / ((a + m2) * (qap + m2));
        d = 1.0 / nudge(1.0 + odd * d);
        c = nudge(1.0 + odd / c);
        let delta = d * c;
        h *= delta;

        if (delta - 1.0).abs() < TOLERANCE {
            break;
        }
    }

    h
}

#[cfg(test)]
mod tests {
    use super::*;

    // ============================================
    // Distribution Tests
    // ============================================

    #[test]
    fn ln_gamma_matches_factorials() {
        // Gamma(5) = 4! = 24
        assert!((ln_gamma(5.0) - 24.0_f64.ln()).abs() < 1e-10);
        // Gamma(0.5) = sqrt(pi)
        let expected = std::f64::consts::PI.sqrt().ln();
        assert!((ln_gamma(0.5) - expected).abs() < 1e-10);
    }

    #[test]
    fn t_two_tailed_known_critical_values() {
        // t = 2.086 is the 97.5th percentile at df = 20
        let p = students_t_two_tailed(2.086, 20.0);
        assert!((p - 0.05).abs() < 0.001, "p was {p}");

        // t = 2.576 approaches the normal 99.5th percentile for large df
        let p = students_t_two_tailed(2.576, 10_000.0);
        assert!((p - 0.01).abs() < 0.0005, "p was {p}");
    }

    #[test]
    fn t_two_tailed_edges() {
        assert!((students_t_two_tailed(0.0, 15.0) - 1.0).abs() < 1e-12);
        assert!(students_t_two_tailed(f64::INFINITY, 15.0).abs() < f64::EPSILON);
        assert!((students_t_two_tailed(1.0, 0.0) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn t_two_tailed_is_symmetric_and_decreasing() {
        let p_pos = students_t_two_tailed(1.7, 30.0);
        let p_neg = students_t_two_tailed(-1.7, 30.0);
        assert!((p_pos - p_neg).abs() < 1e-12);

        let mut previous = 1.0;
        for step in 1..40 {
            let p = students_t_two_tailed(f64::from(step) * 0.25, 30.0);
            assert!(p <= previous, "p increased at t={}", f64::from(step) * 0.25);
            previous = p;
        }
    }

    // ============================================
    // welch_t_test Tests
    // ============================================

    #[test]
    fn welch_detects_large_decline() {
        let current = SampleSummary::new(0.0142, 0.008_f64.powi(2), 245);
        let previous = SampleSummary::new(0.0189, 0.008_f64.powi(2), 238);

        let test = welch_t_test(&current, &previous).unwrap();

        assert!(test.statistic < -6.0, "t was {}", test.statistic);
        assert!(test.p_value < 1e-6, "p was {}", test.p_value);
        assert!(test.degrees_of_freedom > 400.0);
    }

    #[test]
    fn welch_equal_means_not_significant() {
        let a = SampleSummary::new(2.5, 0.25, 50);
        let b = SampleSummary::new(2.5, 0.36, 40);

        let test = welch_t_test(&a, &b).unwrap();

        assert!(test.statistic.abs() < f64::EPSILON);
        assert!((test.p_value - 1.0).abs() < 1e-9, "p was {}", test.p_value);
    }

    #[test]
    fn welch_degrees_of_freedom_fall_back_to_single_sample() {
        let a = SampleSummary::new(3.0, 0.0, 30);
        let b = SampleSummary::new(2.0, 1.0, 21);

        let test = welch_t_test(&a, &b).unwrap();

        assert!((test.degrees_of_freedom - 20.0).abs() < 1e-9);
    }

    #[test]
    fn welch_cannot_run_without_dispersion_or_samples() {
        let a = SampleSummary::new(3.0, 0.0, 30);
        let b = SampleSummary::new(2.0, 0.0, 30);
        assert!(welch_t_test(&a, &b).is_none());

        let a = SampleSummary::new(3.0, 1.0, 1);
        let b = SampleSummary::new(2.0, 1.0, 30);
        assert!(welch_t_test(&a, &b).is_none());
    }

    // ============================================
    // cohens_d Tests
    // ============================================

    #[test]
    fn cohens_d_is_signed_standardized_difference() {
        let a = SampleSummary::new(10.0, 4.0, 50);
        let b = SampleSummary::new(12.0, 4.0, 50);

        let d = cohens_d(&a, &b);

        assert!((d + 1.0).abs() < 1e-12, "d was {d}");
        assert!((cohens_d(&b, &a) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn cohens_d_zero_when_no_dispersion() {
        let a = SampleSummary::new(10.0, 0.0, 50);
        let b = SampleSummary::new(12.0, 0.0, 50);
        assert!(cohens_d(&a, &b).abs() < f64::EPSILON);
    }

    // ============================================
    // Correlation Tests
    // ============================================

    #[test]
    fn pearson_perfect_positive_correlation() {
        let x = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let y = vec![0.01, 0.02, 0.03, 0.04, 0.05];
        let r = pearson_correlation(&x, &y).unwrap();
        assert!(r > 0.99, "r was {r}");
    }

    #[test]
    fn pearson_perfect_negative_correlation() {
        let x = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let y = vec![0.05, 0.04, 0.03, 0.02, 0.01];
        let r = pearson_correlation(&x, &y).unwrap();
        assert!(r < -0.99, "r was {r}");
    }

    #[test]
    fn pearson_degenerate_inputs_are_undefined() {
        assert!(pearson_correlation(&[], &[]).is_none());
        assert!(pearson_correlation(&[0.5], &[0.01]).is_none());
        assert!(pearson_correlation(&[0.1, 0.2], &[0.01]).is_none());
        assert!(pearson_correlation(&[1.0, 1.0, 1.0], &[0.1, 0.2, 0.3]).is_none());
        assert!(pearson_correlation(&[0.0, 1.0, 2.0], &[0.012, 0.012, 0.012]).is_none());
    }

    #[test]
    fn correlation_p_value_strong_vs_weak() {
        let strong = correlation_p_value(0.9, 14).unwrap();
        assert!(strong < 0.001, "p was {strong}");

        let weak = correlation_p_value(0.1, 14).unwrap();
        assert!(weak > 0.5, "p was {weak}");

        assert!(correlation_p_value(0.9, 2).is_none());
    }
}
