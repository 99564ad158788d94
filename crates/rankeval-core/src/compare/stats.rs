//! Distribution helpers for the paired significance tests.

/// Two-sided p-value of Student's t statistic with `df` degrees of freedom.
///
/// `p = I_{df / (df + t^2)}(df / 2, 1 / 2)`
pub(crate) fn student_t_two_sided(t: f64, df: usize) -> f64 {
    if df == 0 || !t.is_finite() {
        return if t.is_finite() { 1.0 } else { 0.0 };
    }
    #[allow(clippy::cast_precision_loss)]
    let df = df as f64;
    let x = df / (df + t * t);
    regularized_incomplete_beta(df / 2.0, 0.5, x).clamp(0.0, 1.0)
}

/// Two-sided exact binomial p-value for `successes` out of `trials` at p = 0.5.
///
/// `p = min(1, 2 * sum_{i=0..=m} C(n, i) / 2^n)` with `m = min(successes, trials - successes)`.
/// Terms are accumulated in log space so large `n` does not underflow.
pub(crate) fn binomial_two_sided(successes: usize, trials: usize) -> f64 {
    let m = successes.min(trials - successes.min(trials));
    #[allow(clippy::cast_precision_loss)]
    let n = trials as f64;

    let mut log_term = -n * std::f64::consts::LN_2;
    let mut tail = log_term.exp();
    for i in 0..m {
        #[allow(clippy::cast_precision_loss)]
        let ratio = (n - i as f64) / (i as f64 + 1.0);
        log_term += ratio.ln();
        tail += log_term.exp();
    }
    (2.0 * tail).min(1.0)
}

fn regularized_incomplete_beta(a: f64, b: f64, x: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }

    let front = (ln_gamma(a + b) - ln_gamma(a) - ln_gamma(b) + a * x.ln() + b * (1.0 - x).ln())
        .exp();

    if x < (a + 1.0) / (a + b + 2.0) {
        front * beta_continued_fraction(a, b, x) / a
    } else {
        1.0 - front * beta_continued_fraction(b, a, 1.0 - x) / b
    }
}

/// Lentz evaluation of the continued fraction for the incomplete beta function.
fn beta_continued_fraction(a: f64, b: f64, x: f64) -> f64 {
    const MAX_ITER: usize = 300;
    const EPS: f64 = 1e-14;
    const TINY: f64 = 1e-300;

    let guard = |v: f64| if v.abs() < TINY { TINY } else { v };

    let qab = a + b;
    let qap = a + 1.0;
    let qam = a - 1.0;

    let mut c = 1.0;
    let mut d = 1.0 / guard(1.0 - qab * x / qap);
    let mut h = d;

    for m in 1..=MAX_ITER {
        #[allow(clippy::cast_precision_loss)]
        let m = m as f64;
        let m2 = 2.0 * m;

        let aa = m * (b - m) * x / ((qam + m2) * (a + m2));
        d = 1.0 / guard(1.0 + aa * d);
        c = guard(1.0 + aa / c);
        h *= d * c;

        let aa = -(a + m) * (qab + m) * x / ((a + m2) * (qap + m2));
        d = 1.0 / guard(1.0 + aa * d);
        c = guard(1.0 + aa / c);
        let delta = d * c;
        h *= delta;

        if (delta - 1.0).abs() < EPS {
            break;
        }
    }
    h
}

/// Lanczos approximation of `ln Γ(x)` for `x > 0`.
fn ln_gamma(x: f64) -> f64 {
    const COEFFS: [f64; 6] = [
        76.180_091_729_471_46,
        -86.505_320_329_416_77,
        24.014_098_240_830_91,
        -1.231_739_572_450_155,
        0.001_208_650_973_866_179,
        -0.000_005_395_239_384_953,
    ];

    let tmp = x + 5.5;
    let tmp = tmp - (x + 0.5) * tmp.ln();
    let mut series = 1.000_000_000_190_015;
    let mut y = x;
    for c in COEFFS {
        y += 1.0;
        series += c / y;
    }
    -tmp + (2.506_628_274_631_000_5 * series / x).ln()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_student_t_two_degrees_of_freedom() {
        // closed form for df = 2: p = 1 - |t| / sqrt(2 + t^2)
        for t in [0.5_f64, 1.0, 2.5, 5.0] {
            let expected = 1.0 - t / (2.0 + t * t).sqrt();
            assert!((student_t_two_sided(t, 2) - expected).abs() < 1e-8, "t = {t}");
            assert!((student_t_two_sided(-t, 2) - expected).abs() < 1e-8);
        }
    }

    #[test]
    fn test_student_t_one_degree_of_freedom() {
        // Cauchy: p = 1 - 2 atan(|t|) / pi
        let t = 1.0_f64;
        let expected = 1.0 - 2.0 * t.atan() / std::f64::consts::PI;
        assert!((student_t_two_sided(t, 1) - expected).abs() < 1e-8);
    }

    #[test]
    fn test_student_t_zero_statistic() {
        assert!((student_t_two_sided(0.0, 10) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_binomial_small_cases() {
        assert!((binomial_two_sided(0, 5) - 0.0625).abs() < 1e-12);
        assert!((binomial_two_sided(5, 5) - 0.0625).abs() < 1e-12);
        assert!((binomial_two_sided(2, 10) - 0.109_375).abs() < 1e-12);
        assert!((binomial_two_sided(3, 6) - 1.0).abs() < 1e-12);
        assert!((binomial_two_sided(0, 0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_binomial_large_trials_do_not_underflow() {
        let p = binomial_two_sided(1000, 2000);
        assert!((p - 1.0).abs() < 1e-12);
        let p = binomial_two_sided(850, 2000);
        assert!(p > 0.0 && p < 1e-8);
    }

    #[test]
    fn test_ln_gamma_integers() {
        // Γ(5) = 24
        assert!((ln_gamma(5.0) - 24f64.ln()).abs() < 1e-9);
        assert!(ln_gamma(1.0).abs() < 1e-9);
    }
}
