//! Numerically stable log-domain primitives.
//!
//! The transforms between constrained and unconstrained coordinates used by
//! the variational families live here so their log-Jacobians stay finite for
//! large magnitudes.

/// Stable `log(sum(exp(x_i)))`.
///
/// Returns `-inf` for an empty slice and NaN when any input is NaN.
pub fn log_sum_exp(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NEG_INFINITY;
    }
    if values.iter().any(|v| v.is_nan()) {
        return f64::NAN;
    }
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max == f64::NEG_INFINITY {
        return f64::NEG_INFINITY;
    }
    if max == f64::INFINITY {
        return f64::INFINITY;
    }
    let sum: f64 = values.iter().map(|v| (v - max).exp()).sum();
    max + sum.ln()
}

/// Stable softplus: `log(1 + exp(x))`.
pub fn log1p_exp(x: f64) -> f64 {
    if x > 35.0 {
        x
    } else if x < -35.0 {
        x.exp()
    } else {
        x.exp().ln_1p()
    }
}

/// Logistic sigmoid mapping the real line onto (0, 1).
pub fn logistic(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// Inverse of [`logistic`]. Returns +/-inf at the interval endpoints.
pub fn logit(p: f64) -> f64 {
    (p / (1.0 - p)).ln()
}

/// `log |d logistic(u) / du|`, i.e. `log σ(u) + log σ(-u)`.
pub fn logistic_log_jacobian(u: f64) -> f64 {
    -log1p_exp(-u) - log1p_exp(u)
}

/// `x * ln(y)` with the convention `0 * ln(0) = 0`.
pub fn xlogy(x: f64, y: f64) -> f64 {
    if x == 0.0 {
        0.0
    } else {
        x * y.ln()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        if a.is_nan() || b.is_nan() {
            return false;
        }
        (a - b).abs() <= tol
    }

    #[test]
    fn log_sum_exp_basic() {
        let out = log_sum_exp(&[0.0, 0.0]);
        assert!(approx_eq(out, 2.0f64.ln(), 1e-12));
    }

    #[test]
    fn log_sum_exp_handles_extremes() {
        let out = log_sum_exp(&[1000.0, 1000.0]);
        assert!(approx_eq(out, 1000.0 + 2.0f64.ln(), 1e-9));
        assert_eq!(log_sum_exp(&[]), f64::NEG_INFINITY);
        assert_eq!(
            log_sum_exp(&[f64::NEG_INFINITY, f64::NEG_INFINITY]),
            f64::NEG_INFINITY
        );
        assert!(log_sum_exp(&[0.0, f64::NAN]).is_nan());
    }

    #[test]
    fn logistic_and_logit_invert() {
        for &u in &[-8.0, -1.5, 0.0, 0.3, 4.0] {
            assert!(approx_eq(logit(logistic(u)), u, 1e-9));
        }
        assert!(approx_eq(logistic(0.0), 0.5, 1e-15));
        assert!(logistic(-800.0) >= 0.0);
        assert!(logistic(800.0) <= 1.0);
    }

    #[test]
    fn logistic_jacobian_matches_derivative() {
        let u: f64 = 0.7;
        let s = logistic(u);
        assert!(approx_eq(logistic_log_jacobian(u), (s * (1.0 - s)).ln(), 1e-12));
        assert!(logistic_log_jacobian(500.0).is_finite());
    }

    #[test]
    fn softplus_is_monotone_and_stable() {
        assert!(approx_eq(log1p_exp(0.0), 2.0f64.ln(), 1e-12));
        assert!(approx_eq(log1p_exp(100.0), 100.0, 1e-12));
        assert!(log1p_exp(-100.0) > 0.0);
    }

    #[test]
    fn xlogy_zero_convention() {
        assert_eq!(xlogy(0.0, 0.0), 0.0);
        assert_eq!(xlogy(2.0, 1.0), 0.0);
        assert_eq!(xlogy(1.0, 0.0), f64::NEG_INFINITY);
    }
}
