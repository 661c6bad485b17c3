// =============================================================================
// Rolling Volatility
// =============================================================================
//
// Sample standard deviation (n - 1) of a series over a trailing window.  The
// window is always supplied by the caller; 10, 20 and 30 sessions are all in
// use depending on whether the series feeds training or the risk report.

use super::rolling;
use crate::stats;

/// Rolling sample standard deviation of `values` over `window`.
pub fn rolling_std(values: &[f64], window: usize) -> Vec<f64> {
    if window < 2 {
        return vec![f64::NAN; values.len()];
    }
    rolling(values, window, |w| stats::sample_std(w).unwrap_or(f64::NAN))
}

/// Volatility column: rolling std of the (already computed) return series.
pub fn calculate_volatility(returns: &[f64], window: usize) -> Vec<f64> {
    rolling_std(returns, window)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_returns_have_zero_volatility() {
        let r = vec![0.01; 30];
        let vol = calculate_volatility(&r, 10);
        assert!(vol[..9].iter().all(|v| v.is_nan()));
        assert!(vol[9..].iter().all(|&v| v.abs() < 1e-12));
    }

    #[test]
    fn leading_nan_return_delays_first_value() {
        // returns[0] is always NaN, so the first full window ends at index `window`.
        let mut r = vec![f64::NAN];
        r.extend([0.01, -0.01, 0.02, -0.02]);
        let vol = calculate_volatility(&r, 3);
        assert!(vol[2].is_nan());
        assert!(vol[3].is_finite());
    }

    #[test]
    fn window_below_two_is_undefined() {
        assert!(rolling_std(&[1.0, 2.0, 3.0], 1).iter().all(|v| v.is_nan()));
    }

    #[test]
    fn known_sample_std() {
        let v = [1.0, 2.0, 3.0, 4.0];
        let s = rolling_std(&v, 4);
        // sample variance of 1..4 = 5/3
        assert!((s[3] - (5.0_f64 / 3.0).sqrt()).abs() < 1e-12);
    }
}
