// =============================================================================
// Indicator Engine
// =============================================================================
//
// Pure, side-effect-free transforms over an oldest-first price series.  Every
// public function returns a series aligned index-for-index with its input:
// positions whose look-back window is incomplete hold `f64::NAN`, and the
// feature builder discards those rows downstream.
//
// Division by zero never produces an infinity; each indicator substitutes
// the neutral value 0.0 instead.

pub mod atr;
pub mod bollinger;
pub mod macd;
pub mod moving_average;
pub mod range;
pub mod returns;
pub mod rolling_var;
pub mod rsi;
pub mod volatility;

/// Apply `f` to every complete window of `window` values.
///
/// Output index `t` covers `values[t + 1 - window..=t]`.  Windows containing
/// a non-finite value yield NaN, as do the first `window - 1` positions.
pub(crate) fn rolling<F>(values: &[f64], window: usize, f: F) -> Vec<f64>
where
    F: Fn(&[f64]) -> f64,
{
    let mut out = vec![f64::NAN; values.len()];
    if window == 0 || values.len() < window {
        return out;
    }
    for t in (window - 1)..values.len() {
        let slice = &values[t + 1 - window..=t];
        if slice.iter().all(|v| v.is_finite()) {
            out[t] = f(slice);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rolling_is_aligned_with_warmup_nan() {
        let v = [1.0, 2.0, 3.0, 4.0];
        let sums = rolling(&v, 3, |w| w.iter().sum());
        assert_eq!(sums.len(), 4);
        assert!(sums[0].is_nan() && sums[1].is_nan());
        assert_eq!(sums[2], 6.0);
        assert_eq!(sums[3], 9.0);
    }

    #[test]
    fn rolling_window_with_nan_is_nan() {
        let v = [1.0, f64::NAN, 3.0, 4.0, 5.0];
        let sums = rolling(&v, 2, |w| w.iter().sum());
        assert!(sums[1].is_nan());
        assert!(sums[2].is_nan());
        assert_eq!(sums[3], 7.0);
    }

    #[test]
    fn rolling_zero_window_or_short_input() {
        assert!(rolling(&[1.0, 2.0], 0, |_| 0.0).iter().all(|v| v.is_nan()));
        assert!(rolling(&[1.0, 2.0], 5, |_| 0.0).iter().all(|v| v.is_nan()));
    }
}
