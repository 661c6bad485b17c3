// =============================================================================
// Moving Averages — SMA and EMA
// =============================================================================
//
// SMA_t = mean(x_{t-W+1} .. x_t)
//
// EMA with span S, bias correction disabled:
//   alpha  = 2 / (S + 1)
//   EMA_0  = x_0                       (seeded with the first finite value)
//   EMA_t  = alpha * x_t + (1 - alpha) * EMA_{t-1}
// =============================================================================

use super::rolling;

/// Simple moving average over `window`, aligned with the input.
pub fn calculate_sma(values: &[f64], window: usize) -> Vec<f64> {
    rolling(values, window, |w| w.iter().sum::<f64>() / w.len() as f64)
}

/// Exponential moving average with the given `span`, aligned with the input.
///
/// The recursion starts at the first finite value; everything before it is
/// NaN.  A non-finite input later in the series yields NaN at that position
/// and the recursion carries on from the last good state.
pub fn calculate_ema(values: &[f64], span: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if span == 0 {
        return out;
    }
    let alpha = 2.0 / (span as f64 + 1.0);

    let mut prev: Option<f64> = None;
    for (t, &x) in values.iter().enumerate() {
        if !x.is_finite() {
            continue;
        }
        let ema = match prev {
            None => x,
            Some(p) => alpha * x + (1.0 - alpha) * p,
        };
        out[t] = ema;
        prev = Some(ema);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sma_known_values() {
        let v: Vec<f64> = (1..=6).map(|x| x as f64).collect();
        let sma = calculate_sma(&v, 3);
        assert!(sma[0].is_nan() && sma[1].is_nan());
        assert!((sma[2] - 2.0).abs() < 1e-12);
        assert!((sma[5] - 5.0).abs() < 1e-12);
    }

    #[test]
    fn ema_seeded_with_first_value() {
        let v: Vec<f64> = (1..=10).map(|x| x as f64).collect();
        let ema = calculate_ema(&v, 5);
        assert_eq!(ema.len(), 10);
        assert!((ema[0] - 1.0).abs() < 1e-12);

        let alpha = 2.0 / 6.0;
        let mut expected = 1.0;
        for (t, &x) in v.iter().enumerate().skip(1) {
            expected = alpha * x + (1.0 - alpha) * expected;
            assert!((ema[t] - expected).abs() < 1e-12, "t={t}");
        }
    }

    #[test]
    fn ema_skips_leading_nan() {
        let ema = calculate_ema(&[f64::NAN, f64::NAN, 4.0, 4.0], 3);
        assert!(ema[0].is_nan() && ema[1].is_nan());
        assert_eq!(ema[2], 4.0);
        assert_eq!(ema[3], 4.0);
    }

    #[test]
    fn ema_span_zero() {
        assert!(calculate_ema(&[1.0, 2.0], 0).iter().all(|v| v.is_nan()));
    }

    #[test]
    fn ema_of_constant_is_constant() {
        let ema = calculate_ema(&[7.5; 40], 12);
        assert!(ema.iter().all(|&v| (v - 7.5).abs() < 1e-12));
    }
}
