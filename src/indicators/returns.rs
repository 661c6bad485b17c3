// =============================================================================
// Simple Returns (percentage change)
// =============================================================================
//
//   r_t = x_t / x_{t-1} - 1
//
// Used for the close-to-close Return column and for the volume surge.

/// Percentage change of consecutive values, aligned with the input.
///
/// - Index 0 is NaN (no predecessor).
/// - A zero predecessor yields 0.0 instead of an infinity.
/// - A non-finite operand yields NaN.
pub fn pct_change(values: &[f64]) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    for t in 1..values.len() {
        let prev = values[t - 1];
        let cur = values[t];
        if !prev.is_finite() || !cur.is_finite() {
            continue;
        }
        out[t] = if prev == 0.0 { 0.0 } else { cur / prev - 1.0 };
    }
    out
}

/// Close-to-close returns of a close series.
pub fn calculate_returns(closes: &[f64]) -> Vec<f64> {
    pct_change(closes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_basic() {
        let r = calculate_returns(&[100.0, 110.0, 99.0]);
        assert!(r[0].is_nan());
        assert!((r[1] - 0.10).abs() < 1e-12);
        assert!((r[2] + 0.10).abs() < 1e-12);
    }

    #[test]
    fn constant_prices_give_zero_returns() {
        let r = calculate_returns(&[50.0; 10]);
        assert!(r[1..].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn zero_denominator_is_neutral() {
        let r = pct_change(&[0.0, 5.0, 0.0, 0.0]);
        assert_eq!(r[1], 0.0);
        assert_eq!(r[2], -1.0);
        assert_eq!(r[3], 0.0);
    }

    #[test]
    fn empty_input() {
        assert!(pct_change(&[]).is_empty());
    }
}
