// =============================================================================
// Numeric clean-up post-pass
// =============================================================================
//
// 1. Sweep: ±infinity becomes NaN.
// 2. Fill: remaining NaN cells are imputed per column, either with the column
//    median (training matrices) or by forward fill followed by backward fill
//    (single time series, keeps the series continuous).
//
// A column with no finite value at all is filled with 0.0.

use crate::stats;
use crate::types::FillStrategy;

/// Replace ±infinity with NaN in place.  Returns the number of cells swept.
pub fn sweep_infinities(values: &mut [f64]) -> usize {
    let mut swept = 0;
    for v in values.iter_mut() {
        if v.is_infinite() {
            *v = f64::NAN;
            swept += 1;
        }
    }
    swept
}

/// Fill NaN cells with the median of the finite cells.
pub fn fill_median(values: &mut [f64]) {
    let fill = stats::median(values).unwrap_or(0.0);
    for v in values.iter_mut() {
        if v.is_nan() {
            *v = fill;
        }
    }
}

/// Forward fill, then backward fill whatever leads the series.
pub fn fill_forward_backward(values: &mut [f64]) {
    let mut last: Option<f64> = None;
    for v in values.iter_mut() {
        if v.is_nan() {
            if let Some(prev) = last {
                *v = prev;
            }
        } else {
            last = Some(*v);
        }
    }

    let mut next: Option<f64> = None;
    for v in values.iter_mut().rev() {
        if v.is_nan() {
            if let Some(n) = next {
                *v = n;
            }
        } else {
            next = Some(*v);
        }
    }

    for v in values.iter_mut() {
        if v.is_nan() {
            *v = 0.0;
        }
    }
}

/// Sweep infinities and fill NaN in one column.  Returns the number of cells
/// that were imputed.
pub fn clean_column(values: &mut [f64], strategy: FillStrategy) -> usize {
    sweep_infinities(values);
    let missing = values.iter().filter(|v| v.is_nan()).count();
    if missing == 0 {
        return 0;
    }
    match strategy {
        FillStrategy::Median => fill_median(values),
        FillStrategy::ForwardBackward => fill_forward_backward(values),
    }
    missing
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sweep_counts_and_replaces() {
        let mut v = [1.0, f64::INFINITY, f64::NEG_INFINITY, f64::NAN];
        assert_eq!(sweep_infinities(&mut v), 2);
        assert!(v[1].is_nan() && v[2].is_nan());
        assert_eq!(v[0], 1.0);
    }

    #[test]
    fn median_fill() {
        let mut v = [1.0, f64::NAN, 3.0, f64::INFINITY, 10.0];
        assert_eq!(clean_column(&mut v, FillStrategy::Median), 2);
        assert_eq!(v, [1.0, 3.0, 3.0, 3.0, 10.0]);
    }

    #[test]
    fn forward_then_backward_fill() {
        let mut v = [f64::NAN, f64::NAN, 2.0, f64::NAN, 5.0, f64::NAN];
        clean_column(&mut v, FillStrategy::ForwardBackward);
        assert_eq!(v, [2.0, 2.0, 2.0, 2.0, 5.0, 5.0]);
    }

    #[test]
    fn all_missing_column_becomes_zero() {
        let mut a = [f64::NAN, f64::INFINITY];
        clean_column(&mut a, FillStrategy::Median);
        assert_eq!(a, [0.0, 0.0]);
        let mut b = [f64::NAN, f64::NAN];
        clean_column(&mut b, FillStrategy::ForwardBackward);
        assert_eq!(b, [0.0, 0.0]);
    }
}
