// =============================================================================
// Descriptive statistics shared by the indicator, labeling and VaR modules
// =============================================================================
//
// Percentiles use linear interpolation between closest ranks:
//   rank = p / 100 * (n - 1)
//   q    = x[floor(rank)] + (rank - floor(rank)) * (x[ceil(rank)] - x[floor(rank)])
//
// Standard deviations are sample deviations (divisor n - 1), matching the
// rolling statistics the historical datasets were produced with.
// =============================================================================

/// Percentile `p` (0..=100) of the finite values in `values`.
///
/// Returns `None` when no finite value is present or `p` is outside [0, 100].
pub fn percentile(values: &[f64], p: f64) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(|a, b| a.total_cmp(b));
    percentile_sorted(&sorted, p)
}

/// Same as [`percentile`] but for an already sorted, finite slice.
pub fn percentile_sorted(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() || !(0.0..=100.0).contains(&p) {
        return None;
    }
    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    Some(sorted[lo] + frac * (sorted[hi] - sorted[lo]))
}

/// Arithmetic mean; `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n - 1); `None` with fewer than two values.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let var = values.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(var.sqrt())
}

/// Median of the finite values; `None` when none are finite.
pub fn median(values: &[f64]) -> Option<f64> {
    percentile(values, 50.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentile_interpolates_linearly() {
        let v = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert!((percentile(&v, 0.0).unwrap() - 1.0).abs() < 1e-12);
        assert!((percentile(&v, 100.0).unwrap() - 5.0).abs() < 1e-12);
        assert!((percentile(&v, 50.0).unwrap() - 3.0).abs() < 1e-12);
        // rank = 0.1 * 4 = 0.4 => 1.4
        assert!((percentile(&v, 10.0).unwrap() - 1.4).abs() < 1e-12);
    }

    #[test]
    fn percentile_ignores_non_finite() {
        let v = [f64::NAN, 2.0, f64::INFINITY, 4.0];
        assert!((percentile(&v, 50.0).unwrap() - 3.0).abs() < 1e-12);
        assert!(percentile(&[f64::NAN], 50.0).is_none());
        assert!(percentile(&[], 50.0).is_none());
        assert!(percentile(&[1.0], 101.0).is_none());
    }

    #[test]
    fn sample_std_uses_n_minus_one() {
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        // population std = 2.0, sample std = sqrt(32 / 7)
        let s = sample_std(&v).unwrap();
        assert!((s - (32.0_f64 / 7.0).sqrt()).abs() < 1e-12);
        assert!(sample_std(&[1.0]).is_none());
    }

    #[test]
    fn median_of_even_count() {
        assert!((median(&[4.0, 1.0, 3.0, 2.0]).unwrap() - 2.5).abs() < 1e-12);
    }
}
