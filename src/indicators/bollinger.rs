// =============================================================================
// Bollinger Bands
// =============================================================================
//
// upper/lower = SMA(period) ± k·σ where σ is the rolling sample standard
// deviation of the closes over the same period.

use super::moving_average::calculate_sma;
use super::volatility::rolling_std;

/// Band series, each aligned with the input closes.
#[derive(Debug, Clone)]
pub struct BollingerBands {
    pub upper: Vec<f64>,
    pub lower: Vec<f64>,
}

/// Calculate Bollinger Bands for the given closing prices.
///
/// The first `period - 1` positions of every band are NaN.
pub fn calculate_bollinger(closes: &[f64], period: usize, num_std: f64) -> BollingerBands {
    let middle = calculate_sma(closes, period);
    let sigma = rolling_std(closes, period);

    let upper = middle.iter().zip(&sigma).map(|(m, s)| m + num_std * s).collect();
    let lower = middle.iter().zip(&sigma).map(|(m, s)| m - num_std * s).collect();

    BollingerBands { upper, lower }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bollinger_basic() {
        let closes: Vec<f64> = (1..=20).map(|x| x as f64).collect();
        let bb = calculate_bollinger(&closes, 20, 2.0);
        let sma = calculate_sma(&closes, 20);
        assert!(bb.upper[19] > sma[19]);
        assert!(bb.lower[19] < sma[19]);
        assert!(((bb.upper[19] + bb.lower[19]) / 2.0 - 10.5).abs() < 1e-12);
        assert!(bb.upper[18].is_nan());
    }

    #[test]
    fn bollinger_symmetric_around_sma() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + (i as f64).cos()).collect();
        let bb = calculate_bollinger(&closes, 20, 2.0);
        let sma = calculate_sma(&closes, 20);
        for t in 19..40 {
            let up = bb.upper[t] - sma[t];
            let down = sma[t] - bb.lower[t];
            assert!((up - down).abs() < 1e-10);
        }
    }

    #[test]
    fn bollinger_flat_collapses() {
        let bb = calculate_bollinger(&[100.0; 20], 20, 2.0);
        assert!((bb.upper[19] - 100.0).abs() < 1e-10);
        assert!((bb.lower[19] - 100.0).abs() < 1e-10);
    }

    #[test]
    fn bollinger_insufficient_data() {
        let bb = calculate_bollinger(&[1.0, 2.0, 3.0], 20, 2.0);
        assert!(bb.upper.iter().all(|v| v.is_nan()));
    }
}
