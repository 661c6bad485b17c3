// =============================================================================
// Moving Average Convergence Divergence (MACD)
// =============================================================================
//
//   MACD   = EMA(fast) - EMA(slow)
//   Signal = EMA(signal) of MACD
//
// Both EMAs run from the first close, but MACD is only reported once the slow
// EMA has seen `slow` closes, and the signal line once it has seen `signal`
// MACD values.

use super::moving_average::calculate_ema;

/// MACD and signal line, each aligned with the input closes.
#[derive(Debug, Clone)]
pub struct MacdSeries {
    pub macd: Vec<f64>,
    pub signal: Vec<f64>,
}

pub fn calculate_macd(closes: &[f64], fast: usize, slow: usize, signal: usize) -> MacdSeries {
    let n = closes.len();
    if fast == 0 || slow == 0 || signal == 0 {
        return MacdSeries {
            macd: vec![f64::NAN; n],
            signal: vec![f64::NAN; n],
        };
    }

    let ema_fast = calculate_ema(closes, fast);
    let ema_slow = calculate_ema(closes, slow);

    let macd_warmup = fast.max(slow) - 1;
    let macd: Vec<f64> = ema_fast
        .iter()
        .zip(ema_slow.iter())
        .enumerate()
        .map(|(t, (f, s))| if t < macd_warmup { f64::NAN } else { f - s })
        .collect();

    let signal_warmup = macd_warmup + signal - 1;
    let signal_line: Vec<f64> = calculate_ema(&macd, signal)
        .into_iter()
        .enumerate()
        .map(|(t, v)| if t < signal_warmup { f64::NAN } else { v })
        .collect();

    MacdSeries {
        macd,
        signal: signal_line,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn macd_warmup_lengths() {
        let closes: Vec<f64> = (1..=60).map(|x| x as f64).collect();
        let m = calculate_macd(&closes, 12, 26, 9);
        assert!(m.macd[..25].iter().all(|v| v.is_nan()));
        assert!(m.macd[25].is_finite());
        assert!(m.signal[..33].iter().all(|v| v.is_nan()));
        assert!(m.signal[33].is_finite());
    }

    #[test]
    fn macd_positive_in_uptrend() {
        let closes: Vec<f64> = (1..=100).map(|x| x as f64).collect();
        let m = calculate_macd(&closes, 12, 26, 9);
        assert!(*m.macd.last().unwrap() > 0.0);
        assert!(*m.signal.last().unwrap() > 0.0);
    }

    #[test]
    fn macd_flat_is_zero() {
        let m = calculate_macd(&[250.0; 60], 12, 26, 9);
        assert!(m.macd[25..].iter().all(|v| v.abs() < 1e-10));
        assert!(m.signal[33..].iter().all(|v| v.abs() < 1e-10));
    }

    #[test]
    fn macd_matches_ema_difference() {
        let closes: Vec<f64> = (0..50).map(|i| 100.0 + (i as f64 * 0.3).sin() * 5.0).collect();
        let m = calculate_macd(&closes, 12, 26, 9);
        let f = calculate_ema(&closes, 12);
        let s = calculate_ema(&closes, 26);
        assert!((m.macd[40] - (f[40] - s[40])).abs() < 1e-12);
    }
}
