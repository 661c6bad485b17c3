// =============================================================================
// Average True Range (ATR) — rolling mean of the true range
// =============================================================================
//
// True Range (TR) for each bar:
//   TR = max(H - L, |H - prevClose|, |L - prevClose|)
//
// The first bar has no previous close, so its TR is just H - L.
// ATR_t is the simple mean of the last `window` TR values.
//
// Default window: 14
// =============================================================================

use super::moving_average::calculate_sma;
use crate::types::PriceBar;

/// True range per bar, aligned with `bars`.
pub fn true_range(bars: &[PriceBar]) -> Vec<f64> {
    let mut tr = Vec::with_capacity(bars.len());
    for (i, bar) in bars.iter().enumerate() {
        // f64::max ignores a NaN operand, so non-finite inputs are checked up front.
        if !bar.high.is_finite() || !bar.low.is_finite() {
            tr.push(f64::NAN);
            continue;
        }
        let hl = bar.high - bar.low;
        let value = match i.checked_sub(1).map(|p| bars[p].close) {
            None => hl,
            Some(prev_close) if prev_close.is_finite() => {
                let hc = (bar.high - prev_close).abs();
                let lc = (bar.low - prev_close).abs();
                hl.max(hc).max(lc)
            }
            Some(_) => f64::NAN,
        };
        tr.push(value);
    }
    tr
}

/// ATR series aligned with `bars`; the first `window - 1` positions are NaN.
pub fn calculate_atr(bars: &[PriceBar], window: usize) -> Vec<f64> {
    calculate_sma(&true_range(bars), window)
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn bar(i: i64, open: f64, high: f64, low: f64, close: f64) -> PriceBar {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(i);
        PriceBar::new(date, open, high, low, close, Some(100.0))
    }

    #[test]
    fn atr_window_zero() {
        let bars: Vec<PriceBar> = (0..20).map(|i| bar(i, 100.0, 105.0, 95.0, 102.0)).collect();
        assert!(calculate_atr(&bars, 0).iter().all(|v| v.is_nan()));
    }

    #[test]
    fn atr_warmup() {
        let bars: Vec<PriceBar> = (0..20).map(|i| bar(i, 100.0, 105.0, 95.0, 100.0)).collect();
        let atr = calculate_atr(&bars, 14);
        assert!(atr[..13].iter().all(|v| v.is_nan()));
        assert!((atr[13] - 10.0).abs() < 1e-12);
    }

    #[test]
    fn true_range_uses_prev_close_on_gap() {
        let bars = vec![
            bar(0, 100.0, 105.0, 95.0, 95.0),
            bar(1, 110.0, 115.0, 108.0, 112.0),
        ];
        let tr = true_range(&bars);
        assert_eq!(tr[0], 10.0);
        // |115 - 95| = 20 > 115 - 108 = 7
        assert_eq!(tr[1], 20.0);
    }

    #[test]
    fn true_range_gap_down() {
        let bars = vec![
            bar(0, 100.0, 101.0, 99.0, 100.0),
            bar(1, 90.0, 92.0, 88.0, 91.0),
        ];
        // |88 - 100| = 12
        assert_eq!(true_range(&bars)[1], 12.0);
    }

    #[test]
    fn atr_nan_bar_poisons_its_windows_only() {
        let mut bars: Vec<PriceBar> = (0..10).map(|i| bar(i, 100.0, 105.0, 95.0, 100.0)).collect();
        bars[2].high = f64::NAN;
        let atr = calculate_atr(&bars, 3);
        assert!(atr[2].is_nan() && atr[3].is_nan() && atr[4].is_nan());
        assert!(atr[5].is_finite());
    }
}
