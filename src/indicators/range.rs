// =============================================================================
// Session gap, range and volume surge
// =============================================================================
//
//   Gap          = open_t - close_{t-1}
//   Range        = high_t - low_t
//   Range_Ratio  = (high_t - low_t) / close_t        (0.0 when close_t == 0)
//   Volume_Surge = volume_t / volume_{t-1} - 1       (0.0 when volume_{t-1} == 0)

use super::returns::pct_change;
use crate::types::PriceBar;

/// Overnight gap; index 0 is NaN.
pub fn calculate_gap(bars: &[PriceBar]) -> Vec<f64> {
    let mut out = vec![f64::NAN; bars.len()];
    for t in 1..bars.len() {
        out[t] = bars[t].open - bars[t - 1].close;
    }
    out
}

pub fn calculate_range(bars: &[PriceBar]) -> Vec<f64> {
    bars.iter().map(|b| b.high - b.low).collect()
}

/// Range normalised by the close.  A zero close yields 0.0.
pub fn calculate_range_ratio(bars: &[PriceBar]) -> Vec<f64> {
    bars.iter()
        .map(|b| {
            if b.close == 0.0 {
                0.0
            } else {
                (b.high - b.low) / b.close
            }
        })
        .collect()
}

/// Session-over-session volume change.
///
/// When the feed carries no volume at all the column is a constant 0.0
/// rather than an error; individual missing sessions become NaN.
pub fn calculate_volume_surge(bars: &[PriceBar]) -> Vec<f64> {
    if bars.iter().all(|b| b.volume.is_none()) {
        return vec![0.0; bars.len()];
    }
    let volumes: Vec<f64> = bars.iter().map(|b| b.volume.unwrap_or(f64::NAN)).collect();
    pct_change(&volumes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn bar(i: i64, open: f64, high: f64, low: f64, close: f64, volume: Option<f64>) -> PriceBar {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap() + chrono::Duration::days(i);
        PriceBar::new(date, open, high, low, close, volume)
    }

    #[test]
    fn gap_and_range() {
        let bars = vec![
            bar(0, 100.0, 102.0, 98.0, 101.0, Some(10.0)),
            bar(1, 103.0, 106.0, 100.0, 104.0, Some(20.0)),
        ];
        let gap = calculate_gap(&bars);
        assert!(gap[0].is_nan());
        assert_eq!(gap[1], 2.0);
        assert_eq!(calculate_range(&bars), vec![4.0, 6.0]);
    }

    #[test]
    fn range_ratio_guards_zero_close() {
        let bars = vec![bar(0, 0.0, 2.0, 0.0, 0.0, None), bar(1, 1.0, 3.0, 1.0, 2.0, None)];
        let rr = calculate_range_ratio(&bars);
        assert_eq!(rr[0], 0.0);
        assert_eq!(rr[1], 1.0);
    }

    #[test]
    fn volume_surge_absent_volume_is_zero_column() {
        let bars: Vec<PriceBar> = (0..5).map(|i| bar(i, 1.0, 1.0, 1.0, 1.0, None)).collect();
        assert_eq!(calculate_volume_surge(&bars), vec![0.0; 5]);
    }

    #[test]
    fn volume_surge_values() {
        let bars = vec![
            bar(0, 1.0, 1.0, 1.0, 1.0, Some(100.0)),
            bar(1, 1.0, 1.0, 1.0, 1.0, Some(150.0)),
            bar(2, 1.0, 1.0, 1.0, 1.0, Some(0.0)),
            bar(3, 1.0, 1.0, 1.0, 1.0, Some(50.0)),
            bar(4, 1.0, 1.0, 1.0, 1.0, None),
        ];
        let vs = calculate_volume_surge(&bars);
        assert!(vs[0].is_nan());
        assert!((vs[1] - 0.5).abs() < 1e-12);
        assert_eq!(vs[2], -1.0);
        assert_eq!(vs[3], 0.0);
        assert!(vs[4].is_nan());
    }
}
