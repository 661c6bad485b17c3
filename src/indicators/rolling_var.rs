// =============================================================================
// Rolling historical VaR (feature column)
// =============================================================================
//
// VaR_95 at row t is the 5th percentile of the returns in the trailing window
// ending at t.  This is a per-row feature, distinct from the per-asset VaR
// summary produced by `risk::var`.
//
// Degenerate window: when the whole series holds fewer finite returns than
// the window size, no trailing window can ever fill.  Every row then carries
// the single minimum return of the series instead of NaN, so short histories
// still produce a usable column.
// =============================================================================

use tracing::debug;

use super::rolling;
use crate::stats;

/// Rolling `pct`-th percentile of `returns` over `window`, aligned with the input.
pub fn calculate_rolling_var(returns: &[f64], window: usize, pct: f64) -> Vec<f64> {
    let finite: Vec<f64> = returns.iter().copied().filter(|r| r.is_finite()).collect();

    if window == 0 || finite.len() < window {
        let fallback = finite.iter().copied().reduce(f64::min).unwrap_or(f64::NAN);
        debug!(
            window,
            observations = finite.len(),
            fallback,
            "rolling VaR window never fills; using series minimum"
        );
        return vec![fallback; returns.len()];
    }

    rolling(returns, window, |w| stats::percentile(w, pct).unwrap_or(f64::NAN))
}
