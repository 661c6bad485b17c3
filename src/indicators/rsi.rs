// =============================================================================
// Relative Strength Index (RSI) — rolling-mean variant
// =============================================================================
//
// Step 1 — Compute price changes (deltas) from consecutive closes.
// Step 2 — Split each delta into a gain (max(d, 0)) and a loss (max(-d, 0)).
// Step 3 — avg_gain / avg_loss = simple rolling means over `window` deltas.
// Step 4 — RS  = avg_gain / avg_loss
//          RSI = 100 - 100 / (1 + RS)
//
// Zero-loss convention: when avg_loss == 0 the ratio is undefined and RSI is
// pinned to 100.0, including the flat-market case where avg_gain is 0 too.
// A constant price series therefore has RSI 100, never NaN.
// =============================================================================

use super::moving_average::calculate_sma;

/// RSI series aligned with `closes`.
///
/// The first `window` positions are NaN (the first close has no delta and
/// the rolling mean needs `window` deltas).
pub fn calculate_rsi(closes: &[f64], window: usize) -> Vec<f64> {
    let n = closes.len();
    if window == 0 || n < 2 {
        return vec![f64::NAN; n];
    }

    let mut gains = vec![f64::NAN; n];
    let mut losses = vec![f64::NAN; n];
    for t in 1..n {
        let delta = closes[t] - closes[t - 1];
        if delta.is_finite() {
            gains[t] = delta.max(0.0);
            losses[t] = (-delta).max(0.0);
        }
    }

    let avg_gain = calculate_sma(&gains, window);
    let avg_loss = calculate_sma(&losses, window);

    avg_gain
        .iter()
        .zip(avg_loss.iter())
        .map(|(&g, &l)| rsi_from_averages(g, l).unwrap_or(f64::NAN))
        .collect()
}

/// Convert average gain / average loss into an RSI value in [0, 100].
///
/// Returns `None` when either average is undefined.
fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> Option<f64> {
    if !avg_gain.is_finite() || !avg_loss.is_finite() {
        return None;
    }
    if avg_loss == 0.0 {
        return Some(100.0);
    }
    let rs = avg_gain / avg_loss;
    let rsi = 100.0 - 100.0 / (1.0 + rs);
    rsi.is_finite().then_some(rsi)
}
