// =============================================================================
// VaR / CVaR Estimator
// =============================================================================
//
// Convention: percentile of the currency loss sample.
//
//   loss_i  = -return_i * P          (P = most recent close)
//   VaR_c   = c-th percentile of the loss sample
//   CVaR_c  = mean of every loss >= VaR_c
//
// c is `VarSettings::confidence` (95 by default) and the tail VaR uses
// `VarSettings::tail_confidence` (99); the `*_95` / `*_99` field names follow
// the stored record schema.
//
// Losses are derived once per run from one price level, so VaR and CVaR are
// expressed in the same currency units as P.  The risk level uses the same
// quantile expressed as a return (the (100 - c)-th percentile of returns), which does
// not depend on P.
// =============================================================================

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::{RiskThresholds, VarSettings};
use crate::stats;
use crate::types::RiskLevel;

/// One equal-width bucket of the loss histogram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LossBucket {
    /// P&L at the bucket's upper edge, rounded to a whole unit (losses are negative).
    pub loss: String,
    pub lower: f64,
    pub upper: f64,
    pub probability: f64,
}

/// VaR snapshot of one asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VarSummary {
    pub last_price: f64,
    pub observations: usize,
    pub var_95: f64,
    pub var_99: f64,
    pub cvar_95: f64,
    /// CVaR fell back to the worst single loss (empty tail).
    pub cvar_fallback: bool,
    /// VaR_95 expressed as a return (5th percentile of returns).
    pub var_95_return: f64,
    pub risk_level: RiskLevel,
    pub distribution: Vec<LossBucket>,
}

/// Currency losses of `returns` at price `price`; non-finite returns are dropped.
pub fn loss_sample(returns: &[f64], price: f64) -> Vec<f64> {
    returns
        .iter()
        .filter(|r| r.is_finite())
        .map(|r| -r * price)
        .collect()
}

/// VaR at `confidence` percent (e.g. 95.0) of a loss sample.
pub fn value_at_risk(losses: &[f64], confidence: f64) -> Option<f64> {
    stats::percentile(losses, confidence)
}

/// Expected shortfall beyond `var`.
///
/// Returns `(cvar, fell_back)`.  If no loss reaches `var` the worst single
/// loss is used instead.
pub fn conditional_var(losses: &[f64], var: f64) -> Option<(f64, bool)> {
    let tail: Vec<f64> = losses.iter().copied().filter(|&l| l >= var).collect();
    match stats::mean(&tail) {
        Some(cvar) => Some((cvar, false)),
        None => {
            let worst = losses.iter().copied().reduce(f64::max)?;
            warn!(var, worst, "empty VaR tail; CVaR falls back to worst loss");
            Some((worst, true))
        }
    }
}

/// Probability mass of `losses` in `buckets` equal-width bins over
/// [min, max].  The last bin is closed on the right.
///
/// A zero-width range (all losses equal) collapses to one bucket of
/// probability 1.0.
pub fn loss_histogram(losses: &[f64], buckets: usize) -> Vec<LossBucket> {
    let finite: Vec<f64> = losses.iter().copied().filter(|l| l.is_finite()).collect();
    if finite.is_empty() {
        return Vec::new();
    }
    let min = finite.iter().copied().fold(f64::INFINITY, f64::min);
    let max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    if max - min <= 0.0 {
        return vec![bucket(min, max, 1.0)];
    }

    let buckets = buckets.max(1);
    let width = (max - min) / buckets as f64;
    let mut counts = vec![0usize; buckets];
    for &l in &finite {
        let idx = (((l - min) / width) as usize).min(buckets - 1);
        counts[idx] += 1;
    }

    let total = finite.len() as f64;
    counts
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            let lower = min + width * i as f64;
            let upper = if i + 1 == buckets { max } else { min + width * (i + 1) as f64 };
            bucket(lower, upper, c as f64 / total)
        })
        .collect()
}

fn bucket(lower: f64, upper: f64, probability: f64) -> LossBucket {
    LossBucket {
        loss: format!("{}", -(upper.round() as i64)),
        lower,
        upper,
        probability,
    }
}

/// Risk level from VaR_95 expressed as a return.
pub fn classify_risk_level(var_95_return: f64, thresholds: &RiskThresholds) -> RiskLevel {
    if var_95_return < thresholds.high_var_return {
        RiskLevel::High
    } else if var_95_return < thresholds.medium_var_return {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// Full VaR snapshot for a return sample and the latest price.
///
/// Returns `None` when the sample has no finite return.
pub fn estimate(returns: &[f64], last_price: f64, settings: &VarSettings) -> Option<VarSummary> {
    let losses = loss_sample(returns, last_price);
    if losses.is_empty() {
        return None;
    }

    let var_95 = value_at_risk(&losses, settings.confidence)?;
    let var_99 = value_at_risk(&losses, settings.tail_confidence)?;
    let (cvar_95, cvar_fallback) = conditional_var(&losses, var_95)?;
    let var_95_return = stats::percentile(returns, 100.0 - settings.confidence)?;

    Some(VarSummary {
        last_price,
        observations: losses.len(),
        var_95,
        var_99,
        cvar_95,
        cvar_fallback,
        var_95_return,
        risk_level: classify_risk_level(var_95_return, &settings.thresholds),
        distribution: loss_histogram(&losses, settings.histogram_buckets),
    })
}
