// =============================================================================
// Risk Labeler — dataset-relative quantile labels
// =============================================================================
//
// Thresholds come from the same return column that is being labeled:
//
//   q_high   = P5  of returns
//   q_medium = P10 of returns
//
//   High    if r <  q_high
//   Medium  if q_high <= r < q_medium
//   Low     if r >= q_medium
//
// A value sitting exactly on a threshold falls into the less risky bucket.
// A constant return series gives q_high == q_medium == r, so every row is Low;
// that is the expected outcome for a zero-variance asset.
// =============================================================================

use serde::{Deserialize, Serialize};

use crate::config::LabelQuantiles;
use crate::stats;
use crate::types::RiskLabel;

/// Return cut-offs computed from one asset's history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabelThresholds {
    pub q_high: f64,
    pub q_medium: f64,
}

impl LabelThresholds {
    /// Derive thresholds from `returns`; `None` when no finite return exists.
    pub fn from_returns(returns: &[f64], quantiles: &LabelQuantiles) -> Option<Self> {
        let mut sorted: Vec<f64> = returns.iter().copied().filter(|r| r.is_finite()).collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(|a, b| a.total_cmp(b));
        Some(Self {
            q_high: stats::percentile_sorted(&sorted, quantiles.high_pct)?,
            q_medium: stats::percentile_sorted(&sorted, quantiles.medium_pct)?,
        })
    }

    pub fn label(&self, ret: f64) -> RiskLabel {
        if ret < self.q_high {
            RiskLabel::High
        } else if ret < self.q_medium {
            RiskLabel::Medium
        } else {
            RiskLabel::Low
        }
    }
}

/// Label every return against thresholds computed from the same column.
pub fn label_returns(returns: &[f64], quantiles: &LabelQuantiles) -> Option<(LabelThresholds, Vec<RiskLabel>)> {
    let thresholds = LabelThresholds::from_returns(returns, quantiles)?;
    let labels = returns.iter().map(|&r| thresholds.label(r)).collect();
    Some((thresholds, labels))
}

/// Row count per class, indexed by `RiskLabel::index()`.
pub fn label_counts(labels: &[RiskLabel]) -> [usize; RiskLabel::COUNT] {
    let mut counts = [0; RiskLabel::COUNT];
    for label in labels {
        counts[label.index()] += 1;
    }
    counts
}
