// =============================================================================
// Multiclass gradient-boosted trees (softmax objective)
// =============================================================================
//
// One regression tree per class per round.  Each round:
//   p      = softmax(margin)
//   g_k    = p_k - 1[y == k]
//   h_k    = max(p_k * (1 - p_k), 1e-6)
//   margin += tree_k(x)          (leaf weights already carry the learning rate)
//
// Margins start at the log of the Laplace-smoothed class priors.
//
// Warm start
// ----------
// `fit_from_baseline` clones the baseline ensemble (same feature schema
// required) and keeps boosting from the baseline's margins on the new
// asset's rows.  The baseline trees are never modified; only new rounds are
// appended.
// =============================================================================

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::tree::{GradientSet, RegressionTree, TreeParams};
use super::{schema_fingerprint, ModelError};
use crate::config::GbmParams;
use crate::types::RiskLabel;

const MIN_HESSIAN: f64 = 1e-6;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GbmClassifier {
    pub n_classes: usize,
    pub feature_names: Vec<String>,
    pub fingerprint: String,
    pub base_score: Vec<f64>,
    /// `rounds[i][k]` is the tree for class k in round i.
    pub rounds: Vec<Vec<RegressionTree>>,
    /// Accumulated split gain per feature.
    pub feature_importance: Vec<f64>,
    /// Number of leading rounds inherited from a baseline (0 for a fresh model).
    pub baseline_rounds: usize,
}

impl GbmClassifier {
    /// Train a fresh model for `params.n_estimators` rounds.
    pub fn fit(
        x: &[Vec<f64>],
        y: &[RiskLabel],
        feature_names: &[String],
        params: &GbmParams,
    ) -> Result<Self, ModelError> {
        validate(x, y, feature_names.len())?;

        let n_classes = RiskLabel::COUNT;
        let mut counts = vec![0usize; n_classes];
        for label in y {
            counts[label.index()] += 1;
        }
        let n = y.len() as f64;
        let base_score = counts
            .iter()
            .map(|&c| ((c as f64 + 1.0) / (n + n_classes as f64)).ln())
            .collect();

        let mut model = Self {
            n_classes,
            feature_names: feature_names.to_vec(),
            fingerprint: schema_fingerprint(feature_names),
            base_score,
            rounds: Vec::new(),
            feature_importance: vec![0.0; feature_names.len()],
            baseline_rounds: 0,
        };
        model.boost(x, y, params.n_estimators, params, params.seed);
        Ok(model)
    }

    /// Continue boosting a copy of `baseline` for `params.transfer_rounds`
    /// rounds on this asset's rows.
    pub fn fit_from_baseline(
        baseline: &GbmClassifier,
        x: &[Vec<f64>],
        y: &[RiskLabel],
        feature_names: &[String],
        params: &GbmParams,
    ) -> Result<Self, ModelError> {
        let fingerprint = schema_fingerprint(feature_names);
        if fingerprint != baseline.fingerprint {
            return Err(ModelError::SchemaMismatch {
                baseline: baseline.fingerprint.clone(),
                got: fingerprint,
            });
        }
        validate(x, y, baseline.n_features())?;

        let mut model = baseline.clone();
        model.baseline_rounds = baseline.rounds.len();
        let seed = params.seed.wrapping_add(model.baseline_rounds as u64);
        model.boost(x, y, params.transfer_rounds, params, seed);
        Ok(model)
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    pub fn n_rounds(&self) -> usize {
        self.rounds.len()
    }

    pub fn is_warm_started(&self) -> bool {
        self.baseline_rounds > 0
    }

    fn margin(&self, row: &[f64]) -> Vec<f64> {
        let mut m = self.base_score.clone();
        for round in &self.rounds {
            for (k, tree) in round.iter().enumerate() {
                m[k] += tree.predict(row);
            }
        }
        m
    }

    fn boost(&mut self, x: &[Vec<f64>], y: &[RiskLabel], n_rounds: usize, params: &GbmParams, seed: u64) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let n_features = self.n_features();
        let tree_params = TreeParams {
            max_depth: params.max_depth,
            min_child_weight: params.min_child_weight,
            lambda: params.lambda,
            shrinkage: params.learning_rate,
        };
        let n_cols = ((n_features as f64 * params.colsample_bytree).round() as usize).clamp(1, n_features);
        let mut all_features: Vec<usize> = (0..n_features).collect();

        let mut margins: Vec<Vec<f64>> = x.iter().map(|row| self.margin(row)).collect();
        let mut grad = vec![0.0; x.len()];
        let mut hess = vec![0.0; x.len()];

        for round in 0..n_rounds {
            let mut rows: Vec<usize> = if params.subsample < 1.0 {
                (0..x.len()).filter(|_| rng.gen::<f64>() < params.subsample).collect()
            } else {
                (0..x.len()).collect()
            };
            if rows.is_empty() {
                rows = (0..x.len()).collect();
            }

            all_features.shuffle(&mut rng);
            let mut features = all_features[..n_cols].to_vec();
            features.sort_unstable();

            let probs: Vec<Vec<f64>> = margins.iter().map(|m| softmax(m)).collect();
            let mut trees = Vec::with_capacity(self.n_classes);
            for k in 0..self.n_classes {
                for (i, p) in probs.iter().enumerate() {
                    let target = if y[i].index() == k { 1.0 } else { 0.0 };
                    grad[i] = p[k] - target;
                    hess[i] = (p[k] * (1.0 - p[k])).max(MIN_HESSIAN);
                }
                let data = GradientSet {
                    x,
                    grad: &grad,
                    hess: &hess,
                };
                let tree = RegressionTree::fit(&data, rows.clone(), &features, &tree_params, &mut self.feature_importance);
                for (row, m) in x.iter().zip(margins.iter_mut()) {
                    m[k] += tree.predict(row);
                }
                trees.push(tree);
            }
            if (round + 1) % 25 == 0 {
                let loss = log_loss(&margins, y);
                let leaves: usize = trees.iter().map(RegressionTree::n_leaves).sum();
                let depth = trees.iter().map(RegressionTree::depth).max().unwrap_or(0);
                debug!(round = round + 1, loss, leaves, depth, "boosting progress");
            }
            self.rounds.push(trees);
        }
    }

    /// Class probabilities of one row, indexed by `RiskLabel::index()`.
    pub fn predict_proba_row(&self, row: &[f64]) -> Result<Vec<f64>, ModelError> {
        if self.base_score.len() != self.n_classes || self.n_classes == 0 {
            return Err(ModelError::NotTrained);
        }
        if row.len() != self.n_features() {
            return Err(ModelError::FeatureMismatch {
                expected: self.n_features(),
                got: row.len(),
            });
        }
        Ok(softmax(&self.margin(row)))
    }

    pub fn predict_proba(&self, x: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, ModelError> {
        x.iter().map(|r| self.predict_proba_row(r)).collect()
    }

    pub fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<RiskLabel>, ModelError> {
        self.predict_proba(x)?
            .into_iter()
            .map(|p| {
                let best = p
                    .iter()
                    .enumerate()
                    .max_by(|a, b| a.1.total_cmp(b.1))
                    .map(|(i, _)| i)
                    .unwrap_or(0);
                RiskLabel::from_index(best).ok_or(ModelError::InvalidLabel(best))
            })
            .collect()
    }

    /// Normalised importances, most important first.
    pub fn importance(&self) -> Vec<(String, f64)> {
        let total: f64 = self.feature_importance.iter().sum();
        let mut out: Vec<(String, f64)> = self
            .feature_names
            .iter()
            .zip(&self.feature_importance)
            .map(|(n, &g)| (n.clone(), if total > 0.0 { g / total } else { 0.0 }))
            .collect();
        out.sort_by(|a, b| b.1.total_cmp(&a.1));
        out
    }
}

fn validate(x: &[Vec<f64>], y: &[RiskLabel], n_features: usize) -> Result<(), ModelError> {
    if x.is_empty() || x.len() != y.len() {
        return Err(ModelError::EmptyDataset);
    }
    if let Some(bad) = x.iter().find(|r| r.len() != n_features) {
        return Err(ModelError::FeatureMismatch {
            expected: n_features,
            got: bad.len(),
        });
    }
    Ok(())
}

fn softmax(m: &[f64]) -> Vec<f64> {
    let max = m.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exp: Vec<f64> = m.iter().map(|v| (v - max).exp()).collect();
    let sum: f64 = exp.iter().sum();
    exp.into_iter().map(|e| e / sum).collect()
}

fn log_loss(margins: &[Vec<f64>], y: &[RiskLabel]) -> f64 {
    let total: f64 = margins
        .iter()
        .zip(y)
        .map(|(m, l)| -softmax(m)[l.index()].max(1e-15).ln())
        .sum();
    total / y.len().max(1) as f64
}
