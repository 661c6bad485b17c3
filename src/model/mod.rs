// =============================================================================
// Model layer — scaler, split, boosted trees, metrics, artifacts
// =============================================================================
//
// A trained asset is always persisted as a (scaler, classifier) pair.  Both
// halves carry the fingerprint of the feature schema they were fitted on;
// loading a pair whose fingerprints disagree is rejected.
// =============================================================================

pub mod artifacts;
pub mod gbm;
pub mod metrics;
pub mod scaler;
pub mod split;
pub mod tree;

use sha2::{Digest, Sha256};
use thiserror::Error;

pub use artifacts::ArtifactStore;
pub use gbm::GbmClassifier;
pub use metrics::ClassificationReport;
pub use scaler::StandardScaler;
pub use split::stratified_split;

#[derive(Debug, Error, PartialEq)]
pub enum ScalerError {
    #[error("scaler has not been fitted")]
    NotFitted,
    #[error("feature dimension mismatch: scaler expects {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
    #[error("cannot fit scaler on an empty matrix")]
    Empty,
}

#[derive(Debug, Error, PartialEq)]
pub enum ModelError {
    #[error("training set is empty")]
    EmptyDataset,
    #[error("feature mismatch: model expects {expected} features, got {got}")]
    FeatureMismatch { expected: usize, got: usize },
    #[error("model has not been trained")]
    NotTrained,
    #[error("baseline schema {baseline} does not match {got}")]
    SchemaMismatch { baseline: String, got: String },
    #[error("label index {0} is out of range")]
    InvalidLabel(usize),
}

/// Hex SHA-256 of the ordered feature names.
pub fn schema_fingerprint(feature_names: &[String]) -> String {
    let mut hasher = Sha256::new();
    for name in feature_names {
        hasher.update(name.as_bytes());
        hasher.update([0u8]);
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_depends_on_order() {
        let a = schema_fingerprint(&["RSI".into(), "ATR".into()]);
        let b = schema_fingerprint(&["ATR".into(), "RSI".into()]);
        assert_ne!(a, b);
        assert_eq!(a, schema_fingerprint(&["RSI".into(), "ATR".into()]));
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn fingerprint_separates_names() {
        assert_ne!(
            schema_fingerprint(&["AB".into(), "C".into()]),
            schema_fingerprint(&["A".into(), "BC".into()])
        );
    }
}
