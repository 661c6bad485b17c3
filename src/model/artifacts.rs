// =============================================================================
// Artifact Store — per-asset (scaler, model) pairs on disk
// =============================================================================
//
// Layout under the artifact root:
//
//   _baseline/scaler.json  _baseline/model.json
//   <TICKER>/scaler.json   <TICKER>/model.json   <TICKER>/metrics.json
//   run_summary.json
//
// Every file is written with the tmp + rename pattern, and the two halves of
// a pair are only ever loaded together with their fingerprints checked.
// =============================================================================

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::info;

use super::gbm::GbmClassifier;
use super::metrics::ClassificationReport;
use super::scaler::StandardScaler;

const BASELINE_DIR: &str = "_baseline";
const SCALER_FILE: &str = "scaler.json";
const MODEL_FILE: &str = "model.json";
const METRICS_FILE: &str = "metrics.json";
const SUMMARY_FILE: &str = "run_summary.json";

/// Serialize `value` to `path` atomically (write `.tmp`, then rename).
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let content = serde_json::to_string_pretty(value).context("failed to serialise artifact to JSON")?;
    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, &content).with_context(|| format!("failed to write {}", tmp_path.display()))?;
    std::fs::rename(&tmp_path, path).with_context(|| format!("failed to rename to {}", path.display()))?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
}

/// Directory name for a ticker: anything outside `[A-Za-z0-9.-]` becomes `_`.
fn sanitize(ticker: &str) -> String {
    ticker
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .collect()
}

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn asset_dir(&self, ticker: &str) -> PathBuf {
        self.root.join(sanitize(ticker))
    }

    fn save_pair_in(&self, dir: &Path, scaler: &StandardScaler, model: &GbmClassifier) -> Result<()> {
        if scaler.fingerprint != model.fingerprint {
            bail!(
                "refusing to save mismatched pair: scaler {} vs model {}",
                scaler.fingerprint,
                model.fingerprint
            );
        }
        write_json_atomic(&dir.join(SCALER_FILE), scaler)?;
        write_json_atomic(&dir.join(MODEL_FILE), model)?;
        Ok(())
    }

    fn load_pair_in(&self, dir: &Path) -> Result<(StandardScaler, GbmClassifier)> {
        let scaler: StandardScaler = read_json(&dir.join(SCALER_FILE))?;
        let model: GbmClassifier = read_json(&dir.join(MODEL_FILE))?;
        if scaler.fingerprint != model.fingerprint {
            bail!(
                "artifact pair in {} is inconsistent: scaler {} vs model {}",
                dir.display(),
                scaler.fingerprint,
                model.fingerprint
            );
        }
        Ok((scaler, model))
    }

    pub fn save_asset(
        &self,
        ticker: &str,
        scaler: &StandardScaler,
        model: &GbmClassifier,
        report: &ClassificationReport,
    ) -> Result<PathBuf> {
        let dir = self.asset_dir(ticker);
        self.save_pair_in(&dir, scaler, model)?;
        write_json_atomic(&dir.join(METRICS_FILE), report)?;
        info!(ticker, dir = %dir.display(), rounds = model.n_rounds(), "asset artifacts saved");
        Ok(dir)
    }

    pub fn load_asset(&self, ticker: &str) -> Result<(StandardScaler, GbmClassifier)> {
        self.load_pair_in(&self.asset_dir(ticker))
    }

    pub fn save_baseline(&self, scaler: &StandardScaler, model: &GbmClassifier) -> Result<()> {
        let dir = self.root.join(BASELINE_DIR);
        self.save_pair_in(&dir, scaler, model)?;
        info!(dir = %dir.display(), "baseline artifacts saved");
        Ok(())
    }

    pub fn load_baseline(&self) -> Result<(StandardScaler, GbmClassifier)> {
        self.load_pair_in(&self.root.join(BASELINE_DIR))
    }

    pub fn save_summary<T: Serialize>(&self, summary: &T) -> Result<PathBuf> {
        let path = self.root.join(SUMMARY_FILE);
        write_json_atomic(&path, summary)?;
        Ok(path)
    }

    pub fn load_summary<T: DeserializeOwned>(&self) -> Result<T> {
        read_json(&self.root.join(SUMMARY_FILE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GbmParams;
    use crate::types::RiskLabel;

    fn temp_root() -> PathBuf {
        std::env::temp_dir().join(format!("volatisense-art-{}", uuid::Uuid::new_v4()))
    }

    fn trained_pair(names: &[String]) -> (StandardScaler, GbmClassifier, ClassificationReport) {
        let x: Vec<Vec<f64>> = (0..40).map(|i| vec![i as f64, (i % 7) as f64]).collect();
        let y: Vec<RiskLabel> = (0..40).map(|i| if i < 4 { RiskLabel::High } else { RiskLabel::Low }).collect();
        let scaler = StandardScaler::fit(&x, names).unwrap();
        let z = scaler.transform(&x).unwrap();
        let params = GbmParams {
            n_estimators: 5,
            max_depth: 2,
            ..GbmParams::default()
        };
        let model = GbmClassifier::fit(&z, &y, names, &params).unwrap();
        let report = ClassificationReport::compute(&y, &model.predict(&z).unwrap());
        (scaler, model, report)
    }

    #[test]
    fn asset_pair_roundtrip() {
        let root = temp_root();
        let store = ArtifactStore::new(&root);
        let names = vec!["RSI".to_string(), "ATR".to_string()];
        let (scaler, model, report) = trained_pair(&names);

        let dir = store.save_asset("^BSESN", &scaler, &model, &report).unwrap();
        assert!(dir.ends_with("_BSESN"));
        assert!(dir.join("metrics.json").exists());
        assert!(!dir.join("model.json.tmp").exists());

        let (s, m) = store.load_asset("^BSESN").unwrap();
        assert_eq!(s.fingerprint, m.fingerprint);
        assert_eq!(m.n_rounds(), 5);
        std::fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn mismatched_pair_is_rejected_on_save_and_load() {
        let root = temp_root();
        let store = ArtifactStore::new(&root);
        let (scaler_a, model_a, _) = trained_pair(&["a".into(), "b".into()]);
        let (scaler_b, _, _) = trained_pair(&["c".into(), "d".into()]);

        assert!(store.save_baseline(&scaler_b, &model_a).is_err());

        store.save_baseline(&scaler_a, &model_a).unwrap();
        write_json_atomic(&root.join("_baseline").join("scaler.json"), &scaler_b).unwrap();
        let err = store.load_baseline().unwrap_err();
        assert!(format!("{err:#}").contains("inconsistent"));
        std::fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn missing_pair_is_an_error() {
        let store = ArtifactStore::new(temp_root());
        assert!(store.load_asset("TCS.NS").is_err());
    }

    #[test]
    fn sanitize_keeps_exchange_suffix() {
        assert_eq!(sanitize("TCS.NS"), "TCS.NS");
        assert_eq!(sanitize("^BSESN"), "_BSESN");
        assert_eq!(sanitize("a/b"), "a_b");
    }
}
