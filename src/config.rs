// =============================================================================
// Pipeline Configuration — every window, threshold and path in one place
// =============================================================================
//
// Nothing in the pipeline reads ambient state: windows, labeling quantiles,
// VaR thresholds, classifier parameters and artifact locations all arrive
// through this struct.
//
// Persistence uses an atomic tmp + rename pattern.  All fields carry
// `#[serde(default)]` so that adding new fields never breaks loading an
// older config file.
//
// =============================================================================

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::features::FeatureColumn;
use crate::types::FillStrategy;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_tickers() -> Vec<String> {
    vec![
        "^BSESN".to_string(),
        "RELIANCE.NS".to_string(),
        "TCS.NS".to_string(),
        "HDFCBANK.NS".to_string(),
        "INFY.NS".to_string(),
    ]
}

fn default_baseline_ticker() -> String {
    "^BSESN".to_string()
}

fn default_start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2010, 1, 1).unwrap_or(NaiveDate::MIN)
}

fn default_symbol_suffix() -> String {
    ".NS".to_string()
}

fn default_artifact_dir() -> PathBuf {
    PathBuf::from("artifacts")
}

fn default_store_path() -> PathBuf {
    PathBuf::from("artifacts/risk_records.json")
}

fn default_test_ratio() -> f64 {
    0.2
}

fn default_seed() -> u64 {
    42
}

fn default_true() -> bool {
    true
}

// =============================================================================
// Sections
// =============================================================================

/// Look-back windows of the Indicator Engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorWindows {
    /// Rolling std of returns used as the Volatility feature.
    pub volatility: usize,
    pub ma_fast: usize,
    pub ma_slow: usize,
    pub rsi: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub atr: usize,
    pub bollinger: usize,
    pub bollinger_std: f64,
    /// Trailing window of the rolling VaR feature.
    pub rolling_var: usize,
    /// Percentile taken inside the rolling VaR window.
    pub rolling_var_pct: f64,
}

impl Default for IndicatorWindows {
    fn default() -> Self {
        Self {
            volatility: 10,
            ma_fast: 50,
            ma_slow: 200,
            rsi: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            atr: 14,
            bollinger: 20,
            bollinger_std: 2.0,
            rolling_var: 100,
            rolling_var_pct: 5.0,
        }
    }
}

/// Return percentiles that separate High / Medium / Low labels.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelQuantiles {
    /// Returns strictly below this percentile are High.
    pub high_pct: f64,
    /// Returns strictly below this percentile (and not High) are Medium.
    pub medium_pct: f64,
}

impl Default for LabelQuantiles {
    fn default() -> Self {
        Self {
            high_pct: 5.0,
            medium_pct: 10.0,
        }
    }
}

/// VaR_95 (as a return) cut-offs for the asset-level risk level.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskThresholds {
    /// VaR_95 below this return is High risk.
    pub high_var_return: f64,
    /// VaR_95 below this return (and not High) is Medium risk.
    pub medium_var_return: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            high_var_return: -0.03,
            medium_var_return: -0.015,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VarSettings {
    /// Confidence (percent) of the headline VaR and of CVaR.
    pub confidence: f64,
    /// Confidence (percent) of the tail VaR.
    pub tail_confidence: f64,
    /// Number of equal-width buckets in the loss histogram.
    pub histogram_buckets: usize,
    /// Window of the volatility series shown in the risk report.
    pub report_volatility_window: usize,
    /// Months of history shown in the risk report charts.
    pub report_months: u32,
    #[serde(default)]
    pub thresholds: RiskThresholds,
}

impl Default for VarSettings {
    fn default() -> Self {
        Self {
            confidence: 95.0,
            tail_confidence: 99.0,
            histogram_buckets: 6,
            report_volatility_window: 30,
            report_months: 6,
            thresholds: RiskThresholds::default(),
        }
    }
}

/// Boosted-tree hyperparameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GbmParams {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub learning_rate: f64,
    /// Row fraction sampled per boosting round.
    pub subsample: f64,
    /// Feature fraction sampled per tree.
    pub colsample_bytree: f64,
    /// Minimum hessian sum in a child node.
    pub min_child_weight: f64,
    /// L2 regularisation on leaf weights.
    pub lambda: f64,
    /// Boosting rounds added on top of the baseline in transfer mode.
    pub transfer_rounds: usize,
    pub seed: u64,
}

impl Default for GbmParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: 5,
            learning_rate: 0.1,
            subsample: 0.8,
            colsample_bytree: 0.8,
            min_child_weight: 1.0,
            lambda: 1.0,
            transfer_rounds: 50,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    /// Total attempts per ticker, including the first.
    pub attempts: u32,
    pub retry_delay_ms: u64,
    pub timeout_secs: u64,
    /// Suffix appended to bare symbols (".NS" for NSE listings).
    pub symbol_suffix: String,
    /// When set, bars are read from `<dir>/<TICKER>.json` instead of the network.
    pub offline_dir: Option<PathBuf>,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            attempts: 3,
            retry_delay_ms: 1000,
            timeout_secs: 30,
            symbol_suffix: default_symbol_suffix(),
            offline_dir: None,
        }
    }
}

// =============================================================================
// PipelineConfig
// =============================================================================

/// Top-level configuration of one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    // --- Universe -----------------------------------------------------------
    #[serde(default = "default_tickers")]
    pub tickers: Vec<String>,

    #[serde(default = "default_start_date")]
    pub start_date: NaiveDate,

    /// Inclusive end date; `None` means today.
    #[serde(default)]
    pub end_date: Option<NaiveDate>,

    // --- Transfer learning --------------------------------------------------
    /// Asset the shared baseline model is trained on.
    #[serde(default = "default_baseline_ticker")]
    pub baseline_ticker: String,

    /// Initialise per-asset models from the baseline ensemble.
    #[serde(default = "default_true")]
    pub warm_start: bool,

    /// Reuse the baseline scaler for every asset instead of fitting per asset.
    #[serde(default = "default_true")]
    pub share_scaler: bool,

    /// Load the baseline pair from this artifact directory instead of
    /// training it in the current run.
    #[serde(default)]
    pub baseline_from: Option<PathBuf>,

    // --- Features & labels --------------------------------------------------
    #[serde(default = "FeatureColumn::default_set")]
    pub features: Vec<FeatureColumn>,

    #[serde(default)]
    pub windows: IndicatorWindows,

    #[serde(default)]
    pub labels: LabelQuantiles,

    #[serde(default)]
    pub fill_strategy: FillStrategy,

    // --- Training -----------------------------------------------------------
    #[serde(default = "default_test_ratio")]
    pub test_ratio: f64,

    #[serde(default = "default_seed")]
    pub split_seed: u64,

    #[serde(default)]
    pub gbm: GbmParams,

    // --- Risk ---------------------------------------------------------------
    #[serde(default)]
    pub var: VarSettings,

    // --- I/O ----------------------------------------------------------------
    #[serde(default)]
    pub fetch: FetchSettings,

    #[serde(default = "default_artifact_dir")]
    pub artifact_dir: PathBuf,

    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            tickers: default_tickers(),
            start_date: default_start_date(),
            end_date: None,
            baseline_ticker: default_baseline_ticker(),
            warm_start: true,
            share_scaler: true,
            baseline_from: None,
            features: FeatureColumn::default_set(),
            windows: IndicatorWindows::default(),
            labels: LabelQuantiles::default(),
            fill_strategy: FillStrategy::default(),
            test_ratio: default_test_ratio(),
            split_seed: default_seed(),
            gbm: GbmParams::default(),
            var: VarSettings::default(),
            fetch: FetchSettings::default(),
            artifact_dir: default_artifact_dir(),
            store_path: default_store_path(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read pipeline config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse pipeline config from {}", path.display()))?;

        info!(
            path = %path.display(),
            tickers = ?config.tickers,
            features = config.features.len(),
            "pipeline config loaded"
        );

        Ok(config)
    }

    /// Persist the configuration to `path` using an atomic write
    /// (write to `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(self)
            .context("failed to serialise pipeline config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "pipeline config saved (atomic)");
        Ok(())
    }

    /// Apply `VOLATISENSE_*` environment overrides.
    pub fn apply_env(&mut self) {
        if let Ok(list) = std::env::var("VOLATISENSE_TICKERS") {
            let tickers: Vec<String> = list
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            if !tickers.is_empty() {
                self.tickers = tickers;
            }
        }
        if let Ok(dir) = std::env::var("VOLATISENSE_ARTIFACT_DIR") {
            self.artifact_dir = PathBuf::from(dir);
        }
        if let Ok(path) = std::env::var("VOLATISENSE_STORE_PATH") {
            self.store_path = PathBuf::from(path);
        }
        if let Ok(dir) = std::env::var("VOLATISENSE_OFFLINE_DIR") {
            self.fetch.offline_dir = Some(PathBuf::from(dir));
        }
    }

    /// End date of the run, defaulting to today.
    pub fn resolved_end_date(&self) -> NaiveDate {
        self.end_date.unwrap_or_else(|| chrono::Utc::now().date_naive())
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.tickers.len(), 5);
        assert_eq!(cfg.tickers[0], "^BSESN");
        assert_eq!(cfg.windows.volatility, 10);
        assert_eq!(cfg.windows.rolling_var, 100);
        assert!((cfg.labels.high_pct - 5.0).abs() < f64::EPSILON);
        assert!((cfg.var.thresholds.high_var_return + 0.03).abs() < f64::EPSILON);
        assert_eq!(cfg.features.len(), 13);
        assert_eq!(cfg.fill_strategy, FillStrategy::Median);
        assert_eq!(cfg.gbm.seed, 42);
    }

    #[test]
    fn deserialise_empty_json_uses_defaults() {
        let cfg: PipelineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.baseline_ticker, "^BSESN");
        assert!(cfg.warm_start);
        assert_eq!(cfg.windows.macd_slow, 26);
        assert_eq!(cfg.var.histogram_buckets, 6);
        assert_eq!(cfg.fetch.attempts, 3);
    }

    #[test]
    fn deserialise_partial_sections_fill_defaults() {
        let json = r#"{
            "tickers": ["INFY.NS"],
            "windows": { "volatility": 30 },
            "fill_strategy": "ForwardBackward"
        }"#;
        let cfg: PipelineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.tickers, vec!["INFY.NS"]);
        assert_eq!(cfg.windows.volatility, 30);
        assert_eq!(cfg.windows.rsi, 14);
        assert_eq!(cfg.fill_strategy, FillStrategy::ForwardBackward);
    }

    #[test]
    fn save_then_load() {
        let dir = std::env::temp_dir().join(format!("volatisense-cfg-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("pipeline.json");

        let mut cfg = PipelineConfig::default();
        cfg.tickers = vec!["TCS.NS".into()];
        cfg.gbm.max_depth = 3;
        cfg.save(&path).unwrap();

        let loaded = PipelineConfig::load(&path).unwrap();
        assert_eq!(loaded.tickers, cfg.tickers);
        assert_eq!(loaded.gbm.max_depth, 3);
        assert!(!path.with_extension("json.tmp").exists());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn load_missing_file_is_error() {
        assert!(PipelineConfig::load("/definitely/not/here.json").is_err());
    }
}
