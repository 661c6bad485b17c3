// =============================================================================
// Training Driver — baseline, per-asset transfer, run summary
// =============================================================================
//
// Batch flow:
//
//   1. Baseline: train (scaler, model) on the baseline ticker, or load an
//      existing pair from `baseline_from`.  Any failure here aborts the run;
//      there is nothing to transfer from.
//   2. For every ticker, in isolation:
//        fetch (retry) -> features -> labels -> stratified split
//        -> scaler (shared baseline scaler, refit locally on mismatch)
//        -> classifier (warm start from baseline when the schema matches)
//        -> evaluate -> save pair -> VaR/CVaR + report -> upsert store
//      No data or too little history marks the asset Skipped; any other
//      error marks it Failed.  Neither stops the batch.
//   3. Write `run_summary.json` with one entry per ticker.
// =============================================================================

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::features::{build_feature_rows, column_names, feature_matrix, returns_of};
use crate::indicators::returns::calculate_returns;
use crate::market_data::{fetch_with_retry, DataError, PriceSource};
use crate::model::split::take;
use crate::model::{
    stratified_split, ArtifactStore, ClassificationReport, GbmClassifier, ModelError, ScalerError, StandardScaler,
};
use crate::risk::{self, label_counts, label_returns, LabelThresholds, RiskReport, VarSummary};
use crate::store::{RiskRecord, RiskStore};
use crate::types::{normalize_symbol, AssetStatus, PriceBar, RiskLabel, RiskLevel};

/// Fewest feature rows an asset needs before it is trained.
pub const MIN_TRAINING_ROWS: usize = 30;

// =============================================================================
// Summary types
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetSummary {
    pub ticker: String,
    pub status: AssetStatus,
    pub rows: usize,
    /// Return quantiles the asset's labels were cut at.
    #[serde(default)]
    pub label_thresholds: Option<LabelThresholds>,
    pub accuracy: Option<f64>,
    pub var95: Option<f64>,
    pub var99: Option<f64>,
    pub cvar: Option<f64>,
    pub risk_level: Option<RiskLevel>,
    pub scaler_refit: bool,
    pub warm_started: bool,
    pub error: Option<String>,
}

impl AssetSummary {
    fn not_trained(ticker: &str, status: AssetStatus, error: String) -> Self {
        Self {
            ticker: ticker.to_string(),
            status,
            rows: 0,
            label_thresholds: None,
            accuracy: None,
            var95: None,
            var99: None,
            cvar: None,
            risk_level: None,
            scaler_refit: false,
            warm_started: false,
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub baseline: String,
    pub assets: Vec<AssetSummary>,
}

impl RunSummary {
    pub fn count(&self, status: AssetStatus) -> usize {
        self.assets.iter().filter(|a| a.status == status).count()
    }
}

// =============================================================================
// Dataset
// =============================================================================

/// Labeled feature matrix of one asset.
pub struct AssetDataset {
    pub feature_names: Vec<String>,
    pub x: Vec<Vec<f64>>,
    pub y: Vec<RiskLabel>,
    pub thresholds: LabelThresholds,
}

pub fn prepare_dataset(ticker: &str, bars: &[PriceBar], config: &PipelineConfig) -> Result<AssetDataset> {
    let rows = build_feature_rows(bars, &config.windows, &config.features, config.fill_strategy);
    if rows.len() < MIN_TRAINING_ROWS {
        return Err(DataError::InsufficientHistory {
            ticker: ticker.to_string(),
            rows: rows.len(),
            needed: MIN_TRAINING_ROWS,
        }
        .into());
    }

    let returns = returns_of(&rows);
    let (thresholds, y) =
        label_returns(&returns, &config.labels).with_context(|| format!("{ticker}: no finite returns to label"))?;
    let counts = label_counts(&y);
    info!(
        ticker,
        rows = rows.len(),
        low = counts[RiskLabel::Low.index()],
        medium = counts[RiskLabel::Medium.index()],
        high = counts[RiskLabel::High.index()],
        q_high = thresholds.q_high,
        q_medium = thresholds.q_medium,
        "dataset labeled"
    );

    Ok(AssetDataset {
        feature_names: column_names(&config.features),
        x: feature_matrix(&rows, &config.features),
        y,
        thresholds,
    })
}

// =============================================================================
// Training
// =============================================================================

/// Shared starting point for every asset.
#[derive(Debug, Clone)]
pub struct Baseline {
    pub ticker: String,
    pub scaler: StandardScaler,
    pub model: GbmClassifier,
}

pub struct TrainedAsset {
    pub scaler: StandardScaler,
    pub model: GbmClassifier,
    pub report: ClassificationReport,
    pub scaler_refit: bool,
    pub warm_started: bool,
}

/// Scaler for an asset: the baseline's when its schema fits the training
/// matrix, otherwise a local fit.  Returns `(scaler, refit)`.
fn resolve_scaler(
    ticker: &str,
    baseline: Option<&StandardScaler>,
    x_train: &[Vec<f64>],
    feature_names: &[String],
) -> Result<(StandardScaler, bool)> {
    let Some(shared) = baseline else {
        return Ok((StandardScaler::fit(x_train, feature_names)?, false));
    };

    let mismatch = match shared.transform(x_train) {
        Ok(_) if shared.feature_names == feature_names => None,
        Ok(_) => Some(format!("feature names differ from baseline ({:?})", shared.feature_names)),
        Err(ScalerError::DimensionMismatch { expected, got }) => {
            Some(format!("baseline scaler expects {expected} features, got {got}"))
        }
        Err(e) => return Err(e.into()),
    };

    match mismatch {
        None => Ok((shared.clone(), false)),
        Some(reason) => {
            warn!(ticker, %reason, "shared scaler does not fit; refitting locally");
            Ok((StandardScaler::fit(x_train, feature_names)?, true))
        }
    }
}

fn train_on(
    ticker: &str,
    dataset: &AssetDataset,
    baseline: Option<&Baseline>,
    config: &PipelineConfig,
) -> Result<TrainedAsset> {
    let split = stratified_split(&dataset.y, config.test_ratio, config.split_seed);
    let x_train = take(&dataset.x, &split.train);
    let y_train = take(&dataset.y, &split.train);
    let x_test = take(&dataset.x, &split.test);
    let y_test = take(&dataset.y, &split.test);

    let shared_scaler = baseline.filter(|_| config.share_scaler).map(|b| &b.scaler);
    let (scaler, scaler_refit) = resolve_scaler(ticker, shared_scaler, &x_train, &dataset.feature_names)?;
    let z_train = scaler.transform(&x_train)?;

    // Baseline trees split in the baseline's z-space, so they only continue
    // on features scaled by that same scaler.
    let same_scaling = shared_scaler.is_some() && !scaler_refit;
    if baseline.is_some() && config.warm_start && !same_scaling {
        warn!(ticker, "asset scaler differs from the baseline's; training a fresh model");
    }
    let warm_base = baseline.filter(|_| config.warm_start && same_scaling).map(|b| &b.model);
    let model = match warm_base {
        Some(base) => match GbmClassifier::fit_from_baseline(base, &z_train, &y_train, &dataset.feature_names, &config.gbm)
        {
            Ok(m) => m,
            Err(ModelError::SchemaMismatch { .. }) => {
                warn!(ticker, "baseline schema differs; training a fresh model");
                GbmClassifier::fit(&z_train, &y_train, &dataset.feature_names, &config.gbm)?
            }
            Err(e) => return Err(e.into()),
        },
        None => GbmClassifier::fit(&z_train, &y_train, &dataset.feature_names, &config.gbm)?,
    };
    let warm_started = model.is_warm_started();

    let (eval_x, eval_y) = if split.test.is_empty() {
        warn!(ticker, "no held-out rows; reporting on the training split");
        (z_train, y_train)
    } else {
        (scaler.transform(&x_test)?, y_test)
    };
    let predicted = model.predict(&eval_x)?;
    let report = ClassificationReport::compute(&eval_y, &predicted);

    info!(
        ticker,
        train = split.train.len(),
        test = split.test.len(),
        accuracy = report.accuracy,
        rounds = model.n_rounds(),
        warm_started,
        scaler_refit,
        "classifier trained"
    );
    info!("{ticker} classification report\n{}", report.render());
    let top: Vec<String> = model
        .importance()
        .into_iter()
        .take(5)
        .map(|(name, share)| format!("{name}={share:.3}"))
        .collect();
    debug!(ticker, top = ?top, "feature importance");

    Ok(TrainedAsset {
        scaler,
        model,
        report,
        scaler_refit,
        warm_started,
    })
}

/// Train the baseline pair from its own bars.
pub fn train_baseline(ticker: &str, bars: &[PriceBar], config: &PipelineConfig) -> Result<Baseline> {
    let dataset = prepare_dataset(ticker, bars, config)?;
    let trained = train_on(ticker, &dataset, None, config)?;
    Ok(Baseline {
        ticker: ticker.to_string(),
        scaler: trained.scaler,
        model: trained.model,
    })
}

/// VaR snapshot and report over the full bar history.
pub fn assess_risk(ticker: &str, bars: &[PriceBar], config: &PipelineConfig) -> Result<(VarSummary, RiskReport)> {
    let last = bars.last().with_context(|| format!("{ticker}: empty price history"))?;
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let returns = calculate_returns(&closes);
    let var = risk::estimate(&returns, last.close, &config.var)
        .with_context(|| format!("{ticker}: no finite returns for VaR"))?;
    let report = risk::build_report(ticker, bars, &var, &config.var)
        .with_context(|| format!("{ticker}: cannot build risk report"))?;
    Ok((var, report))
}

/// Train, persist and assess one asset whose bars are already fetched.
pub fn process_asset(
    ticker: &str,
    bars: &[PriceBar],
    baseline: Option<&Baseline>,
    config: &PipelineConfig,
    artifacts: &ArtifactStore,
    store: &dyn RiskStore,
) -> Result<AssetSummary> {
    let dataset = prepare_dataset(ticker, bars, config)?;
    let trained = train_on(ticker, &dataset, baseline, config)?;
    artifacts.save_asset(ticker, &trained.scaler, &trained.model, &trained.report)?;

    let (var, report) = assess_risk(ticker, bars, config)?;
    store
        .upsert(RiskRecord::from_report(&report, Some(trained.report.accuracy)))
        .with_context(|| format!("{ticker}: failed to store risk record"))?;

    info!(
        ticker,
        var95 = report.var_95,
        var99 = report.var_99,
        cvar = report.cvar,
        risk = %var.risk_level,
        "risk assessed"
    );

    Ok(AssetSummary {
        ticker: ticker.to_string(),
        status: AssetStatus::Trained,
        rows: dataset.y.len(),
        label_thresholds: Some(dataset.thresholds),
        accuracy: Some(trained.report.accuracy),
        var95: Some(report.var_95),
        var99: Some(report.var_99),
        cvar: Some(report.cvar),
        risk_level: Some(var.risk_level),
        scaler_refit: trained.scaler_refit,
        warm_started: trained.warm_started,
        error: None,
    })
}

// =============================================================================
// Batch
// =============================================================================

fn date_range(config: &PipelineConfig) -> (NaiveDate, NaiveDate) {
    (config.start_date, config.resolved_end_date())
}

async fn obtain_baseline<S: PriceSource + Sync>(
    config: &PipelineConfig,
    source: &S,
    artifacts: &ArtifactStore,
) -> Result<Baseline> {
    if let Some(dir) = &config.baseline_from {
        let (scaler, model) = ArtifactStore::new(dir)
            .load_baseline()
            .with_context(|| format!("failed to load baseline from {}", dir.display()))?;
        info!(dir = %dir.display(), features = model.n_features(), rounds = model.n_rounds(), "baseline loaded");
        return Ok(Baseline {
            ticker: config.baseline_ticker.clone(),
            scaler,
            model,
        });
    }

    let ticker = normalize_symbol(&config.baseline_ticker, &config.fetch.symbol_suffix)
        .context("baseline ticker is empty")?;
    let (start, end) = date_range(config);
    let bars = fetch_with_retry(source, &ticker, start, end, &config.fetch).await?;
    let config = config.clone();
    let artifacts = artifacts.clone();
    on_blocking_pool(move || {
        let baseline = train_baseline(&ticker, &bars, &config)?;
        artifacts.save_baseline(&baseline.scaler, &baseline.model)?;
        Ok(baseline)
    })
    .await
}

/// Run CPU-bound work (features, boosting, artifact writes) on the blocking
/// pool so runtime workers keep serving other tasks.
async fn on_blocking_pool<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .context("training task panicked")?
}

fn is_data_shortage(e: &anyhow::Error) -> bool {
    e.downcast_ref::<DataError>().is_some()
}

/// Run the full batch.  Only a baseline failure or an unwritable summary is
/// returned as an error.
pub async fn run_batch<S: PriceSource + Sync>(
    config: &PipelineConfig,
    source: &S,
    store: Arc<dyn RiskStore>,
) -> Result<RunSummary> {
    run_batch_with_id(Uuid::new_v4(), config, source, store).await
}

/// `run_batch` under a caller-chosen run id, for callers that report the id
/// before the run finishes.
pub async fn run_batch_with_id<S: PriceSource + Sync>(
    run_id: Uuid,
    config: &PipelineConfig,
    source: &S,
    store: Arc<dyn RiskStore>,
) -> Result<RunSummary> {
    let started_at = Utc::now();
    let artifacts = ArtifactStore::new(&config.artifact_dir);
    info!(%run_id, tickers = config.tickers.len(), baseline = %config.baseline_ticker, "batch run started");

    let baseline = Arc::new(
        obtain_baseline(config, source, &artifacts)
            .await
            .context("baseline training failed")?,
    );
    let shared_config = Arc::new(config.clone());

    let (start, end) = date_range(config);
    let mut assets = Vec::with_capacity(config.tickers.len());

    for raw in &config.tickers {
        let Some(ticker) = normalize_symbol(raw, &config.fetch.symbol_suffix) else {
            warn!(ticker = %raw, "blank ticker in configuration; ignored");
            continue;
        };

        let outcome = match fetch_with_retry(source, &ticker, start, end, &config.fetch).await {
            Ok(bars) => {
                let ticker = ticker.clone();
                let baseline = Arc::clone(&baseline);
                let config = Arc::clone(&shared_config);
                let artifacts = artifacts.clone();
                let store = Arc::clone(&store);
                on_blocking_pool(move || {
                    process_asset(&ticker, &bars, Some(baseline.as_ref()), &config, &artifacts, store.as_ref())
                })
                .await
            }
            Err(e) => Err(e),
        };

        let summary = match outcome {
            Ok(summary) => summary,
            Err(e) if is_data_shortage(&e) => {
                warn!(ticker = %ticker, reason = %e, "asset skipped");
                AssetSummary::not_trained(&ticker, AssetStatus::Skipped, e.to_string())
            }
            Err(e) => {
                error!(ticker = %ticker, error = %format!("{e:#}"), detail = ?e, "asset failed");
                AssetSummary::not_trained(&ticker, AssetStatus::Failed, format!("{e:#}"))
            }
        };
        assets.push(summary);
    }

    let summary = RunSummary {
        run_id,
        started_at,
        finished_at: Utc::now(),
        baseline: baseline.ticker.clone(),
        assets,
    };
    let path = artifacts.save_summary(&summary).context("failed to write run summary")?;
    info!(
        %run_id,
        trained = summary.count(AssetStatus::Trained),
        skipped = summary.count(AssetStatus::Skipped),
        failed = summary.count(AssetStatus::Failed),
        path = %path.display(),
        "batch run finished"
    );
    Ok(summary)
}

/// Risk report for one symbol, fetched fresh.  A blank symbol is an error.
pub async fn analyze_symbol<S: PriceSource + Sync>(
    symbol: &str,
    config: &PipelineConfig,
    source: &S,
) -> Result<RiskReport> {
    let ticker = normalize_symbol(symbol, &config.fetch.symbol_suffix).context("no ticker specified")?;
    let (start, end) = date_range(config);
    let bars = fetch_with_retry(source, &ticker, start, end, &config.fetch).await?;
    let config = config.clone();
    let (_, report) = on_blocking_pool(move || assess_risk(&ticker, &bars, &config)).await?;
    Ok(report)
}
