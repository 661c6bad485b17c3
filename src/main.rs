// =============================================================================
// VolatiSense — Main Entry Point
// =============================================================================
//
// Subcommands:
//   train   : batch run: baseline, per-asset classifiers, VaR records
//   analyze : print a fresh risk report for one symbol
//   serve   : HTTP API (update-model, analyze-risk, stored records)
//   init-config : write the effective config (defaults + env) to --config
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod api;
mod app_state;
mod config;
mod features;
mod indicators;
mod market_data;
mod model;
mod pipeline;
mod risk;
mod stats;
mod store;
mod types;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::config::PipelineConfig;
use crate::market_data::MarketSource;
use crate::model::ArtifactStore;
use crate::pipeline::RunSummary;
use crate::store::JsonFileStore;
use crate::types::AssetStatus;

#[derive(Parser)]
#[command(
    name = "volatisense",
    version,
    about = "Risk labelling, VaR estimation and risk-classifier training for listed equities",
    propagate_version = true
)]
struct Cli {
    /// Pipeline config (JSON).  Missing file falls back to defaults.
    #[arg(long, env = "VOLATISENSE_CONFIG", default_value = "volatisense.json", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train every configured asset and refresh stored risk records
    Train(TrainArgs),
    /// Print a risk report for one symbol
    Analyze {
        /// Symbol, e.g. TCS or ^BSESN
        symbol: String,
    },
    /// Write the effective configuration to the --config path
    InitConfig {
        /// Replace an existing file
        #[arg(long, default_value_t = false)]
        force: bool,
    },
    /// Run the HTTP API
    Serve {
        #[arg(long, env = "VOLATISENSE_BIND_ADDR", default_value = "0.0.0.0:5000")]
        bind: String,
    },
}

#[derive(clap::Args)]
struct TrainArgs {
    /// Comma-separated tickers, replacing the configured list
    #[arg(long, value_delimiter = ',')]
    tickers: Option<Vec<String>>,

    #[arg(long)]
    start: Option<NaiveDate>,

    #[arg(long)]
    end: Option<NaiveDate>,

    /// Train every asset from scratch
    #[arg(long, default_value_t = false)]
    no_warm_start: bool,

    /// Reuse the baseline saved under this artifact directory
    #[arg(long)]
    baseline_from: Option<PathBuf>,
}

impl TrainArgs {
    fn apply(self, config: &mut PipelineConfig) {
        if let Some(tickers) = self.tickers {
            config.tickers = tickers.into_iter().filter(|t| !t.trim().is_empty()).collect();
        }
        if let Some(start) = self.start {
            config.start_date = start;
        }
        if self.end.is_some() {
            config.end_date = self.end;
        }
        if self.no_warm_start {
            config.warm_start = false;
        }
        if self.baseline_from.is_some() {
            config.baseline_from = self.baseline_from;
        }
    }
}

fn load_config(path: &PathBuf) -> PipelineConfig {
    let mut config = PipelineConfig::load(path).unwrap_or_else(|e| {
        warn!(error = %format!("{e:#}"), "Failed to load config, using defaults");
        PipelineConfig::default()
    });
    config.apply_env();
    config
}

fn print_summary(summary: &RunSummary) {
    println!("run {}  baseline {}", summary.run_id, summary.baseline);
    for asset in &summary.assets {
        let accuracy = asset
            .accuracy
            .map(|a| format!("{:.3}", a))
            .unwrap_or_else(|| "-".into());
        let var95 = asset.var95.map(|v| format!("{:.2}", v)).unwrap_or_else(|| "-".into());
        println!(
            "  {:<14} {:<8} rows {:>5}  acc {:>6}  VaR95 {:>10}  {}",
            asset.ticker,
            asset.status.to_string(),
            asset.rows,
            accuracy,
            var95,
            asset.error.as_deref().unwrap_or("")
        );
    }
    println!(
        "trained {}  skipped {}  failed {}",
        summary.count(AssetStatus::Trained),
        summary.count(AssetStatus::Skipped),
        summary.count(AssetStatus::Failed)
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & logging ─────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = load_config(&cli.config);

    match cli.command {
        // ── Batch training ───────────────────────────────────────────────
        Commands::Train(args) => {
            args.apply(&mut config);
            let source = MarketSource::from_settings(&config.fetch)?;
            let store = Arc::new(JsonFileStore::open(&config.store_path)?);
            let summary = pipeline::run_batch(&config, &source, store).await?;
            print_summary(&summary);
        }

        // ── One-off analysis ─────────────────────────────────────────────
        Commands::Analyze { symbol } => {
            let source = MarketSource::from_settings(&config.fetch)?;
            let report = pipeline::analyze_symbol(&symbol, &config, &source).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        // ── Config scaffold ──────────────────────────────────────────────
        Commands::InitConfig { force } => {
            if cli.config.exists() && !force {
                anyhow::bail!("{} already exists; pass --force to replace it", cli.config.display());
            }
            config.save(&cli.config)?;
            info!(path = %cli.config.display(), "config written");
        }

        // ── HTTP API ─────────────────────────────────────────────────────
        Commands::Serve { bind } => {
            let source = MarketSource::from_settings(&config.fetch)?;
            let store = Arc::new(JsonFileStore::open(&config.store_path)?);
            let admin_token = std::env::var("VOLATISENSE_ADMIN_TOKEN").ok();
            if admin_token.as_deref().map_or(true, str::is_empty) {
                warn!("VOLATISENSE_ADMIN_TOKEN not set; update-model is disabled");
            }

            let previous: Option<RunSummary> = ArtifactStore::new(&config.artifact_dir).load_summary().ok();
            let state = Arc::new(AppState::new(config, source, store, admin_token));
            if let Some(summary) = previous {
                info!(run_id = %summary.run_id, "restored latest run summary");
                *state.latest_run.write() = Some(summary);
            }

            let app = api::rest::router(Arc::clone(&state));
            let listener = tokio::net::TcpListener::bind(&bind)
                .await
                .with_context(|| format!("failed to bind API server to {bind}"))?;
            info!(addr = %bind, "API server listening");

            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = tokio::signal::ctrl_c().await;
                    info!("shutdown signal received");
                })
                .await
                .context("API server failed")?;
        }
    }

    Ok(())
}
