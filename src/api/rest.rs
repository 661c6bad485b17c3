// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
// Public:
//   GET  /api/health
//   GET  /api/runs/latest
//   GET  /api/risk/:ticker
//   GET  /api/models/:ticker     saved classifier metadata
//   POST /api/analyze-risk        { "symbol": "TCS" }
// Admin (Bearer token):
//   POST /api/update-model        202 + run id; 409 while a run is active
//
// CORS is permissive.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{Json, Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::api::auth::authorize;
use crate::app_state::AppState;
use crate::market_data::DataError;
use crate::model::ArtifactStore;
use crate::pipeline::{analyze_symbol, run_batch_with_id};
use crate::types::normalize_symbol;

// =============================================================================
// Router construction
// =============================================================================

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // ── Public ──────────────────────────────────────────────────
        .route("/api/health", get(health))
        .route("/api/runs/latest", get(latest_run))
        .route("/api/risk/:ticker", get(stored_risk))
        .route("/api/models/:ticker", get(model_info))
        .route("/api/analyze-risk", post(analyze_risk))
        // ── Admin ───────────────────────────────────────────────────
        .route("/api/update-model", post(update_model))
        // ── Middleware & State ───────────────────────────────────────
        .layer(cors)
        .with_state(state)
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({ "error": message.into() }))).into_response()
}

// =============================================================================
// Health
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    running: bool,
    runs_completed: u64,
    stored_tickers: usize,
    server_time: i64,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        running: state.is_running(),
        runs_completed: state.runs_completed(),
        stored_tickers: state.store.tickers().len(),
        server_time: chrono::Utc::now().timestamp_millis(),
    })
}

// =============================================================================
// Batch runs
// =============================================================================

#[derive(Serialize)]
struct RunAccepted {
    status: &'static str,
    run_id: Uuid,
}

async fn update_model(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    if let Err(rejection) = authorize(&headers, state.admin_token.as_deref()) {
        return rejection.into_response();
    }
    if !state.try_begin_run() {
        warn!("update-model requested while a run is active");
        return error_response(StatusCode::CONFLICT, "a model update is already running");
    }

    let run_id = Uuid::new_v4();
    info!(%run_id, "model update accepted");

    let task_state = Arc::clone(&state);
    tokio::spawn(async move {
        let result = run_batch_with_id(
            run_id,
            &task_state.config,
            &task_state.source,
            Arc::clone(&task_state.store),
        )
        .await;
        match result {
            Ok(summary) => task_state.finish_run(Some(summary)),
            Err(e) => {
                error!(%run_id, error = %format!("{e:#}"), "model update failed");
                task_state.finish_run(None);
            }
        }
    });

    (
        StatusCode::ACCEPTED,
        Json(RunAccepted {
            status: "started",
            run_id,
        }),
    )
        .into_response()
}

async fn latest_run(State(state): State<Arc<AppState>>) -> Response {
    let latest = state.latest_run.read().clone();
    match latest {
        Some(summary) => Json(summary).into_response(),
        None => error_response(StatusCode::NOT_FOUND, "no completed run yet"),
    }
}

// =============================================================================
// Risk
// =============================================================================

#[derive(Deserialize)]
struct AnalyzeRequest {
    #[serde(default)]
    symbol: String,
}

async fn analyze_risk(State(state): State<Arc<AppState>>, Json(req): Json<AnalyzeRequest>) -> Response {
    if req.symbol.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "no ticker specified");
    }
    if normalize_symbol(&req.symbol, &state.config.fetch.symbol_suffix).is_none() {
        warn!(symbol = %req.symbol, "rejected invalid symbol");
        return error_response(StatusCode::BAD_REQUEST, "invalid ticker symbol");
    }

    match analyze_symbol(&req.symbol, &state.config, &state.source).await {
        Ok(report) => Json(report).into_response(),
        Err(e) if e.downcast_ref::<DataError>().is_some() => {
            warn!(symbol = %req.symbol, reason = %e, "risk analysis has no data");
            error_response(StatusCode::NOT_FOUND, e.to_string())
        }
        Err(e) => {
            error!(symbol = %req.symbol, error = %format!("{e:#}"), "risk analysis failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}"))
        }
    }
}

async fn stored_risk(State(state): State<Arc<AppState>>, Path(ticker): Path<String>) -> Response {
    let Some(ticker) = normalize_symbol(&ticker, &state.config.fetch.symbol_suffix) else {
        return error_response(StatusCode::BAD_REQUEST, "no ticker specified");
    };
    match state.store.get(&ticker) {
        Some(record) => Json(record).into_response(),
        None => error_response(StatusCode::NOT_FOUND, format!("no risk record for {ticker}")),
    }
}

// =============================================================================
// Saved models
// =============================================================================

#[derive(Serialize)]
struct ModelInfo {
    ticker: String,
    features: Vec<String>,
    fingerprint: String,
    rounds: usize,
    baseline_rounds: usize,
    importance: Vec<(String, f64)>,
}

async fn model_info(State(state): State<Arc<AppState>>, Path(ticker): Path<String>) -> Response {
    let Some(ticker) = normalize_symbol(&ticker, &state.config.fetch.symbol_suffix) else {
        return error_response(StatusCode::BAD_REQUEST, "no ticker specified");
    };
    let artifacts = ArtifactStore::new(&state.config.artifact_dir);
    if !artifacts.asset_dir(&ticker).exists() {
        return error_response(StatusCode::NOT_FOUND, format!("no saved model for {ticker}"));
    }
    match artifacts.load_asset(&ticker) {
        Ok((_, model)) => Json(ModelInfo {
            ticker,
            rounds: model.n_rounds(),
            baseline_rounds: model.baseline_rounds,
            importance: model.importance(),
            fingerprint: model.fingerprint,
            features: model.feature_names,
        })
        .into_response(),
        Err(e) => {
            error!(ticker = %ticker, error = %format!("{e:#}"), "saved model unreadable");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}"))
        }
    }
}
