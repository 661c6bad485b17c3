// =============================================================================
// Shared Application State — HTTP surface
// =============================================================================
//
// Held as `Arc<AppState>` by every handler and by the background batch task.
//
// Thread safety:
//   - `running` is an AtomicBool so only one batch run is ever in flight.
//   - parking_lot::RwLock for the latest run summary.
//   - The risk store manages its own interior mutability.
// =============================================================================

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::PipelineConfig;
use crate::market_data::MarketSource;
use crate::pipeline::RunSummary;
use crate::store::RiskStore;

pub struct AppState {
    pub config: PipelineConfig,
    pub source: MarketSource,
    pub store: Arc<dyn RiskStore>,

    /// Token required by the admin endpoints; `None` disables them.
    pub admin_token: Option<String>,

    /// Set while a batch run is in flight.
    running: AtomicBool,
    runs_completed: AtomicU64,
    pub latest_run: RwLock<Option<RunSummary>>,
}

impl AppState {
    pub fn new(
        config: PipelineConfig,
        source: MarketSource,
        store: Arc<dyn RiskStore>,
        admin_token: Option<String>,
    ) -> Self {
        Self {
            config,
            source,
            store,
            admin_token: admin_token.filter(|t| !t.is_empty()),
            running: AtomicBool::new(false),
            runs_completed: AtomicU64::new(0),
            latest_run: RwLock::new(None),
        }
    }

    /// Claim the single run slot.  Returns `false` if a run is already active.
    pub fn try_begin_run(&self) -> bool {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Release the run slot, recording the summary when the run completed.
    pub fn finish_run(&self, summary: Option<RunSummary>) {
        if let Some(summary) = summary {
            *self.latest_run.write() = Some(summary);
            self.runs_completed.fetch_add(1, Ordering::Relaxed);
        }
        self.running.store(false, Ordering::Release);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn runs_completed(&self) -> u64 {
        self.runs_completed.load(Ordering::Relaxed)
    }
}
