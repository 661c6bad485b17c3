// =============================================================================
// Market data — price-history sources behind one async seam
// =============================================================================
//
// `PriceSource::fetch_bars` returns bars for [start, end] oldest first.
// `fetch_with_retry` wraps any source with a fixed number of attempts and a
// fixed delay; an empty result counts as a failed attempt, and exhausting
// every attempt on empty results yields `DataError::Unavailable` so the
// caller can tell "no data" apart from other failures.
// =============================================================================

pub mod file;
pub mod yahoo;

use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use chrono::NaiveDate;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::FetchSettings;
use crate::types::{normalize_bars, PriceBar};

pub use file::FileSource;
pub use yahoo::YahooSource;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("no price data returned for {ticker} after {attempts} attempt(s)")]
    Unavailable { ticker: String, attempts: u32 },
    #[error("{ticker}: only {rows} usable rows after warm-up, need {needed}")]
    InsufficientHistory { ticker: String, rows: usize, needed: usize },
}

pub trait PriceSource {
    fn fetch_bars(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> impl Future<Output = Result<Vec<PriceBar>>> + Send;
}

/// Source chosen from configuration.
#[derive(Debug, Clone)]
pub enum MarketSource {
    Yahoo(YahooSource),
    Files(FileSource),
}

impl MarketSource {
    /// Offline directory when configured, otherwise the Yahoo chart API.
    pub fn from_settings(settings: &FetchSettings) -> Result<Self> {
        match &settings.offline_dir {
            Some(dir) => {
                let files = FileSource::new(dir);
                info!(dir = %files.dir().display(), "reading prices from offline files");
                Ok(Self::Files(files))
            }
            None => Ok(Self::Yahoo(YahooSource::new(Duration::from_secs(settings.timeout_secs))?)),
        }
    }
}

impl PriceSource for MarketSource {
    async fn fetch_bars(&self, ticker: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<PriceBar>> {
        match self {
            Self::Yahoo(s) => s.fetch_bars(ticker, start, end).await,
            Self::Files(s) => s.fetch_bars(ticker, start, end).await,
        }
    }
}

/// Fetch with a fixed number of attempts.  Returned bars are sorted and
/// unique by date.
pub async fn fetch_with_retry<S: PriceSource + Sync>(
    source: &S,
    ticker: &str,
    start: NaiveDate,
    end: NaiveDate,
    settings: &FetchSettings,
) -> Result<Vec<PriceBar>> {
    let attempts = settings.attempts.max(1);
    let delay = Duration::from_millis(settings.retry_delay_ms);
    let mut last_err: Option<anyhow::Error> = None;

    for attempt in 1..=attempts {
        match source.fetch_bars(ticker, start, end).await {
            Ok(bars) if !bars.is_empty() => return Ok(normalize_bars(bars)),
            Ok(_) => {
                warn!(ticker, attempt, attempts, "fetch returned no bars");
                last_err = None;
            }
            Err(e) => {
                warn!(ticker, attempt, attempts, error = %format!("{e:#}"), "fetch failed");
                last_err = Some(e);
            }
        }
        if attempt < attempts && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    match last_err {
        Some(e) => Err(e.context(format!("fetching {ticker} failed after {attempts} attempt(s)"))),
        None => Err(DataError::Unavailable {
            ticker: ticker.to_string(),
            attempts,
        }
        .into()),
    }
}
