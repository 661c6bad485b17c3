// =============================================================================
// Yahoo Finance chart API client (daily bars)
// =============================================================================
//
// GET {base}/v8/finance/chart/{ticker}?interval=1d&period1=..&period2=..
//
// Rows where any of open/high/low/close is null are dropped; a null volume
// is kept as `None` (indices publish no volume).
// =============================================================================

use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate};
use serde::Deserialize;
use tracing::{debug, instrument};

use super::PriceSource;
use crate::types::{is_valid_symbol, PriceBar};

const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<Quote>,
}

#[derive(Debug, Default, Deserialize)]
struct Quote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

#[derive(Debug, Clone)]
pub struct YahooSource {
    base_url: String,
    client: reqwest::Client,
}

impl YahooSource {
    pub fn new(timeout: Duration) -> Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL, timeout)
    }

    pub fn with_base_url(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("Mozilla/5.0")
            .timeout(timeout)
            .build()
            .context("failed to build reqwest client")?;
        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }

    fn chart_url(&self, ticker: &str, start: NaiveDate, end: NaiveDate) -> String {
        let period1 = start.and_hms_opt(0, 0, 0).map(|t| t.and_utc().timestamp()).unwrap_or(0);
        // period2 is exclusive; include the whole end day.
        let period2 = end
            .succ_opt()
            .unwrap_or(end)
            .and_hms_opt(0, 0, 0)
            .map(|t| t.and_utc().timestamp())
            .unwrap_or(period1);
        format!(
            "{}/v8/finance/chart/{}?interval=1d&period1={}&period2={}",
            self.base_url, ticker, period1, period2
        )
    }
}

fn parse_chart(body: &str) -> Result<Vec<PriceBar>> {
    let response: ChartResponse = serde_json::from_str(body).context("failed to parse chart response")?;

    if let Some(err) = response.chart.error {
        bail!("Yahoo API error: {} - {}", err.code, err.description);
    }

    let Some(data) = response.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(Vec::new());
    };
    let quote = data.indicators.quote.into_iter().next().unwrap_or_default();

    let mut bars = Vec::with_capacity(data.timestamp.len());
    for (i, &ts) in data.timestamp.iter().enumerate() {
        let field = |v: &Vec<Option<f64>>| v.get(i).copied().flatten();
        let (Some(open), Some(high), Some(low), Some(close)) =
            (field(&quote.open), field(&quote.high), field(&quote.low), field(&quote.close))
        else {
            continue;
        };
        let Some(date) = DateTime::from_timestamp(ts, 0).map(|dt| dt.date_naive()) else {
            continue;
        };
        bars.push(PriceBar::new(date, open, high, low, close, field(&quote.volume)));
    }
    Ok(bars)
}

impl PriceSource for YahooSource {
    #[instrument(skip(self), name = "yahoo::fetch_bars")]
    async fn fetch_bars(&self, ticker: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<PriceBar>> {
        if !is_valid_symbol(ticker) {
            bail!("refusing to request chart for invalid symbol {ticker:?}");
        }
        let url = self.chart_url(ticker, start, end);

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("GET chart for {ticker} failed"))?;

        let status = resp.status();
        let body = resp.text().await.context("failed to read chart response body")?;

        if status == reqwest::StatusCode::NOT_FOUND {
            debug!(ticker, "chart endpoint returned 404");
            return Ok(Vec::new());
        }
        if !status.is_success() {
            bail!("chart request for {ticker} returned {status}: {body}");
        }

        let bars = parse_chart(&body)?;
        debug!(ticker, bars = bars.len(), "chart fetched");
        Ok(bars)
    }
}
