// =============================================================================
// Risk Store — latest risk record per ticker
// =============================================================================
//
// Records are keyed by ticker and replaced wholesale on upsert.  The JSON
// file store keeps everything in memory behind a mutex and rewrites the file
// atomically after each upsert.
// =============================================================================

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::model::artifacts::write_json_atomic;
use crate::risk::report::{PricePoint, RiskReport, VolatilityPoint};
use crate::risk::LossBucket;
use crate::types::RiskLevel;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskRecord {
    pub ticker: String,
    pub var95: f64,
    pub var99: f64,
    pub cvar: f64,
    pub risk_level: RiskLevel,
    /// Held-out accuracy of the asset's classifier, when one was trained.
    #[serde(default)]
    pub accuracy: Option<f64>,
    pub price_history: Vec<PricePoint>,
    pub volatility_data: Vec<VolatilityPoint>,
    pub var_data: Vec<LossBucket>,
    pub updated_at: DateTime<Utc>,
}

impl RiskRecord {
    pub fn from_report(report: &RiskReport, accuracy: Option<f64>) -> Self {
        Self {
            ticker: report.ticker.clone(),
            var95: report.var_95,
            var99: report.var_99,
            cvar: report.cvar,
            risk_level: report.risk_level,
            accuracy,
            price_history: report.price_history.clone(),
            volatility_data: report.volatility_data.clone(),
            var_data: report.var_distribution.clone(),
            updated_at: Utc::now(),
        }
    }
}

pub trait RiskStore: Send + Sync {
    fn upsert(&self, record: RiskRecord) -> Result<()>;
    fn get(&self, ticker: &str) -> Option<RiskRecord>;
    fn tickers(&self) -> Vec<String>;
}

pub struct JsonFileStore {
    path: PathBuf,
    records: Mutex<BTreeMap<String, RiskRecord>>,
}

impl JsonFileStore {
    /// Open the store at `path`; a missing file starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let records = if path.exists() {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read risk store {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("failed to parse risk store {}", path.display()))?
        } else {
            BTreeMap::new()
        };
        info!(path = %path.display(), records = records.len(), "risk store opened");
        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }
}

impl RiskStore for JsonFileStore {
    fn upsert(&self, record: RiskRecord) -> Result<()> {
        let mut records = self.records.lock();
        let ticker = record.ticker.clone();
        let previous = records.insert(ticker.clone(), record);
        if let Err(e) = write_json_atomic(&self.path, &*records) {
            // Keep memory and disk in step.
            match previous {
                Some(prev) => records.insert(ticker, prev),
                None => records.remove(&ticker),
            };
            return Err(e);
        }
        debug!(ticker, replaced = previous.is_some(), "risk record upserted");
        Ok(())
    }

    fn get(&self, ticker: &str) -> Option<RiskRecord> {
        self.records.lock().get(ticker).cloned()
    }

    fn tickers(&self) -> Vec<String> {
        self.records.lock().keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(ticker: &str, var95: f64) -> RiskRecord {
        RiskRecord {
            ticker: ticker.to_string(),
            var95,
            var99: var95 * 1.5,
            cvar: var95 * 1.8,
            risk_level: RiskLevel::Medium,
            accuracy: Some(0.9),
            price_history: vec![PricePoint {
                month: "Jan".into(),
                price: 100.0,
            }],
            volatility_data: Vec::new(),
            var_data: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    fn temp_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("volatisense-store-{}", uuid::Uuid::new_v4()))
            .join("risk_records.json")
    }

    #[test]
    fn upsert_replaces_by_ticker() {
        let path = temp_path();
        let store = JsonFileStore::open(&path).unwrap();
        store.upsert(record("TCS.NS", 10.0)).unwrap();
        store.upsert(record("TCS.NS", 20.0)).unwrap();
        store.upsert(record("INFY.NS", 5.0)).unwrap();

        assert_eq!(store.get("TCS.NS").unwrap().var95, 20.0);
        assert_eq!(store.tickers(), vec!["INFY.NS", "TCS.NS"]);
        assert!(store.get("HDFCBANK.NS").is_none());
        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[test]
    fn records_survive_reopen() {
        let path = temp_path();
        {
            let store = JsonFileStore::open(&path).unwrap();
            store.upsert(record("^BSESN", 300.0)).unwrap();
        }
        let reopened = JsonFileStore::open(&path).unwrap();
        let rec = reopened.get("^BSESN").unwrap();
        assert_eq!(rec.var95, 300.0);
        assert_eq!(rec.price_history.len(), 1);
        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[test]
    fn record_uses_camel_case_keys() {
        let json = serde_json::to_value(record("TCS.NS", 1.0)).unwrap();
        for key in ["riskLevel", "priceHistory", "volatilityData", "varData", "updatedAt", "var95"] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
    }
}
