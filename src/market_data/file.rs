// =============================================================================
// Offline source — `<dir>/<TICKER>.json` holding a JSON array of PriceBar
// =============================================================================

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use tracing::debug;

use super::PriceSource;
use crate::types::{is_valid_symbol, PriceBar};

#[derive(Debug, Clone)]
pub struct FileSource {
    dir: PathBuf,
}

impl FileSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, ticker: &str) -> PathBuf {
        self.dir.join(format!("{ticker}.json"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl PriceSource for FileSource {
    async fn fetch_bars(&self, ticker: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<PriceBar>> {
        if !is_valid_symbol(ticker) {
            bail!("refusing to read offline bars for invalid symbol {ticker:?}");
        }
        let path = self.path_for(ticker);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(ticker, path = %path.display(), "no offline file");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e).with_context(|| format!("failed to read {}", path.display())),
        };
        let bars: Vec<PriceBar> =
            serde_json::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(bars
            .into_iter()
            .filter(|b| b.date >= start && b.date <= end)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::tests::synthetic_bars;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("volatisense-bars-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn reads_and_filters_by_date() {
        let dir = temp_dir();
        let bars = synthetic_bars(30);
        std::fs::write(dir.join("INFY.NS.json"), serde_json::to_string(&bars).unwrap()).unwrap();

        let src = FileSource::new(&dir);
        let out = src.fetch_bars("INFY.NS", bars[5].date, bars[14].date).await.unwrap();
        assert_eq!(out.len(), 10);
        assert_eq!(out[0], bars[5]);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn missing_file_is_empty_not_error() {
        let src = FileSource::new(temp_dir());
        let d = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert!(src.fetch_bars("NONE.NS", d, d).await.unwrap().is_empty());
        std::fs::remove_dir_all(src.dir()).ok();
    }

    #[tokio::test]
    async fn corrupt_file_is_error() {
        let dir = temp_dir();
        std::fs::write(dir.join("BAD.NS.json"), "{not json").unwrap();
        let d = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert!(FileSource::new(&dir).fetch_bars("BAD.NS", d, d).await.is_err());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn symbols_cannot_leave_the_directory() {
        let root = temp_dir();
        let inner = root.join("bars");
        std::fs::create_dir_all(&inner).unwrap();
        // A readable file one level up must stay unreachable.
        let bars = serde_json::to_string(&synthetic_bars(5)).unwrap();
        std::fs::write(root.join("SECRET.json"), bars).unwrap();

        let src = FileSource::new(&inner);
        let (s, e) = (
            NaiveDate::from_ymd_opt(2000, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2100, 1, 1).unwrap(),
        );
        for bad in ["../SECRET", "..\\SECRET", "sub/../../SECRET"] {
            assert!(src.fetch_bars(bad, s, e).await.is_err(), "{bad}");
        }
        std::fs::remove_dir_all(&root).ok();
    }
}
