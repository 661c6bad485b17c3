// =============================================================================
// Feature Table — PriceBar + derived indicator columns
// =============================================================================
//
// `build_feature_rows` runs every indicator over the full bar history, then:
//   1. sweeps ±infinity to NaN,
//   2. drops the warm-up prefix (rows before every required column has its
//      first defined value: the rolling windows are still incomplete there),
//   3. drops rows whose Return is undefined (bad close),
//   4. imputes any NaN still left in the feature columns with the configured
//      fill strategy.
//
// Every derived value at row t only reads bars at or before t.  The one
// documented exception is the rolling VaR fallback for histories shorter
// than its window (see `indicators::rolling_var`).
// =============================================================================

pub mod cleaning;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::IndicatorWindows;
use crate::indicators::{atr, bollinger, macd, moving_average, range, returns, rolling_var, rsi, volatility};
use crate::types::{FillStrategy, PriceBar};

/// A numeric column of the feature table.
///
/// The serialised names are the column headers of the historical datasets,
/// so stored feature orderings stay readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeatureColumn {
    #[serde(rename = "Return")]
    Return,
    #[serde(rename = "Volatility")]
    Volatility,
    #[serde(rename = "MA_Fast")]
    MaFast,
    #[serde(rename = "MA_Slow")]
    MaSlow,
    #[serde(rename = "Range")]
    Range,
    #[serde(rename = "Range_Ratio")]
    RangeRatio,
    #[serde(rename = "Volume_Surge")]
    VolumeSurge,
    #[serde(rename = "RSI")]
    Rsi,
    #[serde(rename = "MACD")]
    Macd,
    #[serde(rename = "MACD_Signal")]
    MacdSignal,
    #[serde(rename = "Gap")]
    Gap,
    #[serde(rename = "VaR_95")]
    Var95,
    #[serde(rename = "BB_Upper")]
    BbUpper,
    #[serde(rename = "BB_Lower")]
    BbLower,
    #[serde(rename = "ATR")]
    Atr,
}

impl FeatureColumn {
    /// Training features of the risk classifier.  Return is excluded: the
    /// labels are derived from it.
    pub fn default_set() -> Vec<FeatureColumn> {
        vec![
            Self::Volatility,
            Self::MaFast,
            Self::MaSlow,
            Self::Range,
            Self::VolumeSurge,
            Self::Rsi,
            Self::Macd,
            Self::MacdSignal,
            Self::Gap,
            Self::Var95,
            Self::BbUpper,
            Self::BbLower,
            Self::Atr,
        ]
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Return => "Return",
            Self::Volatility => "Volatility",
            Self::MaFast => "MA_Fast",
            Self::MaSlow => "MA_Slow",
            Self::Range => "Range",
            Self::RangeRatio => "Range_Ratio",
            Self::VolumeSurge => "Volume_Surge",
            Self::Rsi => "RSI",
            Self::Macd => "MACD",
            Self::MacdSignal => "MACD_Signal",
            Self::Gap => "Gap",
            Self::Var95 => "VaR_95",
            Self::BbUpper => "BB_Upper",
            Self::BbLower => "BB_Lower",
            Self::Atr => "ATR",
        }
    }
}

impl std::fmt::Display for FeatureColumn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Ordered column names, as stored alongside fitted artifacts.
pub fn column_names(columns: &[FeatureColumn]) -> Vec<String> {
    columns.iter().map(|c| c.name().to_string()).collect()
}

/// One session with all derived fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureRow {
    pub bar: PriceBar,
    pub ret: f64,
    pub volatility: f64,
    pub ma_fast: f64,
    pub ma_slow: f64,
    pub range: f64,
    pub range_ratio: f64,
    pub volume_surge: f64,
    pub rsi: f64,
    pub macd: f64,
    pub macd_signal: f64,
    pub gap: f64,
    pub var_95: f64,
    pub bb_upper: f64,
    pub bb_lower: f64,
    pub atr: f64,
}

impl FeatureRow {
    pub fn get(&self, column: FeatureColumn) -> f64 {
        match column {
            FeatureColumn::Return => self.ret,
            FeatureColumn::Volatility => self.volatility,
            FeatureColumn::MaFast => self.ma_fast,
            FeatureColumn::MaSlow => self.ma_slow,
            FeatureColumn::Range => self.range,
            FeatureColumn::RangeRatio => self.range_ratio,
            FeatureColumn::VolumeSurge => self.volume_surge,
            FeatureColumn::Rsi => self.rsi,
            FeatureColumn::Macd => self.macd,
            FeatureColumn::MacdSignal => self.macd_signal,
            FeatureColumn::Gap => self.gap,
            FeatureColumn::Var95 => self.var_95,
            FeatureColumn::BbUpper => self.bb_upper,
            FeatureColumn::BbLower => self.bb_lower,
            FeatureColumn::Atr => self.atr,
        }
    }

    fn get_mut(&mut self, column: FeatureColumn) -> &mut f64 {
        match column {
            FeatureColumn::Return => &mut self.ret,
            FeatureColumn::Volatility => &mut self.volatility,
            FeatureColumn::MaFast => &mut self.ma_fast,
            FeatureColumn::MaSlow => &mut self.ma_slow,
            FeatureColumn::Range => &mut self.range,
            FeatureColumn::RangeRatio => &mut self.range_ratio,
            FeatureColumn::VolumeSurge => &mut self.volume_surge,
            FeatureColumn::Rsi => &mut self.rsi,
            FeatureColumn::Macd => &mut self.macd,
            FeatureColumn::MacdSignal => &mut self.macd_signal,
            FeatureColumn::Gap => &mut self.gap,
            FeatureColumn::Var95 => &mut self.var_95,
            FeatureColumn::BbUpper => &mut self.bb_upper,
            FeatureColumn::BbLower => &mut self.bb_lower,
            FeatureColumn::Atr => &mut self.atr,
        }
    }
}

/// Compute every indicator for `bars` (oldest first) without dropping rows.
pub fn compute_raw_rows(bars: &[PriceBar], windows: &IndicatorWindows) -> Vec<FeatureRow> {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();

    let ret = returns::calculate_returns(&closes);
    let vol = volatility::calculate_volatility(&ret, windows.volatility);
    let ma_fast = moving_average::calculate_sma(&closes, windows.ma_fast);
    let ma_slow = moving_average::calculate_sma(&closes, windows.ma_slow);
    let rng = range::calculate_range(bars);
    let rng_ratio = range::calculate_range_ratio(bars);
    let vol_surge = range::calculate_volume_surge(bars);
    let rsi = rsi::calculate_rsi(&closes, windows.rsi);
    let macd = macd::calculate_macd(&closes, windows.macd_fast, windows.macd_slow, windows.macd_signal);
    let gap = range::calculate_gap(bars);
    let var = rolling_var::calculate_rolling_var(&ret, windows.rolling_var, windows.rolling_var_pct);
    let bb = bollinger::calculate_bollinger(&closes, windows.bollinger, windows.bollinger_std);
    let atr = atr::calculate_atr(bars, windows.atr);

    bars.iter()
        .enumerate()
        .map(|(t, bar)| FeatureRow {
            bar: bar.clone(),
            ret: ret[t],
            volatility: vol[t],
            ma_fast: ma_fast[t],
            ma_slow: ma_slow[t],
            range: rng[t],
            range_ratio: rng_ratio[t],
            volume_surge: vol_surge[t],
            rsi: rsi[t],
            macd: macd.macd[t],
            macd_signal: macd.signal[t],
            gap: gap[t],
            var_95: var[t],
            bb_upper: bb.upper[t],
            bb_lower: bb.lower[t],
            atr: atr[t],
        })
        .collect()
}

/// Build the cleaned feature table used for labeling and training.
///
/// Returns an empty vector when some required column never becomes defined
/// (history shorter than its warm-up).
pub fn build_feature_rows(
    bars: &[PriceBar],
    windows: &IndicatorWindows,
    columns: &[FeatureColumn],
    fill: FillStrategy,
) -> Vec<FeatureRow> {
    let mut rows = compute_raw_rows(bars, windows);

    let mut required: Vec<FeatureColumn> = columns.to_vec();
    if !required.contains(&FeatureColumn::Return) {
        required.push(FeatureColumn::Return);
    }

    for row in rows.iter_mut() {
        for &col in &required {
            let v = row.get_mut(col);
            if v.is_infinite() {
                *v = f64::NAN;
            }
        }
    }

    let mut warmup = 0;
    for &col in &required {
        match rows.iter().position(|r| r.get(col).is_finite()) {
            Some(first) => warmup = warmup.max(first),
            None => {
                warn!(column = %col, bars = bars.len(), "column never defined; history too short");
                return Vec::new();
            }
        }
    }

    let mut rows: Vec<FeatureRow> = rows
        .into_iter()
        .skip(warmup)
        .filter(|r| r.ret.is_finite())
        .collect();

    for &col in columns {
        if col == FeatureColumn::Return {
            continue;
        }
        let mut values: Vec<f64> = rows.iter().map(|r| r.get(col)).collect();
        let imputed = cleaning::clean_column(&mut values, fill);
        if imputed > 0 {
            debug!(column = %col, imputed, strategy = ?fill, "imputed missing feature cells");
            for (row, v) in rows.iter_mut().zip(values) {
                *row.get_mut(col) = v;
            }
        }
    }

    debug!(bars = bars.len(), warmup, rows = rows.len(), "feature table built");
    rows
}

/// Row-major feature matrix in `columns` order.
pub fn feature_matrix(rows: &[FeatureRow], columns: &[FeatureColumn]) -> Vec<Vec<f64>> {
    rows.iter()
        .map(|r| columns.iter().map(|&c| r.get(c)).collect())
        .collect()
}

/// Return column of the feature table.
pub fn returns_of(rows: &[FeatureRow]) -> Vec<f64> {
    rows.iter().map(|r| r.ret).collect()
}
