// =============================================================================
// Shared types used across the VolatiSense risk pipeline
// =============================================================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One trading session of OHLCV data.
///
/// Series are always held oldest-first and unique by `date`.  `volume` is
/// optional because several index feeds publish no volume at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: Option<f64>,
}

impl PriceBar {
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: Option<f64>) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

/// Sort bars chronologically and drop duplicate dates (the later entry wins).
pub fn normalize_bars(mut bars: Vec<PriceBar>) -> Vec<PriceBar> {
    bars.sort_by_key(|b| b.date);
    let mut out: Vec<PriceBar> = Vec::with_capacity(bars.len());
    for bar in bars {
        match out.last_mut() {
            Some(last) if last.date == bar.date => *last = bar,
            _ => out.push(bar),
        }
    }
    out
}

/// Historical risk class of a single observation.
///
/// Ordinal: `Low < Medium < High`, encoded as 0 / 1 / 2 for the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLabel {
    Low = 0,
    Medium = 1,
    High = 2,
}

impl RiskLabel {
    pub const ALL: [RiskLabel; 3] = [RiskLabel::Low, RiskLabel::Medium, RiskLabel::High];

    /// Number of classes the classifier is trained on.
    pub const COUNT: usize = 3;

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(idx: usize) -> Option<Self> {
        match idx {
            0 => Some(Self::Low),
            1 => Some(Self::Medium),
            2 => Some(Self::High),
            _ => None,
        }
    }
}

impl std::fmt::Display for RiskLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "Low"),
            Self::Medium => write!(f, "Medium"),
            Self::High => write!(f, "High"),
        }
    }
}

/// Current risk level of an asset derived from its VaR_95 return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "Low"),
            Self::Medium => write!(f, "Medium"),
            Self::High => write!(f, "High"),
        }
    }
}

/// How NaN cells left after the infinity sweep are filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FillStrategy {
    /// Column median; used for training matrices.
    Median,
    /// Forward fill then backward fill; keeps a single time series continuous.
    ForwardBackward,
}

impl Default for FillStrategy {
    fn default() -> Self {
        Self::Median
    }
}

/// Outcome of one asset in a batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetStatus {
    Trained,
    Skipped,
    Failed,
}

impl std::fmt::Display for AssetStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trained => write!(f, "Trained"),
            Self::Skipped => write!(f, "Skipped"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

/// Symbols are ASCII letters, digits and `^ . - & _ =`, without `..`.
/// They end up in file names and URL paths, so nothing else is accepted.
pub fn is_valid_symbol(symbol: &str) -> bool {
    !symbol.is_empty()
        && !symbol.contains("..")
        && symbol
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '^' | '.' | '-' | '&' | '_' | '='))
}

/// Append the exchange suffix to bare symbols.
///
/// Index symbols (`^BSESN`) and symbols that already carry an exchange suffix
/// (`TCS.NS`) are returned unchanged.  Returns `None` for blank input and for
/// symbols outside the accepted character set.
pub fn normalize_symbol(symbol: &str, suffix: &str) -> Option<String> {
    let symbol = symbol.trim().to_uppercase();
    if !is_valid_symbol(&symbol) {
        return None;
    }
    if symbol.starts_with('^') || symbol.contains('.') || suffix.is_empty() {
        return Some(symbol);
    }
    Some(format!("{symbol}{}", suffix.to_uppercase()))
}
