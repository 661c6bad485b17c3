// =============================================================================
// Risk Report — dashboard payload for one asset
// =============================================================================
//
// Built from a bar history plus its VaR snapshot:
//   - month-end close over the trailing `report_months` months
//   - month-end 30-day volatility (percent) over the same window
//   - VaR_95 / VaR_99 / CVaR rounded to 2 decimals
//   - the loss histogram
//   - human-readable risk log lines
//
// The as-of date is the last bar's date, so a report built from a fixed
// history is reproducible.
// =============================================================================

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::config::VarSettings;
use crate::indicators::{returns, volatility};
use crate::risk::var::{LossBucket, VarSummary};
use crate::types::{PriceBar, RiskLevel};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub month: String,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolatilityPoint {
    pub month: String,
    pub volatility: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskReport {
    pub ticker: String,
    pub as_of: NaiveDate,
    pub price_history: Vec<PricePoint>,
    pub volatility_data: Vec<VolatilityPoint>,
    #[serde(rename = "var_95")]
    pub var_95: f64,
    #[serde(rename = "var_99")]
    pub var_99: f64,
    pub cvar: f64,
    pub var_distribution: Vec<LossBucket>,
    pub risk_level: RiskLevel,
    pub risk_logs: Vec<String>,
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Last value of each calendar month (chronological), skipping NaN.
fn month_end_values(points: impl Iterator<Item = (NaiveDate, f64)>) -> Vec<(String, f64)> {
    let mut out: Vec<((i32, u32), String, f64)> = Vec::new();
    for (date, value) in points {
        if !value.is_finite() {
            continue;
        }
        let key = (date.year(), date.month());
        match out.last_mut() {
            Some((k, _, v)) if *k == key => *v = value,
            _ => out.push((key, date.format("%b").to_string(), value)),
        }
    }
    out.into_iter().map(|(_, m, v)| (m, v)).collect()
}

/// Build the report for `ticker`.  Returns `None` for an empty history.
pub fn build_report(ticker: &str, bars: &[PriceBar], var: &VarSummary, settings: &VarSettings) -> Option<RiskReport> {
    let as_of = bars.last()?.date;
    let window_start = as_of
        .checked_sub_months(Months::new(settings.report_months))
        .unwrap_or(NaiveDate::MIN);
    let trend_start = as_of.checked_sub_months(Months::new(3)).unwrap_or(NaiveDate::MIN);

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let rets = returns::calculate_returns(&closes);
    let vol_pct: Vec<f64> = volatility::calculate_volatility(&rets, settings.report_volatility_window)
        .into_iter()
        .map(|v| v * 100.0)
        .collect();

    let price_history = month_end_values(
        bars.iter()
            .filter(|b| b.date >= window_start)
            .map(|b| (b.date, b.close)),
    )
    .into_iter()
    .map(|(month, price)| PricePoint { month, price })
    .collect();

    let recent_vol: Vec<(NaiveDate, f64)> = bars
        .iter()
        .zip(&vol_pct)
        .filter(|(b, _)| b.date >= window_start)
        .map(|(b, &v)| (b.date, v))
        .collect();

    let volatility_data = month_end_values(recent_vol.iter().copied())
        .into_iter()
        .map(|(month, volatility)| VolatilityPoint { month, volatility })
        .collect();

    let (c, tail) = (settings.confidence, settings.tail_confidence);
    let mut risk_logs = vec![
        format!("Calculated VaR at {c}% confidence level: ₹{:.2}", var.var_95),
        format!("Calculated VaR at {tail}% confidence level: ₹{:.2}", var.var_99),
        format!("Conditional VaR (Expected Shortfall): ₹{:.2}", var.cvar_95),
        format!("There is a {}% chance the losses will exceed ₹{:.2} next week", 100.0 - c, var.var_95),
        format!("There is a {}% chance the losses will exceed ₹{:.2} next week", 100.0 - tail, var.var_99),
    ];
    if var.cvar_fallback {
        risk_logs.push(format!("Tail beyond VaR_{c} was empty; CVaR reports the worst observed loss"));
    }

    let latest = recent_vol.iter().rev().map(|&(_, v)| v).find(|v| v.is_finite());
    let trend: Vec<f64> = recent_vol
        .iter()
        .filter(|(d, v)| *d >= trend_start && v.is_finite())
        .map(|&(_, v)| v)
        .collect();
    if let (Some(latest), Some(avg)) = (latest, crate::stats::mean(&trend)) {
        let change = if avg != 0.0 { (latest - avg) / avg * 100.0 } else { 0.0 };
        let direction = if change > 0.0 { "higher" } else { "lower" };
        risk_logs.push(format!(
            "Current volatility is {latest:.2}%, which is {:.0}% {direction} than 3-month average",
            change.abs()
        ));
    }

    Some(RiskReport {
        ticker: ticker.to_string(),
        as_of,
        price_history,
        volatility_data,
        var_95: round2(var.var_95),
        var_99: round2(var.var_99),
        cvar: round2(var.cvar_95),
        var_distribution: var.distribution.clone(),
        risk_level: var.risk_level,
        risk_logs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::tests::synthetic_bars;
    use crate::risk::var;

    fn report_for(n: usize) -> RiskReport {
        let bars = synthetic_bars(n);
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let rets = returns::calculate_returns(&closes);
        let settings = VarSettings::default();
        let summary = var::estimate(&rets, closes[n - 1], &settings).unwrap();
        build_report("TCS.NS", &bars, &summary, &settings).unwrap()
    }

    #[test]
    fn months_are_chronological_and_bounded() {
        // 400 daily bars from 2020-01-01 end on 2021-02-03.
        let r = report_for(400);
        assert_eq!(r.as_of, NaiveDate::from_ymd_opt(2021, 2, 3).unwrap());
        let months: Vec<&str> = r.price_history.iter().map(|p| p.month.as_str()).collect();
        assert_eq!(months, vec!["Aug", "Sep", "Oct", "Nov", "Dec", "Jan", "Feb"]);
        assert_eq!(r.volatility_data.len(), 7);
        assert!(r.volatility_data.iter().all(|v| v.volatility > 0.0));
    }

    #[test]
    fn month_end_price_is_last_close_of_month() {
        let bars = synthetic_bars(400);
        let r = report_for(400);
        let last = r.price_history.last().unwrap();
        assert_eq!(last.price, bars[399].close);
    }

    #[test]
    fn headline_numbers_are_rounded() {
        let r = report_for(300);
        assert_eq!(r.var_95, (r.var_95 * 100.0).round() / 100.0);
        assert!(r.cvar >= r.var_95);
        assert!(r.risk_logs.iter().any(|l| l.contains("3-month average")));
        assert_eq!(r.var_distribution.len(), 6);
    }

    #[test]
    fn log_lines_name_the_configured_confidence() {
        let r = report_for(300);
        assert!(r.risk_logs[0].starts_with("Calculated VaR at 95% confidence level"));
        assert!(r.risk_logs[3].starts_with("There is a 5% chance"));
        assert!(r.risk_logs[4].starts_with("There is a 1% chance"));
    }

    #[test]
    fn serialises_with_dashboard_keys() {
        let json = serde_json::to_value(report_for(120)).unwrap();
        for key in ["priceHistory", "volatilityData", "var_95", "var_99", "cvar", "varDistribution", "riskLogs", "riskLevel"] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
    }

    #[test]
    fn month_grouping_skips_nan() {
        let d = |m, day| NaiveDate::from_ymd_opt(2024, m, day).unwrap();
        let out = month_end_values(
            vec![(d(1, 5), 1.0), (d(1, 20), 2.0), (d(2, 1), 3.0), (d(2, 28), f64::NAN)].into_iter(),
        );
        assert_eq!(out, vec![("Jan".to_string(), 2.0), ("Feb".to_string(), 3.0)]);
    }
}
