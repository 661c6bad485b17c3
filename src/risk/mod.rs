//! Historical risk labels, VaR/CVaR and the per-asset risk report.

pub mod labeler;
pub mod report;
pub mod var;

pub use labeler::{label_counts, label_returns, LabelThresholds};
pub use report::{build_report, RiskReport};
pub use var::{estimate, LossBucket, VarSummary};
