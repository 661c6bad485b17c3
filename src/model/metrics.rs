// =============================================================================
// Classification report — accuracy, per-class P/R/F1, confusion matrix
// =============================================================================

use serde::{Deserialize, Serialize};

use crate::types::RiskLabel;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub label: RiskLabel,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Precision, recall and F1 averaged over classes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AveragedMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

impl AveragedMetrics {
    /// Unweighted mean over classes.
    fn macro_avg(classes: &[ClassMetrics]) -> Self {
        let n = classes.len().max(1) as f64;
        Self {
            precision: classes.iter().map(|c| c.precision).sum::<f64>() / n,
            recall: classes.iter().map(|c| c.recall).sum::<f64>() / n,
            f1: classes.iter().map(|c| c.f1).sum::<f64>() / n,
        }
    }

    /// Mean weighted by class support.
    fn weighted_avg(classes: &[ClassMetrics], samples: usize) -> Self {
        if samples == 0 {
            return Self {
                precision: 0.0,
                recall: 0.0,
                f1: 0.0,
            };
        }
        let weighted = |f: fn(&ClassMetrics) -> f64| {
            classes.iter().map(|c| f(c) * c.support as f64).sum::<f64>() / samples as f64
        };
        Self {
            precision: weighted(|c| c.precision),
            recall: weighted(|c| c.recall),
            f1: weighted(|c| c.f1),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub accuracy: f64,
    pub classes: Vec<ClassMetrics>,
    pub macro_avg: AveragedMetrics,
    pub weighted_avg: AveragedMetrics,
    /// `confusion[actual][predicted]`
    pub confusion: [[usize; RiskLabel::COUNT]; RiskLabel::COUNT],
    pub samples: usize,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

impl ClassificationReport {
    pub fn compute(actual: &[RiskLabel], predicted: &[RiskLabel]) -> Self {
        let mut confusion = [[0usize; RiskLabel::COUNT]; RiskLabel::COUNT];
        for (a, p) in actual.iter().zip(predicted) {
            confusion[a.index()][p.index()] += 1;
        }
        let samples = actual.len().min(predicted.len());
        let correct: usize = (0..RiskLabel::COUNT).map(|k| confusion[k][k]).sum();

        let classes: Vec<ClassMetrics> = RiskLabel::ALL
            .iter()
            .map(|&label| {
                let k = label.index();
                let tp = confusion[k][k];
                let support: usize = confusion[k].iter().sum();
                let predicted_k: usize = confusion.iter().map(|row| row[k]).sum();
                let precision = ratio(tp, predicted_k);
                let recall = ratio(tp, support);
                let f1 = if precision + recall > 0.0 {
                    2.0 * precision * recall / (precision + recall)
                } else {
                    0.0
                };
                ClassMetrics {
                    label,
                    precision,
                    recall,
                    f1,
                    support,
                }
            })
            .collect();

        Self {
            accuracy: ratio(correct, samples),
            macro_avg: AveragedMetrics::macro_avg(&classes),
            weighted_avg: AveragedMetrics::weighted_avg(&classes, samples),
            classes,
            confusion,
            samples,
        }
    }

    /// Plain-text table for the log.
    pub fn render(&self) -> String {
        let mut out = format!("{:>8} {:>9} {:>7} {:>7} {:>8}\n", "", "precision", "recall", "f1", "support");
        for c in &self.classes {
            out.push_str(&format!(
                "{:>8} {:>9.2} {:>7.2} {:>7.2} {:>8}\n",
                c.label.to_string(),
                c.precision,
                c.recall,
                c.f1,
                c.support
            ));
        }
        for (name, avg) in [("macro", &self.macro_avg), ("weighted", &self.weighted_avg)] {
            out.push_str(&format!(
                "{:>8} {:>9.2} {:>7.2} {:>7.2} {:>8}\n",
                name, avg.precision, avg.recall, avg.f1, self.samples
            ));
        }
        out.push_str(&format!("accuracy {:.4} over {} rows", self.accuracy, self.samples));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use RiskLabel::*;

    #[test]
    fn perfect_predictions() {
        let y = [Low, Medium, High, Low];
        let r = ClassificationReport::compute(&y, &y);
        assert_eq!(r.accuracy, 1.0);
        assert!(r.classes.iter().all(|c| c.f1 == 1.0));
        assert_eq!(r.confusion[0][0], 2);
    }

    #[test]
    fn mixed_predictions() {
        let actual = [Low, Low, Low, High, High, Medium];
        let pred = [Low, Low, High, High, Low, Low];
        let r = ClassificationReport::compute(&actual, &pred);
        assert!((r.accuracy - 0.5).abs() < 1e-12);

        let low = &r.classes[Low.index()];
        assert_eq!(low.support, 3);
        assert!((low.precision - 0.5).abs() < 1e-12); // 2 of 4 predicted Low
        assert!((low.recall - 2.0 / 3.0).abs() < 1e-12);

        let med = &r.classes[Medium.index()];
        assert_eq!(med.precision, 0.0);
        assert_eq!(med.f1, 0.0);
        assert_eq!(r.confusion[Medium.index()][Low.index()], 1);
    }

    #[test]
    fn macro_and_weighted_averages() {
        let actual = [Low, Low, Low, High, High, Medium];
        let pred = [Low, Low, High, High, Low, Low];
        let r = ClassificationReport::compute(&actual, &pred);

        // Per class (P, R): Low (1/2, 2/3), Medium (0, 0), High (1/2, 1/2).
        assert!((r.macro_avg.precision - 1.0 / 3.0).abs() < 1e-12);
        assert!((r.macro_avg.recall - 7.0 / 18.0).abs() < 1e-12);
        assert!((r.weighted_avg.precision - 5.0 / 12.0).abs() < 1e-12);
        // Support-weighted recall equals accuracy.
        assert!((r.weighted_avg.recall - r.accuracy).abs() < 1e-12);

        let low_f1 = 2.0 * 0.5 * (2.0 / 3.0) / (0.5 + 2.0 / 3.0);
        assert!((r.macro_avg.f1 - (low_f1 + 0.5) / 3.0).abs() < 1e-12);
        assert!((r.weighted_avg.f1 - (low_f1 * 3.0 + 0.5 * 2.0) / 6.0).abs() < 1e-12);

        let text = r.render();
        assert!(text.contains("   macro"));
        assert!(text.contains("weighted"));
    }

    #[test]
    fn render_mentions_every_class() {
        let r = ClassificationReport::compute(&[Low, High], &[Low, Low]);
        let text = r.render();
        for l in RiskLabel::ALL {
            assert!(text.contains(&l.to_string()));
        }
        assert!(text.contains("accuracy 0.5000"));
    }

    #[test]
    fn empty_input() {
        let r = ClassificationReport::compute(&[], &[]);
        assert_eq!(r.accuracy, 0.0);
        assert_eq!(r.samples, 0);
        assert_eq!(r.weighted_avg.f1, 0.0);
        assert_eq!(r.macro_avg.precision, 0.0);
    }
}
