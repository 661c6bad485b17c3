// =============================================================================
// Standard scaler — per-feature z-score
// =============================================================================
//
//   mean_j  = mean of column j
//   scale_j = population std of column j, or 1.0 when the column is constant
//   z_ij    = (x_ij - mean_j) / scale_j
//
// Dimensions are checked on every transform: a matrix with a different
// column count than the scaler was fitted on is an error, never silently
// truncated or padded.
// =============================================================================

use serde::{Deserialize, Serialize};

use super::{schema_fingerprint, ScalerError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
    pub feature_names: Vec<String>,
    pub fingerprint: String,
}

impl StandardScaler {
    /// Fit on a row-major matrix whose columns are `feature_names`.
    pub fn fit(rows: &[Vec<f64>], feature_names: &[String]) -> Result<Self, ScalerError> {
        let n_features = feature_names.len();
        if rows.is_empty() || n_features == 0 {
            return Err(ScalerError::Empty);
        }
        if let Some(bad) = rows.iter().find(|r| r.len() != n_features) {
            return Err(ScalerError::DimensionMismatch {
                expected: n_features,
                got: bad.len(),
            });
        }

        let n = rows.len() as f64;
        let mut mean = vec![0.0; n_features];
        for row in rows {
            for (m, x) in mean.iter_mut().zip(row) {
                *m += x;
            }
        }
        mean.iter_mut().for_each(|m| *m /= n);

        let mut var = vec![0.0; n_features];
        for row in rows {
            for ((v, x), m) in var.iter_mut().zip(row).zip(&mean) {
                *v += (x - m).powi(2);
            }
        }
        let scale = var
            .into_iter()
            .map(|v| {
                let std = (v / n).sqrt();
                if std > 0.0 && std.is_finite() {
                    std
                } else {
                    1.0
                }
            })
            .collect();

        Ok(Self {
            mean,
            scale,
            feature_names: feature_names.to_vec(),
            fingerprint: schema_fingerprint(feature_names),
        })
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    pub fn transform_row(&self, row: &[f64]) -> Result<Vec<f64>, ScalerError> {
        if self.mean.is_empty() {
            return Err(ScalerError::NotFitted);
        }
        if row.len() != self.n_features() {
            return Err(ScalerError::DimensionMismatch {
                expected: self.n_features(),
                got: row.len(),
            });
        }
        Ok(row
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(x, (m, s))| (x - m) / s)
            .collect())
    }

    pub fn transform(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, ScalerError> {
        rows.iter().map(|r| self.transform_row(r)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("f{i}")).collect()
    }

    #[test]
    fn transformed_columns_are_standardised() {
        let rows = vec![vec![1.0, 10.0], vec![2.0, 20.0], vec![3.0, 30.0], vec![4.0, 40.0]];
        let scaler = StandardScaler::fit(&rows, &names(2)).unwrap();
        let z = scaler.transform(&rows).unwrap();
        for j in 0..2 {
            let col: Vec<f64> = z.iter().map(|r| r[j]).collect();
            let mean = col.iter().sum::<f64>() / 4.0;
            let var = col.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / 4.0;
            assert!(mean.abs() < 1e-12);
            assert!((var - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn constant_column_gets_unit_scale() {
        let rows = vec![vec![5.0, 1.0], vec![5.0, 2.0]];
        let scaler = StandardScaler::fit(&rows, &names(2)).unwrap();
        assert_eq!(scaler.scale[0], 1.0);
        assert_eq!(scaler.transform_row(&[5.0, 1.5]).unwrap()[0], 0.0);
    }

    #[test]
    fn column_count_is_checked() {
        let rows = vec![vec![1.0, 2.0, 3.0], vec![2.0, 3.0, 4.0]];
        let scaler = StandardScaler::fit(&rows, &names(3)).unwrap();
        assert_eq!(
            scaler.transform(&[vec![1.0, 2.0]]).unwrap_err(),
            ScalerError::DimensionMismatch { expected: 3, got: 2 }
        );
        assert_eq!(
            StandardScaler::fit(&rows, &names(2)).unwrap_err(),
            ScalerError::DimensionMismatch { expected: 2, got: 3 }
        );
    }

    #[test]
    fn empty_input_is_rejected() {
        assert_eq!(StandardScaler::fit(&[], &names(2)).unwrap_err(), ScalerError::Empty);
    }

    #[test]
    fn unfitted_scaler_refuses_to_transform() {
        let scaler = StandardScaler {
            mean: Vec::new(),
            scale: Vec::new(),
            feature_names: Vec::new(),
            fingerprint: String::new(),
        };
        assert_eq!(scaler.transform_row(&[1.0]).unwrap_err(), ScalerError::NotFitted);
    }
}
