//! Feature selection and standardization

use ndarray::{Array1, Array2, Axis};
use tracing::{debug, warn};

use crate::data::CustomerRecord;
use crate::error::SegmentError;

/// Number of features per customer: lifetime orders and lifetime spend
pub const N_FEATURES: usize = 2;
pub const FEATURE_NAMES: [&str; N_FEATURES] = ["count_lifetime_orders", "lifetime_spend"];

/// Raw `(orders, spend)` matrix, one row per record, nulls as zero
pub fn raw_features(records: &[CustomerRecord]) -> Array2<f64> {
    let mut raw = Array2::zeros((records.len(), N_FEATURES));
    for (mut row, record) in raw.outer_iter_mut().zip(records) {
        row[0] = record.orders_or_zero();
        row[1] = record.spend_or_zero();
    }
    raw
}

/// Zero-mean, unit-variance scaler fitted on one run's customers.
///
/// Uses the population standard deviation. A feature whose standard
/// deviation is zero maps to 0 for every row.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    pub mean: Array1<f64>,
    pub std: Array1<f64>,
}

impl StandardScaler {
    pub fn fit(raw: &Array2<f64>) -> crate::Result<Self> {
        if raw.nrows() == 0 {
            return Err(SegmentError::Numeric(
                "cannot fit a scaler on zero rows".to_string(),
            ));
        }

        let mean = raw
            .mean_axis(Axis(0))
            .ok_or_else(|| SegmentError::Numeric("mean of empty axis".to_string()))?;
        let std = raw.std_axis(Axis(0), 0.0);

        for (j, name) in FEATURE_NAMES.iter().enumerate().take(raw.ncols()) {
            if !mean[j].is_finite() || !std[j].is_finite() {
                return Err(SegmentError::Numeric(format!(
                    "`{}` has non-finite mean ({}) or standard deviation ({})",
                    name, mean[j], std[j]
                )));
            }
            if std[j] == 0.0 {
                warn!(feature = name, "zero variance feature, standardized to 0");
            }
        }

        debug!(?mean, ?std, "scaler fitted");
        Ok(Self { mean, std })
    }

    /// Standardize a matrix with the fitted parameters
    pub fn transform(&self, raw: &Array2<f64>) -> crate::Result<Array2<f64>> {
        let mut scaled = raw.clone();
        for mut row in scaled.outer_iter_mut() {
            self.scale_in_place(row.iter_mut())?;
        }
        Ok(scaled)
    }

    /// Standardize a single `(orders, spend)` vector
    pub fn transform_row(&self, raw: &[f64; N_FEATURES]) -> crate::Result<Array1<f64>> {
        let mut row = Array1::from(raw.to_vec());
        self.scale_in_place(row.iter_mut())?;
        Ok(row)
    }

    fn scale_in_place<'a>(&self, values: impl Iterator<Item = &'a mut f64>) -> crate::Result<()> {
        for ((value, &mean), &std) in values.zip(self.mean.iter()).zip(self.std.iter()) {
            let scaled = if std == 0.0 { 0.0 } else { (*value - mean) / std };
            if !scaled.is_finite() {
                return Err(SegmentError::Numeric(format!(
                    "standardizing {} produced {}",
                    value, scaled
                )));
            }
            *value = scaled;
        }
        Ok(())
    }
}

/// Standardized feature matrix plus the scaler that produced it
#[derive(Debug, Clone)]
pub struct PreparedFeatures {
    pub features: Array2<f64>,
    pub scaler: StandardScaler,
}

/// Select, zero-fill and standardize the features of every record
pub fn prepare_features(records: &[CustomerRecord]) -> crate::Result<PreparedFeatures> {
    let raw = raw_features(records);
    let scaler = StandardScaler::fit(&raw)?;
    let features = scaler.transform(&raw)?;
    Ok(PreparedFeatures { features, scaler })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(values: &[(Option<i64>, Option<f64>)]) -> Vec<CustomerRecord> {
        values
            .iter()
            .enumerate()
            .map(|(i, &(o, s))| CustomerRecord::new(i.to_string(), o, s))
            .collect()
    }

    #[test]
    fn test_missing_values_become_zero() {
        let raw = raw_features(&records(&[(None, Some(5.0)), (Some(2), None)]));
        assert_eq!(raw, ndarray::array![[0.0, 5.0], [2.0, 0.0]]);
    }

    #[test]
    fn test_standardized_mean_zero_unit_variance() {
        let prepared =
            prepare_features(&records(&[(Some(1), Some(10.0)), (Some(2), Some(20.0)), (Some(6), Some(90.0))]))
                .unwrap();
        let mean = prepared.features.mean_axis(Axis(0)).unwrap();
        let std = prepared.features.std_axis(Axis(0), 0.0);

        for j in 0..N_FEATURES {
            assert!(mean[j].abs() < 1e-12);
            assert!((std[j] - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_zero_variance_feature_is_zero() {
        let prepared =
            prepare_features(&records(&[(Some(1), Some(50.0)), (Some(4), Some(50.0)), (Some(9), Some(50.0))]))
                .unwrap();
        assert_eq!(prepared.scaler.std[1], 0.0);
        assert!(prepared.features.column(1).iter().all(|&v| v == 0.0));
        assert!(prepared.features.column(0).iter().any(|&v| v != 0.0));
    }

    #[test]
    fn test_single_row_standardizes_to_origin() {
        let prepared = prepare_features(&records(&[(Some(3), Some(99.0))])).unwrap();
        assert_eq!(prepared.features, ndarray::array![[0.0, 0.0]]);
    }

    #[test]
    fn test_overflow_is_numeric_error() {
        let err = prepare_features(&records(&[(Some(1), Some(f64::MAX)), (Some(2), Some(f64::MAX))]))
            .unwrap_err();
        assert!(err.is_numeric());
    }

    #[test]
    fn test_nan_is_numeric_error() {
        let err = prepare_features(&records(&[(Some(1), Some(f64::NAN)), (Some(2), Some(3.0))]))
            .unwrap_err();
        assert!(err.is_numeric());
    }

    #[test]
    fn test_transform_row_uses_fitted_parameters() {
        let prepared = prepare_features(&records(&[(Some(0), Some(0.0)), (Some(2), Some(20.0))])).unwrap();
        let row = prepared.scaler.transform_row(&[1.0, 10.0]).unwrap();
        assert_eq!(row, ndarray::array![0.0, 0.0]);
    }
}
