//! Outlier Detection Module
//! Flags rows outside the interquartile-range band of a numeric column.

use crate::data::schema;
use crate::stats::StatsCalculator;
use polars::prelude::*;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

/// Whisker multiplier applied to the IQR.
pub const IQR_FACTOR: f64 = 1.5;

/// Quartiles are undefined below this many values.
pub const MIN_VALUES: usize = 4;

#[derive(Error, Debug)]
pub enum OutlierError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("Column '{0}' not found")]
    ColumnNotFound(String),
    #[error("Column '{column}' is not numeric ({dtype})")]
    NotNumeric { column: String, dtype: String },
    #[error("Column '{column}' has {found} non-missing values, at least 4 are required")]
    InsufficientData { column: String, found: usize },
}

/// Quartiles and the band outside which a value is an outlier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OutlierBounds {
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
    pub lower: f64,
    pub upper: f64,
}

impl OutlierBounds {
    /// Bounds from values sorted ascending.
    pub fn from_sorted(sorted: &[f64]) -> Self {
        let q1 = StatsCalculator::percentile(sorted, 25.0);
        let q3 = StatsCalculator::percentile(sorted, 75.0);
        let iqr = q3 - q1;
        Self {
            q1,
            q3,
            iqr,
            lower: q1 - IQR_FACTOR * iqr,
            upper: q3 + IQR_FACTOR * iqr,
        }
    }

    /// Strictly below the lower bound or strictly above the upper bound.
    pub fn is_outlier(&self, value: f64) -> bool {
        value < self.lower || value > self.upper
    }
}

/// Rows flagged for one column.
#[derive(Debug, Clone)]
pub struct Outliers {
    pub column: String,
    pub bounds: OutlierBounds,
    /// Positions of the flagged rows in the input table.
    pub row_indices: Vec<usize>,
    /// The flagged rows, in input order.
    pub rows: DataFrame,
}

impl Outliers {
    pub fn len(&self) -> usize {
        self.row_indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.row_indices.is_empty()
    }
}

pub struct OutlierDetector;

impl OutlierDetector {
    /// Compute the IQR bounds of a column.
    pub fn bounds(df: &DataFrame, column: &str) -> Result<OutlierBounds, OutlierError> {
        let mut values = Self::column_values(df, column)?
            .into_iter()
            .flatten()
            .collect::<Vec<f64>>();

        if values.len() < MIN_VALUES {
            return Err(OutlierError::InsufficientData {
                column: column.to_string(),
                found: values.len(),
            });
        }

        values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        Ok(OutlierBounds::from_sorted(&values))
    }

    /// Rows whose value falls outside the IQR band. Missing values are never flagged.
    pub fn detect(df: &DataFrame, column: &str) -> Result<Outliers, OutlierError> {
        let bounds = Self::bounds(df, column)?;
        let values = Self::column_values(df, column)?;

        let mask: Vec<bool> = values
            .iter()
            .map(|v| v.map(|x| bounds.is_outlier(x)).unwrap_or(false))
            .collect();
        let row_indices: Vec<usize> = mask
            .iter()
            .enumerate()
            .filter_map(|(i, &flagged)| flagged.then_some(i))
            .collect();

        let rows = df.filter(&BooleanChunked::from_slice("outlier".into(), &mask))?;

        debug!(
            column,
            lower = bounds.lower,
            upper = bounds.upper,
            flagged = row_indices.len(),
            "outlier detection"
        );

        Ok(Outliers {
            column: column.to_string(),
            bounds,
            row_indices,
            rows,
        })
    }

    fn column_values(df: &DataFrame, column: &str) -> Result<Vec<Option<f64>>, OutlierError> {
        let col = df
            .column(column)
            .map_err(|_| OutlierError::ColumnNotFound(column.to_string()))?;
        if !schema::is_numeric(col.dtype()) {
            return Err(OutlierError::NotNumeric {
                column: column.to_string(),
                dtype: col.dtype().to_string(),
            });
        }
        Ok(schema::f64_values(df, column)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_single_extreme_value() {
        let df = df!(
            "Order ID" => ["a", "b", "c", "d", "e", "f"],
            "Sales" => [1.0, 2.0, 3.0, 4.0, 5.0, 100.0],
        )
        .unwrap();

        let outliers = OutlierDetector::detect(&df, "Sales").unwrap();
        assert_eq!(outliers.row_indices, vec![5]);
        assert_eq!(outliers.rows.height(), 1);
        assert_eq!(
            schema::present_f64_values(&outliers.rows, "Sales").unwrap(),
            vec![100.0]
        );
        assert!((outliers.bounds.q1 - 2.25).abs() < 1e-12);
        assert!((outliers.bounds.q3 - 4.75).abs() < 1e-12);
        assert!((outliers.bounds.upper - 8.5).abs() < 1e-12);
    }

    #[test]
    fn test_no_outliers_in_tight_column() {
        let df = df!("Sales" => [10.0, 11.0, 12.0, 13.0, 14.0]).unwrap();
        let outliers = OutlierDetector::detect(&df, "Sales").unwrap();
        assert!(outliers.is_empty());
        assert_eq!(outliers.rows.height(), 0);
    }

    #[test]
    fn test_low_outliers_keep_input_order() {
        let df = df!(
            "Gross Profit" => [-50.0, 10.0, 11.0, 12.0, 13.0, 11.0, 12.0, 10.0, -60.0, 12.0]
        )
        .unwrap();
        let outliers = OutlierDetector::detect(&df, "Gross Profit").unwrap();
        assert_eq!(outliers.row_indices, vec![0, 8]);
        assert_eq!(
            schema::present_f64_values(&outliers.rows, "Gross Profit").unwrap(),
            vec![-50.0, -60.0]
        );
    }

    #[test]
    fn test_value_on_bound_is_not_flagged() {
        // q1 = 2, q3 = 4, upper = 7
        let df = df!("Sales" => [1.0, 2.0, 3.0, 4.0, 7.0]).unwrap();
        let outliers = OutlierDetector::detect(&df, "Sales").unwrap();
        assert!((outliers.bounds.upper - 7.0).abs() < 1e-12);
        assert!(outliers.is_empty());
    }

    #[test]
    fn test_missing_values_ignored() {
        let df = df!("Sales" => [Some(1.0), None, Some(2.0), Some(3.0), Some(4.0), Some(5.0), Some(100.0)]).unwrap();
        let outliers = OutlierDetector::detect(&df, "Sales").unwrap();
        assert_eq!(outliers.row_indices, vec![6]);
    }

    #[test]
    fn test_too_few_values() {
        let df = df!("Sales" => [Some(1.0), Some(2.0), None, Some(3.0)]).unwrap();
        match OutlierDetector::detect(&df, "Sales") {
            Err(OutlierError::InsufficientData { found, .. }) => assert_eq!(found, 3),
            other => panic!("expected insufficient data, got {other:?}"),
        }
    }

    #[test]
    fn test_exactly_four_values_accepted() {
        let df = df!("Sales" => [1.0, 2.0, 3.0, 4.0]).unwrap();
        assert!(OutlierDetector::detect(&df, "Sales").is_ok());
    }

    #[test]
    fn test_unknown_column() {
        let df = df!("Sales" => [1.0, 2.0, 3.0, 4.0]).unwrap();
        assert!(matches!(
            OutlierDetector::detect(&df, "Profit"),
            Err(OutlierError::ColumnNotFound(c)) if c == "Profit"
        ));
    }

    #[test]
    fn test_text_column_rejected() {
        let df = df!("Region" => ["a", "b", "c", "d"]).unwrap();
        assert!(matches!(
            OutlierDetector::detect(&df, "Region"),
            Err(OutlierError::NotNumeric { .. })
        ));
    }
}
