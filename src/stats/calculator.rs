//! Statistics Calculator Module
//! Handles descriptive statistics, revenue figures, correlation and covariance.

use crate::data::schema::{self, SALES, UNITS};
use polars::prelude::*;
use serde::Serialize;
use statrs::statistics::Statistics;
use std::fmt;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum StatsError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("Matrix requires at least one column")]
    NoColumns,
}

/// Descriptive statistics for a single numeric column.
#[derive(Debug, Clone, Serialize)]
pub struct ColumnStats {
    pub column: String,
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub p25: f64,
    pub median: f64,
    pub p75: f64,
    pub max: f64,
}

impl Default for ColumnStats {
    fn default() -> Self {
        Self {
            column: String::new(),
            count: 0,
            mean: f64::NAN,
            std: f64::NAN,
            min: f64::NAN,
            p25: f64::NAN,
            median: f64::NAN,
            p75: f64::NAN,
            max: f64::NAN,
        }
    }
}

/// Revenue figures over the sales column.
#[derive(Debug, Clone, Serialize)]
pub struct RevenueStats {
    pub total: f64,
    pub mean: f64,
    /// Population standard deviation (ddof = 0).
    pub std_dev: f64,
}

/// Order and unit totals.
#[derive(Debug, Clone, Serialize)]
pub struct OrderTotals {
    pub orders: usize,
    pub units: f64,
}

/// One column of the table overview.
#[derive(Debug, Clone, Serialize)]
pub struct ColumnInfo {
    pub column: String,
    pub dtype: String,
    pub non_null: usize,
}

/// Shape and column types of a table.
#[derive(Debug, Clone, Serialize)]
pub struct TableInfo {
    pub rows: usize,
    pub columns: Vec<ColumnInfo>,
}

/// Square matrix labelled by column names.
#[derive(Debug, Clone, Serialize)]
pub struct Matrix {
    pub columns: Vec<String>,
    pub values: Vec<Vec<f64>>,
}

impl Matrix {
    pub fn get(&self, row: &str, col: &str) -> Option<f64> {
        let r = self.columns.iter().position(|c| c == row)?;
        let c = self.columns.iter().position(|c| c == col)?;
        Some(self.values[r][c])
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .columns
            .iter()
            .map(|c| c.len())
            .max()
            .unwrap_or(0)
            .max(12);

        write!(f, "{:width$}", "")?;
        for c in &self.columns {
            write!(f, " {:>width$}", c)?;
        }
        writeln!(f)?;

        for (name, row) in self.columns.iter().zip(&self.values) {
            write!(f, "{:<width$}", name)?;
            for v in row {
                write!(f, " {:>width$.6}", v)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Handles statistical calculations.
pub struct StatsCalculator;

impl StatsCalculator {
    /// Compute descriptive statistics for an array of values.
    pub fn compute_descriptive_stats(values: &[f64]) -> ColumnStats {
        let n = values.len();
        if n == 0 {
            return ColumnStats::default();
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        ColumnStats {
            column: String::new(),
            count: n,
            mean: values.iter().mean(),
            // sample standard deviation, NaN for a single value
            std: values.iter().std_dev(),
            min: sorted[0],
            p25: Self::percentile(&sorted, 25.0),
            median: Self::percentile(&sorted, 50.0),
            p75: Self::percentile(&sorted, 75.0),
            max: sorted[n - 1],
        }
    }

    /// Calculate percentile using linear interpolation (NumPy compatible).
    pub fn percentile(sorted_values: &[f64], p: f64) -> f64 {
        let n = sorted_values.len();
        if n == 0 {
            return f64::NAN;
        }
        if n == 1 {
            return sorted_values[0];
        }

        let rank = (p / 100.0) * (n - 1) as f64;
        let lower = rank.floor() as usize;
        let upper = (rank.ceil() as usize).min(n - 1);
        let frac = rank - lower as f64;

        if lower == upper {
            sorted_values[lower]
        } else {
            sorted_values[lower] * (1.0 - frac) + sorted_values[upper] * frac
        }
    }

    /// Describe every numeric column of the table.
    pub fn describe(df: &DataFrame) -> Result<Vec<ColumnStats>, StatsError> {
        schema::numeric_columns(df)
            .into_iter()
            .map(|column| -> Result<ColumnStats, StatsError> {
                let values = schema::present_f64_values(df, &column)?;
                let mut stats = Self::compute_descriptive_stats(&values);
                stats.column = column;
                Ok(stats)
            })
            .collect()
    }

    /// Shape, dtypes and non-null counts of the table.
    pub fn table_info(df: &DataFrame) -> TableInfo {
        TableInfo {
            rows: df.height(),
            columns: df
                .get_columns()
                .iter()
                .map(|col| ColumnInfo {
                    column: col.name().to_string(),
                    dtype: col.dtype().to_string(),
                    non_null: col.len() - col.null_count(),
                })
                .collect(),
        }
    }

    /// Total, mean and population standard deviation of the sales column.
    pub fn revenue_stats(df: &DataFrame) -> Result<RevenueStats, StatsError> {
        let sales = schema::present_f64_values(df, SALES)?;
        Ok(RevenueStats {
            total: sales.iter().sum(),
            mean: sales.iter().mean(),
            std_dev: sales.iter().population_std_dev(),
        })
    }

    /// Number of orders (rows) and units sold.
    pub fn order_totals(df: &DataFrame) -> Result<OrderTotals, StatsError> {
        let units = schema::present_f64_values(df, UNITS)?;
        Ok(OrderTotals {
            orders: df.height(),
            units: units.iter().sum(),
        })
    }

    /// Pairwise sample covariance (ddof = 1).
    pub fn covariance_matrix(df: &DataFrame, columns: &[&str]) -> Result<Matrix, StatsError> {
        Self::pairwise(df, columns, Self::covariance)
    }

    /// Pairwise Pearson correlation.
    pub fn correlation_matrix(df: &DataFrame, columns: &[&str]) -> Result<Matrix, StatsError> {
        Self::pairwise(df, columns, Self::pearson)
    }

    /// Sample covariance of two equally long series.
    pub fn covariance(x: &[f64], y: &[f64]) -> f64 {
        if x.len() < 2 || x.len() != y.len() {
            return f64::NAN;
        }
        x.iter().covariance(y.iter())
    }

    /// Pearson correlation of two equally long series; NaN when either is constant.
    pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
        let sx = x.iter().std_dev();
        let sy = y.iter().std_dev();
        if sx == 0.0 || sy == 0.0 {
            return f64::NAN;
        }
        Self::covariance(x, y) / (sx * sy)
    }

    fn pairwise(
        df: &DataFrame,
        columns: &[&str],
        f: fn(&[f64], &[f64]) -> f64,
    ) -> Result<Matrix, StatsError> {
        if columns.is_empty() {
            return Err(StatsError::NoColumns);
        }

        let data = columns
            .iter()
            .map(|c| schema::f64_values(df, c))
            .collect::<PolarsResult<Vec<_>>>()?;

        let n = columns.len();
        let mut values = vec![vec![f64::NAN; n]; n];
        for i in 0..n {
            for j in i..n {
                // pairwise-complete observations
                let (x, y): (Vec<f64>, Vec<f64>) = data[i]
                    .iter()
                    .zip(&data[j])
                    .filter_map(|(a, b)| Some(((*a)?, (*b)?)))
                    .unzip();
                let v = f(&x, &y);
                values[i][j] = v;
                values[j][i] = v;
            }
        }

        debug!(columns = ?columns, "computed pairwise matrix");
        Ok(Matrix {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            values,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_percentile_matches_numpy_linear() {
        let sorted = [1.0, 2.0, 3.0, 4.0, 5.0, 100.0];
        assert!(close(StatsCalculator::percentile(&sorted, 25.0), 2.25));
        assert!(close(StatsCalculator::percentile(&sorted, 75.0), 4.75));
        assert!(close(StatsCalculator::percentile(&sorted, 50.0), 3.5));
        assert!(StatsCalculator::percentile(&[], 50.0).is_nan());
    }

    #[test]
    fn test_descriptive_stats() {
        let stats = StatsCalculator::compute_descriptive_stats(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_eq!(stats.count, 8);
        assert!(close(stats.mean, 5.0));
        assert!(close(stats.std, (32.0f64 / 7.0).sqrt()));
        assert!(close(stats.min, 2.0));
        assert!(close(stats.max, 9.0));
        assert!(close(stats.median, 4.5));
    }

    #[test]
    fn test_revenue_stats_population_std() {
        let df = df!("Sales" => [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        let revenue = StatsCalculator::revenue_stats(&df).unwrap();
        assert!(close(revenue.total, 40.0));
        assert!(close(revenue.mean, 5.0));
        assert!(close(revenue.std_dev, 2.0));
    }

    #[test]
    fn test_order_totals() {
        let df = df!("Units" => [1i64, 2, 3], "Sales" => [1.0, 1.0, 1.0]).unwrap();
        let totals = StatsCalculator::order_totals(&df).unwrap();
        assert_eq!(totals.orders, 3);
        assert!(close(totals.units, 6.0));
    }

    #[test]
    fn test_correlation_and_covariance() {
        let df = df!(
            "Sales" => [1.0, 2.0, 3.0, 4.0],
            "Cost" => [2.0, 4.0, 6.0, 8.0],
            "Units" => [4.0, 3.0, 2.0, 1.0],
        )
        .unwrap();
        let cols = ["Sales", "Cost", "Units"];

        let corr = StatsCalculator::correlation_matrix(&df, &cols).unwrap();
        assert!(close(corr.get("Sales", "Cost").unwrap(), 1.0));
        assert!(close(corr.get("Sales", "Units").unwrap(), -1.0));
        assert!(close(corr.get("Units", "Units").unwrap(), 1.0));

        let cov = StatsCalculator::covariance_matrix(&df, &cols).unwrap();
        // var(Sales) with ddof = 1
        assert!(close(cov.get("Sales", "Sales").unwrap(), 5.0 / 3.0));
        assert!(close(cov.get("Sales", "Cost").unwrap(), 10.0 / 3.0));
    }

    #[test]
    fn test_correlation_constant_column_is_nan() {
        let df = df!("Sales" => [1.0, 2.0, 3.0], "Cost" => [1.0, 1.0, 1.0]).unwrap();
        let corr = StatsCalculator::correlation_matrix(&df, &["Sales", "Cost"]).unwrap();
        assert!(corr.get("Sales", "Cost").unwrap().is_nan());
    }

    #[test]
    fn test_describe_only_numeric_columns() {
        let df = df!(
            "Region" => ["a", "b"],
            "Sales" => [1.0, 3.0],
        )
        .unwrap();
        let described = StatsCalculator::describe(&df).unwrap();
        assert_eq!(described.len(), 1);
        assert_eq!(described[0].column, "Sales");
        assert!(close(described[0].mean, 2.0));
    }

    #[test]
    fn test_matrix_requires_columns() {
        let df = df!("Sales" => [1.0]).unwrap();
        assert!(matches!(
            StatsCalculator::correlation_matrix(&df, &[]),
            Err(StatsError::NoColumns)
        ));
    }
}
