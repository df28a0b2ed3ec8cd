//! Data Grouper Module
//! Group-by sums over categorical columns and long-format reshaping (stack operation).

use crate::data::schema::{self, ORDER_DATE};
use chrono::NaiveDate;
use polars::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum GroupError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("Grouping requires at least one key column")]
    NoKeyColumns,
    #[error("Grouping requires at least one value column")]
    NoValueColumns,
    #[error("Unknown value column '{0}'")]
    UnknownValueColumn(String),
}

/// Sums of one or more value columns per distinct key.
///
/// Keys are ordered ascending, like a sorted group-by.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupedSums {
    pub key_columns: Vec<String>,
    pub value_columns: Vec<String>,
    pub groups: BTreeMap<Vec<String>, Vec<f64>>,
}

impl GroupedSums {
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    fn value_index(&self, value_column: &str) -> Result<usize, GroupError> {
        self.value_columns
            .iter()
            .position(|c| c == value_column)
            .ok_or_else(|| GroupError::UnknownValueColumn(value_column.to_string()))
    }

    /// Sum of one value column for a key.
    pub fn get(&self, key: &[&str], value_column: &str) -> Option<f64> {
        let idx = self.value_index(value_column).ok()?;
        let key: Vec<String> = key.iter().map(|k| k.to_string()).collect();
        self.groups.get(&key).map(|values| values[idx])
    }

    /// Key with the highest sum. The first key in order wins a tie.
    pub fn top_group(&self, value_column: &str) -> Result<Option<(Vec<String>, f64)>, GroupError> {
        let idx = self.value_index(value_column)?;
        let mut best: Option<(&Vec<String>, f64)> = None;

        for (key, values) in &self.groups {
            let v = values[idx];
            if v.is_nan() {
                continue;
            }
            match best {
                Some((_, top)) if v <= top => {}
                _ => best = Some((key, v)),
            }
        }

        Ok(best.map(|(key, v)| (key.clone(), v)))
    }

    /// Labels and sums of one value column, in key order. Multi-column keys are
    /// joined with " / ".
    pub fn series(&self, value_column: &str) -> Result<(Vec<String>, Vec<f64>), GroupError> {
        let idx = self.value_index(value_column)?;
        Ok(self
            .groups
            .iter()
            .map(|(key, values)| (key.join(" / "), values[idx]))
            .unzip())
    }
}

/// Handles group-by aggregation and reshaping.
pub struct DataGrouper;

impl DataGrouper {
    /// Sum `value_cols` within each distinct combination of `key_cols`.
    ///
    /// Rows with a missing key are dropped; missing values count as zero.
    pub fn group_sum(
        df: &DataFrame,
        key_cols: &[&str],
        value_cols: &[&str],
    ) -> Result<GroupedSums, GroupError> {
        if key_cols.is_empty() {
            return Err(GroupError::NoKeyColumns);
        }
        if value_cols.is_empty() {
            return Err(GroupError::NoValueColumns);
        }

        let keys = key_cols
            .iter()
            .map(|c| schema::string_values(df, c))
            .collect::<PolarsResult<Vec<_>>>()?;
        let values = value_cols
            .iter()
            .map(|c| schema::f64_values(df, c))
            .collect::<PolarsResult<Vec<_>>>()?;

        let mut groups: BTreeMap<Vec<String>, Vec<f64>> = BTreeMap::new();

        'rows: for i in 0..df.height() {
            let mut key = Vec::with_capacity(keys.len());
            for key_col in &keys {
                match &key_col[i] {
                    Some(k) => key.push(k.clone()),
                    None => continue 'rows,
                }
            }

            let sums = groups
                .entry(key)
                .or_insert_with(|| vec![0.0; value_cols.len()]);
            for (sum, value_col) in sums.iter_mut().zip(values.iter()) {
                *sum += value_col[i].unwrap_or(0.0);
            }
        }

        debug!(keys = ?key_cols, groups = groups.len(), "grouped sums");

        Ok(GroupedSums {
            key_columns: key_cols.iter().map(|c| c.to_string()).collect(),
            value_columns: value_cols.iter().map(|c| c.to_string()).collect(),
            groups,
        })
    }

    /// Transform grouped sums to long format (stack operation).
    ///
    /// Output columns: [keys..., "Metric", "Amount"], metric-major like a melt.
    pub fn stack_to_long(grouped: &GroupedSums) -> Result<DataFrame, GroupError> {
        let mut key_data: Vec<Vec<String>> = vec![Vec::new(); grouped.key_columns.len()];
        let mut metrics: Vec<String> = Vec::new();
        let mut amounts: Vec<f64> = Vec::new();

        for (idx, metric) in grouped.value_columns.iter().enumerate() {
            for (key, values) in &grouped.groups {
                for (column, part) in key_data.iter_mut().zip(key.iter()) {
                    column.push(part.clone());
                }
                metrics.push(metric.clone());
                amounts.push(values[idx]);
            }
        }

        let mut columns: Vec<Column> = grouped
            .key_columns
            .iter()
            .zip(key_data)
            .map(|(name, data)| Column::new(name.as_str().into(), data))
            .collect();
        columns.push(Column::new("Metric".into(), metrics));
        columns.push(Column::new("Amount".into(), amounts));

        Ok(DataFrame::new(columns)?)
    }

    /// Sums of `value_col` per calendar month of the order date, keyed `YYYY-MM`.
    pub fn monthly_sum(df: &DataFrame, value_col: &str) -> Result<Vec<(String, f64)>, GroupError> {
        let by_day = Self::daily_sum(df, value_col)?;
        let mut months: BTreeMap<String, f64> = BTreeMap::new();
        for (date, sum) in by_day {
            *months.entry(date.format("%Y-%m").to_string()).or_insert(0.0) += sum;
        }
        Ok(months.into_iter().collect())
    }

    /// Sums of `value_col` per order date, ascending by date.
    pub fn daily_sum(df: &DataFrame, value_col: &str) -> Result<Vec<(NaiveDate, f64)>, GroupError> {
        let dates = schema::date_values(df, ORDER_DATE)?;
        let values = schema::f64_values(df, value_col)?;

        let mut days: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        for (date, value) in dates.into_iter().zip(values) {
            if let Some(date) = date {
                *days.entry(date).or_insert(0.0) += value.unwrap_or(0.0);
            }
        }
        Ok(days.into_iter().collect())
    }
}
