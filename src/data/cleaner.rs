//! Data Cleaner Module
//! Date coercion, missing-value substitution and duplicate removal.

use crate::data::schema::{
    self, DATE_COLUMNS, POSTAL_CODE, SALES, UNKNOWN_POSTAL_CODE,
};
use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::*;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum CleanError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("Cannot parse '{value}' in column '{column}' (row {row}) as a date")]
    DateParse {
        column: String,
        row: usize,
        value: String,
    },
}

const DATE_FORMATS: [&str; 5] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%m-%d-%Y", "%d.%m.%Y"];

const DATETIME_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%Y-%m-%d %H:%M",
];

/// Missing-value count of one column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NullCount {
    pub column: String,
    pub nulls: usize,
}

/// What the cleaning pass did to the table.
#[derive(Debug, Clone, Serialize)]
pub struct CleaningReport {
    pub null_counts: Vec<NullCount>,
    pub rows_before: usize,
    pub rows_after: usize,
    pub duplicates_removed: usize,
    pub postal_codes_filled: usize,
    pub sales_filled: usize,
    pub sales_fill_value: Option<f64>,
}

/// Handles data cleaning. Every operation returns a new DataFrame.
pub struct DataCleaner;

impl DataCleaner {
    /// Run the full cleaning pass: dates, missing values, duplicates.
    pub fn clean(df: &DataFrame) -> Result<(DataFrame, CleaningReport), CleanError> {
        let rows_before = df.height();
        let null_counts = Self::null_counts(df);

        let dated = Self::coerce_dates(df, &DATE_COLUMNS)?;

        let postal_codes_filled = dated.column(POSTAL_CODE)?.null_count();
        let sales_filled = schema::f64_values(&dated, SALES)?
            .iter()
            .filter(|v| v.is_none())
            .count();
        let sales_fill_value = Self::mean_fill_value(&dated, SALES)?;
        let filled = Self::fill_missing(&dated)?;

        let deduped = Self::drop_duplicates(&filled)?;
        let rows_after = deduped.height();

        info!(
            rows_before,
            rows_after,
            duplicates = rows_before - rows_after,
            "cleaned sales table"
        );

        let report = CleaningReport {
            null_counts,
            rows_before,
            rows_after,
            duplicates_removed: rows_before - rows_after,
            postal_codes_filled,
            sales_filled,
            sales_fill_value,
        };
        Ok((deduped, report))
    }

    /// Count missing values per column, in table order.
    pub fn null_counts(df: &DataFrame) -> Vec<NullCount> {
        df.get_columns()
            .iter()
            .map(|col| {
                let nan_count = col
                    .f64()
                    .map(|ca| ca.into_iter().flatten().filter(|v| v.is_nan()).count())
                    .unwrap_or(0);
                NullCount {
                    column: col.name().to_string(),
                    nulls: col.null_count() + nan_count,
                }
            })
            .collect()
    }

    /// Parse one textual date. Time-of-day parts are dropped.
    pub fn parse_date(raw: &str) -> Option<NaiveDate> {
        let s = raw.trim().trim_matches('"');
        DATE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
            .or_else(|| {
                DATETIME_FORMATS
                    .iter()
                    .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                    .map(|dt| dt.date())
            })
    }

    /// Convert the given columns to polars `Date`.
    pub fn coerce_dates(df: &DataFrame, columns: &[&str]) -> Result<DataFrame, CleanError> {
        let mut out = df.clone();

        for &column in columns {
            let col = df.column(column)?;
            let converted = match col.dtype() {
                DataType::Date => continue,
                DataType::Datetime(_, _) => col.cast(&DataType::Date)?,
                _ => {
                    let text = col.cast(&DataType::String)?;
                    let ca = text.str()?;
                    let mut days: Vec<Option<i32>> = Vec::with_capacity(ca.len());

                    for (row, value) in ca.into_iter().enumerate() {
                        match value {
                            None => days.push(None),
                            Some(v) if v.trim().is_empty() => days.push(None),
                            Some(v) => {
                                let date = Self::parse_date(v).ok_or_else(|| CleanError::DateParse {
                                    column: column.to_string(),
                                    row,
                                    value: v.to_string(),
                                })?;
                                days.push(Some(schema::epoch_days(date)));
                            }
                        }
                    }

                    Column::new(column.into(), days).cast(&DataType::Date)?
                }
            };

            debug!(column, "coerced to date");
            out.with_column(converted)?;
        }

        Ok(out)
    }

    /// Mean of the non-missing values of a column, if any exist.
    pub fn mean_fill_value(df: &DataFrame, column: &str) -> Result<Option<f64>, CleanError> {
        let present = schema::present_f64_values(df, column)?;
        if present.is_empty() {
            return Ok(None);
        }
        Ok(Some(present.iter().sum::<f64>() / present.len() as f64))
    }

    /// Fill missing postal codes with a placeholder and missing sales with the
    /// mean of the sales present before substitution.
    pub fn fill_missing(df: &DataFrame) -> Result<DataFrame, CleanError> {
        let mut out = df.clone();

        let postal: Vec<String> = schema::string_values(df, POSTAL_CODE)?
            .into_iter()
            .map(|v| v.unwrap_or_else(|| UNKNOWN_POSTAL_CODE.to_string()))
            .collect();
        out.with_column(Column::new(POSTAL_CODE.into(), postal))?;

        match Self::mean_fill_value(df, SALES)? {
            Some(mean) => {
                let sales: Vec<f64> = schema::f64_values(df, SALES)?
                    .into_iter()
                    .map(|v| v.unwrap_or(mean))
                    .collect();
                debug!(fill = mean, "filled missing sales with mean");
                out.with_column(Column::new(SALES.into(), sales))?;
            }
            None => warn!("sales column has no values; leaving it unfilled"),
        }

        Ok(out)
    }

    /// Drop rows identical to an earlier row across all columns, keeping the first.
    pub fn drop_duplicates(df: &DataFrame) -> Result<DataFrame, CleanError> {
        let out = df.unique_stable(None, UniqueKeepStrategy::First, None)?;

        let removed = df.height() - out.height();
        if removed > 0 {
            debug!(removed, "dropped duplicate rows");
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::schema::{ORDER_DATE, SHIP_DATE};

    fn sample() -> DataFrame {
        df!(
            "Order Date" => ["2021-01-03", "2021-01-04", "2021-01-04"],
            "Ship Date" => ["2021-03-10", "2021-03-11", "2021-03-11"],
            "Postal Code" => [Some(79109i64), None, None],
            "Sales" => [Some(10.0), None, None],
            "Units" => [2i64, 1, 1],
        )
        .unwrap()
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2021, 1, 3);
        assert_eq!(DataCleaner::parse_date("2021-01-03"), expected);
        assert_eq!(DataCleaner::parse_date("2021/01/03"), expected);
        assert_eq!(DataCleaner::parse_date("01/03/2021"), expected);
        assert_eq!(DataCleaner::parse_date("2021-01-03 14:22:01"), expected);
        assert_eq!(DataCleaner::parse_date("2021-01-03T14:22:01"), expected);
        assert_eq!(DataCleaner::parse_date("not a date"), None);
        assert_eq!(DataCleaner::parse_date("2021-02-30"), None);
    }

    #[test]
    fn test_coerce_dates_produces_date_columns() {
        let out = DataCleaner::coerce_dates(&sample(), &DATE_COLUMNS).unwrap();
        assert_eq!(out.column(ORDER_DATE).unwrap().dtype(), &DataType::Date);
        assert_eq!(out.column(SHIP_DATE).unwrap().dtype(), &DataType::Date);

        let dates = schema::date_values(&out, ORDER_DATE).unwrap();
        assert_eq!(dates[0], NaiveDate::from_ymd_opt(2021, 1, 3));
    }

    #[test]
    fn test_coerce_dates_keeps_nulls() {
        let df = df!("Order Date" => [Some("2021-01-03"), None]).unwrap();
        let out = DataCleaner::coerce_dates(&df, &[ORDER_DATE]).unwrap();
        assert_eq!(out.column(ORDER_DATE).unwrap().null_count(), 1);
    }

    #[test]
    fn test_coerce_dates_rejects_garbage() {
        let df = df!("Order Date" => ["2021-01-03", "yesterday"]).unwrap();
        match DataCleaner::coerce_dates(&df, &[ORDER_DATE]) {
            Err(CleanError::DateParse { column, row, value }) => {
                assert_eq!(column, ORDER_DATE);
                assert_eq!(row, 1);
                assert_eq!(value, "yesterday");
            }
            other => panic!("expected a date parse failure, got {other:?}"),
        }
    }

    #[test]
    fn test_fill_missing_sales_uses_mean_before_substitution() {
        let df = df!(
            "Postal Code" => [Some("1"), None, Some("3")],
            "Sales" => [Some(10.0), None, Some(20.0)],
        )
        .unwrap();

        let out = DataCleaner::fill_missing(&df).unwrap();
        let sales = schema::f64_values(&out, SALES).unwrap();
        assert_eq!(sales, vec![Some(10.0), Some(15.0), Some(20.0)]);

        let postal = schema::string_values(&out, POSTAL_CODE).unwrap();
        assert_eq!(postal[1].as_deref(), Some(UNKNOWN_POSTAL_CODE));
        assert_eq!(out.column(POSTAL_CODE).unwrap().null_count(), 0);
    }

    #[test]
    fn test_fill_missing_all_null_sales_left_alone() {
        let df = df!(
            "Postal Code" => ["1", "2"],
            "Sales" => [None::<f64>, None],
        )
        .unwrap();
        let out = DataCleaner::fill_missing(&df).unwrap();
        assert_eq!(out.column(SALES).unwrap().null_count(), 2);
    }

    #[test]
    fn test_drop_duplicates_removes_exact_copy() {
        let df = df!(
            "State/Province" => ["A", "B", "A"],
            "Sales" => [10.0, 7.0, 10.0],
        )
        .unwrap();

        let out = DataCleaner::drop_duplicates(&df).unwrap();
        assert_eq!(out.height(), df.height() - 1);

        let states = schema::string_values(&out, "State/Province").unwrap();
        assert_eq!(states, vec![Some("A".to_string()), Some("B".to_string())]);
    }

    #[test]
    fn test_drop_duplicates_is_idempotent() {
        let df = df!(
            "State/Province" => ["A", "A", "B", "A"],
            "Sales" => [10.0, 10.0, 7.0, 5.0],
        )
        .unwrap();

        let once = DataCleaner::drop_duplicates(&df).unwrap();
        let twice = DataCleaner::drop_duplicates(&once).unwrap();
        assert_eq!(once.height(), 3);
        assert!(once.equals_missing(&twice));
    }

    #[test]
    fn test_drop_duplicates_partial_match_kept() {
        let df = df!(
            "State/Province" => ["A", "A"],
            "Sales" => [10.0, 11.0],
        )
        .unwrap();
        assert_eq!(DataCleaner::drop_duplicates(&df).unwrap().height(), 2);
    }

    #[test]
    fn test_drop_duplicates_signed_zero_is_equal() {
        let df = df!(
            "State/Province" => ["A", "A"],
            "Gross Profit" => [0.0, -0.0],
        )
        .unwrap();
        assert_eq!(DataCleaner::drop_duplicates(&df).unwrap().height(), 1);
    }

    #[test]
    fn test_coerce_dates_truncates_datetime() {
        // 2021-01-03 14:00 and 2021-01-04 00:00 UTC
        let stamps = Column::new(
            ORDER_DATE.into(),
            vec![Some(1_609_682_400_000i64), None, Some(1_609_718_400_000)],
        )
        .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
        .unwrap();
        let df = DataFrame::new(vec![stamps]).unwrap();

        let out = DataCleaner::coerce_dates(&df, &[ORDER_DATE]).unwrap();
        assert_eq!(out.column(ORDER_DATE).unwrap().dtype(), &DataType::Date);
        assert_eq!(
            schema::date_values(&out, ORDER_DATE).unwrap(),
            vec![
                NaiveDate::from_ymd_opt(2021, 1, 3),
                None,
                NaiveDate::from_ymd_opt(2021, 1, 4),
            ]
        );
    }

    #[test]
    fn test_clean_runs_all_steps() {
        let (out, report) = DataCleaner::clean(&sample()).unwrap();

        // rows 2 and 3 are exact copies
        assert_eq!(report.rows_before, 3);
        assert_eq!(report.rows_after, 2);
        assert_eq!(report.duplicates_removed, 1);
        assert_eq!(report.sales_fill_value, Some(10.0));
        assert_eq!(report.sales_filled, 2);
        assert_eq!(report.postal_codes_filled, 2);
        assert_eq!(out.column(SALES).unwrap().null_count(), 0);

        let postal_nulls = report
            .null_counts
            .iter()
            .find(|n| n.column == POSTAL_CODE)
            .map(|n| n.nulls);
        assert_eq!(postal_nulls, Some(2));
    }
}
