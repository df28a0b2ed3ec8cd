//! Sales Table Schema
//! Column names of the sales dataset and typed column accessors.

use chrono::NaiveDate;
use polars::prelude::*;

pub const ORDER_ID: &str = "Order ID";
pub const ORDER_DATE: &str = "Order Date";
pub const SHIP_DATE: &str = "Ship Date";
pub const COUNTRY_REGION: &str = "Country/Region";
pub const STATE_PROVINCE: &str = "State/Province";
pub const POSTAL_CODE: &str = "Postal Code";
pub const DIVISION: &str = "Division";
pub const REGION: &str = "Region";
pub const SALES: &str = "Sales";
pub const UNITS: &str = "Units";
pub const COST: &str = "Cost";
pub const GROSS_PROFIT: &str = "Gross Profit";

/// Columns every input file must provide.
pub const REQUIRED_COLUMNS: [&str; 11] = [
    ORDER_DATE,
    SHIP_DATE,
    STATE_PROVINCE,
    COUNTRY_REGION,
    DIVISION,
    REGION,
    POSTAL_CODE,
    SALES,
    UNITS,
    COST,
    GROSS_PROFIT,
];

/// Date columns coerced by the cleaner.
pub const DATE_COLUMNS: [&str; 2] = [ORDER_DATE, SHIP_DATE];

/// Measures used for the correlation and covariance matrices.
pub const MEASURES: [&str; 4] = [SALES, UNITS, GROSS_PROFIT, COST];

/// Placeholder written into missing postal codes.
pub const UNKNOWN_POSTAL_CODE: &str = "Unknown";

/// Check whether a dtype is numeric.
pub fn is_numeric(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Float32
            | DataType::Float64
            | DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
    )
}

/// Names of the numeric columns, in table order.
pub fn numeric_columns(df: &DataFrame) -> Vec<String> {
    df.get_columns()
        .iter()
        .filter(|col| is_numeric(col.dtype()))
        .map(|col| col.name().to_string())
        .collect()
}

/// Column values as `f64`, keeping missing entries as `None`.
///
/// NaN is treated as missing, matching how the source data encodes blanks.
pub fn f64_values(df: &DataFrame, column: &str) -> PolarsResult<Vec<Option<f64>>> {
    let series = df.column(column)?.cast(&DataType::Float64)?;
    let ca = series.f64()?;
    Ok(ca
        .into_iter()
        .map(|v| v.filter(|x| !x.is_nan()))
        .collect())
}

/// Non-missing column values as `f64`, in row order.
pub fn present_f64_values(df: &DataFrame, column: &str) -> PolarsResult<Vec<f64>> {
    Ok(f64_values(df, column)?.into_iter().flatten().collect())
}

/// Column values rendered as text, keeping missing entries as `None`.
pub fn string_values(df: &DataFrame, column: &str) -> PolarsResult<Vec<Option<String>>> {
    let series = df.column(column)?.cast(&DataType::String)?;
    let ca = series.str()?;
    Ok(ca.into_iter().map(|v| v.map(str::to_string)).collect())
}

/// Values of a `Date` column as calendar dates.
pub fn date_values(df: &DataFrame, column: &str) -> PolarsResult<Vec<Option<NaiveDate>>> {
    let col = df.column(column)?;
    if col.dtype() != &DataType::Date {
        return Err(PolarsError::SchemaMismatch(
            format!("column '{}' has dtype {}, expected date", column, col.dtype()).into(),
        ));
    }
    let days = col.cast(&DataType::Int32)?;
    let ca = days.i32()?;
    Ok(ca.into_iter().map(|d| d.and_then(date_from_epoch_days)).collect())
}

const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Convert days since 1970-01-01 into a calendar date.
pub fn date_from_epoch_days(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(days.checked_add(UNIX_EPOCH_DAYS_FROM_CE)?)
}

/// Convert a calendar date into days since 1970-01-01 (polars' `Date` physical type).
pub fn epoch_days(date: NaiveDate) -> i32 {
    use chrono::Datelike;
    date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}
