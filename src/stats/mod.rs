//! Statistics module - Descriptive statistics and outlier detection

mod calculator;
mod outliers;

pub use calculator::{
    ColumnInfo, ColumnStats, Matrix, OrderTotals, RevenueStats, StatsCalculator, StatsError,
    TableInfo,
};
pub use outliers::{OutlierBounds, OutlierDetector, OutlierError, Outliers, IQR_FACTOR, MIN_VALUES};
