//! Analysis Pipeline
//! Loader → Cleaner → {Summarizer, Grouper, OutlierDetector} → Renderer.

use crate::charts::{chart_plan, render_all, PlottersRenderer, RenderError};
use crate::config::AnalysisConfig;
use crate::data::schema::{
    self, COST, COUNTRY_REGION, DIVISION, GROSS_PROFIT, MEASURES, REGION, SALES, STATE_PROVINCE,
};
use crate::data::{
    CleanError, CleaningReport, DataCleaner, DataGrouper, GroupError, GroupedSums, LoaderError,
    SalesLoader,
};
use crate::report::AnalysisReport;
use crate::stats::{
    ColumnStats, Matrix, OrderTotals, OutlierDetector, OutlierError, Outliers, RevenueStats,
    StatsCalculator, StatsError, TableInfo,
};
use chrono::NaiveDate;
use polars::prelude::*;
use thiserror::Error;
use tracing::{info, info_span, warn};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Load(#[from] LoaderError),
    #[error(transparent)]
    Clean(#[from] CleanError),
    #[error(transparent)]
    Group(#[from] GroupError),
    #[error(transparent)]
    Stats(#[from] StatsError),
    #[error(transparent)]
    Outlier(#[from] OutlierError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
}

/// Rows shown in table previews.
const HEAD_ROWS: usize = 5;
const MELTED_ROWS: usize = 10;

/// Everything computed from one cleaned sales table.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub table: DataFrame,
    pub cleaning: CleaningReport,
    pub info: TableInfo,
    pub summary: Vec<ColumnStats>,
    pub correlation: Matrix,
    pub covariance: Matrix,
    pub revenue: RevenueStats,
    pub totals: OrderTotals,
    pub top_state: Option<(String, f64)>,
    pub region_division: GroupedSums,
    pub region_division_long: DataFrame,
    pub region_sales: GroupedSums,
    pub daily_sales: Vec<(NaiveDate, f64)>,
    pub monthly_sales: Vec<(String, f64)>,
    /// `None` when the column has too few values for quartiles.
    pub sales_outliers: Option<Outliers>,
    pub profit_outliers: Option<Outliers>,
    pub sales_cost_profit_correlation: Matrix,
    pub numeric_correlation: Matrix,
}

impl Analysis {
    /// Clean a raw table and run every summary over the result.
    pub fn from_table(raw: &DataFrame) -> Result<Self, PipelineError> {
        let (table, cleaning) = {
            let _span = info_span!("clean").entered();
            DataCleaner::clean(raw)?
        };

        let _span = info_span!("analyze", rows = table.height()).entered();

        let info = StatsCalculator::table_info(&table);
        let summary = StatsCalculator::describe(&table)?;
        let correlation = StatsCalculator::correlation_matrix(&table, &MEASURES)?;
        let covariance = StatsCalculator::covariance_matrix(&table, &MEASURES)?;
        let revenue = StatsCalculator::revenue_stats(&table)?;
        let totals = StatsCalculator::order_totals(&table)?;

        let states = DataGrouper::group_sum(&table, &[STATE_PROVINCE], &[SALES])?;
        let top_state = states
            .top_group(SALES)?
            .map(|(key, total)| (key.join(" / "), total));

        let region_division = DataGrouper::group_sum(
            &table,
            &[COUNTRY_REGION, DIVISION],
            &[SALES, GROSS_PROFIT],
        )?;
        let region_division_long = DataGrouper::stack_to_long(&region_division)?;
        let region_sales = DataGrouper::group_sum(&table, &[REGION], &[SALES])?;
        let daily_sales = DataGrouper::daily_sum(&table, SALES)?;
        let monthly_sales = DataGrouper::monthly_sum(&table, SALES)?;

        let sales_outliers = detect_outliers(&table, SALES)?;
        let profit_outliers = detect_outliers(&table, GROSS_PROFIT)?;

        let sales_cost_profit_correlation =
            StatsCalculator::correlation_matrix(&table, &[SALES, COST, GROSS_PROFIT])?;
        let numeric = schema::numeric_columns(&table);
        let numeric: Vec<&str> = numeric.iter().map(String::as_str).collect();
        let numeric_correlation = StatsCalculator::correlation_matrix(&table, &numeric)?;

        info!(
            sales_outliers = sales_outliers.as_ref().map_or(0, Outliers::len),
            profit_outliers = profit_outliers.as_ref().map_or(0, Outliers::len),
            months = monthly_sales.len(),
            "analysis complete"
        );

        Ok(Self {
            table,
            cleaning,
            info,
            summary,
            correlation,
            covariance,
            revenue,
            totals,
            top_state,
            region_division,
            region_division_long,
            region_sales,
            daily_sales,
            monthly_sales,
            sales_outliers,
            profit_outliers,
            sales_cost_profit_correlation,
            numeric_correlation,
        })
    }

    /// First rows of the cleaned table, formatted for display.
    pub fn head_preview(&self) -> String {
        self.table.head(Some(HEAD_ROWS)).to_string()
    }

    /// First rows of the long-format region/division table.
    pub fn melted_preview(&self) -> String {
        self.region_division_long.head(Some(MELTED_ROWS)).to_string()
    }
}

/// Outliers of one column. Too few values skips the column instead of failing the run.
fn detect_outliers(table: &DataFrame, column: &str) -> Result<Option<Outliers>, PipelineError> {
    match OutlierDetector::detect(table, column) {
        Ok(outliers) => Ok(Some(outliers)),
        Err(OutlierError::InsufficientData { column, found }) => {
            warn!(%column, found, "not enough values for outlier detection");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Run the whole analysis described by `config`.
pub fn run(config: &AnalysisConfig) -> Result<AnalysisReport, PipelineError> {
    let raw = {
        let _span = info_span!("load").entered();
        SalesLoader::new()
            .with_delimiter(config.delimiter)
            .load_csv(&config.input)?
    };

    let analysis = Analysis::from_table(&raw)?;

    let charts = if config.render_charts {
        let _span = info_span!("render").entered();
        let specs = chart_plan(&analysis)?;
        let renderer = PlottersRenderer::new(config.width, config.height);
        render_all(&renderer, &specs, &config.output_dir)?
    } else {
        info!("chart rendering disabled");
        Vec::new()
    };

    Ok(AnalysisReport::from_analysis(
        &config.input.display().to_string(),
        &analysis,
        charts,
    ))
}
