//! Analysis Report
//! Console and JSON rendering of the analysis results.

use crate::data::schema::{GROSS_PROFIT, SALES};
use crate::data::CleaningReport;
use crate::pipeline::Analysis;
use crate::stats::{
    ColumnStats, Matrix, OrderTotals, OutlierBounds, Outliers, RevenueStats, TableInfo,
};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize)]
pub struct TopGroup {
    pub key: String,
    pub total: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutlierReport {
    pub column: String,
    /// `None` when the column had too few values for quartiles.
    pub bounds: Option<OutlierBounds>,
    pub count: usize,
    pub row_indices: Vec<usize>,
    pub preview: String,
}

impl From<&Outliers> for OutlierReport {
    fn from(outliers: &Outliers) -> Self {
        Self {
            column: outliers.column.clone(),
            bounds: Some(outliers.bounds),
            count: outliers.len(),
            row_indices: outliers.row_indices.clone(),
            preview: outliers.rows.to_string(),
        }
    }
}

impl OutlierReport {
    fn from_detection(column: &str, outliers: Option<&Outliers>) -> Self {
        match outliers {
            Some(outliers) => Self::from(outliers),
            None => Self {
                column: column.to_string(),
                bounds: None,
                count: 0,
                row_indices: Vec::new(),
                preview: String::new(),
            },
        }
    }
}

/// Everything printed at the end of a run.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub source: String,
    pub cleaning: CleaningReport,
    pub info: TableInfo,
    pub head: String,
    pub summary: Vec<ColumnStats>,
    pub correlation: Matrix,
    pub covariance: Matrix,
    pub revenue: RevenueStats,
    pub totals: OrderTotals,
    pub top_state: Option<TopGroup>,
    pub region_division: String,
    pub outliers: Vec<OutlierReport>,
    pub charts: Vec<PathBuf>,
}

impl AnalysisReport {
    pub fn from_analysis(source: &str, analysis: &Analysis, charts: Vec<PathBuf>) -> Self {
        Self {
            source: source.to_string(),
            cleaning: analysis.cleaning.clone(),
            info: analysis.info.clone(),
            head: analysis.head_preview(),
            summary: analysis.summary.clone(),
            correlation: analysis.correlation.clone(),
            covariance: analysis.covariance.clone(),
            revenue: analysis.revenue.clone(),
            totals: analysis.totals.clone(),
            top_state: analysis.top_state.clone().map(|(key, total)| TopGroup { key, total }),
            region_division: analysis.melted_preview(),
            outliers: vec![
                OutlierReport::from_detection(SALES, analysis.sales_outliers.as_ref()),
                OutlierReport::from_detection(GROSS_PROFIT, analysis.profit_outliers.as_ref()),
            ],
            charts,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

fn section(f: &mut fmt::Formatter<'_>, title: &str) -> fmt::Result {
    writeln!(f)?;
    writeln!(f, "==== {} ====", title)
}

impl fmt::Display for AnalysisReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Sales analysis of {}", self.source)?;

        section(f, "Missing values")?;
        for n in &self.cleaning.null_counts {
            writeln!(f, "{:<20} {:>8}", n.column, n.nulls)?;
        }
        if let Some(fill) = self.cleaning.sales_fill_value {
            writeln!(
                f,
                "filled {} sales with {:.4}, {} postal codes with placeholder",
                self.cleaning.sales_filled, fill, self.cleaning.postal_codes_filled
            )?;
        }
        writeln!(
            f,
            "removed {} duplicate rows ({} -> {})",
            self.cleaning.duplicates_removed, self.cleaning.rows_before, self.cleaning.rows_after
        )?;

        section(f, "Dataset info")?;
        writeln!(f, "{} rows, {} columns", self.info.rows, self.info.columns.len())?;
        for c in &self.info.columns {
            writeln!(f, "{:<20} {:>8} non-null  {}", c.column, c.non_null, c.dtype)?;
        }
        writeln!(f, "{}", self.head)?;

        section(f, "Summary stats")?;
        writeln!(
            f,
            "{:<16} {:>8} {:>12} {:>12} {:>12} {:>12} {:>12} {:>12} {:>12}",
            "", "count", "mean", "std", "min", "25%", "50%", "75%", "max"
        )?;
        for s in &self.summary {
            writeln!(
                f,
                "{:<16} {:>8} {:>12.4} {:>12.4} {:>12.4} {:>12.4} {:>12.4} {:>12.4} {:>12.4}",
                s.column, s.count, s.mean, s.std, s.min, s.p25, s.median, s.p75, s.max
            )?;
        }

        section(f, "Correlation Matrix")?;
        write!(f, "{}", self.correlation)?;
        section(f, "Covariance Matrix")?;
        write!(f, "{}", self.covariance)?;

        section(f, "Revenue")?;
        writeln!(f, "Total Revenue: {:.2}", self.revenue.total)?;
        writeln!(f, "Average Revenue per Order: {:.4}", self.revenue.mean)?;
        writeln!(f, "Standard Deviation of Sales: {:.4}", self.revenue.std_dev)?;

        section(f, "Orders")?;
        writeln!(f, "Total number of Orders: {}", self.totals.orders)?;
        writeln!(f, "Total Units sold: {}", self.totals.units)?;
        match &self.top_state {
            Some(top) => writeln!(
                f,
                "State with the highest Sales: {} ({:.2})",
                top.key, top.total
            )?,
            None => writeln!(f, "State with the highest Sales: n/a")?,
        }

        section(f, "Sales and Gross Profit by Regions and Divisions")?;
        writeln!(f, "{}", self.region_division)?;

        for o in &self.outliers {
            section(f, &format!("Outliers in {}", o.column))?;
            match &o.bounds {
                Some(b) => {
                    writeln!(
                        f,
                        "Q1 {:.4}  Q3 {:.4}  IQR {:.4}  bounds [{:.4}, {:.4}]  flagged {}",
                        b.q1, b.q3, b.iqr, b.lower, b.upper, o.count
                    )?;
                    writeln!(f, "{}", o.preview)?;
                }
                None => writeln!(f, "not enough values for quartiles")?,
            }
        }

        if !self.charts.is_empty() {
            section(f, "Charts")?;
            for path in &self.charts {
                writeln!(f, "{}", path.display())?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::tests::sample_table;

    #[test]
    fn test_text_report_has_every_section() {
        let analysis = Analysis::from_table(&sample_table()).unwrap();
        let report = AnalysisReport::from_analysis("sample.csv", &analysis, Vec::new());
        let text = report.to_string();

        for heading in [
            "Missing values",
            "Dataset info",
            "Summary stats",
            "Correlation Matrix",
            "Covariance Matrix",
            "Total Revenue:",
            "Total number of Orders: 9",
            "State with the highest Sales: Ohio",
            "Outliers in Sales",
            "Outliers in Gross Profit",
        ] {
            assert!(text.contains(heading), "missing '{heading}' in report");
        }
        assert!(!text.contains("==== Charts ===="));
    }

    #[test]
    fn test_json_report_round_trips_key_fields() {
        let analysis = Analysis::from_table(&sample_table()).unwrap();
        let report = AnalysisReport::from_analysis(
            "sample.csv",
            &analysis,
            vec![PathBuf::from("charts/01_sales_trend.png")],
        );

        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["totals"]["orders"], 9);
        assert_eq!(json["top_state"]["key"], "Ohio");
        assert_eq!(json["outliers"][0]["column"], "Sales");
        assert_eq!(json["outliers"][0]["count"], 2);
        assert_eq!(json["charts"][0], "charts/01_sales_trend.png");
    }
}
