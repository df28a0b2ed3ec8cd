//! Chart Plan
//! Maps the analysis results onto the ordered list of charts to render.

use crate::charts::palette::{self, Palette};
use crate::charts::spec::{
    finite_range, histogram_bins, BoxSummary, ChartKind, ChartSpec, HistogramSeries, NamedSeries,
    PieChart,
};
use crate::data::schema::{self, COST, GROSS_PROFIT, SALES};
use crate::pipeline::{Analysis, PipelineError};

/// Bins per histogram series.
pub const HISTOGRAM_BINS: usize = 30;

/// Build every chart of the report, in presentation order.
pub fn chart_plan(analysis: &Analysis) -> Result<Vec<ChartSpec>, PipelineError> {
    let table = &analysis.table;
    let sales = schema::f64_values(table, SALES)?;
    let cost = schema::f64_values(table, COST)?;
    let profit = schema::f64_values(table, GROSS_PROFIT)?;

    let (region_labels, region_values) = analysis.region_sales.series(SALES)?;

    Ok(vec![
        sales_trend(analysis),
        region_division_bars(analysis),
        sales_cost_histogram(&sales, &cost),
        heatmap(
            "correlation_heatmap",
            "Correlation Heatmap",
            &analysis.sales_cost_profit_correlation,
        ),
        box_plots(&sales, &profit),
        ChartSpec::new(
            "region_pie",
            "Pie Chart: Sales Distribution by Region",
            ChartKind::Pie(PieChart {
                labels: region_labels.clone(),
                values: region_values.clone(),
                palette: Palette::Set3,
                start_angle: 140.0,
                ring_width: 1.0,
            }),
        ),
        heatmap(
            "numeric_correlation_heatmap",
            "Heatmap: Correlation Heatmap",
            &analysis.numeric_correlation,
        ),
        region_horizontal_bars(&region_labels, &region_values),
        ChartSpec::new(
            "region_donut",
            "Donut Chart: Sales Distribution by Region",
            ChartKind::Donut(PieChart {
                labels: region_labels,
                values: region_values,
                palette: Palette::Pastel1,
                start_angle: 140.0,
                ring_width: 0.4,
            }),
        ),
        sales_profit_scatter(&sales, &profit),
        monthly_trend(analysis),
        seasonal_area(analysis),
    ])
}

fn sales_trend(analysis: &Analysis) -> ChartSpec {
    let (categories, values): (Vec<String>, Vec<f64>) = analysis
        .daily_sales
        .iter()
        .map(|(date, v)| (date.format("%Y-%m-%d").to_string(), *v))
        .unzip();

    ChartSpec::new(
        "sales_trend",
        "Sales Trends Over Time",
        ChartKind::Line {
            categories,
            series: vec![NamedSeries {
                name: SALES.to_string(),
                color: palette::SERIES[0],
                values,
            }],
            markers: false,
        },
    )
    .with_axes("Order Date", "Total Sales")
}

/// One bar series per (division, metric) pair, grouped by country/region.
fn region_division_bars(analysis: &Analysis) -> ChartSpec {
    let grouped = &analysis.region_division;
    let mut categories: Vec<String> = grouped.groups.keys().map(|k| k[0].clone()).collect();
    categories.dedup();
    let mut divisions: Vec<String> = grouped.groups.keys().map(|k| k[1].clone()).collect();
    divisions.sort();
    divisions.dedup();

    let mut series = Vec::new();
    for (m, metric) in grouped.value_columns.iter().enumerate() {
        for division in &divisions {
            let values = categories
                .iter()
                .map(|region| {
                    grouped
                        .groups
                        .get(&vec![region.clone(), division.clone()])
                        .map(|v| v[m])
                        .unwrap_or(0.0)
                })
                .collect();
            series.push(NamedSeries {
                name: format!("{} · {}", division, metric),
                color: Palette::Series.color(series.len()),
                values,
            });
        }
    }

    ChartSpec::new(
        "region_division_bars",
        "Sales and Gross Profit by Regions and Divisions",
        ChartKind::GroupedBar { categories, series },
    )
    .with_axes("Region", "Total Amount")
}

fn sales_cost_histogram(sales: &[Option<f64>], cost: &[Option<f64>]) -> ChartSpec {
    let sales: Vec<f64> = sales.iter().flatten().copied().collect();
    let cost: Vec<f64> = cost.iter().flatten().copied().collect();
    let range = finite_range(sales.iter().chain(cost.iter()).copied()).unwrap_or((0.0, 1.0));

    ChartSpec::new(
        "sales_cost_distribution",
        "Distribution of Sales and Costs",
        ChartKind::Histogram {
            series: vec![
                HistogramSeries {
                    name: SALES.to_string(),
                    color: palette::SALES_BLUE,
                    bins: histogram_bins(&sales, HISTOGRAM_BINS, range),
                },
                HistogramSeries {
                    name: COST.to_string(),
                    color: palette::COST_RED,
                    bins: histogram_bins(&cost, HISTOGRAM_BINS, range),
                },
            ],
        },
    )
    .with_axes("Metric", "Amount")
}

fn heatmap(name: &str, title: &str, matrix: &crate::stats::Matrix) -> ChartSpec {
    ChartSpec::new(
        name,
        title,
        ChartKind::Heatmap {
            labels: matrix.columns.clone(),
            values: matrix.values.clone(),
        },
    )
}

fn box_plots(sales: &[Option<f64>], profit: &[Option<f64>]) -> ChartSpec {
    let sales: Vec<f64> = sales.iter().flatten().copied().collect();
    let profit: Vec<f64> = profit.iter().flatten().copied().collect();
    let boxes = [
        BoxSummary::from_values(SALES, palette::SKY_BLUE, &sales),
        BoxSummary::from_values(GROSS_PROFIT, palette::LIGHT_CORAL, &profit),
    ]
    .into_iter()
    .flatten()
    .collect();

    ChartSpec::new(
        "sales_profit_boxplots",
        "Box Plots of Sales and Gross Profit",
        ChartKind::BoxPlot { boxes },
    )
}

/// Regions sorted by ascending sales, the largest at the end.
fn region_horizontal_bars(labels: &[String], values: &[f64]) -> ChartSpec {
    let mut pairs: Vec<(String, f64)> = labels.iter().cloned().zip(values.iter().copied()).collect();
    pairs.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
    let (categories, values) = pairs.into_iter().unzip();

    ChartSpec::new(
        "region_sales_bars",
        "Horizontal Bar Plot: Sales by Region",
        ChartKind::HorizontalBar {
            categories,
            values,
            color: palette::TEAL,
        },
    )
    .with_axes("Total Sales", "Region")
}

fn sales_profit_scatter(sales: &[Option<f64>], profit: &[Option<f64>]) -> ChartSpec {
    let points = sales
        .iter()
        .zip(profit)
        .filter_map(|(s, p)| Some(((*s)?, (*p)?)))
        .collect();

    ChartSpec::new(
        "sales_profit_scatter",
        "Scatter Chart: Sales vs. Gross Profit",
        ChartKind::Scatter {
            points,
            color: palette::PINK,
        },
    )
    .with_axes("Sales ($)", "Gross Profit ($)")
}

fn monthly_trend(analysis: &Analysis) -> ChartSpec {
    let (categories, values): (Vec<String>, Vec<f64>) =
        analysis.monthly_sales.iter().cloned().unzip();

    ChartSpec::new(
        "monthly_sales_trend",
        "Monthly Candy Sales Trend",
        ChartKind::Line {
            categories,
            series: vec![NamedSeries {
                name: SALES.to_string(),
                color: palette::TREND_GREEN,
                values,
            }],
            markers: true,
        },
    )
    .with_axes("Month", "Total Sales ($)")
}

fn seasonal_area(analysis: &Analysis) -> ChartSpec {
    let (categories, values): (Vec<String>, Vec<f64>) =
        analysis.monthly_sales.iter().cloned().unzip();

    ChartSpec::new(
        "seasonal_sales_area",
        "Seasonal Candy Sales Trends",
        ChartKind::Area {
            categories,
            values,
            fill: palette::AREA_YELLOW,
            line: palette::AREA_RED,
        },
    )
    .with_axes("Month", "Total Sales ($)")
}
