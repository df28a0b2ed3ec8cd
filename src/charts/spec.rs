//! Chart Specifications
//! Backend-independent description of each chart, built from aggregated data.

use crate::charts::palette::Palette;
use crate::stats::{OutlierBounds, StatsCalculator};
use plotters::style::RGBColor;

/// One named series of values.
#[derive(Debug, Clone)]
pub struct NamedSeries {
    pub name: String,
    pub color: RGBColor,
    pub values: Vec<f64>,
}

/// Histogram bin `[start, end)`; the last bin also holds its end value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

#[derive(Debug, Clone)]
pub struct HistogramSeries {
    pub name: String,
    pub color: RGBColor,
    pub bins: Vec<Bin>,
}

/// Five-number summary plus fliers, as drawn by a box plot.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxSummary {
    pub name: String,
    pub color: RGBColor,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub whisker_low: f64,
    pub whisker_high: f64,
    pub fliers: Vec<f64>,
}

impl BoxSummary {
    /// Whiskers reach the furthest values inside the IQR band; the rest are fliers.
    pub fn from_values(name: &str, color: RGBColor, values: &[f64]) -> Option<Self> {
        let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let bounds = OutlierBounds::from_sorted(&sorted);
        let median = StatsCalculator::percentile(&sorted, 50.0);
        let whisker_low = sorted
            .iter()
            .copied()
            .find(|&v| v >= bounds.lower)
            .unwrap_or(bounds.q1);
        let whisker_high = sorted
            .iter()
            .rev()
            .copied()
            .find(|&v| v <= bounds.upper)
            .unwrap_or(bounds.q3);
        let fliers = sorted
            .iter()
            .copied()
            .filter(|&v| bounds.is_outlier(v))
            .collect();

        Some(Self {
            name: name.to_string(),
            color,
            q1: bounds.q1,
            median,
            q3: bounds.q3,
            whisker_low,
            whisker_high,
            fliers,
        })
    }
}

/// Pie or donut chart data.
#[derive(Debug, Clone)]
pub struct PieChart {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
    pub palette: Palette,
    /// Degrees, counter-clockwise from three o'clock.
    pub start_angle: f64,
    /// Fraction of the radius that is filled; 1.0 draws a full pie.
    pub ring_width: f64,
}

/// One slice of a pie, angles in degrees counter-clockwise.
#[derive(Debug, Clone, PartialEq)]
pub struct PieSlice {
    pub label: String,
    pub fraction: f64,
    pub start_angle: f64,
    pub end_angle: f64,
}

#[derive(Debug, Clone)]
pub enum ChartKind {
    Line {
        categories: Vec<String>,
        series: Vec<NamedSeries>,
        markers: bool,
    },
    Area {
        categories: Vec<String>,
        values: Vec<f64>,
        fill: RGBColor,
        line: RGBColor,
    },
    GroupedBar {
        categories: Vec<String>,
        series: Vec<NamedSeries>,
    },
    HorizontalBar {
        categories: Vec<String>,
        values: Vec<f64>,
        color: RGBColor,
    },
    Histogram {
        series: Vec<HistogramSeries>,
    },
    Heatmap {
        labels: Vec<String>,
        values: Vec<Vec<f64>>,
    },
    Pie(PieChart),
    Donut(PieChart),
    Scatter {
        points: Vec<(f64, f64)>,
        color: RGBColor,
    },
    BoxPlot {
        boxes: Vec<BoxSummary>,
    },
}

impl ChartKind {
    pub fn name(&self) -> &'static str {
        match self {
            ChartKind::Line { .. } => "line",
            ChartKind::Area { .. } => "area",
            ChartKind::GroupedBar { .. } => "grouped_bar",
            ChartKind::HorizontalBar { .. } => "horizontal_bar",
            ChartKind::Histogram { .. } => "histogram",
            ChartKind::Heatmap { .. } => "heatmap",
            ChartKind::Pie(_) => "pie",
            ChartKind::Donut(_) => "donut",
            ChartKind::Scatter { .. } => "scatter",
            ChartKind::BoxPlot { .. } => "box_plot",
        }
    }
}

/// A chart ready to be rendered.
#[derive(Debug, Clone)]
pub struct ChartSpec {
    /// File stem of the rendered artifact.
    pub name: String,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub kind: ChartKind,
}

impl ChartSpec {
    pub fn new(name: &str, title: &str, kind: ChartKind) -> Self {
        Self {
            name: name.to_string(),
            title: title.to_string(),
            x_label: String::new(),
            y_label: String::new(),
            kind,
        }
    }

    pub fn with_axes(mut self, x_label: &str, y_label: &str) -> Self {
        self.x_label = x_label.to_string();
        self.y_label = y_label.to_string();
        self
    }
}

/// Min and max of the finite values, or `None` when there are none.
pub fn finite_range(values: impl IntoIterator<Item = f64>) -> Option<(f64, f64)> {
    values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// Split `range` into `bins` equal-width bins and count the values in each.
pub fn histogram_bins(values: &[f64], bins: usize, range: (f64, f64)) -> Vec<Bin> {
    let bins = bins.max(1);
    let (lo, mut hi) = range;
    if hi <= lo {
        hi = lo + 1.0;
    }
    let width = (hi - lo) / bins as f64;

    let mut out: Vec<Bin> = (0..bins)
        .map(|i| Bin {
            start: lo + i as f64 * width,
            end: lo + (i + 1) as f64 * width,
            count: 0,
        })
        .collect();

    for &v in values {
        if !v.is_finite() || v < lo || v > hi {
            continue;
        }
        let idx = (((v - lo) / width).floor() as usize).min(bins - 1);
        out[idx].count += 1;
    }
    out
}

/// Angular extent of every slice. Negative and NaN values count as zero.
pub fn pie_slices(labels: &[String], values: &[f64], start_angle: f64) -> Vec<PieSlice> {
    let total: f64 = values.iter().filter(|v| **v > 0.0).sum();
    if total <= 0.0 {
        return Vec::new();
    }

    let mut angle = start_angle;
    labels
        .iter()
        .zip(values)
        .map(|(label, &v)| {
            let fraction = if v > 0.0 { v / total } else { 0.0 };
            let start = angle;
            angle += fraction * 360.0;
            PieSlice {
                label: label.clone(),
                fraction,
                start_angle: start,
                end_angle: angle,
            }
        })
        .collect()
}
