//! Static Chart Renderer
//! Draws chart specifications into PNG images with plotters.
//!
//! Cartesian charts place categories at integer x positions so bars, boxes
//! and line points share one layout. Pie and donut charts are drawn as
//! polygons directly on the pixel area.

use crate::charts::palette;
use crate::charts::spec::{
    finite_range, pie_slices, BoxSummary, ChartKind, ChartSpec, HistogramSeries, NamedSeries,
    PieChart,
};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Failed to create output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to draw '{chart}': {message}")]
    Draw { chart: String, message: String },
}

type DrawResult = Result<(), Box<dyn std::error::Error>>;
type Area<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

/// Category labels shown at most on an axis before thinning.
const MAX_CATEGORY_LABELS: usize = 24;

/// Produces one image per chart specification.
pub trait ChartRenderer: Sync {
    /// File extension of the produced artifacts.
    fn extension(&self) -> &'static str;

    fn render(&self, spec: &ChartSpec, path: &Path) -> Result<(), RenderError>;
}

/// Render every chart into `out_dir`, in parallel. Files are named
/// `{position}_{name}.{ext}` and returned in plan order.
pub fn render_all<R: ChartRenderer>(
    renderer: &R,
    specs: &[ChartSpec],
    out_dir: &Path,
) -> Result<Vec<PathBuf>, RenderError> {
    std::fs::create_dir_all(out_dir).map_err(|source| RenderError::OutputDir {
        path: out_dir.to_path_buf(),
        source,
    })?;

    let paths = specs
        .par_iter()
        .enumerate()
        .map(|(i, spec)| -> Result<PathBuf, RenderError> {
            let path = out_dir.join(format!("{:02}_{}.{}", i + 1, spec.name, renderer.extension()));
            renderer.render(spec, &path)?;
            debug!(chart = %spec.name, kind = spec.kind.name(), "rendered {}", path.display());
            Ok(path)
        })
        .collect::<Result<Vec<_>, RenderError>>()?;

    info!(charts = paths.len(), dir = %out_dir.display(), "charts written");
    Ok(paths)
}

/// PNG renderer backed by plotters' bitmap backend.
pub struct PlottersRenderer {
    width: u32,
    height: u32,
}

impl Default for PlottersRenderer {
    fn default() -> Self {
        Self::new(1000, 600)
    }
}

impl ChartRenderer for PlottersRenderer {
    fn extension(&self) -> &'static str {
        "png"
    }

    fn render(&self, spec: &ChartSpec, path: &Path) -> Result<(), RenderError> {
        self.draw(spec, path).map_err(|e| RenderError::Draw {
            chart: spec.title.clone(),
            message: e.to_string(),
        })
    }
}

impl PlottersRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(200),
            height: height.max(200),
        }
    }

    fn draw(&self, spec: &ChartSpec, path: &Path) -> DrawResult {
        let root = BitMapBackend::new(path, (self.width, self.height)).into_drawing_area();
        root.fill(&WHITE)?;

        match &spec.kind {
            ChartKind::Line {
                categories,
                series,
                markers,
            } => Self::draw_line(&root, spec, categories, series, *markers)?,
            ChartKind::Area {
                categories,
                values,
                fill,
                line,
            } => Self::draw_area(&root, spec, categories, values, *fill, *line)?,
            ChartKind::GroupedBar { categories, series } => {
                Self::draw_grouped_bar(&root, spec, categories, series)?
            }
            ChartKind::HorizontalBar {
                categories,
                values,
                color,
            } => Self::draw_horizontal_bar(&root, spec, categories, values, *color)?,
            ChartKind::Histogram { series } => Self::draw_histogram(&root, spec, series)?,
            ChartKind::Heatmap { labels, values } => {
                Self::draw_heatmap(&root, spec, labels, values)?
            }
            ChartKind::Pie(pie) | ChartKind::Donut(pie) => Self::draw_pie(&root, spec, pie)?,
            ChartKind::Scatter { points, color } => {
                Self::draw_scatter(&root, spec, points, *color)?
            }
            ChartKind::BoxPlot { boxes } => Self::draw_boxes(&root, spec, boxes)?,
        }

        root.present()?;
        Ok(())
    }

    fn draw_line(
        root: &Area,
        spec: &ChartSpec,
        categories: &[String],
        series: &[NamedSeries],
        markers: bool,
    ) -> DrawResult {
        let n = categories.len().max(1);
        let (lo, hi) = padded_range(series.iter().flat_map(|s| s.values.iter().copied()), false);

        let mut chart = ChartBuilder::on(root)
            .caption(&spec.title, ("sans-serif", 28))
            .margin(20)
            .x_label_area_size(60)
            .y_label_area_size(80)
            .build_cartesian_2d(-0.5f64..(n as f64 - 0.5), lo..hi)?;

        let formatter = |x: &f64| category_label(categories, *x);
        chart
            .configure_mesh()
            .x_labels(n.min(MAX_CATEGORY_LABELS))
            .x_label_formatter(&formatter)
            .x_desc(spec.x_label.as_str())
            .y_desc(spec.y_label.as_str())
            .draw()?;

        for s in series {
            let color = s.color;
            let points = indexed_points(&s.values);
            chart
                .draw_series(LineSeries::new(points.clone(), color.stroke_width(2)))?
                .label(s.name.as_str())
                .legend(move |(x, y)| {
                    PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2))
                });
            if markers {
                chart.draw_series(points.iter().map(|&p| Circle::new(p, 4, color.filled())))?;
            }
        }

        if series.len() > 1 {
            chart
                .configure_series_labels()
                .background_style(WHITE.mix(0.8))
                .border_style(BLACK)
                .draw()?;
        }
        Ok(())
    }

    fn draw_area(
        root: &Area,
        spec: &ChartSpec,
        categories: &[String],
        values: &[f64],
        fill: RGBColor,
        line: RGBColor,
    ) -> DrawResult {
        let n = categories.len().max(1);
        let (lo, hi) = padded_range(values.iter().copied(), true);

        let mut chart = ChartBuilder::on(root)
            .caption(&spec.title, ("sans-serif", 28))
            .margin(20)
            .x_label_area_size(60)
            .y_label_area_size(80)
            .build_cartesian_2d(-0.5f64..(n as f64 - 0.5), lo..hi)?;

        let formatter = |x: &f64| category_label(categories, *x);
        chart
            .configure_mesh()
            .x_labels(n.min(MAX_CATEGORY_LABELS))
            .x_label_formatter(&formatter)
            .light_line_style(BLACK.mix(0.05))
            .x_desc(spec.x_label.as_str())
            .y_desc(spec.y_label.as_str())
            .draw()?;

        let points = indexed_points(values);
        chart.draw_series(AreaSeries::new(points.clone(), 0.0, &fill.mix(0.6)))?;
        chart.draw_series(LineSeries::new(points.clone(), line.stroke_width(2)))?;
        chart.draw_series(points.iter().map(|&p| Circle::new(p, 4, line.filled())))?;
        Ok(())
    }

    fn draw_grouped_bar(
        root: &Area,
        spec: &ChartSpec,
        categories: &[String],
        series: &[NamedSeries],
    ) -> DrawResult {
        let n = categories.len().max(1);
        let (lo, hi) = padded_range(series.iter().flat_map(|s| s.values.iter().copied()), true);

        let mut chart = ChartBuilder::on(root)
            .caption(&spec.title, ("sans-serif", 28))
            .margin(20)
            .x_label_area_size(60)
            .y_label_area_size(80)
            .build_cartesian_2d(-0.5f64..(n as f64 - 0.5), lo..hi)?;

        let formatter = |x: &f64| category_label(categories, *x);
        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(n.min(MAX_CATEGORY_LABELS))
            .x_label_formatter(&formatter)
            .x_desc(spec.x_label.as_str())
            .y_desc(spec.y_label.as_str())
            .draw()?;

        let k = series.len().max(1);
        let bar_width = 0.8 / k as f64;
        for (j, s) in series.iter().enumerate() {
            let color = s.color;
            let offset = -0.4 + j as f64 * bar_width;
            chart
                .draw_series(s.values.iter().enumerate().filter(|(_, v)| v.is_finite()).map(
                    |(i, &v)| {
                        let x0 = i as f64 + offset;
                        Rectangle::new([(x0, 0.0), (x0 + bar_width, v)], color.filled())
                    },
                ))?
                .label(s.name.as_str())
                .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 12, y + 5)], color.filled()));
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
        Ok(())
    }

    fn draw_horizontal_bar(
        root: &Area,
        spec: &ChartSpec,
        categories: &[String],
        values: &[f64],
        color: RGBColor,
    ) -> DrawResult {
        let n = categories.len().max(1);
        let (lo, hi) = padded_range(values.iter().copied(), true);

        let mut chart = ChartBuilder::on(root)
            .caption(&spec.title, ("sans-serif", 28))
            .margin(20)
            .x_label_area_size(50)
            .y_label_area_size(140)
            .build_cartesian_2d(lo..hi, -0.5f64..(n as f64 - 0.5))?;

        let formatter = |y: &f64| category_label(categories, *y);
        chart
            .configure_mesh()
            .disable_y_mesh()
            .y_labels(n.min(MAX_CATEGORY_LABELS))
            .y_label_formatter(&formatter)
            .x_desc(spec.x_label.as_str())
            .y_desc(spec.y_label.as_str())
            .draw()?;

        chart.draw_series(
            values
                .iter()
                .enumerate()
                .filter(|(_, v)| v.is_finite())
                .map(|(i, &v)| {
                    let y = i as f64;
                    Rectangle::new([(0.0, y - 0.4), (v, y + 0.4)], color.filled())
                }),
        )?;
        Ok(())
    }

    fn draw_histogram(root: &Area, spec: &ChartSpec, series: &[HistogramSeries]) -> DrawResult {
        let x_range = finite_range(
            series
                .iter()
                .flat_map(|s| s.bins.iter().flat_map(|b| [b.start, b.end])),
        )
        .unwrap_or((0.0, 1.0));
        let max_count = series
            .iter()
            .flat_map(|s| s.bins.iter().map(|b| b.count))
            .max()
            .unwrap_or(0)
            .max(1);

        let mut chart = ChartBuilder::on(root)
            .caption(&spec.title, ("sans-serif", 28))
            .margin(20)
            .x_label_area_size(50)
            .y_label_area_size(70)
            .build_cartesian_2d(x_range.0..x_range.1, 0f64..(max_count as f64 * 1.1))?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_desc(spec.x_label.as_str())
            .y_desc(spec.y_label.as_str())
            .draw()?;

        for s in series {
            let color = s.color;
            chart
                .draw_series(s.bins.iter().filter(|b| b.count > 0).map(|b| {
                    Rectangle::new([(b.start, 0.0), (b.end, b.count as f64)], color.mix(0.5).filled())
                }))?
                .label(s.name.as_str())
                .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 12, y + 5)], color.mix(0.5).filled()));
        }

        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
        Ok(())
    }

    fn draw_heatmap(
        root: &Area,
        spec: &ChartSpec,
        labels: &[String],
        values: &[Vec<f64>],
    ) -> DrawResult {
        let n = labels.len().max(1);
        let mut chart = ChartBuilder::on(root)
            .caption(&spec.title, ("sans-serif", 28))
            .margin(20)
            .x_label_area_size(60)
            .y_label_area_size(120)
            .build_cartesian_2d(-0.5f64..(n as f64 - 0.5), -0.5f64..(n as f64 - 0.5))?;

        // first row at the top
        let row_label = |y: &f64| {
            let flipped = (n as f64 - 1.0) - *y;
            category_label(labels, flipped)
        };
        let col_label = |x: &f64| category_label(labels, *x);
        chart
            .configure_mesh()
            .disable_mesh()
            .x_labels(n)
            .y_labels(n)
            .x_label_formatter(&col_label)
            .y_label_formatter(&row_label)
            .draw()?;

        let cells: Vec<(f64, f64, f64)> = values
            .iter()
            .enumerate()
            .flat_map(|(i, row)| {
                row.iter()
                    .enumerate()
                    .map(move |(j, &v)| (j as f64, (n - 1 - i) as f64, v))
            })
            .collect();

        chart.draw_series(cells.iter().map(|&(x, y, v)| {
            Rectangle::new(
                [(x - 0.5, y - 0.5), (x + 0.5, y + 0.5)],
                palette::coolwarm(v).filled(),
            )
        }))?;

        let centered = Pos::new(HPos::Center, VPos::Center);
        chart.draw_series(cells.iter().map(|&(x, y, v)| {
            let ink = if v.abs() > 0.6 { &WHITE } else { &BLACK };
            let style = ("sans-serif", 18).into_font().color(ink).pos(centered);
            Text::new(format!("{:.2}", v), (x, y), style)
        }))?;
        Ok(())
    }

    fn draw_pie(root: &Area, spec: &ChartSpec, pie: &PieChart) -> DrawResult {
        let area = root.titled(&spec.title, ("sans-serif", 28))?;
        let (w, h) = area.dim_in_pixel();
        let center = (w as f64 / 2.0, h as f64 / 2.0);
        let radius = w.min(h) as f64 * 0.36;
        let ring = pie.ring_width.clamp(0.05, 1.0);
        let inner = radius * (1.0 - ring);

        let to_px = |r: f64, deg: f64| {
            let rad = deg.to_radians();
            (
                (center.0 + r * rad.cos()).round() as i32,
                (center.1 - r * rad.sin()).round() as i32,
            )
        };

        let centered = Pos::new(HPos::Center, VPos::Center);
        let slices = pie_slices(&pie.labels, &pie.values, pie.start_angle);

        for (i, slice) in slices.iter().enumerate() {
            if slice.fraction <= 0.0 {
                continue;
            }
            let steps = ((slice.end_angle - slice.start_angle).ceil() as usize).max(2);
            let step = (slice.end_angle - slice.start_angle) / steps as f64;

            let mut outline: Vec<(i32, i32)> = (0..=steps)
                .map(|s| to_px(radius, slice.start_angle + s as f64 * step))
                .collect();
            if inner > 0.0 {
                outline.extend(
                    (0..=steps)
                        .rev()
                        .map(|s| to_px(inner, slice.start_angle + s as f64 * step)),
                );
            } else {
                outline.push(to_px(0.0, 0.0));
            }

            area.draw(&Polygon::new(outline.clone(), pie.palette.color(i).filled()))?;
            outline.push(outline[0]);
            area.draw(&PathElement::new(outline, WHITE.stroke_width(2)))?;

            let mid = (slice.start_angle + slice.end_angle) / 2.0;
            let label_style = ("sans-serif", 18).into_font().color(&BLACK).pos(centered);
            area.draw(&Text::new(
                slice.label.clone(),
                to_px(radius * 1.15, mid),
                label_style,
            ))?;

            let pct_radius = if inner > 0.0 {
                (radius + inner) / 2.0
            } else {
                radius * 0.6
            };
            let pct_style = ("sans-serif", 16).into_font().color(&BLACK).pos(centered);
            area.draw(&Text::new(
                format!("{:.1}%", slice.fraction * 100.0),
                to_px(pct_radius, mid),
                pct_style,
            ))?;
        }
        Ok(())
    }

    fn draw_scatter(
        root: &Area,
        spec: &ChartSpec,
        points: &[(f64, f64)],
        color: RGBColor,
    ) -> DrawResult {
        let x_range = padded_range(points.iter().map(|p| p.0), false);
        let y_range = padded_range(points.iter().map(|p| p.1), false);

        let mut chart = ChartBuilder::on(root)
            .caption(&spec.title, ("sans-serif", 28))
            .margin(20)
            .x_label_area_size(50)
            .y_label_area_size(80)
            .build_cartesian_2d(x_range.0..x_range.1, y_range.0..y_range.1)?;

        chart
            .configure_mesh()
            .x_desc(spec.x_label.as_str())
            .y_desc(spec.y_label.as_str())
            .draw()?;

        chart.draw_series(
            points
                .iter()
                .map(|&p| Circle::new(p, 4, color.mix(0.6).filled())),
        )?;
        chart.draw_series(
            points
                .iter()
                .map(|&p| Circle::new(p, 4, BLACK.stroke_width(1))),
        )?;
        Ok(())
    }

    fn draw_boxes(root: &Area, spec: &ChartSpec, boxes: &[BoxSummary]) -> DrawResult {
        let area = root.titled(&spec.title, ("sans-serif", 28))?;
        let panels = area.split_evenly((1, boxes.len().max(1)));

        for (panel, summary) in panels.iter().zip(boxes) {
            let (lo, hi) = padded_range(
                summary
                    .fliers
                    .iter()
                    .copied()
                    .chain([summary.whisker_low, summary.whisker_high]),
                false,
            );

            let mut chart = ChartBuilder::on(panel)
                .caption(format!("Box Plot of {}", summary.name), ("sans-serif", 22))
                .margin(15)
                .x_label_area_size(20)
                .y_label_area_size(70)
                .build_cartesian_2d(-1f64..1f64, lo..hi)?;

            chart
                .configure_mesh()
                .disable_x_mesh()
                .x_labels(0)
                .y_desc(summary.name.as_str())
                .draw()?;

            let color = summary.color;
            chart.draw_series([
                Rectangle::new([(-0.4, summary.q1), (0.4, summary.q3)], color.filled()),
                Rectangle::new([(-0.4, summary.q1), (0.4, summary.q3)], BLACK.stroke_width(1)),
            ])?;
            chart.draw_series([
                PathElement::new(
                    vec![(-0.4, summary.median), (0.4, summary.median)],
                    BLACK.stroke_width(2),
                ),
                PathElement::new(
                    vec![(0.0, summary.q1), (0.0, summary.whisker_low)],
                    BLACK.stroke_width(1),
                ),
                PathElement::new(
                    vec![(0.0, summary.q3), (0.0, summary.whisker_high)],
                    BLACK.stroke_width(1),
                ),
                PathElement::new(
                    vec![(-0.2, summary.whisker_low), (0.2, summary.whisker_low)],
                    BLACK.stroke_width(1),
                ),
                PathElement::new(
                    vec![(-0.2, summary.whisker_high), (0.2, summary.whisker_high)],
                    BLACK.stroke_width(1),
                ),
            ])?;
            chart.draw_series(
                summary
                    .fliers
                    .iter()
                    .map(|&v| Circle::new((0.0, v), 3, BLACK.stroke_width(1))),
            )?;
        }
        Ok(())
    }
}

/// Label of the category at an integer axis position; empty between categories.
fn category_label(labels: &[String], position: f64) -> String {
    let idx = position.round();
    if (position - idx).abs() > 1e-6 || idx < 0.0 {
        return String::new();
    }
    labels.get(idx as usize).cloned().unwrap_or_default()
}

fn indexed_points(values: &[f64]) -> Vec<(f64, f64)> {
    values
        .iter()
        .enumerate()
        .filter(|(_, v)| v.is_finite())
        .map(|(i, &v)| (i as f64, v))
        .collect()
}

/// Axis range with 5% padding. `include_zero` anchors bars and areas at the axis.
fn padded_range(values: impl IntoIterator<Item = f64>, include_zero: bool) -> (f64, f64) {
    let (mut lo, mut hi) = finite_range(values).unwrap_or((0.0, 1.0));
    if include_zero {
        lo = lo.min(0.0);
        hi = hi.max(0.0);
    }
    if (hi - lo).abs() < f64::EPSILON {
        lo -= 1.0;
        hi += 1.0;
    }
    let pad = (hi - lo) * 0.05;
    let lo = if include_zero && lo == 0.0 { 0.0 } else { lo - pad };
    (lo, hi + pad)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charts::chart_plan;
    use crate::pipeline::tests::sample_table;
    use crate::pipeline::Analysis;
    use std::sync::Mutex;

    /// Records what would be drawn instead of drawing it.
    struct RecordingRenderer {
        seen: Mutex<Vec<(String, String)>>,
    }

    impl ChartRenderer for RecordingRenderer {
        fn extension(&self) -> &'static str {
            "txt"
        }

        fn render(&self, spec: &ChartSpec, path: &Path) -> Result<(), RenderError> {
            std::fs::write(path, spec.kind.name()).map_err(|e| RenderError::Draw {
                chart: spec.title.clone(),
                message: e.to_string(),
            })?;
            self.seen
                .lock()
                .unwrap()
                .push((spec.name.clone(), spec.kind.name().to_string()));
            Ok(())
        }
    }

    #[test]
    fn test_category_label_only_on_integers() {
        let labels = vec!["a".to_string(), "b".to_string()];
        assert_eq!(category_label(&labels, 1.0), "b");
        assert_eq!(category_label(&labels, 0.5), "");
        assert_eq!(category_label(&labels, -1.0), "");
        assert_eq!(category_label(&labels, 2.0), "");
    }

    #[test]
    fn test_padded_range() {
        assert_eq!(padded_range([0.0, 10.0], true), (0.0, 10.5));
        let (lo, hi) = padded_range([5.0, 5.0], false);
        assert!(lo < 5.0 && hi > 5.0);
        let (lo, hi) = padded_range([-10.0, 10.0], true);
        assert!((lo + 11.0).abs() < 1e-12 && (hi - 11.0).abs() < 1e-12);
    }

    #[test]
    fn test_render_all_writes_in_plan_order() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = RecordingRenderer {
            seen: Mutex::new(Vec::new()),
        };
        let specs = vec![
            ChartSpec::new(
                "scatter",
                "Scatter",
                ChartKind::Scatter {
                    points: vec![(1.0, 2.0)],
                    color: palette::PINK,
                },
            ),
            ChartSpec::new(
                "bars",
                "Bars",
                ChartKind::HorizontalBar {
                    categories: vec!["a".to_string()],
                    values: vec![1.0],
                    color: palette::TEAL,
                },
            ),
        ];

        let out = dir.path().join("charts");
        let paths = render_all(&renderer, &specs, &out).unwrap();

        assert_eq!(paths.len(), 2);
        assert!(paths[0].ends_with("01_scatter.txt"));
        assert!(paths[1].ends_with("02_bars.txt"));
        assert_eq!(std::fs::read_to_string(&paths[1]).unwrap(), "horizontal_bar");
        assert_eq!(renderer.seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_plotters_renderer_writes_every_chart() {
        let dir = tempfile::tempdir().unwrap();
        let analysis = Analysis::from_table(&sample_table()).unwrap();
        let specs = chart_plan(&analysis).unwrap();

        let paths = render_all(&PlottersRenderer::new(800, 500), &specs, dir.path()).unwrap();

        assert_eq!(paths.len(), 12);
        for path in &paths {
            assert_eq!(path.extension().and_then(|e| e.to_str()), Some("png"));
            assert!(std::fs::metadata(path).unwrap().len() > 0, "{} is empty", path.display());
        }
    }
}
