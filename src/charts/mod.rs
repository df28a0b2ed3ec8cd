//! Charts module - Chart planning and rendering

pub mod palette;

mod plan;
mod renderer;
mod spec;

pub use plan::{chart_plan, HISTOGRAM_BINS};
pub use renderer::{render_all, ChartRenderer, PlottersRenderer, RenderError};
pub use spec::{BoxSummary, ChartKind, ChartSpec, HistogramSeries, NamedSeries, PieChart};
