//! Sales EDA - Exploratory analysis of retail sales exports
//!
//! Loads a sales CSV, cleans it, computes summary statistics, group totals
//! and IQR outliers, and renders the report charts as PNG images.

pub mod charts;
pub mod config;
pub mod data;
pub mod pipeline;
pub mod report;
pub mod stats;

pub use config::{AnalysisConfig, Cli};
pub use pipeline::{run, Analysis, PipelineError};
pub use report::AnalysisReport;
