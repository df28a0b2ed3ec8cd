//! Sales EDA - Retail sales exploratory analysis
//!
//! Prints the analysis report and writes the charts as PNG images.

use anyhow::Context;
use clap::Parser;
use sales_eda::{pipeline, Cli};
use tracing::warn;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = cli.into_config()?;
    let report = pipeline::run(&config)
        .with_context(|| format!("Analysis of {} failed", config.input.display()))?;

    if config.json {
        println!("{}", report.to_json()?);
    } else {
        print!("{}", report);
    }

    if config.show_charts {
        for chart in &report.charts {
            if let Err(e) = open::that(chart) {
                warn!("Failed to open {}: {}", chart.display(), e);
            }
        }
    }

    Ok(())
}
