//! Run Configuration
//! Command-line arguments and the settings resolved from them.

use clap::Parser;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Delimiter must be a single ASCII character, got '{0}'")]
    InvalidDelimiter(char),
    #[error("Chart size must be non-zero, got {width}x{height}")]
    InvalidChartSize { width: u32, height: u32 },
}

#[derive(Parser, Debug)]
#[command(
    name = "sales-eda",
    version,
    about = "Exploratory analysis of a retail sales CSV export"
)]
pub struct Cli {
    /// Sales CSV to analyze.
    #[arg(default_value = "Candy_Sales.csv")]
    pub input: PathBuf,

    /// Directory the chart images are written to.
    #[arg(short, long, default_value = "charts")]
    pub output_dir: PathBuf,

    /// Field separator of the CSV file.
    #[arg(short, long, default_value_t = ',')]
    pub delimiter: char,

    /// Skip chart rendering.
    #[arg(long)]
    pub no_charts: bool,

    /// Open every rendered chart with the system viewer.
    #[arg(long, conflicts_with = "no_charts")]
    pub show: bool,

    /// Print the report as JSON instead of text.
    #[arg(long)]
    pub json: bool,

    /// Chart width in pixels.
    #[arg(long, default_value_t = 1000)]
    pub width: u32,

    /// Chart height in pixels.
    #[arg(long, default_value_t = 600)]
    pub height: u32,

    /// Increase log verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Log filter selected by the verbosity flag; `RUST_LOG` takes precedence.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }

    pub fn into_config(self) -> Result<AnalysisConfig, ConfigError> {
        if !self.delimiter.is_ascii() {
            return Err(ConfigError::InvalidDelimiter(self.delimiter));
        }
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::InvalidChartSize {
                width: self.width,
                height: self.height,
            });
        }

        Ok(AnalysisConfig {
            input: self.input,
            output_dir: self.output_dir,
            delimiter: self.delimiter as u8,
            render_charts: !self.no_charts,
            show_charts: self.show,
            json: self.json,
            width: self.width,
            height: self.height,
        })
    }
}

/// Settings of one analysis run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisConfig {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    pub delimiter: u8,
    pub render_charts: bool,
    pub show_charts: bool,
    pub json: bool,
    pub width: u32,
    pub height: u32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("Candy_Sales.csv"),
            output_dir: PathBuf::from("charts"),
            delimiter: b',',
            render_charts: true,
            show_charts: false,
            json: false,
            width: 1000,
            height: 600,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_config_default() {
        let cli = Cli::try_parse_from(["sales-eda"]).unwrap();
        assert_eq!(cli.log_filter(), "warn");
        assert_eq!(cli.into_config().unwrap(), AnalysisConfig::default());
    }

    #[test]
    fn test_flags_resolve_into_config() {
        let cli = Cli::try_parse_from([
            "sales-eda",
            "data/sales.tsv",
            "--delimiter",
            ";",
            "--no-charts",
            "--json",
            "-vv",
        ])
        .unwrap();
        assert_eq!(cli.log_filter(), "debug");

        let config = cli.into_config().unwrap();
        assert_eq!(config.input, PathBuf::from("data/sales.tsv"));
        assert_eq!(config.delimiter, b';');
        assert!(!config.render_charts);
        assert!(config.json);
    }

    #[test]
    fn test_non_ascii_delimiter_rejected() {
        let cli = Cli::try_parse_from(["sales-eda", "--delimiter", "§"]).unwrap();
        assert_eq!(
            cli.into_config(),
            Err(ConfigError::InvalidDelimiter('§'))
        );
    }

    #[test]
    fn test_show_conflicts_with_no_charts() {
        assert!(Cli::try_parse_from(["sales-eda", "--show", "--no-charts"]).is_err());
    }
}
