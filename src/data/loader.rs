//! CSV Data Loader Module
//! Handles CSV file loading and schema validation using Polars.

use crate::data::schema::REQUIRED_COLUMNS;
use polars::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Input file not found: {0}")]
    NotFound(PathBuf),
    #[error("Failed to load CSV: {0}")]
    CsvError(#[from] PolarsError),
    #[error("Input is missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
}

/// Loads the sales dataset into a Polars DataFrame.
pub struct SalesLoader {
    delimiter: u8,
    infer_schema_length: usize,
}

impl Default for SalesLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl SalesLoader {
    pub fn new() -> Self {
        Self {
            delimiter: b',',
            infer_schema_length: 10000,
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Load a delimited file and check it carries the sales schema.
    pub fn load_csv(&self, file_path: &Path) -> Result<DataFrame, LoaderError> {
        if !file_path.is_file() {
            return Err(LoaderError::NotFound(file_path.to_path_buf()));
        }

        let path_str = file_path.to_string_lossy().to_string();
        debug!(path = %path_str, delimiter = %(self.delimiter as char), "reading csv");

        // Use lazy evaluation for memory efficiency, then collect
        let df = LazyCsvReader::new(&path_str)
            .with_separator(self.delimiter)
            .with_infer_schema_length(Some(self.infer_schema_length))
            .with_ignore_errors(true)
            .finish()?
            .collect()?;

        Self::validate_schema(&df)?;
        info!(rows = df.height(), columns = df.width(), "loaded {}", path_str);
        Ok(df)
    }

    /// Ensure every required column is present.
    pub fn validate_schema(df: &DataFrame) -> Result<(), LoaderError> {
        let present: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();

        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|name| !present.iter().any(|p| p == *name))
            .map(|name| name.to_string())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(LoaderError::MissingColumns(missing))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str = "Order ID,Order Date,Ship Date,Country/Region,State/Province,Postal Code,Division,Region,Sales,Units,Gross Profit,Cost";

    #[test]
    fn test_load_csv_reads_rows() -> anyhow::Result<()> {
        let mut tmp = NamedTempFile::new()?;
        writeln!(tmp, "{HEADER}")?;
        writeln!(tmp, "US-1,2021-01-03,2021-03-10,United States,Texas,79109,Chocolate,Interior,7.5,2,4.9,2.6")?;
        writeln!(tmp, "US-2,2021-01-04,2021-03-11,United States,Ohio,,Sugar,Atlantic,3.6,1,2.4,1.2")?;

        let df = SalesLoader::new().load_csv(tmp.path())?;
        assert_eq!(df.height(), 2);
        assert_eq!(df.column("Postal Code")?.null_count(), 1);
        Ok(())
    }

    #[test]
    fn test_load_csv_custom_delimiter() -> anyhow::Result<()> {
        let mut tmp = NamedTempFile::new()?;
        writeln!(tmp, "{}", HEADER.replace(',', ";"))?;
        writeln!(tmp, "US-1;2021-01-03;2021-03-10;United States;Texas;79109;Chocolate;Interior;7.5;2;4.9;2.6")?;

        let df = SalesLoader::new().with_delimiter(b';').load_csv(tmp.path())?;
        assert_eq!(df.height(), 1);
        assert_eq!(df.width(), 12);
        Ok(())
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let err = SalesLoader::new()
            .load_csv(Path::new("/definitely/not/here.csv"))
            .unwrap_err();
        assert!(matches!(err, LoaderError::NotFound(_)));
    }

    #[test]
    fn test_missing_columns_are_reported() {
        let df = df!("Sales" => [1.0], "Units" => [1i64]).unwrap();
        match SalesLoader::validate_schema(&df) {
            Err(LoaderError::MissingColumns(cols)) => {
                assert!(cols.contains(&"Order Date".to_string()));
                assert!(!cols.contains(&"Sales".to_string()));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
