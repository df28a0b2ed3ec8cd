//! Data module - CSV loading, cleaning and grouping

pub mod schema;

mod cleaner;
mod grouper;
mod loader;

pub use cleaner::{CleanError, CleaningReport, DataCleaner, NullCount};
pub use grouper::{DataGrouper, GroupError, GroupedSums};
pub use loader::{LoaderError, SalesLoader};
