//! sheetdash – spreadsheet cleaning, filtering and summary statistics for
//! data dashboards.
//!
//! An upload (bytes + filename) is decoded by [`data::loader`], cleaned by a
//! [`pipeline::PipelineConfig`], held per user in a [`state::Session`], and
//! summarised by [`report`] for whatever layer draws the charts.

pub mod data;
pub mod pipeline;
pub mod report;
pub mod state;

pub use data::{CellValue, DataError, DataResult, Table, View};
pub use pipeline::{PipelineConfig, RegistryConfig, SensorConfig};
pub use state::Session;
