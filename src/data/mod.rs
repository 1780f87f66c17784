//! Data layer: core types, loading, cleaning, filtering and aggregation.
//!
//! Architecture:
//! ```text
//!  .csv / .txt / .xlsx / .xls  (bytes + filename)
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  loader   │  decode → raw Table
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐   ┌──────────┐   ┌──────────┐
//!   │  header   │ → │  coerce   │ → │  derive   │   clean, typed Table
//!   └──────────┘   └──────────┘   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  filter   │  FilterSpec → View (row subset, same columns)
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  stats    │  value counts, top-N, describe, stat summary
//!   └──────────┘
//! ```

pub mod cache;
pub mod coerce;
pub mod derive;
pub mod error;
pub mod filter;
pub mod header;
pub mod loader;
pub mod model;
pub mod stats;
pub mod view;

pub use error::{DataError, DataResult};
pub use model::{CellValue, Column, ColumnType, Table};
pub use view::View;
