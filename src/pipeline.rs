use serde::{Deserialize, Serialize};

use crate::data::coerce::{coerce_numeric, measurement_columns, parse_timestamp_column};
use crate::data::derive::{derive_calendar_columns, DATETIME_COLUMN};
use crate::data::error::{DataError, DataResult};
use crate::data::header::{normalize_headers, HeaderLayout};
use crate::data::loader::load_bytes;
use crate::data::model::Table;

// ---------------------------------------------------------------------------
// Registry: accreditation records (ID / material / standard)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub id_column: String,
    pub material_column: String,
    pub standard_column: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        RegistryConfig {
            id_column: "ID".to_string(),
            material_column: "Material_Product_Tested".to_string(),
            standard_column: "Standard".to_string(),
        }
    }
}

impl RegistryConfig {
    pub fn required_columns(&self) -> [&str; 3] {
        [
            self.id_column.as_str(),
            self.material_column.as_str(),
            self.standard_column.as_str(),
        ]
    }

    /// Keep only the required columns, looked up by name, as category
    /// labels. A numeric-looking ID, material or standard is kept as text.
    pub fn clean(&self, raw: Table) -> DataResult<Table> {
        let required = self.required_columns();
        let mut table = raw.select_columns(&required)?;
        for name in required {
            let column = table.column_mut(name)?;
            for value in column.values.iter_mut() {
                *value = value.to_text();
            }
        }
        Ok(table)
    }
}

// ---------------------------------------------------------------------------
// Sensor: logger export with a two-row header
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    pub header: HeaderLayout,
    /// Position of the timestamp column after header normalization.
    pub timestamp_column: usize,
    /// Leading columns (`date`, `time`) that are never coerced to numbers.
    pub structural_columns: usize,
    /// Substring identifying humidity sensor columns.
    pub humidity_marker: String,
}

impl Default for SensorConfig {
    fn default() -> Self {
        SensorConfig {
            header: HeaderLayout::default(),
            timestamp_column: 0,
            structural_columns: 2,
            humidity_marker: "Humidity".to_string(),
        }
    }
}

impl SensorConfig {
    /// Normalize the header, parse the timestamp, derive `date`/`time`/`datetime`
    /// and coerce every measurement column to numeric.
    pub fn clean(&self, raw: Table) -> DataResult<Table> {
        let table = normalize_headers(&raw, &self.header)?;
        let timestamp = table
            .columns()
            .get(self.timestamp_column)
            .map(|c| c.name.clone())
            .ok_or_else(|| {
                DataError::schema(format!(
                    "no timestamp column at position {} ({} columns)",
                    self.timestamp_column,
                    table.n_columns()
                ))
            })?;

        let table = parse_timestamp_column(table, &timestamp)?;
        let table = derive_calendar_columns(table, &timestamp)?;
        let measurements = measurement_columns(&table, self.structural_columns, &[DATETIME_COLUMN])?;
        coerce_numeric(table, &measurements)
    }

    /// Humidity columns of a cleaned table; having none is a schema error.
    pub fn humidity_columns<'t>(&self, table: &'t Table) -> DataResult<Vec<&'t str>> {
        let columns = table.columns_matching(&self.humidity_marker);
        if columns.is_empty() {
            return Err(DataError::schema(format!(
                "no column containing {:?}",
                self.humidity_marker
            )));
        }
        Ok(columns)
    }
}

// ---------------------------------------------------------------------------
// PipelineConfig
// ---------------------------------------------------------------------------

/// One of the two cleaning configurations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PipelineConfig {
    Registry(RegistryConfig),
    Sensor(SensorConfig),
}

impl PipelineConfig {
    pub fn clean(&self, raw: Table) -> DataResult<Table> {
        match self {
            PipelineConfig::Registry(cfg) => cfg.clean(raw),
            PipelineConfig::Sensor(cfg) => cfg.clean(raw),
        }
    }

    /// Decode an upload and run the cleaning stage on it.
    pub fn load(&self, bytes: &[u8], filename: &str) -> DataResult<Table> {
        let raw = load_bytes(bytes, filename)?;
        let table = self.clean(raw)?;
        log::info!(
            "Cleaned {filename}: {} rows, columns {:?}",
            table.n_rows(),
            table.column_names()
        );
        Ok(table)
    }
}
