use crate::data::cache::{CacheKey, TableCache};
use crate::data::error::{DataError, DataResult};
use crate::data::model::Table;
use crate::pipeline::PipelineConfig;
use crate::report::{
    registry_report, sensor_report, RegistryReport, RegistrySelection, SensorReport,
    SensorSelection,
};

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

/// State of one user session, independent of rendering.
///
/// Every session owns its cache and therefore its own cleaned table; nothing
/// is shared between sessions.
pub struct Session {
    config: PipelineConfig,

    /// Cleaned tables keyed by upload identity.
    cache: TableCache,

    /// Key of the upload currently shown (None until a file loads).
    current: Option<CacheKey>,

    /// Status / error message shown to the user.
    pub status_message: Option<String>,
}

impl Session {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            cache: TableCache::new(),
            current: None,
            status_message: None,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Ingest an upload. Load and cleaning errors never escape: they are
    /// logged and turned into `status_message`, and `false` is returned.
    pub fn upload(&mut self, bytes: &[u8], filename: &str) -> bool {
        let key = CacheKey::new(bytes, filename);
        let config = &self.config;
        match self
            .cache
            .get_or_try_insert_with(key.clone(), || config.load(bytes, filename))
        {
            Ok(table) => {
                log::info!(
                    "Session table: {} rows with columns {:?}",
                    table.n_rows(),
                    table.column_names()
                );
                self.current = Some(key);
                self.status_message = None;
                true
            }
            Err(e) => {
                log::error!("Failed to load file: {e}");
                self.status_message = Some(format!("Error: {e}"));
                self.current = None;
                false
            }
        }
    }

    /// The cleaned table of the current upload.
    pub fn table(&self) -> Option<&Table> {
        self.current.as_ref().and_then(|key| self.cache.get(key))
    }

    fn require_table(&self) -> DataResult<&Table> {
        self.table()
            .ok_or_else(|| DataError::schema("no file has been loaded"))
    }

    pub fn registry_report(&self, selection: &RegistrySelection) -> DataResult<RegistryReport> {
        match &self.config {
            PipelineConfig::Registry(cfg) => registry_report(self.require_table()?, cfg, selection),
            PipelineConfig::Sensor(_) => Err(DataError::schema("session is configured for sensor exports")),
        }
    }

    pub fn sensor_report(&self, selection: &SensorSelection) -> DataResult<SensorReport> {
        match &self.config {
            PipelineConfig::Sensor(cfg) => sensor_report(self.require_table()?, cfg, selection),
            PipelineConfig::Registry(_) => Err(DataError::schema("session is configured for registry exports")),
        }
    }
}
