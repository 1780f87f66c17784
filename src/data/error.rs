use thiserror::Error;

/// Boxed cause carried by [`DataError::Load`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failures surfaced by the data layer.
///
/// An empty filter result is not an error: it is an empty [`View`](super::view::View).
/// Unparsable cells are not errors either; they become [`CellValue::Null`](super::model::CellValue::Null).
#[derive(Debug, Error)]
pub enum DataError {
    #[error("Unsupported file format: {0:?}")]
    UnsupportedFormat(String),

    #[error("Error reading file {file}: {source}")]
    Load {
        file: String,
        #[source]
        source: BoxError,
    },

    #[error("Schema error: {0}")]
    Schema(String),
}

pub type DataResult<T> = Result<T, DataError>;

impl DataError {
    pub(crate) fn load(file: &str, source: impl Into<BoxError>) -> Self {
        DataError::Load {
            file: file.to_string(),
            source: source.into(),
        }
    }

    pub(crate) fn schema(msg: impl Into<String>) -> Self {
        DataError::Schema(msg.into())
    }
}
