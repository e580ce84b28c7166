use std::path::PathBuf;

use thiserror::Error;

use super::model::Column;

/// Failures while turning a city source into a [`super::model::TripTable`].
#[derive(Error, Debug)]
pub enum DataError {
    /// The source could not be found, opened or read.
    #[error("data unavailable at {path}: {source}")]
    DataUnavailable {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("unsupported file extension: .{extension}")]
    UnsupportedFormat { extension: String },

    #[error("source is missing required column '{column}'")]
    MissingColumn { column: Column },

    #[error("row {row}: {message}")]
    InvalidRecord { row: usize, message: String },
}

impl DataError {
    pub(crate) fn unavailable(path: impl Into<PathBuf>, source: impl Into<anyhow::Error>) -> Self {
        DataError::DataUnavailable {
            path: path.into(),
            source: source.into(),
        }
    }

    /// Whether this is the "source cannot be read" kind of failure.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, DataError::DataUnavailable { .. })
    }
}

pub type Result<T, E = DataError> = std::result::Result<T, E>;
