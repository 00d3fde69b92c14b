//! Error types for spatial parquet file and dataset I/O.

use std::path::PathBuf;

use thiserror::Error;

use geotable_core::{GeoTableError, MetadataError};

/// Errors raised by the file and dataset orchestration layer.
///
/// Core (metadata, transcoding, assembly) failures pass through
/// transparently; this enum adds the storage-facing failure modes.
#[derive(Debug, Error)]
pub enum SpatialIoError {
    /// A core metadata/transcoding/assembly failure
    #[error(transparent)]
    Core(#[from] GeoTableError),

    /// Parquet-level read or write failure
    #[error(transparent)]
    Parquet(#[from] parquet::errors::ParquetError),

    /// DataFusion-level dataset failure
    #[error(transparent)]
    DataFusion(#[from] datafusion::error::DataFusionError),

    /// Arrow-level failure while combining batches
    #[error(transparent)]
    Arrow(#[from] arrow_schema::ArrowError),

    /// Filesystem access failed
    #[error("Failed to access '{path}': {source}")]
    Io {
        /// The path being accessed
        path: PathBuf,
        /// The underlying error
        #[source]
        source: std::io::Error,
    },

    /// The file or dataset carries no "geo" metadata key
    #[error(
        "No geometry metadata found in '{path}'. Use a plain parquet reader for non-spatial data"
    )]
    MissingGeoMetadata {
        /// The file or dataset path
        path: PathBuf,
    },

    /// A write was attempted with a table that is not spatial
    #[error("Must provide a spatial table with a designated primary geometry column")]
    NotSpatial,

    /// The dataset directory holds no parquet fragment to read metadata from
    #[error("No parquet files found under '{path}'")]
    EmptyDataset {
        /// The dataset path
        path: PathBuf,
    },

    /// A partition column is missing or geometry-typed
    #[error("Partition column '{column}' must be an existing non-geometry column")]
    InvalidPartitionColumn {
        /// The offending column name
        column: String,
    },

    /// A requested column does not exist in the file being read
    #[error("Column '{column}' not found in '{path}'")]
    ColumnNotFound {
        /// The requested column name
        column: String,
        /// The file being read
        path: PathBuf,
    },
}

impl From<MetadataError> for SpatialIoError {
    fn from(err: MetadataError) -> Self {
        SpatialIoError::Core(err.into())
    }
}

/// Type alias for Results using [`SpatialIoError`].
pub type Result<T> = std::result::Result<T, SpatialIoError>;
