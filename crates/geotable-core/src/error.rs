//! Custom error types for `geotable` core operations.
//!
//! This module provides structured error handling using `thiserror`, with
//! domain-specific error types for the metadata contract, table construction,
//! and geometry reconstruction. The orchestration crate wraps these with its
//! own I/O-level errors.

use thiserror::Error;

/// Main error type for core `geotable` operations.
///
/// Uses `#[error(transparent)]` to delegate display formatting to the
/// underlying domain-specific variants.
#[derive(Debug, Error)]
pub enum GeoTableError {
    /// Geo metadata document is absent, malformed, or unsupported
    #[error(transparent)]
    Metadata(#[from] MetadataError),

    /// Declared geometry columns could not be reconstructed from the data
    #[error(transparent)]
    Reconstruction(#[from] ReconstructionError),

    /// Spatial table construction invariant violated
    #[error(transparent)]
    Table(#[from] TableError),

    /// WKB encode or decode failed for a geometry column
    #[error("WKB transcoding failed for column '{column}': {source}")]
    Wkb {
        /// The geometry column being transcoded
        column: String,
        /// The underlying geozero error
        #[source]
        source: geozero::error::GeozeroError,
    },

    /// Arrow-level failure while building or reading columnar data
    #[error(transparent)]
    Arrow(#[from] arrow_schema::ArrowError),

    /// JSON serialization of the metadata document failed
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Errors raised while validating a geo metadata document.
///
/// The document is foreign input (read back from storage, possibly written by
/// another implementation or corrupted), so every structural assumption is
/// checked explicitly before any field is trusted. Checks run in a fixed
/// order and the first failure wins.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MetadataError {
    /// The document is not a JSON object (null, array, scalar, or absent)
    #[error("empty or malformed geo metadata")]
    Malformed,

    /// A required top-level key is missing
    #[error("Required name '{name}' not found")]
    MissingName {
        /// The missing key (`primary_column` or `columns`)
        name: String,
    },

    /// A required item is missing from a column descriptor
    #[error("Required geo metadata item '{item}' not found in {column}")]
    MissingItem {
        /// The missing descriptor item (`crs` or `encoding`)
        item: String,
        /// The geometry column whose descriptor is incomplete
        column: String,
    },

    /// A column descriptor declares an encoding other than WKB
    #[error("Only WKB encoding is currently supported")]
    UnsupportedEncoding,
}

/// Errors raised while reconstructing a spatial table from plain columns.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReconstructionError {
    /// None of the metadata-declared geometry columns exist in the data
    #[error("Malformed file and geo metadata: no declared geometry column present in the data")]
    NoGeometryColumns,

    /// A declared geometry column is not stored as binary data
    #[error("geometry column '{column}' has non-binary storage type {data_type}")]
    NotBinary {
        /// The offending column
        column: String,
        /// The column's actual storage type
        data_type: String,
    },
}

/// Errors raised while constructing a [`SpatialTable`](crate::SpatialTable).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TableError {
    /// Columns have differing row counts
    #[error("column '{column}' has {actual} rows, expected {expected}")]
    RowCountMismatch {
        /// The offending column
        column: String,
        /// Row count of the first column
        expected: usize,
        /// Row count of the offending column
        actual: usize,
    },

    /// Two columns share a name
    #[error("duplicate column name '{column}'")]
    DuplicateColumn {
        /// The duplicated name
        column: String,
    },

    /// The designated primary geometry column is not a geometry column
    #[error("primary geometry column '{column}' is not a geometry column")]
    PrimaryNotGeometry {
        /// The declared primary column
        column: String,
    },

    /// A referenced column does not exist
    #[error("no such column '{column}'")]
    NoSuchColumn {
        /// The missing column name
        column: String,
    },
}

/// Type alias for Results using [`GeoTableError`].
pub type Result<T> = std::result::Result<T, GeoTableError>;
