//! `geotable-core` is the core library for the `geotable` project: an
//! in-memory model for spatial tables plus the metadata contract that lets
//! those tables round-trip through a plain columnar file format.
//!
//! A columnar format has no native geometry type, so geometry columns are
//! stored as opaque binary columns holding Well-Known Binary (WKB) values,
//! and a JSON "geo" metadata document records which columns are geometry,
//! their encoding, and their coordinate reference system.
//!
//! This crate provides:
//! - **Data model**: [`SpatialTable`], [`GeometryColumn`] and the per-column
//!   [`TableColumn`] type tag (`table` module).
//! - **Metadata codec**: build, serialize, parse, and validate the geo
//!   metadata document (`metadata` module).
//! - **Geometry transcoding**: geometry columns to WKB binary arrays and
//!   back (`transcode` module).
//! - **Table assembly**: reconstruct a [`SpatialTable`] from a plain record
//!   batch plus validated metadata (`assemble` module).
//!
//! File and dataset orchestration lives in the `geotable-parquet` crate; this
//! crate never touches storage.

pub mod assemble;
pub mod crs;
pub mod error;
pub mod metadata;
pub mod table;
pub mod transcode;

pub use assemble::assemble;
pub use crs::Crs;
pub use error::{GeoTableError, MetadataError, ReconstructionError, Result, TableError};
pub use metadata::{
    GEO_METADATA_KEY, GeoMetadata, GeometryColumnMetadata, MetadataOptions, validate,
};
pub use table::{GeometryColumn, SpatialTable, TableColumn};
pub use transcode::{decode_wkb_column, encode_table};
