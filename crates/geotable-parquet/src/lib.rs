//! `geotable-parquet` reads and writes spatial tables as parquet files and
//! partitioned parquet datasets.
//!
//! Geometry columns are stored as plain binary columns of Well-Known Binary
//! values, and a JSON geo metadata document under the file-level `"geo"` key
//! records which columns are geometry, their encoding, and their coordinate
//! reference system. Files written here interoperate with any reader of the
//! same metadata convention.
//!
//! This crate is orchestration: the metadata contract, geometry transcoding,
//! and table assembly live in `geotable-core`; columnar storage is delegated
//! to the `parquet` crate for single files and to DataFusion for lazy,
//! partitioned datasets.
//!
//! # Single file
//!
//! ```ignore
//! use geotable_core::MetadataOptions;
//! use geotable_parquet::{read_spatial_parquet, write_spatial_parquet, ReadOptions};
//!
//! write_spatial_parquet(&table, "cities.parquet", &MetadataOptions::default())?;
//! let table = read_spatial_parquet("cities.parquet", &ReadOptions::default())?;
//! ```
//!
//! # Partitioned dataset
//!
//! ```ignore
//! use datafusion::prelude::SessionContext;
//! use geotable_parquet::{SpatialDataset, DatasetReadOptions, DatasetQueryOptions};
//!
//! let ctx = SessionContext::new();
//! let dataset = SpatialDataset::open(&ctx, "cities/", &DatasetReadOptions::default()).await?;
//! let table = read_spatial_dataset(&dataset, &DatasetQueryOptions::default()).await?;
//! ```

pub mod dataset;
pub mod error;
pub mod file;
pub mod groups;

pub use dataset::{
    DatasetQueryOptions, DatasetReadOptions, DatasetWriteOptions, SpatialDataset,
    read_spatial_dataset, read_spatial_dataset_query, write_spatial_dataset,
};
pub use error::{Result, SpatialIoError};
pub use file::{ReadOptions, read_spatial_parquet, write_spatial_parquet};
