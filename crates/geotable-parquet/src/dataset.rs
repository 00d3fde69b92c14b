//! Partitioned multi-file spatial dataset read/write on top of DataFusion.
//!
//! A dataset is a directory of parquet fragments, optionally hive-partitioned
//! by one or more key columns. The geo metadata document travels in each
//! fragment's file-level metadata; on read it is discovered from the first
//! fragment, validated, and then used to reconstruct geometry after the
//! (possibly lazy, caller-filtered) query has been collected.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow_array::{ArrayRef, RecordBatch, UInt64Array};
use arrow_schema::{DataType, Schema};
use datafusion::config::TableParquetOptions;
use datafusion::dataframe::DataFrameWriteOptions;
use datafusion::prelude::{DataFrame, ParquetReadOptions, SessionContext};
use log::info;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use geotable_core::{
    GEO_METADATA_KEY, GeoMetadata, MetadataOptions, SpatialTable, TableColumn, assemble,
    encode_table,
};

use crate::error::{Result, SpatialIoError};
use crate::groups::partition_indices;

/// Options for opening a spatial dataset.
#[derive(Debug, Clone, Default)]
pub struct DatasetReadOptions {
    /// Hive partition columns of the dataset layout. DataFusion does not
    /// infer these from directory names, so they must be declared to be
    /// materialized as columns.
    pub partition_columns: Vec<String>,
}

/// Options for one dataset read.
#[derive(Debug, Clone, Default)]
pub struct DatasetQueryOptions {
    /// Optional column subset to materialize.
    pub columns: Option<Vec<String>>,
    /// When set, a column subset is widened with the metadata-declared
    /// geometry columns so geometry reconstruction cannot lose its input.
    /// Off by default: an explicit subset without geometry fails assembly.
    pub find_geom: bool,
}

/// Options for writing a spatial dataset.
#[derive(Debug, Clone, Default)]
pub struct DatasetWriteOptions {
    /// Partition columns for the hive-style directory layout. Each must be
    /// an existing non-geometry column; rows are grouped by these keys and
    /// each group is encoded independently.
    pub partition_columns: Vec<String>,
    /// Provenance fields for the geo metadata document.
    pub metadata: MetadataOptions,
}

/// An opened spatial dataset: a lazy DataFusion frame over the parquet
/// fragments plus the validated geo metadata document they carry.
#[derive(Debug, Clone)]
pub struct SpatialDataset {
    frame: DataFrame,
    metadata: GeoMetadata,
}

impl SpatialDataset {
    /// Open a partitioned parquet dataset as a spatial dataset.
    ///
    /// The geo metadata document is discovered from the first parquet
    /// fragment under `path` (stable directory order) and validated before
    /// the dataset is handed back.
    ///
    /// # Errors
    ///
    /// Fails when no fragment exists, the `"geo"` key is absent, or the
    /// document is malformed.
    pub async fn open(
        ctx: &SessionContext,
        path: &str,
        options: &DatasetReadOptions,
    ) -> Result<Self> {
        let document = discover_geo_document(Path::new(path))?;
        let metadata = GeoMetadata::parse(&document)?;
        info!("Opening spatial dataset: {path}");

        let partition_cols = options
            .partition_columns
            .iter()
            .map(|name| (name.clone(), DataType::Utf8))
            .collect();
        let frame = ctx
            .read_parquet(
                path,
                ParquetReadOptions::default().table_partition_cols(partition_cols),
            )
            .await?;

        Ok(Self { frame, metadata })
    }

    /// The lazy query over the dataset, for caller-side filtering and
    /// selection before [`read_spatial_dataset_query`].
    #[must_use]
    pub fn query(&self) -> DataFrame {
        self.frame.clone()
    }

    /// The dataset's validated geo metadata document.
    #[must_use]
    pub fn metadata(&self) -> &GeoMetadata {
        &self.metadata
    }
}

/// Read a spatial dataset into a spatial table.
///
/// An optional column subset is applied before collection; with
/// `find_geom` the subset is widened so metadata-declared geometry
/// columns are always materialized.
///
/// # Errors
///
/// Fails on query execution errors, or at assembly when no declared
/// geometry column survives the selection.
pub async fn read_spatial_dataset(
    dataset: &SpatialDataset,
    options: &DatasetQueryOptions,
) -> Result<SpatialTable> {
    let mut frame = dataset.query();
    if let Some(requested) = &options.columns {
        let selection = if options.find_geom {
            widen_selection(requested, dataset.metadata(), &frame)
        } else {
            requested.clone()
        };
        let selection: Vec<&str> = selection.iter().map(String::as_str).collect();
        frame = frame.select_columns(&selection)?;
    }
    read_spatial_dataset_query(frame, dataset.metadata()).await
}

/// Collect an already-filtered/selected dataset query into a spatial table.
///
/// The caller is responsible for keeping the geometry columns in the
/// query's projection; use [`read_spatial_dataset`] with `find_geom` to have
/// the selection widened automatically.
///
/// # Errors
///
/// Fails on query execution errors or when assembly cannot find any
/// declared geometry column in the result.
pub async fn read_spatial_dataset_query(
    frame: DataFrame,
    metadata: &GeoMetadata,
) -> Result<SpatialTable> {
    let frame_schema = frame.schema().clone();
    let batches = frame.collect().await?;

    let schema = match batches.first() {
        Some(batch) => batch.schema(),
        None => Arc::new(Schema::from(&frame_schema)),
    };
    let batch = arrow::compute::concat_batches(&schema, &batches)?;

    Ok(assemble(&batch, metadata)?)
}

/// Write a spatial table as a (possibly partitioned) parquet dataset.
///
/// Rows are grouped by the partition columns, each group is geometry-encoded
/// independently, and the groups are reassembled in the original row order
/// before DataFusion lays out the hive-partitioned directory. The geo
/// metadata document is attached to every written fragment under the
/// reserved `"geo"` key.
///
/// # Errors
///
/// Fails with [`SpatialIoError::NotSpatial`] for a non-spatial table, with
/// [`SpatialIoError::InvalidPartitionColumn`] when a partition column is
/// missing or geometry-typed, or on encoding and write errors.
pub async fn write_spatial_dataset(
    ctx: &SessionContext,
    table: &SpatialTable,
    path: &str,
    options: &DatasetWriteOptions,
) -> Result<()> {
    if !table.is_spatial() {
        return Err(SpatialIoError::NotSpatial);
    }
    info!(
        "Writing spatial dataset: {path} ({} rows, partitioned by [{}])",
        table.num_rows(),
        options.partition_columns.join(", ")
    );

    let metadata = GeoMetadata::from_table(table, &options.metadata);
    let document = metadata.to_json().map_err(SpatialIoError::Core)?;

    let keys = resolve_partition_columns(table, &options.partition_columns)?;
    let batch = if keys.is_empty() {
        encode_table(table).map_err(SpatialIoError::Core)?
    } else {
        encode_by_group(table, &keys)?
    };

    let mut parquet_options = TableParquetOptions::default();
    parquet_options
        .key_value_metadata
        .insert(GEO_METADATA_KEY.to_string(), Some(document));

    let frame = ctx.read_batch(batch)?;
    frame
        .write_parquet(
            path,
            DataFrameWriteOptions::new().with_partition_by(options.partition_columns.clone()),
            Some(parquet_options),
        )
        .await?;
    Ok(())
}

/// Resolve partition column names to their attribute arrays.
fn resolve_partition_columns(table: &SpatialTable, names: &[String]) -> Result<Vec<ArrayRef>> {
    names
        .iter()
        .map(|name| match table.column(name) {
            Some(TableColumn::Attribute(array)) => Ok(Arc::clone(array)),
            _ => Err(SpatialIoError::InvalidPartitionColumn {
                column: name.clone(),
            }),
        })
        .collect()
}

/// Encode the table one row group at a time, then restore the original row
/// order.
///
/// Encoding is a pure per-row transformation, so grouping cannot change the
/// result, but each group is still processed independently and the output is
/// reassembled with an inverse permutation so callers observe their input
/// order.
fn encode_by_group(table: &SpatialTable, keys: &[ArrayRef]) -> Result<RecordBatch> {
    let groups = partition_indices(keys, table.num_rows())?;
    if groups.is_empty() {
        return Ok(encode_table(table).map_err(SpatialIoError::Core)?);
    }

    let mut grouped_order = Vec::with_capacity(table.num_rows());
    let mut encoded = Vec::with_capacity(groups.len());
    for indices in &groups {
        grouped_order.extend_from_slice(indices);
        let group = table.take(indices).map_err(SpatialIoError::Core)?;
        encoded.push(encode_table(&group).map_err(SpatialIoError::Core)?);
    }

    let schema = encoded[0].schema();
    let combined = arrow::compute::concat_batches(&schema, &encoded)?;

    let mut inverse = vec![0u64; grouped_order.len()];
    for (position, &row) in grouped_order.iter().enumerate() {
        inverse[row as usize] = position as u64;
    }
    let indices = UInt64Array::from(inverse);
    let columns = combined
        .columns()
        .iter()
        .map(|column| arrow::compute::take(column, &indices, None))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(RecordBatch::try_new(schema, columns)?)
}

/// Widen a requested column subset with the geometry columns the metadata
/// declares, restricted to columns present in the frame.
fn widen_selection(requested: &[String], metadata: &GeoMetadata, frame: &DataFrame) -> Vec<String> {
    let mut selection = requested.to_vec();
    for name in metadata.column_names() {
        if frame.schema().has_column_with_unqualified_name(name)
            && !selection.iter().any(|s| s == name)
        {
            selection.push(name.to_string());
        }
    }
    selection
}

/// Find the geo metadata document in the first parquet fragment under a
/// dataset path.
fn discover_geo_document(path: &Path) -> Result<String> {
    let fragment =
        first_parquet_fragment(path)?.ok_or_else(|| SpatialIoError::EmptyDataset {
            path: path.to_path_buf(),
        })?;

    let file = File::open(&fragment).map_err(|source| SpatialIoError::Io {
        path: fragment.clone(),
        source,
    })?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    builder
        .metadata()
        .file_metadata()
        .key_value_metadata()
        .and_then(|entries| entries.iter().find(|kv| kv.key == GEO_METADATA_KEY))
        .and_then(|kv| kv.value.clone())
        .ok_or_else(|| SpatialIoError::MissingGeoMetadata {
            path: path.to_path_buf(),
        })
}

/// Depth-first search for the first `.parquet` file, in stable path order.
fn first_parquet_fragment(path: &Path) -> Result<Option<PathBuf>> {
    if path.is_file() {
        return Ok(Some(path.to_path_buf()));
    }

    let mut entries = std::fs::read_dir(path)
        .map_err(|source| SpatialIoError::Io {
            path: path.to_path_buf(),
            source,
        })?
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(|source| SpatialIoError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    entries.sort_by_key(std::fs::DirEntry::path);

    for entry in entries {
        let entry_path = entry.path();
        if entry_path.is_dir() {
            if let Some(found) = first_parquet_fragment(&entry_path)? {
                return Ok(Some(found));
            }
        } else if entry_path.extension().is_some_and(|ext| ext == "parquet") {
            return Ok(Some(entry_path));
        }
    }
    Ok(None)
}
