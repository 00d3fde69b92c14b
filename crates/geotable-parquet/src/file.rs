//! Single-file spatial parquet read/write.
//!
//! Orchestration only: metadata construction and validation live in
//! `geotable-core`, the parquet encoding itself in the `parquet` crate. The
//! write path stores geometry columns as WKB binary and attaches the geo
//! metadata document under the file-level `"geo"` key; the read path refuses
//! to reconstruct geometry until that document has been validated.
//!
//! Both operations are synchronous and blocking; callers wanting concurrency
//! run independent calls on separate threads.

use std::fs::File;
use std::path::Path;

use arrow_array::{RecordBatch, RecordBatchReader};
use log::info;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::{ArrowWriter, ProjectionMask};
use parquet::file::metadata::KeyValue;
use parquet::file::properties::WriterProperties;

use geotable_core::{
    GEO_METADATA_KEY, GeoMetadata, MetadataOptions, SpatialTable, assemble, encode_table,
};

use crate::error::{Result, SpatialIoError};

/// Options for reading a spatial parquet file.
#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    /// Optional column subset to materialize. The selection is widened with
    /// the metadata-declared geometry columns so reconstruction never loses
    /// a geometry column. Names not present in the file are an error.
    pub columns: Option<Vec<String>>,
}

/// Write a spatial table to a parquet file.
///
/// Geometry columns are encoded as WKB binary columns and the geo metadata
/// document is attached under the reserved `"geo"` file-level key. The input
/// table is borrowed and left untouched.
///
/// # Errors
///
/// Fails with [`SpatialIoError::NotSpatial`] when the table has no designated
/// primary geometry column, or with I/O, encoding, or parquet errors.
pub fn write_spatial_parquet(
    table: &SpatialTable,
    path: impl AsRef<Path>,
    options: &MetadataOptions,
) -> Result<()> {
    let path = path.as_ref();
    if !table.is_spatial() {
        return Err(SpatialIoError::NotSpatial);
    }
    info!(
        "Writing spatial parquet file: {} ({} rows)",
        path.display(),
        table.num_rows()
    );

    let metadata = GeoMetadata::from_table(table, options);
    let document = metadata.to_json().map_err(SpatialIoError::Core)?;
    let batch = encode_table(table).map_err(SpatialIoError::Core)?;

    let file = File::create(path).map_err(|source| SpatialIoError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let properties = WriterProperties::builder()
        .set_key_value_metadata(Some(vec![KeyValue::new(
            GEO_METADATA_KEY.to_string(),
            document,
        )]))
        .build();

    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(properties))?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

/// Read a spatial table from a parquet file.
///
/// The file must carry a `"geo"` metadata document; files without one are
/// plain parquet and should be read with a plain parquet reader instead. The
/// document is parsed and structurally validated before any geometry column
/// is decoded.
///
/// # Errors
///
/// Fails with [`SpatialIoError::MissingGeoMetadata`] when the `"geo"` key is
/// absent, [`SpatialIoError::ColumnNotFound`] when a requested column does
/// not exist in the file, a metadata error when the document is malformed, or
/// a reconstruction error when declared geometry columns are missing from the
/// data.
pub fn read_spatial_parquet(path: impl AsRef<Path>, options: &ReadOptions) -> Result<SpatialTable> {
    let path = path.as_ref();
    info!("Reading spatial parquet file: {}", path.display());
    let file = File::open(path).map_err(|source| SpatialIoError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let document = builder
        .metadata()
        .file_metadata()
        .key_value_metadata()
        .and_then(|entries| entries.iter().find(|kv| kv.key == GEO_METADATA_KEY))
        .and_then(|kv| kv.value.clone())
        .ok_or_else(|| SpatialIoError::MissingGeoMetadata {
            path: path.to_path_buf(),
        })?;
    let metadata = GeoMetadata::parse(&document)?;

    let builder = match &options.columns {
        Some(requested) => {
            let selection = widen_selection(requested, &metadata, &builder, path)?;
            let mask = ProjectionMask::columns(
                builder.parquet_schema(),
                selection.iter().map(String::as_str),
            );
            builder.with_projection(mask)
        },
        None => builder,
    };

    let reader = builder.build()?;
    let schema = reader.schema();
    let batches = reader.collect::<std::result::Result<Vec<RecordBatch>, _>>()?;
    let batch = arrow::compute::concat_batches(&schema, &batches)?;

    Ok(assemble(&batch, &metadata).map_err(SpatialIoError::Core)?)
}

/// Widen a requested column subset with the geometry columns the metadata
/// declares. Requested names must exist in the file; metadata-declared
/// geometry columns absent from the file are skipped (reconstruction reports
/// them downstream if none remain).
fn widen_selection<T: parquet::file::reader::ChunkReader>(
    requested: &[String],
    metadata: &GeoMetadata,
    builder: &ParquetRecordBatchReaderBuilder<T>,
    path: &Path,
) -> Result<Vec<String>> {
    let file_schema = builder.schema();
    if let Some(unknown) = requested
        .iter()
        .find(|name| file_schema.column_with_name(name).is_none())
    {
        return Err(SpatialIoError::ColumnNotFound {
            column: unknown.clone(),
            path: path.to_path_buf(),
        });
    }
    let mut selection = requested.to_vec();
    for name in metadata.column_names() {
        if file_schema.column_with_name(name).is_some() && !selection.iter().any(|s| s == name) {
            selection.push(name.to_string());
        }
    }
    Ok(selection)
}
