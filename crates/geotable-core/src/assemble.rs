//! Reconstruction of a spatial table from a plain record batch plus a
//! validated geo metadata document.
//!
//! The metadata must already have passed [`validate`](crate::validate) (or
//! come from [`GeoMetadata::parse`](crate::GeoMetadata::parse)); this module
//! trusts its structure but still reconciles it against the columns actually
//! present, since a projection or a foreign writer may have dropped some.

use arrow_array::RecordBatch;
use log::warn;

use crate::crs::Crs;
use crate::error::{GeoTableError, ReconstructionError, Result};
use crate::metadata::GeoMetadata;
use crate::table::{SpatialTable, TableColumn};
use crate::transcode::decode_wkb_column;

/// Rebuild a spatial table from a plain record batch and its geo metadata.
///
/// Declared geometry columns are intersected with the columns present in the
/// batch; each present one is decoded from WKB using the CRS recorded for it
/// in the metadata. The declared primary column is used when present,
/// otherwise the first available geometry column is designated with a
/// non-fatal advisory. On success exactly one column is the designated
/// primary geometry column and it is geometry-typed.
///
/// # Errors
///
/// Returns a [`ReconstructionError`] when none of the declared geometry
/// columns exist in the batch, or a transcoding error if WKB decoding fails.
pub fn assemble(batch: &RecordBatch, metadata: &GeoMetadata) -> Result<SpatialTable> {
    let schema = batch.schema();

    let present: Vec<&str> = metadata
        .column_names()
        .filter(|name| schema.column_with_name(name).is_some())
        .collect();
    if present.is_empty() {
        return Err(GeoTableError::Reconstruction(
            ReconstructionError::NoGeometryColumns,
        ));
    }

    let primary = effective_primary(metadata, &present);

    let mut columns = Vec::with_capacity(batch.num_columns());
    for (field, array) in schema.fields().iter().zip(batch.columns()) {
        let name = field.name();
        let column = match metadata.column(name) {
            Some(descriptor) if present.contains(&name.as_str()) => {
                let crs = descriptor.crs.as_deref().map(Crs::from_wkt);
                TableColumn::Geometry(decode_wkb_column(name, array, crs)?)
            },
            _ => TableColumn::Attribute(array.clone()),
        };
        columns.push((name.clone(), column));
    }

    SpatialTable::try_new(columns, Some(primary))
}

/// Pick the effective primary geometry column.
///
/// Falls back to the first present geometry column, with an advisory, when
/// the declared primary is absent from the data.
fn effective_primary(metadata: &GeoMetadata, present: &[&str]) -> String {
    if let Some(declared) = metadata.primary_column.as_deref() {
        if present.contains(&declared) {
            return declared.to_string();
        }
    }
    let fallback = present[0];
    warn!("Primary geometry column not found, using next available: '{fallback}'");
    fallback.to_string()
}
