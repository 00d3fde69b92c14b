//! Geometry column transcoding between in-memory geometries and Well-Known
//! Binary byte columns.
//!
//! At rest, every geometry value is one WKB byte string inside a plain
//! `Binary` column, so a columnar writer that knows nothing about geometry
//! can store it. WKB carries no CRS, so decoding always takes the CRS from
//! the geo metadata document, never from the bytes.

use std::io::Cursor;
use std::sync::Arc;

use arrow_array::builder::BinaryBuilder;
use arrow_array::{Array, ArrayRef, BinaryArray, LargeBinaryArray, RecordBatch};
use arrow_schema::{DataType, Field, Schema};
use geo_types::Geometry;
use geozero::wkb::{FromWkb, WkbDialect};
use geozero::{CoordDimensions, ToWkb};

use crate::crs::Crs;
use crate::error::{GeoTableError, ReconstructionError, Result};
use crate::table::{GeometryColumn, SpatialTable, TableColumn};

/// Encode a spatial table into a plain record batch.
///
/// Every geometry column is replaced by a nullable `Binary` column holding
/// one WKB byte string per value; attribute columns pass through unchanged.
/// Tables with multiple geometry columns are supported, each encoded
/// independently.
///
/// # Errors
///
/// Returns an error if WKB encoding fails for any value or the record batch
/// cannot be constructed.
pub fn encode_table(table: &SpatialTable) -> Result<RecordBatch> {
    let mut fields = Vec::with_capacity(table.num_columns());
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(table.num_columns());

    for (name, column) in table.columns() {
        match column {
            TableColumn::Geometry(geom) => {
                fields.push(Field::new(name, DataType::Binary, true));
                arrays.push(encode_geometry_column(name, geom)?);
            },
            TableColumn::Attribute(array) => {
                fields.push(Field::new(name, array.data_type().clone(), true));
                arrays.push(Arc::clone(array));
            },
        }
    }

    let schema = Arc::new(Schema::new(fields));
    Ok(RecordBatch::try_new(schema, arrays)?)
}

/// Encode one geometry column as a WKB binary array, preserving nulls.
fn encode_geometry_column(name: &str, column: &GeometryColumn) -> Result<ArrayRef> {
    let mut builder = BinaryBuilder::new();
    for geom in column.geoms() {
        match geom {
            Some(geom) => {
                let wkb = geom
                    .to_wkb(CoordDimensions::xy())
                    .map_err(|source| GeoTableError::Wkb {
                        column: name.to_string(),
                        source,
                    })?;
                builder.append_value(&wkb);
            },
            None => builder.append_null(),
        }
    }
    Ok(Arc::new(builder.finish()))
}

/// Decode a WKB binary array back into a geometry column.
///
/// The CRS comes from the geo metadata document recorded at write time; WKB
/// payloads have no CRS of their own. Nulls are preserved. Both `Binary` and
/// `LargeBinary` storage are accepted.
///
/// # Errors
///
/// Returns an error if the array is not binary-typed or any value fails to
/// parse as WKB.
pub fn decode_wkb_column(
    name: &str,
    array: &ArrayRef,
    crs: Option<Crs>,
) -> Result<GeometryColumn> {
    let geoms = match array.data_type() {
        DataType::Binary => {
            let array = array
                .as_any()
                .downcast_ref::<BinaryArray>()
                .ok_or_else(|| not_binary(name, array))?;
            decode_values(name, (0..array.len()).map(|i| value_at(array, i)))?
        },
        DataType::LargeBinary => {
            let array = array
                .as_any()
                .downcast_ref::<LargeBinaryArray>()
                .ok_or_else(|| not_binary(name, array))?;
            decode_values(name, (0..array.len()).map(|i| large_value_at(array, i)))?
        },
        _ => return Err(not_binary(name, array)),
    };

    Ok(GeometryColumn::new(geoms, crs))
}

fn value_at(array: &BinaryArray, index: usize) -> Option<&[u8]> {
    array.is_valid(index).then(|| array.value(index))
}

fn large_value_at(array: &LargeBinaryArray, index: usize) -> Option<&[u8]> {
    array.is_valid(index).then(|| array.value(index))
}

fn decode_values<'a>(
    name: &str,
    values: impl Iterator<Item = Option<&'a [u8]>>,
) -> Result<Vec<Option<Geometry<f64>>>> {
    values
        .map(|bytes| {
            bytes
                .map(|bytes| {
                    let mut reader = Cursor::new(bytes);
                    Geometry::from_wkb(&mut reader, WkbDialect::Wkb).map_err(|source| {
                        GeoTableError::Wkb {
                            column: name.to_string(),
                            source,
                        }
                    })
                })
                .transpose()
        })
        .collect()
}

fn not_binary(name: &str, array: &ArrayRef) -> GeoTableError {
    GeoTableError::Reconstruction(ReconstructionError::NotBinary {
        column: name.to_string(),
        data_type: array.data_type().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow_array::Int64Array;
    use geo_types::{Geometry, Point, line_string};

    fn table_with_two_geometry_columns() -> SpatialTable {
        let points = vec![
            Some(Geometry::Point(Point::new(1.0, 2.0))),
            None,
            Some(Geometry::Point(Point::new(-3.5, 4.25))),
        ];
        let lines: Vec<Option<Geometry<f64>>> = vec![
            Some(Geometry::LineString(line_string![
                (x: 0.0, y: 0.0),
                (x: 1.0, y: 1.0),
            ])),
            Some(Geometry::LineString(line_string![
                (x: 2.0, y: 2.0),
                (x: 3.0, y: 3.0),
            ])),
            None,
        ];
        SpatialTable::try_new(
            vec![
                (
                    "id".to_string(),
                    TableColumn::Attribute(Arc::new(Int64Array::from(vec![1, 2, 3]))),
                ),
                (
                    "location".to_string(),
                    TableColumn::Geometry(GeometryColumn::new(
                        points,
                        Some(Crs::from_wkt("GEOGCS[\"WGS 84\"]")),
                    )),
                ),
                (
                    "route".to_string(),
                    TableColumn::Geometry(GeometryColumn::new(
                        lines,
                        Some(Crs::from_wkt("PROJCS[\"Web Mercator\"]")),
                    )),
                ),
            ],
            Some("location".to_string()),
        )
        .unwrap()
    }

    #[test]
    fn test_encode_replaces_geometry_with_binary() {
        let batch = encode_table(&table_with_two_geometry_columns()).unwrap();

        assert_eq!(batch.num_rows(), 3);
        let schema = batch.schema();
        assert_eq!(schema.field_with_name("id").unwrap().data_type(), &DataType::Int64);
        assert_eq!(
            schema.field_with_name("location").unwrap().data_type(),
            &DataType::Binary
        );
        assert_eq!(
            schema.field_with_name("route").unwrap().data_type(),
            &DataType::Binary
        );

        // Nulls survive encoding.
        let location = batch.column_by_name("location").unwrap();
        assert!(location.is_null(1));
    }

    #[test]
    fn test_roundtrip_preserves_values_and_nulls() {
        let table = table_with_two_geometry_columns();
        let batch = encode_table(&table).unwrap();

        let decoded = decode_wkb_column(
            "location",
            batch.column_by_name("location").unwrap(),
            Some(Crs::from_wkt("GEOGCS[\"WGS 84\"]")),
        )
        .unwrap();

        let TableColumn::Geometry(original) = table.column("location").unwrap() else {
            panic!("location should be geometry");
        };
        assert_eq!(decoded.geoms(), original.geoms());
        assert_eq!(decoded.crs(), original.crs());
    }

    #[test]
    fn test_roundtrip_preserves_distinct_crs_per_column() {
        let table = table_with_two_geometry_columns();
        let batch = encode_table(&table).unwrap();

        let location = decode_wkb_column(
            "location",
            batch.column_by_name("location").unwrap(),
            Some(Crs::from_wkt("GEOGCS[\"WGS 84\"]")),
        )
        .unwrap();
        let route = decode_wkb_column(
            "route",
            batch.column_by_name("route").unwrap(),
            Some(Crs::from_wkt("PROJCS[\"Web Mercator\"]")),
        )
        .unwrap();

        assert_ne!(location.crs(), route.crs());
        assert!(matches!(route.geoms()[0], Some(Geometry::LineString(_))));
    }

    #[test]
    fn test_decode_rejects_non_binary_column() {
        let array: ArrayRef = Arc::new(Int64Array::from(vec![1, 2]));
        let result = decode_wkb_column("geom", &array, None);
        assert!(matches!(
            result,
            Err(GeoTableError::Reconstruction(
                ReconstructionError::NotBinary { .. }
            ))
        ));
    }

    #[test]
    fn test_decode_rejects_invalid_wkb_bytes() {
        let mut builder = BinaryBuilder::new();
        builder.append_value(b"not wkb");
        let array: ArrayRef = Arc::new(builder.finish());

        let result = decode_wkb_column("geom", &array, None);
        assert!(matches!(result, Err(GeoTableError::Wkb { .. })));
    }
}
