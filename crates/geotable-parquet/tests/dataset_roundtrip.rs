use std::sync::Arc;

use arrow_array::{Int64Array, StringArray};
use datafusion::prelude::{SessionContext, col, lit};
use geo_types::{Geometry, Point};

use geotable_core::{
    Crs, GeoTableError, GeometryColumn, MetadataOptions, ReconstructionError, SpatialTable,
    TableColumn,
};
use geotable_parquet::{
    DatasetQueryOptions, DatasetReadOptions, DatasetWriteOptions, SpatialDataset, SpatialIoError,
    read_spatial_dataset, read_spatial_dataset_query, write_spatial_dataset,
};

const WGS84: &str = "GEOGCS[\"WGS 84\",DATUM[\"WGS_1984\"]]";

fn stations_table() -> SpatialTable {
    let points = vec![
        Some(Geometry::Point(Point::new(0.0, 0.0))),
        Some(Geometry::Point(Point::new(1.0, 1.0))),
        Some(Geometry::Point(Point::new(2.0, 2.0))),
        Some(Geometry::Point(Point::new(3.0, 3.0))),
    ];
    SpatialTable::try_new(
        vec![
            (
                "id".to_string(),
                TableColumn::Attribute(Arc::new(Int64Array::from(vec![1, 2, 3, 4]))),
            ),
            (
                "region".to_string(),
                TableColumn::Attribute(Arc::new(StringArray::from(vec![
                    "east", "west", "east", "west",
                ]))),
            ),
            (
                "geometry".to_string(),
                TableColumn::Geometry(GeometryColumn::new(points, Some(Crs::from_wkt(WGS84)))),
            ),
        ],
        Some("geometry".to_string()),
    )
    .unwrap()
}

/// Collect (id, point) pairs sorted by id; dataset reads do not guarantee
/// row order across fragments.
fn sorted_rows(table: &SpatialTable) -> Vec<(i64, Option<Geometry<f64>>)> {
    let TableColumn::Attribute(ids) = table.column("id").unwrap() else {
        panic!("id should be an attribute column");
    };
    let ids = ids.as_any().downcast_ref::<Int64Array>().unwrap();
    let geoms = table.primary_geometry_column().unwrap().geoms();

    let mut rows: Vec<_> = (0..table.num_rows())
        .map(|i| (ids.value(i), geoms[i].clone()))
        .collect();
    rows.sort_by_key(|(id, _)| *id);
    rows
}

/// Unpartitioned dataset write/read round trip.
#[tokio::test]
async fn test_dataset_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stations").to_str().unwrap().to_string();
    let ctx = SessionContext::new();

    let table = stations_table();
    write_spatial_dataset(&ctx, &table, &path, &DatasetWriteOptions::default())
        .await
        .unwrap();

    let dataset = SpatialDataset::open(&ctx, &path, &DatasetReadOptions::default())
        .await
        .unwrap();
    assert_eq!(dataset.metadata().primary_column.as_deref(), Some("geometry"));

    let rebuilt = read_spatial_dataset(&dataset, &DatasetQueryOptions::default())
        .await
        .unwrap();

    assert_eq!(rebuilt.num_rows(), 4);
    assert_eq!(sorted_rows(&rebuilt), sorted_rows(&table));
    assert_eq!(
        rebuilt.primary_geometry_column().unwrap().crs().map(Crs::as_wkt),
        Some(WGS84)
    );
}

/// Partitioned write lays out hive directories and grouped encoding keeps
/// every row.
#[tokio::test]
async fn test_partitioned_dataset_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stations").to_str().unwrap().to_string();
    let ctx = SessionContext::new();

    let table = stations_table();
    let write_options = DatasetWriteOptions {
        partition_columns: vec!["region".to_string()],
        metadata: MetadataOptions::default(),
    };
    write_spatial_dataset(&ctx, &table, &path, &write_options)
        .await
        .unwrap();

    let east = dir.path().join("stations").join("region=east");
    let west = dir.path().join("stations").join("region=west");
    assert!(east.is_dir(), "expected hive directory {east:?}");
    assert!(west.is_dir(), "expected hive directory {west:?}");

    let read_options = DatasetReadOptions {
        partition_columns: vec!["region".to_string()],
    };
    let dataset = SpatialDataset::open(&ctx, &path, &read_options).await.unwrap();
    let rebuilt = read_spatial_dataset(&dataset, &DatasetQueryOptions::default())
        .await
        .unwrap();

    assert_eq!(rebuilt.num_rows(), 4);
    assert_eq!(sorted_rows(&rebuilt), sorted_rows(&table));
    assert!(rebuilt.column("region").is_some());
}

/// A caller-filtered lazy query still reconstructs geometry.
#[tokio::test]
async fn test_filtered_query_read() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stations").to_str().unwrap().to_string();
    let ctx = SessionContext::new();

    write_spatial_dataset(&ctx, &stations_table(), &path, &DatasetWriteOptions::default())
        .await
        .unwrap();

    let dataset = SpatialDataset::open(&ctx, &path, &DatasetReadOptions::default())
        .await
        .unwrap();
    let frame = dataset.query().filter(col("id").gt(lit(2))).unwrap();

    let rebuilt = read_spatial_dataset_query(frame, dataset.metadata())
        .await
        .unwrap();

    assert_eq!(rebuilt.num_rows(), 2);
    assert!(rebuilt.is_spatial());
}

/// find_geom widens a geometry-less selection; without it assembly fails.
#[tokio::test]
async fn test_find_geom_widens_selection() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stations").to_str().unwrap().to_string();
    let ctx = SessionContext::new();

    write_spatial_dataset(&ctx, &stations_table(), &path, &DatasetWriteOptions::default())
        .await
        .unwrap();
    let dataset = SpatialDataset::open(&ctx, &path, &DatasetReadOptions::default())
        .await
        .unwrap();

    let narrow = DatasetQueryOptions {
        columns: Some(vec!["id".to_string()]),
        find_geom: false,
    };
    let result = read_spatial_dataset(&dataset, &narrow).await;
    assert!(matches!(
        result,
        Err(SpatialIoError::Core(GeoTableError::Reconstruction(
            ReconstructionError::NoGeometryColumns
        )))
    ));

    let widened = DatasetQueryOptions {
        columns: Some(vec!["id".to_string()]),
        find_geom: true,
    };
    let rebuilt = read_spatial_dataset(&dataset, &widened).await.unwrap();
    assert!(rebuilt.is_spatial());
    assert!(rebuilt.column("region").is_none());
}

/// Writing a non-spatial table to a dataset is rejected up front.
#[tokio::test]
async fn test_dataset_write_rejects_non_spatial_table() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plain").to_str().unwrap().to_string();
    let ctx = SessionContext::new();

    let table = SpatialTable::try_new(
        vec![(
            "id".to_string(),
            TableColumn::Attribute(Arc::new(Int64Array::from(vec![1]))),
        )],
        None,
    )
    .unwrap();

    let result = write_spatial_dataset(&ctx, &table, &path, &DatasetWriteOptions::default()).await;
    assert!(matches!(result, Err(SpatialIoError::NotSpatial)));
}

/// Geometry columns cannot be partition keys.
#[tokio::test]
async fn test_geometry_partition_column_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stations").to_str().unwrap().to_string();
    let ctx = SessionContext::new();

    let options = DatasetWriteOptions {
        partition_columns: vec!["geometry".to_string()],
        metadata: MetadataOptions::default(),
    };
    let result = write_spatial_dataset(&ctx, &stations_table(), &path, &options).await;
    assert!(matches!(
        result,
        Err(SpatialIoError::InvalidPartitionColumn { .. })
    ));
}

/// Opening an empty directory is an explicit error, not a silent empty table.
#[tokio::test]
async fn test_open_empty_dataset_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().to_str().unwrap().to_string();
    let ctx = SessionContext::new();

    let result = SpatialDataset::open(&ctx, &path, &DatasetReadOptions::default()).await;
    assert!(matches!(result, Err(SpatialIoError::EmptyDataset { .. })));
}
