//! In-memory model for spatial tables.
//!
//! A [`SpatialTable`] is an ordered set of named, equal-length columns where
//! zero or more columns hold geometry values and at most one is designated
//! the *primary* geometry column. Attribute (non-geometry) columns are plain
//! Arrow arrays; geometry columns carry their values as `geo-types`
//! geometries together with an optional [`Crs`].
//!
//! Whether a column is geometry is an explicit per-column tag fixed at
//! construction time ([`TableColumn`]), not something inferred by scanning
//! values.

use arrow_array::ArrayRef;
use arrow_array::UInt64Array;
use geo::BoundingRect;
use geo_types::Geometry;

use crate::crs::Crs;
use crate::error::{GeoTableError, Result, TableError};

/// A column of geometry values sharing one coordinate reference system.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryColumn {
    crs: Option<Crs>,
    geoms: Vec<Option<Geometry<f64>>>,
}

impl GeometryColumn {
    /// Create a geometry column from values and an optional CRS.
    #[must_use]
    pub fn new(geoms: Vec<Option<Geometry<f64>>>, crs: Option<Crs>) -> Self {
        Self { crs, geoms }
    }

    /// The column's coordinate reference system, if one is defined.
    #[must_use]
    pub fn crs(&self) -> Option<&Crs> {
        self.crs.as_ref()
    }

    /// The geometry values, nulls included.
    #[must_use]
    pub fn geoms(&self) -> &[Option<Geometry<f64>>] {
        &self.geoms
    }

    /// Number of values in the column, nulls included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.geoms.len()
    }

    /// Returns true when the column holds no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.geoms.is_empty()
    }

    /// Bounding box `[xmin, ymin, xmax, ymax]` over all non-null values.
    ///
    /// Returns `None` when the column holds no non-null geometry (an empty
    /// bbox has no meaningful extent and is omitted from metadata).
    #[must_use]
    pub fn bounding_box(&self) -> Option<[f64; 4]> {
        let mut bbox: Option<[f64; 4]> = None;
        for geom in self.geoms.iter().flatten() {
            let Some(rect) = geom.bounding_rect() else {
                continue;
            };
            let (min, max) = (rect.min(), rect.max());
            bbox = Some(match bbox {
                None => [min.x, min.y, max.x, max.y],
                Some([xmin, ymin, xmax, ymax]) => [
                    xmin.min(min.x),
                    ymin.min(min.y),
                    xmax.max(max.x),
                    ymax.max(max.y),
                ],
            });
        }
        bbox
    }

    /// Select rows by index, preserving the CRS.
    #[must_use]
    pub fn take(&self, indices: &[u64]) -> Self {
        let geoms = indices
            .iter()
            .map(|&i| self.geoms[i as usize].clone())
            .collect();
        Self {
            crs: self.crs.clone(),
            geoms,
        }
    }
}

/// Per-column type tag: geometry or plain attribute data.
///
/// The tag is attached when the table is constructed, so downstream code
/// dispatches on it directly instead of probing value types at runtime.
#[derive(Debug, Clone)]
pub enum TableColumn {
    /// A geometry column with its CRS and values
    Geometry(GeometryColumn),
    /// A plain attribute column held as an Arrow array
    Attribute(ArrayRef),
}

impl TableColumn {
    /// Number of rows in the column.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            TableColumn::Geometry(col) => col.len(),
            TableColumn::Attribute(array) => array.len(),
        }
    }

    /// Returns true when the column holds no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true for geometry columns.
    #[must_use]
    pub fn is_geometry(&self) -> bool {
        matches!(self, TableColumn::Geometry(_))
    }
}

/// A table of named, equal-length columns with optional geometry typing.
///
/// Invariant: when a primary geometry column is designated, it names one of
/// the table's geometry columns.
#[derive(Debug, Clone)]
pub struct SpatialTable {
    columns: Vec<(String, TableColumn)>,
    primary_geometry: Option<String>,
    num_rows: usize,
}

impl SpatialTable {
    /// Build a table from named columns and an optional primary geometry
    /// column designation.
    ///
    /// # Errors
    ///
    /// Returns a [`TableError`] if column lengths differ, a name is
    /// duplicated, or `primary_geometry` does not name a geometry column.
    pub fn try_new(
        columns: Vec<(String, TableColumn)>,
        primary_geometry: Option<String>,
    ) -> Result<Self> {
        let num_rows = columns.first().map_or(0, |(_, col)| col.len());
        for (name, column) in &columns {
            if column.len() != num_rows {
                return Err(GeoTableError::Table(TableError::RowCountMismatch {
                    column: name.clone(),
                    expected: num_rows,
                    actual: column.len(),
                }));
            }
            if columns.iter().filter(|(other, _)| other == name).count() > 1 {
                return Err(GeoTableError::Table(TableError::DuplicateColumn {
                    column: name.clone(),
                }));
            }
        }

        if let Some(primary) = &primary_geometry {
            let is_geom = columns
                .iter()
                .any(|(name, col)| name == primary && col.is_geometry());
            if !is_geom {
                return Err(GeoTableError::Table(TableError::PrimaryNotGeometry {
                    column: primary.clone(),
                }));
            }
        }

        Ok(Self {
            columns,
            primary_geometry,
            num_rows,
        })
    }

    /// Number of rows in the table.
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    /// Number of columns in the table.
    #[must_use]
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// The named columns, in table order.
    #[must_use]
    pub fn columns(&self) -> &[(String, TableColumn)] {
        &self.columns
    }

    /// Column names in table order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    /// Look up a column by name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&TableColumn> {
        self.columns
            .iter()
            .find(|(col_name, _)| col_name == name)
            .map(|(_, col)| col)
    }

    /// The geometry columns, in table order.
    pub fn geometry_columns(&self) -> impl Iterator<Item = (&str, &GeometryColumn)> {
        self.columns.iter().filter_map(|(name, col)| match col {
            TableColumn::Geometry(geom) => Some((name.as_str(), geom)),
            TableColumn::Attribute(_) => None,
        })
    }

    /// The designated primary geometry column name, if any.
    #[must_use]
    pub fn primary_geometry(&self) -> Option<&str> {
        self.primary_geometry.as_deref()
    }

    /// The primary geometry column itself, if one is designated.
    #[must_use]
    pub fn primary_geometry_column(&self) -> Option<&GeometryColumn> {
        let name = self.primary_geometry.as_deref()?;
        match self.column(name)? {
            TableColumn::Geometry(geom) => Some(geom),
            TableColumn::Attribute(_) => None,
        }
    }

    /// Returns true when the table has at least one geometry column and a
    /// designated primary geometry column.
    #[must_use]
    pub fn is_spatial(&self) -> bool {
        self.primary_geometry.is_some() && self.geometry_columns().next().is_some()
    }

    /// Select rows by index, producing a new table with identical schema.
    ///
    /// # Errors
    ///
    /// Returns an error if the Arrow `take` kernel fails for an attribute
    /// column (e.g. an index out of bounds).
    pub fn take(&self, indices: &[u64]) -> Result<Self> {
        let index_array = UInt64Array::from(indices.to_vec());
        let mut columns = Vec::with_capacity(self.columns.len());
        for (name, column) in &self.columns {
            let taken = match column {
                TableColumn::Geometry(geom) => TableColumn::Geometry(geom.take(indices)),
                TableColumn::Attribute(array) => {
                    TableColumn::Attribute(arrow::compute::take(array, &index_array, None)?)
                },
            };
            columns.push((name.clone(), taken));
        }
        Ok(Self {
            columns,
            primary_geometry: self.primary_geometry.clone(),
            num_rows: indices.len(),
        })
    }
}
