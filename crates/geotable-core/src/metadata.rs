//! The geo metadata document: the on-disk contract describing geometry
//! columns inside an otherwise plain columnar file.
//!
//! The document is JSON, stored under the reserved file-level key
//! [`GEO_METADATA_KEY`]. It records the primary geometry column, one
//! descriptor per geometry column (CRS text, encoding, bounding box), and
//! provenance fields. The document read back from storage is foreign input:
//! [`validate`] runs an explicit structural pass over the generic JSON value
//! before any field is trusted, and is the sole gate between on-disk metadata
//! and geometry reconstruction.

use std::collections::BTreeMap;

use log::info;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{MetadataError, Result};
use crate::table::SpatialTable;

/// Reserved file/dataset-level metadata key holding the geo document.
pub const GEO_METADATA_KEY: &str = "geo";

/// Metadata schema version written by this library.
pub const SCHEMA_VERSION: &str = "0.1.0";

/// The only geometry encoding currently supported.
pub const WKB_ENCODING: &str = "WKB";

const CREATOR_LIBRARY: &str = "geotable";

/// Free-form provenance fields recorded at write time.
///
/// None of these are validated; they are informational tags for consumers of
/// the written file.
#[derive(Debug, Clone)]
pub struct MetadataOptions {
    /// Producer-defined dataset version tag
    pub version: String,
    /// Data license identifier
    pub licence: String,
    /// Producing organization or system identifier
    pub source: String,
}

impl Default for MetadataOptions {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            licence: "unknown".to_string(),
            source: CREATOR_LIBRARY.to_string(),
        }
    }
}

/// Per-geometry-column descriptor inside the geo document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometryColumnMetadata {
    /// CRS Well-Known Text; serialized as JSON null when the column has none
    pub crs: Option<String>,
    /// Geometry encoding; always `"WKB"` when written by this library
    pub encoding: String,
    /// `[xmin, ymin, xmax, ymax]` over the written values; omitted when the
    /// column holds no non-null geometry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<[f64; 4]>,
}

/// Producing-library identifier recorded in the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Creator {
    /// Library name
    pub library: String,
}

/// The geo metadata document.
///
/// Field order is fixed by the struct declaration and `columns` is a
/// `BTreeMap`, so serializing the same table twice yields byte-identical
/// JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoMetadata {
    /// Name of the default geometry column; omitted when the source table
    /// had no designated geometry column
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_column: Option<String>,
    /// One descriptor per geometry column
    pub columns: BTreeMap<String, GeometryColumnMetadata>,
    /// Producer-defined dataset version tag
    #[serde(default)]
    pub version: Option<String>,
    /// Data license identifier
    #[serde(default)]
    pub licence: Option<String>,
    /// Producing organization or system identifier
    #[serde(default)]
    pub source: Option<String>,
    /// Metadata schema version
    #[serde(default)]
    pub schema_version: Option<String>,
    /// Producing library identifier
    #[serde(default)]
    pub creator: Option<Creator>,
}

impl GeoMetadata {
    /// Derive a geo metadata document from a spatial table.
    ///
    /// One descriptor is built per geometry column: its CRS as Well-Known
    /// Text (null when undefined), the fixed `"WKB"` encoding, and a
    /// bounding box over the column's values. `primary_column` is copied
    /// verbatim from the table's designation and may be absent when the
    /// table has no geometry columns; enforcement of a usable primary
    /// happens at validation/assembly time, not here.
    ///
    /// Emits an informational advisory naming the source, version, and
    /// licence being written.
    #[must_use]
    pub fn from_table(table: &SpatialTable, options: &MetadataOptions) -> Self {
        let mut columns = BTreeMap::new();
        for (name, geom) in table.geometry_columns() {
            columns.insert(
                name.to_string(),
                GeometryColumnMetadata {
                    crs: geom.crs().map(|crs| crs.as_wkt().to_string()),
                    encoding: WKB_ENCODING.to_string(),
                    bbox: geom.bounding_box(),
                },
            );
        }

        info!(
            "Writing geo metadata: source={}, version={}, licence={}",
            options.source, options.version, options.licence
        );

        Self {
            primary_column: table.primary_geometry().map(str::to_string),
            columns,
            version: Some(options.version.clone()),
            licence: Some(options.licence.clone()),
            source: Some(options.source.clone()),
            schema_version: Some(SCHEMA_VERSION.to_string()),
            creator: Some(Creator {
                library: CREATOR_LIBRARY.to_string(),
            }),
        }
    }

    /// Serialize the document to its canonical JSON text.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse and validate a geo metadata document from JSON text.
    ///
    /// The text is first parsed into a generic JSON value, structurally
    /// validated with [`validate`], and only then deserialized into the
    /// typed document. Any failure means the metadata cannot be trusted and
    /// no geometry reconstruction should be attempted.
    ///
    /// # Errors
    ///
    /// Returns a [`MetadataError`] for unparseable text or any structural
    /// violation.
    pub fn parse(text: &str) -> std::result::Result<Self, MetadataError> {
        let value: Value = serde_json::from_str(text).map_err(|_| MetadataError::Malformed)?;
        validate(&value)?;
        serde_json::from_value(value).map_err(|_| MetadataError::Malformed)
    }

    /// Descriptor for a named geometry column, if declared.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&GeometryColumnMetadata> {
        self.columns.get(name)
    }

    /// Names of the declared geometry columns, in deterministic order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }
}

/// Validate the structure of a (possibly foreign or corrupted) geo metadata
/// document.
///
/// Checks run in a fixed order, first failure wins:
/// 1. the document must be a JSON object;
/// 2. the keys `primary_column` and `columns` must be present;
/// 3. every entry of `columns` must contain `crs` and `encoding`, and
///    `encoding` must equal `"WKB"`.
///
/// Absence of an error is the success signal.
///
/// # Errors
///
/// Returns the [`MetadataError`] corresponding to the first violated rule.
pub fn validate(document: &Value) -> std::result::Result<(), MetadataError> {
    let Value::Object(map) = document else {
        return Err(MetadataError::Malformed);
    };

    for key in ["primary_column", "columns"] {
        if !map.contains_key(key) {
            return Err(MetadataError::MissingName {
                name: key.to_string(),
            });
        }
    }

    let Value::Object(columns) = &map["columns"] else {
        return Err(MetadataError::Malformed);
    };

    for (column, descriptor) in columns {
        let Value::Object(descriptor) = descriptor else {
            return Err(MetadataError::Malformed);
        };
        for item in ["crs", "encoding"] {
            if !descriptor.contains_key(item) {
                return Err(MetadataError::MissingItem {
                    item: item.to_string(),
                    column: column.clone(),
                });
            }
        }
        if descriptor["encoding"] != Value::String(WKB_ENCODING.to_string()) {
            return Err(MetadataError::UnsupportedEncoding);
        }
    }

    Ok(())
}
