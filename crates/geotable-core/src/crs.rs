//! Coordinate reference system carrier.
//!
//! CRS parsing and coordinate transformation are out of scope for this
//! project; a CRS is carried opaquely as its canonical Well-Known Text (WKT)
//! representation, exactly as it will be written into the geo metadata
//! document. WKB geometry payloads carry no CRS of their own, so this string
//! is the only place the reference system survives a round trip.

use std::fmt;

/// An opaque coordinate reference system, held as Well-Known Text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Crs {
    wkt: String,
}

impl Crs {
    /// Create a CRS from its Well-Known Text representation.
    ///
    /// The text is stored verbatim; no parsing or normalization is applied.
    #[must_use]
    pub fn from_wkt(wkt: impl Into<String>) -> Self {
        Self { wkt: wkt.into() }
    }

    /// The Well-Known Text representation of this CRS.
    #[must_use]
    pub fn as_wkt(&self) -> &str {
        &self.wkt
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.wkt)
    }
}

impl From<&str> for Crs {
    fn from(wkt: &str) -> Self {
        Self::from_wkt(wkt)
    }
}

impl From<String> for Crs {
    fn from(wkt: String) -> Self {
        Self::from_wkt(wkt)
    }
}
