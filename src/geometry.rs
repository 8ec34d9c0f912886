//! WKT parsing and serialisation, plus the small coordinate helpers the loader needs.

use std::str::FromStr;

use geo::{Coord, CoordsIter, Geometry};
use wkt::{ToWkt, Wkt};

use crate::error::{GeoJoinError, Result};

/// Parses a WKT string into a geometry. The CRS is whatever the caller says it is; nothing is
/// inferred from the text.
pub fn parse_wkt(text: &str) -> Result<Geometry<f64>> {
    let text = text.trim();
    if text.is_empty() {
        return Err(GeoJoinError::Parse("empty WKT".to_string()));
    }
    let parsed = Wkt::<f64>::from_str(text)
        .map_err(|e| GeoJoinError::Parse(format!("{}: {}", e, text)))?;
    Geometry::try_from(parsed).map_err(|e| GeoJoinError::Parse(format!("{}: {}", e, text)))
}

pub fn to_wkt(geometry: &Geometry<f64>) -> String {
    geometry.wkt_string()
}

/// The first coordinate of the geometry: the first point of the first ring or segment.
///
/// This is deliberately not a centroid. For a multipolygon it is the first vertex of the first
/// polygon's exterior ring.
pub fn representative_coord(geometry: &Geometry<f64>) -> Option<Coord<f64>> {
    geometry.coords_iter().next()
}

/// Parses a pair of textual X/Y (or lon/lat) fields. Empty, non-numeric and non-finite values
/// are rejected rather than defaulted.
pub fn parse_coordinate_pair(x: &str, y: &str) -> Result<Coord<f64>> {
    Ok(Coord {
        x: parse_ordinate(x)?,
        y: parse_ordinate(y)?,
    })
}

fn parse_ordinate(raw: &str) -> Result<f64> {
    let raw = raw.trim();
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(GeoJoinError::Parse(format!("invalid coordinate '{}'", raw))),
    }
}
