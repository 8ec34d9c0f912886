//! Coordinate reference systems and reprojection of whole layers.
//!
//! Distance work (nearest-neighbour search, radius thresholds) only makes sense in a projected
//! CRS with linear units. Geographic degrees are not locally Euclidean, so every distance-based
//! operation goes through [`require_projected`] first.

use std::fmt;
use std::str::FromStr;

use geo::{Coord, MapCoords};
use log::{debug, warn};
use proj::Proj;
use serde::{Deserialize, Serialize};

use crate::error::{GeoJoinError, Result};
use crate::layer::{Layer, Record};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CrsKind {
    /// Angular units (degrees). Used for storage and exchange.
    Geographic,
    /// Linear units (feet or metres). Used for distance computation.
    Projected,
}

/// A CRS identified by its EPSG code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Crs(u32);

// (EPSG code, kind). Anything not listed here is treated as unrecognised.
const KNOWN_CRS: &[(u32, CrsKind)] = &[
    (4326, CrsKind::Geographic), // WGS 84
    (4269, CrsKind::Geographic), // NAD83
    (2263, CrsKind::Projected),  // NAD83 / New York Long Island (ftUS)
    (6539, CrsKind::Projected),  // NAD83(2011) / New York Long Island (ftUS)
    (3857, CrsKind::Projected),  // Web Mercator
    (32618, CrsKind::Projected), // WGS 84 / UTM zone 18N
];

impl Crs {
    pub const WGS84: Crs = Crs(4326);
    /// NY State Plane, Long Island zone. Units are US survey feet.
    pub const NY_STATE_PLANE: Crs = Crs(2263);

    pub fn epsg(code: u32) -> Crs {
        Crs(code)
    }

    pub fn code(&self) -> u32 {
        self.0
    }

    /// `None` if this CRS isn't one we know how to classify.
    pub fn kind(&self) -> Option<CrsKind> {
        KNOWN_CRS
            .iter()
            .find(|(code, _)| *code == self.0)
            .map(|(_, kind)| *kind)
    }

    pub fn is_projected(&self) -> bool {
        self.kind() == Some(CrsKind::Projected)
    }

    fn require_known(&self) -> Result<CrsKind> {
        self.kind()
            .ok_or_else(|| GeoJoinError::Projection(format!("unrecognised CRS {}", self)))
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "EPSG:{}", self.0)
    }
}

impl FromStr for Crs {
    type Err = GeoJoinError;

    fn from_str(s: &str) -> Result<Crs> {
        let trimmed = s.trim();
        let code = trimmed
            .get(..5)
            .filter(|prefix| prefix.eq_ignore_ascii_case("EPSG:"))
            .map(|_| &trimmed[5..])
            .unwrap_or(trimmed);
        code.parse::<u32>()
            .map(Crs)
            .map_err(|_| GeoJoinError::Projection(format!("can't parse CRS '{}'", s)))
    }
}

impl TryFrom<String> for Crs {
    type Error = GeoJoinError;

    fn try_from(value: String) -> Result<Crs> {
        value.parse()
    }
}

impl From<Crs> for String {
    fn from(crs: Crs) -> String {
        crs.to_string()
    }
}

/// Fails unless `crs` is a recognised projected CRS.
pub fn require_projected(crs: Crs) -> Result<()> {
    match crs.require_known()? {
        CrsKind::Projected => Ok(()),
        CrsKind::Geographic => Err(GeoJoinError::Projection(format!(
            "{} is geographic; distance operations need a projected CRS",
            crs
        ))),
    }
}

/// Transforms every coordinate of every record into `target`. The schema is unchanged.
///
/// An unknown CRS, or one PROJ can't build a transformation for, is fatal. A record with a
/// coordinate PROJ can't transform (e.g. a latitude past the pole) is dropped and logged.
pub fn reproject(layer: &Layer, target: Crs) -> Result<Layer> {
    let source = layer.crs();
    source.require_known()?;
    target.require_known()?;
    if source == target {
        return Ok(layer.clone());
    }

    debug!(
        "Reprojecting {} ({} records) from {} to {}",
        layer.name(),
        layer.len(),
        source,
        target
    );
    let proj = Proj::new_known_crs(&source.to_string(), &target.to_string(), None)
        .map_err(|e| GeoJoinError::Projection(format!("{} -> {}: {}", source, target, e)))?;

    let mut records = Vec::with_capacity(layer.len());
    let mut dropped = 0;
    for (row, record) in layer.records().iter().enumerate() {
        let transformed = record.geometry.try_map_coords(|c: Coord<f64>| {
            match proj.convert((c.x, c.y)) {
                Ok((x, y)) if x.is_finite() && y.is_finite() => Ok(Coord { x, y }),
                Ok((x, y)) => Err(format!("({}, {}) became ({}, {})", c.x, c.y, x, y)),
                Err(e) => Err(format!("({}, {}): {}", c.x, c.y, e)),
            }
        });
        match transformed {
            Ok(geometry) => records.push(Record {
                values: record.values.clone(),
                geometry,
            }),
            Err(err) => {
                debug!("{}: dropping record {}, can't transform {}", layer.name(), row, err);
                dropped += 1;
            }
        }
    }
    if dropped > 0 {
        warn!(
            "{}: dropped {} of {} records that couldn't be transformed from {} to {}",
            layer.name(),
            dropped,
            layer.len(),
            source,
            target
        );
    }

    Ok(layer.with_crs(target, records))
}
