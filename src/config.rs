//! Pipeline configuration, loaded from TOML.
//!
//! The defaults reproduce the NYC Open Data pipelines: file locations under `data/`, the CRS
//! each source publishes in, join radii and the dedup key candidates for each source. A config
//! file only needs the sections it wants to change.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::crs::Crs;
use crate::dedup::{DedupKey, DEFAULT_MIN_DISTINCT};
use crate::error::{GeoJoinError, Result};
use crate::join::NearestJoin;
use crate::load::{GeometrySource, LayerSource};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub curb: CurbConfig,
    pub signals: SignalsConfig,
    pub speed_humps: SpeedHumpsConfig,
}

/// Curb segments enriched with the nearest loading zone, parking meter and truck route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurbConfig {
    pub base: LayerSource,
    /// All joins run in this CRS. It must be projected.
    pub working_crs: Crs,
    pub output_crs: Crs,
    /// Applied in order, each to the result of the previous one.
    pub joins: Vec<JoinLayerConfig>,
    pub output: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geometry_column: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinLayerConfig {
    pub layer: LayerSource,
    pub prefix: String,
    /// In working CRS units.
    pub max_distance: f64,
    pub distance_column: String,
}

impl JoinLayerConfig {
    pub fn nearest_join(&self) -> NearestJoin {
        NearestJoin {
            prefix: self.prefix.clone(),
            max_distance: self.max_distance,
            distance_column: self.distance_column.clone(),
        }
    }
}

/// Several point layers, each deduplicated on its own and then stacked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalsConfig {
    pub sources: Vec<SignalSourceConfig>,
    /// Column that records which source a row came from.
    pub source_column: String,
    /// Threshold for picking a key column at run time. Sources with an explicit `key` ignore it.
    pub min_distinct: usize,
    pub output_crs: Crs,
    pub output: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geometry_column: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalSourceConfig {
    pub layer: LayerSource,
    /// Value written into the source column.
    pub source: String,
    /// Explicit dedup key. Takes precedence over `key_candidates`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default)]
    pub key_candidates: Vec<String>,
}

impl SignalSourceConfig {
    pub fn dedup_key(&self, min_distinct: usize) -> DedupKey {
        match &self.key {
            Some(column) => DedupKey::Column(column.clone()),
            None => DedupKey::FirstDistinct {
                candidates: self.key_candidates.clone(),
                min_distinct,
            },
        }
    }
}

/// Adds `longitude`/`latitude` columns taken from each row's geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeedHumpsConfig {
    pub layer: LayerSource,
    pub output: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geometry_column: Option<String>,
}

fn source(name: &str, path: &str, crs: Crs, geometry: GeometrySource) -> LayerSource {
    LayerSource {
        name: name.to_string(),
        path: PathBuf::from(path),
        crs,
        geometry,
        keep_invalid: false,
        keep_wkt_column: false,
    }
}

fn wkt(column: &str) -> GeometrySource {
    GeometrySource::Wkt {
        wkt: column.to_string(),
    }
}

fn xy(x: &str, y: &str) -> GeometrySource {
    GeometrySource::Xy {
        x: x.to_string(),
        y: y.to_string(),
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for CurbConfig {
    fn default() -> Self {
        let join = |layer, prefix: &str, max_distance, distance_column: &str| JoinLayerConfig {
            layer,
            prefix: prefix.to_string(),
            max_distance,
            distance_column: distance_column.to_string(),
        };
        Self {
            base: source("curbs", "data/nyc_curbs.csv", Crs::WGS84, wkt("the_geom")),
            working_crs: Crs::NY_STATE_PLANE,
            output_crs: Crs::WGS84,
            joins: vec![
                join(
                    source(
                        "loading_zones",
                        "data/loading_zones.csv",
                        Crs::NY_STATE_PLANE,
                        xy("sign_x_coord", "sign_y_coord"),
                    ),
                    "loading",
                    15.0,
                    "dist_to_loading",
                ),
                // Meter positions are noisier (GPS, sidewalk offset), so the radius is wider
                join(
                    source(
                        "parking_meters",
                        "data/parking_meters.csv",
                        Crs::WGS84,
                        xy("Longitude", "Latitude"),
                    ),
                    "meter",
                    30.0,
                    "dist_to_meter",
                ),
                join(
                    source(
                        "truck_routes",
                        "data/truck_routes.csv",
                        Crs::WGS84,
                        wkt("the_geom"),
                    ),
                    "truck",
                    15.0,
                    "dist_to_truck",
                ),
            ],
            output: PathBuf::from("data/on_street_curb_management.csv"),
            geometry_column: Some("geometry".to_string()),
        }
    }
}

impl Default for SignalsConfig {
    fn default() -> Self {
        let signal = |layer, tag: &str, candidates: &[&str]| SignalSourceConfig {
            layer,
            source: tag.to_string(),
            key: None,
            key_candidates: strings(candidates),
        };
        Self {
            sources: vec![
                signal(
                    source(
                        "accessible_pedestrian_signals",
                        "data/signals_markings_signs/accessible_pedestrian_signals.csv",
                        Crs::WGS84,
                        xy("POINT_X", "POINT_Y"),
                    ),
                    "accessible_ped_signal",
                    &["F_id", "OBJECTID"],
                ),
                signal(
                    source(
                        "street_sign_work_orders",
                        "data/signals_markings_signs/street_sign_work_orders.csv",
                        Crs::WGS84,
                        xy("sign_x_coord", "sign_y_coord"),
                    ),
                    "street_sign",
                    &["SIGNID", "sign_id"],
                ),
                signal(
                    source(
                        "traffic_signals",
                        "data/signals_markings_signs/traffic_signals.csv",
                        Crs::WGS84,
                        xy("X", "Y"),
                    ),
                    "traffic_signal",
                    &["F_id"],
                ),
            ],
            source_column: "source".to_string(),
            min_distinct: DEFAULT_MIN_DISTINCT,
            output_crs: Crs::WGS84,
            output: PathBuf::from(
                "data/signals_markings_signs/signals_signs_markings_combined.csv",
            ),
            geometry_column: Some("geometry".to_string()),
        }
    }
}

impl Default for SpeedHumpsConfig {
    fn default() -> Self {
        Self {
            // Every row is written back, with its original the_geom text. Rows whose geometry
            // can't be read get empty longitude/latitude.
            layer: LayerSource {
                keep_invalid: true,
                keep_wkt_column: true,
                ..source("speed_humps", "data/speed_humps.csv", Crs::WGS84, wkt("the_geom"))
            },
            output: PathBuf::from("data/speed_humps_with_latlon.csv"),
            geometry_column: None,
        }
    }
}

impl PipelineConfig {
    /// Reads a TOML file. Sections missing from the file keep their defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| GeoJoinError::io(path, e))?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| GeoJoinError::Config(e.to_string()))
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| GeoJoinError::Config(e.to_string()))
    }
}
