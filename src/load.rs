//! Building layers from CSV files.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use geo::{Geometry, GeometryCollection, Point};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::crs::Crs;
use crate::error::{GeoJoinError, Result};
use crate::geometry::{parse_coordinate_pair, parse_wkt};
use crate::layer::{Layer, Record};

/// Index columns left behind by earlier spatial joins in other tools. Never carried forward.
const ARTIFACT_COLUMNS: &[&str] = &["index_right"];

/// Where a row's geometry comes from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GeometrySource {
    /// A WKT column. It's consumed into the geometry and not kept as an attribute unless
    /// [`LayerSource::keep_wkt_column`] is set.
    Wkt { wkt: String },
    /// A pair of numeric columns, X/longitude first. Both stay as attributes.
    Xy { x: String, y: String },
}

/// Everything needed to load one input file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayerSource {
    pub name: String,
    pub path: PathBuf,
    /// The CRS the file's coordinates are expressed in.
    pub crs: Crs,
    pub geometry: GeometrySource,
    /// Keep rows whose geometry can't be read, with an empty geometry, instead of dropping them.
    #[serde(default)]
    pub keep_invalid: bool,
    /// Keep the WKT source column as an attribute, in its original position and text.
    #[serde(default)]
    pub keep_wkt_column: bool,
}

/// Row counts before and after cleaning.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoadStats {
    pub read: usize,
    pub kept: usize,
    pub dropped: usize,
    /// Rows kept with an empty geometry. Only non-zero with [`LayerSource::keep_invalid`].
    pub empty: usize,
}

/// Loads a CSV file as a layer. Rows with a missing or unparseable coordinate pair, or
/// unparseable WKT, are dropped and counted; they never turn into default coordinates.
/// With `keep_invalid` they're kept with an empty geometry instead.
pub fn load_layer(source: &LayerSource) -> Result<(Layer, LoadStats)> {
    info!("Loading {} from {}", source.name, source.path.display());
    let file = File::open(&source.path).map_err(|e| GeoJoinError::io(&source.path, e))?;
    load_layer_from_reader(source, file)
}

/// Same as [`load_layer`], but reading from any byte stream. `source.path` is only used for
/// messages.
pub fn load_layer_from_reader<R: Read>(
    source: &LayerSource,
    reader: R,
) -> Result<(Layer, LoadStats)> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let find = |column: &str| -> Result<usize> {
        headers
            .iter()
            .position(|h| h == column)
            .ok_or_else(|| GeoJoinError::MissingColumn {
                layer: source.name.clone(),
                column: column.to_string(),
            })
    };
    let (extract, skip): (Extract, Option<usize>) = match &source.geometry {
        GeometrySource::Wkt { wkt } => {
            let idx = find(wkt)?;
            let skip = if source.keep_wkt_column { None } else { Some(idx) };
            (Extract::Wkt(idx), skip)
        }
        GeometrySource::Xy { x, y } => (Extract::Xy(find(x)?, find(y)?), None),
    };

    // Header positions that survive as attributes, in file order
    let kept: Vec<usize> = (0..headers.len())
        .filter(|idx| Some(*idx) != skip && !ARTIFACT_COLUMNS.contains(&headers[*idx].as_str()))
        .collect();
    let columns: Vec<String> = kept.iter().map(|idx| headers[*idx].clone()).collect();

    let mut stats = LoadStats::default();
    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        stats.read += 1;

        let geometry = match extract.geometry(&row) {
            Ok(geometry) => geometry,
            Err(err) if source.keep_invalid => {
                debug!("{}: row {} has no usable geometry: {}", source.name, stats.read, err);
                stats.empty += 1;
                Geometry::GeometryCollection(GeometryCollection::new_from(Vec::new()))
            }
            Err(err) => {
                debug!("{}: dropping row {}: {}", source.name, stats.read, err);
                stats.dropped += 1;
                continue;
            }
        };
        let values = kept
            .iter()
            .map(|idx| row.get(*idx).filter(|v| !v.is_empty()).map(|v| v.to_string()))
            .collect();
        records.push(Record { values, geometry });
        stats.kept += 1;
    }

    if stats.empty > 0 {
        info!(
            "{}: read {} rows, kept {}, {} of them with missing or invalid geometry",
            source.name, stats.read, stats.kept, stats.empty
        );
    } else {
        info!(
            "{}: read {} rows, kept {}, dropped {} with missing or invalid geometry",
            source.name, stats.read, stats.kept, stats.dropped
        );
    }
    let layer = Layer::new(source.name.clone(), source.crs, columns, records)?;
    Ok((layer, stats))
}

/// Convenience for callers that only have a path.
pub fn layer_source(
    name: &str,
    path: impl AsRef<Path>,
    crs: Crs,
    geometry: GeometrySource,
) -> LayerSource {
    LayerSource {
        name: name.to_string(),
        path: path.as_ref().to_path_buf(),
        crs,
        geometry,
        keep_invalid: false,
        keep_wkt_column: false,
    }
}

enum Extract {
    Wkt(usize),
    Xy(usize, usize),
}

impl Extract {
    fn geometry(&self, row: &csv::StringRecord) -> Result<Geometry<f64>> {
        match self {
            Extract::Wkt(idx) => parse_wkt(row.get(*idx).unwrap_or("")),
            Extract::Xy(x, y) => {
                let coord =
                    parse_coordinate_pair(row.get(*x).unwrap_or(""), row.get(*y).unwrap_or(""))?;
                Ok(Geometry::Point(Point::from(coord)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn xy_source() -> LayerSource {
        layer_source(
            "loading",
            "loading_zones.csv",
            Crs::NY_STATE_PLANE,
            GeometrySource::Xy {
                x: "sign_x_coord".to_string(),
                y: "sign_y_coord".to_string(),
            },
        )
    }

    fn wkt_source() -> LayerSource {
        layer_source(
            "curbs",
            "nyc_curbs.csv",
            Crs::WGS84,
            GeometrySource::Wkt {
                wkt: "the_geom".to_string(),
            },
        )
    }

    #[test]
    fn test_drops_row_missing_x() {
        let csv = "id,sign_x_coord,sign_y_coord\n\
                   a,1000,2000\n\
                   b,,2100\n\
                   c,1200,2200\n";
        let (layer, stats) = load_layer_from_reader(&xy_source(), csv.as_bytes()).unwrap();
        assert_eq!(layer.len(), 2);
        assert_eq!(
            stats,
            LoadStats {
                read: 3,
                kept: 2,
                dropped: 1,
                empty: 0
            }
        );
        assert_eq!(layer.value(0, "id"), Some("a"));
        assert_eq!(layer.value(1, "id"), Some("c"));
        // X/Y stay as attributes
        assert_eq!(layer.value(1, "sign_x_coord"), Some("1200"));
        assert_eq!(layer.crs(), Crs::NY_STATE_PLANE);
    }

    #[test]
    fn test_wkt_column_becomes_geometry() {
        let csv = "the_geom,name,index_right\n\
                   \"MULTILINESTRING ((-73.99 40.73, -73.98 40.74))\",Broadway,3\n\
                   \"MULTILINESTRING ((oops))\",Bad,4\n\
                   ,Empty,5\n";
        let (layer, stats) = load_layer_from_reader(&wkt_source(), csv.as_bytes()).unwrap();
        assert_eq!(stats.read, 3);
        assert_eq!(stats.kept, 1);
        assert_eq!(stats.dropped, 2);
        assert_eq!(layer.columns(), &["name".to_string()]);
        assert_eq!(layer.value(0, "name"), Some("Broadway"));
        assert!(matches!(
            layer.records()[0].geometry,
            Geometry::MultiLineString(_)
        ));
    }

    #[test]
    fn test_keep_invalid_keeps_rows_and_source_text() {
        let source = LayerSource {
            keep_invalid: true,
            keep_wkt_column: true,
            ..wkt_source()
        };
        let csv = "the_geom,name\n\
                   \"POINT (-73.99 40.73)\",Broadway\n\
                   \"MULTILINESTRING ((oops))\",Bad\n";
        let (layer, stats) = load_layer_from_reader(&source, csv.as_bytes()).unwrap();
        assert_eq!(
            stats,
            LoadStats {
                read: 2,
                kept: 2,
                dropped: 0,
                empty: 1
            }
        );
        assert_eq!(layer.columns(), &["the_geom".to_string(), "name".to_string()]);
        assert_eq!(layer.value(1, "the_geom"), Some("MULTILINESTRING ((oops))"));
        assert_eq!(layer.value(1, "name"), Some("Bad"));
        match &layer.records()[1].geometry {
            Geometry::GeometryCollection(gc) => assert!(gc.0.is_empty()),
            other => panic!("Expected an empty collection, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_fields_are_null() {
        let csv = "id,note,sign_x_coord,sign_y_coord\n1,,10,20\n";
        let (layer, _) = load_layer_from_reader(&xy_source(), csv.as_bytes()).unwrap();
        assert_eq!(layer.value(0, "note"), None);
        assert_eq!(layer.records()[0].values[1], None);
    }

    #[test]
    fn test_missing_geometry_column_is_fatal() {
        let csv = "id,x,y\n1,10,20\n";
        assert!(matches!(
            load_layer_from_reader(&xy_source(), csv.as_bytes()),
            Err(GeoJoinError::MissingColumn { column, .. }) if column == "sign_x_coord"
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let source = layer_source(
            "nowhere",
            "/definitely/not/here.csv",
            Crs::WGS84,
            GeometrySource::Xy {
                x: "x".to_string(),
                y: "y".to_string(),
            },
        );
        assert!(matches!(load_layer(&source), Err(GeoJoinError::Io { .. })));
    }

    #[test]
    fn test_short_rows_are_tolerated() {
        let csv = "id,note,sign_x_coord,sign_y_coord\n1,n,10,20\n2\n";
        let (layer, stats) = load_layer_from_reader(&xy_source(), csv.as_bytes()).unwrap();
        assert_eq!(layer.len(), 1);
        assert_eq!(stats.dropped, 1);
    }
}
