//! Writing finished layers to disk.
//!
//! Nothing here rolls back: if writing fails halfway, the partial file stays where it is.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use geojson::{Feature, FeatureCollection, Geometry as GeoJsonGeometry};
use log::info;
use serde_json::Value as JsonValue;

use crate::error::{GeoJoinError, Result};
use crate::geometry::to_wkt;
use crate::layer::Layer;

/// Writes a layer as GeoJSON if `path` ends in `.geojson` or `.json`, and as CSV otherwise.
/// `geometry_column` only applies to CSV.
pub fn write_layer(layer: &Layer, path: &Path, geometry_column: Option<&str>) -> Result<()> {
    let is_geojson = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("geojson") || ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if is_geojson {
        write_geojson(layer, path)
    } else {
        write_csv(layer, path, geometry_column)
    }
}

/// Writes every attribute column, then the geometry as WKT under `geometry_column` if given.
/// Nulls become empty fields.
pub fn write_csv(layer: &Layer, path: &Path, geometry_column: Option<&str>) -> Result<()> {
    let file = File::create(path).map_err(|e| GeoJoinError::io(path, e))?;
    write_csv_to(layer, file, geometry_column)?;
    info!("Wrote {} rows to {}", layer.len(), path.display());
    Ok(())
}

/// CSV serialisation into any writer.
pub fn write_csv_to<W: Write>(layer: &Layer, out: W, geometry_column: Option<&str>) -> Result<()> {
    if let Some(column) = geometry_column {
        if layer.column_index(column).is_some() {
            return Err(GeoJoinError::DuplicateColumn(column.to_string()));
        }
    }

    let mut writer = csv::Writer::from_writer(out);
    let mut header: Vec<&str> = layer.columns().iter().map(String::as_str).collect();
    header.extend(geometry_column);
    writer.write_record(&header)?;

    for record in layer.records() {
        let mut row: Vec<String> = record
            .values
            .iter()
            .map(|v| v.clone().unwrap_or_default())
            .collect();
        if geometry_column.is_some() {
            row.push(to_wkt(&record.geometry));
        }
        writer.write_record(&row)?;
    }
    writer.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Writes a FeatureCollection. Attributes become string properties, nulls become JSON null.
pub fn write_geojson(layer: &Layer, path: &Path) -> Result<()> {
    let feature_collection = to_feature_collection(layer);
    let file = File::create(path).map_err(|e| GeoJoinError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, &feature_collection)?;
    writer.flush().map_err(|e| GeoJoinError::io(path, e))?;
    info!("Wrote {} features to {}", layer.len(), path.display());
    Ok(())
}

pub fn to_feature_collection(layer: &Layer) -> FeatureCollection {
    let features = layer
        .records()
        .iter()
        .map(|record| {
            let properties: serde_json::Map<String, JsonValue> = layer
                .columns()
                .iter()
                .zip(&record.values)
                .map(|(column, value)| {
                    let value = match value {
                        Some(v) => JsonValue::String(v.clone()),
                        None => JsonValue::Null,
                    };
                    (column.clone(), value)
                })
                .collect();
            Feature {
                bbox: None,
                geometry: Some(GeoJsonGeometry::new(geojson::Value::from(&record.geometry))),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}
