//! The end-to-end pipelines: load, reproject, deduplicate or join, merge, export.

use std::path::PathBuf;

use log::info;

use crate::config::{CurbConfig, SignalsConfig, SpeedHumpsConfig};
use crate::crs::{reproject, require_projected, Crs};
use crate::dedup::deduplicate;
use crate::error::Result;
use crate::export::write_layer;
use crate::geometry::representative_coord;
use crate::join::{join_nearest, NearestJoin};
use crate::layer::Layer;
use crate::load::load_layer;
use crate::merge::{concat, tag_source};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineReport {
    pub rows_written: usize,
    pub output: PathBuf,
}

/// Joins each right-hand layer onto `base` in turn. Everything is moved into `working_crs`
/// first, so distances are in its units.
pub fn enrich_with_nearest(
    base: &Layer,
    joins: &[(Layer, NearestJoin)],
    working_crs: Crs,
) -> Result<Layer> {
    require_projected(working_crs)?;
    let mut joined = reproject(base, working_crs)?;
    for (right, spec) in joins {
        let right = reproject(right, working_crs)?;
        joined = join_nearest(&joined, &right, spec)?.0;
    }
    Ok(joined)
}

pub fn run_curb(config: &CurbConfig) -> Result<PipelineReport> {
    info!("=== Starting curb management pipeline ===");
    // Fail on a bad working CRS before reading anything
    require_projected(config.working_crs)?;

    let (curbs, _) = load_layer(&config.base)?;
    let mut joins = Vec::with_capacity(config.joins.len());
    for join in &config.joins {
        let (layer, _) = load_layer(&join.layer)?;
        joins.push((layer, join.nearest_join()));
    }

    let joined = enrich_with_nearest(&curbs, &joins, config.working_crs)?;
    let final_layer = reproject(&joined, config.output_crs)?;
    write_layer(
        &final_layer,
        &config.output,
        config.geometry_column.as_deref(),
    )?;

    info!(
        "Final dataset saved ({} rows) at {}",
        final_layer.len(),
        config.output.display()
    );
    Ok(PipelineReport {
        rows_written: final_layer.len(),
        output: config.output.clone(),
    })
}

pub fn run_signals(config: &SignalsConfig) -> Result<PipelineReport> {
    info!("=== Starting signals, markings and signs pipeline ===");

    let mut layers = Vec::with_capacity(config.sources.len());
    for source in &config.sources {
        let (layer, _) = load_layer(&source.layer)?;
        let tagged = tag_source(&layer, &config.source_column, &source.source)?;
        let (deduped, _) = deduplicate(&tagged, &source.dedup_key(config.min_distinct))?;
        // Sources may be published in different CRSes; stack them in the output one
        layers.push(reproject(&deduped, config.output_crs)?);
    }

    for (source, layer) in config.sources.iter().zip(&layers) {
        info!(" - {:<25} -> {} rows", source.source, layer.len());
    }

    let combined = concat("signals_signs_markings_combined", &layers)?;
    write_layer(&combined, &config.output, config.geometry_column.as_deref())?;

    info!(
        "Final merged dataset saved: {} ({} rows)",
        config.output.display(),
        combined.len()
    );
    Ok(PipelineReport {
        rows_written: combined.len(),
        output: config.output.clone(),
    })
}

/// Adds `longitude` and `latitude` columns from each record's representative coordinate.
pub fn with_lon_lat(layer: &Layer) -> Result<Layer> {
    layer.with_columns(&["longitude", "latitude"], |record| {
        match representative_coord(&record.geometry) {
            Some(coord) => vec![Some(coord.x.to_string()), Some(coord.y.to_string())],
            None => vec![None, None],
        }
    })
}

pub fn run_speed_humps(config: &SpeedHumpsConfig) -> Result<PipelineReport> {
    info!("=== Starting speed humps post-processing ===");

    let (humps, _) = load_layer(&config.layer)?;
    let humps = reproject(&humps, Crs::WGS84)?;
    let enriched = with_lon_lat(&humps)?;
    write_layer(&enriched, &config.output, config.geometry_column.as_deref())?;

    info!(
        "Saved processed dataset with lat/lon to {}",
        config.output.display()
    );
    Ok(PipelineReport {
        rows_written: enriched.len(),
        output: config.output.clone(),
    })
}
