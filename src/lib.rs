//! Geometry enrichment for NYC Open Data street-infrastructure datasets.
//!
//! Layers are loaded from CSV, moved into a projected CRS, deduplicated or joined to their
//! nearest neighbours in other layers, and written back out in WGS84.

pub mod config;
pub mod crs;
pub mod dedup;
pub mod error;
pub mod export;
pub mod geometry;
pub mod join;
pub mod layer;
pub mod load;
pub mod merge;
pub mod pipeline;
pub mod registry;

pub use config::PipelineConfig;
pub use crs::Crs;
pub use error::{GeoJoinError, Result};
pub use layer::{Layer, Record};
pub use pipeline::PipelineReport;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pipeline {
    /// Curbs joined to loading zones, parking meters and truck routes.
    Curb,
    /// Pedestrian signals, street signs and traffic signals stacked into one layer.
    Signals,
    /// Speed humps with a longitude/latitude pair.
    SpeedHumps,
}

pub fn run_pipeline(which: Pipeline, config: &PipelineConfig) -> Result<PipelineReport> {
    match which {
        Pipeline::Curb => pipeline::run_curb(&config.curb),
        Pipeline::Signals => pipeline::run_signals(&config.signals),
        Pipeline::SpeedHumps => pipeline::run_speed_humps(&config.speed_humps),
    }
}
