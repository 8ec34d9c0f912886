//! Nearest-neighbour spatial join with a maximum search radius.

use geo::{BoundingRect, EuclideanDistance, Geometry};
use log::info;
use rstar::{RTree, RTreeObject, AABB};

use crate::crs::require_projected;
use crate::error::{GeoJoinError, Result};
use crate::layer::{Layer, Record};

/// How to attach one right-hand layer to a left-hand layer.
#[derive(Clone, Debug, PartialEq)]
pub struct NearestJoin {
    /// Right-hand columns are renamed `<prefix>_<column>`.
    pub prefix: String,
    /// In the linear units of the layers' (projected) CRS. A match needs
    /// `distance <= max_distance`.
    pub max_distance: f64,
    pub distance_column: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct JoinStats {
    pub matched: usize,
    pub unmatched: usize,
}

/// The bounding box of one right-hand feature, tagged with its row.
struct IndexedEnvelope {
    row: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for IndexedEnvelope {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

fn envelope_of(geometry: &Geometry<f64>, grow: f64) -> Option<AABB<[f64; 2]>> {
    let rect = geometry.bounding_rect()?;
    Some(AABB::from_corners(
        [rect.min().x - grow, rect.min().y - grow],
        [rect.max().x + grow, rect.max().y + grow],
    ))
}

/// Finds, for one geometry, the closest right-hand row within `max_distance`.
///
/// Exactly-equal distances go to the row that comes first in the right layer.
fn nearest_within(
    tree: &RTree<IndexedEnvelope>,
    right: &Layer,
    geometry: &Geometry<f64>,
    max_distance: f64,
) -> Option<(usize, f64)> {
    let search = envelope_of(geometry, max_distance)?;
    let mut best: Option<(usize, f64)> = None;
    for candidate in tree.locate_in_envelope_intersecting(&search) {
        let distance = geometry.euclidean_distance(&right.records()[candidate.row].geometry);
        if distance > max_distance {
            continue;
        }
        best = match best {
            Some((row, d)) if d < distance || (d == distance && row < candidate.row) => {
                Some((row, d))
            }
            _ => Some((candidate.row, distance)),
        };
    }
    best
}

/// Attaches to every left record the attributes of its nearest right record, plus the distance.
///
/// The join keeps every left record, in order. Records with nothing inside `max_distance` get
/// nulls for all the new columns. Both layers must be in the same projected CRS.
pub fn join_nearest(left: &Layer, right: &Layer, spec: &NearestJoin) -> Result<(Layer, JoinStats)> {
    require_projected(left.crs())?;
    if left.crs() != right.crs() {
        return Err(GeoJoinError::Projection(format!(
            "can't join {} ({}) to {} ({}): CRS mismatch",
            left.name(),
            left.crs(),
            right.name(),
            right.crs()
        )));
    }
    if spec.max_distance.is_nan() || spec.max_distance < 0.0 {
        return Err(GeoJoinError::Config(format!(
            "max_distance for '{}' must be a non-negative number, got {}",
            spec.prefix, spec.max_distance
        )));
    }

    let mut columns = left.columns().to_vec();
    columns.extend(
        right
            .columns()
            .iter()
            .map(|column| format!("{}_{}", spec.prefix, column)),
    );
    columns.push(spec.distance_column.clone());

    let tree = RTree::bulk_load(
        right
            .records()
            .iter()
            .enumerate()
            .filter_map(|(row, record)| {
                envelope_of(&record.geometry, 0.0).map(|envelope| IndexedEnvelope { row, envelope })
            })
            .collect(),
    );

    let mut stats = JoinStats::default();
    let width = right.columns().len();
    let records = left
        .records()
        .iter()
        .map(|record| {
            let mut values = record.values.clone();
            match nearest_within(&tree, right, &record.geometry, spec.max_distance) {
                Some((row, distance)) => {
                    stats.matched += 1;
                    values.extend(right.records()[row].values.iter().cloned());
                    values.push(Some(distance.to_string()));
                }
                None => {
                    stats.unmatched += 1;
                    values.extend(std::iter::repeat(None).take(width + 1));
                }
            }
            Record {
                values,
                geometry: record.geometry.clone(),
            }
        })
        .collect();

    info!(
        "Joined {} to {} within {}: {} matched, {} unmatched",
        right.name(),
        left.name(),
        spec.max_distance,
        stats.matched,
        stats.unmatched
    );
    let joined = Layer::new(left.name(), left.crs(), columns, records)?;
    Ok((joined, stats))
}
