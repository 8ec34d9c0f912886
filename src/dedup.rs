//! Removing duplicate rows within a single source, keyed by an identifier column.
//!
//! The key column is either named explicitly, or picked at run time: the first candidate
//! column with more than `min_distinct` distinct non-null values wins. The run-time pick is a
//! heuristic with a known weakness. A small source whose real key has fewer distinct values
//! than the threshold is passed through without deduplication. Prefer an explicit key where
//! one is known.

use std::collections::HashSet;

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::layer::Layer;

pub const DEFAULT_MIN_DISTINCT: usize = 100;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum DedupKey {
    /// Always deduplicate by this column. It must exist.
    Column(String),
    /// Use the first candidate whose distinct-value count is strictly greater than
    /// `min_distinct`. If none qualifies, rows pass through unchanged.
    FirstDistinct {
        candidates: Vec<String>,
        min_distinct: usize,
    },
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DedupStats {
    /// `None` when no key column was usable.
    pub key: Option<String>,
    pub removed: usize,
}

/// Picks the first candidate present in `layer` with more than `min_distinct` distinct,
/// trimmed, non-null values.
pub fn select_key_column(
    layer: &Layer,
    candidates: &[String],
    min_distinct: usize,
) -> Option<String> {
    candidates
        .iter()
        .find(|candidate| match layer.column_index(candidate) {
            Some(idx) => distinct_count(layer, idx) > min_distinct,
            None => false,
        })
        .cloned()
}

/// Keeps the first row for each key value, in input order. Null counts as one more key value:
/// the first row with a null key is kept and later ones are dropped.
///
/// Applying this twice gives the same layer as applying it once.
pub fn deduplicate(layer: &Layer, key: &DedupKey) -> Result<(Layer, DedupStats)> {
    let column = match key {
        DedupKey::Column(column) => {
            layer.require_column(column)?;
            column.clone()
        }
        DedupKey::FirstDistinct {
            candidates,
            min_distinct,
        } => match select_key_column(layer, candidates, *min_distinct) {
            Some(column) => column,
            None => {
                info!(
                    "{}: no key column among {:?} has more than {} distinct values, \
                     skipping deduplication",
                    layer.name(),
                    candidates,
                    min_distinct
                );
                return Ok((layer.clone(), DedupStats::default()));
            }
        },
    };
    let idx = layer.require_column(&column)?;

    let mut seen = HashSet::new();
    let records: Vec<_> = layer
        .records()
        .iter()
        .filter(|record| seen.insert(record.values[idx].as_deref().map(str::trim)))
        .cloned()
        .collect();

    let removed = layer.len() - records.len();
    info!(
        "{}: deduplicated by '{}', removed {} of {} rows",
        layer.name(),
        column,
        removed,
        layer.len()
    );
    Ok((
        layer.with_records(records),
        DedupStats {
            key: Some(column),
            removed,
        },
    ))
}

fn distinct_count(layer: &Layer, idx: usize) -> usize {
    layer
        .records()
        .iter()
        .filter_map(|record| record.values[idx].as_deref())
        .map(str::trim)
        .collect::<HashSet<_>>()
        .len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crs::Crs;
    use crate::error::GeoJoinError;
    use crate::layer::Record;
    use geo::{Geometry, Point};

    fn layer_of(ids: &[Option<String>]) -> Layer {
        let records = ids
            .iter()
            .enumerate()
            .map(|(row, id)| Record {
                values: vec![id.clone(), Some(row.to_string())],
                geometry: Geometry::Point(Point::new(row as f64, 0.0)),
            })
            .collect();
        Layer::new(
            "signs",
            Crs::WGS84,
            vec!["SIGNID".to_string(), "row".to_string()],
            records,
        )
        .unwrap()
    }

    fn heuristic(candidates: &[&str]) -> DedupKey {
        DedupKey::FirstDistinct {
            candidates: candidates.iter().map(|c| c.to_string()).collect(),
            min_distinct: DEFAULT_MIN_DISTINCT,
        }
    }

    /// 150 rows: 145 unique ids, plus the id "dup" on rows 10, 20, 30, 40, 50.
    fn with_five_duplicates() -> Layer {
        let ids: Vec<Option<String>> = (0..150)
            .map(|row| {
                if row % 10 == 0 && (10..=50).contains(&row) {
                    Some("dup".to_string())
                } else {
                    Some(format!("S-{}", row))
                }
            })
            .collect();
        layer_of(&ids)
    }

    #[test]
    fn test_keeps_first_of_five_duplicates() {
        let layer = with_five_duplicates();
        let (deduped, stats) = deduplicate(&layer, &heuristic(&["SIGNID"])).unwrap();
        assert_eq!(stats.key.as_deref(), Some("SIGNID"));
        assert_eq!(stats.removed, 4);
        assert_eq!(deduped.len(), 146);

        let dup_rows: Vec<&str> = (0..deduped.len())
            .filter(|row| deduped.value(*row, "SIGNID") == Some("dup"))
            .map(|row| deduped.value(row, "row").unwrap())
            .collect();
        assert_eq!(dup_rows, vec!["10"]);
    }

    #[test]
    fn test_below_threshold_passes_through() {
        let ids: Vec<Option<String>> = (0..100).map(|row| Some(format!("{}", row % 50))).collect();
        let layer = layer_of(&ids);
        let (deduped, stats) = deduplicate(&layer, &heuristic(&["SIGNID"])).unwrap();
        assert_eq!(deduped, layer);
        assert_eq!(stats, DedupStats::default());
    }

    #[test]
    fn test_threshold_is_strict() {
        // Exactly 100 distinct values doesn't qualify
        let ids: Vec<Option<String>> = (0..100).map(|row| Some(row.to_string())).collect();
        assert_eq!(select_key_column(&layer_of(&ids), &["SIGNID".to_string()], 100), None);
        let ids: Vec<Option<String>> = (0..101).map(|row| Some(row.to_string())).collect();
        assert_eq!(
            select_key_column(&layer_of(&ids), &["SIGNID".to_string()], 100),
            Some("SIGNID".to_string())
        );
    }

    #[test]
    fn test_first_qualifying_candidate_wins() {
        let layer = with_five_duplicates();
        // "sign_id" doesn't exist, "row" qualifies but comes after SIGNID
        let picked = select_key_column(
            &layer,
            &["sign_id".to_string(), "SIGNID".to_string(), "row".to_string()],
            100,
        );
        assert_eq!(picked.as_deref(), Some("SIGNID"));
    }

    #[test]
    fn test_values_are_trimmed() {
        let layer = layer_of(&[Some("A".to_string()), Some(" A ".to_string())]);
        let (deduped, _) = deduplicate(&layer, &DedupKey::Column("SIGNID".to_string())).unwrap();
        assert_eq!(deduped.len(), 1);
    }

    #[test]
    fn test_null_keys_collapse_to_first() {
        let layer = layer_of(&[None, Some("A".to_string()), None, Some("A".to_string())]);
        let (deduped, stats) =
            deduplicate(&layer, &DedupKey::Column("SIGNID".to_string())).unwrap();
        assert_eq!(deduped.len(), 2);
        assert_eq!(stats.removed, 2);
        assert_eq!(deduped.value(0, "row"), Some("0"));
        assert_eq!(deduped.value(1, "row"), Some("1"));
    }

    #[test]
    fn test_nulls_ignored_by_threshold_but_deduplicated() {
        // Rows 0-4 have no id, the other 145 are distinct
        let ids: Vec<Option<String>> = (0..150)
            .map(|row| if row < 5 { None } else { Some(format!("F-{}", row)) })
            .collect();
        let layer = layer_of(&ids);
        let key = heuristic(&["SIGNID"]);
        let (deduped, stats) = deduplicate(&layer, &key).unwrap();
        assert_eq!(stats.key.as_deref(), Some("SIGNID"));
        assert_eq!(deduped.len(), 146);
        assert_eq!(deduped.value(0, "row"), Some("0"));
        assert_eq!(deduped.value(1, "row"), Some("5"));

        // 90 distinct ids plus 60 nulls don't qualify
        let ids: Vec<Option<String>> = (0..150)
            .map(|row| if row < 60 { None } else { Some(format!("F-{}", row)) })
            .collect();
        assert_eq!(select_key_column(&layer_of(&ids), &["SIGNID".to_string()], 100), None);
    }

    #[test]
    fn test_explicit_key_must_exist() {
        let layer = with_five_duplicates();
        assert!(matches!(
            deduplicate(&layer, &DedupKey::Column("F_id".to_string())),
            Err(GeoJoinError::MissingColumn { .. })
        ));
    }

    #[test]
    fn test_idempotent() {
        let layer = with_five_duplicates();
        let key = heuristic(&["SIGNID"]);
        let (once, _) = deduplicate(&layer, &key).unwrap();
        let (twice, stats) = deduplicate(&once, &key).unwrap();
        assert_eq!(once, twice);
        assert_eq!(stats.removed, 0);
    }
}
