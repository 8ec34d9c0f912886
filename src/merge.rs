use crate::error::{GeoJoinError, Result};
use crate::layer::{Layer, Record};

/// Adds a column holding the same value on every row, e.g. `source = "traffic_signal"`.
pub fn tag_source(layer: &Layer, column: &str, value: &str) -> Result<Layer> {
    if layer.column_index(column).is_some() {
        return Err(GeoJoinError::DuplicateColumn(column.to_string()));
    }
    layer.with_columns(&[column], |_| vec![Some(value.to_string())])
}

/// Stacks layers on top of each other, in order.
///
/// The schema is every column name in order of first appearance. A record whose layer lacks a
/// column gets null there. All layers must share one CRS; the result takes its name from `name`.
pub fn concat(name: &str, layers: &[Layer]) -> Result<Layer> {
    let Some(first) = layers.first() else {
        return Err(GeoJoinError::Config(format!(
            "nothing to concatenate into '{}'",
            name
        )));
    };
    let crs = first.crs();
    if let Some(other) = layers.iter().find(|layer| layer.crs() != crs) {
        return Err(GeoJoinError::Projection(format!(
            "can't concatenate {} ({}) with {} ({}): CRS mismatch",
            other.name(),
            other.crs(),
            first.name(),
            crs
        )));
    }

    let mut columns: Vec<String> = Vec::new();
    for layer in layers {
        for column in layer.columns() {
            if !columns.contains(column) {
                columns.push(column.clone());
            }
        }
    }

    let mut records = Vec::with_capacity(layers.iter().map(Layer::len).sum());
    for layer in layers {
        // Position of each output column in this layer, if it has one
        let mapping: Vec<Option<usize>> = columns.iter().map(|c| layer.column_index(c)).collect();
        for record in layer.records() {
            records.push(Record {
                values: mapping
                    .iter()
                    .map(|idx| idx.and_then(|idx| record.values[idx].clone()))
                    .collect(),
                geometry: record.geometry.clone(),
            });
        }
    }

    Layer::new(name, crs, columns, records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crs::Crs;
    use geo::{Geometry, Point};

    fn layer(name: &str, columns: &[&str], rows: &[&[&str]]) -> Layer {
        let records = rows
            .iter()
            .enumerate()
            .map(|(idx, row)| Record {
                values: row.iter().map(|v| Some(v.to_string())).collect(),
                geometry: Geometry::Point(Point::new(idx as f64, 0.0)),
            })
            .collect();
        Layer::new(
            name,
            Crs::WGS84,
            columns.iter().map(|c| c.to_string()).collect(),
            records,
        )
        .unwrap()
    }

    #[test]
    fn test_tag_source() {
        let aps = layer("aps", &["F_id"], &[&["1"], &["2"]]);
        let tagged = tag_source(&aps, "source", "accessible_ped_signal").unwrap();
        assert_eq!(tagged.value(1, "source"), Some("accessible_ped_signal"));
        assert!(matches!(
            tag_source(&tagged, "source", "again"),
            Err(GeoJoinError::DuplicateColumn(_))
        ));
    }

    #[test]
    fn test_concat_unions_schemas() {
        let aps = layer("aps", &["F_id", "source"], &[&["1", "aps"]]);
        let signs = layer(
            "signs",
            &["SIGNID", "source"],
            &[&["S1", "sign"], &["S2", "sign"]],
        );
        let combined = concat("combined", &[aps, signs]).unwrap();
        assert_eq!(
            combined.columns(),
            &["F_id".to_string(), "source".to_string(), "SIGNID".to_string()]
        );
        assert_eq!(combined.len(), 3);
        assert_eq!(combined.value(0, "F_id"), Some("1"));
        assert_eq!(combined.value(0, "SIGNID"), None);
        assert_eq!(combined.value(2, "SIGNID"), Some("S2"));
        assert_eq!(combined.value(2, "F_id"), None);
        assert_eq!(combined.value(2, "source"), Some("sign"));
    }

    #[test]
    fn test_concat_requires_one_crs() {
        let a = layer("a", &["id"], &[&["1"]]);
        let b = Layer::new("b", Crs::NY_STATE_PLANE, vec!["id".to_string()], vec![]).unwrap();
        assert!(matches!(
            concat("combined", &[a, b]),
            Err(GeoJoinError::Projection(_))
        ));
        assert!(concat("combined", &[]).is_err());
    }
}
