use geo::Geometry;

use crate::crs::Crs;
use crate::error::{GeoJoinError, Result};

/// A single row: attribute values aligned with the owning layer's columns, plus one geometry.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    /// `None` is a null value (an empty CSV field, or an unmatched join column).
    pub values: Vec<Option<String>>,
    pub geometry: Geometry<f64>,
}

/// An ordered collection of records sharing a CRS and a schema.
///
/// Layers are never modified in place. Every operation in this crate builds a new one.
#[derive(Clone, Debug, PartialEq)]
pub struct Layer {
    name: String,
    crs: Crs,
    columns: Vec<String>,
    records: Vec<Record>,
}

impl Layer {
    /// Fails if a record's width doesn't match the schema, or the schema repeats a name.
    pub fn new(
        name: impl Into<String>,
        crs: Crs,
        columns: Vec<String>,
        records: Vec<Record>,
    ) -> Result<Layer> {
        for (idx, column) in columns.iter().enumerate() {
            if columns[..idx].contains(column) {
                return Err(GeoJoinError::DuplicateColumn(column.clone()));
            }
        }
        let name = name.into();
        if let Some(bad) = records.iter().find(|r| r.values.len() != columns.len()) {
            return Err(GeoJoinError::Config(format!(
                "layer '{}' has {} columns but a record with {} values",
                name,
                columns.len(),
                bad.values.len()
            )));
        }
        Ok(Layer {
            name,
            crs,
            columns,
            records,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn crs(&self) -> Crs {
        self.crs
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// Like `column_index`, but a missing column is an error naming this layer.
    pub fn require_column(&self, column: &str) -> Result<usize> {
        self.column_index(column)
            .ok_or_else(|| GeoJoinError::MissingColumn {
                layer: self.name.clone(),
                column: column.to_string(),
            })
    }

    /// The value of `column` in the record at `row`, if both exist and the value isn't null.
    pub fn value(&self, row: usize, column: &str) -> Option<&str> {
        let idx = self.column_index(column)?;
        self.records.get(row)?.values[idx].as_deref()
    }

    /// Same schema and CRS, different records.
    pub(crate) fn with_records(&self, records: Vec<Record>) -> Layer {
        Layer {
            name: self.name.clone(),
            crs: self.crs,
            columns: self.columns.clone(),
            records,
        }
    }

    /// Same schema and records, different CRS tag. Only the projector should call this after
    /// transforming the coordinates.
    pub(crate) fn with_crs(&self, crs: Crs, records: Vec<Record>) -> Layer {
        Layer {
            name: self.name.clone(),
            crs,
            columns: self.columns.clone(),
            records,
        }
    }

    /// Appends columns computed per record. `compute` must return one value per new column.
    pub fn with_columns<F>(&self, new_columns: &[&str], mut compute: F) -> Result<Layer>
    where
        F: FnMut(&Record) -> Vec<Option<String>>,
    {
        let mut columns = self.columns.clone();
        columns.extend(new_columns.iter().map(|c| c.to_string()));
        let records = self
            .records
            .iter()
            .map(|record| {
                let mut values = record.values.clone();
                values.extend(compute(record));
                Record {
                    values,
                    geometry: record.geometry.clone(),
                }
            })
            .collect();
        Layer::new(self.name.clone(), self.crs, columns, records)
    }
}
