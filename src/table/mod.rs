//! Typed columnar tables
//!
//! A [`Table`] is an ordered list of named, typed columns of equal length.
//! Column kinds are declared through a [`Schema`] rather than inferred, so a
//! numeric-looking identifier can never be mistaken for a measurement.
//!
//! Tables are values: every transformation in this crate takes `&Table` and
//! returns a new `Table`.

mod stats;

pub use stats::{is_constant, mean, median, population_std, sample_std, z_score, ColumnStatistics};

use crate::error::{Result, TelematicsError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Identifier column shared by every telematics table
pub const VEHICLE_ID: &str = "vehicle_id";
/// Binary target column
pub const MAINTENANCE_REQUIRED: &str = "maintenance_required";
pub const FUEL_EFFICIENCY: &str = "fuel_efficiency";
pub const AVERAGE_SPEED: &str = "average_speed";
pub const ENGINE_LOAD: &str = "engine_load";
pub const DISTANCE_TRAVELED: &str = "distance_traveled";
pub const FUEL_CONSUMED: &str = "fuel_consumed";

/// Declared kind of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnKind {
    /// Row key used for grouping (text)
    Identifier,
    /// Continuous measurement (f64)
    Numeric,
    /// Free categorical value (text)
    Categorical,
    /// Binary classification target (f64, 0 or 1)
    Label,
}

impl ColumnKind {
    /// Whether values of this kind are stored as `f64`
    pub fn is_numeric_storage(&self) -> bool {
        matches!(self, ColumnKind::Numeric | ColumnKind::Label)
    }
}

/// Name and kind of one column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub kind: ColumnKind,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Ordered, uniquely named column declarations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    fields: Vec<ColumnSpec>,
}

impl Schema {
    /// Create a schema, rejecting duplicate column names
    pub fn new(fields: Vec<ColumnSpec>) -> Result<Self> {
        let mut seen = HashSet::new();
        for field in &fields {
            if !seen.insert(field.name.as_str()) {
                return Err(TelematicsError::schema(format!(
                    "duplicate column name '{}'",
                    field.name
                )));
            }
        }
        Ok(Self { fields })
    }

    /// The input contract of the cleaning stage
    pub fn telematics() -> Self {
        Self {
            fields: vec![
                ColumnSpec::new(VEHICLE_ID, ColumnKind::Identifier),
                ColumnSpec::new(FUEL_EFFICIENCY, ColumnKind::Numeric),
                ColumnSpec::new(AVERAGE_SPEED, ColumnKind::Numeric),
                ColumnSpec::new(ENGINE_LOAD, ColumnKind::Numeric),
                ColumnSpec::new(DISTANCE_TRAVELED, ColumnKind::Numeric),
                ColumnSpec::new(FUEL_CONSUMED, ColumnKind::Numeric),
                ColumnSpec::new(MAINTENANCE_REQUIRED, ColumnKind::Label),
            ],
        }
    }

    /// Add or redeclare a column
    pub fn with_column(mut self, name: impl Into<String>, kind: ColumnKind) -> Self {
        let name = name.into();
        match self.fields.iter_mut().find(|f| f.name == name) {
            Some(field) => field.kind = kind,
            None => self.fields.push(ColumnSpec::new(name, kind)),
        }
        self
    }

    pub fn fields(&self) -> &[ColumnSpec] {
        &self.fields
    }

    pub fn kind_of(&self, name: &str) -> Option<ColumnKind> {
        self.fields.iter().find(|f| f.name == name).map(|f| f.kind)
    }

    pub fn names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Column storage; `None` marks a missing value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnData {
    Float(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Float(v) => v.len(),
            ColumnData::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_missing(&self, row: usize) -> bool {
        match self {
            ColumnData::Float(v) => v[row].is_none(),
            ColumnData::Text(v) => v[row].is_none(),
        }
    }

    pub fn null_count(&self) -> usize {
        match self {
            ColumnData::Float(v) => v.iter().filter(|x| x.is_none()).count(),
            ColumnData::Text(v) => v.iter().filter(|x| x.is_none()).count(),
        }
    }

    fn take(&self, indices: &[usize]) -> ColumnData {
        match self {
            ColumnData::Float(v) => ColumnData::Float(indices.iter().map(|&i| v[i]).collect()),
            ColumnData::Text(v) => {
                ColumnData::Text(indices.iter().map(|&i| v[i].clone()).collect())
            }
        }
    }
}

/// A named, typed column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    name: String,
    kind: ColumnKind,
    data: ColumnData,
}

impl Column {
    /// Create a column, checking that storage matches the declared kind
    pub fn new(name: impl Into<String>, kind: ColumnKind, data: ColumnData) -> Result<Self> {
        let name = name.into();
        let storage_ok = match (&data, kind.is_numeric_storage()) {
            (ColumnData::Float(_), true) | (ColumnData::Text(_), false) => true,
            _ => false,
        };
        if !storage_ok {
            return Err(TelematicsError::schema(format!(
                "column '{}' declared {:?} but given the wrong storage type",
                name, kind
            )));
        }
        Ok(Self { name, kind, data })
    }

    pub fn numeric(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self {
            name: name.into(),
            kind: ColumnKind::Numeric,
            data: ColumnData::Float(values),
        }
    }

    /// Numeric column without missing values
    pub fn numeric_dense(name: impl Into<String>, values: &[f64]) -> Self {
        Self::numeric(name, values.iter().copied().map(Some).collect())
    }

    pub fn label(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self {
            name: name.into(),
            kind: ColumnKind::Label,
            data: ColumnData::Float(values),
        }
    }

    pub fn identifier<S: Into<String>>(name: impl Into<String>, values: Vec<Option<S>>) -> Self {
        Self {
            name: name.into(),
            kind: ColumnKind::Identifier,
            data: ColumnData::Text(values.into_iter().map(|v| v.map(Into::into)).collect()),
        }
    }

    pub fn categorical<S: Into<String>>(name: impl Into<String>, values: Vec<Option<S>>) -> Self {
        Self {
            name: name.into(),
            kind: ColumnKind::Categorical,
            data: ColumnData::Text(values.into_iter().map(|v| v.map(Into::into)).collect()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ColumnKind {
        self.kind
    }

    pub fn data(&self) -> &ColumnData {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn null_count(&self) -> usize {
        self.data.null_count()
    }

    pub fn as_f64(&self) -> Option<&[Option<f64>]> {
        match &self.data {
            ColumnData::Float(v) => Some(v),
            ColumnData::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&[Option<String>]> {
        match &self.data {
            ColumnData::Text(v) => Some(v),
            ColumnData::Float(_) => None,
        }
    }

    /// Non-missing values of a float column, in row order
    pub fn present_values(&self) -> Vec<f64> {
        self.as_f64()
            .map(|v| v.iter().flatten().copied().collect())
            .unwrap_or_default()
    }

    /// Same name and kind, new float values
    pub fn with_values(&self, values: Vec<Option<f64>>) -> Result<Self> {
        Self::new(self.name.clone(), self.kind, ColumnData::Float(values))
    }
}

/// Ordered set of equal-length, uniquely named columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<Column>,
    n_rows: usize,
}

impl Table {
    /// Build a table, enforcing equal column lengths and unique names
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let n_rows = columns.first().map(|c| c.len()).unwrap_or(0);
        let mut seen = HashSet::new();

        for column in &columns {
            if column.len() != n_rows {
                return Err(TelematicsError::ShapeError {
                    expected: format!("{} rows in column '{}'", n_rows, column.name),
                    actual: format!("{} rows", column.len()),
                });
            }
            if !seen.insert(column.name.as_str()) {
                return Err(TelematicsError::schema(format!(
                    "duplicate column name '{}'",
                    column.name
                )));
            }
        }

        Ok(Self { columns, n_rows })
    }

    /// A table with the schema's columns and no rows
    pub fn empty(schema: &Schema) -> Self {
        let columns = schema
            .fields()
            .iter()
            .map(|f| {
                let data = if f.kind.is_numeric_storage() {
                    ColumnData::Float(Vec::new())
                } else {
                    ColumnData::Text(Vec::new())
                };
                Column {
                    name: f.name.clone(),
                    kind: f.kind,
                    data,
                }
            })
            .collect();
        Self { columns, n_rows: 0 }
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    /// True when the table holds no rows
    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Names of all columns of one kind, in table order
    pub fn names_of_kind(&self, kind: ColumnKind) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| c.kind == kind)
            .map(|c| c.name.clone())
            .collect()
    }

    pub fn schema(&self) -> Schema {
        Schema {
            fields: self
                .columns
                .iter()
                .map(|c| ColumnSpec::new(c.name.clone(), c.kind))
                .collect(),
        }
    }

    /// Float values of a numeric or label column
    pub fn f64_values(&self, name: &str) -> Option<&[Option<f64>]> {
        self.column(name).and_then(|c| c.as_f64())
    }

    /// Text values of an identifier or categorical column
    pub fn text_values(&self, name: &str) -> Option<&[Option<String>]> {
        self.column(name).and_then(|c| c.as_text())
    }

    /// New table holding the given rows, in the given order
    pub fn take_rows(&self, indices: &[usize]) -> Table {
        let columns = self
            .columns
            .iter()
            .map(|c| Column {
                name: c.name.clone(),
                kind: c.kind,
                data: c.data.take(indices),
            })
            .collect();
        Table {
            columns,
            n_rows: indices.len(),
        }
    }

    /// New table holding the rows whose mask entry is `true`
    pub fn filter_rows(&self, keep: &[bool]) -> Result<Table> {
        if keep.len() != self.n_rows {
            return Err(TelematicsError::ShapeError {
                expected: format!("mask of length {}", self.n_rows),
                actual: format!("length {}", keep.len()),
            });
        }
        let indices: Vec<usize> = keep
            .iter()
            .enumerate()
            .filter(|(_, &k)| k)
            .map(|(i, _)| i)
            .collect();
        Ok(self.take_rows(&indices))
    }

    /// New table with `column` replacing the same-named column in place, or appended
    pub fn with_column(&self, column: Column) -> Result<Table> {
        if !self.columns.is_empty() && column.len() != self.n_rows {
            return Err(TelematicsError::ShapeError {
                expected: format!("{} rows in column '{}'", self.n_rows, column.name),
                actual: format!("{} rows", column.len()),
            });
        }
        let mut columns = self.columns.clone();
        match columns.iter().position(|c| c.name == column.name) {
            Some(pos) => columns[pos] = column,
            None => columns.push(column),
        }
        Table::new(columns)
    }

    /// New table without the named column (unchanged if absent)
    pub fn without_column(&self, name: &str) -> Table {
        let columns: Vec<Column> = self
            .columns
            .iter()
            .filter(|c| c.name != name)
            .cloned()
            .collect();
        let n_rows = if columns.is_empty() { 0 } else { self.n_rows };
        Table { columns, n_rows }
    }

    /// Append the rows of `other`, which must have the same column names and kinds
    pub fn vstack(&self, other: &Table) -> Result<Table> {
        if self.schema() != other.schema() {
            return Err(TelematicsError::schema(format!(
                "cannot stack tables with different schemas: {:?} vs {:?}",
                self.column_names(),
                other.column_names()
            )));
        }
        let columns = self
            .columns
            .iter()
            .zip(other.columns.iter())
            .map(|(a, b)| {
                let data = match (&a.data, &b.data) {
                    (ColumnData::Float(x), ColumnData::Float(y)) => {
                        ColumnData::Float(x.iter().chain(y.iter()).copied().collect())
                    }
                    (ColumnData::Text(x), ColumnData::Text(y)) => {
                        ColumnData::Text(x.iter().chain(y.iter()).cloned().collect())
                    }
                    _ => unreachable!("schemas are equal"),
                };
                Column {
                    name: a.name.clone(),
                    kind: a.kind,
                    data,
                }
            })
            .collect();
        Ok(Table {
            columns,
            n_rows: self.n_rows + other.n_rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::new(vec![
            Column::identifier(VEHICLE_ID, vec![Some("a"), Some("b"), Some("a")]),
            Column::numeric(ENGINE_LOAD, vec![Some(50.0), None, Some(90.0)]),
            Column::label(MAINTENANCE_REQUIRED, vec![Some(0.0), Some(1.0), Some(0.0)]),
        ])
        .unwrap()
    }

    #[test]
    fn test_unequal_lengths_rejected() {
        let result = Table::new(vec![
            Column::numeric_dense("a", &[1.0, 2.0]),
            Column::numeric_dense("b", &[1.0]),
        ]);
        assert!(matches!(result, Err(TelematicsError::ShapeError { .. })));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let result = Table::new(vec![
            Column::numeric_dense("a", &[1.0]),
            Column::numeric_dense("a", &[2.0]),
        ]);
        assert!(matches!(result, Err(TelematicsError::SchemaError(_))));
    }

    #[test]
    fn test_wrong_storage_rejected() {
        let result = Column::new("id", ColumnKind::Identifier, ColumnData::Float(vec![Some(1.0)]));
        assert!(result.is_err());
    }

    #[test]
    fn test_filter_and_take() {
        let table = sample();
        let filtered = table.filter_rows(&[true, false, true]).unwrap();
        assert_eq!(filtered.n_rows(), 2);
        assert_eq!(
            filtered.f64_values(ENGINE_LOAD).unwrap(),
            &[Some(50.0), Some(90.0)]
        );

        let reordered = table.take_rows(&[2, 0]);
        assert_eq!(
            reordered.text_values(VEHICLE_ID).unwrap(),
            &[Some("a".to_string()), Some("a".to_string())]
        );
    }

    #[test]
    fn test_with_column_replaces_in_place() {
        let table = sample();
        let replaced = table
            .with_column(Column::numeric_dense(ENGINE_LOAD, &[1.0, 2.0, 3.0]))
            .unwrap();
        assert_eq!(replaced.column_names(), table.column_names());
        assert_eq!(replaced.column(ENGINE_LOAD).unwrap().null_count(), 0);
        // Input untouched
        assert_eq!(table.column(ENGINE_LOAD).unwrap().null_count(), 1);

        let appended = table
            .with_column(Column::numeric_dense("idle_time", &[0.0, 0.0, 0.0]))
            .unwrap();
        assert_eq!(appended.n_cols(), 4);
    }

    #[test]
    fn test_vstack_requires_same_schema() {
        let table = sample();
        let stacked = table.vstack(&table).unwrap();
        assert_eq!(stacked.n_rows(), 6);

        let other = table.without_column(ENGINE_LOAD);
        assert!(table.vstack(&other).is_err());
    }

    #[test]
    fn test_schema_kinds() {
        let schema = Schema::telematics().with_column("region", ColumnKind::Categorical);
        assert_eq!(schema.kind_of(VEHICLE_ID), Some(ColumnKind::Identifier));
        assert_eq!(schema.kind_of(MAINTENANCE_REQUIRED), Some(ColumnKind::Label));
        assert_eq!(schema.kind_of("region"), Some(ColumnKind::Categorical));
        assert_eq!(sample().names_of_kind(ColumnKind::Numeric), vec![ENGINE_LOAD.to_string()]);
    }

    #[test]
    fn test_empty_table_from_schema() {
        let table = Table::empty(&Schema::telematics());
        assert!(table.is_empty());
        assert_eq!(table.n_cols(), 7);
    }
}
