//! CSV input and output through polars

use super::TableSource;
use crate::error::{Result, TelematicsError};
use crate::table::{Column, ColumnData, ColumnKind, Schema, Table};
use polars::prelude::{
    Column as FrameColumn, CsvReadOptions, CsvWriter, DataFrame, SerReader, SerWriter,
};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Reads a CSV file into a [`Table`] typed by a declared schema.
///
/// Every field is read as text and converted by the declared kind, so
/// identifier codes like `007` keep their leading zeros. Columns the schema
/// does not declare become Numeric when every present value parses as a
/// number and Categorical otherwise.
#[derive(Debug, Clone)]
pub struct CsvTableSource {
    path: PathBuf,
    schema: Schema,
}

impl CsvTableSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            schema: Schema::telematics(),
        }
    }

    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = schema;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TableSource for CsvTableSource {
    fn name(&self) -> String {
        format!("csv:{}", self.path.display())
    }

    fn load(&self) -> Result<Table> {
        let table = read_csv(&self.path, &self.schema)?;
        info!(
            path = %self.path.display(),
            rows = table.n_rows(),
            columns = table.n_cols(),
            "Loaded table from CSV"
        );
        Ok(table)
    }
}

/// Read a CSV file, typing columns by `schema`
pub fn read_csv(path: impl AsRef<Path>, schema: &Schema) -> Result<Table> {
    let file = File::open(path.as_ref())?;

    // Infer nothing: every column arrives as text
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .into_reader_with_file_handle(file)
        .finish()?;

    frame_to_table(&df, schema)
}

/// Convert a text-typed frame into a table
pub fn frame_to_table(df: &DataFrame, schema: &Schema) -> Result<Table> {
    let mut columns = Vec::with_capacity(df.width());

    for frame_column in df.get_columns() {
        let name = frame_column.name().to_string();
        let series = frame_column
            .as_materialized_series()
            .cast(&polars::prelude::DataType::String)?;
        let raw: Vec<Option<String>> = series
            .str()?
            .into_iter()
            .map(|v| v.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string))
            .collect();

        let kind = match schema.kind_of(&name) {
            Some(kind) => kind,
            None => infer_kind(&raw),
        };
        debug!(column = %name, ?kind, "Typed CSV column");
        columns.push(typed_column(name, kind, raw)?);
    }

    Table::new(columns)
}

fn infer_kind(raw: &[Option<String>]) -> ColumnKind {
    if raw.iter().flatten().all(|v| parse_number(v).is_some()) {
        ColumnKind::Numeric
    } else {
        ColumnKind::Categorical
    }
}

fn parse_number(value: &str) -> Option<f64> {
    value.parse::<f64>().ok()
}

fn parse_label(value: &str) -> Option<f64> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" => Some(1.0),
        "false" | "no" => Some(0.0),
        other => parse_number(other),
    }
}

fn typed_column(name: String, kind: ColumnKind, raw: Vec<Option<String>>) -> Result<Column> {
    if !kind.is_numeric_storage() {
        return Column::new(name, kind, ColumnData::Text(raw));
    }

    let parse: fn(&str) -> Option<f64> = if kind == ColumnKind::Label { parse_label } else { parse_number };
    let mut values = Vec::with_capacity(raw.len());
    for (row, v) in raw.iter().enumerate() {
        let parsed = match v {
            None => None,
            Some(text) => {
                let number = parse(text).ok_or_else(|| {
                    TelematicsError::DataError(format!(
                        "column '{}' row {}: '{}' is not a number",
                        name, row, text
                    ))
                })?;
                if number.is_infinite() {
                    return Err(TelematicsError::DataError(format!(
                        "column '{}' row {}: '{}' is not a finite number",
                        name, row, text
                    )));
                }
                // NaN marks a missing reading
                Some(number).filter(|n| !n.is_nan())
            }
        };
        values.push(parsed);
    }
    Column::new(name, kind, ColumnData::Float(values))
}

/// Convert a table into a polars frame
pub fn table_to_frame(table: &Table) -> Result<DataFrame> {
    let columns: Vec<FrameColumn> = table
        .columns()
        .iter()
        .map(|c| match c.data() {
            ColumnData::Float(v) => FrameColumn::new(c.name().into(), v.clone()),
            ColumnData::Text(v) => FrameColumn::new(c.name().into(), v.clone()),
        })
        .collect();
    Ok(DataFrame::new(columns)?)
}

/// Write a table to CSV with a header row
pub fn write_csv(table: &Table, path: impl AsRef<Path>) -> Result<()> {
    let mut df = table_to_frame(table)?;
    let mut file = File::create(path.as_ref())?;
    CsvWriter::new(&mut file).include_header(true).finish(&mut df)?;
    debug!(path = %path.as_ref().display(), rows = table.n_rows(), "Wrote CSV");
    Ok(())
}
