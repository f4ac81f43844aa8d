//! Table sources
//!
//! A [`TableSource`] yields the raw table a pipeline run starts from. An empty
//! table means there is no work to do.

mod csv;

pub use csv::{frame_to_table, read_csv, table_to_frame, write_csv, CsvTableSource};

use crate::error::{Result, TelematicsError};
use crate::table::{Schema, Table};
use tracing::{info, warn};

/// Anything that can produce a raw telematics table
pub trait TableSource: Send + Sync {
    /// Short description for logs
    fn name(&self) -> String;

    fn load(&self) -> Result<Table>;
}

/// In-memory table, mostly for tests
#[derive(Debug, Clone)]
pub struct MemoryTableSource {
    table: Table,
}

impl MemoryTableSource {
    pub fn new(table: Table) -> Self {
        Self { table }
    }
}

impl TableSource for MemoryTableSource {
    fn name(&self) -> String {
        "memory".to_string()
    }

    fn load(&self) -> Result<Table> {
        Ok(self.table.clone())
    }
}

/// Concatenation of several sources.
///
/// A source that fails or returns no rows is skipped; the remaining tables
/// are stacked in source order and must share column names and kinds. When
/// every source fails, the last error is returned.
pub struct MergedTableSource {
    sources: Vec<Box<dyn TableSource>>,
}

impl MergedTableSource {
    pub fn new() -> Self {
        Self { sources: Vec::new() }
    }

    pub fn with_source(mut self, source: impl TableSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl Default for MergedTableSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TableSource for MergedTableSource {
    fn name(&self) -> String {
        let names: Vec<String> = self.sources.iter().map(|s| s.name()).collect();
        format!("merged[{}]", names.join(", "))
    }

    fn load(&self) -> Result<Table> {
        let mut merged: Option<Table> = None;
        let mut last_error: Option<TelematicsError> = None;
        let mut loaded = 0;

        for source in &self.sources {
            let table = match source.load() {
                Ok(table) => table,
                Err(e) => {
                    warn!(source = %source.name(), error = %e, "Skipping source that failed to load");
                    last_error = Some(e);
                    continue;
                }
            };
            loaded += 1;
            if table.is_empty() {
                warn!(source = %source.name(), "Source returned no rows");
                continue;
            }
            merged = Some(match merged {
                None => table,
                Some(acc) => acc.vstack(&table)?,
            });
        }

        match (merged, last_error) {
            (Some(table), _) => {
                info!(rows = table.n_rows(), sources = loaded, "Merged source tables");
                Ok(table)
            }
            (None, Some(e)) if loaded == 0 => Err(e),
            (None, _) => Ok(Table::empty(&Schema::telematics())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{Column, VEHICLE_ID};

    fn table(ids: &[&str]) -> Table {
        Table::new(vec![
            Column::identifier(VEHICLE_ID, ids.iter().map(|s| Some(*s)).collect()),
            Column::numeric_dense("engine_load", &vec![50.0; ids.len()]),
        ])
        .unwrap()
    }

    struct FailingSource;

    impl TableSource for FailingSource {
        fn name(&self) -> String {
            "failing".to_string()
        }

        fn load(&self) -> Result<Table> {
            Err(TelematicsError::DataError("connection refused".to_string()))
        }
    }

    #[test]
    fn test_merge_concatenates_in_order() {
        let source = MergedTableSource::new()
            .with_source(MemoryTableSource::new(table(&["a", "b"])))
            .with_source(MemoryTableSource::new(table(&["c"])));
        let merged = source.load().unwrap();
        assert_eq!(merged.n_rows(), 3);
        assert_eq!(merged.text_values(VEHICLE_ID).unwrap()[2].as_deref(), Some("c"));
    }

    #[test]
    fn test_merge_falls_back_to_available_source() {
        let source = MergedTableSource::new()
            .with_source(FailingSource)
            .with_source(MemoryTableSource::new(table(&[])))
            .with_source(MemoryTableSource::new(table(&["x"])));
        assert_eq!(source.load().unwrap().n_rows(), 1);
    }

    #[test]
    fn test_merge_all_failed() {
        let source = MergedTableSource::new().with_source(FailingSource);
        assert!(matches!(source.load(), Err(TelematicsError::DataError(_))));
    }

    #[test]
    fn test_merge_schema_mismatch() {
        let other = table(&["z"]).without_column("engine_load");
        let source = MergedTableSource::new()
            .with_source(MemoryTableSource::new(table(&["a"])))
            .with_source(MemoryTableSource::new(other));
        assert!(matches!(source.load(), Err(TelematicsError::SchemaError(_))));
    }
}
