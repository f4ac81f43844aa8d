//! Missing value handling
//!
//! Numeric columns are filled with their median; rows missing an identifier,
//! categorical or label value are removed, since no safe default exists.

use crate::error::{Result, TelematicsError};
use crate::table::{median, Column, ColumnKind, Table};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Median imputer for numeric columns
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MedianImputer {
    fill_values: BTreeMap<String, f64>,
    is_fitted: bool,
}

impl MedianImputer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute the median of every numeric column from the values present now
    pub fn fit(&mut self, table: &Table) -> Result<&mut Self> {
        self.fill_values.clear();

        for column in table.columns().iter().filter(|c| c.kind() == ColumnKind::Numeric) {
            let present = column.present_values();
            if present.is_empty() {
                return Err(TelematicsError::data_quality(format!(
                    "column '{}' is entirely missing; its median is undefined",
                    column.name()
                )));
            }
            self.fill_values.insert(column.name().to_string(), median(&present));
        }

        self.is_fitted = true;
        Ok(self)
    }

    /// Replace missing numeric values with the fitted medians
    pub fn transform(&self, table: &Table) -> Result<Table> {
        if !self.is_fitted {
            return Err(TelematicsError::ModelNotFitted);
        }

        let mut result = table.clone();
        for (name, &fill) in &self.fill_values {
            let Some(column) = table.column(name) else {
                continue;
            };
            let Some(values) = column.as_f64() else {
                continue;
            };

            let missing = column.null_count();
            if missing == 0 {
                continue;
            }

            let filled: Vec<Option<f64>> = values.iter().map(|v| Some(v.unwrap_or(fill))).collect();
            result = result.with_column(column.with_values(filled)?)?;
            info!(column = %name, missing, median = fill, "Imputed missing values with median");
        }

        Ok(result)
    }

    pub fn fit_transform(&mut self, table: &Table) -> Result<Table> {
        self.fit(table)?;
        self.transform(table)
    }

    /// Fitted median per numeric column
    pub fn fill_values(&self) -> &BTreeMap<String, f64> {
        &self.fill_values
    }
}

/// Remove rows missing a value in any identifier, categorical or label column.
///
/// Returns the surviving table and the number of rows removed.
pub fn drop_incomplete_rows(table: &Table) -> Result<(Table, usize)> {
    let text_like: Vec<&Column> = table
        .columns()
        .iter()
        .filter(|c| c.kind() != ColumnKind::Numeric)
        .collect();

    let keep: Vec<bool> = (0..table.n_rows())
        .map(|row| text_like.iter().all(|c| !c.data().is_missing(row)))
        .collect();

    let dropped = keep.iter().filter(|k| !**k).count();
    if dropped > 0 {
        info!(dropped, "Dropped rows with missing identifier, categorical or label values");
    } else {
        debug!("No rows with missing identifier, categorical or label values");
    }

    Ok((table.filter_rows(&keep)?, dropped))
}

/// Fill numeric gaps with the column median, then drop rows with missing
/// non-numeric values.
///
/// Medians are computed over every row present at call time, including rows
/// that are later dropped for a missing categorical value.
pub fn impute_missing(table: &Table) -> Result<Table> {
    if table.is_empty() {
        return Err(TelematicsError::data_quality("cannot impute an empty table"));
    }
    let imputed = MedianImputer::new().fit_transform(table)?;
    let (complete, _) = drop_incomplete_rows(&imputed)?;
    Ok(complete)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_with_gaps() -> Table {
        Table::new(vec![
            Column::identifier("vehicle_id", vec![Some("v1"), Some("v1"), Some("v2"), Some("v2")]),
            Column::numeric("engine_load", vec![Some(10.0), None, Some(30.0), Some(50.0)]),
            Column::categorical("region", vec![Some("north"), Some("south"), None, Some("east")]),
        ])
        .unwrap()
    }

    #[test]
    fn test_median_imputation() {
        let result = impute_missing(&table_with_gaps()).unwrap();

        // Row 2 removed for its missing region
        assert_eq!(result.n_rows(), 3);
        let loads = result.f64_values("engine_load").unwrap();
        // Median over all four rows present at call time: [10, 30, 50] -> 30
        assert_eq!(loads, &[Some(10.0), Some(30.0), Some(50.0)]);
    }

    #[test]
    fn test_all_missing_column_fails() {
        let table = Table::new(vec![
            Column::numeric("a", vec![None, None]),
            Column::numeric_dense("b", &[1.0, 2.0]),
        ])
        .unwrap();

        let err = impute_missing(&table).unwrap_err();
        assert!(matches!(err, TelematicsError::DataQualityError(_)));
        assert!(err.to_string().contains("'a'"));
    }

    #[test]
    fn test_empty_table_fails() {
        let table = Table::new(vec![Column::numeric("a", vec![])]).unwrap();
        assert!(matches!(
            impute_missing(&table),
            Err(TelematicsError::DataQualityError(_))
        ));
    }

    #[test]
    fn test_input_not_mutated() {
        let table = table_with_gaps();
        let _ = impute_missing(&table).unwrap();
        assert_eq!(table.column("engine_load").unwrap().null_count(), 1);
        assert_eq!(table.n_rows(), 4);
    }

    #[test]
    fn test_transform_before_fit() {
        let imputer = MedianImputer::new();
        assert!(matches!(
            imputer.transform(&table_with_gaps()),
            Err(TelematicsError::ModelNotFitted)
        ));
    }

    #[test]
    fn test_missing_label_rows_dropped() {
        let table = Table::new(vec![
            Column::numeric_dense("x", &[1.0, 2.0, 3.0]),
            Column::label("maintenance_required", vec![Some(0.0), None, Some(1.0)]),
        ])
        .unwrap();

        let (complete, dropped) = drop_incomplete_rows(&table).unwrap();
        assert_eq!(dropped, 1);
        assert_eq!(complete.f64_values("x").unwrap(), &[Some(1.0), Some(3.0)]);
    }
}
