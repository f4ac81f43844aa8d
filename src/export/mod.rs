//! Per-vehicle dashboard export
//!
//! Collapses the feature table to one row per vehicle for reporting tools.

use crate::error::{Result, TelematicsError};
use crate::feature_engineering::IDLE_TIME;
use crate::source::write_csv;
use crate::table::{
    Column, Table, AVERAGE_SPEED, ENGINE_LOAD, FUEL_EFFICIENCY, MAINTENANCE_REQUIRED, VEHICLE_ID,
};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

/// How a dashboard column is reduced per vehicle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    Mean,
    Sum,
}

/// Output columns of the dashboard, in order
pub const DASHBOARD_COLUMNS: [(&str, Aggregation); 5] = [
    (FUEL_EFFICIENCY, Aggregation::Mean),
    (MAINTENANCE_REQUIRED, Aggregation::Sum),
    (AVERAGE_SPEED, Aggregation::Mean),
    (ENGINE_LOAD, Aggregation::Mean),
    (IDLE_TIME, Aggregation::Sum),
];

#[derive(Debug, Clone, Copy, Default)]
struct Accumulator {
    sum: f64,
    count: usize,
}

/// One row per `vehicle_id`, ordered by id.
///
/// `idle_time` is summed over the vehicle's rows as they stand, so a table
/// whose idle time was already broadcast per vehicle reports
/// `idle rows × trip rows`.
pub fn aggregate_for_dashboard(table: &Table) -> Result<Table> {
    let ids = table.text_values(VEHICLE_ID).ok_or_else(|| {
        TelematicsError::ExportError(format!("column '{}' is missing", VEHICLE_ID))
    })?;

    let mut inputs = Vec::with_capacity(DASHBOARD_COLUMNS.len());
    for (name, _) in DASHBOARD_COLUMNS {
        let values = table.f64_values(name).ok_or_else(|| {
            TelematicsError::ExportError(format!("numeric column '{}' is missing", name))
        })?;
        inputs.push(values);
    }

    let mut groups: BTreeMap<&str, Vec<Accumulator>> = BTreeMap::new();
    for (row, id) in ids.iter().enumerate() {
        let Some(id) = id.as_deref() else {
            continue;
        };
        let accs = groups
            .entry(id)
            .or_insert_with(|| vec![Accumulator::default(); DASHBOARD_COLUMNS.len()]);
        for (acc, values) in accs.iter_mut().zip(&inputs) {
            if let Some(v) = values[row] {
                acc.sum += v;
                acc.count += 1;
            }
        }
    }

    let vehicle_ids: Vec<Option<&str>> = groups.keys().map(|id| Some(*id)).collect();
    let mut columns = vec![Column::identifier(VEHICLE_ID, vehicle_ids)];

    for (idx, (name, aggregation)) in DASHBOARD_COLUMNS.iter().enumerate() {
        let values: Vec<Option<f64>> = groups
            .values()
            .map(|accs| {
                let acc = accs[idx];
                match aggregation {
                    Aggregation::Sum => Some(acc.sum),
                    Aggregation::Mean if acc.count > 0 => Some(acc.sum / acc.count as f64),
                    Aggregation::Mean => None,
                }
            })
            .collect();
        columns.push(Column::numeric(*name, values));
    }

    Table::new(columns)
}

/// Aggregate and write the dashboard CSV
pub fn export_dashboard(table: &Table, path: impl AsRef<Path>) -> Result<Table> {
    let dashboard = aggregate_for_dashboard(table)?;
    write_csv(&dashboard, path.as_ref())?;
    info!(
        path = %path.as_ref().display(),
        vehicles = dashboard.n_rows(),
        "Exported dashboard data"
    );
    Ok(dashboard)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features() -> Table {
        Table::new(vec![
            Column::identifier(VEHICLE_ID, vec![Some("v2"), Some("v1"), Some("v2"), Some("v1")]),
            Column::numeric_dense(FUEL_EFFICIENCY, &[10.0, 20.0, 30.0, 40.0]),
            Column::numeric_dense(AVERAGE_SPEED, &[0.0, 50.0, 60.0, 70.0]),
            Column::numeric_dense(ENGINE_LOAD, &[40.0, 50.0, 60.0, 90.0]),
            Column::numeric_dense(IDLE_TIME, &[1.0, 0.0, 1.0, 0.0]),
            Column::label(MAINTENANCE_REQUIRED, vec![Some(1.0), Some(0.0), Some(1.0), Some(1.0)]),
            Column::numeric_dense("extra", &[0.0; 4]),
        ])
        .unwrap()
    }

    #[test]
    fn test_aggregation() {
        let dashboard = aggregate_for_dashboard(&features()).unwrap();

        assert_eq!(dashboard.n_rows(), 2);
        assert_eq!(
            dashboard.column_names(),
            vec![VEHICLE_ID, FUEL_EFFICIENCY, MAINTENANCE_REQUIRED, AVERAGE_SPEED, ENGINE_LOAD, IDLE_TIME]
        );
        assert_eq!(
            dashboard.text_values(VEHICLE_ID).unwrap(),
            &[Some("v1".to_string()), Some("v2".to_string())]
        );
        assert_eq!(dashboard.f64_values(FUEL_EFFICIENCY).unwrap(), &[Some(30.0), Some(20.0)]);
        assert_eq!(dashboard.f64_values(MAINTENANCE_REQUIRED).unwrap(), &[Some(1.0), Some(2.0)]);
        assert_eq!(dashboard.f64_values(ENGINE_LOAD).unwrap(), &[Some(70.0), Some(50.0)]);
        assert_eq!(dashboard.f64_values(IDLE_TIME).unwrap(), &[Some(0.0), Some(2.0)]);
    }

    #[test]
    fn test_missing_column() {
        let table = features().without_column(IDLE_TIME);
        let err = aggregate_for_dashboard(&table).unwrap_err();
        assert!(matches!(err, TelematicsError::ExportError(_)));
    }

    #[test]
    fn test_export_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dashboard.csv");
        export_dashboard(&features(), &path).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("vehicle_id,fuel_efficiency,maintenance_required"));
        assert_eq!(contents.lines().count(), 3);
    }
}
