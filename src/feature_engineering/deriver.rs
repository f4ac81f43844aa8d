//! Derived telematics features

use super::config::{FeatureConfig, ZeroFuelPolicy};
use crate::error::{Result, TelematicsError};
use crate::table::{
    Column, Table, AVERAGE_SPEED, DISTANCE_TRAVELED, ENGINE_LOAD, FUEL_CONSUMED, VEHICLE_ID,
};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

pub const FUEL_EFFICIENCY_PER_TRIP: &str = "fuel_efficiency_per_trip";
pub const IDLE_TIME: &str = "idle_time";
pub const HIGH_ENGINE_LOAD: &str = "high_engine_load";
pub const HIGH_SPEED_DRIVING: &str = "high_speed_driving";

/// Computes per-row and per-vehicle derived columns
#[derive(Debug, Clone, Default)]
pub struct FeatureDeriver {
    config: FeatureConfig,
}

impl FeatureDeriver {
    pub fn new(config: FeatureConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    /// Add `fuel_efficiency_per_trip = distance_traveled / fuel_consumed`.
    ///
    /// Rows with zero fuel are dropped or rejected according to
    /// [`ZeroFuelPolicy`]; the column never holds a non-finite value.
    pub fn derive_efficiency(&self, table: &Table) -> Result<Table> {
        let fuel = dense_values(table, FUEL_CONSUMED)?;

        let zero_rows: Vec<usize> = fuel
            .iter()
            .enumerate()
            .filter(|(_, f)| **f == 0.0)
            .map(|(i, _)| i)
            .collect();

        let working = if zero_rows.is_empty() {
            table.clone()
        } else {
            match self.config.zero_fuel_policy {
                ZeroFuelPolicy::Fail => {
                    let row = zero_rows[0];
                    return Err(TelematicsError::feature(format!(
                        "fuel_consumed is zero at row {} (vehicle {}); efficiency ratio is undefined",
                        row,
                        vehicle_at(table, row)
                    )));
                }
                ZeroFuelPolicy::Drop => {
                    warn!(rows = zero_rows.len(), "Dropping rows with zero fuel consumed");
                    let keep: Vec<bool> = fuel.iter().map(|f| *f != 0.0).collect();
                    table.filter_rows(&keep)?
                }
            }
        };

        let distance = dense_values(&working, DISTANCE_TRAVELED)?;
        let fuel = dense_values(&working, FUEL_CONSUMED)?;

        let mut ratios = Vec::with_capacity(distance.len());
        for (row, (d, f)) in distance.iter().zip(fuel.iter()).enumerate() {
            let ratio = d / f;
            if !ratio.is_finite() {
                return Err(TelematicsError::feature(format!(
                    "non-finite fuel efficiency {} at row {} (vehicle {})",
                    ratio,
                    row,
                    vehicle_at(&working, row)
                )));
            }
            ratios.push(ratio);
        }

        debug!(rows = ratios.len(), "Derived fuel efficiency per trip");
        working.with_column(Column::numeric_dense(FUEL_EFFICIENCY_PER_TRIP, &ratios))
    }

    /// Replace `idle_time` with each vehicle's count of rows where
    /// `average_speed == 0`, repeated on every row of that vehicle
    pub fn derive_idle_time(&self, table: &Table) -> Result<Table> {
        let speed = dense_values(table, AVERAGE_SPEED)?;
        let ids = table.text_values(VEHICLE_ID).ok_or_else(|| {
            TelematicsError::feature(format!("required column '{}' is missing", VEHICLE_ID))
        })?;

        // Phase 1: aggregate per vehicle
        let mut idle_counts: BTreeMap<&str, usize> = BTreeMap::new();
        for (row, (id, s)) in ids.iter().zip(speed.iter()).enumerate() {
            let id = id.as_deref().ok_or_else(|| {
                TelematicsError::feature(format!("vehicle_id is missing at row {}", row))
            })?;
            let count = idle_counts.entry(id).or_insert(0);
            if *s == 0.0 {
                *count += 1;
            }
        }

        // Phase 2: broadcast back to rows
        let idle: Vec<f64> = ids
            .iter()
            .filter_map(|id| id.as_deref())
            .map(|id| idle_counts.get(id).copied().unwrap_or(0) as f64)
            .collect();

        debug!(vehicles = idle_counts.len(), "Derived idle time per vehicle");
        table.with_column(Column::numeric_dense(IDLE_TIME, &idle))
    }

    /// Add `high_engine_load` and `high_speed_driving` 0/1 flags
    pub fn derive_maintenance_flags(&self, table: &Table) -> Result<Table> {
        let load = dense_values(table, ENGINE_LOAD)?;
        let speed = dense_values(table, AVERAGE_SPEED)?;

        let high_load = threshold_flags(&load, self.config.engine_load_threshold);
        let high_speed = threshold_flags(&speed, self.config.speed_threshold);

        table
            .with_column(Column::numeric_dense(HIGH_ENGINE_LOAD, &high_load))?
            .with_column(Column::numeric_dense(HIGH_SPEED_DRIVING, &high_speed))
    }

    /// Efficiency, then idle time, then flags. Either every derived column is
    /// present in the result or an error is returned.
    pub fn derive_features(&self, table: &Table) -> Result<Table> {
        self.config.validate()?;
        for name in [VEHICLE_ID, AVERAGE_SPEED, ENGINE_LOAD, DISTANCE_TRAVELED, FUEL_CONSUMED] {
            if !table.has_column(name) {
                return Err(TelematicsError::feature(format!(
                    "required column '{}' is missing",
                    name
                )));
            }
        }

        let efficiency = self.derive_efficiency(table)?;
        let idle = self.derive_idle_time(&efficiency)?;
        let derived = self.derive_maintenance_flags(&idle)?;

        info!(
            rows_in = table.n_rows(),
            rows_out = derived.n_rows(),
            "Feature derivation completed"
        );
        Ok(derived)
    }
}

/// Float values of a required column, failing on absence or gaps
fn dense_values(table: &Table, name: &str) -> Result<Vec<f64>> {
    let values = table
        .f64_values(name)
        .ok_or_else(|| TelematicsError::feature(format!("required column '{}' is missing", name)))?;

    values
        .iter()
        .enumerate()
        .map(|(row, v)| {
            v.ok_or_else(|| {
                TelematicsError::feature(format!("column '{}' is missing a value at row {}", name, row))
            })
        })
        .collect()
}

fn threshold_flags(values: &[f64], threshold: f64) -> Vec<f64> {
    values
        .iter()
        .map(|v| if *v > threshold { 1.0 } else { 0.0 })
        .collect()
}

fn vehicle_at(table: &Table, row: usize) -> String {
    table
        .text_values(VEHICLE_ID)
        .and_then(|ids| ids.get(row).cloned().flatten())
        .unwrap_or_else(|| "<unknown>".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trips() -> Table {
        Table::new(vec![
            Column::identifier(VEHICLE_ID, vec![Some("v1"), Some("v2"), Some("v1"), Some("v1")]),
            Column::numeric_dense(AVERAGE_SPEED, &[0.0, 0.0, 85.0, 0.0]),
            Column::numeric_dense(ENGINE_LOAD, &[80.0, 80.01, 20.0, 95.0]),
            Column::numeric_dense(DISTANCE_TRAVELED, &[100.0, 50.0, 30.0, 10.0]),
            Column::numeric_dense(FUEL_CONSUMED, &[10.0, 5.0, 3.0, 4.0]),
        ])
        .unwrap()
    }

    #[test]
    fn test_efficiency_ratio() {
        let result = FeatureDeriver::default().derive_efficiency(&trips()).unwrap();
        assert_eq!(
            result.f64_values(FUEL_EFFICIENCY_PER_TRIP).unwrap(),
            &[Some(10.0), Some(10.0), Some(10.0), Some(2.5)]
        );
    }

    #[test]
    fn test_idle_time_broadcast() {
        let result = FeatureDeriver::default().derive_idle_time(&trips()).unwrap();
        assert_eq!(
            result.f64_values(IDLE_TIME).unwrap(),
            &[Some(2.0), Some(1.0), Some(2.0), Some(2.0)]
        );
    }

    #[test]
    fn test_idle_time_replaces_existing_column() {
        let table = trips()
            .with_column(Column::numeric_dense(IDLE_TIME, &[9.0, 9.0, 9.0, 9.0]))
            .unwrap();
        let result = FeatureDeriver::default().derive_idle_time(&table).unwrap();
        assert_eq!(result.n_cols(), table.n_cols());
        assert_eq!(result.f64_values(IDLE_TIME).unwrap()[0], Some(2.0));
    }

    #[test]
    fn test_flag_boundaries() {
        let result = FeatureDeriver::default().derive_maintenance_flags(&trips()).unwrap();
        assert_eq!(
            result.f64_values(HIGH_ENGINE_LOAD).unwrap(),
            &[Some(0.0), Some(1.0), Some(0.0), Some(1.0)]
        );
        assert_eq!(
            result.f64_values(HIGH_SPEED_DRIVING).unwrap(),
            &[Some(0.0), Some(0.0), Some(1.0), Some(0.0)]
        );
    }

    #[test]
    fn test_configured_thresholds() {
        let deriver = FeatureDeriver::new(FeatureConfig::new().with_engine_load_threshold(90.0));
        let result = deriver.derive_maintenance_flags(&trips()).unwrap();
        assert_eq!(
            result.f64_values(HIGH_ENGINE_LOAD).unwrap(),
            &[Some(0.0), Some(0.0), Some(0.0), Some(1.0)]
        );
    }

    #[test]
    fn test_zero_fuel_fail_policy() {
        let table = trips()
            .with_column(Column::numeric_dense(FUEL_CONSUMED, &[10.0, 0.0, 3.0, 4.0]))
            .unwrap();
        let deriver = FeatureDeriver::new(FeatureConfig::new().with_zero_fuel_policy(ZeroFuelPolicy::Fail));
        let err = deriver.derive_features(&table).unwrap_err();
        assert!(matches!(err, TelematicsError::FeatureComputationError(_)));
        assert!(err.to_string().contains("v2"));
    }

    #[test]
    fn test_missing_column() {
        let table = trips().without_column(ENGINE_LOAD);
        let err = FeatureDeriver::default().derive_features(&table).unwrap_err();
        assert!(matches!(err, TelematicsError::FeatureComputationError(_)));
        assert!(err.to_string().contains(ENGINE_LOAD));
    }
}
