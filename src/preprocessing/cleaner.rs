//! Cleaning stage: impute, reject outliers, optionally standardize

use crate::error::{Result, TelematicsError};
use super::config::CleaningConfig;
use super::imputer::{drop_incomplete_rows, MedianImputer};
use super::outlier::{OutlierReport, ZScoreFilter};
use super::scaler::StandardScaler;
use crate::table::{ColumnKind, Table};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::info;

/// What a cleaning pass did to its input
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleaningReport {
    pub rows_in: usize,
    /// Median used per numeric column that had gaps
    pub imputed_medians: BTreeMap<String, f64>,
    pub rows_dropped_incomplete: usize,
    pub outliers: OutlierReport,
    pub standardized: bool,
    pub rows_out: usize,
    pub elapsed_secs: f64,
}

/// Produces tables with no missing values and no z-score outliers
#[derive(Debug, Clone, Default)]
pub struct Cleaner {
    config: CleaningConfig,
}

impl Cleaner {
    pub fn new(config: CleaningConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CleaningConfig {
        &self.config
    }

    /// `standardize(reject_outliers(impute_missing(table)))`, the last step
    /// only when enabled
    pub fn clean(&self, table: &Table) -> Result<Table> {
        self.clean_with_report(table).map(|(t, _)| t)
    }

    pub fn clean_with_report(&self, table: &Table) -> Result<(Table, CleaningReport)> {
        let start = Instant::now();
        self.config.validate()?;
        self.validate_input(table)?;

        let mut report = CleaningReport {
            rows_in: table.n_rows(),
            ..Default::default()
        };

        // Impute numeric gaps, then drop rows that cannot be imputed
        let mut imputer = MedianImputer::new();
        let imputed = imputer.fit_transform(table)?;
        report.imputed_medians = imputer
            .fill_values()
            .iter()
            .filter(|(name, _)| table.column(name).map(|c| c.null_count() > 0).unwrap_or(false))
            .map(|(name, v)| (name.clone(), *v))
            .collect();
        let (complete, dropped) = drop_incomplete_rows(&imputed)?;
        report.rows_dropped_incomplete = dropped;

        if complete.is_empty() {
            return Err(TelematicsError::data_quality(
                "no rows left after removing rows with missing identifier, categorical or label values",
            ));
        }

        // Outlier statistics are taken after imputation, in original units
        let (filtered, outliers) = ZScoreFilter::new(self.config.outlier_threshold)?
            .fit_transform(&complete)?;
        report.outliers = outliers;

        if filtered.is_empty() {
            return Err(TelematicsError::data_quality("no rows left after outlier rejection"));
        }

        let cleaned = if self.config.standardize {
            report.standardized = true;
            StandardScaler::new().fit_transform(&filtered)?
        } else {
            filtered
        };

        report.rows_out = cleaned.n_rows();
        report.elapsed_secs = start.elapsed().as_secs_f64();
        info!(
            rows_in = report.rows_in,
            rows_out = report.rows_out,
            standardized = report.standardized,
            "Cleaning completed"
        );

        Ok((cleaned, report))
    }

    /// Reject empty tables and tables missing a required column
    pub fn validate_input(&self, table: &Table) -> Result<()> {
        for name in &self.config.required_columns {
            if !table.has_column(name) {
                return Err(TelematicsError::data_quality(format!(
                    "required column '{}' is missing",
                    name
                )));
            }
        }
        if table.is_empty() {
            return Err(TelematicsError::data_quality("input table is empty"));
        }
        for column in table.columns().iter().filter(|c| c.kind() == ColumnKind::Numeric) {
            let Some(values) = column.as_f64() else {
                continue;
            };
            if let Some((row, value)) = values
                .iter()
                .enumerate()
                .find_map(|(row, v)| match v {
                    Some(x) if !x.is_finite() => Some((row, *x)),
                    _ => None,
                })
            {
                return Err(TelematicsError::data_quality(format!(
                    "column '{}' row {}: non-finite value {}",
                    column.name(),
                    row,
                    value
                )));
            }
        }
        Ok(())
    }
}
