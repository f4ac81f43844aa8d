//! Z-score outlier rejection
//!
//! A row survives only if every numeric column's |z-score| is strictly below
//! the threshold. Statistics come from the table being filtered, so callers
//! must impute first: missing values cannot contribute to a mean.

use crate::error::{Result, TelematicsError};
use crate::table::{ColumnKind, ColumnStatistics, Table};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

/// Fitted z-score filter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZScoreFilter {
    threshold: f64,
    stats: Vec<ColumnStatistics>,
    is_fitted: bool,
}

/// Outcome of one filtering pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutlierReport {
    pub rows_before: usize,
    pub rows_removed: usize,
    /// Number of out-of-range values per column; a removed row may count in several
    pub flagged_per_column: BTreeMap<String, usize>,
}

impl ZScoreFilter {
    pub fn new(threshold: f64) -> Result<Self> {
        if !threshold.is_finite() || threshold <= 0.0 {
            return Err(TelematicsError::ConfigError(format!(
                "outlier threshold must be a positive number, got {}",
                threshold
            )));
        }
        Ok(Self {
            threshold,
            stats: Vec::new(),
            is_fitted: false,
        })
    }

    /// Compute mean and standard deviation of every numeric column
    pub fn fit(&mut self, table: &Table) -> Result<&mut Self> {
        let numeric: Vec<_> = table
            .columns()
            .iter()
            .filter(|c| c.kind() == ColumnKind::Numeric)
            .collect();

        // Columns are independent; collect preserves column order
        self.stats = numeric
            .par_iter()
            .filter_map(|c| ColumnStatistics::from_column(c))
            .collect();

        self.is_fitted = true;
        Ok(self)
    }

    /// Drop rows with any numeric |z-score| >= threshold
    pub fn transform(&self, table: &Table) -> Result<(Table, OutlierReport)> {
        if !self.is_fitted {
            return Err(TelematicsError::ModelNotFitted);
        }

        let mut keep = vec![true; table.n_rows()];
        let mut report = OutlierReport {
            rows_before: table.n_rows(),
            ..Default::default()
        };

        for stats in &self.stats {
            let Some(values) = table.f64_values(&stats.name) else {
                continue;
            };
            let mut flagged = 0;
            for (row, value) in values.iter().enumerate() {
                if let Some(v) = value {
                    if stats.z_score(*v).abs() >= self.threshold {
                        keep[row] = false;
                        flagged += 1;
                    }
                }
            }
            if flagged > 0 {
                report.flagged_per_column.insert(stats.name.clone(), flagged);
            }
        }

        report.rows_removed = keep.iter().filter(|k| !**k).count();
        info!(
            threshold = self.threshold,
            removed = report.rows_removed,
            remaining = report.rows_before - report.rows_removed,
            "Removed outliers by z-score"
        );

        Ok((table.filter_rows(&keep)?, report))
    }

    pub fn fit_transform(&mut self, table: &Table) -> Result<(Table, OutlierReport)> {
        self.fit(table)?;
        self.transform(table)
    }

    /// Fitted statistics, one per numeric column
    pub fn statistics(&self) -> &[ColumnStatistics] {
        &self.stats
    }
}

/// Remove rows where any numeric column deviates `threshold` or more standard
/// deviations from its mean. Constant columns never reject a row.
pub fn reject_outliers(table: &Table, threshold: f64) -> Result<Table> {
    let (filtered, _) = ZScoreFilter::new(threshold)?.fit_transform(table)?;
    Ok(filtered)
}
