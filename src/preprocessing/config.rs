//! Cleaning configuration

use crate::error::{Result, TelematicsError};
use crate::table::Schema;
use serde::{Deserialize, Serialize};

/// Configuration for the cleaning stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningConfig {
    /// Columns that must be present before cleaning starts
    pub required_columns: Vec<String>,

    /// Rows with any numeric |z-score| at or above this value are dropped
    pub outlier_threshold: f64,

    /// Whether to rescale numeric columns to zero mean, unit variance
    /// as the final cleaning step
    pub standardize: bool,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            required_columns: Schema::telematics()
                .names()
                .into_iter()
                .map(String::from)
                .collect(),
            outlier_threshold: 3.0,
            standardize: false,
        }
    }
}

impl CleaningConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the outlier threshold
    pub fn with_outlier_threshold(mut self, threshold: f64) -> Self {
        self.outlier_threshold = threshold;
        self
    }

    /// Builder method to enable or disable standardization
    pub fn with_standardize(mut self, standardize: bool) -> Self {
        self.standardize = standardize;
        self
    }

    /// Builder method to replace the required column list
    pub fn with_required_columns<S: Into<String>>(mut self, columns: Vec<S>) -> Self {
        self.required_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.outlier_threshold.is_finite() || self.outlier_threshold <= 0.0 {
            return Err(TelematicsError::ConfigError(format!(
                "outlier_threshold must be a positive number, got {}",
                self.outlier_threshold
            )));
        }
        Ok(())
    }
}
