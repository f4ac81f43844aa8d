//! Trainer configuration

use crate::error::{Result, TelematicsError};
use crate::table::{MAINTENANCE_REQUIRED, VEHICLE_ID};
use serde::{Deserialize, Serialize};

/// Where the feature scaler is fitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalerFit {
    /// Fit on the training partition and apply the same transform to the test partition
    #[default]
    TrainOnly,
    /// Fit one scaler on the training partition and a separate one on the test partition
    PerPartition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    /// Fraction of rows held out for evaluation, in (0, 1)
    pub test_fraction: f64,
    pub seed: u64,
    pub n_trees: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub scaler_fit: ScalerFit,
    pub label_column: String,
    pub id_column: String,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            seed: 42,
            n_trees: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            scaler_fit: ScalerFit::TrainOnly,
            label_column: MAINTENANCE_REQUIRED.to_string(),
            id_column: VEHICLE_ID.to_string(),
        }
    }
}

impl TrainerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_test_fraction(mut self, fraction: f64) -> Self {
        self.test_fraction = fraction;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_n_trees(mut self, n_trees: usize) -> Self {
        self.n_trees = n_trees;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_scaler_fit(mut self, scaler_fit: ScalerFit) -> Self {
        self.scaler_fit = scaler_fit;
        self
    }

    pub fn with_label_column(mut self, name: impl Into<String>) -> Self {
        self.label_column = name.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(TelematicsError::ConfigError(format!(
                "test_fraction must be in (0, 1), got {}",
                self.test_fraction
            )));
        }
        if self.n_trees == 0 {
            return Err(TelematicsError::ConfigError("n_trees must be at least 1".to_string()));
        }
        if self.min_samples_split < 2 || self.min_samples_leaf < 1 {
            return Err(TelematicsError::ConfigError(
                "min_samples_split must be >= 2 and min_samples_leaf >= 1".to_string(),
            ));
        }
        if self.label_column == self.id_column {
            return Err(TelematicsError::ConfigError(
                "label and identifier columns must differ".to_string(),
            ));
        }
        Ok(())
    }
}
