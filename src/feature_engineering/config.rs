//! Feature derivation configuration

use crate::error::{Result, TelematicsError};
use serde::{Deserialize, Serialize};

/// What to do with a row whose `fuel_consumed` is zero
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroFuelPolicy {
    /// Remove the row before computing the ratio and log how many were removed
    #[default]
    Drop,
    /// Abort derivation with a `FeatureComputationError`
    Fail,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// `high_engine_load` is 1 when engine load is strictly above this
    pub engine_load_threshold: f64,
    /// `high_speed_driving` is 1 when average speed is strictly above this
    pub speed_threshold: f64,
    pub zero_fuel_policy: ZeroFuelPolicy,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            engine_load_threshold: 80.0,
            speed_threshold: 80.0,
            zero_fuel_policy: ZeroFuelPolicy::Drop,
        }
    }
}

impl FeatureConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_engine_load_threshold(mut self, threshold: f64) -> Self {
        self.engine_load_threshold = threshold;
        self
    }

    pub fn with_speed_threshold(mut self, threshold: f64) -> Self {
        self.speed_threshold = threshold;
        self
    }

    pub fn with_zero_fuel_policy(mut self, policy: ZeroFuelPolicy) -> Self {
        self.zero_fuel_policy = policy;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.engine_load_threshold.is_finite() || !self.speed_threshold.is_finite() {
            return Err(TelematicsError::ConfigError(
                "feature thresholds must be finite".to_string(),
            ));
        }
        Ok(())
    }
}
