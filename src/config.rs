//! Pipeline configuration
//!
//! One [`PipelineConfig`] carries the settings of every stage. It is passed
//! explicitly to the driver; nothing is read from process-wide state.

use crate::error::{Result, TelematicsError};
use crate::feature_engineering::FeatureConfig;
use crate::preprocessing::CleaningConfig;
use crate::training::TrainerConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Where the driver reads from, writes to and how often it polls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Raw CSV inputs, merged in order
    pub inputs: Vec<PathBuf>,
    pub output_dir: PathBuf,
    /// File whose modification time signals new data; the first input when unset
    pub watch_path: Option<PathBuf>,
    pub poll_interval_secs: u64,
    /// Inputs older than this are not considered new
    pub freshness_secs: u64,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            inputs: vec![PathBuf::from("vehicle_performance_data.csv")],
            output_dir: PathBuf::from("output"),
            watch_path: None,
            poll_interval_secs: 3600,
            freshness_secs: 86_400,
        }
    }
}

impl DriverConfig {
    pub fn with_inputs(mut self, inputs: Vec<PathBuf>) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_watch_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.watch_path = Some(path.into());
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_secs = interval.as_secs();
        self
    }

    pub fn with_freshness(mut self, max_age: Duration) -> Self {
        self.freshness_secs = max_age.as_secs();
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn freshness(&self) -> Duration {
        Duration::from_secs(self.freshness_secs)
    }

    /// The file polled for freshness
    pub fn watched(&self) -> Option<&Path> {
        self.watch_path
            .as_deref()
            .or_else(|| self.inputs.first().map(PathBuf::as_path))
    }
}

/// Settings for a full pipeline run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub cleaning: CleaningConfig,
    pub features: FeatureConfig,
    pub training: TrainerConfig,
    pub driver: DriverConfig,
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cleaning(mut self, cleaning: CleaningConfig) -> Self {
        self.cleaning = cleaning;
        self
    }

    pub fn with_features(mut self, features: FeatureConfig) -> Self {
        self.features = features;
        self
    }

    pub fn with_training(mut self, training: TrainerConfig) -> Self {
        self.training = training;
        self
    }

    pub fn with_driver(mut self, driver: DriverConfig) -> Self {
        self.driver = driver;
        self
    }

    /// Check every stage's settings
    pub fn validate(&self) -> Result<()> {
        self.cleaning.validate()?;
        self.features.validate()?;
        self.training.validate()?;
        if self.driver.inputs.is_empty() {
            return Err(TelematicsError::ConfigError(
                "at least one input path is required".to_string(),
            ));
        }
        if self.driver.poll_interval_secs == 0 {
            return Err(TelematicsError::ConfigError(
                "poll_interval_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}
