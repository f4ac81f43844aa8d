//! Error types for the telematics pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, TelematicsError>;

/// Pipeline stage an error is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Source,
    Cleaning,
    FeatureDerivation,
    Training,
    Export,
    Driver,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Source => "source",
            Stage::Cleaning => "cleaning",
            Stage::FeatureDerivation => "feature derivation",
            Stage::Training => "training",
            Stage::Export => "export",
            Stage::Driver => "driver",
        };
        f.write_str(name)
    }
}

/// Main error type for the telematics pipeline
#[derive(Error, Debug)]
pub enum TelematicsError {
    /// Malformed or insufficient input at the cleaning boundary
    #[error("Data quality error: {0}")]
    DataQualityError(String),

    /// Undefined arithmetic or missing prerequisite column while deriving features
    #[error("Feature computation error: {0}")]
    FeatureComputationError(String),

    /// Insufficient class diversity, empty partitions or row-count mismatch
    #[error("Training error: {0}")]
    TrainingError(String),

    /// Dashboard aggregation could not be built
    #[error("Export error: {0}")]
    ExportError(String),

    /// Table construction invariant violated (unequal lengths, duplicate names, wrong kind)
    #[error("Schema error: {0}")]
    SchemaError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Model not fitted")]
    ModelNotFitted,
}

impl TelematicsError {
    pub fn data_quality(msg: impl Into<String>) -> Self {
        Self::DataQualityError(msg.into())
    }

    pub fn feature(msg: impl Into<String>) -> Self {
        Self::FeatureComputationError(msg.into())
    }

    pub fn training(msg: impl Into<String>) -> Self {
        Self::TrainingError(msg.into())
    }

    pub fn schema(msg: impl Into<String>) -> Self {
        Self::SchemaError(msg.into())
    }

    /// Stage the error belongs to, for reporting by the driver
    pub fn stage(&self) -> Stage {
        match self {
            Self::DataQualityError(_) => Stage::Cleaning,
            Self::FeatureComputationError(_) => Stage::FeatureDerivation,
            Self::TrainingError(_) | Self::ShapeError { .. } | Self::ModelNotFitted => Stage::Training,
            Self::ExportError(_) => Stage::Export,
            Self::DataError(_) | Self::SchemaError(_) => Stage::Source,
            Self::ConfigError(_) | Self::IoError(_) | Self::SerializationError(_) => Stage::Driver,
        }
    }
}

impl From<polars::error::PolarsError> for TelematicsError {
    fn from(err: polars::error::PolarsError) -> Self {
        TelematicsError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for TelematicsError {
    fn from(err: serde_json::Error) -> Self {
        TelematicsError::SerializationError(err.to_string())
    }
}
