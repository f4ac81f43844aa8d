//! Vehicle telematics - cleaning, feature derivation and maintenance prediction
//!
//! This crate turns raw per-trip telematics rows into a cleaned table, derives
//! efficiency, idle-time and load/speed flags per vehicle, trains a random
//! forest that predicts whether a vehicle needs maintenance, and aggregates a
//! per-vehicle dashboard.
//!
//! # Modules
//!
//! ## Data
//! - [`table`] - Typed columnar table with a declared schema
//! - [`source`] - Table sources (CSV files, in-memory, merged)
//! - [`analysis`] - Descriptive statistics and correlations
//!
//! ## Stages
//! - [`preprocessing`] - Median imputation, z-score outlier rejection, standardization
//! - [`feature_engineering`] - Fuel efficiency, idle time and maintenance flags
//! - [`training`] - Random forest training, partitioning and evaluation
//! - [`export`] - Per-vehicle dashboard aggregation
//!
//! ## Orchestration
//! - [`config`] - Pipeline configuration
//! - [`pipeline`] - One-shot and polling pipeline driver
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;

// Data
pub mod table;
pub mod source;
pub mod analysis;

// Stages
pub mod preprocessing;
pub mod feature_engineering;
pub mod training;
pub mod export;

// Orchestration
pub mod config;
pub mod pipeline;
pub mod cli;

pub use error::{Result, Stage, TelematicsError};
pub use config::{DriverConfig, PipelineConfig};
pub use pipeline::{PipelineDriver, RunOutcome, RunReport, WatchSummary};

/// Prelude for common imports
pub mod prelude {
    pub use crate::config::{DriverConfig, PipelineConfig};
    pub use crate::error::{Result, TelematicsError};
    pub use crate::feature_engineering::{FeatureConfig, FeatureDeriver, ZeroFuelPolicy};
    pub use crate::pipeline::{PipelineDriver, RunOutcome};
    pub use crate::preprocessing::{Cleaner, CleaningConfig};
    pub use crate::source::{CsvTableSource, MemoryTableSource, MergedTableSource, TableSource};
    pub use crate::table::{Column, ColumnKind, Schema, Table};
    pub use crate::training::{
        ClassificationReport, MaintenanceModel, ScalerFit, Trainer, TrainerConfig,
    };
}
