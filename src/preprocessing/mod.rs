//! Data cleaning module
//!
//! Turns a raw telematics table into one with:
//! - no missing numeric values (median imputation)
//! - no rows missing an identifier, categorical or label value
//! - no z-score outliers
//! - optionally, zero-mean / unit-variance numeric columns
//!
//! The steps always run in that order, so outlier thresholds apply to
//! imputed data in original units.

mod cleaner;
mod config;
pub mod imputer;
pub mod outlier;
pub mod scaler;

pub use cleaner::{Cleaner, CleaningReport};
pub use config::CleaningConfig;
pub use imputer::{drop_incomplete_rows, impute_missing, MedianImputer};
pub use outlier::{reject_outliers, OutlierReport, ZScoreFilter};
pub use scaler::{standardize, ScalerParams, StandardScaler};
