//! Maintenance classifier training
//!
//! - [`split_features_and_label`] and [`partition`] prepare the data
//! - [`FeatureScaler`] standardizes feature matrices
//! - [`RandomForest`] is the bagged tree ensemble
//! - [`Trainer`] runs the whole stage and returns a [`MaintenanceModel`]
//!   with a [`ClassificationReport`]

mod config;
mod metrics;
mod model;
mod scaling;
mod split;
mod trainer;
pub mod decision_tree;
pub mod random_forest;

pub use config::{ScalerFit, TrainerConfig};
pub use decision_tree::{DecisionTree, TreeNode};
pub use metrics::{AveragedMetrics, ClassMetrics, ClassificationReport, ConfusionMatrix};
pub use model::MaintenanceModel;
pub use random_forest::{MaxFeatures, RandomForest};
pub use scaling::{scale, FeatureScaler};
pub use split::{distinct_labels, partition, split_features_and_label, FeatureMatrix, Partition};
pub use trainer::{Trainer, TrainingOutcome, TrainingSummary};
