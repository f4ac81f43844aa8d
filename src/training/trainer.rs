//! Training stage: split, partition, scale, fit, evaluate

use super::config::{ScalerFit, TrainerConfig};
use super::metrics::ClassificationReport;
use super::model::MaintenanceModel;
use super::random_forest::RandomForest;
use super::scaling::{scale, FeatureScaler};
use super::split::{distinct_labels, partition, split_features_and_label, FeatureMatrix};
use crate::error::{Result, TelematicsError};
use crate::table::Table;
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

/// Model and held-out evaluation from one training run
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub model: MaintenanceModel,
    pub report: ClassificationReport,
    pub summary: TrainingSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub n_train: usize,
    pub n_test: usize,
    pub n_features: usize,
    pub n_trees: usize,
    pub seed: u64,
    pub scaler_fit: ScalerFit,
    pub training_time_secs: f64,
}

#[derive(Debug, Clone, Default)]
pub struct Trainer {
    config: TrainerConfig,
}

impl Trainer {
    pub fn new(config: TrainerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Fit a forest of `n_trees` trees on the training rows.
    ///
    /// The scaler is fitted on `features` and stored with the model.
    pub fn train(&self, features: &FeatureMatrix, label: &Array1<f64>) -> Result<MaintenanceModel> {
        if features.n_rows() == 0 {
            return Err(TelematicsError::training("training partition is empty"));
        }
        if features.n_rows() != label.len() {
            return Err(TelematicsError::training(format!(
                "feature rows ({}) and label rows ({}) differ",
                features.n_rows(),
                label.len()
            )));
        }
        let n_classes = distinct_labels(label);
        if n_classes < 2 {
            return Err(TelematicsError::training(format!(
                "training labels hold {} distinct value(s); at least 2 are required",
                n_classes
            )));
        }

        let mut scaler = FeatureScaler::new();
        let x = scaler.fit_transform(&features.values)?;

        let mut forest = RandomForest::new(self.config.n_trees)
            .with_seed(self.config.seed)
            .with_max_depth(self.config.max_depth)
            .with_min_samples_split(self.config.min_samples_split)
            .with_min_samples_leaf(self.config.min_samples_leaf);
        forest.fit(&x, label)?;

        debug!(
            rows = features.n_rows(),
            features = features.n_features(),
            trees = forest.n_trees(),
            "Trained maintenance classifier"
        );
        Ok(MaintenanceModel::new(features.names.clone(), scaler, forest, features.n_rows()))
    }

    /// Score held-out rows. With [`ScalerFit::PerPartition`] the test rows are
    /// standardized with their own statistics instead of the model's.
    pub fn evaluate(
        &self,
        model: &MaintenanceModel,
        features: &FeatureMatrix,
        label: &Array1<f64>,
    ) -> Result<ClassificationReport> {
        if features.n_rows() != label.len() {
            return Err(TelematicsError::training(format!(
                "feature rows ({}) and label rows ({}) differ",
                features.n_rows(),
                label.len()
            )));
        }

        let predictions = match self.config.scaler_fit {
            ScalerFit::TrainOnly => model.predict(features)?,
            ScalerFit::PerPartition => model.predict_scaled(&scale(features)?.values)?,
        };

        ClassificationReport::from_predictions(label, &predictions)
    }

    /// Split a feature table, partition it, train on one side and evaluate on the other
    pub fn fit_and_evaluate(&self, table: &Table) -> Result<TrainingOutcome> {
        let start = Instant::now();
        self.config.validate()?;

        let (features, label) =
            split_features_and_label(table, &self.config.label_column, &self.config.id_column)?;

        let n_classes = distinct_labels(&label);
        if n_classes < 2 {
            return Err(TelematicsError::training(format!(
                "label '{}' has a single value across {} rows; cannot train a classifier",
                self.config.label_column,
                label.len()
            )));
        }

        let parts = partition(&features, &label, self.config.test_fraction, self.config.seed)?;
        let model = self.train(&parts.train_features, &parts.train_label)?;
        let report = self.evaluate(&model, &parts.test_features, &parts.test_label)?;

        let summary = TrainingSummary {
            n_train: parts.train_label.len(),
            n_test: parts.test_label.len(),
            n_features: features.n_features(),
            n_trees: self.config.n_trees,
            seed: self.config.seed,
            scaler_fit: self.config.scaler_fit,
            training_time_secs: start.elapsed().as_secs_f64(),
        };

        info!(
            n_train = summary.n_train,
            n_test = summary.n_test,
            accuracy = report.accuracy,
            f1 = report.positive.f1,
            "Training completed"
        );

        Ok(TrainingOutcome {
            model,
            report,
            summary,
        })
    }
}
