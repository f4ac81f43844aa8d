//! Fitted maintenance classifier artifact

use super::random_forest::RandomForest;
use super::scaling::FeatureScaler;
use super::split::FeatureMatrix;
use crate::error::{Result, TelematicsError};
use crate::table::Table;
use chrono::{DateTime, Utc};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Random forest plus everything needed to score raw feature tables:
/// feature names in training order and the scaler fitted on training rows
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceModel {
    feature_names: Vec<String>,
    scaler: FeatureScaler,
    forest: RandomForest,
    trained_at: DateTime<Utc>,
    n_train_samples: usize,
}

impl MaintenanceModel {
    pub(crate) fn new(
        feature_names: Vec<String>,
        scaler: FeatureScaler,
        forest: RandomForest,
        n_train_samples: usize,
    ) -> Self {
        Self {
            feature_names,
            scaler,
            forest,
            trained_at: Utc::now(),
            n_train_samples,
        }
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn forest(&self) -> &RandomForest {
        &self.forest
    }

    pub fn scaler(&self) -> &FeatureScaler {
        &self.scaler
    }

    pub fn trained_at(&self) -> DateTime<Utc> {
        self.trained_at
    }

    pub fn n_train_samples(&self) -> usize {
        self.n_train_samples
    }

    /// Predict from unscaled features, applying the stored scaler
    pub fn predict(&self, features: &FeatureMatrix) -> Result<Array1<f64>> {
        self.check_names(features)?;
        let scaled = self.scaler.transform(&features.values)?;
        self.forest.predict(&scaled)
    }

    /// Predict from features already on the model's scale
    pub fn predict_scaled(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.forest.predict(x)
    }

    /// Probability of class 1 per row, from unscaled features
    pub fn predict_maintenance_probability(&self, features: &FeatureMatrix) -> Result<Array1<f64>> {
        self.check_names(features)?;
        let scaled = self.scaler.transform(&features.values)?;
        let proba = self.forest.predict_proba(&scaled)?;
        let positive = self.forest.classes().iter().position(|c| *c == 1.0);
        Ok(match positive {
            Some(col) => proba.column(col).to_owned(),
            None => Array1::zeros(proba.nrows()),
        })
    }

    /// Score a feature table that carries the training feature columns
    pub fn score_table(&self, table: &Table) -> Result<Array1<f64>> {
        let features = FeatureMatrix::from_table(table, &self.feature_names)?;
        self.predict(&features)
    }

    /// `(feature, importance)` pairs, most important first
    pub fn feature_importances(&self) -> Vec<(String, f64)> {
        let Some(importances) = self.forest.feature_importances() else {
            return Vec::new();
        };
        let mut pairs: Vec<(String, f64)> = self
            .feature_names
            .iter()
            .cloned()
            .zip(importances.iter().copied())
            .collect();
        pairs.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        pairs
    }

    fn check_names(&self, features: &FeatureMatrix) -> Result<()> {
        if features.names != self.feature_names {
            return Err(TelematicsError::ShapeError {
                expected: format!("features {:?}", self.feature_names),
                actual: format!("features {:?}", features.names),
            });
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}
