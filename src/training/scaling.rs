//! Zero-mean, unit-variance scaling of feature matrices

use super::split::FeatureMatrix;
use crate::error::{Result, TelematicsError};
use crate::preprocessing::ScalerParams;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Per-feature standard scaler over an `Array2`.
///
/// Deviations use the population divisor, so a fitted set scales to unit variance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureScaler {
    params: Vec<ScalerParams>,
    is_fitted: bool,
}

impl FeatureScaler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fit(&mut self, x: &Array2<f64>) -> Result<&mut Self> {
        self.params = x
            .columns()
            .into_iter()
            .map(|col| ScalerParams::fit_population(&col.to_vec()))
            .collect();
        self.is_fitted = true;
        Ok(self)
    }

    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(TelematicsError::ModelNotFitted);
        }
        if x.ncols() != self.params.len() {
            return Err(TelematicsError::ShapeError {
                expected: format!("{} features", self.params.len()),
                actual: format!("{} features", x.ncols()),
            });
        }

        let mut result = x.clone();
        for (mut col, params) in result.columns_mut().into_iter().zip(&self.params) {
            col.mapv_inplace(|v| params.apply(v));
        }
        Ok(result)
    }

    pub fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }

    pub fn params(&self) -> &[ScalerParams] {
        &self.params
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }
}

/// Standardize a feature set using statistics fitted on that same set
pub fn scale(features: &FeatureMatrix) -> Result<FeatureMatrix> {
    let values = FeatureScaler::new().fit_transform(&features.values)?;
    FeatureMatrix::new(features.names.clone(), values)
}
