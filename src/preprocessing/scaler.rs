//! Standard (z-score) scaling of numeric table columns

use crate::error::{Result, TelematicsError};
use crate::table::{mean, population_std, sample_std, ColumnKind, Table};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Center and scale for one column.
///
/// A zero-deviation column gets the identity transform (center 0, scale 1),
/// so it is left exactly as it was.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScalerParams {
    pub center: f64,
    pub scale: f64,
}

impl ScalerParams {
    pub const IDENTITY: ScalerParams = ScalerParams {
        center: 0.0,
        scale: 1.0,
    };

    /// Fit to the given present values, scaling by the sample deviation
    pub fn fit(values: &[f64]) -> Self {
        let m = mean(values);
        Self::from_moments(m, sample_std(values, m))
    }

    /// Fit scaling by the population deviation, which gives the scaled values
    /// unit variance over `values`
    pub fn fit_population(values: &[f64]) -> Self {
        let m = mean(values);
        Self::from_moments(m, population_std(values, m))
    }

    fn from_moments(center: f64, std: f64) -> Self {
        if std == 0.0 || !std.is_finite() {
            Self::IDENTITY
        } else {
            Self { center, scale: std }
        }
    }

    #[inline]
    pub fn apply(&self, value: f64) -> f64 {
        (value - self.center) / self.scale
    }

    #[inline]
    pub fn invert(&self, value: f64) -> f64 {
        value * self.scale + self.center
    }
}

/// Standard scaler over the numeric columns of a table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StandardScaler {
    params: Vec<(String, ScalerParams)>,
    is_fitted: bool,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fit the scaler to every numeric column
    pub fn fit(&mut self, table: &Table) -> Result<&mut Self> {
        self.params = table
            .columns()
            .iter()
            .filter(|c| c.kind() == ColumnKind::Numeric)
            .map(|c| (c.name().to_string(), ScalerParams::fit(&c.present_values())))
            .collect();
        self.is_fitted = true;
        Ok(self)
    }

    /// Rescale the fitted columns; missing values stay missing
    pub fn transform(&self, table: &Table) -> Result<Table> {
        if !self.is_fitted {
            return Err(TelematicsError::ModelNotFitted);
        }

        let mut result = table.clone();
        for (name, params) in &self.params {
            let Some(column) = table.column(name) else {
                continue;
            };
            let Some(values) = column.as_f64() else {
                continue;
            };
            let scaled: Vec<Option<f64>> = values.iter().map(|v| v.map(|x| params.apply(x))).collect();
            result = result.with_column(column.with_values(scaled)?)?;
        }

        Ok(result)
    }

    pub fn fit_transform(&mut self, table: &Table) -> Result<Table> {
        self.fit(table)?;
        self.transform(table)
    }

    /// Undo the scaling of the fitted columns
    pub fn inverse_transform(&self, table: &Table) -> Result<Table> {
        if !self.is_fitted {
            return Err(TelematicsError::ModelNotFitted);
        }

        let mut result = table.clone();
        for (name, params) in &self.params {
            let Some(column) = table.column(name) else {
                continue;
            };
            let Some(values) = column.as_f64() else {
                continue;
            };
            let restored: Vec<Option<f64>> = values.iter().map(|v| v.map(|x| params.invert(x))).collect();
            result = result.with_column(column.with_values(restored)?)?;
        }

        Ok(result)
    }

    pub fn params(&self) -> &[(String, ScalerParams)] {
        &self.params
    }
}

/// Rescale every numeric column to zero mean and unit variance using its own
/// statistics. Constant columns are returned unchanged.
pub fn standardize(table: &Table) -> Result<Table> {
    let result = StandardScaler::new().fit_transform(table)?;
    info!(columns = table.names_of_kind(ColumnKind::Numeric).len(), "Standardized numeric columns");
    Ok(result)
}
