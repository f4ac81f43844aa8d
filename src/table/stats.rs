//! Per-column statistics
//!
//! Standard deviations use the sample divisor `n - 1` unless stated otherwise.
//! A column with fewer than two present values, or whose values are all equal,
//! has a standard deviation of exactly zero.

use super::Column;
use serde::{Deserialize, Serialize};

/// Summary of one numeric column, recomputed on every pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnStatistics {
    pub name: String,
    /// Present (non-missing) values
    pub count: usize,
    pub missing: usize,
    pub mean: f64,
    pub median: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

impl ColumnStatistics {
    /// Statistics over the present values of a float column.
    ///
    /// Returns `None` for text columns and for columns with no present value,
    /// whose statistics are undefined.
    pub fn from_column(column: &Column) -> Option<Self> {
        let values = column.as_f64()?;
        Self::from_values(column.name(), values)
    }

    pub fn from_values(name: &str, values: &[Option<f64>]) -> Option<Self> {
        let present: Vec<f64> = values.iter().flatten().copied().collect();
        if present.is_empty() {
            return None;
        }

        let mean = mean(&present);
        let std = sample_std(&present, mean);
        let min = present.iter().copied().fold(f64::INFINITY, f64::min);
        let max = present.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Some(Self {
            name: name.to_string(),
            count: present.len(),
            missing: values.len() - present.len(),
            mean,
            median: median(&present),
            std,
            min,
            max,
        })
    }

    /// Z-score of `value` against this column
    pub fn z_score(&self, value: f64) -> f64 {
        z_score(value, self.mean, self.std)
    }
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Median of the values; the mean of the two middle values for an even count
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Sample standard deviation around a precomputed mean
pub fn sample_std(values: &[f64], mean: f64) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    deviation(values, mean, (values.len() - 1) as f64)
}

/// Population standard deviation (divisor `n`) around a precomputed mean
pub fn population_std(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    deviation(values, mean, values.len() as f64)
}

fn deviation(values: &[f64], mean: f64, divisor: f64) -> f64 {
    // A rounded mean of equal values would otherwise leave a ~1e-17 residue
    if is_constant(values) {
        return 0.0;
    }
    let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    (ss / divisor).sqrt()
}

/// True when every value equals the first
pub fn is_constant(values: &[f64]) -> bool {
    values.windows(2).all(|pair| pair[0] == pair[1])
}

/// `(value - mean) / std`, defined as 0 for a constant column
pub fn z_score(value: f64, mean: f64, std: f64) -> f64 {
    if std == 0.0 {
        0.0
    } else {
        (value - mean) / std
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median_odd_and_even() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
    }

    #[test]
    fn test_sample_std() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let m = mean(&values);
        assert_eq!(m, 5.0);
        // Sum of squares 32, n - 1 = 7
        assert!((sample_std(&values, m) - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
        assert_eq!(sample_std(&[1.0], 1.0), 0.0);
    }

    #[test]
    fn test_constant_column_z_score_is_zero() {
        let stats = ColumnStatistics::from_values("c", &[Some(5.0), Some(5.0), Some(5.0)]).unwrap();
        assert_eq!(stats.std, 0.0);
        assert_eq!(stats.z_score(5.0), 0.0);
        assert_eq!(stats.z_score(100.0), 0.0);
    }

    #[test]
    fn test_inexact_constant_has_zero_std() {
        let values = [0.1; 3];
        let m = mean(&values);
        assert_ne!(m, 0.1);
        assert_eq!(sample_std(&values, m), 0.0);
        assert_eq!(population_std(&values, m), 0.0);

        let stats = ColumnStatistics::from_values("c", &[Some(0.1); 3]).unwrap();
        assert_eq!(stats.std, 0.0);
        assert_eq!(stats.z_score(0.1), 0.0);
    }

    #[test]
    fn test_population_std() {
        assert_eq!(population_std(&[0.0, 2.0], 1.0), 1.0);
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(population_std(&values, 5.0), 2.0);
        assert_eq!(population_std(&[], 0.0), 0.0);
    }

    #[test]
    fn test_statistics_skip_missing() {
        let stats =
            ColumnStatistics::from_values("x", &[Some(1.0), None, Some(3.0), Some(8.0)]).unwrap();
        assert_eq!(stats.count, 3);
        assert_eq!(stats.missing, 1);
        assert_eq!(stats.median, 3.0);
        assert_eq!(stats.mean, 4.0);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 8.0);
    }

    #[test]
    fn test_all_missing_is_undefined() {
        assert!(ColumnStatistics::from_values("x", &[None, None]).is_none());
    }
}
