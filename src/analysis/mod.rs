//! Descriptive statistics and correlations for exploratory analysis

use crate::table::{ColumnKind, ColumnStatistics, Table};
use ndarray::Array2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Statistics of every numeric column, in table order.
///
/// Columns with no present values are skipped.
pub fn describe(table: &Table) -> Vec<ColumnStatistics> {
    table
        .columns()
        .iter()
        .filter(|c| c.kind() == ColumnKind::Numeric)
        .filter_map(ColumnStatistics::from_column)
        .collect()
}

/// Symmetric Pearson correlation matrix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    pub names: Vec<String>,
    pub values: Array2<f64>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.names.iter().position(|n| n == a)?;
        let j = self.names.iter().position(|n| n == b)?;
        Some(self.values[[i, j]])
    }

    /// Pairs ordered by absolute correlation, strongest first, excluding the diagonal
    pub fn strongest_pairs(&self, limit: usize) -> Vec<(String, String, f64)> {
        let n = self.names.len();
        let mut pairs: Vec<(String, String, f64)> = (0..n)
            .flat_map(|i| ((i + 1)..n).map(move |j| (i, j)))
            .map(|(i, j)| (self.names[i].clone(), self.names[j].clone(), self.values[[i, j]]))
            .collect();
        pairs.sort_by(|a, b| b.2.abs().total_cmp(&a.2.abs()));
        pairs.truncate(limit);
        pairs
    }
}

/// Pearson correlation between every pair of numeric and label columns.
///
/// Rows missing either value are skipped pair by pair. A pair with zero
/// variance on either side correlates as 0.
pub fn correlation_matrix(table: &Table) -> CorrelationMatrix {
    let columns: Vec<(&str, &[Option<f64>])> = table
        .columns()
        .iter()
        .filter(|c| matches!(c.kind(), ColumnKind::Numeric | ColumnKind::Label))
        .filter_map(|c| c.as_f64().map(|v| (c.name(), v)))
        .collect();

    let n = columns.len();
    let rows: Vec<Vec<f64>> = (0..n)
        .into_par_iter()
        .map(|i| {
            (0..n)
                .map(|j| {
                    if i == j {
                        1.0
                    } else {
                        pearson(columns[i].1, columns[j].1)
                    }
                })
                .collect()
        })
        .collect();

    CorrelationMatrix {
        names: columns.iter().map(|(name, _)| name.to_string()).collect(),
        values: Array2::from_shape_fn((n, n), |(i, j)| rows[i][j]),
    }
}

fn pearson(a: &[Option<f64>], b: &[Option<f64>]) -> f64 {
    let pairs: Vec<(f64, f64)> = a
        .iter()
        .zip(b.iter())
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect();

    if pairs.len() < 2 {
        return 0.0;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (x, y) in &pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        0.0
    } else {
        cov / (var_x * var_y).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{Column, MAINTENANCE_REQUIRED, VEHICLE_ID};

    fn sample() -> Table {
        Table::new(vec![
            Column::identifier(VEHICLE_ID, vec![Some("a"), Some("a"), Some("b"), Some("b")]),
            Column::numeric_dense("x", &[1.0, 2.0, 3.0, 4.0]),
            Column::numeric_dense("y", &[2.0, 4.0, 6.0, 8.0]),
            Column::numeric("z", vec![Some(4.0), Some(3.0), None, Some(1.0)]),
            Column::numeric_dense("constant", &[5.0; 4]),
            Column::label(MAINTENANCE_REQUIRED, vec![Some(0.0), Some(0.0), Some(1.0), Some(1.0)]),
        ])
        .unwrap()
    }

    #[test]
    fn test_describe_numeric_only() {
        let stats = describe(&sample());
        let names: Vec<&str> = stats.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["x", "y", "z", "constant"]);
        assert_eq!(stats[2].missing, 1);
        assert_eq!(stats[0].median, 2.5);
    }

    #[test]
    fn test_correlations() {
        let corr = correlation_matrix(&sample());
        assert_eq!(corr.names.len(), 5);
        assert!((corr.get("x", "y").unwrap() - 1.0).abs() < 1e-12);
        assert!((corr.get("x", "z").unwrap() + 1.0).abs() < 0.05);
        assert_eq!(corr.get("x", "constant"), Some(0.0));
        assert_eq!(corr.get("y", "x"), corr.get("x", "y"));
        assert!(corr.get(VEHICLE_ID, "x").is_none());
    }

    #[test]
    fn test_strongest_pairs() {
        let corr = correlation_matrix(&sample());
        let top = corr.strongest_pairs(1);
        assert_eq!(top.len(), 1);
        assert!((top[0].2.abs() - 1.0).abs() < 0.05);
    }
}
