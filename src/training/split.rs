//! Feature/label extraction and train/test partitioning

use crate::error::{Result, TelematicsError};
use crate::table::{ColumnData, ColumnKind, Table};
use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Named numeric feature matrix, one row per table row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureMatrix {
    pub names: Vec<String>,
    pub values: Array2<f64>,
}

impl FeatureMatrix {
    pub fn new(names: Vec<String>, values: Array2<f64>) -> Result<Self> {
        if names.len() != values.ncols() {
            return Err(TelematicsError::ShapeError {
                expected: format!("{} feature columns", names.len()),
                actual: format!("{} columns", values.ncols()),
            });
        }
        Ok(Self { names, values })
    }

    /// Gather the named columns of `table` in the given order.
    ///
    /// Every column must be numeric storage with no missing values.
    pub fn from_table(table: &Table, names: &[String]) -> Result<Self> {
        let mut columns: Vec<Vec<f64>> = Vec::with_capacity(names.len());

        for name in names {
            let column = table.column(name).ok_or_else(|| {
                TelematicsError::training(format!("feature column '{}' is missing", name))
            })?;
            let values = match column.data() {
                ColumnData::Float(v) => v,
                ColumnData::Text(_) => {
                    return Err(TelematicsError::training(format!(
                        "feature column '{}' is {:?}; only numeric features can train the classifier",
                        name,
                        column.kind()
                    )))
                }
            };
            let dense = values
                .iter()
                .enumerate()
                .map(|(row, v)| {
                    v.ok_or_else(|| {
                        TelematicsError::training(format!(
                            "feature column '{}' is missing a value at row {}",
                            name, row
                        ))
                    })
                })
                .collect::<Result<Vec<f64>>>()?;
            columns.push(dense);
        }

        let values = Array2::from_shape_fn((table.n_rows(), names.len()), |(r, c)| columns[c][r]);
        Self::new(names.to_vec(), values)
    }

    pub fn n_rows(&self) -> usize {
        self.values.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.values.ncols()
    }

    /// Rows at `indices`, in that order
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        Self {
            names: self.names.clone(),
            values: self.values.select(Axis(0), indices),
        }
    }
}

/// Separate the classifier inputs from the target.
///
/// Features are every column except `id_column` and `label_column`, in table
/// order. Labels must be present and in {0, 1}.
pub fn split_features_and_label(
    table: &Table,
    label_column: &str,
    id_column: &str,
) -> Result<(FeatureMatrix, Array1<f64>)> {
    if table.is_empty() {
        return Err(TelematicsError::training("cannot train on an empty table"));
    }

    let label_values = table.f64_values(label_column).ok_or_else(|| {
        TelematicsError::training(format!("label column '{}' is missing", label_column))
    })?;

    let mut label = Vec::with_capacity(label_values.len());
    for (row, value) in label_values.iter().enumerate() {
        match value {
            Some(v) if *v == 0.0 || *v == 1.0 => label.push(*v),
            Some(v) => {
                return Err(TelematicsError::training(format!(
                    "label '{}' must be 0 or 1, got {} at row {}",
                    label_column, v, row
                )))
            }
            None => {
                return Err(TelematicsError::training(format!(
                    "label '{}' is missing at row {}",
                    label_column, row
                )))
            }
        }
    }

    let names: Vec<String> = table
        .columns()
        .iter()
        .filter(|c| c.name() != label_column && c.name() != id_column)
        .map(|c| {
            if c.kind() == ColumnKind::Categorical {
                Err(TelematicsError::training(format!(
                    "categorical column '{}' cannot be used as a feature",
                    c.name()
                )))
            } else {
                Ok(c.name().to_string())
            }
        })
        .collect::<Result<_>>()?;

    if names.is_empty() {
        return Err(TelematicsError::training("table has no feature columns"));
    }

    let features = FeatureMatrix::from_table(table, &names)?;
    Ok((features, Array1::from_vec(label)))
}

/// Result of a seeded train/test split
#[derive(Debug, Clone)]
pub struct Partition {
    pub train_features: FeatureMatrix,
    pub test_features: FeatureMatrix,
    pub train_label: Array1<f64>,
    pub test_label: Array1<f64>,
    /// Source row of each training row
    pub train_indices: Vec<usize>,
    /// Source row of each test row
    pub test_indices: Vec<usize>,
}

/// Shuffle the rows with a seeded ChaCha8 generator and hold out the first
/// `ceil(n * test_fraction)` of them for testing.
///
/// The same seed and input always yield the same partition.
pub fn partition(
    features: &FeatureMatrix,
    label: &Array1<f64>,
    test_fraction: f64,
    seed: u64,
) -> Result<Partition> {
    let n = features.n_rows();
    if n != label.len() {
        return Err(TelematicsError::training(format!(
            "feature rows ({}) and label rows ({}) differ",
            n,
            label.len()
        )));
    }
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(TelematicsError::ConfigError(format!(
            "test_fraction must be in (0, 1), got {}",
            test_fraction
        )));
    }

    let n_test = (n as f64 * test_fraction).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(TelematicsError::training(format!(
            "{} rows cannot be split into non-empty train and test partitions at fraction {}",
            n, test_fraction
        )));
    }

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let (test_indices, train_indices) = indices.split_at(n_test);
    let test_indices = test_indices.to_vec();
    let train_indices = train_indices.to_vec();

    let result = Partition {
        train_features: features.select_rows(&train_indices),
        test_features: features.select_rows(&test_indices),
        train_label: label.select(Axis(0), &train_indices),
        test_label: label.select(Axis(0), &test_indices),
        train_indices,
        test_indices,
    };

    if result.train_features.n_rows() != result.train_label.len()
        || result.test_features.n_rows() != result.test_label.len()
    {
        return Err(TelematicsError::training("feature and label rows diverged after partitioning"));
    }

    Ok(result)
}

/// Number of distinct label values
pub fn distinct_labels(label: &Array1<f64>) -> usize {
    let mut values: Vec<f64> = label.to_vec();
    values.sort_by(|a, b| a.total_cmp(b));
    values.dedup();
    values.len()
}
