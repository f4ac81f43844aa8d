//! Binary classification metrics

use crate::error::{Result, TelematicsError};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Counts with class 1 (maintenance required) as the positive class
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub true_positives: usize,
    pub false_positives: usize,
    pub true_negatives: usize,
    pub false_negatives: usize,
}

impl ConfusionMatrix {
    pub fn from_predictions(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<Self> {
        if y_true.len() != y_pred.len() {
            return Err(TelematicsError::ShapeError {
                expected: format!("{} predictions", y_true.len()),
                actual: format!("{} predictions", y_pred.len()),
            });
        }

        let mut cm = Self::default();
        for (t, p) in y_true.iter().zip(y_pred.iter()) {
            match (*t > 0.5, *p > 0.5) {
                (true, true) => cm.true_positives += 1,
                (false, true) => cm.false_positives += 1,
                (false, false) => cm.true_negatives += 1,
                (true, false) => cm.false_negatives += 1,
            }
        }
        Ok(cm)
    }

    pub fn total(&self) -> usize {
        self.true_positives + self.false_positives + self.true_negatives + self.false_negatives
    }

    /// `[[tn, fp], [fn, tp]]`, rows are actual classes
    pub fn as_matrix(&self) -> [[usize; 2]; 2] {
        [
            [self.true_negatives, self.false_positives],
            [self.false_negatives, self.true_positives],
        ]
    }
}

/// Precision, recall and F1 for one class
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// Number of true rows of this class
    pub support: usize,
}

impl ClassMetrics {
    fn from_counts(tp: usize, fp: usize, fn_: usize) -> Self {
        let precision = ratio(tp, tp + fp);
        let recall = ratio(tp, tp + fn_);
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        Self {
            precision,
            recall,
            f1,
            support: tp + fn_,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AveragedMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

/// Evaluation of a classifier on held-out rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub accuracy: f64,
    /// Class 0 (no maintenance)
    pub negative: ClassMetrics,
    /// Class 1 (maintenance required)
    pub positive: ClassMetrics,
    pub macro_avg: AveragedMetrics,
    pub weighted_avg: AveragedMetrics,
    pub confusion: ConfusionMatrix,
}

impl ClassificationReport {
    pub fn from_predictions(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<Self> {
        let cm = ConfusionMatrix::from_predictions(y_true, y_pred)?;

        let positive = ClassMetrics::from_counts(cm.true_positives, cm.false_positives, cm.false_negatives);
        // Class 0 seen as positive: its tp are our tn
        let negative = ClassMetrics::from_counts(cm.true_negatives, cm.false_negatives, cm.false_positives);

        let macro_avg = AveragedMetrics {
            precision: (negative.precision + positive.precision) / 2.0,
            recall: (negative.recall + positive.recall) / 2.0,
            f1: (negative.f1 + positive.f1) / 2.0,
        };

        let total = cm.total();
        let weight = |neg: f64, pos: f64| {
            if total == 0 {
                0.0
            } else {
                (neg * negative.support as f64 + pos * positive.support as f64) / total as f64
            }
        };
        let weighted_avg = AveragedMetrics {
            precision: weight(negative.precision, positive.precision),
            recall: weight(negative.recall, positive.recall),
            f1: weight(negative.f1, positive.f1),
        };

        Ok(Self {
            accuracy: ratio(cm.true_positives + cm.true_negatives, total),
            negative,
            positive,
            macro_avg,
            weighted_avg,
            confusion: cm,
        })
    }

    /// Plain-text table in the usual per-class layout
    pub fn summary(&self) -> String {
        let mut out = format!(
            "{:>14} {:>10} {:>10} {:>10} {:>10}\n",
            "", "precision", "recall", "f1-score", "support"
        );
        for (name, m) in [("0", &self.negative), ("1", &self.positive)] {
            out.push_str(&format!(
                "{:>14} {:>10.2} {:>10.2} {:>10.2} {:>10}\n",
                name, m.precision, m.recall, m.f1, m.support
            ));
        }
        let total = self.confusion.total();
        out.push_str(&format!("{:>14} {:>10} {:>10} {:>10.2} {:>10}\n", "accuracy", "", "", self.accuracy, total));
        for (name, m) in [("macro avg", &self.macro_avg), ("weighted avg", &self.weighted_avg)] {
            out.push_str(&format!(
                "{:>14} {:>10.2} {:>10.2} {:>10.2} {:>10}\n",
                name, m.precision, m.recall, m.f1, total
            ));
        }
        out
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_confusion_counts() {
        let y_true = array![1.0, 0.0, 1.0, 1.0, 0.0, 1.0, 0.0, 0.0];
        let y_pred = array![1.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0];

        let cm = ConfusionMatrix::from_predictions(&y_true, &y_pred).unwrap();
        assert_eq!(cm.true_positives, 3);
        assert_eq!(cm.false_positives, 1);
        assert_eq!(cm.true_negatives, 3);
        assert_eq!(cm.false_negatives, 1);
        assert_eq!(cm.as_matrix(), [[3, 1], [1, 3]]);
    }

    #[test]
    fn test_report_values() {
        let y_true = array![1.0, 1.0, 1.0, 0.0, 0.0];
        let y_pred = array![1.0, 1.0, 0.0, 0.0, 1.0];

        let report = ClassificationReport::from_predictions(&y_true, &y_pred).unwrap();
        assert!((report.accuracy - 0.6).abs() < 1e-12);

        // class 1: tp=2 fp=1 fn=1
        assert!((report.positive.precision - 2.0 / 3.0).abs() < 1e-12);
        assert!((report.positive.recall - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(report.positive.support, 3);

        // class 0: tp=1 fp=1 fn=1
        assert!((report.negative.precision - 0.5).abs() < 1e-12);
        assert_eq!(report.negative.support, 2);

        let expected_weighted = (0.5 * 2.0 + (2.0 / 3.0) * 3.0) / 5.0;
        assert!((report.weighted_avg.f1 - expected_weighted).abs() < 1e-12);
    }

    #[test]
    fn test_no_positive_predictions() {
        let y_true = array![0.0, 1.0];
        let y_pred = array![0.0, 0.0];
        let report = ClassificationReport::from_predictions(&y_true, &y_pred).unwrap();
        assert_eq!(report.positive.precision, 0.0);
        assert_eq!(report.positive.f1, 0.0);
        assert!(report.summary().contains("weighted avg"));
    }

    #[test]
    fn test_length_mismatch() {
        assert!(ClassificationReport::from_predictions(&array![1.0], &array![1.0, 0.0]).is_err());
    }
}
