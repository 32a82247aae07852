//! Held-out evaluation metrics

use super::to_external;
use serde::{Deserialize, Serialize};

/// Precision, recall and F1 for one class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassReport {
    /// External rating of the class, e.g. `"3"`
    pub label: String,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

/// Averaged precision, recall and F1
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AverageReport {
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

/// Importance of a single feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

/// Evaluation of a trained model on its held-out partition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    pub accuracy: f64,
    /// Accuracy of always predicting the most frequent held-out class
    pub baseline_accuracy: f64,
    pub classes: Vec<ClassReport>,
    pub macro_avg: AverageReport,
    pub weighted_avg: AverageReport,
    /// Rows are true classes, columns predicted classes, both in class order
    pub confusion_matrix: Vec<Vec<usize>>,
    /// Sorted by importance, highest first
    pub feature_importance: Vec<FeatureImportance>,
    pub n_test: usize,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

impl MetricsReport {
    /// Compute the report from internal class values.
    ///
    /// `classes` are the sorted internal target classes; values of `y_true`
    /// and `y_pred` outside of them are ignored by the per-class figures.
    pub fn compute(
        y_true: &[i64],
        y_pred: &[i64],
        classes: &[i64],
        importances: &[f64],
        feature_names: &[String],
    ) -> Self {
        let n_classes = classes.len();
        let position = |value: i64| classes.binary_search(&value).ok();

        let mut confusion_matrix = vec![vec![0usize; n_classes]; n_classes];
        let mut correct = 0usize;
        for (&t, &p) in y_true.iter().zip(y_pred) {
            if t == p {
                correct += 1;
            }
            if let (Some(i), Some(j)) = (position(t), position(p)) {
                confusion_matrix[i][j] += 1;
            }
        }

        let n_test = y_true.len();
        let accuracy = ratio(correct, n_test);

        let class_reports: Vec<ClassReport> = classes
            .iter()
            .enumerate()
            .map(|(k, &class)| {
                let tp = confusion_matrix[k][k];
                let support: usize = confusion_matrix[k].iter().sum();
                let predicted: usize = confusion_matrix.iter().map(|row| row[k]).sum();

                let precision = ratio(tp, predicted);
                let recall = ratio(tp, support);
                let f1_score = if precision + recall > 0.0 {
                    2.0 * precision * recall / (precision + recall)
                } else {
                    0.0
                };

                ClassReport {
                    label: to_external(class).to_string(),
                    precision,
                    recall,
                    f1_score,
                    support,
                }
            })
            .collect();

        let total_support: usize = class_reports.iter().map(|c| c.support).sum();
        let mean = |f: fn(&ClassReport) -> f64| {
            if class_reports.is_empty() {
                0.0
            } else {
                class_reports.iter().map(f).sum::<f64>() / class_reports.len() as f64
            }
        };
        let weighted = |f: fn(&ClassReport) -> f64| {
            if total_support == 0 {
                0.0
            } else {
                class_reports
                    .iter()
                    .map(|c| f(c) * c.support as f64)
                    .sum::<f64>()
                    / total_support as f64
            }
        };

        let macro_avg = AverageReport {
            precision: mean(|c| c.precision),
            recall: mean(|c| c.recall),
            f1_score: mean(|c| c.f1_score),
            support: total_support,
        };
        let weighted_avg = AverageReport {
            precision: weighted(|c| c.precision),
            recall: weighted(|c| c.recall),
            f1_score: weighted(|c| c.f1_score),
            support: total_support,
        };

        let majority = class_reports.iter().map(|c| c.support).max().unwrap_or(0);
        let baseline_accuracy = ratio(majority, n_test);

        let mut feature_importance: Vec<FeatureImportance> = feature_names
            .iter()
            .zip(importances)
            .map(|(name, &importance)| FeatureImportance {
                feature: name.clone(),
                importance,
            })
            .collect();
        feature_importance.sort_by(|a, b| b.importance.total_cmp(&a.importance));

        Self {
            accuracy,
            baseline_accuracy,
            classes: class_reports,
            macro_avg,
            weighted_avg,
            confusion_matrix,
            feature_importance,
            n_test,
        }
    }

    /// Report for an external class label such as `"3"`
    pub fn class(&self, label: &str) -> Option<&ClassReport> {
        self.classes.iter().find(|c| c.label == label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(n: &[&str]) -> Vec<String> {
        n.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_report_figures() {
        // internal classes 0..2 are external ratings 1..3
        let y_true = vec![0, 0, 1, 1, 2, 2];
        let y_pred = vec![0, 1, 1, 1, 2, 0];
        let report = MetricsReport::compute(&y_true, &y_pred, &[0, 1, 2], &[], &[]);

        assert!((report.accuracy - 4.0 / 6.0).abs() < 1e-12);
        assert_eq!(report.confusion_matrix, vec![vec![1, 1, 0], vec![0, 2, 0], vec![1, 0, 1]]);

        let second = report.class("2").unwrap();
        assert_eq!(second.support, 2);
        assert!((second.precision - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(second.recall, 1.0);
        assert!((second.f1_score - 0.8).abs() < 1e-12);

        assert_eq!(report.macro_avg.support, 6);
        assert!((report.baseline_accuracy - 2.0 / 6.0).abs() < 1e-12);
        assert_eq!(
            report.classes.iter().map(|c| c.label.as_str()).collect::<Vec<_>>(),
            vec!["1", "2", "3"]
        );
    }

    #[test]
    fn test_zero_division_yields_zero() {
        // class 2 is never predicted and never true
        let report = MetricsReport::compute(&[0, 1], &[0, 1], &[0, 1, 2], &[], &[]);
        let third = report.class("3").unwrap();
        assert_eq!(third.precision, 0.0);
        assert_eq!(third.recall, 0.0);
        assert_eq!(third.f1_score, 0.0);
        assert_eq!(third.support, 0);
    }

    #[test]
    fn test_importances_sorted_descending() {
        let report = MetricsReport::compute(
            &[0],
            &[0],
            &[0],
            &[0.1, 0.6, 0.0, 0.3],
            &names(&["a", "b", "c", "d"]),
        );
        let order: Vec<&str> = report
            .feature_importance
            .iter()
            .map(|f| f.feature.as_str())
            .collect();
        assert_eq!(order, vec!["b", "d", "a", "c"]);
    }
}
