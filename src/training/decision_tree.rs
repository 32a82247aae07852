//! Decision tree classifier

use crate::error::{Result, StressError};
use ndarray::{Array1, Array2, ArrayView1};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Decision tree node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf node with the training class counts that reached it
    Leaf {
        class_counts: Vec<f64>,
        n_samples: usize,
    },
    /// Internal node; rows with `x[feature_idx] <= threshold` go left
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
        impurity: f64,
    },
}

/// Impurity criterion
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Criterion {
    /// Gini impurity
    Gini,
    /// Shannon entropy
    Entropy,
}

impl Criterion {
    fn impurity(&self, counts: &[f64], n: f64) -> f64 {
        if n <= 0.0 {
            return 0.0;
        }
        match self {
            Criterion::Gini => 1.0 - counts.iter().map(|&c| (c / n).powi(2)).sum::<f64>(),
            Criterion::Entropy => counts
                .iter()
                .filter(|&&c| c > 0.0)
                .map(|&c| {
                    let p = c / n;
                    -p * p.ln()
                })
                .sum(),
        }
    }
}

/// Best split found for a single feature
#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature_idx: usize,
    threshold: f64,
    gain: f64,
}

/// Decision tree classifier over class indices `0..n_classes`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    /// Tree root
    root: Option<TreeNode>,
    /// Maximum depth
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Impurity criterion
    pub criterion: Criterion,
    /// Seed of the feature visiting order
    pub random_state: u64,
    /// Number of features
    n_features: usize,
    /// Number of classes
    n_classes: usize,
    /// Feature importances
    feature_importances: Option<Array1<f64>>,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DecisionTree {
    /// Create a new unfitted classifier tree
    pub fn new() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            criterion: Criterion::Gini,
            random_state: 0,
            n_features: 0,
            n_classes: 0,
            feature_importances: None,
        }
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Set minimum samples to split
    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples.max(2);
        self
    }

    /// Set minimum samples in leaf
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples.max(1);
        self
    }

    /// Set criterion
    pub fn with_criterion(mut self, criterion: Criterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Set the seed of the feature visiting order
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// Fit the tree on feature matrix `x` and class indices `y`
    pub fn fit(&mut self, x: &Array2<f64>, y: &[usize], n_classes: usize) -> Result<&mut Self> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() {
            return Err(StressError::InvalidInput(format!(
                "feature matrix has {} rows but {} labels were given",
                n_samples,
                y.len()
            )));
        }
        if n_samples == 0 || n_features == 0 {
            return Err(StressError::InsufficientData(format!(
                "cannot fit a tree on {} rows and {} features",
                n_samples, n_features
            )));
        }
        if let Some(&bad) = y.iter().find(|&&label| label >= n_classes) {
            return Err(StressError::InvalidInput(format!(
                "label {} out of range for {} classes",
                bad, n_classes
            )));
        }

        self.n_features = n_features;
        self.n_classes = n_classes;

        let mut importances = vec![0.0; n_features];
        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state);

        let indices: Vec<usize> = (0..n_samples).collect();
        let root = self.build_tree(x, y, &indices, 0, &mut importances, &mut rng);
        self.root = Some(root);

        // Normalize feature importances
        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for imp in &mut importances {
                *imp /= total;
            }
        }
        self.feature_importances = Some(Array1::from_vec(importances));

        Ok(self)
    }

    fn class_counts(&self, y: &[usize], indices: &[usize]) -> Vec<f64> {
        let mut counts = vec![0.0; self.n_classes];
        for &i in indices {
            counts[y[i]] += 1.0;
        }
        counts
    }

    fn build_tree(
        &self,
        x: &Array2<f64>,
        y: &[usize],
        indices: &[usize],
        depth: usize,
        importances: &mut [f64],
        rng: &mut ChaCha8Rng,
    ) -> TreeNode {
        let n_samples = indices.len();
        let counts = self.class_counts(y, indices);
        let impurity = self.criterion.impurity(&counts, n_samples as f64);

        let should_stop = n_samples < self.min_samples_split
            || n_samples < 2 * self.min_samples_leaf
            || self.max_depth.map_or(false, |d| depth >= d)
            || impurity <= f64::EPSILON;

        if should_stop {
            return TreeNode::Leaf {
                class_counts: counts,
                n_samples,
            };
        }

        let mut feature_order: Vec<usize> = (0..self.n_features).collect();
        feature_order.shuffle(rng);

        let Some(best) = self.find_best_split(x, y, indices, &counts, impurity, &feature_order) else {
            return TreeNode::Leaf {
                class_counts: counts,
                n_samples,
            };
        };

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| x[[i, best.feature_idx]] <= best.threshold);

        importances[best.feature_idx] += n_samples as f64 * best.gain;

        let left = Box::new(self.build_tree(x, y, &left_indices, depth + 1, importances, rng));
        let right = Box::new(self.build_tree(x, y, &right_indices, depth + 1, importances, rng));

        TreeNode::Split {
            feature_idx: best.feature_idx,
            threshold: best.threshold,
            left,
            right,
            n_samples,
            impurity,
        }
    }

    /// Scan every feature in `feature_order`; on equal gain the feature
    /// visited first wins.
    fn find_best_split(
        &self,
        x: &Array2<f64>,
        y: &[usize],
        indices: &[usize],
        parent_counts: &[f64],
        parent_impurity: f64,
        feature_order: &[usize],
    ) -> Option<SplitCandidate> {
        let feature_results: Vec<Option<SplitCandidate>> = feature_order
            .par_iter()
            .map(|&feature_idx| {
                self.best_split_for_feature(x, y, indices, parent_counts, parent_impurity, feature_idx)
            })
            .collect();

        let mut best: Option<SplitCandidate> = None;
        for candidate in feature_results.into_iter().flatten() {
            if best.map_or(true, |b| candidate.gain > b.gain) {
                best = Some(candidate);
            }
        }
        best
    }

    fn best_split_for_feature(
        &self,
        x: &Array2<f64>,
        y: &[usize],
        indices: &[usize],
        parent_counts: &[f64],
        parent_impurity: f64,
        feature_idx: usize,
    ) -> Option<SplitCandidate> {
        let mut sorted: Vec<usize> = indices.to_vec();
        sorted.sort_by(|&a, &b| x[[a, feature_idx]].total_cmp(&x[[b, feature_idx]]));

        let n = sorted.len();
        let mut left_counts = vec![0.0; self.n_classes];
        let mut right_counts = parent_counts.to_vec();
        let mut best: Option<SplitCandidate> = None;

        for pos in 0..n - 1 {
            let label = y[sorted[pos]];
            left_counts[label] += 1.0;
            right_counts[label] -= 1.0;

            let value = x[[sorted[pos], feature_idx]];
            let next = x[[sorted[pos + 1], feature_idx]];
            if next <= value {
                continue;
            }

            let n_left = pos + 1;
            let n_right = n - n_left;
            if n_left < self.min_samples_leaf || n_right < self.min_samples_leaf {
                continue;
            }

            let weighted = (n_left as f64 * self.criterion.impurity(&left_counts, n_left as f64)
                + n_right as f64 * self.criterion.impurity(&right_counts, n_right as f64))
                / n as f64;
            let gain = parent_impurity - weighted;

            if gain > 0.0 && best.map_or(true, |b| gain > b.gain) {
                let mut threshold = value / 2.0 + next / 2.0;
                if threshold >= next {
                    threshold = value;
                }
                best = Some(SplitCandidate {
                    feature_idx,
                    threshold,
                    gain,
                });
            }
        }

        best
    }

    fn leaf_for<'a>(&'a self, row: ArrayView1<f64>) -> Option<&'a [f64]> {
        let mut node = self.root.as_ref()?;
        loop {
            match node {
                TreeNode::Leaf { class_counts, .. } => return Some(class_counts),
                TreeNode::Split {
                    feature_idx,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    node = if row[*feature_idx] <= *threshold { left } else { right };
                }
            }
        }
    }

    fn check_input(&self, x: &Array2<f64>) -> Result<()> {
        if self.root.is_none() {
            return Err(StressError::ModelNotReady);
        }
        if x.ncols() != self.n_features {
            return Err(StressError::InvalidInput(format!(
                "expected {} features, got {}",
                self.n_features,
                x.ncols()
            )));
        }
        Ok(())
    }

    /// Class probabilities per row, one column per class index
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.check_input(x)?;

        let rows: Vec<Vec<f64>> = (0..x.nrows())
            .into_par_iter()
            .map(|i| self.row_proba(x.row(i)))
            .collect();

        let mut proba = Array2::zeros((x.nrows(), self.n_classes));
        for (i, row) in rows.into_iter().enumerate() {
            for (j, p) in row.into_iter().enumerate() {
                proba[[i, j]] = p;
            }
        }
        Ok(proba)
    }

    /// Most probable class index per row; ties go to the lowest index
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<usize>> {
        self.check_input(x)?;

        let predictions: Vec<usize> = (0..x.nrows())
            .into_par_iter()
            .map(|i| argmax(&self.row_proba(x.row(i))))
            .collect();

        Ok(Array1::from_vec(predictions))
    }

    fn row_proba(&self, row: ArrayView1<f64>) -> Vec<f64> {
        let counts = self.leaf_for(row).unwrap_or(&[]);
        let total: f64 = counts.iter().sum();
        if total > 0.0 {
            counts.iter().map(|&c| c / total).collect()
        } else {
            vec![0.0; self.n_classes]
        }
    }

    /// Get feature importances
    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }

    pub fn is_fitted(&self) -> bool {
        self.root.is_some()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    pub fn root(&self) -> Option<&TreeNode> {
        self.root.as_ref()
    }

    /// Get tree depth
    pub fn depth(&self) -> usize {
        fn node_depth(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => 1 + node_depth(left).max(node_depth(right)),
            }
        }
        self.root.as_ref().map_or(0, node_depth)
    }

    /// Get number of leaves
    pub fn n_leaves(&self) -> usize {
        fn count_leaves(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => count_leaves(left) + count_leaves(right),
            }
        }
        self.root.as_ref().map_or(0, count_leaves)
    }
}

/// Index of the largest value, first one on ties
pub fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_fit_predict_separable() {
        let x = array![[1.0, 0.0], [2.0, 0.0], [3.0, 1.0], [4.0, 1.0], [5.0, 0.0], [6.0, 1.0]];
        let y = vec![0, 0, 1, 1, 2, 2];

        let mut tree = DecisionTree::new().with_max_depth(3).with_random_state(42);
        tree.fit(&x, &y, 3).unwrap();

        let predictions = tree.predict(&x).unwrap();
        assert_eq!(predictions.to_vec(), y);
        assert!(tree.depth() <= 3);
        assert_eq!(tree.n_leaves(), 3);
    }

    #[test]
    fn test_threshold_is_midpoint() {
        let x = array![[1.0], [3.0]];
        let mut tree = DecisionTree::new().with_max_depth(1);
        tree.fit(&x, &[0, 1], 2).unwrap();

        match tree.root().unwrap() {
            TreeNode::Split { threshold, .. } => assert_eq!(*threshold, 2.0),
            TreeNode::Leaf { .. } => panic!("expected a split"),
        }
    }

    #[test]
    fn test_depth_limit_and_probabilities() {
        let x = array![[1.0], [2.0], [3.0], [4.0]];
        let y = vec![0, 1, 0, 1];

        let mut tree = DecisionTree::new().with_max_depth(0);
        tree.fit(&x, &y, 2).unwrap();
        assert_eq!(tree.depth(), 0);

        let proba = tree.predict_proba(&x).unwrap();
        assert_eq!(proba.row(0).to_vec(), vec![0.5, 0.5]);

        // tie on probability resolves to the lowest class index
        assert_eq!(tree.predict(&x).unwrap()[0], 0);
    }

    #[test]
    fn test_importances_sum_to_one() {
        let x = array![[1.0, 5.0], [2.0, 5.0], [3.0, 5.0], [4.0, 5.0]];
        let y = vec![0, 0, 1, 1];

        let mut tree = DecisionTree::new().with_max_depth(3);
        tree.fit(&x, &y, 2).unwrap();

        let importances = tree.feature_importances().unwrap();
        assert!((importances.sum() - 1.0).abs() < 1e-9);
        assert_eq!(importances[1], 0.0);
    }

    #[test]
    fn test_same_seed_same_tree() {
        // both features separate the classes equally well
        let x = array![[0.0, 0.0], [0.0, 0.0], [1.0, 1.0], [1.0, 1.0]];
        let y = vec![0, 0, 1, 1];

        let mut a = DecisionTree::new().with_max_depth(3).with_random_state(7);
        let mut b = DecisionTree::new().with_max_depth(3).with_random_state(7);
        a.fit(&x, &y, 2).unwrap();
        b.fit(&x, &y, 2).unwrap();

        assert_eq!(a, b);
    }

    #[test]
    fn test_not_fitted() {
        let tree = DecisionTree::new();
        let err = tree.predict(&array![[1.0]]).unwrap_err();
        assert!(matches!(err, StressError::ModelNotReady));
    }

    #[test]
    fn test_label_out_of_range() {
        let mut tree = DecisionTree::new();
        let err = tree.fit(&array![[1.0], [2.0]], &[0, 3], 2).unwrap_err();
        assert!(matches!(err, StressError::InvalidInput(_)));
    }

    #[test]
    fn test_argmax_first_on_ties() {
        assert_eq!(argmax(&[0.2, 0.4, 0.4]), 1);
        assert_eq!(argmax(&[]), 0);
    }
}
