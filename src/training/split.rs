//! Seeded stratified train/test split

use crate::error::{Result, StressError};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Row indices of the two partitions, each sorted ascending
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StratifiedSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
}

/// Split rows labelled with class indices `0..n_classes` so that each class
/// keeps its share of the test partition.
///
/// The test partition holds `ceil(test_size * n)` rows. Per-class test
/// counts are the floor of the proportional share, with the remainder going
/// to the classes with the largest fractional parts. Every class keeps at
/// least one training row.
pub fn stratified_train_test_split(
    labels: &[usize],
    n_classes: usize,
    test_size: f64,
    seed: u64,
) -> Result<StratifiedSplit> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(StressError::InvalidInput(format!(
            "test_size must be in (0, 1), got {}",
            test_size
        )));
    }

    let n = labels.len();
    let mut class_indices: Vec<Vec<usize>> = vec![Vec::new(); n_classes];
    for (i, &label) in labels.iter().enumerate() {
        let bucket = class_indices.get_mut(label).ok_or_else(|| {
            StressError::InvalidInput(format!("label {} out of range for {} classes", label, n_classes))
        })?;
        bucket.push(i);
    }

    let present = class_indices.iter().filter(|c| !c.is_empty()).count();
    if n == 0 || present == 0 {
        return Err(StressError::InsufficientData("dataset has no rows".to_string()));
    }
    if let Some((class, members)) = class_indices
        .iter()
        .enumerate()
        .find(|(_, members)| members.len() == 1)
    {
        return Err(StressError::InsufficientData(format!(
            "class index {} has only {} member, stratification needs at least 2",
            class,
            members.len()
        )));
    }

    let n_test = (test_size * n as f64).ceil() as usize;
    let n_train = n - n_test;
    if n_test < present || n_train < present {
        return Err(StressError::InsufficientData(format!(
            "{} test rows and {} train rows cannot both hold {} classes",
            n_test, n_train, present
        )));
    }

    let allocation = allocate_test_counts(&class_indices, n_test, n);

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut train_indices = Vec::with_capacity(n_train);
    let mut test_indices = Vec::with_capacity(n_test);

    for (members, &take) in class_indices.iter().zip(&allocation) {
        let mut shuffled = members.clone();
        shuffled.shuffle(&mut rng);
        test_indices.extend_from_slice(&shuffled[..take]);
        train_indices.extend_from_slice(&shuffled[take..]);
    }

    train_indices.sort_unstable();
    test_indices.sort_unstable();

    Ok(StratifiedSplit {
        train_indices,
        test_indices,
    })
}

/// Largest-remainder allocation of `n_test` rows across classes, capped so
/// that each class keeps one training row.
fn allocate_test_counts(class_indices: &[Vec<usize>], n_test: usize, n: usize) -> Vec<usize> {
    let exact: Vec<f64> = class_indices
        .iter()
        .map(|members| members.len() as f64 * n_test as f64 / n as f64)
        .collect();
    let caps: Vec<usize> = class_indices
        .iter()
        .map(|members| members.len().saturating_sub(1))
        .collect();

    let mut allocation: Vec<usize> = exact
        .iter()
        .zip(&caps)
        .map(|(&e, &cap)| (e.floor() as usize).min(cap))
        .collect();

    // Largest fractional part first, then the larger class, then the lower index
    let mut priority: Vec<usize> = (0..class_indices.len()).collect();
    priority.sort_by(|&a, &b| {
        let frac_a = exact[a] - exact[a].floor();
        let frac_b = exact[b] - exact[b].floor();
        frac_b
            .total_cmp(&frac_a)
            .then(class_indices[b].len().cmp(&class_indices[a].len()))
            .then(a.cmp(&b))
    });

    let mut remaining = n_test.saturating_sub(allocation.iter().sum());
    while remaining > 0 {
        let mut progressed = false;
        for &class in &priority {
            if remaining == 0 {
                break;
            }
            if allocation[class] < caps[class] {
                allocation[class] += 1;
                remaining -= 1;
                progressed = true;
            }
        }
        if !progressed {
            break;
        }
    }

    allocation
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(counts: &[usize]) -> Vec<usize> {
        counts
            .iter()
            .enumerate()
            .flat_map(|(class, &count)| std::iter::repeat(class).take(count))
            .collect()
    }

    #[test]
    fn test_partition_sizes_and_coverage() {
        let y = labels(&[15, 30, 60, 30, 15]);
        let split = stratified_train_test_split(&y, 5, 0.2, 42).unwrap();

        assert_eq!(split.test_indices.len(), 30);
        assert_eq!(split.train_indices.len(), 120);

        let mut all: Vec<usize> = split
            .train_indices
            .iter()
            .chain(&split.test_indices)
            .copied()
            .collect();
        all.sort_unstable();
        assert_eq!(all, (0..150).collect::<Vec<_>>());
    }

    #[test]
    fn test_class_proportions() {
        let y = labels(&[15, 30, 60, 30, 15]);
        let split = stratified_train_test_split(&y, 5, 0.2, 42).unwrap();

        let mut test_counts = [0usize; 5];
        for &i in &split.test_indices {
            test_counts[y[i]] += 1;
        }
        assert_eq!(test_counts, [3, 6, 12, 6, 3]);
    }

    #[test]
    fn test_ceil_test_size_and_remainders() {
        // 0.2 * 11 = 2.2 -> 3 test rows
        let y = labels(&[5, 6]);
        let split = stratified_train_test_split(&y, 2, 0.2, 1).unwrap();
        assert_eq!(split.test_indices.len(), 3);
        assert_eq!(split.train_indices.len(), 8);
    }

    #[test]
    fn test_deterministic_for_seed() {
        let y = labels(&[10, 20, 10]);
        let a = stratified_train_test_split(&y, 3, 0.2, 42).unwrap();
        let b = stratified_train_test_split(&y, 3, 0.2, 42).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_singleton_class_rejected() {
        let y = labels(&[10, 1, 10]);
        let err = stratified_train_test_split(&y, 3, 0.2, 42).unwrap_err();
        assert!(matches!(err, StressError::InsufficientData(_)));
    }

    #[test]
    fn test_too_few_rows_for_classes() {
        // 2 test rows cannot hold 5 classes
        let y = labels(&[2, 2, 2, 2, 2]);
        let err = stratified_train_test_split(&y, 5, 0.2, 42).unwrap_err();
        assert!(matches!(err, StressError::InsufficientData(_)));
    }

    #[test]
    fn test_invalid_test_size() {
        let y = labels(&[5, 5]);
        let err = stratified_train_test_split(&y, 2, 1.0, 42).unwrap_err();
        assert!(matches!(err, StressError::InvalidInput(_)));
    }
}
