// =============================================================================
// Stratified train/test split
// =============================================================================
//
// Rows are shuffled per class with a seeded ChaCha8 stream, then each class
// contributes round(n_class * test_ratio) rows (at least one, at most
// n_class - 1) to the test set.  A class with a single row stays in train.
// Both index lists are returned sorted.
// =============================================================================

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::types::RiskLabel;

#[derive(Debug, Clone, PartialEq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

pub fn stratified_split(labels: &[RiskLabel], test_ratio: f64, seed: u64) -> SplitIndices {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let ratio = test_ratio.clamp(0.0, 1.0);

    let mut train = Vec::with_capacity(labels.len());
    let mut test = Vec::new();

    for class in RiskLabel::ALL {
        let mut idx: Vec<usize> = labels
            .iter()
            .enumerate()
            .filter(|(_, &l)| l == class)
            .map(|(i, _)| i)
            .collect();
        if idx.is_empty() {
            continue;
        }
        idx.shuffle(&mut rng);

        let n = idx.len();
        let n_test = if n < 2 || ratio == 0.0 {
            0
        } else {
            ((n as f64 * ratio).round() as usize).clamp(1, n - 1)
        };
        test.extend_from_slice(&idx[..n_test]);
        train.extend_from_slice(&idx[n_test..]);
    }

    train.sort_unstable();
    test.sort_unstable();
    SplitIndices { train, test }
}

/// Pick rows by index.
pub fn take<T: Clone>(items: &[T], indices: &[usize]) -> Vec<T> {
    indices.iter().map(|&i| items[i].clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::risk::label_counts;

    fn labels(low: usize, med: usize, high: usize) -> Vec<RiskLabel> {
        let mut v = vec![RiskLabel::Low; low];
        v.extend(vec![RiskLabel::Medium; med]);
        v.extend(vec![RiskLabel::High; high]);
        v
    }

    #[test]
    fn proportions_are_preserved() {
        let l = labels(90, 5, 5);
        let s = stratified_split(&l, 0.2, 42);
        assert_eq!(s.train.len() + s.test.len(), 100);
        assert_eq!(label_counts(&take(&l, &s.test)), [18, 1, 1]);
        assert_eq!(label_counts(&take(&l, &s.train)), [72, 4, 4]);
    }

    #[test]
    fn split_is_a_partition() {
        let l = labels(37, 11, 6);
        let s = stratified_split(&l, 0.25, 7);
        let mut all: Vec<usize> = s.train.iter().chain(&s.test).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..l.len()).collect::<Vec<_>>());
    }

    #[test]
    fn same_seed_same_split() {
        let l = labels(50, 10, 10);
        assert_eq!(stratified_split(&l, 0.2, 1), stratified_split(&l, 0.2, 1));
        assert_ne!(stratified_split(&l, 0.2, 1), stratified_split(&l, 0.2, 2));
    }

    #[test]
    fn singleton_class_stays_in_train() {
        let l = labels(20, 1, 2);
        let s = stratified_split(&l, 0.2, 3);
        let test_counts = label_counts(&take(&l, &s.test));
        assert_eq!(test_counts[RiskLabel::Medium.index()], 0);
        assert_eq!(test_counts[RiskLabel::High.index()], 1);
    }
}
