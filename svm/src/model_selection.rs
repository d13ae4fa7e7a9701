//Copyright 2024 Felix Engl
//
//Licensed under the Apache License, Version 2.0 (the "License");
//you may not use this file except in compliance with the License.
//You may obtain a copy of the License at
//
//    http://www.apache.org/licenses/LICENSE-2.0
//
//Unless required by applicable law or agreed to in writing, software
//distributed under the License is distributed on an "AS IS" BASIS,
//WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//See the License for the specific language governing permissions and
//limitations under the License.

use itertools::Itertools;
use rand::prelude::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use crate::error::SvmError;

/// Splits `n_samples` indices into a shuffled `(train, test)` pair.
/// The test side receives `ceil(test_size * n_samples)` indices.
pub fn train_test_split(n_samples: usize, test_size: f64, seed: u64) -> Result<(Vec<usize>, Vec<usize>), SvmError> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(SvmError::InvalidTestSize(test_size))
    }
    let n_test = (test_size * n_samples as f64).ceil() as usize;
    if n_test == 0 || n_test >= n_samples {
        return Err(SvmError::EmptyPartition { samples: n_samples, test_size })
    }
    let mut indices = (0..n_samples).collect_vec();
    indices.shuffle(&mut StdRng::seed_from_u64(seed));
    let train = indices.split_off(n_test);
    Ok((train, indices))
}

/// One fold of a cross validation, both sides in ascending order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// K-fold cross validation that keeps the class ratio in every fold.
///
/// Classes are ordered by their first appearance. The members of a class are
/// spread over the folds in order, without shuffling, so the folds only
/// depend on the labels.
#[derive(Debug, Copy, Clone)]
pub struct StratifiedKFold {
    n_splits: usize,
}

impl StratifiedKFold {
    pub fn new(n_splits: usize) -> Result<Self, SvmError> {
        if n_splits < 2 {
            return Err(SvmError::InvalidFoldCount(n_splits))
        }
        Ok(Self { n_splits })
    }

    pub fn n_splits(&self) -> usize {
        self.n_splits
    }

    pub fn split(&self, labels: &[u8]) -> Result<Vec<Fold>, SvmError> {
        let k = self.n_splits;
        if labels.len() < k {
            return Err(SvmError::TooFewSamples { folds: k, samples: labels.len() })
        }
        let classes = labels.iter().copied().unique().collect_vec();
        let encoded = labels
            .iter()
            .map(|label| classes.iter().position(|c| c == label).unwrap_or_default())
            .collect_vec();
        let mut class_counts = vec![0usize; classes.len()];
        for &class in &encoded {
            class_counts[class] += 1;
        }
        if class_counts.iter().all(|count| *count < k) {
            return Err(SvmError::TooFewSamples { folds: k, samples: labels.len() })
        }
        if class_counts.iter().any(|count| *count < k) {
            log::warn!("The least populated class has only {} members, which is less than {k} folds.", class_counts.iter().min().copied().unwrap_or_default());
        }

        // allocation[fold][class] counts the class members in sorted_classes[fold::k]
        let sorted_classes = encoded.iter().copied().sorted().collect_vec();
        let mut allocation = vec![vec![0usize; classes.len()]; k];
        for (position, class) in sorted_classes.into_iter().enumerate() {
            allocation[position % k][class] += 1;
        }

        let mut test_fold = vec![0usize; labels.len()];
        for class in 0..classes.len() {
            let folds_for_class = (0..k).flat_map(|fold| std::iter::repeat(fold).take(allocation[fold][class]));
            let members = encoded.iter().positions(|c| *c == class);
            for (member, fold) in members.zip(folds_for_class) {
                test_fold[member] = fold;
            }
        }

        Ok((0..k)
            .map(|fold| {
                let (test, train): (Vec<usize>, Vec<usize>) = (0..labels.len()).partition(|i| test_fold[*i] == fold);
                Fold { train, test }
            })
            .collect())
    }
}

#[cfg(test)]
mod test {
    use itertools::Itertools;
    use crate::error::SvmError;
    use super::{train_test_split, StratifiedKFold};

    #[test]
    fn split_is_seeded_and_complete(){
        let (train, test) = train_test_split(10, 0.2, 42).unwrap();
        assert_eq!(8, train.len());
        assert_eq!(2, test.len());
        let all = train.iter().chain(&test).copied().sorted().collect_vec();
        assert_eq!((0..10).collect_vec(), all);
        assert_eq!((train.clone(), test.clone()), train_test_split(10, 0.2, 42).unwrap());
    }

    #[test]
    fn split_rounds_test_size_up(){
        let (train, test) = train_test_split(11, 0.2, 1).unwrap();
        assert_eq!(3, test.len());
        assert_eq!(8, train.len());
        assert!(matches!(train_test_split(1, 0.2, 1), Err(SvmError::EmptyPartition { .. })));
        assert!(matches!(train_test_split(10, 1.0, 1), Err(SvmError::InvalidTestSize(_))));
    }

    #[test]
    fn folds_keep_the_class_ratio(){
        let labels = [0u8, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 0, 0, 0, 0];
        let folds = StratifiedKFold::new(5).unwrap().split(&labels).unwrap();
        assert_eq!(5, folds.len());
        let mut seen = Vec::new();
        for fold in &folds {
            assert_eq!(3, fold.test.len());
            assert_eq!(12, fold.train.len());
            assert_eq!(1, fold.test.iter().filter(|i| labels[**i] == 1).count());
            seen.extend(fold.test.iter().copied());
        }
        assert_eq!((0..labels.len()).collect_vec(), seen.into_iter().sorted().collect_vec());
        assert_eq!(vec![0, 1, 2], folds[0].test);
    }

    #[test]
    fn too_few_samples(){
        assert!(matches!(StratifiedKFold::new(5).unwrap().split(&[0, 1, 0]), Err(SvmError::TooFewSamples { .. })));
        assert!(matches!(StratifiedKFold::new(1), Err(SvmError::InvalidFoldCount(1))));
    }
}
