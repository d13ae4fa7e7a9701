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

use thiserror::Error;

/// An error from training or applying a kernel svm.
#[derive(Debug, Error)]
pub enum SvmError {
    #[error("The feature matrix has {rows} rows but {labels} labels were provided!")]
    LabelCount { rows: usize, labels: usize },
    #[error("The training data needs samples of both classes!")]
    SingleClass,
    #[error("The training data is empty!")]
    Empty,
    #[error("Expected {expected} features but got {found}!")]
    FeatureCount { expected: usize, found: usize },
    #[error("The parameter {name} has to be positive and finite but is {value}!")]
    InvalidParameter { name: &'static str, value: f64 },
    #[error("The test size has to be in (0, 1) but is {0}!")]
    InvalidTestSize(f64),
    #[error("Splitting {samples} samples with a test size of {test_size} leaves one side empty!")]
    EmptyPartition { samples: usize, test_size: f64 },
    #[error("Can not create {folds} folds for {samples} samples!")]
    TooFewSamples { folds: usize, samples: usize },
    #[error("At least 2 folds are necessary but got {0}!")]
    InvalidFoldCount(usize),
    #[error("The parameter grid is empty!")]
    EmptyGrid,
    #[error(transparent)]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
