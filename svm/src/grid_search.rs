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
use ndarray::ArrayView2;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use serde::{Deserialize, Serialize};
use crate::classifier::{predict_from_distances, solve, KernelSvc, SvcParameters};
use crate::error::SvmError;
use crate::kernel::{pairwise_squared_distances, RbfKernel};
use crate::model_selection::{Fold, StratifiedKFold};

/// The configuration of an exhaustive search over `C` and `gamma`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSearch {
    #[serde(default = "_default_c_values")]
    pub c_values: Vec<f64>,
    #[serde(default = "_default_gamma_values")]
    pub gamma_values: Vec<f64>,
    #[serde(default = "_default_folds")]
    pub folds: usize,
    /// The number of worker threads, uses the available parallelism if not set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threads: Option<usize>,
}

fn _default_c_values() -> Vec<f64> {
    vec![0.01, 0.1, 1.0, 10.0, 100.0]
}

fn _default_gamma_values() -> Vec<f64> {
    vec![1e-3, 1e-2, 1e-1, 1.0, 10.0]
}

const fn _default_folds() -> usize {
    5
}

impl Default for GridSearch {
    fn default() -> Self {
        Self {
            c_values: _default_c_values(),
            gamma_values: _default_gamma_values(),
            folds: _default_folds(),
            threads: None,
        }
    }
}

/// The cross validated accuracy of one grid point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateScore {
    pub c: f64,
    pub gamma: f64,
    pub fold_scores: Vec<f64>,
    pub mean_score: f64,
}

/// The result of [GridSearch::fit].
#[derive(Debug, Clone)]
pub struct GridSearchResult {
    /// All grid points, `C` major and `gamma` minor.
    pub candidates: Vec<CandidateScore>,
    pub best_index: usize,
    /// The best grid point refit on all samples.
    pub model: KernelSvc,
}

impl GridSearchResult {
    pub fn best(&self) -> &CandidateScore {
        &self.candidates[self.best_index]
    }
}

impl GridSearch {
    /// The grid points in evaluation order.
    pub fn candidates(&self) -> Vec<SvcParameters> {
        self.c_values
            .iter()
            .cartesian_product(&self.gamma_values)
            .map(|(c, gamma)| SvcParameters::new(*c, *gamma))
            .collect()
    }

    /// Scores every grid point with stratified cross validation and refits the best one.
    /// A grid point that fails on a fold scores 0 for that fold.
    /// Ties go to the grid point evaluated first.
    pub fn fit(&self, x: ArrayView2<f64>, labels: &[u8]) -> Result<GridSearchResult, SvmError> {
        if x.nrows() != labels.len() {
            return Err(SvmError::LabelCount { rows: x.nrows(), labels: labels.len() })
        }
        let candidates = self.candidates();
        if candidates.is_empty() {
            return Err(SvmError::EmptyGrid)
        }
        for candidate in &candidates {
            candidate.validate()?;
        }
        crate::classifier::signs(labels)?;
        let folds = StratifiedKFold::new(self.folds)?.split(labels)?;
        let distances = pairwise_squared_distances(x, x);

        log::info!(
            "Fitting {} folds for each of {} candidates, totalling {} fits.",
            folds.len(),
            candidates.len(),
            folds.len() * candidates.len()
        );

        let pool = ThreadPoolBuilder::new()
            .num_threads(self.threads.unwrap_or(0))
            .build()?;
        let jobs = candidates.iter().cartesian_product(&folds).collect_vec();
        let scores: Vec<f64> = pool.install(|| {
            jobs.par_iter()
                .map(|(parameters, fold)| score_fold(distances.view(), labels, parameters, fold))
                .collect()
        });

        let candidates = candidates
            .iter()
            .zip(scores.chunks(folds.len()))
            .map(|(parameters, fold_scores)| {
                let mean_score = fold_scores.iter().sum::<f64>() / fold_scores.len() as f64;
                log::debug!("C={} gamma={} -> {mean_score:.4}", parameters.c, parameters.gamma);
                CandidateScore {
                    c: parameters.c,
                    gamma: parameters.gamma,
                    fold_scores: fold_scores.to_vec(),
                    mean_score,
                }
            })
            .collect_vec();

        let mut best_index = 0;
        for (idx, candidate) in candidates.iter().enumerate() {
            if candidate.mean_score > candidates[best_index].mean_score {
                best_index = idx;
            }
        }
        let best = &candidates[best_index];
        log::info!("Best parameters C={} gamma={} with a mean accuracy of {:.4}.", best.c, best.gamma, best.mean_score);

        let model = KernelSvc::fit_with_distances(
            x,
            distances.view(),
            labels,
            &SvcParameters::new(best.c, best.gamma)
        )?;

        Ok(GridSearchResult { candidates, best_index, model })
    }
}

/// Reads the fold straight from the shared distances, nothing of size `n_train²` is copied.
fn score_fold(distances: ArrayView2<f64>, labels: &[u8], parameters: &SvcParameters, fold: &Fold) -> f64 {
    let train_labels = fold.train.iter().map(|i| labels[*i]).collect_vec();
    let solution = match solve(distances, &fold.train, &train_labels, parameters) {
        Ok(solution) => solution,
        Err(err) => {
            log::warn!("Fit failed for C={} gamma={}: {err}", parameters.c, parameters.gamma);
            return 0.0
        }
    };
    let predicted = predict_from_distances(
        distances,
        &fold.test,
        &fold.train,
        &train_labels,
        &solution,
        RbfKernel::new(parameters.gamma),
    );
    let correct = predicted
        .iter()
        .zip(&fold.test)
        .filter(|(p, i)| **p == labels[**i])
        .count();
    correct as f64 / fold.test.len() as f64
}
