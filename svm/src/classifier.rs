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

use std::fmt::{Debug, Formatter};
use itertools::Itertools;
use ndarray::{Array1, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use crate::error::SvmError;
use crate::kernel::{pairwise_squared_distances, RbfKernel};
use crate::solver::{DualSolution, SmoSolver};

/// The hyper parameters of a [KernelSvc].
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct SvcParameters {
    /// Regularization strength
    pub c: f64,
    /// Coefficient of the rbf kernel
    pub gamma: f64,
    /// Stopping tolerance of the solver
    #[serde(default = "_default_eps")]
    pub eps: f64,
    #[serde(default = "_default_max_iter")]
    pub max_iter: usize,
}

const fn _default_eps() -> f64 {
    1e-3
}

const fn _default_max_iter() -> usize {
    1_000_000
}

impl SvcParameters {
    pub fn new(c: f64, gamma: f64) -> Self {
        Self {
            c,
            gamma,
            eps: _default_eps(),
            max_iter: _default_max_iter(),
        }
    }

    pub fn validate(&self) -> Result<(), SvmError> {
        if !(self.c.is_finite() && self.c > 0.0) {
            return Err(SvmError::InvalidParameter { name: "C", value: self.c })
        }
        if !(self.gamma.is_finite() && self.gamma > 0.0) {
            return Err(SvmError::InvalidParameter { name: "gamma", value: self.gamma })
        }
        if !(self.eps.is_finite() && self.eps > 0.0) {
            return Err(SvmError::InvalidParameter { name: "eps", value: self.eps })
        }
        Ok(())
    }
}

/// A binary C-support vector classifier with a rbf kernel.
/// Label `1` is the positive class, label `0` the negative one.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct KernelSvc {
    kernel: RbfKernel,
    c: f64,
    support_vectors: Array2<f64>,
    /// `alpha_i * y_i` for every support vector
    dual_coef: Vec<f64>,
    rho: f64,
}

impl Debug for KernelSvc {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KernelSvc")
            .field("kernel", &self.kernel)
            .field("c", &self.c)
            .field("support_vectors", &self.support_vectors.nrows())
            .field("n_features", &self.n_features())
            .field("rho", &self.rho)
            .finish()
    }
}

/// Maps the binary labels to the signs used by the solver.
pub(crate) fn signs(labels: &[u8]) -> Result<Vec<f64>, SvmError> {
    let y = labels.iter().map(|label| if *label == 0 { -1.0 } else { 1.0 }).collect_vec();
    if y.is_empty() {
        return Err(SvmError::Empty)
    }
    if y.iter().all(|v| *v > 0.0) || y.iter().all(|v| *v < 0.0) {
        return Err(SvmError::SingleClass)
    }
    Ok(y)
}

impl KernelSvc {
    /// Trains on the rows of `x`.
    pub fn fit(x: ArrayView2<f64>, labels: &[u8], parameters: &SvcParameters) -> Result<Self, SvmError> {
        let distances = pairwise_squared_distances(x, x);
        Self::fit_with_distances(x, distances.view(), labels, parameters)
    }

    /// Trains with already computed squared distances between the rows of `x`.
    pub fn fit_with_distances(
        x: ArrayView2<f64>,
        distances: ArrayView2<f64>,
        labels: &[u8],
        parameters: &SvcParameters
    ) -> Result<Self, SvmError> {
        if x.nrows() != labels.len() {
            return Err(SvmError::LabelCount { rows: x.nrows(), labels: labels.len() })
        }
        let rows = (0..labels.len()).collect_vec();
        let solution = solve(distances, &rows, labels, parameters)?;
        log::debug!(
            "Solved C={} gamma={} in {} iterations.",
            parameters.c,
            parameters.gamma,
            solution.iterations
        );
        Ok(Self::from_solution(x, labels, &solution, parameters))
    }

    fn from_solution(x: ArrayView2<f64>, labels: &[u8], solution: &DualSolution, parameters: &SvcParameters) -> Self {
        let support = solution.alpha
            .iter()
            .positions(|alpha| *alpha > 0.0)
            .collect_vec();
        let dual_coef = support
            .iter()
            .map(|&i| if labels[i] == 0 { -solution.alpha[i] } else { solution.alpha[i] })
            .collect_vec();
        Self {
            kernel: RbfKernel::new(parameters.gamma),
            c: parameters.c,
            support_vectors: x.select(Axis(0), &support),
            dual_coef,
            rho: solution.rho,
        }
    }

    pub fn n_features(&self) -> usize {
        self.support_vectors.ncols()
    }

    pub fn n_support_vectors(&self) -> usize {
        self.support_vectors.nrows()
    }

    pub fn parameters(&self) -> (f64, f64) {
        (self.c, self.kernel.gamma)
    }

    /// The signed distance to the separating hyperplane for every row of `x`.
    pub fn decision_function(&self, x: ArrayView2<f64>) -> Result<Array1<f64>, SvmError> {
        if x.ncols() != self.n_features() {
            return Err(SvmError::FeatureCount { expected: self.n_features(), found: x.ncols() })
        }
        Ok(x.rows()
            .into_iter()
            .map(|row| {
                self.support_vectors
                    .rows()
                    .into_iter()
                    .zip(&self.dual_coef)
                    .map(|(sv, coef)| coef * self.kernel.compute(sv, row))
                    .sum::<f64>() - self.rho
            })
            .collect())
    }

    pub fn predict(&self, x: ArrayView2<f64>) -> Result<Vec<u8>, SvmError> {
        Ok(self.decision_function(x)?
            .iter()
            .map(|value| u8::from(*value > 0.0))
            .collect())
    }
}

/// Solves the dual for the samples `rows` of the squared `distances`.
/// `labels` belong to `rows`.
pub(crate) fn solve(
    distances: ArrayView2<f64>,
    rows: &[usize],
    labels: &[u8],
    parameters: &SvcParameters
) -> Result<DualSolution, SvmError> {
    parameters.validate()?;
    let y = signs(labels)?;
    let kernel = RbfKernel::new(parameters.gamma);
    Ok(SmoSolver::new(distances.view(), rows, &y, kernel, parameters.c, parameters.eps, parameters.max_iter).solve())
}

/// Predicts the samples `test` from a solution for the samples `train` of the squared `distances`.
pub(crate) fn predict_from_distances(
    distances: ArrayView2<f64>,
    test: &[usize],
    train: &[usize],
    labels: &[u8],
    solution: &DualSolution,
    kernel: RbfKernel,
) -> Vec<u8> {
    test.iter()
        .map(|&sample| {
            let decision = train
                .iter()
                .zip(labels)
                .zip(&solution.alpha)
                .filter(|(_, alpha)| **alpha > 0.0)
                .map(|((&other, label), alpha)| {
                    let k = kernel.from_distance(distances[[sample, other]]);
                    if *label == 0 { -alpha * k } else { alpha * k }
                })
                .sum::<f64>() - solution.rho;
            u8::from(decision > 0.0)
        })
        .collect()
}

#[cfg(test)]
mod test {
    use ndarray::{array, Array2};
    use rand::prelude::StdRng;
    use rand::{Rng, SeedableRng};
    use crate::error::SvmError;
    use super::{KernelSvc, SvcParameters};

    fn blobs(n: usize, seed: u64) -> (Array2<f64>, Vec<u8>) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut x = Array2::zeros((2 * n, 2));
        let mut y = Vec::with_capacity(2 * n);
        for i in 0..2 * n {
            let label = (i % 2) as u8;
            let center = if label == 0 { -2.0 } else { 2.0 };
            x[[i, 0]] = center + rng.gen_range(-1.0..1.0);
            x[[i, 1]] = center + rng.gen_range(-1.0..1.0);
            y.push(label);
        }
        (x, y)
    }

    #[test]
    fn separates_blobs(){
        let (x, y) = blobs(30, 1);
        let svc = KernelSvc::fit(x.view(), &y, &SvcParameters::new(1.0, 0.5)).unwrap();
        assert_eq!(y, svc.predict(x.view()).unwrap());
        assert!(svc.n_support_vectors() < x.nrows());
        let unseen = array![[-2.2, -1.7], [1.9, 2.4]];
        assert_eq!(vec![0, 1], svc.predict(unseen.view()).unwrap());
    }

    #[test]
    fn decision_function_matches_the_dual_shortcut(){
        let (x, y) = blobs(10, 3);
        let parameters = SvcParameters::new(10.0, 0.1);
        let svc = KernelSvc::fit(x.view(), &y, &parameters).unwrap();
        let distances = crate::kernel::pairwise_squared_distances(x.view(), x.view());
        let rows = (0..y.len()).collect::<Vec<_>>();
        let solution = super::solve(distances.view(), &rows, &y, &parameters).unwrap();
        assert_eq!(
            svc.predict(x.view()).unwrap(),
            super::predict_from_distances(distances.view(), &rows, &rows, &y, &solution, crate::kernel::RbfKernel::new(0.1))
        );
    }

    #[test]
    fn rejects_bad_input(){
        let x = array![[0.0], [1.0]];
        assert!(matches!(KernelSvc::fit(x.view(), &[1, 1], &SvcParameters::new(1.0, 1.0)), Err(SvmError::SingleClass)));
        assert!(matches!(KernelSvc::fit(x.view(), &[1], &SvcParameters::new(1.0, 1.0)), Err(SvmError::LabelCount { .. })));
        assert!(matches!(KernelSvc::fit(x.view(), &[0, 1], &SvcParameters::new(0.0, 1.0)), Err(SvmError::InvalidParameter { .. })));
        let svc = KernelSvc::fit(x.view(), &[0, 1], &SvcParameters::new(1.0, 1.0)).unwrap();
        assert!(matches!(svc.predict(array![[0.0, 1.0]].view()), Err(SvmError::FeatureCount { expected: 1, found: 2 })));
    }
}
