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

use ndarray::{Array2, ArrayView1, ArrayView2, Zip};
use serde::{Deserialize, Serialize};

/// The radial basis function kernel `exp(-gamma * |x - y|^2)`.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct RbfKernel {
    pub gamma: f64,
}

impl RbfKernel {
    pub fn new(gamma: f64) -> Self {
        Self { gamma }
    }

    #[inline]
    pub fn compute(&self, x: ArrayView1<f64>, y: ArrayView1<f64>) -> f64 {
        (-self.gamma * squared_distance(x, y)).exp()
    }

    /// The kernel value for a precomputed squared distance.
    #[inline]
    pub fn from_distance(&self, distance: f64) -> f64 {
        (-self.gamma * distance).exp()
    }
}

#[inline]
pub fn squared_distance(x: ArrayView1<f64>, y: ArrayView1<f64>) -> f64 {
    Zip::from(x).and(y).fold(0.0, |acc, a, b| {
        let diff = a - b;
        acc + diff * diff
    })
}

/// All pairwise squared euclidean distances between the rows of `a` and `b`.
pub fn pairwise_squared_distances(a: ArrayView2<f64>, b: ArrayView2<f64>) -> Array2<f64> {
    let mut result = Array2::zeros((a.nrows(), b.nrows()));
    for (i, row_a) in a.rows().into_iter().enumerate() {
        for (j, row_b) in b.rows().into_iter().enumerate() {
            result[[i, j]] = squared_distance(row_a, row_b);
        }
    }
    result
}
