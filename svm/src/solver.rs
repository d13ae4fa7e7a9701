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

//! Sequential minimal optimization for the C-SVC dual problem
//!
//! ```text
//! min 0.5 a^T Q a - e^T a
//! s.t. y^T a = 0, 0 <= a_i <= C
//! ```
//!
//! with `Q_ij = y_i y_j K_ij`. The working set is selected with second order
//! information (Fan, Chen and Lin, 2005), the same way libsvm does it.

use std::collections::VecDeque;
use std::mem::size_of;
use std::rc::Rc;
use ndarray::ArrayView2;
use crate::kernel::RbfKernel;

const TAU: f64 = 1e-12;

/// Upper bound of the cached kernel rows of a single solver.
const CACHE_BYTES: usize = 32 << 20;

#[derive(Debug, Clone)]
pub(crate) struct DualSolution {
    pub alpha: Vec<f64>,
    pub rho: f64,
    pub iterations: usize,
}

/// The rows of `Q_ij = y_i y_j K(x_i, x_j)`, computed from a shared matrix of squared
/// distances. `rows` maps the solver indices to the rows of that matrix.
/// Recently used rows are cached, least recently used ones are dropped first.
struct KernelRows<'a> {
    distances: ArrayView2<'a, f64>,
    rows: &'a [usize],
    y: &'a [f64],
    kernel: RbfKernel,
    cache: VecDeque<(usize, Rc<[f64]>)>,
    capacity: usize,
}

impl<'a> KernelRows<'a> {
    fn new(distances: ArrayView2<'a, f64>, rows: &'a [usize], y: &'a [f64], kernel: RbfKernel) -> Self {
        let n = rows.len().max(2);
        Self {
            distances,
            rows,
            y,
            kernel,
            cache: VecDeque::new(),
            capacity: (CACHE_BYTES / (n * size_of::<f64>())).clamp(2, n),
        }
    }

    fn diagonal(&self) -> Vec<f64> {
        self.rows
            .iter()
            .map(|&row| self.kernel.from_distance(self.distances[[row, row]]))
            .collect()
    }

    fn row(&mut self, i: usize) -> Rc<[f64]> {
        if let Some(pos) = self.cache.iter().position(|(idx, _)| *idx == i) {
            if let Some(entry) = self.cache.remove(pos) {
                let row = entry.1.clone();
                self.cache.push_front(entry);
                return row
            }
        }
        let source = self.rows[i];
        let row = self.rows
            .iter()
            .zip(self.y)
            .map(|(&other, y_j)| self.y[i] * y_j * self.kernel.from_distance(self.distances[[source, other]]))
            .collect::<Rc<[f64]>>();
        if self.cache.len() >= self.capacity {
            self.cache.pop_back();
        }
        self.cache.push_front((i, row.clone()));
        row
    }
}

pub(crate) struct SmoSolver<'a> {
    q: KernelRows<'a>,
    qd: Vec<f64>,
    y: &'a [f64],
    c: f64,
    eps: f64,
    max_iter: usize,
    alpha: Vec<f64>,
    gradient: Vec<f64>,
}

impl<'a> SmoSolver<'a> {
    /// Solves for the samples `rows` of the squared `distances`, `y` holds their +1/-1 labels.
    pub fn new(
        distances: ArrayView2<'a, f64>,
        rows: &'a [usize],
        y: &'a [f64],
        kernel: RbfKernel,
        c: f64,
        eps: f64,
        max_iter: usize,
    ) -> Self {
        let n = y.len();
        let q = KernelRows::new(distances, rows, y, kernel);
        let qd = q.diagonal();
        Self {
            q,
            qd,
            y,
            c,
            eps,
            max_iter,
            alpha: vec![0.0; n],
            gradient: vec![-1.0; n],
        }
    }

    #[inline]
    fn is_upper_bound(&self, i: usize) -> bool {
        self.alpha[i] >= self.c
    }

    #[inline]
    fn is_lower_bound(&self, i: usize) -> bool {
        self.alpha[i] <= 0.0
    }

    /// Returns None if the current solution is optimal within `eps`.
    fn select_working_set(&mut self) -> Option<(usize, usize)> {
        let n = self.y.len();
        let mut g_max = f64::NEG_INFINITY;
        let mut g_max2 = f64::NEG_INFINITY;
        let mut g_max_idx = None;

        for t in 0..n {
            if self.y[t] > 0.0 {
                if !self.is_upper_bound(t) && -self.gradient[t] >= g_max {
                    g_max = -self.gradient[t];
                    g_max_idx = Some(t);
                }
            } else if !self.is_lower_bound(t) && self.gradient[t] >= g_max {
                g_max = self.gradient[t];
                g_max_idx = Some(t);
            }
        }

        let i = g_max_idx?;
        let q_i = self.q.row(i);
        let mut g_min_idx = None;
        let mut obj_diff_min = f64::INFINITY;

        for j in 0..n {
            let (grad_diff, quad_coef) = if self.y[j] > 0.0 {
                if self.is_lower_bound(j) {
                    continue
                }
                g_max2 = g_max2.max(self.gradient[j]);
                (g_max + self.gradient[j], self.qd[i] + self.qd[j] - 2.0 * self.y[i] * q_i[j])
            } else {
                if self.is_upper_bound(j) {
                    continue
                }
                g_max2 = g_max2.max(-self.gradient[j]);
                (g_max - self.gradient[j], self.qd[i] + self.qd[j] + 2.0 * self.y[i] * q_i[j])
            };
            if grad_diff > 0.0 {
                let obj_diff = if quad_coef > 0.0 {
                    -(grad_diff * grad_diff) / quad_coef
                } else {
                    -(grad_diff * grad_diff) / TAU
                };
                if obj_diff <= obj_diff_min {
                    g_min_idx = Some(j);
                    obj_diff_min = obj_diff;
                }
            }
        }

        if g_max + g_max2 < self.eps {
            return None
        }
        g_min_idx.map(|j| (i, j))
    }

    fn update_pair(&mut self, i: usize, j: usize) {
        let c = self.c;
        let old_i = self.alpha[i];
        let old_j = self.alpha[j];
        let q_i = self.q.row(i);
        let q_j = self.q.row(j);
        let q_ij = q_i[j];

        if self.y[i] != self.y[j] {
            let mut quad_coef = self.qd[i] + self.qd[j] + 2.0 * q_ij;
            if quad_coef <= 0.0 {
                quad_coef = TAU;
            }
            let delta = (-self.gradient[i] - self.gradient[j]) / quad_coef;
            let diff = old_i - old_j;
            self.alpha[i] += delta;
            self.alpha[j] += delta;
            if diff > 0.0 {
                if self.alpha[j] < 0.0 {
                    self.alpha[j] = 0.0;
                    self.alpha[i] = diff;
                }
            } else if self.alpha[i] < 0.0 {
                self.alpha[i] = 0.0;
                self.alpha[j] = -diff;
            }
            // both bounds are equal, C_i - C_j == 0
            if diff > 0.0 {
                if self.alpha[i] > c {
                    self.alpha[i] = c;
                    self.alpha[j] = c - diff;
                }
            } else if self.alpha[j] > c {
                self.alpha[j] = c;
                self.alpha[i] = c + diff;
            }
        } else {
            let mut quad_coef = self.qd[i] + self.qd[j] - 2.0 * q_ij;
            if quad_coef <= 0.0 {
                quad_coef = TAU;
            }
            let delta = (self.gradient[i] - self.gradient[j]) / quad_coef;
            let sum = old_i + old_j;
            self.alpha[i] -= delta;
            self.alpha[j] += delta;
            if sum > c {
                if self.alpha[i] > c {
                    self.alpha[i] = c;
                    self.alpha[j] = sum - c;
                }
            } else if self.alpha[j] < 0.0 {
                self.alpha[j] = 0.0;
                self.alpha[i] = sum;
            }
            if sum > c {
                if self.alpha[j] > c {
                    self.alpha[j] = c;
                    self.alpha[i] = sum - c;
                }
            } else if self.alpha[i] < 0.0 {
                self.alpha[i] = 0.0;
                self.alpha[j] = sum;
            }
        }

        let delta_i = self.alpha[i] - old_i;
        let delta_j = self.alpha[j] - old_j;
        for (k, gradient) in self.gradient.iter_mut().enumerate() {
            *gradient += q_i[k] * delta_i + q_j[k] * delta_j;
        }
    }

    fn calculate_rho(&self) -> f64 {
        let mut free = 0usize;
        let mut sum_free = 0.0;
        let mut upper = f64::INFINITY;
        let mut lower = f64::NEG_INFINITY;
        for i in 0..self.y.len() {
            let y_grad = self.y[i] * self.gradient[i];
            if self.is_upper_bound(i) {
                if self.y[i] < 0.0 {
                    upper = upper.min(y_grad);
                } else {
                    lower = lower.max(y_grad);
                }
            } else if self.is_lower_bound(i) {
                if self.y[i] > 0.0 {
                    upper = upper.min(y_grad);
                } else {
                    lower = lower.max(y_grad);
                }
            } else {
                free += 1;
                sum_free += y_grad;
            }
        }
        if free > 0 {
            sum_free / free as f64
        } else {
            (upper + lower) / 2.0
        }
    }

    pub fn solve(mut self) -> DualSolution {
        let mut iterations = 0;
        while iterations < self.max_iter {
            match self.select_working_set() {
                None => break,
                Some((i, j)) => self.update_pair(i, j),
            }
            iterations += 1;
        }
        if iterations >= self.max_iter {
            log::warn!("The solver reached the maximum of {} iterations without converging.", self.max_iter);
        }
        let rho = self.calculate_rho();
        DualSolution {
            alpha: self.alpha,
            rho,
            iterations,
        }
    }
}

#[cfg(test)]
mod test {
    use float_cmp::assert_approx_eq;
    use ndarray::array;
    use crate::kernel::RbfKernel;
    use super::SmoSolver;

    #[test]
    fn two_points_are_solved_in_one_step(){
        // x = -1 and x = 1, the optimum has alpha = 1 / (1 - k) for k = exp(-4 gamma).
        let distances = array![[0.0, 4.0], [4.0, 0.0]];
        let y = [-1.0, 1.0];
        let solution = SmoSolver::new(distances.view(), &[0, 1], &y, RbfKernel::new(1.0), 10.0, 1e-3, 1000).solve();
        let expected = 1.0 / (1.0 - (-4.0f64).exp());
        assert_approx_eq!(f64, expected, solution.alpha[0], epsilon = 1e-9);
        assert_approx_eq!(f64, expected, solution.alpha[1], epsilon = 1e-9);
        assert_approx_eq!(f64, 0.0, solution.rho, epsilon = 1e-9);
    }

    #[test]
    fn respects_the_box(){
        let distances = array![[0.0, 4.0], [4.0, 0.0]];
        let y = [-1.0, 1.0];
        let solution = SmoSolver::new(distances.view(), &[0, 1], &y, RbfKernel::new(1.0), 0.1, 1e-3, 1000).solve();
        assert!(solution.alpha.iter().all(|a| *a <= 0.1 && *a >= 0.0));
        let balance: f64 = solution.alpha.iter().zip(y).map(|(a, y)| a * y).sum();
        assert_approx_eq!(f64, 0.0, balance, epsilon = 1e-12);
    }

    #[test]
    fn only_the_selected_rows_are_used(){
        let full = array![[0.0, 4.0], [4.0, 0.0]];
        let y = [-1.0, 1.0];
        let expected = SmoSolver::new(full.view(), &[0, 1], &y, RbfKernel::new(0.5), 10.0, 1e-3, 1000).solve();
        // The middle row is a sample of another fold and lies between both points.
        let shared = array![[0.0, 1.0, 4.0], [1.0, 0.0, 1.0], [4.0, 1.0, 0.0]];
        let solution = SmoSolver::new(shared.view(), &[2, 0], &[1.0, -1.0], RbfKernel::new(0.5), 10.0, 1e-3, 1000).solve();
        assert_approx_eq!(f64, expected.alpha[1], solution.alpha[0], epsilon = 1e-12);
        assert_approx_eq!(f64, expected.alpha[0], solution.alpha[1], epsilon = 1e-12);
        assert_approx_eq!(f64, expected.rho, solution.rho, epsilon = 1e-12);
    }
}
