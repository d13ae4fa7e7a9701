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


use std::hash::Hasher;
use itertools::Itertools;
use nalgebra::{DMatrix, SymmetricEigen};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use text_processing::{DocumentTermMatrix, VocabularySignature};
use twox_hash::XxHash64;
use crate::error::{AnalysisError, PipelineStage};

/// Which documents the projection is fitted on in train mode.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectionScope {
    /// Every document, including the ones later held out for testing.
    #[default]
    FullCorpus,
    /// Only the training partition.
    TrainPartition,
}

/// A fitted principal component analysis over the columns of a [DocumentTermMatrix].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    mean: Array1<f64>,
    /// One row per component, one column per term.
    components: Array2<f64>,
    explained_variance: Array1<f64>,
    explained_variance_ratio: Array1<f64>,
    variance_threshold: f64,
    terms: Vec<String>,
    vocabulary: VocabularySignature,
}

/// The coordinates of every document in component space, columns `PC1..PCN`.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentScores {
    scores: Array2<f64>,
}

impl ComponentScores {
    pub fn new(scores: Array2<f64>) -> Self {
        Self { scores }
    }

    pub fn scores(&self) -> ArrayView2<'_, f64> {
        self.scores.view()
    }

    pub fn n_documents(&self) -> usize {
        self.scores.nrows()
    }

    pub fn n_components(&self) -> usize {
        self.scores.ncols()
    }

    pub fn column_names(&self) -> Vec<String> {
        component_names(self.n_components())
    }

    pub fn column(&self, idx: usize) -> Option<ArrayView1<'_, f64>> {
        (idx < self.n_components()).then(|| self.scores.column(idx))
    }
}

/// `PC1..PCn`
pub fn component_names(n: usize) -> Vec<String> {
    (1..=n).map(|i| format!("PC{i}")).collect()
}

impl Projection {
    /// Keeps the fewest components whose cumulative explained variance ratio exceeds
    /// `variance_threshold`. A threshold of 1 keeps every component with variance.
    pub fn fit(dtm: &DocumentTermMatrix, variance_threshold: f64) -> Result<Self, AnalysisError> {
        if !(variance_threshold > 0.0 && variance_threshold <= 1.0) {
            return Err(AnalysisError::configuration(
                PipelineStage::Projection,
                format!("The variance threshold has to be in (0, 1] but is {variance_threshold}."),
            ))
        }
        let x = dtm.counts();
        let (n_samples, n_terms) = x.dim();
        if n_samples < 2 {
            return Err(AnalysisError::configuration(
                PipelineStage::Projection,
                format!("At least 2 documents are necessary to fit a projection but got {n_samples}."),
            ))
        }
        if n_terms == 0 {
            return Err(AnalysisError::configuration(PipelineStage::Projection, "The vocabulary is empty."))
        }

        let mean = x.mean_axis(Axis(0)).ok_or_else(|| {
            AnalysisError::configuration(PipelineStage::Projection, "Can not center an empty matrix.")
        })?;
        let centered = &x - &mean;
        let covariance = centered.t().dot(&centered) / (n_samples as f64 - 1.0);

        let (eigenvalues, eigenvectors) = symmetric_eigen(covariance);
        let order = (0..n_terms)
            .sorted_by(|a, b| eigenvalues[*b].total_cmp(&eigenvalues[*a]))
            .collect_vec();
        let eigenvalues = order.iter().map(|i| eigenvalues[*i].max(0.0)).collect::<Array1<f64>>();
        let total = eigenvalues.sum();
        if !(total > f64::EPSILON) {
            return Err(AnalysisError::configuration(
                PipelineStage::Projection,
                "The document term matrix has no variance.",
            ))
        }
        let ratio = &eigenvalues / total;

        let non_degenerate = eigenvalues.iter().filter(|value| **value > total * 1e-12).count().max(1);
        let mut cumulative = 0.0;
        let mut n_components = non_degenerate;
        for (idx, value) in ratio.iter().enumerate() {
            cumulative += value;
            if cumulative > variance_threshold {
                n_components = (idx + 1).min(non_degenerate);
                break
            }
        }

        let mut components = Array2::zeros((n_components, n_terms));
        for (mut target, source) in components.rows_mut().into_iter().zip(&order) {
            let vector = eigenvectors.column(*source);
            let pivot = vector
                .iter()
                .copied()
                .max_by(|a, b| a.abs().total_cmp(&b.abs()))
                .unwrap_or(1.0);
            let sign = if pivot < 0.0 { -1.0 } else { 1.0 };
            target.assign(&vector.mapv(|value| value * sign));
        }

        log::info!(
            "Kept {n_components} of {n_terms} components explaining {:.3} of the variance.",
            ratio.iter().take(n_components).sum::<f64>()
        );

        Ok(Self {
            mean,
            components,
            explained_variance: eigenvalues.slice(ndarray::s![..n_components]).to_owned(),
            explained_variance_ratio: ratio.slice(ndarray::s![..n_components]).to_owned(),
            variance_threshold,
            terms: dtm.terms().to_vec(),
            vocabulary: dtm.signature(),
        })
    }

    /// Projects the documents, the matrix has to use the vocabulary the projection was fitted on.
    pub fn transform(&self, dtm: &DocumentTermMatrix) -> Result<ComponentScores, AnalysisError> {
        if dtm.signature() != self.vocabulary || dtm.n_terms() != self.mean.len() {
            return Err(AnalysisError::schema_mismatch(
                PipelineStage::Projection,
                self.vocabulary,
                dtm.signature(),
            ))
        }
        let centered = &dtm.counts() - &self.mean;
        Ok(ComponentScores::new(centered.dot(&self.components.t())))
    }

    pub fn n_components(&self) -> usize {
        self.components.nrows()
    }

    /// Rows are components, columns are terms.
    pub fn loadings(&self) -> ArrayView2<'_, f64> {
        self.components.view()
    }

    /// Rows are terms, columns are components. Every column sums to 1.
    pub fn squared_loadings(&self) -> Array2<f64> {
        self.components.t().mapv(|value| value * value)
    }

    pub fn explained_variance(&self) -> ArrayView1<'_, f64> {
        self.explained_variance.view()
    }

    pub fn explained_variance_ratio(&self) -> ArrayView1<'_, f64> {
        self.explained_variance_ratio.view()
    }

    pub fn variance_threshold(&self) -> f64 {
        self.variance_threshold
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn vocabulary(&self) -> VocabularySignature {
        self.vocabulary
    }

    /// A hash over the fitted transform.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = XxHash64::with_seed(0);
        hasher.write_usize(self.components.nrows());
        hasher.write_usize(self.components.ncols());
        for value in self.components.iter().chain(self.mean.iter()) {
            hasher.write_u64(value.to_bits());
        }
        hasher.finish()
    }
}

/// Eigen decomposition of a symmetric matrix.
/// Returns the eigenvalues and the eigenvectors as columns, both unsorted.
fn symmetric_eigen(a: Array2<f64>) -> (Vec<f64>, Array2<f64>) {
    let n = a.nrows();
    let eigen = SymmetricEigen::new(DMatrix::from_iterator(n, n, a.t().iter().copied()));
    let vectors = Array2::from_shape_fn((n, n), |(row, column)| eigen.eigenvectors[(row, column)]);
    (eigen.eigenvalues.iter().copied().collect(), vectors)
}

#[cfg(test)]
mod test {
    use float_cmp::assert_approx_eq;
    use ndarray::{array, Array2};
    use text_processing::{DocumentTermMatrix, Vocabulary};
    use crate::error::AnalysisError;
    use super::*;

    fn vocabulary(n: usize) -> Vocabulary {
        Vocabulary::from_ranked((0..n).map(|i| (format!("term{i}"), (n - i) as u64)))
    }

    fn dtm(counts: Array2<f64>) -> DocumentTermMatrix {
        let vocabulary = vocabulary(counts.ncols());
        DocumentTermMatrix::from_counts(counts, &vocabulary).unwrap()
    }

    #[test]
    fn eigen_decomposition_of_a_known_matrix(){
        let (values, vectors) = symmetric_eigen(array![[2.0, 1.0], [1.0, 2.0]]);
        let mut sorted = values.clone();
        sorted.sort_by(f64::total_cmp);
        assert_approx_eq!(f64, 1.0, sorted[0], epsilon = 1e-12);
        assert_approx_eq!(f64, 3.0, sorted[1], epsilon = 1e-12);
        let first = vectors.column(0);
        assert_approx_eq!(f64, 1.0, first.dot(&first), epsilon = 1e-12);
    }

    #[test]
    fn eigen_vectors_are_columns(){
        let matrix = array![[4.0, 1.0, 0.0], [1.0, 3.0, 1.0], [0.0, 1.0, 2.0]];
        let (values, vectors) = symmetric_eigen(matrix.clone());
        assert_approx_eq!(f64, 9.0, values.iter().sum::<f64>(), epsilon = 1e-9);
        for (idx, value) in values.iter().enumerate() {
            let vector = vectors.column(idx);
            let product = matrix.dot(&vector);
            for (left, right) in product.iter().zip(vector.iter()) {
                assert_approx_eq!(f64, *left, value * right, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn single_direction_needs_one_component(){
        let matrix = dtm(array![[1.0, 2.0], [2.0, 4.0], [3.0, 6.0], [4.0, 8.0]]);
        let projection = Projection::fit(&matrix, 0.8).unwrap();
        assert_eq!(1, projection.n_components());
        assert_approx_eq!(f64, 1.0, projection.explained_variance_ratio()[0], epsilon = 1e-9);
        let loadings = projection.loadings();
        assert_approx_eq!(f64, 1.0 / 5f64.sqrt(), loadings[[0, 0]], epsilon = 1e-9);
        assert_approx_eq!(f64, 2.0 / 5f64.sqrt(), loadings[[0, 1]], epsilon = 1e-9);
    }

    #[test]
    fn round_trip_keeps_rows_and_threshold(){
        let matrix = dtm(array![
            [1.0, 0.0, 0.0, 2.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 3.0, 1.0],
            [2.0, 1.0, 0.0, 0.0],
            [0.0, 2.0, 1.0, 1.0],
            [1.0, 1.0, 1.0, 0.0],
        ]);
        let projection = Projection::fit(&matrix, 0.8).unwrap();
        let scores = projection.transform(&matrix).unwrap();
        assert_eq!(6, scores.n_documents());
        assert_eq!(projection.n_components(), scores.n_components());
        let ratio = projection.explained_variance_ratio();
        let kept = ratio.sum();
        assert!(kept > 0.8);
        assert!(kept - ratio[ratio.len() - 1] <= 0.8);
        for column in projection.squared_loadings().columns() {
            assert_approx_eq!(f64, 1.0, column.sum(), epsilon = 1e-9);
        }
        // scores are centered
        for column in scores.scores().columns() {
            assert_approx_eq!(f64, 0.0, column.sum(), epsilon = 1e-9);
        }
        assert_eq!("PC1", scores.column_names()[0]);
    }

    #[test]
    fn full_threshold_keeps_every_direction(){
        let matrix = dtm(array![[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [0.0, 0.0, 0.0]]);
        let projection = Projection::fit(&matrix, 1.0).unwrap();
        assert_eq!(3, projection.n_components());
    }

    #[test]
    fn rejects_mismatching_vocabulary(){
        let matrix = dtm(array![[1.0, 0.0], [0.0, 1.0], [1.0, 1.0]]);
        let projection = Projection::fit(&matrix, 0.8).unwrap();
        let other = DocumentTermMatrix::from_counts(
            array![[1.0, 0.0], [0.0, 1.0]],
            &Vocabulary::from_ranked([("other", 2), ("terms", 1)]),
        ).unwrap();
        assert!(matches!(projection.transform(&other), Err(AnalysisError::SchemaMismatch { .. })));
    }

    #[test]
    fn rejects_bad_input(){
        let matrix = dtm(array![[1.0, 0.0], [1.0, 0.0]]);
        assert!(matches!(Projection::fit(&matrix, 0.8), Err(AnalysisError::Configuration { .. })));
        let matrix = dtm(array![[1.0, 0.0], [0.0, 1.0]]);
        assert!(matches!(Projection::fit(&matrix, 0.0), Err(AnalysisError::Configuration { .. })));
        assert!(matches!(Projection::fit(&matrix, 1.5), Err(AnalysisError::Configuration { .. })));
        let single = dtm(array![[1.0, 2.0]]);
        assert!(matches!(Projection::fit(&single, 0.8), Err(AnalysisError::Configuration { .. })));
    }

    #[test]
    fn fingerprint_follows_the_fit(){
        let a = Projection::fit(&dtm(array![[1.0, 0.0], [0.0, 1.0], [1.0, 1.0]]), 0.8).unwrap();
        let b = Projection::fit(&dtm(array![[1.0, 0.0], [0.0, 1.0], [1.0, 1.0]]), 0.8).unwrap();
        let c = Projection::fit(&dtm(array![[2.0, 0.0], [0.0, 1.0], [1.0, 1.0]]), 0.8).unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
    }
}
