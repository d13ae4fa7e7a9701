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


use std::fmt::{Display, Formatter};
use ndarray::{concatenate, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use text_processing::{AffectMatrix, VocabularySignature};
use crate::error::AnalysisError;
use crate::projection::{ComponentScores, Projection};

/// Identifies the feature space a classifier was trained in.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct FeatureSignature {
    pub vocabulary: VocabularySignature,
    pub projection: u64,
    pub components: usize,
    pub affect: bool,
}

impl FeatureSignature {
    pub fn new(projection: &Projection, affect: bool) -> Self {
        Self {
            vocabulary: projection.vocabulary(),
            projection: projection.fingerprint(),
            components: projection.n_components(),
            affect,
        }
    }

    pub fn n_features(&self) -> usize {
        self.components + if self.affect { AffectMatrix::column_names().len() } else { 0 }
    }
}

impl Display for FeatureSignature {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} components of projection {:016x} over {}",
            self.components, self.projection, self.vocabulary
        )?;
        if self.affect {
            write!(f, " with affect counts")
        } else {
            write!(f, " without affect counts")
        }
    }
}

/// The input of the classifier: component scores, optionally followed by the affect counts.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    values: Array2<f64>,
    columns: Vec<String>,
}

impl FeatureMatrix {
    /// Concatenates both blocks row by row. Both have to describe the same documents in the same order.
    pub fn assemble(scores: &ComponentScores, affect: Option<&AffectMatrix>) -> Result<Self, AnalysisError> {
        let mut columns = scores.column_names();
        let values = match affect {
            None => scores.scores().to_owned(),
            Some(affect) => {
                if affect.n_documents() != scores.n_documents() {
                    return Err(AnalysisError::Alignment {
                        scores: scores.n_documents(),
                        affect: affect.n_documents(),
                    })
                }
                columns.extend(AffectMatrix::column_names());
                concatenate(Axis(1), &[scores.scores(), affect.counts()]).map_err(|_| AnalysisError::Alignment {
                    scores: scores.n_documents(),
                    affect: affect.n_documents(),
                })?
            }
        };
        Ok(Self { values, columns })
    }

    pub fn values(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn n_rows(&self) -> usize {
        self.values.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.values.ncols()
    }

    pub fn select_rows(&self, rows: &[usize]) -> Self {
        Self {
            values: self.values.select(Axis(0), rows),
            columns: self.columns.clone(),
        }
    }
}

#[cfg(test)]
mod test {
    use ndarray::Array2;
    use text_processing::{AffectCategory, AffectLexicon, AffectMatrix, Tokenizer};
    use text_processing::configs::TokenizerConfig;
    use crate::error::AnalysisError;
    use crate::projection::ComponentScores;
    use super::FeatureMatrix;

    fn affect(documents: usize) -> AffectMatrix {
        let tokenizer = Tokenizer::from_config(&TokenizerConfig::default()).unwrap();
        let lexicon = AffectLexicon::from_entries([("happy", AffectCategory::Joy)]);
        let corpus = (0..documents)
            .map(|i| if i % 3 == 0 { "happy day".to_string() } else { "plain day".to_string() })
            .collect::<Vec<_>>();
        AffectMatrix::build(&corpus, &lexicon, &tokenizer)
    }

    fn scores(documents: usize) -> ComponentScores {
        ComponentScores::new(Array2::from_shape_fn((documents, 2), |(i, j)| (i * 10 + j) as f64))
    }

    #[test]
    fn rows_stay_aligned(){
        for n in [1usize, 10, 1000] {
            let features = FeatureMatrix::assemble(&scores(n), Some(&affect(n))).unwrap();
            assert_eq!(n, features.n_rows());
            assert_eq!(12, features.n_features());
            for i in 0..n {
                assert_eq!((i * 10) as f64, features.values()[[i, 0]]);
                assert_eq!((i * 10 + 1) as f64, features.values()[[i, 1]]);
                let joy = if i % 3 == 0 { 1.0 } else { 0.0 };
                assert_eq!(joy, features.values()[[i, 2 + AffectCategory::Joy.index()]]);
            }
        }
    }

    #[test]
    fn without_affect(){
        let features = FeatureMatrix::assemble(&scores(4), None).unwrap();
        assert_eq!(vec!["PC1", "PC2"], features.columns());
    }

    #[test]
    fn mismatching_rows_fail(){
        let result = FeatureMatrix::assemble(&scores(3), Some(&affect(4)));
        assert!(matches!(result, Err(AnalysisError::Alignment { scores: 3, affect: 4 })));
    }
}
