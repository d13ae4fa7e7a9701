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

use ndarray::{Array2, ArrayView1, ArrayView2};

use crate::tokenizer::Tokenizer;
use crate::vocabulary::{Vocabulary, VocabularySignature};

/// Term counts per document over a fixed vocabulary.
/// Rows follow the corpus order, columns the rank order of the vocabulary.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentTermMatrix {
    counts: Array2<f64>,
    terms: Vec<String>,
    signature: VocabularySignature,
}

impl DocumentTermMatrix {
    pub fn build<I, S>(corpus: I, vocabulary: &Vocabulary, tokenizer: &Tokenizer) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>
    {
        let rows = corpus
            .into_iter()
            .map(|document| {
                let mut row = vec![0.0; vocabulary.len()];
                for token in tokenizer.stemmed_filter(document.as_ref()) {
                    if let Some(idx) = vocabulary.index_of(&token) {
                        row[idx] += 1.0;
                    }
                }
                row
            })
            .collect::<Vec<_>>();
        let mut counts = Array2::zeros((rows.len(), vocabulary.len()));
        for (mut target, row) in counts.rows_mut().into_iter().zip(rows) {
            target.assign(&ArrayView1::from(&row));
        }
        log::debug!("Created a document term matrix of shape {:?}.", counts.dim());
        Self {
            counts,
            terms: vocabulary.terms().map(str::to_string).collect(),
            signature: vocabulary.signature(),
        }
    }

    /// Wraps precomputed counts. The caller guarantees that the columns follow `vocabulary`.
    pub fn from_counts(counts: Array2<f64>, vocabulary: &Vocabulary) -> Option<Self> {
        (counts.ncols() == vocabulary.len()).then(|| Self {
            counts,
            terms: vocabulary.terms().map(str::to_string).collect(),
            signature: vocabulary.signature(),
        })
    }

    pub fn counts(&self) -> ArrayView2<'_, f64> {
        self.counts.view()
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn signature(&self) -> VocabularySignature {
        self.signature
    }

    pub fn n_documents(&self) -> usize {
        self.counts.nrows()
    }

    pub fn n_terms(&self) -> usize {
        self.counts.ncols()
    }

    /// Keeps only the given rows, in the given order.
    pub fn select_rows(&self, rows: &[usize]) -> Self {
        Self {
            counts: self.counts.select(ndarray::Axis(0), rows),
            terms: self.terms.clone(),
            signature: self.signature,
        }
    }
}

#[cfg(test)]
mod test {
    use crate::configs::TokenizerConfig;
    use crate::tokenizer::Tokenizer;
    use crate::vocabulary::Vocabulary;
    use super::DocumentTermMatrix;

    fn setup() -> (Tokenizer, Vocabulary) {
        let tokenizer = Tokenizer::from_config(&TokenizerConfig::default()).unwrap();
        let corpus = ["great wall great jobs", "families healthcare jobs", "wall border"];
        let vocabulary = Vocabulary::build(corpus, &tokenizer, 4).unwrap();
        (tokenizer, vocabulary)
    }

    #[test]
    fn shape_follows_corpus_and_vocabulary(){
        let (tokenizer, vocabulary) = setup();
        let corpus = ["great jobs", "border", "wall wall wall", "", "healthcare"];
        let dtm = DocumentTermMatrix::build(corpus, &vocabulary, &tokenizer);
        assert_eq!((5, 4), dtm.counts().dim());
        assert_eq!(vocabulary.terms().collect::<Vec<_>>(), dtm.terms());
        let wall = vocabulary.index_of("wall").unwrap();
        assert_eq!(3.0, dtm.counts()[[2, wall]]);
        assert_eq!(0.0, dtm.counts().row(3).sum());
    }

    #[test]
    fn vectorizing_twice_is_identical(){
        let (tokenizer, vocabulary) = setup();
        let corpus = ["great wall", "jobs jobs families"];
        let a = DocumentTermMatrix::build(corpus, &vocabulary, &tokenizer);
        let b = DocumentTermMatrix::build(corpus, &vocabulary, &tokenizer);
        assert_eq!(a, b);
    }

    #[test]
    fn unseen_tokens_are_ignored(){
        let (tokenizer, vocabulary) = setup();
        let dtm = DocumentTermMatrix::build(["quantum entanglement spaghetti"], &vocabulary, &tokenizer);
        assert_eq!(1, dtm.n_documents());
        assert!(dtm.counts().iter().all(|value| *value == 0.0));
    }
}
