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
use std::hash::Hasher;
use indexmap::IndexMap;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use twox_hash::XxHash64;

use crate::error::TextProcessingError;
use crate::tokenizer::Tokenizer;

/// Identifies the feature space of a vocabulary: its size and a hash over the ranked terms.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct VocabularySignature {
    pub size: usize,
    pub hash: u64,
}

impl Display for VocabularySignature {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} terms ({:016x})", self.size, self.hash)
    }
}

/// The most frequent stemmed terms of a corpus, in rank order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vocabulary {
    terms: IndexMap<String, u64>,
}

impl Vocabulary {
    /// Counts the stemmed tokens of the whole corpus and keeps the `max_words` most frequent ones.
    /// Terms with the same count keep the order they were first seen in.
    pub fn build<I, S>(corpus: I, tokenizer: &Tokenizer, max_words: usize) -> Result<Self, TextProcessingError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>
    {
        if max_words == 0 {
            return Err(TextProcessingError::InvalidVocabularyLimit)
        }
        let mut counts: IndexMap<String, u64> = IndexMap::new();
        let mut documents = 0usize;
        for document in corpus {
            documents += 1;
            for token in tokenizer.stemmed_filter(document.as_ref()) {
                *counts.entry(token).or_insert(0) += 1;
            }
        }
        if documents == 0 {
            return Err(TextProcessingError::EmptyCorpus)
        }
        if counts.is_empty() {
            return Err(TextProcessingError::NoTerms)
        }
        log::info!("Getting top {max_words} words out of {} distinct terms...", counts.len());
        // sort_by is stable, ties stay in insertion order
        let terms = counts
            .into_iter()
            .sorted_by(|(_, a), (_, b)| b.cmp(a))
            .take(max_words)
            .collect::<IndexMap<_, _>>();
        Ok(Self { terms })
    }

    /// Recreates a vocabulary from already ranked terms.
    pub fn from_ranked<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = (S, u64)>,
        S: Into<String>
    {
        Self {
            terms: terms.into_iter().map(|(term, count)| (term.into(), count)).collect()
        }
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// The column index of `term`.
    pub fn index_of(&self, term: &str) -> Option<usize> {
        self.terms.get_index_of(term)
    }

    pub fn frequency(&self, term: &str) -> Option<u64> {
        self.terms.get(term).copied()
    }

    pub fn terms(&self) -> impl ExactSizeIterator<Item = &str> + '_ {
        self.terms.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = (&str, u64)> + '_ {
        self.terms.iter().map(|(term, count)| (term.as_str(), *count))
    }

    pub fn signature(&self) -> VocabularySignature {
        let mut hasher = XxHash64::with_seed(0);
        for term in self.terms.keys() {
            hasher.write(term.as_bytes());
            hasher.write_u8(0xff);
        }
        VocabularySignature {
            size: self.terms.len(),
            hash: hasher.finish(),
        }
    }
}
