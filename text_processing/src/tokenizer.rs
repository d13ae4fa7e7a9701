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

use std::borrow::Cow;
use std::fmt::{Debug, Formatter};
use std::sync::{Arc, LazyLock};
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use unicode_normalization::UnicodeNormalization;

use crate::configs::TokenizerConfig;
use crate::error::TextProcessingError;
use crate::stopword_registry::{StopWordList, StopWordListBuilder};

/// Splits into runs of word characters and runs of punctuation.
static WORD_PUNCT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\w+|[^\w\s]+").expect("The word/punctuation pattern is valid.")
});

/// Turns raw text into filtered tokens.
///
/// There are two deliberately different paths:
/// - [Tokenizer::stemmed_filter] feeds the vocabulary and the document-term matrix.
/// - [Tokenizer::raw_filter] feeds the affect lexicon lookup, which needs the exact words.
///
/// Both lower-case, drop stop words and drop anything starting with `http`.
#[derive(Clone)]
pub struct Tokenizer {
    normalize: bool,
    stop_words: Arc<StopWordList>,
    stemmer: Arc<Stemmer>,
}

impl Debug for Tokenizer {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tokenizer")
            .field("normalize", &self.normalize)
            .field("stop_words", &self.stop_words.len())
            .finish()
    }
}

impl Tokenizer {
    pub fn new(normalize: bool, stop_words: Arc<StopWordList>) -> Self {
        Self {
            normalize,
            stop_words,
            stemmer: Arc::new(Stemmer::create(Algorithm::English)),
        }
    }

    pub fn from_config(cfg: &TokenizerConfig) -> Result<Self, TextProcessingError> {
        let stop_words = StopWordListBuilder::from_config(cfg)?.build();
        log::debug!("Initialized tokenizer with {} stop words.", stop_words.len());
        Ok(Self::new(cfg.normalize_text, Arc::new(stop_words)))
    }

    pub fn stop_words(&self) -> &Arc<StopWordList> {
        &self.stop_words
    }

    fn filtered(&self, text: &str) -> Vec<String> {
        let text: Cow<str> = if self.normalize {
            Cow::Owned(text.nfc().collect::<String>())
        } else {
            Cow::Borrowed(text)
        };
        WORD_PUNCT
            .find_iter(&text)
            .map(|found| found.as_str().to_lowercase())
            .filter(|token| !self.stop_words.contains_both(token.as_str()))
            .filter(|token| !token.starts_with("http"))
            .collect()
    }

    /// Lower-cased, filtered and stemmed tokens in document order.
    pub fn stemmed_filter(&self, text: &str) -> Vec<String> {
        self.filtered(text)
            .into_iter()
            .map(|token| self.stemmer.stem(&token).into_owned())
            .collect()
    }

    /// Lower-cased and filtered tokens in document order, without stemming.
    pub fn raw_filter(&self, text: &str) -> Vec<String> {
        self.filtered(text)
    }
}
