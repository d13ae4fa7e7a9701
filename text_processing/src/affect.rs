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

use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::str::FromStr;
use camino::Utf8Path;
use csv::{ReaderBuilder, Trim};
use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumCount, EnumIter, EnumString, IntoEnumIterator};

use crate::error::TextProcessingError;
use crate::tokenizer::Tokenizer;

/// The emotion and sentiment categories of the NRC word-emotion association lexicon.
/// The declaration order is the column order of an [AffectMatrix].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter, EnumCount)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AffectCategory {
    Positive,
    Negative,
    Anger,
    Anticipation,
    Disgust,
    Fear,
    Joy,
    Sadness,
    Surprise,
    Trust,
}

impl AffectCategory {
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// How the lexicon file is laid out.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LexiconFormat {
    /// The number of lines before the first entry.
    #[serde(default = "_default_skip_rows")]
    pub skip_rows: usize,
    #[serde(default = "_default_delimiter")]
    pub delimiter: char,
}

const fn _default_skip_rows() -> usize {
    45
}

const fn _default_delimiter() -> char {
    '\t'
}

impl Default for LexiconFormat {
    fn default() -> Self {
        Self {
            skip_rows: _default_skip_rows(),
            delimiter: _default_delimiter(),
        }
    }
}

/// The words associated with each [AffectCategory].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AffectLexicon {
    words: [HashSet<String>; AffectCategory::COUNT],
}

impl AffectLexicon {
    /// Loads a `word<delimiter>category<delimiter>flag` file.
    /// Only entries flagged with `1` and only known categories are kept.
    pub fn load(path: impl AsRef<Utf8Path>, format: &LexiconFormat) -> Result<Self, TextProcessingError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| TextProcessingError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let lexicon = Self::read(BufReader::new(file), format)?;
        log::info!("Loaded the affect lexicon from {path} with {} associations.", lexicon.len());
        Ok(lexicon)
    }

    /// Reads the lexicon from any reader, see [AffectLexicon::load].
    pub fn read<R: std::io::Read>(reader: R, format: &LexiconFormat) -> Result<Self, TextProcessingError> {
        let delimiter = u8::try_from(format.delimiter).map_err(|_| TextProcessingError::MalformedLexicon {
            line: 0,
            reason: format!("The delimiter {:?} is not a single byte.", format.delimiter),
        })?;
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .quoting(false)
            .comment(None)
            .delimiter(delimiter)
            .trim(Trim::All)
            .from_reader(reader);

        let mut lexicon = Self::default();
        for record in reader.records() {
            let record = record?;
            let line = record.position().map_or(0, |pos| pos.line());
            if line <= format.skip_rows as u64 {
                continue
            }
            if record.iter().all(str::is_empty) {
                continue
            }
            // Lines separated by runs of spaces end up in a single field.
            let fields = if record.len() < 3 {
                record.iter().flat_map(str::split_ascii_whitespace).collect::<Vec<_>>()
            } else {
                record.iter().collect::<Vec<_>>()
            };
            if fields.len() < 3 {
                return Err(TextProcessingError::MalformedLexicon {
                    line,
                    reason: format!("Expected 3 fields but found {}.", fields.len()),
                })
            }
            let flag: u8 = fields[2].parse().map_err(|_| TextProcessingError::MalformedLexicon {
                line,
                reason: format!("The flag {:?} is not an integer.", fields[2]),
            })?;
            if flag != 1 {
                continue
            }
            if let Ok(category) = AffectCategory::from_str(fields[1]) {
                lexicon.insert(fields[0], category);
            }
        }
        Ok(lexicon)
    }

    /// Builds a lexicon from `(word, category)` pairs.
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, AffectCategory)>,
        S: AsRef<str>
    {
        let mut lexicon = Self::default();
        for (word, category) in entries {
            lexicon.insert(word.as_ref(), category);
        }
        lexicon
    }

    fn insert(&mut self, word: &str, category: AffectCategory) {
        self.words[category.index()].insert(word.to_lowercase());
    }

    pub fn words(&self, category: AffectCategory) -> &HashSet<String> {
        &self.words[category.index()]
    }

    /// The number of word-category associations.
    pub fn len(&self) -> usize {
        self.words.iter().map(HashSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(HashSet::is_empty)
    }
}

/// Per document the number of distinct words shared with each affect category.
#[derive(Debug, Clone, PartialEq)]
pub struct AffectMatrix {
    counts: Array2<f64>,
}

impl AffectMatrix {
    /// Uses the unstemmed tokens, the lexicon holds full words.
    pub fn build<I, S>(corpus: I, lexicon: &AffectLexicon, tokenizer: &Tokenizer) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>
    {
        let documents = corpus.into_iter().collect::<Vec<_>>();
        let mut counts = Array2::zeros((documents.len(), AffectCategory::COUNT));
        for (mut row, document) in counts.rows_mut().into_iter().zip(&documents) {
            let tokens = tokenizer.raw_filter(document.as_ref()).into_iter().collect::<HashSet<_>>();
            for category in AffectCategory::iter() {
                row[category.index()] = tokens.intersection(lexicon.words(category)).count() as f64;
            }
        }
        Self { counts }
    }

    pub fn counts(&self) -> ArrayView2<'_, f64> {
        self.counts.view()
    }

    pub fn n_documents(&self) -> usize {
        self.counts.nrows()
    }

    /// The column names in order.
    pub fn column_names() -> Vec<String> {
        AffectCategory::iter().map(|category| category.to_string()).collect()
    }
}
