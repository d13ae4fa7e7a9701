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

use std::borrow::Borrow;
use std::collections::HashSet;
use std::fs::File;
use std::hash::Hash;
use std::io::{BufRead, BufReader};
use camino::Utf8Path;
use compact_str::{CompactString, ToCompactString};
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

use crate::configs::TokenizerConfig;
use crate::error::TextProcessingError;
use crate::stopwords_en;

/// An immutable set of stop words.
/// Every word is held raw and NFC normalized.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StopWordList {
    raw: HashSet<CompactString>,
    normalized: HashSet<CompactString>
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ContainsKind {
    Raw,
    Normalized,
    Both
}

impl StopWordList {

    pub fn new(mut raw: HashSet<CompactString>, mut normalized: HashSet<CompactString>) -> Self {
        raw.shrink_to_fit();
        normalized.shrink_to_fit();
        Self { raw, normalized }
    }

    pub fn from_raw(raw: HashSet<CompactString>) -> Self {
        let normalized = raw
            .iter()
            .map(|value| value.nfc().collect::<CompactString>())
            .collect::<HashSet<_>>();
        Self::new(raw, normalized)
    }

    pub fn builder() -> StopWordListBuilder {
        StopWordListBuilder::default()
    }

    /// The number of distinct raw words.
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    #[inline]
    pub fn contains<Q: ?Sized>(&self, kind: ContainsKind, value: &Q) -> bool
    where
        CompactString: Borrow<Q>,
        Q: Hash + Eq, {
        match kind {
            ContainsKind::Raw => {self.raw.contains(value)}
            ContainsKind::Normalized => {self.normalized.contains(value)}
            ContainsKind::Both => {self.raw.contains(value) || self.normalized.contains(value)}
        }
    }

    #[inline]
    pub fn contains_both<Q: ?Sized>(&self, value: &Q) -> bool
    where
        CompactString: Borrow<Q>,
        Q: Hash + Eq, {
        self.contains(ContainsKind::Both, value)
    }
}

/// Collects the parts of a [StopWordList].
/// The list itself can not be changed after [StopWordListBuilder::build].
#[derive(Debug, Default, Clone)]
pub struct StopWordListBuilder {
    words: HashSet<CompactString>
}

impl StopWordListBuilder {
    /// The english common words, the ascii punctuation and the known noise literals.
    pub fn with_english_defaults(mut self) -> Self {
        self.extend(stopwords_en::ENGLISH.iter().copied());
        self.extend(
            (0u8..128)
                .map(char::from)
                .filter(char::is_ascii_punctuation)
        );
        self.extend(stopwords_en::NOISE.iter().copied());
        self
    }

    /// Adds the words, empty or blank entries are ignored.
    pub fn with_words<I, Q>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = Q>,
        Q: ToCompactString
    {
        self.extend(words);
        self
    }

    /// Reads one word per line.
    pub fn with_file(self, path: impl AsRef<Utf8Path>) -> Result<Self, TextProcessingError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| TextProcessingError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let lines = BufReader::new(file)
            .lines()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| TextProcessingError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        log::debug!("Loaded {} stop words from {path}", lines.len());
        Ok(self.with_words(lines))
    }

    /// Everything a [TokenizerConfig] asks for, on top of the english defaults.
    pub fn from_config(cfg: &TokenizerConfig) -> Result<Self, TextProcessingError> {
        let builder = Self::default()
            .with_english_defaults()
            .with_words(&cfg.domain_stop_words)
            .with_words(&cfg.extra_stop_words);
        match cfg.stop_words_file {
            Some(ref file) => builder.with_file(file),
            None => Ok(builder)
        }
    }

    pub fn build(self) -> StopWordList {
        StopWordList::from_raw(self.words)
    }
}

impl<Q> Extend<Q> for StopWordListBuilder where Q: ToCompactString {
    fn extend<T: IntoIterator<Item=Q>>(&mut self, iter: T) {
        for value in iter.into_iter() {
            let word = value.to_compact_string();
            let word = word.trim();
            if word.is_empty() {
                continue
            }
            self.words.insert(word.to_lowercase().to_compact_string());
        }
    }
}

#[cfg(test)]
mod test {
    use std::io::Write;
    use crate::configs::TokenizerConfig;
    use super::*;

    #[test]
    fn defaults_contain_all_parts(){
        let list = StopWordList::builder().with_english_defaults().build();
        assert!(list.contains_both("the"));
        assert!(list.contains_both("i"));
        assert!(list.contains_both("#"));
        assert!(list.contains_both("&amp"));
        assert!(list.contains_both("\u{2026}"));
        assert!(!list.contains_both("freedom"));
    }

    #[test]
    fn config_adds_domain_and_extra_words(){
        let mut cfg = TokenizerConfig::default();
        cfg.extra_stop_words = vec!["Taxes".to_string(), "".to_string(), "  ".to_string()];
        let list = StopWordListBuilder::from_config(&cfg).unwrap().build();
        assert!(list.contains_both("trump"));
        assert!(list.contains_both("makeamericagreatagain"));
        assert!(list.contains_both("taxes"));
        assert!(!list.contains_both(""));
    }

    #[test]
    fn can_load_file(){
        let mut file = camino_tempfile::NamedUtf8TempFile::new().unwrap();
        writeln!(file, "alpha").unwrap();
        writeln!(file, "beta").unwrap();
        file.flush().unwrap();
        let list = StopWordList::builder().with_file(file.path()).unwrap().build();
        assert_eq!(2, list.len());
        assert!(list.contains(ContainsKind::Raw, "beta"));
    }

    #[test]
    fn missing_file_is_an_error(){
        let result = StopWordList::builder().with_file("does/not/exist.txt");
        assert!(matches!(result, Err(TextProcessingError::Io { .. })));
    }
}
