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

use camino::Utf8PathBuf;
use thiserror::Error;

/// An error from the text mining steps.
#[derive(Debug, Error)]
pub enum TextProcessingError {
    #[error("The maximum vocabulary size has to be at least 1!")]
    InvalidVocabularyLimit,
    #[error("The corpus does not contain any document!")]
    EmptyCorpus,
    #[error("No token of the corpus survived the stop word filter!")]
    NoTerms,
    #[error("Failed to read {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed lexicon entry in line {line}: {reason}")]
    MalformedLexicon { line: u64, reason: String },
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

impl TextProcessingError {
    /// True if the error was caused by the caller's parameters or corpus and not by a resource.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            TextProcessingError::InvalidVocabularyLimit
                | TextProcessingError::EmptyCorpus
                | TextProcessingError::NoTerms
        )
    }
}
