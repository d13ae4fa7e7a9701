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
use serde::{Deserialize, Serialize};

/// Candidate names, campaign hashtags and handles. They identify the author
/// too directly to be useful as features.
pub const DEFAULT_DOMAIN_STOP_WORDS: &[&str] = &[
    "hillary",
    "clinton",
    "donald",
    "trump",
    "clinton2016",
    "trump2016",
    "hillary2016",
    "makeamericagreatagain",
    "realdonaldtrump",
    "hillaryclinton",
    "berniesanders",
];

/// The config for the text processing used by other modules.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenizerConfig {
    /// If set to true the text is NFC normalized before splitting
    #[serde(default = "_default_normalize_text")]
    pub normalize_text: bool,
    /// Domain specific terms, replaces the default candidate names if set.
    #[serde(default = "_default_domain_stop_words")]
    pub domain_stop_words: Vec<String>,
    /// Additional terms supplied by the caller.
    #[serde(default)]
    pub extra_stop_words: Vec<String>,
    /// A file with one additional stop word per line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_words_file: Option<Utf8PathBuf>,
}

const fn _default_normalize_text() -> bool {
    true
}

fn _default_domain_stop_words() -> Vec<String> {
    DEFAULT_DOMAIN_STOP_WORDS
        .iter()
        .map(|value| value.to_string())
        .collect()
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            normalize_text: _default_normalize_text(),
            domain_stop_words: _default_domain_stop_words(),
            extra_stop_words: Vec::new(),
            stop_words_file: None,
        }
    }
}
