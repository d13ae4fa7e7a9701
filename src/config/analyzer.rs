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
use text_processing::configs::TokenizerConfig;
use text_processing::LexiconFormat;
use crate::classifier::ClassifierSettings;
use crate::error::{AnalysisError, PipelineStage};
use crate::labels::LabelNames;
use crate::projection::ProjectionScope;

/// Where the affect lexicon lives and how it is laid out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LexiconConfig {
    #[serde(default = "_default_lexicon_path")]
    pub path: Utf8PathBuf,
    #[serde(default)]
    pub format: LexiconFormat,
}

fn _default_lexicon_path() -> Utf8PathBuf {
    Utf8PathBuf::from("data/NRC-emotion-lexicon-wordlevel-alphabetized-v0.92.txt")
}

impl Default for LexiconConfig {
    fn default() -> Self {
        Self {
            path: _default_lexicon_path(),
            format: LexiconFormat::default(),
        }
    }
}

/// Which stages reuse a stored artifact instead of fitting.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadConfig {
    #[serde(default)]
    pub vocabulary: bool,
    #[serde(default)]
    pub projection: bool,
    #[serde(default)]
    pub classifier: bool,
}

impl LoadConfig {
    pub const fn all() -> Self {
        Self {
            vocabulary: true,
            projection: true,
            classifier: true,
        }
    }
}

/// Everything the analysis needs to know.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// The maximum number of terms in the vocabulary
    #[serde(default = "_default_max_words")]
    pub max_words: usize,
    /// The fraction of variance the projection has to explain
    #[serde(default = "_default_variance_threshold")]
    pub variance_threshold: f64,
    /// Adds the affect counts to the features
    #[serde(default = "_default_use_sentiment")]
    pub use_sentiment: bool,
    #[serde(default)]
    pub tokenizer: TokenizerConfig,
    #[serde(default)]
    pub label_names: LabelNames,
    #[serde(default)]
    pub lexicon: LexiconConfig,
    #[serde(default)]
    pub classifier: ClassifierSettings,
    #[serde(default)]
    pub projection_scope: ProjectionScope,
    #[serde(default)]
    pub load: LoadConfig,
    /// The directory of the stored artifacts
    #[serde(default = "_default_model_dir")]
    pub model_dir: Utf8PathBuf,
}

const fn _default_max_words() -> usize {
    150
}

const fn _default_variance_threshold() -> f64 {
    0.8
}

const fn _default_use_sentiment() -> bool {
    true
}

fn _default_model_dir() -> Utf8PathBuf {
    Utf8PathBuf::from("model")
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            max_words: _default_max_words(),
            variance_threshold: _default_variance_threshold(),
            use_sentiment: _default_use_sentiment(),
            tokenizer: TokenizerConfig::default(),
            label_names: LabelNames::default(),
            lexicon: LexiconConfig::default(),
            classifier: ClassifierSettings::default(),
            projection_scope: ProjectionScope::default(),
            load: LoadConfig::default(),
            model_dir: _default_model_dir(),
        }
    }
}

impl AnalyzerConfig {
    /// Checks the values that do not depend on the data.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        let err = |message: String| Err(AnalysisError::configuration(PipelineStage::Setup, message));
        if self.max_words == 0 {
            return err("max_words has to be at least 1.".to_string())
        }
        if !(self.variance_threshold > 0.0 && self.variance_threshold <= 1.0) {
            return err(format!("variance_threshold has to be in (0, 1] but is {}.", self.variance_threshold))
        }
        let test_size = self.classifier.test_size;
        if !(test_size > 0.0 && test_size < 1.0) {
            return err(format!("test_size has to be in (0, 1) but is {test_size}."))
        }
        if self.classifier.grid.folds < 2 {
            return err(format!("At least 2 folds are necessary but got {}.", self.classifier.grid.folds))
        }
        if self.load.classifier && !self.load.projection {
            return err("A loaded classifier needs the projection it was trained with, set load.projection as well.".to_string())
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use crate::error::AnalysisError;
    use super::{AnalyzerConfig, LoadConfig};

    #[test]
    fn defaults_are_valid(){
        let cfg = AnalyzerConfig::default();
        assert_eq!(150, cfg.max_words);
        assert_eq!(0.8, cfg.variance_threshold);
        assert_eq!(25, cfg.classifier.grid.candidates().len());
        cfg.validate().unwrap();
    }

    #[test]
    fn rejects_invalid_values(){
        let mut cfg = AnalyzerConfig::default();
        cfg.max_words = 0;
        assert!(matches!(cfg.validate(), Err(AnalysisError::Configuration { .. })));

        let mut cfg = AnalyzerConfig::default();
        cfg.variance_threshold = 1.2;
        assert!(cfg.validate().is_err());

        let mut cfg = AnalyzerConfig::default();
        cfg.load = LoadConfig { vocabulary: true, projection: false, classifier: true };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn partial_json_uses_defaults(){
        let cfg: AnalyzerConfig = serde_json::from_str(r#"{"max_words": 20, "load": {"vocabulary": true}}"#).unwrap();
        assert_eq!(20, cfg.max_words);
        assert!(cfg.load.vocabulary);
        assert!(!cfg.load.classifier);
        assert_eq!(42, cfg.classifier.seed);
    }
}
