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

use std::process::ExitCode;
use strum::Display;
use svm::SvmError;
use text_processing::TextProcessingError;
use thiserror::Error;
use crate::artifacts::ArtifactError;

/// The stage of the analysis an error originates from.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum PipelineStage {
    Setup,
    Corpus,
    Tokenizer,
    Vocabulary,
    DocumentTermMatrix,
    Affect,
    Projection,
    Features,
    Classifier,
    Report,
}

/// A failure of an external resource.
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    TextProcessing(TextProcessingError),
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Svm(SvmError),
}

/// An error that aborts the analysis.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("[{stage}] Invalid configuration: {message}")]
    Configuration { stage: PipelineStage, message: String },
    #[error("[{stage}] The feature space does not match: expected {expected} but found {found}")]
    SchemaMismatch {
        stage: PipelineStage,
        expected: String,
        found: String,
    },
    #[error("[{stage}] {source}")]
    Resource {
        stage: PipelineStage,
        #[source]
        source: ResourceError,
    },
    #[error("[features] Can not align {scores} rows of component scores with {affect} rows of affect counts")]
    Alignment { scores: usize, affect: usize },
}

impl AnalysisError {
    pub fn configuration(stage: PipelineStage, message: impl Into<String>) -> Self {
        Self::Configuration { stage, message: message.into() }
    }

    pub fn schema_mismatch(stage: PipelineStage, expected: impl ToString, found: impl ToString) -> Self {
        Self::SchemaMismatch {
            stage,
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }

    pub fn resource(stage: PipelineStage, source: impl Into<ResourceError>) -> Self {
        Self::Resource { stage, source: source.into() }
    }

    /// Invalid limits and empty corpora are configuration errors, everything else is a resource error.
    pub fn from_text_processing(stage: PipelineStage, error: TextProcessingError) -> Self {
        if error.is_configuration() {
            Self::configuration(stage, error.to_string())
        } else {
            Self::Resource { stage, source: ResourceError::TextProcessing(error) }
        }
    }

    pub fn from_svm(stage: PipelineStage, error: SvmError) -> Self {
        match error {
            SvmError::FeatureCount { expected, found } => {
                Self::schema_mismatch(stage, format!("{expected} features"), format!("{found} features"))
            }
            SvmError::ThreadPool(_) => {
                Self::Resource { stage, source: ResourceError::Svm(error) }
            }
            other => Self::configuration(stage, other.to_string()),
        }
    }

    pub fn stage(&self) -> PipelineStage {
        match self {
            AnalysisError::Configuration { stage, .. }
            | AnalysisError::SchemaMismatch { stage, .. }
            | AnalysisError::Resource { stage, .. } => *stage,
            AnalysisError::Alignment { .. } => PipelineStage::Features,
        }
    }
}

impl Into<ExitCode> for AnalysisError {
    fn into(self) -> ExitCode {
        match self {
            AnalysisError::Configuration { .. } => ExitCode::from(3),
            AnalysisError::SchemaMismatch { .. } => ExitCode::from(4),
            AnalysisError::Resource { source, .. } => {
                ExitCode::from(match source {
                    ResourceError::Io(_) => 11,
                    ResourceError::TextProcessing(_) => 12,
                    ResourceError::Artifact(_) => 13,
                    ResourceError::Csv(_) => 14,
                    ResourceError::Json(_) => 15,
                    ResourceError::Svm(_) => 16,
                })
            }
            AnalysisError::Alignment { .. } => ExitCode::from(5),
        }
    }
}
