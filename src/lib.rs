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


//! Attributes short posts to one of two authors: a ranked vocabulary, a
//! document-term matrix, a principal component projection and optional
//! affect counts feed a kernel SVM selected by grid search.

pub mod app;
pub mod artifacts;
pub mod biplot;
pub mod classifier;
pub mod config;
pub mod corpus;
pub mod error;
pub mod features;
pub mod labels;
pub mod pipeline;
pub mod projection;
pub mod report;

pub use error::{AnalysisError, PipelineStage};
pub use pipeline::{Analyzer, PredictRun, Stages, TrainRun};
