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

//! A binary support vector classifier with a rbf kernel, trained with SMO,
//! plus the model selection around it.

pub mod classifier;
pub mod error;
pub mod grid_search;
pub mod kernel;
pub mod model_selection;
mod solver;

pub use classifier::{KernelSvc, SvcParameters};
pub use error::SvmError;
pub use grid_search::{CandidateScore, GridSearch, GridSearchResult};
pub use kernel::RbfKernel;
pub use model_selection::{train_test_split, Fold, StratifiedKFold};
