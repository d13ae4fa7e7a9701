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


use serde::{Deserialize, Serialize};
use svm::{train_test_split, CandidateScore, GridSearch, KernelSvc};
use crate::error::{AnalysisError, PipelineStage};
use crate::features::{FeatureMatrix, FeatureSignature};
use crate::labels::{from_raw, to_raw, Label};

/// How the labelled corpus is split and searched in train mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierSettings {
    #[serde(default)]
    pub grid: GridSearch,
    /// Fraction of the documents held out for testing.
    #[serde(default = "_default_test_size")]
    pub test_size: f64,
    #[serde(default = "_default_seed")]
    pub seed: u64,
}

const fn _default_test_size() -> f64 {
    0.2
}

const fn _default_seed() -> u64 {
    42
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            grid: GridSearch::default(),
            test_size: _default_test_size(),
            seed: _default_seed(),
        }
    }
}

/// Row indices of the train and test documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

impl Partition {
    /// Splits the labelled documents and checks that the training side is big enough
    /// for the cross validation.
    pub fn split(labels: &[Label], settings: &ClassifierSettings) -> Result<Self, AnalysisError> {
        let folds = settings.grid.folds;
        let too_small = || AnalysisError::configuration(
            PipelineStage::Classifier,
            format!(
                "{} labelled documents are too few: the training partition needs at least {folds} documents and both classes for a {folds}-fold cross validation.",
                labels.len()
            ),
        );
        let (train, test) = train_test_split(labels.len(), settings.test_size, settings.seed)
            .map_err(|err| match err {
                svm::SvmError::EmptyPartition { .. } => too_small(),
                other => AnalysisError::from_svm(PipelineStage::Classifier, other),
            })?;
        if train.len() < folds {
            return Err(too_small())
        }
        let positives = train.iter().filter(|i| labels[**i] == Label::POSITIVE).count();
        if positives == 0 || positives == train.len() {
            return Err(AnalysisError::configuration(
                PipelineStage::Classifier,
                "The training partition contains only one class.",
            ))
        }
        Ok(Self { train, test })
    }
}

/// A fitted classifier together with the feature space it expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierModel {
    svc: KernelSvc,
    c: f64,
    gamma: f64,
    cv_score: f64,
    features: FeatureSignature,
}

impl ClassifierModel {
    pub fn best_parameters(&self) -> (f64, f64) {
        (self.c, self.gamma)
    }

    /// The mean cross validation accuracy of the selected parameters.
    pub fn cv_score(&self) -> f64 {
        self.cv_score
    }

    pub fn features(&self) -> &FeatureSignature {
        &self.features
    }

    pub fn svc(&self) -> &KernelSvc {
        &self.svc
    }

    /// Fails if `signature` is not the feature space the model was trained in.
    pub fn check(&self, signature: &FeatureSignature) -> Result<(), AnalysisError> {
        if &self.features != signature {
            return Err(AnalysisError::schema_mismatch(PipelineStage::Classifier, self.features, signature))
        }
        Ok(())
    }

    pub fn predict(&self, features: &FeatureMatrix) -> Result<Vec<Label>, AnalysisError> {
        let raw = self.svc
            .predict(features.values())
            .map_err(|err| AnalysisError::from_svm(PipelineStage::Classifier, err))?;
        Ok(from_raw(&raw))
    }
}

/// The result of training.
#[derive(Debug, Clone)]
pub struct TrainOutcome {
    /// Predictions for the test partition.
    pub predictions: Vec<Label>,
    pub test_labels: Vec<Label>,
    pub test_indices: Vec<usize>,
    pub train_indices: Vec<usize>,
    /// Every grid point in search order.
    pub search: Vec<CandidateScore>,
    pub model: ClassifierModel,
}

/// Searches the grid on the train partition, refits the best candidate and predicts the test partition.
pub fn train(
    features: &FeatureMatrix,
    labels: &[Label],
    partition: &Partition,
    settings: &ClassifierSettings,
    signature: FeatureSignature,
) -> Result<TrainOutcome, AnalysisError> {
    if features.n_rows() != labels.len() {
        return Err(AnalysisError::configuration(
            PipelineStage::Classifier,
            format!("Got {} labels for {} documents.", labels.len(), features.n_rows()),
        ))
    }
    let train_features = features.select_rows(&partition.train);
    let train_labels = partition.train.iter().map(|i| labels[*i]).collect::<Vec<_>>();
    let test_features = features.select_rows(&partition.test);
    let test_labels = partition.test.iter().map(|i| labels[*i]).collect::<Vec<_>>();

    log::info!(
        "Searching {} candidates on {} training documents.",
        settings.grid.c_values.len() * settings.grid.gamma_values.len(),
        partition.train.len()
    );
    let result = settings.grid
        .fit(train_features.values(), &to_raw(&train_labels))
        .map_err(|err| AnalysisError::from_svm(PipelineStage::Classifier, err))?;
    let best = result.best().clone();
    log::info!("Best parameters: C={} gamma={}", best.c, best.gamma);

    let model = ClassifierModel {
        svc: result.model,
        c: best.c,
        gamma: best.gamma,
        cv_score: best.mean_score,
        features: signature,
    };
    let predictions = model.predict(&test_features)?;
    Ok(TrainOutcome {
        predictions,
        test_labels,
        test_indices: partition.test.clone(),
        train_indices: partition.train.clone(),
        search: result.candidates,
        model,
    })
}

/// The lifecycle of the classifier in one run. Fitting and loading exclude each other.
#[derive(Debug, Clone, Default)]
pub enum ClassifierState {
    #[default]
    Untrained,
    Trained(ClassifierModel),
    Loaded(ClassifierModel),
}

impl ClassifierState {
    pub fn model(&self) -> Option<&ClassifierModel> {
        match self {
            ClassifierState::Untrained => None,
            ClassifierState::Trained(model) | ClassifierState::Loaded(model) => Some(model),
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, ClassifierState::Loaded(_))
    }

    fn ensure_untrained(&self) -> Result<(), AnalysisError> {
        match self {
            ClassifierState::Untrained => Ok(()),
            ClassifierState::Trained(_) => Err(AnalysisError::configuration(
                PipelineStage::Classifier,
                "The classifier was already trained in this run.",
            )),
            ClassifierState::Loaded(_) => Err(AnalysisError::configuration(
                PipelineStage::Classifier,
                "A loaded classifier can not be fitted again.",
            )),
        }
    }

    /// Moves to [ClassifierState::Trained].
    pub fn fit(
        &mut self,
        features: &FeatureMatrix,
        labels: &[Label],
        partition: &Partition,
        settings: &ClassifierSettings,
        signature: FeatureSignature,
    ) -> Result<TrainOutcome, AnalysisError> {
        self.ensure_untrained()?;
        let outcome = train(features, labels, partition, settings, signature)?;
        *self = ClassifierState::Trained(outcome.model.clone());
        Ok(outcome)
    }

    /// Moves to [ClassifierState::Loaded].
    pub fn load(&mut self, model: ClassifierModel) -> Result<(), AnalysisError> {
        self.ensure_untrained()?;
        *self = ClassifierState::Loaded(model);
        Ok(())
    }

    pub fn predict(&self, features: &FeatureMatrix) -> Result<Vec<Label>, AnalysisError> {
        match self.model() {
            Some(model) => model.predict(features),
            None => Err(AnalysisError::configuration(
                PipelineStage::Classifier,
                "The classifier has neither been trained nor loaded.",
            )),
        }
    }
}
