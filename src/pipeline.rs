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


//! The orchestrator owning the order of the stages. Every stage produces an
//! immutable value that is handed to the next one.

use serde::de::DeserializeOwned;
use serde::Serialize;
use text_processing::{AffectLexicon, AffectMatrix, DocumentTermMatrix, Tokenizer, Vocabulary, VocabularySignature};
use crate::artifacts::{decode, Artifact, encode, ArtifactKind, ArtifactStore, CLASSIFIER_KEY, PROJECTION_KEY, VOCABULARY_KEY};
use crate::classifier::{ClassifierModel, ClassifierState, Partition, TrainOutcome};
use crate::config::AnalyzerConfig;
use crate::corpus::Corpus;
use crate::error::{AnalysisError, PipelineStage};
use crate::features::{FeatureMatrix, FeatureSignature};
use crate::labels::Label;
use crate::projection::{ComponentScores, Projection, ProjectionScope};

/// The values produced by the feature stages of one run.
#[derive(Debug, Clone)]
pub struct Stages {
    pub vocabulary: Vocabulary,
    pub dtm: DocumentTermMatrix,
    pub projection: Projection,
    pub scores: ComponentScores,
    pub affect: Option<AffectMatrix>,
    pub features: FeatureMatrix,
}

impl Stages {
    pub fn signature(&self) -> FeatureSignature {
        FeatureSignature::new(&self.projection, self.affect.is_some())
    }
}

/// The result of [Analyzer::create_full_model].
#[derive(Debug, Clone)]
pub struct TrainRun {
    pub stages: Stages,
    pub outcome: TrainOutcome,
}

/// The result of [Analyzer::load_full_model].
#[derive(Debug, Clone)]
pub struct PredictRun {
    pub stages: Stages,
    /// One prediction for every document of the corpus.
    pub predictions: Vec<Label>,
}

/// Runs the analysis against an [ArtifactStore].
#[derive(Debug)]
pub struct Analyzer<S> {
    config: AnalyzerConfig,
    tokenizer: Tokenizer,
    store: S,
    lexicon: Option<AffectLexicon>,
    classifier: ClassifierState,
}

impl<S: ArtifactStore> Analyzer<S> {
    pub fn new(config: AnalyzerConfig, store: S) -> Result<Self, AnalysisError> {
        config.validate()?;
        let tokenizer = Tokenizer::from_config(&config.tokenizer)
            .map_err(|err| AnalysisError::from_text_processing(PipelineStage::Tokenizer, err))?;
        Ok(Self {
            config,
            tokenizer,
            store,
            lexicon: None,
            classifier: ClassifierState::default(),
        })
    }

    /// Uses `lexicon` instead of reading the configured lexicon file.
    pub fn with_lexicon(mut self, lexicon: AffectLexicon) -> Self {
        self.lexicon = Some(lexicon);
        self
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn classifier(&self) -> &ClassifierState {
        &self.classifier
    }

    /// Fits every stage on a labelled corpus and evaluates the classifier on the held out partition.
    pub fn create_full_model(&mut self, corpus: &Corpus) -> Result<TrainRun, AnalysisError> {
        if self.config.load.vocabulary || self.config.load.classifier {
            return Err(AnalysisError::configuration(
                PipelineStage::Setup,
                "Training builds its own vocabulary and classifier, only load.projection may be set.",
            ))
        }
        let Some(labels) = corpus.labels() else {
            return Err(AnalysisError::configuration(
                PipelineStage::Corpus,
                "Training needs a labelled corpus.",
            ))
        };

        let vocabulary = self.build_vocabulary(corpus)?;
        let dtm = self.create_dtm(corpus, &vocabulary);

        let (projection, partition) = match (self.config.load.projection, self.config.projection_scope) {
            (true, _) => (self.load_projection(&vocabulary)?, None),
            (false, ProjectionScope::FullCorpus) => (self.fit_projection(&dtm)?, None),
            (false, ProjectionScope::TrainPartition) => {
                let partition = Partition::split(labels, &self.config.classifier)?;
                let projection = self.fit_projection(&dtm.select_rows(&partition.train))?;
                (projection, Some(partition))
            }
        };
        let scores = projection.transform(&dtm)?;
        let affect = self.affect_counts(corpus)?;
        let features = FeatureMatrix::assemble(&scores, affect.as_ref())?;

        let stages = Stages { vocabulary, dtm, projection, scores, affect, features };
        let partition = match partition {
            Some(partition) => partition,
            None => Partition::split(labels, &self.config.classifier)?,
        };

        log::info!("Running Support Vector Machine Classifier...");
        let outcome = self.classifier.fit(
            &stages.features,
            labels,
            &partition,
            &self.config.classifier,
            stages.signature(),
        )?;
        Ok(TrainRun { stages, outcome })
    }

    /// Applies the stored vocabulary, projection and classifier to `corpus`.
    /// The stored classifier decides whether affect counts are computed. Disabling them
    /// for a classifier trained with them is a schema mismatch.
    pub fn load_full_model(&mut self, corpus: &Corpus) -> Result<PredictRun, AnalysisError> {
        let vocabulary = self.load_vocabulary()?;
        let dtm = self.create_dtm(corpus, &vocabulary);
        let projection = self.load_projection(&vocabulary)?;
        let scores = projection.transform(&dtm)?;
        let model = self.read_classifier()?;
        let affect = match (model.features().affect, self.config.use_sentiment) {
            (true, true) => self.affect_counts(corpus)?,
            (true, false) => {
                return Err(AnalysisError::schema_mismatch(
                    PipelineStage::Classifier,
                    model.features(),
                    FeatureSignature::new(&projection, false),
                ))
            }
            (false, use_sentiment) => {
                if use_sentiment {
                    log::info!("The stored classifier was trained without affect counts, skipping them.");
                }
                None
            }
        };
        let features = FeatureMatrix::assemble(&scores, affect.as_ref())?;
        let stages = Stages { vocabulary, dtm, projection, scores, affect, features };

        self.install_classifier(model, &stages.signature())?;
        let predictions = self.classifier.predict(&stages.features)?;
        Ok(PredictRun { stages, predictions })
    }

    /// Stores the vocabulary, the projection and the classifier of a training run.
    pub fn save_model(&self, run: &TrainRun) -> Result<(), AnalysisError> {
        self.save_vocabulary(&run.stages.vocabulary)?;
        self.save_projection(&run.stages.projection)?;
        self.save_classifier(&run.outcome.model)
    }

    pub fn build_vocabulary(&self, corpus: &Corpus) -> Result<Vocabulary, AnalysisError> {
        log::info!("Getting top {} words...", self.config.max_words);
        Vocabulary::build(corpus.documents(), &self.tokenizer, self.config.max_words)
            .map_err(|err| AnalysisError::from_text_processing(PipelineStage::Vocabulary, err))
    }

    pub fn create_dtm(&self, corpus: &Corpus, vocabulary: &Vocabulary) -> DocumentTermMatrix {
        log::info!("Creating document term matrix...");
        DocumentTermMatrix::build(corpus.documents(), vocabulary, &self.tokenizer)
    }

    pub fn fit_projection(&self, dtm: &DocumentTermMatrix) -> Result<Projection, AnalysisError> {
        log::info!("Running Principal Component Analysis on {} documents...", dtm.n_documents());
        Projection::fit(dtm, self.config.variance_threshold)
    }

    /// `None` if affect counts are disabled.
    pub fn affect_counts(&mut self, corpus: &Corpus) -> Result<Option<AffectMatrix>, AnalysisError> {
        if !self.config.use_sentiment {
            return Ok(None)
        }
        log::info!("Running Sentiment Analysis...");
        let lexicon = match self.lexicon.take() {
            Some(lexicon) => lexicon,
            None => AffectLexicon::load(&self.config.lexicon.path, &self.config.lexicon.format)
                .map_err(|err| AnalysisError::from_text_processing(PipelineStage::Affect, err))?,
        };
        let affect = AffectMatrix::build(corpus.documents(), &lexicon, &self.tokenizer);
        self.lexicon = Some(lexicon);
        Ok(Some(affect))
    }

    pub fn save_vocabulary(&self, vocabulary: &Vocabulary) -> Result<(), AnalysisError> {
        let payload = vocabulary.iter().map(|(term, count)| (term.to_string(), count)).collect::<Vec<_>>();
        self.store_artifact(
            PipelineStage::Vocabulary,
            VOCABULARY_KEY,
            ArtifactKind::Vocabulary,
            vocabulary.signature(),
            &payload,
        )
    }

    pub fn load_vocabulary(&self) -> Result<Vocabulary, AnalysisError> {
        log::info!("Loading {VOCABULARY_KEY}");
        let artifact = self.load_artifact::<Vec<(String, u64)>>(PipelineStage::Vocabulary, VOCABULARY_KEY, ArtifactKind::Vocabulary)?;
        let vocabulary = Vocabulary::from_ranked(artifact.payload);
        if vocabulary.signature() != artifact.vocabulary {
            return Err(AnalysisError::schema_mismatch(
                PipelineStage::Vocabulary,
                artifact.vocabulary,
                vocabulary.signature(),
            ))
        }
        Ok(vocabulary)
    }

    pub fn save_projection(&self, projection: &Projection) -> Result<(), AnalysisError> {
        self.store_artifact(
            PipelineStage::Projection,
            PROJECTION_KEY,
            ArtifactKind::Projection,
            projection.vocabulary(),
            projection,
        )
    }

    /// The stored projection has to be fitted on `vocabulary`.
    pub fn load_projection(&self, vocabulary: &Vocabulary) -> Result<Projection, AnalysisError> {
        log::info!("Loading {PROJECTION_KEY}");
        let artifact = self.load_artifact::<Projection>(PipelineStage::Projection, PROJECTION_KEY, ArtifactKind::Projection)?;
        let expected = vocabulary.signature();
        if artifact.vocabulary != expected || artifact.payload.vocabulary() != expected {
            return Err(AnalysisError::schema_mismatch(PipelineStage::Projection, expected, artifact.vocabulary))
        }
        Ok(artifact.payload)
    }

    pub fn save_classifier(&self, model: &ClassifierModel) -> Result<(), AnalysisError> {
        self.store_artifact(
            PipelineStage::Classifier,
            CLASSIFIER_KEY,
            ArtifactKind::Classifier,
            model.features().vocabulary,
            model,
        )
    }

    /// Loads the stored classifier into this run, it has to expect `signature`.
    pub fn load_classifier(&mut self, signature: &FeatureSignature) -> Result<&ClassifierModel, AnalysisError> {
        let model = self.read_classifier()?;
        self.install_classifier(model, signature)
    }

    fn read_classifier(&self) -> Result<ClassifierModel, AnalysisError> {
        log::info!("Loading {CLASSIFIER_KEY}");
        let artifact = self.load_artifact::<ClassifierModel>(PipelineStage::Classifier, CLASSIFIER_KEY, ArtifactKind::Classifier)?;
        if artifact.vocabulary != artifact.payload.features().vocabulary {
            return Err(AnalysisError::schema_mismatch(
                PipelineStage::Classifier,
                artifact.vocabulary,
                artifact.payload.features().vocabulary,
            ))
        }
        Ok(artifact.payload)
    }

    fn install_classifier(&mut self, model: ClassifierModel, signature: &FeatureSignature) -> Result<&ClassifierModel, AnalysisError> {
        model.check(signature)?;
        let (c, gamma) = model.best_parameters();
        log::info!("Loaded classifier with C={c} gamma={gamma}");
        self.classifier.load(model)?;
        self.classifier.model().ok_or_else(|| {
            AnalysisError::configuration(PipelineStage::Classifier, "The classifier was not loaded.")
        })
    }

    fn store_artifact<T: Serialize>(
        &self,
        stage: PipelineStage,
        key: &str,
        kind: ArtifactKind,
        signature: VocabularySignature,
        payload: &T,
    ) -> Result<(), AnalysisError> {
        let bytes = encode(kind, signature, payload).map_err(|err| AnalysisError::resource(stage, err))?;
        self.store.save(key, &bytes).map_err(|err| AnalysisError::resource(stage, err))
    }

    fn load_artifact<T: DeserializeOwned>(
        &self,
        stage: PipelineStage,
        key: &str,
        kind: ArtifactKind,
    ) -> Result<Artifact<T>, AnalysisError> {
        let bytes = self.store.load(key).map_err(|err| AnalysisError::resource(stage, err))?;
        decode(key, &bytes, kind).map_err(|err| AnalysisError::resource(stage, err))
    }
}

#[cfg(test)]
mod test {
    use text_processing::AffectLexicon;
    use crate::artifacts::MemoryArtifactStore;
    use crate::config::{AnalyzerConfig, LoadConfig};
    use crate::corpus::Corpus;
    use crate::error::{AnalysisError, PipelineStage};
    use crate::labels::Label;
    use super::Analyzer;

    fn config() -> AnalyzerConfig {
        let mut config = AnalyzerConfig::default();
        config.use_sentiment = false;
        config
    }

    #[test]
    fn two_documents_fail_at_the_classifier(){
        let corpus = Corpus::new(
            vec!["I love freedom".to_string(), "Jobs jobs jobs".to_string()],
            Some(vec![Label::NEGATIVE, Label::POSITIVE]),
        ).unwrap();
        let mut analyzer = Analyzer::new(config(), MemoryArtifactStore::new()).unwrap();

        let vocabulary = analyzer.build_vocabulary(&corpus).unwrap();
        let dtm = analyzer.create_dtm(&corpus, &vocabulary);
        assert_eq!((2, vocabulary.len()), dtm.counts().dim());
        analyzer.fit_projection(&dtm).unwrap();

        match analyzer.create_full_model(&corpus) {
            Err(AnalysisError::Configuration { stage, message }) => {
                assert_eq!(PipelineStage::Classifier, stage);
                assert!(message.contains("too few"));
            }
            other => panic!("Expected a configuration error but got {other:?}"),
        }
    }

    #[test]
    fn training_needs_labels(){
        let corpus = Corpus::unlabelled(vec!["a wall".to_string(), "a job".to_string()]).unwrap();
        let mut analyzer = Analyzer::new(config(), MemoryArtifactStore::new()).unwrap();
        let result = analyzer.create_full_model(&corpus);
        assert!(matches!(result, Err(AnalysisError::Configuration { stage: PipelineStage::Corpus, .. })));
    }

    #[test]
    fn missing_artifacts_are_resource_errors(){
        let corpus = Corpus::unlabelled(vec!["a wall".to_string()]).unwrap();
        let mut cfg = config();
        cfg.load = LoadConfig::all();
        let mut analyzer = Analyzer::new(cfg, MemoryArtifactStore::new()).unwrap();
        let result = analyzer.load_full_model(&corpus);
        assert!(matches!(result, Err(AnalysisError::Resource { stage: PipelineStage::Vocabulary, .. })));
    }

    #[test]
    fn injected_lexicon_is_used(){
        let corpus = Corpus::unlabelled(vec!["so happy today".to_string(), "sad and happy".to_string()]).unwrap();
        let mut cfg = config();
        cfg.use_sentiment = true;
        cfg.lexicon.path = "does/not/exist.txt".into();
        let lexicon = AffectLexicon::from_entries([("happy", text_processing::AffectCategory::Joy)]);
        let mut analyzer = Analyzer::new(cfg, MemoryArtifactStore::new()).unwrap().with_lexicon(lexicon);
        let affect = analyzer.affect_counts(&corpus).unwrap().unwrap();
        assert_eq!(2, affect.n_documents());
        // second call reuses the lexicon
        assert!(analyzer.affect_counts(&corpus).unwrap().is_some());
    }

    #[test]
    fn missing_lexicon_file_is_a_resource_error(){
        let corpus = Corpus::unlabelled(vec!["so happy today".to_string()]).unwrap();
        let mut cfg = config();
        cfg.use_sentiment = true;
        cfg.lexicon.path = "does/not/exist.txt".into();
        let mut analyzer = Analyzer::new(cfg, MemoryArtifactStore::new()).unwrap();
        let result = analyzer.affect_counts(&corpus);
        assert!(matches!(result, Err(AnalysisError::Resource { stage: PipelineStage::Affect, .. })));
    }
}
