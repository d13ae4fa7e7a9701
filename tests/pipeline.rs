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


use attribution::artifacts::{ArtifactStore, FileArtifactStore, MemoryArtifactStore, CLASSIFIER_KEY, PROJECTION_KEY, VOCABULARY_KEY};
use attribution::config::{AnalyzerConfig, LoadConfig};
use attribution::corpus::Corpus;
use attribution::labels::Label;
use attribution::projection::ProjectionScope;
use attribution::report::ClassificationReport;
use attribution::{AnalysisError, Analyzer, PipelineStage};
use rand::prelude::*;
use text_processing::{AffectCategory, AffectLexicon, Vocabulary};

const FIRST_AUTHOR: &[&str] = &[
    "economy", "taxes", "wall", "border", "jobs", "china", "deal", "winning", "strong", "military",
];
const SECOND_AUTHOR: &[&str] = &[
    "healthcare", "women", "children", "education", "climate", "equality", "rights", "together", "future", "families",
];

/// 40 posts of two authors with disjoint word pools.
fn two_author_corpus(seed: u64) -> Corpus {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut documents = Vec::new();
    let mut labels = Vec::new();
    for i in 0..40 {
        let (pool, label) = if i % 2 == 0 {
            (FIRST_AUTHOR, Label::NEGATIVE)
        } else {
            (SECOND_AUTHOR, Label::POSITIVE)
        };
        let words = (0..6).map(|_| *pool.choose(&mut rng).unwrap()).collect::<Vec<_>>();
        documents.push(format!("{}! https://t.co", words.join(" ")));
        labels.push(label);
    }
    Corpus::new(documents, Some(labels)).unwrap()
}

fn lexicon() -> AffectLexicon {
    AffectLexicon::from_entries([
        ("strong", AffectCategory::Positive),
        ("winning", AffectCategory::Joy),
        ("together", AffectCategory::Trust),
        ("future", AffectCategory::Anticipation),
        ("border", AffectCategory::Fear),
    ])
}

fn config(use_sentiment: bool) -> AnalyzerConfig {
    let mut config = AnalyzerConfig::default();
    config.use_sentiment = use_sentiment;
    config.classifier.grid.threads = Some(2);
    config
}

#[test]
fn separates_two_authors(){
    let corpus = two_author_corpus(7);
    let store = MemoryArtifactStore::new();
    let mut analyzer = Analyzer::new(config(false), &store).unwrap();
    let run = analyzer.create_full_model(&corpus).unwrap();

    assert_eq!(20, run.stages.vocabulary.len());
    assert_eq!((40, 20), run.stages.dtm.counts().dim());
    assert!(run.stages.affect.is_none());
    assert_eq!(run.stages.projection.n_components(), run.stages.features.n_features());
    assert_eq!(8, run.outcome.test_indices.len());
    assert_eq!(25, run.outcome.search.len());

    let report = ClassificationReport::new(
        &run.outcome.test_labels,
        &run.outcome.predictions,
        &analyzer.config().label_names,
    ).unwrap();
    assert!(report.accuracy >= 0.75, "accuracy was {}", report.accuracy);
    // nothing is stored without asking
    assert!(store.keys().is_empty());
}

#[test]
fn affect_counts_extend_the_features(){
    let corpus = two_author_corpus(11);
    let mut analyzer = Analyzer::new(config(true), MemoryArtifactStore::new())
        .unwrap()
        .with_lexicon(lexicon());
    let run = analyzer.create_full_model(&corpus).unwrap();
    let affect = run.stages.affect.as_ref().unwrap();
    assert_eq!(40, affect.n_documents());
    assert_eq!(run.stages.projection.n_components() + 10, run.stages.features.n_features());
    assert_eq!("positive", run.stages.features.columns()[run.stages.projection.n_components()]);
    assert!(run.outcome.model.features().affect);
}

#[test]
fn stored_model_reproduces_the_predictions(){
    let corpus = two_author_corpus(3);
    let store = MemoryArtifactStore::new();
    let mut trainer = Analyzer::new(config(true), &store).unwrap().with_lexicon(lexicon());
    let run = trainer.create_full_model(&corpus).unwrap();
    trainer.save_model(&run).unwrap();
    assert_eq!(vec![PROJECTION_KEY, CLASSIFIER_KEY, VOCABULARY_KEY], store.keys());

    let before = [VOCABULARY_KEY, PROJECTION_KEY, CLASSIFIER_KEY].map(|key| store.load(key).unwrap());

    let mut cfg = config(true);
    cfg.load = LoadConfig::all();
    let mut first = Analyzer::new(cfg.clone(), &store).unwrap().with_lexicon(lexicon());
    let loaded = first.load_full_model(&corpus).unwrap();
    assert!(first.classifier().is_loaded());
    assert_eq!(corpus.len(), loaded.predictions.len());
    assert_eq!(run.stages.vocabulary, loaded.stages.vocabulary);

    let on_test_rows = run.outcome.test_indices.iter().map(|i| loaded.predictions[*i]).collect::<Vec<_>>();
    assert_eq!(run.outcome.predictions, on_test_rows);

    let mut second = Analyzer::new(cfg, &store).unwrap().with_lexicon(lexicon());
    let again = second.load_full_model(&corpus).unwrap();
    assert_eq!(loaded.predictions, again.predictions);

    let after = [VOCABULARY_KEY, PROJECTION_KEY, CLASSIFIER_KEY].map(|key| store.load(key).unwrap());
    assert_eq!(before, after);
}

#[test]
fn file_store_keeps_the_model_on_disk(){
    let dir = camino_tempfile::tempdir().unwrap();
    let store = FileArtifactStore::new(dir.path().join("model"));
    let corpus = two_author_corpus(5);
    let mut trainer = Analyzer::new(config(false), &store).unwrap();
    let run = trainer.create_full_model(&corpus).unwrap();
    trainer.save_model(&run).unwrap();
    for key in [VOCABULARY_KEY, PROJECTION_KEY, CLASSIFIER_KEY] {
        assert!(dir.path().join("model").join(key).exists());
    }

    let unseen = Corpus::unlabelled(vec![
        "taxes and the border wall".to_string(),
        "education for our children".to_string(),
        "completely unrelated words".to_string(),
    ]).unwrap();
    let mut cfg = config(false);
    cfg.load = LoadConfig::all();
    let mut predictor = Analyzer::new(cfg, &store).unwrap();
    let predictions = predictor.load_full_model(&unseen).unwrap().predictions;
    assert_eq!(3, predictions.len());
}

#[test]
fn projection_of_another_vocabulary_is_rejected(){
    let corpus = two_author_corpus(1);
    let store = MemoryArtifactStore::new();
    let mut trainer = Analyzer::new(config(false), &store).unwrap();
    let run = trainer.create_full_model(&corpus).unwrap();
    trainer.save_model(&run).unwrap();

    let other = Vocabulary::from_ranked([("wall", 3), ("job", 2)]);
    match trainer.load_projection(&other) {
        Err(AnalysisError::SchemaMismatch { stage, .. }) => assert_eq!(PipelineStage::Projection, stage),
        other => panic!("Expected a schema mismatch but got {other:?}"),
    }
}

#[test]
fn classifier_without_affect_needs_no_lexicon(){
    let corpus = two_author_corpus(2);
    let store = MemoryArtifactStore::new();
    let mut trainer = Analyzer::new(config(false), &store).unwrap();
    let run = trainer.create_full_model(&corpus).unwrap();
    trainer.save_model(&run).unwrap();

    // Affect counts stay enabled and the lexicon file does not exist.
    let mut cfg = config(true);
    cfg.load = LoadConfig::all();
    cfg.lexicon.path = "does/not/exist.txt".into();
    let mut predictor = Analyzer::new(cfg, &store).unwrap();
    let loaded = predictor.load_full_model(&corpus).unwrap();
    assert!(loaded.stages.affect.is_none());
    assert_eq!(run.stages.features.n_features(), loaded.stages.features.n_features());
    let expected = run.outcome.test_indices.iter().map(|i| loaded.predictions[*i]).collect::<Vec<_>>();
    assert_eq!(run.outcome.predictions, expected);
}

#[test]
fn classifier_with_affect_is_rejected_without_affect(){
    let corpus = two_author_corpus(2);
    let store = MemoryArtifactStore::new();
    let mut trainer = Analyzer::new(config(true), &store).unwrap().with_lexicon(lexicon());
    let run = trainer.create_full_model(&corpus).unwrap();
    trainer.save_model(&run).unwrap();

    let mut cfg = config(false);
    cfg.load = LoadConfig::all();
    let mut predictor = Analyzer::new(cfg, &store).unwrap();
    match predictor.load_full_model(&corpus) {
        Err(AnalysisError::SchemaMismatch { stage, .. }) => assert_eq!(PipelineStage::Classifier, stage),
        other => panic!("Expected a schema mismatch but got {other:?}"),
    }
}

#[test]
fn projection_can_be_fitted_on_the_training_rows_only(){
    let corpus = two_author_corpus(9);
    let mut cfg = config(false);
    cfg.projection_scope = ProjectionScope::TrainPartition;
    let mut analyzer = Analyzer::new(cfg, MemoryArtifactStore::new()).unwrap();
    let run = analyzer.create_full_model(&corpus).unwrap();
    assert_eq!(40, run.stages.scores.n_documents());
    assert_eq!(32, run.outcome.train_indices.len());

    let mut full = Analyzer::new(config(false), MemoryArtifactStore::new()).unwrap();
    let full_run = full.create_full_model(&corpus).unwrap();
    assert_eq!(run.outcome.test_indices, full_run.outcome.test_indices);
}

#[test]
fn two_documents_are_too_few(){
    let corpus = Corpus::new(
        vec!["I love freedom and jobs".to_string(), "Stronger together for families".to_string()],
        Some(vec![Label::NEGATIVE, Label::POSITIVE]),
    ).unwrap();
    let mut analyzer = Analyzer::new(config(false), MemoryArtifactStore::new()).unwrap();
    match analyzer.create_full_model(&corpus) {
        Err(AnalysisError::Configuration { stage, message }) => {
            assert_eq!(PipelineStage::Classifier, stage);
            assert!(message.contains("too few"), "{message}");
        }
        other => panic!("Expected a configuration error but got {other:?}"),
    }
}
