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


use std::fs::File;
use std::io::{BufWriter, Write};
use camino::Utf8Path;
use crate::app::args::{PredictJob, TrainJob};
use crate::artifacts::FileArtifactStore;
use crate::biplot::Biplot;
use crate::config::Configs;
use crate::corpus::{write_predictions, Corpus};
use crate::error::{AnalysisError, PipelineStage};
use crate::pipeline::Analyzer;
use crate::report::ClassificationReport;

/// The largest loading that is not drawn as an arrow.
const MAX_ARROW: f64 = 0.2;

fn create(path: &Utf8Path) -> Result<BufWriter<File>, AnalysisError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|err| AnalysisError::resource(PipelineStage::Report, err))?;
    }
    File::create(path)
        .map(BufWriter::new)
        .map_err(|err| AnalysisError::resource(PipelineStage::Report, err))
}

fn write_report(path: &Utf8Path, report: &ClassificationReport) -> Result<(), AnalysisError> {
    let mut out = create(path)?;
    serde_json::to_writer_pretty(&mut out, report).map_err(|err| AnalysisError::resource(PipelineStage::Report, err))?;
    out.flush().map_err(|err| AnalysisError::resource(PipelineStage::Report, err))
}

/// Trains and evaluates, prints the confusion matrix and the report.
pub fn train(job: TrainJob, configs: &Configs) -> Result<(), AnalysisError> {
    let cfg = &configs.analyzer;
    let corpus = Corpus::read_csv(&job.corpus, &cfg.label_names)?;
    let store = FileArtifactStore::new(cfg.model_dir.clone());
    let mut analyzer = Analyzer::new(cfg.clone(), store)?;
    let run = analyzer.create_full_model(&corpus)?;
    let outcome = &run.outcome;

    let report = ClassificationReport::new(&outcome.test_labels, &outcome.predictions, &cfg.label_names)?;
    println!("{}", report.confusion_matrix.pretty(&cfg.label_names, job.normalize, job.show_sum));
    println!("{report}");

    if job.save {
        analyzer.save_model(&run)?;
    }
    if let Some(path) = &job.report {
        write_report(path, &report)?;
    }
    if let Some(path) = &job.predictions {
        write_predictions(create(path)?, &corpus, &outcome.test_indices, &outcome.predictions, &cfg.label_names)?;
    }
    if let Some(path) = &job.biplot {
        let biplot = Biplot::compute(&run.stages.scores, &run.stages.projection, corpus.labels(), 0, 1, MAX_ARROW)?;
        biplot.write_csv(create(path)?, &cfg.label_names)?;
    }
    Ok(())
}

/// Predicts every document with the stored model.
pub fn predict(job: PredictJob, configs: &Configs) -> Result<(), AnalysisError> {
    let cfg = &configs.analyzer;
    let corpus = Corpus::read_csv(&job.corpus, &cfg.label_names)?;
    let store = FileArtifactStore::new(cfg.model_dir.clone());
    let mut analyzer = Analyzer::new(cfg.clone(), store)?;
    let run = analyzer.load_full_model(&corpus)?;
    let rows = (0..corpus.len()).collect::<Vec<_>>();

    match &job.output {
        Some(path) => write_predictions(create(path)?, &corpus, &rows, &run.predictions, &cfg.label_names)?,
        None => write_predictions(std::io::stdout().lock(), &corpus, &rows, &run.predictions, &cfg.label_names)?,
    }

    match (corpus.labels(), &job.report) {
        (Some(labels), report_path) => {
            let report = ClassificationReport::new(labels, &run.predictions, &cfg.label_names)?;
            log::info!("Accuracy on the labelled corpus: {:.3}", report.accuracy);
            if let Some(path) = report_path {
                write_report(path, &report)?;
            }
        }
        (None, Some(_)) => {
            return Err(AnalysisError::configuration(
                PipelineStage::Report,
                "A report needs a labelled corpus.",
            ))
        }
        (None, None) => {}
    }
    Ok(())
}
