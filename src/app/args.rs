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
use std::io::BufWriter;
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use crate::config::Configs;
use crate::report::Normalization;

#[derive(Parser, Debug, Default)]
#[command(author, version, about, long_about = None)]
/// Attributes short posts to one of two authors.
pub struct AttributionArgs {
    /// The mode of the analysis
    #[command(subcommand)]
    pub mode: Option<RunMode>,
}

#[derive(Subcommand, Debug)]
pub enum RunMode {
    /// Fits vocabulary, projection and classifier on a labelled corpus and evaluates it on a held out partition.
    TRAIN {
        /// A csv file with a `text` and a `label` column.
        corpus: Utf8PathBuf,
        /// The folder containing `attribution.{json,toml,yaml}`.
        #[arg(short, long)]
        config: Option<Utf8PathBuf>,
        /// Overrides the size of the vocabulary.
        #[arg(long)]
        max_words: Option<usize>,
        /// Do not add the affect counts to the features.
        #[arg(long)]
        no_sentiment: bool,
        /// Overrides the path of the affect lexicon.
        #[arg(long)]
        lexicon: Option<Utf8PathBuf>,
        /// Overrides the directory of the stored model.
        #[arg(short, long)]
        model_dir: Option<Utf8PathBuf>,
        /// The number of threads used by the grid search.
        #[arg(short, long)]
        threads: Option<usize>,
        /// Store vocabulary, projection and classifier in the model directory.
        #[arg(short, long)]
        save: bool,
        /// Normalize the printed confusion matrix by `rows` or `columns`.
        #[arg(long)]
        normalize: Option<Normalization>,
        /// Print the row and column sums of the confusion matrix.
        #[arg(long)]
        show_sum: bool,
        /// Write the classification report as json.
        #[arg(long)]
        report: Option<Utf8PathBuf>,
        /// Write the predictions for the test partition as csv.
        #[arg(long)]
        predictions: Option<Utf8PathBuf>,
        /// Write the biplot data of the first two components as csv.
        #[arg(long)]
        biplot: Option<Utf8PathBuf>,
        /// overrides the log level from the config.
        #[arg(long)]
        override_log_level: Option<log::LevelFilter>,
        /// Log to file
        #[arg(long)]
        log_to_file: bool,
    },
    /// Applies a stored model to a corpus.
    PREDICT {
        /// A csv file with a `text` and an optional `label` column.
        corpus: Utf8PathBuf,
        /// The folder containing `attribution.{json,toml,yaml}`.
        #[arg(short, long)]
        config: Option<Utf8PathBuf>,
        /// Overrides the directory of the stored model.
        #[arg(short, long)]
        model_dir: Option<Utf8PathBuf>,
        /// Do not compute affect counts, fails if the stored classifier needs them.
        #[arg(long)]
        no_sentiment: bool,
        /// Overrides the path of the affect lexicon.
        #[arg(long)]
        lexicon: Option<Utf8PathBuf>,
        /// Where to write the predictions, stdout if not set.
        #[arg(short, long)]
        output: Option<Utf8PathBuf>,
        /// Write the classification report as json, needs labels.
        #[arg(long)]
        report: Option<Utf8PathBuf>,
        /// overrides the log level from the config.
        #[arg(long)]
        override_log_level: Option<log::LevelFilter>,
        /// Log to file
        #[arg(long)]
        log_to_file: bool,
    },
    /// Writes the default config to `attribution.json` in the folder.
    INIT {
        #[arg(default_value = ".")]
        folder: Utf8PathBuf,
    },
}

/// The outputs of a train run.
#[derive(Debug, Clone, Default)]
pub struct TrainJob {
    pub corpus: Utf8PathBuf,
    pub save: bool,
    pub normalize: Option<Normalization>,
    pub show_sum: bool,
    pub report: Option<Utf8PathBuf>,
    pub predictions: Option<Utf8PathBuf>,
    pub biplot: Option<Utf8PathBuf>,
}

/// The outputs of a predict run.
#[derive(Debug, Clone, Default)]
pub struct PredictJob {
    pub corpus: Utf8PathBuf,
    pub output: Option<Utf8PathBuf>,
    pub report: Option<Utf8PathBuf>,
}

#[derive(Debug)]
pub enum ConsumedArgs {
    Train(TrainJob, Configs),
    Predict(PredictJob, Configs),
    Nothing,
}

fn load_configs(folder: Option<Utf8PathBuf>) -> Result<Configs, config::ConfigError> {
    match folder {
        None => Configs::discover_or_default(),
        Some(path) => Configs::load_from(path),
    }
}

/// Consumes the args and returns everything necessary to execute the analysis
pub fn consume_args(args: AttributionArgs) -> Result<ConsumedArgs, config::ConfigError> {
    let Some(mode) = args.mode else {
        println!("Nothing to do, see --help.");
        return Ok(ConsumedArgs::Nothing)
    };
    match mode {
        RunMode::TRAIN {
            corpus,
            config,
            max_words,
            no_sentiment,
            lexicon,
            model_dir,
            threads,
            save,
            normalize,
            show_sum,
            report,
            predictions,
            biplot,
            override_log_level,
            log_to_file,
        } => {
            let mut configs = load_configs(config)?;
            if let Some(max_words) = max_words {
                configs.analyzer.max_words = max_words;
            }
            if no_sentiment {
                configs.analyzer.use_sentiment = false;
            }
            if let Some(lexicon) = lexicon {
                configs.analyzer.lexicon.path = lexicon;
            }
            if let Some(model_dir) = model_dir {
                configs.analyzer.model_dir = model_dir;
            }
            if threads.is_some() {
                configs.analyzer.classifier.grid.threads = threads;
            }
            if let Some(log_level) = override_log_level {
                configs.system.log_level = log_level;
            }
            configs.system.log_to_file |= log_to_file;

            let job = TrainJob { corpus, save, normalize, show_sum, report, predictions, biplot };
            Ok(ConsumedArgs::Train(job, configs))
        }
        RunMode::PREDICT {
            corpus,
            config,
            model_dir,
            no_sentiment,
            lexicon,
            output,
            report,
            override_log_level,
            log_to_file,
        } => {
            let mut configs = load_configs(config)?;
            if no_sentiment {
                configs.analyzer.use_sentiment = false;
            }
            if let Some(lexicon) = lexicon {
                configs.analyzer.lexicon.path = lexicon;
            }
            if let Some(model_dir) = model_dir {
                configs.analyzer.model_dir = model_dir;
            }
            if let Some(log_level) = override_log_level {
                configs.system.log_level = log_level;
            }
            configs.system.log_to_file |= log_to_file;
            configs.analyzer.load = crate::config::LoadConfig::all();

            Ok(ConsumedArgs::Predict(PredictJob { corpus, output, report }, configs))
        }
        RunMode::INIT { folder } => {
            println!("Start creating the default config.");
            let path = folder.join("attribution.json");
            if path.exists() {
                println!("The default config already exists in {path}.\nDelete it before regenerating.")
            } else {
                let written = std::fs::create_dir_all(&folder)
                    .and_then(|_| File::options().create(true).write(true).open(&path))
                    .map_err(|err| err.to_string())
                    .and_then(|file| {
                        serde_json::to_writer_pretty(BufWriter::new(file), &Configs::default())
                            .map_err(|err| err.to_string())
                    });
                match written {
                    Ok(_) => println!("Created the default config at {path}."),
                    Err(err) => println!("Failed to create the example file: {err}"),
                }
            }
            Ok(ConsumedArgs::Nothing)
        }
    }
}

#[cfg(test)]
mod test {
    use clap::Parser;
    use crate::report::Normalization;
    use super::{consume_args, AttributionArgs, ConsumedArgs};

    #[test]
    fn train_overrides_the_config(){
        let dir = camino_tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("attribution.json"), "{}").unwrap();
        let args = AttributionArgs::try_parse_from([
            "attribution", "train", "tweets.csv",
            "--config", dir.path().as_str(),
            "--max-words", "20",
            "--no-sentiment",
            "--normalize", "rows",
            "--threads", "2",
        ]).unwrap();
        match consume_args(args).unwrap() {
            ConsumedArgs::Train(job, configs) => {
                assert_eq!("tweets.csv", job.corpus.as_str());
                assert_eq!(Some(Normalization::Rows), job.normalize);
                assert!(!job.save);
                assert_eq!(20, configs.analyzer.max_words);
                assert!(!configs.analyzer.use_sentiment);
                assert_eq!(Some(2), configs.analyzer.classifier.grid.threads);
            }
            other => panic!("Expected a train job but got {other:?}"),
        }
    }

    #[test]
    fn predict_loads_every_artifact(){
        let dir = camino_tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("attribution.json"), "{}").unwrap();
        let args = AttributionArgs::try_parse_from([
            "attribution", "predict", "new.csv", "--config", dir.path().as_str(), "-o", "out.csv", "--no-sentiment",
        ]).unwrap();
        match consume_args(args).unwrap() {
            ConsumedArgs::Predict(job, configs) => {
                assert_eq!(Some("out.csv"), job.output.as_ref().map(|p| p.as_str()));
                assert!(!configs.analyzer.use_sentiment);
                assert!(configs.analyzer.load.classifier);
                assert!(configs.analyzer.load.projection);
            }
            other => panic!("Expected a predict job but got {other:?}"),
        }
    }

    #[test]
    fn init_writes_the_default_config(){
        let dir = camino_tempfile::tempdir().unwrap();
        let args = AttributionArgs::try_parse_from(["attribution", "init", dir.path().as_str()]).unwrap();
        assert!(matches!(consume_args(args).unwrap(), ConsumedArgs::Nothing));
        assert!(dir.path().join("attribution.json").exists());
    }
}
