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
use std::io::{BufReader, Read, Write};
use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use crate::error::{AnalysisError, PipelineStage};
use crate::labels::{Label, LabelNames};

/// The documents of one run and, if known, their labels.
#[derive(Debug, Clone, PartialEq)]
pub struct Corpus {
    documents: Vec<String>,
    labels: Option<Vec<Label>>,
}

/// A row of a corpus csv.
#[derive(Debug, Deserialize)]
struct CorpusRecord {
    text: String,
    #[serde(default)]
    label: Option<String>,
}

/// A row of the predictions csv.
#[derive(Debug, Serialize)]
struct PredictionRecord<'a> {
    index: usize,
    text: &'a str,
    prediction: u8,
    name: &'a str,
}

impl Corpus {
    pub fn new(documents: Vec<String>, labels: Option<Vec<Label>>) -> Result<Self, AnalysisError> {
        if documents.is_empty() {
            return Err(AnalysisError::configuration(PipelineStage::Corpus, "The corpus is empty."))
        }
        if let Some(ref labels) = labels {
            if labels.len() != documents.len() {
                return Err(AnalysisError::configuration(
                    PipelineStage::Corpus,
                    format!("Got {} labels for {} documents.", labels.len(), documents.len()),
                ))
            }
        }
        Ok(Self { documents, labels })
    }

    pub fn unlabelled(documents: Vec<String>) -> Result<Self, AnalysisError> {
        Self::new(documents, None)
    }

    /// Reads a csv with a `text` and an optional `label` column.
    pub fn read_csv(path: impl AsRef<Utf8Path>, names: &LabelNames) -> Result<Self, AnalysisError> {
        let path = path.as_ref();
        log::info!("Reading the corpus from {path}");
        let file = File::open(path).map_err(|err| AnalysisError::resource(PipelineStage::Corpus, err))?;
        Self::from_reader(BufReader::new(file), names)
    }

    pub fn from_reader<R: Read>(reader: R, names: &LabelNames) -> Result<Self, AnalysisError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);
        let mut documents = Vec::new();
        let mut raw_labels = Vec::new();
        for record in reader.deserialize::<CorpusRecord>() {
            let record = record.map_err(|err| AnalysisError::resource(PipelineStage::Corpus, err))?;
            documents.push(record.text);
            raw_labels.push(record.label.filter(|value| !value.trim().is_empty()));
        }

        let labelled = raw_labels.iter().filter(|value| value.is_some()).count();
        let labels = if labelled == 0 {
            None
        } else {
            let mut labels = Vec::with_capacity(raw_labels.len());
            for (row, value) in raw_labels.into_iter().enumerate() {
                let label = value
                    .as_deref()
                    .and_then(|value| names.parse(value))
                    .ok_or_else(|| AnalysisError::configuration(
                        PipelineStage::Corpus,
                        format!("The label of document {row} is missing or unknown: {value:?}"),
                    ))?;
                labels.push(label);
            }
            Some(labels)
        };
        Self::new(documents, labels)
    }

    pub fn documents(&self) -> &[String] {
        &self.documents
    }

    pub fn labels(&self) -> Option<&[Label]> {
        self.labels.as_deref()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Writes `index,text,prediction,name` for every document.
/// `rows` maps the predictions back to the documents.
pub fn write_predictions<W: Write>(
    writer: W,
    corpus: &Corpus,
    rows: &[usize],
    predictions: &[Label],
    names: &LabelNames,
) -> Result<(), AnalysisError> {
    let mut writer = csv::Writer::from_writer(writer);
    for (row, prediction) in rows.iter().zip(predictions) {
        writer
            .serialize(PredictionRecord {
                index: *row,
                text: &corpus.documents()[*row],
                prediction: prediction.as_u8(),
                name: names.name(*prediction),
            })
            .map_err(|err| AnalysisError::resource(PipelineStage::Report, err))?;
    }
    writer.flush().map_err(|err| AnalysisError::resource(PipelineStage::Report, err))
}

#[cfg(test)]
mod test {
    use std::io::Cursor;
    use crate::error::AnalysisError;
    use crate::labels::{Label, LabelNames};
    use super::{write_predictions, Corpus};

    #[test]
    fn reads_labelled_csv(){
        let data = "text,label\n\"I love freedom, really\",0\nI hate taxes,Trump\n";
        let corpus = Corpus::from_reader(Cursor::new(data), &LabelNames::default()).unwrap();
        assert_eq!(2, corpus.len());
        assert_eq!("I love freedom, really", corpus.documents()[0]);
        assert_eq!(Some(&[Label::NEGATIVE, Label::POSITIVE][..]), corpus.labels());
    }

    #[test]
    fn reads_unlabelled_csv(){
        let data = "text\nfirst\nsecond\n";
        let corpus = Corpus::from_reader(Cursor::new(data), &LabelNames::default()).unwrap();
        assert_eq!(None, corpus.labels());
    }

    #[test]
    fn partial_labels_fail(){
        let data = "text,label\nfirst,1\nsecond,\n";
        let result = Corpus::from_reader(Cursor::new(data), &LabelNames::default());
        assert!(matches!(result, Err(AnalysisError::Configuration { .. })));
    }

    #[test]
    fn label_count_has_to_match(){
        let result = Corpus::new(vec!["a".to_string()], Some(vec![]));
        assert!(matches!(result, Err(AnalysisError::Configuration { .. })));
        assert!(Corpus::unlabelled(vec![]).is_err());
    }

    #[test]
    fn writes_predictions(){
        let corpus = Corpus::unlabelled(vec!["a".to_string(), "b".to_string()]).unwrap();
        let mut out = Vec::new();
        write_predictions(&mut out, &corpus, &[1], &[Label::POSITIVE], &LabelNames::default()).unwrap();
        assert_eq!("index,text,prediction,name\n1,b,1,Trump\n", String::from_utf8(out).unwrap());
    }
}
