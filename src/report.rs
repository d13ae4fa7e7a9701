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


use std::fmt::{Display, Formatter};
use serde::{Deserialize, Serialize};
use strum::{Display as StrumDisplay, EnumString};
use crate::error::{AnalysisError, PipelineStage};
use crate::labels::{Label, LabelNames};

/// How a confusion matrix is normalized.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, StrumDisplay, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Normalization {
    /// Every row sums to 1, the diagonal holds the recall.
    Rows,
    /// Every column sums to 1, the diagonal holds the precision.
    Columns,
}

/// A 2x2 confusion matrix, rows are the true labels and columns the predictions.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    counts: [[u64; 2]; 2],
}

impl ConfusionMatrix {
    pub fn new(truth: &[Label], predicted: &[Label]) -> Result<Self, AnalysisError> {
        check_lengths(truth, predicted)?;
        let mut counts = [[0u64; 2]; 2];
        for (t, p) in truth.iter().zip(predicted) {
            counts[t.index()][p.index()] += 1;
        }
        Ok(Self { counts })
    }

    pub fn get(&self, truth: Label, predicted: Label) -> u64 {
        self.counts[truth.index()][predicted.index()]
    }

    pub fn row_sums(&self) -> [u64; 2] {
        [self.counts[0][0] + self.counts[0][1], self.counts[1][0] + self.counts[1][1]]
    }

    pub fn column_sums(&self) -> [u64; 2] {
        [self.counts[0][0] + self.counts[1][0], self.counts[0][1] + self.counts[1][1]]
    }

    pub fn total(&self) -> u64 {
        self.row_sums().iter().sum()
    }

    /// Divides each cell by its row or column sum. Empty rows or columns stay 0.
    pub fn normalized(&self, normalization: Normalization) -> [[f64; 2]; 2] {
        let mut result = [[0.0; 2]; 2];
        let rows = self.row_sums();
        let columns = self.column_sums();
        for t in 0..2 {
            for p in 0..2 {
                let divisor = match normalization {
                    Normalization::Rows => rows[t],
                    Normalization::Columns => columns[p],
                };
                if divisor > 0 {
                    result[t][p] = self.counts[t][p] as f64 / divisor as f64;
                }
            }
        }
        result
    }

    /// A table with `P-<name>` columns and `T-<name>` rows.
    pub fn pretty(&self, names: &LabelNames, normalization: Option<Normalization>, show_sum: bool) -> String {
        let cells = match normalization {
            None => self.counts.map(|row| row.map(|value| value.to_string())),
            Some(normalization) => self.normalized(normalization).map(|row| row.map(|value| format!("{value:.3}"))),
        };
        let headers = Label::all().map(|label| format!("P-{}", names.name(label)));
        let row_names = Label::all().map(|label| format!("T-{}", names.name(label)));
        let first_width = row_names.iter().map(String::len).max().unwrap_or(0);
        let widths = [0, 1].map(|p| headers[p].len().max(cells[0][p].len()).max(cells[1][p].len()));

        let mut out = format!("{:first_width$}", "");
        for (header, width) in headers.iter().zip(widths) {
            out.push_str(&format!("  {header:>width$}"));
        }
        out.push('\n');
        for (row_name, row) in row_names.iter().zip(cells.iter()) {
            out.push_str(&format!("{row_name:<first_width$}"));
            for (cell, width) in row.iter().zip(widths) {
                out.push_str(&format!("  {cell:>width$}"));
            }
            out.push('\n');
        }
        if show_sum {
            let columns = self.column_sums();
            let rows = self.row_sums();
            out.push_str(&format!("Sum of columns: [{} {}]\n", columns[0], columns[1]));
            out.push_str(&format!("Sum of rows: [{} {}]\n", rows[0], rows[1]));
        }
        out
    }
}

fn check_lengths(truth: &[Label], predicted: &[Label]) -> Result<(), AnalysisError> {
    if truth.len() != predicted.len() {
        return Err(AnalysisError::configuration(
            PipelineStage::Report,
            format!("Got {} true labels but {} predictions.", truth.len(), predicted.len()),
        ))
    }
    Ok(())
}

/// Precision, recall and f1 of one class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub name: String,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: u64,
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct AverageMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: u64,
}

/// Per class metrics, accuracy and averages. A ratio with a zero denominator is 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub classes: Vec<ClassMetrics>,
    pub accuracy: f64,
    pub macro_avg: AverageMetrics,
    pub weighted_avg: AverageMetrics,
    pub confusion_matrix: ConfusionMatrix,
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

impl ClassificationReport {
    pub fn new(truth: &[Label], predicted: &[Label], names: &LabelNames) -> Result<Self, AnalysisError> {
        let matrix = ConfusionMatrix::new(truth, predicted)?;
        let rows = matrix.row_sums();
        let columns = matrix.column_sums();
        let classes = Label::all()
            .into_iter()
            .map(|label| {
                let hits = matrix.get(label, label);
                let precision = ratio(hits, columns[label.index()]);
                let recall = ratio(hits, rows[label.index()]);
                let f1_score = if precision + recall > 0.0 {
                    2.0 * precision * recall / (precision + recall)
                } else {
                    0.0
                };
                ClassMetrics {
                    name: names.name(label).to_string(),
                    precision,
                    recall,
                    f1_score,
                    support: rows[label.index()],
                }
            })
            .collect::<Vec<_>>();
        let total = matrix.total();
        let accuracy = ratio(matrix.get(Label::NEGATIVE, Label::NEGATIVE) + matrix.get(Label::POSITIVE, Label::POSITIVE), total);
        let n = classes.len() as f64;
        let macro_avg = AverageMetrics {
            precision: classes.iter().map(|c| c.precision).sum::<f64>() / n,
            recall: classes.iter().map(|c| c.recall).sum::<f64>() / n,
            f1_score: classes.iter().map(|c| c.f1_score).sum::<f64>() / n,
            support: total,
        };
        let weight = |value: fn(&ClassMetrics) -> f64| {
            if total == 0 {
                0.0
            } else {
                classes.iter().map(|c| value(c) * c.support as f64).sum::<f64>() / total as f64
            }
        };
        let weighted_avg = AverageMetrics {
            precision: weight(|c| c.precision),
            recall: weight(|c| c.recall),
            f1_score: weight(|c| c.f1_score),
            support: total,
        };
        Ok(Self { classes, accuracy, macro_avg, weighted_avg, confusion_matrix: matrix })
    }
}

impl Display for ClassificationReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let width = self.classes
            .iter()
            .map(|c| c.name.len())
            .chain(["weighted avg".len()])
            .max()
            .unwrap_or(0);
        writeln!(f, "{:>width$} {:>9} {:>9} {:>9} {:>9}", "", "precision", "recall", "f1-score", "support")?;
        writeln!(f)?;
        for class in &self.classes {
            writeln!(
                f,
                "{:>width$} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                class.name, class.precision, class.recall, class.f1_score, class.support
            )?;
        }
        writeln!(f)?;
        writeln!(f, "{:>width$} {:>9} {:>9} {:>9.2} {:>9}", "accuracy", "", "", self.accuracy, self.macro_avg.support)?;
        for (name, avg) in [("macro avg", &self.macro_avg), ("weighted avg", &self.weighted_avg)] {
            writeln!(
                f,
                "{:>width$} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                name, avg.precision, avg.recall, avg.f1_score, avg.support
            )?;
        }
        Ok(())
    }
}
