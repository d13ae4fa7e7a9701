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


//! The data behind a biplot of two principal components: the scaled document
//! scores and the loading arrows of the terms that drive both components.

use std::io::Write;
use serde::Serialize;
use crate::error::{AnalysisError, PipelineStage};
use crate::labels::{Label, LabelNames};
use crate::projection::{ComponentScores, Projection};

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BiplotPoint {
    pub x: f64,
    pub y: f64,
    pub label: Option<Label>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BiplotArrow {
    pub term: String,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Biplot {
    pub x_component: usize,
    pub y_component: usize,
    pub points: Vec<BiplotPoint>,
    pub arrows: Vec<BiplotArrow>,
}

#[derive(Serialize)]
struct BiplotRecord<'a> {
    kind: &'static str,
    name: &'a str,
    x: f64,
    y: f64,
}

fn scale(values: impl Iterator<Item = f64> + Clone) -> f64 {
    let max = values.clone().fold(f64::NEG_INFINITY, f64::max);
    let min = values.fold(f64::INFINITY, f64::min);
    let range = max - min;
    if range > 0.0 && range.is_finite() {
        1.0 / range
    } else {
        1.0
    }
}

impl Biplot {
    /// Scales the scores of both components by `1 / (max - min)` and keeps the arrows
    /// that are at least `max_arrow` long.
    pub fn compute(
        scores: &ComponentScores,
        projection: &Projection,
        labels: Option<&[Label]>,
        x_component: usize,
        y_component: usize,
        max_arrow: f64,
    ) -> Result<Self, AnalysisError> {
        let fitted = x_component.max(y_component) < projection.n_components();
        let (Some(xs), Some(ys), true) = (scores.column(x_component), scores.column(y_component), fitted) else {
            return Err(AnalysisError::configuration(
                PipelineStage::Report,
                format!(
                    "The biplot needs the components {} and {} but only {} exist.",
                    x_component + 1,
                    y_component + 1,
                    scores.n_components()
                ),
            ))
        };
        if let Some(labels) = labels {
            if labels.len() != scores.n_documents() {
                return Err(AnalysisError::configuration(
                    PipelineStage::Report,
                    format!("Got {} labels for {} documents.", labels.len(), scores.n_documents()),
                ))
            }
        }
        let scale_x = scale(xs.iter().copied());
        let scale_y = scale(ys.iter().copied());
        let points = xs
            .iter()
            .zip(ys.iter())
            .enumerate()
            .map(|(i, (x, y))| BiplotPoint {
                x: x * scale_x,
                y: y * scale_y,
                label: labels.map(|labels| labels[i]),
            })
            .collect();

        let loadings = projection.loadings();
        let arrows = projection
            .terms()
            .iter()
            .enumerate()
            .filter_map(|(i, term)| {
                let x = loadings[[x_component, i]];
                let y = loadings[[y_component, i]];
                ((x * x + y * y).sqrt() >= max_arrow).then(|| BiplotArrow { term: term.clone(), x, y })
            })
            .collect();

        Ok(Self { x_component, y_component, points, arrows })
    }

    /// Writes `kind,name,x,y` rows, points first.
    pub fn write_csv<W: Write>(&self, writer: W, names: &LabelNames) -> Result<(), AnalysisError> {
        let mut writer = csv::Writer::from_writer(writer);
        let err = |err: csv::Error| AnalysisError::resource(PipelineStage::Report, err);
        for point in &self.points {
            let name = point.label.map(|label| names.name(label)).unwrap_or("");
            writer.serialize(BiplotRecord { kind: "point", name, x: point.x, y: point.y }).map_err(err)?;
        }
        for arrow in &self.arrows {
            writer.serialize(BiplotRecord { kind: "arrow", name: &arrow.term, x: arrow.x, y: arrow.y }).map_err(err)?;
        }
        writer.flush().map_err(|err| AnalysisError::resource(PipelineStage::Report, err))
    }
}

#[cfg(test)]
mod test {
    use ndarray::array;
    use text_processing::{DocumentTermMatrix, Vocabulary};
    use crate::error::AnalysisError;
    use crate::labels::{Label, LabelNames};
    use crate::projection::Projection;
    use super::Biplot;

    fn fitted() -> (Projection, crate::projection::ComponentScores) {
        let vocabulary = Vocabulary::from_ranked([("wall", 4), ("job", 3), ("famili", 2)]);
        let dtm = DocumentTermMatrix::from_counts(
            array![[3.0, 0.0, 0.0], [0.0, 2.0, 0.0], [0.0, 0.0, 1.0], [1.0, 1.0, 0.0]],
            &vocabulary,
        ).unwrap();
        let projection = Projection::fit(&dtm, 1.0).unwrap();
        let scores = projection.transform(&dtm).unwrap();
        (projection, scores)
    }

    #[test]
    fn points_are_scaled(){
        let (projection, scores) = fitted();
        let labels = [Label::NEGATIVE, Label::POSITIVE, Label::POSITIVE, Label::NEGATIVE];
        let biplot = Biplot::compute(&scores, &projection, Some(&labels), 0, 1, 0.2).unwrap();
        assert_eq!(4, biplot.points.len());
        let xs = biplot.points.iter().map(|p| p.x).collect::<Vec<_>>();
        let range = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max) - xs.iter().copied().fold(f64::INFINITY, f64::min);
        assert!((range - 1.0).abs() < 1e-9);
        assert_eq!(Some(Label::POSITIVE), biplot.points[1].label);
        assert!(biplot.arrows.iter().all(|a| (a.x * a.x + a.y * a.y).sqrt() >= 0.2));
    }

    #[test]
    fn zero_threshold_keeps_every_arrow(){
        let (projection, scores) = fitted();
        let biplot = Biplot::compute(&scores, &projection, None, 0, 1, 0.0).unwrap();
        assert_eq!(3, biplot.arrows.len());
        let mut out = Vec::new();
        biplot.write_csv(&mut out, &LabelNames::default()).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("kind,name,x,y\npoint,,"));
        assert_eq!(3, text.lines().filter(|line| line.starts_with("arrow,")).count());
    }

    #[test]
    fn unknown_component(){
        let (projection, scores) = fitted();
        let result = Biplot::compute(&scores, &projection, None, 0, 7, 0.2);
        assert!(matches!(result, Err(AnalysisError::Configuration { .. })));
    }
}
