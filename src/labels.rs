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

/// One of the two classes.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct Label(u8);

impl Label {
    pub const NEGATIVE: Label = Label(0);
    pub const POSITIVE: Label = Label(1);

    /// Returns None for anything but 0 and 1.
    pub const fn new(value: u8) -> Option<Self> {
        match value {
            0 | 1 => Some(Label(value)),
            _ => None
        }
    }

    #[inline]
    pub const fn as_u8(self) -> u8 {
        self.0
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    pub fn all() -> [Label; 2] {
        [Self::NEGATIVE, Self::POSITIVE]
    }
}

impl Display for Label {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl From<Label> for u8 {
    fn from(value: Label) -> Self {
        value.0
    }
}

/// Converts labels into the raw representation used by the classifier.
pub fn to_raw(labels: &[Label]) -> Vec<u8> {
    labels.iter().map(|label| label.as_u8()).collect()
}

/// Converts raw classifier output back into labels, anything but 0 is the positive class.
pub fn from_raw(raw: &[u8]) -> Vec<Label> {
    raw.iter().map(|value| if *value == 0 { Label::NEGATIVE } else { Label::POSITIVE }).collect()
}

/// The symbolic names of the two classes, index 0 names [Label::NEGATIVE].
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelNames([String; 2]);

impl Default for LabelNames {
    fn default() -> Self {
        Self(["Hillary".to_string(), "Trump".to_string()])
    }
}

impl LabelNames {
    pub fn new(negative: impl Into<String>, positive: impl Into<String>) -> Self {
        Self([negative.into(), positive.into()])
    }

    pub fn name(&self, label: Label) -> &str {
        &self.0[label.index()]
    }

    /// Accepts `0`/`1` or one of the names, ignoring case.
    pub fn parse(&self, value: &str) -> Option<Label> {
        let value = value.trim();
        match value {
            "0" => Some(Label::NEGATIVE),
            "1" => Some(Label::POSITIVE),
            other => Label::all()
                .into_iter()
                .find(|label| self.name(*label).eq_ignore_ascii_case(other))
        }
    }
}
