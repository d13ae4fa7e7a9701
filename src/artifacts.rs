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


//! Persistence of fitted models.
//!
//! Every artifact is a bincode encoded envelope holding the format version,
//! the kind of the payload and the signature of the vocabulary the payload
//! was built against.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::sync::RwLock;
use camino::{Utf8Path, Utf8PathBuf};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use strum::Display;
use text_processing::VocabularySignature;
use thiserror::Error;

/// The current version of the envelope.
pub const FORMAT_VERSION: u32 = 1;

pub const VOCABULARY_KEY: &str = "words.bin";
pub const PROJECTION_KEY: &str = "pca.bin";
pub const CLASSIFIER_KEY: &str = "svm.bin";

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ArtifactKind {
    Vocabulary,
    Projection,
    Classifier,
}

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("The artifact {0} does not exist!")]
    NotFound(String),
    #[error("Failed to access the artifact {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Serialisation(#[from] bincode::Error),
    #[error("The artifact store was poisoned by a panicking writer!")]
    Poisoned,
    #[error("The artifact {key} has the format version {found} but {supported} is supported!")]
    FormatVersion { key: String, found: u32, supported: u32 },
    #[error("The artifact {key} contains a {found} but a {expected} was expected!")]
    Kind {
        key: String,
        expected: ArtifactKind,
        found: ArtifactKind,
    },
}

/// A decoded artifact.
#[derive(Debug, Clone, Deserialize)]
pub struct Artifact<T> {
    pub format_version: u32,
    pub kind: ArtifactKind,
    pub vocabulary: VocabularySignature,
    pub payload: T,
}

#[derive(Serialize)]
struct ArtifactRef<'a, T> {
    format_version: u32,
    kind: ArtifactKind,
    vocabulary: VocabularySignature,
    payload: &'a T,
}

#[derive(Deserialize)]
struct ArtifactHeader {
    format_version: u32,
    kind: ArtifactKind,
}

pub fn encode<T: Serialize>(kind: ArtifactKind, vocabulary: VocabularySignature, payload: &T) -> Result<Vec<u8>, ArtifactError> {
    Ok(bincode::serialize(&ArtifactRef {
        format_version: FORMAT_VERSION,
        kind,
        vocabulary,
        payload,
    })?)
}

/// Checks version and kind before the payload is decoded.
pub fn decode<T: DeserializeOwned>(key: &str, bytes: &[u8], expected: ArtifactKind) -> Result<Artifact<T>, ArtifactError> {
    let header: ArtifactHeader = bincode::deserialize(bytes)?;
    if header.format_version != FORMAT_VERSION {
        return Err(ArtifactError::FormatVersion {
            key: key.to_string(),
            found: header.format_version,
            supported: FORMAT_VERSION,
        })
    }
    if header.kind != expected {
        return Err(ArtifactError::Kind { key: key.to_string(), expected, found: header.kind })
    }
    Ok(bincode::deserialize(bytes)?)
}

/// Named blob storage for artifacts.
pub trait ArtifactStore {
    fn save(&self, key: &str, bytes: &[u8]) -> Result<(), ArtifactError>;

    fn load(&self, key: &str) -> Result<Vec<u8>, ArtifactError>;
}

impl<S: ArtifactStore + ?Sized> ArtifactStore for &S {
    fn save(&self, key: &str, bytes: &[u8]) -> Result<(), ArtifactError> {
        (**self).save(key, bytes)
    }

    fn load(&self, key: &str) -> Result<Vec<u8>, ArtifactError> {
        (**self).load(key)
    }
}

/// Stores every artifact as a file in a directory.
#[derive(Debug, Clone)]
pub struct FileArtifactStore {
    root: Utf8PathBuf,
}

impl FileArtifactStore {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }
}

impl ArtifactStore for FileArtifactStore {
    fn save(&self, key: &str, bytes: &[u8]) -> Result<(), ArtifactError> {
        let io_err = |source| ArtifactError::Io { key: key.to_string(), source };
        std::fs::create_dir_all(&self.root).map_err(io_err)?;
        let path = self.root.join(key);
        log::info!("Saving {path}");
        let mut out = BufWriter::new(
            File::options()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&path)
                .map_err(io_err)?
        );
        out.write_all(bytes).map_err(io_err)?;
        out.flush().map_err(io_err)
    }

    fn load(&self, key: &str) -> Result<Vec<u8>, ArtifactError> {
        let path = self.root.join(key);
        log::info!("Loading {path}");
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(ArtifactError::NotFound(path.to_string()))
            }
            Err(source) => return Err(ArtifactError::Io { key: key.to_string(), source })
        };
        let mut data = Vec::new();
        BufReader::new(file)
            .read_to_end(&mut data)
            .map_err(|source| ArtifactError::Io { key: key.to_string(), source })?;
        Ok(data)
    }
}

/// Keeps the artifacts in memory.
#[derive(Debug, Default)]
pub struct MemoryArtifactStore {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The stored keys in order, empty if the store is poisoned.
    pub fn keys(&self) -> Vec<String> {
        let Ok(entries) = self.entries.read() else {
            return Vec::new()
        };
        let mut keys = entries.keys().cloned().collect::<Vec<_>>();
        keys.sort();
        keys
    }
}

impl ArtifactStore for MemoryArtifactStore {
    fn save(&self, key: &str, bytes: &[u8]) -> Result<(), ArtifactError> {
        self.entries
            .write()
            .map_err(|_| ArtifactError::Poisoned)?
            .insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Vec<u8>, ArtifactError> {
        self.entries
            .read()
            .map_err(|_| ArtifactError::Poisoned)?
            .get(key)
            .cloned()
            .ok_or_else(|| ArtifactError::NotFound(key.to_string()))
    }
}
