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

//! Text mining for short posts: stop-word filtering, the two tokenizer paths,
//! the ranked vocabulary, document-term counts and affect-lexicon counts.

pub mod affect;
pub mod configs;
pub mod dtm;
pub mod error;
pub mod stopword_registry;
mod stopwords_en;
pub mod tokenizer;
pub mod vocabulary;

pub use affect::{AffectCategory, AffectLexicon, AffectMatrix, LexiconFormat};
pub use dtm::DocumentTermMatrix;
pub use error::TextProcessingError;
pub use stopword_registry::{StopWordList, StopWordListBuilder};
pub use tokenizer::Tokenizer;
pub use vocabulary::{Vocabulary, VocabularySignature};
