//! Lexical retrieval over a fixed, pre-tokenized corpus.
//!
//! The index is built once and then served read-only by three scoring models
//! (Boolean, TF-IDF cosine, BM25). The `eval` module measures ranking quality
//! against relevance judgments.

pub mod engine;
pub mod error;
pub mod eval;
pub mod index;
pub mod model;
pub mod persist;
pub mod tokenizer;

pub use engine::{CorpusDocument, EngineConfig, SearchEngine, MISSING_DOCUMENT_TEXT};
pub use error::Error;
pub use index::{InvertedIndex, Posting};
pub use model::{Bm25Model, Bm25Params, BooleanModel, ModelKind, RetrievalModel, VectorSpaceModel};

use serde::{Deserialize, Serialize};

pub type DocId = String;

/// One ranked hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredDoc {
    pub doc_id: DocId,
    pub score: f64,
}

impl ScoredDoc {
    pub fn new(doc_id: impl Into<DocId>, score: f64) -> Self {
        Self { doc_id: doc_id.into(), score }
    }
}
