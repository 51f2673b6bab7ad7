//! Scoring strategies over a shared, read-only [`InvertedIndex`](crate::InvertedIndex).
//!
//! Every model holds an `Arc` to the index it was built against plus its own
//! memoized per-term statistics. A rebuilt index gets fresh model instances.

mod bm25;
mod boolean;
mod vsm;

pub use bm25::{Bm25Model, Bm25Params};
pub use boolean::{BooleanModel, Operator, BOOLEAN_MATCH_SCORE};
pub use vsm::VectorSpaceModel;

use crate::{DocId, Error, ScoredDoc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Common search contract of the three retrieval models.
pub trait RetrievalModel: Send + Sync {
    fn kind(&self) -> ModelKind;

    /// Rank documents for `query` and keep the best `top_n`. Empty query or `top_n == 0` yields nothing.
    fn search(&self, query: &[String], top_n: usize) -> Vec<ScoredDoc>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Boolean,
    Vsm,
    Bm25,
}

impl ModelKind {
    pub const ALL: [ModelKind; 3] = [ModelKind::Vsm, ModelKind::Bm25, ModelKind::Boolean];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::Boolean => "boolean",
            ModelKind::Vsm => "vsm",
            ModelKind::Bm25 => "bm25",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for ModelKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "boolean" => Ok(ModelKind::Boolean),
            "vsm" => Ok(ModelKind::Vsm),
            "bm25" => Ok(ModelKind::Bm25),
            _ => Err(Error::UnknownModel(s.to_string())),
        }
    }
}

/// Union of the postings of every query term.
pub(crate) fn candidates<'a>(index: &'a crate::InvertedIndex, query: &[String]) -> BTreeSet<&'a DocId> {
    query.iter().flat_map(|term| index.docs_containing(term)).collect()
}

/// Deterministic ranking: score desc, then doc id asc, truncated to `top_n`.
pub(crate) fn rank(mut scored: Vec<ScoredDoc>, top_n: usize) -> Vec<ScoredDoc> {
    scored.sort_unstable_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.doc_id.cmp(&b.doc_id)));
    scored.truncate(top_n);
    scored
}
