use super::{candidates, rank, ModelKind, RetrievalModel};
use crate::{InvertedIndex, ScoredDoc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Okapi BM25 parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bm25Params {
    /// Term-frequency saturation.
    pub k1: f64,
    /// Length normalization, 0 disables it.
    pub b: f64,
}

impl Default for Bm25Params {
    fn default() -> Self { Self { k1: 1.5, b: 0.75 } }
}

/// Okapi BM25 ranking.
pub struct Bm25Model {
    index: Arc<InvertedIndex>,
    params: Bm25Params,
    idf_cache: RwLock<HashMap<String, f64>>,
}

impl Bm25Model {
    pub fn new(index: Arc<InvertedIndex>, params: Bm25Params) -> Self {
        Self { index, params, idf_cache: RwLock::new(HashMap::new()) }
    }

    pub fn params(&self) -> Bm25Params { self.params }

    /// `ln((N - df + 0.5) / (df + 0.5) + 1)`, or 0 for an unseen term.
    pub fn idf(&self, term: &str) -> f64 {
        if let Some(idf) = self.idf_cache.read().get(term) {
            return *idf;
        }
        let df = self.index.doc_frequency(term);
        let idf = if df == 0 {
            0.0
        } else {
            let n = self.index.total_docs() as f64;
            let df = df as f64;
            ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
        };
        self.idf_cache.write().insert(term.to_string(), idf);
        idf
    }

    /// Saturated, length-normalized term weight before IDF is applied.
    pub fn tf_component(&self, tf: u32, doc_length: u32) -> f64 {
        if tf == 0 {
            return 0.0;
        }
        let Bm25Params { k1, b } = self.params;
        let tf = tf as f64;
        let avgdl = self.index.avg_doc_length();
        // avgdl is only zero for a corpus of empty documents, which no term can match
        let length_ratio = if avgdl > 0.0 { doc_length as f64 / avgdl } else { 0.0 };
        (tf * (k1 + 1.0)) / (tf + k1 * (1.0 - b + b * length_ratio))
    }

    pub fn term_score(&self, term: &str, doc_id: &str) -> f64 {
        let tf = self.index.term_frequency(term, doc_id);
        if tf == 0 {
            return 0.0;
        }
        let doc_length = self.index.doc_length(doc_id).unwrap_or(0);
        self.idf(term) * self.tf_component(tf, doc_length)
    }

    /// Sum of term scores over the raw query; a repeated term counts once per occurrence.
    pub fn score(&self, query: &[String], doc_id: &str) -> f64 {
        query.iter().map(|term| self.term_score(term, doc_id)).sum()
    }
}

impl RetrievalModel for Bm25Model {
    fn kind(&self) -> ModelKind { ModelKind::Bm25 }

    fn search(&self, query: &[String], top_n: usize) -> Vec<ScoredDoc> {
        if query.is_empty() || top_n == 0 {
            return Vec::new();
        }
        let candidates = candidates(&self.index, query);
        if candidates.is_empty() {
            return Vec::new();
        }
        let scored: Vec<ScoredDoc> = candidates
            .into_iter()
            .map(|doc_id| ScoredDoc { doc_id: doc_id.clone(), score: self.score(query, doc_id) })
            .collect();
        tracing::debug!(candidates = scored.len(), "bm25 scored candidates");
        rank(scored, top_n)
    }
}
