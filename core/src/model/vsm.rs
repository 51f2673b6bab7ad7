use super::{candidates, rank, ModelKind, RetrievalModel};
use crate::{DocId, InvertedIndex, ScoredDoc};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Dampened term frequency: `1 + ln(tf)`, zero for an absent term.
fn tf_weight(tf: u32) -> f64 {
    if tf == 0 { 0.0 } else { 1.0 + (tf as f64).ln() }
}

/// TF-IDF vectors compared by cosine similarity.
///
/// IDF values and document norms are memoized on first use. Both depend only on
/// the index this model was created with.
pub struct VectorSpaceModel {
    index: Arc<InvertedIndex>,
    idf_cache: RwLock<HashMap<String, f64>>,
    norm_cache: RwLock<HashMap<DocId, f64>>,
}

impl VectorSpaceModel {
    pub fn new(index: Arc<InvertedIndex>) -> Self {
        Self { index, idf_cache: RwLock::new(HashMap::new()), norm_cache: RwLock::new(HashMap::new()) }
    }

    /// Smoothed IDF `ln((N + 1) / (1 + df)) + 1`, or 0 for an unseen term.
    pub fn idf(&self, term: &str) -> f64 {
        if let Some(idf) = self.idf_cache.read().get(term) {
            return *idf;
        }
        let df = self.index.doc_frequency(term);
        let idf = if df == 0 {
            0.0
        } else {
            let n = self.index.total_docs() as f64;
            ((n + 1.0) / (1.0 + df as f64)).ln() + 1.0
        };
        self.idf_cache.write().insert(term.to_string(), idf);
        idf
    }

    pub fn tf_idf(&self, term: &str, doc_id: &str) -> f64 {
        let tf = self.index.term_frequency(term, doc_id);
        if tf == 0 {
            return 0.0;
        }
        tf_weight(tf) * self.idf(term)
    }

    /// Euclidean norm of the document's TF-IDF vector over every term it contains.
    pub fn doc_norm(&self, doc_id: &str) -> f64 {
        if let Some(norm) = self.norm_cache.read().get(doc_id) {
            return *norm;
        }
        let norm = self
            .index
            .doc_terms(doc_id)
            .map(|counter| {
                counter
                    .iter()
                    .map(|(term, &tf)| {
                        let w = tf_weight(tf) * self.idf(term);
                        w * w
                    })
                    .sum::<f64>()
                    .sqrt()
            })
            .unwrap_or(0.0);
        self.norm_cache.write().insert(doc_id.to_string(), norm);
        norm
    }

    /// Query weights keyed by distinct term.
    fn query_vector<'q>(&self, query: &'q [String]) -> BTreeMap<&'q str, f64> {
        let mut counts: BTreeMap<&str, u32> = BTreeMap::new();
        for term in query {
            *counts.entry(term.as_str()).or_insert(0) += 1;
        }
        counts.into_iter().map(|(term, count)| (term, tf_weight(count) * self.idf(term))).collect()
    }
}

impl RetrievalModel for VectorSpaceModel {
    fn kind(&self) -> ModelKind { ModelKind::Vsm }

    fn search(&self, query: &[String], top_n: usize) -> Vec<ScoredDoc> {
        if query.is_empty() || top_n == 0 {
            return Vec::new();
        }
        let candidates = candidates(&self.index, query);
        if candidates.is_empty() {
            return Vec::new();
        }

        let query_vector = self.query_vector(query);
        let query_norm = query_vector.values().map(|w| w * w).sum::<f64>().sqrt();

        let mut scored = Vec::with_capacity(candidates.len());
        for doc_id in candidates {
            // raw token sequence: a repeated query term contributes once per occurrence
            let dot: f64 = query
                .iter()
                .map(|term| query_vector[term.as_str()] * self.tf_idf(term, doc_id))
                .sum();
            let doc_norm = self.doc_norm(doc_id);
            if doc_norm > 0.0 && query_norm > 0.0 {
                scored.push(ScoredDoc { doc_id: doc_id.clone(), score: dot / (query_norm * doc_norm) });
            }
        }
        tracing::debug!(candidates = scored.len(), "vsm scored candidates");
        rank(scored, top_n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(tokens: &[&str]) -> Vec<String> { tokens.iter().map(|t| t.to_string()).collect() }

    fn model() -> VectorSpaceModel {
        VectorSpaceModel::new(Arc::new(InvertedIndex::build(vec![
            ("1", vec!["a", "b"]),
            ("2", vec!["b", "c"]),
            ("3", vec!["a", "c"]),
        ])))
    }

    #[test]
    fn idf_matches_smoothed_formula() {
        let m = model();
        let expected = (4.0f64 / 3.0).ln() + 1.0;
        assert!((m.idf("a") - expected).abs() < 1e-12);
        assert_eq!(m.idf("zzz"), 0.0);
    }

    #[test]
    fn doc_norm_covers_all_document_terms() {
        let m = model();
        let w = m.idf("a");
        // doc 1 holds a and b, both with df 2 and tf 1
        assert!((m.doc_norm("1") - (2.0 * w * w).sqrt()).abs() < 1e-12);
        assert_eq!(m.doc_norm("unknown"), 0.0);
    }

    #[test]
    fn identical_single_term_query_scores_partial_cosine() {
        let hits = model().search(&q(&["a"]), 10);
        let ids: Vec<&str> = hits.iter().map(|h| h.doc_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);
        for h in &hits {
            assert!((h.score - 1.0 / 2f64.sqrt()).abs() < 1e-9);
        }
    }

    #[test]
    fn repeated_query_term_counts_per_occurrence() {
        let once = model().search(&q(&["a"]), 10);
        let twice = model().search(&q(&["a", "a"]), 10);
        assert_eq!(twice.len(), 2);
        for (single, double) in once.iter().zip(&twice) {
            assert_eq!(single.doc_id, double.doc_id);
            assert!((double.score - 2f64.sqrt()).abs() < 1e-9);
            assert!((double.score - 2.0 * single.score).abs() < 1e-9);
        }
    }

    #[test]
    fn exact_match_ranks_first() {
        let hits = model().search(&q(&["a", "b"]), 10);
        assert_eq!(hits[0].doc_id, "1");
        assert!((hits[0].score - 1.0).abs() < 1e-9);
        assert_eq!(hits.len(), 3);
    }

    #[test]
    fn unknown_terms_yield_nothing() {
        assert!(model().search(&q(&["zzz"]), 10).is_empty());
        assert!(model().search(&[], 10).is_empty());
        assert!(model().search(&q(&["a"]), 0).is_empty());
    }
}
