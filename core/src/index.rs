use crate::DocId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

static NO_DOCS: BTreeSet<DocId> = BTreeSet::new();

/// Positions and lengths are stored as `u32`; anything longer is clamped.
fn clamp_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// One occurrence of a term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: DocId,
    pub position: u32,
}

/// Positional inverted index over a pre-tokenized corpus.
///
/// Built in a single pass by [`InvertedIndex::build`] and read-only afterwards.
/// Documents are visited in ascending id order, so postings lists are identical
/// for identical corpora no matter how the input was ordered.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvertedIndex {
    postings: HashMap<String, Vec<Posting>>, // insertion order: doc id asc, then position
    term_docs: HashMap<String, BTreeSet<DocId>>,
    doc_freq: HashMap<String, u32>,
    doc_lengths: HashMap<DocId, u32>,
    doc_terms: HashMap<DocId, HashMap<String, u32>>,
    total_docs: u32,
    avg_doc_length: f64,
}

impl InvertedIndex {
    pub fn new() -> Self { Self::default() }

    /// Build an index from `(doc_id, tokens)` pairs. A repeated id keeps its last token list.
    pub fn build<I, D, V, T>(documents: I) -> Self
    where
        I: IntoIterator<Item = (D, V)>,
        D: Into<DocId>,
        V: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let ordered: BTreeMap<DocId, Vec<String>> = documents
            .into_iter()
            .map(|(id, tokens)| (id.into(), tokens.into_iter().map(Into::into).collect()))
            .collect();

        let mut index = Self::default();
        let mut total_length: u64 = 0;
        for (doc_id, tokens) in ordered {
            let mut counter: HashMap<String, u32> = HashMap::new();
            for (pos, term) in tokens.iter().enumerate() {
                index
                    .postings
                    .entry(term.clone())
                    .or_default()
                    .push(Posting { doc_id: doc_id.clone(), position: clamp_u32(pos) });
                *counter.entry(term.clone()).or_insert(0) += 1;
            }
            for term in counter.keys() {
                index.term_docs.entry(term.clone()).or_default().insert(doc_id.clone());
                *index.doc_freq.entry(term.clone()).or_insert(0) += 1;
            }
            if tokens.len() > u32::MAX as usize {
                tracing::warn!(doc_id = %doc_id, tokens = tokens.len(), "document length exceeds u32; clamped");
            }
            total_length += tokens.len() as u64;
            index.doc_lengths.insert(doc_id.clone(), clamp_u32(tokens.len()));
            index.doc_terms.insert(doc_id, counter);
        }

        index.total_docs = index.doc_lengths.len() as u32;
        index.avg_doc_length = if index.total_docs == 0 {
            0.0
        } else {
            total_length as f64 / index.total_docs as f64
        };
        tracing::info!(
            num_docs = index.total_docs,
            num_terms = index.postings.len(),
            avg_doc_length = index.avg_doc_length,
            "built inverted index"
        );
        index
    }

    /// Replace all state with a fresh build. Nothing from the previous corpus survives.
    pub fn rebuild<I, D, V, T>(&mut self, documents: I)
    where
        I: IntoIterator<Item = (D, V)>,
        D: Into<DocId>,
        V: IntoIterator<Item = T>,
        T: Into<String>,
    {
        *self = Self::build(documents);
    }

    /// Documents containing `term` at least once.
    pub fn docs_containing(&self, term: &str) -> &BTreeSet<DocId> {
        self.term_docs.get(term).unwrap_or(&NO_DOCS)
    }

    pub fn term_frequency(&self, term: &str, doc_id: &str) -> u32 {
        self.doc_terms
            .get(doc_id)
            .and_then(|counter| counter.get(term))
            .copied()
            .unwrap_or(0)
    }

    pub fn doc_frequency(&self, term: &str) -> u32 {
        self.doc_freq.get(term).copied().unwrap_or(0)
    }

    pub fn postings(&self, term: &str) -> &[Posting] {
        self.postings.get(term).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn doc_length(&self, doc_id: &str) -> Option<u32> { self.doc_lengths.get(doc_id).copied() }

    /// Term-frequency counter of one document.
    pub fn doc_terms(&self, doc_id: &str) -> Option<&HashMap<String, u32>> { self.doc_terms.get(doc_id) }

    pub fn contains_doc(&self, doc_id: &str) -> bool { self.doc_lengths.contains_key(doc_id) }

    pub fn doc_ids(&self) -> impl Iterator<Item = &DocId> + '_ { self.doc_lengths.keys() }

    pub fn total_docs(&self) -> u32 { self.total_docs }

    pub fn avg_doc_length(&self) -> f64 { self.avg_doc_length }

    pub fn num_terms(&self) -> usize { self.postings.len() }

    pub fn is_empty(&self) -> bool { self.total_docs == 0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> InvertedIndex {
        InvertedIndex::build(vec![
            ("2", vec!["b", "c", "b"]),
            ("1", vec!["a", "b"]),
        ])
    }

    #[test]
    fn postings_follow_doc_then_position_order() {
        let idx = sample();
        let b: Vec<(&str, u32)> = idx.postings("b").iter().map(|p| (p.doc_id.as_str(), p.position)).collect();
        assert_eq!(b, vec![("1", 1), ("2", 0), ("2", 2)]);
        assert!(idx.postings("zzz").is_empty());
    }

    #[test]
    fn per_document_statistics() {
        let idx = sample();
        assert_eq!(idx.doc_length("2"), Some(3));
        assert_eq!(idx.term_frequency("b", "2"), 2);
        assert_eq!(idx.term_frequency("b", "missing"), 0);
        assert_eq!(idx.term_frequency("a", "2"), 0);
        assert_eq!(idx.doc_frequency("b"), 2);
        assert_eq!(idx.avg_doc_length(), 2.5);
    }

    #[test]
    fn duplicate_ids_keep_last_tokens() {
        let idx = InvertedIndex::build(vec![("x", vec!["a"]), ("x", vec!["b", "b"])]);
        assert_eq!(idx.total_docs(), 1);
        assert_eq!(idx.doc_frequency("a"), 0);
        assert_eq!(idx.term_frequency("b", "x"), 2);
    }

    #[test]
    fn oversized_counts_clamp_instead_of_wrapping() {
        assert_eq!(clamp_u32(7), 7);
        assert_eq!(clamp_u32(u32::MAX as usize), u32::MAX);
        #[cfg(target_pointer_width = "64")]
        assert_eq!(clamp_u32(u32::MAX as usize + 5), u32::MAX);
    }

    #[test]
    fn empty_corpus_has_zero_average() {
        let idx = InvertedIndex::build(Vec::<(String, Vec<String>)>::new());
        assert!(idx.is_empty());
        assert_eq!(idx.avg_doc_length(), 0.0);
        assert!(idx.docs_containing("a").is_empty());
    }

    #[test]
    fn rebuild_replaces_previous_state() {
        let mut idx = sample();
        idx.rebuild(vec![("9", vec!["z"])]);
        assert_eq!(idx.total_docs(), 1);
        assert_eq!(idx.doc_frequency("b"), 0);
        assert!(!idx.contains_doc("1"));
        assert!(idx.docs_containing("z").contains("9"));
    }
}
