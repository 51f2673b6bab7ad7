use crate::error::{Error, Result};
use crate::model::{Bm25Model, Bm25Params, BooleanModel, ModelKind, RetrievalModel, VectorSpaceModel};
use crate::persist::{self, IndexPaths};
use crate::{DocId, InvertedIndex, ScoredDoc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Shown in place of a document whose raw text is not in the store.
pub const MISSING_DOCUMENT_TEXT: &str = "Document text not found.";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub bm25: Bm25Params,
}

/// A tokenized corpus entry. `text` is kept for display only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusDocument {
    pub id: DocId,
    pub tokens: Vec<String>,
    #[serde(default)]
    pub text: Option<String>,
}

struct Ready {
    index: Arc<InvertedIndex>,
    boolean: BooleanModel,
    vsm: VectorSpaceModel,
    bm25: Bm25Model,
    documents: HashMap<DocId, String>,
}

impl Ready {
    fn new(index: InvertedIndex, documents: HashMap<DocId, String>, config: &EngineConfig) -> Self {
        let index = Arc::new(index);
        Self {
            boolean: BooleanModel::new(Arc::clone(&index)),
            vsm: VectorSpaceModel::new(Arc::clone(&index)),
            bm25: Bm25Model::new(Arc::clone(&index), config.bm25),
            index,
            documents,
        }
    }

    fn model(&self, kind: ModelKind) -> &dyn RetrievalModel {
        match kind {
            ModelKind::Boolean => &self.boolean,
            ModelKind::Vsm => &self.vsm,
            ModelKind::Bm25 => &self.bm25,
        }
    }
}

/// Owns the index, the three models and the raw-document store.
///
/// A new engine cannot serve queries: [`SearchEngine::build`] or
/// [`SearchEngine::load`] must run first, otherwise `search` returns
/// [`Error::NotReady`]. Each build or load replaces the index and every
/// model together, so memoized statistics never outlive their index.
pub struct SearchEngine {
    config: EngineConfig,
    ready: Option<Ready>,
}

impl SearchEngine {
    pub fn new(config: EngineConfig) -> Self { Self { config, ready: None } }

    pub fn config(&self) -> &EngineConfig { &self.config }

    pub fn is_ready(&self) -> bool { self.ready.is_some() }

    pub fn build<I>(&mut self, corpus: I)
    where
        I: IntoIterator<Item = CorpusDocument>,
    {
        let mut documents = HashMap::new();
        let mut tokenized = Vec::new();
        for doc in corpus {
            // last occurrence of an id wins, text included
            match doc.text {
                Some(text) => {
                    documents.insert(doc.id.clone(), text);
                }
                None => {
                    documents.remove(&doc.id);
                }
            }
            tokenized.push((doc.id, doc.tokens));
        }
        let index = InvertedIndex::build(tokenized);
        self.ready = Some(Ready::new(index, documents, &self.config));
    }

    /// Adopt an already built index, e.g. one restored by the caller.
    pub fn install(&mut self, index: InvertedIndex, documents: HashMap<DocId, String>) {
        self.ready = Some(Ready::new(index, documents, &self.config));
    }

    pub fn load(&mut self, paths: &IndexPaths) -> anyhow::Result<()> {
        let (index, documents, meta) = persist::load_index(paths)?;
        tracing::info!(num_docs = meta.num_docs, created_at = %meta.created_at, "loaded index");
        self.install(index, documents);
        Ok(())
    }

    pub fn save(&self, paths: &IndexPaths) -> anyhow::Result<()> {
        let ready = self.ready.as_ref().ok_or(Error::NotReady)?;
        persist::save_index(paths, &ready.index, &ready.documents)
    }

    pub fn index(&self) -> Result<&InvertedIndex> {
        self.ready.as_ref().map(|r| r.index.as_ref()).ok_or(Error::NotReady)
    }

    pub fn model(&self, kind: ModelKind) -> Result<&dyn RetrievalModel> {
        self.ready.as_ref().map(|r| r.model(kind)).ok_or(Error::NotReady)
    }

    pub fn search(&self, query: &[String], kind: ModelKind, top_n: usize) -> Result<Vec<ScoredDoc>> {
        let model = self.model(kind)?;
        let hits = model.search(query, top_n);
        tracing::debug!(model = %kind, terms = query.len(), hits = hits.len(), "search");
        Ok(hits)
    }

    /// Like [`search`](Self::search) with the model named by `selector` (`boolean`, `vsm` or `bm25`).
    pub fn search_by_name(&self, query: &[String], selector: &str, top_n: usize) -> Result<Vec<ScoredDoc>> {
        let kind: ModelKind = selector.parse()?;
        self.search(query, kind, top_n)
    }

    /// Raw text of a document, or [`MISSING_DOCUMENT_TEXT`].
    pub fn document_text(&self, doc_id: &str) -> &str {
        self.ready
            .as_ref()
            .and_then(|r| r.documents.get(doc_id))
            .map(String::as_str)
            .unwrap_or(MISSING_DOCUMENT_TEXT)
    }
}

impl Default for SearchEngine {
    fn default() -> Self { Self::new(EngineConfig::default()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str, tokens: &[&str], text: Option<&str>) -> CorpusDocument {
        CorpusDocument {
            id: id.to_string(),
            tokens: tokens.iter().map(|t| t.to_string()).collect(),
            text: text.map(str::to_string),
        }
    }

    fn q(tokens: &[&str]) -> Vec<String> { tokens.iter().map(|t| t.to_string()).collect() }

    #[test]
    fn search_before_build_is_not_ready() {
        let engine = SearchEngine::default();
        assert!(!engine.is_ready());
        assert_eq!(engine.search(&q(&["a"]), ModelKind::Bm25, 10), Err(Error::NotReady));
        assert!(engine.index().is_err());
    }

    #[test]
    fn unknown_selector_fails_before_readiness_matters() {
        let engine = SearchEngine::default();
        assert_eq!(engine.search_by_name(&q(&["a"]), "lsi", 10), Err(Error::UnknownModel("lsi".into())));
    }

    #[test]
    fn every_model_answers_after_build() {
        let mut engine = SearchEngine::default();
        engine.build(vec![doc("1", &["a", "b"], Some("A B")), doc("2", &["b", "c"], None)]);
        for kind in ModelKind::ALL {
            let hits = engine.search(&q(&["b"]), kind, 10).unwrap();
            assert_eq!(hits.len(), 2, "{kind}");
            assert!(engine.search(&[], kind, 10).unwrap().is_empty());
            assert!(engine.search(&q(&["b"]), kind, 0).unwrap().is_empty());
        }
    }

    #[test]
    fn missing_text_degrades_to_placeholder() {
        let mut engine = SearchEngine::default();
        engine.build(vec![doc("1", &["a"], Some("alpha")), doc("2", &["b"], None)]);
        assert_eq!(engine.document_text("1"), "alpha");
        assert_eq!(engine.document_text("2"), MISSING_DOCUMENT_TEXT);
        assert_eq!(engine.document_text("404"), MISSING_DOCUMENT_TEXT);
    }

    #[test]
    fn repeated_id_drops_text_of_earlier_copy() {
        let mut engine = SearchEngine::default();
        engine.build(vec![doc("x", &["old"], Some("old")), doc("x", &["new"], None)]);
        let hits = engine.search(&q(&["new"]), ModelKind::Bm25, 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].doc_id, "x");
        assert!(engine.search(&q(&["old"]), ModelKind::Bm25, 10).unwrap().is_empty());
        assert_eq!(engine.document_text("x"), MISSING_DOCUMENT_TEXT);

        engine.build(vec![doc("y", &["a"], None), doc("y", &["b"], Some("second"))]);
        assert_eq!(engine.document_text("y"), "second");
    }
}
