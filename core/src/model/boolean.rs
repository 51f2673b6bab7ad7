use super::{ModelKind, RetrievalModel};
use crate::{DocId, InvertedIndex, ScoredDoc};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Score attached to every Boolean match. It marks membership, not similarity.
pub const BOOLEAN_MATCH_SCORE: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    And,
    Or,
    Not,
}

impl Operator {
    /// Operator tokens are matched exactly, in upper case.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "AND" => Some(Operator::And),
            "OR" => Some(Operator::Or),
            "NOT" => Some(Operator::Not),
            _ => None,
        }
    }
}

/// Unranked set matching over postings.
pub struct BooleanModel {
    index: Arc<InvertedIndex>,
}

impl BooleanModel {
    pub fn new(index: Arc<InvertedIndex>) -> Self { Self { index } }

    /// Split `query` around the operator token. Terms before the first operator
    /// form the first group, everything after the second; the last operator seen wins.
    pub fn parse(query: &[String]) -> (Operator, Vec<&str>, Vec<&str>) {
        let mut operator = None;
        let mut first = Vec::new();
        let mut second = Vec::new();
        for token in query {
            if let Some(op) = Operator::from_token(token) {
                operator = Some(op);
                continue;
            }
            if operator.is_none() { first.push(token.as_str()) } else { second.push(token.as_str()) }
        }
        (operator.unwrap_or(Operator::And), first, second)
    }

    /// Documents matching `query`.
    ///
    /// `NOT` excludes the terms of both groups from the whole corpus; it does not
    /// compute "first group minus second group".
    pub fn matching(&self, query: &[String]) -> BTreeSet<DocId> {
        if query.is_empty() {
            return BTreeSet::new();
        }
        let (operator, first, second) = Self::parse(query);
        let mut terms = first.into_iter().chain(second);
        match operator {
            Operator::And => {
                let Some(head) = terms.next() else { return BTreeSet::new() };
                let mut result = self.index.docs_containing(head).clone();
                for term in terms {
                    let docs = self.index.docs_containing(term);
                    result.retain(|d| docs.contains(d));
                    if result.is_empty() {
                        break;
                    }
                }
                result
            }
            Operator::Or => terms.flat_map(|t| self.index.docs_containing(t)).cloned().collect(),
            Operator::Not => {
                let excluded: BTreeSet<&DocId> = terms.flat_map(|t| self.index.docs_containing(t)).collect();
                self.index.doc_ids().filter(|d| !excluded.contains(d)).cloned().collect()
            }
        }
    }
}

impl RetrievalModel for BooleanModel {
    fn kind(&self) -> ModelKind { ModelKind::Boolean }

    fn search(&self, query: &[String], top_n: usize) -> Vec<ScoredDoc> {
        if top_n == 0 {
            return Vec::new();
        }
        self.matching(query)
            .into_iter()
            .take(top_n)
            .map(|doc_id| ScoredDoc { doc_id, score: BOOLEAN_MATCH_SCORE })
            .collect()
    }
}
