use crate::DocId;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::io::BufRead;

pub type QueryId = String;

/// One judged query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Judgment {
    pub query: String,
    pub tokens: Vec<String>,
    pub relevant: HashSet<DocId>,
}

/// Judged queries keyed by query id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroundTruth {
    queries: BTreeMap<QueryId, Judgment>,
}

// Ids in judgment files are either strings or bare integers.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(i64),
}

impl From<RawId> for String {
    fn from(id: RawId) -> Self {
        match id {
            RawId::Text(s) => s,
            RawId::Number(n) => n.to_string(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawRelevant {
    Many(Vec<RawId>),
    One(RawId),
}

#[derive(Deserialize)]
struct RawRecord {
    qid: RawId,
    question: String,
    relevant: RawRelevant,
}

impl GroundTruth {
    pub fn new() -> Self { Self::default() }

    /// Insert a judgment. The first judgment seen for a query id is kept.
    pub fn insert(&mut self, qid: impl Into<QueryId>, judgment: Judgment) -> bool {
        let qid = qid.into();
        if self.queries.contains_key(&qid) {
            tracing::debug!(%qid, "duplicate query id ignored");
            return false;
        }
        self.queries.insert(qid, judgment);
        true
    }

    pub fn get(&self, qid: &str) -> Option<&Judgment> { self.queries.get(qid) }

    pub fn iter(&self) -> impl Iterator<Item = (&QueryId, &Judgment)> + '_ { self.queries.iter() }

    pub fn len(&self) -> usize { self.queries.len() }

    pub fn is_empty(&self) -> bool { self.queries.is_empty() }

    /// Parse JSONL lines `{"qid", "question", "relevant"}`, tokenizing each question with `tokenize`.
    pub fn from_jsonl<R, F>(reader: R, tokenize: F) -> Result<Self>
    where
        R: BufRead,
        F: Fn(&str) -> Vec<String>,
    {
        let mut truth = Self::new();
        for (lineno, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record: RawRecord =
                serde_json::from_str(&line).with_context(|| format!("ground truth line {}", lineno + 1))?;
            let relevant = match record.relevant {
                RawRelevant::Many(ids) => ids.into_iter().map(String::from).collect(),
                RawRelevant::One(id) => HashSet::from([String::from(id)]),
            };
            let tokens = tokenize(&record.question);
            truth.insert(record.qid, Judgment { query: record.question, tokens, relevant });
        }
        Ok(truth)
    }
}
