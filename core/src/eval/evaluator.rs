use super::ground_truth::{GroundTruth, Judgment, QueryId};
use super::metrics::{average_precision, f1_at_k, mean, precision_at_k, recall_at_k, reciprocal_rank};
use crate::error::Result;
use crate::{DocId, ModelKind, ScoredDoc, SearchEngine};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;

const PROGRESS_EVERY: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    /// Cut-offs for precision, recall and F1.
    pub k_values: Vec<usize>,
    /// Documents retrieved per query.
    pub top_n: usize,
}

impl Default for EvalConfig {
    fn default() -> Self { Self { k_values: vec![1, 2, 3, 5, 10], top_n: 10 } }
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryMetrics {
    pub qid: QueryId,
    pub query: String,
    pub retrieved: usize,
    pub precision: BTreeMap<usize, f64>,
    pub recall: BTreeMap<usize, f64>,
    pub f1: BTreeMap<usize, f64>,
    pub rr: f64,
    pub ap: f64,
}

/// Aggregate over every evaluated query. Means are taken across queries.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    pub model: String,
    pub top_n: usize,
    pub total_queries: usize,
    pub skipped_queries: usize,
    pub failed_queries: usize,
    pub precision: BTreeMap<usize, f64>,
    pub recall: BTreeMap<usize, f64>,
    pub f1: BTreeMap<usize, f64>,
    pub mrr: f64,
    pub map: f64,
    pub elapsed_seconds: f64,
    pub per_query: Vec<QueryMetrics>,
}

pub struct Evaluator<'e> {
    engine: &'e SearchEngine,
    config: EvalConfig,
}

impl<'e> Evaluator<'e> {
    pub fn new(engine: &'e SearchEngine, config: EvalConfig) -> Self { Self { engine, config } }

    pub fn evaluate(&self, ground_truth: &GroundTruth, kind: ModelKind) -> EvaluationReport {
        let top_n = self.config.top_n;
        self.evaluate_with(ground_truth, kind.as_str(), |judgment| {
            self.engine.search(&judgment.tokens, kind, top_n)
        })
    }

    /// Evaluate every model in turn.
    pub fn evaluate_all(&self, ground_truth: &GroundTruth) -> Vec<EvaluationReport> {
        ModelKind::ALL.iter().map(|&kind| self.evaluate(ground_truth, kind)).collect()
    }

    /// Drive `retrieve` over every judged query. A query whose retrieval fails
    /// is logged and scored as an empty ranking; queries without relevant
    /// documents are skipped and not counted.
    pub fn evaluate_with<F>(&self, ground_truth: &GroundTruth, label: &str, mut retrieve: F) -> EvaluationReport
    where
        F: FnMut(&Judgment) -> Result<Vec<ScoredDoc>>,
    {
        let start = Instant::now();
        let mut per_query = Vec::with_capacity(ground_truth.len());
        let mut skipped = 0;
        let mut failed = 0;

        for (qid, judgment) in ground_truth.iter() {
            if judgment.relevant.is_empty() {
                tracing::warn!(%qid, "query has no relevant documents, skipping");
                skipped += 1;
                continue;
            }
            let retrieved: Vec<DocId> = match retrieve(judgment) {
                Ok(hits) => hits.into_iter().map(|h| h.doc_id).collect(),
                Err(err) => {
                    tracing::warn!(%qid, error = %err, "query failed, scoring as empty retrieval");
                    failed += 1;
                    Vec::new()
                }
            };
            per_query.push(self.score_query(qid, judgment, &retrieved));

            if per_query.len() % PROGRESS_EVERY == 0 {
                tracing::info!(
                    model = label,
                    evaluated = per_query.len(),
                    total = ground_truth.len(),
                    elapsed_s = start.elapsed().as_secs_f64(),
                    "evaluation progress"
                );
            }
        }

        let report = self.aggregate(label, per_query, skipped, failed, start.elapsed().as_secs_f64());
        tracing::info!(
            model = label,
            queries = report.total_queries,
            skipped = report.skipped_queries,
            failed = report.failed_queries,
            mrr = report.mrr,
            map = report.map,
            "evaluation finished"
        );
        report
    }

    fn score_query(&self, qid: &QueryId, judgment: &Judgment, retrieved: &[DocId]) -> QueryMetrics {
        let relevant = &judgment.relevant;
        let mut metrics = QueryMetrics {
            qid: qid.clone(),
            query: judgment.query.clone(),
            retrieved: retrieved.len(),
            precision: BTreeMap::new(),
            recall: BTreeMap::new(),
            f1: BTreeMap::new(),
            rr: reciprocal_rank(retrieved, relevant),
            ap: average_precision(retrieved, relevant),
        };
        for &k in &self.config.k_values {
            metrics.precision.insert(k, precision_at_k(retrieved, relevant, k));
            metrics.recall.insert(k, recall_at_k(retrieved, relevant, k));
            metrics.f1.insert(k, f1_at_k(retrieved, relevant, k));
        }
        metrics
    }

    fn aggregate(
        &self,
        label: &str,
        per_query: Vec<QueryMetrics>,
        skipped: usize,
        failed: usize,
        elapsed_seconds: f64,
    ) -> EvaluationReport {
        let mut precision = BTreeMap::new();
        let mut recall = BTreeMap::new();
        let mut f1 = BTreeMap::new();
        for &k in &self.config.k_values {
            precision.insert(k, mean_at(&per_query, k, |q| &q.precision));
            recall.insert(k, mean_at(&per_query, k, |q| &q.recall));
            f1.insert(k, mean_at(&per_query, k, |q| &q.f1));
        }
        let rr: Vec<f64> = per_query.iter().map(|q| q.rr).collect();
        let ap: Vec<f64> = per_query.iter().map(|q| q.ap).collect();

        EvaluationReport {
            model: label.to_string(),
            top_n: self.config.top_n,
            total_queries: per_query.len(),
            skipped_queries: skipped,
            failed_queries: failed,
            precision,
            recall,
            f1,
            mrr: mean(&rr),
            map: mean(&ap),
            elapsed_seconds,
            per_query,
        }
    }
}

fn mean_at(per_query: &[QueryMetrics], k: usize, pick: impl Fn(&QueryMetrics) -> &BTreeMap<usize, f64>) -> f64 {
    let values: Vec<f64> = per_query.iter().map(|q| pick(q).get(&k).copied().unwrap_or(0.0)).collect();
    mean(&values)
}
