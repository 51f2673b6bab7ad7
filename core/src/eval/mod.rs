//! Retrieval-quality evaluation against relevance judgments.

mod evaluator;
mod ground_truth;
pub mod metrics;

pub use evaluator::{EvalConfig, EvaluationReport, Evaluator, QueryMetrics};
pub use ground_truth::{GroundTruth, Judgment, QueryId};
