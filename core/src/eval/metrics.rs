//! Ranking-quality metrics over a ranked list of retrieved ids and a set of relevant ids.
//!
//! Every ratio is guarded: an empty denominator yields `0.0`.

use crate::DocId;
use std::collections::HashSet;

fn hits_at_k(retrieved: &[DocId], relevant: &HashSet<DocId>, k: usize) -> usize {
    retrieved.iter().take(k).filter(|id| relevant.contains(*id)).count()
}

/// `|retrieved[:k] ∩ relevant| / k`
pub fn precision_at_k(retrieved: &[DocId], relevant: &HashSet<DocId>, k: usize) -> f64 {
    if k == 0 {
        return 0.0;
    }
    hits_at_k(retrieved, relevant, k) as f64 / k as f64
}

/// `|retrieved[:k] ∩ relevant| / |relevant|`
pub fn recall_at_k(retrieved: &[DocId], relevant: &HashSet<DocId>, k: usize) -> f64 {
    if relevant.is_empty() {
        return 0.0;
    }
    hits_at_k(retrieved, relevant, k) as f64 / relevant.len() as f64
}

pub fn f1_at_k(retrieved: &[DocId], relevant: &HashSet<DocId>, k: usize) -> f64 {
    if relevant.is_empty() || k == 0 {
        return 0.0;
    }
    let p = precision_at_k(retrieved, relevant, k);
    let r = recall_at_k(retrieved, relevant, k);
    if p + r == 0.0 {
        return 0.0;
    }
    2.0 * p * r / (p + r)
}

/// Inverse 1-based rank of the first relevant hit.
pub fn reciprocal_rank(retrieved: &[DocId], relevant: &HashSet<DocId>) -> f64 {
    retrieved
        .iter()
        .position(|id| relevant.contains(id))
        .map(|i| 1.0 / (i + 1) as f64)
        .unwrap_or(0.0)
}

/// Mean of precision at each relevant hit, divided by the size of the relevant set.
pub fn average_precision(retrieved: &[DocId], relevant: &HashSet<DocId>) -> f64 {
    if relevant.is_empty() {
        return 0.0;
    }
    let mut hits = 0usize;
    let mut sum = 0.0;
    for (i, id) in retrieved.iter().enumerate() {
        if relevant.contains(id) {
            hits += 1;
            sum += hits as f64 / (i + 1) as f64;
        }
    }
    sum / relevant.len() as f64
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Mean reciprocal rank across a batch of `(retrieved, relevant)` runs.
pub fn mean_reciprocal_rank<'a, I>(runs: I) -> f64
where
    I: IntoIterator<Item = (&'a [DocId], &'a HashSet<DocId>)>,
{
    let values: Vec<f64> = runs.into_iter().map(|(r, rel)| reciprocal_rank(r, rel)).collect();
    mean(&values)
}

pub fn mean_average_precision<'a, I>(runs: I) -> f64
where
    I: IntoIterator<Item = (&'a [DocId], &'a HashSet<DocId>)>,
{
    let values: Vec<f64> = runs.into_iter().map(|(r, rel)| average_precision(r, rel)).collect();
    mean(&values)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(v: &[&str]) -> Vec<DocId> { v.iter().map(|s| s.to_string()).collect() }
    fn set(v: &[&str]) -> HashSet<DocId> { v.iter().map(|s| s.to_string()).collect() }

    #[test]
    fn zero_guards() {
        let retrieved = ids(&["d1"]);
        assert_eq!(precision_at_k(&retrieved, &set(&["d1"]), 0), 0.0);
        assert_eq!(recall_at_k(&retrieved, &set(&[]), 1), 0.0);
        assert_eq!(f1_at_k(&retrieved, &set(&["d9"]), 1), 0.0);
        assert_eq!(average_precision(&retrieved, &set(&[])), 0.0);
        assert_eq!(reciprocal_rank(&[], &set(&["d1"])), 0.0);
        assert_eq!(mean(&[]), 0.0);
    }

    #[test]
    fn precision_divides_by_k_even_past_list_end() {
        assert_eq!(precision_at_k(&ids(&["d1"]), &set(&["d1"]), 4), 0.25);
    }

    #[test]
    fn empty_batch_means_are_zero() {
        let none: Vec<(&[DocId], &HashSet<DocId>)> = Vec::new();
        assert_eq!(mean_reciprocal_rank(none.clone()), 0.0);
        assert_eq!(mean_average_precision(none), 0.0);
    }
}
