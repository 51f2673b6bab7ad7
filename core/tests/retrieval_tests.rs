use ranklab_core::{
    Bm25Model, Bm25Params, BooleanModel, InvertedIndex, RetrievalModel, VectorSpaceModel,
};
use std::collections::BTreeSet;
use std::sync::Arc;

fn q(tokens: &[&str]) -> Vec<String> { tokens.iter().map(|t| t.to_string()).collect() }

fn tiny() -> InvertedIndex {
    InvertedIndex::build(vec![
        ("1", vec!["a", "b"]),
        ("2", vec!["b", "c"]),
        ("3", vec!["a", "c"]),
    ])
}

fn set(ids: &[&str]) -> BTreeSet<String> { ids.iter().map(|s| s.to_string()).collect() }

#[test]
fn index_statistics() {
    let idx = tiny();
    assert_eq!(idx.doc_frequency("a"), 2);
    assert_eq!(idx.doc_frequency("b"), 2);
    assert_eq!(idx.doc_frequency("z"), 0);
    assert_eq!(idx.avg_doc_length(), 2.0);
    assert_eq!(idx.total_docs(), 3);
    assert_eq!(idx.docs_containing("a"), &set(&["1", "3"]));
    assert!(idx.docs_containing("z").is_empty());
}

#[test]
fn boolean_and_or() {
    let model = BooleanModel::new(Arc::new(tiny()));
    assert_eq!(model.matching(&q(&["a", "c"])), set(&["3"]));
    assert_eq!(model.matching(&q(&["a", "OR", "b"])), set(&["1", "2", "3"]));
}

#[test]
fn bm25_is_monotonic_in_term_frequency() {
    // every document has length 4 and "x" appears in each, so df and avgdl are fixed
    let idx = Arc::new(InvertedIndex::build(vec![
        ("d0", vec!["y", "y", "y", "y"]),
        ("d1", vec!["x", "y", "y", "y"]),
        ("d2", vec!["x", "x", "y", "y"]),
        ("d3", vec!["x", "x", "x", "y"]),
        ("d4", vec!["x", "x", "x", "x"]),
    ]));
    let model = Bm25Model::new(idx, Bm25Params::default());
    let scores: Vec<f64> = ["d1", "d2", "d3", "d4"].iter().map(|d| model.term_score("x", d)).collect();
    assert!(scores.windows(2).all(|w| w[1] >= w[0]), "{scores:?}");
    assert_eq!(model.term_score("x", "d0"), 0.0);
}

#[test]
fn ranked_models_only_return_candidates() {
    let idx = Arc::new(InvertedIndex::build(vec![
        ("1", vec!["apple", "pie"]),
        ("2", vec!["banana", "split"]),
        ("3", vec!["apple", "apple", "tart"]),
        ("4", vec!["cherry"]),
    ]));
    let query = q(&["apple", "cherry", "missing"]);
    let allowed: BTreeSet<&String> = query.iter().flat_map(|t| idx.docs_containing(t)).collect();
    let models: Vec<Box<dyn RetrievalModel>> = vec![
        Box::new(VectorSpaceModel::new(Arc::clone(&idx))),
        Box::new(Bm25Model::new(Arc::clone(&idx), Bm25Params::default())),
    ];
    for model in &models {
        let hits = model.search(&query, 10);
        assert!(!hits.is_empty());
        for hit in hits {
            assert!(allowed.contains(&hit.doc_id), "{:?} returned {}", model.kind(), hit.doc_id);
        }
    }
}

#[test]
fn build_is_deterministic() {
    let forward = InvertedIndex::build(vec![("1", vec!["a", "b"]), ("2", vec!["b", "c"]), ("3", vec!["a", "c"])]);
    let reversed = InvertedIndex::build(vec![("3", vec!["a", "c"]), ("2", vec!["b", "c"]), ("1", vec!["a", "b"])]);
    assert_eq!(forward, reversed);
    assert_eq!(forward, tiny());
    for term in ["a", "b", "c"] {
        assert_eq!(forward.postings(term), reversed.postings(term));
        assert_eq!(forward.doc_frequency(term), reversed.doc_frequency(term));
    }
    assert_eq!(forward.avg_doc_length(), reversed.avg_doc_length());
}

#[test]
fn repeated_queries_are_idempotent() {
    let idx = Arc::new(tiny());
    let vsm = VectorSpaceModel::new(Arc::clone(&idx));
    let bm25 = Bm25Model::new(Arc::clone(&idx), Bm25Params::default());
    let boolean = BooleanModel::new(idx);
    let query = q(&["a", "c", "c"]);
    for model in [&vsm as &dyn RetrievalModel, &bm25, &boolean] {
        let first = model.search(&query, 10);
        let second = model.search(&query, 10);
        assert_eq!(first, second);
    }
}

#[test]
fn concurrent_queries_share_one_model() {
    let idx = Arc::new(tiny());
    let model = Arc::new(Bm25Model::new(idx, Bm25Params::default()));
    let expected = model.search(&q(&["a", "b"]), 3);
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let model = Arc::clone(&model);
            std::thread::spawn(move || model.search(&q(&["a", "b"]), 3))
        })
        .collect();
    for h in handles {
        assert_eq!(h.join().unwrap(), expected);
    }
}
