use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ranklab_core::eval::{EvalConfig, EvaluationReport, Evaluator, GroundTruth};
use ranklab_core::persist::{
    load_ground_truth, load_processor_config, save_ground_truth, save_processor_config, IndexPaths,
};
use ranklab_core::tokenizer::{TextProcessor, TextProcessorConfig};
use ranklab_core::{Bm25Params, CorpusDocument, EngineConfig, ModelKind, SearchEngine};
use serde::Deserialize;
use tracing_subscriber::{EnvFilter, fmt};
use walkdir::WalkDir;

use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InputId {
    Text(String),
    Number(i64),
}

#[derive(Debug, Deserialize)]
struct InputDoc {
    id: InputId,
    #[serde(default)]
    title: Option<String>,
    #[serde(alias = "body")]
    text: Option<String>,
}

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build a retrieval index and evaluate Boolean, VSM and BM25 ranking", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index from input JSON/JSONL files or a directory
    Build {
        /// Input path (file or directory)
        #[arg(long)]
        input: String,
        /// Output index directory
        #[arg(long)]
        output: String,
        /// Index surface forms instead of English stems
        #[arg(long, default_value_t = false)]
        no_stem: bool,
        /// Keep stopwords in the index
        #[arg(long, default_value_t = false)]
        keep_stopwords: bool,
    },
    /// Run judged queries through one or all models and report metrics
    Evaluate {
        /// Index directory produced by `build`
        #[arg(long)]
        index: String,
        /// JSONL judgments `{"qid", "question", "relevant"}`; cached in the index directory.
        /// When omitted the cached copy is used.
        #[arg(long)]
        ground_truth: Option<String>,
        /// `all`, `boolean`, `vsm` or `bm25`
        #[arg(long, default_value = "all")]
        method: String,
        /// Documents retrieved per query
        #[arg(long, default_value_t = 10)]
        top_n: usize,
        /// Cut-offs for precision/recall/F1
        #[arg(long, value_delimiter = ',', default_values_t = vec![1, 2, 3, 5, 10])]
        k: Vec<usize>,
        #[arg(long, default_value_t = 1.5)]
        k1: f64,
        #[arg(long, default_value_t = 0.75)]
        b: f64,
        /// Write the reports as JSON to this path
        #[arg(long)]
        output: Option<String>,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, output, no_stem, keep_stopwords } => {
            let config = TextProcessorConfig { stem: !no_stem, remove_stopwords: !keep_stopwords, ..Default::default() };
            build_index(&input, &output, config)
        }
        Commands::Evaluate { index, ground_truth, method, top_n, k, k1, b, output } => {
            let models = if method.eq_ignore_ascii_case("all") {
                ModelKind::ALL.to_vec()
            } else {
                vec![method.parse::<ModelKind>()?]
            };
            let engine_config = EngineConfig { bm25: Bm25Params { k1, b } };
            let eval_config = EvalConfig { k_values: k, top_n };
            evaluate(&index, ground_truth.as_deref(), &models, engine_config, eval_config, output.as_deref())
        }
    }
}

fn collect_input_files(input_path: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = Vec::new();
    if input_path.is_dir() {
        for entry in WalkDir::new(input_path).into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() {
                if let Some(ext) = p.extension().and_then(|s| s.to_str()) {
                    if matches!(ext, "json" | "jsonl") {
                        files.push(p.to_path_buf());
                    }
                }
            }
        }
        files.sort();
    } else if input_path.is_file() {
        files.push(input_path.to_path_buf());
    }
    files
}

fn build_index(input: &str, output: &str, config: TextProcessorConfig) -> Result<()> {
    let files = collect_input_files(Path::new(input));
    if files.is_empty() {
        tracing::warn!(input, "no .json or .jsonl input found; building an empty index");
    }

    let processor = TextProcessor::new(config);
    let mut corpus: Vec<CorpusDocument> = Vec::new();
    for file in files {
        let docs = if file.extension().and_then(|s| s.to_str()) == Some("jsonl") {
            read_jsonl(&file)?
        } else {
            read_json(&file)?
        };
        tracing::debug!(file = %file.display(), docs = docs.len(), "read input file");
        corpus.extend(docs.into_iter().map(|doc| to_corpus_document(doc, &processor)));
    }
    tracing::info!(num_docs = corpus.len(), "ingested documents");

    let mut engine = SearchEngine::default();
    engine.build(corpus);
    let out_paths = IndexPaths::new(output);
    engine.save(&out_paths)?;
    save_processor_config(&out_paths, processor.config())?;

    tracing::info!(output, "index build complete");
    Ok(())
}

fn to_corpus_document(doc: InputDoc, processor: &TextProcessor) -> CorpusDocument {
    let id = match doc.id {
        InputId::Text(s) => s,
        InputId::Number(n) => n.to_string(),
    };
    // title terms come first, then the body
    let tokens = [doc.title.as_deref(), doc.text.as_deref()]
        .into_iter()
        .flatten()
        .flat_map(|t| processor.process(t))
        .collect();
    CorpusDocument { id, tokens, text: doc.text }
}

fn read_jsonl(file: &Path) -> Result<Vec<InputDoc>> {
    let f = File::open(file)?;
    let reader = BufReader::new(f);
    let mut docs = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() { continue; }
        let doc: InputDoc = serde_json::from_str(&line).with_context(|| format!("parsing {}", file.display()))?;
        docs.push(doc);
    }
    Ok(docs)
}

fn read_json(file: &Path) -> Result<Vec<InputDoc>> {
    let f = File::open(file)?;
    let reader = BufReader::new(f);
    let json: serde_json::Value = serde_json::from_reader(reader)?;
    let docs = match json {
        serde_json::Value::Array(arr) => {
            arr.into_iter().map(serde_json::from_value).collect::<Result<Vec<InputDoc>, _>>()?
        }
        serde_json::Value::Object(_) => vec![serde_json::from_value(json)?],
        _ => Vec::new(),
    };
    Ok(docs)
}

fn evaluate(
    index: &str,
    ground_truth: Option<&str>,
    models: &[ModelKind],
    engine_config: EngineConfig,
    eval_config: EvalConfig,
    output: Option<&str>,
) -> Result<()> {
    let paths = IndexPaths::new(index);
    let mut engine = SearchEngine::new(engine_config);
    engine.load(&paths)?;
    let processor = TextProcessor::new(load_processor_config(&paths)?);

    let truth = match ground_truth {
        Some(file) => {
            let reader = BufReader::new(File::open(file).with_context(|| format!("opening {file}"))?);
            let truth = GroundTruth::from_jsonl(reader, |q| processor.process_query(q))?;
            save_ground_truth(&paths, &truth)?;
            truth
        }
        None => load_ground_truth(&paths).context("no cached ground truth; pass --ground-truth")?,
    };
    tracing::info!(queries = truth.len(), "loaded ground truth");

    let evaluator = Evaluator::new(&engine, eval_config);
    let reports: Vec<EvaluationReport> = models.iter().map(|&kind| evaluator.evaluate(&truth, kind)).collect();
    for report in &reports {
        print_summary(report);
    }

    if let Some(out) = output {
        fs::write(out, serde_json::to_string_pretty(&reports)?)?;
        tracing::info!(output = out, "wrote evaluation report");
    }
    Ok(())
}

fn print_summary(report: &EvaluationReport) {
    let rule = "=".repeat(60);
    println!("\n{rule}");
    println!("  EVALUATION RESULTS  method={}  top_n={}", report.model, report.top_n);
    println!(
        "  Queries: {} evaluated, {} skipped, {} failed   Time: {:.2}s",
        report.total_queries, report.skipped_queries, report.failed_queries, report.elapsed_seconds
    );
    println!("{rule}");
    println!("{:<20} {:>10}", "Metric", "Value");
    println!("{}", "-".repeat(31));
    for (k, v) in &report.precision {
        println!("  {:<18} {:>10.4}", format!("precision@{k}"), v);
    }
    for (k, v) in &report.recall {
        println!("  {:<18} {:>10.4}", format!("recall@{k}"), v);
    }
    for (k, v) in &report.f1 {
        println!("  {:<18} {:>10.4}", format!("f1@{k}"), v);
    }
    println!("  {:<18} {:>10.4}", "mrr", report.mrr);
    println!("  {:<18} {:>10.4}", "map", report.map);
    println!("{rule}\n");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(json: &str) -> InputDoc { serde_json::from_str(json).unwrap() }

    #[test]
    fn title_terms_are_indexed_ahead_of_body() {
        let processor = TextProcessor::default();
        let d = to_corpus_document(doc(r#"{"id": 7, "title": "Gardening", "text": "Spring tips"}"#), &processor);
        assert_eq!(d.id, "7");
        assert_eq!(d.tokens, vec!["garden", "spring", "tip"]);
        assert_eq!(d.text.as_deref(), Some("Spring tips"));
    }

    #[test]
    fn title_only_and_body_alias() {
        let processor = TextProcessor::default();
        let d = to_corpus_document(doc(r#"{"id": "a", "title": "Gardening"}"#), &processor);
        assert_eq!(d.tokens, vec!["garden"]);
        assert!(d.text.is_none());

        let d = to_corpus_document(doc(r#"{"id": "b", "body": "Spring"}"#), &processor);
        assert_eq!(d.tokens, vec!["spring"]);
    }
}
