use crate::eval::GroundTruth;
use crate::tokenizer::TextProcessorConfig;
use crate::{DocId, InvertedIndex};
use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{create_dir_all, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: u32,
    pub num_terms: usize,
    pub avg_doc_length: f64,
    pub created_at: String,
    pub version: u32,
}

impl MetaFile {
    pub fn describe(index: &InvertedIndex) -> Self {
        let created_at = time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_default();
        Self {
            num_docs: index.total_docs(),
            num_terms: index.num_terms(),
            avg_doc_length: index.avg_doc_length(),
            created_at,
            version: FORMAT_VERSION,
        }
    }
}

/// Layout of an index directory.
pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    fn index(&self) -> PathBuf { self.root.join("index.bin") }
    fn documents(&self) -> PathBuf { self.root.join("documents.bin") }
    fn meta(&self) -> PathBuf { self.root.join("meta.json") }
    fn ground_truth(&self) -> PathBuf { self.root.join("ground_truth.bin") }
    fn processor(&self) -> PathBuf { self.root.join("processor.json") }
}

fn write_bincode<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut f = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let bytes = bincode::serialize(value)?;
    f.write_all(&bytes)?;
    Ok(())
}

fn read_bincode<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let mut f = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf)?;
    let value = bincode::deserialize(&buf).with_context(|| format!("decoding {}", path.display()))?;
    Ok(value)
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root)?;
    let mut f = File::create(paths.meta())?;
    let json = serde_json::to_string_pretty(meta)?;
    f.write_all(json.as_bytes())?;
    Ok(())
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    let mut f = File::open(paths.meta()).with_context(|| format!("no index at {}", paths.root.display()))?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let meta: MetaFile = serde_json::from_str(&buf)?;
    Ok(meta)
}

/// Write the index, the raw-document store and `meta.json`.
pub fn save_index(paths: &IndexPaths, index: &InvertedIndex, documents: &HashMap<DocId, String>) -> Result<()> {
    create_dir_all(&paths.root)?;
    write_bincode(&paths.index(), index)?;
    write_bincode(&paths.documents(), documents)?;
    let meta = MetaFile::describe(index);
    save_meta(paths, &meta)?;
    tracing::info!(root = %paths.root.display(), num_docs = meta.num_docs, "saved index");
    Ok(())
}

pub fn load_index(paths: &IndexPaths) -> Result<(InvertedIndex, HashMap<DocId, String>, MetaFile)> {
    let meta = load_meta(paths)?;
    if meta.version != FORMAT_VERSION {
        bail!("index format version {} is not supported (expected {})", meta.version, FORMAT_VERSION);
    }
    let index: InvertedIndex = read_bincode(&paths.index())?;
    let documents = read_bincode(&paths.documents())?;
    if index.total_docs() != meta.num_docs {
        bail!("index holds {} documents but meta.json records {}", index.total_docs(), meta.num_docs);
    }
    Ok((index, documents, meta))
}

pub fn save_ground_truth(paths: &IndexPaths, ground_truth: &GroundTruth) -> Result<()> {
    create_dir_all(&paths.root)?;
    write_bincode(&paths.ground_truth(), ground_truth)
}

pub fn load_ground_truth(paths: &IndexPaths) -> Result<GroundTruth> {
    read_bincode(&paths.ground_truth())
}

/// Record how documents were tokenized so queries can be processed the same way.
pub fn save_processor_config(paths: &IndexPaths, config: &TextProcessorConfig) -> Result<()> {
    create_dir_all(&paths.root)?;
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(paths.processor(), json)?;
    Ok(())
}

/// Falls back to the default configuration when the index directory has none.
pub fn load_processor_config(paths: &IndexPaths) -> Result<TextProcessorConfig> {
    let path = paths.processor();
    if !path.exists() {
        return Ok(TextProcessorConfig::default());
    }
    let json = std::fs::read_to_string(&path)?;
    Ok(serde_json::from_str(&json)?)
}
