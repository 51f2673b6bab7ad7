/// Errors surfaced by the search call surface.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// `search` was called before the engine was built or loaded.
    #[error("search engine is not ready: build or load an index first")]
    NotReady,
    /// The model selector did not name a known retrieval model.
    #[error("unknown retrieval model {0:?} (expected one of: boolean, vsm, bm25)")]
    UnknownModel(String),
}

pub type Result<T> = std::result::Result<T, Error>;
