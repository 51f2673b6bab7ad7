use anyhow::Result;
use axum::{extract::{Path, Query, State}, http::StatusCode, response::{IntoResponse, Response}, routing::get, Json, Router};
use ranklab_core::persist::{load_processor_config, IndexPaths};
use ranklab_core::tokenizer::TextProcessor;
use ranklab_core::{EngineConfig, ModelKind, SearchEngine};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Upper bound on `k` per request.
pub const MAX_K: i64 = 100;

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default = "default_k")]
    pub k: i64,
}
fn default_method() -> String { ModelKind::Bm25.to_string() }
fn default_k() -> i64 { 10 }

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub method: ModelKind,
    pub took_s: f64,
    pub total_hits: usize,
    pub results: Vec<SearchHit>,
}

#[derive(Serialize)]
pub struct SearchHit {
    pub rank: usize,
    pub doc_id: String,
    /// Boolean matches all carry the same constant score.
    pub score: f64,
    pub text: String,
}

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SearchEngine>,
    pub processor: TextProcessor,
}

/// Errors returned as `{"error": message}`.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    ServiceUnavailable(String),
}

impl From<ranklab_core::Error> for ApiError {
    fn from(err: ranklab_core::Error) -> Self {
        match err {
            ranklab_core::Error::UnknownModel(_) => ApiError::BadRequest(err.to_string()),
            ranklab_core::Error::NotReady => ApiError::ServiceUnavailable(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

pub fn build_app(index_dir: String, config: EngineConfig) -> Result<Router> {
    // Load the persisted index at startup; it is read-only from here on
    let index_paths = IndexPaths::new(&index_dir);
    let mut engine = SearchEngine::new(config);
    engine.load(&index_paths)?;
    let processor = TextProcessor::new(load_processor_config(&index_paths)?);
    Ok(router(AppState { engine: Arc::new(engine), processor }))
}

pub fn router(app_state: AppState) -> Router {
    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/doc/:doc_id", get(doc_handler))
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn search_handler(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Result<Json<SearchResponse>, ApiError> {
    let start = std::time::Instant::now();
    // Fail fast on an unknown model before doing any work
    let method: ModelKind = params.method.parse()?;
    let tokens = state.processor.process_query(&params.q);
    let k = params.k.clamp(0, MAX_K) as usize;
    let hits = state.engine.search(&tokens, method, k)?;

    let results: Vec<SearchHit> = hits
        .into_iter()
        .enumerate()
        .map(|(i, hit)| {
            let text = state.engine.document_text(&hit.doc_id).to_string();
            SearchHit { rank: i + 1, doc_id: hit.doc_id, score: hit.score, text }
        })
        .collect();

    let elapsed = start.elapsed();
    Ok(Json(SearchResponse { query: params.q, method, took_s: elapsed.as_secs_f64(), total_hits: results.len(), results }))
}

pub async fn doc_handler(State(state): State<AppState>, Path(doc_id): Path<String>) -> Json<serde_json::Value> {
    let known = state.engine.index().map(|idx| idx.contains_doc(&doc_id)).unwrap_or(false);
    Json(serde_json::json!({
        "doc_id": doc_id,
        "indexed": known,
        "text": state.engine.document_text(&doc_id),
    }))
}
