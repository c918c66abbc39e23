//! HTTP routes for ingestion, retrieval and generation.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use nlp_rag::{Augmenter, DocumentInput, IngestReport, RagError, RagPipeline};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{error, info, warn};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<RagPipeline>,
    pub augmenter: Arc<Augmenter>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("backend", &self.pipeline.vector_store().backend())
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
pub struct AddDocumentsRequest {
    pub documents: Vec<DocumentInput>,
}

#[derive(Debug, Serialize)]
pub struct AddDocumentsResponse {
    pub message: String,
    #[serde(flatten)]
    pub report: IngestReport,
}

#[derive(Debug, Serialize)]
pub struct ListDocumentsResponse {
    pub document_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    pub top_k: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub results: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub instruction: Option<String>,
    pub text: String,
    pub top_k: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub result: String,
}

/// Handler error rendered as `{"error": message}`.
#[derive(Debug)]
pub enum ApiError {
    Rag(RagError),
    BadRequest(String),
}

impl From<RagError> for ApiError {
    fn from(err: RagError) -> Self {
        Self::Rag(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Rag(err) if err.is_client_error() => (StatusCode::BAD_REQUEST, err.to_string()),
            Self::Rag(err) => {
                error!(error = %err, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Build the router with tracing, CORS and a whole-request timeout.
pub fn app_router(state: AppState, request_timeout: Duration) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    let rag = Router::new()
        .route("/documents/add", post(add_documents))
        .route("/documents/list", get(list_documents))
        .route("/query", post(query))
        .route("/generate", post(generate));

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .nest("/rag", rag)
        .with_state(state)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

async fn root() -> impl IntoResponse {
    Json(json!({ "message": "NLP and RAG API", "status": "running" }))
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "healthy", "service": "nlp-rag-server" }))
}

async fn add_documents(
    State(state): State<AppState>,
    payload: Result<Json<AddDocumentsRequest>, JsonRejection>,
) -> Result<Json<AddDocumentsResponse>, ApiError> {
    let Json(request) = payload?;
    let report = state.pipeline.ingest(&request.documents).await?;
    info!(accepted = report.accepted_count, total = report.stored_total, "documents added");
    if report.embedded_count < report.accepted_count {
        warn!(
            missing = report.accepted_count - report.embedded_count,
            "some documents were stored without embeddings"
        );
    }
    Ok(Json(AddDocumentsResponse {
        message: format!("Successfully added {} documents", report.accepted_count),
        report,
    }))
}

async fn list_documents(
    State(state): State<AppState>,
) -> Result<Json<ListDocumentsResponse>, ApiError> {
    let document_ids = state.pipeline.list_ids().await?;
    Ok(Json(ListDocumentsResponse { document_ids }))
}

async fn query(
    State(state): State<AppState>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<QueryResponse>, ApiError> {
    let Json(request) = payload?;
    let top_k = request.top_k.unwrap_or(state.pipeline.config().top_k);
    let results = state.pipeline.retrieve(&request.query, top_k).await?;
    Ok(Json(QueryResponse { results }))
}

async fn generate(
    State(state): State<AppState>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let Json(request) = payload?;
    if request.text.trim().is_empty() {
        return Err(ApiError::BadRequest("text must not be empty".into()));
    }
    let config = state.pipeline.config();
    let instruction = request
        .instruction
        .filter(|i| !i.trim().is_empty())
        .unwrap_or_else(|| config.default_instruction.clone());
    let top_k = request.top_k.unwrap_or(config.top_k);

    let result = state.augmenter.augment(&instruction, &request.text, top_k).await?;
    Ok(Json(GenerateResponse { result }))
}
