//! HTTP API server for integration with other systems.
//!
//! Provides REST endpoints for indexing, RAG queries and collection
//! management.

use crate::cli::Output;
use crate::config::Settings;
use crate::error::DocragError;
use crate::indexer::IndexingResult;
use crate::loader::FileType;
use crate::orchestrator::Orchestrator;
use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

const DEFAULT_SESSION: &str = "default";
const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Shared application state.
struct AppState {
    orchestrator: Orchestrator,
    /// Serializes collection resets and writes against reads.
    collection: RwLock<()>,
}

/// Run the HTTP API server.
pub async fn run_serve(host: &str, port: u16, settings: Settings) -> anyhow::Result<()> {
    let orchestrator = Orchestrator::new(settings)?;
    let app = router(orchestrator);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("docrag API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Query", "POST /rag/query");
    Output::kv("Index paths", "POST /rag/index");
    Output::kv("Upload", "POST /rag/upload");
    Output::kv("Status", "GET  /rag/status");
    Output::kv("Stats", "GET  /rag/stats");
    Output::kv("Clear", "POST /rag/clear");
    Output::kv("Memory", "POST /rag/memory");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

fn router(orchestrator: Orchestrator) -> Router {
    let state = Arc::new(AppState {
        orchestrator,
        collection: RwLock::new(()),
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/rag/query", post(query))
        .route("/rag/index", post(index))
        .route("/rag/upload", post(upload))
        .route("/rag/status", get(status))
        .route("/rag/stats", get(stats))
        .route("/rag/clear", post(clear))
        .route("/rag/memory", post(memory))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
        .with_state(state)
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct QueryRequest {
    #[serde(default)]
    query: String,
    #[serde(default)]
    verbose: bool,
    #[serde(default)]
    top_k: Option<usize>,
    #[serde(default)]
    session_id: Option<String>,
    #[serde(default)]
    use_memory: Option<bool>,
}

#[derive(Deserialize)]
struct IndexRequest {
    #[serde(default)]
    paths: Vec<PathBuf>,
}

#[derive(Deserialize)]
struct ClearRequest {
    #[serde(default)]
    confirm: bool,
}

#[derive(Deserialize)]
struct MemoryRequest {
    #[serde(default)]
    session_id: Option<String>,
    enable: bool,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

fn error_response(status: StatusCode, error: &str, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
            message: message.into(),
        }),
    )
        .into_response()
}

fn from_error(e: DocragError) -> Response {
    match e {
        DocragError::InvalidInput(m) => error_response(StatusCode::BAD_REQUEST, "invalid_request", m),
        DocragError::Config(m) => error_response(StatusCode::BAD_REQUEST, "configuration_error", m),
        other => error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", other.to_string()),
    }
}

fn indexing_response(result: IndexingResult) -> Response {
    let status = if result.success() {
        StatusCode::OK
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    };
    (status, Json(result)).into_response()
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn query(State(state): State<Arc<AppState>>, Json(req): Json<QueryRequest>) -> Response {
    let question = req.query.trim();
    if question.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "invalid_request", "query is required");
    }

    let _read = state.collection.read().await;
    let orchestrator = &state.orchestrator;
    let session = req.session_id.as_deref().unwrap_or(DEFAULT_SESSION);

    let result = match req.use_memory {
        Some(false) => orchestrator.ask(question, req.verbose, req.top_k).await,
        Some(true) => {
            if !orchestrator.memory_enabled(session).await {
                orchestrator.set_memory(session, true).await;
            }
            orchestrator
                .ask_in_session(session, question, req.verbose, req.top_k)
                .await
        }
        None => {
            orchestrator
                .ask_in_session(session, question, req.verbose, req.top_k)
                .await
        }
    };

    match result {
        Ok(result) => Json(result).into_response(),
        Err(e) => from_error(e),
    }
}

async fn index(State(state): State<Arc<AppState>>, Json(req): Json<IndexRequest>) -> Response {
    if req.paths.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "invalid_request", "paths is required");
    }

    let _write = state.collection.write().await;
    match state.orchestrator.index_files(&req.paths).await {
        Ok(result) => indexing_response(result),
        Err(e) => from_error(e),
    }
}

async fn upload(State(state): State<Arc<AppState>>, mut multipart: Multipart) -> Response {
    let dir = match tempfile::tempdir() {
        Ok(dir) => dir,
        Err(e) => return from_error(e.into()),
    };

    let mut saved = Vec::new();
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return error_response(StatusCode::BAD_REQUEST, "invalid_upload", e.to_string()),
        };

        let Some(file_name) = field.file_name().and_then(safe_file_name) else {
            continue;
        };

        if FileType::from_path(Path::new(&file_name)).is_none() {
            warn!("Ignoring upload with unsupported type: {}", file_name);
            continue;
        }

        let bytes = match field.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => return error_response(StatusCode::BAD_REQUEST, "invalid_upload", e.to_string()),
        };

        let path = dir.path().join(&file_name);
        if let Err(e) = tokio::fs::write(&path, &bytes).await {
            return from_error(e.into());
        }
        info!("Received upload {} ({} bytes)", file_name, bytes.len());
        saved.push(path);
    }

    if saved.is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "invalid_upload",
            "no supported files in upload (pdf, txt, md)",
        );
    }

    let _write = state.collection.write().await;
    match state.orchestrator.index_files(&saved).await {
        Ok(result) => indexing_response(result),
        Err(e) => from_error(e),
    }
}

/// Keep only the final component of a client-supplied file name.
fn safe_file_name(name: &str) -> Option<String> {
    Path::new(name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
}

async fn status(State(state): State<Arc<AppState>>) -> Response {
    let _read = state.collection.read().await;
    match state.orchestrator.database_info().await {
        Ok(info) => Json(serde_json::json!({
            "status": "ok",
            "database": info,
            "memoryEnabled": state.orchestrator.settings().memory.enabled,
        }))
        .into_response(),
        Err(e) => from_error(e),
    }
}

async fn stats(State(state): State<Arc<AppState>>) -> Response {
    let _read = state.collection.read().await;
    match state.orchestrator.stats().await {
        Ok(stats) => Json(stats).into_response(),
        Err(e) => from_error(e),
    }
}

async fn clear(State(state): State<Arc<AppState>>, Json(req): Json<ClearRequest>) -> Response {
    let _write = state.collection.write().await;
    match state.orchestrator.clear_database(req.confirm).await {
        Ok(()) => Json(serde_json::json!({ "success": true })).into_response(),
        Err(e) => from_error(e),
    }
}

async fn memory(State(state): State<Arc<AppState>>, Json(req): Json<MemoryRequest>) -> Response {
    let session = req.session_id.as_deref().unwrap_or(DEFAULT_SESSION);
    state.orchestrator.set_memory(session, req.enable).await;
    Json(serde_json::json!({
        "sessionId": session,
        "memoryEnabled": req.enable,
    }))
    .into_response()
}
