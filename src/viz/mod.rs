//! HTTP API consumed by the call graph viewer.
//!
//! Serves graph listings, the method tree, method detail with its
//! entry-point path, caller/callee expansion and the CSV import endpoint.
//! Every failure is answered with `{"message", "code"}`.

pub mod elements;
pub mod tree;

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tokio::sync::Mutex;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::{CallGraphConfig, ServerConfig};
use crate::error::{CallGraphError, Result};
use crate::graph::queries::GraphQueries;
use crate::graph::store::GraphStore;
use crate::import::{attach_timestamps, ImportOptions, ImportPipeline, ImportRequest};
use crate::types::{GraphSummary, Message};
use elements::{ElementSet, MethodDetail};
use tree::TreeItem;

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Shared server state. The mutex serializes every store access, so two
/// imports never interleave.
pub struct AppState {
    pub store: Mutex<GraphStore>,
    pub import: ImportOptions,
}

impl AppState {
    pub fn new(store: GraphStore, import: ImportOptions) -> Arc<Self> {
        Arc::new(Self {
            store: Mutex::new(store),
            import,
        })
    }
}

// ---------------------------------------------------------------------------
// Error responses
// ---------------------------------------------------------------------------

impl CallGraphError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            _ if self.is_client_error() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for CallGraphError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.code(), "request failed: {}", self);
        } else {
            tracing::debug!(code = self.code(), "rejected request: {}", self);
        }
        let body = json!({ "message": self.to_string(), "code": self.code() });
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<T>, CallGraphError>;

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn list_graphs(State(state): State<Arc<AppState>>) -> ApiResult<Vec<GraphSummary>> {
    let store = state.store.lock().await;
    Ok(Json(GraphQueries::new(&store).list_graphs()?))
}

async fn delete_graph(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<Message> {
    let store = state.store.lock().await;
    Ok(Json(GraphQueries::new(&store).delete_graph(&name)?))
}

async fn method_tree(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<Vec<TreeItem>> {
    let store = state.store.lock().await;
    Ok(Json(GraphQueries::new(&store).method_tree(&name)?))
}

async fn method_detail(
    State(state): State<Arc<AppState>>,
    Path((name, id)): Path<(String, String)>,
) -> ApiResult<MethodDetail> {
    let store = state.store.lock().await;
    Ok(Json(GraphQueries::new(&store).method_detail(&name, &id)?))
}

async fn callers(
    State(state): State<Arc<AppState>>,
    Path((name, id)): Path<(String, String)>,
) -> ApiResult<ElementSet> {
    let store = state.store.lock().await;
    Ok(Json(GraphQueries::new(&store).callers(&name, &id, None)?))
}

async fn caller(
    State(state): State<Arc<AppState>>,
    Path((name, id, caller_id)): Path<(String, String, String)>,
) -> ApiResult<ElementSet> {
    let store = state.store.lock().await;
    Ok(Json(
        GraphQueries::new(&store).callers(&name, &id, Some(&caller_id))?,
    ))
}

async fn callees(
    State(state): State<Arc<AppState>>,
    Path((name, id)): Path<(String, String)>,
) -> ApiResult<ElementSet> {
    let store = state.store.lock().await;
    Ok(Json(GraphQueries::new(&store).callees(&name, &id, None)?))
}

async fn callee(
    State(state): State<Arc<AppState>>,
    Path((name, id, callee_id)): Path<(String, String, String)>,
) -> ApiResult<ElementSet> {
    let store = state.store.lock().await;
    Ok(Json(
        GraphQueries::new(&store).callees(&name, &id, Some(&callee_id))?,
    ))
}

async fn import_graph(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> ApiResult<Message> {
    // Read the whole upload before taking the store lock.
    let request = read_import_form(multipart).await?;
    let store = state.store.lock().await;
    let result = ImportPipeline::new(&store, &state.import).run(&request)?;
    Ok(Json(Message::new(result.to_string())))
}

/// Collect the `files`, `timestamps`, `graph` and `otherGraph` form fields.
/// Unknown fields are ignored.
async fn read_import_form(mut multipart: Multipart) -> Result<ImportRequest> {
    let malformed = |e: axum::extract::multipart::MultipartError| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            CallGraphError::PayloadTooLarge(e.body_text())
        } else {
            CallGraphError::InvalidInput(format!("Malformed multipart form: {e}"))
        }
    };

    let mut files = Vec::new();
    let mut timestamps = Vec::new();
    let mut graph = None;
    let mut other_graph = None;

    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "files" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(malformed)?;
                files.push((file_name, bytes.to_vec()));
            }
            "timestamps" => {
                let text = field.text().await.map_err(malformed)?;
                let ts = text.trim().parse::<i64>().map_err(|_| {
                    CallGraphError::InvalidInput(format!("Invalid timestamp: {text:?}"))
                })?;
                timestamps.push(ts);
            }
            "graph" => graph = Some(field.text().await.map_err(malformed)?),
            "otherGraph" => {
                let text = field.text().await.map_err(malformed)?;
                other_graph = Some(text).filter(|t| !t.trim().is_empty());
            }
            _ => {}
        }
    }

    let graph = graph.ok_or_else(|| CallGraphError::InvalidInput("Missing graph field".into()))?;
    Ok(ImportRequest {
        graph,
        other_graph,
        files: attach_timestamps(files, &timestamps)?,
    })
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// CORS policy for `origins`; `"*"` anywhere in the list allows every
/// origin without credentials.
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}", o);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

/// Build the API Router (extracted for testability).
pub fn build_router(state: Arc<AppState>, server: &ServerConfig) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/graphs", get(list_graphs))
        .route("/graphs/{name}", axum::routing::delete(delete_graph))
        .route("/graphs/{name}/tree", get(method_tree))
        .route("/graphs/{name}/method/{id}", get(method_detail))
        .route("/graphs/{name}/method/{id}/callers", get(callers))
        .route("/graphs/{name}/method/{id}/callers/{caller_id}", get(caller))
        .route("/graphs/{name}/method/{id}/callees", get(callees))
        .route("/graphs/{name}/method/{id}/callees/{callee_id}", get(callee))
        .route("/import", post(import_graph))
        .layer(DefaultBodyLimit::max(server.max_upload_bytes))
        .layer(cors_layer(&server.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the API server and serve until Ctrl-C.
pub async fn run_server(config: &CallGraphConfig) -> Result<()> {
    let addr = config.server.socket_addr()?;
    let store = GraphStore::new(&config.storage.db_path.to_string_lossy())?;
    let state = AppState::new(store, config.import_options());
    let app = build_router(state, &config.server);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Call graph API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down call graph API");
        })
        .await?;

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
