//! HTTP surface (axum).
//!
//! Routes:
//! - GET    /api/upload-url?contentType=  - issue an upload credential
//! - GET    /api/todos                    - list tasks
//! - POST   /api/todos                    - create task
//! - DELETE /api/todos/{id}               - delete task
//! - PUT    /uploads/{*key}               - signed direct upload (local store)
//!
//! Every response carries permissive CORS headers; OPTIONS is answered
//! before routing. Unknown routes are 404. Internal faults are logged and
//! answered with a generic 500 body.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, Request, State, rejection::QueryRejection},
    http::{HeaderMap, HeaderValue, Method, StatusCode, Uri, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, put},
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;

use crate::credential::CredentialIssuer;
use crate::error::{Error, Result};
use crate::ledger::TaskLedger;
use crate::store::{BlobStore, UploadSigner};
use crate::trigger::{IngestEvent, IngestSender};

const ALLOW_HEADERS: &str = "Content-Type,X-Amz-Date,Authorization,X-Api-Key,X-Amz-Security-Token";
const ALLOW_METHODS: &str = "GET,POST,PUT,DELETE,OPTIONS";

/// Shared handles for the API routes.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<TaskLedger>,
    pub issuer: Arc<CredentialIssuer>,
}

/// Receives direct uploads made with a presigned URL and announces them to
/// the ingest trigger.
pub struct UploadEndpoint {
    pub store: Arc<dyn BlobStore>,
    pub signer: Arc<UploadSigner>,
    pub ingest: Option<IngestSender>,
    pub max_bytes: u64,
}

/// Build the application router.
///
/// With `stage` set (e.g. `prod`), every route is also served under
/// `/<stage>/...`.
pub fn router(state: AppState, uploads: Option<Arc<UploadEndpoint>>, stage: Option<&str>) -> Router {
    let mut routes = Router::new()
        .route("/api/upload-url", get(upload_url))
        .route("/api/todos", get(list_todos).post(create_todo))
        .route("/api/todos/", delete(missing_todo_id))
        .route("/api/todos/{id}", delete(delete_todo))
        .with_state(state);

    if let Some(uploads) = uploads {
        let limit = usize::try_from(uploads.max_bytes).unwrap_or(usize::MAX);
        routes = routes.merge(
            Router::new()
                .route(
                    "/uploads/{*key}",
                    put(receive_upload).layer(DefaultBodyLimit::max(limit)),
                )
                .with_state(uploads),
        );
    }

    let app = match stage.map(|s| s.trim_matches('/')).filter(|s| !s.is_empty()) {
        Some(stage) => Router::new()
            .nest(&format!("/{stage}"), routes.clone())
            .merge(routes),
        None => routes,
    };

    app.fallback(route_not_found)
        .method_not_allowed_fallback(route_not_found)
        .layer(middleware::from_fn(cors))
        .layer(middleware::from_fn(log_request))
}

/// Serve `app` until `shutdown` resolves.
pub async fn serve(
    listener: TcpListener,
    app: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    tracing::info!(addr = ?listener.local_addr().ok(), "http server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

// ============================================================================
// Middleware
// ============================================================================

async fn cors(request: Request, next: Next) -> Response {
    let mut response = if request.method() == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        next.run(request).await
    };

    let headers = response.headers_mut();
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOW_HEADERS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOW_METHODS),
    );
    response
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    tracing::info!(
        %method,
        path,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "request"
    );
    response
}

// ============================================================================
// Errors
// ============================================================================

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Error::InvalidJson => (
                StatusCode::BAD_REQUEST,
                json!({"error": "Invalid JSON", "message": "Request body is not valid JSON"}),
            ),
            Error::InvalidRequest(message) => (
                StatusCode::BAD_REQUEST,
                json!({"error": "Invalid request", "message": message}),
            ),
            Error::NotFound(message) => (
                StatusCode::NOT_FOUND,
                json!({"error": "Not Found", "message": message}),
            ),
            Error::RouteNotFound { method, path } => (
                StatusCode::NOT_FOUND,
                json!({"error": "Not Found", "path": path, "method": method}),
            ),
            Error::Forbidden(message) => (
                StatusCode::FORBIDDEN,
                json!({"error": "Forbidden", "message": message}),
            ),
            other => {
                tracing::error!(error = %other, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({"error": "Internal Server Error", "message": "internal error"}),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

async fn route_not_found(method: Method, uri: Uri) -> Error {
    tracing::debug!(%method, path = uri.path(), "no matching route");
    Error::RouteNotFound {
        method: method.to_string(),
        path: uri.path().to_string(),
    }
}

// ============================================================================
// Handlers
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadUrlQuery {
    content_type: Option<String>,
}

/// GET /api/upload-url
async fn upload_url(State(state): State<AppState>, Query(query): Query<UploadUrlQuery>) -> Response {
    match state.issuer.issue(query.content_type.as_deref()).await {
        Ok(ticket) => Json(ticket).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to generate upload url");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "Failed to generate upload URL",
                    "message": "internal error",
                })),
            )
                .into_response()
        }
    }
}

/// GET /api/todos
async fn list_todos(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let todos = state.ledger.list().await?;
    Ok(Json(json!({ "todos": todos })))
}

/// POST /api/todos
async fn create_todo(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse> {
    let todo = state
        .ledger
        .create_from_body(&body, is_base64_body(&headers))
        .await?;
    Ok((StatusCode::CREATED, Json(json!({ "todo": todo }))))
}

/// DELETE /api/todos/
async fn missing_todo_id() -> Error {
    Error::InvalidRequest("ID is required".to_string())
}

/// DELETE /api/todos/{id}
async fn delete_todo(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    state.ledger.delete(&id).await?;
    Ok(Json(json!({ "message": "TODO deleted successfully" })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignedUploadQuery {
    content_type: String,
    expires: i64,
    signature: String,
}

/// PUT /uploads/{*key}
async fn receive_upload(
    State(uploads): State<Arc<UploadEndpoint>>,
    Path(key): Path<String>,
    query: std::result::Result<Query<SignedUploadQuery>, QueryRejection>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse> {
    let Query(query) = query.map_err(|rejection| {
        tracing::debug!(error = %rejection, "upload credential missing or malformed");
        Error::Forbidden("missing or malformed upload credential".to_string())
    })?;
    uploads.signer.verify(
        &key,
        &query.content_type,
        query.expires,
        &query.signature,
        Utc::now(),
    )?;

    if let Some(sent) = headers.get(header::CONTENT_TYPE) {
        if sent.as_bytes() != query.content_type.as_bytes() {
            return Err(Error::Forbidden(
                "content type does not match the upload credential".to_string(),
            ));
        }
    }

    uploads
        .store
        .put(&key, body.to_vec(), Some(&query.content_type))
        .await?;
    tracing::info!(key = %key, bytes = body.len(), "direct upload stored");

    if let Some(ingest) = &uploads.ingest {
        let event = IngestEvent::new(uploads.store.bucket(), key.clone());
        if let Err(e) = ingest.notify(event) {
            tracing::warn!(error = %e, "upload stored but not announced");
        }
    }

    Ok(Json(json!({ "key": key })))
}

fn is_base64_body(headers: &HeaderMap) -> bool {
    ["content-transfer-encoding", "x-body-encoding"]
        .iter()
        .filter_map(|name| headers.get(*name))
        .any(|value| {
            value
                .to_str()
                .is_ok_and(|v| v.trim().eq_ignore_ascii_case("base64"))
        })
}
