//! REST task API: shared state, routes, and handlers.
//!
//! Every response, including errors and unknown routes, is an
//! [`ApiResponse`] envelope. Ids are taken from the path as raw strings so a
//! malformed id gets an envelope too instead of axum's plain-text rejection.

use std::sync::Arc;

use axum::Json;
use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch};
use chrono::Utc;
use todosync_proto::api::ApiResponse;
use todosync_proto::codec;
use todosync_proto::task::{CreateTaskRequest, TaskResponse, UpdateTaskRequest, WireStatus};
use todosync_proto::time::WIRE_FORMAT;

use crate::store::{StoreError, StoredTask, TaskStore};

/// Default maximum accepted request body in bytes (64 KB).
pub const DEFAULT_MAX_BODY_SIZE: usize = 64 * 1024;

/// Shared server state.
pub struct AppState {
    /// The task table.
    pub tasks: TaskStore,
    max_body_size: usize,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    /// Creates an empty state with the default body size limit.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(DEFAULT_MAX_BODY_SIZE)
    }

    /// Creates an empty state with a custom body size limit.
    #[must_use]
    pub fn with_config(max_body_size: usize) -> Self {
        Self {
            tasks: TaskStore::new(),
            max_body_size,
        }
    }
}

/// A request that could not be served.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Rejected by the task table.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Path id is not an integer.
    #[error("invalid task id: {0}")]
    BadId(String),

    /// Body is not a valid request.
    #[error("invalid request body: {0}")]
    BadBody(String),

    /// No route matches.
    #[error("no such endpoint")]
    NoRoute,
}

impl ApiError {
    const fn is_not_found(&self) -> bool {
        matches!(self, Self::Store(StoreError::NotFound(_)) | Self::NoRoute)
    }

    const fn status(&self) -> StatusCode {
        if self.is_not_found() {
            StatusCode::NOT_FOUND
        } else {
            StatusCode::BAD_REQUEST
        }
    }

    const fn code(&self) -> &'static str {
        if self.is_not_found() { "NOT_FOUND" } else { "BAD_REQUEST" }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::debug!(error = %self, "request rejected");
        let body = ApiResponse::<()>::failure(self.code(), &self.to_string(), timestamp());
        (self.status(), Json(body)).into_response()
    }
}

type Reply<T> = Result<(StatusCode, Json<ApiResponse<T>>), ApiError>;

fn timestamp() -> Option<String> {
    Some(Utc::now().format(WIRE_FORMAT).to_string())
}

fn ok<T>(status: StatusCode, data: T) -> Reply<T> {
    Ok((status, Json(ApiResponse::ok(data, timestamp()))))
}

fn parse_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse().map_err(|_| ApiError::BadId(raw.to_string()))
}

fn render(task: &StoredTask) -> TaskResponse {
    task.to_response(Utc::now())
}

fn render_all(tasks: &[StoredTask]) -> Vec<TaskResponse> {
    let now = Utc::now();
    tasks.iter().map(|t| t.to_response(now)).collect()
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn list_tasks(State(state): State<Arc<AppState>>) -> Reply<Vec<TaskResponse>> {
    ok(StatusCode::OK, render_all(&state.tasks.list(None).await))
}

async fn list_pending(State(state): State<Arc<AppState>>) -> Reply<Vec<TaskResponse>> {
    let tasks = state.tasks.list(Some(WireStatus::Pending)).await;
    ok(StatusCode::OK, render_all(&tasks))
}

async fn list_completed(State(state): State<Arc<AppState>>) -> Reply<Vec<TaskResponse>> {
    let tasks = state.tasks.list(Some(WireStatus::Completed)).await;
    ok(StatusCode::OK, render_all(&tasks))
}

async fn get_task(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> Reply<TaskResponse> {
    let task = state.tasks.get(parse_id(&raw_id)?).await?;
    ok(StatusCode::OK, render(&task))
}

async fn create_task(State(state): State<Arc<AppState>>, body: String) -> Reply<TaskResponse> {
    let request: CreateTaskRequest =
        codec::decode(&body).map_err(|e| ApiError::BadBody(e.to_string()))?;
    let task = state.tasks.create(request, Utc::now()).await?;
    tracing::info!(id = task.id, title = %task.title, "task created");
    ok(StatusCode::CREATED, render(&task))
}

async fn update_task(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
    body: String,
) -> Reply<TaskResponse> {
    let id = parse_id(&raw_id)?;
    let request: UpdateTaskRequest =
        codec::decode(&body).map_err(|e| ApiError::BadBody(e.to_string()))?;
    let task = state.tasks.update(id, request, Utc::now()).await?;
    tracing::info!(id, "task updated");
    ok(StatusCode::OK, render(&task))
}

async fn delete_task(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> Reply<()> {
    let id = parse_id(&raw_id)?;
    state.tasks.delete(id).await?;
    tracing::info!(id, "task deleted");
    Ok((StatusCode::OK, Json(ApiResponse::empty(timestamp()))))
}

async fn complete_task(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> Reply<TaskResponse> {
    set_status(&state, &raw_id, WireStatus::Completed).await
}

async fn reopen_task(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> Reply<TaskResponse> {
    set_status(&state, &raw_id, WireStatus::Pending).await
}

async fn set_status(state: &AppState, raw_id: &str, status: WireStatus) -> Reply<TaskResponse> {
    let id = parse_id(raw_id)?;
    let task = state.tasks.set_status(id, status, Utc::now()).await?;
    tracing::info!(id, %status, "task status changed");
    ok(StatusCode::OK, render(&task))
}

async fn no_route() -> ApiError {
    ApiError::NoRoute
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// Builds the API router over `state`.
#[must_use]
pub fn router(state: Arc<AppState>) -> axum::Router {
    let body_limit = DefaultBodyLimit::max(state.max_body_size);
    axum::Router::new()
        .route("/api/tasks", get(list_tasks).post(create_task))
        .route("/api/tasks/pending", get(list_pending))
        .route("/api/tasks/completed", get(list_completed))
        .route(
            "/api/tasks/{id}",
            get(get_task).put(update_task).delete(delete_task),
        )
        .route("/api/tasks/{id}/complete", patch(complete_task))
        .route("/api/tasks/{id}/pending", patch(reopen_task))
        .fallback(no_route)
        .layer(body_limit)
        .with_state(state)
}

/// Starts the server on the given address and returns the bound address
/// and a join handle.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server(
    addr: &str,
) -> Result<
    (std::net::SocketAddr, tokio::task::JoinHandle<()>),
    Box<dyn std::error::Error + Send + Sync>,
> {
    start_server_with_state(addr, Arc::new(AppState::new())).await
}

/// Starts the server with a pre-configured [`AppState`].
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server_with_state(
    addr: &str,
    state: Arc<AppState>,
) -> Result<
    (std::net::SocketAddr, tokio::task::JoinHandle<()>),
    Box<dyn std::error::Error + Send + Sync>,
> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "task server error");
        }
    });

    Ok((bound_addr, handle))
}

/// Starts the server in-process for testing.
///
/// Binds to `127.0.0.1:0` (OS-assigned port).
#[cfg(test)]
pub async fn start_test_server() -> (std::net::SocketAddr, tokio::task::JoinHandle<()>) {
    start_server("127.0.0.1:0")
        .await
        .expect("failed to start test server")
}
