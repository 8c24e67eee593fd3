//! HTTP binding of [`RemoteService`] for the task REST API.
//!
//! Every response is a JSON [`ApiResponse`] envelope. A call succeeds only
//! when the status is 2xx *and* the envelope reports `success: true`.

use std::time::Duration;

use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use todosync_proto::api::ApiResponse;
use todosync_proto::codec;
use todosync_proto::task::{CreateTaskRequest, TaskResponse, UpdateTaskRequest};
use todosync_proto::time::now_millis;

use super::convert::task_from_wire;
use super::{RemoteError, RemoteService};
use crate::tasks::{Task, TaskId};

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for the task REST API rooted at a base URL.
#[derive(Debug, Clone)]
pub struct HttpRemote {
    client: Client,
    base: Url,
}

impl HttpRemote {
    /// Creates a client for the API at `base_url` (e.g. `http://localhost:8081`).
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::Transport`] if the URL is invalid or the HTTP
    /// client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RemoteError> {
        let mut base = Url::parse(base_url)
            .map_err(|e| RemoteError::Transport(format!("invalid base URL {base_url}: {e}")))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, base })
    }

    /// The base URL requests are resolved against.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url, RemoteError> {
        self.base
            .join(path)
            .map_err(|e| RemoteError::Transport(format!("invalid request path {path}: {e}")))
    }

    /// Sends one request and unwraps the envelope.
    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<String>,
        fallback: &str,
    ) -> Result<Option<T>, RemoteError> {
        let url = self.endpoint(path)?;
        let mut request = self.client.request(method.clone(), url);
        if let Some(body) = body {
            request = request
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body);
        }

        let response = request.send().await.map_err(|e| {
            tracing::warn!(%method, path, error = %e, "task API request failed");
            RemoteError::Transport(transport_message(&e))
        })?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| RemoteError::Transport(transport_message(&e)))?;
        tracing::debug!(%method, path, status = status.as_u16(), "task API response");

        interpret(status, &text, fallback)
    }

    async fn call_record(
        &self,
        method: Method,
        path: &str,
        body: Option<String>,
        fallback: &str,
    ) -> Result<Task, RemoteError> {
        let record: TaskResponse = self
            .call(method, path, body, fallback)
            .await?
            .ok_or(RemoteError::NoData)?;
        Ok(task_from_wire(record, now_millis()))
    }
}

/// Applies the envelope success rules to a raw response.
fn interpret<T: DeserializeOwned>(
    status: StatusCode,
    text: &str,
    fallback: &str,
) -> Result<Option<T>, RemoteError> {
    let envelope = codec::decode::<ApiResponse<T>>(text);

    if !status.is_success() {
        let message = envelope.map_or_else(|_| fallback.to_string(), |env| env.failure_message(fallback));
        return Err(RemoteError::Http {
            status: status.as_u16(),
            message,
        });
    }

    let envelope = envelope.map_err(|e| RemoteError::Decode(e.to_string()))?;
    if !envelope.success {
        return Err(RemoteError::Server(envelope.failure_message(fallback)));
    }
    Ok(envelope.data)
}

fn transport_message(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        "request timed out".to_string()
    } else if err.is_connect() {
        "could not connect to server".to_string()
    } else {
        format!("network error: {err}")
    }
}

fn encode_body<T: serde::Serialize>(value: &T) -> Result<Option<String>, RemoteError> {
    codec::encode(value)
        .map(Some)
        .map_err(|e| RemoteError::Decode(e.to_string()))
}

impl RemoteService for HttpRemote {
    async fn list_all(&self) -> Result<Vec<Task>, RemoteError> {
        let records: Vec<TaskResponse> = self
            .call(Method::GET, "api/tasks", None, "failed to load tasks")
            .await?
            .unwrap_or_default();
        let now = now_millis();
        Ok(records.into_iter().map(|r| task_from_wire(r, now)).collect())
    }

    async fn get_by_id(&self, id: TaskId) -> Result<Task, RemoteError> {
        self.call_record(Method::GET, &format!("api/tasks/{id}"), None, "failed to load task")
            .await
    }

    async fn create(&self, request: CreateTaskRequest) -> Result<Task, RemoteError> {
        let body = encode_body(&request)?;
        self.call_record(Method::POST, "api/tasks", body, "failed to create task")
            .await
    }

    async fn update(&self, id: TaskId, request: UpdateTaskRequest) -> Result<Task, RemoteError> {
        let body = encode_body(&request)?;
        self.call_record(Method::PUT, &format!("api/tasks/{id}"), body, "failed to update task")
            .await
    }

    async fn delete(&self, id: TaskId) -> Result<(), RemoteError> {
        self.call::<serde_json::Value>(
            Method::DELETE,
            &format!("api/tasks/{id}"),
            None,
            "failed to delete task",
        )
        .await
        .map(|_| ())
    }

    async fn mark_complete(&self, id: TaskId) -> Result<Task, RemoteError> {
        self.call_record(
            Method::PATCH,
            &format!("api/tasks/{id}/complete"),
            None,
            "failed to complete task",
        )
        .await
    }

    async fn mark_pending(&self, id: TaskId) -> Result<Task, RemoteError> {
        self.call_record(
            Method::PATCH,
            &format!("api/tasks/{id}/pending"),
            None,
            "failed to reopen task",
        )
        .await
    }
}
