//! Remote task service abstraction.
//!
//! Defines the [`RemoteService`] trait the repository calls before touching
//! the local store. Implementations include:
//! - [`http::HttpRemote`]: JSON over HTTP against the task REST API
//! - [`memory::InMemoryRemote`]: in-process service for tests and demos

pub mod convert;
pub mod http;
pub mod memory;

use std::future::Future;

use todosync_proto::task::{CreateTaskRequest, UpdateTaskRequest};

use crate::tasks::{Task, TaskId};

pub use http::HttpRemote;
pub use memory::InMemoryRemote;

/// Errors returned by remote service calls.
///
/// `Display` yields the human-readable message as-is, so callers can show
/// it to the user without further formatting.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    /// The request never produced an HTTP response (connect, timeout, DNS).
    #[error("{0}")]
    Transport(String),

    /// The server answered with a non-2xx status.
    #[error("{message}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Message extracted from the envelope, or a fallback.
        message: String,
    },

    /// The server answered 2xx but the envelope reported `success: false`.
    #[error("{0}")]
    Server(String),

    /// The envelope was successful but carried no payload where one was required.
    #[error("server returned no data")]
    NoData,

    /// The response body was not a valid envelope.
    #[error("invalid response from server: {0}")]
    Decode(String),
}

impl RemoteError {
    /// HTTP status of the failed call, if the server answered at all.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the server reported that the task does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self.status(), Some(404))
    }
}

/// The seven calls of the remote task API.
///
/// Every call is a single attempt; no retries happen at this layer.
/// Records come back already converted to domain [`Task`]s.
pub trait RemoteService: Send + Sync {
    /// Fetches every task.
    fn list_all(&self) -> impl Future<Output = Result<Vec<Task>, RemoteError>> + Send;

    /// Fetches one task.
    fn get_by_id(&self, id: TaskId) -> impl Future<Output = Result<Task, RemoteError>> + Send;

    /// Creates a task, returning the server's record with its assigned id.
    fn create(
        &self,
        request: CreateTaskRequest,
    ) -> impl Future<Output = Result<Task, RemoteError>> + Send;

    /// Updates a task, returning the server's record.
    fn update(
        &self,
        id: TaskId,
        request: UpdateTaskRequest,
    ) -> impl Future<Output = Result<Task, RemoteError>> + Send;

    /// Deletes a task.
    fn delete(&self, id: TaskId) -> impl Future<Output = Result<(), RemoteError>> + Send;

    /// Marks a task completed.
    fn mark_complete(&self, id: TaskId) -> impl Future<Output = Result<Task, RemoteError>> + Send;

    /// Marks a task pending again.
    fn mark_pending(&self, id: TaskId) -> impl Future<Output = Result<Task, RemoteError>> + Send;
}
