//! `todosync` reference server library.
//!
//! Exposes the REST task API for use in tests and embedding. Tasks live in
//! memory and every response is wrapped in the shared
//! [`ApiResponse`](todosync_proto::api::ApiResponse) envelope.

pub mod api;
pub mod config;
pub mod store;
