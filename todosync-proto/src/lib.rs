//! Shared wire definitions for the todosync task REST API.

pub mod api;
pub mod codec;
pub mod task;
pub mod time;
