//! `todosync` -- offline-first task list kept in step with a REST server.
//!
//! Writes go to the server first and are mirrored into a local store;
//! reads are served from the local store, which [`tasks::reconcile`]
//! brings in line with the server on refresh.

pub mod cli;
pub mod config;
pub mod reminders;
pub mod remote;
pub mod store;
pub mod tasks;
pub mod view;
