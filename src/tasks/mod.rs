//! Task source: the Todoist REST API.

pub mod client;
pub mod model;

pub use client::TaskFetcher;
pub use model::{Due, Project, TaskRecord};
