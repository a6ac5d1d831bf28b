//! Terminal client for a personal todo service.
//!
//! The library holds everything except terminal setup: the REST backend
//! (`api`), the signed-in session (`session`, `token_store`), the third-party
//! sign-in adapter (`identity`), the todo list store (`todos`) and the
//! terminal application built on them (`app`, `ui`).

pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod forms;
pub mod identity;
pub mod logging;
pub mod models;
pub mod notify;
pub mod session;
pub mod todos;
pub mod token_store;
pub mod ui;

#[cfg(test)]
mod testing;

pub use api::{HttpBackend, TodoBackend};
pub use error::{ClientError, Result};
pub use session::Session;
pub use todos::{Filter, TodoList};
