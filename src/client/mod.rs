//! Client side of the todo API: a typed HTTP client and the UI state model.

mod board;
mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::Todo;

pub use board::{Draft, EditDraft, TodoBoard};
pub use http::HttpTodoApi;

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("todo {0} is not in the current list")]
    UnknownTodo(i32),
}

/// Body of `PUT /api/todos/<id>`.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct TodoChanges {
    pub title: String,
    pub description: String,
    pub completed: bool,
}

/// What the client needs from the server.
#[async_trait]
pub trait TodoApi: Send + Sync {
    async fn list(&self) -> ClientResult<Vec<Todo>>;

    async fn create(&self, title: &str, description: &str) -> ClientResult<Todo>;

    async fn update(&self, id: i32, changes: &TodoChanges) -> ClientResult<Todo>;

    async fn delete(&self, id: i32) -> ClientResult<Todo>;

    /// Administrative reset. Returns the number of seeded rows.
    async fn reset(&self) -> ClientResult<usize>;
}

/// Response envelope as sent by the server, success or not.
#[derive(Deserialize, Debug)]
struct Envelope<T> {
    #[serde(default)]
    success: bool,
    data: Option<T>,
    error: Option<String>,
}

impl<T> Envelope<T> {
    fn into_data(self, status: u16) -> ClientResult<T> {
        match (self.success, self.data) {
            (true, Some(data)) => Ok(data),
            _ => Err(ClientError::Api {
                status,
                message: self
                    .error
                    .unwrap_or_else(|| "unexpected response".to_owned()),
            }),
        }
    }
}

#[derive(Deserialize, Debug)]
struct ResetData {
    records: usize,
}
