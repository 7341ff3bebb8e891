//! Storage port for todos, with PostgreSQL and in-memory adapters.

mod memory;
mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{NewTodo, Todo, TodoUpdate};

pub use memory::InMemoryTodoRepository;
pub use postgres::{PgPool, PostgresTodoRepository};

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Repository handle shared by every request through Rocket managed state.
pub type SharedRepository = Arc<dyn TodoRepository>;

/// Outcome of [`TodoRepository::ensure_schema`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaStatus {
    pub created: bool,
    pub seeded: bool,
    pub rows: i64,
}

/// Todo persistence contract.
///
/// Every call is independent: no call holds a connection after it returns.
#[async_trait]
pub trait TodoRepository: Send + Sync {
    /// Runs a trivial round trip (`SELECT 1`) and returns its value.
    async fn ping(&self) -> RepositoryResult<i32>;

    /// Creates the `todos` table when it is missing. Existing rows are never
    /// touched. When `seed_if_created` is set and the table was just created,
    /// the seed rows are inserted.
    async fn ensure_schema(&self, seed_if_created: bool) -> RepositoryResult<SchemaStatus>;

    /// Drops and recreates the table, then inserts the seed rows.
    ///
    /// Destroys all existing data. Returns the number of seeded rows.
    async fn reset(&self) -> RepositoryResult<usize>;

    /// All todos, newest first.
    async fn list(&self) -> RepositoryResult<Vec<Todo>>;

    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] when no row has this id.
    async fn find(&self, id: i32) -> RepositoryResult<Todo>;

    async fn create(&self, todo: NewTodo) -> RepositoryResult<Todo>;

    /// Applies the update and refreshes `updated_at`.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] when no row has this id.
    async fn update(&self, id: i32, update: TodoUpdate) -> RepositoryResult<Todo>;

    /// Hard-deletes the row and returns it.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] when no row has this id.
    async fn delete(&self, id: i32) -> RepositoryResult<Todo>;
}

#[derive(Debug, Clone, Error)]
pub enum RepositoryError {
    #[error("todo not found: {0}")]
    NotFound(i32),

    /// The database could not be reached or no pooled connection was available.
    #[error("connection error: {0}")]
    Connection(Arc<dyn std::error::Error + Send + Sync>),

    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl RepositoryError {
    pub fn connection(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Connection(Arc::new(err))
    }

    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
