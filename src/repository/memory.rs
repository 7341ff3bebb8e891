//! In-memory repository for tests and database-less demos.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{Duration, NaiveDateTime, Utc};

use super::{RepositoryError, RepositoryResult, SchemaStatus, TodoRepository};
use crate::models::{NewTodo, Todo, TodoUpdate, SEED_TODOS};

/// Thread-safe in-memory todo table.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTodoRepository {
    state: Arc<RwLock<TableState>>,
}

#[derive(Debug, Default)]
struct TableState {
    present: bool,
    next_id: i32,
    last_stamp: Option<NaiveDateTime>,
    rows: BTreeMap<i32, Todo>,
}

impl TableState {
    /// Wall clock, nudged forward so consecutive writes never share a timestamp.
    fn tick(&mut self) -> NaiveDateTime {
        let now = Utc::now().naive_utc();
        let stamp = match self.last_stamp {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_stamp = Some(stamp);
        stamp
    }

    fn insert(&mut self, title: &str, description: &str) -> Todo {
        self.next_id += 1;
        let stamp = self.tick();
        let todo = Todo {
            id: self.next_id,
            title: title.to_owned(),
            description: description.to_owned(),
            completed: false,
            created_at: stamp,
            updated_at: stamp,
        };
        self.rows.insert(todo.id, todo.clone());
        todo
    }

    fn seed(&mut self) -> usize {
        for (title, description) in SEED_TODOS {
            self.insert(title, description);
        }
        SEED_TODOS.len()
    }

    fn require_table(&self) -> RepositoryResult<()> {
        if self.present {
            Ok(())
        } else {
            Err(RepositoryError::persistence(std::io::Error::other(
                "relation \"todos\" does not exist",
            )))
        }
    }
}

impl InMemoryTodoRepository {
    /// Creates a repository whose table does not exist yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a repository with an empty, already-created table.
    pub fn with_table() -> Self {
        let repo = Self::default();
        if let Ok(mut state) = repo.state.write() {
            state.present = true;
        }
        repo
    }

    fn read(&self) -> RepositoryResult<std::sync::RwLockReadGuard<'_, TableState>> {
        self.state
            .read()
            .map_err(|err| RepositoryError::persistence(std::io::Error::other(err.to_string())))
    }

    fn write(&self) -> RepositoryResult<std::sync::RwLockWriteGuard<'_, TableState>> {
        self.state
            .write()
            .map_err(|err| RepositoryError::persistence(std::io::Error::other(err.to_string())))
    }
}

#[async_trait]
impl TodoRepository for InMemoryTodoRepository {
    async fn ping(&self) -> RepositoryResult<i32> {
        self.read().map(|_| 1)
    }

    async fn ensure_schema(&self, seed_if_created: bool) -> RepositoryResult<SchemaStatus> {
        let mut state = self.write()?;
        let created = !state.present;
        state.present = true;
        let seeded = created && seed_if_created;
        if seeded {
            state.seed();
        }
        Ok(SchemaStatus {
            created,
            seeded,
            rows: i64::try_from(state.rows.len()).unwrap_or(i64::MAX),
        })
    }

    async fn reset(&self) -> RepositoryResult<usize> {
        let mut state = self.write()?;
        state.rows.clear();
        state.next_id = 0;
        state.present = true;
        Ok(state.seed())
    }

    async fn list(&self) -> RepositoryResult<Vec<Todo>> {
        let state = self.read()?;
        state.require_table()?;
        let mut todos: Vec<Todo> = state.rows.values().cloned().collect();
        todos.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(todos)
    }

    async fn find(&self, id: i32) -> RepositoryResult<Todo> {
        let state = self.read()?;
        state.require_table()?;
        state
            .rows
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::NotFound(id))
    }

    async fn create(&self, todo: NewTodo) -> RepositoryResult<Todo> {
        let mut state = self.write()?;
        state.require_table()?;
        Ok(state.insert(todo.title(), todo.description()))
    }

    async fn update(&self, id: i32, update: TodoUpdate) -> RepositoryResult<Todo> {
        let mut state = self.write()?;
        state.require_table()?;
        if !state.rows.contains_key(&id) {
            return Err(RepositoryError::NotFound(id));
        }
        let stamp = state.tick();
        let todo = state
            .rows
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound(id))?;
        todo.title = update.title().to_owned();
        if let Some(description) = update.description() {
            todo.description = description.to_owned();
        }
        if let Some(completed) = update.completed() {
            todo.completed = completed;
        }
        todo.updated_at = stamp;
        Ok(todo.clone())
    }

    async fn delete(&self, id: i32) -> RepositoryResult<Todo> {
        let mut state = self.write()?;
        state.require_table()?;
        state.rows.remove(&id).ok_or(RepositoryError::NotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn repo() -> InMemoryTodoRepository {
        InMemoryTodoRepository::with_table()
    }

    fn new_todo(title: &str) -> NewTodo {
        NewTodo::parse(title, None).expect("valid title")
    }

    #[rstest]
    #[tokio::test]
    async fn ensure_schema_never_touches_existing_rows(repo: InMemoryTodoRepository) {
        repo.create(new_todo("keep me")).await.expect("create");

        let status = repo.ensure_schema(true).await.expect("ensure");

        assert!(!status.created);
        assert!(!status.seeded);
        assert_eq!(status.rows, 1);
    }

    #[tokio::test]
    async fn ensure_schema_seeds_only_a_fresh_table_when_asked() {
        let plain = InMemoryTodoRepository::new();
        let status = plain.ensure_schema(false).await.expect("ensure");
        assert!(status.created);
        assert_eq!(status.rows, 0);

        let seeded = InMemoryTodoRepository::new();
        let status = seeded.ensure_schema(true).await.expect("ensure");
        assert!(status.seeded);
        assert_eq!(status.rows, 3);
    }

    #[tokio::test]
    async fn queries_fail_before_the_table_exists() {
        let repo = InMemoryTodoRepository::new();
        assert!(matches!(
            repo.list().await,
            Err(RepositoryError::Persistence(_))
        ));
    }

    #[rstest]
    #[tokio::test]
    async fn update_strictly_advances_updated_at(repo: InMemoryTodoRepository) {
        let created = repo.create(new_todo("a")).await.expect("create");
        let update = TodoUpdate::parse("b", None, Some(true)).expect("valid");

        let updated = repo.update(created.id, update).await.expect("update");

        assert!(updated.updated_at > created.updated_at);
        assert_eq!(updated.created_at, created.created_at);
        assert_eq!(updated.description, created.description);
        assert!(updated.completed);
    }

    #[rstest]
    #[tokio::test]
    async fn reset_restarts_ids_and_replaces_rows(repo: InMemoryTodoRepository) {
        for title in ["a", "b", "c", "d"] {
            repo.create(new_todo(title)).await.expect("create");
        }

        assert_eq!(repo.reset().await.expect("reset"), 3);

        let todos = repo.list().await.expect("list");
        let mut ids: Vec<i32> = todos.iter().map(|t| t.id).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(todos.last().map(|t| t.title.as_str()), Some("Lär dig React"));
    }
}
