use super::{ClientError, ClientResult, TodoApi, TodoChanges};
use crate::models::Todo;

/// Fields of the new-todo form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    pub title: String,
    pub description: String,
}

/// The single edit in progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditDraft {
    pub id: i32,
    pub title: String,
    pub description: String,
}

/// Client-side view state.
///
/// The list is never patched locally: every successful mutation is followed
/// by a full refetch.
pub struct TodoBoard<A> {
    api: A,
    todos: Vec<Todo>,
    draft: Draft,
    editing: Option<EditDraft>,
}

impl<A: TodoApi> TodoBoard<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            todos: Vec::new(),
            draft: Draft::default(),
            editing: None,
        }
    }

    pub fn todos(&self) -> &[Todo] {
        &self.todos
    }

    pub const fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut Draft {
        &mut self.draft
    }

    pub const fn editing(&self) -> Option<&EditDraft> {
        self.editing.as_ref()
    }

    pub fn editing_mut(&mut self) -> Option<&mut EditDraft> {
        self.editing.as_mut()
    }

    pub const fn api(&self) -> &A {
        &self.api
    }

    /// Replaces the list with the server's. On failure the list is emptied.
    pub async fn refresh(&mut self) -> ClientResult<()> {
        match self.api.list().await {
            Ok(todos) => {
                self.todos = todos;
                Ok(())
            }
            Err(err) => {
                self.todos.clear();
                Err(err)
            }
        }
    }

    /// Creates a todo from the draft. Returns `false` without calling the
    /// server when the draft title is blank.
    pub async fn submit_draft(&mut self) -> ClientResult<bool> {
        let title = self.draft.title.trim();
        if title.is_empty() {
            return Ok(false);
        }
        self.api
            .create(title, self.draft.description.trim())
            .await?;
        self.draft = Draft::default();
        self.refresh().await?;
        Ok(true)
    }

    /// idle → editing(id). Starting another edit replaces the current one.
    pub fn start_edit(&mut self, id: i32) -> ClientResult<()> {
        let todo = self.todo(id)?;
        self.editing = Some(EditDraft {
            id,
            title: todo.title.clone(),
            description: todo.description.clone(),
        });
        Ok(())
    }

    /// editing → idle, discarding the draft.
    pub fn cancel_edit(&mut self) {
        self.editing = None;
    }

    /// Sends the edit draft, keeping the row's completion state.
    ///
    /// Returns `false` when nothing is being edited. A failed save leaves the
    /// edit open.
    pub async fn save_edit(&mut self) -> ClientResult<bool> {
        let Some(edit) = self.editing.clone() else {
            return Ok(false);
        };
        let completed = self.todo(edit.id)?.completed;
        let changes = TodoChanges {
            title: edit.title,
            description: edit.description,
            completed,
        };
        self.api.update(edit.id, &changes).await?;
        self.editing = None;
        self.refresh().await?;
        Ok(true)
    }

    pub async fn toggle_complete(&mut self, id: i32) -> ClientResult<()> {
        let todo = self.todo(id)?;
        let changes = TodoChanges {
            title: todo.title.clone(),
            description: todo.description.clone(),
            completed: !todo.completed,
        };
        self.api.update(id, &changes).await?;
        self.refresh().await
    }

    pub async fn delete(&mut self, id: i32) -> ClientResult<()> {
        self.api.delete(id).await?;
        if self.editing.as_ref().is_some_and(|edit| edit.id == id) {
            self.editing = None;
        }
        self.refresh().await
    }

    /// Plain-text rendering of the list, one block per todo.
    pub fn render(&self) -> String {
        if self.todos.is_empty() {
            return "No todos yet.\n".to_owned();
        }
        self.todos.iter().map(render_todo).collect()
    }

    fn todo(&self, id: i32) -> ClientResult<&Todo> {
        self.todos
            .iter()
            .find(|todo| todo.id == id)
            .ok_or(ClientError::UnknownTodo(id))
    }
}

fn render_todo(todo: &Todo) -> String {
    let mark = if todo.completed { 'x' } else { ' ' };
    let mut block = format!("[{mark}] #{} {}\n", todo.id, todo.title);
    if !todo.description.is_empty() {
        block.push_str(&format!("      {}\n", todo.description));
    }
    block.push_str(&format!(
        "      created {}\n",
        todo.created_at.format("%Y-%m-%d")
    ));
    block
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::NaiveDateTime;
    use rstest::{fixture, rstest};

    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        List,
        Create(String, String),
        Update(i32, TodoChanges),
        Delete(i32),
    }

    /// Records calls and keeps a tiny table so refetches see mutations.
    #[derive(Clone, Default)]
    struct FakeApi {
        calls: Arc<Mutex<Vec<Call>>>,
        rows: Arc<Mutex<Vec<Todo>>>,
        fail_updates: bool,
    }

    impl FakeApi {
        fn with_rows(titles: &[&str]) -> Self {
            let api = Self::default();
            if let Ok(mut rows) = api.rows.lock() {
                for (index, title) in titles.iter().enumerate() {
                    rows.push(todo(i32::try_from(index).unwrap_or(0) + 1, title));
                }
            }
            api
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().map(|c| c.clone()).unwrap_or_default()
        }

        fn record(&self, call: Call) {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push(call);
            }
        }
    }

    fn todo(id: i32, title: &str) -> Todo {
        Todo {
            id,
            title: title.to_owned(),
            description: format!("about {title}"),
            completed: false,
            created_at: NaiveDateTime::default(),
            updated_at: NaiveDateTime::default(),
        }
    }

    fn api_error() -> ClientError {
        ClientError::Api {
            status: 500,
            message: "Internal server error".to_owned(),
        }
    }

    #[async_trait]
    impl TodoApi for FakeApi {
        async fn list(&self) -> ClientResult<Vec<Todo>> {
            self.record(Call::List);
            Ok(self.rows.lock().map(|r| r.clone()).unwrap_or_default())
        }

        async fn create(&self, title: &str, description: &str) -> ClientResult<Todo> {
            self.record(Call::Create(title.to_owned(), description.to_owned()));
            let mut rows = self.rows.lock().map_err(|_| api_error())?;
            let id = i32::try_from(rows.len()).unwrap_or(0) + 1;
            let mut created = todo(id, title);
            created.description = description.to_owned();
            rows.push(created.clone());
            Ok(created)
        }

        async fn update(&self, id: i32, changes: &TodoChanges) -> ClientResult<Todo> {
            self.record(Call::Update(id, changes.clone()));
            if self.fail_updates {
                return Err(api_error());
            }
            let mut rows = self.rows.lock().map_err(|_| api_error())?;
            let row = rows.iter_mut().find(|t| t.id == id).ok_or_else(api_error)?;
            row.title = changes.title.clone();
            row.description = changes.description.clone();
            row.completed = changes.completed;
            Ok(row.clone())
        }

        async fn delete(&self, id: i32) -> ClientResult<Todo> {
            self.record(Call::Delete(id));
            let mut rows = self.rows.lock().map_err(|_| api_error())?;
            let index = rows.iter().position(|t| t.id == id).ok_or_else(api_error)?;
            Ok(rows.remove(index))
        }

        async fn reset(&self) -> ClientResult<usize> {
            Ok(0)
        }
    }

    #[fixture]
    fn api() -> FakeApi {
        FakeApi::with_rows(&["Lär dig React", "Bygg Todo-app"])
    }

    async fn loaded(api: FakeApi) -> TodoBoard<FakeApi> {
        let mut board = TodoBoard::new(api);
        board.refresh().await.expect("refresh");
        board
    }

    #[rstest]
    #[tokio::test]
    async fn blank_draft_never_reaches_the_server(api: FakeApi) {
        let mut board = loaded(api.clone()).await;
        board.draft_mut().title = "   ".to_owned();

        assert!(!board.submit_draft().await.expect("no error"));
        assert_eq!(api.calls(), vec![Call::List]);
    }

    #[rstest]
    #[tokio::test]
    async fn submit_trims_clears_and_refetches(api: FakeApi) {
        let mut board = loaded(api.clone()).await;
        board.draft_mut().title = "  Distribuera ".to_owned();
        board.draft_mut().description = " snart ".to_owned();

        assert!(board.submit_draft().await.expect("created"));

        assert_eq!(board.draft(), &Draft::default());
        assert_eq!(board.todos().len(), 3);
        assert_eq!(
            api.calls(),
            vec![
                Call::List,
                Call::Create("Distribuera".to_owned(), "snart".to_owned()),
                Call::List,
            ]
        );
    }

    #[rstest]
    #[tokio::test]
    async fn edit_cycle_goes_idle_after_save(api: FakeApi) {
        let mut board = loaded(api.clone()).await;

        board.start_edit(2).expect("row exists");
        assert_eq!(board.editing().map(|e| e.title.as_str()), Some("Bygg Todo-app"));

        if let Some(edit) = board.editing_mut() {
            edit.title = "Bygg Rust-app".to_owned();
        }
        assert!(board.save_edit().await.expect("saved"));

        assert!(board.editing().is_none());
        assert_eq!(board.todos()[1].title, "Bygg Rust-app");
        assert!(matches!(
            api.calls().get(1),
            Some(Call::Update(2, TodoChanges { completed: false, .. }))
        ));
    }

    #[rstest]
    #[tokio::test]
    async fn cancel_discards_the_edit(api: FakeApi) {
        let mut board = loaded(api.clone()).await;
        board.start_edit(1).expect("row exists");
        board.cancel_edit();

        assert!(board.editing().is_none());
        assert!(!board.save_edit().await.expect("nothing to save"));
        assert_eq!(api.calls(), vec![Call::List]);
    }

    #[tokio::test]
    async fn failed_save_keeps_the_edit_open() {
        let api = FakeApi {
            fail_updates: true,
            ..FakeApi::with_rows(&["a"])
        };
        let mut board = loaded(api).await;
        board.start_edit(1).expect("row exists");

        assert!(board.save_edit().await.is_err());
        assert_eq!(board.editing().map(|e| e.id), Some(1));
    }

    #[rstest]
    #[tokio::test]
    async fn toggle_sends_unchanged_text_with_flipped_flag(api: FakeApi) {
        let mut board = loaded(api.clone()).await;

        board.toggle_complete(1).await.expect("toggled");

        let expected = TodoChanges {
            title: "Lär dig React".to_owned(),
            description: "about Lär dig React".to_owned(),
            completed: true,
        };
        assert_eq!(api.calls()[1], Call::Update(1, expected));
        assert!(board.todos()[0].completed);
        assert!(board.render().starts_with("[x] #1 Lär dig React"));
    }

    #[rstest]
    #[tokio::test]
    async fn delete_refetches_and_drops_a_stale_edit(api: FakeApi) {
        let mut board = loaded(api.clone()).await;
        board.start_edit(1).expect("row exists");

        board.delete(1).await.expect("deleted");

        assert!(board.editing().is_none());
        assert_eq!(board.todos().len(), 1);
        assert_eq!(api.calls().last(), Some(&Call::List));
    }

    #[rstest]
    #[tokio::test]
    async fn unknown_rows_cannot_be_edited(api: FakeApi) {
        let mut board = loaded(api).await;
        assert!(matches!(
            board.start_edit(99),
            Err(ClientError::UnknownTodo(99))
        ));
    }

    #[rstest]
    #[tokio::test]
    async fn render_lists_one_block_per_todo(api: FakeApi) {
        let empty = TodoBoard::new(FakeApi::with_rows(&[]));
        assert_eq!(empty.render(), "No todos yet.\n");

        let board = loaded(api).await;
        assert_eq!(
            board.render(),
            "[ ] #1 Lär dig React\n      about Lär dig React\n      created 1970-01-01\n\
             [ ] #2 Bygg Todo-app\n      about Bygg Todo-app\n      created 1970-01-01\n"
        );
    }
}
