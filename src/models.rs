use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::schema::todos;

/// Longest accepted title, counted in characters.
pub const MAX_TITLE_LEN: usize = 255;

/// Rows written by an administrative reset.
pub const SEED_TODOS: [(&str, &str); 3] = [
    ("Lär dig React", "Studera React dokumentation"),
    ("Bygg Todo-app", "Skapa en fullstack applikation"),
    ("Distribuera till Render", "Publicera appen på Render"),
];

/// A task as exposed over the API.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Todo {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub completed: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Raw `todos` row. Every column but `id` and `title` is nullable in the table.
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = todos)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TodoRow {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    pub completed: Option<bool>,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

impl From<TodoRow> for Todo {
    fn from(row: TodoRow) -> Self {
        let created_at = row.created_at.unwrap_or_default();
        Self {
            id: row.id,
            title: row.title,
            description: row.description.unwrap_or_default(),
            completed: row.completed.unwrap_or(false),
            created_at,
            updated_at: row.updated_at.unwrap_or(created_at),
        }
    }
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = todos)]
pub struct NewTodoRow {
    pub title: String,
    pub description: String,
}

/// Column changes applied by an update. `None` keeps the stored value.
#[derive(AsChangeset, Debug, Clone)]
#[diesel(table_name = todos)]
pub struct TodoChangeset {
    pub title: String,
    pub description: Option<String>,
    pub completed: Option<bool>,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TodoValidationError {
    #[error("Title is required")]
    BlankTitle,

    #[error("Title must be at most {MAX_TITLE_LEN} characters")]
    TitleTooLong,
}

fn parse_title(raw: &str) -> Result<String, TodoValidationError> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(TodoValidationError::BlankTitle);
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(TodoValidationError::TitleTooLong);
    }
    Ok(title.to_owned())
}

/// A validated create request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTodo {
    title: String,
    description: String,
}

impl NewTodo {
    /// Trims both fields and checks the title.
    ///
    /// # Errors
    ///
    /// Returns a [`TodoValidationError`] when the title is blank or too long.
    pub fn parse(title: &str, description: Option<&str>) -> Result<Self, TodoValidationError> {
        Ok(Self {
            title: parse_title(title)?,
            description: description.map(str::trim).unwrap_or_default().to_owned(),
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn into_row(self) -> NewTodoRow {
        NewTodoRow {
            title: self.title,
            description: self.description,
        }
    }
}

/// A validated update request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoUpdate {
    title: String,
    description: Option<String>,
    completed: Option<bool>,
}

impl TodoUpdate {
    /// # Errors
    ///
    /// Returns a [`TodoValidationError`] when the title is blank or too long.
    pub fn parse(
        title: &str,
        description: Option<String>,
        completed: Option<bool>,
    ) -> Result<Self, TodoValidationError> {
        Ok(Self {
            title: parse_title(title)?,
            description,
            completed,
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub const fn completed(&self) -> Option<bool> {
        self.completed
    }

    pub fn into_changeset(self) -> TodoChangeset {
        TodoChangeset {
            title: self.title,
            description: self.description,
            completed: self.completed,
        }
    }
}

pub fn seed_rows() -> Vec<NewTodoRow> {
    SEED_TODOS
        .iter()
        .map(|(title, description)| NewTodoRow {
            title: (*title).to_owned(),
            description: (*description).to_owned(),
        })
        .collect()
}
