//! PostgreSQL adapter backed by a Diesel r2d2 pool.

use async_trait::async_trait;
use diesel::connection::SimpleConnection;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::sql_types::{Bool, Integer};
use rocket::tokio::task::spawn_blocking;

use super::{RepositoryError, RepositoryResult, SchemaStatus, TodoRepository};
use crate::models::{seed_rows, NewTodo, Todo, TodoRow, TodoUpdate};
use crate::schema::todos;

pub type PgPool = Pool<ConnectionManager<PgConnection>>;

const CREATE_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS todos (
        id SERIAL PRIMARY KEY,
        title VARCHAR(255) NOT NULL,
        description TEXT,
        completed BOOLEAN DEFAULT FALSE,
        created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
        updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
    );";

const DROP_TABLE: &str = "DROP TABLE IF EXISTS todos CASCADE;";

const TABLE_EXISTS: &str = "
    SELECT EXISTS (
        SELECT FROM information_schema.tables
        WHERE table_schema = current_schema() AND table_name = 'todos'
    ) AS present";

#[derive(QueryableByName)]
struct TablePresence {
    #[diesel(sql_type = Bool)]
    present: bool,
}

#[derive(Debug, Clone)]
pub struct PostgresTodoRepository {
    pool: PgPool,
}

impl PostgresTodoRepository {
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Checks a connection out of the pool on a blocking thread and runs `f`.
    /// The connection goes back to the pool when `f` returns, whatever the outcome.
    async fn run<F, T>(&self, f: F) -> RepositoryResult<T>
    where
        F: FnOnce(&mut PgConnection) -> RepositoryResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        spawn_blocking(move || {
            let mut connection = pool.get().map_err(RepositoryError::connection)?;
            f(&mut connection)
        })
        .await
        .map_err(RepositoryError::persistence)?
    }
}

fn storage_error(err: DieselError) -> RepositoryError {
    match err {
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            RepositoryError::connection(err)
        }
        _ => RepositoryError::persistence(err),
    }
}

fn not_found_or(id: i32) -> impl FnOnce(Option<TodoRow>) -> RepositoryResult<Todo> {
    move |row| row.map(Todo::from).ok_or(RepositoryError::NotFound(id))
}

fn insert_seed(connection: &mut PgConnection) -> Result<usize, DieselError> {
    diesel::insert_into(todos::table)
        .values(&seed_rows())
        .execute(connection)
}

#[async_trait]
impl TodoRepository for PostgresTodoRepository {
    async fn ping(&self) -> RepositoryResult<i32> {
        self.run(|c| {
            diesel::select(diesel::dsl::sql::<Integer>("1"))
                .get_result::<i32>(c)
                .map_err(storage_error)
        })
        .await
    }

    async fn ensure_schema(&self, seed_if_created: bool) -> RepositoryResult<SchemaStatus> {
        self.run(move |c| {
            c.transaction::<_, DieselError, _>(|c| {
                let existed = diesel::sql_query(TABLE_EXISTS)
                    .get_result::<TablePresence>(c)?
                    .present;
                c.batch_execute(CREATE_TABLE)?;

                let created = !existed;
                let seeded = created && seed_if_created;
                if seeded {
                    insert_seed(c)?;
                }
                let rows = todos::table.count().get_result::<i64>(c)?;
                Ok(SchemaStatus {
                    created,
                    seeded,
                    rows,
                })
            })
            .map_err(storage_error)
        })
        .await
    }

    async fn reset(&self) -> RepositoryResult<usize> {
        self.run(|c| {
            c.transaction::<_, DieselError, _>(|c| {
                c.batch_execute(DROP_TABLE)?;
                c.batch_execute(CREATE_TABLE)?;
                insert_seed(c)
            })
            .map_err(storage_error)
        })
        .await
    }

    async fn list(&self) -> RepositoryResult<Vec<Todo>> {
        self.run(|c| {
            todos::table
                .order((todos::created_at.desc(), todos::id.desc()))
                .select(TodoRow::as_select())
                .load::<TodoRow>(c)
                .map(|rows| rows.into_iter().map(Todo::from).collect())
                .map_err(storage_error)
        })
        .await
    }

    async fn find(&self, id: i32) -> RepositoryResult<Todo> {
        self.run(move |c| {
            todos::table
                .find(id)
                .select(TodoRow::as_select())
                .first::<TodoRow>(c)
                .optional()
                .map_err(storage_error)
                .and_then(not_found_or(id))
        })
        .await
    }

    async fn create(&self, todo: NewTodo) -> RepositoryResult<Todo> {
        let row = todo.into_row();
        self.run(move |c| {
            diesel::insert_into(todos::table)
                .values(&row)
                .returning(TodoRow::as_returning())
                .get_result::<TodoRow>(c)
                .map(Todo::from)
                .map_err(storage_error)
        })
        .await
    }

    async fn update(&self, id: i32, update: TodoUpdate) -> RepositoryResult<Todo> {
        let changes = update.into_changeset();
        self.run(move |c| {
            diesel::update(todos::table.find(id))
                .set((&changes, todos::updated_at.eq(diesel::dsl::now)))
                .returning(TodoRow::as_returning())
                .get_result::<TodoRow>(c)
                .optional()
                .map_err(storage_error)
                .and_then(not_found_or(id))
        })
        .await
    }

    async fn delete(&self, id: i32) -> RepositoryResult<Todo> {
        self.run(move |c| {
            diesel::delete(todos::table.find(id))
                .returning(TodoRow::as_returning())
                .get_result::<TodoRow>(c)
                .optional()
                .map_err(storage_error)
                .and_then(not_found_or(id))
        })
        .await
    }
}
