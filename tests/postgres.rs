//! Repository tests against a real PostgreSQL database.
//!
//! Skipped unless `TEST_DATABASE_URL` points at a disposable database: the
//! test resets the `todos` table.

use std::time::Duration;

use todo_api::config::AppConfig;
use todo_api::models::{NewTodo, TodoUpdate};
use todo_api::repository::{RepositoryError, SharedRepository};

fn repository() -> Option<SharedRepository> {
    let url = std::env::var("TEST_DATABASE_URL").ok()?;
    let mut database = AppConfig::default().database;
    database.url = Some(url);
    database.pool_size = 2;
    database.connect_timeout = Duration::from_secs(5);
    Some(todo_api::postgres_repository(&database))
}

#[tokio::test(flavor = "multi_thread")]
async fn crud_round_trip_against_postgres() {
    let Some(repo) = repository() else {
        eprintln!("TEST_DATABASE_URL not set; skipping");
        return;
    };

    assert_eq!(repo.ping().await.expect("ping"), 1);
    assert_eq!(repo.reset().await.expect("reset"), 3);
    let status = repo.ensure_schema(true).await.expect("ensure");
    assert!(!status.created);
    assert_eq!(status.rows, 3);

    let created = repo
        .create(NewTodo::parse("Skriv tester", None).expect("valid"))
        .await
        .expect("create");
    assert!(!created.completed);
    assert_eq!(created.description, "");

    let listed = repo.list().await.expect("list");
    assert_eq!(listed.len(), 4);
    assert_eq!(listed[0].id, created.id);

    let update = TodoUpdate::parse("Skriv fler tester", None, Some(true)).expect("valid");
    let updated = repo.update(created.id, update).await.expect("update");
    assert!(updated.completed);
    assert_eq!(updated.description, "");
    assert!(updated.updated_at > created.updated_at);

    let missing = TodoUpdate::parse("x", None, None).expect("valid");
    assert!(matches!(
        repo.update(999_999, missing).await,
        Err(RepositoryError::NotFound(999_999))
    ));

    let deleted = repo.delete(created.id).await.expect("delete");
    assert_eq!(deleted.id, created.id);
    assert!(matches!(
        repo.find(created.id).await,
        Err(RepositoryError::NotFound(_))
    ));

    assert_eq!(repo.reset().await.expect("reset"), 3);
    assert_eq!(repo.list().await.expect("list").len(), 3);
}
