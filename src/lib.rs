//! Todo REST API on Rocket and PostgreSQL, plus a typed client.

#[macro_use]
extern crate rocket;

pub mod client;
pub mod config;
pub mod error;
pub mod fairings;
pub mod models;
pub mod repository;
pub mod routes;
pub mod schema;

use std::sync::Arc;

use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool};
use rocket::{Build, Rocket};

use crate::config::{AppConfig, DatabaseConfig};
use crate::repository::{PgPool, PostgresTodoRepository, SharedRepository};

/// Builds the pool without connecting; connections are opened on first use.
pub fn build_pool(config: &DatabaseConfig) -> PgPool {
    let manager = ConnectionManager::<PgConnection>::new(config.connection_string());
    Pool::builder()
        .max_size(config.pool_size)
        .connection_timeout(config.connect_timeout)
        .idle_timeout(Some(config.idle_timeout))
        .build_unchecked(manager)
}

pub fn postgres_repository(config: &DatabaseConfig) -> SharedRepository {
    Arc::new(PostgresTodoRepository::new(build_pool(config)))
}

/// Assembles the server around an already-built repository.
pub fn rocket(config: AppConfig, repo: SharedRepository) -> Rocket<Build> {
    let figment = rocket::Config::figment().merge(("port", config.port));

    rocket::custom(figment)
        .manage(config)
        .manage(repo)
        .attach(fairings::RequestLog)
        .attach(fairings::Cors)
        .attach(fairings::schema_bootstrap())
        .attach(fairings::lifecycle_log())
        .attach(fairings::shutdown_log())
        .mount("/", routes![routes::index, routes::preflight])
        .mount(
            "/api",
            routes![
                routes::health,
                routes::list_todos,
                routes::get_todo,
                routes::create_todo,
                routes::update_todo,
                routes::delete_todo,
                routes::init_db,
            ],
        )
        .register(
            "/",
            catchers![
                routes::not_found,
                routes::bad_request,
                routes::unprocessable,
                routes::fallback,
            ],
        )
}
