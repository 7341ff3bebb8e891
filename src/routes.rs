use chrono::{SecondsFormat, Utc};
use rocket::http::Status;
use rocket::request::{self, FromRequest, Request};
use rocket::response::status;
use rocket::serde::json::Json;
use rocket::State;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::AppConfig;
use crate::error::ApiError;
use crate::models::{NewTodo, Todo, TodoUpdate};
use crate::repository::SharedRepository;

type Repo = State<SharedRepository>;

/// Success envelope shared by every `/api` endpoint.
#[derive(Serialize, Debug)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

impl<T> ApiResponse<T> {
    fn new(data: T) -> Self {
        Self {
            success: true,
            data,
            count: None,
            message: None,
        }
    }

    fn with_message(mut self, message: &'static str) -> Self {
        self.message = Some(message);
        self
    }
}

#[derive(Deserialize, Debug, Default)]
pub struct CreateTodoRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct UpdateTodoRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub completed: Option<bool>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ResetSummary {
    pub table: &'static str,
    pub records: usize,
}

/// Value of the `X-Admin-Token` header, if any.
pub struct AdminToken(Option<String>);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AdminToken {
    type Error = std::convert::Infallible;

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let token = req.headers().get_one("X-Admin-Token").map(str::to_owned);
        request::Outcome::Success(Self(token))
    }
}

/// Decides whether the destructive reset may run.
///
/// A configured `ADMIN_TOKEN` must be presented verbatim. Without one, reset
/// is only available outside production.
pub fn authorize_reset(config: &AppConfig, presented: Option<&str>) -> Result<(), ApiError> {
    match (&config.admin_token, presented) {
        (Some(expected), Some(given)) if expected == given => Ok(()),
        (Some(_), _) => Err(ApiError::Forbidden("Invalid admin token")),
        (None, _) if config.environment.is_production() => {
            Err(ApiError::Forbidden("Database reset is disabled"))
        }
        (None, _) => Ok(()),
    }
}

/// Path ids that do not parse as an `i32` cannot name a stored todo.
fn todo_id(raw: Result<i32, &str>) -> Result<i32, ApiError> {
    raw.map_err(|_| ApiError::NotFound)
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[get("/")]
pub fn index(config: &State<AppConfig>) -> Json<Value> {
    Json(json!({
        "message": "Todo App Backend API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "health": "/api/health",
            "todos": "/api/todos",
            "initDb": "/api/init-db (POST)"
        },
        "environment": config.environment.as_str(),
    }))
}

#[get("/health")]
pub async fn health(repo: &Repo, config: &State<AppConfig>) -> status::Custom<Json<Value>> {
    match repo.ping().await {
        Ok(test) => status::Custom(
            Status::Ok,
            Json(json!({
                "status": "OK",
                "message": "Server and database are running",
                "timestamp": timestamp(),
                "environment": config.environment.as_str(),
                "database": "connected",
                "databaseTest": test,
            })),
        ),
        Err(err) => {
            tracing::warn!(error = %err, "health check could not reach the database");
            status::Custom(
                Status::ServiceUnavailable,
                Json(json!({
                    "status": "ERROR",
                    "message": "Server running but database connection failed",
                    "timestamp": timestamp(),
                    "environment": config.environment.as_str(),
                })),
            )
        }
    }
}

#[get("/todos")]
pub async fn list_todos(repo: &Repo) -> Result<Json<ApiResponse<Vec<Todo>>>, ApiError> {
    let todos = repo.list().await?;
    let count = todos.len();
    let mut response = ApiResponse::new(todos);
    response.count = Some(count);
    Ok(Json(response))
}

#[get("/todos/<id>")]
pub async fn get_todo(
    repo: &Repo,
    id: Result<i32, &str>,
) -> Result<Json<ApiResponse<Todo>>, ApiError> {
    let todo = repo.find(todo_id(id)?).await?;
    Ok(Json(ApiResponse::new(todo)))
}

#[post("/todos", data = "<body>")]
pub async fn create_todo(
    repo: &Repo,
    body: Json<CreateTodoRequest>,
) -> Result<status::Custom<Json<ApiResponse<Todo>>>, ApiError> {
    let body = body.into_inner();
    let new_todo = NewTodo::parse(
        body.title.as_deref().unwrap_or_default(),
        body.description.as_deref(),
    )?;

    let todo = repo.create(new_todo).await?;
    tracing::info!(id = todo.id, "created todo");
    Ok(status::Custom(
        Status::Created,
        Json(ApiResponse::new(todo).with_message("Todo created successfully")),
    ))
}

#[put("/todos/<id>", data = "<body>")]
pub async fn update_todo(
    repo: &Repo,
    id: Result<i32, &str>,
    body: Json<UpdateTodoRequest>,
) -> Result<Json<ApiResponse<Todo>>, ApiError> {
    let id = todo_id(id)?;
    let body = body.into_inner();
    let update = TodoUpdate::parse(
        body.title.as_deref().unwrap_or_default(),
        body.description,
        body.completed,
    )?;

    let todo = repo.update(id, update).await?;
    Ok(Json(
        ApiResponse::new(todo).with_message("Todo updated successfully"),
    ))
}

#[delete("/todos/<id>")]
pub async fn delete_todo(
    repo: &Repo,
    id: Result<i32, &str>,
) -> Result<Json<ApiResponse<Todo>>, ApiError> {
    let id = todo_id(id)?;
    let todo = repo.delete(id).await?;
    tracing::info!(id, "deleted todo");
    Ok(Json(
        ApiResponse::new(todo).with_message("Todo deleted successfully"),
    ))
}

/// Drops the table and reseeds it. Destroys every stored todo.
#[post("/init-db")]
pub async fn init_db(
    repo: &Repo,
    config: &State<AppConfig>,
    token: AdminToken,
) -> Result<Json<ApiResponse<ResetSummary>>, ApiError> {
    authorize_reset(config, token.0.as_deref())?;

    tracing::warn!("resetting todos table");
    let records = repo.reset().await.map_err(ApiError::Internal)?;
    tracing::info!(records, "todos table reset");

    Ok(Json(
        ApiResponse::new(ResetSummary {
            table: "todos",
            records,
        })
        .with_message("Database initialized successfully"),
    ))
}

/// Answers CORS preflight requests; headers are added by the CORS fairing.
#[options("/<_..>")]
pub fn preflight() -> Status {
    Status::NoContent
}

#[catch(404)]
pub fn not_found(req: &Request<'_>) -> Json<Value> {
    Json(json!({
        "success": false,
        "error": "Route not found",
        "path": req.uri().path().to_string(),
    }))
}

#[catch(400)]
pub fn bad_request() -> Json<Value> {
    Json(json!({ "success": false, "error": "Invalid request body" }))
}

/// Bodies that are valid JSON but of the wrong shape are bad input too.
#[catch(422)]
pub fn unprocessable() -> status::Custom<Json<Value>> {
    status::Custom(
        Status::BadRequest,
        Json(json!({ "success": false, "error": "Invalid request body" })),
    )
}

#[catch(default)]
pub fn fallback(status: Status, _req: &Request<'_>) -> status::Custom<Json<Value>> {
    let error = if status.code >= 500 {
        "Internal server error"
    } else {
        status.reason().unwrap_or("Request failed")
    };
    status::Custom(status, Json(json!({ "success": false, "error": error })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Environment;

    fn config(environment: Environment, admin_token: Option<&str>) -> AppConfig {
        AppConfig {
            environment,
            admin_token: admin_token.map(str::to_owned),
            ..AppConfig::default()
        }
    }

    #[test]
    fn reset_needs_matching_token_when_configured() {
        let cfg = config(Environment::Development, Some("s3cret"));
        assert!(authorize_reset(&cfg, Some("s3cret")).is_ok());
        assert!(matches!(
            authorize_reset(&cfg, Some("guess")),
            Err(ApiError::Forbidden(_))
        ));
        assert!(matches!(
            authorize_reset(&cfg, None),
            Err(ApiError::Forbidden(_))
        ));
    }

    #[test]
    fn tokenless_reset_is_refused_only_in_production() {
        assert!(authorize_reset(&config(Environment::Development, None), None).is_ok());
        assert!(authorize_reset(&config(Environment::Test, None), None).is_ok());
        assert!(matches!(
            authorize_reset(&config(Environment::Production, None), None),
            Err(ApiError::Forbidden(_))
        ));
    }
}
