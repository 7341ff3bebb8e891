//! Error types for the todo API.

use rocket::http::Status;
use rocket::response::{self, Responder};
use rocket::serde::json::Json;
use rocket::Request;
use serde_json::json;

use crate::models::TodoValidationError;
use crate::repository::RepositoryError;

/// Request-level error. Rendered as `{"success": false, "error": ...}`.
///
/// Only the display text of client-facing variants reaches the response body;
/// the sources of `ServiceUnavailable` and `Internal` are logged and dropped.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(#[from] TodoValidationError),

    #[error("Todo not found")]
    NotFound,

    #[error("{0}")]
    Forbidden(&'static str),

    #[error("Service unavailable")]
    ServiceUnavailable(#[source] RepositoryError),

    #[error("Internal server error")]
    Internal(#[source] RepositoryError),
}

impl ApiError {
    pub const fn status(&self) -> Status {
        match self {
            Self::Validation(_) => Status::BadRequest,
            Self::NotFound => Status::NotFound,
            Self::Forbidden(_) => Status::Forbidden,
            Self::ServiceUnavailable(_) => Status::ServiceUnavailable,
            Self::Internal(_) => Status::InternalServerError,
        }
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(_) => Self::NotFound,
            RepositoryError::Connection(_) => Self::ServiceUnavailable(err),
            RepositoryError::Persistence(_) => Self::Internal(err),
        }
    }
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        match &self {
            Self::ServiceUnavailable(source) | Self::Internal(source) => {
                tracing::error!(method = %req.method(), path = %req.uri().path(), error = %source, "request failed");
            }
            other => {
                tracing::debug!(method = %req.method(), path = %req.uri().path(), error = %other, "request rejected");
            }
        }

        let body = json!({ "success": false, "error": self.to_string() });
        (self.status(), Json(body)).respond_to(req)
    }
}

/// Invalid startup configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: &'static str, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_details_never_reach_the_message() {
        let source = RepositoryError::persistence(std::io::Error::other(
            "duplicate key value violates unique constraint \"todos_pkey\"",
        ));
        let err = ApiError::from(source);

        assert_eq!(err.status(), Status::InternalServerError);
        assert_eq!(err.to_string(), "Internal server error");
    }

    #[test]
    fn repository_errors_map_to_taxonomy() {
        assert_eq!(
            ApiError::from(RepositoryError::NotFound(3)).status(),
            Status::NotFound
        );
        let unreachable = RepositoryError::connection(std::io::Error::other("refused"));
        assert_eq!(
            ApiError::from(unreachable).status(),
            Status::ServiceUnavailable
        );
        assert_eq!(
            ApiError::from(TodoValidationError::BlankTitle).to_string(),
            "Title is required"
        );
    }
}
