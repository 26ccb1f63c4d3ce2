use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

#[derive(Debug)]
pub enum AppError {
    AlreadyExists(String),
    NotFound(String),
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    Database(sqlx::Error),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::AlreadyExists(msg) => write!(f, "already exists: {msg}"),
            AppError::NotFound(msg) => write!(f, "not found: {msg}"),
            AppError::BadRequest(msg) => write!(f, "bad request: {msg}"),
            AppError::Unauthorized(msg) => write!(f, "unauthorized: {msg}"),
            AppError::Forbidden(msg) => write!(f, "forbidden: {msg}"),
            AppError::Database(e) => write!(f, "database error: {e}"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            // Domain failures are client-correctable argument errors, so a
            // missing username answers 400 here, not 404.
            AppError::AlreadyExists(msg) => {
                tracing::warn!(error_type = "already_exists", message = %msg, "Responding with 400");
                (StatusCode::BAD_REQUEST, msg)
            }
            AppError::NotFound(msg) => {
                tracing::warn!(error_type = "not_found", message = %msg, "Responding with 400");
                (StatusCode::BAD_REQUEST, msg)
            }
            AppError::BadRequest(msg) => {
                tracing::warn!(error_type = "bad_request", message = %msg, "Responding with 400");
                (StatusCode::BAD_REQUEST, msg)
            }
            AppError::Unauthorized(msg) => {
                tracing::warn!(error_type = "unauthorized", message = %msg, "Responding with 401");
                (StatusCode::UNAUTHORIZED, msg)
            }
            AppError::Forbidden(msg) => {
                tracing::warn!(error_type = "forbidden", message = %msg, "Responding with 403");
                (StatusCode::FORBIDDEN, msg)
            }
            AppError::Database(e) => {
                tracing::error!(error_type = "database", error = %e, "Responding with 500");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Database(e)
    }
}
