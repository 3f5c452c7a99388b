use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::forms::FormPage;

/// Failures reported by the persistence layer.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// A uniqueness rule on `field` was violated.
    #[error("{message}")]
    Conflict { field: &'static str, message: String },

    /// `field` points at a record that does not exist.
    #[error("invalid reference in {field}")]
    InvalidReference { field: &'static str },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type RepoResult<T> = Result<T, RepoError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    /// The submitted form did not validate; carries the page to re-render.
    #[error("form did not validate")]
    Validation(Box<FormPage>),

    #[error(transparent)]
    Repository(#[from] RepoError),
}

impl AppError {
    pub fn not_found(entity: &str, id: i64) -> Self {
        AppError::NotFound(format!("{entity} {id} not found"))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::NotFound(msg) => {
                (StatusCode::NOT_FOUND, Json(json!({ "error": msg }))).into_response()
            }
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": msg }))).into_response()
            }
            AppError::Validation(page) => {
                (StatusCode::UNPROCESSABLE_ENTITY, Json(*page)).into_response()
            }
            AppError::Repository(RepoError::NotFound { entity, id }) => {
                AppError::not_found(entity, id).into_response()
            }
            AppError::Repository(e) => {
                tracing::error!("repository failure: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Internal server error" })),
                )
                    .into_response()
            }
        }
    }
}
