//! Error types for the HTTP layer

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use clause_guard_core::ExtractError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("No file selected")]
    NoFileSelected,

    #[error("Invalid file type")]
    InvalidFileType(String),

    #[error("Could not read document: {0}")]
    ExtractionFailed(String),

    #[error("{0}")]
    Validation(String),

    #[error("A user with that username or email already exists")]
    UserExists,

    #[error("Invalid credentials. Check email and password.")]
    InvalidCredentials,

    #[error("Authentication required")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(&'static str),

    #[error("Analysis log not found: {0}")]
    LogNotFound(i64),

    #[error("Upload exceeds the {0} byte limit")]
    PayloadTooLarge(usize),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NoFileSelected
            | ApiError::InvalidFileType(_)
            | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::ExtractionFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::UserExists => StatusCode::CONFLICT,
            ApiError::InvalidCredentials | ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::LogNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Database(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ExtractError> for ApiError {
    fn from(err: ExtractError) -> Self {
        match err {
            ExtractError::UnsupportedExtension(ext) => ApiError::InvalidFileType(ext),
            other => ApiError::ExtractionFailed(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Database(e) => {
                tracing::error!("Database error: {}", e);
                "Database error".to_string()
            }
            ApiError::Internal(e) => {
                tracing::error!("Internal error: {:#}", e);
                "Internal error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": message,
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extraction_errors_map_to_distinct_kinds() {
        let unsupported = ApiError::from(ExtractError::UnsupportedExtension("exe".into()));
        assert!(matches!(unsupported, ApiError::InvalidFileType(ref ext) if ext == "exe"));
        assert_eq!(unsupported.status(), StatusCode::BAD_REQUEST);

        let broken = ApiError::from(ExtractError::Pdf("bad xref".into()));
        assert!(matches!(broken, ApiError::ExtractionFailed(_)));
        assert_eq!(broken.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn internal_errors_hide_details() {
        let response = ApiError::Internal(anyhow::anyhow!("secret path /etc")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn messages_match_upload_errors() {
        assert_eq!(ApiError::NoFileSelected.to_string(), "No file selected");
        assert_eq!(
            ApiError::InvalidFileType("exe".into()).to_string(),
            "Invalid file type"
        );
    }
}
