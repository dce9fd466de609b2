//! Error types for the application

use std::collections::BTreeMap;

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::handover::workflow::WorkflowError;

/// Per-field validation messages, keyed by field name
pub type FieldErrors = BTreeMap<String, String>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication required: {0}")]
    Authentication(String),

    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        fields: FieldErrors,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Stage conflict: {0}")]
    StageConflict(String),

    #[error("Not authorized: {0}")]
    Authorization(String),

    #[error("Directory error: {0}")]
    Directory(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Validation error for a single field
    pub fn invalid_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        let mut fields = FieldErrors::new();
        fields.insert(field.into(), reason.into());
        AppError::Validation {
            message: "Invalid handover request".to_string(),
            fields,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Authentication(_) => StatusCode::UNAUTHORIZED,
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::StageConflict(_) => StatusCode::CONFLICT,
            AppError::Authorization(_) => StatusCode::FORBIDDEN,
            AppError::Directory(_) => StatusCode::BAD_GATEWAY,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable code for client-side handling
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Authentication(_) => "AUTHENTICATION_ERROR",
            AppError::Validation { .. } => "VALIDATION_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::StageConflict(_) => "STAGE_CONFLICT",
            AppError::Authorization(_) => "AUTHORIZATION_ERROR",
            AppError::Directory(_) => "DIRECTORY_ERROR",
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<WorkflowError> for AppError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::StageConflict { .. } => AppError::StageConflict(err.to_string()),
            WorkflowError::NotHeadOfDepartment { .. } | WorkflowError::NotReceiver => {
                AppError::Authorization(err.to_string())
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        let text = rejection.body_text();
        let (field, reason) = rejected_field(&text).unwrap_or(("body", text.as_str()));
        AppError::invalid_field(field, reason)
    }
}

/// Split a JSON body rejection such as
/// `Failed to deserialize ...: handover_start_date: input is out of range`
/// into the offending field path and the reason.
fn rejected_field(text: &str) -> Option<(&str, &str)> {
    let (_, detail) = text.split_once(": ")?;
    let (path, reason) = detail.split_once(": ")?;
    let is_path = !path.is_empty()
        && path
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '[' | ']'));
    is_path.then_some((path, reason))
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            AppError::Authentication(_) => "Session expired or missing, please log in again".to_string(),
            AppError::Validation { message, .. } => message.clone(),
            AppError::NotFound(e)
            | AppError::StageConflict(e)
            | AppError::Authorization(e) => e.clone(),
            AppError::Directory(e) => {
                tracing::error!("Directory error: {}", e);
                "Employee directory unavailable".to_string()
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                "Database error".to_string()
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {}", e);
                e.clone()
            }
        };

        let mut body = json!({
            "error": true,
            "code": self.code(),
            "message": message,
        });
        if let AppError::Validation { fields, .. } = &self {
            body["field_errors"] = json!(fields);
        }

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
