use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::DbErr;
use serde::Serialize;

use crate::source::SourceError;
use crate::sync::RelationalOutcome;

/// Failure of a fetch or reconcile.
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    /// The source could not be reached or refused the request. Nothing local was written.
    #[error("problem source unavailable: {0}")]
    SourceUnavailable(#[from] SourceError),

    /// Blob sync requested for a problem with no relational record.
    #[error("problem {polygon_id} has not been migrated to the database yet")]
    NotMigrated { polygon_id: i64 },

    /// Some objects were not uploaded. Re-running the blob sync is safe.
    ///
    /// `relational` holds the database result when it committed in the same run.
    #[error(
        "blob upload incomplete for {namespace}: failed ordinals {failed:?}, checker failed: {checker_failed}, database written: {}",
        .relational.is_some()
    )]
    PartialUploadFailure {
        namespace: String,
        succeeded: Vec<u32>,
        failed: Vec<u32>,
        checker_failed: bool,
        relational: Option<Box<RelationalOutcome>>,
    },

    /// The relational transaction was rolled back.
    #[error("database write failed: {0}")]
    PersistenceFailure(#[from] DbErr),

    #[error("{0}")]
    InvalidInput(String),
}

impl MigrationError {
    /// Attach the relational result that committed before a blob failure.
    pub(crate) fn with_relational(mut self, outcome: Option<RelationalOutcome>) -> Self {
        if let MigrationError::PartialUploadFailure { relational, .. } = &mut self {
            *relational = outcome.map(Box::new);
        }
        self
    }
}

/// Structured error response returned by all endpoints on failure.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Machine-readable error code. One of: `VALIDATION_ERROR`, `NOT_FOUND`,
    /// `SOURCE_UNAVAILABLE`, `NOT_MIGRATED`, `PARTIAL_UPLOAD_FAILURE`,
    /// `PERSISTENCE_FAILURE`, `INTERNAL_ERROR`.
    #[schema(example = "NOT_MIGRATED")]
    pub code: &'static str,
    /// Human-readable error description.
    #[schema(example = "Problem 12345 has not been migrated to the database yet")]
    pub message: String,
    /// Ordinals whose upload failed. Only set for `PARTIAL_UPLOAD_FAILURE`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_ordinals: Option<Vec<u32>>,
    /// Database result that was kept although the upload failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relational: Option<RelationalOutcome>,
}

impl ErrorBody {
    fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            failed_ordinals: None,
            relational: None,
        }
    }
}

/// Application-level error type.
#[derive(Debug)]
pub enum AppError {
    Validation(String),
    NotFound(String),
    Migration(MigrationError),
    Internal(String),
}

impl AppError {
    fn status_and_body(self) -> (StatusCode, ErrorBody) {
        match self {
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody::new("VALIDATION_ERROR", msg),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorBody::new("NOT_FOUND", msg)),
            AppError::Migration(err) => migration_status_and_body(err),
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody::new("INTERNAL_ERROR", "An unexpected error occurred"),
                )
            }
        }
    }
}

fn migration_status_and_body(err: MigrationError) -> (StatusCode, ErrorBody) {
    match err {
        MigrationError::SourceUnavailable(source) => {
            tracing::warn!("Source unavailable: {source}");
            (
                StatusCode::BAD_GATEWAY,
                ErrorBody::new(
                    "SOURCE_UNAVAILABLE",
                    format!("Could not fetch the problem from Polygon: {source}"),
                ),
            )
        }
        MigrationError::NotMigrated { polygon_id } => (
            StatusCode::CONFLICT,
            ErrorBody::new(
                "NOT_MIGRATED",
                format!(
                    "Problem {polygon_id} has not been migrated to the database yet; run the database migration first"
                ),
            ),
        ),
        MigrationError::PartialUploadFailure {
            succeeded,
            failed,
            checker_failed,
            relational,
            ..
        } => {
            let mut message = format!(
                "Uploaded {} test cases, {} failed; retrying the blob migration is safe",
                succeeded.len(),
                failed.len()
            );
            if checker_failed {
                message.push_str(" (checker upload also failed)");
            }
            if relational.is_some() {
                message.push_str(". The database records were saved");
            }
            (
                StatusCode::BAD_GATEWAY,
                ErrorBody {
                    code: "PARTIAL_UPLOAD_FAILURE",
                    message,
                    failed_ordinals: Some(failed),
                    relational: relational.map(|outcome| *outcome),
                },
            )
        }
        MigrationError::PersistenceFailure(db_err) => {
            tracing::error!("Persistence failure: {db_err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody::new(
                    "PERSISTENCE_FAILURE",
                    "Saving the problem to the database failed; no changes were kept",
                ),
            )
        }
        MigrationError::InvalidInput(msg) => (
            StatusCode::BAD_REQUEST,
            ErrorBody::new("VALIDATION_ERROR", msg),
        ),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}

impl From<MigrationError> for AppError {
    fn from(err: MigrationError) -> Self {
        AppError::Migration(err)
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        AppError::Internal(err.to_string())
    }
}
