use axum::Json;
use axum::extract::{Path, State};
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::json::AppJson;
use crate::models::migration::*;
use crate::state::AppState;
use crate::sync::ReconcileResult;

#[utoipa::path(
    get,
    path = "/{polygon_id}",
    tag = "Migration",
    operation_id = "previewPolygonProblem",
    summary = "Fetch a problem from Polygon without saving it",
    description = "Fetches metadata, statement, test list and checker from Polygon and returns a preview. Test bodies are cut to the first 100 characters. Nothing is written.",
    params(("polygon_id" = i64, Path, description = "Polygon problem id")),
    responses(
        (status = 200, description = "Snapshot preview", body = SnapshotPreview),
        (status = 400, description = "Invalid id (VALIDATION_ERROR)", body = ErrorBody),
        (status = 502, description = "Polygon unreachable or refused (SOURCE_UNAVAILABLE)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn preview_problem(
    State(state): State<AppState>,
    Path(polygon_id): Path<i64>,
) -> Result<Json<SnapshotPreview>, AppError> {
    let snapshot = state.migrations.session().fetch(polygon_id).await?;
    Ok(Json(SnapshotPreview::from(&snapshot)))
}

#[utoipa::path(
    post,
    path = "/{polygon_id}/migrate",
    tag = "Migration",
    operation_id = "migratePolygonProblem",
    summary = "Migrate a problem to the database and/or blob storage",
    description = "Fetches the problem from Polygon and reconciles the selected targets with it. The database sync replaces all test case rows in one transaction. The blob sync clears the problem's namespace and re-uploads every test file; it requires a prior database sync. Concurrent calls for the same id run one after another.",
    params(("polygon_id" = i64, Path, description = "Polygon problem id")),
    request_body = MigrateRequest,
    responses(
        (status = 200, description = "Migration finished", body = ReconcileResult),
        (status = 400, description = "Invalid id or no target selected (VALIDATION_ERROR)", body = ErrorBody),
        (status = 409, description = "Blob sync before database sync (NOT_MIGRATED)", body = ErrorBody),
        (status = 500, description = "Database transaction rolled back (PERSISTENCE_FAILURE)", body = ErrorBody),
        (status = 502, description = "Polygon unavailable (SOURCE_UNAVAILABLE) or some uploads failed (PARTIAL_UPLOAD_FAILURE)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(relational = payload.relational, blob = payload.blob))]
pub async fn migrate_problem(
    State(state): State<AppState>,
    Path(polygon_id): Path<i64>,
    AppJson(payload): AppJson<MigrateRequest>,
) -> Result<Json<ReconcileResult>, AppError> {
    let targets = payload.targets();
    let result = state
        .migrations
        .session()
        .reconcile(polygon_id, targets, payload.tags, payload.difficulty)
        .await?;
    Ok(Json(result))
}
