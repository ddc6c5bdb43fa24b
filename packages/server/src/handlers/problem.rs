use axum::Json;
use axum::extract::{Path, State};
use sea_orm::*;
use tracing::instrument;

use crate::entity::{problem, problem_tag, tag, test_case};
use crate::error::{AppError, ErrorBody};
use crate::models::problem::ProblemResponse;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/{polygon_id}",
    tag = "Problems",
    operation_id = "getMigratedProblem",
    summary = "Get a migrated problem",
    description = "Returns the stored problem with its tags and truncated test case rows, ordered by ordinal.",
    params(("polygon_id" = i64, Path, description = "Polygon problem id")),
    responses(
        (status = 200, description = "Stored problem", body = ProblemResponse),
        (status = 404, description = "Problem not migrated (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn get_problem(
    State(state): State<AppState>,
    Path(polygon_id): Path<i64>,
) -> Result<Json<ProblemResponse>, AppError> {
    let model = problem::Entity::find()
        .filter(problem::Column::PolygonId.eq(polygon_id))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Problem {polygon_id} not found")))?;

    let tag_ids: Vec<i32> = problem_tag::Entity::find()
        .filter(problem_tag::Column::ProblemId.eq(model.id))
        .all(&state.db)
        .await?
        .into_iter()
        .map(|link| link.tag_id)
        .collect();

    let tags = if tag_ids.is_empty() {
        Vec::new()
    } else {
        tag::Entity::find()
            .filter(tag::Column::Id.is_in(tag_ids))
            .order_by_asc(tag::Column::Name)
            .all(&state.db)
            .await?
            .into_iter()
            .map(|t| t.name)
            .collect()
    };

    let test_cases = test_case::Entity::find()
        .filter(test_case::Column::ProblemId.eq(model.id))
        .order_by_asc(test_case::Column::Ordinal)
        .all(&state.db)
        .await?;

    Ok(Json(ProblemResponse::new(model, tags, test_cases)))
}
