use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::handlers;
use crate::state::AppState;

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .nest("/polygon", polygon_routes())
        .nest("/problems", problem_routes())
}

fn polygon_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::migration::preview_problem))
        .routes(routes!(handlers::migration::migrate_problem))
}

fn problem_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(handlers::problem::get_problem))
}
