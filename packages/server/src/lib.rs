pub mod cache;
pub mod config;
pub mod database;
pub mod entity;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod migrator;
pub mod models;
pub mod routes;
pub mod snapshot;
pub mod source;
pub mod state;
pub mod sync;
pub mod utils;

use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_scalar::{Scalar, Servable as ScalarServable};

use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Polygon Migrator API",
        version = "1.0.0",
        description = "Migrates Polygon problems into the local database and blob storage"
    ),
    tags(
        (name = "Migration", description = "Fetching and migrating problems from Polygon"),
        (name = "Problems", description = "Migrated problems as stored locally"),
    ),
)]
struct ApiDoc;

/// Build the application router.
pub fn build_router(state: AppState) -> axum::Router {
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .nest("/api", routes::api_routes())
        .split_for_parts();

    router
        .with_state(state)
        .merge(Scalar::with_url("/scalar", api))
        .layer(TraceLayer::new_for_http())
}
