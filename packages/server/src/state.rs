use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::migrator::MigrationService;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub migrations: Arc<MigrationService>,
}
