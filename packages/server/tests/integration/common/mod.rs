use std::net::SocketAddr;
use std::sync::Arc;

use ::common::storage::memory::MemoryBlobStore;
use reqwest::Client;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use serde_json::Value;

use migrator::config::{DEFAULT_TRUNCATE_LIMIT, DatabaseConfig};
use migrator::entity::{problem, test_case};
use migrator::migrator::{MigrationService, MigrationSettings};
use migrator::source::memory::{MemoryProblem, MemorySource, MemoryTest};
use migrator::state::AppState;

pub mod routes {
    pub fn preview(polygon_id: i64) -> String {
        format!("/api/v1/polygon/{polygon_id}")
    }

    pub fn migrate(polygon_id: i64) -> String {
        format!("/api/v1/polygon/{polygon_id}/migrate")
    }

    pub fn problem(polygon_id: i64) -> String {
        format!("/api/v1/problems/{polygon_id}")
    }

    pub const SCALAR: &str = "/scalar";
}

/// `n` tests whose bodies encode their ordinal; the first `samples` are samples.
pub fn numbered_tests(n: usize, samples: usize) -> Vec<MemoryTest> {
    (1..=n)
        .map(|i| MemoryTest::new(format!("{i}\n"), format!("{}\n", i * 2), i <= samples))
        .collect()
}

pub fn problem_with_tests(title: &str, tests: Vec<MemoryTest>) -> MemoryProblem {
    MemoryProblem::new(title).with_tests(tests)
}

/// Fresh in-memory database, blob store and source wired into a service.
pub struct TestEnv {
    pub db: DatabaseConnection,
    pub source: Arc<MemorySource>,
    pub store: Arc<MemoryBlobStore>,
    pub service: Arc<MigrationService>,
}

impl TestEnv {
    pub async fn new() -> Self {
        Self::with_source(MemorySource::new()).await
    }

    pub async fn with_source(source: MemorySource) -> Self {
        Self::build(source, DEFAULT_TRUNCATE_LIMIT).await
    }

    pub async fn build(source: MemorySource, truncate_limit: usize) -> Self {
        let db = migrator::database::init_db(&DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
        })
        .await
        .expect("Failed to initialize in-memory database");

        let source = Arc::new(source);
        let store = Arc::new(MemoryBlobStore::new());
        let service = Arc::new(MigrationService::new(
            db.clone(),
            store.clone(),
            source.clone(),
            MigrationSettings {
                truncate_limit,
                cache_capacity: 16,
                fetch_concurrency: 4,
            },
        ));

        Self {
            db,
            source,
            store,
            service,
        }
    }

    pub async fn stored_problem(&self, polygon_id: i64) -> Option<problem::Model> {
        problem::Entity::find()
            .filter(problem::Column::PolygonId.eq(polygon_id))
            .one(&self.db)
            .await
            .expect("query problem")
    }

    pub async fn stored_test_cases(&self, polygon_id: i64) -> Vec<test_case::Model> {
        let Some(problem) = self.stored_problem(polygon_id).await else {
            return Vec::new();
        };
        test_case::Entity::find()
            .filter(test_case::Column::ProblemId.eq(problem.id))
            .order_by_asc(test_case::Column::Ordinal)
            .all(&self.db)
            .await
            .expect("query test cases")
    }
}

/// A running test server.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub env: TestEnv,
}

/// Parsed HTTP response for test assertions.
pub struct TestResponse {
    pub status: u16,
    /// Raw response body as text.
    pub text: String,
    /// Parsed JSON body, or `Null` if the response is not valid JSON.
    pub body: Value,
}

impl TestResponse {
    async fn from_response(res: reqwest::Response) -> Self {
        let status = res.status().as_u16();
        let text = res.text().await.expect("Failed to read response body");
        let body = serde_json::from_str(&text).unwrap_or(Value::Null);
        Self { status, text, body }
    }
}

impl TestApp {
    pub async fn spawn() -> Self {
        let env = TestEnv::new().await;

        let state = AppState {
            db: env.db.clone(),
            migrations: env.service.clone(),
        };
        let app = migrator::build_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            client: Client::new(),
            env,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    pub async fn post(&self, path: &str, body: &Value) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }

    pub async fn post_raw(&self, path: &str, body: &'static str) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }
}
