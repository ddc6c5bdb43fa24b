use serde::Deserialize;

/// Polygon API connection settings.
#[derive(Debug, Deserialize, Clone)]
pub struct PolygonConfig {
    /// Base URL including the trailing slash. Default: "https://polygon.codeforces.com/api/".
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub api_secret: String,
    /// Testset to migrate. Default: "tests".
    #[serde(default = "default_testset")]
    pub testset: String,
    /// Maximum number of test bodies fetched in parallel. Default: 4.
    #[serde(default = "default_fetch_concurrency")]
    pub fetch_concurrency: usize,
    /// Per-request timeout in seconds. Default: 60.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_api_url() -> String {
    "https://polygon.codeforces.com/api/".into()
}
fn default_testset() -> String {
    "tests".into()
}
fn default_fetch_concurrency() -> usize {
    4
}
fn default_timeout_secs() -> u64 {
    60
}

impl Default for PolygonConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_key: String::new(),
            api_secret: String::new(),
            testset: default_testset(),
            fetch_concurrency: default_fetch_concurrency(),
            timeout_secs: default_timeout_secs(),
        }
    }
}
