use std::collections::BTreeMap;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::PolygonConfig;
use crate::error::PolygonError;
use crate::models::{ApiResponse, ProblemInfo, Solution, Statement, Test};
use crate::signature;

/// Authenticated Polygon API client.
///
/// Every method is a single POST; no retries are attempted here.
#[derive(Clone)]
pub struct PolygonClient {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
    api_secret: String,
}

impl PolygonClient {
    pub fn new(config: &PolygonConfig) -> Result<Self, PolygonError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let mut api_url = config.api_url.clone();
        if !api_url.ends_with('/') {
            api_url.push('/');
        }

        Ok(Self {
            http,
            api_url,
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
        })
    }

    fn signed_params(&self, method: &str, params: &[(&str, String)]) -> Vec<(String, String)> {
        let mut all: Vec<(String, String)> = params
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        all.push(("apiKey".into(), self.api_key.clone()));
        all.push(("time".into(), chrono::Utc::now().timestamp().to_string()));

        let sig = signature::sign(
            method,
            &all,
            &self.api_secret,
            &signature::random_prefix(),
        );
        all.push(("apiSig".into(), sig));
        all
    }

    async fn post(
        &self,
        method: &str,
        params: &[(&str, String)],
    ) -> Result<reqwest::Response, PolygonError> {
        debug!(method, "Polygon request");
        let form = self.signed_params(method, params);
        Ok(self
            .http
            .post(format!("{}{}", self.api_url, method))
            .form(&form)
            .send()
            .await?)
    }

    async fn call_json<T: DeserializeOwned>(
        &self,
        method: &str,
        params: &[(&str, String)],
    ) -> Result<T, PolygonError> {
        let body = self.post(method, params).await?.bytes().await?;
        let envelope: ApiResponse<T> = serde_json::from_slice(&body)?;

        if envelope.status != "OK" {
            return Err(PolygonError::Api(
                envelope
                    .comment
                    .unwrap_or_else(|| format!("{method} failed without comment")),
            ));
        }

        envelope
            .result
            .ok_or_else(|| PolygonError::UnexpectedResponse(format!("{method} returned no result")))
    }

    /// Methods that answer with a raw file body on success and a JSON envelope on failure.
    async fn call_raw(
        &self,
        method: &str,
        params: &[(&str, String)],
    ) -> Result<Vec<u8>, PolygonError> {
        let response = self.post(method, params).await?;
        let status = response.status();
        let body = response.bytes().await?;

        if status.is_success() {
            return Ok(body.to_vec());
        }

        match serde_json::from_slice::<ApiResponse<serde_json::Value>>(&body) {
            Ok(envelope) => Err(PolygonError::Api(
                envelope
                    .comment
                    .unwrap_or_else(|| format!("{method} failed with HTTP {status}")),
            )),
            Err(_) => Err(PolygonError::UnexpectedResponse(format!(
                "{method} failed with HTTP {status}"
            ))),
        }
    }

    pub async fn problem_info(&self, problem_id: u64) -> Result<ProblemInfo, PolygonError> {
        self.call_json("problem.info", &[("problemId", problem_id.to_string())])
            .await
    }

    /// Statements keyed by language name.
    pub async fn problem_statements(
        &self,
        problem_id: u64,
    ) -> Result<BTreeMap<String, Statement>, PolygonError> {
        self.call_json("problem.statements", &[("problemId", problem_id.to_string())])
            .await
    }

    /// Checker file name, e.g. `std::ncmp.cpp` or `check.cpp`.
    pub async fn problem_checker(&self, problem_id: u64) -> Result<String, PolygonError> {
        self.call_json("problem.checker", &[("problemId", problem_id.to_string())])
            .await
    }

    pub async fn problem_tests(
        &self,
        problem_id: u64,
        testset: &str,
    ) -> Result<Vec<Test>, PolygonError> {
        self.call_json(
            "problem.tests",
            &[
                ("problemId", problem_id.to_string()),
                ("testset", testset.to_string()),
                ("noInputs", "true".to_string()),
            ],
        )
        .await
    }

    pub async fn problem_test_input(
        &self,
        problem_id: u64,
        testset: &str,
        test_index: u32,
    ) -> Result<Vec<u8>, PolygonError> {
        self.call_raw(
            "problem.testInput",
            &[
                ("problemId", problem_id.to_string()),
                ("testset", testset.to_string()),
                ("testIndex", test_index.to_string()),
            ],
        )
        .await
    }

    pub async fn problem_test_answer(
        &self,
        problem_id: u64,
        testset: &str,
        test_index: u32,
    ) -> Result<Vec<u8>, PolygonError> {
        self.call_raw(
            "problem.testAnswer",
            &[
                ("problemId", problem_id.to_string()),
                ("testset", testset.to_string()),
                ("testIndex", test_index.to_string()),
            ],
        )
        .await
    }

    pub async fn problem_solutions(&self, problem_id: u64) -> Result<Vec<Solution>, PolygonError> {
        self.call_json("problem.solutions", &[("problemId", problem_id.to_string())])
            .await
    }

    pub async fn problem_view_solution(
        &self,
        problem_id: u64,
        name: &str,
    ) -> Result<Vec<u8>, PolygonError> {
        self.call_raw(
            "problem.viewSolution",
            &[
                ("problemId", problem_id.to_string()),
                ("name", name.to_string()),
            ],
        )
        .await
    }

    /// Read a problem file. `file_type` is one of `resource`, `source`, `aux`.
    pub async fn problem_view_file(
        &self,
        problem_id: u64,
        file_type: &str,
        name: &str,
    ) -> Result<Vec<u8>, PolygonError> {
        self.call_raw(
            "problem.viewFile",
            &[
                ("problemId", problem_id.to_string()),
                ("type", file_type.to_string()),
                ("name", name.to_string()),
            ],
        )
        .await
    }
}
