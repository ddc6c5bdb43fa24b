use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{ProblemMetadata, ProblemSource, SourceError, SourceStatement, TestCaseEntry};
use crate::snapshot::StatementSections;

/// A test case as the in-memory source serves it.
#[derive(Debug, Clone, Default)]
pub struct MemoryTest {
    /// Source-side test number. Defaults to the position in the list.
    pub index: Option<u32>,
    pub input: Vec<u8>,
    pub output: Vec<u8>,
    pub is_sample: bool,
    pub description: Option<String>,
}

impl MemoryTest {
    pub fn new(input: impl Into<Vec<u8>>, output: impl Into<Vec<u8>>, is_sample: bool) -> Self {
        Self {
            index: None,
            input: input.into(),
            output: output.into(),
            is_sample,
            description: None,
        }
    }

    pub fn with_index(mut self, index: u32) -> Self {
        self.index = Some(index);
        self
    }
}

fn effective_index(pos: usize, test: &MemoryTest) -> u32 {
    test.index.unwrap_or(pos as u32 + 1)
}

/// A problem as the in-memory source serves it.
#[derive(Debug, Clone)]
pub struct MemoryProblem {
    pub title: String,
    pub sections: StatementSections,
    pub time_limit: u32,
    pub memory_limit: u32,
    pub checker: String,
    pub checker_source: Option<Vec<u8>>,
    pub tests: Vec<MemoryTest>,
    pub solution: Option<String>,
}

impl MemoryProblem {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            sections: StatementSections::default(),
            time_limit: 1000,
            memory_limit: 256,
            checker: "std::wcmp.cpp".into(),
            checker_source: None,
            tests: Vec::new(),
            solution: None,
        }
    }

    pub fn with_tests(mut self, tests: Vec<MemoryTest>) -> Self {
        self.tests = tests;
        self
    }

    pub fn with_custom_checker(mut self, file_name: &str, source: &[u8]) -> Self {
        self.checker = file_name.to_string();
        self.checker_source = Some(source.to_vec());
        self
    }
}

/// [`ProblemSource`] serving problems from process memory.
///
/// Used for tests and offline runs. It can be told to fail every call and
/// counts `list_test_cases` requests so callers can observe caching. It also
/// records how many listings were ever in flight at once.
#[derive(Default)]
pub struct MemorySource {
    problems: RwLock<HashMap<i64, MemoryProblem>>,
    failing: AtomicBool,
    list_calls: AtomicUsize,
    listings_in_flight: AtomicUsize,
    max_listings_in_flight: AtomicUsize,
    latency: Option<Duration>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long inside every test listing and test body fetch.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub async fn insert(&self, polygon_id: i64, problem: MemoryProblem) {
        self.problems.write().await.insert(polygon_id, problem);
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of `list_test_cases` calls served so far.
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Highest number of `list_test_cases` calls that overlapped in time.
    pub fn max_concurrent_listings(&self) -> usize {
        self.max_listings_in_flight.load(Ordering::SeqCst)
    }

    async fn problem(&self, polygon_id: i64) -> Result<MemoryProblem, SourceError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SourceError::Unavailable("injected source failure".into()));
        }
        self.problems
            .read()
            .await
            .get(&polygon_id)
            .cloned()
            .ok_or(SourceError::NotFound(polygon_id))
    }

    async fn test(&self, polygon_id: i64, index: u32) -> Result<MemoryTest, SourceError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let problem = self.problem(polygon_id).await?;
        problem
            .tests
            .into_iter()
            .enumerate()
            .find(|(pos, test)| effective_index(*pos, test) == index)
            .map(|(_, test)| test)
            .ok_or_else(|| {
                SourceError::Unavailable(format!("problem {polygon_id} has no test {index}"))
            })
    }
}

#[async_trait]
impl ProblemSource for MemorySource {
    async fn fetch_metadata(&self, polygon_id: i64) -> Result<ProblemMetadata, SourceError> {
        let problem = self.problem(polygon_id).await?;
        Ok(ProblemMetadata {
            time_limit: problem.time_limit,
            memory_limit: problem.memory_limit,
            checker: problem.checker,
        })
    }

    async fn fetch_statement(&self, polygon_id: i64) -> Result<SourceStatement, SourceError> {
        let problem = self.problem(polygon_id).await?;
        Ok(SourceStatement {
            title: problem.title,
            sections: problem.sections,
        })
    }

    async fn list_test_cases(&self, polygon_id: i64) -> Result<Vec<TestCaseEntry>, SourceError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let in_flight = self.listings_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_listings_in_flight.fetch_max(in_flight, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let problem = self.problem(polygon_id).await;
        self.listings_in_flight.fetch_sub(1, Ordering::SeqCst);

        Ok(problem?
            .tests
            .iter()
            .enumerate()
            .map(|(pos, test)| TestCaseEntry {
                ordinal: pos as u32 + 1,
                index: effective_index(pos, test),
                is_sample: test.is_sample,
                description: test.description.clone(),
            })
            .collect())
    }

    async fn fetch_test_input(&self, polygon_id: i64, index: u32) -> Result<Vec<u8>, SourceError> {
        Ok(self.test(polygon_id, index).await?.input)
    }

    async fn fetch_test_output(
        &self,
        polygon_id: i64,
        index: u32,
    ) -> Result<Vec<u8>, SourceError> {
        Ok(self.test(polygon_id, index).await?.output)
    }

    async fn fetch_solution(&self, polygon_id: i64) -> Result<Option<String>, SourceError> {
        Ok(self.problem(polygon_id).await?.solution)
    }

    async fn fetch_checker_source(
        &self,
        polygon_id: i64,
        file_name: &str,
    ) -> Result<Vec<u8>, SourceError> {
        let problem = self.problem(polygon_id).await?;
        problem
            .checker_source
            .filter(|_| problem.checker == file_name)
            .ok_or_else(|| SourceError::Unavailable(format!("no checker file {file_name}")))
    }
}
