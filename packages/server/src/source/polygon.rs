use async_trait::async_trait;
use tracing::{debug, instrument};

use ::polygon::{PolygonClient, PolygonConfig, PolygonError, Solution, Statement, Test};

use super::{ProblemMetadata, ProblemSource, SourceError, SourceStatement, TestCaseEntry};
use crate::snapshot::StatementSections;

/// Language whose statement is preferred when a problem has several.
const PREFERRED_LANGUAGE: &str = "english";

/// Solution tag Polygon uses for the main correct solution.
const MAIN_SOLUTION_TAG: &str = "MA";

/// [`ProblemSource`] backed by the Polygon API.
pub struct PolygonSource {
    client: PolygonClient,
    testset: String,
}

impl PolygonSource {
    pub fn new(config: &PolygonConfig) -> Result<Self, SourceError> {
        Ok(Self {
            client: PolygonClient::new(config)?,
            testset: config.testset.clone(),
        })
    }
}

fn remote_id(polygon_id: i64) -> Result<u64, SourceError> {
    u64::try_from(polygon_id)
        .ok()
        .filter(|id| *id > 0)
        .ok_or(SourceError::InvalidId(polygon_id))
}

fn map_err(polygon_id: i64, err: PolygonError) -> SourceError {
    match &err {
        PolygonError::Api(comment) if comment.contains("not found") => {
            SourceError::NotFound(polygon_id)
        }
        _ => SourceError::Polygon(err),
    }
}

/// English if present, otherwise the first language in name order.
fn pick_statement(
    statements: std::collections::BTreeMap<String, Statement>,
) -> Option<Statement> {
    let mut statements = statements;
    statements
        .remove(PREFERRED_LANGUAGE)
        .or_else(|| statements.into_values().next())
}

/// Tests sorted by Polygon index and renumbered from 1. Bodies are still
/// fetched by the Polygon index, which may skip numbers.
fn test_entries(mut tests: Vec<Test>) -> Vec<TestCaseEntry> {
    tests.sort_by_key(|t| t.index);
    tests
        .into_iter()
        .enumerate()
        .map(|(pos, test)| TestCaseEntry {
            ordinal: pos as u32 + 1,
            index: test.index,
            is_sample: test.use_in_statements,
            description: test.description.filter(|d| !d.trim().is_empty()),
        })
        .collect()
}

fn pick_main_solution(solutions: &[Solution]) -> Option<&Solution> {
    solutions
        .iter()
        .find(|s| s.tag == MAIN_SOLUTION_TAG)
        .or_else(|| solutions.first())
}

#[async_trait]
impl ProblemSource for PolygonSource {
    #[instrument(skip(self))]
    async fn fetch_metadata(&self, polygon_id: i64) -> Result<ProblemMetadata, SourceError> {
        let id = remote_id(polygon_id)?;
        let info = self
            .client
            .problem_info(id)
            .await
            .map_err(|e| map_err(polygon_id, e))?;
        let checker = self
            .client
            .problem_checker(id)
            .await
            .map_err(|e| map_err(polygon_id, e))?;

        Ok(ProblemMetadata {
            time_limit: info.time_limit,
            memory_limit: info.memory_limit,
            checker,
        })
    }

    #[instrument(skip(self))]
    async fn fetch_statement(&self, polygon_id: i64) -> Result<SourceStatement, SourceError> {
        let id = remote_id(polygon_id)?;
        let statements = self
            .client
            .problem_statements(id)
            .await
            .map_err(|e| map_err(polygon_id, e))?;

        let Some(statement) = pick_statement(statements) else {
            debug!(polygon_id, "Problem has no statements");
            return Ok(SourceStatement::default());
        };

        Ok(SourceStatement {
            title: statement.name,
            sections: StatementSections {
                legend: statement.legend.unwrap_or_default(),
                input_format: statement.input.unwrap_or_default(),
                output_format: statement.output.unwrap_or_default(),
                notes: statement.notes.unwrap_or_default(),
            },
        })
    }

    #[instrument(skip(self))]
    async fn list_test_cases(&self, polygon_id: i64) -> Result<Vec<TestCaseEntry>, SourceError> {
        let id = remote_id(polygon_id)?;
        let tests = self
            .client
            .problem_tests(id, &self.testset)
            .await
            .map_err(|e| map_err(polygon_id, e))?;

        Ok(test_entries(tests))
    }

    async fn fetch_test_input(&self, polygon_id: i64, index: u32) -> Result<Vec<u8>, SourceError> {
        self.client
            .problem_test_input(remote_id(polygon_id)?, &self.testset, index)
            .await
            .map_err(|e| map_err(polygon_id, e))
    }

    async fn fetch_test_output(
        &self,
        polygon_id: i64,
        index: u32,
    ) -> Result<Vec<u8>, SourceError> {
        self.client
            .problem_test_answer(remote_id(polygon_id)?, &self.testset, index)
            .await
            .map_err(|e| map_err(polygon_id, e))
    }

    #[instrument(skip(self))]
    async fn fetch_solution(&self, polygon_id: i64) -> Result<Option<String>, SourceError> {
        let id = remote_id(polygon_id)?;
        let solutions = self
            .client
            .problem_solutions(id)
            .await
            .map_err(|e| map_err(polygon_id, e))?;

        let Some(main) = pick_main_solution(&solutions) else {
            return Ok(None);
        };
        debug!(polygon_id, name = %main.name, tag = %main.tag, "Fetching solution");

        let source = self
            .client
            .problem_view_solution(id, &main.name)
            .await
            .map_err(|e| map_err(polygon_id, e))?;
        Ok(Some(String::from_utf8_lossy(&source).into_owned()))
    }

    #[instrument(skip(self))]
    async fn fetch_checker_source(
        &self,
        polygon_id: i64,
        file_name: &str,
    ) -> Result<Vec<u8>, SourceError> {
        self.client
            .problem_view_file(remote_id(polygon_id)?, "source", file_name)
            .await
            .map_err(|e| map_err(polygon_id, e))
    }
}
