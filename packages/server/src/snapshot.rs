//! In-memory view of a problem as fetched from the source at one point in time.

use serde::Serialize;

/// One test case. `ordinal` is 1-based and contiguous within a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestCaseSnapshot {
    pub ordinal: u32,
    #[serde(skip)]
    pub input: Vec<u8>,
    #[serde(skip)]
    pub output: Vec<u8>,
    pub is_sample: bool,
    pub description: Option<String>,
}

/// Statement sections, already rendered to text by the source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatementSections {
    pub legend: String,
    pub input_format: String,
    pub output_format: String,
    pub notes: String,
}

/// A custom checker's source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckerArtifact {
    pub file_name: String,
    pub source: Vec<u8>,
}

/// Immutable result of a fetch. Built once by the migrator and only read afterwards.
#[derive(Debug, Clone)]
pub struct ProblemSnapshot {
    polygon_id: i64,
    title: String,
    statement: StatementSections,
    time_limit: u32,
    memory_limit: u32,
    checker_type: String,
    test_cases: Vec<TestCaseSnapshot>,
    checker: Option<CheckerArtifact>,
    solution: Option<String>,
}

impl ProblemSnapshot {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        polygon_id: i64,
        title: String,
        statement: StatementSections,
        time_limit: u32,
        memory_limit: u32,
        checker_type: String,
        test_cases: Vec<TestCaseSnapshot>,
        checker: Option<CheckerArtifact>,
        solution: Option<String>,
    ) -> Self {
        Self {
            polygon_id,
            title,
            statement,
            time_limit,
            memory_limit,
            checker_type,
            test_cases,
            checker,
            solution,
        }
    }

    pub fn polygon_id(&self) -> i64 {
        self.polygon_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn statement(&self) -> &StatementSections {
        &self.statement
    }

    /// Milliseconds.
    pub fn time_limit(&self) -> u32 {
        self.time_limit
    }

    /// Megabytes.
    pub fn memory_limit(&self) -> u32 {
        self.memory_limit
    }

    pub fn checker_type(&self) -> &str {
        &self.checker_type
    }

    pub fn test_cases(&self) -> &[TestCaseSnapshot] {
        &self.test_cases
    }

    pub fn checker(&self) -> Option<&CheckerArtifact> {
        self.checker.as_ref()
    }

    pub fn solution(&self) -> Option<&str> {
        self.solution.as_deref()
    }

    pub fn sample_count(&self) -> usize {
        self.test_cases.iter().filter(|tc| tc.is_sample).count()
    }
}
