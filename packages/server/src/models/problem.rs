use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::entity::problem::Difficulty;
use crate::entity::{problem, test_case};

#[derive(Serialize, ToSchema)]
pub struct TestCaseResponse {
    pub ordinal: i32,
    /// Truncated input preview.
    pub input: String,
    /// Truncated output preview.
    pub output: String,
    pub is_sample: bool,
    pub description: Option<String>,
}

impl From<test_case::Model> for TestCaseResponse {
    fn from(m: test_case::Model) -> Self {
        Self {
            ordinal: m.ordinal,
            input: m.input,
            output: m.output,
            is_sample: m.is_sample,
            description: m.description,
        }
    }
}

/// A migrated problem as stored in the database.
#[derive(Serialize, ToSchema)]
pub struct ProblemResponse {
    pub id: i32,
    pub polygon_id: i64,
    pub slug: String,
    pub title: String,
    pub difficulty: Option<Difficulty>,
    pub legend: String,
    pub input_format: String,
    pub output_format: String,
    pub notes: String,
    pub time_limit: i32,
    pub memory_limit: i32,
    pub checker_type: String,
    pub test_case_count: i32,
    pub solution: Option<String>,
    pub tags: Vec<String>,
    pub test_cases: Vec<TestCaseResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProblemResponse {
    pub fn new(
        model: problem::Model,
        tags: Vec<String>,
        test_cases: Vec<test_case::Model>,
    ) -> Self {
        Self {
            id: model.id,
            polygon_id: model.polygon_id,
            slug: model.slug,
            title: model.title,
            difficulty: model.difficulty,
            legend: model.legend,
            input_format: model.input_format,
            output_format: model.output_format,
            notes: model.notes,
            time_limit: model.time_limit,
            memory_limit: model.memory_limit,
            checker_type: model.checker_type,
            test_case_count: model.test_case_count,
            solution: model.solution,
            tags,
            test_cases: test_cases.into_iter().map(Into::into).collect(),
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}
