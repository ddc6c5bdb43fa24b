use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entity::problem::Difficulty;
use crate::snapshot::{ProblemSnapshot, TestCaseSnapshot};
use crate::sync::Targets;
use crate::utils::text::truncate_chars;

/// Characters of each test body shown in a preview.
pub const PREVIEW_LIMIT: usize = 100;

#[derive(Deserialize, ToSchema)]
pub struct MigrateRequest {
    /// Write the problem, tags and test case rows to the database.
    #[serde(default)]
    pub relational: bool,
    /// Upload the full test files (and custom checker) to blob storage.
    #[serde(default)]
    pub blob: bool,
    /// Replace the problem's tags. Omit to keep existing tags.
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
}

impl MigrateRequest {
    pub fn targets(&self) -> Targets {
        Targets {
            relational: self.relational,
            blob: self.blob,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct TestCasePreview {
    #[schema(example = 1)]
    pub ordinal: u32,
    pub is_sample: bool,
    pub description: Option<String>,
    /// First characters of the input.
    pub input_preview: String,
    pub output_preview: String,
    /// Full input size in bytes.
    pub input_size: usize,
    pub output_size: usize,
}

impl From<&TestCaseSnapshot> for TestCasePreview {
    fn from(tc: &TestCaseSnapshot) -> Self {
        Self {
            ordinal: tc.ordinal,
            is_sample: tc.is_sample,
            description: tc.description.clone(),
            input_preview: truncate_chars(&tc.input, PREVIEW_LIMIT),
            output_preview: truncate_chars(&tc.output, PREVIEW_LIMIT),
            input_size: tc.input.len(),
            output_size: tc.output.len(),
        }
    }
}

/// What a migration would write, without writing it.
#[derive(Serialize, ToSchema)]
pub struct SnapshotPreview {
    #[schema(example = 123456)]
    pub polygon_id: i64,
    pub title: String,
    pub legend: String,
    pub input_format: String,
    pub output_format: String,
    pub notes: String,
    /// Milliseconds.
    pub time_limit: u32,
    /// Megabytes.
    pub memory_limit: u32,
    #[schema(example = "ncmp")]
    pub checker_type: String,
    /// File name of the custom checker, when there is one.
    pub custom_checker: Option<String>,
    pub has_solution: bool,
    pub test_case_count: usize,
    pub sample_count: usize,
    pub test_cases: Vec<TestCasePreview>,
}

impl From<&ProblemSnapshot> for SnapshotPreview {
    fn from(snapshot: &ProblemSnapshot) -> Self {
        let statement = snapshot.statement();
        Self {
            polygon_id: snapshot.polygon_id(),
            title: snapshot.title().to_string(),
            legend: statement.legend.clone(),
            input_format: statement.input_format.clone(),
            output_format: statement.output_format.clone(),
            notes: statement.notes.clone(),
            time_limit: snapshot.time_limit(),
            memory_limit: snapshot.memory_limit(),
            checker_type: snapshot.checker_type().to_string(),
            custom_checker: snapshot.checker().map(|c| c.file_name.clone()),
            has_solution: snapshot.solution().is_some(),
            test_case_count: snapshot.test_cases().len(),
            sample_count: snapshot.sample_count(),
            test_cases: snapshot.test_cases().iter().map(Into::into).collect(),
        }
    }
}
