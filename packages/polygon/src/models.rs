use serde::Deserialize;

/// Envelope returned by every JSON method.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiResponse<T> {
    pub status: String,
    #[serde(default)]
    pub comment: Option<String>,
    pub result: Option<T>,
}

/// `problem.info`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemInfo {
    #[serde(default)]
    pub input_file: String,
    #[serde(default)]
    pub output_file: String,
    #[serde(default)]
    pub interactive: bool,
    /// Milliseconds.
    pub time_limit: u32,
    /// Megabytes.
    pub memory_limit: u32,
}

/// One language entry of `problem.statements`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Statement {
    #[serde(default)]
    pub encoding: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub legend: Option<String>,
    #[serde(default)]
    pub input: Option<String>,
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub tutorial: Option<String>,
}

/// One entry of `problem.tests`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Test {
    pub index: u32,
    #[serde(default)]
    pub manual: bool,
    #[serde(default)]
    pub description: Option<String>,
    /// Polygon's own sample marker.
    #[serde(default)]
    pub use_in_statements: bool,
}

/// One entry of `problem.solutions`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Solution {
    pub name: String,
    #[serde(default)]
    pub source_type: Option<String>,
    /// `MA` marks the main correct solution.
    #[serde(default)]
    pub tag: String,
}
