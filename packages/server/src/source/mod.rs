//! Where problems come from.
//!
//! [`ProblemSource`] is the seam between the migrator and the remote platform.
//! Implementations never retry; every failure surfaces as a [`SourceError`].

mod checker;
pub mod memory;
pub mod polygon;

use async_trait::async_trait;

pub use checker::{CUSTOM_CHECKER, STANDARD_CHECKERS, normalize_checker};

use crate::snapshot::StatementSections;

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Polygon request failed: {0}")]
    Polygon(#[from] ::polygon::PolygonError),
    #[error("problem {0} not found at source")]
    NotFound(i64),
    #[error("invalid problem id {0}")]
    InvalidId(i64),
    #[error("source unavailable: {0}")]
    Unavailable(String),
    #[error("malformed source data: {0}")]
    Malformed(String),
}

/// Limits and checker as reported by the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProblemMetadata {
    /// Milliseconds.
    pub time_limit: u32,
    /// Megabytes.
    pub memory_limit: u32,
    /// Raw checker file name, e.g. `std::ncmp.cpp` or `check.cpp`.
    pub checker: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceStatement {
    pub title: String,
    pub sections: StatementSections,
}

/// One row of the source's test list, without bodies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCaseEntry {
    /// Position in the list, from 1.
    pub ordinal: u32,
    /// The source's own test number, used to fetch the bodies. May have gaps.
    pub index: u32,
    pub is_sample: bool,
    pub description: Option<String>,
}

#[async_trait]
pub trait ProblemSource: Send + Sync {
    async fn fetch_metadata(&self, polygon_id: i64) -> Result<ProblemMetadata, SourceError>;

    async fn fetch_statement(&self, polygon_id: i64) -> Result<SourceStatement, SourceError>;

    /// Test list in source order. Ordinals are contiguous starting at 1.
    async fn list_test_cases(&self, polygon_id: i64) -> Result<Vec<TestCaseEntry>, SourceError>;

    /// Input of the test with the given [`TestCaseEntry::index`].
    async fn fetch_test_input(&self, polygon_id: i64, index: u32) -> Result<Vec<u8>, SourceError>;

    async fn fetch_test_output(&self, polygon_id: i64, index: u32)
    -> Result<Vec<u8>, SourceError>;

    /// Main correct solution, if the problem has any solution at all.
    async fn fetch_solution(&self, polygon_id: i64) -> Result<Option<String>, SourceError>;

    async fn fetch_checker_source(
        &self,
        polygon_id: i64,
        file_name: &str,
    ) -> Result<Vec<u8>, SourceError>;
}
