//! Reconciliation of a [`ProblemSnapshot`] against the relational and blob stores.
//!
//! Both targets use replace-all semantics: whatever the snapshot does not
//! contain is removed, so a finished run leaves exactly the snapshot's ordinals.

mod blob;
mod relational;

use common::storage::BlobStore;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use tracing::instrument;

pub use blob::reconcile_blobs;
pub use relational::{normalize_tags, reconcile_relational};

use crate::entity::problem::Difficulty;
use crate::error::MigrationError;
use crate::snapshot::ProblemSnapshot;

/// Which stores to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, utoipa::ToSchema)]
pub struct Targets {
    pub relational: bool,
    pub blob: bool,
}

impl Targets {
    pub const ALL: Targets = Targets {
        relational: true,
        blob: true,
    };

    pub fn is_empty(&self) -> bool {
        !self.relational && !self.blob
    }
}

/// Caller-supplied values that do not come from the source.
#[derive(Debug, Clone, Default)]
pub struct ReconcileOptions {
    /// `None` leaves existing tag links alone; `Some` replaces them.
    pub tags: Option<Vec<String>>,
    /// Written only when set.
    pub difficulty: Option<Difficulty>,
    /// Character limit for stored test case previews.
    pub truncate_limit: usize,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct RelationalOutcome {
    pub problem_id: i32,
    pub slug: String,
    /// True when the problem row was inserted rather than updated.
    pub created: bool,
    pub test_cases_written: usize,
    pub sample_count: usize,
    /// Tag set after the sync, when tags were supplied.
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct BlobOutcome {
    pub namespace: String,
    /// Objects removed by the initial clear.
    pub removed: usize,
    pub objects_written: usize,
    pub checker_uploaded: bool,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct ReconcileResult {
    pub polygon_id: i64,
    pub relational: Option<RelationalOutcome>,
    pub blob: Option<BlobOutcome>,
}

/// Apply `snapshot` to the selected targets, relational first.
///
/// A relational failure stops before any blob is touched. A blob failure after
/// a relational commit carries the relational outcome in the error.
#[instrument(skip_all, fields(polygon_id = snapshot.polygon_id(), ?targets))]
pub async fn reconcile(
    db: &DatabaseConnection,
    store: &dyn BlobStore,
    snapshot: &ProblemSnapshot,
    targets: Targets,
    options: &ReconcileOptions,
) -> Result<ReconcileResult, MigrationError> {
    if targets.is_empty() {
        return Err(MigrationError::InvalidInput(
            "select at least one target (relational or blob)".into(),
        ));
    }

    let relational = if targets.relational {
        Some(reconcile_relational(db, snapshot, options).await?)
    } else {
        None
    };

    let blob = if targets.blob {
        match reconcile_blobs(db, store, snapshot).await {
            Ok(outcome) => Some(outcome),
            Err(err) => return Err(err.with_relational(relational)),
        }
    } else {
        None
    };

    Ok(ReconcileResult {
        polygon_id: snapshot.polygon_id(),
        relational,
        blob,
    })
}
