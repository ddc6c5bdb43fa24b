use common::storage::{
    BlobStore, CHECKER_OBJECT, input_object, output_object, problem_namespace,
};
use sea_orm::*;
use tracing::{info, instrument, warn};

use super::BlobOutcome;
use crate::entity::problem;
use crate::error::MigrationError;
use crate::snapshot::ProblemSnapshot;

/// Replace the problem's blob namespace with the snapshot's test files.
///
/// The namespace is cleared first, so a re-run after any failure converges.
/// Failed uploads are collected per ordinal rather than aborting the loop.
#[instrument(skip_all, fields(polygon_id = snapshot.polygon_id(), backend = store.backend_name()))]
pub async fn reconcile_blobs(
    db: &DatabaseConnection,
    store: &dyn BlobStore,
    snapshot: &ProblemSnapshot,
) -> Result<BlobOutcome, MigrationError> {
    let polygon_id = snapshot.polygon_id();
    let problem = problem::Entity::find()
        .filter(problem::Column::PolygonId.eq(polygon_id))
        .one(db)
        .await?
        .ok_or(MigrationError::NotMigrated { polygon_id })?;

    let namespace = problem_namespace(problem.id);
    let ordinals = || snapshot.test_cases().iter().map(|tc| tc.ordinal);

    let removed = match store.delete_all(&namespace).await {
        Ok(removed) => removed,
        Err(e) => {
            warn!(%namespace, error = %e, "Failed to clear namespace");
            return Err(MigrationError::PartialUploadFailure {
                namespace,
                succeeded: Vec::new(),
                failed: ordinals().collect(),
                checker_failed: snapshot.checker().is_some(),
                relational: None,
            });
        }
    };

    let mut succeeded = Vec::new();
    let mut failed = Vec::new();
    let mut objects_written = 0;

    for tc in snapshot.test_cases() {
        let input = store
            .put(&namespace, &input_object(tc.ordinal), &tc.input)
            .await;
        let output = store
            .put(&namespace, &output_object(tc.ordinal), &tc.output)
            .await;

        objects_written += usize::from(input.is_ok()) + usize::from(output.is_ok());
        match input.and(output) {
            Ok(()) => succeeded.push(tc.ordinal),
            Err(e) => {
                warn!(%namespace, ordinal = tc.ordinal, error = %e, "Test case upload failed");
                failed.push(tc.ordinal);
            }
        }
    }

    let mut checker_failed = false;
    if let Some(checker) = snapshot.checker() {
        match store.put(&namespace, CHECKER_OBJECT, &checker.source).await {
            Ok(()) => objects_written += 1,
            Err(e) => {
                warn!(%namespace, file = %checker.file_name, error = %e, "Checker upload failed");
                checker_failed = true;
            }
        }
    }

    if !failed.is_empty() || checker_failed {
        return Err(MigrationError::PartialUploadFailure {
            namespace,
            succeeded,
            failed,
            checker_failed,
            relational: None,
        });
    }

    info!(%namespace, removed, objects_written, "Blob sync complete");

    Ok(BlobOutcome {
        namespace,
        removed,
        objects_written,
        checker_uploaded: snapshot.checker().is_some(),
    })
}
