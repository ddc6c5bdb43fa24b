use std::sync::Arc;

use common::storage::BlobStore;
use futures::{StreamExt, TryStreamExt, stream};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter};
use tracing::{debug, info, instrument};

use crate::cache::{LruTestCaseCache, TestCaseCache};
use crate::entity::problem::{self, Difficulty};
use crate::error::MigrationError;
use crate::snapshot::{CheckerArtifact, ProblemSnapshot, TestCaseSnapshot};
use crate::source::{CUSTOM_CHECKER, ProblemSource, SourceError, normalize_checker};
use crate::sync::{self, ReconcileOptions, ReconcileResult, Targets};
use crate::utils::lock::KeyedLock;
use crate::utils::slug::base_slug;

#[derive(Debug, Clone)]
pub struct MigrationSettings {
    pub truncate_limit: usize,
    pub cache_capacity: usize,
    /// Test bodies fetched in parallel per problem.
    pub fetch_concurrency: usize,
}

/// Long-lived migration state shared by every session: stores, source and
/// the locks.
pub struct MigrationService {
    db: DatabaseConnection,
    store: Arc<dyn BlobStore>,
    source: Arc<dyn ProblemSource>,
    /// One per Polygon id; a reconcile holds it from fetch to last write.
    locks: KeyedLock<i64>,
    /// One per base slug; held around the writes of a relational sync.
    slug_locks: KeyedLock<String>,
    settings: MigrationSettings,
}

impl MigrationService {
    pub fn new(
        db: DatabaseConnection,
        store: Arc<dyn BlobStore>,
        source: Arc<dyn ProblemSource>,
        settings: MigrationSettings,
    ) -> Self {
        Self {
            db,
            store,
            source,
            locks: KeyedLock::new(),
            slug_locks: KeyedLock::new(),
            settings,
        }
    }

    /// Start a session with its own empty test case cache.
    pub fn session(&self) -> Migrator<'_> {
        self.session_with_cache(Arc::new(LruTestCaseCache::new(
            self.settings.cache_capacity,
        )))
    }

    pub fn session_with_cache(&self, cache: Arc<dyn TestCaseCache>) -> Migrator<'_> {
        Migrator {
            service: self,
            cache,
        }
    }
}

/// One migration session: an HTTP request or a CLI invocation.
pub struct Migrator<'a> {
    service: &'a MigrationService,
    cache: Arc<dyn TestCaseCache>,
}

fn validate_id(polygon_id: i64) -> Result<(), MigrationError> {
    if polygon_id <= 0 {
        return Err(MigrationError::InvalidInput(format!(
            "Polygon problem id must be a positive integer, got {polygon_id}"
        )));
    }
    Ok(())
}

impl Migrator<'_> {
    /// Fetch a fresh snapshot. Test cases come from the session cache when present.
    #[instrument(skip(self))]
    pub async fn fetch(&self, polygon_id: i64) -> Result<ProblemSnapshot, MigrationError> {
        validate_id(polygon_id)?;
        let source = self.service.source.as_ref();

        let (metadata, statement, solution) = futures::try_join!(
            source.fetch_metadata(polygon_id),
            source.fetch_statement(polygon_id),
            source.fetch_solution(polygon_id),
        )?;

        let test_cases = match self.cache.get(polygon_id) {
            Some(cached) => {
                debug!(polygon_id, count = cached.len(), "Test cases served from cache");
                cached
            }
            None => {
                let fetched = Arc::new(self.fetch_test_cases(polygon_id).await?);
                self.cache.put(polygon_id, fetched.clone());
                fetched
            }
        };

        let checker_type = normalize_checker(&metadata.checker);
        let checker = if checker_type == CUSTOM_CHECKER {
            let source_bytes = source
                .fetch_checker_source(polygon_id, &metadata.checker)
                .await?;
            Some(CheckerArtifact {
                file_name: metadata.checker.clone(),
                source: source_bytes,
            })
        } else {
            None
        };

        let title = match statement.title.trim() {
            "" => format!("Problem {polygon_id}"),
            title => title.to_string(),
        };

        info!(
            polygon_id,
            test_cases = test_cases.len(),
            checker = checker_type,
            "Fetched problem"
        );

        Ok(ProblemSnapshot::new(
            polygon_id,
            title,
            statement.sections,
            metadata.time_limit,
            metadata.memory_limit,
            checker_type.to_string(),
            test_cases.as_ref().clone(),
            checker,
            solution,
        ))
    }

    /// List the source's tests and fetch their bodies, keeping source order.
    async fn fetch_test_cases(
        &self,
        polygon_id: i64,
    ) -> Result<Vec<TestCaseSnapshot>, SourceError> {
        let source = self.service.source.as_ref();
        let entries = source.list_test_cases(polygon_id).await?;

        if let Some((pos, entry)) = entries
            .iter()
            .enumerate()
            .find(|(pos, entry)| entry.ordinal as usize != pos + 1)
        {
            return Err(SourceError::Malformed(format!(
                "test at position {} has ordinal {}",
                pos + 1,
                entry.ordinal
            )));
        }

        stream::iter(entries)
            .map(|entry| async move {
                let (input, output) = futures::try_join!(
                    source.fetch_test_input(polygon_id, entry.index),
                    source.fetch_test_output(polygon_id, entry.index),
                )?;
                Ok::<_, SourceError>(TestCaseSnapshot {
                    ordinal: entry.ordinal,
                    input,
                    output,
                    is_sample: entry.is_sample,
                    description: entry.description,
                })
            })
            .buffered(self.service.settings.fetch_concurrency.max(1))
            .try_collect()
            .await
    }

    /// Fetch the problem and write it to the selected targets.
    ///
    /// Calls for the same id are serialized; the second waits for the first.
    #[instrument(skip(self, tags))]
    pub async fn reconcile(
        &self,
        polygon_id: i64,
        targets: Targets,
        tags: Option<Vec<String>>,
        difficulty: Option<Difficulty>,
    ) -> Result<ReconcileResult, MigrationError> {
        validate_id(polygon_id)?;
        if targets.is_empty() {
            return Err(MigrationError::InvalidInput(
                "select at least one target (relational or blob)".into(),
            ));
        }

        let guard = self.service.locks.acquire(polygon_id).await;
        let result = self
            .reconcile_locked(polygon_id, targets, tags, difficulty)
            .await;
        drop(guard);
        self.service.locks.prune();

        result
    }

    async fn reconcile_locked(
        &self,
        polygon_id: i64,
        targets: Targets,
        tags: Option<Vec<String>>,
        difficulty: Option<Difficulty>,
    ) -> Result<ReconcileResult, MigrationError> {
        let db = &self.service.db;

        // Blob-only runs need an existing row; check before spending source calls.
        if !targets.relational {
            let exists = problem::Entity::find()
                .filter(problem::Column::PolygonId.eq(polygon_id))
                .count(db)
                .await?
                > 0;
            if !exists {
                return Err(MigrationError::NotMigrated { polygon_id });
            }
        }

        let snapshot = self.fetch(polygon_id).await?;
        let options = ReconcileOptions {
            tags,
            difficulty,
            truncate_limit: self.service.settings.truncate_limit,
        };

        // Problems whose titles slugify alike would otherwise race for the same slug.
        let slug_guard = if targets.relational {
            let base = base_slug(snapshot.title(), polygon_id);
            Some(self.service.slug_locks.acquire(base).await)
        } else {
            None
        };
        let result = sync::reconcile(
            db,
            self.service.store.as_ref(),
            &snapshot,
            targets,
            &options,
        )
        .await;
        drop(slug_guard);
        self.service.slug_locks.prune();
        let result = result?;

        if targets.blob {
            self.cache.invalidate(polygon_id);
        }

        Ok(result)
    }
}
