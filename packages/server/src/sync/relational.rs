use chrono::{DateTime, Utc};
use sea_orm::sea_query::OnConflict;
use sea_orm::*;
use tracing::{debug, info, instrument, warn};

use super::{ReconcileOptions, RelationalOutcome};
use crate::entity::{problem, problem_tag, tag, test_case};
use crate::snapshot::ProblemSnapshot;
use crate::utils::slug::{base_slug, slug_candidate};
use crate::utils::text::truncate_chars;

/// Trim, drop empties and de-duplicate, keeping first-seen order.
pub fn normalize_tags(names: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        let name = name.trim();
        if !name.is_empty() && !out.iter().any(|n| n == name) {
            out.push(name.to_string());
        }
    }
    out
}

/// Transactions tried before a unique violation is returned to the caller.
const WRITE_ATTEMPTS: usize = 3;

fn to_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// Write the snapshot's problem row, tags and test case rows in one transaction.
///
/// Test case rows are deleted and re-inserted, so the stored set always
/// equals the snapshot's. Any error rolls the whole transaction back.
///
/// Runs for different problems may pick the same free slug at once; the
/// loser hits the slug's unique index and is retried in a fresh transaction,
/// where the winner's commit is visible and the next candidate is chosen.
#[instrument(skip_all, fields(polygon_id = snapshot.polygon_id()))]
pub async fn reconcile_relational(
    db: &DatabaseConnection,
    snapshot: &ProblemSnapshot,
    options: &ReconcileOptions,
) -> Result<RelationalOutcome, DbErr> {
    let mut attempt = 1;
    loop {
        match write_snapshot(db, snapshot, options).await {
            Err(err) if attempt < WRITE_ATTEMPTS && is_unique_violation(&err) => {
                warn!(attempt, error = %err, "Unique violation, retrying relational sync");
                attempt += 1;
            }
            result => return result,
        }
    }
}

async fn write_snapshot(
    db: &DatabaseConnection,
    snapshot: &ProblemSnapshot,
    options: &ReconcileOptions,
) -> Result<RelationalOutcome, DbErr> {
    let polygon_id = snapshot.polygon_id();
    let now = Utc::now();
    let txn = db.begin().await?;

    let existing = problem::Entity::find()
        .filter(problem::Column::PolygonId.eq(polygon_id))
        .one(&txn)
        .await?;
    let created = existing.is_none();

    let slug = resolve_slug(&txn, snapshot.title(), polygon_id).await?;

    let mut active = match existing {
        Some(model) => model.into_active_model(),
        None => problem::ActiveModel {
            polygon_id: Set(polygon_id),
            difficulty: Set(None),
            created_at: Set(now),
            ..Default::default()
        },
    };

    let statement = snapshot.statement();
    active.slug = Set(slug.clone());
    active.title = Set(snapshot.title().to_string());
    active.legend = Set(statement.legend.clone());
    active.input_format = Set(statement.input_format.clone());
    active.output_format = Set(statement.output_format.clone());
    active.notes = Set(statement.notes.clone());
    active.time_limit = Set(to_i32(snapshot.time_limit()));
    active.memory_limit = Set(to_i32(snapshot.memory_limit()));
    active.checker_type = Set(snapshot.checker_type().to_string());
    active.test_case_count = Set(snapshot.test_cases().len() as i32);
    active.solution = Set(snapshot.solution().map(str::to_string));
    active.updated_at = Set(now);
    if let Some(difficulty) = options.difficulty {
        active.difficulty = Set(Some(difficulty));
    }

    let problem = if created {
        active.insert(&txn).await?
    } else {
        active.update(&txn).await?
    };

    let tags = match &options.tags {
        Some(names) => Some(replace_tags(&txn, problem.id, names, now).await?),
        None => None,
    };

    let (written, samples) =
        replace_test_cases(&txn, problem.id, snapshot, options.truncate_limit, now).await?;

    txn.commit().await?;

    info!(
        problem_id = problem.id,
        slug = %problem.slug,
        created,
        test_cases = written,
        samples,
        "Relational sync complete"
    );

    Ok(RelationalOutcome {
        problem_id: problem.id,
        slug: problem.slug,
        created,
        test_cases_written: written,
        sample_count: samples,
        tags,
    })
}

/// First candidate slug not used by a different problem.
async fn resolve_slug<C: ConnectionTrait>(
    conn: &C,
    title: &str,
    polygon_id: i64,
) -> Result<String, DbErr> {
    let base = base_slug(title, polygon_id);
    let mut attempt = 0;
    loop {
        let candidate = slug_candidate(&base, polygon_id, attempt);
        let taken = problem::Entity::find()
            .filter(problem::Column::Slug.eq(candidate.as_str()))
            .filter(problem::Column::PolygonId.ne(polygon_id))
            .count(conn)
            .await?
            > 0;
        if !taken {
            return Ok(candidate);
        }
        debug!(polygon_id, %candidate, "Slug taken by another problem");
        attempt += 1;
    }
}

async fn get_or_create_tag<C: ConnectionTrait>(
    conn: &C,
    name: &str,
    now: DateTime<Utc>,
) -> Result<tag::Model, DbErr> {
    let model = tag::ActiveModel {
        name: Set(name.to_string()),
        created_at: Set(now),
        ..Default::default()
    };

    let result = tag::Entity::insert(model)
        .on_conflict(OnConflict::column(tag::Column::Name).do_nothing().to_owned())
        .exec_without_returning(conn)
        .await;

    match result {
        Ok(_) | Err(DbErr::RecordNotInserted) => {}
        Err(e) => return Err(e),
    }

    tag::Entity::find()
        .filter(tag::Column::Name.eq(name))
        .one(conn)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound(format!("tag '{name}'")))
}

/// Replace the problem's tag links with exactly `names`.
async fn replace_tags<C: ConnectionTrait>(
    conn: &C,
    problem_id: i32,
    names: &[String],
    now: DateTime<Utc>,
) -> Result<Vec<String>, DbErr> {
    let names = normalize_tags(names);

    problem_tag::Entity::delete_many()
        .filter(problem_tag::Column::ProblemId.eq(problem_id))
        .exec(conn)
        .await?;

    for name in &names {
        let tag = get_or_create_tag(conn, name, now).await?;
        problem_tag::ActiveModel {
            problem_id: Set(problem_id),
            tag_id: Set(tag.id),
            ..Default::default()
        }
        .insert(conn)
        .await?;
    }

    Ok(names)
}

/// Delete every test case row of the problem and insert the snapshot's.
async fn replace_test_cases<C: ConnectionTrait>(
    conn: &C,
    problem_id: i32,
    snapshot: &ProblemSnapshot,
    truncate_limit: usize,
    now: DateTime<Utc>,
) -> Result<(usize, usize), DbErr> {
    let removed = test_case::Entity::delete_many()
        .filter(test_case::Column::ProblemId.eq(problem_id))
        .exec(conn)
        .await?
        .rows_affected;
    debug!(problem_id, removed, "Cleared test case rows");

    let mut samples = 0;
    for tc in snapshot.test_cases() {
        test_case::ActiveModel {
            problem_id: Set(problem_id),
            ordinal: Set(to_i32(tc.ordinal)),
            input: Set(truncate_chars(&tc.input, truncate_limit)),
            output: Set(truncate_chars(&tc.output, truncate_limit)),
            is_sample: Set(tc.is_sample),
            description: Set(tc.description.clone()),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(conn)
        .await?;

        if tc.is_sample {
            samples += 1;
        }
    }

    Ok((snapshot.test_cases().len(), samples))
}
