use std::time::Duration;

use ::common::storage::{BlobStore, CHECKER_OBJECT, problem_namespace};
use sea_orm::{EntityTrait, PaginatorTrait};

use migrator::config::DEFAULT_TRUNCATE_LIMIT;
use migrator::entity::problem::Difficulty;
use migrator::entity::{problem, tag, test_case};
use migrator::error::MigrationError;
use migrator::snapshot::{ProblemSnapshot, StatementSections, TestCaseSnapshot};
use migrator::source::memory::{MemorySource, MemoryTest};
use migrator::sync::{ReconcileOptions, Targets, reconcile_relational};

use crate::common::{TestEnv, numbered_tests, problem_with_tests};

const RELATIONAL: Targets = Targets {
    relational: true,
    blob: false,
};
const BLOB: Targets = Targets {
    relational: false,
    blob: true,
};

async fn blob_names(env: &TestEnv, polygon_id: i64) -> Vec<String> {
    let problem = env.stored_problem(polygon_id).await.expect("problem row");
    env.store
        .list(&problem_namespace(problem.id))
        .await
        .expect("list blobs")
}

#[tokio::test]
async fn shrinking_source_removes_stale_rows() {
    let env = TestEnv::new().await;
    env.source
        .insert(1, problem_with_tests("Shrink", numbered_tests(20, 2)))
        .await;

    env.service
        .session()
        .reconcile(1, RELATIONAL, None, None)
        .await
        .unwrap();
    assert_eq!(env.stored_test_cases(1).await.len(), 20);

    env.source
        .insert(1, problem_with_tests("Shrink", numbered_tests(12, 2)))
        .await;
    env.service
        .session()
        .reconcile(1, RELATIONAL, None, None)
        .await
        .unwrap();

    let rows = env.stored_test_cases(1).await;
    assert_eq!(rows.len(), 12);
    let ordinals: Vec<i32> = rows.iter().map(|r| r.ordinal).collect();
    assert_eq!(ordinals, (1..=12).collect::<Vec<_>>());
    assert_eq!(env.stored_problem(1).await.unwrap().test_case_count, 12);
}

#[tokio::test]
async fn double_reconcile_is_idempotent() {
    let env = TestEnv::new().await;
    env.source
        .insert(2, problem_with_tests("Twice", numbered_tests(5, 1)))
        .await;

    let first = env
        .service
        .session()
        .reconcile(2, RELATIONAL, None, None)
        .await
        .unwrap();
    let rows_first: Vec<_> = env
        .stored_test_cases(2)
        .await
        .into_iter()
        .map(|r| (r.ordinal, r.input, r.output, r.is_sample))
        .collect();

    let second = env
        .service
        .session()
        .reconcile(2, RELATIONAL, None, None)
        .await
        .unwrap();
    let rows_second: Vec<_> = env
        .stored_test_cases(2)
        .await
        .into_iter()
        .map(|r| (r.ordinal, r.input, r.output, r.is_sample))
        .collect();

    assert_eq!(rows_first, rows_second);
    assert!(first.relational.as_ref().unwrap().created);
    assert!(!second.relational.as_ref().unwrap().created);
    assert_eq!(
        first.relational.unwrap().problem_id,
        second.relational.unwrap().problem_id
    );
    assert_eq!(problem::Entity::find().count(&env.db).await.unwrap(), 1);
}

#[tokio::test]
async fn sample_flags_follow_latest_snapshot() {
    let env = TestEnv::new().await;
    env.source
        .insert(3, problem_with_tests("Samples", numbered_tests(15, 3)))
        .await;
    env.service
        .session()
        .reconcile(3, RELATIONAL, None, None)
        .await
        .unwrap();
    let samples = env
        .stored_test_cases(3)
        .await
        .iter()
        .filter(|r| r.is_sample)
        .count();
    assert_eq!(samples, 3);

    env.source
        .insert(3, problem_with_tests("Samples", numbered_tests(15, 0)))
        .await;
    let result = env
        .service
        .session()
        .reconcile(3, RELATIONAL, None, None)
        .await
        .unwrap();

    assert_eq!(result.relational.unwrap().sample_count, 0);
    assert!(env.stored_test_cases(3).await.iter().all(|r| !r.is_sample));
}

#[tokio::test]
async fn sample_rows_match_per_case_flags() {
    let env = TestEnv::new().await;
    let tests = vec![
        MemoryTest::new("1\n", "1\n", true),
        MemoryTest::new("2\n", "2\n", true),
        MemoryTest::new("3\n", "3\n", false),
    ];
    env.source.insert(4, problem_with_tests("Flags", tests)).await;

    env.service
        .session()
        .reconcile(4, RELATIONAL, None, None)
        .await
        .unwrap();

    let flags: Vec<bool> = env
        .stored_test_cases(4)
        .await
        .iter()
        .map(|r| r.is_sample)
        .collect();
    assert_eq!(flags, vec![true, true, false]);
}

#[tokio::test]
async fn equal_titles_get_distinct_slugs() {
    let env = TestEnv::new().await;
    env.source
        .insert(101, problem_with_tests("A + B", numbered_tests(1, 1)))
        .await;
    env.source
        .insert(202, problem_with_tests("A + B", numbered_tests(1, 1)))
        .await;

    let a = env
        .service
        .session()
        .reconcile(101, RELATIONAL, None, None)
        .await
        .unwrap()
        .relational
        .unwrap();
    let b = env
        .service
        .session()
        .reconcile(202, RELATIONAL, None, None)
        .await
        .unwrap()
        .relational
        .unwrap();

    assert_eq!(a.slug, "a-b");
    assert_eq!(b.slug, "a-b-202");

    // Re-migrating the first problem keeps its slug.
    let again = env
        .service
        .session()
        .reconcile(101, RELATIONAL, None, None)
        .await
        .unwrap()
        .relational
        .unwrap();
    assert_eq!(again.slug, "a-b");
}

#[tokio::test]
async fn blob_namespace_holds_exactly_current_files() {
    let env = TestEnv::new().await;
    env.source
        .insert(5, problem_with_tests("Blob", numbered_tests(10, 1)))
        .await;

    let result = env
        .service
        .session()
        .reconcile(5, Targets::ALL, None, None)
        .await
        .unwrap();
    assert_eq!(result.blob.as_ref().unwrap().objects_written, 20);

    let names = blob_names(&env, 5).await;
    assert_eq!(names.len(), 20);
    assert!(names.contains(&"01".to_string()));
    assert!(names.contains(&"10.a".to_string()));

    env.source
        .insert(5, problem_with_tests("Blob", numbered_tests(4, 1)))
        .await;
    env.service
        .session()
        .reconcile(5, Targets::ALL, None, None)
        .await
        .unwrap();

    assert_eq!(
        blob_names(&env, 5).await,
        vec!["01", "01.a", "02", "02.a", "03", "03.a", "04", "04.a"]
    );
}

#[tokio::test]
async fn custom_checker_is_uploaded_once() {
    let env = TestEnv::new().await;
    env.source
        .insert(
            6,
            problem_with_tests("Checker", numbered_tests(3, 1))
                .with_custom_checker("check.cpp", b"#include \"testlib.h\"\n"),
        )
        .await;

    let result = env
        .service
        .session()
        .reconcile(6, Targets::ALL, None, None)
        .await
        .unwrap();

    let names = blob_names(&env, 6).await;
    assert_eq!(names.len(), 7);
    assert!(names.contains(&CHECKER_OBJECT.to_string()));
    assert!(result.blob.unwrap().checker_uploaded);
    assert_eq!(env.stored_problem(6).await.unwrap().checker_type, "custom");
}

#[tokio::test]
async fn standard_checker_is_normalized() {
    let env = TestEnv::new().await;
    let mut problem = problem_with_tests("Std", numbered_tests(1, 0));
    problem.checker = "std::ncmp.cpp".into();
    env.source.insert(7, problem).await;

    env.service
        .session()
        .reconcile(7, Targets::ALL, None, None)
        .await
        .unwrap();

    assert_eq!(env.stored_problem(7).await.unwrap().checker_type, "ncmp");
    assert!(!blob_names(&env, 7).await.contains(&CHECKER_OBJECT.to_string()));
}

#[tokio::test]
async fn wide_ordinals_keep_every_digit() {
    let env = TestEnv::new().await;
    env.source
        .insert(8, problem_with_tests("Many", numbered_tests(101, 0)))
        .await;

    env.service
        .session()
        .reconcile(8, Targets::ALL, None, None)
        .await
        .unwrap();

    let names = blob_names(&env, 8).await;
    assert_eq!(names.len(), 202);
    for expected in ["09", "99", "100", "100.a", "101.a"] {
        assert!(names.contains(&expected.to_string()), "missing {expected}");
    }
}

#[tokio::test]
async fn long_bodies_truncated_in_rows_only() {
    let env = TestEnv::build(MemorySource::new(), 1000).await;
    let long_input = "x".repeat(1500);
    env.source
        .insert(
            9,
            problem_with_tests(
                "Long",
                vec![MemoryTest::new(long_input.clone(), "ok\n", false)],
            ),
        )
        .await;

    env.service
        .session()
        .reconcile(9, Targets::ALL, None, None)
        .await
        .unwrap();

    let row = &env.stored_test_cases(9).await[0];
    assert_eq!(row.input.chars().count(), 1000);
    assert_eq!(row.output, "ok\n");

    let problem = env.stored_problem(9).await.unwrap();
    let blob = env
        .store
        .get(&problem_namespace(problem.id), "01")
        .await
        .unwrap();
    assert_eq!(blob.len(), 1500);
}

#[tokio::test]
async fn blob_before_relational_is_not_migrated() {
    let env = TestEnv::new().await;
    env.source
        .insert(10, problem_with_tests("Early", numbered_tests(2, 0)))
        .await;

    let err = env
        .service
        .session()
        .reconcile(10, BLOB, None, None)
        .await
        .unwrap_err();

    assert!(matches!(err, MigrationError::NotMigrated { polygon_id: 10 }));
    assert_eq!(env.source.list_calls(), 0);
}

#[tokio::test]
async fn source_failure_writes_nothing() {
    let env = TestEnv::new().await;
    env.source
        .insert(11, problem_with_tests("Down", numbered_tests(2, 0)))
        .await;
    env.source.set_failing(true);

    let err = env
        .service
        .session()
        .reconcile(11, Targets::ALL, None, None)
        .await
        .unwrap_err();

    assert!(matches!(err, MigrationError::SourceUnavailable(_)));
    assert!(env.stored_problem(11).await.is_none());
}

#[tokio::test]
async fn unknown_problem_is_source_unavailable() {
    let env = TestEnv::new().await;
    let err = env.service.session().fetch(404).await.unwrap_err();
    assert!(matches!(err, MigrationError::SourceUnavailable(_)));
}

#[tokio::test]
async fn partial_upload_reports_failed_ordinals_and_retry_converges() {
    let env = TestEnv::new().await;
    env.source
        .insert(12, problem_with_tests("Flaky", numbered_tests(3, 0)))
        .await;
    env.service
        .session()
        .reconcile(12, RELATIONAL, None, None)
        .await
        .unwrap();

    env.store.fail_puts_of("02.a").await;
    let err = env
        .service
        .session()
        .reconcile(12, BLOB, None, None)
        .await
        .unwrap_err();

    match err {
        MigrationError::PartialUploadFailure {
            succeeded,
            failed,
            checker_failed,
            relational,
            ..
        } => {
            assert_eq!(succeeded, vec![1, 3]);
            assert_eq!(failed, vec![2]);
            assert!(!checker_failed);
            // Blob-only run: nothing relational was written this time.
            assert!(relational.is_none());
        }
        other => panic!("expected PartialUploadFailure, got {other:?}"),
    }

    env.store.clear_failures().await;
    env.service
        .session()
        .reconcile(12, BLOB, None, None)
        .await
        .unwrap();
    assert_eq!(blob_names(&env, 12).await.len(), 6);
}

#[tokio::test]
async fn tags_replace_set_and_absent_tags_keep_links() {
    let env = TestEnv::new().await;
    env.source
        .insert(13, problem_with_tests("Tagged", numbered_tests(1, 0)))
        .await;

    let first = env
        .service
        .session()
        .reconcile(
            13,
            RELATIONAL,
            Some(vec!["dp".into(), " graphs ".into(), "dp".into()]),
            None,
        )
        .await
        .unwrap();
    assert_eq!(
        first.relational.unwrap().tags,
        Some(vec!["dp".to_string(), "graphs".to_string()])
    );

    let second = env
        .service
        .session()
        .reconcile(13, RELATIONAL, Some(vec!["dp".into()]), None)
        .await
        .unwrap();
    assert_eq!(second.relational.unwrap().tags, Some(vec!["dp".to_string()]));

    let third = env
        .service
        .session()
        .reconcile(13, RELATIONAL, None, None)
        .await
        .unwrap();
    assert_eq!(third.relational.unwrap().tags, None);

    // Tags are created lazily and never removed.
    assert_eq!(tag::Entity::find().count(&env.db).await.unwrap(), 2);
}

#[tokio::test]
async fn difficulty_written_only_when_supplied() {
    let env = TestEnv::new().await;
    env.source
        .insert(14, problem_with_tests("Hard one", numbered_tests(1, 0)))
        .await;

    env.service
        .session()
        .reconcile(14, RELATIONAL, None, Some(Difficulty::Hard))
        .await
        .unwrap();
    env.service
        .session()
        .reconcile(14, RELATIONAL, None, None)
        .await
        .unwrap();

    assert_eq!(
        env.stored_problem(14).await.unwrap().difficulty,
        Some(Difficulty::Hard)
    );
}

#[tokio::test]
async fn session_cache_reused_until_blob_sync() {
    let env = TestEnv::new().await;
    env.source
        .insert(15, problem_with_tests("Cached", numbered_tests(3, 1)))
        .await;

    let session = env.service.session();
    session.fetch(15).await.unwrap();
    session.fetch(15).await.unwrap();
    assert_eq!(env.source.list_calls(), 1);

    session.reconcile(15, Targets::ALL, None, None).await.unwrap();
    assert_eq!(env.source.list_calls(), 1);

    session.fetch(15).await.unwrap();
    assert_eq!(env.source.list_calls(), 2);

    // A new session never sees another session's cache.
    env.service.session().fetch(15).await.unwrap();
    assert_eq!(env.source.list_calls(), 3);
}

#[tokio::test]
async fn concurrent_reconciles_for_same_problem_serialize() {
    let env =
        TestEnv::with_source(MemorySource::new().with_latency(Duration::from_millis(5))).await;
    env.source
        .insert(16, problem_with_tests("Race", numbered_tests(8, 2)))
        .await;

    let runs = (0..4).map(|_| {
        let service = env.service.clone();
        tokio::spawn(async move {
            service
                .session()
                .reconcile(16, Targets::ALL, None, None)
                .await
        })
    });
    for handle in futures::future::join_all(runs).await {
        handle.unwrap().unwrap();
    }

    // Each run lists the tests once; none of the four listings overlapped.
    assert_eq!(env.source.list_calls(), 4);
    assert_eq!(env.source.max_concurrent_listings(), 1);

    assert_eq!(problem::Entity::find().count(&env.db).await.unwrap(), 1);
    assert_eq!(env.stored_test_cases(16).await.len(), 8);
    assert_eq!(blob_names(&env, 16).await.len(), 16);
}

#[tokio::test]
async fn different_problems_reconcile_in_parallel() {
    let env =
        TestEnv::with_source(MemorySource::new().with_latency(Duration::from_millis(5))).await;
    env.source
        .insert(18, problem_with_tests("Left", numbered_tests(2, 0)))
        .await;
    env.source
        .insert(19, problem_with_tests("Right", numbered_tests(2, 0)))
        .await;

    let runs = [18, 19].map(|id| {
        let service = env.service.clone();
        tokio::spawn(async move {
            service
                .session()
                .reconcile(id, Targets::ALL, None, None)
                .await
        })
    });
    for handle in futures::future::join_all(runs).await {
        handle.unwrap().unwrap();
    }

    assert_eq!(env.source.max_concurrent_listings(), 2);
}

#[tokio::test]
async fn concurrent_equal_titles_get_distinct_slugs() {
    let env =
        TestEnv::with_source(MemorySource::new().with_latency(Duration::from_millis(5))).await;
    for id in [31, 32, 33] {
        env.source
            .insert(id, problem_with_tests("A B", numbered_tests(2, 1)))
            .await;
    }

    let runs = [31, 32, 33].map(|id| {
        let service = env.service.clone();
        tokio::spawn(async move {
            service
                .session()
                .reconcile(id, Targets::ALL, None, None)
                .await
        })
    });
    let mut slugs = Vec::new();
    for handle in futures::future::join_all(runs).await {
        slugs.push(handle.unwrap().unwrap().relational.unwrap().slug);
    }

    // All three fetched at once, yet each got its own slug.
    assert_eq!(env.source.max_concurrent_listings(), 3);
    slugs.sort();
    slugs.dedup();
    assert_eq!(slugs.len(), 3);
    assert!(slugs.contains(&"a-b".to_string()));
}

#[tokio::test]
async fn bodies_fetched_by_source_index_across_gaps() {
    let env = TestEnv::new().await;
    let tests = vec![
        MemoryTest::new("first\n", "1\n", true).with_index(1),
        MemoryTest::new("third\n", "3\n", false).with_index(3),
        MemoryTest::new("seventh\n", "7\n", false).with_index(7),
    ];
    env.source
        .insert(20, problem_with_tests("Gaps", tests))
        .await;

    env.service
        .session()
        .reconcile(20, Targets::ALL, None, None)
        .await
        .unwrap();

    let rows = env.stored_test_cases(20).await;
    let stored: Vec<(i32, &str)> = rows
        .iter()
        .map(|tc| (tc.ordinal, tc.input.as_str()))
        .collect();
    assert_eq!(
        stored,
        vec![(1, "first\n"), (2, "third\n"), (3, "seventh\n")]
    );
    assert_eq!(
        blob_names(&env, 20).await,
        vec!["01", "01.a", "02", "02.a", "03", "03.a"]
    );
}

fn snapshot_with_ordinals(polygon_id: i64, title: &str, ordinals: &[u32]) -> ProblemSnapshot {
    let test_cases = ordinals
        .iter()
        .map(|&ordinal| TestCaseSnapshot {
            ordinal,
            input: b"1\n".to_vec(),
            output: b"2\n".to_vec(),
            is_sample: false,
            description: None,
        })
        .collect();
    ProblemSnapshot::new(
        polygon_id,
        title.to_string(),
        StatementSections::default(),
        1000,
        256,
        "wcmp".to_string(),
        test_cases,
        None,
        None,
    )
}

fn options_with_tags(tags: &[&str]) -> ReconcileOptions {
    ReconcileOptions {
        tags: Some(tags.iter().map(|t| t.to_string()).collect()),
        difficulty: None,
        truncate_limit: DEFAULT_TRUNCATE_LIMIT,
    }
}

#[tokio::test]
async fn failed_insert_leaves_no_rows() {
    let env = TestEnv::new().await;

    // Ordinal 1 twice trips the (problem_id, ordinal) unique key mid-transaction.
    let snapshot = snapshot_with_ordinals(41, "Broken", &[1, 1]);
    let result = reconcile_relational(&env.db, &snapshot, &options_with_tags(&["x"])).await;

    assert!(result.is_err());
    assert!(env.stored_problem(41).await.is_none());
    assert_eq!(problem::Entity::find().count(&env.db).await.unwrap(), 0);
    assert_eq!(tag::Entity::find().count(&env.db).await.unwrap(), 0);
    assert_eq!(test_case::Entity::find().count(&env.db).await.unwrap(), 0);
}

#[tokio::test]
async fn failed_update_keeps_previous_rows() {
    let env = TestEnv::new().await;
    let original = snapshot_with_ordinals(42, "Original", &[1, 2, 3, 4, 5]);
    reconcile_relational(&env.db, &original, &options_with_tags(&["x"]))
        .await
        .unwrap();

    let broken = snapshot_with_ordinals(42, "Changed", &[1, 2, 2]);
    let result = reconcile_relational(&env.db, &broken, &options_with_tags(&["y"])).await;
    assert!(result.is_err());

    let problem = env.stored_problem(42).await.unwrap();
    assert_eq!(problem.title, "Original");
    assert_eq!(problem.slug, "original");
    assert_eq!(problem.test_case_count, 5);
    let ordinals: Vec<i32> = env
        .stored_test_cases(42)
        .await
        .iter()
        .map(|tc| tc.ordinal)
        .collect();
    assert_eq!(ordinals, vec![1, 2, 3, 4, 5]);
    let tags: Vec<String> = tag::Entity::find()
        .all(&env.db)
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.name)
        .collect();
    assert_eq!(tags, vec!["x"]);
}

#[tokio::test]
async fn rejects_invalid_input() {
    let env = TestEnv::new().await;

    let err = env
        .service
        .session()
        .reconcile(0, Targets::ALL, None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, MigrationError::InvalidInput(_)));

    let err = env
        .service
        .session()
        .reconcile(5, Targets::default(), None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, MigrationError::InvalidInput(_)));
}
