//! Integration tests for the enrollment and progress consistency engine
//!
//! Drives the engine against the in-memory store, including concurrent
//! updates on one key.

mod common;

use signlearn::db::schemas::ProgressStatus;
use signlearn::engine::{
    ConsistencyEngine, CounterStatus, EnrollmentCounting, MAX_TIME_SPENT_DELTA,
};
use signlearn::store::{EntityKind, RecordStore};
use signlearn::PlatformError;
use std::sync::Arc;
use tokio_test::assert_ok;

use common::{course, create_user, engine, package, seeded_store, user, FailingCounters};

#[tokio::test]
async fn test_progress_scenario_counts_completion_once() {
    let store = seeded_store().await;
    let engine = engine(&store, EnrollmentCounting::Unique);
    let u1 = create_user(&store, "u1@example.com").await;

    let first = engine
        .record_progress(&u1, "asl-alphabet", 50.0, Some(120))
        .await
        .unwrap();
    assert_eq!(first.record.progress_percentage, 50.0);
    assert_eq!(first.record.time_spent, 120);
    assert_eq!(first.record.status, ProgressStatus::InProgress);
    assert!(!first.just_completed);
    assert_eq!(first.analytics.user_completions, CounterStatus::Skipped);

    let second = engine
        .record_progress(&u1, "asl-alphabet", 100.0, Some(30))
        .await
        .unwrap();
    assert_eq!(second.record.progress_percentage, 100.0);
    assert_eq!(second.record.time_spent, 150);
    assert_eq!(second.record.status, ProgressStatus::Completed);
    assert!(second.just_completed);
    assert!(second.record.completed_at.is_some());
    assert_eq!(second.analytics.user_completions, CounterStatus::Applied);
    assert_eq!(second.analytics.course_completions, CounterStatus::Applied);

    let third = engine
        .record_progress(&u1, "asl-alphabet", 100.0, None)
        .await
        .unwrap();
    assert_eq!(third.record.status, ProgressStatus::Completed);
    assert!(!third.just_completed);
    assert_eq!(third.record.completed_at, second.record.completed_at);

    assert_eq!(course(&store, "asl-alphabet").await.analytics.completions, 1);
    assert_eq!(user(&store, &u1).await.progress.total_courses_completed, 1);
}

#[tokio::test]
async fn test_completion_ratchets_after_lower_update() {
    let store = seeded_store().await;
    let engine = engine(&store, EnrollmentCounting::Unique);
    let u1 = create_user(&store, "ratchet@example.com").await;

    engine
        .record_progress(&u1, "daily-talk", 100.0, None)
        .await
        .unwrap();
    let lowered = engine
        .record_progress(&u1, "daily-talk", 40.0, Some(10))
        .await
        .unwrap();
    assert_eq!(lowered.record.progress_percentage, 40.0);
    assert_eq!(lowered.record.status, ProgressStatus::Completed);
    assert!(!lowered.just_completed);

    let again = engine
        .record_progress(&u1, "daily-talk", 100.0, None)
        .await
        .unwrap();
    assert!(!again.just_completed);
    assert_eq!(course(&store, "daily-talk").await.analytics.completions, 1);
}

#[tokio::test]
async fn test_status_derivation_before_completion() {
    let store = seeded_store().await;
    let engine = engine(&store, EnrollmentCounting::Unique);
    let u1 = create_user(&store, "derive@example.com").await;

    let zero = engine
        .record_progress(&u1, "family-signs", 0.0, None)
        .await
        .unwrap();
    assert_eq!(zero.record.status, ProgressStatus::NotStarted);

    let some = engine
        .record_progress(&u1, "family-signs", 99.9, None)
        .await
        .unwrap();
    assert_eq!(some.record.status, ProgressStatus::InProgress);

    let back = engine
        .record_progress(&u1, "family-signs", 0.0, None)
        .await
        .unwrap();
    assert_eq!(back.record.status, ProgressStatus::NotStarted);
}

#[tokio::test]
async fn test_invalid_progress_writes_nothing() {
    let store = seeded_store().await;
    let engine = engine(&store, EnrollmentCounting::Unique);

    for (pct, delta) in [(101.0, None), (-1.0, None), (f64::NAN, None), (50.0, Some(-5))] {
        let err = engine
            .record_progress("u1", "asl-alphabet", pct, delta)
            .await
            .unwrap_err();
        assert!(matches!(err, PlatformError::Validation(_)));
    }
    assert_eq!(store.progress_count(), 0);
}

#[tokio::test]
async fn test_large_time_deltas_are_rejected_not_summed() {
    let store = seeded_store().await;
    let engine = engine(&store, EnrollmentCounting::Unique);
    let u1 = create_user(&store, "marathon@example.com").await;

    let err = engine
        .record_progress(&u1, "asl-alphabet", 10.0, Some(i64::MAX))
        .await
        .unwrap_err();
    assert!(matches!(err, PlatformError::Validation(_)));
    assert_eq!(store.progress_count(), 0);

    engine
        .record_progress(&u1, "asl-alphabet", 10.0, Some(MAX_TIME_SPENT_DELTA))
        .await
        .unwrap();
    let second = engine
        .record_progress(&u1, "asl-alphabet", 20.0, Some(MAX_TIME_SPENT_DELTA))
        .await
        .unwrap();
    assert_eq!(second.record.time_spent, 2 * MAX_TIME_SPENT_DELTA);

    let err = engine
        .record_progress(&u1, "asl-alphabet", 30.0, Some(MAX_TIME_SPENT_DELTA + 1))
        .await
        .unwrap_err();
    assert!(matches!(err, PlatformError::Validation(_)));
    let saved = engine.get_progress(&u1, "asl-alphabet").await.unwrap();
    assert_eq!(saved.progress_percentage, 20.0);
    assert_eq!(saved.time_spent, 2 * MAX_TIME_SPENT_DELTA);
}

#[tokio::test]
async fn test_unknown_user_and_course_still_saves_record() {
    let store = seeded_store().await;
    let engine = engine(&store, EnrollmentCounting::Unique);

    let outcome = engine
        .record_progress("ghost", "no-such-course", 100.0, Some(5))
        .await
        .unwrap();
    assert!(outcome.just_completed);
    assert_eq!(outcome.analytics.user_completions, CounterStatus::NotFound);
    assert_eq!(outcome.analytics.course_completions, CounterStatus::NotFound);
    assert!(outcome.analytics.has_missing());

    let saved = assert_ok!(engine.get_progress("ghost", "no-such-course").await);
    assert_eq!(saved.time_spent, 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_updates_create_one_record() {
    let store = seeded_store().await;
    let engine = Arc::new(engine(&store, EnrollmentCounting::Unique));
    let u1 = create_user(&store, "racer@example.com").await;

    let mut handles = Vec::new();
    for i in 0..32_i64 {
        let engine = Arc::clone(&engine);
        let u1 = u1.clone();
        handles.push(tokio::spawn(async move {
            engine
                .record_progress(&u1, "asl-alphabet", 10.0 + (i % 5) as f64, Some(i))
                .await
        }));
    }
    for handle in handles {
        assert_ok!(handle.await.unwrap());
    }

    assert_eq!(store.progress_count(), 1);
    let record = engine.get_progress(&u1, "asl-alphabet").await.unwrap();
    assert_eq!(record.time_spent, (0..32).sum::<i64>());
    assert_eq!(record.status, ProgressStatus::InProgress);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_completions_count_once() {
    let store = seeded_store().await;
    let engine = Arc::new(engine(&store, EnrollmentCounting::Unique));
    let u1 = create_user(&store, "finisher@example.com").await;

    let mut handles = Vec::new();
    for _ in 0..16 {
        let engine = Arc::clone(&engine);
        let u1 = u1.clone();
        handles.push(tokio::spawn(async move {
            engine
                .record_progress(&u1, "family-signs", 100.0, Some(1))
                .await
        }));
    }

    let mut transitions = 0;
    for handle in handles {
        if handle.await.unwrap().unwrap().just_completed {
            transitions += 1;
        }
    }

    assert_eq!(transitions, 1);
    assert_eq!(course(&store, "family-signs").await.analytics.completions, 1);
    assert_eq!(user(&store, &u1).await.progress.total_courses_completed, 1);
}

#[tokio::test]
async fn test_enroll_twice_unique_policy() {
    let store = seeded_store().await;
    let engine = engine(&store, EnrollmentCounting::Unique);
    let u1 = create_user(&store, "enroll@example.com").await;

    let first = engine.enroll(&u1, "starter").await.unwrap();
    assert!(first.newly_enrolled);
    assert_eq!(first.enrollment_counter, CounterStatus::Applied);
    assert_eq!(first.package.analytics.enrollments, 1);

    let second = engine.enroll(&u1, "starter").await.unwrap();
    assert!(!second.newly_enrolled);
    assert_eq!(second.enrollment_counter, CounterStatus::Skipped);

    assert_eq!(user(&store, &u1).await.enrolled_packages, vec!["starter".to_string()]);
    assert_eq!(package(&store, "starter").await.analytics.enrollments, 1);
}

#[tokio::test]
async fn test_enroll_twice_per_call_policy() {
    let store = seeded_store().await;
    let engine = engine(&store, EnrollmentCounting::PerCall);
    let u1 = create_user(&store, "percall@example.com").await;

    engine.enroll(&u1, "teen").await.unwrap();
    let second = engine.enroll(&u1, "teen").await.unwrap();
    assert!(!second.newly_enrolled);
    assert_eq!(second.enrollment_counter, CounterStatus::Applied);
    assert_eq!(second.package.analytics.enrollments, 2);

    assert_eq!(user(&store, &u1).await.enrolled_packages, vec!["teen".to_string()]);
    assert_eq!(package(&store, "teen").await.analytics.enrollments, 2);
}

#[tokio::test]
async fn test_enroll_rejects_inactive_and_missing() {
    let store = seeded_store().await;
    let engine = engine(&store, EnrollmentCounting::Unique);
    let u2 = create_user(&store, "u2@example.com").await;

    let inactive = engine.enroll(&u2, "retired").await.unwrap_err();
    assert!(matches!(inactive, PlatformError::NotFound(_)));
    let missing_package = engine.enroll(&u2, "nope").await.unwrap_err();
    assert!(matches!(missing_package, PlatformError::NotFound(_)));
    let missing_user = engine.enroll("nobody", "starter").await.unwrap_err();
    assert!(matches!(missing_user, PlatformError::NotFound(_)));

    assert!(user(&store, &u2).await.enrolled_packages.is_empty());
    assert_eq!(package(&store, "retired").await.analytics.enrollments, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_enrollments_count_once() {
    let store = seeded_store().await;
    let engine = Arc::new(engine(&store, EnrollmentCounting::Unique));
    let u1 = create_user(&store, "eager@example.com").await;

    let handles: Vec<_> = (0..12)
        .map(|_| {
            let engine = Arc::clone(&engine);
            let u1 = u1.clone();
            tokio::spawn(async move { engine.enroll(&u1, "starter").await })
        })
        .collect();

    let mut new_memberships = 0;
    for handle in handles {
        if handle.await.unwrap().unwrap().newly_enrolled {
            new_memberships += 1;
        }
    }

    assert_eq!(new_memberships, 1);
    assert_eq!(package(&store, "starter").await.analytics.enrollments, 1);
}

#[tokio::test]
async fn test_record_view_counts_each_call() {
    let store = seeded_store().await;
    let engine = engine(&store, EnrollmentCounting::Unique);

    for _ in 0..3 {
        engine.record_view(EntityKind::Course, "asl-alphabet").await.unwrap();
    }
    engine.record_view(EntityKind::Package, "starter").await.unwrap();

    assert_eq!(course(&store, "asl-alphabet").await.analytics.views, 3);
    assert_eq!(package(&store, "starter").await.analytics.views, 1);

    let err = engine
        .record_view(EntityKind::Package, "retired")
        .await
        .unwrap_err();
    assert!(matches!(err, PlatformError::NotFound(_)));
    assert_eq!(
        store.get_package("retired").await.unwrap().unwrap().analytics.views,
        0
    );
}

#[tokio::test]
async fn test_failed_enrollment_counter_keeps_membership() {
    let store = seeded_store().await;
    let u1 = create_user(&store, "partial@example.com").await;
    let engine = ConsistencyEngine::new(
        Arc::new(FailingCounters::new(store.clone())),
        EnrollmentCounting::Unique,
    );

    let outcome = engine.enroll(&u1, "starter").await.unwrap();
    assert!(outcome.newly_enrolled);
    assert_eq!(outcome.enrollment_counter, CounterStatus::Failed);
    assert_eq!(outcome.package.analytics.enrollments, 0);

    assert_eq!(user(&store, &u1).await.enrolled_packages, vec!["starter".to_string()]);
    assert_eq!(package(&store, "starter").await.analytics.enrollments, 0);
}

#[tokio::test]
async fn test_failed_completion_counters_still_report_transition() {
    let store = seeded_store().await;
    let u1 = create_user(&store, "halfway@example.com").await;
    let engine = ConsistencyEngine::new(
        Arc::new(FailingCounters::new(store.clone())),
        EnrollmentCounting::Unique,
    );

    let outcome = engine
        .record_progress(&u1, "asl-alphabet", 100.0, Some(60))
        .await
        .unwrap();
    assert!(outcome.just_completed);
    assert_eq!(outcome.analytics.user_completions, CounterStatus::Failed);
    assert_eq!(outcome.analytics.course_completions, CounterStatus::Failed);
    assert!(outcome.analytics.has_failure());

    let saved = engine.get_progress(&u1, "asl-alphabet").await.unwrap();
    assert_eq!(saved.status, ProgressStatus::Completed);
    assert_eq!(saved.time_spent, 60);
    assert_eq!(course(&store, "asl-alphabet").await.analytics.completions, 0);
}
