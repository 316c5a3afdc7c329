//! Serialization of concurrent feedback, collaborator failures and batch
//! cancellation

mod common;

use chrono::{Duration, Utc};
use common::{
    create_test_engine, engine_with_store, python, AlwaysConflictingStore, HangingWriteStore,
    UNDOCUMENTED,
};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use toasty_core::config::AdaptationConfig;
use toasty_core::storage::StrategyStore;
use toasty_core::types::StrategyKey;
use toasty_core::{
    FeedbackRecord, FeedbackRejection, GradingDimension, LearningStrategy, MetaLearner, UserId,
};

#[tokio::test]
async fn test_parallel_feedback_loses_no_updates() {
    let engine = Arc::new(create_test_engine());
    let user = UserId::new("alice");
    let base = Utc::now();

    let mut gradings = Vec::new();
    for _ in 0..8 {
        gradings.push(engine.grade(python(UNDOCUMENTED, "alice")).await.unwrap());
    }
    let records: Vec<FeedbackRecord> = gradings
        .iter()
        .enumerate()
        .map(|(i, g)| {
            FeedbackRecord::new(g.grading_id, user.clone(), 1).at(base + Duration::milliseconds(i as i64))
        })
        .collect();

    let mut handles = Vec::new();
    for record in records.clone() {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move { engine.submit_feedback(record).await }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().applied);
    }

    let concurrent = engine
        .strategy_for(&user, &GradingDimension::CodeQuality)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(concurrent.sample_count, 8);

    // Every result is identical, so any serial order gives the same state
    let grader = engine.registry().get(&GradingDimension::CodeQuality).unwrap();
    let learner = MetaLearner::new(AdaptationConfig::default());
    let mut sequential = LearningStrategy::from_grader(user.clone(), grader.as_ref(), 0.5);
    for (grading, record) in gradings.iter().zip(&records) {
        learner.adapt(
            &mut sequential,
            &grading.per_dimension[&GradingDimension::CodeQuality],
            record,
        );
    }
    assert!(concurrent.same_state(&sequential));
}

#[tokio::test]
async fn test_independent_keys_proceed_concurrently() {
    let engine = Arc::new(create_test_engine());
    let mut handles = Vec::new();
    for user in ["alice", "bob", "carol", "dave"] {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            let outcome = engine.grade(python(UNDOCUMENTED, user)).await.unwrap();
            engine
                .submit_feedback(FeedbackRecord::new(outcome.grading_id, UserId::new(user), 2))
                .await
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().applied);
    }
    assert_eq!(engine.strategies(None).await.unwrap().len(), 4);
}

#[tokio::test]
async fn test_storage_timeout_aborts_without_writes() {
    let store = Arc::new(HangingWriteStore::default());
    let engine = engine_with_store(store.clone());

    // grading still succeeds; lazy creation times out and is skipped
    let outcome = engine.grade(python(UNDOCUMENTED, "alice")).await.unwrap();
    let result = engine
        .submit_feedback(FeedbackRecord::new(outcome.grading_id, UserId::new("alice"), 1))
        .await;

    assert!(!result.applied);
    assert_eq!(result.reason, Some(FeedbackRejection::StorageUnavailable));
    let key = StrategyKey::new(UserId::new("alice"), GradingDimension::CodeQuality);
    assert!(store.inner.get(&key).await.unwrap().is_none());
    assert_eq!(store.attempted_writes.load(Ordering::SeqCst), 2);
    assert!(engine.collective_patterns().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_conflicts_beyond_budget_surface_as_adaptation_unavailable() {
    let store = Arc::new(AlwaysConflictingStore::default());
    let engine = engine_with_store(store.clone());

    let outcome = engine.grade(python(UNDOCUMENTED, "alice")).await.unwrap();
    let key = StrategyKey::new(UserId::new("alice"), GradingDimension::CodeQuality);
    let before = store.inner.get(&key).await.unwrap().unwrap();

    let result = engine
        .submit_feedback(FeedbackRecord::new(outcome.grading_id, UserId::new("alice"), 1))
        .await;
    assert_eq!(result.reason, Some(FeedbackRejection::AdaptationUnavailable));
    assert_eq!(
        store.conflicts.load(Ordering::SeqCst) as u32,
        engine.config().adaptation.retry_budget
    );

    let after = store.inner.get(&key).await.unwrap().unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_batch_keeps_completed_results() {
    let engine = create_test_engine();
    let requests = vec![
        python(UNDOCUMENTED, "alice"),
        python("def broken(:\n", "alice"),
        python("x = 1\n", "alice"),
    ];

    let batch = engine.grade_batch(requests, CancellationToken::new()).await;
    assert!(!batch.cancelled);
    assert_eq!(batch.completed.len(), 2);
    assert_eq!(batch.completed[0].0, 0);
    assert_eq!(batch.completed[1].0, 2);
    assert_eq!(batch.failed.len(), 1);
    assert_eq!(batch.failed[0].0, 1);
}

#[tokio::test]
async fn test_cancelled_batch_abandons_remaining() {
    let engine = create_test_engine();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let requests = vec![python(UNDOCUMENTED, "alice"), python("x = 1\n", "alice")];
    let batch = engine.grade_batch(requests, cancel).await;
    assert!(batch.cancelled);
    assert!(batch.completed.is_empty());
    assert_eq!(batch.skipped, 2);
}
