//! Tests for the in-memory store, plus contract checks shared with SQLite

use std::sync::Arc;

use shared::{ContentRecord, PatternCategory};

use super::common::{approx, feedback, insight, pattern};
use crate::services::{InMemoryStore, SqliteStore};
use crate::traits::{FeedbackStore, PatternQuery, PatternStore};

fn fintech(min_confidence: f64) -> PatternQuery {
    PatternQuery {
        domain: "fintech".to_string(),
        min_confidence,
        limit: 10,
        category: None,
    }
}

/// Behaviour both stores must agree on
async fn check_store_contract<S: PatternStore + FeedbackStore>(store: &S) {
    let strong = pattern(PatternCategory::Structure, "numbered_list", 0.9, 0.9, &["fintech"]);
    let general = pattern(PatternCategory::OpeningHook, "question_hook", 0.8, 0.8, &["general"]);
    let boundary = pattern(PatternCategory::ClosingCta, "question_cta", 0.8, 0.7, &["fintech"]);
    let foreign = pattern(PatternCategory::ClosingCta, "thoughts_cta", 1.0, 1.0, &["policy"]);
    store
        .commit_cycle(&[strong.clone(), general.clone(), boundary.clone(), foreign], &[])
        .await
        .unwrap();

    // Confidence bound is inclusive, ties break by id
    let ids: Vec<String> = store
        .query_patterns(&fintech(0.7))
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.id)
        .collect();
    assert_eq!(ids, vec![strong.id.clone(), general.id.clone(), boundary.id.clone()]);

    store.record_usage(&[general.id.clone()]).await.unwrap();
    store.upsert_pattern(&general).await.unwrap();
    let reloaded = store.query_patterns(&fintech(0.0)).await.unwrap();
    let general_row = reloaded.iter().find(|p| p.id == general.id).unwrap();
    assert_eq!(general_row.usage_count, 1);

    store
        .append_records(&[
            ContentRecord::new("one", 0.5, "analytical").with_content_id("x"),
            ContentRecord::new("two", 0.6, "engaging"),
            ContentRecord::new("one v2", 0.7, "analytical").with_content_id("x"),
        ])
        .await
        .unwrap();
    let corpus = store.load_corpus().await.unwrap();
    assert_eq!(corpus.len(), 2);
    assert_eq!(corpus[0].text, "one v2");

    store.upsert_feedback(&feedback("f-1", "data_driven", 0.9, 0.6)).await.unwrap();
    let aggregates = store.feedback_aggregates().await.unwrap();
    assert_eq!(aggregates.mean_engagement("data_driven"), Some(0.9));

    // Feedback and its corpus record land together, replacing by id
    store
        .record_outcome(
            &feedback("x", "analytical", 0.4, 0.5),
            &[ContentRecord::new("one v3", 0.4, "analytical").with_content_id("x")],
        )
        .await
        .unwrap();
    assert!(store.get_feedback("x").await.unwrap().is_some());
    let corpus = store.load_corpus().await.unwrap();
    assert_eq!(corpus.len(), 2);
    assert_eq!(corpus[0].text, "one v3");

    store.upsert_insight(&insight("recent", 0.6, 0.6, 2)).await.unwrap();
    store.upsert_insight(&insight("old", 0.9, 0.9, 10)).await.unwrap();
    let insights = store.query_insights(7, 10).await.unwrap();
    assert_eq!(insights.len(), 1);
    assert_eq!(insights[0].id, "recent");
}

#[tokio::test]
async fn test_memory_store_contract() {
    check_store_contract(&InMemoryStore::new()).await;
}

#[tokio::test]
async fn test_sqlite_store_contract() {
    check_store_contract(&SqliteStore::open_in_memory().unwrap()).await;
}

#[tokio::test]
async fn test_usage_updates_last_used() {
    let store = InMemoryStore::new();
    let target = pattern(PatternCategory::EngagementTrigger, "curiosity_gap", 0.7, 0.8, &["general"]);
    store.upsert_pattern(&target).await.unwrap();
    assert!(store.pattern(&target.id).await.unwrap().last_used.is_none());

    store.record_usage(&[target.id.clone()]).await.unwrap();
    let used = store.pattern(&target.id).await.unwrap();
    assert_eq!(used.usage_count, 1);
    assert!(used.last_used.is_some());
}

#[tokio::test]
async fn test_concurrent_usage_recording() {
    let store = Arc::new(InMemoryStore::new());
    let target = pattern(PatternCategory::ViralElement, "viral_structure", 0.9, 1.0, &["general"]);
    store.upsert_pattern(&target).await.unwrap();

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let store = Arc::clone(&store);
            let ids = vec![target.id.clone()];
            tokio::spawn(async move { store.record_usage(&ids).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(store.pattern(&target.id).await.unwrap().usage_count, 16);
}

#[tokio::test]
async fn test_aggregates_average_prediction_error() {
    let store = InMemoryStore::new();
    store.upsert_feedback(&feedback("a", "engaging", 0.4, 0.6)).await.unwrap();
    store.upsert_feedback(&feedback("b", "engaging", 0.8, 0.6)).await.unwrap();

    let aggregates = store.feedback_aggregates().await.unwrap();
    let engaging = &aggregates.by_variant["engaging"];
    assert_eq!(engaging.sample_count, 2);
    assert!(approx(engaging.mean_actual, 0.6));
    assert!(approx(engaging.mean_error, 0.2));
}
