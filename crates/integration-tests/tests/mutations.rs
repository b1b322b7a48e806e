//! Integration tests for creating and deleting orders through a session.

use purchase_feed::{DeleteOutcome, FeedConfig, FeedError, FeedSession};
use purchase_feed_core::{Cursor, OrderId};
use purchase_feed_integration_tests::{MemorySource, sample_draft};
use rust_decimal::Decimal;

async fn loaded(count: i32) -> (MemorySource, FeedSession<MemorySource>) {
    let source = MemorySource::seeded(count);
    let session = FeedSession::new(source.clone(), FeedConfig::default())
        .expect("Default config should validate");
    session.load_initial().await.expect("Initial load failed");
    (source, session)
}

fn ids(session: &FeedSession<MemorySource>) -> Vec<i32> {
    session
        .snapshot()
        .items
        .iter()
        .map(|order| order.id.as_i32())
        .collect()
}

// ============================================================================
// Delete
// ============================================================================

#[tokio::test]
async fn test_delete_removes_before_server_answers() {
    let (source, session) = loaded(5).await;

    let (outcome, during) = tokio::join!(session.delete(OrderId::new(3)), async {
        let snapshot = session.snapshot();
        (ids(&session), snapshot.is_pending_delete(OrderId::new(3)))
    });

    assert_eq!(during, (vec![1, 2, 4, 5], true));
    assert_eq!(outcome.expect("Delete failed"), DeleteOutcome::Deleted);
    assert_eq!(ids(&session), vec![1, 2, 4, 5]);
    assert!(session.snapshot().pending_deletes.is_empty());
    assert_eq!(source.ids(), vec![1, 2, 4, 5]);
}

#[tokio::test]
async fn test_failed_delete_restores_through_reload() {
    let (source, session) = loaded(5).await;
    source.fail_deletes(true);

    let err = session
        .delete(OrderId::new(3))
        .await
        .expect_err("Delete should fail");
    assert!(matches!(err, FeedError::DeleteFailed { id, .. } if id == OrderId::new(3)));

    assert_eq!(ids(&session), vec![1, 2, 3, 4, 5]);
    let snapshot = session.snapshot();
    assert!(snapshot.pending_deletes.is_empty());
    assert!(matches!(snapshot.error, Some(FeedError::DeleteFailed { .. })));
    assert_eq!(source.fetch_log(), vec![None, None]);

    session.dismiss_error();
    assert!(session.snapshot().error.is_none());
}

#[tokio::test]
async fn test_delete_of_missing_order_reloads() {
    let (source, session) = loaded(3).await;

    let err = session
        .delete(OrderId::new(99))
        .await
        .expect_err("Delete should fail");
    assert_eq!(err.kind(), "delete_failed");
    assert!(matches!(
        err.api_error(),
        purchase_feed::ApiError::NotFound(_)
    ));
    assert_eq!(ids(&session), vec![1, 2, 3]);
    assert_eq!(source.fetches(), 2);
}

#[tokio::test]
async fn test_duplicate_delete_is_not_resubmitted() {
    let (source, session) = loaded(3).await;

    let (first, second) = tokio::join!(
        session.delete(OrderId::new(2)),
        session.delete(OrderId::new(2))
    );
    assert_eq!(first.expect("Delete failed"), DeleteOutcome::Deleted);
    assert_eq!(second.expect("Delete failed"), DeleteOutcome::AlreadyPending);
    assert_eq!(source.ids(), vec![1, 3]);
}

#[tokio::test]
async fn test_reload_during_delete_does_not_resurrect() {
    let (source, session) = loaded(5).await;

    let (deleted, reloaded) = tokio::join!(session.delete(OrderId::new(2)), session.reload());
    assert_eq!(deleted.expect("Delete failed"), DeleteOutcome::Deleted);
    reloaded.expect("Reload failed");

    assert_eq!(ids(&session), vec![1, 3, 4, 5]);
    assert_eq!(source.ids(), vec![1, 3, 4, 5]);
}

#[tokio::test]
async fn test_confirmed_delete_drops_cached_page() {
    let (_source, session) = loaded(45).await;
    session.load_more().await.expect("Second page failed");

    session
        .delete(OrderId::new(25))
        .await
        .expect("Delete failed");

    assert!(session.coordinator().is_cached(None));
    assert!(!session.coordinator().is_cached(Some(&Cursor::from("20"))));
}

// ============================================================================
// Create
// ============================================================================

#[tokio::test]
async fn test_create_resets_to_first_page() {
    let (source, session) = loaded(45).await;
    session.load_more().await.expect("Second page failed");
    assert_eq!(session.snapshot().len(), 40);

    let created = session
        .create(sample_draft(7))
        .await
        .expect("Create failed");
    assert_eq!(created.id, OrderId::new(46));
    assert_eq!(
        created.total_price,
        created.unit_price * Decimal::from(created.quantity)
    );

    assert_eq!(ids(&session), (1..=20).collect::<Vec<_>>());
    assert_eq!(session.coordinator().cached_pages(), 1);
    assert_eq!(source.fetch_log().last(), Some(&None));
    assert_eq!(source.len(), 46);
}

#[tokio::test]
async fn test_failed_create_keeps_draft_and_list() {
    let (source, session) = loaded(5).await;
    source.fail_creates(true);
    let draft = sample_draft(11);

    let err = session
        .create(draft.clone())
        .await
        .expect_err("Create should fail");
    match err {
        FeedError::CreateFailed { draft: kept, .. } => assert_eq!(*kept, draft),
        other => panic!("Unexpected error: {other}"),
    }

    assert_eq!(ids(&session), vec![1, 2, 3, 4, 5]);
    assert_eq!(source.fetches(), 1);
    assert!(session.snapshot().error.is_some());
}
