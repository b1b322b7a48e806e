//! `HttpSource` against the in-process mock API.

use std::time::Duration;

use purchase_feed::config::ApiConfig;
use purchase_feed::{ApiError, DataSource, FeedConfig, FeedSession, HttpSource};
use purchase_feed_core::{Cursor, OrderId};
use purchase_feed_integration_tests::{ForcedFailure, MemorySource, MockApi, sample_draft};
use rust_decimal::Decimal;

async fn start(count: i32) -> (MockApi, HttpSource) {
    let mock = MockApi::start(MemorySource::seeded(count))
        .await
        .expect("Failed to start mock API");
    let source = HttpSource::new(&api_config(&mock)).expect("Failed to build HTTP source");
    (mock, source)
}

fn api_config(mock: &MockApi) -> ApiConfig {
    ApiConfig {
        base_url: mock.base_url(),
        request_timeout: Duration::from_secs(5),
        order_cache_ttl: Duration::from_secs(60),
    }
}

// ============================================================================
// Reads
// ============================================================================

#[tokio::test]
async fn test_pages_over_http() {
    let (_mock, source) = start(25).await;

    let first = source.fetch_page(None, 10).await.expect("First page failed");
    assert_eq!(first.len(), 10);
    assert!(first.has_more);
    // The server sends the cursor as a JSON integer.
    assert_eq!(first.next_cursor, Some(Cursor::from("10")));

    let last = source
        .fetch_page(Some(&Cursor::from("20")), 10)
        .await
        .expect("Last page failed");
    assert_eq!(last.len(), 5);
    assert!(!last.has_more);
    assert_eq!(last.next_cursor, None);
    assert_eq!(last.cursor, Some(Cursor::from("20")));
}

#[tokio::test]
async fn test_fetch_order_and_not_found() {
    let (_mock, source) = start(5).await;

    let order = source
        .fetch_order(OrderId::new(3))
        .await
        .expect("Fetch failed");
    assert_eq!(order.id, OrderId::new(3));
    assert_eq!(order.item_name, "Item 003");

    let err = source
        .fetch_order(OrderId::new(99))
        .await
        .expect_err("Order 99 should not exist");
    assert!(matches!(err, ApiError::NotFound(_)));
}

#[tokio::test]
async fn test_cached_order_survives_outage() {
    let (mock, source) = start(5).await;
    source
        .fetch_order(OrderId::new(1))
        .await
        .expect("Fetch failed");

    mock.force(Some(ForcedFailure::Status(503)));
    assert!(source.fetch_order(OrderId::new(1)).await.is_ok());
    assert!(source.fetch_order(OrderId::new(2)).await.is_err());
}

// ============================================================================
// Writes
// ============================================================================

#[tokio::test]
async fn test_create_then_delete() {
    let (mock, source) = start(3).await;
    let draft = sample_draft(8);

    let created = source.create_order(&draft).await.expect("Create failed");
    assert_eq!(created.id, OrderId::new(4));
    assert_eq!(created.item_name, draft.item_name);
    assert_eq!(
        created.total_price,
        draft.unit_price * Decimal::from(draft.quantity)
    );
    assert_eq!(mock.source().len(), 4);

    source
        .delete_order(created.id)
        .await
        .expect("Delete failed");
    assert_eq!(mock.source().ids(), vec![1, 2, 3]);

    let again = source.delete_order(created.id).await;
    assert!(matches!(again, Err(ApiError::NotFound(_))));
    let lookup = source.fetch_order(created.id).await;
    assert!(matches!(lookup, Err(ApiError::NotFound(_))));
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test]
async fn test_rate_limit_reads_retry_after() {
    let (mock, source) = start(5).await;
    mock.force(Some(ForcedFailure::RateLimited { retry_after: 7 }));

    let err = source
        .fetch_page(None, 10)
        .await
        .expect_err("Request should be rate limited");
    assert!(matches!(err, ApiError::RateLimited(7)));
}

#[tokio::test]
async fn test_error_status_body_is_truncated() {
    let (mock, source) = start(5).await;
    mock.force(Some(ForcedFailure::Status(503)));

    let err = source
        .fetch_page(None, 10)
        .await
        .expect_err("Request should fail");
    match err {
        ApiError::Status { status, body } => {
            assert_eq!(status, 503);
            assert_eq!(body.chars().count(), 200);
        }
        other => panic!("Unexpected error: {other}"),
    }

    mock.force(None);
    assert!(source.fetch_page(None, 10).await.is_ok());
}

#[tokio::test]
async fn test_out_of_range_limit_is_rejected() {
    let (_mock, source) = start(5).await;

    let err = source
        .fetch_page(None, 101)
        .await
        .expect_err("Limit 101 should be rejected");
    assert!(matches!(err, ApiError::Status { status: 422, .. }));
}

// ============================================================================
// Session
// ============================================================================

#[tokio::test]
async fn test_session_over_http() {
    let (mock, source) = start(45).await;
    let config = FeedConfig {
        api: api_config(&mock),
        ..FeedConfig::default()
    };
    let session = FeedSession::new(source, config).expect("Config should validate");

    session.load_initial().await.expect("Initial load failed");
    session.load_more().await.expect("Second page failed");
    let snapshot = session.snapshot();
    assert_eq!(snapshot.len(), 40);
    assert_eq!(snapshot.next_cursor, Some(Cursor::from("40")));

    session
        .delete(OrderId::new(5))
        .await
        .expect("Delete failed");
    assert_eq!(session.snapshot().len(), 39);
    assert!(!mock.source().ids().contains(&5));

    session.load_more().await.expect("Last page failed");
    let snapshot = session.snapshot();
    assert_eq!(snapshot.len(), 44);
    assert!(!snapshot.has_more);
}
