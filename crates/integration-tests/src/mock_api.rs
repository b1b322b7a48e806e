//! In-process HTTP stand-in for the purchase-order API.
//!
//! Serves the same four endpoints as the reference backend from a
//! [`MemorySource`], on an ephemeral port of `127.0.0.1`.

use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};

use axum::extract::{Path, Query, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use purchase_feed::{ApiError, DataSource};
use purchase_feed_core::{Cursor, NewPurchaseOrder, OrderId, Page};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use crate::memory::MemorySource;

/// Page size when the request has no `limit`, as in the reference backend.
const DEFAULT_LIMIT: u32 = 10;
const MAX_LIMIT: u32 = 100;

/// A canned failure returned for every request while set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForcedFailure {
    /// `429` with a `Retry-After` header.
    RateLimited { retry_after: u64 },
    /// The given status with a plain-text body.
    Status(u16),
}

#[derive(Clone)]
struct MockState {
    source: MemorySource,
    forced: Arc<Mutex<Option<ForcedFailure>>>,
}

/// Running mock server. Shut down on drop.
pub struct MockApi {
    addr: SocketAddr,
    source: MemorySource,
    forced: Arc<Mutex<Option<ForcedFailure>>>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl MockApi {
    /// Bind `127.0.0.1:0` and serve `source`.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the listener cannot be bound.
    pub async fn start(source: MemorySource) -> io::Result<Self> {
        let forced = Arc::new(Mutex::new(None));
        let state = MockState {
            source: source.clone(),
            forced: Arc::clone(&forced),
        };

        let app = Router::new()
            .route("/", get(root))
            .route("/api/purchase-orders", get(list).post(create))
            .route("/api/purchase-orders/{id}", get(show).delete(remove))
            .with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let (shutdown, stopped) = oneshot::channel::<()>();

        tokio::spawn(async move {
            let server = axum::serve(listener, app).with_graceful_shutdown(async {
                let _ = stopped.await;
            });
            if let Err(e) = server.await {
                tracing::error!(error = %e, "Mock API server failed");
            }
        });
        tracing::debug!(%addr, "Mock API listening");

        Ok(Self {
            addr,
            source,
            forced,
            shutdown: Some(shutdown),
        })
    }

    /// Base URL to hand to `ApiConfig::base_url`.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// The store behind the server.
    #[must_use]
    pub const fn source(&self) -> &MemorySource {
        &self.source
    }

    /// Fail every request until cleared with `None`.
    pub fn force(&self, failure: Option<ForcedFailure>) {
        *self.forced.lock().unwrap_or_else(PoisonError::into_inner) = failure;
    }
}

impl Drop for MockApi {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// `ApiError` rendered the way the reference backend answers.
struct MockError(ApiError);

impl IntoResponse for MockError {
    fn into_response(self) -> Response {
        match self.0 {
            ApiError::NotFound(_) => (
                StatusCode::NOT_FOUND,
                Json(json!({ "detail": "Purchase order not found" })),
            )
                .into_response(),
            ApiError::Status { status, body } => (
                StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                Json(json!({ "detail": body })),
            )
                .into_response(),
            other => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "detail": other.to_string() })),
            )
                .into_response(),
        }
    }
}

fn forced_response(state: &MockState) -> Option<Response> {
    let forced = *state.forced.lock().unwrap_or_else(PoisonError::into_inner);
    match forced? {
        ForcedFailure::RateLimited { retry_after } => {
            let mut response = (StatusCode::TOO_MANY_REQUESTS, "slow down").into_response();
            if let Ok(value) = HeaderValue::from_str(&retry_after.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
            Some(response)
        }
        ForcedFailure::Status(status) => Some(
            (
                StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                "x".repeat(500),
            )
                .into_response(),
        ),
    }
}

async fn root() -> Json<Value> {
    Json(json!({ "message": "Purchase Order API" }))
}

#[derive(Debug, Deserialize)]
struct ListParams {
    cursor: Option<String>,
    limit: Option<u32>,
}

/// Page body with integer cursors where the token is numeric.
fn page_body(page: Page) -> Value {
    let next_cursor = page.next_cursor.as_ref().map(|cursor| {
        cursor
            .as_str()
            .parse::<i64>()
            .map_or_else(|_| json!(cursor.as_str()), |n| json!(n))
    });
    json!({
        "data": page.items,
        "next_cursor": next_cursor,
        "has_more": page.has_more,
    })
}

async fn list(State(state): State<MockState>, Query(params): Query<ListParams>) -> Response {
    if let Some(response) = forced_response(&state) {
        return response;
    }
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT);
    if !(1..=MAX_LIMIT).contains(&limit) {
        return MockError(ApiError::Status {
            status: 422,
            body: format!("limit must be between 1 and {MAX_LIMIT}"),
        })
        .into_response();
    }

    let cursor = params.cursor.map(Cursor::new);
    match state.source.fetch_page(cursor.as_ref(), limit).await {
        Ok(page) => Json(page_body(page)).into_response(),
        Err(e) => MockError(e).into_response(),
    }
}

async fn show(State(state): State<MockState>, Path(id): Path<i32>) -> Response {
    if let Some(response) = forced_response(&state) {
        return response;
    }
    match state.source.fetch_order(OrderId::new(id)).await {
        Ok(order) => Json(order).into_response(),
        Err(e) => MockError(e).into_response(),
    }
}

async fn create(State(state): State<MockState>, Json(draft): Json<NewPurchaseOrder>) -> Response {
    if let Some(response) = forced_response(&state) {
        return response;
    }
    match state.source.create_order(&draft).await {
        Ok(order) => (StatusCode::CREATED, Json(order)).into_response(),
        Err(e) => MockError(e).into_response(),
    }
}

async fn remove(State(state): State<MockState>, Path(id): Path<i32>) -> Response {
    if let Some(response) = forced_response(&state) {
        return response;
    }
    match state.source.delete_order(OrderId::new(id)).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => MockError(e).into_response(),
    }
}
