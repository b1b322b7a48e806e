//! `reqwest` implementation of [`DataSource`].
//!
//! Single-order lookups are cached using `moka` with the configured TTL.
//! Pages are never cached here; the feed's page cache owns that concern.

use std::sync::Arc;

use moka::future::Cache;
use purchase_feed_core::{Cursor, NewPurchaseOrder, OrderId, Page, PageResponse, PurchaseOrder};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, error, instrument};
use url::Url;

use super::{ApiError, DataSource, truncate_body};
use crate::config::ApiConfig;

/// Collection path, relative to the base URL.
const ORDERS_PATH: &str = "api/purchase-orders";

/// Body length kept in `ApiError::Status`.
const ERROR_BODY_CHARS: usize = 200;

/// Body length written to logs.
const LOG_BODY_CHARS: usize = 500;

/// Upper bound on cached single orders.
const ORDER_CACHE_CAPACITY: u64 = 1000;

/// HTTP client for the purchase-order API.
///
/// Cheaply cloneable; clones share the connection pool and order cache.
#[derive(Clone)]
pub struct HttpSource {
    inner: Arc<HttpSourceInner>,
}

struct HttpSourceInner {
    client: reqwest::Client,
    base_url: Url,
    orders: Cache<OrderId, PurchaseOrder>,
}

impl HttpSource {
    /// Create a client for the API at `config.base_url`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Url` if the base URL does not parse, or
    /// `ApiError::Http` if the HTTP client cannot be built.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let mut base_url = Url::parse(&config.base_url)?;
        // `Url::join` replaces the last segment unless the path ends in '/'.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        let orders = Cache::builder()
            .max_capacity(ORDER_CACHE_CAPACITY)
            .time_to_live(config.order_cache_ttl)
            .build();

        Ok(Self {
            inner: Arc::new(HttpSourceInner {
                client,
                base_url,
                orders,
            }),
        })
    }

    /// Base URL requests are resolved against.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    fn orders_url(&self) -> Result<Url, ApiError> {
        Ok(self.inner.base_url.join(ORDERS_PATH)?)
    }

    fn order_url(&self, id: OrderId) -> Result<Url, ApiError> {
        Ok(self.inner.base_url.join(&format!("{ORDERS_PATH}/{id}"))?)
    }

    /// Send a request and return the body of a successful response.
    async fn send(&self, request: RequestBuilder, what: &str) -> Result<String, ApiError> {
        let response = request.send().await?;
        let response = check_status(response, what).await?;
        Ok(response.text().await?)
    }
}

/// Map error statuses onto `ApiError`.
async fn check_status(response: Response, what: &str) -> Result<Response, ApiError> {
    let status = response.status();

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(1);
        return Err(ApiError::RateLimited(retry_after));
    }

    if status == StatusCode::NOT_FOUND {
        return Err(ApiError::NotFound(what.to_string()));
    }

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        error!(
            status = %status,
            body = %truncate_body(&body, LOG_BODY_CHARS),
            "Purchase-order API returned non-success status"
        );
        return Err(ApiError::Status {
            status: status.as_u16(),
            body: truncate_body(&body, ERROR_BODY_CHARS),
        });
    }

    Ok(response)
}

/// Parse a JSON body, logging it on failure.
fn parse<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|e| {
        error!(
            error = %e,
            body = %truncate_body(body, LOG_BODY_CHARS),
            "Failed to parse purchase-order API response"
        );
        ApiError::Parse(e)
    })
}

impl DataSource for HttpSource {
    #[instrument(skip(self), fields(cursor = ?cursor.map(Cursor::as_str)))]
    async fn fetch_page(&self, cursor: Option<&Cursor>, limit: u32) -> Result<Page, ApiError> {
        let mut url = self.orders_url()?;
        {
            let mut query = url.query_pairs_mut();
            if let Some(cursor) = cursor {
                query.append_pair("cursor", cursor.as_str());
            }
            query.append_pair("limit", &limit.to_string());
        }

        let body = self
            .send(self.inner.client.get(url), "purchase orders")
            .await?;
        let response: PageResponse = parse(&body)?;
        debug!(
            count = response.data.len(),
            has_more = response.has_more,
            "Fetched page"
        );
        Ok(Page::from_response(cursor.cloned(), response))
    }

    #[instrument(skip(self), fields(id = %id))]
    async fn fetch_order(&self, id: OrderId) -> Result<PurchaseOrder, ApiError> {
        if let Some(order) = self.inner.orders.get(&id).await {
            debug!("Cache hit for purchase order");
            return Ok(order);
        }

        let url = self.order_url(id)?;
        let body = self
            .send(self.inner.client.get(url), &format!("purchase order {id}"))
            .await?;
        let order: PurchaseOrder = parse(&body)?;

        self.inner.orders.insert(id, order.clone()).await;
        Ok(order)
    }

    #[instrument(skip(self, draft), fields(item_name = %draft.item_name))]
    async fn create_order(&self, draft: &NewPurchaseOrder) -> Result<PurchaseOrder, ApiError> {
        let url = self.orders_url()?;
        let body = self
            .send(self.inner.client.post(url).json(draft), "purchase orders")
            .await?;
        let order: PurchaseOrder = parse(&body)?;

        self.inner.orders.insert(order.id, order.clone()).await;
        debug!(id = %order.id, "Created purchase order");
        Ok(order)
    }

    #[instrument(skip(self), fields(id = %id))]
    async fn delete_order(&self, id: OrderId) -> Result<(), ApiError> {
        let url = self.order_url(id)?;
        let result = self
            .send(self.inner.client.delete(url), &format!("purchase order {id}"))
            .await;

        // Gone either way once the server has answered.
        if matches!(result, Ok(_) | Err(ApiError::NotFound(_))) {
            self.inner.orders.invalidate(&id).await;
        }
        result.map(|_| ())
    }
}
