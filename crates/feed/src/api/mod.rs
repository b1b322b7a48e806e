//! Purchase-order API access.
//!
//! # Architecture
//!
//! - [`DataSource`] is the seam between the feed and the remote collection.
//!   The feed only ever talks to the API through it, so tests can substitute
//!   an in-memory source.
//! - [`HttpSource`] is the production implementation over `reqwest`.
//! - The API is the source of truth; nothing is persisted locally.
//!
//! # Example
//!
//! ```rust,ignore
//! use purchase_feed::api::{DataSource, HttpSource};
//!
//! let source = HttpSource::new(&config.api)?;
//!
//! // First page
//! let page = source.fetch_page(None, 20).await?;
//!
//! // Follow the cursor
//! if let Some(next) = page.next_cursor.as_ref() {
//!     let more = source.fetch_page(Some(next), 20).await?;
//! }
//! ```

mod http;

use std::future::Future;

use purchase_feed_core::{Cursor, NewPurchaseOrder, OrderId, Page, PurchaseOrder};
use thiserror::Error;

pub use http::HttpSource;

/// Errors that can occur when talking to the purchase-order API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Endpoint URL could not be built.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the API.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Non-success status with a (truncated) response body.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Failure reported by a non-HTTP source.
    #[error("Source unavailable: {0}")]
    Unavailable(String),
}

/// Remote collection of purchase orders.
///
/// Every method is a single request/response exchange; retries and caching
/// are the caller's concern.
pub trait DataSource: Send + Sync {
    /// Fetch one page. `cursor == None` requests the first page.
    fn fetch_page(
        &self,
        cursor: Option<&Cursor>,
        limit: u32,
    ) -> impl Future<Output = Result<Page, ApiError>> + Send;

    /// Fetch a single order by id.
    fn fetch_order(&self, id: OrderId) -> impl Future<Output = Result<PurchaseOrder, ApiError>> + Send;

    /// Create an order; the server assigns the id and total.
    fn create_order(
        &self,
        draft: &NewPurchaseOrder,
    ) -> impl Future<Output = Result<PurchaseOrder, ApiError>> + Send;

    /// Delete an order.
    fn delete_order(&self, id: OrderId) -> impl Future<Output = Result<(), ApiError>> + Send;
}

/// Truncate a response body for logs and error messages.
pub(crate) fn truncate_body(body: &str, max_chars: usize) -> String {
    body.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = ApiError::NotFound("purchase order 12".to_string());
        assert_eq!(err.to_string(), "Not found: purchase order 12");

        let err = ApiError::Status {
            status: 500,
            body: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 500: boom");
    }

    #[test]
    fn test_rate_limited_error() {
        let err = ApiError::RateLimited(60);
        assert_eq!(err.to_string(), "Rate limited, retry after 60 seconds");
    }

    #[test]
    fn test_truncate_body_counts_chars() {
        assert_eq!(truncate_body("héllo world", 5), "héllo");
        assert_eq!(truncate_body("ok", 200), "ok");
    }
}
