//! Operation-level errors.
//!
//! Every feed operation catches transport failures at its boundary and turns
//! them into a `FeedError`. The error is both returned to the caller and
//! recorded in the published [`FeedSnapshot`](crate::FeedSnapshot), so a UI can
//! show it as a dismissible banner while the list stays interactive.

use std::sync::Arc;

use purchase_feed_core::{Cursor, NewPurchaseOrder, OrderId};
use thiserror::Error;

use crate::api::ApiError;

/// A reported, recoverable failure.
#[derive(Debug, Clone, Error)]
pub enum FeedError {
    /// Loading a page failed; the list is left at its last good state.
    #[error("Failed to load {}: {source}", describe_cursor(.cursor.as_ref()))]
    FetchFailed {
        cursor: Option<Cursor>,
        #[source]
        source: Arc<ApiError>,
    },

    /// Creating an order failed; the draft is kept for a retry.
    #[error("Failed to create purchase order '{}': {source}", .draft.item_name)]
    CreateFailed {
        draft: Box<NewPurchaseOrder>,
        #[source]
        source: Arc<ApiError>,
    },

    /// Deleting an order failed; the list is reloaded from the server.
    #[error("Failed to delete purchase order {id}: {source}")]
    DeleteFailed {
        id: OrderId,
        #[source]
        source: Arc<ApiError>,
    },
}

impl FeedError {
    /// Short category name, suitable for log fields.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::FetchFailed { .. } => "fetch_failed",
            Self::CreateFailed { .. } => "create_failed",
            Self::DeleteFailed { .. } => "delete_failed",
        }
    }

    /// The underlying API error.
    #[must_use]
    pub fn api_error(&self) -> &ApiError {
        match self {
            Self::FetchFailed { source, .. }
            | Self::CreateFailed { source, .. }
            | Self::DeleteFailed { source, .. } => source,
        }
    }
}

fn describe_cursor(cursor: Option<&Cursor>) -> String {
    cursor.map_or_else(|| "first page".to_string(), |c| format!("page after {c}"))
}
