//! Create and delete commands.
//!
//! Creating waits for the server and then reloads from the first page, since a
//! new order can land anywhere in the server's ordering. Deleting is
//! optimistic: the order disappears at once and is only brought back by a full
//! reload if the server refuses.

use std::sync::Arc;

use purchase_feed_core::{NewPurchaseOrder, OrderId, PurchaseOrder};
use tracing::{error, info, instrument, warn};

use crate::api::DataSource;
use crate::coordinator::{FetchCoordinator, LoadMode};
use crate::error::FeedError;

/// Result of a delete request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The server confirmed the delete.
    Deleted,
    /// A delete for the same id is already pending; nothing was sent.
    AlreadyPending,
}

/// Applies create/delete commands and keeps the feed consistent with them.
pub struct MutationController<S> {
    coordinator: FetchCoordinator<S>,
}

impl<S> Clone for MutationController<S> {
    fn clone(&self) -> Self {
        Self {
            coordinator: self.coordinator.clone(),
        }
    }
}

impl<S: DataSource> MutationController<S> {
    #[must_use]
    pub const fn new(coordinator: FetchCoordinator<S>) -> Self {
        Self { coordinator }
    }

    /// Submit a new order, then reload the feed from the first page.
    ///
    /// A failed reload after a successful create is recorded in the snapshot
    /// but does not fail the create.
    ///
    /// # Errors
    ///
    /// Returns `FeedError::CreateFailed` carrying the draft if the source
    /// rejects it. The list is left untouched.
    #[instrument(skip(self, draft), fields(item_name = %draft.item_name))]
    pub async fn create(&self, draft: NewPurchaseOrder) -> Result<PurchaseOrder, FeedError> {
        match self.coordinator.source().create_order(&draft).await {
            Ok(order) => {
                info!(id = %order.id, "Purchase order created");
                self.coordinator.invalidate_cache();
                if let Err(e) = self.coordinator.load_page(None, LoadMode::Reset).await {
                    warn!(error = %e, "Reload after create failed");
                }
                Ok(order)
            }
            Err(e) => {
                let err = FeedError::CreateFailed {
                    draft: Box::new(draft),
                    source: Arc::new(e),
                };
                error!(error = %err, "Failed to create purchase order");
                self.coordinator.record_error(err.clone());
                Err(err)
            }
        }
    }

    /// Delete an order optimistically.
    ///
    /// # Errors
    ///
    /// Returns `FeedError::DeleteFailed` if the source refuses. By then the
    /// cache has been dropped and the feed reloaded from the first page, which
    /// is what brings the order back.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: OrderId) -> Result<DeleteOutcome, FeedError> {
        if !self.coordinator.begin_delete(id) {
            info!(%id, "Delete already pending");
            return Ok(DeleteOutcome::AlreadyPending);
        }

        match self.coordinator.source().delete_order(id).await {
            Ok(()) => {
                self.coordinator.confirm_delete(id);
                info!(%id, "Purchase order deleted");
                Ok(DeleteOutcome::Deleted)
            }
            Err(e) => {
                let err = FeedError::DeleteFailed {
                    id,
                    source: Arc::new(e),
                };
                error!(error = %err, "Failed to delete purchase order, reloading");

                self.coordinator.abandon_delete(id);
                self.coordinator.invalidate_cache();
                if let Err(reload) = self.coordinator.load_page(None, LoadMode::Reset).await {
                    warn!(error = %reload, "Reload after failed delete also failed");
                }
                // Recorded last so the reload's own success does not clear it.
                self.coordinator.record_error(err.clone());
                Err(err)
            }
        }
    }
}
