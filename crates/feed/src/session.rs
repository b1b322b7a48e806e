//! Session state shared by everything that drives one feed.

use std::sync::{Arc, Mutex, PoisonError};

use purchase_feed_core::{NewPurchaseOrder, OrderId, PurchaseOrder};
use tokio::sync::watch;
use tracing::{debug, instrument};

use crate::api::{ApiError, DataSource};
use crate::config::{ConfigError, FeedConfig};
use crate::coordinator::{FeedSnapshot, FetchCoordinator, LoadMode, LoadOutcome};
use crate::error::FeedError;
use crate::mutation::{DeleteOutcome, MutationController};
use crate::scroll::{ScrollDriver, ScrollHandle, ScrollPolicy, ScrollTelemetry};
use crate::virtualizer::{VisibleWindow, Virtualizer};

/// One feed over one data source.
///
/// This struct is cheaply cloneable via `Arc`; clones share the page cache,
/// the item list and the virtualizer memo. Nothing outlives the last clone.
pub struct FeedSession<S> {
    inner: Arc<SessionInner<S>>,
}

impl<S> Clone for FeedSession<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct SessionInner<S> {
    config: FeedConfig,
    coordinator: FetchCoordinator<S>,
    mutations: MutationController<S>,
    policy: ScrollPolicy,
    virtualizer: Mutex<Virtualizer>,
}

impl<S: DataSource> FeedSession<S> {
    /// Create a session.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `config` does not validate.
    pub fn new(source: S, config: FeedConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let policy = ScrollPolicy::from_config(&config.scroll)?;
        let coordinator = FetchCoordinator::new(source, &config);
        let mutations = MutationController::new(coordinator.clone());
        let virtualizer = Mutex::new(Virtualizer::from_config(&config.viewport));

        Ok(Self {
            inner: Arc::new(SessionInner {
                config,
                coordinator,
                mutations,
                policy,
                virtualizer,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &FeedConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn coordinator(&self) -> &FetchCoordinator<S> {
        &self.inner.coordinator
    }

    #[must_use]
    pub fn source(&self) -> &S {
        self.inner.coordinator.source()
    }

    // =========================================================================
    // Loading
    // =========================================================================

    /// Load the first page, from cache if it is there.
    ///
    /// # Errors
    ///
    /// Returns `FeedError::FetchFailed` if the source fails.
    pub async fn load_initial(&self) -> Result<LoadOutcome, FeedError> {
        self.inner
            .coordinator
            .load_page(None, LoadMode::Paginate)
            .await
    }

    /// Load the page after the current frontier, if there is one.
    ///
    /// # Errors
    ///
    /// Returns `FeedError::FetchFailed` if the source fails.
    pub async fn load_more(&self) -> Result<Option<LoadOutcome>, FeedError> {
        let pagination = self.inner.coordinator.pagination();
        match pagination.next_cursor {
            Some(cursor) if pagination.has_more => self
                .inner
                .coordinator
                .load_page(Some(cursor), LoadMode::Paginate)
                .await
                .map(Some),
            _ => Ok(None),
        }
    }

    /// Drop every cached page and load the first page again.
    ///
    /// # Errors
    ///
    /// Returns `FeedError::FetchFailed` if the source fails.
    #[instrument(skip(self))]
    pub async fn reload(&self) -> Result<LoadOutcome, FeedError> {
        self.inner.coordinator.invalidate_cache();
        self.inner
            .coordinator
            .load_page(None, LoadMode::Reset)
            .await
    }

    /// Dismiss the current error and repeat what failed.
    ///
    /// A failed page load is retried at the same cursor; anything else falls
    /// back to a full reload.
    ///
    /// # Errors
    ///
    /// Returns `FeedError::FetchFailed` if the retry fails too.
    #[instrument(skip(self))]
    pub async fn retry(&self) -> Result<LoadOutcome, FeedError> {
        let failed = self.inner.coordinator.snapshot().error;
        self.inner.coordinator.dismiss_error();

        match failed {
            Some(FeedError::FetchFailed {
                cursor: Some(cursor),
                ..
            }) => {
                debug!(%cursor, "Retrying page load");
                self.inner
                    .coordinator
                    .load_page(Some(cursor), LoadMode::Paginate)
                    .await
            }
            Some(FeedError::FetchFailed { cursor: None, .. }) => self.load_initial().await,
            _ => self.reload().await,
        }
    }

    /// Fetch a single order directly from the source.
    ///
    /// # Errors
    ///
    /// Returns the source's `ApiError`; `ApiError::NotFound` for unknown ids.
    pub async fn fetch_order(&self, id: OrderId) -> Result<PurchaseOrder, ApiError> {
        self.source().fetch_order(id).await
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// See [`MutationController::create`].
    ///
    /// # Errors
    ///
    /// Returns `FeedError::CreateFailed` if the source rejects the draft.
    pub async fn create(&self, draft: NewPurchaseOrder) -> Result<PurchaseOrder, FeedError> {
        self.inner.mutations.create(draft).await
    }

    /// See [`MutationController::delete`].
    ///
    /// # Errors
    ///
    /// Returns `FeedError::DeleteFailed` if the source refuses.
    pub async fn delete(&self, id: OrderId) -> Result<DeleteOutcome, FeedError> {
        self.inner.mutations.delete(id).await
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    #[must_use]
    pub fn snapshot(&self) -> FeedSnapshot {
        self.inner.coordinator.snapshot()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<FeedSnapshot> {
        self.inner.coordinator.subscribe()
    }

    pub fn dismiss_error(&self) {
        self.inner.coordinator.dismiss_error();
    }

    /// Visible window over the current item list.
    #[must_use]
    pub fn window(&self, scroll_offset: f64, viewport_extent: f64) -> VisibleWindow {
        let total = self.inner.coordinator.snapshot().len();
        self.inner
            .virtualizer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .window(scroll_offset, viewport_extent, total)
    }

    /// Extent of the loaded content.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn content_extent(&self) -> f64 {
        self.inner.coordinator.snapshot().len() as f64 * self.inner.config.viewport.item_extent
    }

    /// Scroll telemetry for a position over the loaded content.
    #[must_use]
    pub fn telemetry(&self, scroll_offset: f64, viewport_extent: f64) -> ScrollTelemetry {
        ScrollTelemetry::new(scroll_offset, viewport_extent, self.content_extent())
    }

    /// A scroll driver bound to this session, and the handle that feeds it.
    ///
    /// Nothing is spawned; the caller decides where the driver runs.
    #[must_use]
    pub fn scroll_driver(&self) -> (ScrollDriver<S>, ScrollHandle) {
        ScrollDriver::new(
            self.inner.coordinator.clone(),
            self.inner.policy,
            self.inner.config.scroll.throttle,
        )
    }
}
