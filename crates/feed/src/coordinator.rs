//! Cursor pagination over a cached, deduplicated page store.
//!
//! The coordinator is the only writer of the page cache, the in-flight set and
//! the item list. Everyone else reads [`FeedSnapshot`]s it publishes.
//!
//! # Consistency rules
//!
//! - At most one fetch per cache key is outstanding. The membership check and
//!   the insert happen under one lock acquisition.
//! - A key stays in the in-flight set exactly while its request is pending,
//!   on success, on failure, and when the caller drops the future.
//! - Every list replacement bumps the epoch: a reset, a first-page fetch, and
//!   a first page served from cache. Completions issued under an older epoch
//!   are discarded on arrival, so a slow forward page can never land on a list
//!   it was not requested for.
//! - A forward page is appended only if its cursor is still the list's
//!   `next_cursor`.
//! - A key whose fetch is stale still counts as in flight until that fetch
//!   lands. A request for the same key in the meantime is deduplicated, and
//!   the next scroll event or `load_more` after it lands fetches it again.
//! - The item list never holds two orders with the same id and is only
//!   reordered by replacing it wholesale.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use purchase_feed_core::{Cursor, OrderId, Page, PurchaseOrder};
use tokio::sync::watch;
use tracing::{debug, info, instrument, trace, warn};

use crate::api::DataSource;
use crate::cache::{BoundedPageCache, CacheKey, PageCache};
use crate::config::FeedConfig;
use crate::error::FeedError;

/// How a page load relates to the current list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// Serve from cache when possible; forward pages are appended.
    Paginate,
    /// Bypass the cache and replace the list with the fetched page.
    Reset,
}

/// What a [`FetchCoordinator::load_page`] call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Fetched from the source and applied.
    Fetched(Page),
    /// Served from the page cache without a network call.
    Cached(Page),
    /// A fetch for the same key was already in flight; nothing was done.
    Deduplicated,
    /// The response arrived after the list was replaced and was dropped.
    Stale,
}

impl LoadOutcome {
    /// Whether the call reached the data source.
    #[must_use]
    pub const fn hit_network(&self) -> bool {
        matches!(self, Self::Fetched(_) | Self::Stale)
    }
}

/// Coarse state of the list, for choosing what to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedStatus {
    /// Nothing requested yet.
    Idle,
    /// First page in flight.
    Loading,
    /// Loaded, and the collection is empty.
    Empty,
    /// Loaded, with at least one order.
    Ready,
    /// The first page failed and nothing is shown.
    Failed,
}

/// Published view of the feed.
#[derive(Debug, Clone, Default)]
pub struct FeedSnapshot {
    pub items: Arc<Vec<PurchaseOrder>>,
    pub next_cursor: Option<Cursor>,
    pub has_more: bool,
    pub is_loading_initial: bool,
    pub is_loading_more: bool,
    /// Whether any page has been applied since the session started.
    pub loaded: bool,
    pub error: Option<FeedError>,
    /// Ids whose delete is submitted but not yet confirmed, ascending.
    pub pending_deletes: Vec<OrderId>,
}

impl FeedSnapshot {
    #[must_use]
    pub fn status(&self) -> FeedStatus {
        if !self.items.is_empty() {
            FeedStatus::Ready
        } else if self.is_loading_initial {
            FeedStatus::Loading
        } else if self.loaded {
            FeedStatus::Empty
        } else if self.error.is_some() {
            FeedStatus::Failed
        } else {
            FeedStatus::Idle
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.is_loading_initial || self.is_loading_more
    }

    /// Whether `id` is in its optimistic-delete window.
    #[must_use]
    pub fn is_pending_delete(&self, id: OrderId) -> bool {
        self.pending_deletes.binary_search(&id).is_ok()
    }
}

/// Pagination facts the scroll policy decides on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaginationState {
    pub has_more: bool,
    pub is_loading: bool,
    pub next_cursor: Option<Cursor>,
    /// The next page is already in the page cache.
    pub next_cached: bool,
    /// The next page is currently being fetched.
    pub next_in_flight: bool,
}

// =============================================================================
// FetchCoordinator
// =============================================================================

/// Owner of the page cache, the in-flight set and the item list.
///
/// Cheaply cloneable; clones share state.
pub struct FetchCoordinator<S> {
    inner: Arc<CoordinatorInner<S>>,
}

impl<S> Clone for FetchCoordinator<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct CoordinatorInner<S> {
    source: S,
    page_size: u32,
    state: Mutex<FeedState>,
    updates: watch::Sender<FeedSnapshot>,
}

struct FeedState {
    cache: Box<dyn PageCache>,
    /// Pending fetches and the epoch each was issued under.
    in_flight: HashMap<CacheKey, u64>,
    items: Arc<Vec<PurchaseOrder>>,
    ids: HashSet<OrderId>,
    next_cursor: Option<Cursor>,
    has_more: bool,
    loaded: bool,
    error: Option<FeedError>,
    epoch: u64,
    pending_deletes: HashSet<OrderId>,
}

impl FeedState {
    fn new(cache: Box<dyn PageCache>) -> Self {
        Self {
            cache,
            in_flight: HashMap::new(),
            items: Arc::new(Vec::new()),
            ids: HashSet::new(),
            next_cursor: None,
            has_more: false,
            loaded: false,
            error: None,
            epoch: 0,
            pending_deletes: HashSet::new(),
        }
    }

    fn loading(&self, initial: bool) -> bool {
        self.in_flight
            .iter()
            .any(|(key, epoch)| key.is_initial() == initial && *epoch == self.epoch)
    }

    fn snapshot(&self) -> FeedSnapshot {
        let mut pending_deletes: Vec<OrderId> = self.pending_deletes.iter().copied().collect();
        pending_deletes.sort_unstable();

        FeedSnapshot {
            items: Arc::clone(&self.items),
            next_cursor: self.next_cursor.clone(),
            has_more: self.has_more,
            is_loading_initial: self.loading(true),
            is_loading_more: self.loading(false),
            loaded: self.loaded,
            error: self.error.clone(),
            pending_deletes,
        }
    }

    /// Replace the list with a single page.
    fn replace_with(&mut self, page: &Page) {
        self.items = Arc::new(Vec::with_capacity(page.len()));
        self.ids.clear();
        self.append(page);
    }

    /// Append a page, skipping ids already listed or pending deletion.
    fn append(&mut self, page: &Page) {
        let items = Arc::make_mut(&mut self.items);
        for order in &page.items {
            if self.pending_deletes.contains(&order.id) {
                continue;
            }
            if self.ids.insert(order.id) {
                items.push(order.clone());
            } else {
                trace!(id = %order.id, "Skipping duplicate order");
            }
        }
        self.next_cursor.clone_from(&page.next_cursor);
        self.has_more = page.has_more;
        self.loaded = true;
    }

    fn remove_item(&mut self, id: OrderId) -> bool {
        if !self.ids.remove(&id) {
            return false;
        }
        Arc::make_mut(&mut self.items).retain(|order| order.id != id);
        true
    }
}

/// Clears an in-flight entry if a load is dropped before it completes.
struct InFlightGuard<'a> {
    state: &'a Mutex<FeedState>,
    key: Option<CacheKey>,
}

impl InFlightGuard<'_> {
    /// The completion path removes the entry itself, under its own lock.
    fn disarm(mut self) {
        self.key = None;
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.in_flight.remove(&key);
            debug!(%key, "Page load dropped before completion");
        }
    }
}

impl<S: DataSource> FetchCoordinator<S> {
    /// Create a coordinator with a cache built from `config`.
    #[must_use]
    pub fn new(source: S, config: &FeedConfig) -> Self {
        let cache = BoundedPageCache::new(config.cache.capacity, config.cache.policy);
        Self::with_cache(source, config.page_size, Box::new(cache))
    }

    /// Create a coordinator over any [`PageCache`] implementation.
    #[must_use]
    pub fn with_cache(source: S, page_size: u32, cache: Box<dyn PageCache>) -> Self {
        let state = FeedState::new(cache);
        let (updates, _) = watch::channel(state.snapshot());
        Self {
            inner: Arc::new(CoordinatorInner {
                source,
                page_size,
                state: Mutex::new(state),
                updates,
            }),
        }
    }

    /// The data source pages are fetched from.
    #[must_use]
    pub fn source(&self) -> &S {
        &self.inner.source
    }

    #[must_use]
    pub fn page_size(&self) -> u32 {
        self.inner.page_size
    }

    fn lock(&self) -> MutexGuard<'_, FeedState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: &FeedState) {
        self.inner.updates.send_replace(state.snapshot());
    }

    /// Load the page at `cursor` (`None` = first page).
    ///
    /// # Errors
    ///
    /// Returns `FeedError::FetchFailed` if the source fails. The error is also
    /// recorded in the published snapshot and the list is left untouched.
    #[instrument(skip(self))]
    pub async fn load_page(
        &self,
        cursor: Option<Cursor>,
        mode: LoadMode,
    ) -> Result<LoadOutcome, FeedError> {
        let key = CacheKey::from_cursor(cursor.as_ref());

        let epoch = {
            let mut state = self.lock();

            if mode == LoadMode::Paginate
                && let Some(page) = state.cache.get(&key).cloned()
            {
                debug!(%key, age = ?state.cache.age(&key), "Cache hit for page");
                if key.is_initial() {
                    state.epoch += 1;
                    state.replace_with(&page);
                    self.publish(&state);
                } else if state.next_cursor.as_ref() == page.cursor.as_ref() {
                    state.append(&page);
                    self.publish(&state);
                }
                return Ok(LoadOutcome::Cached(page));
            }

            if state.in_flight.contains_key(&key) {
                debug!(%key, "Page already in flight");
                return Ok(LoadOutcome::Deduplicated);
            }

            if mode == LoadMode::Reset {
                state.epoch += 1;
                info!(%key, epoch = state.epoch, "Resetting feed");
            } else if key.is_initial() {
                state.epoch += 1;
                debug!(epoch = state.epoch, "Reloading first page");
            }
            let epoch = state.epoch;
            state.in_flight.insert(key.clone(), epoch);
            self.publish(&state);
            epoch
        };

        let guard = InFlightGuard {
            state: &self.inner.state,
            key: Some(key.clone()),
        };
        let result = self
            .inner
            .source
            .fetch_page(cursor.as_ref(), self.inner.page_size)
            .await;

        let mut state = self.lock();
        state.in_flight.remove(&key);
        guard.disarm();

        let replaces = mode == LoadMode::Reset || key.is_initial();
        let off_frontier =
            !replaces && result.is_ok() && state.next_cursor.as_ref() != cursor.as_ref();
        if epoch != state.epoch || off_frontier {
            debug!(%key, epoch, current = state.epoch, ok = result.is_ok(), "Discarding stale page");
            self.publish(&state);
            return Ok(LoadOutcome::Stale);
        }

        match result {
            Ok(page) => {
                if let Some(evicted) = state.cache.put(key.clone(), page.clone()) {
                    debug!(%evicted, "Page cache full, evicted entry");
                }
                if replaces {
                    state.replace_with(&page);
                } else {
                    state.append(&page);
                }
                state.error = None;
                debug!(
                    %key,
                    fetched = page.len(),
                    total = state.items.len(),
                    has_more = page.has_more,
                    "Page applied"
                );
                self.publish(&state);
                Ok(LoadOutcome::Fetched(page))
            }
            Err(e) => {
                let err = FeedError::FetchFailed {
                    cursor,
                    source: Arc::new(e),
                };
                warn!(error = %err, "Page load failed");
                state.error = Some(err.clone());
                self.publish(&state);
                Err(err)
            }
        }
    }

    /// Current published state.
    #[must_use]
    pub fn snapshot(&self) -> FeedSnapshot {
        self.inner.updates.borrow().clone()
    }

    /// Receive every published snapshot.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<FeedSnapshot> {
        self.inner.updates.subscribe()
    }

    /// Pagination view for the scroll policy.
    #[must_use]
    pub fn pagination(&self) -> PaginationState {
        let state = self.lock();
        let (next_cached, next_in_flight) = state.next_cursor.as_ref().map_or((false, false), |c| {
            let key = CacheKey::After(c.clone());
            (state.cache.has(&key), state.in_flight.contains_key(&key))
        });

        PaginationState {
            has_more: state.has_more,
            is_loading: state.loading(true) || state.loading(false),
            next_cursor: state.next_cursor.clone(),
            next_cached,
            next_in_flight,
        }
    }

    /// Whether the page at `cursor` is cached.
    #[must_use]
    pub fn is_cached(&self, cursor: Option<&Cursor>) -> bool {
        self.lock().cache.has(&CacheKey::from_cursor(cursor))
    }

    /// Whether a fetch for the page at `cursor` is pending.
    #[must_use]
    pub fn is_in_flight(&self, cursor: Option<&Cursor>) -> bool {
        self.lock()
            .in_flight
            .contains_key(&CacheKey::from_cursor(cursor))
    }

    /// Number of cached pages.
    #[must_use]
    pub fn cached_pages(&self) -> usize {
        self.lock().cache.len()
    }

    /// Drop every cached page. In-flight fetches are unaffected.
    pub fn invalidate_cache(&self) {
        let mut state = self.lock();
        let dropped = state.cache.len();
        state.cache.clear();
        debug!(dropped, "Page cache invalidated");
    }

    /// Start an optimistic delete: mark `id` pending and drop it from the list.
    ///
    /// Returns `false` without changing anything if `id` is already pending.
    pub fn begin_delete(&self, id: OrderId) -> bool {
        let mut state = self.lock();
        if !state.pending_deletes.insert(id) {
            return false;
        }
        let removed = state.remove_item(id);
        debug!(%id, removed, "Order removed optimistically");
        self.publish(&state);
        true
    }

    /// Finish a confirmed delete.
    ///
    /// Cached pages that still hold the order are dropped so a later cache hit
    /// cannot bring it back.
    pub fn confirm_delete(&self, id: OrderId) {
        let mut state = self.lock();
        state.pending_deletes.remove(&id);
        state
            .cache
            .retain(&mut |_, page| page.items.iter().all(|order| order.id != id));
        self.publish(&state);
    }

    /// Clear the pending marker of a delete that failed.
    pub fn abandon_delete(&self, id: OrderId) {
        let mut state = self.lock();
        state.pending_deletes.remove(&id);
        self.publish(&state);
    }

    /// Record an error raised outside page loading.
    pub fn record_error(&self, err: FeedError) {
        let mut state = self.lock();
        state.error = Some(err);
        self.publish(&state);
    }

    /// Dismiss the current error banner.
    pub fn dismiss_error(&self) {
        let mut state = self.lock();
        if state.error.take().is_some() {
            self.publish(&state);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::future::Future;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use chrono::NaiveDate;
    use purchase_feed_core::NewPurchaseOrder;
    use rust_decimal::Decimal;

    use super::*;
    use crate::api::ApiError;
    use crate::cache::EvictionPolicy;

    fn order(id: i32) -> PurchaseOrder {
        PurchaseOrder {
            id: OrderId::new(id),
            item_name: format!("Item {id}"),
            order_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            delivery_date: NaiveDate::from_ymd_opt(2024, 1, 8).unwrap(),
            quantity: 1,
            unit_price: Decimal::ONE,
            total_price: Decimal::ONE,
        }
    }

    /// Two fixed pages: ids 1-3 then 4-5.
    #[derive(Default)]
    struct TwoPages {
        fetches: AtomicUsize,
        fail: AtomicBool,
    }

    impl DataSource for TwoPages {
        fn fetch_page(
            &self,
            cursor: Option<&Cursor>,
            _limit: u32,
        ) -> impl Future<Output = Result<Page, ApiError>> + Send {
            let cursor = cursor.cloned();
            async move {
                self.fetches.fetch_add(1, Ordering::SeqCst);
                tokio::task::yield_now().await;
                if self.fail.load(Ordering::SeqCst) {
                    return Err(ApiError::Unavailable("down".to_string()));
                }
                Ok(match cursor.as_ref().map(Cursor::as_str) {
                    None => Page {
                        cursor: None,
                        items: (1..=3).map(order).collect(),
                        next_cursor: Some(Cursor::from("3")),
                        has_more: true,
                    },
                    Some("3") => Page {
                        cursor,
                        items: (3..=5).map(order).collect(),
                        next_cursor: None,
                        has_more: false,
                    },
                    Some(_) => Page::empty(cursor),
                })
            }
        }

        async fn fetch_order(&self, id: OrderId) -> Result<PurchaseOrder, ApiError> {
            Ok(order(id.as_i32()))
        }

        async fn create_order(&self, _draft: &NewPurchaseOrder) -> Result<PurchaseOrder, ApiError> {
            Err(ApiError::Unavailable("read-only".to_string()))
        }

        async fn delete_order(&self, _id: OrderId) -> Result<(), ApiError> {
            Ok(())
        }
    }

    fn coordinator() -> FetchCoordinator<TwoPages> {
        FetchCoordinator::new(TwoPages::default(), &FeedConfig::default())
    }

    fn ids(snapshot: &FeedSnapshot) -> Vec<i32> {
        snapshot.items.iter().map(|o| o.id.as_i32()).collect()
    }

    #[tokio::test]
    async fn test_forward_pages_append_without_duplicates() {
        let coord = coordinator();
        assert_eq!(coord.snapshot().status(), FeedStatus::Idle);

        coord.load_page(None, LoadMode::Paginate).await.unwrap();
        let next = coord.snapshot().next_cursor;
        assert_eq!(next, Some(Cursor::from("3")));

        coord.load_page(next, LoadMode::Paginate).await.unwrap();
        let snapshot = coord.snapshot();
        assert_eq!(ids(&snapshot), vec![1, 2, 3, 4, 5]);
        assert!(!snapshot.has_more);
        assert_eq!(snapshot.next_cursor, None);
        assert_eq!(snapshot.status(), FeedStatus::Ready);
    }

    #[tokio::test]
    async fn test_concurrent_loads_share_one_fetch() {
        let coord = coordinator();
        let (a, b) = tokio::join!(
            coord.load_page(None, LoadMode::Paginate),
            coord.load_page(None, LoadMode::Paginate)
        );

        assert!(matches!(a.unwrap(), LoadOutcome::Fetched(_)));
        assert_eq!(b.unwrap(), LoadOutcome::Deduplicated);
        assert_eq!(coord.source().fetches.load(Ordering::SeqCst), 1);
        assert!(!coord.is_in_flight(None));
    }

    #[tokio::test]
    async fn test_cached_initial_page_is_republished() {
        let coord = coordinator();
        coord.load_page(None, LoadMode::Paginate).await.unwrap();
        coord
            .load_page(Some(Cursor::from("3")), LoadMode::Paginate)
            .await
            .unwrap();

        let outcome = coord.load_page(None, LoadMode::Paginate).await.unwrap();
        assert!(matches!(outcome, LoadOutcome::Cached(_)));
        assert_eq!(ids(&coord.snapshot()), vec![1, 2, 3]);
        assert_eq!(coord.source().fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cached_first_page_discards_pending_forward_page() {
        let coord = coordinator();
        coord.load_page(None, LoadMode::Paginate).await.unwrap();

        // The forward fetch yields once; the cached first page lands meanwhile.
        let (forward, initial) = tokio::join!(
            coord.load_page(Some(Cursor::from("3")), LoadMode::Paginate),
            coord.load_page(None, LoadMode::Paginate)
        );

        assert_eq!(forward.unwrap(), LoadOutcome::Stale);
        assert!(matches!(initial.unwrap(), LoadOutcome::Cached(_)));
        let snapshot = coord.snapshot();
        assert_eq!(ids(&snapshot), vec![1, 2, 3]);
        assert_eq!(snapshot.next_cursor, Some(Cursor::from("3")));
        assert!(!coord.is_cached(Some(&Cursor::from("3"))));
    }

    #[tokio::test]
    async fn test_fetched_first_page_discards_pending_forward_page() {
        let coord = coordinator();
        coord.load_page(None, LoadMode::Paginate).await.unwrap();
        coord.invalidate_cache();

        let (forward, initial) = tokio::join!(
            coord.load_page(Some(Cursor::from("3")), LoadMode::Paginate),
            coord.load_page(None, LoadMode::Paginate)
        );

        assert_eq!(forward.unwrap(), LoadOutcome::Stale);
        assert!(matches!(initial.unwrap(), LoadOutcome::Fetched(_)));
        assert_eq!(ids(&coord.snapshot()), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_reset_bypasses_cache() {
        let coord = coordinator();
        coord.load_page(None, LoadMode::Paginate).await.unwrap();
        let outcome = coord.load_page(None, LoadMode::Reset).await.unwrap();
        assert!(matches!(outcome, LoadOutcome::Fetched(_)));
        assert_eq!(coord.source().fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cached_frontier_page_is_merged_after_reset() {
        let coord = coordinator();
        coord.load_page(None, LoadMode::Paginate).await.unwrap();
        coord
            .load_page(Some(Cursor::from("3")), LoadMode::Paginate)
            .await
            .unwrap();
        coord.load_page(None, LoadMode::Reset).await.unwrap();
        assert_eq!(ids(&coord.snapshot()), vec![1, 2, 3]);

        let outcome = coord
            .load_page(Some(Cursor::from("3")), LoadMode::Paginate)
            .await
            .unwrap();
        assert!(matches!(outcome, LoadOutcome::Cached(_)));
        assert_eq!(ids(&coord.snapshot()), vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_failure_keeps_list_and_clears_in_flight() {
        let coord = coordinator();
        coord.load_page(None, LoadMode::Paginate).await.unwrap();

        coord.source().fail.store(true, Ordering::SeqCst);
        let err = coord
            .load_page(Some(Cursor::from("3")), LoadMode::Paginate)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "fetch_failed");

        let snapshot = coord.snapshot();
        assert_eq!(ids(&snapshot), vec![1, 2, 3]);
        assert!(snapshot.error.is_some());
        assert!(!coord.is_in_flight(Some(&Cursor::from("3"))));

        coord.source().fail.store(false, Ordering::SeqCst);
        coord
            .load_page(Some(Cursor::from("3")), LoadMode::Paginate)
            .await
            .unwrap();
        assert!(coord.snapshot().error.is_none());
    }

    #[tokio::test]
    async fn test_first_page_failure_reports_failed_status() {
        let coord = coordinator();
        coord.source().fail.store(true, Ordering::SeqCst);
        assert!(coord.load_page(None, LoadMode::Paginate).await.is_err());
        assert_eq!(coord.snapshot().status(), FeedStatus::Failed);

        coord.dismiss_error();
        assert_eq!(coord.snapshot().status(), FeedStatus::Idle);
    }

    #[tokio::test]
    async fn test_dropped_load_clears_in_flight() {
        let coord = coordinator();
        {
            let fut = Box::pin(coord.load_page(None, LoadMode::Paginate));
            // Poll once so the key is registered, then drop.
            let mut fut = fut;
            let waker = std::task::Waker::noop();
            let mut cx = std::task::Context::from_waker(waker);
            assert!(fut.as_mut().poll(&mut cx).is_pending());
            assert!(coord.is_in_flight(None));
        }
        assert!(!coord.is_in_flight(None));
    }

    #[tokio::test]
    async fn test_optimistic_delete_markers() {
        let coord = coordinator();
        coord.load_page(None, LoadMode::Paginate).await.unwrap();

        assert!(coord.begin_delete(OrderId::new(2)));
        assert!(!coord.begin_delete(OrderId::new(2)));
        let snapshot = coord.snapshot();
        assert_eq!(ids(&snapshot), vec![1, 3]);
        assert!(snapshot.is_pending_delete(OrderId::new(2)));

        coord.confirm_delete(OrderId::new(2));
        assert!(!coord.snapshot().is_pending_delete(OrderId::new(2)));
        // The first page held order 2, so it is no longer served from cache.
        assert!(!coord.is_cached(None));
    }

    #[tokio::test]
    async fn test_pending_delete_is_filtered_from_reload() {
        let coord = coordinator();
        coord.load_page(None, LoadMode::Paginate).await.unwrap();
        coord.begin_delete(OrderId::new(1));

        coord.load_page(None, LoadMode::Reset).await.unwrap();
        assert_eq!(ids(&coord.snapshot()), vec![2, 3]);

        coord.abandon_delete(OrderId::new(1));
        coord.load_page(None, LoadMode::Reset).await.unwrap();
        assert_eq!(ids(&coord.snapshot()), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_custom_cache_capacity_is_respected() {
        let coord = FetchCoordinator::with_cache(
            TwoPages::default(),
            20,
            Box::new(BoundedPageCache::new(1, EvictionPolicy::Fifo)),
        );
        coord.load_page(None, LoadMode::Paginate).await.unwrap();
        coord
            .load_page(Some(Cursor::from("3")), LoadMode::Paginate)
            .await
            .unwrap();
        assert_eq!(coord.cached_pages(), 1);
        assert!(!coord.is_cached(None));
    }

    #[tokio::test]
    async fn test_pagination_state_tracks_next_page() {
        let coord = coordinator();
        assert_eq!(coord.pagination(), PaginationState::default());

        coord.load_page(None, LoadMode::Paginate).await.unwrap();
        let state = coord.pagination();
        assert!(state.has_more);
        assert!(!state.is_loading);
        assert_eq!(state.next_cursor, Some(Cursor::from("3")));
        assert!(!state.next_cached);
        assert!(!state.next_in_flight);
    }
}
