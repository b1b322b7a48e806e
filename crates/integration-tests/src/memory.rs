//! In-memory purchase-order store.
//!
//! Pages the same way the reference backend does: orders ascending by id,
//! `id > cursor`, `limit + 1` rows read to decide `has_more`, and the last
//! returned id as the next cursor.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::ops::Bound;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{Days, NaiveDate};
use purchase_feed::{ApiError, DataSource};
use purchase_feed_core::{Cursor, NewPurchaseOrder, OrderId, Page, PurchaseOrder};
use rust_decimal::Decimal;
use tokio::sync::Notify;
use tracing::debug;

/// How next-page cursors are spelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorStyle {
    /// The last id on the page, as the reference backend does.
    #[default]
    LastId,
    /// Opaque tokens `c1`, `c2`, ... in issue order.
    Token,
}

/// In-memory [`DataSource`] with fetch gates and failure switches.
///
/// Cheaply cloneable; clones share the store, so a test can keep one handle
/// while a session owns another.
#[derive(Clone, Default)]
pub struct MemorySource {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    orders: Mutex<BTreeMap<i32, PurchaseOrder>>,
    last_id: AtomicI32,
    style: CursorStyle,
    tokens: Mutex<Vec<i32>>,
    fetches: AtomicUsize,
    fetch_log: Mutex<Vec<Option<Cursor>>>,
    gates: Mutex<HashMap<Option<String>, Arc<Notify>>>,
    fail_fetches: AtomicBool,
    fail_creates: AtomicBool,
    fail_deletes: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Deterministic sample order for `id`.
#[must_use]
pub fn sample_order(id: i32) -> PurchaseOrder {
    sample_draft(id).into_order(OrderId::new(id))
}

/// Deterministic sample draft; `n` varies the fields.
#[must_use]
pub fn sample_draft(n: i32) -> NewPurchaseOrder {
    let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default();
    let offset = u64::from(n.unsigned_abs() % 300);
    let order_date = base.checked_add_days(Days::new(offset)).unwrap_or(base);
    let delivery_date = order_date
        .checked_add_days(Days::new(7))
        .unwrap_or(order_date);

    NewPurchaseOrder {
        item_name: format!("Item {n:03}"),
        order_date,
        delivery_date,
        quantity: n.unsigned_abs() % 9 + 1,
        unit_price: Decimal::new(i64::from(100 + n.unsigned_abs() % 50 * 5), 2),
    }
}

impl MemorySource {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store holding orders `1..=count`.
    #[must_use]
    pub fn seeded(count: i32) -> Self {
        Self::seeded_with(count, CursorStyle::LastId)
    }

    /// A store holding orders `1..=count` with the given cursor spelling.
    #[must_use]
    pub fn seeded_with(count: i32, style: CursorStyle) -> Self {
        let orders = (1..=count).map(|id| (id, sample_order(id))).collect();
        Self {
            inner: Arc::new(MemoryInner {
                orders: Mutex::new(orders),
                last_id: AtomicI32::new(count.max(0)),
                style,
                ..MemoryInner::default()
            }),
        }
    }

    /// Number of stored orders.
    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.inner.orders).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stored ids, ascending.
    #[must_use]
    pub fn ids(&self) -> Vec<i32> {
        lock(&self.inner.orders).keys().copied().collect()
    }

    /// Number of `fetch_page` calls received, held ones included.
    #[must_use]
    pub fn fetches(&self) -> usize {
        self.inner.fetches.load(Ordering::SeqCst)
    }

    /// Cursors of every `fetch_page` call, in arrival order.
    #[must_use]
    pub fn fetch_log(&self) -> Vec<Option<Cursor>> {
        lock(&self.inner.fetch_log).clone()
    }

    /// Yield until at least `count` fetches have arrived.
    pub async fn wait_for_fetches(&self, count: usize) {
        while self.fetches() < count {
            tokio::task::yield_now().await;
        }
    }

    /// Hold fetches for `cursor` (`None` = first page) until [`release`](Self::release).
    pub fn hold(&self, cursor: Option<&str>) {
        lock(&self.inner.gates)
            .entry(cursor.map(str::to_string))
            .or_insert_with(|| Arc::new(Notify::new()));
    }

    /// Let one held fetch for `cursor` continue and stop holding new ones.
    pub fn release(&self, cursor: Option<&str>) {
        if let Some(gate) = lock(&self.inner.gates).remove(&cursor.map(str::to_string)) {
            gate.notify_one();
        }
    }

    pub fn fail_fetches(&self, fail: bool) {
        self.inner.fail_fetches.store(fail, Ordering::SeqCst);
    }

    pub fn fail_creates(&self, fail: bool) {
        self.inner.fail_creates.store(fail, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.inner.fail_deletes.store(fail, Ordering::SeqCst);
    }

    /// Store a draft directly, bypassing failure switches.
    pub fn insert(&self, draft: NewPurchaseOrder) -> PurchaseOrder {
        let id = self.inner.last_id.fetch_add(1, Ordering::SeqCst) + 1;
        let order = draft.into_order(OrderId::new(id));
        lock(&self.inner.orders).insert(id, order.clone());
        order
    }

    fn encode(&self, last_id: i32) -> Cursor {
        match self.inner.style {
            CursorStyle::LastId => Cursor::new(last_id.to_string()),
            CursorStyle::Token => {
                let mut tokens = lock(&self.inner.tokens);
                tokens.push(last_id);
                Cursor::new(format!("c{}", tokens.len()))
            }
        }
    }

    fn decode(&self, cursor: &Cursor) -> Result<i32, ApiError> {
        let invalid = || ApiError::Status {
            status: 422,
            body: format!("invalid cursor '{cursor}'"),
        };
        match self.inner.style {
            CursorStyle::LastId => cursor.as_str().parse().map_err(|_| invalid()),
            CursorStyle::Token => {
                let index: usize = cursor
                    .as_str()
                    .strip_prefix('c')
                    .and_then(|n| n.parse().ok())
                    .ok_or_else(invalid)?;
                let tokens = lock(&self.inner.tokens);
                index
                    .checked_sub(1)
                    .and_then(|i| tokens.get(i).copied())
                    .ok_or_else(invalid)
            }
        }
    }

    /// Read one page the way the reference backend does.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Status` (422) for a cursor this store never issued.
    pub fn page(&self, cursor: Option<Cursor>, limit: u32) -> Result<Page, ApiError> {
        let lower = match cursor.as_ref() {
            Some(c) => Bound::Excluded(self.decode(c)?),
            None => Bound::Unbounded,
        };
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);

        let mut items: Vec<PurchaseOrder> = lock(&self.inner.orders)
            .range((lower, Bound::Unbounded))
            .map(|(_, order)| order.clone())
            .take(limit.saturating_add(1))
            .collect();

        let has_more = items.len() > limit;
        items.truncate(limit);
        let next_cursor = if has_more {
            items.last().map(|order| self.encode(order.id.as_i32()))
        } else {
            None
        };

        Ok(Page {
            cursor,
            items,
            next_cursor,
            has_more,
        })
    }
}

impl DataSource for MemorySource {
    fn fetch_page(
        &self,
        cursor: Option<&Cursor>,
        limit: u32,
    ) -> impl Future<Output = Result<Page, ApiError>> + Send {
        let cursor = cursor.cloned();
        async move {
            self.inner.fetches.fetch_add(1, Ordering::SeqCst);
            lock(&self.inner.fetch_log).push(cursor.clone());

            let key = cursor.as_ref().map(|c| c.as_str().to_string());
            let gate = lock(&self.inner.gates).get(&key).cloned();
            if let Some(gate) = gate {
                debug!(cursor = ?key, "Holding fetch");
                gate.notified().await;
            }

            if self.inner.fail_fetches.load(Ordering::SeqCst) {
                return Err(ApiError::Unavailable("injected fetch failure".to_string()));
            }
            self.page(cursor, limit)
        }
    }

    async fn fetch_order(&self, id: OrderId) -> Result<PurchaseOrder, ApiError> {
        lock(&self.inner.orders)
            .get(&id.as_i32())
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("purchase order {id}")))
    }

    async fn create_order(&self, draft: &NewPurchaseOrder) -> Result<PurchaseOrder, ApiError> {
        if self.inner.fail_creates.load(Ordering::SeqCst) {
            return Err(ApiError::Unavailable("injected create failure".to_string()));
        }
        Ok(self.insert(draft.clone()))
    }

    async fn delete_order(&self, id: OrderId) -> Result<(), ApiError> {
        // Let a caller observe the optimistic state before the answer lands.
        tokio::task::yield_now().await;
        if self.inner.fail_deletes.load(Ordering::SeqCst) {
            return Err(ApiError::Status {
                status: 500,
                body: "injected delete failure".to_string(),
            });
        }
        lock(&self.inner.orders)
            .remove(&id.as_i32())
            .map(|_| ())
            .ok_or_else(|| ApiError::NotFound(format!("purchase order {id}")))
    }
}
