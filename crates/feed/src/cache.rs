//! Bounded page cache.
//!
//! Pages are keyed by the cursor that requested them. The cache holds a fixed
//! number of pages; when a new page would exceed capacity, exactly one entry is
//! evicted first. Which one is an explicit [`EvictionPolicy`]:
//!
//! | Policy | Evicts                  | `get` refreshes entry |
//! |--------|-------------------------|-----------------------|
//! | FIFO   | oldest inserted         | no                    |
//! | LRU    | least recently used     | yes                   |
//!
//! FIFO is the default. Under FIFO, callers must not assume that reading a
//! page keeps it alive.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use purchase_feed_core::{Cursor, Page};
use tracing::trace;

/// Cache key derived from a request cursor.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    /// The first page (null cursor).
    Initial,
    /// The page requested with this cursor.
    After(Cursor),
}

impl CacheKey {
    /// Derive the key for a request cursor.
    #[must_use]
    pub fn from_cursor(cursor: Option<&Cursor>) -> Self {
        cursor.map_or(Self::Initial, |c| Self::After(c.clone()))
    }

    /// The cursor this key was derived from.
    #[must_use]
    pub const fn cursor(&self) -> Option<&Cursor> {
        match self {
            Self::Initial => None,
            Self::After(cursor) => Some(cursor),
        }
    }

    #[must_use]
    pub const fn is_initial(&self) -> bool {
        matches!(self, Self::Initial)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initial => f.write_str("initial"),
            Self::After(cursor) => write!(f, "after:{cursor}"),
        }
    }
}

/// Which entry to drop when the cache is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EvictionPolicy {
    /// Drop the oldest-inserted entry.
    #[default]
    Fifo,
    /// Drop the least recently read or written entry.
    Lru,
}

impl FromStr for EvictionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fifo" => Ok(Self::Fifo),
            "lru" => Ok(Self::Lru),
            other => Err(format!("unknown eviction policy '{other}' (expected fifo or lru)")),
        }
    }
}

/// Store of fetched pages.
///
/// `get` never fails; a missing key is `None`. `clear` empties the store in a
/// single step.
pub trait PageCache: Send {
    /// Store or overwrite a page, evicting one entry first if the store is
    /// full. Returns the evicted key.
    fn put(&mut self, key: CacheKey, page: Page) -> Option<CacheKey>;

    /// Look up a page. May update recency, depending on policy.
    fn get(&mut self, key: &CacheKey) -> Option<&Page>;

    /// Pure membership test.
    fn has(&self, key: &CacheKey) -> bool;

    /// Time since the page at `key` was stored. Does not touch recency.
    fn age(&self, key: &CacheKey) -> Option<Duration>;

    /// Keep only the entries for which `keep` returns true.
    fn retain(&mut self, keep: &mut dyn FnMut(&CacheKey, &Page) -> bool);

    /// Drop every entry.
    fn clear(&mut self);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn capacity(&self) -> usize;

    fn policy(&self) -> EvictionPolicy;
}

/// A cached page plus the time it was stored.
#[derive(Debug, Clone)]
struct CacheEntry {
    page: Page,
    fetched_at: Instant,
}

/// `HashMap` + order queue implementation of [`PageCache`].
///
/// The queue front is always the next eviction candidate.
#[derive(Debug)]
pub struct BoundedPageCache {
    entries: HashMap<CacheKey, CacheEntry>,
    order: VecDeque<CacheKey>,
    capacity: usize,
    policy: EvictionPolicy,
}

impl BoundedPageCache {
    /// Create an empty cache.
    ///
    /// A zero capacity is clamped to one. `FeedConfig::validate` rejects zero
    /// before a configured cache gets here.
    #[must_use]
    pub fn new(capacity: usize, policy: EvictionPolicy) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: HashMap::with_capacity(capacity.min(1024)),
            order: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
            policy,
        }
    }

    fn touch(&mut self, key: &CacheKey) {
        if let Some(pos) = self.order.iter().position(|k| k == key)
            && let Some(k) = self.order.remove(pos)
        {
            self.order.push_back(k);
        }
    }
}

impl PageCache for BoundedPageCache {
    fn put(&mut self, key: CacheKey, page: Page) -> Option<CacheKey> {
        let entry = CacheEntry {
            page,
            fetched_at: Instant::now(),
        };

        if let Some(existing) = self.entries.get_mut(&key) {
            *existing = entry;
            if self.policy == EvictionPolicy::Lru {
                self.touch(&key);
            }
            return None;
        }

        let evicted = if self.entries.len() >= self.capacity {
            self.order.pop_front().inspect(|old| {
                self.entries.remove(old);
                trace!(key = %old, "Evicted cached page");
            })
        } else {
            None
        };

        self.order.push_back(key.clone());
        self.entries.insert(key, entry);
        evicted
    }

    fn get(&mut self, key: &CacheKey) -> Option<&Page> {
        if self.policy == EvictionPolicy::Lru && self.entries.contains_key(key) {
            self.touch(key);
        }
        self.entries.get(key).map(|entry| &entry.page)
    }

    fn has(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }

    fn age(&self, key: &CacheKey) -> Option<Duration> {
        self.entries.get(key).map(|entry| entry.fetched_at.elapsed())
    }

    fn retain(&mut self, keep: &mut dyn FnMut(&CacheKey, &Page) -> bool) {
        self.entries.retain(|key, entry| keep(key, &entry.page));
        let entries = &self.entries;
        self.order.retain(|key| entries.contains_key(key));
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn policy(&self) -> EvictionPolicy {
        self.policy
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn key(n: usize) -> CacheKey {
        CacheKey::After(Cursor::new(n.to_string()))
    }

    fn page(n: usize) -> Page {
        Page::empty(Some(Cursor::new(n.to_string())))
    }

    #[test]
    fn test_fifo_eviction_drops_oldest_inserted() {
        let capacity = 10;
        let extra = 3;
        let mut cache = BoundedPageCache::new(capacity, EvictionPolicy::Fifo);

        for n in 0..capacity + extra {
            cache.put(key(n), page(n));
        }

        assert_eq!(cache.len(), capacity);
        for n in 0..extra {
            assert!(!cache.has(&key(n)), "key {n} should have been evicted");
        }
        for n in extra..capacity + extra {
            assert!(cache.has(&key(n)));
        }
    }

    #[test]
    fn test_fifo_get_does_not_refresh() {
        let mut cache = BoundedPageCache::new(2, EvictionPolicy::Fifo);
        cache.put(key(1), page(1));
        cache.put(key(2), page(2));
        assert!(cache.get(&key(1)).is_some());

        let evicted = cache.put(key(3), page(3));
        assert_eq!(evicted, Some(key(1)));
        assert!(!cache.has(&key(1)));
    }

    #[test]
    fn test_lru_get_refreshes_recency() {
        let mut cache = BoundedPageCache::new(2, EvictionPolicy::Lru);
        cache.put(key(1), page(1));
        cache.put(key(2), page(2));
        assert!(cache.get(&key(1)).is_some());

        let evicted = cache.put(key(3), page(3));
        assert_eq!(evicted, Some(key(2)));
        assert!(cache.has(&key(1)));
    }

    #[test]
    fn test_overwrite_keeps_fifo_position() {
        let mut cache = BoundedPageCache::new(2, EvictionPolicy::Fifo);
        cache.put(key(1), page(1));
        cache.put(key(2), page(2));
        assert_eq!(cache.put(key(1), page(1)), None);
        assert_eq!(cache.len(), 2);

        assert_eq!(cache.put(key(3), page(3)), Some(key(1)));
    }

    #[test]
    fn test_get_missing_is_none() {
        let mut cache = BoundedPageCache::new(4, EvictionPolicy::Fifo);
        assert!(cache.get(&CacheKey::Initial).is_none());
        assert!(!cache.has(&CacheKey::Initial));
    }

    #[test]
    fn test_clear_empties_store() {
        let mut cache = BoundedPageCache::new(2, EvictionPolicy::Fifo);
        cache.put(CacheKey::Initial, Page::empty(None));
        cache.put(key(1), page(1));
        assert!(cache.age(&key(1)).is_some());

        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.age(&key(1)).is_none());

        // Order queue was cleared too: two fresh puts fit without eviction.
        assert_eq!(cache.put(key(2), page(2)), None);
        assert_eq!(cache.put(key(3), page(3)), None);
    }

    #[test]
    fn test_zero_capacity_is_clamped_to_one() {
        let mut cache = BoundedPageCache::new(0, EvictionPolicy::Lru);
        assert_eq!(cache.capacity(), 1);
        assert_eq!(cache.put(key(1), page(1)), None);
        assert_eq!(cache.put(key(2), page(2)), Some(key(1)));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_retain_keeps_order_in_sync() {
        let mut cache = BoundedPageCache::new(4, EvictionPolicy::Fifo);
        for n in 0..4 {
            cache.put(key(n), page(n));
        }
        cache.retain(&mut |k, _| k != &key(1));
        assert_eq!(cache.len(), 3);

        // Room for one more without evicting.
        assert_eq!(cache.put(key(9), page(9)), None);
        assert_eq!(cache.put(key(10), page(10)), Some(key(0)));
    }

    #[test]
    fn test_cache_key_from_cursor() {
        assert_eq!(CacheKey::from_cursor(None), CacheKey::Initial);
        let cursor = Cursor::from("c1");
        let key = CacheKey::from_cursor(Some(&cursor));
        assert_eq!(key.cursor(), Some(&cursor));
        assert_eq!(key.to_string(), "after:c1");
    }

    #[test]
    fn test_eviction_policy_parse() {
        assert_eq!("FIFO".parse::<EvictionPolicy>().unwrap(), EvictionPolicy::Fifo);
        assert_eq!("lru".parse::<EvictionPolicy>().unwrap(), EvictionPolicy::Lru);
        assert!("random".parse::<EvictionPolicy>().is_err());
    }
}
