//! Purchase Feed - cursor-paginated, cached and virtualized order list.
//!
//! This crate keeps three views of a remote purchase-order collection
//! consistent with each other: what the user sees, what has been fetched and
//! what is in flight.
//!
//! # Architecture
//!
//! ```text
//! scroll ──▶ ScrollDriver ──▶ ScrollPolicy ──▶ FetchCoordinator ──▶ DataSource
//!                                                   │    ▲
//!                                                   ▼    │
//!                               Virtualizer ◀── FeedSnapshot    PageCache
//!                                                   ▲
//! create / delete ──▶ MutationController ───────────┘
//! ```
//!
//! - [`api`] - `DataSource` trait and the `reqwest` implementation
//! - [`cache`] - Bounded page cache with FIFO or LRU eviction
//! - [`coordinator`] - Deduplicated page loads and the published item list
//! - [`virtualizer`] - Visible-window arithmetic
//! - [`scroll`] - Pagination triggers and the throttled scroll loop
//! - [`mutation`] - Create and optimistic delete
//! - [`session`] - Everything above, bundled per feed

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cache;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod mutation;
pub mod scroll;
pub mod session;
pub mod virtualizer;

pub use api::{ApiError, DataSource, HttpSource};
pub use cache::{BoundedPageCache, CacheKey, EvictionPolicy, PageCache};
pub use config::{ConfigError, FeedConfig};
pub use coordinator::{
    FeedSnapshot, FeedStatus, FetchCoordinator, LoadMode, LoadOutcome, PaginationState,
};
pub use error::FeedError;
pub use mutation::{DeleteOutcome, MutationController};
pub use scroll::{
    ScrollDriver, ScrollEvent, ScrollHandle, ScrollPolicy, ScrollTelemetry, ScrollThrottle,
    ScrollTrigger, TriggerDistance, TriggerReason,
};
pub use session::FeedSession;
pub use virtualizer::{Virtualizer, VisibleWindow, visible_window};
