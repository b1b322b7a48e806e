//! Integration tests for the purchase-order feed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p purchase-feed-integration-tests
//! ```
//!
//! Nothing external is needed: the HTTP tests start an in-process mock API on
//! an ephemeral port.
//!
//! # Test Doubles
//!
//! - [`MemorySource`] - In-memory `DataSource` with the reference backend's
//!   paging rules, per-cursor fetch gates and failure switches
//! - [`MockApi`] - `axum` server exposing a `MemorySource` over HTTP
//!
//! # Test Categories
//!
//! - `pagination` - Deduplication, reset ordering, end-to-end scrolling
//! - `mutations` - Create and optimistic delete against the feed
//! - `http_source` - `HttpSource` against the mock API

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod memory;
pub mod mock_api;

pub use memory::{CursorStyle, MemorySource, sample_draft, sample_order};
pub use mock_api::{ForcedFailure, MockApi};
