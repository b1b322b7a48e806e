//! Purchase Feed Core - Shared domain types.
//!
//! This crate provides the types used across all purchase-feed components:
//! - `purchase-feed` - Paging, caching, virtualization and mutation orchestration
//! - `purchase-feed-cli` - Command-line front end
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients, no runtime.
//! This keeps it lightweight and allows it to be used anywhere, including
//! by test doubles of the remote API.
//!
//! # Modules
//!
//! - [`types`] - Order records, order ids, cursors and pages

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
