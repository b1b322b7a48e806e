//! Core types for the purchase-order feed.
//!
//! This module provides type-safe wrappers for the records exchanged with the
//! purchase-order API and the pages they arrive in.

pub mod id;
pub mod order;
pub mod page;

pub use id::*;
pub use order::{NewPurchaseOrder, PurchaseOrder};
pub use page::{Cursor, Page, PageResponse};
