//! Cursor pagination types.
//!
//! Pages are requested with an opaque cursor and answer with the cursor of the
//! next page, if any. The reference API emits cursors as the last-seen id (a
//! JSON integer), but clients must treat them as opaque tokens, so `Cursor`
//! accepts either a string or an integer on the wire.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use super::order::PurchaseOrder;

/// Opaque pagination token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    /// Create a cursor from its token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token as it should appear in a query string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Cursor {
    fn from(token: &str) -> Self {
        Self::new(token)
    }
}

impl From<String> for Cursor {
    fn from(token: String) -> Self {
        Self(token)
    }
}

impl<'de> Deserialize<'de> for Cursor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawCursor {
            Text(String),
            Signed(i64),
            Unsigned(u64),
        }

        Ok(match RawCursor::deserialize(deserializer)? {
            RawCursor::Text(s) => Self(s),
            RawCursor::Signed(n) => Self(n.to_string()),
            RawCursor::Unsigned(n) => Self(n.to_string()),
        })
    }
}

/// Wire shape of `GET /api/purchase-orders`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageResponse {
    pub data: Vec<PurchaseOrder>,
    #[serde(default)]
    pub next_cursor: Option<Cursor>,
    #[serde(default)]
    pub has_more: bool,
}

/// One page of orders, tagged with the cursor that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// Request cursor; `None` for the first page.
    pub cursor: Option<Cursor>,
    pub items: Vec<PurchaseOrder>,
    /// Cursor of the following page; `None` at the end of the collection.
    pub next_cursor: Option<Cursor>,
    pub has_more: bool,
}

impl Page {
    /// Attach the request cursor to a decoded response.
    #[must_use]
    pub fn from_response(cursor: Option<Cursor>, response: PageResponse) -> Self {
        Self {
            cursor,
            items: response.data,
            next_cursor: response.next_cursor,
            has_more: response.has_more,
        }
    }

    /// An empty final page.
    #[must_use]
    pub const fn empty(cursor: Option<Cursor>) -> Self {
        Self {
            cursor,
            items: Vec::new(),
            next_cursor: None,
            has_more: false,
        }
    }

    /// Whether this is the first page of the collection.
    #[must_use]
    pub const fn is_initial(&self) -> bool {
        self.cursor.is_none()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl From<Page> for PageResponse {
    fn from(page: Page) -> Self {
        Self {
            data: page.items,
            next_cursor: page.next_cursor,
            has_more: page.has_more,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_accepts_integer_and_string() {
        let numeric: Cursor = serde_json::from_str("20").unwrap();
        let text: Cursor = serde_json::from_str("\"c1\"").unwrap();
        assert_eq!(numeric.as_str(), "20");
        assert_eq!(text, Cursor::from("c1"));
    }

    #[test]
    fn test_page_response_end_of_collection() {
        let response: PageResponse =
            serde_json::from_str(r#"{"data": [], "next_cursor": null, "has_more": false}"#)
                .unwrap();
        let page = Page::from_response(None, response);
        assert!(page.is_initial());
        assert!(page.is_empty());
        assert_eq!(page.next_cursor, None);
        assert!(!page.has_more);
    }

    #[test]
    fn test_page_response_missing_optional_fields() {
        let response: PageResponse = serde_json::from_str(r#"{"data": []}"#).unwrap();
        assert_eq!(response.next_cursor, None);
        assert!(!response.has_more);
    }
}
