//! Visible-window calculation for fixed-extent rows.
//!
//! Only the rows inside the viewport (plus a buffer) are rendered. The full
//! list is represented by a spacer of `total_extent`, and the rendered rows are
//! translated by `render_offset` so they line up with their true position.
//!
//! ```text
//!   0 ┌──────────────┐
//!     │   spacer     │
//!     │              │ render_offset = start_index × item_extent
//!     ├──────────────┤ ← start_index
//!     │ rendered     │
//!     │ rows         │ ← viewport somewhere in here
//!     ├──────────────┤ ← end_index (inclusive)
//!     │   spacer     │
//!     └──────────────┘ total_extent = total_item_count × item_extent
//! ```

use std::ops::Range;

use crate::config::ViewportConfig;

/// Rows to render for one scroll position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibleWindow {
    /// First rendered index.
    pub start_index: usize,
    /// Last rendered index, inclusive.
    pub end_index: usize,
    /// Extent of the whole list.
    pub total_extent: f64,
    /// Translation of the first rendered row.
    pub render_offset: f64,
    /// Number of items the window covers; zero when nothing can be rendered.
    pub total_item_count: usize,
}

impl VisibleWindow {
    const fn empty() -> Self {
        Self {
            start_index: 0,
            end_index: 0,
            total_extent: 0.0,
            render_offset: 0.0,
            total_item_count: 0,
        }
    }

    /// Indices to render; empty when there are no items.
    #[must_use]
    pub const fn indices(&self) -> Range<usize> {
        if self.total_item_count == 0 {
            0..0
        } else {
            self.start_index..self.end_index + 1
        }
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        let range = self.indices();
        range.end - range.start
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.total_item_count == 0
    }
}

/// Compute the visible window.
///
/// Pure and idempotent: the same inputs always produce the same window.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn visible_window(
    scroll_offset: f64,
    item_extent: f64,
    viewport_extent: f64,
    buffer_count: usize,
    total_item_count: usize,
) -> VisibleWindow {
    if total_item_count == 0 || !(item_extent.is_finite() && item_extent > 0.0) {
        return VisibleWindow::empty();
    }

    let scroll_offset = if scroll_offset.is_finite() {
        scroll_offset.max(0.0)
    } else {
        0.0
    };
    let viewport_extent = if viewport_extent.is_finite() {
        viewport_extent.max(0.0)
    } else {
        0.0
    };

    // Float-to-usize casts saturate, so huge offsets cannot wrap.
    let items_per_viewport = (viewport_extent / item_extent).ceil() as usize;
    let raw_start = (scroll_offset / item_extent).floor() as usize;
    let last = total_item_count - 1;

    let start_index = raw_start.saturating_sub(buffer_count).min(last);
    let end_index = raw_start
        .saturating_add(items_per_viewport)
        .saturating_add(buffer_count.saturating_mul(2))
        .saturating_sub(1)
        .min(last)
        .max(start_index);

    VisibleWindow {
        start_index,
        end_index,
        total_extent: total_item_count as f64 * item_extent,
        render_offset: start_index as f64 * item_extent,
        total_item_count,
    }
}

/// Row metrics plus a memo of the last computed window.
#[derive(Debug, Clone)]
pub struct Virtualizer {
    item_extent: f64,
    buffer_count: usize,
    last: Option<(WindowInput, VisibleWindow)>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct WindowInput {
    scroll_offset: f64,
    viewport_extent: f64,
    total_item_count: usize,
}

impl Virtualizer {
    #[must_use]
    pub const fn new(item_extent: f64, buffer_count: usize) -> Self {
        Self {
            item_extent,
            buffer_count,
            last: None,
        }
    }

    #[must_use]
    pub const fn from_config(config: &ViewportConfig) -> Self {
        Self::new(config.item_extent, config.buffer_count)
    }

    #[must_use]
    pub const fn item_extent(&self) -> f64 {
        self.item_extent
    }

    #[must_use]
    pub const fn buffer_count(&self) -> usize {
        self.buffer_count
    }

    /// Window for the given scroll position and item count.
    ///
    /// Recomputes only when one of the inputs changed.
    pub fn window(
        &mut self,
        scroll_offset: f64,
        viewport_extent: f64,
        total_item_count: usize,
    ) -> VisibleWindow {
        let input = WindowInput {
            scroll_offset,
            viewport_extent,
            total_item_count,
        };
        if let Some((previous, window)) = self.last
            && previous == input
        {
            return window;
        }

        let window = visible_window(
            scroll_offset,
            self.item_extent,
            viewport_extent,
            self.buffer_count,
            total_item_count,
        );
        self.last = Some((input, window));
        window
    }
}
