//! Scroll-driven pagination triggers.
//!
//! Two independent rules can ask for the next page:
//!
//! - **Prefetch**: the viewport's bottom edge has passed `prefetch_threshold`
//!   of the content, and the next page is neither cached nor in flight.
//! - **Near end**: the remaining content below the viewport is shorter than
//!   the trigger distance.
//!
//! Prefetch is evaluated first; when it fires, the near-end rule is skipped
//! for that event. Anything that still slips through is absorbed by the
//! coordinator's per-key deduplication.

mod driver;

use std::fmt;
use std::str::FromStr;

use purchase_feed_core::Cursor;

use crate::config::{ConfigError, ScrollConfig};
use crate::coordinator::PaginationState;

pub use driver::{ScrollDriver, ScrollEvent, ScrollHandle, ScrollThrottle};

const ADAPTIVE_RATIO: f64 = 0.5;
const ADAPTIVE_FLOOR: f64 = 200.0;

/// One scroll observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollTelemetry {
    /// Distance scrolled from the top.
    pub offset: f64,
    /// Visible extent.
    pub viewport_extent: f64,
    /// Extent of all loaded content.
    pub content_extent: f64,
}

impl ScrollTelemetry {
    #[must_use]
    pub const fn new(offset: f64, viewport_extent: f64, content_extent: f64) -> Self {
        Self {
            offset,
            viewport_extent,
            content_extent,
        }
    }

    /// Position of the viewport's far edge.
    #[must_use]
    pub fn viewport_end(&self) -> f64 {
        self.offset + self.viewport_extent
    }

    /// Fraction of content above the viewport's far edge, if there is content.
    #[must_use]
    pub fn scrolled_fraction(&self) -> Option<f64> {
        (self.content_extent > 0.0).then(|| self.viewport_end() / self.content_extent)
    }

    /// Content remaining below the viewport.
    #[must_use]
    pub fn remaining(&self) -> f64 {
        self.content_extent - self.viewport_end()
    }
}

/// How close to the end the near-end rule fires.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TriggerDistance {
    /// A constant distance.
    Fixed(f64),
    /// `max(floor, viewport_extent × ratio)`.
    Adaptive { ratio: f64, floor: f64 },
}

impl Default for TriggerDistance {
    fn default() -> Self {
        Self::Adaptive {
            ratio: ADAPTIVE_RATIO,
            floor: ADAPTIVE_FLOOR,
        }
    }
}

impl TriggerDistance {
    /// Resolve the distance for a viewport.
    #[must_use]
    pub fn resolve(&self, viewport_extent: f64) -> f64 {
        match *self {
            Self::Fixed(distance) => distance,
            Self::Adaptive { ratio, floor } => (viewport_extent * ratio).max(floor),
        }
    }

    /// A distance of zero would let the rule fire on every frame.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` for non-positive or non-finite values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ok = match *self {
            Self::Fixed(distance) => distance.is_finite() && distance > 0.0,
            Self::Adaptive { ratio, floor } => {
                ratio.is_finite() && ratio >= 0.0 && floor.is_finite() && floor > 0.0
            }
        };
        if ok {
            Ok(())
        } else {
            Err(ConfigError::Invalid(
                "scroll.trigger_distance".to_string(),
                format!("must be positive (got {self})"),
            ))
        }
    }
}

impl fmt::Display for TriggerDistance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(distance) => write!(f, "{distance}"),
            Self::Adaptive { ratio, floor } => write!(f, "adaptive({ratio}, floor {floor})"),
        }
    }
}

impl FromStr for TriggerDistance {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("adaptive") {
            return Ok(Self::default());
        }
        s.parse::<f64>()
            .map(Self::Fixed)
            .map_err(|_| format!("expected 'adaptive' or a number, got '{s}'"))
    }
}

/// Which rule fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    Prefetch,
    NearEnd,
}

/// Request for the page after `cursor`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrollTrigger {
    pub cursor: Cursor,
    pub reason: TriggerReason,
}

/// Decides when scrolling should load the next page.
#[derive(Debug, Clone, Copy)]
pub struct ScrollPolicy {
    prefetch_threshold: f64,
    trigger_distance: TriggerDistance,
}

impl Default for ScrollPolicy {
    fn default() -> Self {
        Self {
            prefetch_threshold: 0.8,
            trigger_distance: TriggerDistance::default(),
        }
    }
}

impl ScrollPolicy {
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the threshold is outside `(0, 1]` or
    /// the trigger distance is not positive.
    pub fn new(prefetch_threshold: f64, trigger_distance: TriggerDistance) -> Result<Self, ConfigError> {
        if !(prefetch_threshold > 0.0 && prefetch_threshold <= 1.0) {
            return Err(ConfigError::Invalid(
                "scroll.prefetch_threshold".to_string(),
                format!("must be in (0, 1] (got {prefetch_threshold})"),
            ));
        }
        trigger_distance.validate()?;
        Ok(Self {
            prefetch_threshold,
            trigger_distance,
        })
    }

    /// # Errors
    ///
    /// See [`ScrollPolicy::new`].
    pub fn from_config(config: &ScrollConfig) -> Result<Self, ConfigError> {
        Self::new(config.prefetch_threshold, config.trigger_distance)
    }

    /// Evaluate one (already coalesced) scroll observation.
    #[must_use]
    pub fn evaluate(
        &self,
        telemetry: &ScrollTelemetry,
        pagination: &PaginationState,
    ) -> Option<ScrollTrigger> {
        if !pagination.has_more || pagination.is_loading {
            return None;
        }
        let cursor = pagination.next_cursor.as_ref()?;

        let past_threshold = telemetry
            .scrolled_fraction()
            .is_some_and(|fraction| fraction >= self.prefetch_threshold);
        if past_threshold && !pagination.next_cached && !pagination.next_in_flight {
            return Some(ScrollTrigger {
                cursor: cursor.clone(),
                reason: TriggerReason::Prefetch,
            });
        }

        let distance = self.trigger_distance.resolve(telemetry.viewport_extent);
        if telemetry.remaining() < distance {
            return Some(ScrollTrigger {
                cursor: cursor.clone(),
                reason: TriggerReason::NearEnd,
            });
        }

        None
    }
}
