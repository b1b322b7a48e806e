//! Throttled scroll event loop.
//!
//! Scroll signals arrive on an unbounded queue as [`ScrollEvent`]s. The driver
//! coalesces them into fixed windows, evaluates the [`ScrollPolicy`] once per
//! window against the latest telemetry, and asks the coordinator for the next
//! page when a rule fires.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, warn};

use super::{ScrollPolicy, ScrollTelemetry};
use crate::api::DataSource;
use crate::coordinator::{FetchCoordinator, LoadMode, LoadOutcome};

/// Fixed-window coalescing of scroll telemetry.
///
/// The first observation opens a window; every later observation inside it
/// overwrites the pending one. When the window closes, only the last one is
/// handed out.
#[derive(Debug, Clone)]
pub struct ScrollThrottle {
    window: Duration,
    pending: Option<ScrollTelemetry>,
    deadline: Option<Instant>,
}

impl ScrollThrottle {
    #[must_use]
    pub const fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
            deadline: None,
        }
    }

    #[must_use]
    pub const fn window(&self) -> Duration {
        self.window
    }

    /// Record an observation. Returns the deadline of the open window.
    pub fn push(&mut self, telemetry: ScrollTelemetry, now: Instant) -> Instant {
        self.pending = Some(telemetry);
        *self.deadline.get_or_insert(now + self.window)
    }

    /// When the open window closes, if one is open.
    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Take the coalesced observation once its window has closed.
    pub fn take_due(&mut self, now: Instant) -> Option<ScrollTelemetry> {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                self.pending.take()
            }
            _ => None,
        }
    }
}

/// Message for the scroll driver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScrollEvent {
    Scrolled(ScrollTelemetry),
    Shutdown,
}

/// Sending half of a driver's queue.
#[derive(Debug, Clone)]
pub struct ScrollHandle {
    tx: mpsc::UnboundedSender<ScrollEvent>,
}

impl ScrollHandle {
    /// Report a scroll position. Returns `false` once the driver has stopped.
    pub fn scrolled(&self, telemetry: ScrollTelemetry) -> bool {
        self.tx.send(ScrollEvent::Scrolled(telemetry)).is_ok()
    }

    /// Ask the driver to stop. A window still open is dropped.
    pub fn shutdown(&self) {
        let _ = self.tx.send(ScrollEvent::Shutdown);
    }
}

/// Consumes scroll events and turns them into page loads.
pub struct ScrollDriver<S> {
    coordinator: FetchCoordinator<S>,
    policy: ScrollPolicy,
    throttle: ScrollThrottle,
    events: mpsc::UnboundedReceiver<ScrollEvent>,
}

impl<S: DataSource> ScrollDriver<S> {
    /// Create a driver and the handle that feeds it.
    #[must_use]
    pub fn new(
        coordinator: FetchCoordinator<S>,
        policy: ScrollPolicy,
        window: Duration,
    ) -> (Self, ScrollHandle) {
        let (tx, events) = mpsc::unbounded_channel();
        let driver = Self {
            coordinator,
            policy,
            throttle: ScrollThrottle::new(window),
            events,
        };
        (driver, ScrollHandle { tx })
    }

    /// Run until [`ScrollEvent::Shutdown`] or until every handle is dropped.
    ///
    /// Returns the number of page loads that reached the data source.
    pub async fn run(mut self) -> usize {
        let mut fetched = 0;
        loop {
            let deadline = self.throttle.deadline();
            tokio::select! {
                event = self.events.recv() => match event {
                    Some(ScrollEvent::Scrolled(telemetry)) => {
                        self.throttle.push(telemetry, Instant::now());
                    }
                    Some(ScrollEvent::Shutdown) | None => break,
                },
                () = window_closed(deadline) => {
                    if let Some(telemetry) = self.throttle.take_due(Instant::now())
                        && self.evaluate(&telemetry).await
                    {
                        fetched += 1;
                    }
                }
            }
        }
        debug!(fetched, "Scroll driver stopped");
        fetched
    }

    async fn evaluate(&self, telemetry: &ScrollTelemetry) -> bool {
        let pagination = self.coordinator.pagination();
        let Some(trigger) = self.policy.evaluate(telemetry, &pagination) else {
            return false;
        };
        debug!(cursor = %trigger.cursor, reason = ?trigger.reason, "Scroll triggered page load");

        match self
            .coordinator
            .load_page(Some(trigger.cursor), LoadMode::Paginate)
            .await
        {
            Ok(LoadOutcome::Fetched(_) | LoadOutcome::Stale) => true,
            Ok(LoadOutcome::Cached(_) | LoadOutcome::Deduplicated) => false,
            Err(e) => {
                // Already recorded in the snapshot; the next scroll retries.
                warn!(error = %e, "Scroll-triggered load failed");
                false
            }
        }
    }
}

async fn window_closed(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
