//! Scroll simulation.
//!
//! Loads the first page, then walks the scroll offset down in fixed steps.
//! Each step goes through the throttled scroll driver exactly as a UI would,
//! and the visible window plus any page loads it caused are printed.

use std::time::Duration;

use purchase_feed::{FeedSession, HttpSource};
use tracing::warn;

use super::{CliError, connect, format_row};

/// Extra time after the throttle window for the driver to pick up the event.
const SETTLE: Duration = Duration::from_millis(20);

/// Scroll from the top to `to` in steps of `step`.
pub async fn run(viewport: f64, to: f64, step: f64) -> Result<(), CliError> {
    for (name, value) in [("viewport", viewport), ("step", step)] {
        if !(value.is_finite() && value > 0.0) {
            return Err(CliError::InvalidArgument(
                name,
                format!("must be a positive number (got {value})"),
            ));
        }
    }
    if !(to.is_finite() && to >= 0.0) {
        return Err(CliError::InvalidArgument(
            "to",
            format!("must be a non-negative number (got {to})"),
        ));
    }

    let session = connect()?;
    session.load_initial().await?;

    let (driver, handle) = session.scroll_driver();
    let driver = tokio::spawn(driver.run());
    let throttle = session.config().scroll.throttle;
    let request_timeout = session.config().api.request_timeout;

    let mut offset = 0.0_f64;
    let mut loaded = session.snapshot().len();
    print_window(&session, offset, viewport);

    while offset < to {
        offset = (offset + step).min(to);
        handle.scrolled(session.telemetry(offset, viewport));

        tokio::time::sleep(throttle + SETTLE).await;
        let mut updates = session.subscribe();
        if tokio::time::timeout(request_timeout, updates.wait_for(|s| !s.is_loading()))
            .await
            .is_err()
        {
            warn!(offset, "Timed out waiting for page load");
        }

        let snapshot = session.snapshot();
        if snapshot.len() > loaded {
            println!(
                "   loaded {} more orders (total {}, has_more: {})",
                snapshot.len() - loaded,
                snapshot.len(),
                snapshot.has_more
            );
            loaded = snapshot.len();
        }
        if let Some(err) = &snapshot.error {
            println!("   error: {err}");
            session.dismiss_error();
        }
        print_window(&session, offset, viewport);
    }

    handle.shutdown();
    let fetched = driver.await?;
    println!("-- {fetched} pages loaded by scrolling, {loaded} orders in memory");
    Ok(())
}

fn print_window(session: &FeedSession<HttpSource>, offset: f64, viewport: f64) {
    let window = session.window(offset, viewport);
    let snapshot = session.snapshot();
    println!(
        "@{offset:>8.0}px  rows {}..={} of {}  (render offset {:.0}px, list {:.0}px)",
        window.start_index,
        window.end_index,
        window.total_item_count,
        window.render_offset,
        window.total_extent
    );
    if let Some(first) = snapshot.items.get(window.start_index)
        && !window.is_empty()
    {
        println!("   {}", format_row(first));
    }
}
