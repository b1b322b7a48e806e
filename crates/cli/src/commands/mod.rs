//! CLI command implementations.

pub mod browse;
pub mod orders;

use purchase_feed::{ApiError, ConfigError, FeedConfig, FeedError, FeedSession, HttpSource};
use purchase_feed_core::PurchaseOrder;
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A direct API call failed.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// A feed operation failed.
    #[error("{0}")]
    Feed(#[from] FeedError),

    /// A command-line value is out of range.
    #[error("Invalid argument {0}: {1}")]
    InvalidArgument(&'static str, String),

    /// The scroll driver task panicked or was cancelled.
    #[error("Scroll driver failed: {0}")]
    Driver(#[from] tokio::task::JoinError),
}

/// Load configuration and open a feed session against the API.
pub fn connect() -> Result<FeedSession<HttpSource>, CliError> {
    let config = FeedConfig::from_env()?;
    let source = HttpSource::new(&config.api)?;
    tracing::debug!(base_url = %source.base_url(), "Connecting to purchase-order API");
    Ok(FeedSession::new(source, config)?)
}

/// One table row.
pub fn format_row(order: &PurchaseOrder) -> String {
    format!(
        "{:>6}  {:<32}  {}  {}  {:>6} x {:>10} = {:>12}",
        order.id,
        truncate(&order.item_name, 32),
        order.order_date,
        order.delivery_date,
        order.quantity,
        order.unit_price,
        order.total_price,
    )
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let mut short: String = text.chars().take(max_chars.saturating_sub(1)).collect();
        short.push('…');
        short
    }
}
