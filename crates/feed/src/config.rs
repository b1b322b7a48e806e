//! Feed configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional.
//!
//! - `PURCHASE_FEED_API_URL` - Base URL of the purchase-order API (default: `http://localhost:8000`)
//! - `PURCHASE_FEED_PAGE_SIZE` - Orders per page, 1-100 (default: 20)
//! - `PURCHASE_FEED_REQUEST_TIMEOUT_SECS` - Per-request timeout (default: 10)
//! - `PURCHASE_FEED_CACHE_CAPACITY` - Maximum cached pages (default: 1000)
//! - `PURCHASE_FEED_CACHE_POLICY` - `fifo` or `lru` (default: fifo)
//! - `PURCHASE_FEED_ORDER_CACHE_TTL_SECS` - TTL for single-order lookups (default: 300)
//! - `PURCHASE_FEED_PREFETCH_THRESHOLD` - Scrolled fraction that triggers prefetch (default: 0.8)
//! - `PURCHASE_FEED_TRIGGER_DISTANCE` - `adaptive` or a fixed distance from the end (default: adaptive)
//! - `PURCHASE_FEED_SCROLL_THROTTLE_MS` - Scroll coalescing window (default: 100)
//! - `PURCHASE_FEED_ITEM_EXTENT` - Row extent used by the virtualizer (default: 80)
//! - `PURCHASE_FEED_BUFFER_COUNT` - Rows rendered beyond the viewport (default: 5)

use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::cache::EvictionPolicy;
use crate::scroll::TriggerDistance;

const DEFAULT_API_URL: &str = "http://localhost:8000";
const MAX_PAGE_SIZE: u32 = 100;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Invalid setting {0}: {1}")]
    Invalid(String, String),
}

/// Feed configuration.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Purchase-order API configuration
    pub api: ApiConfig,
    /// Orders requested per page
    pub page_size: u32,
    /// Page cache configuration
    pub cache: CacheConfig,
    /// Scroll trigger configuration
    pub scroll: ScrollConfig,
    /// Virtualizer configuration
    pub viewport: ViewportConfig,
}

/// Purchase-order API configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL; endpoints live under `/api/purchase-orders`
    pub base_url: String,
    /// Timeout applied to every request
    pub request_timeout: Duration,
    /// How long single-order lookups stay cached
    pub order_cache_ttl: Duration,
}

/// Page cache configuration.
#[derive(Debug, Clone, Copy)]
pub struct CacheConfig {
    pub capacity: usize,
    pub policy: EvictionPolicy,
}

/// Scroll trigger configuration.
#[derive(Debug, Clone, Copy)]
pub struct ScrollConfig {
    /// Fraction of content scrolled past before prefetching the next page
    pub prefetch_threshold: f64,
    /// Distance from the end that forces the next page
    pub trigger_distance: TriggerDistance,
    /// Window within which scroll events are coalesced
    pub throttle: Duration,
}

/// Virtualizer configuration.
#[derive(Debug, Clone, Copy)]
pub struct ViewportConfig {
    /// Extent of one row along the scroll axis
    pub item_extent: f64,
    /// Rows rendered beyond each edge of the viewport
    pub buffer_count: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            page_size: 20,
            cache: CacheConfig::default(),
            scroll: ScrollConfig::default(),
            viewport: ViewportConfig::default(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            request_timeout: Duration::from_secs(10),
            order_cache_ttl: Duration::from_secs(300),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 1000,
            policy: EvictionPolicy::Fifo,
        }
    }
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            prefetch_threshold: 0.8,
            trigger_distance: TriggerDistance::default(),
            throttle: Duration::from_millis(100),
        }
    }
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            item_extent: 80.0,
            buffer_count: 5,
        }
    }
}

impl FeedConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but cannot be parsed, or if
    /// the resulting configuration fails validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Same as [`FeedConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = EnvReader { lookup };
        let defaults = Self::default();

        let base_url = env.parse_or("PURCHASE_FEED_API_URL", defaults.api.base_url)?;
        let request_timeout = Duration::from_secs(
            env.parse_or("PURCHASE_FEED_REQUEST_TIMEOUT_SECS", 10_u64)?,
        );
        let order_cache_ttl = Duration::from_secs(
            env.parse_or("PURCHASE_FEED_ORDER_CACHE_TTL_SECS", 300_u64)?,
        );

        let config = Self {
            api: ApiConfig {
                base_url,
                request_timeout,
                order_cache_ttl,
            },
            page_size: env.parse_or("PURCHASE_FEED_PAGE_SIZE", defaults.page_size)?,
            cache: CacheConfig {
                capacity: env.parse_or("PURCHASE_FEED_CACHE_CAPACITY", defaults.cache.capacity)?,
                policy: env.parse_or("PURCHASE_FEED_CACHE_POLICY", defaults.cache.policy)?,
            },
            scroll: ScrollConfig {
                prefetch_threshold: env.parse_or(
                    "PURCHASE_FEED_PREFETCH_THRESHOLD",
                    defaults.scroll.prefetch_threshold,
                )?,
                trigger_distance: env.parse_or(
                    "PURCHASE_FEED_TRIGGER_DISTANCE",
                    defaults.scroll.trigger_distance,
                )?,
                throttle: Duration::from_millis(env.parse_or("PURCHASE_FEED_SCROLL_THROTTLE_MS", 100_u64)?),
            },
            viewport: ViewportConfig {
                item_extent: env.parse_or("PURCHASE_FEED_ITEM_EXTENT", defaults.viewport.item_extent)?,
                buffer_count: env
                    .parse_or("PURCHASE_FEED_BUFFER_COUNT", defaults.viewport.buffer_count)?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Check invariants that the rest of the feed relies on.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` naming the first offending setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let base_url = Url::parse(&self.api.base_url)
            .map_err(|e| invalid("api.base_url", e.to_string()))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(invalid("api.base_url", "must be an http(s) URL"));
        }
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(invalid(
                "page_size",
                format!("must be between 1 and {MAX_PAGE_SIZE} (got {})", self.page_size),
            ));
        }
        if self.api.request_timeout.is_zero() {
            return Err(invalid("request_timeout", "must be greater than zero"));
        }
        if self.cache.capacity == 0 {
            return Err(invalid("cache.capacity", "must be greater than zero"));
        }
        let threshold = self.scroll.prefetch_threshold;
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(invalid(
                "scroll.prefetch_threshold",
                format!("must be in (0, 1] (got {threshold})"),
            ));
        }
        self.scroll.trigger_distance.validate()?;
        if self.scroll.throttle.is_zero() {
            return Err(invalid("scroll.throttle", "must be greater than zero"));
        }
        let extent = self.viewport.item_extent;
        if !(extent.is_finite() && extent > 0.0) {
            return Err(invalid(
                "viewport.item_extent",
                format!("must be a positive number (got {extent})"),
            ));
        }
        Ok(())
    }
}

fn invalid(name: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(name.to_string(), reason.into())
}

// =============================================================================
// Helper Functions
// =============================================================================

struct EnvReader<F> {
    lookup: F,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Parse a variable, falling back to `default` when it is unset or blank.
    fn parse_or<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match (self.lookup)(key) {
            Some(raw) if !raw.trim().is_empty() => raw
                .trim()
                .parse::<T>()
                .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
            _ => Ok(default),
        }
    }
}
