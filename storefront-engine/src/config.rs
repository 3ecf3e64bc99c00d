//! Engine configuration
//!
//! # Environment variables
//!
//! Every setting can be overridden through the environment:
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | STOREFRONT_DATA_DIR | data | Directory holding the store database |
//! | STOREFRONT_ORDER_PREFIX | FPW | Order id prefix |
//! | STOREFRONT_BASE_DELIVERY_MINUTES | 35 | Base delivery estimate |
//! | STOREFRONT_DELIVERY_JITTER_MINUTES | 10 | Upper bound on estimate jitter |
//! | STOREFRONT_OFFLINE_MAX_AGE_HOURS | 24 | Offline snapshot freshness window |
//! | STOREFRONT_LOG_LEVEL | info | Log level for the fmt subscriber |

use std::path::PathBuf;

/// Engine configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the store database file
    pub data_dir: String,
    /// Prefix for generated order ids
    pub order_prefix: String,
    /// Base delivery estimate in minutes, before area offsets
    pub base_delivery_minutes: i64,
    /// Exclusive upper bound on the random minutes added to estimates
    pub delivery_jitter_minutes: i64,
    /// Offline cart snapshots older than this are not restored
    pub offline_max_age_hours: i64,
    /// Log level: trace | debug | info | warn | error
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: "data".into(),
            order_prefix: "FPW".into(),
            base_delivery_minutes: 35,
            delivery_jitter_minutes: 10,
            offline_max_age_hours: 24,
            log_level: "info".into(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset or unparseable
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            data_dir: std::env::var("STOREFRONT_DATA_DIR").unwrap_or(defaults.data_dir),
            order_prefix: std::env::var("STOREFRONT_ORDER_PREFIX").unwrap_or(defaults.order_prefix),
            base_delivery_minutes: env_i64(
                "STOREFRONT_BASE_DELIVERY_MINUTES",
                defaults.base_delivery_minutes,
            ),
            delivery_jitter_minutes: env_i64(
                "STOREFRONT_DELIVERY_JITTER_MINUTES",
                defaults.delivery_jitter_minutes,
            ),
            offline_max_age_hours: env_i64(
                "STOREFRONT_OFFLINE_MAX_AGE_HOURS",
                defaults.offline_max_age_hours,
            ),
            log_level: std::env::var("STOREFRONT_LOG_LEVEL").unwrap_or(defaults.log_level),
        }
    }

    /// Path of the store database file
    pub fn db_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("storefront.redb")
    }
}

fn env_i64(name: &str, default: i64) -> i64 {
    std::env::var(name)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}
