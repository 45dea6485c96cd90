use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::domains::queue::actions::VoteOrderMode;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Catalog database. Without it the server runs on the in-memory sample catalog.
    pub database_url: Option<String>,
    pub port: u16,
    pub queue: QueueSettings,
}

/// Tunables for the queue core.
#[derive(Debug, Clone)]
pub struct QueueSettings {
    pub vote_rate_limit_calls: usize,
    pub vote_rate_limit_window: Duration,
    pub vote_order: VoteOrderMode,
    pub history_limit: usize,
    pub event_channel_capacity: usize,
    pub housekeeping_interval: Duration,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            vote_rate_limit_calls: 5,
            vote_rate_limit_window: Duration::from_secs(10),
            vote_order: VoteOrderMode::Off,
            history_limit: 20,
            event_channel_capacity: crate::kernel::event_bus::DEFAULT_CAPACITY,
            housekeeping_interval: Duration::from_secs(60),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        let defaults = QueueSettings::default();

        Ok(Self {
            database_url: env::var("DATABASE_URL").ok().filter(|s| !s.trim().is_empty()),
            port: parse_var("PORT", 8080)?,
            queue: QueueSettings {
                vote_rate_limit_calls: parse_var(
                    "VOTE_RATE_LIMIT_CALLS",
                    defaults.vote_rate_limit_calls,
                )?,
                vote_rate_limit_window: Duration::from_secs(parse_var(
                    "VOTE_RATE_LIMIT_WINDOW_SECS",
                    defaults.vote_rate_limit_window.as_secs(),
                )?),
                vote_order: parse_var("QUEUE_VOTE_ORDER", defaults.vote_order)?,
                history_limit: parse_var("QUEUE_HISTORY_LIMIT", defaults.history_limit)?,
                event_channel_capacity: parse_var(
                    "EVENT_CHANNEL_CAPACITY",
                    defaults.event_channel_capacity,
                )?,
                housekeeping_interval: Duration::from_secs(parse_var(
                    "HOUSEKEEPING_INTERVAL_SECS",
                    defaults.housekeeping_interval.as_secs(),
                )?),
            },
        })
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{}", e))
            .with_context(|| format!("{} must be valid, got {:?}", name, raw)),
        _ => Ok(default),
    }
}
