use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{CoreError, CoreResult};

/// How overlapping triggers on one node data record are handled.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunConcurrency {
    /// A trigger while a run is unsettled joins that run instead of starting another
    #[default]
    Exclusive,
    /// Every trigger starts its own run; the last settlement wins
    Overlapping,
}

impl FromStr for RunConcurrency {
    type Err = CoreError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "exclusive" => Ok(RunConcurrency::Exclusive),
            "overlapping" => Ok(RunConcurrency::Overlapping),
            other => Err(CoreError::validation(format!(
                "Unknown automation concurrency '{}', expected 'exclusive' or 'overlapping'",
                other
            ))),
        }
    }
}

/// Runtime configuration shared by the server and client sessions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CanvasConfig {
    pub database_url: String,
    pub save_debounce_ms: u64,
    pub resize_settle_ms: u64,
    pub history_depth: usize,
    pub automation_concurrency: RunConcurrency,
    pub event_buffer: usize,
    pub patch_retry_limit: usize,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://canvas.db?mode=rwc".to_string(),
            save_debounce_ms: 1000,
            resize_settle_ms: 200,
            history_depth: 100,
            automation_concurrency: RunConcurrency::Exclusive,
            event_buffer: 256,
            patch_retry_limit: 5,
        }
    }
}

impl CanvasConfig {
    /// Defaults overridden by `CANVAS_*` environment variables.
    pub fn from_env() -> CoreResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> CoreResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("CANVAS_DATABASE_URL") {
            config.database_url = url;
        }
        if let Some(ms) = parse_var(&lookup, "CANVAS_SAVE_DEBOUNCE_MS")? {
            config.save_debounce_ms = ms;
        }
        if let Some(ms) = parse_var(&lookup, "CANVAS_RESIZE_SETTLE_MS")? {
            config.resize_settle_ms = ms;
        }
        if let Some(depth) = parse_var(&lookup, "CANVAS_HISTORY_DEPTH")? {
            config.history_depth = depth;
        }
        if let Some(mode) = parse_var(&lookup, "CANVAS_AUTOMATION_CONCURRENCY")? {
            config.automation_concurrency = mode;
        }
        if let Some(size) = parse_var(&lookup, "CANVAS_EVENT_BUFFER")? {
            config.event_buffer = size;
        }
        if let Some(limit) = parse_var(&lookup, "CANVAS_PATCH_RETRY_LIMIT")? {
            config.patch_retry_limit = limit;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.history_depth == 0 {
            return Err(CoreError::validation("history depth must be at least 1"));
        }
        if self.event_buffer == 0 {
            return Err(CoreError::validation("event buffer must be at least 1"));
        }
        Ok(())
    }

    pub fn save_debounce(&self) -> Duration {
        Duration::from_millis(self.save_debounce_ms)
    }

    pub fn resize_settle(&self) -> Duration {
        Duration::from_millis(self.resize_settle_ms)
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> CoreResult<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| CoreError::validation(format!("Invalid value for {}: {}", key, e))),
        None => Ok(None),
    }
}
