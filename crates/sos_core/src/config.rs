//! Trigger configuration surface.
//!
//! # Responsibility
//! - Hold countdown, tick, per-channel timeout and fallback number settings.
//! - Parse JSON configuration with per-field defaults.
//!
//! # Invariants
//! - Configuration is validated before a trigger is built and never changes
//!   for the lifetime of that trigger.

use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

/// Default delay between arming and dispatch.
pub const DEFAULT_COUNTDOWN_MS: u64 = 3_000;
/// Default countdown clock resolution.
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 1_000;
/// Default timeout for one channel send attempt.
pub const DEFAULT_CHANNEL_TIMEOUT_MS: u64 = 5_000;
/// Default number shown when every channel failed.
pub const DEFAULT_FALLBACK_NUMBER: &str = "112";

/// Immutable trigger settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TriggerConfig {
    pub countdown_ms: u64,
    pub tick_interval_ms: u64,
    pub channel_timeout_ms: u64,
    pub fallback_number: String,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            countdown_ms: DEFAULT_COUNTDOWN_MS,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            channel_timeout_ms: DEFAULT_CHANNEL_TIMEOUT_MS,
            fallback_number: DEFAULT_FALLBACK_NUMBER.to_string(),
        }
    }
}

impl TriggerConfig {
    /// Parses and validates a JSON document. Missing fields use defaults.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: TriggerConfig =
            serde_json::from_str(raw).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.countdown_ms == 0 {
            return Err(ConfigError::ZeroDuration("countdown_ms"));
        }
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::ZeroDuration("tick_interval_ms"));
        }
        if self.channel_timeout_ms == 0 {
            return Err(ConfigError::ZeroDuration("channel_timeout_ms"));
        }
        if self.tick_interval_ms > self.countdown_ms {
            return Err(ConfigError::TickExceedsCountdown {
                tick_interval_ms: self.tick_interval_ms,
                countdown_ms: self.countdown_ms,
            });
        }
        if !is_dialable_number(self.fallback_number.trim()) {
            return Err(ConfigError::InvalidFallbackNumber(
                self.fallback_number.clone(),
            ));
        }
        Ok(())
    }

    pub fn countdown(&self) -> Duration {
        Duration::from_millis(self.countdown_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn channel_timeout(&self) -> Duration {
        Duration::from_millis(self.channel_timeout_ms)
    }
}

fn is_dialable_number(value: &str) -> bool {
    let digits = value.strip_prefix('+').unwrap_or(value);
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

/// Configuration parse/validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Parse(String),
    ZeroDuration(&'static str),
    TickExceedsCountdown {
        tick_interval_ms: u64,
        countdown_ms: u64,
    },
    InvalidFallbackNumber(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(message) => write!(f, "invalid trigger config: {message}"),
            Self::ZeroDuration(field) => write!(f, "`{field}` must be greater than zero"),
            Self::TickExceedsCountdown {
                tick_interval_ms,
                countdown_ms,
            } => write!(
                f,
                "tick_interval_ms ({tick_interval_ms}) must not exceed countdown_ms ({countdown_ms})"
            ),
            Self::InvalidFallbackNumber(value) => {
                write!(f, "fallback number must be digits with optional `+`: `{value}`")
            }
        }
    }
}

impl Error for ConfigError {}
