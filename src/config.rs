//! Configuration for the namespace object and its adapters.
//!
//! This module provides:
//! - [`FlowConfig`]: the tunables read by [`Q`](crate::Q) when it builds
//!   modifiers and adapters
//! - Validation for the few invariants those tunables must keep
//! - Layered loading (file + env + overrides) through [`ConfigLoader`]
//!
//! File syntax is a small `key = value` dialect with `[section]` headers:
//!
//! ```text
//! [defer]
//! timeout_ms = 500
//!
//! [fallback]
//! tick_ms = 1
//!
//! [events]
//! success = "onload"
//! error = "onerror onabort"
//! progress = "onprogress onloadend"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::adapter::EventNames;

/// Environment variable prefix read by [`ConfigLoader`].
pub const ENV_PREFIX: &str = "FLOWQ_";

/// Tunables shared by every combinator built through the namespace object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowConfig {
    /// Timeout armed by the callback adapter when the wrapped callable has
    /// no error callback slot. `None` disables it.
    pub defer_timeout: Option<Duration>,
    /// Delay before a fallback modifier observes its operand.
    pub fallback_tick: Duration,
    /// Space separated success event names for the event-object adapter.
    pub success_events: String,
    /// Space separated error event names for the event-object adapter.
    pub error_events: String,
    /// Space separated progress event names for the event-object adapter.
    pub progress_events: String,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            defer_timeout: Some(Duration::from_millis(500)),
            fallback_tick: Duration::from_millis(1),
            success_events: "onload".to_owned(),
            error_events: "onerror onabort".to_owned(),
            progress_events: "onprogress onloadend".to_owned(),
        }
    }
}

impl FlowConfig {
    /// Sets the callback adapter timeout.
    #[must_use]
    pub fn defer_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.defer_timeout = timeout;
        self
    }

    /// Sets the fallback observation delay.
    #[must_use]
    pub fn fallback_tick(mut self, tick: Duration) -> Self {
        self.fallback_tick = tick;
        self
    }

    /// Sets the default event names for the event-object adapter.
    #[must_use]
    pub fn events(
        mut self,
        success: impl Into<String>,
        error: impl Into<String>,
        progress: impl Into<String>,
    ) -> Self {
        self.success_events = success.into();
        self.error_events = error.into();
        self.progress_events = progress.into();
        self
    }

    /// Default event names derived from this configuration.
    #[must_use]
    pub fn event_names(&self) -> EventNames {
        EventNames::new(&self.success_events, &self.error_events)
            .progress(&self.progress_events)
    }

    /// Validates the configuration for basic sanity.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.defer_timeout == Some(Duration::ZERO) {
            return Err(ConfigError::ZeroTimeout);
        }

        let names = self.event_names();
        if names.success.is_empty() {
            return Err(ConfigError::NoSuccessEvents);
        }

        if let Some(shared) = names.success.iter().find(|n| names.error.contains(n)) {
            return Err(ConfigError::OverlappingEvents(shared.clone()));
        }

        Ok(())
    }
}

/// Configuration loader with layered sources.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    file_path: Option<PathBuf>,
    overrides: BTreeMap<String, String>,
    read_env: bool,
}

impl ConfigLoader {
    /// Creates a loader that starts from [`FlowConfig::default`] and reads
    /// `FLOWQ_*` environment variables.
    #[must_use]
    pub fn new() -> Self {
        Self {
            file_path: None,
            overrides: BTreeMap::new(),
            read_env: true,
        }
    }

    /// Sets a file path for config loading.
    #[must_use]
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    /// Skips the environment layer.
    #[must_use]
    pub fn without_env(mut self) -> Self {
        self.read_env = false;
        self
    }

    /// Adds a programmatic override (highest precedence).
    ///
    /// Keys use the environment spelling, e.g. `FLOWQ_DEFER_TIMEOUT_MS`.
    #[must_use]
    pub fn override_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.overrides.insert(key.into(), value.into());
        self
    }

    /// Loads configuration with precedence:
    /// 1. Defaults (lowest)
    /// 2. File config
    /// 3. Environment variables
    /// 4. Programmatic overrides (highest)
    pub fn load(&self) -> Result<FlowConfig, ConfigError> {
        let mut config = match &self.file_path {
            Some(path) => load_from_file(path)?,
            None => FlowConfig::default(),
        };

        if self.read_env {
            apply_env_overrides(&mut config)?;
        }
        apply_overrides(&mut config, &self.overrides)?;
        config.validate()?;
        Ok(config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// I/O error while reading configuration.
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Parse error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// A zero timeout was configured; use `None` to disable it.
    #[error("defer timeout must be > 0 (use 0 in files to disable)")]
    ZeroTimeout,
    /// No success event name was configured.
    #[error("at least one success event name is required")]
    NoSuccessEvents,
    /// An event name is listed as both success and error.
    #[error("event `{0}` is both a success and an error event")]
    OverlappingEvents(String),
    /// Unknown override key.
    #[error("invalid override: {0}")]
    InvalidOverride(String),
}

fn load_from_file(path: &Path) -> Result<FlowConfig, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents, FlowConfig::default())
}

const ENV_KEYS: [&str; 5] = [
    "FLOWQ_DEFER_TIMEOUT_MS",
    "FLOWQ_FALLBACK_TICK_MS",
    "FLOWQ_EVENTS_SUCCESS",
    "FLOWQ_EVENTS_ERROR",
    "FLOWQ_EVENTS_PROGRESS",
];

// Unrelated FLOWQ_* variables (test seeds, say) are not config keys.
fn apply_env_overrides(config: &mut FlowConfig) -> Result<(), ConfigError> {
    let overrides: BTreeMap<String, String> = std::env::vars()
        .filter(|(key, _)| key.starts_with(ENV_PREFIX) && ENV_KEYS.contains(&key.as_str()))
        .collect();
    apply_overrides(config, &overrides)
}

fn apply_overrides(
    config: &mut FlowConfig,
    overrides: &BTreeMap<String, String>,
) -> Result<(), ConfigError> {
    for (key, value) in overrides {
        apply_override(config, key, value)?;
    }
    Ok(())
}

fn apply_override(config: &mut FlowConfig, key: &str, value: &str) -> Result<(), ConfigError> {
    match key {
        "FLOWQ_DEFER_TIMEOUT_MS" => config.defer_timeout = parse_timeout_ms(value, key)?,
        "FLOWQ_FALLBACK_TICK_MS" => config.fallback_tick = parse_duration_ms(value, key)?,
        "FLOWQ_EVENTS_SUCCESS" => config.success_events = value.to_owned(),
        "FLOWQ_EVENTS_ERROR" => config.error_events = value.to_owned(),
        "FLOWQ_EVENTS_PROGRESS" => config.progress_events = value.to_owned(),
        _ => return Err(ConfigError::InvalidOverride(key.to_owned())),
    }
    Ok(())
}

fn parse_config(contents: &str, base: FlowConfig) -> Result<FlowConfig, ConfigError> {
    let mut config = base;
    let mut section = String::new();

    for (line_idx, raw) in contents.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with("//") {
            continue;
        }

        if line.starts_with('[') && line.ends_with(']') {
            section = line[1..line.len() - 1].trim().to_lowercase();
            continue;
        }

        let (key, value) = line
            .split_once('=')
            .ok_or_else(|| ConfigError::Parse(format!("line {}: {}", line_idx + 1, line)))?;
        let key = key.trim();
        let value = value.trim().trim_matches('"');

        apply_section_kv(&mut config, &section, key, value)?;
    }

    Ok(config)
}

fn apply_section_kv(
    config: &mut FlowConfig,
    section: &str,
    key: &str,
    value: &str,
) -> Result<(), ConfigError> {
    match (section, key) {
        ("defer", "timeout_ms") => config.defer_timeout = parse_timeout_ms(value, key)?,
        ("fallback", "tick_ms") => config.fallback_tick = parse_duration_ms(value, key)?,
        ("events", "success") => config.success_events = value.to_owned(),
        ("events", "error") => config.error_events = value.to_owned(),
        ("events", "progress") => config.progress_events = value.to_owned(),
        ("", _) => {
            return Err(ConfigError::Parse(format!(
                "missing section for key: {key}"
            )))
        }
        ("defer" | "fallback" | "events", _) => {
            return Err(ConfigError::Parse(format!("unknown key: {section}.{key}")))
        }
        _ => return Err(ConfigError::Parse(format!("unknown section: {section}"))),
    }
    Ok(())
}

fn parse_duration_ms(value: &str, key: &str) -> Result<Duration, ConfigError> {
    value
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|_| ConfigError::Parse(format!("invalid milliseconds for {key}: {value}")))
}

fn parse_timeout_ms(value: &str, key: &str) -> Result<Option<Duration>, ConfigError> {
    let duration = parse_duration_ms(value, key)?;
    Ok((!duration.is_zero()).then_some(duration))
}
