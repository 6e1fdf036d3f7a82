//! Timeout configuration for await-style checks.
//!
//! There are two ways to bound a check:
//!
//! - Thread a [`CheckConfig`] through a [`Checker`](crate::Checker). The
//!   value is fixed for every invocation made through that checker.
//! - Use the free-function entry points, which snapshot the process-wide
//!   default once at the start of each invocation.
//!
//! The process-wide default is a relaxed atomic. Writes are not ordered
//! against invocations already in flight on other threads: an invocation
//! observes either the old or the new value, never a torn one. Tests that
//! change it should serialize among themselves.
//!
//! [`ConfigLoader`] layers defaults, an optional `key = value` file,
//! environment overrides and explicit overrides, then validates.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Default bound for await-style checks.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(2000);

/// Environment variable overriding the timeout, in milliseconds.
pub const TIMEOUT_ENV: &str = "FANOUT_CHECK_TIMEOUT_MS";

/// Smallest accepted timeout.
pub const MIN_TIMEOUT: Duration = Duration::from_millis(1);

static DEFAULT_TIMEOUT_MS: AtomicU64 = AtomicU64::new(2000);

/// Returns the current process-wide default timeout.
#[must_use]
pub fn default_timeout() -> Duration {
    Duration::from_millis(DEFAULT_TIMEOUT_MS.load(Ordering::Relaxed))
}

/// Replaces the process-wide default timeout.
///
/// The default is stored in whole milliseconds and clamped to at least
/// [`MIN_TIMEOUT`], the same floor [`ConfigLoader`] enforces. Invocations
/// that already started keep the value they read.
pub fn set_default_timeout(timeout: Duration) {
    let requested = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
    let floor = u64::try_from(MIN_TIMEOUT.as_millis()).unwrap_or(1);
    let millis = requested.max(floor);
    if millis != requested {
        tracing::warn!(
            requested_ms = requested,
            timeout_ms = millis,
            "default timeout below minimum, clamped"
        );
    }
    let previous = DEFAULT_TIMEOUT_MS.swap(millis, Ordering::Relaxed);
    tracing::debug!(previous_ms = previous, timeout_ms = millis, "default timeout replaced");
}

/// Restores the process-wide default timeout to [`DEFAULT_TIMEOUT`].
pub fn reset_default_timeout() {
    set_default_timeout(DEFAULT_TIMEOUT);
}

/// Configuration for a [`Checker`](crate::Checker).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckConfig {
    /// Bound on how long an await-style check blocks before failing.
    pub timeout: Duration,
}

impl CheckConfig {
    /// Creates a config with the given timeout.
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Snapshots the process-wide default.
    #[must_use]
    pub fn from_global() -> Self {
        Self::new(default_timeout())
    }

    /// Returns a copy with a different timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Validates the configuration for basic sanity.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout < MIN_TIMEOUT {
            return Err(ConfigError::TimeoutTooShort(self.timeout));
        }
        Ok(())
    }

    /// Writes this config's timeout into the process-wide default.
    pub fn install_as_default(&self) {
        set_default_timeout(self.timeout);
    }
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
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
    /// Timeout below the accepted minimum.
    #[error("timeout too short: {0:?}")]
    TimeoutTooShort(Duration),
    /// Invalid env or explicit override.
    #[error("invalid override: {0}")]
    InvalidOverride(String),
}

/// Layered configuration loader.
///
/// Precedence, lowest to highest: defaults, file, environment, explicit
/// overrides.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    base: CheckConfig,
    path: Option<PathBuf>,
    use_env: bool,
    overrides: BTreeMap<String, String>,
}

impl ConfigLoader {
    /// Creates a loader starting from [`CheckConfig::default`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            base: CheckConfig::default(),
            path: None,
            use_env: true,
            overrides: BTreeMap::new(),
        }
    }

    /// Starts from the given config instead of the defaults.
    #[must_use]
    pub fn base(mut self, base: CheckConfig) -> Self {
        self.base = base;
        self
    }

    /// Reads a `key = value` file on top of the base.
    #[must_use]
    pub fn file(mut self, path: impl AsRef<Path>) -> Self {
        self.path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Skips environment overrides.
    #[must_use]
    pub fn without_env(mut self) -> Self {
        self.use_env = false;
        self
    }

    /// Adds an explicit override, using the same keys as the file format.
    #[must_use]
    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.overrides.insert(key.into(), value.into());
        self
    }

    /// Loads and validates the configuration.
    pub fn load(&self) -> Result<CheckConfig, ConfigError> {
        if self.use_env {
            self.load_with_env(std::env::vars())
        } else {
            self.load_with_env(std::iter::empty())
        }
    }

    fn load_with_env<I>(&self, vars: I) -> Result<CheckConfig, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut config = self.base;
        if let Some(path) = &self.path {
            let contents = std::fs::read_to_string(path)?;
            parse_config(&contents, &mut config)?;
        }
        for (key, value) in vars {
            if key == TIMEOUT_ENV {
                config.timeout = parse_duration_ms(&value, &key)
                    .map_err(|_| ConfigError::InvalidOverride(key.clone()))?;
            }
        }
        for (key, value) in &self.overrides {
            apply_kv(&mut config, key, value)
                .map_err(|_| ConfigError::InvalidOverride(format!("{key}={value}")))?;
        }
        config.validate()?;
        tracing::debug!(
            timeout_ms = config.timeout.as_millis(),
            file = ?self.path,
            "check config loaded"
        );
        Ok(config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_config(contents: &str, config: &mut CheckConfig) -> Result<(), ConfigError> {
    for (lineno, raw) in contents.lines().enumerate() {
        let line = raw.split('#').next().unwrap_or_default().trim();
        if line.is_empty() || line == "[check]" {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            return Err(ConfigError::Parse(format!(
                "line {}: expected key = value",
                lineno + 1
            )));
        };
        apply_kv(config, key.trim(), value.trim().trim_matches('"'))?;
    }
    Ok(())
}

fn apply_kv(config: &mut CheckConfig, key: &str, value: &str) -> Result<(), ConfigError> {
    match key {
        "timeout_ms" => config.timeout = parse_duration_ms(value, key)?,
        _ => return Err(ConfigError::Parse(format!("unknown key: {key}"))),
    }
    Ok(())
}

fn parse_duration_ms(value: &str, key: &str) -> Result<Duration, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|err| ConfigError::Parse(format!("{key}: {err}")))
}
