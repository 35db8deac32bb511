//! Configuration for execution contexts and serial queues.
//!
//! Both configs are plain builder-style structs with sensible defaults. They
//! derive `serde::Deserialize`, and with the `config-file` feature they can be
//! loaded from TOML:
//!
//! ```ignore
//! use settle::QueueConfig;
//!
//! let config = QueueConfig::from_toml_str(r#"
//!     capacity = 64
//!     thread_name = "audit-log"
//! "#)?;
//! ```

use serde::Deserialize;
use thiserror::Error;

/// Default thread-name prefix for combinator execution contexts.
pub const DEFAULT_NAME_PREFIX: &str = "settle-worker";

/// Default thread name for a serial queue consumer.
pub const DEFAULT_QUEUE_THREAD_NAME: &str = "settle-queue";

/// Errors raised while loading or validating configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The configuration source could not be parsed.
    #[error("failed to parse configuration: {0}")]
    Parse(String),
    /// A field holds a value the runtime cannot use.
    #[error("invalid value for `{field}`: {reason}")]
    Invalid {
        /// Name of the offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: &'static str,
    },
}

/// How execution contexts are created for work units.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SpawnConfig {
    /// Prefix for context thread names; the unit's input position is appended.
    pub name_prefix: String,
    /// Stack size in bytes, or `None` for the platform default.
    pub stack_size: Option<usize>,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            name_prefix: DEFAULT_NAME_PREFIX.to_string(),
            stack_size: None,
        }
    }
}

impl SpawnConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the thread-name prefix.
    #[must_use]
    pub fn with_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.name_prefix = prefix.into();
        self
    }

    /// Sets an explicit stack size in bytes.
    #[must_use]
    pub const fn with_stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }

    /// Checks that the configuration can be used to spawn threads.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_thread_name("name_prefix", &self.name_prefix)?;
        validate_stack_size(self.stack_size)
    }

    /// Parses and validates a TOML document.
    #[cfg(feature = "config-file")]
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

/// Capacity of a serial queue's item channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "Option<usize>")]
pub enum QueueCapacity {
    /// Pushes never block.
    #[default]
    Unbounded,
    /// Pushes block while `n` items are waiting. `Bounded(0)` is a rendezvous
    /// queue: every push waits for the consumer to take the item.
    Bounded(usize),
}

impl From<Option<usize>> for QueueCapacity {
    fn from(value: Option<usize>) -> Self {
        value.map_or(Self::Unbounded, Self::Bounded)
    }
}

/// Configuration for a [`SerialQueue`](crate::SerialQueue).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Channel capacity between producers and the consumer loop.
    pub capacity: QueueCapacity,
    /// Name of the consumer thread.
    pub thread_name: String,
    /// Consumer stack size in bytes, or `None` for the platform default.
    pub stack_size: Option<usize>,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: QueueCapacity::Unbounded,
            thread_name: DEFAULT_QUEUE_THREAD_NAME.to_string(),
            stack_size: None,
        }
    }
}

impl QueueConfig {
    /// Creates the default configuration (unbounded).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bounds the queue to `capacity` waiting items.
    #[must_use]
    pub const fn bounded(mut self, capacity: usize) -> Self {
        self.capacity = QueueCapacity::Bounded(capacity);
        self
    }

    /// Sets the consumer thread name.
    #[must_use]
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Sets an explicit consumer stack size in bytes.
    #[must_use]
    pub const fn with_stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }

    /// Checks that the configuration can be used to spawn the consumer.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_thread_name("thread_name", &self.thread_name)?;
        validate_stack_size(self.stack_size)
    }

    /// Parses and validates a TOML document.
    #[cfg(feature = "config-file")]
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

fn validate_thread_name(field: &'static str, name: &str) -> Result<(), ConfigError> {
    if name.contains('\0') {
        return Err(ConfigError::Invalid {
            field,
            reason: "thread names may not contain NUL bytes",
        });
    }
    Ok(())
}

fn validate_stack_size(stack_size: Option<usize>) -> Result<(), ConfigError> {
    if stack_size == Some(0) {
        return Err(ConfigError::Invalid {
            field: "stack_size",
            reason: "stack size must be non-zero",
        });
    }
    Ok(())
}
