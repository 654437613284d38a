//! Connection and pool configuration

use std::path::Path;
use std::time::Duration;

use config::{Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const DEFAULT_MAX_POOL_SIZE: usize = 20;
const DEFAULT_CONNECT_RETRIES: u32 = 3;
const DEFAULT_RETRY_BACKOFF_MS: u64 = 100;
const DEFAULT_CHARSET: &str = "utf8mb4";

/// Backoff doubles per attempt up to this multiple of the base delay.
const MAX_BACKOFF_FACTOR: u32 = 64;

/// Database connection settings plus pool tuning.
///
/// `host`, `user`, `password`, `database` and `port` are required; a
/// missing key is reported as [`Error::Config`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub host: String,
    pub user: String,
    pub password: String,

    #[serde(alias = "db", alias = "database_name")]
    pub database: String,

    pub port: u16,

    /// Number of pooled connections
    #[serde(default = "default_max_pool_size")]
    pub max_pool_size: usize,

    /// Extra connect attempts after the first one fails
    #[serde(default = "default_connect_retries")]
    pub connect_retries: u32,

    /// Delay before the first retry, doubled for each one after
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Deadline for a whole checkout, covering the wait for a free
    /// connection and any reconnect attempts; unset waits forever
    #[serde(default)]
    pub checkout_timeout_ms: Option<u64>,

    #[serde(default = "default_charset")]
    pub charset: String,
}

fn default_max_pool_size() -> usize {
    DEFAULT_MAX_POOL_SIZE
}
fn default_connect_retries() -> u32 {
    DEFAULT_CONNECT_RETRIES
}
fn default_retry_backoff_ms() -> u64 {
    DEFAULT_RETRY_BACKOFF_MS
}
fn default_charset() -> String {
    DEFAULT_CHARSET.to_string()
}

impl Config {
    pub fn new(
        host: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
        database: impl Into<String>,
        port: u16,
    ) -> Self {
        Self {
            host: host.into(),
            user: user.into(),
            password: password.into(),
            database: database.into(),
            port,
            max_pool_size: DEFAULT_MAX_POOL_SIZE,
            connect_retries: DEFAULT_CONNECT_RETRIES,
            retry_backoff_ms: DEFAULT_RETRY_BACKOFF_MS,
            checkout_timeout_ms: None,
            charset: default_charset(),
        }
    }

    pub fn with_max_pool_size(mut self, size: usize) -> Self {
        self.max_pool_size = size;
        self
    }

    pub fn with_connect_retries(mut self, retries: u32) -> Self {
        self.connect_retries = retries;
        self
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff_ms = saturating_millis(backoff);
        self
    }

    pub fn with_checkout_timeout(mut self, timeout: Duration) -> Self {
        self.checkout_timeout_ms = Some(saturating_millis(timeout));
        self
    }

    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = charset.into();
        self
    }

    /// Build from a key/value mapping such as
    /// `{"host": "localhost", "user": "root", "password": "", "db": "app", "port": "3306"}`.
    ///
    /// Values are loosely typed: `"3306"` is accepted for `port`.
    pub fn from_map<I, K, V>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut builder = config::Config::builder();
        for (key, value) in entries {
            builder = builder.set_override(key.as_ref(), value.into())?;
        }
        let config: Config = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration using config-rs (file + environment variables)
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        // Load from config file if specified
        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path));
        } else {
            // Try default locations
            builder = builder.add_source(File::with_name("myq").required(false));
        }

        // Override with environment variables (MYQ_HOST, MYQ_MAX_POOL_SIZE, ...)
        builder = builder.add_source(
            Environment::with_prefix("MYQ")
                .prefix_separator("_")
                .separator("__"),
        );

        let config: Config = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        for (key, value) in [
            ("host", &self.host),
            ("user", &self.user),
            ("database", &self.database),
        ] {
            if value.trim().is_empty() {
                return Err(Error::Config(format!("{} must not be empty", key)));
            }
        }

        if self.max_pool_size == 0 {
            return Err(Error::Config("max_pool_size must be at least 1".into()));
        }

        Ok(())
    }

    pub fn checkout_timeout(&self) -> Option<Duration> {
        self.checkout_timeout_ms.map(Duration::from_millis)
    }

    /// Delay before retry number `attempt` (0-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32
            .checked_shl(attempt)
            .unwrap_or(MAX_BACKOFF_FACTOR)
            .min(MAX_BACKOFF_FACTOR);
        Duration::from_millis(self.retry_backoff_ms)
            .checked_mul(factor)
            .unwrap_or(Duration::MAX)
    }
}

fn saturating_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
