use crate::{
    DeviceIdentity,
    constants::{
        DEFAULT_AUTHORITY_URL, DEFAULT_CACHE_PATH, DEFAULT_CACHE_TTL_SECS, DEFAULT_CONFIG_NAME,
        DEFAULT_POLL_INTERVAL_MS, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_UNLOCK_SECS, ENV_PREFIX,
    },
    error::{Error, Result},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Device configuration for a single door controller.
///
/// Built once at start-up and passed by reference into the engine. Every key
/// except `device_id` has a default; an unprovisioned device has an empty
/// `device_id` and fails [`DeviceConfig::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Identity sent to the remote authority
    pub device_id: String,

    /// Base URL of the access check endpoint
    pub authority_url: String,

    /// Timeout for one remote authority round-trip
    pub request_timeout_secs: u64,

    /// How long a cached verification is trusted
    pub cache_ttl_secs: u64,

    /// How long the lock stays released after a grant
    pub unlock_secs: u64,

    /// Location of the card cache file
    pub cache_path: PathBuf,

    /// Interval between reader polls
    pub poll_interval_ms: u64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            device_id: String::new(),
            authority_url: DEFAULT_AUTHORITY_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            unlock_secs: DEFAULT_UNLOCK_SECS,
            cache_path: PathBuf::from(DEFAULT_CACHE_PATH),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl DeviceConfig {
    /// Create a configuration for the given device with default values
    pub fn new(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            ..Default::default()
        }
    }

    /// Set the authority base URL
    pub fn authority_url(mut self, url: impl Into<String>) -> Self {
        self.authority_url = url.into();
        self
    }

    /// Set the cache file location
    pub fn cache_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_path = path.into();
        self
    }

    /// Set the cache TTL in seconds
    pub fn cache_ttl_secs(mut self, secs: u64) -> Self {
        self.cache_ttl_secs = secs;
        self
    }

    /// Set the unlock duration in seconds
    pub fn unlock_secs(mut self, secs: u64) -> Self {
        self.unlock_secs = secs;
        self
    }

    /// Set the remote call timeout in seconds
    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }

    /// Load the configuration from its layered sources and validate it.
    ///
    /// Sources, later ones overriding earlier ones:
    /// 1. built-in defaults
    /// 2. the file at `path`, or an optional `latchkey.{toml,json,...}` in the
    ///    working directory when `path` is `None`
    /// 3. environment variables prefixed `LATCHKEY_` (`LATCHKEY_DEVICE_ID`, ...)
    ///
    /// # Errors
    /// Returns `Error::Config` if a source cannot be read or parsed, and the
    /// errors of [`DeviceConfig::validate`].
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let env = config::Environment::with_prefix(ENV_PREFIX).try_parsing(true);
        let config = Self::load_sources(path, env)?;
        config.validate()?;
        Ok(config)
    }

    /// Load without validating, for commands that inspect an unprovisioned
    /// device.
    pub fn load_unvalidated(path: Option<&Path>) -> Result<Self> {
        let env = config::Environment::with_prefix(ENV_PREFIX).try_parsing(true);
        Self::load_sources(path, env)
    }

    fn load_sources(path: Option<&Path>, env: config::Environment) -> Result<Self> {
        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_NAME).required(false),
        };

        let config = config::Config::builder()
            .add_source(file)
            .add_source(env)
            .build()?
            .try_deserialize::<DeviceConfig>()?;

        Ok(config)
    }

    /// Check that the configuration can drive the engine.
    ///
    /// # Errors
    /// - `Error::MissingConfig` if `device_id` or `authority_url` is empty
    /// - `Error::InvalidDeviceId` if `device_id` is not a valid identity
    /// - `Error::Config` if a duration is zero
    pub fn validate(&self) -> Result<()> {
        if self.device_id.trim().is_empty() {
            return Err(Error::MissingConfig("device_id".to_string()));
        }
        DeviceIdentity::new(&self.device_id)?;

        if self.authority_url.trim().is_empty() {
            return Err(Error::MissingConfig("authority_url".to_string()));
        }

        for (key, value) in [
            ("cache_ttl_secs", self.cache_ttl_secs),
            ("request_timeout_secs", self.request_timeout_secs),
            ("unlock_secs", self.unlock_secs),
            ("poll_interval_ms", self.poll_interval_ms),
        ] {
            if value == 0 {
                return Err(Error::Config(format!("{key} must be greater than zero")));
            }
        }

        Ok(())
    }

    /// Write the configuration as pretty JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Validated device identity.
    pub fn device_identity(&self) -> Result<DeviceIdentity> {
        if self.device_id.trim().is_empty() {
            return Err(Error::MissingConfig("device_id".to_string()));
        }
        DeviceIdentity::new(&self.device_id)
    }

    pub fn cache_ttl(&self) -> chrono::TimeDelta {
        i64::try_from(self.cache_ttl_secs)
            .ok()
            .and_then(chrono::TimeDelta::try_seconds)
            .unwrap_or(chrono::TimeDelta::MAX)
    }

    pub fn unlock_duration(&self) -> Duration {
        Duration::from_secs(self.unlock_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
