//! Application configuration.
//!
//! A `Config` is registered into the app's registry at construction and is
//! otherwise opaque to the core. It is usually loaded from TOML:
//!
//! ```toml
//! app = "records"
//! env = "development"
//! debug = true
//! listen = "0.0.0.0:8080"
//! log_level = "debug"
//!
//! [settings]
//! page_size = 25
//! ```

use std::net::SocketAddr;
use std::path::Path;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config: {0}")]
    Io(#[from] std::io::Error),

    #[error("parsing config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Application name, used in log output.
    pub app: String,
    pub env: String,
    /// Error responses carry the full status line instead of the bare reason.
    pub debug: bool,
    /// Address the HTTP server binds to.
    pub listen: String,
    /// Default filter directive for [`Logger::from_config`](crate::Logger::from_config).
    pub log_level: String,
    /// Free-form application settings.
    pub settings: toml::Table,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app: "hearth".to_owned(),
            env: "production".to_owned(),
            debug: false,
            listen: "127.0.0.1:3000".to_owned(),
            log_level: "info".to_owned(),
            settings: toml::Table::new(),
        }
    }
}

impl Config {
    /// Default configuration named `app`.
    pub fn new(app: impl Into<String>) -> Self {
        Self { app: app.into(), ..Self::default() }
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.app.trim().is_empty() {
            return Err(ConfigError::Invalid("`app` must not be empty".to_owned()));
        }
        self.listen
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid(format!("`listen` = {:?}: {e}", self.listen)))?;
        Ok(())
    }

    /// Deserializes `settings.<key>`. `Ok(None)` when the key is absent.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ConfigError> {
        self.settings
            .get(key)
            .cloned()
            .map(T::deserialize)
            .transpose()
            .map_err(ConfigError::Parse)
    }
}
