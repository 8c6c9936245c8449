//! Server settings, read from TOML and `ACCOUNTS__*` environment variables.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::password::Argon2Params;
use crate::policy::PolicyConfig;
use crate::secret::Secret;

/// Prefix of environment overrides, e.g. `ACCOUNTS__TOKEN__SECRET`.
pub const ENV_PREFIX: &str = "ACCOUNTS";

/// Configuration failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The sources could not be read or deserialized
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    /// A value was read but is not usable
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level settings.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Listener and logging
    pub server: ServerSettings,
    /// Access policy switches
    pub policy: PolicyConfig,
    /// Bearer token signing
    pub token: TokenSettings,
    /// Argon2 cost parameters for new hashes
    pub hashing: Argon2Params,
    /// Staff account ensured at startup
    pub bootstrap: Option<BootstrapAccount>,
}

/// `[server]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Bind address
    pub host: String,
    /// Bind port
    pub port: u16,
    /// Default tracing directive; `RUST_LOG` overrides it
    pub log_level: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            log_level: "info".to_string(),
        }
    }
}

/// `[token]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TokenSettings {
    /// HMAC signing key
    pub secret: Secret<String>,
    /// Lifetime of an issued token
    pub expiration_secs: u64,
    /// How long after the first issue a token may still be refreshed
    pub refresh_window_secs: u64,
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            secret: Secret::new(String::new()),
            expiration_secs: 300,
            refresh_window_secs: 7 * 24 * 60 * 60,
        }
    }
}

/// A staff account created on startup if it does not exist yet.
#[derive(Debug, Deserialize)]
pub struct BootstrapAccount {
    /// Login name
    pub username: String,
    /// Initial password, only used when the account is created
    pub password: Secret<String>,
    /// Contact address
    #[serde(default)]
    pub email: String,
}

impl Settings {
    /// Loads settings from an optional TOML file plus the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        Self::from_builder(builder)
    }

    fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, ConfigError> {
        let settings: Settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Rejects settings the server cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.token.secret.expose_secret().is_empty() {
            return Err(ConfigError::Invalid(
                "token.secret must be set".to_string(),
            ));
        }
        if self.token.expiration_secs == 0 {
            return Err(ConfigError::Invalid(
                "token.expiration_secs must be positive".to_string(),
            ));
        }
        if self.token.refresh_window_secs == 0 {
            return Err(ConfigError::Invalid(
                "token.refresh_window_secs must be positive".to_string(),
            ));
        }
        if let Some(account) = &self.bootstrap {
            if account.username.is_empty() || account.password.expose_secret().is_empty() {
                return Err(ConfigError::Invalid(
                    "bootstrap account needs a username and a password".to_string(),
                ));
            }
        }
        Ok(())
    }
}
