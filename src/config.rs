//! Global configuration parsing, validation, and credential loading.

use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::{AppError, Result};

/// Keychain service name used to look up the AMI secret.
pub const KEYRING_SERVICE: &str = "ami-monitor";

/// Environment variable consulted when the keychain has no secret.
pub const SECRET_ENV_VAR: &str = "AMI_SECRET";

/// Connection settings for the switch's manager interface.
///
/// The secret may be given inline, but is normally resolved at runtime via
/// [`GlobalConfig::load_credentials`] so it stays out of the config file.
#[derive(Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct AmiConfig {
    /// Hostname or IP address of the switch.
    pub host: String,
    /// Manager interface TCP port (usually 5038).
    pub port: u16,
    /// Manager user name sent in the `Login` action.
    pub username: String,
    /// Manager secret sent in the `Login` action.
    #[serde(default)]
    pub secret: String,
}

impl std::fmt::Debug for AmiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AmiConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl AmiConfig {
    /// `host:port` pair suitable for [`tokio::net::TcpStream::connect`].
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check that every field needed to open a session is present.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` naming the first missing or invalid field.
    pub fn ensure_complete(&self) -> Result<()> {
        self.validate_endpoint()?;
        if self.secret.is_empty() {
            return Err(AppError::Config("ami.secret must not be empty".into()));
        }
        if self.secret.contains(['\r', '\n']) {
            return Err(AppError::Config("ami.secret must not contain line breaks".into()));
        }
        Ok(())
    }

    fn validate_endpoint(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(AppError::Config("ami.host must not be empty".into()));
        }
        if self.port == 0 {
            return Err(AppError::Config("ami.port must be non-zero".into()));
        }
        if self.username.trim().is_empty() {
            return Err(AppError::Config("ami.username must not be empty".into()));
        }
        if self.username.contains(['\r', '\n']) {
            return Err(AppError::Config(
                "ami.username must not contain line breaks".into(),
            ));
        }
        Ok(())
    }
}

/// Network timeouts (seconds) applied to the AMI session.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct TimeoutConfig {
    /// Maximum time to establish the TCP connection.
    #[serde(default = "default_connect_seconds")]
    pub connect_seconds: u64,
    /// Maximum time to wait for any single line from the switch.
    #[serde(default = "default_read_seconds")]
    pub read_seconds: u64,
}

impl TimeoutConfig {
    /// Connect timeout as a [`Duration`].
    #[must_use]
    pub fn connect(&self) -> Duration {
        Duration::from_secs(self.connect_seconds)
    }

    /// Per-line read timeout as a [`Duration`].
    #[must_use]
    pub fn read(&self) -> Duration {
        Duration::from_secs(self.read_seconds)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_seconds: default_connect_seconds(),
            read_seconds: default_read_seconds(),
        }
    }
}

fn default_connect_seconds() -> u64 {
    5
}

fn default_read_seconds() -> u64 {
    10
}

fn default_http_port() -> u16 {
    8080
}

fn default_command_queue_capacity() -> usize {
    64
}

/// Global configuration parsed from `config.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct GlobalConfig {
    /// Manager interface connection settings.
    pub ami: AmiConfig,
    /// Session timeouts.
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    /// HTTP port for the realtime endpoints.
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    /// Maximum number of commands waiting for the shared session.
    #[serde(default = "default_command_queue_capacity")]
    pub command_queue_capacity: usize,
}

impl GlobalConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve the AMI secret from the OS keychain with env-var fallback.
    ///
    /// A secret given inline in the config file wins and no lookup happens.
    /// Otherwise the `ami-monitor` keyring service is tried first, then the
    /// `AMI_SECRET` environment variable.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if neither source provides a secret.
    pub async fn load_credentials(&mut self) -> Result<()> {
        if !self.ami.secret.is_empty() {
            return Ok(());
        }
        self.ami.secret = load_credential("ami_secret", SECRET_ENV_VAR).await?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        self.ami.validate_endpoint()?;

        if self.timeouts.connect_seconds == 0 || self.timeouts.read_seconds == 0 {
            return Err(AppError::Config(
                "timeouts must be greater than zero".into(),
            ));
        }

        if self.command_queue_capacity == 0 {
            return Err(AppError::Config(
                "command_queue_capacity must be greater than zero".into(),
            ));
        }

        Ok(())
    }
}

/// Load a single credential from OS keychain with env-var fallback.
async fn load_credential(keyring_key: &str, env_key: &str) -> Result<String> {
    let key = keyring_key.to_owned();

    // keyring is synchronous I/O.
    let keychain_result = tokio::task::spawn_blocking(move || {
        keyring::Entry::new(KEYRING_SERVICE, &key).and_then(|entry| entry.get_password())
    })
    .await
    .map_err(|err| AppError::Config(format!("keychain task panicked: {err}")))?;

    match keychain_result {
        Ok(value) if !value.is_empty() => return Ok(value),
        Ok(_) => {
            warn!(key = keyring_key, "keychain entry is empty, trying env var");
        }
        Err(err) => {
            warn!(
                key = keyring_key,
                ?err,
                "keychain lookup failed, trying env var"
            );
        }
    }

    match env::var(env_key) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(AppError::Config(format!(
            "credential {keyring_key} not found in keychain or {env_key} env var"
        ))),
    }
}
