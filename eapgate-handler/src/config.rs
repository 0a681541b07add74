//! Handler configuration.
//!
//! Loaded from a TOML file, then optionally overridden from the environment:
//! - `EAPGATE_TOFU_SUPPORTED`
//! - `EAPGATE_INSECURE_ENTERPRISE_ALLOWED`
//! - `EAPGATE_NOTIFICATION_TIMEOUT_MS`

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use eapgate_core::policy::DeviceCapabilities;
use serde::{Deserialize, Serialize};

pub const ENV_TOFU_SUPPORTED: &str = "EAPGATE_TOFU_SUPPORTED";
pub const ENV_INSECURE_ENTERPRISE_ALLOWED: &str = "EAPGATE_INSECURE_ENTERPRISE_ALLOWED";
pub const ENV_NOTIFICATION_TIMEOUT_MS: &str = "EAPGATE_NOTIFICATION_TIMEOUT_MS";

/// How long an ongoing alert waits for the user before the attempt is dropped.
pub const DEFAULT_NOTIFICATION_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("notification timeout must be greater than zero")]
    ZeroTimeout,

    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: &'static str, value: String },
}

/// Device-wide settings for every managed interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandlerConfig {
    pub tofu_supported: bool,
    pub insecure_enterprise_allowed: bool,
    pub notification_timeout_ms: u64,
    /// Shown with approve-without-CA prompts; may be empty.
    pub ca_cert_help_link: String,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            tofu_supported: true,
            insecure_enterprise_allowed: false,
            notification_timeout_ms: DEFAULT_NOTIFICATION_TIMEOUT_MS,
            ca_cert_help_link: String::new(),
        }
    }
}

impl HandlerConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Failed to parse handler config")?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate the config file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read handler config at {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse handler config at {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid handler config at {}", path.display()))?;
        Ok(config)
    }

    /// Override fields from `EAPGATE_*` environment variables.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Override fields from any key lookup; unset keys leave fields untouched.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_TOFU_SUPPORTED) {
            self.tofu_supported = parse_bool(ENV_TOFU_SUPPORTED, &value)?;
        }
        if let Some(value) = lookup(ENV_INSECURE_ENTERPRISE_ALLOWED) {
            self.insecure_enterprise_allowed = parse_bool(ENV_INSECURE_ENTERPRISE_ALLOWED, &value)?;
        }
        if let Some(value) = lookup(ENV_NOTIFICATION_TIMEOUT_MS) {
            self.notification_timeout_ms =
                value
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue {
                        key: ENV_NOTIFICATION_TIMEOUT_MS,
                        value: value.clone(),
                    })?;
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.notification_timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }

    pub fn capabilities(&self) -> DeviceCapabilities {
        DeviceCapabilities {
            tofu_supported: self.tofu_supported,
            insecure_enterprise_allowed: self.insecure_enterprise_allowed,
        }
    }

    pub fn notification_timeout(&self) -> Duration {
        Duration::from_millis(self.notification_timeout_ms)
    }
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        }),
    }
}
