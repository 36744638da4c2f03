//! Runtime configuration: JSON document plus environment overrides.
//!
//! ```json
//! { "namespace": "MyPlugin", "debug": false, "force_packet_titles": false }
//! ```
//!
//! Environment: `REMAIN_NAMESPACE`, `REMAIN_DEBUG` (`1/0`, `true/false`, `yes/no`).

use std::env;
use std::fmt;

use serde::{Deserialize, Serialize};

use remain_kernel::RemainError;

pub const ENV_NAMESPACE: &str = "REMAIN_NAMESPACE";
pub const ENV_DEBUG: &str = "REMAIN_DEBUG";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RemainConfig {
    /// Owning application's identifier; prefixes every tag key it writes.
    pub namespace: String,
    pub debug: bool,
    /// Send titles as packets even where the native API exists.
    pub force_packet_titles: bool,
}

impl Default for RemainConfig {
    fn default() -> Self {
        Self {
            namespace: "remain".to_string(),
            debug: false,
            force_packet_titles: false,
        }
    }
}

impl RemainConfig {
    pub fn from_json(raw: &str) -> Result<Self, RemainError> {
        let config: Self =
            serde_json::from_str(raw).map_err(|e| RemainError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `REMAIN_*` variables from the process environment.
    pub fn with_env_overrides(self) -> Result<Self, RemainError> {
        self.with_overrides(|name| env::var(name).ok())
    }

    /// Apply overrides from any variable source.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, RemainError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(namespace) = lookup(ENV_NAMESPACE) {
            self.namespace = namespace;
        }
        if let Some(raw) = lookup(ENV_DEBUG) {
            self.debug = parse_flag(&raw)
                .ok_or_else(|| RemainError::Config(format!("{} must be a boolean, got {:?}", ENV_DEBUG, raw)))?;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), RemainError> {
        Namespace::new(&self.namespace).map(|_| ())
    }

    pub fn namespace(&self) -> Result<Namespace, RemainError> {
        Namespace::new(&self.namespace)
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Validated application identifier, `[A-Za-z0-9_-]+`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace(String);

impl Namespace {
    pub fn new(raw: &str) -> Result<Self, RemainError> {
        if raw.is_empty() {
            return Err(RemainError::Config("namespace must not be empty".to_string()));
        }
        if let Some(bad) = raw
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
        {
            return Err(RemainError::Config(format!(
                "namespace {:?} contains invalid character {:?}",
                raw, bad
            )));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Tag key owned by this namespace: `<namespace>_<tag>`.
    pub fn key(&self, tag: &str) -> String {
        format!("{}_{}", self.0, tag)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
