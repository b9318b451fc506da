//! Store configuration.
//!
//! The store file lives at `~/.oprank/config.toml` unless `OPRANK_CONFIG`
//! points elsewhere:
//!
//! ```toml
//! connect_host = "https://connect.example.com"
//! token_ref = "env:OP_CONNECT_TOKEN"
//! timeout_secs = 30
//!
//! [vaults]
//! staging = 1
//! shared = 2
//! ```
//!
//! Vault ranks are the only input resolution needs; the rest configures the
//! Connect backend.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::order::VaultRank;

/// Environment variable overriding the config file location.
pub const CONFIG_PATH_ENV: &str = "OPRANK_CONFIG";

/// Environment variable overriding `token_ref` from the file.
pub const TOKEN_REF_ENV: &str = "OPRANK_CONNECT_TOKEN_REF";

/// Token ref used when the file sets none.
pub const DEFAULT_TOKEN_REF: &str = "env:OP_CONNECT_TOKEN";

/// Schemes a connect token ref may use.
pub const TOKEN_REF_SCHEMES: &[&str] = &["env:", "file:"];

/// Commented sample written by `oprank init`.
pub const SAMPLE_CONFIG: &str = r#"# oprank store configuration
#
# Items are looked up in every vault below, lowest rank first. The first
# vault holding exactly one item with the requested title wins.

# 1Password Connect server. Plain http:// is accepted for localhost only
# unless allow_http = true.
connect_host = "https://connect.example.com"

# Where the Connect token comes from: env:NAME or file:/path/to/token
token_ref = "env:OP_CONNECT_TOKEN"

# Per-request timeout.
timeout_secs = 30

[vaults]
# my-vault = 1
# my-shared-vault = 2
"#;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Base URL of the Connect server.
    pub connect_host: String,

    #[serde(default = "default_token_ref")]
    pub token_ref: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Accept a plain `http://` host that is not localhost.
    #[serde(default)]
    pub allow_http: bool,

    /// Vault name -> precedence rank.
    #[serde(default)]
    pub vaults: HashMap<String, VaultRank>,
}

fn default_token_ref() -> String {
    DEFAULT_TOKEN_REF.to_owned()
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {message}")]
    Read { path: String, message: String },

    #[error("TOML parse error: {0}")]
    Parse(String),

    #[error("connect_host must not be empty")]
    EmptyHost,

    #[error("insecure connect_host rejected: {0} (use https://, or http:// for localhost)")]
    InsecureHost(String),

    #[error("unsupported connect_host scheme: {0}")]
    UnsupportedScheme(String),

    #[error("no vaults configured")]
    NoVaults,

    #[error("vault names must not be empty")]
    EmptyVaultName,

    #[error("invalid token_ref '{0}' (expected env: or file:)")]
    InvalidTokenRef(String),

    #[error("timeout_secs must be > 0")]
    ZeroTimeout,
}

impl StoreConfig {
    /// Check the store for misconfiguration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let host = self.connect_host.trim();
        if host.is_empty() {
            return Err(ConfigError::EmptyHost);
        }
        if let Some(rest) = host.strip_prefix("http://") {
            if !self.allow_http && !is_loopback(rest) {
                return Err(ConfigError::InsecureHost(host.to_owned()));
            }
        } else if !host.starts_with("https://") {
            return Err(ConfigError::UnsupportedScheme(host.to_owned()));
        }

        if self.vaults.is_empty() {
            return Err(ConfigError::NoVaults);
        }
        if self.vaults.keys().any(|name| name.trim().is_empty()) {
            return Err(ConfigError::EmptyVaultName);
        }

        let ref_ok = TOKEN_REF_SCHEMES
            .iter()
            .any(|scheme| self.token_ref.strip_prefix(scheme).is_some_and(|r| !r.is_empty()));
        if !ref_ok {
            return Err(ConfigError::InvalidTokenRef(self.token_ref.clone()));
        }

        if self.timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }
}

/// Whether the host part of `http://<rest>` is localhost.
fn is_loopback(rest: &str) -> bool {
    let authority = rest.split('/').next().unwrap_or_default();
    let host = if let Some(bracketed) = authority.strip_prefix('[') {
        // IPv6 literal: the port, if any, follows the closing bracket.
        bracketed.split_once(']').map_or("", |(h, _)| h)
    } else {
        authority.rsplit_once(':').map_or(authority, |(h, _)| h)
    };
    matches!(host, "localhost" | "127.0.0.1" | "::1")
}

/// Parse and validate a store from TOML.
pub fn parse_config(toml_str: &str) -> Result<StoreConfig, ConfigError> {
    let config: StoreConfig =
        toml_edit::de::from_str(toml_str).map_err(|e| ConfigError::Parse(e.to_string()))?;
    config.validate()?;
    Ok(config)
}

/// Load the store at `path`, applying the `OPRANK_CONNECT_TOKEN_REF` override.
pub fn load_config(path: &Path) -> Result<StoreConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    let mut config = parse_config(&contents)?;
    if let Ok(token_ref) = std::env::var(TOKEN_REF_ENV) {
        config.token_ref = token_ref;
        config.validate()?;
    }
    Ok(config)
}

/// `$OPRANK_CONFIG`, or `~/.oprank/config.toml`.
pub fn config_path() -> PathBuf {
    std::env::var(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
            PathBuf::from(home).join(".oprank").join("config.toml")
        })
}
