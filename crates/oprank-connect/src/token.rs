//! Connect token resolution.
//!
//! The store config never holds the token itself, only a ref to it:
//!
//! - `env:NAME` reads the process environment
//! - `file:/path` reads a file, e.g. a mounted cluster secret
//!
//! Surrounding whitespace (a trailing newline in a token file) is trimmed.

use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("unknown token ref scheme in '{0}' (expected env: or file:)")]
    UnknownScheme(String),

    #[error("environment variable '{0}' not found")]
    EnvNotFound(String),

    #[error("failed to read token file {path}: {message}")]
    FileRead { path: String, message: String },

    #[error("empty connect token for '{0}'")]
    Empty(String),
}

/// Resolve a token ref to the bearer token.
pub fn resolve_token(ref_str: &str) -> Result<String, TokenError> {
    let raw = if let Some(name) = ref_str.strip_prefix("env:") {
        if name.is_empty() {
            return Err(TokenError::Empty(ref_str.to_owned()));
        }
        std::env::var(name).map_err(|_| TokenError::EnvNotFound(name.to_owned()))?
    } else if let Some(path) = ref_str.strip_prefix("file:") {
        if path.is_empty() {
            return Err(TokenError::Empty(ref_str.to_owned()));
        }
        std::fs::read_to_string(Path::new(path)).map_err(|e| TokenError::FileRead {
            path: path.to_owned(),
            message: e.to_string(),
        })?
    } else {
        return Err(TokenError::UnknownScheme(ref_str.to_owned()));
    };

    let token = raw.trim();
    if token.is_empty() {
        return Err(TokenError::Empty(ref_str.to_owned()));
    }
    Ok(token.to_owned())
}
