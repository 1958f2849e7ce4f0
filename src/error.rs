use std::path::PathBuf;
use thiserror::Error;

use crate::value::ValueError;

#[derive(Debug, Error)]
pub enum PlugfigError {
    #[error("Unexpected type, expecting a struct (or a Box/Some holding one)")]
    UnexpectedType,

    #[error("Unsupported plugin: {0} is neither a visitor nor a walker")]
    UnsupportedPlugin(String),

    /// Help was requested; callers usually print the usage table and exit.
    #[error("Usage requested")]
    Usage,

    #[error(transparent)]
    Value(#[from] ValueError),

    #[error("Invalid value for '{field}' from {origin}: {source}")]
    InvalidField {
        field: String,
        origin: String,
        source: ValueError,
    },

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("Unknown key '{key}' in {path}")]
    UnknownKey { key: String, path: PathBuf },

    #[error("Unsupported config file extension for {0}")]
    UnsupportedExtension(PathBuf),

    #[error("Missing required flags: {}", .0.join(", "))]
    MissingFlags(Vec<String>),

    #[error("Unexpected argument '{0}'")]
    BadArgument(String),

    #[cfg(feature = "clap")]
    #[error(transparent)]
    Flag(#[from] clap::Error),

    #[error("Failed to fetch secret '{name}': {reason}")]
    Secret { name: String, reason: String },

    #[error("Invalid {tag} tag on '{field}': {reason}")]
    InvalidTag {
        tag: &'static str,
        field: String,
        reason: String,
    },

    #[error("Missing required value for '{field}'")]
    Required { field: String },

    #[error(transparent)]
    Custom(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl PlugfigError {
    /// Attribute a value error to a field and the source that supplied it.
    pub fn invalid_field(field: &str, origin: impl Into<String>, source: ValueError) -> Self {
        PlugfigError::InvalidField {
            field: field.to_string(),
            origin: origin.into(),
            source,
        }
    }

    pub fn is_usage(&self) -> bool {
        matches!(self, PlugfigError::Usage)
    }
}
