//! Error types for dircache
//!
//! All fallible compile-time paths return `DircacheResult<T>`. Runtime
//! transfer failures live in [`crate::transfer::TransferError`] instead and
//! never surface as a `DircacheError`.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for dircache operations
pub type DircacheResult<T> = Result<T, DircacheError>;

/// All errors that can abort cache step generation
#[derive(Error, Debug)]
pub enum DircacheError {
    // Cache settings errors
    #[error("Invalid cache configuration: {field}: {reason}")]
    CacheConfigInvalid { field: &'static str, reason: String },

    #[error("Unknown cache type: {0}")]
    UnknownCacheType(String),

    #[error("Invalid cache key: {0}")]
    CacheKeyInvalid(String),

    // Signing errors
    #[error("Cannot sign request: {reason}")]
    Signature { reason: String },

    // Configuration file errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DircacheError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a cache configuration error for a settings field
    pub fn cache_config(field: &'static str, reason: impl Into<String>) -> Self {
        Self::CacheConfigInvalid {
            field,
            reason: reason.into(),
        }
    }

    /// Create a signing error
    pub fn signature(reason: impl Into<String>) -> Self {
        Self::Signature {
            reason: reason.into(),
        }
    }

    /// Whether this error is raised while the cache step is being generated,
    /// before any build runs
    pub fn is_compile_time(&self) -> bool {
        matches!(
            self,
            Self::CacheConfigInvalid { .. }
                | Self::UnknownCacheType(_)
                | Self::CacheKeyInvalid(_)
                | Self::Signature { .. }
                | Self::ConfigInvalid { .. }
        )
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::CacheConfigInvalid { field, .. } => match *field {
                "bucket" => Some("Set cache.s3.bucket or export AWS_S3_BUCKET"),
                "access_key_id" => Some("Set cache.s3.access_key_id or export AWS_ACCESS_KEY_ID"),
                "secret_access_key" => {
                    Some("Set cache.s3.secret_access_key or export AWS_SECRET_ACCESS_KEY")
                }
                "region" => Some("Set cache.s3.region or export AWS_REGION"),
                "fetch_timeout" | "push_timeout" => Some("Timeouts are whole seconds above zero"),
                "directories" => Some("Cache directories must live inside the build directory (--root)"),
                _ => None,
            },
            Self::UnknownCacheType(_) => Some("Supported cache types: s3, noop"),
            _ => None,
        }
    }
}
