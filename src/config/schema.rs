//! Configuration schema for dircache
//!
//! Configuration is stored at `~/.config/dircache/config.toml`. These are
//! raw, unvalidated settings; [`crate::cache::CacheConfig::build`] turns the
//! `[cache]` section into something a backend can use.

use serde::{Deserialize, Serialize};

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Build cache settings
    pub cache: CacheSettings,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

/// Raw cache settings as merged from file and command line
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Backend type: "s3" or "noop"
    #[serde(rename = "type")]
    pub kind: String,

    /// Seconds the build waits for a cache download
    pub fetch_timeout: i64,

    /// Seconds the build waits for a cache upload
    pub push_timeout: i64,

    /// Branch whose cache is used when the job's own branch has none
    pub default_branch: Option<String>,

    /// Object store settings
    pub s3: S3Settings,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            kind: "s3".to_string(),
            fetch_timeout: 20,
            push_timeout: 60,
            default_branch: Some("master".to_string()),
            s3: S3Settings::default(),
        }
    }
}

/// Object store settings
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct S3Settings {
    /// "http" or "https"
    pub scheme: String,

    /// Bucket holding cache archives
    pub bucket: Option<String>,

    /// Bucket region
    pub region: String,

    /// Custom endpoint (host[:port]) for S3-compatible stores; enables
    /// path-style addressing
    pub endpoint: Option<String>,

    /// Access key id
    pub access_key_id: Option<String>,

    /// Secret access key (never written back out)
    #[serde(skip_serializing)]
    pub secret_access_key: Option<String>,

    /// Session token for temporary credentials (never written back out)
    #[serde(skip_serializing)]
    pub session_token: Option<String>,
}

impl Default for S3Settings {
    fn default() -> Self {
        Self {
            scheme: "https".to_string(),
            bucket: None,
            region: "us-east-1".to_string(),
            endpoint: None,
            access_key_id: None,
            secret_access_key: None,
            session_token: None,
        }
    }
}

impl std::fmt::Debug for S3Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Settings")
            .field("scheme", &self.scheme)
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field("access_key_id", &self.access_key_id)
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "<redacted>"),
            )
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}
