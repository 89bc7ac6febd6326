//! Validated cache settings
//!
//! `CacheConfig::build` is the single place where malformed or absent
//! settings are rejected. Everything downstream takes a `&CacheConfig` and
//! assumes it is usable.

use crate::cache::signer::{KeyPair, Location, SecurityToken};
use crate::config::schema::{CacheSettings, S3Settings};
use crate::error::{DircacheError, DircacheResult};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

/// Known cache backend kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// S3 or an S3-compatible object store
    S3,
    /// Caching disabled
    Noop,
}

impl BackendKind {
    /// Whether this kind stores archives in an object store
    pub fn requires_object_store(&self) -> bool {
        matches!(self, Self::S3)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::S3 => "s3",
            Self::Noop => "noop",
        }
    }
}

impl FromStr for BackendKind {
    type Err = DircacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "s3" => Ok(Self::S3),
            "noop" | "none" => Ok(Self::Noop),
            other => Err(DircacheError::UnknownCacheType(other.to_string())),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// URL scheme of the object store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }
}

/// Object store coordinates and credentials
#[derive(Debug, Clone)]
pub struct ObjectStore {
    pub scheme: Scheme,
    pub bucket: String,
    pub region: String,
    /// Custom host[:port]; switches to path-style addressing
    pub endpoint: Option<String>,
    pub key_pair: KeyPair,
    pub security_token: Option<SecurityToken>,
}

impl ObjectStore {
    /// Resolve an object key to a signable location
    ///
    /// AWS endpoints use virtual-hosted addressing
    /// (`bucket.s3.region.amazonaws.com/key`); a custom endpoint uses
    /// path-style (`endpoint/bucket/key`).
    pub fn location(&self, object_key: &str) -> Location {
        let object_key = object_key.trim_start_matches('/');
        let (hostname, path) = match &self.endpoint {
            Some(endpoint) => (endpoint.clone(), format!("/{}/{}", self.bucket, object_key)),
            None if self.region == "us-east-1" => (
                format!("{}.s3.amazonaws.com", self.bucket),
                format!("/{}", object_key),
            ),
            None => (
                format!("{}.s3.{}.amazonaws.com", self.bucket, self.region),
                format!("/{}", object_key),
            ),
        };

        Location {
            scheme: self.scheme.as_str().to_string(),
            hostname,
            path,
            region: self.region.clone(),
        }
    }
}

/// Immutable, validated cache settings for one build job
#[derive(Debug, Clone)]
pub struct CacheConfig {
    kind: BackendKind,
    fetch_timeout: Duration,
    push_timeout: Duration,
    default_branch: Option<String>,
    store: Option<ObjectStore>,
}

impl CacheConfig {
    /// Validate raw settings
    pub fn build(settings: &CacheSettings) -> DircacheResult<Self> {
        let kind: BackendKind = settings.kind.parse()?;
        let fetch_timeout = positive_seconds("fetch_timeout", settings.fetch_timeout)?;
        let push_timeout = positive_seconds("push_timeout", settings.push_timeout)?;

        let store = if kind.requires_object_store() {
            Some(build_store(&settings.s3)?)
        } else {
            None
        };

        let default_branch = settings
            .default_branch
            .as_deref()
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .map(str::to_string);

        debug!(
            kind = %kind,
            fetch_timeout = fetch_timeout.as_secs(),
            push_timeout = push_timeout.as_secs(),
            "Cache configuration validated"
        );

        Ok(Self {
            kind,
            fetch_timeout,
            push_timeout,
            default_branch,
            store,
        })
    }

    pub fn kind(&self) -> BackendKind {
        self.kind
    }

    pub fn fetch_timeout(&self) -> Duration {
        self.fetch_timeout
    }

    pub fn push_timeout(&self) -> Duration {
        self.push_timeout
    }

    pub fn default_branch(&self) -> Option<&str> {
        self.default_branch.as_deref()
    }

    /// Object store settings; always present for kinds that need one
    pub fn store(&self) -> Option<&ObjectStore> {
        self.store.as_ref()
    }
}

fn positive_seconds(field: &'static str, value: i64) -> DircacheResult<Duration> {
    if value <= 0 {
        return Err(DircacheError::cache_config(
            field,
            format!("must be a positive number of seconds, got {}", value),
        ));
    }
    Ok(Duration::from_secs(value as u64))
}

fn required(field: &'static str, value: Option<&str>) -> DircacheResult<String> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(DircacheError::cache_config(field, "is required for the s3 cache")),
    }
}

fn build_store(s3: &S3Settings) -> DircacheResult<ObjectStore> {
    let scheme = match s3.scheme.trim().to_ascii_lowercase().as_str() {
        "http" => Scheme::Http,
        "https" => Scheme::Https,
        other => {
            return Err(DircacheError::cache_config(
                "scheme",
                format!("must be http or https, got {:?}", other),
            ))
        }
    };

    let bucket = required("bucket", s3.bucket.as_deref())?;
    if bucket.contains('/') {
        return Err(DircacheError::cache_config("bucket", "must not contain '/'"));
    }

    let region = required("region", Some(s3.region.as_str()))?;
    let access_key_id = required("access_key_id", s3.access_key_id.as_deref())?;
    let secret = required("secret_access_key", s3.secret_access_key.as_deref())?;

    let endpoint = match s3.endpoint.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(e) if e.contains("://") || e.contains('/') => {
            return Err(DircacheError::cache_config(
                "endpoint",
                "must be host[:port] without scheme or path",
            ))
        }
        Some(e) => Some(e.to_string()),
    };

    let security_token = s3
        .session_token
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(SecurityToken::new);

    Ok(ObjectStore {
        scheme,
        bucket,
        region,
        endpoint,
        key_pair: KeyPair::new(access_key_id, secret),
        security_token,
    })
}
