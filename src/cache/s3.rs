//! S3 cache backend
//!
//! Fetch and push are expressed as presigned-URL transfers. The URL expiry
//! equals the transfer timeout, so a transfer that finishes within its time
//! budget never hits an expired signature.

use crate::cache::backend::{
    relative_to, CacheBackend, Command, Direction, JobContext, Operation, Severity,
};
use crate::cache::config::{BackendKind, CacheConfig, ObjectStore};
use crate::cache::key::CacheKey;
use crate::cache::signer::{SignedUrlRequest, Verb};
use crate::error::DircacheResult;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Object store backed cache
pub struct S3Backend<'a> {
    config: &'a CacheConfig,
    store: &'a ObjectStore,
    context: &'a JobContext,
}

impl<'a> S3Backend<'a> {
    pub fn new(config: &'a CacheConfig, store: &'a ObjectStore, context: &'a JobContext) -> Self {
        Self {
            config,
            store,
            context,
        }
    }

    /// Presigned URL for one object path
    pub fn url(&self, verb: Verb, object_path: &str, expires: Duration) -> DircacheResult<Url> {
        let location = self.store.location(object_path);
        let url = SignedUrlRequest {
            key_pair: &self.store.key_pair,
            security_token: self.store.security_token.as_ref(),
            verb,
            location: &location,
            expires_secs: expires.as_secs(),
            timestamp: self.context.now,
        }
        .to_url()?;

        debug!(verb = %verb, path = %location.path, host = %location.hostname, "Signed cache URL");
        Ok(url)
    }

    /// GET URLs for every fetch candidate, in lookup order
    pub fn fetch_urls(&self, key: &CacheKey) -> DircacheResult<Vec<Url>> {
        key.fetch_paths(self.config.default_branch())
            .iter()
            .map(|path| self.url(Verb::Get, path, self.config.fetch_timeout()))
            .collect()
    }

    /// PUT URL for the push target
    pub fn push_url(&self, key: &CacheKey) -> DircacheResult<Url> {
        self.url(Verb::Put, &key.object_path(), self.config.push_timeout())
    }
}

impl CacheBackend for S3Backend<'_> {
    fn kind(&self) -> BackendKind {
        BackendKind::S3
    }

    fn fetch(&self, key: &CacheKey) -> DircacheResult<Operation> {
        let urls = self.fetch_urls(key)?;
        let archive = self.context.archive_path(Direction::Fetch);

        Ok(Operation::new(Direction::Fetch)
            .then(Command::log(
                Severity::Info,
                format!("attempting to download cache archive {}", key),
            ))
            .then(Command::DownloadWithTimeout {
                urls,
                archive: archive.clone(),
                timeout_secs: self.config.fetch_timeout().as_secs(),
            })
            .then(Command::Extract {
                archive,
                into: self.context.root.clone(),
            }))
    }

    fn push(&self, key: &CacheKey, directories: &[PathBuf]) -> DircacheResult<Operation> {
        if directories.is_empty() {
            return Ok(Operation::new(Direction::Push).then(Command::log(
                Severity::Warning,
                "no cache directories configured, nothing to upload",
            )));
        }

        let directories = directories
            .iter()
            .map(|dir| relative_to(&self.context.root, dir))
            .collect::<DircacheResult<Vec<_>>>()?;
        let url = self.push_url(key)?;
        let archive = self.context.archive_path(Direction::Push);

        Ok(Operation::new(Direction::Push)
            .then(Command::log(
                Severity::Info,
                format!("storing build cache as {}", key),
            ))
            .then(Command::Compress {
                root: self.context.root.clone(),
                directories,
                archive: archive.clone(),
            })
            .then(Command::UploadWithTimeout {
                url,
                archive,
                timeout_secs: self.config.push_timeout().as_secs(),
            }))
    }
}
