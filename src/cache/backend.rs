//! Cache backend abstraction
//!
//! A backend turns a cache key into an [`Operation`]: an ordered list of
//! abstract commands that whatever runs the build step later executes. A
//! backend never performs I/O itself.

use crate::cache::config::BackendKind;
use crate::cache::key::CacheKey;
use crate::error::{DircacheError, DircacheResult};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Component, Path, PathBuf};
use url::Url;

/// Per-job facts a backend needs besides its configuration
#[derive(Debug, Clone)]
pub struct JobContext {
    /// Directory cache archives are extracted into and compressed from
    pub root: PathBuf,
    /// Directory holding archives while they are transferred
    pub scratch_dir: PathBuf,
    /// Signing instant, captured once for the job
    pub now: DateTime<Utc>,
}

impl JobContext {
    pub fn new(root: impl Into<PathBuf>, scratch_dir: impl Into<PathBuf>, now: DateTime<Utc>) -> Self {
        Self {
            root: root.into(),
            scratch_dir: scratch_dir.into(),
            now,
        }
    }

    pub(crate) fn archive_path(&self, direction: Direction) -> PathBuf {
        self.scratch_dir.join(format!("{}.tgz", direction.name()))
    }
}

/// Which way an operation moves the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Fetch,
    Push,
}

impl Direction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Fetch => "fetch",
            Self::Push => "push",
        }
    }
}

/// Severity of a log command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// One step of an operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Command {
    /// Print a message to the build log
    Log { message: String, severity: Severity },

    /// Download the first existing object among `urls` into `archive`,
    /// giving up after `timeout_secs`
    DownloadWithTimeout {
        urls: Vec<Url>,
        archive: PathBuf,
        timeout_secs: u64,
    },

    /// Unpack `archive` into `into`
    Extract { archive: PathBuf, into: PathBuf },

    /// Pack `directories` (relative to `root`) into `archive`
    Compress {
        root: PathBuf,
        directories: Vec<PathBuf>,
        archive: PathBuf,
    },

    /// Upload `archive` to `url`, giving up after `timeout_secs`
    UploadWithTimeout {
        url: Url,
        archive: PathBuf,
        timeout_secs: u64,
    },
}

impl Command {
    pub fn log(severity: Severity, message: impl Into<String>) -> Self {
        Self::Log {
            message: message.into(),
            severity,
        }
    }
}

/// Abstract transfer handed to the step renderer or executor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Operation {
    pub direction: Direction,
    pub commands: Vec<Command>,
}

impl Operation {
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            commands: Vec::new(),
        }
    }

    pub fn then(mut self, command: Command) -> Self {
        self.commands.push(command);
        self
    }

    /// Whether the operation moves any data
    pub fn is_transfer(&self) -> bool {
        self.commands.iter().any(|c| {
            matches!(
                c,
                Command::DownloadWithTimeout { .. } | Command::UploadWithTimeout { .. }
            )
        })
    }
}

/// Strategy for persisting and restoring a build's cache directories
pub trait CacheBackend {
    /// Which registered kind this backend implements
    fn kind(&self) -> BackendKind;

    /// Build the operation restoring the cache for `key`
    fn fetch(&self, key: &CacheKey) -> DircacheResult<Operation>;

    /// Build the operation storing `directories` under `key`
    fn push(&self, key: &CacheKey, directories: &[PathBuf]) -> DircacheResult<Operation>;
}

/// Express `dir` relative to `root`
///
/// Cache archives are unpacked into the build directory, so a directory
/// outside it could never be restored.
pub(crate) fn relative_to(root: &Path, dir: &Path) -> DircacheResult<PathBuf> {
    let relative = dir.strip_prefix(root).unwrap_or(dir);
    let inside = relative.components().next().is_some()
        && relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));

    if !inside {
        return Err(DircacheError::cache_config(
            "directories",
            format!(
                "{} is not inside the build directory {}",
                dir.display(),
                root.display()
            ),
        ));
    }
    Ok(relative.to_path_buf())
}
