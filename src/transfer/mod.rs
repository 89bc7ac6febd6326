//! Executing cache operations
//!
//! Runs the commands of an [`Operation`] and reduces whatever happens to a
//! [`TransferOutcome`]. Nothing here can fail a build: misses, timeouts and
//! errors are logged and reported, never returned as `Err`.

pub mod archive;
mod http;

pub use http::HttpExecutor;

use crate::cache::{Direction, Operation, Severity};
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;
use tracing::{error, info, warn};

/// Why a transfer did not complete
#[derive(Error, Debug)]
pub enum TransferError {
    #[error("no cache archive found")]
    Miss,

    #[error("transfer timed out after {0}s")]
    Timeout(u64),

    #[error("network failure: {0}")]
    NetworkFailure(String),

    #[error("object store answered {verb} with HTTP {status}")]
    Rejected { verb: &'static str, status: u16 },

    #[error("object store refused {verb} with HTTP {status} ({code})")]
    Denied {
        verb: &'static str,
        status: u16,
        code: String,
    },

    #[error("none of the cache directories exist, nothing to upload")]
    NothingArchived,

    #[error("{context}: {source}")]
    Archive {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl TransferError {
    pub(crate) fn archive(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Archive {
            context: context.into(),
            source,
        }
    }
}

/// Terminal result of executing one operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    Success,
    /// Nothing stored under any candidate key
    Miss,
    /// Execution timeout hit; the transfer was abandoned
    Timeout,
    /// Nothing worth transferring; the stored cache is left alone
    Skipped(String),
    Error(String),
}

impl TransferOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Severity the outcome is reported with
    pub fn severity(&self) -> Severity {
        match self {
            Self::Success | Self::Miss => Severity::Info,
            Self::Timeout | Self::Skipped(_) => Severity::Warning,
            Self::Error(_) => Severity::Error,
        }
    }

    /// Log the outcome of a `direction` operation
    pub fn log(&self, direction: Direction) {
        match (self, direction) {
            (Self::Success, Direction::Fetch) => info!("Build cache restored"),
            (Self::Success, Direction::Push) => info!("Build cache stored"),
            (Self::Miss, _) => info!("No build cache found, continuing without it"),
            (Self::Timeout, Direction::Fetch) => {
                warn!("Build cache download timed out, continuing without it")
            }
            (Self::Timeout, Direction::Push) => {
                warn!("Build cache upload timed out, cache not updated")
            }
            (Self::Skipped(reason), _) => warn!("Build cache not updated: {}", reason),
            (Self::Error(detail), Direction::Fetch) => {
                error!("Could not restore build cache: {}", detail)
            }
            (Self::Error(detail), Direction::Push) => {
                error!("Could not store build cache: {}", detail)
            }
        }
    }
}

impl From<Result<(), TransferError>> for TransferOutcome {
    fn from(result: Result<(), TransferError>) -> Self {
        match result {
            Ok(()) => Self::Success,
            Err(TransferError::Miss) => Self::Miss,
            Err(TransferError::Timeout(_)) => Self::Timeout,
            Err(e @ TransferError::NothingArchived) => Self::Skipped(e.to_string()),
            Err(other) => Self::Error(other.to_string()),
        }
    }
}

impl fmt::Display for TransferOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Miss => write!(f, "miss"),
            Self::Timeout => write!(f, "timeout"),
            Self::Skipped(reason) => write!(f, "skipped: {}", reason),
            Self::Error(detail) => write!(f, "error: {}", detail),
        }
    }
}

/// Runs operations produced by a cache backend
#[async_trait]
pub trait TransferExecutor: Send + Sync {
    /// Execute every command in order; the first failing command ends the
    /// operation
    async fn execute(&self, operation: &Operation) -> TransferOutcome;

    /// Human-readable executor name for display
    fn name(&self) -> &'static str;
}

/// Emit a log command through tracing
pub(crate) fn emit(severity: Severity, message: &str) {
    match severity {
        Severity::Info => info!("{}", message),
        Severity::Warning => warn!("{}", message),
        Severity::Error => error!("{}", message),
    }
}
