//! Disabled cache backend

use crate::cache::backend::{CacheBackend, Command, Direction, Operation, Severity};
use crate::cache::config::BackendKind;
use crate::cache::key::CacheKey;
use crate::error::DircacheResult;
use std::path::PathBuf;

/// Backend used when caching is turned off
pub struct NoopBackend;

impl CacheBackend for NoopBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Noop
    }

    fn fetch(&self, _key: &CacheKey) -> DircacheResult<Operation> {
        Ok(Operation::new(Direction::Fetch).then(Command::log(
            Severity::Info,
            "build cache disabled, not fetching",
        )))
    }

    fn push(&self, _key: &CacheKey, _directories: &[PathBuf]) -> DircacheResult<Operation> {
        Ok(Operation::new(Direction::Push).then(Command::log(
            Severity::Info,
            "build cache disabled, not pushing",
        )))
    }
}
