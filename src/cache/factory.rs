//! Backend registration
//!
//! Every [`BackendKind`] has exactly one arm here. Adding a backend means a
//! new kind variant and a new arm.

use crate::cache::backend::{CacheBackend, JobContext};
use crate::cache::config::{BackendKind, CacheConfig};
use crate::cache::noop::NoopBackend;
use crate::cache::s3::S3Backend;
use crate::error::{DircacheError, DircacheResult};
use tracing::debug;

/// Create the backend selected by `config`
///
/// # Arguments
/// * `config` - Validated cache configuration
/// * `context` - Per-job working directory, scratch directory and signing instant
pub fn create_backend<'a>(
    config: &'a CacheConfig,
    context: &'a JobContext,
) -> DircacheResult<Box<dyn CacheBackend + 'a>> {
    debug!("Creating {} cache backend", config.kind());

    match config.kind() {
        BackendKind::S3 => {
            let store = config.store().ok_or_else(|| {
                DircacheError::Internal("s3 cache configured without object store".to_string())
            })?;
            Ok(Box::new(S3Backend::new(config, store, context)))
        }
        BackendKind::Noop => Ok(Box::new(NoopBackend)),
    }
}
