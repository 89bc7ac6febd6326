//! CLI command implementations

pub mod config;
pub mod fetch;
pub mod plan;
pub mod push;
pub mod url;

pub use config::execute as config;
pub use fetch::execute as fetch;
pub use plan::execute as plan;
pub use push::execute as push;
pub use url::execute as url;

use crate::cache::{CacheConfig, CacheKey, JobContext};
use crate::cli::args::{JobArgs, KeyArgs, StoreArgs};
use crate::config::Config;
use crate::error::{DircacheError, DircacheResult};
use chrono::Utc;
use tracing::debug;

/// Everything a cache command needs, validated
pub(crate) struct Job {
    pub config: CacheConfig,
    pub key: CacheKey,
    pub context: JobContext,
}

impl Job {
    /// Merge flags over file settings and validate the result
    pub(crate) fn prepare(
        config: &Config,
        store: &StoreArgs,
        key: &KeyArgs,
        job: &JobArgs,
    ) -> DircacheResult<Self> {
        let mut settings = config.cache.clone();
        store.apply(&mut settings);
        let cache_config = CacheConfig::build(&settings)?;

        let mut cache_key = CacheKey::new(&key.slug, &key.branch)?;
        if let Some(number) = key.pull_request {
            cache_key = cache_key.with_pull_request(number, key.base_branch.as_deref())?;
        }
        if let Some(ref name) = key.name {
            cache_key = cache_key.with_name(name)?;
        }
        if let Some(ref tag) = key.tag {
            cache_key = cache_key.with_tag(tag);
        }

        let root = match job.root {
            Some(ref root) => root.clone(),
            None => std::env::current_dir()
                .map_err(|e| DircacheError::io("getting current directory", e))?,
        };
        let scratch_dir = job
            .scratch_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("dircache"));
        let now = job.timestamp.unwrap_or_else(Utc::now);

        debug!("Cache key {} at {}", cache_key, now.to_rfc3339());
        Ok(Self {
            config: cache_config,
            key: cache_key,
            context: JobContext::new(root, scratch_dir, now),
        })
    }
}
