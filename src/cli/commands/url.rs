//! Url command - print a presigned URL

use crate::cache::{S3Backend, Verb};
use crate::cli::args::UrlArgs;
use crate::cli::commands::Job;
use crate::config::Config;
use crate::error::{DircacheError, DircacheResult};

/// Execute the url command
pub async fn execute(args: UrlArgs, config: &Config) -> DircacheResult<()> {
    let job = Job::prepare(config, &args.store, &args.key, &args.job)?;
    let store = job.config.store().ok_or_else(|| {
        DircacheError::cache_config("type", "presigned URLs need the s3 cache type")
    })?;
    let backend = S3Backend::new(&job.config, store, &job.context);

    let url = match Verb::from(args.verb) {
        Verb::Get => backend
            .fetch_urls(&job.key)?
            .into_iter()
            .next()
            .ok_or_else(|| DircacheError::Internal("no fetch candidates".to_string()))?,
        Verb::Put => backend.push_url(&job.key)?,
    };

    println!("{}", url);
    Ok(())
}
