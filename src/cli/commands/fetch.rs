//! Fetch command - restore the build cache

use crate::cache::{create_backend, Direction};
use crate::cli::args::FetchArgs;
use crate::cli::commands::Job;
use crate::config::Config;
use crate::error::DircacheResult;
use crate::transfer::{HttpExecutor, TransferExecutor};
use crate::ui::{self, TaskSpinner, UiContext};
use tracing::debug;

/// Execute the fetch command
///
/// Only a cache that cannot be configured fails the command. Whatever
/// happens during the transfer is reported and the build continues.
pub async fn execute(args: FetchArgs, config: &Config) -> DircacheResult<()> {
    let ctx = UiContext::detect();
    let job = Job::prepare(config, &args.store, &args.key, &args.job)?;
    let backend = create_backend(&job.config, &job.context)?;
    let operation = backend.fetch(&job.key)?;

    let executor = HttpExecutor::new();
    debug!("Running fetch with {} executor", executor.name());

    let mut spinner = TaskSpinner::new(&ctx);
    if operation.is_transfer() {
        spinner.start(&format!("Restoring build cache {}", job.key));
    }
    let outcome = executor.execute(&operation).await;
    spinner.clear();

    if operation.is_transfer() {
        ui::outcome(&ctx, Direction::Fetch, &outcome);
    } else {
        ui::step_info(&ctx, "Build cache disabled");
    }
    Ok(())
}
