//! Push command - store the build cache

use crate::cache::{create_backend, Direction};
use crate::cli::args::PushArgs;
use crate::cli::commands::Job;
use crate::config::Config;
use crate::error::DircacheResult;
use crate::transfer::{HttpExecutor, TransferExecutor};
use crate::ui::{self, TaskSpinner, UiContext};

/// Execute the push command
pub async fn execute(args: PushArgs, config: &Config) -> DircacheResult<()> {
    let ctx = UiContext::detect();
    let job = Job::prepare(config, &args.store, &args.key, &args.job)?;
    let backend = create_backend(&job.config, &job.context)?;
    let operation = backend.push(&job.key, &args.directories)?;

    if !operation.is_transfer() {
        HttpExecutor::new().execute(&operation).await;
        ui::step_info(&ctx, "Nothing to upload");
        return Ok(());
    }

    let mut spinner = TaskSpinner::new(&ctx);
    spinner.start(&format!("Storing build cache {}", job.key));
    let outcome = HttpExecutor::new().execute(&operation).await;
    spinner.clear();

    ui::outcome(&ctx, Direction::Push, &outcome);
    Ok(())
}
