//! Plan command - print the operation a fetch or push would run

use crate::cache::{create_backend, Direction};
use crate::cli::args::PlanArgs;
use crate::cli::commands::Job;
use crate::config::Config;
use crate::error::DircacheResult;

/// Execute the plan command
pub async fn execute(args: PlanArgs, config: &Config) -> DircacheResult<()> {
    let job = Job::prepare(config, &args.store, &args.key, &args.job)?;
    let backend = create_backend(&job.config, &job.context)?;

    let operation = match Direction::from(args.direction) {
        Direction::Fetch => backend.fetch(&job.key)?,
        Direction::Push => backend.push(&job.key, &args.directories)?,
    };

    println!("{}", serde_json::to_string_pretty(&operation)?);
    Ok(())
}
