//! CLI argument definitions using clap derive

use crate::cache::{Direction, Verb};
use crate::config::CacheSettings;
use chrono::{DateTime, Utc};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// dircache - signed build cache transfers
///
/// Restores and stores directory caches of CI builds through presigned
/// object store URLs, so builds never see long-lived credentials.
#[derive(Parser, Debug)]
#[command(name = "dircache")]
#[command(author, version, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "DIRCACHE_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print a presigned URL for the cache archive
    Url(UrlArgs),

    /// Print the operation a fetch or push would run, as JSON
    Plan(PlanArgs),

    /// Restore the build cache into the build directory
    Fetch(FetchArgs),

    /// Archive directories and store them as the build cache
    Push(PushArgs),

    /// Show or initialize configuration
    Config(ConfigArgs),
}

/// Which cache archive a command addresses
#[derive(Args, Debug, Clone)]
pub struct KeyArgs {
    /// Repository slug (owner/name)
    #[arg(long)]
    pub slug: String,

    /// Branch the build runs on
    #[arg(long)]
    pub branch: String,

    /// Pull request number, when building a pull request
    #[arg(long)]
    pub pull_request: Option<u64>,

    /// Branch the pull request targets
    #[arg(long, requires = "pull_request")]
    pub base_branch: Option<String>,

    /// Cache name (default: cache)
    #[arg(long)]
    pub name: Option<String>,

    /// Extra key material, e.g. OS or toolchain version
    #[arg(long)]
    pub tag: Option<String>,
}

/// Cache settings given on the command line; they override the config file
#[derive(Args, Debug, Clone, Default)]
pub struct StoreArgs {
    /// Cache type (s3, noop)
    #[arg(long = "type", value_name = "TYPE")]
    pub cache_type: Option<String>,

    /// Bucket holding cache archives
    #[arg(long, env = "AWS_S3_BUCKET")]
    pub bucket: Option<String>,

    /// Access key id used for signing
    #[arg(long, env = "AWS_ACCESS_KEY_ID")]
    pub access_key_id: Option<String>,

    /// Secret access key used for signing
    #[arg(long, env = "AWS_SECRET_ACCESS_KEY", hide_env_values = true)]
    pub secret_access_key: Option<String>,

    /// Session token for temporary credentials
    #[arg(long, env = "AWS_SESSION_TOKEN", hide_env_values = true)]
    pub session_token: Option<String>,

    /// Bucket region
    #[arg(long, env = "AWS_REGION")]
    pub region: Option<String>,

    /// URL scheme (http, https)
    #[arg(long)]
    pub scheme: Option<String>,

    /// S3-compatible endpoint (host[:port]); switches to path-style URLs
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Seconds to wait for a cache download
    #[arg(long, allow_negative_numbers = true)]
    pub fetch_timeout: Option<i64>,

    /// Seconds to wait for a cache upload
    #[arg(long, allow_negative_numbers = true)]
    pub push_timeout: Option<i64>,

    /// Branch whose cache seeds branches without one
    #[arg(long)]
    pub default_branch: Option<String>,
}

impl StoreArgs {
    /// Overlay the flags that were given onto file settings
    pub fn apply(&self, settings: &mut CacheSettings) {
        fn set<T: Clone>(target: &mut T, value: &Option<T>) {
            if let Some(value) = value {
                *target = value.clone();
            }
        }
        fn set_opt<T: Clone>(target: &mut Option<T>, value: &Option<T>) {
            if value.is_some() {
                *target = value.clone();
            }
        }

        set(&mut settings.kind, &self.cache_type);
        set(&mut settings.fetch_timeout, &self.fetch_timeout);
        set(&mut settings.push_timeout, &self.push_timeout);
        set_opt(&mut settings.default_branch, &self.default_branch);

        let s3 = &mut settings.s3;
        set(&mut s3.scheme, &self.scheme);
        set(&mut s3.region, &self.region);
        set_opt(&mut s3.bucket, &self.bucket);
        set_opt(&mut s3.endpoint, &self.endpoint);
        set_opt(&mut s3.access_key_id, &self.access_key_id);
        set_opt(&mut s3.secret_access_key, &self.secret_access_key);
        set_opt(&mut s3.session_token, &self.session_token);
    }
}

/// Where the job runs
#[derive(Args, Debug, Clone, Default)]
pub struct JobArgs {
    /// Build directory (default: current directory)
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Directory for archives in transit (default: system temp dir)
    #[arg(long)]
    pub scratch_dir: Option<PathBuf>,

    /// Signing time as RFC 3339 (default: now)
    #[arg(long)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// HTTP verb a URL is signed for
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum VerbArg {
    Get,
    Put,
}

impl From<VerbArg> for Verb {
    fn from(verb: VerbArg) -> Self {
        match verb {
            VerbArg::Get => Verb::Get,
            VerbArg::Put => Verb::Put,
        }
    }
}

/// Direction of a planned operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DirectionArg {
    Fetch,
    Push,
}

impl From<DirectionArg> for Direction {
    fn from(direction: DirectionArg) -> Self {
        match direction {
            DirectionArg::Fetch => Direction::Fetch,
            DirectionArg::Push => Direction::Push,
        }
    }
}

/// Arguments for the url command
#[derive(Parser, Debug)]
pub struct UrlArgs {
    /// Verb to sign for: get (first fetch candidate) or put (push target)
    #[arg(long, value_enum, default_value = "get")]
    pub verb: VerbArg,

    #[command(flatten)]
    pub key: KeyArgs,

    #[command(flatten)]
    pub store: StoreArgs,

    #[command(flatten)]
    pub job: JobArgs,
}

/// Arguments for the plan command
#[derive(Parser, Debug)]
pub struct PlanArgs {
    /// Operation to plan
    #[arg(value_enum)]
    pub direction: DirectionArg,

    /// Directories to cache (push only)
    pub directories: Vec<PathBuf>,

    #[command(flatten)]
    pub key: KeyArgs,

    #[command(flatten)]
    pub store: StoreArgs,

    #[command(flatten)]
    pub job: JobArgs,
}

/// Arguments for the fetch command
#[derive(Parser, Debug)]
pub struct FetchArgs {
    #[command(flatten)]
    pub key: KeyArgs,

    #[command(flatten)]
    pub store: StoreArgs,

    #[command(flatten)]
    pub job: JobArgs,
}

/// Arguments for the push command
#[derive(Parser, Debug)]
pub struct PushArgs {
    /// Directories to cache, relative to the build directory
    #[arg(required = true)]
    pub directories: Vec<PathBuf>,

    #[command(flatten)]
    pub key: KeyArgs,

    #[command(flatten)]
    pub store: StoreArgs,

    #[command(flatten)]
    pub job: JobArgs,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration (secrets omitted)
    Show,

    /// Show configuration file path
    Path,

    /// Write a default configuration file
    Init {
        /// Overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}
