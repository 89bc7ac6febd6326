//! Terminal output for cache commands
//!
//! Uses `cliclack` log lines and spinners when a developer runs dircache
//! interactively, and plain `[OK]`/`[WARN]` lines inside CI jobs.

mod context;
mod output;
mod progress;

pub use context::UiContext;
pub use output::{key_value, outcome, step_error_detail, step_info, step_ok, step_warn, step_warn_hint};
pub use progress::TaskSpinner;
