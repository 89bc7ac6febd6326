//! Output functions for consistent CLI formatting

use super::context::UiContext;
use crate::cache::{Direction, Severity};
use crate::transfer::TransferOutcome;
use console::style;

/// Display a success step
pub fn step_ok(ctx: &UiContext, message: &str) {
    if ctx.use_fancy_output() {
        cliclack::log::success(message).ok();
    } else {
        println!("  {} {}", style("[OK]").green(), message);
    }
}

/// Display a warning step
pub fn step_warn(ctx: &UiContext, message: &str) {
    if ctx.use_fancy_output() {
        cliclack::log::warning(message).ok();
    } else {
        println!("  {} {}", style("[WARN]").yellow(), message);
    }
}

/// Display a warning step with hint
pub fn step_warn_hint(ctx: &UiContext, message: &str, hint: &str) {
    if ctx.use_fancy_output() {
        cliclack::log::warning(format!("{} - {}", message, style(hint).dim())).ok();
    } else {
        println!("  {} {} - {}", style("[WARN]").yellow(), message, hint);
    }
}

/// Display an error step with detail
pub fn step_error_detail(ctx: &UiContext, message: &str, detail: &str) {
    if ctx.use_fancy_output() {
        cliclack::log::error(format!("{}: {}", message, style(detail).red())).ok();
    } else {
        println!("  {} {}: {}", style("[FAIL]").red(), message, detail);
    }
}

/// Display an info step
pub fn step_info(ctx: &UiContext, message: &str) {
    if ctx.use_fancy_output() {
        cliclack::log::info(message).ok();
    } else {
        println!("  {} {}", style("[INFO]").cyan(), message);
    }
}

/// Print styled key-value pair
pub fn key_value(ctx: &UiContext, key: &str, value: &str) {
    if ctx.use_fancy_output() {
        println!("  {}: {}", style(key).dim(), value);
    } else {
        println!("  {}: {}", key, value);
    }
}

/// Report a transfer outcome at its severity
pub fn outcome(ctx: &UiContext, direction: Direction, outcome: &TransferOutcome) {
    let message = match (outcome, direction) {
        (TransferOutcome::Success, Direction::Fetch) => "build cache restored".to_string(),
        (TransferOutcome::Success, Direction::Push) => "build cache stored".to_string(),
        (TransferOutcome::Miss, _) => "no build cache found, continuing without it".to_string(),
        (TransferOutcome::Timeout, Direction::Fetch) => {
            "cache download timed out, continuing without it".to_string()
        }
        (TransferOutcome::Timeout, Direction::Push) => {
            "cache upload timed out, cache not updated".to_string()
        }
        (TransferOutcome::Skipped(reason), _) => format!("build cache not updated: {}", reason),
        (TransferOutcome::Error(detail), _) => {
            step_error_detail(ctx, &format!("cache {} failed", direction.name()), detail);
            return;
        }
    };

    match outcome.severity() {
        Severity::Info if outcome.is_success() => step_ok(ctx, &message),
        Severity::Info => step_info(ctx, &message),
        Severity::Warning | Severity::Error => step_warn(ctx, &message),
    }
}
