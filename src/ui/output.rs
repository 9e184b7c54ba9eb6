//! Build output
//!
//! Report lines go through `cliclack` log levels on a terminal. Elsewhere
//! each line gets a bracketed tag so CI logs can be grepped for `[WARN]`.

use super::context::UiContext;
use crate::lifecycle::{BuildReport, LineKind};
use console::style;

/// Severity of a single output line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tone {
    Ok,
    Warn,
    Fail,
    Info,
    Quiet,
}

impl Tone {
    fn of(kind: LineKind) -> Self {
        match kind {
            LineKind::Info | LineKind::Detect => Self::Info,
            LineKind::CacheHit => Self::Ok,
            LineKind::CacheMiss => Self::Quiet,
            LineKind::Advisory => Self::Warn,
            LineKind::Failure => Self::Fail,
        }
    }
}

/// The non-interactive rendering of a line
fn plain(tone: Tone, message: &str) -> String {
    match tone {
        Tone::Ok => format!("  {} {}", style("[OK]").green(), message),
        Tone::Warn => format!("  {} {}", style("[WARN]").yellow(), message),
        Tone::Fail => format!("  {} {}", style("[FAIL]").red(), message),
        Tone::Info => format!("  {} {}", style("[INFO]").cyan(), message),
        Tone::Quiet => format!("  {}", style(message).dim()),
    }
}

fn line(ctx: &UiContext, tone: Tone, message: &str) {
    if !ctx.use_fancy_output() {
        println!("{}", plain(tone, message));
        return;
    }
    match tone {
        Tone::Ok => cliclack::log::success(message),
        Tone::Warn => cliclack::log::warning(message),
        Tone::Fail => cliclack::log::error(message),
        Tone::Info => cliclack::log::info(message),
        Tone::Quiet => cliclack::log::remark(message),
    }
    .ok();
}

/// Title line for a command
pub fn intro(ctx: &UiContext, title: &str) {
    if ctx.use_fancy_output() {
        cliclack::intro(style(title).cyan().bold()).ok();
    } else {
        println!("{}", style(title).cyan().bold());
    }
}

/// Closing line; `succeeded` picks the color and tag
pub fn outro(ctx: &UiContext, succeeded: bool, message: &str) {
    let styled = if succeeded {
        style(message).green().bold()
    } else {
        style(message).red().bold()
    };
    if ctx.use_fancy_output() {
        cliclack::outro(styled).ok();
    } else if succeeded {
        println!("{} {}", style("[OK]").green(), message);
    } else {
        println!("{} {}", style("[ERROR]").red(), message);
    }
}

pub fn step_ok(ctx: &UiContext, message: &str) {
    line(ctx, Tone::Ok, message);
}

pub fn step_warn(ctx: &UiContext, message: &str) {
    line(ctx, Tone::Warn, message);
}

pub fn key_value(ctx: &UiContext, key: &str, value: &str) {
    let message = format!("{}: {}", style(key).bold(), value);
    line(ctx, Tone::Info, &message);
}

/// Render every report line in order
pub fn report(ctx: &UiContext, report: &BuildReport) {
    for entry in report.lines() {
        line(ctx, Tone::of(entry.kind), &entry.text);
    }
}
