//! Installation collaborators
//!
//! The engine never downloads or extracts anything itself. Toolchain
//! content arrives through an [`Installer`], and every external process
//! (install scripts, package managers, `--version` probes) goes through a
//! [`CommandRunner`] so builds can be exercised without real toolchains.

mod installer;
mod runner;

pub use installer::{InstallRequest, Installer, ScriptInstaller};
pub use runner::{tool_version, CommandOutput, CommandRunner, CommandSpec, ProcessRunner};

/// Max number of output lines to include in installation error messages.
const ERROR_TAIL_LINES: usize = 50;

/// Extract the useful tail of command output for error diagnostics.
///
/// Returns the last `ERROR_TAIL_LINES` lines so error messages are
/// actionable without being overwhelming.
pub(crate) fn output_tail(lines: &[String]) -> String {
    let start = lines.len().saturating_sub(ERROR_TAIL_LINES);
    lines[start..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tail_keeps_last_lines() {
        let lines: Vec<String> = (0..120).map(|i| format!("line {}", i)).collect();
        let tail = output_tail(&lines);
        assert_eq!(tail.lines().count(), ERROR_TAIL_LINES);
        assert!(tail.starts_with("line 70"));
        assert!(tail.ends_with("line 119"));
    }

    #[test]
    fn tail_of_short_output_is_whole_output() {
        let lines = vec!["only".to_string()];
        assert_eq!(output_tail(&lines), "only");
    }
}
