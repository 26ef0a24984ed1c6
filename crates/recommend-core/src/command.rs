//! Subprocess invocation discipline for the hardware probe.
//!
//! Every probe that shells out to a platform tool (`nvidia-smi`, `sysctl`,
//! `rocm-smi`, ...) goes through [`CommandRunner`] instead of calling
//! `std::process::Command` directly. This gives the probe a single seam to
//! stub in tests (no real GPU required) and centralizes two invariants the
//! spec requires: every invocation is non-interactive and profile-isolated,
//! and every output is parsed with [`first_number`]/[`first_json_value`]
//! rather than ad-hoc string slicing, so shell banners and locale noise
//! never corrupt a reading.

use std::process::Command;
use std::time::Duration;

use serde_json::Value;

use crate::error::{Error, Result};

/// Runs a subprocess and returns its captured stdout, or `None` if it could
/// not be run or exited non-zero. Implementors must not block past
/// `timeout` — the default implementation relies on the command itself
/// being fast; a future revision may wrap this in a watchdog thread.
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args`, waiting up to `timeout`.
    fn run(&self, program: &str, args: &[&str], timeout: Duration) -> Option<String>;
}

/// Default `CommandRunner` backed by `std::process::Command`.
///
/// Invocations are non-interactive (no controlling TTY is attached beyond
/// stdout/stderr capture) and do not source the user's shell profile —
/// the target binary is executed directly, never through `sh -c`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    fn run(&self, program: &str, args: &[&str], _timeout: Duration) -> Option<String> {
        let output = Command::new(program).args(args).output().ok()?;
        if !output.status.success() {
            return None;
        }
        Some(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Extract the first well-formed floating-point token from `text`, ignoring
/// surrounding shell banners or units. Returns a structured error naming
/// `command` and the head of the unparseable payload rather than silently
/// defaulting.
pub fn first_number(command: &str, text: &str) -> Result<f64> {
    for token in text.split(|c: char| !c.is_ascii_digit() && c != '.' && c != '-') {
        if token.is_empty() || token == "-" || token == "." {
            continue;
        }
        if let Ok(v) = token.parse::<f64>() {
            return Ok(v);
        }
    }
    Err(Error::Catalog(format!(
        "command `{command}` produced no numeric token (payload head: {:?})",
        head(text)
    )))
}

/// Extract the first well-formed JSON value from `text` by scanning for a
/// balanced `{...}` or `[...]` span, ignoring any banner lines before it.
pub fn first_json_value(command: &str, text: &str) -> Result<Value> {
    let bytes = text.as_bytes();
    for (start, &b) in bytes.iter().enumerate() {
        if b != b'{' && b != b'[' {
            continue;
        }
        let open = b;
        let close = if open == b'{' { b'}' } else { b']' };
        let mut depth: i32 = 0;
        for (offset, &c) in bytes[start..].iter().enumerate() {
            if c == open {
                depth += 1;
            } else if c == close {
                depth -= 1;
                if depth == 0 {
                    let span = &text[start..start + offset + 1];
                    if let Ok(v) = serde_json::from_str::<Value>(span) {
                        return Ok(v);
                    }
                    break;
                }
            }
        }
    }
    Err(Error::Catalog(format!(
        "command `{command}` produced no well-formed JSON token (payload head: {:?})",
        head(text)
    )))
}

fn head(text: &str) -> String {
    text.chars().take(120).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_number_skips_banner_text() {
        let text = "Wed Jul 28 12:00:00 2026\n24576 MiB\n";
        assert_eq!(first_number("nvidia-smi", text).unwrap(), 24576.0);
    }

    #[test]
    fn first_number_handles_negative_and_decimal() {
        assert_eq!(first_number("sensor", "temp=-3.5C").unwrap(), -3.5);
    }

    #[test]
    fn first_number_errors_with_command_and_head() {
        let err = first_number("rocm-smi", "no numeric data here").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("rocm-smi"));
        assert!(msg.contains("no numeric data here"));
    }

    #[test]
    fn first_json_value_skips_banner_lines() {
        let text = "Some warning printed to stdout\n{\"sppci_model\": \"Apple M3 Max\"}\n";
        let v = first_json_value("system_profiler", text).unwrap();
        assert_eq!(v["sppci_model"], "Apple M3 Max");
    }

    #[test]
    fn first_json_value_handles_nested_arrays() {
        let text = "[{\"a\": [1,2,3]}, {\"b\": 2}]";
        let v = first_json_value("tool", text).unwrap();
        assert!(v.is_array());
        assert_eq!(v[0]["a"][2], 3);
    }

    #[test]
    fn first_json_value_errors_on_garbage() {
        assert!(first_json_value("tool", "not json at all").is_err());
    }

    #[test]
    fn system_command_runner_runs_echo() {
        let runner = SystemCommandRunner;
        let out = runner.run("echo", &["hello"], Duration::from_secs(5));
        assert_eq!(out.unwrap().trim(), "hello");
    }

    #[test]
    fn system_command_runner_returns_none_for_missing_binary() {
        let runner = SystemCommandRunner;
        let out = runner.run(
            "definitely-not-a-real-binary-xyz",
            &[],
            Duration::from_secs(5),
        );
        assert!(out.is_none());
    }
}
