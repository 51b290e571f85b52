//! Subprocess execution with output capture
//!
//! Scriptlets shell out to system tools (service management, database
//! utilities). Commands run synchronously with captured output; a nonzero
//! exit becomes a `ScriptletError::Process` carrying the command line and
//! captured output verbatim so the failure report can surface them.

use crate::errors::ScriptletError;
use std::io::{BufRead, BufReader};
use std::process::{Command, Stdio};
use std::time::Instant;
use tracing::{debug, error, info};

/// Captured result of a completed command
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Exit code (-1 when terminated by signal)
    pub exit_code: i32,
    /// Captured stdout
    pub stdout: String,
    /// Captured stderr
    pub stderr: String,
    /// Wall-clock duration
    pub duration: std::time::Duration,
}

/// Run a command line synchronously, capturing output.
///
/// The command string is split with shell-words rules (quoting respected),
/// not handed to a shell. Output lines are logged as they are read. A
/// nonzero exit returns `ScriptletError::Process`.
pub fn run_command(command_line: &str) -> Result<CommandOutput, ScriptletError> {
    let words = shell_words::split(command_line).map_err(|e| ScriptletError::InvalidCommand {
        message: format!("{}: {}", command_line, e),
    })?;

    let (program, args) = words.split_first().ok_or_else(|| {
        ScriptletError::InvalidCommand {
            message: "empty command".to_string(),
        }
    })?;

    debug!("Executing: {}", command_line);
    let start_time = Instant::now();

    let mut child = Command::new(program)
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| ScriptletError::Failed {
            message: format!("Failed to spawn '{}': {}", command_line, e),
        })?;

    // Capture stdout and stderr line by line
    let stdout_reader = BufReader::new(child.stdout.take().expect("stdout piped"));
    let stderr_reader = BufReader::new(child.stderr.take().expect("stderr piped"));

    let mut stdout_lines = Vec::new();
    for line in stdout_reader.lines() {
        let line = line?;
        info!("stdout: {}", line);
        stdout_lines.push(line);
    }

    let mut stderr_lines = Vec::new();
    for line in stderr_reader.lines() {
        let line = line?;
        info!("stderr: {}", line);
        stderr_lines.push(line);
    }

    let exit_status = child.wait()?;
    let exit_code = exit_status.code().unwrap_or(-1);
    let duration = start_time.elapsed();
    let stdout = stdout_lines.join("\n");
    let stderr = stderr_lines.join("\n");

    debug!(
        "Command completed with exit code {} in {:?}",
        exit_code, duration
    );

    if exit_code != 0 {
        error!("Command failed with exit code {}: {}", exit_code, command_line);
        let mut output = stdout;
        if !stderr.is_empty() {
            if !output.is_empty() {
                output.push('\n');
            }
            output.push_str(&stderr);
        }
        return Err(ScriptletError::Process {
            command: command_line.to_string(),
            output,
            code: exit_code,
        });
    }

    Ok(CommandOutput {
        exit_code,
        stdout,
        stderr,
        duration,
    })
}

/// Get the current effective user id.
///
/// Detected via the `id -u` command rather than direct libc calls; returns
/// `None` when detection fails (the caller decides whether that is fatal).
#[cfg(unix)]
pub fn current_uid() -> Option<u32> {
    let output = Command::new("id").arg("-u").output().ok()?;
    String::from_utf8_lossy(&output.stdout).trim().parse().ok()
}

/// Get the current effective user id (non-Unix stub)
#[cfg(not(unix))]
pub fn current_uid() -> Option<u32> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_successful_command_captures_stdout() {
        let output = run_command("echo hello world").unwrap();
        assert_eq!(output.exit_code, 0);
        assert_eq!(output.stdout, "hello world");
        assert!(output.stderr.is_empty());
    }

    #[test]
    fn test_quoting_respected() {
        let output = run_command("echo 'one two'").unwrap();
        assert_eq!(output.stdout, "one two");
    }

    #[test]
    fn test_failing_command_preserves_command_and_output() {
        let result = run_command("sh -c 'echo oops >&2; exit 3'");
        match result {
            Err(ScriptletError::Process {
                command,
                output,
                code,
            }) => {
                assert_eq!(command, "sh -c 'echo oops >&2; exit 3'");
                assert_eq!(output, "oops");
                assert_eq!(code, 3);
            }
            other => panic!("expected process error, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_command_rejected() {
        assert!(matches!(
            run_command("   "),
            Err(ScriptletError::InvalidCommand { .. })
        ));
    }

    #[test]
    fn test_missing_program() {
        assert!(matches!(
            run_command("definitely-not-a-real-program-xyz"),
            Err(ScriptletError::Failed { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_current_uid_detected() {
        assert!(current_uid().is_some());
    }
}
