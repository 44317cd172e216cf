//! Subprocess runner with captured output.
//!
//! All host commands go through [`run_command`], which captures stdout and
//! stderr as raw bytes (the handle tool's output has to be decoded by the
//! caller) and never opens a console window on Windows.

use std::ffi::OsStr;
use std::io;
use std::process::{Command, Output};
use tracing::debug;

/// `CREATE_NO_WINDOW` process creation flag.
#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Captured result of a finished subprocess.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code (None if terminated by a signal).
    pub code: Option<i32>,
    /// Raw standard output.
    pub stdout: Vec<u8>,
    /// Raw standard error.
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    fn from_output(output: Output) -> Self {
        Self {
            code: output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
        }
    }

    /// Returns true if the process exited with code 0.
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Standard output decoded lossily as UTF-8 and trimmed.
    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).trim().to_string()
    }

    /// Standard error decoded lossily as UTF-8 and trimmed.
    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).trim().to_string()
    }

    /// Best error description: stderr, or stdout when stderr is empty.
    pub fn error_text(&self) -> String {
        let stderr = self.stderr_text();
        if stderr.is_empty() {
            self.stdout_text()
        } else {
            stderr
        }
    }

    /// A successful output with the given stdout.
    #[cfg(test)]
    pub fn ok(stdout: impl Into<Vec<u8>>) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.into(),
            stderr: Vec::new(),
        }
    }

    /// A failed output with the given exit code and stderr.
    #[cfg(test)]
    pub fn failed(code: i32, stderr: impl Into<Vec<u8>>) -> Self {
        Self {
            code: Some(code),
            stdout: Vec::new(),
            stderr: stderr.into(),
        }
    }
}

/// Create a command that will not open a visible console window.
pub fn hidden_command<S: AsRef<OsStr>>(program: S) -> Command {
    #[allow(unused_mut)]
    let mut command = Command::new(program);
    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        command.creation_flags(CREATE_NO_WINDOW);
    }
    command
}

/// Run a command to completion and capture its output.
///
/// A non-zero exit status is not an error here; callers decide what the
/// status means. Only a failure to start the process is returned as `Err`.
pub fn run_command(mut command: Command) -> io::Result<CommandOutput> {
    let rendered = render(&command);
    debug!(command = %rendered, "running host command");

    let output = command.output()?;
    let output = CommandOutput::from_output(output);

    debug!(command = %rendered, code = ?output.code, "host command finished");
    Ok(output)
}

/// Render a command line for logs.
fn render(command: &Command) -> String {
    let mut words = vec![command.get_program().to_string_lossy().to_string()];
    words.extend(command.get_args().map(|a| a.to_string_lossy().to_string()));
    shell_words::join(words)
}
