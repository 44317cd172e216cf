//! [`Host`] implementation backed by the real operating system.

use super::command::{hidden_command, run_command};
use super::{CommandOutput, Host, PathKind};
use crate::error::{Result, UnlatchError};
use std::ffi::OsStr;
use std::io;
use std::path::Path;

/// Talks to the running operating system through std and its shell tools.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeHost;

impl NativeHost {
    pub fn new() -> Self {
        Self
    }
}

impl Host for NativeHost {
    fn run_handle_tool(&self, tool: &str, target: &OsStr) -> io::Result<CommandOutput> {
        let mut cmd = hidden_command(tool);
        cmd.args(["-accepteula", "-nobanner"]).arg(target);
        run_command(cmd)
    }

    fn is_process_running(&self, pid: u32) -> Result<bool> {
        if let Some(running) = procfs_liveness(pid) {
            return Ok(running);
        }
        let output = run_command(liveness_command(pid)).map_err(|e| {
            UnlatchError::Unknown(format!("failed to query process {}: {}", pid, e))
        })?;
        liveness_from_output(pid, &output)
    }

    fn instance_count(&self, image_name: &str) -> Result<usize> {
        let output = run_command(instance_command(image_name)).map_err(|e| {
            UnlatchError::Unknown(format!("failed to list '{}' processes: {}", image_name, e))
        })?;
        instances_from_output(image_name, &output)
    }

    fn terminate(&self, pid: u32) -> io::Result<CommandOutput> {
        run_command(terminate_command(pid))
    }

    fn remove_native(&self, path: &Path, kind: PathKind) -> io::Result<()> {
        match kind {
            PathKind::File => std::fs::remove_file(path),
            PathKind::Directory => std::fs::remove_dir_all(path),
        }
    }

    fn remove_scripted(&self, path: &Path, kind: PathKind) -> io::Result<CommandOutput> {
        run_command(scripted_command(path, kind))
    }

    fn remove_command_line(&self, path: &Path, kind: PathKind) -> io::Result<CommandOutput> {
        run_command(command_line_command(path, kind))
    }

    fn remove_fallback_script(&self, path: &Path) -> io::Result<CommandOutput> {
        run_command(fallback_command(path))
    }

    fn remove_elevated(&self, path: &Path) -> io::Result<CommandOutput> {
        run_command(elevated_command(path))
    }

    fn force_delete_file(&self, path: &Path) -> io::Result<CommandOutput> {
        run_command(force_delete_command(path))
    }
}

/// Count rows of `tasklist /fo csv` output whose image name matches.
#[cfg_attr(not(windows), allow(dead_code))]
pub(crate) fn count_csv_rows(stdout: &str, image_name: &str) -> usize {
    let quoted = format!("\"{}\"", image_name.to_lowercase());
    stdout
        .lines()
        .filter(|line| line.trim_start().to_lowercase().starts_with(&quoted))
        .count()
}

/// Whether `tasklist /fo csv` output contains a row with `pid`.
#[cfg_attr(not(windows), allow(dead_code))]
pub(crate) fn csv_contains_pid(stdout: &str, pid: u32) -> bool {
    let needle = format!("\"{}\"", pid);
    stdout
        .lines()
        .any(|line| line.split(',').nth(1).map(str::trim) == Some(needle.as_str()))
}

/// Quote a path as a PowerShell double-quoted string literal.
#[cfg_attr(not(windows), allow(dead_code))]
pub(crate) fn powershell_literal(path: &Path) -> String {
    let mut out = String::from("\"");
    for c in path.to_string_lossy().chars() {
        match c {
            '`' | '"' | '$' => {
                out.push('`');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(windows)]
mod platform {
    use super::*;
    use std::os::windows::process::CommandExt;
    use std::process::Command;

    fn powershell(script: String) -> Command {
        let mut cmd = hidden_command("powershell");
        cmd.args(["-NoProfile", "-NonInteractive", "-ExecutionPolicy", "Bypass"])
            .arg("-Command")
            .arg(script);
        cmd
    }

    fn cmd_line(line: String) -> Command {
        let mut cmd = hidden_command("cmd");
        cmd.arg("/c").raw_arg(line);
        cmd
    }

    pub fn procfs_liveness(_pid: u32) -> Option<bool> {
        None
    }

    pub fn liveness_command(pid: u32) -> Command {
        let mut cmd = hidden_command("tasklist");
        cmd.args(["/fi", &format!("pid eq {}", pid), "/fo", "csv", "/nh"]);
        cmd
    }

    pub fn liveness_from_output(pid: u32, output: &CommandOutput) -> Result<bool> {
        if !output.success() {
            return Err(UnlatchError::Unknown(format!(
                "tasklist failed for process {}: {}",
                pid,
                output.error_text()
            )));
        }
        Ok(csv_contains_pid(&output.stdout_text(), pid))
    }

    pub fn instance_command(image_name: &str) -> Command {
        let mut cmd = hidden_command("tasklist");
        cmd.args(["/fi", &format!("imagename eq {}", image_name), "/fo", "csv"]);
        cmd
    }

    pub fn instances_from_output(image_name: &str, output: &CommandOutput) -> Result<usize> {
        if !output.success() {
            return Err(UnlatchError::Unknown(format!(
                "tasklist failed for '{}': {}",
                image_name,
                output.error_text()
            )));
        }
        Ok(count_csv_rows(&output.stdout_text(), image_name))
    }

    pub fn terminate_command(pid: u32) -> Command {
        let mut cmd = hidden_command("taskkill");
        cmd.args(["/F", "/PID", &pid.to_string()]);
        cmd
    }

    pub fn scripted_command(path: &Path, kind: PathKind) -> Command {
        let recurse = if kind.is_dir() { " -Recurse" } else { "" };
        powershell(format!(
            "Remove-Item -LiteralPath {} -Force{} -ErrorAction Stop",
            powershell_literal(path),
            recurse
        ))
    }

    pub fn command_line_command(path: &Path, kind: PathKind) -> Command {
        let quoted = format!("\"{}\"", path.display());
        match kind {
            PathKind::File => cmd_line(format!("del /F /Q {}", quoted)),
            PathKind::Directory => cmd_line(format!("rd /s /q {}", quoted)),
        }
    }

    pub fn fallback_command(path: &Path) -> Command {
        powershell(format!(
            "$ErrorActionPreference = 'SilentlyContinue'; \
             $p = {}; \
             if (Test-Path -LiteralPath $p -PathType Container) {{ \
               Get-ChildItem -LiteralPath $p -Recurse -Force | Remove-Item -Force -Recurse; \
               Remove-Item -LiteralPath $p -Force -Recurse \
             }} elseif (Test-Path -LiteralPath $p) {{ \
               Remove-Item -LiteralPath $p -Force \
             }}; \
             exit 0",
            powershell_literal(path)
        ))
    }

    pub fn elevated_command(path: &Path) -> Command {
        powershell(format!(
            "$ErrorActionPreference = 'SilentlyContinue'; \
             $p = {}; \
             if (Test-Path -LiteralPath $p) {{ \
               takeown.exe /f $p /r /d y | Out-Null; \
               icacls.exe $p /grant '*S-1-5-32-544:F' /t /c /q | Out-Null; \
               if (Test-Path -LiteralPath $p -PathType Container) {{ \
                 Remove-Item -LiteralPath $p -Recurse -Force \
               }} else {{ \
                 Remove-Item -LiteralPath $p -Force \
               }} \
             }}",
            powershell_literal(path)
        ))
    }

    pub fn force_delete_command(path: &Path) -> Command {
        cmd_line(format!("del /F /Q \"{}\"", path.display()))
    }
}

#[cfg(not(windows))]
mod platform {
    use super::*;
    use std::process::Command;

    fn sh(script: &str, path: &Path) -> Command {
        let mut cmd = hidden_command("sh");
        cmd.arg("-c").arg(script).arg("unlatch").arg(path);
        cmd
    }

    /// Answer liveness from `/proc` where it is mounted.
    pub fn procfs_liveness(pid: u32) -> Option<bool> {
        let proc_root = Path::new("/proc");
        if !proc_root.join("self").exists() {
            return None;
        }
        Some(proc_root.join(pid.to_string()).exists())
    }

    pub fn liveness_command(pid: u32) -> Command {
        let mut cmd = hidden_command("ps");
        cmd.args(["-p", &pid.to_string(), "-o", "pid="]);
        cmd
    }

    pub fn liveness_from_output(pid: u32, output: &CommandOutput) -> Result<bool> {
        match output.code {
            Some(0) => Ok(!output.stdout_text().is_empty()),
            Some(1) => Ok(false),
            _ => Err(UnlatchError::Unknown(format!(
                "ps failed for process {}: {}",
                pid,
                output.error_text()
            ))),
        }
    }

    pub fn instance_command(image_name: &str) -> Command {
        let mut cmd = hidden_command("pgrep");
        cmd.arg("-x").arg(image_name);
        cmd
    }

    pub fn instances_from_output(image_name: &str, output: &CommandOutput) -> Result<usize> {
        match output.code {
            Some(0) => Ok(output
                .stdout_text()
                .lines()
                .filter(|l| !l.trim().is_empty())
                .count()),
            Some(1) => Ok(0),
            _ => Err(UnlatchError::Unknown(format!(
                "pgrep failed for '{}': {}",
                image_name,
                output.error_text()
            ))),
        }
    }

    pub fn terminate_command(pid: u32) -> Command {
        let mut cmd = hidden_command("kill");
        cmd.args(["-9", &pid.to_string()]);
        cmd
    }

    pub fn scripted_command(path: &Path, kind: PathKind) -> Command {
        match kind {
            PathKind::File => sh("rm -f -- \"$1\"", path),
            PathKind::Directory => sh("rm -rf -- \"$1\"", path),
        }
    }

    pub fn command_line_command(path: &Path, kind: PathKind) -> Command {
        match kind {
            PathKind::File => {
                let mut cmd = hidden_command("unlink");
                cmd.arg(path);
                cmd
            }
            PathKind::Directory => {
                let mut cmd = hidden_command("find");
                cmd.arg(path).arg("-delete");
                cmd
            }
        }
    }

    pub fn fallback_command(path: &Path) -> Command {
        sh(
            "if [ -d \"$1\" ]; then \
               find \"$1\" -mindepth 1 -delete 2>/dev/null; rmdir \"$1\" 2>/dev/null; \
             elif [ -e \"$1\" ]; then \
               rm -f -- \"$1\" 2>/dev/null; \
             fi; exit 0",
            path,
        )
    }

    pub fn elevated_command(path: &Path) -> Command {
        let mut cmd = hidden_command("sudo");
        cmd.args(["-n", "rm", "-rf", "--"]).arg(path);
        cmd
    }

    pub fn force_delete_command(path: &Path) -> Command {
        let mut cmd = hidden_command("rm");
        cmd.args(["-f", "--"]).arg(path);
        cmd
    }
}

use platform::*;
