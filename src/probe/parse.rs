//! Parsing of handle-tool output lines into [`LockOwner`] records.

use crate::model::LockOwner;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

/// Sentinel printed when nothing holds the queried path.
pub const NO_MATCHES: &str = "No matching handles found";

/// Marker of the license prompt some tool versions print despite `-accepteula`.
pub const EULA_MARKER: &str = "EULA";

/// Text after `type:`: the handle type, an optional hex handle value, the path.
static PATH_TAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:File)?\s*(?:[0-9A-Fa-f]+:\s+)?(.*)$").expect("Invalid handle path regex")
});

/// Parse every candidate line of `output`; malformed lines are skipped.
pub fn parse_output(output: &str, queried: &Path) -> Vec<LockOwner> {
    output
        .lines()
        .filter_map(|line| parse_line(line, queried))
        .collect()
}

/// Parse one line of the form `name pid: N type: File [HEX:] path`.
pub fn parse_line(line: &str, queried: &Path) -> Option<LockOwner> {
    if !(line.contains("pid:") && line.contains("type:") && line.contains("File")) {
        return None;
    }

    let (name, rest) = line.split_once("pid:")?;
    let (pid_text, tail) = rest.split_once("type:")?;
    let pid: u32 = pid_text.trim().parse().ok()?;
    if pid == 0 {
        return None;
    }

    let file_path = PATH_TAIL
        .captures(tail.trim())
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .filter(|p| !p.is_empty())
        .map(Path::new)
        .unwrap_or(queried);

    Some(LockOwner::new(name.trim(), pid, file_path))
}
