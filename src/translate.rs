//! Error Translator.
//!
//! Maps technical error text to a sentence a user can act on. Matching is
//! ordered, case-insensitive substring search; the first hit wins.

use crate::error::UnlatchError;

/// Known phrases and their user-facing templates, most specific first.
const PATTERNS: &[(&str, &str)] = &[
    (
        "Try restarting the computer",
        "The item is still in use after every deletion method. Restart the computer and try again.",
    ),
    (
        "handle tool unavailable",
        "The lock analysis tool was not found. Check the configured tool path or reinstall it.",
    ),
    (
        "handle tool failed",
        "The lock analysis tool reported an error. Try again, or run the program as administrator.",
    ),
    (
        "could not terminate",
        "Some processes could not be closed. They may be protected by the system.",
    ),
    (
        "operation cancelled",
        "The operation was cancelled.",
    ),
    (
        "Access is denied",
        "Access denied. The program does not have enough rights for this operation.",
    ),
    (
        "being used by another process",
        "The file is in use by another application and cannot be changed.",
    ),
    (
        "No such file or directory",
        "File not found. It may have been moved or deleted.",
    ),
    (
        "path does not exist",
        "File not found. It may have been moved or deleted.",
    ),
    (
        "Cannot delete",
        "The file cannot be deleted. Make sure no other program is using it.",
    ),
    (
        "Cannot find the file",
        "The file cannot be found. It may have been moved or deleted.",
    ),
    (
        "Permission denied",
        "Permission denied. The program does not have enough rights for this operation.",
    ),
    (
        "Not enough memory",
        "Not enough memory to complete the operation. Close other programs and try again.",
    ),
    (
        "Out of memory",
        "Not enough memory to complete the operation. Close other programs and try again.",
    ),
    (
        "Error reading process information",
        "Could not read process information. Restart the program and try again.",
    ),
    (
        "register hotkey",
        "Could not set up the keyboard shortcut. Another program may already be using it.",
    ),
    (
        "SSL",
        "A secure connection could not be established while checking for updates.",
    ),
    (
        "HTTP",
        "Checking for updates failed. Check your internet connection.",
    ),
    (
        "URL",
        "Could not reach the update server. Check your internet connection.",
    ),
];

const FILE_FALLBACK: &str =
    "Something went wrong while working with the file. Make sure you have the required access rights.";

const PROCESS_FALLBACK: &str =
    "Something went wrong while working with a process. It may have exited or be protected by the system.";

/// Translate a raw technical message for display.
pub fn to_user_message(raw_error: &str) -> String {
    let lower = raw_error.to_lowercase();

    if let Some((_, template)) = PATTERNS
        .iter()
        .find(|(pattern, _)| lower.contains(&pattern.to_lowercase()))
    {
        return template.to_string();
    }

    if lower.contains("file") {
        return FILE_FALLBACK.to_string();
    }
    if lower.contains("process") {
        return PROCESS_FALLBACK.to_string();
    }

    match raw_error.split_once(':') {
        Some((head, _)) => format!("{}.", head.trim_end()),
        None => raw_error.to_string(),
    }
}

/// Translate an error from this crate.
pub fn describe(err: &UnlatchError) -> String {
    to_user_message(&err.to_string())
}
