//! Alternative Unlock Strategies.
//!
//! Ways to get a handle released without killing its owner, tried in order
//! until one works:
//!
//! 1. copy the bytes to a sibling temp file, delete the original, rename back
//! 2. rename to a sibling name, let the OS settle, rename back
//! 3. copy with `fs::copy` to a second temp name, delete, move into place
//! 4. forced OS-level delete of the path
//!
//! Strategy 4 removes the file for good. Only regular files are handled.

use crate::config::Config;
use crate::error::{Result, UnlatchError};
use crate::events::{Event, EventAction, Trace};
use crate::fs::{move_file, remove_if_exists, sibling_temp_path, write_and_sync};
use crate::host::{Host, PathKind};
use serde_json::json;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Runs the alternative-unlock cascade against single files.
pub struct AlternativeUnlocker<'a> {
    config: &'a Config,
    host: &'a dyn Host,
    trace: &'a Trace,
}

impl<'a> AlternativeUnlocker<'a> {
    pub fn new(config: &'a Config, host: &'a dyn Host, trace: &'a Trace) -> Self {
        Self {
            config,
            host,
            trace,
        }
    }

    /// Try every strategy in order; `true` on the first one that succeeds.
    pub fn try_alternative_unlock(&self, file_path: &Path) -> bool {
        if PathKind::of(file_path) != Some(PathKind::File) {
            debug!(path = %file_path.display(), "not a regular file; no alternative unlock");
            return false;
        }

        let strategies: [(&str, fn(&Self, &Path) -> Result<()>); 4] = [
            ("copy_and_replace", Self::copy_and_replace),
            ("rename_round_trip", Self::rename_round_trip),
            ("move_and_replace", Self::move_and_replace),
            ("forced_delete", Self::forced_delete),
        ];

        for (name, strategy) in strategies {
            let result = strategy(self, file_path);
            self.trace.record(
                Event::new(EventAction::AlternativeUnlock)
                    .with_path(file_path)
                    .with_details(json!({
                        "strategy": name,
                        "ok": result.is_ok(),
                        "error": result.as_ref().err().map(|e| e.to_string()),
                    })),
            );

            match result {
                Ok(()) => {
                    info!(path = %file_path.display(), strategy = name, "alternative unlock succeeded");
                    return true;
                }
                Err(e) => {
                    debug!(path = %file_path.display(), strategy = name, error = %e, "alternative unlock failed");
                }
            }
        }

        false
    }

    fn copy_and_replace(&self, path: &Path) -> Result<()> {
        let content = fs::read(path).map_err(|e| io_error("read", path, e))?;
        let temp = sibling_temp_path(path, "copy")?;
        write_and_sync(&temp, &content)?;

        replace_with(path, &temp)
    }

    fn rename_round_trip(&self, path: &Path) -> Result<()> {
        let aside = sibling_temp_path(path, "aside")?;
        fs::rename(path, &aside).map_err(|e| io_error("rename", path, e))?;

        std::thread::sleep(self.config.rename_settle());

        move_file(&aside, path)
    }

    fn move_and_replace(&self, path: &Path) -> Result<()> {
        let temp = sibling_temp_path(path, "move")?;
        if let Err(e) = fs::copy(path, &temp) {
            let _ = remove_if_exists(&temp);
            return Err(io_error("copy", path, e));
        }

        replace_with(path, &temp)
    }

    fn forced_delete(&self, path: &Path) -> Result<()> {
        let output = self
            .host
            .force_delete_file(path)
            .map_err(|e| io_error("force-delete", path, e))?;

        if !output.success() {
            return Err(UnlatchError::Unknown(output.error_text()));
        }
        if path.exists() {
            return Err(UnlatchError::Unknown(format!(
                "'{}' still exists after forced delete",
                path.display()
            )));
        }
        Ok(())
    }
}

/// Delete `path` and move `temp` into its place.
///
/// `temp` is cleaned up on failure only while `path` still exists.
fn replace_with(path: &Path, temp: &Path) -> Result<()> {
    if let Err(e) = fs::remove_file(path) {
        let _ = remove_if_exists(temp);
        return Err(io_error("delete", path, e));
    }

    move_file(temp, path).map_err(|e| failed_restore(path, temp, e))
}

/// Once `path` is gone, `temp` holds the only copy of the data and is kept.
fn failed_restore(path: &Path, temp: &Path, e: UnlatchError) -> UnlatchError {
    if path.exists() {
        let _ = remove_if_exists(temp);
        return e;
    }

    warn!(path = %path.display(), temp = %temp.display(), "restore failed; keeping temp copy");
    UnlatchError::Unknown(format!(
        "could not move '{}' back into place; its contents are kept in '{}': {}",
        path.display(),
        temp.display(),
        e
    ))
}

fn io_error(action: &str, path: &Path, e: std::io::Error) -> UnlatchError {
    UnlatchError::Unknown(format!("failed to {} '{}': {}", action, path.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Behavior, FakeHost, Primitive, create_file};

    fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn directories_are_not_handled() {
        let (dir, _path) = create_file("a.txt", "x");
        let config = Config::for_tests();
        let host = FakeHost::new();
        let trace = Trace::new();
        let unlocker = AlternativeUnlocker::new(&config, &host, &trace);

        assert!(!unlocker.try_alternative_unlock(dir.path()));
        assert!(!unlocker.try_alternative_unlock(&dir.path().join("missing.txt")));
        assert!(trace.events().is_empty());
        assert!(host.calls().is_empty());
    }

    #[test]
    fn first_strategy_keeps_content_and_leaves_no_temp_files() {
        let (dir, path) = create_file("doc.txt", "precious bytes");
        let config = Config::for_tests();
        let host = FakeHost::new();
        let trace = Trace::new();
        let unlocker = AlternativeUnlocker::new(&config, &host, &trace);

        assert!(unlocker.try_alternative_unlock(&path));

        assert_eq!(fs::read_to_string(&path).unwrap(), "precious bytes");
        assert_eq!(entries(dir.path()), vec!["doc.txt".to_string()]);
        assert_eq!(trace.count(EventAction::AlternativeUnlock), 1);
        assert_eq!(trace.events()[0].details["strategy"], "copy_and_replace");
    }

    #[test]
    fn rename_round_trip_restores_the_name() {
        let (dir, path) = create_file("doc.txt", "abc");
        let config = Config::for_tests();
        let host = FakeHost::new();
        let trace = Trace::new();
        let unlocker = AlternativeUnlocker::new(&config, &host, &trace);

        unlocker.rename_round_trip(&path).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "abc");
        assert_eq!(entries(dir.path()), vec!["doc.txt".to_string()]);
    }

    #[test]
    fn move_and_replace_restores_the_content() {
        let (dir, path) = create_file("doc.txt", "xyz");
        let config = Config::for_tests();
        let host = FakeHost::new();
        let trace = Trace::new();
        let unlocker = AlternativeUnlocker::new(&config, &host, &trace);

        unlocker.move_and_replace(&path).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "xyz");
        assert_eq!(entries(dir.path()), vec!["doc.txt".to_string()]);
    }

    #[test]
    fn failed_restore_keeps_the_only_copy() {
        let (dir, path) = create_file("doc.txt", "precious bytes");
        let temp = dir.path().join("doc.txt.copy");
        fs::write(&temp, "precious bytes").unwrap();
        fs::remove_file(&path).unwrap();

        let err = failed_restore(&path, &temp, UnlatchError::Unknown("rename refused".into()));

        assert_eq!(fs::read_to_string(&temp).unwrap(), "precious bytes");
        let text = err.to_string();
        assert!(text.contains(&temp.display().to_string()));
        assert!(text.contains("rename refused"));
    }

    #[test]
    fn failed_restore_discards_temp_while_original_exists() {
        let (dir, path) = create_file("doc.txt", "x");
        let temp = dir.path().join("doc.txt.copy");
        fs::write(&temp, "x").unwrap();

        let err = failed_restore(&path, &temp, UnlatchError::Unknown("rename refused".into()));

        assert!(!temp.exists());
        assert_eq!(err.to_string(), UnlatchError::Unknown("rename refused".into()).to_string());
        assert_eq!(entries(dir.path()), vec!["doc.txt".to_string()]);
    }

    #[test]
    fn replace_with_names_the_temp_when_moving_back_fails() {
        let (dir, path) = create_file("doc.txt", "x");
        let temp = dir.path().join("doc.txt.copy");

        let err = replace_with(&path, &temp).unwrap_err();

        assert!(!path.exists());
        assert!(err.to_string().contains(&temp.display().to_string()));
    }

    #[test]
    fn forced_delete_removes_the_file() {
        let (_dir, path) = create_file("doc.txt", "x");
        let config = Config::for_tests();
        let host = FakeHost::new();
        let trace = Trace::new();
        let unlocker = AlternativeUnlocker::new(&config, &host, &trace);

        unlocker.forced_delete(&path).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn failed_forced_delete_is_an_error() {
        let (_dir, path) = create_file("doc.txt", "x");
        let config = Config::for_tests();
        let host = FakeHost::new().with_behavior(Primitive::ForceDelete, Behavior::Busy);
        let trace = Trace::new();
        let unlocker = AlternativeUnlocker::new(&config, &host, &trace);

        let err = unlocker.forced_delete(&path).unwrap_err();
        assert!(err.to_string().contains("being used by another process"));
        assert!(path.exists());
    }
}
