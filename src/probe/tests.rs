//! Tests for the Lock Prober.

use super::decode::{candidate_encodings, decode_output, locale_encoding};
use super::parse::{parse_line, parse_output};
use super::*;
use crate::error::ErrorKind;
use crate::model::{CancelToken, ProgressReport, UNKNOWN_OWNER_NAME};
use crate::test_support::{FakeHost, Fixture, create_file, create_tree};
use encoding_rs::{IBM866, UTF_8, WINDOWS_1251};
use serial_test::serial;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

fn prober(fx: &Fixture) -> LockProber<'_> {
    LockProber::new(&fx.config, &fx.host, &fx.gate, &fx.trace)
}

// ============================================================================
// Output parsing
// ============================================================================

#[test]
fn well_formed_line_yields_owner() {
    let owner = parse_line(
        "notepad.exe pid: 1234 type: File  C:\\data\\x.txt",
        Path::new("C:\\queried.txt"),
    )
    .unwrap();

    assert_eq!(owner.process_name, "notepad.exe");
    assert_eq!(owner.pid, 1234);
    assert_eq!(owner.handle_type, "File");
    assert_eq!(owner.file_path, PathBuf::from("C:\\data\\x.txt"));
}

#[test]
fn lines_missing_a_marker_are_ignored() {
    let queried = Path::new("/q");
    assert!(parse_line("notepad.exe 1234 type: File  C:\\x.txt", queried).is_none());
    assert!(parse_line("notepad.exe pid: 1234 File  C:\\x.txt", queried).is_none());
    assert!(parse_line("notepad.exe pid: 1234 type: Key  HKLM\\x", queried).is_none());
    assert!(parse_line("", queried).is_none());
}

#[test]
fn non_numeric_and_zero_pids_are_dropped() {
    let queried = Path::new("/q");
    assert!(parse_line("app.exe pid: abc type: File  C:\\x.txt", queried).is_none());
    assert!(parse_line("app.exe pid: -5 type: File  C:\\x.txt", queried).is_none());
    assert!(parse_line("System pid: 0 type: File  C:\\x.txt", queried).is_none());
}

#[test]
fn hex_handle_value_is_stripped_from_path() {
    let owner = parse_line(
        "explorer.exe       pid: 4100   type: File           1A4: C:\\Users\\a\\doc.txt",
        Path::new("/q"),
    )
    .unwrap();
    assert_eq!(owner.process_name, "explorer.exe");
    assert_eq!(owner.file_path, PathBuf::from("C:\\Users\\a\\doc.txt"));
}

#[test]
fn missing_path_falls_back_to_queried_path() {
    let owner = parse_line("winword.exe pid: 88 type: File", Path::new("/tmp/q.docx")).unwrap();
    assert_eq!(owner.file_path, PathBuf::from("/tmp/q.docx"));
}

#[test]
fn malformed_lines_do_not_abort_the_parse() {
    let output = "Nthandle v5.0 - Handle viewer\n\
                  \n\
                  a.exe pid: 10 type: File  C:\\a.txt\n\
                  garbage pid: x type: File  C:\\b.txt\n\
                  b.exe pid: 20 type: File  C:\\b.txt\n";
    let owners = parse_output(output, Path::new("/q"));
    let pids: Vec<u32> = owners.iter().map(|o| o.pid).collect();
    assert_eq!(pids, vec![10, 20]);
}

// ============================================================================
// Decoding
// ============================================================================

/// "Процесс" in windows-1251; not valid UTF-8.
const PROCESS_CP1251: &[u8] = &[0xCF, 0xF0, 0xEE, 0xF6, 0xE5, 0xF1, 0xF1];

/// "Процесс" in IBM866.
const PROCESS_CP866: &[u8] = &[0x8F, 0xE0, 0xAE, 0xE6, 0xA5, 0xE1, 0xE1];

#[test]
fn utf8_output_decodes_directly() {
    assert_eq!(
        decode_output("Процесс pid: 1".as_bytes(), Some("utf-8")),
        "Процесс pid: 1"
    );
}

#[test]
fn cp1251_bytes_fall_through_to_windows_1251() {
    assert!(std::str::from_utf8(PROCESS_CP1251).is_err());
    assert_eq!(decode_output(PROCESS_CP1251, Some("utf-8")), "Процесс");
}

#[test]
fn preferred_encoding_is_tried_first() {
    assert_eq!(decode_output(PROCESS_CP866, Some("cp866")), "Процесс");
}

#[test]
fn cp866_bytes_without_preference_decode_as_windows_1251() {
    let (expected, _, _) = WINDOWS_1251.decode(PROCESS_CP866);
    assert_eq!(decode_output(PROCESS_CP866, Some("utf-8")), expected);
    assert_ne!(decode_output(PROCESS_CP866, Some("utf-8")), "Процесс");
}

#[test]
fn candidate_list_has_no_duplicates() {
    assert_eq!(
        candidate_encodings(Some("utf-8")),
        vec![UTF_8, WINDOWS_1251, IBM866]
    );
    assert_eq!(
        candidate_encodings(Some("cp866")),
        vec![IBM866, UTF_8, WINDOWS_1251]
    );
}

#[test]
fn locale_charset_is_read_from_the_first_set_variable() {
    let vars = |key: &str| match key {
        "LC_ALL" => Some(String::new()),
        "LANG" => Some("ru_RU.CP1251".to_string()),
        _ => None,
    };
    assert_eq!(locale_encoding(vars), Some(WINDOWS_1251));

    let with_modifier = |key: &str| (key == "LC_CTYPE").then(|| "de_DE.UTF-8@euro".to_string());
    assert_eq!(locale_encoding(with_modifier), Some(UTF_8));

    let no_charset = |key: &str| (key == "LANG").then(|| "C".to_string());
    assert_eq!(locale_encoding(no_charset), None);
}

#[test]
#[serial]
fn process_locale_drives_the_default_choice() {
    let saved = std::env::var("LC_ALL").ok();
    // SAFETY: serialized test; no other thread reads the environment here.
    unsafe { std::env::set_var("LC_ALL", "ru_RU.CP866") };

    let first = candidate_encodings(None)[0];
    let decoded = decode_output(PROCESS_CP866, None);

    unsafe {
        match saved {
            Some(value) => std::env::set_var("LC_ALL", value),
            None => std::env::remove_var("LC_ALL"),
        }
    }
    assert_eq!(first, IBM866);
    assert_eq!(decoded, "Процесс");
}

// ============================================================================
// Exclusive-access probe and gate
// ============================================================================

#[test]
fn readable_writable_file_is_not_locked() {
    let (_dir, path) = create_file("free.txt", "x");
    assert!(!is_locked(&path));
}

#[test]
fn missing_file_and_directory_count_as_locked() {
    let (dir, _path) = create_file("a.txt", "x");
    assert!(is_locked(&dir.path().join("missing.txt")));
    assert!(is_locked(dir.path()));
}

#[test]
fn gate_survives_a_panicking_holder() {
    let gate = Arc::new(ProbeGate::new());
    let clone = Arc::clone(&gate);
    let result = std::thread::spawn(move || {
        let _guard = clone.acquire();
        panic!("probe blew up");
    })
    .join();
    assert!(result.is_err());

    let _guard = gate.acquire();
}

// ============================================================================
// Single-file probes
// ============================================================================

#[test]
fn missing_path_is_path_not_found() {
    let fx = Fixture::new(FakeHost::new());
    let err = prober(&fx)
        .probe(Path::new("/definitely/not/here.txt"), &mut Reporter::silent())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PathNotFound);
    assert_eq!(fx.host.tool_runs(), 0);
}

#[test]
fn reported_owner_is_returned() {
    let (_dir, path) = create_file("x.txt", "x");
    let line = format!("notepad.exe pid: 1234 type: File  {}\n", path.display());
    let fx = Fixture::new(FakeHost::new().tool_output_for(&path, &line));

    let owners = prober(&fx).probe(&path, &mut Reporter::silent()).unwrap();

    assert_eq!(owners, vec![LockOwner::new("notepad.exe", 1234, path.clone())]);
    assert_eq!(fx.trace.count(EventAction::ToolRun), 1);
}

#[test]
fn license_prompt_is_retried_once() {
    let (_dir, path) = create_file("x.txt", "x");
    let fx = Fixture::new(
        FakeHost::new()
            .queue_tool(CommandOutput::failed(1, "You must accept the EULA"))
            .queue_tool(CommandOutput::ok("app.exe pid: 7 type: File  /somewhere")),
    );

    let owners = prober(&fx).probe(&path, &mut Reporter::silent()).unwrap();

    assert_eq!(owners.len(), 1);
    assert_eq!(owners[0].pid, 7);
    assert_eq!(fx.host.tool_runs(), 2);
}

#[test]
fn tool_error_is_tool_execution_failed() {
    let (_dir, path) = create_file("x.txt", "x");
    let fx = Fixture::new(
        FakeHost::new().queue_tool(CommandOutput::failed(2, "Error opening \\Device\\Null")),
    );

    let err = prober(&fx).probe(&path, &mut Reporter::silent()).unwrap_err();

    assert_eq!(
        err,
        UnlatchError::ToolExecutionFailed("Error opening \\Device\\Null".to_string())
    );
    assert_eq!(fx.host.tool_runs(), 1);
}

#[test]
fn no_matches_with_error_exit_is_not_a_failure() {
    let (_dir, path) = create_file("x.txt", "x");
    let mut failed = CommandOutput::failed(1, "");
    failed.stdout = b"No matching handles found.".to_vec();
    let fx = Fixture::new(FakeHost::new().queue_tool(failed));

    let owners = prober(&fx).probe(&path, &mut Reporter::silent()).unwrap();
    assert!(owners.is_empty());
}

#[test]
fn missing_tool_is_tool_unavailable() {
    let (_dir, path) = create_file("x.txt", "x");
    let fx = Fixture::new(FakeHost::new().tool_missing());

    let err = prober(&fx).probe(&path, &mut Reporter::silent()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ToolUnavailable);
}

#[test]
fn no_matches_retries_by_base_name() {
    let (_dir, path) = create_file("report.docx", "x");
    let fx = Fixture::new(
        FakeHost::new().tool_output_for("report.docx", "winword.exe pid: 55 type: File"),
    );

    let owners = prober(&fx).probe(&path, &mut Reporter::silent()).unwrap();

    assert_eq!(fx.host.tool_runs(), 2);
    assert_eq!(owners.len(), 1);
    assert_eq!(owners[0].file_path, path);
}

#[test]
fn unattributed_lock_yields_placeholder() {
    let (_dir, path) = create_file("held.txt", "x");
    let fx = Fixture::new(FakeHost::new().with_lock(&path, 0));

    let owners = prober(&fx).probe(&path, &mut Reporter::silent()).unwrap();

    assert_eq!(owners.len(), 1);
    assert!(owners[0].is_placeholder());
    assert_eq!(owners[0].process_name, UNKNOWN_OWNER_NAME);
    assert_eq!(owners[0].file_path, path);
}

#[test]
fn free_file_yields_no_owners() {
    let (_dir, path) = create_file("free.txt", "x");
    let fx = Fixture::new(FakeHost::new());
    assert!(prober(&fx).probe(&path, &mut Reporter::silent()).unwrap().is_empty());
}

// ============================================================================
// Directories
// ============================================================================

#[test]
fn directory_owner_reported_by_tool_skips_the_sweep() {
    let (dir, _files) = create_tree(3);
    let line = format!("code.exe pid: 900 type: File  {}", dir.path().display());
    let fx = Fixture::new(FakeHost::new().tool_output_for(dir.path(), &line));

    let owners = prober(&fx).probe(dir.path(), &mut Reporter::silent()).unwrap();

    assert_eq!(owners.len(), 1);
    assert_eq!(fx.host.tool_runs(), 1);
}

#[test]
fn small_directory_is_swept_file_by_file() {
    let (dir, files) = create_tree(3);
    let line = format!("excel.exe pid: 77 type: File  {}", files[0].display());
    let fx = Fixture::new(
        FakeHost::new()
            .with_lock(&files[0], 77)
            .with_lock(&files[2], 0)
            .tool_output_for(&files[0], &line),
    );
    let reports = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&reports);
    let mut reporter = Reporter::new(CancelToken::new(), move |p: ProgressReport| {
        sink.lock().unwrap().push(p);
        true
    });

    let owners = prober(&fx).probe(dir.path(), &mut reporter).unwrap();

    assert_eq!(owners.len(), 2);
    assert_eq!(owners[0].pid, 77);
    assert!(owners[1].is_placeholder());
    assert_eq!(owners[1].file_path, files[2]);
    // directory, then the two locked files
    assert_eq!(fx.host.tool_runs(), 3);
    let reports = reports.lock().unwrap();
    assert_eq!(reports.len(), 3);
    assert_eq!(*reports.last().unwrap(), ProgressReport::new(3, 3));
}

#[test]
fn large_unlocked_directory_is_empty_after_sampling() {
    let (dir, _files) = create_tree(500);
    let fx = Fixture::new(FakeHost::new());
    let reports = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&reports);
    let mut reporter = Reporter::new(CancelToken::new(), move |p: ProgressReport| {
        sink.lock().unwrap().push(p);
        true
    });

    let owners = prober(&fx).probe(dir.path(), &mut reporter).unwrap();

    assert!(owners.is_empty());
    // only the whole-directory probe
    assert_eq!(fx.host.tool_runs(), 1);
    let reports = reports.lock().unwrap();
    assert_eq!(reports.len(), 100);
    assert!(reports.iter().all(|p| p.total == 100));
}

#[test]
fn sampling_stops_after_enough_locked_files() {
    let (dir, files) = create_tree(150);
    let mut host = FakeHost::new();
    for file in &files {
        let line = format!("indexer.exe pid: 500 type: File  {}", file.display());
        host = host.with_lock(file, 500).tool_output_for(file, &line);
    }
    let fx = Fixture::new(host);

    let owners = prober(&fx).probe(dir.path(), &mut Reporter::silent()).unwrap();

    assert_eq!(owners.len(), 1, "owners are deduplicated by pid and name");
    assert_eq!(owners[0].pid, 500);
    assert_eq!(fx.host.tool_runs(), fx.config.sample_lock_limit);
}

#[test]
fn sampled_locks_without_owners_yield_one_placeholder() {
    let (dir, files) = create_tree(120);
    let mut host = FakeHost::new();
    for file in &files {
        host = host.with_lock(file, 0);
    }
    let fx = Fixture::new(host);

    let owners = prober(&fx)
        .probe_large_directory(dir.path(), &mut Reporter::silent())
        .unwrap();

    assert_eq!(owners.len(), 1);
    assert!(owners[0].is_placeholder());
}

#[test]
fn consumer_stop_cancels_sampling() {
    let (dir, _files) = create_tree(200);
    let fx = Fixture::new(FakeHost::new());
    let token = CancelToken::new();
    let mut reporter = Reporter::new(token.clone(), |p: ProgressReport| p.current < 3);

    let err = prober(&fx).probe(dir.path(), &mut reporter).unwrap_err();

    assert_eq!(err, UnlatchError::Cancelled);
    assert!(token.is_cancelled());
    assert_eq!(fx.host.tool_runs(), 0);
}
