// Unit tests for logger module initialization logic
// Tests focus on idempotence and error handling

use crate::error::ShellError;
use crate::logger::{LOG_FILE_NAME, build_dispatch, initialize};

use tempfile::TempDir;

/// **VALUE**: Verifies that calling initialize() multiple times doesn't panic or fail.
///
/// **WHY THIS MATTERS**: Logger initialization can be reached from more than
/// one code path (startup, tests). A second call must not crash the process.
///
/// **BUG THIS CATCHES**: Would catch if the Once or AtomicBool guards are removed,
/// causing fern to fail when trying to set a global logger twice.
#[test]
fn given_logger_initialized_when_called_again_then_returns_ok() {
    // GIVEN: A valid temporary directory
    let temp_dir = TempDir::new().expect("Should create temp dir");

    // WHEN: Calling initialize twice
    let result1 = initialize(temp_dir.path());
    let result2 = initialize(temp_dir.path());

    // THEN: Both should return Ok (second one logs warning but doesn't error)
    assert!(result1.is_ok(), "First initialization should succeed");
    assert!(
        result2.is_ok(),
        "Second initialization should succeed (idempotent)"
    );
}

/// **VALUE**: Verifies that a missing log directory is created.
///
/// **WHY THIS MATTERS**: On first run the platform data directory has no
/// `desk-shell/logs` folder yet.
///
/// **BUG THIS CATCHES**: Would catch `fern::log_file` being called before the
/// directory exists, failing every first launch.
#[test]
fn given_missing_nested_dir_when_dispatch_built_then_log_file_created() {
    // GIVEN: A nested directory that doesn't exist yet
    let temp_dir = TempDir::new().expect("Should create temp dir");
    let log_dir = temp_dir.path().join("desk-shell").join("logs");

    // WHEN: Building the dispatch
    let result = build_dispatch(&log_dir);

    // THEN: The log file exists
    assert!(result.is_ok(), "Dispatch should build: {:?}", result.err());
    assert!(log_dir.join(LOG_FILE_NAME).exists());
}

/// **VALUE**: Verifies that an unusable log directory is reported, not panicked on.
///
/// **WHY THIS MATTERS**: A read-only or bogus `SHELL_LOG_DIR` should stop startup
/// with a clear error.
///
/// **BUG THIS CATCHES**: Would catch if `fern::log_file()` or `create_dir_all` were
/// unwrapped instead of mapped into `ShellError::Logger`.
#[test]
fn given_invalid_log_dir_when_dispatch_built_then_returns_logger_error() {
    // GIVEN: A path below a regular file, which can never be a directory
    let temp_dir = TempDir::new().expect("Should create temp dir");
    let blocker = temp_dir.path().join("not-a-dir");
    std::fs::write(&blocker, b"x").expect("Should write blocker file");
    let invalid_dir = blocker.join("logs");

    // WHEN: Building the dispatch
    let result = build_dispatch(&invalid_dir);

    // THEN: Logger error (not panic)
    assert!(
        matches!(result, Err(ShellError::Logger { .. })),
        "Should return ShellError::Logger for invalid log directory"
    );
}
