use crate::ErrorLocation;
use std::panic::Location;

/// **VALUE**: Verifies that `ErrorLocation::from()` captures file, line, and column.
///
/// **WHY THIS MATTERS**: Every bridge error carries a location for the host log. If the
/// capture is wrong, a failing dispatch cannot be traced back to its origin.
///
/// **BUG THIS CATCHES**: Would catch if `Location::caller()` stops being propagated or the
/// file path is dropped.
#[test]
#[track_caller]
fn given_location_caller_when_error_location_created_then_captures_file_line_column() {
    // GIVEN / WHEN: Creating ErrorLocation from caller
    let location = ErrorLocation::from(Location::caller());

    // THEN: Should capture file, line, and column
    assert!(
        location.file.contains("error_location.rs"),
        "Should capture file path"
    );
    assert!(location.line > 0, "Should capture a line number");
    assert!(location.column > 0, "Should capture column number");
}

/// **VALUE**: Verifies the bracketed `[file:line:column]` Display format.
///
/// **WHY THIS MATTERS**: Host log lines are grepped by this format when diagnosing a
/// misbehaving view session.
///
/// **BUG THIS CATCHES**: Would catch a changed Display implementation (missing brackets,
/// missing line or column).
#[test]
fn given_error_location_when_formatted_then_produces_bracketed_format() {
    // GIVEN: An ErrorLocation
    let location = ErrorLocation::caller();

    // WHEN: Formatting as string
    let formatted = location.to_string();

    // THEN: Should produce "[file:line:column]" format
    assert!(formatted.starts_with('['), "Should start with '['");
    assert!(formatted.ends_with(']'), "Should end with ']'");
    assert!(formatted.contains(&location.line.to_string()));
    assert_eq!(
        formatted.matches(':').count(),
        2,
        "Should have exactly 2 colons"
    );
}

/// **VALUE**: Verifies that `ErrorLocation::caller()` honours `#[track_caller]`.
///
/// **WHY THIS MATTERS**: Error constructors across the bridge are `#[track_caller]`; each
/// call site must get its own line or the log lies about where a failure came from.
///
/// **BUG THIS CATCHES**: Would catch removal of `#[track_caller]` from `caller()`.
#[test]
fn given_multiple_call_sites_when_capturing_location_then_each_has_unique_line() {
    // GIVEN: A tracked helper
    #[track_caller]
    fn capture_location() -> ErrorLocation {
        ErrorLocation::caller()
    }

    // WHEN: Capturing from consecutive lines
    let loc1 = capture_location();
    let loc2 = capture_location();

    // THEN: Same file, sequential lines
    assert_eq!(loc1.file, loc2.file, "Should have same file");
    assert_eq!(loc1.line + 1, loc2.line, "Lines should be sequential");
}

/// **VALUE**: Verifies that locations serialize (they are embedded in serializable errors).
///
/// **BUG THIS CATCHES**: Would catch removal of the `Serialize` derive, which would break
/// the shell's serializable startup error.
#[test]
fn given_error_location_when_serialized_then_contains_fields() {
    // GIVEN: A location
    let location = ErrorLocation::caller();

    // WHEN: Serializing
    let json = serde_json::to_string(&location).expect("location should serialize");

    // THEN: All three fields are present
    assert!(json.contains("\"file\""));
    assert!(json.contains("\"line\""));
    assert!(json.contains("\"column\""));
}
