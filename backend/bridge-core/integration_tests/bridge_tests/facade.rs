use crate::bridge_tests::helpers::{app_host, fixture_host, local_facade};

use bridge_core::codec::RichValue;
use bridge_core::dispatch::BatchItem;
use bridge_core::error::{FacadeError, FailureCode};
use bridge_core::procedure::ProcedureKind;

use std::time::{Duration, UNIX_EPOCH};

/// **VALUE**: Verifies the simplest query works end to end through the facade.
///
/// **WHY THIS MATTERS**: `health.ping` is what the shell uses to check that a
/// view is wired up. If it fails nothing else will work.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - Request/response correlation (request_id) is broken
/// - No-input queries are rejected by validation
/// - The facade never resolves its pending request
#[tokio::test]
async fn given_app_host_when_query_ping_then_pong() {
    // GIVEN: A view attached to the application host
    let app = app_host();
    let facade = local_facade(&app.host);

    // WHEN: Querying health.ping
    let value = facade
        .query("health.ping", RichValue::Undefined)
        .await
        .expect("Ping should succeed");

    // THEN: pong
    assert_eq!(value, RichValue::from("pong"));
}

/// **VALUE**: Verifies mutations receive their validated input and return
/// structured output.
///
/// **WHY THIS MATTERS**: Every form in the UI goes through a mutation like
/// `example.echo`.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - Input is lost or double-encoded across the boundary
/// - Object results are flattened into strings
#[tokio::test]
async fn given_echo_mutation_when_called_then_echoed_object() {
    // GIVEN: A view attached to the application host
    let app = app_host();
    let facade = local_facade(&app.host);

    // WHEN: Calling example.echo
    let value = facade
        .mutate(
            "example.echo",
            RichValue::object([("message", "hello bridge")]),
        )
        .await
        .expect("Echo should succeed");

    // THEN: Message comes back under `echoed`
    assert_eq!(
        value.get("echoed").and_then(RichValue::as_str),
        Some("hello bridge")
    );
}

/// **VALUE**: Verifies host failures reach the view as structured
/// descriptors with the right code.
///
/// **WHY THIS MATTERS**: Views branch on failure codes (show a form error for
/// INVALID_INPUT, a bug report for PROCEDURE_NOT_FOUND).
///
/// **BUG THIS CATCHES**: Would catch if:
/// - Failures arrive as transport errors instead of `FacadeError::Procedure`
/// - Codes are lost or remapped on the wire
/// - Validation diagnostics are dropped
#[tokio::test]
async fn given_bad_calls_when_invoked_then_structured_failures() {
    // GIVEN: A view attached to the application host
    let app = app_host();
    let facade = local_facade(&app.host);

    // WHEN: Calling an unknown path
    let unknown = facade
        .query("health.nope", RichValue::Undefined)
        .await
        .expect_err("Unknown path should fail");

    // THEN: PROCEDURE_NOT_FOUND
    let failure = unknown.as_failure().expect("Should be a procedure failure");
    assert_eq!(failure.code, FailureCode::ProcedureNotFound);

    // WHEN: Calling echo without its required field
    let invalid = facade
        .mutate("example.echo", RichValue::object([("msg", "typo")]))
        .await
        .expect_err("Missing field should fail");

    // THEN: INVALID_INPUT with diagnostics
    let failure = invalid.as_failure().expect("Should be a procedure failure");
    assert_eq!(failure.code, FailureCode::InvalidInput);
    assert!(!failure.diagnostics.is_empty());

    // WHEN: Calling a mutation as a query
    let mismatch = facade
        .query("example.echo", RichValue::object([("message", "x")]))
        .await
        .expect_err("Kind mismatch should fail");

    // THEN: PROCEDURE_NOT_FOUND
    assert!(matches!(
        mismatch,
        FacadeError::Procedure(ref failure) if failure.code == FailureCode::ProcedureNotFound
    ));
}

/// **VALUE**: Verifies a batch returns one outcome per item, each equal to
/// what a single call returns.
///
/// **WHY THIS MATTERS**: Views batch startup queries. A single bad item must
/// not hide the good ones.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - Outcomes are mismatched to ids on the wire
/// - One failure fails the whole batch
#[tokio::test]
async fn given_mixed_batch_when_invoke_batch_then_outcome_per_id() {
    // GIVEN: A view attached to the application host
    let app = app_host();
    let facade = local_facade(&app.host);

    // WHEN: Sending a batch with a success, a failure and a mutation
    let outcome = facade
        .invoke_batch(vec![
            BatchItem::new("ping", "health.ping", ProcedureKind::Query, ()),
            BatchItem::new("missing", "nowhere.at.all", ProcedureKind::Query, ()),
            BatchItem::new(
                "echo",
                "example.echo",
                ProcedureKind::Mutation,
                RichValue::object([("message", "batched")]),
            ),
        ])
        .await
        .expect("Batch transport should succeed");

    // THEN: Three outcomes keyed by id
    assert_eq!(outcome.len(), 3);
    assert_eq!(outcome["ping"], Ok(RichValue::from("pong")));
    assert_eq!(
        outcome["missing"].as_ref().map_err(|f| f.code),
        Err(FailureCode::ProcedureNotFound)
    );
    let echo = outcome["echo"].as_ref().expect("Echo should succeed");
    assert_eq!(echo.get("echoed").and_then(RichValue::as_str), Some("batched"));
}

/// **VALUE**: Verifies duplicate ids are reported once over the wire without
/// running either operation.
///
/// **WHY THIS MATTERS**: The view keys outcomes by id. A duplicate cannot be
/// answered unambiguously.
///
/// **BUG THIS CATCHES**: Would catch the boundary passing duplicates through to
/// the dispatcher, where one result would be silently overwritten.
#[tokio::test]
async fn given_duplicate_ids_when_invoke_batch_then_single_invalid_input() {
    // GIVEN: A view attached to the application host
    let app = app_host();
    let facade = local_facade(&app.host);

    // WHEN: Reusing an id
    let outcome = facade
        .invoke_batch(vec![
            BatchItem::new("same", "health.ping", ProcedureKind::Query, ()),
            BatchItem::new("same", "health.ping", ProcedureKind::Query, ()),
        ])
        .await
        .expect("Batch transport should succeed");

    // THEN: One INVALID_INPUT outcome
    assert_eq!(outcome.len(), 1);
    assert_eq!(
        outcome["same"].as_ref().map_err(|f| f.code),
        Err(FailureCode::InvalidInput)
    );
}

/// **VALUE**: Verifies rich values survive the boundary in both directions.
///
/// **WHY THIS MATTERS**: Dates, sets, maps, big integers and `undefined` are
/// exactly the values plain JSON would corrupt.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - The facade or session drops the envelope meta
/// - `undefined` collapses into `null`
#[tokio::test]
async fn given_rich_value_when_sent_through_identity_then_unchanged() {
    // GIVEN: A host that echoes its input
    let fixture = fixture_host();
    let facade = local_facade(&fixture.host);
    let value = RichValue::object([
        ("at", RichValue::Date(UNIX_EPOCH + Duration::from_secs(1_700_000_000))),
        ("tags", RichValue::Set(vec!["a".into(), "b".into()])),
        (
            "index",
            RichValue::Map(vec![(RichValue::Integer(7), RichValue::from("seven"))]),
        ),
        ("big", RichValue::BigInt(i128::MAX)),
        ("missing", RichValue::Undefined),
        ("empty", RichValue::Null),
    ]);

    // WHEN: Sending it through fixture.identity
    let echoed = facade
        .query("fixture.identity", value.clone())
        .await
        .expect("Identity should succeed");

    // THEN: Same value back
    assert_eq!(echoed, value);

    // AND: A bare undefined stays undefined
    let nothing = facade
        .query("fixture.identity", RichValue::Undefined)
        .await
        .expect("Identity should succeed");
    assert!(nothing.is_undefined());
}

/// **VALUE**: Verifies calls fail cleanly once the host side is gone.
///
/// **WHY THIS MATTERS**: A view can outlive its host during shutdown. It must
/// get an error, not hang forever.
///
/// **BUG THIS CATCHES**: Would catch pending requests never being resolved
/// when the boundary closes.
#[tokio::test]
async fn given_closed_boundary_when_query_then_closed_error() {
    // GIVEN: A facade whose host end is dropped immediately
    let (view_end, host_end) = bridge_core::ipc::BoundaryLink::pair();
    drop(host_end);
    let facade = bridge_core::facade::BridgeFacade::over(view_end);

    // WHEN: Querying
    let result = facade.query("health.ping", RichValue::Undefined).await;

    // THEN: Closed
    assert!(matches!(result, Err(FacadeError::Closed { .. })));
}
