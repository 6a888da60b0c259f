// Unit tests for single and batched invocation
// Tests the error taxonomy, at-most-once execution and batch outcomes

use crate::codec::RichValue;
use crate::dispatch::{BatchItem, DUPLICATE_BATCH_ID_MESSAGE, Dispatcher, InvocationRequest};
use crate::error::{FailureCode, HandlerError, ProcedureFailure};
use crate::procedure::{NoInput, ProcedureKind, ProcedureRegistry};
use crate::subscription::{SubscriptionEvent, SubscriptionManager, TaggedEvent};
use crate::tests::next_event;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures_util::stream;
use serde::Deserialize;
use tokio::sync::mpsc;

#[derive(Deserialize)]
struct AddInput {
    a: i64,
    b: i64,
}

/// Registry with a counter so tests can tell whether a handler ran.
fn dispatcher_with_counter() -> (Dispatcher, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut registry = ProcedureRegistry::new();

    let counted = Arc::clone(&calls);
    registry
        .query("math.add", move |input: AddInput| {
            counted.fetch_add(1, Ordering::SeqCst);
            async move { Ok::<_, HandlerError>(input.a + input.b) }
        })
        .expect("Should register add")
        .mutation("math.fail", |_: NoInput| async {
            Err::<(), _>(HandlerError::new("division by zero"))
        })
        .expect("Should register fail")
        .query("math.panic", |_: NoInput| async {
            if true {
                panic!("handler blew up");
            }
            Ok::<_, HandlerError>(())
        })
        .expect("Should register panic")
        .subscription("math.stream", |_: NoInput| async {
            Ok::<_, HandlerError>(stream::iter(vec![Ok::<_, HandlerError>(1_i64)]))
        })
        .expect("Should register stream");

    (Dispatcher::new(Arc::new(registry)), calls)
}

fn add_input(a: i64, b: i64) -> RichValue {
    RichValue::object([("a", a), ("b", b)])
}

// ============================================
// SINGLE INVOCATION
// ============================================

/// **VALUE**: Verifies a valid query runs exactly once and returns its value.
///
/// **WHY THIS MATTERS**: Baseline behaviour every other test builds on.
///
/// **BUG THIS CATCHES**: Would catch the dispatcher calling a handler twice
/// (e.g. once for validation and once for real).
#[tokio::test]
async fn given_valid_query_when_invoke_then_value_and_single_call() {
    let (dispatcher, calls) = dispatcher_with_counter();

    let value = dispatcher
        .invoke(InvocationRequest::query("math.add", add_input(2, 3)))
        .await
        .expect("Should succeed");

    assert_eq!(value, RichValue::Integer(5));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

/// **VALUE**: Verifies input that fails validation never reaches the handler.
///
/// **WHY THIS MATTERS**: Handlers are written assuming well-formed input. A
/// rejected request must be side-effect free.
///
/// **BUG THIS CATCHES**: Would catch validation running after (or instead of
/// before) the handler call.
#[tokio::test]
async fn given_invalid_input_when_invoke_then_invalid_input_and_handler_not_run() {
    let (dispatcher, calls) = dispatcher_with_counter();

    let failure = dispatcher
        .invoke(InvocationRequest::query(
            "math.add",
            RichValue::object([("a", "two")]),
        ))
        .await
        .expect_err("Should be rejected");

    assert_eq!(failure.code, FailureCode::InvalidInput);
    assert!(!failure.diagnostics.is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

/// **VALUE**: Verifies a handler error becomes `HANDLER_ERROR` with the
/// handler's message and no host location.
///
/// **WHY THIS MATTERS**: The view shows this message to users.
///
/// **BUG THIS CATCHES**: Would catch `Display` (with `[file:line:col]`) leaking
/// through.
#[tokio::test]
async fn given_failing_handler_when_invoke_then_handler_error() {
    let (dispatcher, _) = dispatcher_with_counter();

    let failure = dispatcher
        .invoke(InvocationRequest::mutation("math.fail", RichValue::Undefined))
        .await
        .expect_err("Should fail");

    assert_eq!(
        failure,
        ProcedureFailure::new(FailureCode::HandlerError, "division by zero")
    );
}

/// **VALUE**: Verifies a panicking handler is contained and reported.
///
/// **WHY THIS MATTERS**: One bad procedure must not take the view's session
/// down with it.
///
/// **BUG THIS CATCHES**: Would catch a missing `catch_unwind` around the call.
#[tokio::test]
async fn given_panicking_handler_when_invoke_then_handler_error() {
    let (dispatcher, _) = dispatcher_with_counter();

    let failure = dispatcher
        .invoke(InvocationRequest::query("math.panic", RichValue::Undefined))
        .await
        .expect_err("Should fail");

    assert_eq!(failure.code, FailureCode::HandlerError);
    assert_eq!(failure.message, "procedure panicked");
}

/// **VALUE**: Verifies subscriptions cannot be invoked as a one-shot call.
///
/// **WHY THIS MATTERS**: A subscription has no single result.
///
/// **BUG THIS CATCHES**: Would catch the dispatcher accepting any kind.
#[tokio::test]
async fn given_subscription_path_when_invoke_then_procedure_not_found() {
    let (dispatcher, _) = dispatcher_with_counter();

    for kind in [ProcedureKind::Query, ProcedureKind::Subscription] {
        let failure = dispatcher
            .invoke(InvocationRequest {
                path: "math.stream".to_string(),
                kind,
                input: RichValue::Undefined,
            })
            .await
            .expect_err("Should fail");
        assert_eq!(failure.code, FailureCode::ProcedureNotFound, "{kind}");
    }
}

// ============================================
// BATCH INVOCATION
// ============================================

/// **VALUE**: Verifies a mixed batch yields one outcome per id, each matching
/// what a single invoke would have returned.
///
/// **WHY THIS MATTERS**: A batch is only a transport optimisation. One failing
/// item must not affect the others.
///
/// **BUG THIS CATCHES**: Would catch short-circuiting on the first error or
/// outcomes being attached to the wrong id.
#[tokio::test]
async fn given_mixed_batch_when_invoke_batch_then_outcome_per_id() {
    let (dispatcher, calls) = dispatcher_with_counter();

    let outcome = dispatcher
        .invoke_batch(vec![
            BatchItem::new("sum", "math.add", ProcedureKind::Query, add_input(1, 1)),
            BatchItem::new("missing", "math.nope", ProcedureKind::Query, ()),
            BatchItem::new("boom", "math.fail", ProcedureKind::Mutation, ()),
            BatchItem::new("other", "math.add", ProcedureKind::Query, add_input(4, 5)),
        ])
        .await;

    assert_eq!(outcome.len(), 4);
    assert_eq!(outcome["sum"], Ok(RichValue::Integer(2)));
    assert_eq!(outcome["other"], Ok(RichValue::Integer(9)));
    assert_eq!(
        outcome["missing"].as_ref().map_err(|f| f.code),
        Err(FailureCode::ProcedureNotFound)
    );
    assert_eq!(
        outcome["boom"].as_ref().map_err(|f| f.code),
        Err(FailureCode::HandlerError)
    );
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

/// **VALUE**: Verifies a repeated id gets a single failure and none of its
/// operations run.
///
/// **WHY THIS MATTERS**: Outcomes are keyed by id. Running both operations
/// would leave one result with nowhere to go.
///
/// **BUG THIS CATCHES**: Would catch last-write-wins on duplicate ids, and side
/// effects from operations whose outcome is lost.
#[tokio::test]
async fn given_duplicate_batch_ids_when_invoke_batch_then_single_failure_and_no_calls() {
    let (dispatcher, calls) = dispatcher_with_counter();

    let outcome = dispatcher
        .invoke_batch(vec![
            BatchItem::new("x", "math.add", ProcedureKind::Query, add_input(1, 2)),
            BatchItem::new("x", "math.add", ProcedureKind::Query, add_input(3, 4)),
            BatchItem::new("y", "math.add", ProcedureKind::Query, add_input(5, 6)),
        ])
        .await;

    assert_eq!(outcome.len(), 2);
    let duplicate = outcome["x"].as_ref().expect_err("Duplicate id should fail");
    assert_eq!(duplicate.code, FailureCode::InvalidInput);
    assert_eq!(duplicate.message, DUPLICATE_BATCH_ID_MESSAGE);
    assert_eq!(outcome["y"], Ok(RichValue::Integer(11)));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

/// **VALUE**: Verifies an empty batch is not an error.
///
/// **WHY THIS MATTERS**: Views may flush an empty queue.
///
/// **BUG THIS CATCHES**: Would catch special-casing that rejects or hangs.
#[tokio::test]
async fn given_empty_batch_when_invoke_batch_then_empty_outcome() {
    let (dispatcher, _) = dispatcher_with_counter();

    assert!(dispatcher.invoke_batch(Vec::new()).await.is_empty());
}

// ============================================
// SHARED ERROR TAXONOMY
// ============================================

/// **VALUE**: Verifies the same bad path fails identically through invoke,
/// batch and subscribe.
///
/// **WHY THIS MATTERS**: All three share one resolver. Views map failure codes
/// to UI without caring how the call was made.
///
/// **BUG THIS CATCHES**: Would catch one entry point drifting to its own
/// resolution rules or messages.
#[tokio::test]
async fn given_unknown_path_when_called_three_ways_then_identical_failure() {
    let (dispatcher, _) = dispatcher_with_counter();
    let path = "math.unknown";

    // WHEN: Invoking as a query
    let invoked = dispatcher
        .invoke(InvocationRequest::query(path, ()))
        .await
        .expect_err("Should fail");

    // WHEN: Invoking inside a batch
    let batched = dispatcher
        .invoke_batch(vec![BatchItem::new("only", path, ProcedureKind::Query, ())])
        .await
        .remove("only")
        .expect("Outcome present")
        .expect_err("Should fail");

    // WHEN: Subscribing
    let (tx, mut events) = mpsc::unbounded_channel::<TaggedEvent>();
    let manager = SubscriptionManager::new(Arc::clone(dispatcher.registry()), Arc::new(tx));
    manager
        .subscribe("k1", path, RichValue::Undefined)
        .await
        .expect("Subscribe itself is accepted");
    let event = next_event(&mut events).await;

    // THEN: Same descriptor everywhere
    assert_eq!(invoked, batched);
    assert_eq!(event.key, "k1");
    assert_eq!(event.event, SubscriptionEvent::Error(invoked));
}
