use crate::bridge_tests::helpers::{
    TEST_TICK_INTERVAL, app_host, fixture_host, local_facade, next_event, wait_until,
};

use bridge_core::codec::RichValue;
use bridge_core::error::FailureCode;
use bridge_core::subscription::SubscriptionEvent;

use std::sync::atomic::Ordering;

/// **VALUE**: Verifies a ticking subscription delivers consecutive values in
/// order under its own key.
///
/// **WHY THIS MATTERS**: Live views (clocks, progress, logs) render events in
/// arrival order.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - Events are routed to the wrong key
/// - Values are skipped or reordered between host and view
/// - The first value waits for a full interval
#[tokio::test]
async fn given_ticks_subscription_when_streaming_then_values_in_order() {
    // GIVEN: A view attached to the application host
    let app = app_host();
    let facade = local_facade(&app.host);

    // WHEN: Subscribing to example.ticks
    let mut ticks = facade
        .subscribe("example.ticks", RichValue::Undefined)
        .await
        .expect("Subscribe should succeed");

    // THEN: 0, 1, 2 in order
    assert!(ticks.key().starts_with("sub-"));
    for expected in 0..3_i64 {
        assert_eq!(
            next_event(&mut ticks).await,
            Some(SubscriptionEvent::Data(RichValue::Integer(expected)))
        );
    }
}

/// **VALUE**: Verifies cancelling stops delivery at once and tears the producer
/// down on the host.
///
/// **WHY THIS MATTERS**: Unmounted components must stop receiving data, and
/// the host must not keep producing for nobody.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - Values already in flight are still handed out after cancel
/// - The unsubscribe never reaches the host
/// - A second cancel is treated as a new request
#[tokio::test]
async fn given_live_subscription_when_cancelled_then_no_more_events_and_producer_dropped() {
    // GIVEN: A streaming subscription
    let fixture = fixture_host();
    let facade = local_facade(&fixture.host);
    let mut ticks = facade
        .subscribe("fixture.ticks", RichValue::Undefined)
        .await
        .expect("Subscribe should succeed");
    assert!(matches!(
        next_event(&mut ticks).await,
        Some(SubscriptionEvent::Data(_))
    ));

    // WHEN: Cancelling from a clone of the canceller
    let canceller = ticks.canceller();
    assert!(canceller.cancel());
    assert!(!ticks.cancel());

    // THEN: No further events
    tokio::time::sleep(TEST_TICK_INTERVAL * 3).await;
    assert_eq!(ticks.next().await, None);

    // THEN: Host producer dropped
    let dropped = fixture.producer_dropped.clone();
    wait_until("the producer is dropped", || dropped.load(Ordering::SeqCst)).await;
}

/// **VALUE**: Verifies dropping the `Subscription` cancels it.
///
/// **WHY THIS MATTERS**: Views that forget to call `cancel` must not leak a
/// host producer.
///
/// **BUG THIS CATCHES**: Would catch a missing `Drop` implementation.
#[tokio::test]
async fn given_live_subscription_when_dropped_then_producer_dropped() {
    // GIVEN: A streaming subscription
    let fixture = fixture_host();
    let facade = local_facade(&fixture.host);
    let mut ticks = facade
        .subscribe("fixture.ticks", RichValue::Undefined)
        .await
        .expect("Subscribe should succeed");
    let _ = next_event(&mut ticks).await;

    // WHEN: Dropping the handle
    drop(ticks);

    // THEN: Host producer dropped
    let dropped = fixture.producer_dropped.clone();
    wait_until("the producer is dropped", || dropped.load(Ordering::SeqCst)).await;
}

/// **VALUE**: Verifies a view disappearing cancels its subscriptions.
///
/// **WHY THIS MATTERS**: Windows close without running cleanup code.
///
/// **BUG THIS CATCHES**: Would catch the session ending without calling
/// `cancel_all` on its manager.
#[tokio::test]
async fn given_live_subscription_when_facade_dropped_then_producer_dropped() {
    // GIVEN: A streaming subscription whose handle is kept alive
    let fixture = fixture_host();
    let facade = local_facade(&fixture.host);
    let mut ticks = facade
        .subscribe("fixture.ticks", RichValue::Undefined)
        .await
        .expect("Subscribe should succeed");
    let _ = next_event(&mut ticks).await;

    // WHEN: The whole view goes away
    drop(facade);

    // THEN: Host producer dropped, and the handle ends
    let dropped = fixture.producer_dropped.clone();
    wait_until("the producer is dropped", || dropped.load(Ordering::SeqCst)).await;
    assert_eq!(next_event(&mut ticks).await, None);
}

/// **VALUE**: Verifies subscriptions that cannot start end with exactly one
/// error event.
///
/// **WHY THIS MATTERS**: The view handles every failure in the event loop it
/// already has for the stream.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - `subscribe` itself fails for an unknown path
/// - The error event is followed by more events
#[tokio::test]
async fn given_unknown_path_when_subscribe_then_single_error_event() {
    // GIVEN: A view attached to the application host
    let app = app_host();
    let facade = local_facade(&app.host);

    // WHEN: Subscribing to a path that does not exist
    let mut subscription = facade
        .subscribe("example.nothing", RichValue::Undefined)
        .await
        .expect("Subscribe itself should succeed");

    // THEN: One PROCEDURE_NOT_FOUND error, then the end
    match next_event(&mut subscription).await {
        Some(SubscriptionEvent::Error(failure)) => {
            assert_eq!(failure.code, FailureCode::ProcedureNotFound);
        }
        other => panic!("Expected an error event, got {other:?}"),
    }
    assert_eq!(subscription.next().await, None);
    assert!(!subscription.cancel(), "Nothing left to cancel");
}

/// **VALUE**: Verifies two subscriptions to the same procedure are independent.
///
/// **WHY THIS MATTERS**: Two components may watch the same stream. Cancelling
/// one must not affect the other.
///
/// **BUG THIS CATCHES**: Would catch key collisions or a cancel that matches
/// by path instead of key.
#[tokio::test]
async fn given_two_subscriptions_when_one_cancelled_then_other_continues() {
    // GIVEN: Two ticking subscriptions
    let app = app_host();
    let facade = local_facade(&app.host);
    let mut first = facade
        .subscribe("example.ticks", RichValue::Undefined)
        .await
        .expect("Subscribe should succeed");
    let mut second = facade
        .subscribe("example.ticks", RichValue::Undefined)
        .await
        .expect("Subscribe should succeed");
    assert_ne!(first.key(), second.key());

    // WHEN: Cancelling the first
    let _ = next_event(&mut first).await;
    assert!(first.cancel());

    // THEN: The second keeps counting from its own start
    for expected in 0..3_i64 {
        assert_eq!(
            next_event(&mut second).await,
            Some(SubscriptionEvent::Data(RichValue::Integer(expected)))
        );
    }
    assert_eq!(first.next().await, None);
}
