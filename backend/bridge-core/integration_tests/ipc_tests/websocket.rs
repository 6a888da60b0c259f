use crate::bridge_tests::helpers::{app_host, fixture_host, local_facade, next_event, wait_until};
use crate::ipc_tests::helpers::{
    TestSocket, connect_to_server, is_connection_closed, receive_protobuf, send_protobuf,
    start_test_server,
};

use bridge_core::codec::{self, RichValue};
use bridge_core::dispatch::DUPLICATE_BATCH_ID_MESSAGE;
use bridge_core::error::{FacadeError, FailureCode};
use bridge_core::facade::BridgeFacade;
use bridge_core::proto::{
    BatchInvokeItem, BatchInvokeRequest, BridgeClientMessage, BridgeServerMessage, Failure,
    InvokeRequest, SubscribeRequest, UnsubscribeRequest, WireFailureCode, WireProcedureKind,
    batch_outcome_entry, bridge_client_message, bridge_server_message, subscription_event_message,
};
use bridge_core::subscription::SubscriptionEvent;

use models::LocaleCode;

use std::sync::{Arc, Mutex};

use futures_util::SinkExt;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

fn ping_request(request_id: u64) -> BridgeClientMessage {
    BridgeClientMessage {
        request_id,
        payload: Some(bridge_client_message::Payload::Invoke(InvokeRequest {
            path: "health.ping".to_string(),
            kind: WireProcedureKind::Query as i32,
            input: String::new(),
        })),
    }
}

/// **VALUE**: Verifies the facade works the same over the WebSocket transport.
///
/// **WHY THIS MATTERS**: Out-of-process views (dev servers, external tools)
/// connect over `ws://127.0.0.1`. They must see the same procedures.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - The server fails to bind an ephemeral port
/// - Frames are not pumped between socket and session
/// - Subscription events are not forwarded over the socket
#[tokio::test]
async fn given_server_when_facade_connects_then_query_and_subscribe_work() {
    // GIVEN: Application host served on an ephemeral port
    let app = app_host();
    let handle = start_test_server(&app.host)
        .await
        .expect("Failed to start bridge server");
    assert_ne!(handle.port(), 0);

    // WHEN: A facade connects
    let facade = BridgeFacade::connect(handle.port())
        .await
        .expect("Facade should connect");

    // THEN: Queries work
    assert_eq!(
        facade
            .query("health.ping", RichValue::Undefined)
            .await
            .expect("Ping should succeed"),
        RichValue::from("pong")
    );

    // THEN: Subscriptions stream
    let mut ticks = facade
        .subscribe("example.ticks", RichValue::Undefined)
        .await
        .expect("Subscribe should succeed");
    assert_eq!(
        next_event(&mut ticks).await,
        Some(SubscriptionEvent::Data(RichValue::Integer(0)))
    );
    assert_eq!(
        next_event(&mut ticks).await,
        Some(SubscriptionEvent::Data(RichValue::Integer(1)))
    );

    handle.shutdown();
}

/// **VALUE**: Verifies a broadcast reaches views on both transports.
///
/// **WHY THIS MATTERS**: The hub does not care how a view is attached. A
/// locale change must reach in-process and socket views alike.
///
/// **BUG THIS CATCHES**: Would catch socket sessions not being registered with
/// the broadcast hub.
#[tokio::test]
async fn given_local_and_socket_views_when_locale_changes_then_both_notified() {
    // GIVEN: One local and one socket view
    let app = app_host();
    let handle = start_test_server(&app.host)
        .await
        .expect("Failed to start bridge server");
    let local = local_facade(&app.host);
    let remote = BridgeFacade::connect(handle.port())
        .await
        .expect("Facade should connect");

    let seen = Arc::new(Mutex::new(Vec::<(&str, LocaleCode)>::new()));
    let local_seen = Arc::clone(&seen);
    let _local_listener = local.on_locale_changed(move |locale| {
        local_seen.lock().expect("lock").push(("local", locale));
    });
    let remote_seen = Arc::clone(&seen);
    let _remote_listener = remote.on_locale_changed(move |locale| {
        remote_seen.lock().expect("lock").push(("remote", locale));
    });

    // Both sessions attached
    remote.get_locale().await.expect("Should read");
    local.get_locale().await.expect("Should read");

    // WHEN: The remote view changes the locale
    remote.set_locale("zh-CN").await.expect("Should set locale");

    // THEN: Both views hear about it
    wait_until("both views saw the change", || {
        let seen = seen.lock().expect("lock");
        seen.contains(&("local", LocaleCode::ZhCn)) && seen.contains(&("remote", LocaleCode::ZhCn))
    })
    .await;

    handle.shutdown();
}

/// **VALUE**: Verifies text frames are ignored without dropping the connection.
///
/// **WHY THIS MATTERS**: Only binary protobuf is part of the protocol. Stray
/// text (e.g. from a browser console) must not kill a view's session.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - Text frames are parsed as requests
/// - The server closes the socket on a text frame
/// - request_id correlation breaks after an ignored frame
#[tokio::test]
async fn given_raw_client_when_text_frame_sent_then_ignored_and_binary_still_served() {
    // GIVEN: A raw WebSocket client
    let app = app_host();
    let handle = start_test_server(&app.host)
        .await
        .expect("Failed to start bridge server");
    let mut ws = connect_to_server(handle.port()).await;

    // WHEN: Sending a text frame, then a binary ping
    ws.send(Message::Text("hello".into()))
        .await
        .expect("Failed to send text");
    send_protobuf(&mut ws, &ping_request(42)).await;

    // THEN: Only the ping is answered, with its request_id
    let response: BridgeServerMessage = receive_protobuf(&mut ws).await;
    assert_eq!(response.request_id, 42);
    match response.payload {
        Some(bridge_server_message::Payload::InvokeResult(result)) => {
            assert_eq!(
                codec::decode(&result.value).expect("Should decode"),
                RichValue::from("pong")
            );
        }
        other => panic!("Expected InvokeResult, got {other:?}"),
    }

    handle.shutdown();
}

/// **VALUE**: Verifies undecodable binary frames get an `INVALID_MESSAGE` error
/// and the session keeps going.
///
/// **WHY THIS MATTERS**: A buggy client must learn what went wrong, and one bad
/// frame must not end the session.
///
/// **BUG THIS CATCHES**: Would catch silent drops or a session crash on bad
/// protobuf.
#[tokio::test]
async fn given_raw_client_when_garbage_frame_sent_then_invalid_message_error() {
    // GIVEN: A raw WebSocket client
    let app = app_host();
    let handle = start_test_server(&app.host)
        .await
        .expect("Failed to start bridge server");
    let mut ws = connect_to_server(handle.port()).await;

    // WHEN: Sending bytes that are not a protobuf message
    ws.send(Message::Binary(vec![0xff, 0xff, 0xff, 0xff].into()))
        .await
        .expect("Failed to send garbage");

    // THEN: INVALID_MESSAGE error with request_id 0
    let response: BridgeServerMessage = receive_protobuf(&mut ws).await;
    assert_eq!(response.request_id, 0);
    match response.payload {
        Some(bridge_server_message::Payload::Error(failure)) => {
            assert_eq!(failure.code, WireFailureCode::InvalidMessage as i32);
        }
        other => panic!("Expected Error, got {other:?}"),
    }

    // THEN: The session still answers
    send_protobuf(&mut ws, &ping_request(7)).await;
    let response: BridgeServerMessage = receive_protobuf(&mut ws).await;
    assert_eq!(response.request_id, 7);

    handle.shutdown();
}

/// **VALUE**: Verifies shutdown closes open connections and views notice.
///
/// **WHY THIS MATTERS**: On app exit every view must see the boundary close so
/// pending calls fail instead of hanging.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - Shutdown only stops accepting new connections
/// - The facade never marks itself closed
#[tokio::test]
async fn given_connected_views_when_shutdown_then_connections_closed() {
    // GIVEN: A raw client and a facade connected
    let app = app_host();
    let handle = start_test_server(&app.host)
        .await
        .expect("Failed to start bridge server");
    let mut ws = connect_to_server(handle.port()).await;
    let facade = BridgeFacade::connect(handle.port())
        .await
        .expect("Facade should connect");
    facade
        .query("health.ping", RichValue::Undefined)
        .await
        .expect("Ping should succeed");

    // WHEN: Shutting down
    handle.shutdown();
    assert!(handle.is_shut_down());

    // THEN: Raw socket sees the close, facade becomes closed
    assert!(is_connection_closed(&mut ws).await);
    wait_until("the facade is closed", || facade.is_closed()).await;
    assert!(matches!(
        facade.query("health.ping", RichValue::Undefined).await,
        Err(FacadeError::Closed { .. })
    ));
}

/// **VALUE**: Verifies connecting to a port nobody listens on fails with a
/// connect error.
///
/// **WHY THIS MATTERS**: The shell reports this to the user instead of hanging
/// on startup.
///
/// **BUG THIS CATCHES**: Would catch connect errors being mapped to the wrong
/// variant.
#[tokio::test]
async fn given_no_server_when_facade_connects_then_connect_error() {
    // GIVEN: A port that was free a moment ago
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let port = listener.local_addr().expect("Local addr").port();
    drop(listener);

    // WHEN: Connecting
    let result = BridgeFacade::connect(port).await;

    // THEN: Connect error
    assert!(matches!(result, Err(FacadeError::Connect { .. })));
}

/// **VALUE**: Verifies failure codes survive the wire mapping both ways.
///
/// **WHY THIS MATTERS**: The socket carries codes as protobuf enums. A mapping
/// gap would turn every failure into a generic one.
///
/// **BUG THIS CATCHES**: Would catch a missing arm in the code conversions.
#[tokio::test]
async fn given_socket_view_when_call_fails_then_code_preserved() {
    // GIVEN: A socket view
    let app = app_host();
    let handle = start_test_server(&app.host)
        .await
        .expect("Failed to start bridge server");
    let facade = BridgeFacade::connect(handle.port())
        .await
        .expect("Facade should connect");

    // WHEN: Calling with bad input
    let error = facade
        .mutate("example.echo", RichValue::Null)
        .await
        .expect_err("Should fail");

    // THEN: INVALID_INPUT with diagnostics
    let failure = error.as_failure().expect("Should be a procedure failure");
    assert_eq!(failure.code, FailureCode::InvalidInput);
    assert!(!failure.diagnostics.is_empty());

    handle.shutdown();
}

fn subscribe_request(request_id: u64, key: &str, path: &str) -> BridgeClientMessage {
    BridgeClientMessage {
        request_id,
        payload: Some(bridge_client_message::Payload::Subscribe(SubscribeRequest {
            key: key.to_string(),
            path: path.to_string(),
            input: String::new(),
        })),
    }
}

/// Read until the acknowledgement for `request_id`.
async fn receive_ack(ws: &mut TestSocket, request_id: u64) {
    loop {
        let message: BridgeServerMessage = receive_protobuf(ws).await;
        if message.request_id == request_id {
            match message.payload {
                Some(bridge_server_message::Payload::Ack(_)) => return,
                other => panic!("Expected Ack for request {request_id}, got {other:?}"),
            }
        }
    }
}

/// Next data value pushed under `key`, skipping everything else.
async fn receive_data(ws: &mut TestSocket, key: &str) -> RichValue {
    loop {
        let message: BridgeServerMessage = receive_protobuf(ws).await;
        if let Some(bridge_server_message::Payload::SubscriptionEvent(event)) = message.payload {
            if event.key != key {
                continue;
            }
            match event.event {
                Some(subscription_event_message::Event::Data(text)) => {
                    return codec::decode(&text).expect("Should decode event");
                }
                other => panic!("Expected data under '{key}', got {other:?}"),
            }
        }
    }
}

/// **VALUE**: Verifies a key reused after unsubscribe only carries the new
/// run's events.
///
/// **WHY THIS MATTERS**: A view may cancel a key and subscribe it again. Values
/// the old producer queued before the cancel must not be mixed into the new
/// stream.
///
/// **BUG THIS CATCHES**: Would catch events being matched by key alone, which
/// lets queued 1xx values from the old burst appear after the new
/// subscription's acknowledgement.
#[tokio::test]
async fn given_key_reused_after_unsubscribe_when_streaming_then_only_new_run_events() {
    // GIVEN: A raw client streaming the never-pending burst under "k"
    let fixture = fixture_host();
    let handle = start_test_server(&fixture.host)
        .await
        .expect("Failed to start bridge server");
    let mut ws = connect_to_server(handle.port()).await;

    send_protobuf(&mut ws, &subscribe_request(1, "k", "fixture.burst")).await;
    receive_ack(&mut ws, 1).await;
    for _ in 0..3 {
        assert!(matches!(receive_data(&mut ws, "k").await, RichValue::Integer(n) if n >= 100));
    }

    // WHEN: Unsubscribing and immediately reusing the key for the slow ticks
    send_protobuf(
        &mut ws,
        &BridgeClientMessage {
            request_id: 2,
            payload: Some(bridge_client_message::Payload::Unsubscribe(
                UnsubscribeRequest {
                    key: "k".to_string(),
                },
            )),
        },
    )
    .await;
    send_protobuf(&mut ws, &subscribe_request(3, "k", "fixture.ticks")).await;
    receive_ack(&mut ws, 3).await;

    // THEN: Everything after the new acknowledgement starts from zero
    for expected in 0..3_i64 {
        assert_eq!(
            receive_data(&mut ws, "k").await,
            RichValue::Integer(expected),
            "Only the new run's values may follow its acknowledgement"
        );
    }

    handle.shutdown();
}

/// **VALUE**: Verifies a value that cannot be encoded ends its subscription
/// with one error and nothing after it.
///
/// **WHY THIS MATTERS**: The error is terminal for the view. Anything the
/// producer already queued behind it must not leak out under the same key.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - The failed value is silently skipped and streaming continues
/// - Later values of the stopped run are still forwarded
#[tokio::test]
async fn given_unencodable_value_when_streamed_then_single_terminal_error() {
    // GIVEN: A raw client subscribed to a producer whose second value is a
    // pre-1970 date
    let fixture = fixture_host();
    let handle = start_test_server(&fixture.host)
        .await
        .expect("Failed to start bridge server");
    let mut ws = connect_to_server(handle.port()).await;
    send_protobuf(&mut ws, &subscribe_request(1, "k", "fixture.unencodable")).await;
    receive_ack(&mut ws, 1).await;

    // WHEN: Reading its events
    assert_eq!(receive_data_or_error(&mut ws, "k").await, Ok(RichValue::Integer(1)));
    let failure = receive_data_or_error(&mut ws, "k")
        .await
        .expect_err("Second value should fail to encode");

    // THEN: A handler error, and nothing more under "k" before the next reply
    assert_eq!(failure.code, WireFailureCode::HandlerError as i32);
    assert_eq!(failure.message, "Result could not be encoded");

    send_protobuf(&mut ws, &identity_request(9)).await;
    loop {
        let message: BridgeServerMessage = receive_protobuf(&mut ws).await;
        match message.payload {
            Some(bridge_server_message::Payload::SubscriptionEvent(event)) => {
                panic!("No event may follow the terminal error, got {event:?}");
            }
            Some(bridge_server_message::Payload::InvokeResult(_)) if message.request_id == 9 => {
                break;
            }
            _ => {}
        }
    }

    handle.shutdown();
}

fn identity_request(request_id: u64) -> BridgeClientMessage {
    BridgeClientMessage {
        request_id,
        payload: Some(bridge_client_message::Payload::Invoke(InvokeRequest {
            path: "fixture.identity".to_string(),
            kind: WireProcedureKind::Query as i32,
            input: String::new(),
        })),
    }
}

/// Next data value or error pushed under `key`.
async fn receive_data_or_error(ws: &mut TestSocket, key: &str) -> Result<RichValue, Failure> {
    loop {
        let message: BridgeServerMessage = receive_protobuf(ws).await;
        if let Some(bridge_server_message::Payload::SubscriptionEvent(event)) = message.payload {
            if event.key != key {
                continue;
            }
            return match event.event {
                Some(subscription_event_message::Event::Data(text)) => {
                    Ok(codec::decode(&text).expect("Should decode event"))
                }
                Some(subscription_event_message::Event::Error(failure)) => Err(failure),
                other => panic!("Expected data or error under '{key}', got {other:?}"),
            };
        }
    }
}

/// **VALUE**: Verifies a duplicated batch id is rejected once even when one
/// copy cannot be decoded.
///
/// **WHY THIS MATTERS**: Duplicate ids must be settled before anything about
/// the items is looked at, or the decodable copy would run.
///
/// **BUG THIS CATCHES**: Would catch the decode failure of one copy hiding the
/// duplicate, so the other copy reaches the handler.
#[tokio::test]
async fn given_duplicate_id_with_undecodable_copy_when_batched_then_single_duplicate_failure() {
    // GIVEN: A raw client
    let fixture = fixture_host();
    let handle = start_test_server(&fixture.host)
        .await
        .expect("Failed to start bridge server");
    let mut ws = connect_to_server(handle.port()).await;

    let item = |id: &str, input: &str| BatchInvokeItem {
        id: id.to_string(),
        path: "fixture.identity".to_string(),
        kind: WireProcedureKind::Query as i32,
        input: input.to_string(),
    };

    // WHEN: "a" is sent twice (one copy garbled) next to a valid "b"
    send_protobuf(
        &mut ws,
        &BridgeClientMessage {
            request_id: 5,
            payload: Some(bridge_client_message::Payload::BatchInvoke(
                BatchInvokeRequest {
                    items: vec![item("a", "{not json"), item("a", ""), item("b", "")],
                },
            )),
        },
    )
    .await;

    // THEN: One outcome per id; "a" is the duplicate failure
    let response: BridgeServerMessage = receive_protobuf(&mut ws).await;
    assert_eq!(response.request_id, 5);
    let result = match response.payload {
        Some(bridge_server_message::Payload::BatchResult(result)) => result,
        other => panic!("Expected a batch result, got {other:?}"),
    };

    let ids = result
        .outcomes
        .iter()
        .map(|entry| entry.id.as_str())
        .collect::<Vec<_>>();
    assert_eq!(ids, vec!["a", "b"]);

    match &result.outcomes[0].outcome {
        Some(batch_outcome_entry::Outcome::Failure(failure)) => {
            assert_eq!(failure.code, WireFailureCode::InvalidInput as i32);
            assert_eq!(failure.message, DUPLICATE_BATCH_ID_MESSAGE);
        }
        other => panic!("Expected duplicate failure for 'a', got {other:?}"),
    }
    assert!(matches!(
        result.outcomes[1].outcome,
        Some(batch_outcome_entry::Outcome::Value(_))
    ));

    handle.shutdown();
}
