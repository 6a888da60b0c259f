// Unit tests for the wire protocol conversions

use crate::error::{FailureCode, ProcedureFailure};
use crate::procedure::ProcedureKind;
use crate::proto::{
    BridgeServerMessage, Failure, SubscriptionEventMessage, WireFailureCode, WireProcedureKind,
    bridge_server_message, subscription_event_message,
};

use prost::Message as ProstMessage;

/// **VALUE**: Verifies every procedure kind maps to the wire and back, and
/// that unspecified or unknown values are refused.
///
/// **WHY THIS MATTERS**: A default (zero) kind from a sloppy client must not be
/// treated as a query.
///
/// **BUG THIS CATCHES**: Would catch `Unspecified` decoding to a real kind.
#[test]
fn given_wire_kinds_when_decoded_then_only_known_kinds_accepted() {
    for kind in [
        ProcedureKind::Query,
        ProcedureKind::Mutation,
        ProcedureKind::Subscription,
    ] {
        let raw = WireProcedureKind::from(kind) as i32;
        assert_eq!(WireProcedureKind::decode_kind(raw), Some(kind));
    }

    assert_eq!(WireProcedureKind::decode_kind(0), None);
    assert_eq!(WireProcedureKind::decode_kind(99), None);
}

/// **VALUE**: Verifies failure descriptors keep code, message and diagnostics
/// across the wire.
///
/// **WHY THIS MATTERS**: Views branch on the code and show the diagnostics.
///
/// **BUG THIS CATCHES**: Would catch a code mapping that collapses two codes
/// into one.
#[test]
fn given_each_failure_code_when_sent_over_wire_then_preserved() {
    for code in [
        FailureCode::ProcedureNotFound,
        FailureCode::InvalidInput,
        FailureCode::HandlerError,
        FailureCode::SubscriptionProducerError,
        FailureCode::DuplicateSubscriptionKey,
        FailureCode::InvalidMessage,
    ] {
        let mut failure = ProcedureFailure::new(code, "went wrong");
        failure.diagnostics = vec!["field `a` missing".to_string()];

        let wire = Failure::from(&failure);
        let bytes = wire.encode_to_vec();
        let decoded = Failure::decode(&bytes[..]).expect("Should decode");

        assert_eq!(ProcedureFailure::from(decoded), failure);
    }
}

/// **VALUE**: Verifies unknown wire codes degrade to `INVALID_MESSAGE`.
///
/// **WHY THIS MATTERS**: A newer host may add codes. An older view must still
/// surface the failure instead of rejecting the frame.
///
/// **BUG THIS CATCHES**: Would catch unknown codes panicking or mapping to a
/// misleading code.
#[test]
fn given_unknown_wire_code_when_converted_then_invalid_message() {
    let failure = ProcedureFailure::from(Failure {
        code: 1234,
        message: "from the future".to_string(),
        diagnostics: Vec::new(),
    });

    assert_eq!(failure.code, FailureCode::InvalidMessage);
    assert_eq!(failure.message, "from the future");
    assert_eq!(
        ProcedureFailure::from(Failure {
            code: WireFailureCode::Unspecified as i32,
            ..Failure::default()
        })
        .code,
        FailureCode::InvalidMessage
    );
}

/// **VALUE**: Verifies a pushed subscription event survives encoding.
///
/// **WHY THIS MATTERS**: Pushed frames carry request_id 0 and are told apart
/// only by their payload.
///
/// **BUG THIS CATCHES**: Would catch oneof tags colliding between payloads.
#[test]
fn given_subscription_event_when_encoded_then_decodes_to_same_payload() {
    let message = BridgeServerMessage {
        request_id: 0,
        payload: Some(bridge_server_message::Payload::SubscriptionEvent(
            SubscriptionEventMessage {
                key: "sub-1".to_string(),
                event: Some(subscription_event_message::Event::Data(
                    r#"{"json":1}"#.to_string(),
                )),
            },
        )),
    };

    let decoded =
        BridgeServerMessage::decode(&message.encode_to_vec()[..]).expect("Should decode");

    assert_eq!(decoded, message);
}
