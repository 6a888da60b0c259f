//! Boundary wire protocol (package: bridge).
//!
//! Every view <-> host frame is one protobuf message. Rich values travel as
//! codec envelope text (see [`crate::codec`]) inside `string` fields.
//!
//! ```text
//! view -> host   BridgeClientMessage { request_id, Invoke | BatchInvoke | Subscribe | Unsubscribe }
//! host -> view   BridgeServerMessage { request_id, InvokeResult | BatchResult | SubscriptionEvent
//!                                                  | Broadcast | Error | Ack }
//! ```
//!
//! Pushed messages (`SubscriptionEvent`, `Broadcast`) carry `request_id = 0`.

use crate::error::{FailureCode, ProcedureFailure};
use crate::procedure::ProcedureKind;

// ============================================
// VIEW -> HOST
// ============================================

#[derive(Clone, PartialEq, prost::Message)]
pub struct BridgeClientMessage {
    #[prost(uint64, tag = "1")]
    pub request_id: u64,
    #[prost(oneof = "bridge_client_message::Payload", tags = "2, 3, 4, 5")]
    pub payload: Option<bridge_client_message::Payload>,
}

pub mod bridge_client_message {
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Payload {
        #[prost(message, tag = "2")]
        Invoke(super::InvokeRequest),
        #[prost(message, tag = "3")]
        BatchInvoke(super::BatchInvokeRequest),
        #[prost(message, tag = "4")]
        Subscribe(super::SubscribeRequest),
        #[prost(message, tag = "5")]
        Unsubscribe(super::UnsubscribeRequest),
    }
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct InvokeRequest {
    #[prost(string, tag = "1")]
    pub path: String,
    #[prost(enumeration = "WireProcedureKind", tag = "2")]
    pub kind: i32,
    #[prost(string, tag = "3")]
    pub input: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct BatchInvokeRequest {
    #[prost(message, repeated, tag = "1")]
    pub items: Vec<BatchInvokeItem>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct BatchInvokeItem {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(string, tag = "2")]
    pub path: String,
    #[prost(enumeration = "WireProcedureKind", tag = "3")]
    pub kind: i32,
    #[prost(string, tag = "4")]
    pub input: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct SubscribeRequest {
    #[prost(string, tag = "1")]
    pub key: String,
    #[prost(string, tag = "2")]
    pub path: String,
    #[prost(string, tag = "3")]
    pub input: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct UnsubscribeRequest {
    #[prost(string, tag = "1")]
    pub key: String,
}

// ============================================
// HOST -> VIEW
// ============================================

#[derive(Clone, PartialEq, prost::Message)]
pub struct BridgeServerMessage {
    #[prost(uint64, tag = "1")]
    pub request_id: u64,
    #[prost(oneof = "bridge_server_message::Payload", tags = "2, 3, 4, 5, 6, 7")]
    pub payload: Option<bridge_server_message::Payload>,
}

pub mod bridge_server_message {
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Payload {
        #[prost(message, tag = "2")]
        InvokeResult(super::InvokeResponse),
        #[prost(message, tag = "3")]
        BatchResult(super::BatchInvokeResponse),
        #[prost(message, tag = "4")]
        SubscriptionEvent(super::SubscriptionEventMessage),
        #[prost(message, tag = "5")]
        Broadcast(super::BroadcastEvent),
        #[prost(message, tag = "6")]
        Error(super::Failure),
        #[prost(message, tag = "7")]
        Ack(super::Ack),
    }
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct InvokeResponse {
    #[prost(string, tag = "1")]
    pub value: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct BatchInvokeResponse {
    #[prost(message, repeated, tag = "1")]
    pub outcomes: Vec<BatchOutcomeEntry>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct BatchOutcomeEntry {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(oneof = "batch_outcome_entry::Outcome", tags = "2, 3")]
    pub outcome: Option<batch_outcome_entry::Outcome>,
}

pub mod batch_outcome_entry {
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Outcome {
        #[prost(string, tag = "2")]
        Value(String),
        #[prost(message, tag = "3")]
        Failure(super::Failure),
    }
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct SubscriptionEventMessage {
    #[prost(string, tag = "1")]
    pub key: String,
    #[prost(oneof = "subscription_event_message::Event", tags = "2, 3, 4")]
    pub event: Option<subscription_event_message::Event>,
}

pub mod subscription_event_message {
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Event {
        #[prost(string, tag = "2")]
        Data(String),
        #[prost(message, tag = "3")]
        Error(super::Failure),
        #[prost(message, tag = "4")]
        Complete(super::Complete),
    }
}

#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct Complete {}

#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct Ack {}

#[derive(Clone, PartialEq, prost::Message)]
pub struct BroadcastEvent {
    #[prost(string, tag = "1")]
    pub channel: String,
    #[prost(string, tag = "2")]
    pub payload: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Failure {
    #[prost(enumeration = "WireFailureCode", tag = "1")]
    pub code: i32,
    #[prost(string, tag = "2")]
    pub message: String,
    #[prost(string, repeated, tag = "3")]
    pub diagnostics: Vec<String>,
}

// ============================================
// ENUMS
// ============================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum WireProcedureKind {
    Unspecified = 0,
    Query = 1,
    Mutation = 2,
    Subscription = 3,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum WireFailureCode {
    Unspecified = 0,
    ProcedureNotFound = 1,
    InvalidInput = 2,
    HandlerError = 3,
    SubscriptionProducerError = 4,
    DuplicateSubscriptionKey = 5,
    InvalidMessage = 6,
}

// ============================================
// DOMAIN CONVERSIONS
// ============================================

impl From<ProcedureKind> for WireProcedureKind {
    fn from(kind: ProcedureKind) -> Self {
        match kind {
            ProcedureKind::Query => WireProcedureKind::Query,
            ProcedureKind::Mutation => WireProcedureKind::Mutation,
            ProcedureKind::Subscription => WireProcedureKind::Subscription,
        }
    }
}

impl WireProcedureKind {
    /// `None` for `Unspecified` and unknown values.
    pub fn decode_kind(raw: i32) -> Option<ProcedureKind> {
        match WireProcedureKind::try_from(raw).ok()? {
            WireProcedureKind::Unspecified => None,
            WireProcedureKind::Query => Some(ProcedureKind::Query),
            WireProcedureKind::Mutation => Some(ProcedureKind::Mutation),
            WireProcedureKind::Subscription => Some(ProcedureKind::Subscription),
        }
    }
}

impl From<FailureCode> for WireFailureCode {
    fn from(code: FailureCode) -> Self {
        match code {
            FailureCode::ProcedureNotFound => WireFailureCode::ProcedureNotFound,
            FailureCode::InvalidInput => WireFailureCode::InvalidInput,
            FailureCode::HandlerError => WireFailureCode::HandlerError,
            FailureCode::SubscriptionProducerError => WireFailureCode::SubscriptionProducerError,
            FailureCode::DuplicateSubscriptionKey => WireFailureCode::DuplicateSubscriptionKey,
            FailureCode::InvalidMessage => WireFailureCode::InvalidMessage,
        }
    }
}

impl From<&ProcedureFailure> for Failure {
    fn from(failure: &ProcedureFailure) -> Self {
        Self {
            code: WireFailureCode::from(failure.code) as i32,
            message: failure.message.clone(),
            diagnostics: failure.diagnostics.clone(),
        }
    }
}

impl From<Failure> for ProcedureFailure {
    /// Unknown codes degrade to `InvalidMessage`.
    fn from(failure: Failure) -> Self {
        let code = match WireFailureCode::try_from(failure.code) {
            Ok(WireFailureCode::ProcedureNotFound) => FailureCode::ProcedureNotFound,
            Ok(WireFailureCode::InvalidInput) => FailureCode::InvalidInput,
            Ok(WireFailureCode::HandlerError) => FailureCode::HandlerError,
            Ok(WireFailureCode::SubscriptionProducerError) => {
                FailureCode::SubscriptionProducerError
            }
            Ok(WireFailureCode::DuplicateSubscriptionKey) => FailureCode::DuplicateSubscriptionKey,
            Ok(WireFailureCode::InvalidMessage)
            | Ok(WireFailureCode::Unspecified)
            | Err(_) => FailureCode::InvalidMessage,
        };

        ProcedureFailure {
            code,
            message: failure.message,
            diagnostics: failure.diagnostics,
        }
    }
}
