//! Serves one attached view.
//!
//! A session owns the view's [`SubscriptionManager`] and its broadcast
//! attachment. It reads [`BridgeClientMessage`] frames, answers with
//! [`BridgeServerMessage`] frames, and forwards subscription events and
//! broadcasts. When the view's side of the link goes away every live
//! subscription of that view is cancelled and the view is detached.

use crate::broadcast::{BroadcastHub, BroadcastMessage};
use crate::codec::{self, RichValue};
use crate::dispatch::{BatchItem, Dispatcher, InvocationRequest, reject_duplicate_ids};
use crate::error::ProcedureFailure;
use crate::ipc::BoundaryLink;
use crate::proto::{
    Ack, BatchInvokeItem, BatchInvokeRequest, BatchInvokeResponse, BatchOutcomeEntry,
    BridgeClientMessage, BridgeServerMessage, BroadcastEvent, Complete, Failure, InvokeRequest,
    InvokeResponse, SubscribeRequest, SubscriptionEventMessage, WireProcedureKind,
    batch_outcome_entry, bridge_client_message, bridge_server_message, subscription_event_message,
};
use crate::subscription::{SubscriptionEvent, SubscriptionManager, TaggedEvent};

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, info, warn};
use prost::Message as ProstMessage;
use tokio::sync::mpsc;

type FrameSender = mpsc::UnboundedSender<Vec<u8>>;

/// Run a session until the view's end of `link` is dropped.
pub(crate) async fn run_view_session(dispatcher: Dispatcher, hub: BroadcastHub, link: BoundaryLink) {
    let (outgoing, mut incoming) = link.into_parts();
    let (view_id, mut broadcasts) = hub.attach();
    let (event_tx, mut events) = mpsc::unbounded_channel::<TaggedEvent>();
    let subscriptions = SubscriptionManager::new(Arc::clone(dispatcher.registry()), Arc::new(event_tx));

    let mut forwarding = ForwardingTable::default();

    info!("Session for {view_id} started");

    loop {
        tokio::select! {
            frame = incoming.recv() => {
                let Some(frame) = frame else { break };
                match handle_frame(&frame, &dispatcher, &subscriptions, &outgoing).await {
                    Some(KeyChange::Subscribed { key, generation }) => {
                        forwarding.start(key, generation);
                    }
                    Some(KeyChange::Unsubscribed { key }) => {
                        forwarding.stop(&key);
                    }
                    None => {}
                }
            }
            Some(tagged) = events.recv() => {
                if !forwarding.admits(&tagged) {
                    debug!("Dropping stale '{}' event for '{}'", tagged.event.type_name(), tagged.key);
                    continue;
                }
                let key = tagged.key.clone();
                let terminal = tagged.event.is_terminal();
                let (payload, failed) = subscription_payload(tagged);
                if failed {
                    // The view saw a terminal error; stop the producer.
                    subscriptions.unsubscribe(&key).await;
                }
                if failed || terminal {
                    forwarding.stop(&key);
                }
                if !send(&outgoing, 0, payload) {
                    break;
                }
            }
            Some(message) = broadcasts.recv() => {
                if let Some(payload) = broadcast_payload(message) {
                    if !send(&outgoing, 0, payload) {
                        break;
                    }
                }
            }
        }
    }

    // A vanished view implicitly cancels everything it owned.
    let cancelled = subscriptions.cancel_all().await;
    hub.detach(view_id);
    info!("Session for {view_id} ended ({cancelled} subscription(s) cancelled)");
}

/// The run whose events are forwarded for each key.
///
/// Events from any other generation belong to a cancelled or finished run
/// and are dropped. An entry lives from the subscribe acknowledgement until
/// the unsubscribe or the forwarded terminal event.
#[derive(Debug, Default)]
pub(crate) struct ForwardingTable {
    current: HashMap<String, u64>,
}

impl ForwardingTable {
    pub(crate) fn start(&mut self, key: String, generation: u64) {
        self.current.insert(key, generation);
    }

    pub(crate) fn stop(&mut self, key: &str) {
        self.current.remove(key);
    }

    pub(crate) fn admits(&self, tagged: &TaggedEvent) -> bool {
        self.current.get(&tagged.key) == Some(&tagged.generation)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.current.len()
    }
}

/// How a frame changed the set of keys the session forwards events for.
enum KeyChange {
    Subscribed { key: String, generation: u64 },
    Unsubscribed { key: String },
}

async fn handle_frame(
    frame: &[u8],
    dispatcher: &Dispatcher,
    subscriptions: &SubscriptionManager,
    outgoing: &FrameSender,
) -> Option<KeyChange> {
    let message = match BridgeClientMessage::decode(frame) {
        Ok(message) => message,
        Err(e) => {
            warn!("Dropping undecodable frame: {e}");
            send_failure(
                outgoing,
                0,
                &ProcedureFailure::invalid_message("Invalid protobuf message"),
            );
            return None;
        }
    };

    let request_id = message.request_id;
    let Some(payload) = message.payload else {
        send_failure(
            outgoing,
            request_id,
            &ProcedureFailure::invalid_message("No payload in message"),
        );
        return None;
    };

    use bridge_client_message::Payload;

    match payload {
        Payload::Invoke(request) => handle_invoke(request_id, request, dispatcher, outgoing),
        Payload::BatchInvoke(request) => handle_batch(request_id, request, dispatcher, outgoing),

        // Subscribe and unsubscribe are applied in arrival order, so an
        // unsubscribe right after a subscribe always finds the key.
        Payload::Subscribe(request) => {
            return handle_subscribe(request_id, request, subscriptions, outgoing).await;
        }
        Payload::Unsubscribe(request) => {
            subscriptions.unsubscribe(&request.key).await;
            return Some(KeyChange::Unsubscribed { key: request.key });
        }
    }
    None
}

fn handle_invoke(
    request_id: u64,
    request: InvokeRequest,
    dispatcher: &Dispatcher,
    outgoing: &FrameSender,
) {
    let invocation = match decode_invocation(&request.path, request.kind, &request.input) {
        Ok(invocation) => invocation,
        Err(failure) => {
            send_failure(outgoing, request_id, &failure);
            return;
        }
    };

    let dispatcher = dispatcher.clone();
    let outgoing = outgoing.clone();
    tokio::spawn(async move {
        let path = invocation.path.clone();
        let payload = match dispatcher.invoke(invocation).await.and_then(|v| encode_value(&path, &v)) {
            Ok(value) => bridge_server_message::Payload::InvokeResult(InvokeResponse { value }),
            Err(failure) => bridge_server_message::Payload::Error(Failure::from(&failure)),
        };
        send(&outgoing, request_id, payload);
    });
}

fn handle_batch(
    request_id: u64,
    request: BatchInvokeRequest,
    dispatcher: &Dispatcher,
    outgoing: &FrameSender,
) {
    // Duplicates are settled before decoding so an undecodable copy of an id
    // cannot let the other copy run.
    let (mut rejected, unique) = reject_duplicate_ids(request.items, |item| &item.id);
    let mut runnable = Vec::with_capacity(unique.len());

    for item in &unique {
        match decode_batch_item(item) {
            Ok(item) => runnable.push(item),
            Err(failure) => {
                rejected.insert(item.id.clone(), Err(failure));
            }
        }
    }

    let dispatcher = dispatcher.clone();
    let outgoing = outgoing.clone();
    tokio::spawn(async move {
        let mut outcome = dispatcher.invoke_batch(runnable).await;
        outcome.extend(rejected);

        let outcomes = outcome
            .into_iter()
            .map(|(id, result)| {
                let encoded = result.and_then(|value| encode_value(&id, &value));
                let outcome = match encoded {
                    Ok(value) => batch_outcome_entry::Outcome::Value(value),
                    Err(failure) => batch_outcome_entry::Outcome::Failure(Failure::from(&failure)),
                };
                BatchOutcomeEntry {
                    id,
                    outcome: Some(outcome),
                }
            })
            .collect();

        send(
            &outgoing,
            request_id,
            bridge_server_message::Payload::BatchResult(BatchInvokeResponse { outcomes }),
        );
    });
}

async fn handle_subscribe(
    request_id: u64,
    request: SubscribeRequest,
    subscriptions: &SubscriptionManager,
    outgoing: &FrameSender,
) -> Option<KeyChange> {
    let input = match decode_input(&request.input) {
        Ok(input) => input,
        Err(failure) => {
            send_failure(outgoing, request_id, &failure);
            return None;
        }
    };

    let key = request.key.clone();
    match subscriptions.subscribe(request.key, request.path, input).await {
        Ok(generation) => {
            send(outgoing, request_id, bridge_server_message::Payload::Ack(Ack {}));
            Some(KeyChange::Subscribed { key, generation })
        }
        Err(failure) => {
            send_failure(outgoing, request_id, &failure);
            None
        }
    }
}

fn decode_invocation(path: &str, kind: i32, input: &str) -> Result<InvocationRequest, ProcedureFailure> {
    let kind = WireProcedureKind::decode_kind(kind)
        .ok_or_else(|| ProcedureFailure::invalid_message(&format!("Unknown procedure kind {kind}")))?;

    Ok(InvocationRequest {
        path: path.to_string(),
        kind,
        input: decode_input(input)?,
    })
}

fn decode_batch_item(item: &BatchInvokeItem) -> Result<BatchItem, ProcedureFailure> {
    let invocation = decode_invocation(&item.path, item.kind, &item.input)?;
    Ok(BatchItem {
        id: item.id.clone(),
        path: invocation.path,
        kind: invocation.kind,
        input: invocation.input,
    })
}

/// Empty text stands for "no input".
fn decode_input(text: &str) -> Result<RichValue, ProcedureFailure> {
    if text.is_empty() {
        return Ok(RichValue::Undefined);
    }
    codec::decode(text).map_err(|e| {
        debug!("Undecodable input: {e}");
        ProcedureFailure::invalid_message("Input could not be decoded")
    })
}

fn encode_value(context: &str, value: &RichValue) -> Result<String, ProcedureFailure> {
    codec::encode(value).map_err(|e| {
        warn!("Result for '{context}' could not be encoded: {e}");
        ProcedureFailure::handler("Result could not be encoded")
    })
}

/// The wire payload, and whether a data value had to be turned into an error.
fn subscription_payload(tagged: TaggedEvent) -> (bridge_server_message::Payload, bool) {
    let TaggedEvent { key, event, .. } = tagged;
    let mut failed = false;

    let event = match event {
        SubscriptionEvent::Data(value) => match encode_value(&key, &value) {
            Ok(text) => subscription_event_message::Event::Data(text),
            Err(failure) => {
                failed = true;
                subscription_event_message::Event::Error(Failure::from(&failure))
            }
        },
        SubscriptionEvent::Error(failure) => {
            subscription_event_message::Event::Error(Failure::from(&failure))
        }
        SubscriptionEvent::Complete => subscription_event_message::Event::Complete(Complete {}),
    };

    let payload = bridge_server_message::Payload::SubscriptionEvent(SubscriptionEventMessage {
        key,
        event: Some(event),
    });
    (payload, failed)
}

fn broadcast_payload(message: BroadcastMessage) -> Option<bridge_server_message::Payload> {
    let channel = message.channel.name();
    let payload = encode_value(channel, &message.payload).ok()?;
    Some(bridge_server_message::Payload::Broadcast(BroadcastEvent {
        channel: channel.to_string(),
        payload,
    }))
}

fn send_failure(outgoing: &FrameSender, request_id: u64, failure: &ProcedureFailure) -> bool {
    send(
        outgoing,
        request_id,
        bridge_server_message::Payload::Error(Failure::from(failure)),
    )
}

/// Returns `false` once the view is gone.
fn send(outgoing: &FrameSender, request_id: u64, payload: bridge_server_message::Payload) -> bool {
    let message = BridgeServerMessage {
        request_id,
        payload: Some(payload),
    };
    outgoing.send(message.encode_to_vec()).is_ok()
}
