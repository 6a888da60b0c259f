//! Shared state behind a [`BridgeFacade`](crate::facade::BridgeFacade) and the
//! task that reads host frames into it.

use crate::codec::{self, RichValue};
use crate::dispatch::BatchOutcome;
use crate::error::{CodecError, FacadeError, ProcedureFailure};
use crate::ipc::BoundaryLink;
use crate::proto::{
    BatchInvokeResponse, BridgeClientMessage, BridgeServerMessage, BroadcastEvent,
    SubscriptionEventMessage, UnsubscribeRequest, batch_outcome_entry, bridge_client_message,
    bridge_server_message, subscription_event_message,
};
use crate::subscription::SubscriptionEvent;

use models::BroadcastChannel;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use futures_util::{SinkExt, StreamExt};
use log::{debug, info, warn};
use prost::Message as ProstMessage;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

pub(crate) enum Reply {
    Value(RichValue),
    Batch(BatchOutcome),
    Ack,
}

type PendingReply = oneshot::Sender<Result<Reply, FacadeError>>;

pub(crate) type Listener = Arc<dyn Fn(&RichValue) + Send + Sync>;

pub(crate) struct FacadeInner {
    outgoing: mpsc::UnboundedSender<Vec<u8>>,
    next_request_id: AtomicU64,
    next_listener_id: AtomicU64,
    closed: AtomicBool,
    pending: Mutex<HashMap<u64, PendingReply>>,
    subscriptions: Mutex<HashMap<String, mpsc::UnboundedSender<SubscriptionEvent>>>,
    listeners: Mutex<HashMap<BroadcastChannel, Vec<(u64, Listener)>>>,
}

/// Locks are only held for map operations, never across a callback or await.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl FacadeInner {
    /// Wrap `link` and spawn its reader. The reader only holds a weak
    /// reference, so dropping the facade closes the link.
    pub(crate) fn start(link: BoundaryLink) -> Arc<Self> {
        let (outgoing, incoming) = link.into_parts();
        let inner = Arc::new(Self {
            outgoing,
            next_request_id: AtomicU64::new(1),
            next_listener_id: AtomicU64::new(1),
            closed: AtomicBool::new(false),
            pending: Mutex::new(HashMap::new()),
            subscriptions: Mutex::new(HashMap::new()),
            listeners: Mutex::new(HashMap::new()),
        });

        tokio::spawn(read_loop(Arc::downgrade(&inner), incoming));
        inner
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Send one request and wait for its reply.
    pub(crate) async fn request(
        &self,
        payload: bridge_client_message::Payload,
    ) -> Result<Reply, FacadeError> {
        if self.is_closed() {
            return Err(FacadeError::closed("Boundary is closed"));
        }

        let request_id = self.next_request_id.fetch_add(1, Ordering::SeqCst);
        let (reply_tx, reply_rx) = oneshot::channel();
        lock(&self.pending).insert(request_id, reply_tx);

        // `close` may have drained the table just before our insert.
        if self.is_closed() || !self.send(request_id, payload) {
            lock(&self.pending).remove(&request_id);
            return Err(FacadeError::closed("Boundary is closed"));
        }

        reply_rx
            .await
            .map_err(|_| FacadeError::closed("Boundary closed before the reply arrived"))?
    }

    /// Fire-and-forget unsubscribe.
    pub(crate) fn send_unsubscribe(&self, key: &str) {
        let request_id = self.next_request_id.fetch_add(1, Ordering::SeqCst);
        let payload = bridge_client_message::Payload::Unsubscribe(UnsubscribeRequest {
            key: key.to_string(),
        });
        if !self.send(request_id, payload) {
            debug!("Unsubscribe for '{key}' not sent: boundary closed");
        }
    }

    fn send(&self, request_id: u64, payload: bridge_client_message::Payload) -> bool {
        let message = BridgeClientMessage {
            request_id,
            payload: Some(payload),
        };
        self.outgoing.send(message.encode_to_vec()).is_ok()
    }

    pub(crate) fn register_subscription(
        &self,
        key: &str,
    ) -> mpsc::UnboundedReceiver<SubscriptionEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        lock(&self.subscriptions).insert(key.to_string(), tx);
        rx
    }

    pub(crate) fn forget_subscription(&self, key: &str) -> bool {
        lock(&self.subscriptions).remove(key).is_some()
    }

    pub(crate) fn add_listener(&self, channel: BroadcastChannel, listener: Listener) -> u64 {
        let id = self.next_listener_id.fetch_add(1, Ordering::SeqCst);
        lock(&self.listeners)
            .entry(channel)
            .or_default()
            .push((id, listener));
        id
    }

    pub(crate) fn remove_listener(&self, channel: BroadcastChannel, id: u64) -> bool {
        let mut listeners = lock(&self.listeners);
        let Some(registered) = listeners.get_mut(&channel) else {
            return false;
        };
        let before = registered.len();
        registered.retain(|(listener_id, _)| *listener_id != id);
        before != registered.len()
    }

    fn handle_frame(&self, frame: &[u8]) {
        let message = match BridgeServerMessage::decode(frame) {
            Ok(message) => message,
            Err(e) => {
                warn!("Dropping undecodable host frame: {e}");
                return;
            }
        };

        let request_id = message.request_id;
        let Some(payload) = message.payload else {
            self.complete(request_id, Err(FacadeError::protocol("Host sent an empty message")));
            return;
        };

        use bridge_server_message::Payload;

        match payload {
            Payload::InvokeResult(response) => {
                let reply = decode_value(&response.value)
                    .map(Reply::Value)
                    .map_err(FacadeError::from);
                self.complete(request_id, reply);
            }
            Payload::BatchResult(response) => {
                self.complete(request_id, Ok(Reply::Batch(decode_batch(response))));
            }
            Payload::Ack(_) => self.complete(request_id, Ok(Reply::Ack)),
            Payload::Error(failure) => {
                let failure = ProcedureFailure::from(failure);
                if request_id == 0 {
                    warn!("Host rejected a message: {failure}");
                    return;
                }
                self.complete(request_id, Err(FacadeError::Procedure(failure)));
            }
            Payload::SubscriptionEvent(message) => self.route_event(message),
            Payload::Broadcast(event) => self.notify(event),
        }
    }

    fn complete(&self, request_id: u64, reply: Result<Reply, FacadeError>) {
        match lock(&self.pending).remove(&request_id) {
            Some(reply_tx) => {
                let _ = reply_tx.send(reply);
            }
            None => debug!("Dropping reply for unknown request {request_id}"),
        }
    }

    fn route_event(&self, message: SubscriptionEventMessage) {
        let SubscriptionEventMessage { key, event } = message;

        let mut undecodable = false;
        let event = match event {
            Some(subscription_event_message::Event::Data(text)) => match decode_value(&text) {
                Ok(value) => SubscriptionEvent::Data(value),
                Err(e) => {
                    undecodable = true;
                    SubscriptionEvent::Error(ProcedureFailure::invalid_message(&format!(
                        "Undecodable subscription value: {e}"
                    )))
                }
            },
            Some(subscription_event_message::Event::Error(failure)) => {
                SubscriptionEvent::Error(failure.into())
            }
            Some(subscription_event_message::Event::Complete(_)) => SubscriptionEvent::Complete,
            None => {
                warn!("Subscription event for '{key}' has no body");
                return;
            }
        };

        let sender = {
            let mut subscriptions = lock(&self.subscriptions);
            if event.is_terminal() {
                subscriptions.remove(&key)
            } else {
                subscriptions.get(&key).cloned()
            }
        };

        let Some(sender) = sender else {
            debug!("Discarding {} event for inactive subscription '{key}'", event.type_name());
            return;
        };

        if undecodable {
            self.send_unsubscribe(&key);
        }
        let _ = sender.send(event);
    }

    fn notify(&self, event: BroadcastEvent) {
        let Some(channel) = BroadcastChannel::from_name(&event.channel) else {
            debug!("Ignoring broadcast on unknown channel '{}'", event.channel);
            return;
        };

        let payload = match decode_value(&event.payload) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Ignoring undecodable '{channel}' broadcast: {e}");
                return;
            }
        };

        // Snapshot first so listeners can add or remove listeners.
        let listeners = lock(&self.listeners)
            .get(&channel)
            .map(|registered| {
                registered
                    .iter()
                    .map(|(_, listener)| Arc::clone(listener))
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        for listener in listeners {
            (*listener)(&payload);
        }
    }

    /// Fail everything waiting on the host and end every subscription.
    fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        let pending = std::mem::take(&mut *lock(&self.pending));
        for (_, reply_tx) in pending {
            let _ = reply_tx.send(Err(FacadeError::closed("Boundary closed")));
        }
        lock(&self.subscriptions).clear();

        info!("Bridge facade disconnected");
    }
}

async fn read_loop(inner: Weak<FacadeInner>, mut incoming: mpsc::UnboundedReceiver<Vec<u8>>) {
    while let Some(frame) = incoming.recv().await {
        let Some(inner) = inner.upgrade() else {
            return;
        };
        inner.handle_frame(&frame);
    }

    if let Some(inner) = inner.upgrade() {
        inner.close();
    }
}

/// Pumps frames between a client WebSocket and the facade's link.
pub(crate) async fn pump_socket(
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
    mut link: BoundaryLink,
) {
    let (mut write, mut read) = socket.split();

    loop {
        tokio::select! {
            msg = read.next() => match msg {
                Some(Ok(Message::Binary(data))) => {
                    if !link.send(data.to_vec()) {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("Bridge socket read failed: {e}");
                    break;
                }
            },
            frame = link.recv() => match frame {
                Some(frame) => {
                    if let Err(e) = write.send(Message::Binary(frame.into())).await {
                        warn!("Bridge socket write failed: {e}");
                        break;
                    }
                }
                None => {
                    let _ = write.send(Message::Close(None)).await;
                    break;
                }
            },
        }
    }
}

/// Empty text stands for "no value".
pub(crate) fn decode_value(text: &str) -> Result<RichValue, CodecError> {
    if text.is_empty() {
        return Ok(RichValue::Undefined);
    }
    codec::decode(text)
}

pub(crate) fn encode_value(value: &RichValue) -> Result<String, CodecError> {
    if value.is_undefined() {
        return Ok(String::new());
    }
    codec::encode(value)
}

fn decode_batch(response: BatchInvokeResponse) -> BatchOutcome {
    response
        .outcomes
        .into_iter()
        .map(|entry| {
            let outcome = match entry.outcome {
                Some(batch_outcome_entry::Outcome::Value(text)) => {
                    decode_value(&text).map_err(|e| {
                        ProcedureFailure::invalid_message(&format!("Undecodable batch value: {e}"))
                    })
                }
                Some(batch_outcome_entry::Outcome::Failure(failure)) => Err(failure.into()),
                None => Err(ProcedureFailure::invalid_message("Batch entry has no outcome")),
            };
            (entry.id, outcome)
        })
        .collect()
}
