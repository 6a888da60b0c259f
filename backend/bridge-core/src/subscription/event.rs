use crate::codec::RichValue;
use crate::error::ProcedureFailure;

use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq)]
pub enum SubscriptionEvent {
    Data(RichValue),
    Error(ProcedureFailure),
    Complete,
}

impl SubscriptionEvent {
    /// `Error` and `Complete` end a key; nothing may follow them.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SubscriptionEvent::Data(_))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            SubscriptionEvent::Data(_) => "data",
            SubscriptionEvent::Error(_) => "error",
            SubscriptionEvent::Complete => "complete",
        }
    }
}

/// An event tagged with the correlation key of the subscription it belongs to.
///
/// `generation` identifies the run. A key that is cancelled and subscribed
/// again gets a new generation, so events the old run queued can be told
/// apart and dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedEvent {
    pub key: String,
    pub generation: u64,
    pub event: SubscriptionEvent,
}

/// Where a view's subscription events go.
///
/// `emit` returns `false` once the view is gone; the driver treats that as
/// cancellation.
pub trait EventSink: Send + Sync + 'static {
    fn emit(&self, key: &str, generation: u64, event: SubscriptionEvent) -> bool;
}

impl EventSink for mpsc::UnboundedSender<TaggedEvent> {
    fn emit(&self, key: &str, generation: u64, event: SubscriptionEvent) -> bool {
        self.send(TaggedEvent {
            key: key.to_string(),
            generation,
            event,
        })
        .is_ok()
    }
}
