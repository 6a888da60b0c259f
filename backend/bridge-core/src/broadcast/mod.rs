//! Fire-and-forget fan-out to every attached view.
//!
//! Views register an output channel on attach and remove it on detach. A
//! view that attaches later never sees earlier broadcasts, so stateful
//! channels also expose a query for their current value.

use crate::codec::RichValue;

use models::BroadcastChannel;

use std::collections::HashMap;
use std::fmt::{Display, Formatter, Result as FormatResult};
use std::sync::{Arc, RwLock};

use log::{debug, info, warn};
use tokio::sync::mpsc;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewId(Uuid);

impl ViewId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Display for ViewId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        write!(formatter, "view-{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BroadcastMessage {
    pub channel: BroadcastChannel,
    pub payload: RichValue,
}

/// Registry of the output channels of all live views.
#[derive(Clone, Default)]
pub struct BroadcastHub {
    views: Arc<RwLock<HashMap<ViewId, mpsc::UnboundedSender<BroadcastMessage>>>>,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new view and hand back its id and receiving end.
    pub fn attach(&self) -> (ViewId, mpsc::UnboundedReceiver<BroadcastMessage>) {
        let id = ViewId::new();
        let (tx, rx) = mpsc::unbounded_channel();

        match self.views.write() {
            Ok(mut views) => {
                views.insert(id, tx);
                info!("Attached {id} ({} live)", views.len());
            }
            Err(e) => warn!("Broadcast registry poisoned, {id} not attached: {e}"),
        }

        (id, rx)
    }

    /// Remove a view. Unknown ids are ignored.
    pub fn detach(&self, id: ViewId) -> bool {
        match self.views.write() {
            Ok(mut views) => {
                let removed = views.remove(&id).is_some();
                if removed {
                    info!("Detached {id} ({} live)", views.len());
                }
                removed
            }
            Err(e) => {
                warn!("Broadcast registry poisoned, {id} not detached: {e}");
                false
            }
        }
    }

    pub fn view_count(&self) -> usize {
        self.views.read().map(|views| views.len()).unwrap_or_default()
    }

    /// Send `payload` on `channel` to every live view.
    ///
    /// Does not wait for anyone. Views whose receiver is gone are pruned.
    /// Returns how many views it was delivered to.
    pub fn broadcast(&self, channel: BroadcastChannel, payload: impl Into<RichValue>) -> usize {
        let message = BroadcastMessage {
            channel,
            payload: payload.into(),
        };

        let mut closed = Vec::new();
        let mut delivered = 0;

        match self.views.read() {
            Ok(views) => {
                for (id, tx) in views.iter() {
                    if tx.send(message.clone()).is_ok() {
                        delivered += 1;
                    } else {
                        closed.push(*id);
                    }
                }
            }
            Err(e) => {
                warn!("Broadcast registry poisoned, '{}' dropped: {e}", channel.name());
                return 0;
            }
        }

        for id in closed {
            debug!("Pruning closed {id}");
            self.detach(id);
        }

        debug!("Broadcast '{}' to {delivered} view(s)", channel.name());
        delivered
    }
}
