use crate::facade::connection::FacadeInner;

use models::BroadcastChannel;

use std::sync::Weak;
use std::sync::atomic::{AtomicBool, Ordering};

/// Registration of a broadcast listener. Dropping it removes the listener.
pub struct ListenerHandle {
    channel: BroadcastChannel,
    id: u64,
    inner: Weak<FacadeInner>,
    removed: AtomicBool,
}

impl ListenerHandle {
    pub(crate) fn new(channel: BroadcastChannel, id: u64, inner: Weak<FacadeInner>) -> Self {
        Self {
            channel,
            id,
            inner,
            removed: AtomicBool::new(false),
        }
    }

    pub fn channel(&self) -> BroadcastChannel {
        self.channel
    }

    /// Safe to call from inside the listener itself, and more than once.
    pub fn remove(&self) -> bool {
        if self.removed.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.inner
            .upgrade()
            .is_some_and(|inner| inner.remove_listener(self.channel, self.id))
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.remove();
    }
}
