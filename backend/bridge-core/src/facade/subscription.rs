use crate::facade::connection::FacadeInner;
use crate::subscription::SubscriptionEvent;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use tokio::sync::mpsc;

/// A live subscription as seen by the view.
///
/// Dropping it cancels the subscription if it is still running.
pub struct Subscription {
    events: mpsc::UnboundedReceiver<SubscriptionEvent>,
    canceller: SubscriptionCanceller,
}

impl Subscription {
    pub(crate) fn new(
        key: String,
        events: mpsc::UnboundedReceiver<SubscriptionEvent>,
        inner: Weak<FacadeInner>,
    ) -> Self {
        Self {
            events,
            canceller: SubscriptionCanceller {
                key: Arc::from(key),
                inner,
                done: Arc::new(AtomicBool::new(false)),
            },
        }
    }

    pub fn key(&self) -> &str {
        &self.canceller.key
    }

    /// Next event in producer order.
    ///
    /// `None` after the terminal event, after cancellation, or once the
    /// boundary is gone. Values still in flight when `cancel` was called are
    /// never returned.
    pub async fn next(&mut self) -> Option<SubscriptionEvent> {
        if self.canceller.is_done() {
            return None;
        }

        let event = self.events.recv().await;
        if self.canceller.is_done() {
            return None;
        }

        match &event {
            Some(event) if event.is_terminal() => self.canceller.mark_done(),
            None => self.canceller.mark_done(),
            _ => {}
        }
        event
    }

    pub fn canceller(&self) -> SubscriptionCanceller {
        self.canceller.clone()
    }

    pub fn cancel(&self) -> bool {
        self.canceller.cancel()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.canceller.cancel();
    }
}

/// The single way to stop a subscription from outside its event loop.
///
/// Cloneable; every clone refers to the same subscription.
#[derive(Clone)]
pub struct SubscriptionCanceller {
    key: Arc<str>,
    inner: Weak<FacadeInner>,
    done: Arc<AtomicBool>,
}

impl SubscriptionCanceller {
    /// Ask the host to stop. Only the first call does anything; later calls,
    /// and calls after the subscription finished on its own, return `false`.
    pub fn cancel(&self) -> bool {
        if self.done.swap(true, Ordering::SeqCst) {
            return false;
        }
        let Some(inner) = self.inner.upgrade() else {
            return false;
        };
        inner.forget_subscription(&self.key);
        inner.send_unsubscribe(&self.key);
        true
    }

    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::SeqCst)
    }

    fn mark_done(&self) {
        self.done.store(true, Ordering::SeqCst);
    }
}
