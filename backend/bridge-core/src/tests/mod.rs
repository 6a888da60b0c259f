mod broadcast;
mod codec;
mod dispatch;
mod preferences;
mod proto;

use crate::subscription::{SubscriptionManager, TaggedEvent};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;

const WAIT_LIMIT: Duration = Duration::from_secs(2);

/// Sets its flag (and bumps its counter) when dropped, so a test can see a
/// producer being torn down.
pub(crate) struct DropProbe {
    dropped: Arc<AtomicBool>,
    count: Option<Arc<AtomicUsize>>,
}

impl DropProbe {
    pub(crate) fn new(dropped: Arc<AtomicBool>) -> Self {
        Self {
            dropped,
            count: None,
        }
    }

    pub(crate) fn counted(count: Arc<AtomicUsize>) -> Self {
        Self {
            dropped: Arc::new(AtomicBool::new(false)),
            count: Some(count),
        }
    }
}

impl Drop for DropProbe {
    fn drop(&mut self) {
        self.dropped.store(true, Ordering::SeqCst);
        if let Some(count) = &self.count {
            count.fetch_add(1, Ordering::SeqCst);
        }
    }
}

pub(crate) async fn next_event(events: &mut mpsc::UnboundedReceiver<TaggedEvent>) -> TaggedEvent {
    tokio::time::timeout(WAIT_LIMIT, events.recv())
        .await
        .expect("Timed out waiting for a subscription event")
        .expect("Event channel closed")
}

/// Poll `condition` until it holds or the wait limit passes.
pub(crate) async fn wait_until(condition: impl Fn() -> bool) {
    let deadline = tokio::time::Instant::now() + WAIT_LIMIT;
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "Condition not met within {WAIT_LIMIT:?}"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

pub(crate) async fn wait_until_idle(manager: &SubscriptionManager) {
    let deadline = tokio::time::Instant::now() + WAIT_LIMIT;
    while manager.live_count().await > 0 {
        assert!(
            tokio::time::Instant::now() < deadline,
            "Subscriptions still live after {WAIT_LIMIT:?}: {:?}",
            manager.live_keys().await
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
