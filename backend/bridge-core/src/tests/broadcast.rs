// Unit tests for the broadcast hub

use crate::broadcast::{BroadcastHub, BroadcastMessage};
use crate::codec::RichValue;

use models::BroadcastChannel;

/// **VALUE**: Verifies a broadcast reaches every attached view exactly once.
///
/// **WHY THIS MATTERS**: Locale and theme changes must update all windows, not
/// just the one that made the change.
///
/// **BUG THIS CATCHES**: Would catch fan-out stopping at the first view.
#[tokio::test]
async fn given_two_views_when_broadcast_then_both_receive() {
    let hub = BroadcastHub::new();
    let (_first_id, mut first) = hub.attach();
    let (_second_id, mut second) = hub.attach();

    let delivered = hub.broadcast(BroadcastChannel::LocaleChanged, "zh-CN");

    let expected = BroadcastMessage {
        channel: BroadcastChannel::LocaleChanged,
        payload: RichValue::from("zh-CN"),
    };
    assert_eq!(delivered, 2);
    assert_eq!(first.recv().await, Some(expected.clone()));
    assert_eq!(second.recv().await, Some(expected));
    assert!(first.try_recv().is_err());
}

/// **VALUE**: Verifies detached and dropped views stop receiving and are
/// removed from the registry.
///
/// **WHY THIS MATTERS**: Closed windows must not accumulate senders.
///
/// **BUG THIS CATCHES**: Would catch closed receivers never being pruned.
#[tokio::test]
async fn given_detached_and_dropped_views_when_broadcast_then_pruned() {
    let hub = BroadcastHub::new();
    let (kept_id, mut kept) = hub.attach();
    let (detached_id, _detached) = hub.attach();
    let (_dropped_id, dropped) = hub.attach();

    assert!(hub.detach(detached_id));
    assert!(!hub.detach(detached_id));
    drop(dropped);

    let delivered = hub.broadcast(BroadcastChannel::ThemeChanged, "dark");

    assert_eq!(delivered, 1);
    assert_eq!(hub.view_count(), 1);
    assert_eq!(
        kept.recv().await.map(|message| message.payload),
        Some(RichValue::from("dark"))
    );
    assert!(hub.detach(kept_id));
    assert_eq!(hub.view_count(), 0);
}

/// **VALUE**: Verifies a late view does not see earlier broadcasts.
///
/// **WHY THIS MATTERS**: Broadcasts are fire-and-forget. Late views must pull
/// current state with a query, and a replay would apply a stale value.
///
/// **BUG THIS CATCHES**: Would catch buffering of past broadcasts.
#[tokio::test]
async fn given_view_attached_after_broadcast_when_checked_then_nothing_received() {
    let hub = BroadcastHub::new();

    assert_eq!(hub.broadcast(BroadcastChannel::ThemeChanged, "light"), 0);

    let (_id, mut late) = hub.attach();
    assert!(late.try_recv().is_err());
}
