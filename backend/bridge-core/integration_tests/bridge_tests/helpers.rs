//! Test helpers for bridge integration tests.
//!
//! This module provides:
//! - A host built from the application router in a temp config dir
//! - A small fixture router with observable producers
//! - Polling helpers for asynchronous conditions

use bridge_core::broadcast::BroadcastHub;
use bridge_core::codec::RichValue;
use bridge_core::error::HandlerError;
use bridge_core::facade::{BridgeFacade, Subscription};
use bridge_core::host::BridgeHost;
use bridge_core::preferences::{AppPreferences, FixedSystemTheme, PreferencesState};
use bridge_core::procedure::{Handler, NoInput, ProcedureKind, ProcedureRegistry, Validator};
use bridge_core::router::app_router;
use bridge_core::subscription::SubscriptionEvent;

use models::ThemeMode;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, SystemTime};

use futures_util::stream;
use tempfile::TempDir;

pub const TEST_TICK_INTERVAL: Duration = Duration::from_millis(20);
pub const WAIT_LIMIT: Duration = Duration::from_secs(3);

/// Application host plus the temp dir its preferences live in.
///
/// Keep the `TempDir` alive for as long as the host is used.
pub struct AppHost {
    pub host: BridgeHost,
    pub preferences: PreferencesState,
    pub config_dir: TempDir,
}

/// Test helper: Build the real application router on a fresh config dir.
pub fn app_host() -> AppHost {
    let config_dir = TempDir::new().expect("Failed to create temp dir");
    let hub = BroadcastHub::new();
    let preferences = PreferencesState::new(
        config_dir.path().to_path_buf(),
        AppPreferences::load_or_reset(config_dir.path()),
        &FixedSystemTheme(ThemeMode::Light),
        hub.clone(),
    );
    let registry =
        app_router(preferences.clone(), TEST_TICK_INTERVAL).expect("Router should build");

    AppHost {
        host: BridgeHost::new(registry, hub),
        preferences,
        config_dir,
    }
}

/// Host whose procedures report on themselves.
pub struct FixtureHost {
    pub host: BridgeHost,
    /// Set once the `fixture.ticks` producer has been dropped.
    pub producer_dropped: Arc<AtomicBool>,
}

struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Test helper: Host with `fixture.identity` (returns its input untouched),
/// `fixture.ticks` (endless, flags its own teardown) and `fixture.burst`
/// (endless and never pending).
pub fn fixture_host() -> FixtureHost {
    let producer_dropped = Arc::new(AtomicBool::new(false));
    let mut registry = ProcedureRegistry::new();

    registry
        .register(
            "fixture.identity",
            ProcedureKind::Query,
            Validator::any(),
            Handler::call(|input| async move { Ok::<RichValue, HandlerError>(input) }),
        )
        .expect("Should register identity");

    let flag = Arc::clone(&producer_dropped);
    registry
        .subscription("fixture.ticks", move |_: NoInput| {
            let guard = DropFlag(Arc::clone(&flag));
            async move {
                let ticks = stream::unfold((guard, 0_i64), |(guard, tick)| async move {
                    tokio::time::sleep(TEST_TICK_INTERVAL).await;
                    Some((Ok::<_, HandlerError>(tick), (guard, tick + 1)))
                });
                Ok::<_, HandlerError>(ticks)
            }
        })
        .expect("Should register ticks");

    // Always ready: 100, 101, 102, ... without ever sleeping.
    registry
        .subscription("fixture.burst", |_: NoInput| async {
            Ok::<_, HandlerError>(stream::iter((100_i64..).map(Ok::<_, HandlerError>)))
        })
        .expect("Should register burst");

    // One value the codec cannot encode (dates before 1970), then more data.
    registry
        .subscription("fixture.unencodable", |_: NoInput| async {
            let before_epoch = SystemTime::UNIX_EPOCH - Duration::from_secs(1);
            Ok::<_, HandlerError>(stream::iter(vec![
                Ok::<_, HandlerError>(RichValue::from(1_i64)),
                Ok(RichValue::from(before_epoch)),
                Ok(RichValue::from(2_i64)),
            ]))
        })
        .expect("Should register unencodable");

    FixtureHost {
        host: BridgeHost::new(registry, BroadcastHub::new()),
        producer_dropped,
    }
}

/// Test helper: Facade attached to `host` in-process.
pub fn local_facade(host: &BridgeHost) -> BridgeFacade {
    BridgeFacade::over(host.attach_local())
}

/// Test helper: Next subscription event, failing the test after [`WAIT_LIMIT`].
pub async fn next_event(subscription: &mut Subscription) -> Option<SubscriptionEvent> {
    tokio::time::timeout(WAIT_LIMIT, subscription.next())
        .await
        .expect("Timed out waiting for a subscription event")
}

/// Test helper: Poll `condition` until it holds or [`WAIT_LIMIT`] passes.
pub async fn wait_until(description: &str, condition: impl Fn() -> bool) {
    let deadline = tokio::time::Instant::now() + WAIT_LIMIT;
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "Timed out waiting until {description}"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
