use crate::startup_tests::helpers::{WAIT_LIMIT, temp_config, wait_until};

use desk_shell::error::ShellError;
use desk_shell::startup;

use bridge_core::codec::RichValue;
use bridge_core::facade::BridgeFacade;
use bridge_core::preferences::{FixedSystemTheme, PREFERENCES_FILE_NAME};
use bridge_core::subscription::SubscriptionEvent;

use models::{LocaleCode, ThemeMode, ThemePreference};

use std::fs;

use tokio::net::TcpListener;
use tokio::time::timeout;

/// **VALUE**: Verifies a started shell serves the application procedures.
///
/// **WHY THIS MATTERS**: This is the path every launch takes: config dir,
/// preferences, router, socket.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - The config directory is not created before preferences are written
/// - A router is left out of the application registry
/// - The tick interval from config is not passed to `example.ticks`
#[tokio::test]
async fn given_fresh_config_dir_when_started_then_serves_procedures() {
    // GIVEN: An empty temp root
    let (config, _root) = temp_config();

    // WHEN: Starting the shell
    let shell = startup::start(&config, &FixedSystemTheme(ThemeMode::Dark))
        .await
        .expect("Shell should start");

    // THEN: Defaults were written
    assert!(config.config_dir.join(PREFERENCES_FILE_NAME).exists());

    // AND: A view can reach it over the socket
    let facade = BridgeFacade::connect(shell.server.port())
        .await
        .expect("Facade should connect");
    assert_eq!(
        facade
            .query("health.ping", RichValue::Undefined)
            .await
            .expect("Ping should succeed"),
        RichValue::from("pong")
    );
    assert_eq!(
        facade.get_effective_theme().await.expect("Should query"),
        ThemeMode::Dark,
        "System preference should follow the OS source"
    );

    // AND: Ticks arrive at the configured pace
    let mut ticks = facade
        .subscribe("example.ticks", RichValue::Undefined)
        .await
        .expect("Should subscribe");
    for expected in 0..3i64 {
        let event = timeout(WAIT_LIMIT, ticks.next())
            .await
            .expect("Tick should arrive within the wait limit");
        assert_eq!(event, Some(SubscriptionEvent::Data(RichValue::from(expected))));
    }
    ticks.cancel();

    shell.shutdown();
    wait_until("facade to observe shutdown", || facade.is_closed()).await;
}

/// **VALUE**: Verifies preferences changed by a view survive a restart.
///
/// **WHY THIS MATTERS**: The user's language and theme choice must be there
/// the next time the shell launches.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - Updates are kept in memory only
/// - Startup ignores an existing preferences file
#[tokio::test]
async fn given_changed_preferences_when_restarted_then_values_restored() {
    // GIVEN: A running shell whose view changes locale and theme
    let (config, _root) = temp_config();
    let shell = startup::start(&config, &FixedSystemTheme::default())
        .await
        .expect("Shell should start");
    let facade = BridgeFacade::over(shell.host.attach_local());

    assert_eq!(
        facade.set_locale("zh-Hans").await.expect("Should set"),
        LocaleCode::ZhCn
    );
    facade
        .set_theme(ThemePreference::Dark)
        .await
        .expect("Should set");

    let file = config.config_dir.join(PREFERENCES_FILE_NAME);
    wait_until("theme to be persisted", || {
        fs::read_to_string(&file)
            .map(|text| text.contains("zh-CN") && text.contains("dark"))
            .unwrap_or(false)
    })
    .await;

    drop(facade);
    shell.shutdown();

    // WHEN: Starting again with the same directory
    let restarted = startup::start(&config, &FixedSystemTheme::default())
        .await
        .expect("Shell should restart");
    let facade = BridgeFacade::over(restarted.host.attach_local());

    // THEN: The stored values are served
    assert_eq!(
        facade.get_locale().await.expect("Should query"),
        LocaleCode::ZhCn
    );
    assert_eq!(
        facade.get_theme().await.expect("Should query"),
        ThemePreference::Dark
    );

    restarted.shutdown();
}

/// **VALUE**: Verifies a port conflict is reported as a bridge error.
///
/// **WHY THIS MATTERS**: A second shell instance must fail fast with a clear
/// message instead of running without a boundary.
///
/// **BUG THIS CATCHES**: Would catch bind failures being logged and swallowed.
#[tokio::test]
async fn given_port_in_use_when_started_then_bridge_error() {
    // GIVEN: A port already taken on loopback
    let blocker = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Should bind blocker");
    let (mut config, _root) = temp_config();
    config.bridge_port = blocker
        .local_addr()
        .expect("Should have address")
        .port();

    // WHEN: Starting on that port
    let result = startup::start(&config, &FixedSystemTheme::default()).await;

    // THEN: Bridge error
    assert!(
        matches!(result, Err(ShellError::Bridge { .. })),
        "Expected ShellError::Bridge"
    );
}
