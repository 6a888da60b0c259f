use crate::bridge_tests::helpers::{app_host, local_facade, wait_until};

use bridge_core::codec::RichValue;
use bridge_core::preferences::AppPreferences;

use models::{LocaleCode, ThemeMode, ThemePreference};

use std::sync::{Arc, Mutex};
use std::time::Duration;

fn recorder<T: Send + 'static>() -> (Arc<Mutex<Vec<T>>>, impl Fn(T) + Send + Sync + 'static) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let record = move |value: T| {
        sink.lock().expect("Recorder lock poisoned").push(value);
    };
    (seen, record)
}

/// **VALUE**: Verifies a locale change made in one view reaches every view and
/// is persisted.
///
/// **WHY THIS MATTERS**: Switching language in settings must relabel every
/// open window and survive a restart.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - Only the calling view is notified
/// - The raw tag is broadcast instead of the normalised code
/// - The change is not written to `app-config.json`
#[tokio::test]
async fn given_two_views_when_set_locale_then_both_notified_and_persisted() {
    // GIVEN: Two views listening for locale changes
    let app = app_host();
    let settings = local_facade(&app.host);
    let other = local_facade(&app.host);
    let (settings_seen, settings_record) = recorder::<LocaleCode>();
    let (other_seen, other_record) = recorder::<LocaleCode>();
    let _settings_listener = settings.on_locale_changed(settings_record);
    let _other_listener = other.on_locale_changed(other_record);

    // Both sessions must be attached to the hub before the change
    assert_eq!(other.get_locale().await.expect("Should read"), LocaleCode::EnUs);

    // WHEN: The settings view switches to a loose Chinese tag
    let stored = settings
        .set_locale("zh-Hans")
        .await
        .expect("Should set locale");

    // THEN: Normalised code returned and seen by both views
    assert_eq!(stored, LocaleCode::ZhCn);
    wait_until("both views saw the change", || {
        settings_seen.lock().expect("lock").as_slice() == [LocaleCode::ZhCn]
            && other_seen.lock().expect("lock").as_slice() == [LocaleCode::ZhCn]
    })
    .await;

    // THEN: Persisted and readable from the other view
    assert_eq!(other.get_locale().await.expect("Should read"), LocaleCode::ZhCn);
    let on_disk = AppPreferences::load(app.config_dir.path())
        .expect("Should load")
        .expect("File exists");
    assert_eq!(on_disk.locale, LocaleCode::ZhCn);
}

/// **VALUE**: Verifies theme changes broadcast the rendered mode and are
/// readable afterwards.
///
/// **WHY THIS MATTERS**: Views only apply light or dark; `system` is resolved
/// on the host.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - The preference string is broadcast instead of the mode
/// - `getTheme` and `getEffectiveTheme` disagree with what was set
#[tokio::test]
async fn given_view_when_set_theme_then_mode_broadcast_and_queries_agree() {
    // GIVEN: A view listening for theme changes (OS reports light)
    let app = app_host();
    let facade = local_facade(&app.host);
    let (seen, record) = recorder::<ThemeMode>();
    let _listener = facade.on_theme_changed(record);
    assert_eq!(
        facade.get_theme().await.expect("Should read"),
        ThemePreference::System
    );

    // WHEN: Choosing dark
    let mode = facade
        .set_theme(ThemePreference::Dark)
        .await
        .expect("Should set theme");

    // THEN: Dark everywhere
    assert_eq!(mode, ThemeMode::Dark);
    wait_until("the theme broadcast arrived", || {
        seen.lock().expect("lock").as_slice() == [ThemeMode::Dark]
    })
    .await;
    assert_eq!(
        facade.get_theme().await.expect("Should read"),
        ThemePreference::Dark
    );
    assert_eq!(
        facade.get_effective_theme().await.expect("Should read"),
        ThemeMode::Dark
    );

    // WHEN: The OS flips while the preference is pinned
    app.preferences
        .system_theme_changed(ThemeMode::Dark)
        .await
        .expect("Should apply");

    // THEN: Nothing new is broadcast
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(seen.lock().expect("lock").len(), 1);
}

/// **VALUE**: Verifies a removed listener is no longer called.
///
/// **WHY THIS MATTERS**: Components unregister on unmount. A stale listener
/// would update a component that no longer exists.
///
/// **BUG THIS CATCHES**: Would catch `remove` not taking effect, or a second
/// `remove` misbehaving.
#[tokio::test]
async fn given_removed_listener_when_locale_changes_then_not_called() {
    // GIVEN: Two listeners, one of which is removed
    let app = app_host();
    let facade = local_facade(&app.host);
    let (kept_seen, kept_record) = recorder::<LocaleCode>();
    let (removed_seen, removed_record) = recorder::<LocaleCode>();
    let _kept = facade.on_locale_changed(kept_record);
    let removed = facade.on_locale_changed(removed_record);
    assert!(removed.remove());
    assert!(!removed.remove());

    // WHEN: The locale changes
    facade.set_locale("zh-CN").await.expect("Should set locale");

    // THEN: Only the kept listener fires
    wait_until("the kept listener fired", || {
        kept_seen.lock().expect("lock").len() == 1
    })
    .await;
    assert!(removed_seen.lock().expect("lock").is_empty());
}

/// **VALUE**: Verifies a view attached after a change pulls the current value.
///
/// **WHY THIS MATTERS**: Broadcasts are not replayed. Late views must be able to
/// catch up with a query.
///
/// **BUG THIS CATCHES**: Would catch queries reading stale state.
#[tokio::test]
async fn given_change_before_attach_when_late_view_queries_then_current_value() {
    // GIVEN: A change made before the second view exists
    let app = app_host();
    let early = local_facade(&app.host);
    early.set_locale("zh").await.expect("Should set locale");

    // WHEN: A late view queries
    let late = local_facade(&app.host);
    let locale = late.get_locale().await.expect("Should read");

    // THEN: Current value
    assert_eq!(locale, LocaleCode::ZhCn);
    let supported = late
        .query("preferences.supportedLocales", RichValue::Undefined)
        .await
        .expect("Should list locales");
    assert!(matches!(supported, RichValue::Array(ref locales) if locales.len() == 2));
}
