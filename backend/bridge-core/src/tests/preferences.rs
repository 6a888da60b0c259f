// Unit tests for preference persistence and the preferences actor
// Uses tempfile to isolate each test's config directory

use crate::broadcast::BroadcastHub;
use crate::codec::RichValue;
use crate::error::PreferencesError;
use crate::preferences::{
    AppPreferences, DEFAULT_DB_URL, FixedSystemTheme, PREFERENCES_FILE_NAME, PreferencesState,
};

use models::{BroadcastChannel, LocaleCode, ThemeMode, ThemePreference};

use tempfile::TempDir;

fn write_preferences_file(dir: &TempDir, contents: &str) {
    std::fs::write(dir.path().join(PREFERENCES_FILE_NAME), contents)
        .expect("Failed to write preferences file");
}

// ============================================
// STORE
// ============================================

/// **VALUE**: Verifies a first run writes the defaults to disk.
///
/// **WHY THIS MATTERS**: Later runs (and the user) expect the file to exist
/// once the shell has started.
///
/// **BUG THIS CATCHES**: Would catch `load_or_reset` returning defaults without
/// persisting them.
#[test]
fn given_no_file_when_load_or_reset_then_defaults_written() {
    let dir = TempDir::new().expect("Failed to create temp dir");

    let preferences = AppPreferences::load_or_reset(dir.path());

    assert_eq!(preferences, AppPreferences::default());
    assert_eq!(preferences.db_url, DEFAULT_DB_URL);
    let reloaded = AppPreferences::load(dir.path())
        .expect("Should load")
        .expect("File should exist");
    assert_eq!(reloaded, preferences);
}

/// **VALUE**: Verifies a corrupt file is replaced with defaults instead of
/// failing startup.
///
/// **WHY THIS MATTERS**: A hand-edited or truncated file must not brick the app.
///
/// **BUG THIS CATCHES**: Would catch `load_or_reset` propagating parse errors or
/// leaving the corrupt file in place.
#[test]
fn given_corrupt_file_when_load_or_reset_then_file_replaced_with_defaults() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    write_preferences_file(&dir, "{ not json");

    assert!(matches!(
        AppPreferences::load(dir.path()),
        Err(PreferencesError::ParseError { .. })
    ));

    let preferences = AppPreferences::load_or_reset(dir.path());

    assert_eq!(preferences, AppPreferences::default());
    assert!(AppPreferences::load(dir.path()).expect("Now valid").is_some());
}

/// **VALUE**: Verifies stored locale and theme values are read leniently.
///
/// **WHY THIS MATTERS**: Files written by older builds may contain tags like
/// `zh-Hans` or an unknown theme. They should map to a supported value rather
/// than discard the whole file.
///
/// **BUG THIS CATCHES**: Would catch strict parsing of the stored locale.
#[test]
fn given_loose_locale_and_unknown_theme_when_load_then_normalised() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    write_preferences_file(
        &dir,
        r#"{"version":1,"locale":"zh-Hans","theme":"sepia","dbUrl":"postgresql://db.local/app"}"#,
    );

    let preferences = AppPreferences::load(dir.path())
        .expect("Should load")
        .expect("File exists");

    assert_eq!(preferences.locale, LocaleCode::ZhCn);
    assert_eq!(preferences.theme, ThemePreference::System);
    assert_eq!(preferences.db_url, "postgresql://db.local/app");
}

/// **VALUE**: Verifies invalid database URLs and versions are rejected on save.
///
/// **WHY THIS MATTERS**: The URL is handed to the database layer untouched. A
/// bad value on disk would fail far away from where it was introduced.
///
/// **BUG THIS CATCHES**: Would catch validation being skipped by `save`.
#[test]
fn given_invalid_values_when_save_then_validation_error_and_nothing_written() {
    let dir = TempDir::new().expect("Failed to create temp dir");

    for db_url in ["not a url", "mysql://localhost/app", "postgres:///no-host"] {
        let preferences = AppPreferences {
            db_url: db_url.to_string(),
            ..AppPreferences::default()
        };
        assert!(
            matches!(
                preferences.save(dir.path()),
                Err(PreferencesError::ValidationError { .. })
            ),
            "'{db_url}' should be rejected"
        );
    }

    let wrong_version = AppPreferences {
        version: 99,
        ..AppPreferences::default()
    };
    assert!(wrong_version.save(dir.path()).is_err());

    assert!(!dir.path().join(PREFERENCES_FILE_NAME).exists());
}

/// **VALUE**: Verifies save leaves no temp file behind and writes camelCase keys.
///
/// **WHY THIS MATTERS**: The file is shared with the view's settings screen,
/// which reads `dbUrl`.
///
/// **BUG THIS CATCHES**: Would catch a missing rename or snake_case keys.
#[test]
fn given_preferences_when_save_then_camel_case_file_without_temp() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let preferences = AppPreferences {
        locale: LocaleCode::ZhCn,
        theme: ThemePreference::Dark,
        ..AppPreferences::default()
    };

    preferences.save(dir.path()).expect("Should save");

    let contents = std::fs::read_to_string(dir.path().join(PREFERENCES_FILE_NAME))
        .expect("File should exist");
    let json: serde_json::Value = serde_json::from_str(&contents).expect("Valid JSON");
    assert_eq!(json["locale"], "zh-CN");
    assert_eq!(json["theme"], "dark");
    assert!(json.get("dbUrl").is_some());
    assert!(
        !dir.path()
            .join(format!("{PREFERENCES_FILE_NAME}.tmp"))
            .exists()
    );
}

// ============================================
// STATE
// ============================================

/// **VALUE**: Verifies `set_locale` normalises, persists and broadcasts.
///
/// **WHY THIS MATTERS**: This is the locale round trip. Every view must switch
/// language, and the choice must survive a restart.
///
/// **BUG THIS CATCHES**: Would catch broadcasting the raw tag, skipping the
/// disk write, or answering before state was updated.
#[tokio::test]
async fn given_state_when_set_locale_then_normalised_persisted_and_broadcast() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let hub = BroadcastHub::new();
    let (_view, mut messages) = hub.attach();
    let state = PreferencesState::new(
        dir.path().to_path_buf(),
        AppPreferences::default(),
        &FixedSystemTheme(ThemeMode::Light),
        hub.clone(),
    );

    let locale = state.set_locale("zh-hans-CN").await.expect("Should set");

    assert_eq!(locale, LocaleCode::ZhCn);
    assert_eq!(state.locale().await, LocaleCode::ZhCn);
    let message = messages.recv().await.expect("Broadcast expected");
    assert_eq!(message.channel, BroadcastChannel::LocaleChanged);
    assert_eq!(message.payload, RichValue::from("zh-CN"));

    let stored = AppPreferences::load(dir.path())
        .expect("Should load")
        .expect("File exists");
    assert_eq!(stored.locale, LocaleCode::ZhCn);

    // Unsupported tags fall back to the default
    assert_eq!(
        state.set_locale("zh-TW").await.expect("Should set"),
        LocaleCode::EnUs
    );
}

/// **VALUE**: Verifies theme changes broadcast the effective mode, not the
/// stored preference.
///
/// **WHY THIS MATTERS**: Views only know how to render light or dark. `system`
/// must be resolved on the host.
///
/// **BUG THIS CATCHES**: Would catch `system` being sent to views.
#[tokio::test]
async fn given_state_when_set_theme_then_effective_mode_broadcast() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let hub = BroadcastHub::new();
    let (_view, mut messages) = hub.attach();
    let state = PreferencesState::new(
        dir.path().to_path_buf(),
        AppPreferences::default(),
        &FixedSystemTheme(ThemeMode::Dark),
        hub,
    );

    // System preference follows the OS (dark)
    assert_eq!(
        state
            .set_theme(ThemePreference::System)
            .await
            .expect("Should set"),
        ThemeMode::Dark
    );
    assert_eq!(
        messages.recv().await.map(|m| m.payload),
        Some(RichValue::from("dark"))
    );

    // Explicit light overrides it
    assert_eq!(
        state
            .set_theme(ThemePreference::Light)
            .await
            .expect("Should set"),
        ThemeMode::Light
    );
    assert_eq!(
        messages.recv().await.map(|m| m.payload),
        Some(RichValue::from("light"))
    );
    assert_eq!(state.theme().await, ThemePreference::Light);
    assert_eq!(state.effective_theme().await, ThemeMode::Light);
}

/// **VALUE**: Verifies OS theme changes only broadcast when they change what is
/// rendered.
///
/// **WHY THIS MATTERS**: With an explicit preference the OS mode is irrelevant.
/// Spurious broadcasts cause visible flicker.
///
/// **BUG THIS CATCHES**: Would catch unconditional broadcasting on OS changes.
#[tokio::test]
async fn given_system_theme_change_when_preference_pinned_then_no_broadcast() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let hub = BroadcastHub::new();
    let (_view, mut messages) = hub.attach();
    let state = PreferencesState::new(
        dir.path().to_path_buf(),
        AppPreferences {
            theme: ThemePreference::Light,
            ..AppPreferences::default()
        },
        &FixedSystemTheme(ThemeMode::Light),
        hub,
    );

    // Pinned to light: OS flip is silent
    assert_eq!(
        state
            .system_theme_changed(ThemeMode::Dark)
            .await
            .expect("Should apply"),
        ThemeMode::Light
    );
    assert!(messages.try_recv().is_err());

    // Following the system: the next flip is broadcast
    state
        .set_theme(ThemePreference::System)
        .await
        .expect("Should set");
    assert_eq!(
        messages.recv().await.map(|m| m.payload),
        Some(RichValue::from("dark"))
    );
    state
        .system_theme_changed(ThemeMode::Light)
        .await
        .expect("Should apply");
    assert_eq!(
        messages.recv().await.map(|m| m.payload),
        Some(RichValue::from("light"))
    );
}
