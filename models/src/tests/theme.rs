use crate::{ThemeMode, ThemePreference};

use std::str::FromStr;

/// **VALUE**: Verifies the effective mode is always light or dark.
///
/// **WHY THIS MATTERS**: Views render the effective mode; `system` must be resolved on the
/// host using the OS mode, explicit choices must ignore it.
#[test]
fn given_preferences_when_resolved_then_returns_concrete_mode() {
    assert_eq!(ThemePreference::System.resolve(ThemeMode::Dark), ThemeMode::Dark);
    assert_eq!(ThemePreference::System.resolve(ThemeMode::Light), ThemeMode::Light);
    assert_eq!(ThemePreference::Light.resolve(ThemeMode::Dark), ThemeMode::Light);
    assert_eq!(ThemePreference::Dark.resolve(ThemeMode::Light), ThemeMode::Dark);
}

/// **VALUE**: Verifies parsing rejects values outside `{system, light, dark}`.
///
/// **BUG THIS CATCHES**: Would catch a permissive parser that stores e.g. `"blue"`.
#[test]
fn given_theme_strings_when_parsed_then_only_known_values_accepted() {
    assert_eq!(ThemePreference::from_str("dark").unwrap(), ThemePreference::Dark);
    assert!(ThemePreference::from_str("blue").is_err());
    assert!(ThemeMode::from_str("system").is_err(), "system is not a mode");
}

/// **VALUE**: Verifies lowercase serde representation matches the wire strings.
#[test]
fn given_theme_values_when_serialized_then_lowercase() {
    assert_eq!(serde_json::to_string(&ThemePreference::System).unwrap(), "\"system\"");
    assert_eq!(serde_json::to_string(&ThemeMode::Dark).unwrap(), "\"dark\"");
    assert!(serde_json::from_str::<ThemePreference>("\"Dark\"").is_err());
}
