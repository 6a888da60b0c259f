use models::ThemeMode;

/// Where the OS-level light/dark setting comes from.
pub trait SystemThemeSource: Send + Sync {
    fn current_mode(&self) -> ThemeMode;
}

/// A source that always reports the same mode. Used when the platform
/// setting is unavailable, and in tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FixedSystemTheme(pub ThemeMode);

impl SystemThemeSource for FixedSystemTheme {
    fn current_mode(&self) -> ThemeMode {
        self.0
    }
}
