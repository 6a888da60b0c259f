//! Persisted locale, theme and database preferences.

mod state;
mod store;
mod system_theme;

pub use state::{PreferencesCommand, PreferencesState};
pub use store::{AppPreferences, DEFAULT_DB_URL, PREFERENCES_FILE_NAME, PREFERENCES_VERSION};
pub use system_theme::{FixedSystemTheme, SystemThemeSource};
