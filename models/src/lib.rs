//! Domain models for the desk shell.
//!
//! Pure data shared by the host and the view-side facade: supported
//! locales, theme preferences and the names of the broadcast channels that
//! carry them. No I/O and no async here.

pub mod channel;
pub mod error;
pub mod locale;
pub mod theme;

pub use channel::BroadcastChannel;
pub use error::model_error::ModelError;
pub use locale::{AppLocale, DEFAULT_LOCALE, LocaleCode, SUPPORTED_LOCALES};
pub use theme::{ThemeMode, ThemePreference};

#[cfg(test)]
mod tests;
