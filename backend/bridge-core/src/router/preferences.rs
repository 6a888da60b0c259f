use crate::codec::RichValue;
use crate::error::{HandlerError, RegistryError};
use crate::preferences::PreferencesState;
use crate::procedure::{NoInput, ProcedureRegistry};

use models::{SUPPORTED_LOCALES, ThemePreference};

pub(crate) fn register(
    registry: &mut ProcedureRegistry,
    state: PreferencesState,
) -> Result<(), RegistryError> {
    let prefs = state.clone();
    registry.query("preferences.getLocale", move |_: NoInput| {
        let prefs = prefs.clone();
        async move { Ok::<_, HandlerError>(prefs.locale().await.as_str()) }
    })?;

    // Any tag is accepted and normalised; the stored code is returned.
    let prefs = state.clone();
    registry.mutation("preferences.setLocale", move |tag: String| {
        let prefs = prefs.clone();
        async move {
            let locale = prefs.set_locale(&tag).await?;
            Ok::<_, HandlerError>(locale.as_str())
        }
    })?;

    registry.query("preferences.supportedLocales", |_: NoInput| async {
        let locales = RichValue::from_serialize(&SUPPORTED_LOCALES)?;
        Ok::<_, HandlerError>(locales)
    })?;

    let prefs = state.clone();
    registry.query("preferences.getTheme", move |_: NoInput| {
        let prefs = prefs.clone();
        async move { Ok::<_, HandlerError>(prefs.theme().await.as_str()) }
    })?;

    let prefs = state.clone();
    registry.mutation(
        "preferences.setTheme",
        move |preference: ThemePreference| {
            let prefs = prefs.clone();
            async move {
                let mode = prefs.set_theme(preference).await?;
                Ok::<_, HandlerError>(mode.as_str())
            }
        },
    )?;

    let prefs = state;
    registry.query("preferences.getEffectiveTheme", move |_: NoInput| {
        let prefs = prefs.clone();
        async move { Ok::<_, HandlerError>(prefs.effective_theme().await.as_str()) }
    })?;

    Ok(())
}
