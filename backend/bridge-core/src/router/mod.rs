//! The procedures the desktop shell exposes to its views.

mod example;
mod health;
mod preferences;

use crate::error::RegistryError;
use crate::preferences::PreferencesState;
use crate::procedure::ProcedureRegistry;

use std::time::Duration;

use log::info;

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Build the full application registry.
///
/// # Errors
///
/// Returns [`RegistryError`] if two routers claim the same path. This is a
/// programming error and should abort startup.
pub fn app_router(
    preferences: PreferencesState,
    tick_interval: Duration,
) -> Result<ProcedureRegistry, RegistryError> {
    let mut registry = ProcedureRegistry::new();

    health::register(&mut registry)?;
    example::register(&mut registry, tick_interval)?;
    preferences::register(&mut registry, preferences)?;

    info!("Application router ready with {} procedures", registry.len());
    Ok(registry)
}
