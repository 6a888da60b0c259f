//! Wiring from configuration to a serving bridge host.

use crate::config::ShellConfig;
use crate::error::ShellError;

use bridge_core::broadcast::BroadcastHub;
use bridge_core::host::BridgeHost;
use bridge_core::ipc::BridgeServerHandle;
use bridge_core::preferences::{AppPreferences, PreferencesState, SystemThemeSource};
use bridge_core::router::app_router;

use std::fs::create_dir_all;

use log::info;

/// Everything the shell keeps alive while it runs.
pub struct RunningShell {
    pub host: BridgeHost,
    pub preferences: PreferencesState,
    pub server: BridgeServerHandle,
}

impl RunningShell {
    /// Stop the boundary server. Open views are disconnected.
    pub fn shutdown(&self) {
        self.server.shutdown();
    }
}

/// Load preferences, build the router and start serving views.
///
/// # Errors
///
/// Returns [`ShellError::Io`] if the config directory cannot be created,
/// [`ShellError::Router`] if the procedure tree is inconsistent, or
/// [`ShellError::Bridge`] if the port cannot be bound.
pub async fn start(
    config: &ShellConfig,
    system_theme: &dyn SystemThemeSource,
) -> Result<RunningShell, ShellError> {
    create_dir_all(&config.config_dir).map_err(|e| {
        ShellError::io(format!(
            "Failed to create config directory {}: {e}",
            config.config_dir.display()
        ))
    })?;
    info!("Config directory: {}", config.config_dir.display());

    let initial = AppPreferences::load_or_reset(&config.config_dir);
    info!(
        "Preferences loaded: locale={}, theme={}",
        initial.locale, initial.theme
    );

    let hub = BroadcastHub::new();
    let preferences = PreferencesState::new(
        config.config_dir.clone(),
        initial,
        system_theme,
        hub.clone(),
    );

    let registry = app_router(preferences.clone(), config.tick_interval)?;
    let host = BridgeHost::new(registry, hub);
    let server = host.serve(config.bridge_port).await?;

    info!("Bridge serving views on {}", server.local_addr());

    Ok(RunningShell {
        host,
        preferences,
        server,
    })
}
