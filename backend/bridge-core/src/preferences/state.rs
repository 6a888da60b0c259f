//! Preference state behind an actor.
//!
//! Same shape as the other host state holders:
//! - Commands are sent via an mpsc channel
//! - A dedicated task applies them in order, persists, then broadcasts
//! - Reads go straight to an `Arc<RwLock<_>>`

use crate::broadcast::BroadcastHub;
use crate::error::PreferencesError;
use crate::preferences::{AppPreferences, SystemThemeSource};

use models::{BroadcastChannel, LocaleCode, ThemeMode, ThemePreference};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{error, info, warn};
use tokio::sync::{Mutex, RwLock, mpsc, oneshot};

/// Commands that mutate preferences.
#[derive(Debug)]
pub enum PreferencesCommand {
    /// Normalise, store and broadcast a locale tag. Replies with the code.
    SetLocale {
        tag: String,
        reply: oneshot::Sender<LocaleCode>,
    },

    /// Store a theme preference and broadcast the resulting mode.
    SetTheme {
        preference: ThemePreference,
        reply: oneshot::Sender<ThemeMode>,
    },

    /// The OS switched between light and dark.
    SystemThemeChanged {
        mode: ThemeMode,
        reply: oneshot::Sender<ThemeMode>,
    },
}

/// Shared handle to the current preferences.
///
/// `Clone` shares the same state and actor.
#[derive(Clone)]
pub struct PreferencesState {
    command_tx: Arc<Mutex<Option<mpsc::Sender<PreferencesCommand>>>>,
    preferences: Arc<RwLock<AppPreferences>>,
    system_mode: Arc<RwLock<ThemeMode>>,
    config_dir: Arc<PathBuf>,
    hub: BroadcastHub,
    actor_init: Arc<Mutex<bool>>,
}

impl PreferencesState {
    /// # Arguments
    ///
    /// * `config_dir` - Directory holding `app-config.json`
    /// * `preferences` - Initial preferences (see [`AppPreferences::load_or_reset`])
    /// * `system_theme` - Read once for the initial OS mode
    /// * `hub` - Where changes are broadcast
    pub fn new(
        config_dir: PathBuf,
        preferences: AppPreferences,
        system_theme: &dyn SystemThemeSource,
        hub: BroadcastHub,
    ) -> Self {
        Self {
            command_tx: Arc::new(Mutex::new(None)),
            preferences: Arc::new(RwLock::new(preferences)),
            system_mode: Arc::new(RwLock::new(system_theme.current_mode())),
            config_dir: Arc::new(config_dir),
            hub,
            actor_init: Arc::new(Mutex::new(false)),
        }
    }

    pub async fn snapshot(&self) -> AppPreferences {
        self.preferences.read().await.clone()
    }

    pub async fn locale(&self) -> LocaleCode {
        self.preferences.read().await.locale
    }

    pub async fn theme(&self) -> ThemePreference {
        self.preferences.read().await.theme
    }

    pub async fn effective_theme(&self) -> ThemeMode {
        let preference = self.theme().await;
        preference.resolve(*self.system_mode.read().await)
    }

    /// Store `tag` normalised to a supported locale and broadcast it.
    pub async fn set_locale(&self, tag: &str) -> Result<LocaleCode, PreferencesError> {
        let tag = tag.to_string();
        self.request(|reply| PreferencesCommand::SetLocale { tag, reply })
            .await
    }

    /// Store `preference` and broadcast the effective mode.
    pub async fn set_theme(&self, preference: ThemePreference) -> Result<ThemeMode, PreferencesError> {
        self.request(|reply| PreferencesCommand::SetTheme { preference, reply })
            .await
    }

    /// Record a new OS mode. Broadcasts only if the effective mode changed.
    pub async fn system_theme_changed(&self, mode: ThemeMode) -> Result<ThemeMode, PreferencesError> {
        self.request(|reply| PreferencesCommand::SystemThemeChanged { mode, reply })
            .await
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> PreferencesCommand,
    ) -> Result<T, PreferencesError> {
        self.ensure_actor().await;

        let tx_guard = self.command_tx.lock().await;
        let tx = tx_guard
            .as_ref()
            .ok_or_else(|| PreferencesError::actor("Preferences actor not initialized"))?;

        let (reply, response) = oneshot::channel();
        tx.send(command(reply))
            .await
            .map_err(|e| PreferencesError::actor(format!("Preferences actor died: {e}")))?;
        drop(tx_guard);

        response
            .await
            .map_err(|e| PreferencesError::actor(format!("Preferences actor dropped reply: {e}")))
    }

    async fn ensure_actor(&self) {
        let mut init_guard = self.actor_init.lock().await;
        if !*init_guard {
            let (tx, rx) = mpsc::channel(100);

            let mut tx_guard = self.command_tx.lock().await;
            *tx_guard = Some(tx);
            drop(tx_guard);

            tokio::spawn(preferences_actor(
                rx,
                Arc::clone(&self.preferences),
                Arc::clone(&self.system_mode),
                Arc::clone(&self.config_dir),
                self.hub.clone(),
            ));

            *init_guard = true;
            info!("Preferences actor spawned");
        }
    }
}

async fn preferences_actor(
    mut command_rx: mpsc::Receiver<PreferencesCommand>,
    preferences: Arc<RwLock<AppPreferences>>,
    system_mode: Arc<RwLock<ThemeMode>>,
    config_dir: Arc<PathBuf>,
    hub: BroadcastHub,
) {
    info!("Preferences actor started");

    while let Some(command) = command_rx.recv().await {
        match command {
            PreferencesCommand::SetLocale { tag, reply } => {
                let locale = LocaleCode::normalize(&tag);
                let updated = {
                    let mut write = preferences.write().await;
                    write.locale = locale;
                    write.clone()
                };
                info!("Locale set to {locale} (requested '{tag}')");

                persist(&updated, &config_dir);
                hub.broadcast(BroadcastChannel::LocaleChanged, locale.as_str());
                let _ = reply.send(locale);
            }

            PreferencesCommand::SetTheme { preference, reply } => {
                let updated = {
                    let mut write = preferences.write().await;
                    write.theme = preference;
                    write.clone()
                };
                let mode = preference.resolve(*system_mode.read().await);
                info!("Theme set to {preference} ({mode})");

                persist(&updated, &config_dir);
                hub.broadcast(BroadcastChannel::ThemeChanged, mode.as_str());
                let _ = reply.send(mode);
            }

            PreferencesCommand::SystemThemeChanged { mode, reply } => {
                let previous = std::mem::replace(&mut *system_mode.write().await, mode);
                let preference = preferences.read().await.theme;

                let before = preference.resolve(previous);
                let after = preference.resolve(mode);
                if before != after {
                    info!("System theme changed to {mode}, effective theme now {after}");
                    hub.broadcast(BroadcastChannel::ThemeChanged, after.as_str());
                }
                let _ = reply.send(after);
            }
        }
    }

    warn!("Preferences actor stopped");
}

/// Memory is already updated; a failed write only costs persistence.
fn persist(preferences: &AppPreferences, config_dir: &Path) {
    if let Err(e) = preferences.save(config_dir) {
        error!("Preferences updated in memory but disk write failed: {e}");
    }
}
