//! Shell configuration read from the environment.
//!
//! A `.env` file in the working directory is loaded first when present.
//! Variables already set in the process environment win over the file.

use crate::error::ShellError;

use bridge_core::DEFAULT_BRIDGE_PORT;

use std::env::{self, VarError};
use std::path::PathBuf;
use std::time::Duration;

use log::debug;

pub const BRIDGE_PORT_VAR: &str = "SHELL_BRIDGE_PORT";
pub const CONFIG_DIR_VAR: &str = "SHELL_CONFIG_DIR";
pub const LOG_DIR_VAR: &str = "SHELL_LOG_DIR";
pub const TICK_INTERVAL_VAR: &str = "SHELL_TICK_INTERVAL_MS";

/// Directory name under the platform config/data roots.
pub const APP_DIR_NAME: &str = "desk-shell";

const LOG_SUBDIR_NAME: &str = "logs";
const DEFAULT_TICK_INTERVAL_MS: u64 = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellConfig {
    /// `0` binds an ephemeral port.
    pub bridge_port: u16,
    pub config_dir: PathBuf,
    pub log_dir: PathBuf,
    pub tick_interval: Duration,
}

impl ShellConfig {
    /// Load `.env` (if any) and then read the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ShellError::Config`] if a variable is set but cannot be
    /// parsed, or if no config directory can be determined.
    pub fn load() -> Result<Self, ShellError> {
        match dotenvy::dotenv() {
            Ok(path) => debug!("Loaded environment from {}", path.display()),
            Err(e) if e.not_found() => {}
            Err(e) => return Err(ShellError::config(format!("Failed to read .env file: {e}"))),
        }

        Self::from_env()
    }

    /// Read the configuration from the process environment only.
    pub fn from_env() -> Result<Self, ShellError> {
        let bridge_port = match read_var(BRIDGE_PORT_VAR)? {
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| {
                ShellError::config(format!("{BRIDGE_PORT_VAR}={raw:?} is not a valid port: {e}"))
            })?,
            None => DEFAULT_BRIDGE_PORT,
        };

        let config_dir = match read_var(CONFIG_DIR_VAR)? {
            Some(raw) => PathBuf::from(raw),
            None => dirs::config_dir()
                .map(|dir| dir.join(APP_DIR_NAME))
                .ok_or_else(|| {
                    ShellError::config(format!(
                        "No platform config directory; set {CONFIG_DIR_VAR}"
                    ))
                })?,
        };

        let log_dir = match read_var(LOG_DIR_VAR)? {
            Some(raw) => PathBuf::from(raw),
            None => dirs::data_local_dir()
                .map(|dir| dir.join(APP_DIR_NAME).join(LOG_SUBDIR_NAME))
                .unwrap_or_else(|| config_dir.join(LOG_SUBDIR_NAME)),
        };

        let tick_interval_ms = match read_var(TICK_INTERVAL_VAR)? {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(0) => {
                    return Err(ShellError::config(format!(
                        "{TICK_INTERVAL_VAR} must be greater than zero"
                    )));
                }
                Ok(ms) => ms,
                Err(e) => {
                    return Err(ShellError::config(format!(
                        "{TICK_INTERVAL_VAR}={raw:?} is not a number of milliseconds: {e}"
                    )));
                }
            },
            None => DEFAULT_TICK_INTERVAL_MS,
        };

        Ok(Self {
            bridge_port,
            config_dir,
            log_dir,
            tick_interval: Duration::from_millis(tick_interval_ms),
        })
    }
}

/// Empty values count as unset.
fn read_var(name: &str) -> Result<Option<String>, ShellError> {
    match env::var(name) {
        Ok(value) if value.trim().is_empty() => Ok(None),
        Ok(value) => Ok(Some(value)),
        Err(VarError::NotPresent) => Ok(None),
        Err(VarError::NotUnicode(_)) => {
            Err(ShellError::config(format!("{name} is not valid unicode")))
        }
    }
}
