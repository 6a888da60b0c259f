use bridge_core::error::{IpcError, RegistryError};

use common::ErrorLocation;

use serde::Serialize;
use thiserror::Error;

/// Errors that stop the shell from starting.
///
/// Serialisable so a crash report can carry the structured variant alongside
/// the call site.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum ShellError {
    /// A configuration value was present but unusable
    #[error("Config Error: {message} {location}")]
    Config {
        message: String,
        location: ErrorLocation,
    },

    /// Logger could not be installed
    #[error("Logger Error: {message} {location}")]
    Logger {
        message: String,
        location: ErrorLocation,
    },

    /// Directory creation or other filesystem setup failed
    #[error("Io Error: {message} {location}")]
    Io {
        message: String,
        location: ErrorLocation,
    },

    /// The procedure tree could not be assembled
    #[error("Router Error: {message} {location}")]
    Router {
        message: String,
        location: ErrorLocation,
    },

    /// The boundary server could not be started
    #[error("Bridge Error: {message} {location}")]
    Bridge {
        message: String,
        location: ErrorLocation,
    },
}

impl ShellError {
    #[track_caller]
    pub fn config(message: impl Into<String>) -> Self {
        ShellError::Config {
            message: message.into(),
            location: ErrorLocation::caller(),
        }
    }

    #[track_caller]
    pub fn io(message: impl Into<String>) -> Self {
        ShellError::Io {
            message: message.into(),
            location: ErrorLocation::caller(),
        }
    }
}

impl From<RegistryError> for ShellError {
    #[track_caller]
    fn from(error: RegistryError) -> Self {
        ShellError::Router {
            message: error.to_string(),
            location: ErrorLocation::caller(),
        }
    }
}

impl From<IpcError> for ShellError {
    #[track_caller]
    fn from(error: IpcError) -> Self {
        ShellError::Bridge {
            message: error.to_string(),
            location: ErrorLocation::caller(),
        }
    }
}
