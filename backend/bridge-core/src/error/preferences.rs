use std::path::PathBuf;

use common::ErrorLocation;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PreferencesError {
    #[error("Preferences Read Error: {path}: {source} {location}")]
    ReadError {
        location: ErrorLocation,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Preferences Parse Error: {path}: {reason} {location}")]
    ParseError {
        location: ErrorLocation,
        path: PathBuf,
        reason: String,
    },

    #[error("Preferences Write Error: {path}: {source} {location}")]
    WriteError {
        location: ErrorLocation,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Preferences Serialization Error: {reason} {location}")]
    SerializeError {
        location: ErrorLocation,
        reason: String,
    },

    #[error("Preferences Validation Error: {reason} {location}")]
    ValidationError {
        location: ErrorLocation,
        reason: String,
    },

    #[error("Preferences Actor Error: {message} {location}")]
    Actor {
        message: String,
        location: ErrorLocation,
    },
}

impl PreferencesError {
    #[track_caller]
    pub fn validation(reason: impl Into<String>) -> Self {
        PreferencesError::ValidationError {
            location: ErrorLocation::caller(),
            reason: reason.into(),
        }
    }

    #[track_caller]
    pub fn actor(message: impl Into<String>) -> Self {
        PreferencesError::Actor {
            message: message.into(),
            location: ErrorLocation::caller(),
        }
    }
}

impl From<PreferencesError> for crate::error::failure::HandlerError {
    #[track_caller]
    fn from(error: PreferencesError) -> Self {
        crate::error::failure::HandlerError::new(error.to_string())
    }
}
