use common::ErrorLocation;

use std::io::Error as IoError;

use thiserror::Error as ThisError;

/// Transport failures on the host side of the view boundary.
#[derive(Debug, ThisError)]
pub enum IpcError {
    #[error("Handshake Error: {message} {location}")]
    Handshake {
        message: String,
        location: ErrorLocation,
    },

    #[error("Send Error: {message} {location}")]
    Send {
        message: String,
        location: ErrorLocation,
    },

    #[error("Read Error: {message} {location}")]
    Read {
        message: String,
        location: ErrorLocation,
    },

    #[error("IO Error: {message} {location}")]
    Io {
        message: String,
        location: ErrorLocation,
    },
}

impl IpcError {
    #[track_caller]
    pub fn send(message: impl Into<String>) -> Self {
        IpcError::Send {
            message: message.into(),
            location: ErrorLocation::caller(),
        }
    }

    #[track_caller]
    pub fn read(message: impl Into<String>) -> Self {
        IpcError::Read {
            message: message.into(),
            location: ErrorLocation::caller(),
        }
    }
}

impl From<IoError> for IpcError {
    #[track_caller]
    fn from(error: IoError) -> Self {
        IpcError::Io {
            message: error.to_string(),
            location: ErrorLocation::caller(),
        }
    }
}

