use common::ErrorLocation;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum CodecError {
    #[error("Malformed Envelope: {message} {location}")]
    MalformedEnvelope {
        message: String,
        location: ErrorLocation,
    },

    #[error("Invalid Annotation at '{path}': {message} {location}")]
    Annotation {
        path: String,
        message: String,
        location: ErrorLocation,
    },

    #[error("Conversion Error: {message} {location}")]
    Conversion {
        message: String,
        location: ErrorLocation,
    },
}

impl CodecError {
    #[track_caller]
    pub fn malformed(message: impl Into<String>) -> Self {
        CodecError::MalformedEnvelope {
            message: message.into(),
            location: ErrorLocation::caller(),
        }
    }

    #[track_caller]
    pub fn annotation(path: impl Into<String>, message: impl Into<String>) -> Self {
        CodecError::Annotation {
            path: path.into(),
            message: message.into(),
            location: ErrorLocation::caller(),
        }
    }

    #[track_caller]
    pub fn conversion(message: impl Into<String>) -> Self {
        CodecError::Conversion {
            message: message.into(),
            location: ErrorLocation::caller(),
        }
    }
}

impl From<serde_json::Error> for CodecError {
    #[track_caller]
    fn from(error: serde_json::Error) -> Self {
        CodecError::MalformedEnvelope {
            message: error.to_string(),
            location: ErrorLocation::caller(),
        }
    }
}
