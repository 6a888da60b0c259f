use common::ErrorLocation;

use thiserror::Error as ThisError;

use crate::error::codec::CodecError;
use crate::error::failure::ProcedureFailure;

/// Errors surfaced to code calling the view-side facade.
#[derive(Debug, ThisError)]
pub enum FacadeError {
    /// The host answered with a structured failure.
    #[error(transparent)]
    Procedure(#[from] ProcedureFailure),

    #[error("Connect Error: {message} {location}")]
    Connect {
        message: String,
        location: ErrorLocation,
    },

    #[error("Boundary Closed: {message} {location}")]
    Closed {
        message: String,
        location: ErrorLocation,
    },

    #[error("Protocol Error: {message} {location}")]
    Protocol {
        message: String,
        location: ErrorLocation,
    },

    #[error("Codec Error: {source} {location}")]
    Codec {
        #[source]
        source: CodecError,
        location: ErrorLocation,
    },
}

impl FacadeError {
    #[track_caller]
    pub fn closed(message: impl Into<String>) -> Self {
        FacadeError::Closed {
            message: message.into(),
            location: ErrorLocation::caller(),
        }
    }

    #[track_caller]
    pub fn protocol(message: impl Into<String>) -> Self {
        FacadeError::Protocol {
            message: message.into(),
            location: ErrorLocation::caller(),
        }
    }

    /// The structured host failure, if this is one.
    pub fn as_failure(&self) -> Option<&ProcedureFailure> {
        match self {
            FacadeError::Procedure(failure) => Some(failure),
            _ => None,
        }
    }
}

impl From<CodecError> for FacadeError {
    #[track_caller]
    fn from(source: CodecError) -> Self {
        FacadeError::Codec {
            source,
            location: ErrorLocation::caller(),
        }
    }
}
