use common::ErrorLocation;

use thiserror::Error as ThisError;

use crate::procedure::ProcedureKind;

/// Startup-time registration failures. These are programmer errors in the
/// router definition and abort host startup.
#[derive(Debug, ThisError)]
pub enum RegistryError {
    #[error("Invalid Procedure Path: '{path}': {reason} {location}")]
    InvalidPath {
        path: String,
        reason: String,
        location: ErrorLocation,
    },

    #[error("Duplicate Procedure: '{path}' is already registered {location}")]
    Duplicate {
        path: String,
        location: ErrorLocation,
    },

    #[error("Path Conflict: '{path}' collides with existing {existing} '{existing_path}' {location}")]
    PathConflict {
        path: String,
        existing: &'static str,
        existing_path: String,
        location: ErrorLocation,
    },

    #[error("Handler Kind Mismatch: '{path}' is declared as a {kind} but was given an incompatible handler {location}")]
    HandlerKindMismatch {
        path: String,
        kind: ProcedureKind,
        location: ErrorLocation,
    },
}
