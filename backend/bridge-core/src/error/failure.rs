//! The failure descriptor that crosses the view boundary.
//!
//! Host-side errors carry an [`ErrorLocation`](common::ErrorLocation) for the
//! log. [`ProcedureFailure`] is what the view gets instead: a code, a
//! sanitised one-line message and, for validation failures, diagnostics.

use common::ErrorLocation;

use std::fmt::{Display, Formatter, Result as FormatResult};

use serde::Serialize;
use thiserror::Error as ThisError;

use crate::procedure::ProcedureKind;

/// Longest message (in chars) allowed across the boundary.
pub const MAX_FAILURE_MESSAGE_CHARS: usize = 512;

const FALLBACK_FAILURE_MESSAGE: &str = "procedure failed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FailureCode {
    /// Unknown path, namespace path, or kind mismatch.
    ProcedureNotFound,
    /// Input rejected by the procedure's validator.
    InvalidInput,
    /// The handler itself failed (or panicked).
    HandlerError,
    /// A live stream failed after zero or more values.
    SubscriptionProducerError,
    /// A subscription key was reused while still live.
    DuplicateSubscriptionKey,
    /// The request could not be decoded at all.
    InvalidMessage,
}

impl FailureCode {
    pub const fn as_str(self) -> &'static str {
        match self {
            FailureCode::ProcedureNotFound => "PROCEDURE_NOT_FOUND",
            FailureCode::InvalidInput => "INVALID_INPUT",
            FailureCode::HandlerError => "HANDLER_ERROR",
            FailureCode::SubscriptionProducerError => "SUBSCRIPTION_PRODUCER_ERROR",
            FailureCode::DuplicateSubscriptionKey => "DUPLICATE_SUBSCRIPTION_KEY",
            FailureCode::InvalidMessage => "INVALID_MESSAGE",
        }
    }
}

impl Display for FailureCode {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        formatter.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ThisError)]
#[error("{code}: {message}")]
pub struct ProcedureFailure {
    pub code: FailureCode,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<String>,
}

impl ProcedureFailure {
    pub fn new(code: FailureCode, message: impl AsRef<str>) -> Self {
        Self {
            code,
            message: sanitize_message(message.as_ref()),
            diagnostics: Vec::new(),
        }
    }

    pub fn unknown_path(path: &str) -> Self {
        Self::new(
            FailureCode::ProcedureNotFound,
            format!("No procedure registered at '{path}'"),
        )
    }

    pub fn namespace_path(path: &str) -> Self {
        Self::new(
            FailureCode::ProcedureNotFound,
            format!("'{path}' is a namespace, not a procedure"),
        )
    }

    pub fn kind_mismatch(path: &str, actual: ProcedureKind, requested: ProcedureKind) -> Self {
        Self::new(
            FailureCode::ProcedureNotFound,
            format!("'{path}' is a {actual} and cannot be called as a {requested}"),
        )
    }

    pub fn invalid_input(path: &str, diagnostics: Vec<String>) -> Self {
        let mut failure = Self::new(
            FailureCode::InvalidInput,
            format!("Invalid input for '{path}'"),
        );
        failure.diagnostics = diagnostics
            .iter()
            .map(|diagnostic| sanitize_message(diagnostic))
            .collect();
        failure
    }

    pub fn handler(message: &str) -> Self {
        Self::new(FailureCode::HandlerError, message)
    }

    pub fn producer(message: &str) -> Self {
        Self::new(FailureCode::SubscriptionProducerError, message)
    }

    pub fn duplicate_key(key: &str) -> Self {
        Self::new(
            FailureCode::DuplicateSubscriptionKey,
            format!("Subscription key '{key}' is already live"),
        )
    }

    pub fn invalid_message(message: &str) -> Self {
        Self::new(FailureCode::InvalidMessage, message)
    }
}

/// Reduce an arbitrary error text to something safe to hand to a view.
///
/// Keeps the first non-empty line, drops a trailing `[file:line:column]`
/// location and caps the length.
pub fn sanitize_message(raw: &str) -> String {
    let first_line = raw
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or_default();

    let without_location = strip_trailing_location(first_line).trim_end();

    if without_location.is_empty() {
        return String::from(FALLBACK_FAILURE_MESSAGE);
    }

    without_location
        .chars()
        .take(MAX_FAILURE_MESSAGE_CHARS)
        .collect()
}

fn strip_trailing_location(line: &str) -> &str {
    let Some(open) = line.rfind('[') else {
        return line;
    };
    let Some(inner) = line[open + 1..].strip_suffix(']') else {
        return line;
    };

    let mut parts = inner.rsplitn(3, ':');
    let column = parts.next().unwrap_or_default();
    let row = parts.next().unwrap_or_default();
    let file = parts.next().unwrap_or_default();

    let is_number = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !file.is_empty() && is_number(row) && is_number(column) {
        &line[..open]
    } else {
        line
    }
}

/// Error returned by procedure handlers.
///
/// Only [`HandlerError::message`] ever reaches a view; the location stays in
/// the host log.
#[derive(Debug, ThisError)]
#[error("{message} {location}")]
pub struct HandlerError {
    message: String,
    location: ErrorLocation,
}

impl HandlerError {
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            location: ErrorLocation::caller(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn location(&self) -> ErrorLocation {
        self.location
    }
}

impl From<serde_json::Error> for HandlerError {
    #[track_caller]
    fn from(error: serde_json::Error) -> Self {
        HandlerError::new(error.to_string())
    }
}

impl From<models::ModelError> for HandlerError {
    #[track_caller]
    fn from(error: models::ModelError) -> Self {
        match error {
            models::ModelError::Validation { message, .. } => HandlerError::new(message),
        }
    }
}

impl From<crate::error::codec::CodecError> for HandlerError {
    #[track_caller]
    fn from(error: crate::error::codec::CodecError) -> Self {
        HandlerError::new(error.to_string())
    }
}
