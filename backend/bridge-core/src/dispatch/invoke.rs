use crate::codec::RichValue;
use crate::error::{FailureCode, ProcedureFailure};
use crate::procedure::{Handler, ProcedureKind, ProcedureRegistry};

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use log::{debug, error, warn};

/// One call to a query or mutation.
#[derive(Debug, Clone)]
pub struct InvocationRequest {
    pub path: String,
    pub kind: ProcedureKind,
    pub input: RichValue,
}

impl InvocationRequest {
    pub fn query(path: impl Into<String>, input: impl Into<RichValue>) -> Self {
        Self {
            path: path.into(),
            kind: ProcedureKind::Query,
            input: input.into(),
        }
    }

    pub fn mutation(path: impl Into<String>, input: impl Into<RichValue>) -> Self {
        Self {
            path: path.into(),
            kind: ProcedureKind::Mutation,
            input: input.into(),
        }
    }
}

/// Runs queries and mutations against a shared registry.
///
/// Each request executes at most once. Nothing here retries.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<ProcedureRegistry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<ProcedureRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<ProcedureRegistry> {
        &self.registry
    }

    /// Resolve, validate, then run the handler.
    ///
    /// # Errors
    ///
    /// - `ProcedureNotFound` for unknown or namespace paths, kind mismatches,
    ///   and any attempt to invoke a subscription directly
    /// - `InvalidInput` with the validator's diagnostics
    /// - `HandlerError` with a sanitised message if the handler fails or panics
    pub async fn invoke(&self, request: InvocationRequest) -> Result<RichValue, ProcedureFailure> {
        let InvocationRequest { path, kind, input } = request;

        let definition = self.registry.resolve_as(&path, kind)?;

        let call = match definition.handler() {
            Handler::Call(call) => Arc::clone(call),
            Handler::Stream(_) => {
                return Err(ProcedureFailure::new(
                    FailureCode::ProcedureNotFound,
                    format!("'{path}' is a subscription and cannot be invoked directly"),
                ));
            }
        };

        definition
            .validator()
            .validate(&input)
            .map_err(|diagnostics| {
                debug!("Rejected input for '{path}': {diagnostics:?}");
                ProcedureFailure::invalid_input(&path, diagnostics)
            })?;

        // The call is made inside the future so that a panic while building
        // it is caught the same way as one while polling it.
        let outcome = AssertUnwindSafe(async move { (*call)(input).await })
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                warn!("Procedure '{path}' failed: {e}");
                Err(ProcedureFailure::handler(e.message()))
            }
            Err(_) => {
                error!("Procedure '{path}' panicked");
                Err(ProcedureFailure::handler("procedure panicked"))
            }
        }
    }
}
