use crate::codec::RichValue;
use crate::error::HandlerError;
use crate::procedure::ProcedureKind;

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::stream::BoxStream;
use futures_util::FutureExt;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Deserializer};

pub type CallFuture = BoxFuture<'static, Result<RichValue, HandlerError>>;

/// Pull-based value source backing a subscription. Dropping it is the
/// producer's teardown.
pub type Producer = BoxStream<'static, Result<RichValue, HandlerError>>;

pub type ProducerFuture = BoxFuture<'static, Result<Producer, HandlerError>>;

type CallFn = dyn Fn(RichValue) -> CallFuture + Send + Sync;
type StreamFn = dyn Fn(RichValue) -> ProducerFuture + Send + Sync;
type CheckFn = dyn Fn(&RichValue) -> Result<(), Vec<String>> + Send + Sync;

/// Type-erased procedure body.
#[derive(Clone)]
pub enum Handler {
    /// Single-shot body for queries and mutations.
    Call(Arc<CallFn>),
    /// Producer factory for subscriptions.
    Stream(Arc<StreamFn>),
}

impl Handler {
    pub fn call<F, Fut>(handler: F) -> Self
    where
        F: Fn(RichValue) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<RichValue, HandlerError>> + Send + 'static,
    {
        Handler::Call(Arc::new(move |input| handler(input).boxed()))
    }

    pub fn stream<F, Fut>(handler: F) -> Self
    where
        F: Fn(RichValue) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Producer, HandlerError>> + Send + 'static,
    {
        Handler::Stream(Arc::new(move |input| handler(input).boxed()))
    }

    pub(crate) fn fits(&self, kind: ProcedureKind) -> bool {
        match self {
            Handler::Call(_) => !kind.is_streaming(),
            Handler::Stream(_) => kind.is_streaming(),
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handler::Call(_) => f.write_str("Handler::Call"),
            Handler::Stream(_) => f.write_str("Handler::Stream"),
        }
    }
}

/// Input check run before a handler is entered.
///
/// A failing check yields human-readable diagnostics that end up in an
/// `InvalidInput` failure.
#[derive(Clone)]
pub struct Validator {
    check: Arc<CheckFn>,
}

impl Validator {
    /// Accepts anything, including no input at all.
    pub fn any() -> Self {
        Self::custom(|_| Ok(()))
    }

    /// Accepts input that deserializes into `I`.
    pub fn shape<I: DeserializeOwned>() -> Self {
        Self::custom(|input| {
            input
                .decode_into::<I>()
                .map(|_| ())
                .map_err(|e| vec![e.to_string()])
        })
    }

    pub fn custom<F>(check: F) -> Self
    where
        F: Fn(&RichValue) -> Result<(), Vec<String>> + Send + Sync + 'static,
    {
        Self {
            check: Arc::new(check),
        }
    }

    pub fn validate(&self, input: &RichValue) -> Result<(), Vec<String>> {
        (self.check)(input)
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Validator")
    }
}

/// Input type for procedures that take nothing. Deserializes from any value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoInput;

impl<'de> Deserialize<'de> for NoInput {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        IgnoredAny::deserialize(deserializer)?;
        Ok(NoInput)
    }
}

/// A registered operation. Immutable once in the registry.
#[derive(Debug, Clone)]
pub struct ProcedureDefinition {
    path: String,
    kind: ProcedureKind,
    validator: Validator,
    handler: Handler,
}

impl ProcedureDefinition {
    pub(crate) fn new(
        path: String,
        kind: ProcedureKind,
        validator: Validator,
        handler: Handler,
    ) -> Self {
        Self {
            path,
            kind,
            validator,
            handler,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn kind(&self) -> ProcedureKind {
        self.kind
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    pub fn handler(&self) -> &Handler {
        &self.handler
    }
}
