//! Namespace tree of procedures addressed by dot paths.
//!
//! Paths are split on `.` and resolved by explicit descent through
//! [`Node::Namespace`] maps. Resolution fails closed: unknown paths, paths
//! that stop at a namespace, paths that continue past a procedure and kind
//! mismatches are all errors. [`ProcedureRegistry::resolve_as`] is the only
//! resolver the dispatchers and the subscription manager use.

use crate::codec::RichValue;
use crate::error::{HandlerError, ProcedureFailure, RegistryError};
use crate::procedure::{Handler, ProcedureDefinition, ProcedureKind, Producer, Validator};

use common::ErrorLocation;

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use futures_util::{Stream, StreamExt};
use log::{debug, info};
use serde::de::DeserializeOwned;

enum Node {
    Namespace(BTreeMap<String, Node>),
    Procedure(Arc<ProcedureDefinition>),
}

/// Registry of every procedure the host exposes.
///
/// Built once at startup, then shared read-only (usually behind an `Arc`).
#[derive(Default)]
pub struct ProcedureRegistry {
    root: BTreeMap<String, Node>,
    len: usize,
}

impl ProcedureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Register a procedure under `path`.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::InvalidPath`] for empty paths or empty segments
    /// - [`RegistryError::HandlerKindMismatch`] if a stream handler is given
    ///   for a query/mutation or vice versa
    /// - [`RegistryError::Duplicate`] if `path` is already a procedure
    /// - [`RegistryError::PathConflict`] if `path` or one of its prefixes is
    ///   already used by the other node type
    #[track_caller]
    pub fn register(
        &mut self,
        path: &str,
        kind: ProcedureKind,
        validator: Validator,
        handler: Handler,
    ) -> Result<&mut Self, RegistryError> {
        let segments = parse_registration_path(path)?;

        if !handler.fits(kind) {
            return Err(RegistryError::HandlerKindMismatch {
                path: path.to_string(),
                kind,
                location: ErrorLocation::caller(),
            });
        }

        let (leaf, parents) = segments
            .split_last()
            .ok_or_else(|| invalid_path(path, "path is empty"))?;

        let mut level = &mut self.root;
        for (depth, segment) in parents.iter().enumerate() {
            let node = level
                .entry((*segment).to_string())
                .or_insert_with(|| Node::Namespace(BTreeMap::new()));
            level = match node {
                Node::Namespace(children) => children,
                Node::Procedure(_) => {
                    return Err(RegistryError::PathConflict {
                        path: path.to_string(),
                        existing: "procedure",
                        existing_path: segments[..=depth].join("."),
                        location: ErrorLocation::caller(),
                    });
                }
            };
        }

        match level.get(*leaf) {
            Some(Node::Procedure(_)) => {
                return Err(RegistryError::Duplicate {
                    path: path.to_string(),
                    location: ErrorLocation::caller(),
                });
            }
            Some(Node::Namespace(_)) => {
                return Err(RegistryError::PathConflict {
                    path: path.to_string(),
                    existing: "namespace",
                    existing_path: path.to_string(),
                    location: ErrorLocation::caller(),
                });
            }
            None => {}
        }

        let definition = ProcedureDefinition::new(path.to_string(), kind, validator, handler);
        level.insert((*leaf).to_string(), Node::Procedure(Arc::new(definition)));
        self.len += 1;

        info!("Registered {kind} '{path}'");
        Ok(self)
    }

    /// Register a query whose input deserializes into `I`.
    #[track_caller]
    pub fn query<I, O, F, Fut>(&mut self, path: &str, handler: F) -> Result<&mut Self, RegistryError>
    where
        I: DeserializeOwned + Send + 'static,
        O: Into<RichValue> + Send + 'static,
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<O, HandlerError>> + Send + 'static,
    {
        self.register(
            path,
            ProcedureKind::Query,
            Validator::shape::<I>(),
            typed_call(handler),
        )
    }

    /// Register a mutation whose input deserializes into `I`.
    #[track_caller]
    pub fn mutation<I, O, F, Fut>(
        &mut self,
        path: &str,
        handler: F,
    ) -> Result<&mut Self, RegistryError>
    where
        I: DeserializeOwned + Send + 'static,
        O: Into<RichValue> + Send + 'static,
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<O, HandlerError>> + Send + 'static,
    {
        self.register(
            path,
            ProcedureKind::Mutation,
            Validator::shape::<I>(),
            typed_call(handler),
        )
    }

    /// Register a subscription whose handler returns a stream of `O`.
    #[track_caller]
    pub fn subscription<I, O, F, Fut, S>(
        &mut self,
        path: &str,
        handler: F,
    ) -> Result<&mut Self, RegistryError>
    where
        I: DeserializeOwned + Send + 'static,
        O: Into<RichValue> + Send + 'static,
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<S, HandlerError>> + Send + 'static,
        S: Stream<Item = Result<O, HandlerError>> + Send + 'static,
    {
        let handler = Arc::new(handler);
        let erased = Handler::stream(move |input: RichValue| {
            let handler = Arc::clone(&handler);
            async move {
                let typed: I = input.decode_into()?;
                let stream = (*handler)(typed).await?;
                let producer: Producer = stream.map(|item| item.map(Into::into)).boxed();
                Ok::<Producer, HandlerError>(producer)
            }
        });

        self.register(
            path,
            ProcedureKind::Subscription,
            Validator::shape::<I>(),
            erased,
        )
    }

    /// Resolve `path` to its definition.
    ///
    /// Total and deterministic: either the unique definition or a
    /// `ProcedureNotFound` failure.
    pub fn resolve(&self, path: &str) -> Result<Arc<ProcedureDefinition>, ProcedureFailure> {
        let segments = path.split('.').collect::<Vec<_>>();
        if path.is_empty() || segments.iter().any(|segment| segment.is_empty()) {
            return Err(ProcedureFailure::unknown_path(path));
        }

        let mut level = &self.root;
        let last = segments.len() - 1;
        for (depth, segment) in segments.iter().enumerate() {
            match level.get(*segment) {
                None => return Err(ProcedureFailure::unknown_path(path)),
                Some(Node::Procedure(definition)) if depth == last => {
                    return Ok(Arc::clone(definition));
                }
                // A procedure is a leaf; nothing lives beneath it.
                Some(Node::Procedure(_)) => return Err(ProcedureFailure::unknown_path(path)),
                Some(Node::Namespace(_)) if depth == last => {
                    return Err(ProcedureFailure::namespace_path(path));
                }
                Some(Node::Namespace(children)) => level = children,
            }
        }

        Err(ProcedureFailure::unknown_path(path))
    }

    /// Resolve `path` and require it to be of kind `requested`.
    pub fn resolve_as(
        &self,
        path: &str,
        requested: ProcedureKind,
    ) -> Result<Arc<ProcedureDefinition>, ProcedureFailure> {
        let definition = self.resolve(path)?;
        if definition.kind() != requested {
            debug!(
                "Rejected {requested} call to '{path}' (registered as {})",
                definition.kind()
            );
            return Err(ProcedureFailure::kind_mismatch(
                path,
                definition.kind(),
                requested,
            ));
        }
        Ok(definition)
    }

    /// Every registered path, sorted.
    pub fn paths(&self) -> Vec<String> {
        let mut paths = Vec::with_capacity(self.len);
        collect_paths(&self.root, &mut Vec::new(), &mut paths);
        paths
    }
}

fn typed_call<I, O, F, Fut>(handler: F) -> Handler
where
    I: DeserializeOwned + Send + 'static,
    O: Into<RichValue> + Send + 'static,
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O, HandlerError>> + Send + 'static,
{
    let handler = Arc::new(handler);
    Handler::call(move |input: RichValue| {
        let handler = Arc::clone(&handler);
        async move {
            let typed: I = input.decode_into()?;
            let output = (*handler)(typed).await?;
            Ok::<RichValue, HandlerError>(output.into())
        }
    })
}

fn collect_paths(level: &BTreeMap<String, Node>, prefix: &mut Vec<String>, out: &mut Vec<String>) {
    for (segment, node) in level {
        prefix.push(segment.clone());
        match node {
            Node::Procedure(_) => out.push(prefix.join(".")),
            Node::Namespace(children) => collect_paths(children, prefix, out),
        }
        prefix.pop();
    }
}

#[track_caller]
fn parse_registration_path(path: &str) -> Result<Vec<&str>, RegistryError> {
    if path.is_empty() {
        return Err(invalid_path(path, "path is empty"));
    }

    let segments = path.split('.').collect::<Vec<_>>();
    for segment in &segments {
        if segment.is_empty() {
            return Err(invalid_path(path, "path contains an empty segment"));
        }
        if !segment
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-')
        {
            return Err(invalid_path(
                path,
                format!("segment '{segment}' may only contain ASCII letters, digits, '_' or '-'"),
            ));
        }
    }
    Ok(segments)
}

#[track_caller]
fn invalid_path(path: &str, reason: impl Into<String>) -> RegistryError {
    RegistryError::InvalidPath {
        path: path.to_string(),
        reason: reason.into(),
        location: ErrorLocation::caller(),
    }
}
