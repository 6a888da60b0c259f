//! Procedure definitions and the registry that resolves dot paths to them.

mod definition;
mod kind;
mod registry;

pub use definition::{
    CallFuture, Handler, NoInput, ProcedureDefinition, Producer, ProducerFuture, Validator,
};
pub use kind::ProcedureKind;
pub use registry::ProcedureRegistry;
