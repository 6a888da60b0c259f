pub mod codec;
pub mod facade;
pub mod failure;
pub mod ipc;
pub mod preferences;
pub mod registry;

pub use codec::CodecError;
pub use facade::FacadeError;
pub use failure::{FailureCode, HandlerError, ProcedureFailure, sanitize_message};
pub use ipc::IpcError;
pub use preferences::PreferencesError;
pub use registry::RegistryError;

