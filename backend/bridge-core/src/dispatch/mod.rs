//! Single and batched invocation of queries and mutations.
//!
//! Both entry points share [`ProcedureRegistry::resolve_as`] for path
//! resolution, so a bad path fails with the same descriptor whether it was
//! invoked alone or inside a batch.
//!
//! [`ProcedureRegistry::resolve_as`]: crate::procedure::ProcedureRegistry::resolve_as

mod batch;
mod invoke;

pub(crate) use batch::reject_duplicate_ids;
pub use batch::{BatchItem, BatchOutcome, DUPLICATE_BATCH_ID_MESSAGE, duplicate_batch_id};
pub use invoke::{Dispatcher, InvocationRequest};
