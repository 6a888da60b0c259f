use crate::codec::RichValue;
use crate::dispatch::{Dispatcher, InvocationRequest};
use crate::error::{FailureCode, ProcedureFailure};
use crate::procedure::ProcedureKind;

use std::collections::{BTreeMap, HashMap};

use futures_util::future::join_all;
use log::warn;

pub const DUPLICATE_BATCH_ID_MESSAGE: &str = "duplicate batch id";

/// The outcome given to an id that appears more than once in a batch.
pub fn duplicate_batch_id() -> ProcedureFailure {
    ProcedureFailure::new(FailureCode::InvalidInput, DUPLICATE_BATCH_ID_MESSAGE)
}

/// One operation inside a batch. `id` only has to be unique within its batch.
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub id: String,
    pub path: String,
    pub kind: ProcedureKind,
    pub input: RichValue,
}

impl BatchItem {
    pub fn new(
        id: impl Into<String>,
        path: impl Into<String>,
        kind: ProcedureKind,
        input: impl Into<RichValue>,
    ) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
            kind,
            input: input.into(),
        }
    }
}

/// Exactly one outcome per distinct submitted id.
pub type BatchOutcome = BTreeMap<String, Result<RichValue, ProcedureFailure>>;

impl Dispatcher {
    /// Run every item through [`Dispatcher::invoke`] concurrently.
    ///
    /// Never fails as a whole. An id that appears more than once gets a
    /// single `InvalidInput` outcome and none of its operations run.
    pub async fn invoke_batch(&self, items: Vec<BatchItem>) -> BatchOutcome {
        let (mut outcome, runnable) = reject_duplicate_ids(items, |item| &item.id);

        let results = join_all(runnable.into_iter().map(|item| async move {
            let request = InvocationRequest {
                path: item.path,
                kind: item.kind,
                input: item.input,
            };
            (item.id, self.invoke(request).await)
        }))
        .await;

        outcome.extend(results);
        outcome
    }
}

/// Split off every id that occurs more than once.
///
/// Each such id gets a single `InvalidInput` outcome. The returned entries
/// keep their submission order and have unique ids.
pub(crate) fn reject_duplicate_ids<T>(
    entries: Vec<T>,
    id_of: impl Fn(&T) -> &String,
) -> (BatchOutcome, Vec<T>) {
    let mut occurrences = HashMap::<String, usize>::with_capacity(entries.len());
    for entry in &entries {
        *occurrences.entry(id_of(entry).clone()).or_default() += 1;
    }

    let mut rejected = BatchOutcome::new();
    let mut unique = Vec::with_capacity(entries.len());

    for entry in entries {
        let id = id_of(&entry);
        if occurrences.get(id).copied().unwrap_or_default() > 1 {
            if !rejected.contains_key(id) {
                warn!("Batch id '{id}' submitted more than once");
                rejected.insert(id.clone(), Err(duplicate_batch_id()));
            }
            continue;
        }
        unique.push(entry);
    }

    (rejected, unique)
}
