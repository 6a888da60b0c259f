//! Per-view subscription lifecycle.
//!
//! ```text
//! Pending -> Streaming -> Completed | Errored | Cancelled
//! ```
//!
//! A [`SubscriptionManager`] owns the table of live keys for exactly one view.
//! The table maps each key to its cancellation token and is only ever written
//! by the manager's actor task. Every exit path of a driver (complete, error,
//! cancel, lost view) removes its key again.

mod driver;
mod event;
mod manager;

pub use event::{EventSink, SubscriptionEvent, TaggedEvent};
pub use manager::{LiveSubscription, SubscriptionManager};
