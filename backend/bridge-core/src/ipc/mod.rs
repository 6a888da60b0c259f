//! The boundary between the host and its views.
//!
//! Every view talks to the host through exactly one session. The transport is
//! either a localhost WebSocket ([`start_bridge_server`]) or an in-process
//! [`BoundaryLink`]; both carry the same binary protobuf frames.
//!
//! # Security
//!
//! - Localhost-only binding (`127.0.0.1`)
//! - Non-loopback connections rejected
//! - Only binary frames are processed

mod handle;
mod link;
mod server;
mod session;

pub use handle::BridgeServerHandle;
pub use link::BoundaryLink;
pub use server::start_bridge_server;

pub(crate) use session::{ForwardingTable, run_view_session};
