//! The host side of the bridge: one registry, one broadcast hub, any number
//! of attached views.

use crate::broadcast::BroadcastHub;
use crate::dispatch::Dispatcher;
use crate::error::IpcError;
use crate::ipc::{BoundaryLink, BridgeServerHandle, run_view_session, start_bridge_server};
use crate::procedure::ProcedureRegistry;

use std::sync::Arc;

/// Cheap to clone; every clone serves the same registry and hub.
#[derive(Clone)]
pub struct BridgeHost {
    dispatcher: Dispatcher,
    hub: BroadcastHub,
}

impl BridgeHost {
    pub fn new(registry: ProcedureRegistry, hub: BroadcastHub) -> Self {
        Self {
            dispatcher: Dispatcher::new(Arc::new(registry)),
            hub,
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn hub(&self) -> &BroadcastHub {
        &self.hub
    }

    /// Attach an in-process view and return its end of the boundary.
    ///
    /// The session runs until the returned link is dropped.
    pub fn attach_local(&self) -> BoundaryLink {
        let (view_end, host_end) = BoundaryLink::pair();
        tokio::spawn(run_view_session(
            self.dispatcher.clone(),
            self.hub.clone(),
            host_end,
        ));
        view_end
    }

    /// Serve views over a localhost WebSocket.
    ///
    /// # Errors
    ///
    /// Returns [`IpcError::Io`] if the port cannot be bound.
    pub async fn serve(&self, port: u16) -> Result<BridgeServerHandle, IpcError> {
        start_bridge_server(port, self.clone()).await
    }
}
