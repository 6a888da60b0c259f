//! Handle to a running boundary server.

use std::net::SocketAddr;

use log::info;
use tokio_util::sync::CancellationToken;

/// Returned by [`start_bridge_server`](crate::ipc::start_bridge_server).
///
/// Dropping the handle does **not** stop the server; call
/// [`BridgeServerHandle::shutdown`]. Shutdown stops accepting and closes
/// every open connection, which in turn cancels each view's subscriptions.
#[derive(Debug, Clone)]
pub struct BridgeServerHandle {
    local_addr: SocketAddr,
    shutdown: CancellationToken,
}

impl BridgeServerHandle {
    pub(crate) fn new(local_addr: SocketAddr, shutdown: CancellationToken) -> Self {
        Self {
            local_addr,
            shutdown,
        }
    }

    /// The bound address. Useful when the server was started on port 0.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    pub fn shutdown(&self) {
        if !self.shutdown.is_cancelled() {
            info!("Shutting down bridge server on {}", self.local_addr);
            self.shutdown.cancel();
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}
