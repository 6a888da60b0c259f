//! WebSocket transport for view sessions.
//!
//! The server:
//!
//! - Listens on localhost only
//! - Rejects non-loopback peers
//! - Uses binary protobuf frames and ignores text frames
//! - Runs one [`run_view_session`] per connection
//!
//! A connection is pumped between the socket and an in-process
//! [`BoundaryLink`], so the session code is the same for both transports.

use crate::BRIDGE_HOST;
use crate::error::IpcError;
use crate::host::BridgeHost;
use crate::ipc::{BoundaryLink, BridgeServerHandle};

use common::ErrorLocation;

use std::net::SocketAddr;

use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

/// Starts the boundary WebSocket server.
///
/// Binds `127.0.0.1:<port>` and spawns a background task that accepts
/// connections until [`BridgeServerHandle::shutdown`] is called. Port `0`
/// binds an ephemeral port; read it back from the handle.
///
/// # Errors
///
/// Returns [`IpcError::Io`] if:
/// - Port is already in use
/// - Insufficient permissions to bind port
/// - Network interface unavailable
pub async fn start_bridge_server(port: u16, host: BridgeHost) -> Result<BridgeServerHandle, IpcError> {
    let listener = TcpListener::bind((BRIDGE_HOST, port)).await?;
    let local_addr = listener.local_addr()?;
    let shutdown = CancellationToken::new();

    info!("Bridge server listening on {local_addr}");

    let accept_shutdown = shutdown.clone();
    tokio::spawn(async move {
        loop {
            let accepted = tokio::select! {
                _ = accept_shutdown.cancelled() => break,
                accepted = listener.accept() => accepted,
            };

            match accepted {
                Ok((stream, addr)) => {
                    debug!("Client connecting from {addr}");
                    let host = host.clone();
                    let shutdown = accept_shutdown.child_token();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, addr, host, shutdown).await {
                            error!("Connection from {addr} failed: {e}");
                        }
                    });
                }
                Err(e) => {
                    error!("Accept failed: {e}");
                    break;
                }
            }
        }
        info!("Bridge server on {local_addr} stopped accepting");
    });

    Ok(BridgeServerHandle::new(local_addr, shutdown))
}

/// Pumps one WebSocket connection into a view session.
///
/// # Errors
///
/// - [`IpcError::Handshake`] - WebSocket upgrade failed
/// - [`IpcError::Read`] - Failed to read from the client
/// - [`IpcError::Send`] - Failed to write to the client
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    host: BridgeHost,
    shutdown: CancellationToken,
) -> Result<(), IpcError> {
    // SECURITY: Reject non-loopback connections
    if !addr.ip().is_loopback() {
        warn!("Rejected non-loopback connection from {addr}");
        return Ok(());
    }

    let ws_stream = accept_async(stream).await.map_err(|e| IpcError::Handshake {
        message: format!("WebSocket handshake failed: {e}"),
        location: ErrorLocation::caller(),
    })?;

    info!("Client {addr} connected");

    let (mut write, mut read) = ws_stream.split();
    let mut view_end = host.attach_local();

    let outcome = loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                let _ = write.send(Message::Close(None)).await;
                break Ok(());
            }
            msg = read.next() => match msg {
                Some(Ok(Message::Binary(data))) => {
                    if !view_end.send(data.to_vec()) {
                        break Ok(());
                    }
                }
                Some(Ok(Message::Close(_))) | None => break Ok(()),
                Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => {}
                Some(Ok(Message::Text(_))) => {
                    warn!("Client {addr} sent a text frame; ignoring");
                }
                Some(Err(e)) => {
                    break Err(IpcError::read(format!("Error reading message: {e}")));
                }
            },
            frame = view_end.recv() => match frame {
                Some(frame) => {
                    if let Err(e) = write.send(Message::Binary(frame.into())).await {
                        break Err(IpcError::send(format!("Failed to send message: {e}")));
                    }
                }
                None => break Ok(()),
            },
        }
    };

    // Dropping our end ends the session, which cancels the view's subscriptions.
    drop(view_end);
    info!("Client {addr} disconnected");
    outcome
}
