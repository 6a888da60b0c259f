//! Test helpers for WebSocket boundary tests.
//!
//! This module provides utilities for talking to the bridge server with a
//! raw WebSocket:
//! - Connecting to server
//! - Sending/receiving protobuf messages
//! - Connection state checks

use bridge_core::error::IpcError;
use bridge_core::host::BridgeHost;
use bridge_core::ipc::BridgeServerHandle;

use futures_util::{SinkExt, StreamExt};
use prost::Message as ProstMessage;
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

use crate::bridge_tests::helpers::WAIT_LIMIT;

pub type TestSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Test helper: Serve `host` on an ephemeral port.
pub async fn start_test_server(host: &BridgeHost) -> Result<BridgeServerHandle, IpcError> {
    host.serve(0).await
}

/// Test helper: Connect to the bridge server and return WebSocket stream.
pub async fn connect_to_server(port: u16) -> TestSocket {
    let url = format!("ws://127.0.0.1:{port}");
    let (ws_stream, _) = connect_async(&url)
        .await
        .expect("Failed to connect to WebSocket server");
    ws_stream
}

/// Test helper: Send protobuf message over WebSocket.
pub async fn send_protobuf<T: ProstMessage>(ws: &mut TestSocket, message: &T) {
    ws.send(Message::Binary(message.encode_to_vec().into()))
        .await
        .expect("Failed to send message");
}

/// Test helper: Receive and decode the next binary protobuf message.
pub async fn receive_protobuf<T: ProstMessage + Default>(ws: &mut TestSocket) -> T {
    loop {
        let msg = tokio::time::timeout(WAIT_LIMIT, ws.next())
            .await
            .expect("Timed out waiting for a message")
            .expect("No message received")
            .expect("Error receiving message");

        if let Message::Binary(bytes) = msg {
            return T::decode(&bytes[..]).expect("Failed to decode protobuf");
        }
    }
}

/// Test helper: Check if WebSocket connection is closed.
pub async fn is_connection_closed(ws: &mut TestSocket) -> bool {
    match tokio::time::timeout(WAIT_LIMIT, ws.next()).await {
        Ok(None) | Ok(Some(Err(_))) => true,
        Ok(Some(Ok(Message::Close(_)))) => true,
        Ok(Some(Ok(_))) => false,
        Err(_) => false,
    }
}
