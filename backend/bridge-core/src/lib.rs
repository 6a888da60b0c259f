pub mod broadcast;
pub mod codec;
pub mod dispatch;
pub mod error;
pub mod facade;
pub mod host;
pub mod ipc;
pub mod preferences;
pub mod procedure;
pub mod proto;
pub mod router;
pub mod subscription;

#[cfg(test)]
mod tests;

pub const BRIDGE_HOST: &str = "127.0.0.1";
pub const BRIDGE_WS_BASE_URL: &str = const_format::concatcp!("ws://", BRIDGE_HOST);
pub const DEFAULT_BRIDGE_PORT: u16 = 19876;
