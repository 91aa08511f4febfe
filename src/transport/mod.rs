//! Duplex message transport
//!
//! The generator only needs a message-oriented byte pipe. Production uses
//! the WebSocket implementation; tests script one in memory.

mod websocket;

pub use websocket::WebSocketTransport;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Connect failed: {0}")]
    Connect(String),

    #[error("Send failed: {0}")]
    Send(String),

    #[error("Receive failed: {0}")]
    Receive(String),
}

/// Result of a single receive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Received {
    Message(Vec<u8>),
    /// Peer closed the connection normally
    Closed,
}

#[async_trait::async_trait]
pub trait Transport: Send {
    async fn send(&mut self, message: Vec<u8>) -> Result<(), TransportError>;

    /// Wait for the next message
    async fn receive(&mut self) -> Result<Received, TransportError>;

    /// Release the connection. Must be safe to call after the peer closed.
    async fn close(&mut self);
}
