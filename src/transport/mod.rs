//! Transport layer for HiveServer2 connections
//!
//! Handles the byte stream underneath the Thrift protocol. A transport starts
//! out unframed; after a SASL handshake it switches to length-prefixed frames.
//! The raw chunk methods let the handshake drive the stream directly before
//! any RPC traffic.

mod tcp;

pub use tcp::{AsyncStream, TcpTransport};

use bytes::Bytes;

use crate::error::Result;

/// Length of the frame prefix used after SASL negotiation
pub const FRAME_HEADER_SIZE: usize = 4;

/// How Thrift messages are delimited on the stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Framing {
    /// Messages back to back with no delimiter
    #[default]
    Buffered,
    /// Each message prefixed with its 4-byte big-endian length
    Sasl,
}

/// Trait for transport implementations
#[async_trait::async_trait]
pub trait Transport: Send {
    /// Write raw bytes, bypassing framing
    async fn write_raw(&mut self, data: &[u8]) -> Result<()>;

    /// Read whatever bytes are available, at least one
    ///
    /// Bytes handed back with [`unread`](Transport::unread) are returned
    /// first. End of stream is [`Error::ConnectionClosed`](crate::Error::ConnectionClosed).
    async fn read_chunk(&mut self) -> Result<Bytes>;

    /// Push bytes back so the next read sees them first
    fn unread(&mut self, data: Bytes);

    /// Send one Thrift message using the current framing
    async fn send_message(&mut self, message: Bytes) -> Result<()>;

    /// Receive from the stream using the current framing
    ///
    /// With [`Framing::Sasl`] this is exactly one message. Unframed streams
    /// have no message boundary, so [`Framing::Buffered`] yields the next chunk
    /// and the caller reassembles.
    async fn receive_message(&mut self) -> Result<Bytes>;

    /// Current framing
    fn framing(&self) -> Framing;

    /// Switch framing (after a successful handshake)
    fn set_framing(&mut self, framing: Framing);

    /// Check if the transport is connected
    fn is_connected(&self) -> bool;

    /// Close the connection
    async fn close(&mut self) -> Result<()>;
}
