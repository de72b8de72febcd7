//! Stream transport implementation
//!
//! Provides the [`Transport`] over a TCP socket, or over any other async byte
//! stream (an in-memory duplex pipe in tests).

use std::time::Duration;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::config::{Config, DEFAULT_CONNECT_TIMEOUT};
use crate::constants::MAX_LENGTH;
use crate::error::{Error, Result};

use super::{Framing, Transport, FRAME_HEADER_SIZE};

/// Initial read buffer capacity
const READ_BUFFER_SIZE: usize = 8192;

/// Byte stream a transport can run over
pub trait AsyncStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> AsyncStream for T {}

/// TCP transport for HiveServer2 connections
pub struct TcpTransport {
    /// The underlying stream
    stream: Option<Box<dyn AsyncStream>>,
    /// Bytes read from the stream but not yet consumed
    read_buf: BytesMut,
    /// Message delimiting mode
    framing: Framing,
    /// Connection timeout
    connect_timeout: Duration,
}

impl TcpTransport {
    /// Create a new TCP transport (not yet connected)
    pub fn new() -> Self {
        Self {
            stream: None,
            read_buf: BytesMut::with_capacity(READ_BUFFER_SIZE),
            framing: Framing::Buffered,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Wrap an already connected stream
    pub fn from_stream<S: AsyncStream + 'static>(stream: S) -> Self {
        let mut transport = Self::new();
        transport.stream = Some(Box::new(stream));
        transport
    }

    /// Set the connection timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Connect to the specified address
    pub async fn connect(&mut self, addr: &str) -> Result<()> {
        let stream = timeout(self.connect_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| Error::ConnectionTimeout(self.connect_timeout))?
            .map_err(Error::Io)?;

        stream.set_nodelay(true).map_err(Error::Io)?;

        tracing::debug!(addr = addr, "TCP connection established");
        self.stream = Some(Box::new(stream));
        self.read_buf.clear();
        self.framing = Framing::Buffered;
        Ok(())
    }

    /// Connect using a Config
    pub async fn connect_with_config(&mut self, config: &Config) -> Result<()> {
        self.connect_timeout = config.connect_timeout;
        self.connect(&config.socket_addr()).await
    }

    /// Get mutable access to the underlying stream
    fn stream_mut(&mut self) -> Result<&mut Box<dyn AsyncStream>> {
        self.stream.as_mut().ok_or(Error::ConnectionClosed)
    }

    /// Read more bytes from the stream into the read buffer
    async fn fill(&mut self) -> Result<usize> {
        let stream = self.stream.as_mut().ok_or(Error::ConnectionClosed)?;
        self.read_buf.reserve(READ_BUFFER_SIZE);
        let n = stream.read_buf(&mut self.read_buf).await.map_err(Error::Io)?;
        if n == 0 {
            return Err(Error::ConnectionClosed);
        }
        tracing::trace!(bytes = n, "Read from stream");
        Ok(n)
    }

    /// Read exactly n bytes
    async fn read_exact(&mut self, n: usize) -> Result<Bytes> {
        while self.read_buf.len() < n {
            self.fill().await?;
        }
        Ok(self.read_buf.split_to(n).freeze())
    }

    /// Read one length-prefixed frame
    async fn read_frame(&mut self) -> Result<Bytes> {
        let mut header = self.read_exact(FRAME_HEADER_SIZE).await?;
        let length = header.get_u32() as usize;
        if length > MAX_LENGTH {
            return Err(Error::InvalidLength(length as i64));
        }
        self.read_exact(length).await
    }
}

impl Default for TcpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Transport for TcpTransport {
    async fn write_raw(&mut self, data: &[u8]) -> Result<()> {
        let stream = self.stream_mut()?;
        stream.write_all(data).await.map_err(Error::Io)?;
        stream.flush().await.map_err(Error::Io)?;
        Ok(())
    }

    async fn read_chunk(&mut self) -> Result<Bytes> {
        if self.read_buf.is_empty() {
            self.fill().await?;
        }
        Ok(self.read_buf.split().freeze())
    }

    fn unread(&mut self, data: Bytes) {
        if data.is_empty() {
            return;
        }
        let mut buf = BytesMut::with_capacity(data.len() + self.read_buf.len());
        buf.put(data);
        buf.put(self.read_buf.split());
        self.read_buf = buf;
    }

    async fn send_message(&mut self, message: Bytes) -> Result<()> {
        match self.framing {
            Framing::Buffered => self.write_raw(&message).await,
            Framing::Sasl => {
                let length = u32::try_from(message.len())
                    .map_err(|_| Error::InvalidLength(message.len() as i64))?;
                let mut frame = BytesMut::with_capacity(FRAME_HEADER_SIZE + message.len());
                frame.put_u32(length);
                frame.put(message);
                self.write_raw(&frame).await
            }
        }
    }

    async fn receive_message(&mut self) -> Result<Bytes> {
        match self.framing {
            Framing::Buffered => self.read_chunk().await,
            Framing::Sasl => self.read_frame().await,
        }
    }

    fn framing(&self) -> Framing {
        self.framing
    }

    fn set_framing(&mut self, framing: Framing) {
        self.framing = framing;
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    async fn close(&mut self) -> Result<()> {
        self.read_buf.clear();
        if let Some(mut stream) = self.stream.take() {
            stream.shutdown().await.map_err(Error::Io)?;
        }
        Ok(())
    }
}
