//! Byte transports for the client

use core::fmt::Debug;

use embassy_time::{Duration, with_timeout};
use embedded_io_async::{Read, Write};

/// Reliable, ordered byte stream carrying MQTT packets
#[allow(async_fn_in_trait)]
pub trait MqttTransport {
    type Error: Debug;

    /// Send the whole buffer
    async fn send(&mut self, buf: &[u8]) -> Result<(), Self::Error>;

    /// Receive at least one byte. `Ok(0)` means the peer closed the stream.
    async fn recv(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;
}

/// Error of a [`StreamTransport`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamError<E> {
    Io(E),
    /// No data arrived within the read timeout
    Timeout,
}

/// Transport over any `embedded-io-async` stream: a TCP socket, or a TLS
/// session layered on one.
pub struct StreamTransport<S> {
    io: S,
    read_timeout: Duration,
}

impl<S> StreamTransport<S> {
    pub fn new(io: S, read_timeout: Duration) -> Self {
        Self { io, read_timeout }
    }

    pub fn into_inner(self) -> S {
        self.io
    }
}

impl<S: Read + Write> MqttTransport for StreamTransport<S> {
    type Error = StreamError<S::Error>;

    async fn send(&mut self, buf: &[u8]) -> Result<(), Self::Error> {
        self.io.write_all(buf).await.map_err(StreamError::Io)?;
        self.io.flush().await.map_err(StreamError::Io)
    }

    async fn recv(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        match with_timeout(self.read_timeout, self.io.read(buf)).await {
            Ok(result) => result.map_err(StreamError::Io),
            Err(_) => Err(StreamError::Timeout),
        }
    }
}
