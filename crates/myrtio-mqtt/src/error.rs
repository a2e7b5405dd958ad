use core::fmt;

use crate::packet::ConnectReturnCode;

/// Packet encoding or decoding failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketError {
    BufferTooSmall,
    PayloadTooLarge,
    FieldTooLong,
    Malformed,
    InvalidUtf8,
    UnsupportedQoS,
    MissingPacketId,
    UnexpectedPacket(u8),
}

impl fmt::Display for PacketError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PacketError::BufferTooSmall => f.write_str("buffer too small"),
            PacketError::PayloadTooLarge => f.write_str("payload too large"),
            PacketError::FieldTooLong => f.write_str("string field longer than 65535 bytes"),
            PacketError::Malformed => f.write_str("malformed packet"),
            PacketError::InvalidUtf8 => f.write_str("invalid UTF-8 in string field"),
            PacketError::UnsupportedQoS => f.write_str("unsupported QoS"),
            PacketError::MissingPacketId => f.write_str("QoS 1 publish without packet id"),
            PacketError::UnexpectedPacket(kind) => write!(f, "unexpected packet type 0x{:02X}", kind),
        }
    }
}

/// Client error, generic over the transport error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MqttError<E> {
    Transport(E),
    Packet(PacketError),
    /// The broker answered CONNECT with a non-zero return code
    ConnectionRefused(ConnectReturnCode),
    /// The transport reported end of stream
    ConnectionClosed,
    /// The broker did not answer in time
    Timeout,
    NotConnected,
    TooManyTopics,
}

impl<E> From<PacketError> for MqttError<E> {
    fn from(e: PacketError) -> Self {
        MqttError::Packet(e)
    }
}

impl<E: fmt::Debug> fmt::Display for MqttError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MqttError::Transport(e) => write!(f, "transport error: {:?}", e),
            MqttError::Packet(e) => write!(f, "packet error: {}", e),
            MqttError::ConnectionRefused(code) => {
                write!(f, "connection refused: {:?} ({})", code, code.code())
            }
            MqttError::ConnectionClosed => f.write_str("connection closed by peer"),
            MqttError::Timeout => f.write_str("broker did not respond in time"),
            MqttError::NotConnected => f.write_str("not connected"),
            MqttError::TooManyTopics => f.write_str("subscription limit reached"),
        }
    }
}
