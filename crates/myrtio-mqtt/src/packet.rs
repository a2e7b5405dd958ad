//! MQTT v3.1.1 control packets
//!
//! Only the packets a QoS 0/1 client needs are modelled. Outgoing packets are
//! encoded into a caller buffer; incoming packets are decoded in place and
//! borrow from the receive buffer.

use crate::error::PacketError;
use crate::util::{Reader, Writer, decode_remaining_length};

const PROTOCOL_NAME: &str = "MQTT";
const PROTOCOL_LEVEL: u8 = 4;

const CONNECT: u8 = 0x10;
const CONNACK: u8 = 0x20;
const PUBLISH: u8 = 0x30;
const PUBACK: u8 = 0x40;
const SUBSCRIBE: u8 = 0x82;
const SUBACK: u8 = 0x90;
const PINGREQ: u8 = 0xC0;
const PINGRESP: u8 = 0xD0;
const DISCONNECT: u8 = 0xE0;

const CONNECT_FLAG_USERNAME: u8 = 0x80;
const CONNECT_FLAG_PASSWORD: u8 = 0x40;
const CONNECT_FLAG_CLEAN_SESSION: u8 = 0x02;

/// Delivery guarantee of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum QoS {
    AtMostOnce = 0,
    AtLeastOnce = 1,
}

impl QoS {
    pub fn from_u8(value: u8) -> Result<Self, PacketError> {
        match value {
            0 => Ok(QoS::AtMostOnce),
            1 => Ok(QoS::AtLeastOnce),
            _ => Err(PacketError::UnsupportedQoS),
        }
    }
}

/// CONNACK return code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectReturnCode {
    Accepted,
    UnacceptableProtocolVersion,
    IdentifierRejected,
    ServerUnavailable,
    BadUsernameOrPassword,
    NotAuthorized,
    Other(u8),
}

impl ConnectReturnCode {
    pub fn from_u8(code: u8) -> Self {
        match code {
            0 => ConnectReturnCode::Accepted,
            1 => ConnectReturnCode::UnacceptableProtocolVersion,
            2 => ConnectReturnCode::IdentifierRejected,
            3 => ConnectReturnCode::ServerUnavailable,
            4 => ConnectReturnCode::BadUsernameOrPassword,
            5 => ConnectReturnCode::NotAuthorized,
            other => ConnectReturnCode::Other(other),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            ConnectReturnCode::Accepted => 0,
            ConnectReturnCode::UnacceptableProtocolVersion => 1,
            ConnectReturnCode::IdentifierRejected => 2,
            ConnectReturnCode::ServerUnavailable => 3,
            ConnectReturnCode::BadUsernameOrPassword => 4,
            ConnectReturnCode::NotAuthorized => 5,
            ConnectReturnCode::Other(code) => code,
        }
    }

    /// Whether the broker rejected the credentials
    pub fn is_auth_failure(self) -> bool {
        matches!(
            self,
            ConnectReturnCode::BadUsernameOrPassword | ConnectReturnCode::NotAuthorized
        )
    }
}

/// CONNECT packet
#[derive(Debug, Clone, Copy)]
pub struct Connect<'a> {
    pub client_id: &'a str,
    pub username: Option<&'a str>,
    pub password: Option<&'a [u8]>,
    pub keep_alive_secs: u16,
    pub clean_session: bool,
}

/// PUBLISH packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Publish<'a> {
    pub topic: &'a str,
    pub payload: &'a [u8],
    pub qos: QoS,
    /// Present for QoS 1
    pub packet_id: Option<u16>,
    pub retain: bool,
    pub dup: bool,
}

/// Single-filter SUBSCRIBE packet
#[derive(Debug, Clone, Copy)]
pub struct Subscribe<'a> {
    pub packet_id: u16,
    pub filter: &'a str,
    pub qos: QoS,
}

/// Packet sent by the client
#[derive(Debug, Clone, Copy)]
pub enum Outgoing<'a> {
    Connect(Connect<'a>),
    Publish(Publish<'a>),
    PubAck(u16),
    Subscribe(Subscribe<'a>),
    PingReq,
    Disconnect,
}

/// Packet received from the broker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Incoming<'a> {
    ConnAck {
        session_present: bool,
        code: ConnectReturnCode,
    },
    Publish(Publish<'a>),
    PubAck(u16),
    SubAck {
        packet_id: u16,
        /// `None` when the broker rejected the filter (return code 0x80)
        granted: Option<QoS>,
    },
    PingResp,
}

impl Outgoing<'_> {
    /// Encode the packet into `buf`, returning the encoded length
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, PacketError> {
        let mut w = Writer::new(buf);
        match self {
            Outgoing::Connect(connect) => encode_connect(&mut w, connect)?,
            Outgoing::Publish(publish) => encode_publish(&mut w, publish)?,
            Outgoing::PubAck(packet_id) => {
                w.put_u8(PUBACK)?;
                w.put_remaining_length(2)?;
                w.put_u16(*packet_id)?;
            }
            Outgoing::Subscribe(subscribe) => {
                w.put_u8(SUBSCRIBE)?;
                w.put_remaining_length(2 + 2 + subscribe.filter.len() + 1)?;
                w.put_u16(subscribe.packet_id)?;
                w.put_str(subscribe.filter)?;
                w.put_u8(subscribe.qos as u8)?;
            }
            Outgoing::PingReq => {
                w.put_u8(PINGREQ)?;
                w.put_u8(0)?;
            }
            Outgoing::Disconnect => {
                w.put_u8(DISCONNECT)?;
                w.put_u8(0)?;
            }
        }
        Ok(w.position())
    }
}

fn encode_connect(w: &mut Writer<'_>, connect: &Connect<'_>) -> Result<(), PacketError> {
    let mut flags = 0u8;
    let mut len = 2 + PROTOCOL_NAME.len() + 1 + 1 + 2 + 2 + connect.client_id.len();
    if connect.clean_session {
        flags |= CONNECT_FLAG_CLEAN_SESSION;
    }
    if let Some(username) = connect.username {
        flags |= CONNECT_FLAG_USERNAME;
        len += 2 + username.len();
    }
    if let Some(password) = connect.password {
        flags |= CONNECT_FLAG_PASSWORD;
        len += 2 + password.len();
    }

    w.put_u8(CONNECT)?;
    w.put_remaining_length(len)?;
    w.put_str(PROTOCOL_NAME)?;
    w.put_u8(PROTOCOL_LEVEL)?;
    w.put_u8(flags)?;
    w.put_u16(connect.keep_alive_secs)?;
    w.put_str(connect.client_id)?;
    if let Some(username) = connect.username {
        w.put_str(username)?;
    }
    if let Some(password) = connect.password {
        w.put_binary(password)?;
    }
    Ok(())
}

fn encode_publish(w: &mut Writer<'_>, publish: &Publish<'_>) -> Result<(), PacketError> {
    let mut header = PUBLISH | ((publish.qos as u8) << 1);
    if publish.retain {
        header |= 0x01;
    }
    if publish.dup {
        header |= 0x08;
    }

    let mut len = 2 + publish.topic.len() + publish.payload.len();
    if publish.qos == QoS::AtLeastOnce {
        len += 2;
    }

    w.put_u8(header)?;
    w.put_remaining_length(len)?;
    w.put_str(publish.topic)?;
    if publish.qos == QoS::AtLeastOnce {
        w.put_u16(publish.packet_id.ok_or(PacketError::MissingPacketId)?)?;
    }
    w.put_bytes(publish.payload)
}

impl<'a> Incoming<'a> {
    /// Decode one packet from the start of `buf`.
    ///
    /// Returns the packet and its total encoded length, or `None` while the
    /// packet is still incomplete.
    pub fn decode(buf: &'a [u8]) -> Result<Option<(Self, usize)>, PacketError> {
        let Some(&header) = buf.first() else {
            return Ok(None);
        };
        let Some((remaining, len_size)) = decode_remaining_length(&buf[1..])? else {
            return Ok(None);
        };
        let total = 1 + len_size + remaining;
        if buf.len() < total {
            return Ok(None);
        }

        let mut r = Reader::new(&buf[1 + len_size..total]);
        let packet = match header & 0xF0 {
            CONNACK => {
                let ack_flags = r.u8()?;
                let code = r.u8()?;
                Incoming::ConnAck {
                    session_present: ack_flags & 0x01 != 0,
                    code: ConnectReturnCode::from_u8(code),
                }
            }
            PUBLISH => {
                let qos = QoS::from_u8((header >> 1) & 0x03)?;
                let topic = r.str()?;
                let packet_id = match qos {
                    QoS::AtMostOnce => None,
                    QoS::AtLeastOnce => Some(r.u16()?),
                };
                Incoming::Publish(Publish {
                    topic,
                    payload: r.rest(),
                    qos,
                    packet_id,
                    retain: header & 0x01 != 0,
                    dup: header & 0x08 != 0,
                })
            }
            PUBACK => Incoming::PubAck(r.u16()?),
            SUBACK => {
                let packet_id = r.u16()?;
                let code = r.u8()?;
                let granted = if code == 0x80 {
                    None
                } else {
                    Some(QoS::from_u8(code).unwrap_or(QoS::AtLeastOnce))
                };
                Incoming::SubAck { packet_id, granted }
            }
            PINGRESP => Incoming::PingResp,
            other => return Err(PacketError::UnexpectedPacket(other)),
        };
        Ok(Some((packet, total)))
    }
}

/// Head of a packet too large to be decoded in place
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Oversized {
    /// Total encoded length of the packet
    pub(crate) total: usize,
    /// Packet id of a QoS 1 PUBLISH, when it is within `buf`
    pub(crate) packet_id: Option<u16>,
}

impl Oversized {
    /// Inspect the start of an incomplete packet.
    ///
    /// Returns `None` while the fixed header itself is incomplete.
    pub(crate) fn inspect(buf: &[u8]) -> Result<Option<Self>, PacketError> {
        let Some(&header) = buf.first() else {
            return Ok(None);
        };
        let Some((remaining, len_size)) = decode_remaining_length(&buf[1..])? else {
            return Ok(None);
        };
        let packet_id = if header & 0xF0 == PUBLISH
            && QoS::from_u8((header >> 1) & 0x03)? == QoS::AtLeastOnce
        {
            publish_id(&buf[1 + len_size..])
        } else {
            None
        };
        Ok(Some(Self {
            total: 1 + len_size + remaining,
            packet_id,
        }))
    }
}

fn publish_id(body: &[u8]) -> Option<u16> {
    let mut r = Reader::new(body);
    let topic_len = usize::from(r.u16().ok()?);
    r.bytes(topic_len).ok()?;
    r.u16().ok()
}
