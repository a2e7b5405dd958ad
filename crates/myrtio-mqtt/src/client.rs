//! MQTT client
//!
//! A single connection driven by the owner: call [`MqttClient::connect`] once
//! per transport, then keep calling [`MqttClient::poll`] to receive messages,
//! acknowledgments and to keep the connection alive.

use embassy_time::{Duration, Instant, with_timeout};

use crate::error::{MqttError, PacketError};
use crate::packet::{
    Connect, ConnectReturnCode, Incoming, Outgoing, Oversized, Publish, QoS, Subscribe,
};
use crate::transport::MqttTransport;
use crate::util::next_packet_id;

/// Connection options
#[derive(Debug, Clone, Copy)]
pub struct MqttOptions<'a> {
    client_id: &'a str,
    username: Option<&'a str>,
    password: Option<&'a [u8]>,
    keep_alive: Duration,
    connect_timeout: Duration,
    clean_session: bool,
}

impl<'a> MqttOptions<'a> {
    pub fn new(client_id: &'a str) -> Self {
        Self {
            client_id,
            username: None,
            password: None,
            keep_alive: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(10),
            clean_session: true,
        }
    }

    #[must_use]
    pub fn with_credentials(mut self, username: &'a str, password: &'a str) -> Self {
        self.username = Some(username);
        self.password = Some(password.as_bytes());
        self
    }

    #[must_use]
    pub fn with_keep_alive(mut self, keep_alive: Duration) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    /// How long to wait for CONNACK
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_clean_session(mut self, clean_session: bool) -> Self {
        self.clean_session = clean_session;
        self
    }

    pub fn client_id(&self) -> &'a str {
        self.client_id
    }

    pub fn keep_alive(&self) -> Duration {
        self.keep_alive
    }

    fn keep_alive_secs(&self) -> u16 {
        u16::try_from(self.keep_alive.as_secs()).unwrap_or(u16::MAX)
    }
}

/// Message delivered on a subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishMessage<'a> {
    pub topic: &'a str,
    pub payload: &'a [u8],
    pub qos: QoS,
}

/// Event produced by [`MqttClient::poll`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MqttEvent<'a> {
    /// Inbound message. QoS 1 messages are acknowledged before delivery.
    Publish(PublishMessage<'a>),
    /// A QoS 1 publish was acknowledged
    PubAck(u16),
    /// A subscription was answered; `granted` is `None` when rejected
    SubAck { packet_id: u16, granted: Option<QoS> },
}

type Result<T, E> = core::result::Result<T, MqttError<E>>;

/// MQTT v3.1.1 client with fixed-size buffers.
///
/// - `MAX_TOPICS`: maximum number of subscriptions per connection
/// - `BUF_SIZE`: size of each of the TX and RX buffers
pub struct MqttClient<'a, T: MqttTransport, const MAX_TOPICS: usize, const BUF_SIZE: usize> {
    transport: T,
    options: MqttOptions<'a>,
    tx: [u8; BUF_SIZE],
    rx: [u8; BUF_SIZE],
    rx_len: usize,
    rx_consumed: usize,
    /// Bytes of an oversized packet still to be discarded
    skip: usize,
    packet_id: u16,
    topics: usize,
    connected: bool,
    ping_outstanding: bool,
    last_sent: Instant,
}

impl<'a, T: MqttTransport, const MAX_TOPICS: usize, const BUF_SIZE: usize>
    MqttClient<'a, T, MAX_TOPICS, BUF_SIZE>
{
    pub fn new(transport: T, options: MqttOptions<'a>) -> Self {
        Self {
            transport,
            options,
            tx: [0; BUF_SIZE],
            rx: [0; BUF_SIZE],
            rx_len: 0,
            rx_consumed: 0,
            skip: 0,
            packet_id: 0,
            topics: 0,
            connected: false,
            ping_outstanding: false,
            last_sent: Instant::from_ticks(0),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Send CONNECT and wait for the broker's CONNACK
    pub async fn connect(&mut self) -> Result<(), T::Error> {
        self.rx_len = 0;
        self.rx_consumed = 0;
        self.skip = 0;
        self.topics = 0;
        self.ping_outstanding = false;

        let options = self.options;
        self.send(&Outgoing::Connect(Connect {
            client_id: options.client_id,
            username: options.username,
            password: options.password,
            keep_alive_secs: options.keep_alive_secs(),
            clean_session: options.clean_session,
        }))
        .await?;

        match with_timeout(options.connect_timeout, self.wait_connack()).await {
            Ok(result) => result,
            Err(_) => Err(MqttError::Timeout),
        }
    }

    async fn wait_connack(&mut self) -> Result<(), T::Error> {
        loop {
            self.fill().await?;
            let Some((packet, total)) = Incoming::decode(&self.rx[..self.rx_len])? else {
                continue;
            };
            let Incoming::ConnAck { code, .. } = packet else {
                return Err(PacketError::UnexpectedPacket(self.rx[0] & 0xF0).into());
            };
            self.rx_consumed = total;
            if code != ConnectReturnCode::Accepted {
                #[cfg(feature = "log")]
                log::warn!("mqtt: connection refused with code {}", code.code());
                return Err(MqttError::ConnectionRefused(code));
            }
            self.connected = true;
            #[cfg(feature = "log")]
            log::debug!("mqtt: connected as {}", self.options.client_id);
            return Ok(());
        }
    }

    /// Subscribe to `filter`, returning the packet id the SUBACK will carry
    pub async fn subscribe(&mut self, filter: &str, qos: QoS) -> Result<u16, T::Error> {
        let packet_id = self.allocate_id();
        self.subscribe_with_id(filter, qos, packet_id).await?;
        Ok(packet_id)
    }

    /// Subscribe to `filter` using a caller-allocated packet id
    pub async fn subscribe_with_id(
        &mut self,
        filter: &str,
        qos: QoS,
        packet_id: u16,
    ) -> Result<(), T::Error> {
        self.ensure_connected()?;
        if self.topics >= MAX_TOPICS {
            return Err(MqttError::TooManyTopics);
        }
        self.send(&Outgoing::Subscribe(Subscribe {
            packet_id,
            filter,
            qos,
        }))
        .await?;
        self.topics += 1;
        Ok(())
    }

    /// Publish `payload` on `topic`.
    ///
    /// Returns the packet id the PUBACK will carry for QoS 1.
    pub async fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        qos: QoS,
    ) -> Result<Option<u16>, T::Error> {
        let packet_id = match qos {
            QoS::AtMostOnce => None,
            QoS::AtLeastOnce => Some(self.allocate_id()),
        };
        self.publish_with_id(topic, payload, qos, packet_id).await?;
        Ok(packet_id)
    }

    /// Publish using a caller-allocated packet id
    pub async fn publish_with_id(
        &mut self,
        topic: &str,
        payload: &[u8],
        qos: QoS,
        packet_id: Option<u16>,
    ) -> Result<(), T::Error> {
        self.ensure_connected()?;
        self.send(&Outgoing::Publish(Publish {
            topic,
            payload,
            qos,
            packet_id,
            retain: false,
            dup: false,
        }))
        .await
    }

    /// Send DISCONNECT and mark the client as disconnected
    pub async fn disconnect(&mut self) -> Result<(), T::Error> {
        self.ensure_connected()?;
        self.connected = false;
        self.send(&Outgoing::Disconnect).await
    }

    /// Wait for the next packet from the broker, up to the keep-alive deadline.
    ///
    /// Returns `Ok(None)` when the wait ended without an event, for example
    /// after sending a PINGREQ. An error means the connection is unusable.
    pub async fn poll(&mut self) -> Result<Option<MqttEvent<'_>>, T::Error> {
        let keep_alive = self.options.keep_alive;
        self.poll_timeout(keep_alive).await
    }

    /// Like [`MqttClient::poll`], but gives up after at most `max_wait`.
    ///
    /// Only the read is abandoned on timeout, so the caller may send packets
    /// between calls. A PINGREQ is sent only once the keep-alive deadline has
    /// passed.
    ///
    /// A packet larger than `BUF_SIZE` is read and discarded without an
    /// event; a QoS 1 PUBLISH is still acknowledged so it is not redelivered.
    pub async fn poll_timeout(
        &mut self,
        max_wait: Duration,
    ) -> Result<Option<MqttEvent<'_>>, T::Error> {
        self.ensure_connected()?;
        self.discard_consumed();

        let pending = Incoming::decode(&self.rx[..self.rx_len])?.is_none();
        if pending && self.rx_len == BUF_SIZE {
            self.drop_oversized().await?;
        }

        if pending {
            let deadline = self.last_sent + self.options.keep_alive;
            let now = Instant::now();
            if now >= deadline {
                self.keep_alive().await?;
                return Ok(None);
            }
            let wait = (deadline - now).min(max_wait);
            match with_timeout(wait, self.fill()).await {
                Ok(result) => result?,
                Err(_) => {
                    if Instant::now() >= deadline {
                        self.keep_alive().await?;
                    }
                    return Ok(None);
                }
            }
        }

        self.next_event().await
    }

    async fn next_event(&mut self) -> Result<Option<MqttEvent<'_>>, T::Error> {
        let Self {
            transport,
            tx,
            rx,
            rx_len,
            rx_consumed,
            ping_outstanding,
            last_sent,
            ..
        } = self;

        let Some((packet, total)) = Incoming::decode(&rx[..*rx_len])? else {
            return Ok(None);
        };
        *rx_consumed = total;

        let event = match packet {
            Incoming::Publish(publish) => {
                if let Some(packet_id) = publish.packet_id {
                    let len = Outgoing::PubAck(packet_id).encode(&mut tx[..])?;
                    transport
                        .send(&tx[..len])
                        .await
                        .map_err(MqttError::Transport)?;
                    *last_sent = Instant::now();
                }
                MqttEvent::Publish(PublishMessage {
                    topic: publish.topic,
                    payload: publish.payload,
                    qos: publish.qos,
                })
            }
            Incoming::PubAck(packet_id) => MqttEvent::PubAck(packet_id),
            Incoming::SubAck { packet_id, granted } => MqttEvent::SubAck { packet_id, granted },
            Incoming::PingResp => {
                *ping_outstanding = false;
                return Ok(None);
            }
            Incoming::ConnAck { .. } => {
                return Err(PacketError::UnexpectedPacket(0x20).into());
            }
        };
        Ok(Some(event))
    }

    /// Start discarding the packet that fills the receive buffer
    async fn drop_oversized(&mut self) -> Result<(), T::Error> {
        let Some(oversized) = Oversized::inspect(&self.rx[..self.rx_len])? else {
            return Err(PacketError::BufferTooSmall.into());
        };
        #[cfg(feature = "log")]
        log::warn!(
            "mqtt: dropping {}-byte packet, receive buffer holds {}",
            oversized.total,
            BUF_SIZE
        );
        self.skip = oversized.total.saturating_sub(self.rx_len);
        self.rx_len = 0;
        if let Some(packet_id) = oversized.packet_id {
            self.send(&Outgoing::PubAck(packet_id)).await?;
        }
        Ok(())
    }

    async fn keep_alive(&mut self) -> Result<(), T::Error> {
        if self.ping_outstanding {
            #[cfg(feature = "log")]
            log::warn!("mqtt: no PINGRESP within keep-alive");
            self.connected = false;
            return Err(MqttError::Timeout);
        }
        self.send(&Outgoing::PingReq).await?;
        self.ping_outstanding = true;
        Ok(())
    }

    /// Read more bytes into the receive buffer
    async fn fill(&mut self) -> Result<(), T::Error> {
        if self.rx_len == BUF_SIZE {
            return Err(PacketError::BufferTooSmall.into());
        }
        let read = self
            .transport
            .recv(&mut self.rx[self.rx_len..])
            .await
            .map_err(|e| {
                self.connected = false;
                MqttError::Transport(e)
            })?;
        if read == 0 {
            self.connected = false;
            return Err(MqttError::ConnectionClosed);
        }
        let dropped = read.min(self.skip);
        if dropped > 0 {
            self.skip -= dropped;
            self.rx
                .copy_within(self.rx_len + dropped..self.rx_len + read, self.rx_len);
        }
        self.rx_len += read - dropped;
        Ok(())
    }

    fn discard_consumed(&mut self) {
        if self.rx_consumed == 0 {
            return;
        }
        self.rx.copy_within(self.rx_consumed..self.rx_len, 0);
        self.rx_len -= self.rx_consumed;
        self.rx_consumed = 0;
    }

    async fn send(&mut self, packet: &Outgoing<'_>) -> Result<(), T::Error> {
        let len = packet.encode(&mut self.tx)?;
        self.transport
            .send(&self.tx[..len])
            .await
            .map_err(MqttError::Transport)?;
        self.last_sent = Instant::now();
        Ok(())
    }

    fn ensure_connected(&self) -> Result<(), T::Error> {
        if self.connected {
            Ok(())
        } else {
            Err(MqttError::NotConnected)
        }
    }

    fn allocate_id(&mut self) -> u16 {
        self.packet_id = next_packet_id(self.packet_id);
        self.packet_id
    }
}
