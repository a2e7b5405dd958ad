//! Session Manager
//!
//! Owns the messaging session layered on top of the link. The MQTT transport
//! task reports connection progress and inbound traffic as [`SessionEvent`]s;
//! the manager keeps [`SessionState`], subscribes to the command topic as soon
//! as the session opens and forwards matching messages to the
//! [`InboundHandler`].
//!
//! Reconnection is owned by the transport: after a drop it emits
//! [`SessionEvent::BeforeConnect`] for every new attempt.

use core::cell::{Cell, RefCell};
use core::fmt::{self, Write as _};

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::Duration;
use heapless::String;
use myrtio_mqtt::QoS;

use crate::token::{SasToken, TokenError};
use crate::topic::{self, MAX_TOPIC_LEN, MAX_USERNAME_LEN};

/// Secure MQTT port of the hub
pub const DEFAULT_PORT: u16 = 8883;
/// Keep-alive interval announced on connect
pub const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(60);

pub const MAX_HOST_LEN: usize = 64;
pub const MAX_DEVICE_ID_LEN: usize = 64;
pub const MAX_TOKEN_LEN: usize = 384;

/// Opaque identifier correlating a request with its acknowledgment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageId(pub u16);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Failure of a transport-level operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportFault {
    /// Hub host name did not resolve
    Dns,
    /// TCP connect or socket I/O failed
    Tcp,
    /// TLS handshake or record layer failed
    Tls,
    /// Malformed or unexpected MQTT traffic
    Protocol,
    /// Broker refused the connection with a non-authentication return code
    Refused(u8),
    /// The request queue is full
    Busy,
}

impl fmt::Display for TransportFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportFault::Dns => f.write_str("DNS resolution failed"),
            TransportFault::Tcp => f.write_str("TCP error"),
            TransportFault::Tls => f.write_str("TLS error"),
            TransportFault::Protocol => f.write_str("MQTT protocol error"),
            TransportFault::Refused(code) => write!(f, "connection refused (code {})", code),
            TransportFault::Busy => f.write_str("transport queue is full"),
        }
    }
}

/// Cause of a failed session open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    AuthenticationRejected,
    Transport(TransportFault),
    Timeout,
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::AuthenticationRejected => f.write_str("authentication rejected"),
            SessionError::Transport(fault) => write!(f, "transport error: {}", fault),
            SessionError::Timeout => f.write_str("timed out waiting for the broker"),
        }
    }
}

impl From<TransportFault> for SessionError {
    fn from(fault: TransportFault) -> Self {
        SessionError::Transport(fault)
    }
}

/// Session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Closed,
    Opening,
    Open,
    /// The last open attempt failed
    Faulted(SessionError),
}

/// Notification from the session transport
#[derive(Debug, Clone, Copy)]
pub enum SessionEvent<'m> {
    /// A new connect attempt is about to start
    BeforeConnect,
    /// The broker accepted the session
    Connected,
    /// The session dropped
    Disconnected,
    /// A QoS 1 publish was acknowledged
    Published(MessageId),
    /// An inbound message was delivered
    MessageReceived { topic: &'m str, payload: &'m [u8] },
    /// The open attempt failed
    Error(SessionError),
}

/// Error returned by [`SessionManager::publish`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishError {
    NotOpen,
    TopicTooLong,
    Transport(TransportFault),
}

impl fmt::Display for PublishError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublishError::NotOpen => f.write_str("session is not open"),
            PublishError::TopicTooLong => f.write_str("topic exceeds buffer"),
            PublishError::Transport(fault) => write!(f, "{}", fault),
        }
    }
}

/// Invalid session configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigurationError {
    EmptyHost,
    HostTooLong,
    EmptyDeviceId,
    DeviceIdTooLong,
    TokenTooLong,
    /// A derived topic or the username does not fit its buffer
    NameTooLong,
    MalformedToken(TokenError),
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigurationError::EmptyHost => f.write_str("hub host is empty"),
            ConfigurationError::HostTooLong => {
                write!(f, "hub host is longer than {} bytes", MAX_HOST_LEN)
            }
            ConfigurationError::EmptyDeviceId => f.write_str("device id is empty"),
            ConfigurationError::DeviceIdTooLong => {
                write!(f, "device id is longer than {} bytes", MAX_DEVICE_ID_LEN)
            }
            ConfigurationError::TokenTooLong => {
                write!(f, "SAS token is longer than {} bytes", MAX_TOKEN_LEN)
            }
            ConfigurationError::NameTooLong => {
                f.write_str("derived topic or username exceeds its buffer")
            }
            ConfigurationError::MalformedToken(e) => write!(f, "malformed SAS token: {}", e),
        }
    }
}

/// Everything the transport needs to open the session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    host: String<MAX_HOST_LEN>,
    port: u16,
    device_id: String<MAX_DEVICE_ID_LEN>,
    username: String<MAX_USERNAME_LEN>,
    topics: Topics,
    password: String<MAX_TOKEN_LEN>,
    token_expiry: u64,
    keep_alive: Duration,
}

impl SessionConfig {
    /// Build the configuration for `device_id` on `hub_host`, authenticated
    /// with a pre-issued SAS token.
    pub fn new(hub_host: &str, device_id: &str, sas_token: &str) -> Result<Self, ConfigurationError> {
        if hub_host.is_empty() {
            return Err(ConfigurationError::EmptyHost);
        }
        if device_id.is_empty() {
            return Err(ConfigurationError::EmptyDeviceId);
        }
        let token = SasToken::parse(sas_token).map_err(ConfigurationError::MalformedToken)?;

        let mut host = String::new();
        host.push_str(hub_host)
            .map_err(|()| ConfigurationError::HostTooLong)?;
        let mut id = String::new();
        id.push_str(device_id)
            .map_err(|()| ConfigurationError::DeviceIdTooLong)?;
        let mut password = String::new();
        password
            .push_str(sas_token)
            .map_err(|()| ConfigurationError::TokenTooLong)?;

        let topics = Topics {
            telemetry: topic::telemetry_topic(device_id)
                .map_err(|_| ConfigurationError::NameTooLong)?,
            commands: topic::command_filter(device_id)
                .map_err(|_| ConfigurationError::NameTooLong)?,
        };

        Ok(Self {
            username: topic::username(hub_host, device_id)
                .map_err(|_| ConfigurationError::NameTooLong)?,
            topics,
            host,
            port: DEFAULT_PORT,
            device_id: id,
            password,
            token_expiry: token.expiry,
            keep_alive: DEFAULT_KEEP_ALIVE,
        })
    }

    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub fn with_keep_alive(mut self, keep_alive: Duration) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// MQTT client identifier, which the hub requires to equal the device id
    pub fn client_id(&self) -> &str {
        &self.device_id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    /// Token expiry as seconds since the Unix epoch
    pub fn token_expiry(&self) -> u64 {
        self.token_expiry
    }

    pub fn keep_alive(&self) -> Duration {
        self.keep_alive
    }
}

/// MQTT side of the session.
///
/// All calls are requests that must not block; progress is reported back
/// through [`SessionManager::dispatch`].
pub trait SessionTransport {
    /// Start connecting with `config`, reconnecting on every drop
    fn open(&self, config: &SessionConfig) -> Result<(), TransportFault>;

    fn subscribe(&self, filter: &str, qos: QoS) -> Result<MessageId, TransportFault>;

    fn publish(&self, topic: &str, payload: &[u8], qos: QoS) -> Result<MessageId, TransportFault>;
}

impl<T: SessionTransport + ?Sized> SessionTransport for &T {
    fn open(&self, config: &SessionConfig) -> Result<(), TransportFault> {
        (**self).open(config)
    }

    fn subscribe(&self, filter: &str, qos: QoS) -> Result<MessageId, TransportFault> {
        (**self).subscribe(filter, qos)
    }

    fn publish(&self, topic: &str, payload: &[u8], qos: QoS) -> Result<MessageId, TransportFault> {
        (**self).publish(topic, payload, qos)
    }
}

/// Receiver of inbound messages on the command subscription
pub trait InboundHandler {
    fn on_message(&self, topic: &str, payload: &[u8]);
}

impl<H: InboundHandler + ?Sized> InboundHandler for &H {
    fn on_message(&self, topic: &str, payload: &[u8]) {
        (**self).on_message(topic, payload);
    }
}

#[derive(Debug, Clone)]
struct Topics {
    telemetry: String<MAX_TOPIC_LEN>,
    commands: String<MAX_TOPIC_LEN>,
}

#[derive(Debug, Clone, Copy)]
struct SessionStatus {
    state: SessionState,
    last_fault: Option<SessionError>,
}

/// Owner of the session state machine
pub struct SessionManager<T: SessionTransport, H: InboundHandler> {
    transport: T,
    handler: H,
    status: Mutex<CriticalSectionRawMutex, Cell<SessionStatus>>,
    topics: Mutex<CriticalSectionRawMutex, RefCell<Option<Topics>>>,
}

impl<T: SessionTransport, H: InboundHandler> SessionManager<T, H> {
    pub const fn new(transport: T, handler: H) -> Self {
        Self {
            transport,
            handler,
            status: Mutex::new(Cell::new(SessionStatus {
                state: SessionState::Closed,
                last_fault: None,
            })),
            topics: Mutex::new(RefCell::new(None)),
        }
    }

    /// Adopt the session topics from `config` and ask the transport to open.
    pub fn start(&self, config: &SessionConfig) -> Result<(), TransportFault> {
        let topics = config.topics.clone();
        self.topics.lock(|cell| cell.replace(Some(topics)));

        log::info!(
            "session: opening {}:{} as '{}' (token expires at {})",
            config.host(),
            config.port(),
            config.client_id(),
            config.token_expiry()
        );
        self.set_state(SessionState::Opening);

        self.transport.open(config).inspect_err(|e| {
            log::error!("session: transport refused to open: {}", e);
            self.set_state(SessionState::Closed);
        })
    }

    /// Feed a transport notification into the state machine
    pub fn dispatch(&self, event: SessionEvent<'_>) {
        match event {
            SessionEvent::BeforeConnect => {
                if let SessionState::Faulted(cause) = self.state() {
                    log::info!("session: retrying after '{}'", cause);
                    self.set_state(SessionState::Closed);
                }
                self.set_state(SessionState::Opening);
            }
            SessionEvent::Connected => {
                self.set_state(SessionState::Open);
                log::info!("session: connected");
                self.subscribe_commands();
            }
            SessionEvent::Disconnected => {
                if !matches!(self.state(), SessionState::Faulted(_)) {
                    self.set_state(SessionState::Closed);
                }
                log::warn!("session: disconnected");
            }
            SessionEvent::Published(id) => {
                log::debug!("session: message {} acknowledged", id);
            }
            SessionEvent::MessageReceived { topic, payload } => {
                self.deliver(topic, payload);
            }
            SessionEvent::Error(cause) => {
                self.status.lock(|cell| {
                    cell.set(SessionStatus {
                        state: SessionState::Faulted(cause),
                        last_fault: Some(cause),
                    });
                });
                match cause {
                    SessionError::AuthenticationRejected => log::error!(
                        "session: authentication rejected, the SAS token may have expired"
                    ),
                    _ => log::error!("session: {}", cause),
                }
            }
        }
    }

    /// Publish `payload` on the telemetry topic followed by `topic_suffix`.
    ///
    /// Delivery is acknowledged later with [`SessionEvent::Published`] carrying
    /// the returned id; the caller does not wait for it.
    pub fn publish(&self, topic_suffix: &str, payload: &[u8]) -> Result<MessageId, PublishError> {
        if !self.is_open() {
            return Err(PublishError::NotOpen);
        }

        let topic = self.topics.lock(|cell| {
            let topics = cell.borrow();
            let topics = topics.as_ref().ok_or(PublishError::NotOpen)?;
            let mut topic = String::<MAX_TOPIC_LEN>::new();
            write!(topic, "{}{}", topics.telemetry, topic_suffix)
                .map_err(|_| PublishError::TopicTooLong)?;
            Ok(topic)
        })?;

        self.transport
            .publish(&topic, payload, QoS::AtLeastOnce)
            .map_err(PublishError::Transport)
    }

    /// Current session state
    pub fn state(&self) -> SessionState {
        self.status.lock(Cell::get).state
    }

    pub fn is_open(&self) -> bool {
        self.state() == SessionState::Open
    }

    /// Cause of the most recent failed open attempt
    pub fn last_fault(&self) -> Option<SessionError> {
        self.status.lock(Cell::get).last_fault
    }

    fn subscribe_commands(&self) {
        let filter = self
            .topics
            .lock(|cell| cell.borrow().as_ref().map(|topics| topics.commands.clone()));
        let Some(filter) = filter else {
            log::error!("session: connected before start, nothing to subscribe");
            return;
        };

        match self.transport.subscribe(&filter, QoS::AtLeastOnce) {
            Ok(id) => log::info!("session: subscribing to {} (msg_id={})", filter, id),
            Err(e) => log::error!("session: subscribe to {} failed: {}", filter, e),
        }
    }

    fn deliver(&self, topic: &str, payload: &[u8]) {
        let accepted = self.topics.lock(|cell| {
            cell.borrow()
                .as_ref()
                .is_some_and(|topics| topic::matches_filter(&topics.commands, topic))
        });

        if accepted {
            self.handler.on_message(topic, payload);
        } else {
            log::warn!("session: dropped message on unexpected topic {}", topic);
        }
    }

    fn set_state(&self, state: SessionState) {
        self.status.lock(|cell| {
            let mut status = cell.get();
            status.state = state;
            cell.set(status);
        });
    }
}
