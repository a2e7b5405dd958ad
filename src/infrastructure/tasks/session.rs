//! Session task
//!
//! Owns the broker connection: DNS, TCP, TLS and MQTT. The session manager is
//! told about every step through [`SessionEvent`]s, and outbound requests
//! queued by [`EspSessionTransport`](crate::infrastructure::drivers::EspSessionTransport)
//! are written between reads.

use embassy_net::Stack;
use embassy_net::tcp::TcpSocket;
use embassy_time::{Duration, Timer};
use embedded_tls::{Aes128GcmSha256, TlsConfig, TlsConnection, TlsContext, UnsecureProvider};
use myrtio_engine::session::{
    MessageId, SessionConfig, SessionError, SessionEvent, TransportFault,
};
use myrtio_mqtt::{MqttClient, MqttError, MqttEvent, MqttOptions, MqttTransport, QoS, StreamTransport};

use crate::config;
use crate::infrastructure::drivers::{EspRng, OUTBOX, OutboundRequest, SESSION_OPEN, resolve_host};
use crate::infrastructure::types::{Link, Session};
use crate::mk_static;

const MQTT_MAX_TOPICS: usize = 2;
const MQTT_BUF_SIZE: usize = 1024;

const TCP_BUFFER_SIZE: usize = 4096;
/// Fits one full TLS record
const TLS_READ_BUFFER_SIZE: usize = 16_640;
const TLS_WRITE_BUFFER_SIZE: usize = 4096;

const SOCKET_TIMEOUT: Duration = Duration::from_secs(90);
const READ_TIMEOUT: Duration = Duration::from_secs(90);
/// Upper bound on how long queued requests wait behind a read
const POLL_INTERVAL: Duration = Duration::from_millis(250);
const LINK_CHECK_INTERVAL: Duration = Duration::from_millis(500);

type Client<'a, T> = MqttClient<'a, T, MQTT_MAX_TOPICS, MQTT_BUF_SIZE>;

struct SessionBuffers {
    tcp_rx: [u8; TCP_BUFFER_SIZE],
    tcp_tx: [u8; TCP_BUFFER_SIZE],
    tls_read: [u8; TLS_READ_BUFFER_SIZE],
    tls_write: [u8; TLS_WRITE_BUFFER_SIZE],
}

impl SessionBuffers {
    const fn new() -> Self {
        Self {
            tcp_rx: [0; TCP_BUFFER_SIZE],
            tcp_tx: [0; TCP_BUFFER_SIZE],
            tls_read: [0; TLS_READ_BUFFER_SIZE],
            tls_write: [0; TLS_WRITE_BUFFER_SIZE],
        }
    }
}

/// Keeps a session with the hub open for as long as the device runs.
///
/// Idle until the session manager is started, then connects whenever the
/// link is up and retries after every failure.
#[embassy_executor::task]
pub async fn session_task(
    stack: Stack<'static>,
    link: &'static Link,
    session: &'static Session,
    rng: EspRng,
) {
    let buffers = mk_static!(SessionBuffers, SessionBuffers::new());
    let session_config = SESSION_OPEN.wait().await;
    log::info!(
        "session: connecting to {}:{} as {}",
        session_config.host(),
        session_config.port(),
        session_config.device_id()
    );

    loop {
        while !link.is_up() {
            Timer::after(LINK_CHECK_INTERVAL).await;
        }

        session.dispatch(SessionEvent::BeforeConnect);
        match run_session(stack, session, &session_config, rng, buffers).await {
            Ok(()) => session.dispatch(SessionEvent::Disconnected),
            Err(cause) => session.dispatch(SessionEvent::Error(cause)),
        }

        // Requests for a closed connection are stale
        OUTBOX.clear();
        Timer::after(config::SESSION_RETRY_DELAY).await;
    }
}

/// Connect and serve one session.
///
/// `Err` means the session never opened. `Ok` is returned once an open
/// session is lost.
async fn run_session(
    stack: Stack<'static>,
    session: &Session,
    session_config: &SessionConfig,
    rng: EspRng,
    buffers: &mut SessionBuffers,
) -> Result<(), SessionError> {
    let host = session_config.host();
    let address = resolve_host(stack, host).await.ok_or(TransportFault::Dns)?;

    let mut socket = TcpSocket::new(stack, &mut buffers.tcp_rx, &mut buffers.tcp_tx);
    socket.set_timeout(Some(SOCKET_TIMEOUT));
    if let Err(e) = socket.connect((address, session_config.port())).await {
        socket.abort();
        log::warn!("session: TCP connect failed: {:?}", e);
        return Err(TransportFault::Tcp.into());
    }
    log::debug!("session: TCP socket connected");

    let tls_config = TlsConfig::new().with_server_name(host);
    let mut tls = TlsConnection::new(socket, &mut buffers.tls_read, &mut buffers.tls_write);
    tls.open(TlsContext::new(
        &tls_config,
        UnsecureProvider::new::<Aes128GcmSha256>(rng),
    ))
    .await
    .map_err(|e| {
        log::warn!("session: TLS handshake failed: {:?}", e);
        TransportFault::Tls
    })?;
    log::debug!("session: TLS established");

    let options = MqttOptions::new(session_config.client_id())
        .with_credentials(session_config.username(), session_config.password())
        .with_keep_alive(session_config.keep_alive());
    let mut client: Client<'_, _> =
        MqttClient::new(StreamTransport::new(tls, READ_TIMEOUT), options);
    client.connect().await.map_err(connect_error)?;

    session.dispatch(SessionEvent::Connected);
    let e = serve(&mut client, session).await;
    log::warn!("session: connection lost: {}", e);
    Ok(())
}

/// Write queued requests and deliver broker events until the connection fails
async fn serve<T: MqttTransport>(client: &mut Client<'_, T>, session: &Session) -> MqttError<T::Error> {
    loop {
        while let Ok(request) = OUTBOX.try_receive() {
            if let Err(e) = send_request(client, request).await {
                return e;
            }
        }

        match client.poll_timeout(POLL_INTERVAL).await {
            Ok(Some(event)) => deliver(session, event),
            Ok(None) => {}
            Err(e) => return e,
        }
    }
}

async fn send_request<T: MqttTransport>(
    client: &mut Client<'_, T>,
    request: OutboundRequest,
) -> Result<(), MqttError<T::Error>> {
    match request {
        OutboundRequest::Subscribe { id, filter, qos } => {
            log::debug!("session: subscribing to {} ({})", filter, id);
            client.subscribe_with_id(&filter, qos, id.0).await
        }
        OutboundRequest::Publish {
            id,
            topic,
            payload,
            qos,
        } => {
            let packet_id = (qos == QoS::AtLeastOnce).then_some(id.0);
            client.publish_with_id(&topic, &payload, qos, packet_id).await
        }
    }
}

fn deliver(session: &Session, event: MqttEvent<'_>) {
    match event {
        MqttEvent::Publish(message) => session.dispatch(SessionEvent::MessageReceived {
            topic: message.topic,
            payload: message.payload,
        }),
        MqttEvent::PubAck(packet_id) => {
            session.dispatch(SessionEvent::Published(MessageId(packet_id)));
        }
        MqttEvent::SubAck {
            packet_id,
            granted: Some(qos),
        } => log::info!("session: subscription {} granted with {:?}", packet_id, qos),
        MqttEvent::SubAck {
            packet_id,
            granted: None,
        } => log::error!("session: subscription {} rejected by the broker", packet_id),
    }
}

fn connect_error<E: core::fmt::Debug>(e: MqttError<E>) -> SessionError {
    log::warn!("session: MQTT connect failed: {}", e);
    match e {
        MqttError::ConnectionRefused(code) if code.is_auth_failure() => {
            SessionError::AuthenticationRejected
        }
        MqttError::ConnectionRefused(code) => TransportFault::Refused(code.code()).into(),
        MqttError::Timeout => SessionError::Timeout,
        MqttError::Transport(_) | MqttError::ConnectionClosed => TransportFault::Tls.into(),
        MqttError::Packet(_) | MqttError::NotConnected | MqttError::TooManyTopics => {
            TransportFault::Protocol.into()
        }
    }
}
