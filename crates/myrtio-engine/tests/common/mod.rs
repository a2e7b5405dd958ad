//! Test doubles shared by the engine integration tests.

#![allow(dead_code, unreachable_pub)]

use std::cell::RefCell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use embassy_time::Duration;
use embedded_hal::digital::{self, ErrorKind, ErrorType, OutputPin};
use embedded_hal_async::delay::DelayNs;
use myrtio_engine::channels::{Channel, ChannelRegistry};
use myrtio_engine::link::{LinkCredentials, LinkDriver};
use myrtio_engine::session::{
    InboundHandler, MessageId, SessionConfig, SessionTransport, TransportFault,
};
use myrtio_mqtt::QoS;

pub const HUB_HOST: &str = "demo-hub.azure-devices.net";
pub const DEVICE_ID: &str = "channels-01";
pub const SAS_TOKEN: &str = "SharedAccessSignature sr=demo-hub.azure-devices.net%2Fdevices%2Fchannels-01&sig=c2lnbmF0dXJl%3D&se=1767225600";

pub fn session_config() -> SessionConfig {
    SessionConfig::new(HUB_HOST, DEVICE_ID, SAS_TOKEN).unwrap()
}

// -----------------------------------------------------------------------------
// Output lines
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinFault;

impl digital::Error for PinFault {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// Output pin recording every level written to it
#[derive(Debug, Clone, Default)]
pub struct RecordingPin {
    writes: Arc<Mutex<Vec<bool>>>,
    faulty: Arc<AtomicBool>,
}

impl RecordingPin {
    pub fn writes(&self) -> Vec<bool> {
        self.writes.lock().unwrap().clone()
    }

    pub fn level(&self) -> Option<bool> {
        self.writes.lock().unwrap().last().copied()
    }

    pub fn set_faulty(&self, faulty: bool) {
        self.faulty.store(faulty, Ordering::SeqCst);
    }
}

impl ErrorType for RecordingPin {
    type Error = PinFault;
}

impl OutputPin for RecordingPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.write(false)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.write(true)
    }
}

impl RecordingPin {
    fn write(&self, level: bool) -> Result<(), PinFault> {
        if self.faulty.load(Ordering::SeqCst) {
            return Err(PinFault);
        }
        self.writes.lock().unwrap().push(level);
        Ok(())
    }
}

/// Registry with a recording pin on every channel, pins in wire order
pub fn wired_registry() -> (ChannelRegistry<RecordingPin>, [RecordingPin; 4]) {
    let pins: [RecordingPin; 4] = Default::default();
    let registry = Channel::ALL
        .into_iter()
        .zip(pins.iter().cloned())
        .fold(ChannelRegistry::new(), |registry, (channel, pin)| {
            registry.with_line(channel, pin)
        });
    (registry, pins)
}

// -----------------------------------------------------------------------------
// Link driver
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverCall {
    BringUp { ssid: String, password: String },
    Connect(Duration),
}

#[derive(Debug, Default)]
pub struct MockLinkDriver {
    pub calls: RefCell<Vec<DriverCall>>,
    pub refuse_bring_up: bool,
}

impl MockLinkDriver {
    pub fn calls(&self) -> Vec<DriverCall> {
        self.calls.borrow().clone()
    }

    pub fn connects(&self) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|call| matches!(call, DriverCall::Connect(_)))
            .count()
    }
}

impl LinkDriver for MockLinkDriver {
    type Error = &'static str;

    fn bring_up(&self, credentials: &LinkCredentials<'_>) -> Result<(), Self::Error> {
        if self.refuse_bring_up {
            return Err("radio unavailable");
        }
        self.calls.borrow_mut().push(DriverCall::BringUp {
            ssid: credentials.ssid.to_owned(),
            password: credentials.password.to_owned(),
        });
        Ok(())
    }

    fn connect(&self, delay: Duration) -> Result<(), Self::Error> {
        self.calls.borrow_mut().push(DriverCall::Connect(delay));
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// Session transport
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    Open { host: String, client_id: String },
    Subscribe { filter: String, qos: QoS },
    Publish { topic: String, payload: Vec<u8>, qos: QoS },
}

#[derive(Debug, Default)]
pub struct MockTransport {
    pub calls: RefCell<Vec<TransportCall>>,
    pub next_id: RefCell<u16>,
    pub open_fault: Option<TransportFault>,
    pub publish_fault: Option<TransportFault>,
}

impl MockTransport {
    pub fn calls(&self) -> Vec<TransportCall> {
        self.calls.borrow().clone()
    }

    fn allocate(&self) -> MessageId {
        let mut id = self.next_id.borrow_mut();
        *id += 1;
        MessageId(*id)
    }
}

impl SessionTransport for MockTransport {
    fn open(&self, config: &SessionConfig) -> Result<(), TransportFault> {
        self.calls.borrow_mut().push(TransportCall::Open {
            host: config.host().to_owned(),
            client_id: config.client_id().to_owned(),
        });
        self.open_fault.map_or(Ok(()), Err)
    }

    fn subscribe(&self, filter: &str, qos: QoS) -> Result<MessageId, TransportFault> {
        self.calls.borrow_mut().push(TransportCall::Subscribe {
            filter: filter.to_owned(),
            qos,
        });
        Ok(self.allocate())
    }

    fn publish(&self, topic: &str, payload: &[u8], qos: QoS) -> Result<MessageId, TransportFault> {
        self.calls.borrow_mut().push(TransportCall::Publish {
            topic: topic.to_owned(),
            payload: payload.to_vec(),
            qos,
        });
        match self.publish_fault {
            Some(fault) => Err(fault),
            None => Ok(self.allocate()),
        }
    }
}

/// Handler recording every delivered message
#[derive(Debug, Default)]
pub struct RecordingHandler {
    pub messages: RefCell<Vec<(String, Vec<u8>)>>,
}

impl InboundHandler for RecordingHandler {
    fn on_message(&self, topic: &str, payload: &[u8]) {
        self.messages
            .borrow_mut()
            .push((topic.to_owned(), payload.to_vec()));
    }
}

// -----------------------------------------------------------------------------
// Delay
// -----------------------------------------------------------------------------

/// Delay that returns immediately, counts calls and runs a hook after each.
pub struct CountingDelay<'a> {
    pub calls: u32,
    pub total_ms: u64,
    on_delay: Box<dyn FnMut(u32) + 'a>,
}

impl<'a> CountingDelay<'a> {
    pub fn new() -> Self {
        Self::with_hook(|_| {})
    }

    /// `hook` receives the number of delays taken so far
    pub fn with_hook(hook: impl FnMut(u32) + 'a) -> Self {
        Self {
            calls: 0,
            total_ms: 0,
            on_delay: Box::new(hook),
        }
    }
}

impl DelayNs for CountingDelay<'_> {
    async fn delay_ns(&mut self, _ns: u32) {}

    async fn delay_ms(&mut self, ms: u32) {
        self.calls += 1;
        self.total_ms += u64::from(ms);
        (self.on_delay)(self.calls);
    }
}
