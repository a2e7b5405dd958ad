//! MQTT side of the session manager
//!
//! [`EspSessionTransport`] hands requests to the session task through static
//! queues and allocates the message ids the task later reports back.

use core::cell::Cell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use heapless::{String, Vec};
use myrtio_engine::session::{MessageId, SessionConfig, SessionTransport, TransportFault};
use myrtio_engine::topic::MAX_TOPIC_LEN;
use myrtio_mqtt::QoS;
use myrtio_mqtt::util::next_packet_id;

const OUTBOX_DEPTH: usize = 4;
const MAX_PAYLOAD_LEN: usize = 256;

/// Request queued for the session task
#[derive(Debug, Clone)]
pub(crate) enum OutboundRequest {
    Subscribe {
        id: MessageId,
        filter: String<MAX_TOPIC_LEN>,
        qos: QoS,
    },
    Publish {
        id: MessageId,
        topic: String<MAX_TOPIC_LEN>,
        payload: Vec<u8, MAX_PAYLOAD_LEN>,
        qos: QoS,
    },
}

pub(crate) type Outbox = Channel<CriticalSectionRawMutex, OutboundRequest, OUTBOX_DEPTH>;

pub(crate) static OUTBOX: Outbox = Channel::new();
pub(crate) static SESSION_OPEN: Signal<CriticalSectionRawMutex, SessionConfig> = Signal::new();

static MESSAGE_IDS: Mutex<CriticalSectionRawMutex, Cell<u16>> = Mutex::new(Cell::new(0));

fn next_message_id() -> MessageId {
    MESSAGE_IDS.lock(|id| {
        let next = next_packet_id(id.get());
        id.set(next);
        MessageId(next)
    })
}

#[derive(Debug, Default)]
pub struct EspSessionTransport;

impl SessionTransport for EspSessionTransport {
    fn open(&self, config: &SessionConfig) -> Result<(), TransportFault> {
        SESSION_OPEN.signal(config.clone());
        Ok(())
    }

    fn subscribe(&self, filter: &str, qos: QoS) -> Result<MessageId, TransportFault> {
        let mut owned = String::new();
        owned.push_str(filter).map_err(|()| TransportFault::Protocol)?;

        let id = next_message_id();
        OUTBOX
            .try_send(OutboundRequest::Subscribe {
                id,
                filter: owned,
                qos,
            })
            .map_err(|_| TransportFault::Busy)?;
        Ok(id)
    }

    fn publish(&self, topic: &str, payload: &[u8], qos: QoS) -> Result<MessageId, TransportFault> {
        let mut owned_topic = String::new();
        owned_topic
            .push_str(topic)
            .map_err(|()| TransportFault::Protocol)?;
        let owned_payload = Vec::from_slice(payload).map_err(|()| TransportFault::Protocol)?;

        let id = next_message_id();
        OUTBOX
            .try_send(OutboundRequest::Publish {
                id,
                topic: owned_topic,
                payload: owned_payload,
                qos,
            })
            .map_err(|_| TransportFault::Busy)?;
        Ok(id)
    }
}
