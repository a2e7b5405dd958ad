//! Wi-Fi side of the link manager
//!
//! [`EspLinkDriver`] only queues requests; the link task owns the
//! `WifiController` and executes them.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, Receiver};
use embassy_time::Duration;
use heapless::String;
use myrtio_engine::link::{LinkCredentials, LinkDriver, MAX_PASSWORD_LEN, MAX_SSID_LEN};

const REQUEST_QUEUE_DEPTH: usize = 2;

/// Work item for the link task
#[derive(Debug, Clone)]
pub enum LinkRequest {
    /// Apply the station configuration and start the radio
    Configure {
        ssid: String<MAX_SSID_LEN>,
        password: String<MAX_PASSWORD_LEN>,
    },
    /// Associate after the delay
    Connect(Duration),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkDriverError {
    /// A request of the same kind is already pending
    QueueFull,
    CredentialsTooLong,
}

static LINK_REQUESTS: Channel<CriticalSectionRawMutex, LinkRequest, REQUEST_QUEUE_DEPTH> =
    Channel::new();

pub(crate) fn link_requests()
-> Receiver<'static, CriticalSectionRawMutex, LinkRequest, REQUEST_QUEUE_DEPTH> {
    LINK_REQUESTS.receiver()
}

#[derive(Debug, Default)]
pub struct EspLinkDriver;

impl LinkDriver for EspLinkDriver {
    type Error = LinkDriverError;

    fn bring_up(&self, credentials: &LinkCredentials<'_>) -> Result<(), Self::Error> {
        let mut ssid = String::new();
        ssid.push_str(credentials.ssid)
            .map_err(|()| LinkDriverError::CredentialsTooLong)?;
        let mut password = String::new();
        password
            .push_str(credentials.password)
            .map_err(|()| LinkDriverError::CredentialsTooLong)?;

        LINK_REQUESTS
            .try_send(LinkRequest::Configure { ssid, password })
            .map_err(|_| LinkDriverError::QueueFull)
    }

    fn connect(&self, delay: Duration) -> Result<(), Self::Error> {
        LINK_REQUESTS
            .try_send(LinkRequest::Connect(delay))
            .map_err(|_| LinkDriverError::QueueFull)
    }
}
