//! Link Manager
//!
//! Owns the state of the wireless link. The platform driver reports what
//! happens to the link through [`LinkManager::dispatch`]; the manager decides
//! when the next connect attempt is issued.
//!
//! ```text
//!   Down ──start()──► Connecting ──GotIp──► Up
//!    ▲                    ▲                  │
//!    └────Disconnected────┴──────────────────┘
//! ```
//!
//! A disconnect always re-enters `Connecting` with a new attempt, paced by the
//! [`ReconnectPolicy`]. A radio that cannot be started ends in the terminal
//! `Failed` state.

use core::cell::Cell;
use core::fmt;
use core::net::Ipv4Addr;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::Duration;

/// Maximum SSID length in bytes
pub const MAX_SSID_LEN: usize = 32;
/// WPA2 passphrase length bounds in bytes
pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_PASSWORD_LEN: usize = 64;

/// Link state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Down,
    Connecting,
    Up,
    /// The radio could not be started; no further attempts are made
    Failed,
}

/// Notification from the link driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    /// An IPv4 address was acquired
    GotIp(Ipv4Addr),
    /// The station lost its association, or a connect attempt failed
    Disconnected,
    /// The address lease was lost while the association is kept
    LostIp,
    /// The driver could not start the radio with the given credentials
    RadioFailed,
}

/// Network credentials handed to the link driver
#[derive(Debug, Clone, Copy)]
pub struct LinkCredentials<'a> {
    pub ssid: &'a str,
    pub password: &'a str,
}

impl<'a> LinkCredentials<'a> {
    pub const fn new(ssid: &'a str, password: &'a str) -> Self {
        Self { ssid, password }
    }

    /// Check the credentials against the station limits.
    ///
    /// An empty password selects an open network.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.ssid.is_empty() {
            return Err(ConfigurationError::EmptySsid);
        }
        if self.ssid.len() > MAX_SSID_LEN {
            return Err(ConfigurationError::SsidTooLong);
        }
        let password_len = self.password.len();
        if password_len != 0 && !(MIN_PASSWORD_LEN..=MAX_PASSWORD_LEN).contains(&password_len) {
            return Err(ConfigurationError::InvalidPassword);
        }
        Ok(())
    }
}

/// Unrecoverable link configuration error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigurationError {
    EmptySsid,
    SsidTooLong,
    InvalidPassword,
    /// The driver refused the one-time bring-up
    BringUp,
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigurationError::EmptySsid => f.write_str("SSID is empty"),
            ConfigurationError::SsidTooLong => {
                write!(f, "SSID is longer than {} bytes", MAX_SSID_LEN)
            }
            ConfigurationError::InvalidPassword => write!(
                f,
                "password must be empty or {}..={} bytes",
                MIN_PASSWORD_LEN, MAX_PASSWORD_LEN
            ),
            ConfigurationError::BringUp => f.write_str("link bring-up failed"),
        }
    }
}

/// Platform side of the link.
///
/// Both calls are requests: they must return without waiting for the radio.
/// Outcomes come back as [`LinkEvent`]s.
pub trait LinkDriver {
    type Error: fmt::Debug;

    /// One-time bring-up: radio configuration, interface start and event
    /// subscription.
    fn bring_up(&self, credentials: &LinkCredentials<'_>) -> Result<(), Self::Error>;

    /// Issue a connect attempt once `delay` has elapsed.
    fn connect(&self, delay: Duration) -> Result<(), Self::Error>;
}

impl<D: LinkDriver + ?Sized> LinkDriver for &D {
    type Error = D::Error;

    fn bring_up(&self, credentials: &LinkCredentials<'_>) -> Result<(), Self::Error> {
        (**self).bring_up(credentials)
    }

    fn connect(&self, delay: Duration) -> Result<(), Self::Error> {
        (**self).connect(delay)
    }
}

/// Pacing of reconnect attempts after a disconnect
pub trait ReconnectPolicy {
    /// Delay before reconnect attempt `attempt`, counted from 1 since the link
    /// was last up.
    fn delay(&self, attempt: u32) -> Duration;
}

/// Reconnect right away on every disconnect.
///
/// The driver still paces attempts on its own.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImmediateReconnect;

impl ReconnectPolicy for ImmediateReconnect {
    fn delay(&self, _attempt: u32) -> Duration {
        Duration::from_ticks(0)
    }
}

#[derive(Debug, Clone, Copy)]
struct LinkStatus {
    state: LinkState,
    address: Option<Ipv4Addr>,
    started: bool,
    attempts: u32,
    reconnects: u32,
}

/// Owner of the link state machine
pub struct LinkManager<D: LinkDriver, R: ReconnectPolicy = ImmediateReconnect> {
    driver: D,
    policy: R,
    status: Mutex<CriticalSectionRawMutex, Cell<LinkStatus>>,
}

impl<D: LinkDriver> LinkManager<D, ImmediateReconnect> {
    pub const fn new(driver: D) -> Self {
        Self::with_policy(driver, ImmediateReconnect)
    }
}

impl<D: LinkDriver, R: ReconnectPolicy> LinkManager<D, R> {
    pub const fn with_policy(driver: D, policy: R) -> Self {
        Self {
            driver,
            policy,
            status: Mutex::new(Cell::new(LinkStatus {
                state: LinkState::Down,
                address: None,
                started: false,
                attempts: 0,
                reconnects: 0,
            })),
        }
    }

    /// Bring the link up and issue the first connect attempt.
    ///
    /// Only configuration problems are reported; connect failures are retried
    /// through [`dispatch`](Self::dispatch) forever.
    pub fn start(&self, credentials: &LinkCredentials<'_>) -> Result<(), ConfigurationError> {
        credentials.validate()?;

        if self.read().started {
            log::warn!("link: already started");
            return Ok(());
        }

        self.driver.bring_up(credentials).map_err(|e| {
            log::error!("link: bring-up failed: {:?}", e);
            ConfigurationError::BringUp
        })?;

        self.update(|status| {
            status.started = true;
            status.state = LinkState::Connecting;
        });
        log::info!("link: connecting to '{}'", credentials.ssid);

        self.driver.connect(Duration::from_ticks(0)).map_err(|e| {
            log::error!("link: first connect request failed: {:?}", e);
            ConfigurationError::BringUp
        })
    }

    /// Feed a driver notification into the state machine
    pub fn dispatch(&self, event: LinkEvent) {
        match event {
            LinkEvent::GotIp(address) => {
                self.update(|status| {
                    status.state = LinkState::Up;
                    status.address = Some(address);
                    status.attempts = 0;
                });
                log::info!("link: got IP address {}", address);
            }
            LinkEvent::LostIp => {
                let was_up = self.update(|status| {
                    let was_up = status.state == LinkState::Up;
                    if was_up {
                        status.state = LinkState::Connecting;
                        status.address = None;
                    }
                    was_up
                });
                if was_up {
                    log::warn!("link: address lease lost");
                }
            }
            LinkEvent::RadioFailed => {
                self.update(|status| {
                    status.state = LinkState::Failed;
                    status.address = None;
                });
                log::error!("link: radio failed to start, giving up");
            }
            LinkEvent::Disconnected => self.reconnect(),
        }
    }

    fn reconnect(&self) {
        let attempt = self.update(|status| {
            if status.state == LinkState::Failed {
                return None;
            }
            status.state = LinkState::Down;
            status.address = None;
            if !status.started {
                return None;
            }
            status.attempts = status.attempts.saturating_add(1);
            status.reconnects = status.reconnects.saturating_add(1);
            status.state = LinkState::Connecting;
            Some(status.attempts)
        });

        let Some(attempt) = attempt else {
            log::debug!("link: disconnect ignored while stopped");
            return;
        };

        let delay = self.policy.delay(attempt);
        log::info!(
            "link: disconnected, reconnect attempt {} in {} ms",
            attempt,
            delay.as_millis()
        );
        if let Err(e) = self.driver.connect(delay) {
            // A connect request is already pending in the driver
            log::warn!("link: connect request not accepted: {:?}", e);
        }
    }

    /// Current link state
    pub fn state(&self) -> LinkState {
        self.read().state
    }

    /// Whether the link carries an IP address
    pub fn is_up(&self) -> bool {
        self.state() == LinkState::Up
    }

    /// Whether the radio failed to start
    pub fn is_failed(&self) -> bool {
        self.state() == LinkState::Failed
    }

    /// Last acquired address, while the link is up
    pub fn address(&self) -> Option<Ipv4Addr> {
        self.read().address
    }

    /// Number of reconnect attempts issued since start
    pub fn reconnects(&self) -> u32 {
        self.read().reconnects
    }

    fn read(&self) -> LinkStatus {
        self.status.lock(Cell::get)
    }

    fn update<T>(&self, f: impl FnOnce(&mut LinkStatus) -> T) -> T {
        self.status.lock(|cell| {
            let mut status = cell.get();
            let result = f(&mut status);
            cell.set(status);
            result
        })
    }
}
