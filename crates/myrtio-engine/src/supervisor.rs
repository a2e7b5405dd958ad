//! Application Supervisor
//!
//! Drives the startup sequence `Init → LinkWait → SessionWait → Ready`. Both
//! waits are bounded by the [`StartupPolicy`]; running out of attempts ends in
//! `Failed` and the caller is expected to halt.

use core::cell::Cell;
use core::fmt;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::Duration;
use embedded_hal::digital::OutputPin;
use embedded_hal_async::delay::DelayNs;

use crate::channels::ChannelRegistry;
use crate::link::{self, LinkCredentials, LinkDriver, LinkManager, ReconnectPolicy};
use crate::session::{self, InboundHandler, SessionConfig, SessionManager, SessionTransport, TransportFault};

/// Bounds of the startup waits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartupPolicy {
    /// Number of sleeps before a wait gives up
    pub attempts: u32,
    /// Length of one sleep
    pub interval: Duration,
}

impl StartupPolicy {
    pub const fn new(attempts: u32, interval: Duration) -> Self {
        Self { attempts, interval }
    }
}

impl Default for StartupPolicy {
    fn default() -> Self {
        Self::new(30, Duration::from_secs(1))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorPhase {
    Init,
    LinkWait,
    SessionWait,
    Ready,
    Failed,
}

/// Fatal startup failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupError {
    /// Link credentials were rejected
    Link(link::ConfigurationError),
    /// Session configuration was rejected
    Session(session::ConfigurationError),
    /// The transport refused to open the session
    SessionOpen(TransportFault),
    /// The link driver could not start the radio
    RadioFailed,
    /// No IP address within the startup window
    LinkTimeout,
    /// No open session within the startup window
    SessionTimeout,
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartupError::Link(e) => write!(f, "link configuration error: {}", e),
            StartupError::Session(e) => write!(f, "session configuration error: {}", e),
            StartupError::SessionOpen(e) => write!(f, "session open failed: {}", e),
            StartupError::RadioFailed => f.write_str("radio failed to start"),
            StartupError::LinkTimeout => f.write_str("timed out waiting for the link"),
            StartupError::SessionTimeout => f.write_str("timed out waiting for the session"),
        }
    }
}

impl From<link::ConfigurationError> for StartupError {
    fn from(e: link::ConfigurationError) -> Self {
        StartupError::Link(e)
    }
}

impl From<session::ConfigurationError> for StartupError {
    fn from(e: session::ConfigurationError) -> Self {
        StartupError::Session(e)
    }
}

/// Poll `ready` until it holds, sleeping `policy.interval` between checks.
///
/// Gives up after `policy.attempts` sleeps. Returns whether `ready` held.
pub async fn wait_until<D: DelayNs>(
    delay: &mut D,
    policy: &StartupPolicy,
    mut ready: impl FnMut() -> bool,
) -> bool {
    for _ in 0..policy.attempts {
        if ready() {
            return true;
        }
        delay.delay_ms(interval_ms(policy.interval)).await;
    }
    ready()
}

fn interval_ms(interval: Duration) -> u32 {
    u32::try_from(interval.as_millis()).unwrap_or(u32::MAX)
}

/// Startup sequencer over the three managers
pub struct Supervisor<'a, P, D, R, T, H>
where
    P: OutputPin,
    D: LinkDriver,
    R: ReconnectPolicy,
    T: SessionTransport,
    H: InboundHandler,
{
    registry: &'a ChannelRegistry<P>,
    link: &'a LinkManager<D, R>,
    session: &'a SessionManager<T, H>,
    policy: StartupPolicy,
    phase: Mutex<CriticalSectionRawMutex, Cell<SupervisorPhase>>,
}

impl<'a, P, D, R, T, H> Supervisor<'a, P, D, R, T, H>
where
    P: OutputPin,
    D: LinkDriver,
    R: ReconnectPolicy,
    T: SessionTransport,
    H: InboundHandler,
{
    pub const fn new(
        registry: &'a ChannelRegistry<P>,
        link: &'a LinkManager<D, R>,
        session: &'a SessionManager<T, H>,
        policy: StartupPolicy,
    ) -> Self {
        Self {
            registry,
            link,
            session,
            policy,
            phase: Mutex::new(Cell::new(SupervisorPhase::Init)),
        }
    }

    /// Run the startup sequence until `Ready` or `Failed`
    pub async fn start<Dl: DelayNs>(
        &self,
        delay: &mut Dl,
        credentials: &LinkCredentials<'_>,
        config: &SessionConfig,
    ) -> Result<(), StartupError> {
        self.set_phase(SupervisorPhase::Init);
        self.registry.initialize();
        self.link.start(credentials).map_err(|e| self.fail(e.into()))?;

        self.set_phase(SupervisorPhase::LinkWait);
        log::info!("supervisor: waiting for the link");
        let settled = wait_until(delay, &self.policy, || {
            self.link.is_up() || self.link.is_failed()
        })
        .await;
        if self.link.is_failed() {
            return Err(self.fail(StartupError::RadioFailed));
        }
        if !settled {
            return Err(self.fail(StartupError::LinkTimeout));
        }
        if let Some(address) = self.link.address() {
            log::info!("supervisor: link is up at {}", address);
        }

        self.set_phase(SupervisorPhase::SessionWait);
        self.session
            .start(config)
            .map_err(|e| self.fail(StartupError::SessionOpen(e)))?;
        log::info!("supervisor: waiting for the session");
        if !wait_until(delay, &self.policy, || self.session.is_open()).await {
            if let Some(cause) = self.session.last_fault() {
                log::error!("supervisor: last session fault: {}", cause);
            }
            return Err(self.fail(StartupError::SessionTimeout));
        }

        self.set_phase(SupervisorPhase::Ready);
        log::info!("supervisor: ready");
        Ok(())
    }

    /// Keep the process alive once `Ready`
    pub async fn idle<Dl: DelayNs>(&self, delay: &mut Dl) -> ! {
        loop {
            delay.delay_ms(interval_ms(self.policy.interval)).await;
        }
    }

    pub fn phase(&self) -> SupervisorPhase {
        self.phase.lock(Cell::get)
    }

    fn fail(&self, error: StartupError) -> StartupError {
        log::error!("supervisor: startup failed: {}", error);
        self.set_phase(SupervisorPhase::Failed);
        error
    }

    fn set_phase(&self, phase: SupervisorPhase) {
        self.phase.lock(|cell| cell.set(phase));
    }
}
