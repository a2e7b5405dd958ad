//! Integration tests for the link state machine.

mod common;

use core::net::Ipv4Addr;

use common::{DriverCall, MockLinkDriver};
use embassy_time::Duration;
use myrtio_engine::link::{
    ConfigurationError, LinkCredentials, LinkEvent, LinkManager, LinkState, ReconnectPolicy,
};

const CREDENTIALS: LinkCredentials<'static> = LinkCredentials::new("greenhouse", "secret-pass");
const ADDRESS: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 42);

#[test]
fn starts_down() {
    let link = LinkManager::new(MockLinkDriver::default());

    assert_eq!(link.state(), LinkState::Down);
    assert!(!link.is_up());
    assert_eq!(link.address(), None);
}

#[test]
fn start_brings_up_and_connects() {
    let driver = MockLinkDriver::default();
    let link = LinkManager::new(&driver);

    link.start(&CREDENTIALS).unwrap();

    assert_eq!(link.state(), LinkState::Connecting);
    assert_eq!(
        driver.calls(),
        vec![
            DriverCall::BringUp {
                ssid: "greenhouse".into(),
                password: "secret-pass".into()
            },
            DriverCall::Connect(Duration::from_ticks(0)),
        ]
    );
}

#[test]
fn second_start_is_ignored() {
    let driver = MockLinkDriver::default();
    let link = LinkManager::new(&driver);

    link.start(&CREDENTIALS).unwrap();
    link.start(&CREDENTIALS).unwrap();

    assert_eq!(driver.calls().len(), 2);
}

#[test]
fn got_ip_marks_link_up() {
    let link = LinkManager::new(MockLinkDriver::default());
    link.start(&CREDENTIALS).unwrap();

    link.dispatch(LinkEvent::GotIp(ADDRESS));

    assert!(link.is_up());
    assert_eq!(link.address(), Some(ADDRESS));
}

#[test]
fn disconnect_issues_new_attempt() {
    let driver = MockLinkDriver::default();
    let link = LinkManager::new(&driver);
    link.start(&CREDENTIALS).unwrap();
    link.dispatch(LinkEvent::GotIp(ADDRESS));

    link.dispatch(LinkEvent::Disconnected);

    assert_eq!(link.state(), LinkState::Connecting);
    assert_eq!(link.address(), None);
    assert_eq!(driver.connects(), 2);
    assert_eq!(link.reconnects(), 1);
}

#[test]
fn failed_attempts_keep_retrying() {
    let driver = MockLinkDriver::default();
    let link = LinkManager::new(&driver);
    link.start(&CREDENTIALS).unwrap();

    for _ in 0..5 {
        link.dispatch(LinkEvent::Disconnected);
    }

    assert_eq!(link.state(), LinkState::Connecting);
    assert_eq!(driver.connects(), 6);
    assert_eq!(link.reconnects(), 5);
}

#[test]
fn disconnect_before_start_is_ignored() {
    let driver = MockLinkDriver::default();
    let link = LinkManager::new(&driver);

    link.dispatch(LinkEvent::Disconnected);

    assert_eq!(link.state(), LinkState::Down);
    assert!(driver.calls().is_empty());
}

#[test]
fn lost_lease_drops_back_to_connecting() {
    let driver = MockLinkDriver::default();
    let link = LinkManager::new(&driver);
    link.start(&CREDENTIALS).unwrap();
    link.dispatch(LinkEvent::GotIp(ADDRESS));

    link.dispatch(LinkEvent::LostIp);

    assert_eq!(link.state(), LinkState::Connecting);
    assert_eq!(link.address(), None);
    // The association is kept, so no new attempt is issued
    assert_eq!(driver.connects(), 1);
}

struct LinearBackoff;

impl ReconnectPolicy for LinearBackoff {
    fn delay(&self, attempt: u32) -> Duration {
        Duration::from_secs(u64::from(attempt))
    }
}

#[test]
fn policy_paces_attempts_and_resets_when_up() {
    let driver = MockLinkDriver::default();
    let link = LinkManager::with_policy(&driver, LinearBackoff);
    link.start(&CREDENTIALS).unwrap();

    link.dispatch(LinkEvent::Disconnected);
    link.dispatch(LinkEvent::Disconnected);
    link.dispatch(LinkEvent::GotIp(ADDRESS));
    link.dispatch(LinkEvent::Disconnected);

    let delays: Vec<_> = driver
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            DriverCall::Connect(delay) => Some(delay),
            DriverCall::BringUp { .. } => None,
        })
        .collect();
    assert_eq!(
        delays,
        vec![
            Duration::from_ticks(0),
            Duration::from_secs(1),
            Duration::from_secs(2),
            Duration::from_secs(1),
        ]
    );
}

#[test]
fn rejects_invalid_credentials() {
    let driver = MockLinkDriver::default();
    let link = LinkManager::new(&driver);

    assert_eq!(
        link.start(&LinkCredentials::new("", "secret-pass")),
        Err(ConfigurationError::EmptySsid)
    );
    assert_eq!(
        link.start(&LinkCredentials::new(&"x".repeat(33), "secret-pass")),
        Err(ConfigurationError::SsidTooLong)
    );
    assert_eq!(
        link.start(&LinkCredentials::new("greenhouse", "short")),
        Err(ConfigurationError::InvalidPassword)
    );
    assert!(driver.calls().is_empty());
    assert_eq!(link.state(), LinkState::Down);
}

#[test]
fn open_network_needs_no_password() {
    let link = LinkManager::new(MockLinkDriver::default());

    assert_eq!(link.start(&LinkCredentials::new("cafe", "")), Ok(()));
}

#[test]
fn refused_bring_up_is_a_configuration_error() {
    let driver = MockLinkDriver {
        refuse_bring_up: true,
        ..MockLinkDriver::default()
    };
    let link = LinkManager::new(&driver);

    assert_eq!(link.start(&CREDENTIALS), Err(ConfigurationError::BringUp));
    assert_eq!(link.state(), LinkState::Down);
}

#[test]
fn radio_failure_stops_reconnecting() {
    let driver = MockLinkDriver::default();
    let link = LinkManager::new(&driver);
    link.start(&CREDENTIALS).unwrap();

    link.dispatch(LinkEvent::RadioFailed);
    link.dispatch(LinkEvent::Disconnected);

    assert_eq!(link.state(), LinkState::Failed);
    assert!(link.is_failed());
    assert!(!link.is_up());
    assert_eq!(driver.connects(), 1);
    assert_eq!(link.reconnects(), 0);
}
