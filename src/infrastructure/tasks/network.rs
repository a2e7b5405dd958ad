use embassy_net::{Runner, Stack};
use embassy_time::{Duration, Timer};
use esp_radio::wifi::{
    AuthMethod, ClientConfig, ModeConfig, WifiController, WifiDevice, WifiError, WifiEvent,
};
use myrtio_engine::link::LinkEvent;

use crate::infrastructure::drivers::{LinkRequest, link_requests};
use crate::infrastructure::types::Link;

/// Pause after a failed association before reporting it
const CONNECT_RETRY_PAUSE: Duration = Duration::from_secs(5);

/// Background task owning the `WiFi` controller.
///
/// Executes the requests queued by the link manager and reports every lost
/// association or failed attempt back as [`LinkEvent::Disconnected`], which
/// makes the manager queue the next attempt. A station that cannot be
/// started is reported as [`LinkEvent::RadioFailed`] and later connect
/// requests are dropped.
#[embassy_executor::task]
pub async fn wifi_link_task(mut controller: WifiController<'static>, link: &'static Link) {
    let requests = link_requests();
    let mut station_started = false;
    loop {
        match requests.receive().await {
            LinkRequest::Configure { ssid, password } => {
                match start_station(&mut controller, &ssid, &password).await {
                    Ok(()) => station_started = true,
                    Err(e) => {
                        log::error!("network: failed to start station: {:?}", e);
                        link.dispatch(LinkEvent::RadioFailed);
                    }
                }
            }
            LinkRequest::Connect(_) if !station_started => {
                log::warn!("network: station not started, connect dropped");
            }
            LinkRequest::Connect(delay) => {
                if delay.as_ticks() > 0 {
                    Timer::after(delay).await;
                }
                log::info!("network: connecting");
                match controller.connect_async().await {
                    Ok(()) => {
                        log::info!("network: associated");
                        controller.wait_for_event(WifiEvent::StaDisconnected).await;
                        log::warn!("network: station disconnected");
                    }
                    Err(e) => {
                        log::warn!("network: error connecting: {:?}", e);
                        Timer::after(CONNECT_RETRY_PAUSE).await;
                    }
                }
                link.dispatch(LinkEvent::Disconnected);
            }
        }
    }
}

async fn start_station(
    controller: &mut WifiController<'static>,
    ssid: &str,
    password: &str,
) -> Result<(), WifiError> {
    let client_config = if password.is_empty() {
        ClientConfig::default()
            .with_ssid(ssid.into())
            .with_auth_method(AuthMethod::None)
    } else {
        ClientConfig::default()
            .with_ssid(ssid.into())
            .with_password(password.into())
    };
    controller.set_config(&ModeConfig::Client(client_config))?;
    controller.start_async().await
}

/// Reports DHCP lease changes to the link manager
#[embassy_executor::task]
pub async fn ip_watch_task(stack: Stack<'static>, link: &'static Link) {
    loop {
        stack.wait_config_up().await;
        if let Some(config) = stack.config_v4() {
            link.dispatch(LinkEvent::GotIp(config.address.address()));
        }
        stack.wait_config_down().await;
        link.dispatch(LinkEvent::LostIp);
    }
}

/// Background task for running the network stack
#[embassy_executor::task]
pub async fn network_runner_task(mut runner: Runner<'static, WifiDevice<'static>>) {
    runner.run().await;
}
