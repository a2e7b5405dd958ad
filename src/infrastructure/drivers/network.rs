use core::str::FromStr;

use embassy_net::dns::DnsQueryType;
use embassy_net::{DhcpConfig, IpAddress, Ipv4Address, Runner, Stack, StackResources};
use esp_hal::peripherals::WIFI;
use esp_radio::wifi::{self, WifiController, WifiDevice};
use heapless::String;

use super::random::get_seed;
use crate::{config, mk_static};

/// Sockets: MQTT, HTTP admin, DNS and DHCP, plus slack
const SOCKET_COUNT: usize = 6;

/// Station interface and the network stack running on it
pub struct NetworkParts {
    pub stack: Stack<'static>,
    /// Must be driven by `network_runner_task`
    pub runner: Runner<'static, WifiDevice<'static>>,
    /// Must be owned by `wifi_link_task`
    pub controller: WifiController<'static>,
}

/// Create the station interface and a DHCP-configured stack on top of it.
///
/// The radio is not started here; the link task does that on the first
/// request from the link manager.
pub fn init_network_stack(wifi_peripheral: WIFI<'static>) -> NetworkParts {
    let radio = &*mk_static!(
        esp_radio::Controller<'static>,
        esp_radio::init().expect("Failed to initialize radio")
    );
    let (controller, interfaces) = wifi::new(radio, wifi_peripheral, wifi::Config::default())
        .expect("Failed to create Wi-Fi interface");

    let mut dhcp = DhcpConfig::default();
    dhcp.hostname = Some(String::from_str(config::DEVICE.hostname).expect("Hostname too long"));

    let resources = mk_static!(StackResources<SOCKET_COUNT>, StackResources::new());
    let (stack, runner) = embassy_net::new(
        interfaces.sta,
        embassy_net::Config::dhcpv4(dhcp),
        resources,
        get_seed(),
    );

    NetworkParts {
        stack,
        runner,
        controller,
    }
}

/// Resolve `host` to its first IPv4 address. IP literals skip the lookup.
pub(crate) async fn resolve_host(stack: Stack<'static>, host: &str) -> Option<IpAddress> {
    if let Ok(address) = host.parse::<Ipv4Address>() {
        return Some(IpAddress::Ipv4(address));
    }

    match stack.dns_query(host, DnsQueryType::A).await {
        Ok(addresses) => addresses.first().copied(),
        Err(e) => {
            log::warn!("dns: lookup of {} failed: {:?}", host, e);
            None
        }
    }
}
