//! Build-time configuration
//!
//! Credentials come from the environment (or `.env`) when the firmware is
//! built; see `build.rs`.

use embassy_time::Duration;

pub struct WifiConfig {
    pub ssid: &'static str,
    pub password: &'static str,
}

pub struct HubConfig {
    /// IoT Hub host name, e.g. `my-hub.azure-devices.net`
    pub host: &'static str,
    pub device_id: &'static str,
    /// Pre-issued `SharedAccessSignature` token
    pub sas_token: &'static str,
}

pub struct DeviceConfig {
    pub hostname: &'static str,
    pub version: &'static str,
}

pub const WIFI: WifiConfig = WifiConfig {
    ssid: env!("WIFI_SSID"),
    password: env!("WIFI_PASSWORD"),
};

pub const HUB: HubConfig = HubConfig {
    host: env!("IOT_HUB_HOST"),
    device_id: env!("DEVICE_ID"),
    sas_token: env!("SAS_TOKEN"),
};

pub const DEVICE: DeviceConfig = DeviceConfig {
    hostname: "myrtio-channels",
    version: env!("BUILD_VERSION"),
};

/// Startup waits: 30 checks, one second apart
pub const STARTUP_ATTEMPTS: u32 = 30;
pub const STARTUP_INTERVAL: Duration = Duration::from_secs(1);

pub const MQTT_KEEP_ALIVE: Duration = Duration::from_secs(60);
/// Pause between session reconnect attempts
pub const SESSION_RETRY_DELAY: Duration = Duration::from_secs(5);
pub const TELEMETRY_PERIOD: Duration = Duration::from_secs(60);

pub const HTTP_PORT: u16 = 80;

/// Output lines of the lighting channels, driven low on creation.
///
/// | Channel   | GPIO |
/// |-----------|------|
/// | `RGB`     | 17   |
/// | `WHITE`   | 16   |
/// | `VERDE`   | 4    |
/// | `FAR_RED` | 19   |
#[macro_export]
macro_rules! channel_lines {
    ($p:expr) => {{
        use esp_hal::gpio::{Level, Output, OutputConfig};
        use myrtio_engine::Channel;
        [
            (Channel::Rgb, Output::new($p.GPIO17, Level::Low, OutputConfig::default())),
            (Channel::White, Output::new($p.GPIO16, Level::Low, OutputConfig::default())),
            (Channel::Verde, Output::new($p.GPIO4, Level::Low, OutputConfig::default())),
            (Channel::FarRed, Output::new($p.GPIO19, Level::Low, OutputConfig::default())),
        ]
    }};
}
