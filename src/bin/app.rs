#![no_std]
#![no_main]

use embassy_executor::Spawner;

use esp_alloc as _;
use esp_backtrace as _;
use esp_hal::{clock::CpuClock, timer::timg::TimerGroup};
use esp_println::println;

use myrtio_engine::link::LinkCredentials;
use myrtio_engine::session::SessionConfig;
use myrtio_engine::{
    ChannelRegistry, CommandProcessor, LinkManager, SessionManager, StartupPolicy, Supervisor,
};
use myrtio_esp_channels::config;
use myrtio_esp_channels::controllers::AdminHttpController;
use myrtio_esp_channels::infrastructure::drivers::{
    EspLinkDriver, EspRng, EspSessionTransport, NetworkParts, init_network_stack,
};
use myrtio_esp_channels::infrastructure::tasks::{
    admin_http_task, ip_watch_task, network_runner_task, session_task, telemetry_task,
    wifi_link_task,
};
use myrtio_esp_channels::infrastructure::types::{Link, Registry, Session};
use myrtio_esp_channels::{channel_lines, mk_static};

esp_bootloader_esp_idf::esp_app_desc!();

#[esp_rtos::main]
async fn main(spawner: Spawner) -> ! {
    esp_println::logger::init_logger_from_env();

    // Initialize hardware
    let hal_config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(hal_config);

    // Allocate heap memory for the radio (64 + 32 KB)
    esp_alloc::heap_allocator!(
        #[unsafe(link_section = ".dram2_uninit")] size: 64 * 1024
    );
    esp_alloc::heap_allocator!(size: 32 * 1024);

    // Start rtos
    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    println!(
        "myrtio-channels {} starting as '{}'",
        config::DEVICE.version,
        config::HUB.device_id
    );

    // Channels and managers
    let registry = &*mk_static!(
        Registry,
        channel_lines!(peripherals)
            .into_iter()
            .fold(ChannelRegistry::new(), |lines, (channel, line)| {
                lines.with_line(channel, line)
            })
    );
    let link = &*mk_static!(Link, LinkManager::new(EspLinkDriver));
    let session = &*mk_static!(
        Session,
        SessionManager::new(EspSessionTransport, CommandProcessor::new(registry))
    );
    let admin = &*mk_static!(AdminHttpController, AdminHttpController::new(registry));

    // Initialize network stack and spawn tasks
    let NetworkParts {
        stack,
        runner,
        controller,
    } = init_network_stack(peripherals.WIFI);
    spawner.spawn(network_runner_task(runner)).ok();
    spawner.spawn(wifi_link_task(controller, link)).ok();
    spawner.spawn(ip_watch_task(stack, link)).ok();
    spawner.spawn(session_task(stack, link, session, EspRng::new())).ok();
    spawner.spawn(admin_http_task(stack, admin)).ok();
    spawner.spawn(telemetry_task(registry, session)).ok();

    let session_config = SessionConfig::new(
        config::HUB.host,
        config::HUB.device_id,
        config::HUB.sas_token,
    )
    .unwrap_or_else(|e| panic!("Invalid hub configuration: {}", e))
    .with_keep_alive(config::MQTT_KEEP_ALIVE);
    let credentials = LinkCredentials::new(config::WIFI.ssid, config::WIFI.password);

    let supervisor = Supervisor::new(
        registry,
        link,
        session,
        StartupPolicy::new(config::STARTUP_ATTEMPTS, config::STARTUP_INTERVAL),
    );
    let mut delay = embassy_time::Delay;
    if let Err(e) = supervisor
        .start(&mut delay, &credentials, &session_config)
        .await
    {
        panic!("Startup failed: {}", e);
    }

    supervisor.idle(&mut delay).await
}
