use embassy_time::Ticker;
use myrtio_engine::session::PublishError;
use myrtio_engine::telemetry::{MAX_REPORT_LEN, encode_report};
use myrtio_engine::topic::JSON_PROPERTIES;

use crate::config;
use crate::infrastructure::types::{Registry, Session};

/// Reports the channel states to the hub every telemetry period.
///
/// Ticks while the session is not open are skipped.
#[embassy_executor::task]
pub async fn telemetry_task(registry: &'static Registry, session: &'static Session) {
    let mut ticker = Ticker::every(config::TELEMETRY_PERIOD);
    let mut buf = [0u8; MAX_REPORT_LEN];
    loop {
        ticker.next().await;
        if !session.is_open() {
            continue;
        }

        let len = match encode_report(config::HUB.device_id, &registry.snapshot(), &mut buf) {
            Ok(len) => len,
            Err(e) => {
                log::error!("telemetry: failed to encode report: {:?}", e);
                continue;
            }
        };

        match session.publish(JSON_PROPERTIES, &buf[..len]) {
            Ok(id) => log::debug!("telemetry: report queued as {}", id),
            Err(PublishError::NotOpen) => {}
            Err(e) => log::warn!("telemetry: failed to publish report: {:?}", e),
        }
    }
}
