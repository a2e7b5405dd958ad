//! Azure IoT Hub MQTT wire conventions and topic filter matching

use core::fmt::{self, Write};

use heapless::String;

/// IoT Hub protocol version announced in the session username
pub const API_VERSION: &str = "2021-04-12";

/// Buffer size for topics and filters
pub const MAX_TOPIC_LEN: usize = 128;

/// Buffer size for the session username
pub const MAX_USERNAME_LEN: usize = 160;

/// Property bag appended to telemetry topics carrying JSON bodies
pub const JSON_PROPERTIES: &str = "$.ct=application%2Fjson&$.ce=utf-8";

/// Device-to-cloud telemetry topic
///
/// Format: `devices/{device_id}/messages/events/`. Fails when the topic
/// does not fit in `N` bytes.
pub fn telemetry_topic<const N: usize>(device_id: &str) -> Result<String<N>, fmt::Error> {
    let mut topic = String::new();
    write!(topic, "devices/{}/messages/events/", device_id)?;
    Ok(topic)
}

/// Cloud-to-device command subscription filter
///
/// Format: `devices/{device_id}/messages/devicebound/#`
pub fn command_filter<const N: usize>(device_id: &str) -> Result<String<N>, fmt::Error> {
    let mut filter = String::new();
    write!(filter, "devices/{}/messages/devicebound/#", device_id)?;
    Ok(filter)
}

/// Session username
///
/// Format: `{hub_host}/{device_id}/?api-version=2021-04-12`
pub fn username<const N: usize>(hub_host: &str, device_id: &str) -> Result<String<N>, fmt::Error> {
    let mut username = String::new();
    write!(username, "{}/{}/?api-version={}", hub_host, device_id, API_VERSION)?;
    Ok(username)
}

/// Check a topic name against an MQTT subscription filter.
///
/// `+` matches exactly one level, a trailing `#` matches the parent level and
/// everything below it. Wildcards in the first level never match topics that
/// start with `$`.
pub fn matches_filter(filter: &str, topic: &str) -> bool {
    if topic.starts_with('$') && (filter.starts_with('+') || filter.starts_with('#')) {
        return false;
    }

    let mut filter_levels = filter.split('/');
    let mut topic_levels = topic.split('/');

    loop {
        match (filter_levels.next(), topic_levels.next()) {
            (Some("#"), _) => return filter_levels.next().is_none(),
            (Some("+"), Some(_)) => {}
            (Some(expected), Some(level)) if expected == level => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}
