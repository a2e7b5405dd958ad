//! Channel state telemetry report

use serde::Serialize;

use crate::channels::{Channel, ChannelSnapshot};

/// Buffer size for an encoded report
pub const MAX_REPORT_LEN: usize = 192;

#[derive(Debug, Serialize)]
pub struct StateReport<'a> {
    pub device_id: &'a str,
    #[serde(rename = "RGB")]
    pub rgb: bool,
    #[serde(rename = "WHITE")]
    pub white: bool,
    #[serde(rename = "VERDE")]
    pub verde: bool,
    #[serde(rename = "FAR_RED")]
    pub far_red: bool,
}

impl<'a> StateReport<'a> {
    pub fn new(device_id: &'a str, snapshot: &ChannelSnapshot) -> Self {
        Self {
            device_id,
            rgb: snapshot.get(Channel::Rgb),
            white: snapshot.get(Channel::White),
            verde: snapshot.get(Channel::Verde),
            far_red: snapshot.get(Channel::FarRed),
        }
    }
}

/// Serialize the report of `snapshot` as JSON into `buf`.
///
/// Returns the number of bytes written.
pub fn encode_report(
    device_id: &str,
    snapshot: &ChannelSnapshot,
    buf: &mut [u8],
) -> Result<usize, serde_json_core::ser::Error> {
    serde_json_core::to_slice(&StateReport::new(device_id, snapshot), buf)
}
