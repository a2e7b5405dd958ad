//! Admin HTTP request handling
//!
//! The `/led` endpoint of the local admin page drives channels through the same
//! registry as remote commands.

use core::fmt;

use embedded_hal::digital::OutputPin;

use crate::channels::{Channel, ChannelError, ChannelRegistry};
use crate::command::Action;

/// Outcome of a `/led` request, rendered as the plain text response body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminReply {
    Applied { channel: Channel, action: Action },
    MissingState,
    UnknownChannel,
    InvalidState,
    Failed(ChannelError),
}

impl AdminReply {
    pub fn is_applied(&self) -> bool {
        matches!(self, AdminReply::Applied { .. })
    }
}

impl fmt::Display for AdminReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdminReply::Applied { channel, action } => {
                write!(f, "{} turned {}", channel, action.as_str())
            }
            AdminReply::MissingState => f.write_str("Parameter 'state' not found"),
            AdminReply::UnknownChannel => {
                f.write_str("Unknown channel. Use RGB, WHITE, VERDE or FAR_RED")
            }
            AdminReply::InvalidState => f.write_str("Invalid command. Use ON or OFF"),
            AdminReply::Failed(e) => write!(f, "Error: {}", e),
        }
    }
}

/// Value of `key` in a `k=v&k=v` query string, without URL decoding
pub fn query_param<'q>(query: &'q str, key: &str) -> Option<&'q str> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find_map(|(name, value)| (name == key).then_some(value))
}

/// Handle `/led?channel=<NAME>&state=<ON|OFF>`.
///
/// Without `channel` the default channel is driven.
pub fn handle_led_request<P: OutputPin>(registry: &ChannelRegistry<P>, query: &str) -> AdminReply {
    let Some(state) = query_param(query, "state") else {
        return AdminReply::MissingState;
    };

    let channel = match query_param(query, "channel") {
        Some(name) => match Channel::from_name(name) {
            Some(channel) => channel,
            None => return AdminReply::UnknownChannel,
        },
        None => Channel::DEFAULT,
    };

    let Some(action) = Action::from_token(state) else {
        return AdminReply::InvalidState;
    };

    match registry.set(channel, action.is_on()) {
        Ok(()) => {
            log::info!("admin: {} turned {} via web", channel, action.as_str());
            AdminReply::Applied { channel, action }
        }
        Err(e) => {
            log::error!("admin: {}", e);
            AdminReply::Failed(e)
        }
    }
}
