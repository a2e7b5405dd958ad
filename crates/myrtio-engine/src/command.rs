//! Command Processor
//!
//! Turns raw inbound payloads into [`Command`]s and applies them to the
//! [`ChannelRegistry`]. Two payload shapes are accepted:
//!
//! - `<CHANNEL>:<ON|OFF>`, split at the first `:` only
//! - bare `ON` / `OFF`, applied to [`Channel::DEFAULT`]
//!
//! Anything else is dropped with a logged reason. Bad payloads never change
//! channel state and are never retried.

use core::fmt;

use embedded_hal::digital::OutputPin;

use crate::channels::{Channel, ChannelError, ChannelRegistry};
use crate::session::InboundHandler;

const SEPARATOR: char = ':';

/// Requested channel level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    On,
    Off,
}

impl Action {
    /// Resolve an action token. Only the exact `ON` and `OFF` tokens match.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "ON" => Some(Action::On),
            "OFF" => Some(Action::Off),
            _ => None,
        }
    }

    /// Output level for this action
    pub const fn is_on(self) -> bool {
        matches!(self, Action::On)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Action::On => "ON",
            Action::Off => "OFF",
        }
    }
}

/// A validated instruction to set one channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    pub channel: Channel,
    pub action: Action,
}

impl Command {
    /// Parse a raw payload
    pub fn parse(payload: &[u8]) -> Result<Self, ParseError> {
        let text = core::str::from_utf8(payload).map_err(|_| ParseError::InvalidUtf8)?;
        Self::parse_str(text)
    }

    /// Parse an already decoded payload
    pub fn parse_str(text: &str) -> Result<Self, ParseError> {
        let text = text.trim_end();

        let Some((channel_part, action_part)) = text.split_once(SEPARATOR) else {
            let action = Action::from_token(text).ok_or(ParseError::UnknownAction)?;
            return Ok(Command {
                channel: Channel::DEFAULT,
                action,
            });
        };

        let channel = Channel::from_name(channel_part).ok_or(ParseError::UnknownChannel)?;
        let action = Action::from_token(action_part).ok_or(ParseError::UnknownAction)?;
        Ok(Command { channel, action })
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.channel, self.action.as_str())
    }
}

/// Reason a payload produced no command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    InvalidUtf8,
    UnknownChannel,
    UnknownAction,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::InvalidUtf8 => f.write_str("payload is not valid UTF-8"),
            ParseError::UnknownChannel => f.write_str("unknown channel"),
            ParseError::UnknownAction => f.write_str("unknown action"),
        }
    }
}

/// Why [`CommandProcessor::process`] left channel state unchanged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    /// The payload was dropped at the parse boundary
    Parse(ParseError),
    /// The command parsed but the registry refused it
    NotApplied(Command, ChannelError),
}

impl From<ParseError> for CommandError {
    fn from(e: ParseError) -> Self {
        CommandError::Parse(e)
    }
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Parse(e) => write!(f, "dropped payload: {}", e),
            CommandError::NotApplied(command, e) => write!(f, "{} not applied: {}", command, e),
        }
    }
}

/// Applies inbound command payloads to the channel registry.
pub struct CommandProcessor<'a, P: OutputPin> {
    registry: &'a ChannelRegistry<P>,
}

impl<'a, P: OutputPin> CommandProcessor<'a, P> {
    pub const fn new(registry: &'a ChannelRegistry<P>) -> Self {
        Self { registry }
    }

    /// Parse and apply one payload.
    ///
    /// `Ok` carries the command once the registry applied it.
    pub fn process(&self, payload: &[u8]) -> Result<Command, CommandError> {
        let command = match Command::parse(payload) {
            Ok(command) => command,
            Err(e) => {
                log::warn!("command: dropped payload ({} bytes): {}", payload.len(), e);
                return Err(e.into());
            }
        };

        // The channel was resolved from the closed set, so a failure here
        // means the registry was wired without this channel's line.
        if let Err(e) = self.registry.set(command.channel, command.action.is_on()) {
            log::error!("command: invariant violated applying {}: {}", command, e);
            return Err(CommandError::NotApplied(command, e));
        }

        log::info!("command: {} applied", command);
        Ok(command)
    }
}

impl<P: OutputPin> InboundHandler for CommandProcessor<'_, P> {
    fn on_message(&self, _topic: &str, payload: &[u8]) {
        let _ = self.process(payload);
    }
}
