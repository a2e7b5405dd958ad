//! # Connectivity & command processing engine
//!
//! Hardware-independent core of the channel controller firmware:
//!
//! - [`channels`] keeps the output lines and their levels.
//! - [`link`] brings the wireless link up and keeps it up.
//! - [`session`] owns the hub messaging session and its topics.
//! - [`command`] parses inbound payloads and applies them to the channels.
//! - [`supervisor`] sequences startup with bounded waits.
//!
//! Platform code plugs in through [`link::LinkDriver`],
//! [`session::SessionTransport`] and `embedded-hal` output pins, then feeds
//! driver notifications back with the managers' `dispatch` methods.
//!
//! ```no_run
//! # use myrtio_engine::channels::{Channel, ChannelRegistry};
//! # use myrtio_engine::command::CommandProcessor;
//! # fn demo<P: embedded_hal::digital::OutputPin>(pin: P) {
//! let registry = ChannelRegistry::new().with_line(Channel::Rgb, pin);
//! registry.initialize();
//!
//! let processor = CommandProcessor::new(&registry);
//! let _ = processor.process(b"RGB:ON");
//! assert!(registry.get(Channel::Rgb));
//! # }
//! ```

#![no_std]

pub mod admin;
pub mod channels;
pub mod command;
pub mod link;
pub mod session;
pub mod supervisor;
pub mod telemetry;
pub mod token;
pub mod topic;

pub use channels::{Channel, ChannelError, ChannelRegistry};
pub use command::{Action, Command, CommandError, CommandProcessor, ParseError};
pub use link::{LinkCredentials, LinkDriver, LinkEvent, LinkManager, LinkState};
pub use session::{
    InboundHandler, MessageId, SessionConfig, SessionError, SessionEvent, SessionManager,
    SessionState, SessionTransport,
};
pub use supervisor::{StartupError, StartupPolicy, Supervisor};
