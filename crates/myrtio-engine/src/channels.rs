//! Output Channel Registry
//!
//! Maps the fixed set of lighting channels to their physical output lines and
//! keeps the last applied level of every channel.
//!
//! The registry is shared between the MQTT delivery context and the admin HTTP
//! context, so every operation runs inside a critical section: a `set` drives
//! the line and records the level atomically, and `get` never observes a
//! half-applied change.

use core::cell::RefCell;
use core::fmt;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embedded_hal::digital::{OutputPin, PinState};

/// Number of channels known at build time
pub const CHANNEL_COUNT: usize = 4;

/// Logical output channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Rgb,
    White,
    Verde,
    FarRed,
}

impl Channel {
    /// All channels in wire order
    pub const ALL: [Channel; CHANNEL_COUNT] = [
        Channel::Rgb,
        Channel::White,
        Channel::Verde,
        Channel::FarRed,
    ];

    /// Channel targeted by the legacy bare `ON` / `OFF` payloads
    pub const DEFAULT: Channel = Channel::Rgb;

    /// Wire name of the channel
    pub const fn name(self) -> &'static str {
        match self {
            Channel::Rgb => "RGB",
            Channel::White => "WHITE",
            Channel::Verde => "VERDE",
            Channel::FarRed => "FAR_RED",
        }
    }

    /// Resolve a wire name. Matching is exact and case-sensitive.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|channel| channel.name() == name)
    }

    const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned by [`ChannelRegistry::set`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelError {
    /// No output line is attached for the channel
    UnknownChannel(Channel),
    /// The line driver rejected the level change
    LineFault(Channel),
}

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelError::UnknownChannel(channel) => {
                write!(f, "no output line attached for channel {}", channel)
            }
            ChannelError::LineFault(channel) => {
                write!(f, "output line fault on channel {}", channel)
            }
        }
    }
}

/// Levels of all channels captured in one critical section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelSnapshot {
    levels: [bool; CHANNEL_COUNT],
}

impl ChannelSnapshot {
    /// Level of a single channel
    pub const fn get(&self, channel: Channel) -> bool {
        self.levels[channel.index()]
    }

    /// Iterate over `(channel, level)` pairs in wire order
    pub fn iter(&self) -> impl Iterator<Item = (Channel, bool)> + '_ {
        Channel::ALL.into_iter().map(|channel| (channel, self.get(channel)))
    }
}

struct Slot<P> {
    line: Option<P>,
    level: bool,
}

/// Registry of the output channels and their physical lines.
pub struct ChannelRegistry<P: OutputPin> {
    slots: Mutex<CriticalSectionRawMutex, RefCell<[Slot<P>; CHANNEL_COUNT]>>,
}

impl<P: OutputPin> ChannelRegistry<P> {
    /// Create a registry with no lines attached
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(RefCell::new(core::array::from_fn(|_| Slot {
                line: None,
                level: false,
            }))),
        }
    }

    /// Attach the physical line driving `channel`
    #[must_use]
    pub fn with_line(mut self, channel: Channel, line: P) -> Self {
        self.attach(channel, line);
        self
    }

    /// Attach the physical line driving `channel`, replacing any previous one
    pub fn attach(&mut self, channel: Channel, line: P) {
        let slot = &mut self.slots.get_mut().get_mut()[channel.index()];
        slot.line = Some(line);
        slot.level = false;
    }

    /// Whether a line is attached for `channel`
    pub fn is_attached(&self, channel: Channel) -> bool {
        self.slots
            .lock(|slots| slots.borrow()[channel.index()].line.is_some())
    }

    /// Drive every attached line low and reset all levels to off.
    ///
    /// Calling it again yields the same end state.
    pub fn initialize(&self) {
        self.slots.lock(|slots| {
            for (channel, slot) in Channel::ALL.into_iter().zip(slots.borrow_mut().iter_mut()) {
                slot.level = false;
                if let Some(line) = slot.line.as_mut() {
                    if line.set_low().is_err() {
                        log::error!("channels: failed to drive {} low", channel);
                    }
                }
            }
        });
        log::info!("channels: all channels initialized and set to OFF");
    }

    /// Drive `channel` to `on` and record the new level.
    pub fn set(&self, channel: Channel, on: bool) -> Result<(), ChannelError> {
        self.slots.lock(|slots| {
            let mut slots = slots.borrow_mut();
            let slot = &mut slots[channel.index()];
            let line = slot
                .line
                .as_mut()
                .ok_or(ChannelError::UnknownChannel(channel))?;
            line.set_state(PinState::from(on))
                .map_err(|_| ChannelError::LineFault(channel))?;
            slot.level = on;
            Ok(())
        })
    }

    /// Last applied level of `channel`
    pub fn get(&self, channel: Channel) -> bool {
        self.slots.lock(|slots| slots.borrow()[channel.index()].level)
    }

    /// Levels of all channels
    pub fn snapshot(&self) -> ChannelSnapshot {
        self.slots.lock(|slots| {
            let slots = slots.borrow();
            ChannelSnapshot {
                levels: core::array::from_fn(|i| slots[i].level),
            }
        })
    }
}

impl<P: OutputPin> Default for ChannelRegistry<P> {
    fn default() -> Self {
        Self::new()
    }
}
