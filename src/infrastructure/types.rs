use esp_hal::gpio::Output;
use myrtio_engine::{ChannelRegistry, CommandProcessor, LinkManager, SessionManager};

use crate::infrastructure::drivers::{EspLinkDriver, EspSessionTransport};

pub type OutputLine = Output<'static>;
pub type Registry = ChannelRegistry<OutputLine>;
pub type Link = LinkManager<EspLinkDriver>;
pub type Session = SessionManager<EspSessionTransport, CommandProcessor<'static, OutputLine>>;
