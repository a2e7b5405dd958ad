mod link;
mod network;
mod random;
mod session;

pub use link::{EspLinkDriver, LinkDriverError, LinkRequest};
pub(crate) use link::link_requests;
pub use network::{NetworkParts, init_network_stack};
pub(crate) use network::resolve_host;
pub use random::EspRng;
pub use session::EspSessionTransport;
pub(crate) use session::{OUTBOX, OutboundRequest, SESSION_OPEN};
