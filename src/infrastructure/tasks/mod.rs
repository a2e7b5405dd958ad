mod http;
mod network;
mod session;
mod telemetry;

pub use http::admin_http_task;
pub use network::{ip_watch_task, network_runner_task, wifi_link_task};
pub use session::session_task;
pub use telemetry::telemetry_task;
