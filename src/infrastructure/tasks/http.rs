use embassy_net::Stack;

use crate::config;
use crate::controllers::AdminHttpController;
use crate::core::net::http::HttpServer;

const HTTP_RX_BUFFER_SIZE: usize = 1024;
const HTTP_TX_BUFFER_SIZE: usize = 2048;

/// Serves the local admin page once the network has an address
#[embassy_executor::task]
pub async fn admin_http_task(stack: Stack<'static>, controller: &'static AdminHttpController) {
    let mut rx_buffer = [0u8; HTTP_RX_BUFFER_SIZE];
    let mut tx_buffer = [0u8; HTTP_TX_BUFFER_SIZE];

    stack.wait_config_up().await;
    if let Some(ip) = stack.config_v4() {
        log::info!(
            "http: admin page at http://{}:{}/",
            ip.address.address(),
            config::HTTP_PORT
        );
    }

    HttpServer::new(controller)
        .listen_and_serve(stack, config::HTTP_PORT, &mut rx_buffer, &mut tx_buffer)
        .await;
}
