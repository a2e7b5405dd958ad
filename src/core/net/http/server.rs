use embassy_net::{Stack, tcp::TcpSocket};
use embassy_time::Duration;

use super::{Error, HttpResult, connection::HttpConnection};

const SOCKET_TIMEOUT: Duration = Duration::from_secs(10);

pub(crate) trait HttpHandler {
    async fn handle_request(&self, conn: HttpConnection<'_>) -> HttpResult;
}

/// Serves connections one at a time with a single pair of socket buffers
pub(crate) struct HttpServer<'a, T: HttpHandler> {
    handler: &'a T,
}

impl<'a, T: HttpHandler> HttpServer<'a, T> {
    pub(crate) fn new(handler: &'a T) -> Self {
        Self { handler }
    }

    pub(crate) async fn listen_and_serve(
        &self,
        stack: Stack<'static>,
        port: u16,
        rx_buffer: &mut [u8],
        tx_buffer: &mut [u8],
    ) -> ! {
        loop {
            let mut socket = TcpSocket::new(stack, rx_buffer, tx_buffer);
            socket.set_timeout(Some(SOCKET_TIMEOUT));
            if let Err(e) = socket.accept(port).await {
                log::warn!("http: accept failed: {:?}", e);
                continue;
            }

            match self.serve(socket).await {
                Ok(()) | Err(Error::Closed) => {}
                Err(e) => log::warn!("http: request failed: {:?}", e),
            }
        }
    }

    async fn serve(&self, socket: TcpSocket<'_>) -> HttpResult {
        let conn = HttpConnection::from_socket(socket).await?;
        self.handler.handle_request(conn).await
    }
}
