use core::fmt::Write as _;

use embassy_net::tcp::TcpSocket;
use embedded_io_async::Write as _;
use heapless::String;

use super::request::{RequestLine, read_head};
use super::response::ResponseHead;
use super::{ContentType, Error, HttpResult, Method, Status};

const REQUEST_HEAD_SIZE: usize = 512;
const RESPONSE_HEAD_SIZE: usize = 160;
const MAX_PATH_LEN: usize = 64;
const MAX_QUERY_LEN: usize = 96;

/// Accepted connection with its parsed request
pub(crate) struct HttpConnection<'a> {
    method: Method,
    path: String<MAX_PATH_LEN>,
    query: String<MAX_QUERY_LEN>,
    socket: TcpSocket<'a>,
}

impl<'a> HttpConnection<'a> {
    /// Read and parse the request head from a freshly accepted socket
    pub(crate) async fn from_socket(mut socket: TcpSocket<'a>) -> Result<Self, Error> {
        let mut buf = [0u8; REQUEST_HEAD_SIZE];
        let len = read_head(&mut socket, &mut buf).await?;
        let head = core::str::from_utf8(&buf[..len]).map_err(|_| Error::Parse)?;
        let line = RequestLine::parse(head).ok_or(Error::Parse)?;

        let mut path = String::new();
        path.push_str(line.path).map_err(|()| Error::Parse)?;
        let mut query = String::new();
        query.push_str(line.query).map_err(|()| Error::Parse)?;

        Ok(Self {
            method: line.method,
            path,
            query,
            socket,
        })
    }

    pub(crate) fn method(&self) -> Method {
        self.method
    }

    /// Request path, without the query string
    pub(crate) fn path(&self) -> &str {
        &self.path
    }

    /// Raw query string, without the leading `?`
    pub(crate) fn query(&self) -> &str {
        &self.query
    }

    /// Write a complete response and flush it
    pub(crate) async fn respond(
        &mut self,
        status: Status,
        content_type: ContentType,
        body: &[u8],
    ) -> HttpResult {
        let mut head = String::<RESPONSE_HEAD_SIZE>::new();
        write!(
            head,
            "{}",
            ResponseHead {
                status,
                content_type,
                content_length: body.len(),
            }
        )?;

        self.socket.write_all(head.as_bytes()).await?;
        if self.method != Method::Head {
            self.socket.write_all(body).await?;
        }
        self.socket.flush().await?;
        self.socket.close();
        Ok(())
    }
}
