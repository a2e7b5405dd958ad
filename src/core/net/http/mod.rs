//! Minimal HTTP/1.1 server
//!
//! One connection at a time, one request per connection. Enough for the
//! local admin page, nothing more.

mod connection;
mod request;
mod response;
mod server;

pub(crate) use connection::HttpConnection;
pub(crate) use request::Method;
pub(crate) use response::{ContentType, Status};
pub(crate) use server::{HttpHandler, HttpServer};

#[derive(Debug)]
pub(crate) enum Error {
    /// The peer closed the connection before sending a request
    Closed,
    /// The request head is not valid HTTP or does not fit the buffers
    Parse,
    /// The response head does not fit its buffer
    Format,
    Io(embassy_net::tcp::Error),
}

impl From<core::fmt::Error> for Error {
    fn from(_: core::fmt::Error) -> Self {
        Error::Format
    }
}

impl From<embassy_net::tcp::Error> for Error {
    fn from(err: embassy_net::tcp::Error) -> Self {
        Error::Io(err)
    }
}

pub(crate) type HttpResult = Result<(), Error>;
