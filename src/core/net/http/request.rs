use embassy_net::tcp::TcpSocket;

use super::Error;

const HEAD_TERMINATOR: &[u8] = b"\r\n\r\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Method {
    Get,
    Head,
    Post,
    /// Any method the admin page does not route
    Other,
}

impl Method {
    fn from_token(token: &str) -> Self {
        match token {
            "GET" => Method::Get,
            "HEAD" => Method::Head,
            "POST" => Method::Post,
            _ => Method::Other,
        }
    }
}

/// First line of a request, split into its parts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct RequestLine<'a> {
    pub(super) method: Method,
    pub(super) path: &'a str,
    /// Query string without the leading `?`, empty when absent
    pub(super) query: &'a str,
}

impl<'a> RequestLine<'a> {
    /// Parse `METHOD target HTTP/x.y` from the start of a request head
    pub(super) fn parse(head: &'a str) -> Option<Self> {
        let line = head.split("\r\n").next()?;
        let mut parts = line.split(' ');
        let method = Method::from_token(parts.next()?);
        let target = parts.next().filter(|target| target.starts_with('/'))?;
        if !parts.next()?.starts_with("HTTP/") {
            return None;
        }
        let (path, query) = target.split_once('?').unwrap_or((target, ""));
        Some(Self {
            method,
            path,
            query,
        })
    }
}

/// Read until the end of the request head.
///
/// Returns the head length including the blank line. Request bodies are
/// never read.
pub(super) async fn read_head(socket: &mut TcpSocket<'_>, buf: &mut [u8]) -> Result<usize, Error> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = socket.read(&mut buf[filled..]).await?;
        if n == 0 {
            return Err(if filled == 0 { Error::Closed } else { Error::Parse });
        }
        // The terminator may straddle two reads
        let search_from = filled.saturating_sub(HEAD_TERMINATOR.len() - 1);
        filled += n;
        if let Some(pos) = buf[search_from..filled]
            .windows(HEAD_TERMINATOR.len())
            .position(|window| window == HEAD_TERMINATOR)
        {
            return Ok(search_from + pos + HEAD_TERMINATOR.len());
        }
    }
    Err(Error::Parse)
}
