//! Minimal HTTP/1.0 client plumbing for the fact API.
//!
//! `http://` and `https://` URLs are accepted; the transport decides how to
//! honour [`HttpUrl::tls`]. Requests ask the server to close the connection
//! so the body runs to end of stream.

use core::{fmt::Write, ops::Range};

use heapless::String;
use log::debug;

use crate::facts::FetchError;

pub const DEFAULT_HTTP_PORT: u16 = 80;
pub const DEFAULT_HTTPS_PORT: u16 = 443;
pub const REQUEST_BYTES: usize = 512;
const USER_AGENT: &str = "kibble-badge/0.1";

pub type RequestBuffer = String<REQUEST_BYTES>;

/// Parsed `http[s]://host[:port][/base]` URL.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct HttpUrl<'a> {
    pub host: &'a str,
    pub port: u16,
    /// Path prefix without a trailing slash; empty for the server root.
    pub base_path: &'a str,
    /// The request must go through a TLS session.
    pub tls: bool,
}

impl HttpUrl<'_> {
    pub const fn default_port(&self) -> u16 {
        if self.tls {
            DEFAULT_HTTPS_PORT
        } else {
            DEFAULT_HTTP_PORT
        }
    }
}

pub fn parse_http_url(url: &str) -> Result<HttpUrl<'_>, FetchError> {
    let url = url.trim();
    let (rest, tls) = if let Some(rest) = strip_prefix_ignore_case(url, "https://") {
        (rest, true)
    } else if let Some(rest) = strip_prefix_ignore_case(url, "http://") {
        (rest, false)
    } else {
        return Err(FetchError::InvalidUrl);
    };

    let (authority, path) = match rest.find('/') {
        Some(slash) => (&rest[..slash], &rest[slash..]),
        None => (rest, ""),
    };

    let (host, port) = match authority.rsplit_once(':') {
        Some((host, port)) => (
            host,
            port.parse::<u16>().map_err(|_| FetchError::InvalidUrl)?,
        ),
        None => (
            authority,
            if tls {
                DEFAULT_HTTPS_PORT
            } else {
                DEFAULT_HTTP_PORT
            },
        ),
    };

    if host.is_empty() || port == 0 {
        return Err(FetchError::InvalidUrl);
    }

    Ok(HttpUrl {
        host,
        port,
        base_path: path.trim_end_matches('/'),
        tls,
    })
}

fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let head = text.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        Some(&text[prefix.len()..])
    } else {
        None
    }
}

/// Formats a GET for `base_path + path`.
///
/// The bearer header is left out when `api_key` is empty.
pub fn write_get_request<const N: usize>(
    out: &mut String<N>,
    url: &HttpUrl<'_>,
    path: &str,
    api_key: &str,
) -> Result<(), FetchError> {
    out.clear();
    format_request(out, url, path, api_key).map_err(|_| FetchError::InvalidUrl)
}

fn format_request<W: Write>(
    out: &mut W,
    url: &HttpUrl<'_>,
    path: &str,
    api_key: &str,
) -> core::fmt::Result {
    write!(out, "GET {}{} HTTP/1.0\r\n", url.base_path, path)?;
    if url.port == url.default_port() {
        write!(out, "Host: {}\r\n", url.host)?;
    } else {
        write!(out, "Host: {}:{}\r\n", url.host, url.port)?;
    }
    if !api_key.is_empty() {
        write!(out, "Authorization: Bearer {}\r\n", api_key)?;
    }
    write!(out, "Accept: application/json\r\n")?;
    write!(out, "User-Agent: {}\r\n", USER_AGENT)?;
    write!(out, "Connection: close\r\n\r\n")
}

/// Status line and headers of a response.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ResponseHead {
    pub status: u16,
    /// Offset of the first body byte in the buffer that was parsed.
    pub body_start: usize,
    pub content_length: Option<usize>,
}

/// Parses the response head at the start of `buf`.
///
/// Returns `Ok(None)` while the blank line ending the head has not arrived.
pub fn parse_response_head(buf: &[u8]) -> Result<Option<ResponseHead>, FetchError> {
    let Some(head_end) = find_head_end(buf) else {
        return Ok(None);
    };
    let head = core::str::from_utf8(&buf[..head_end]).map_err(|_| FetchError::MalformedResponse)?;
    let mut lines = head.split("\r\n");

    let status_line = lines.next().ok_or(FetchError::MalformedResponse)?;
    let mut parts = status_line.split(' ');
    let version = parts.next().unwrap_or("");
    if !version.starts_with("HTTP/1.") {
        return Err(FetchError::MalformedResponse);
    }
    let status = parts
        .next()
        .and_then(|code| code.parse::<u16>().ok())
        .ok_or(FetchError::MalformedResponse)?;

    let mut content_length = None;
    for line in lines {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        if name.trim().eq_ignore_ascii_case("content-length") {
            content_length = value.parse::<usize>().ok();
        } else if name.trim().eq_ignore_ascii_case("transfer-encoding")
            && value.eq_ignore_ascii_case("chunked")
        {
            return Err(FetchError::MalformedResponse);
        }
    }

    Ok(Some(ResponseHead {
        status,
        body_start: head_end + 4,
        content_length,
    }))
}

fn find_head_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|window| window == b"\r\n\r\n")
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ReadProgress {
    More,
    /// The body is complete, or as complete as the buffer allows.
    Done(Range<usize>),
}

/// Tracks a response arriving in one fixed buffer.
///
/// Read into `buf[reader.filled()..]`, then report the byte count with
/// [`ResponseReader::advance`]. A body that outgrows the buffer is cut at
/// capacity rather than rejected; only a head that does not fit is an error.
#[derive(Clone, Debug, Default)]
pub struct ResponseReader {
    filled: usize,
    head: Option<ResponseHead>,
}

impl ResponseReader {
    pub const fn new() -> Self {
        Self {
            filled: 0,
            head: None,
        }
    }

    pub fn filled(&self) -> usize {
        self.filled
    }

    /// `read == 0` means the peer closed the stream.
    pub fn advance(&mut self, buf: &[u8], read: usize) -> Result<ReadProgress, FetchError> {
        if read == 0 {
            let head = self.head.ok_or(FetchError::MalformedResponse)?;
            return Ok(ReadProgress::Done(head.body_start..self.filled));
        }
        self.filled = (self.filled + read).min(buf.len());

        if self.head.is_none() {
            self.head = parse_response_head(&buf[..self.filled])?;
            if let Some(head) = self.head
                && head.status != 200
            {
                return Err(FetchError::Http(head.status));
            }
        }

        let Some(head) = self.head else {
            if self.filled == buf.len() {
                return Err(FetchError::ResponseTooLarge);
            }
            return Ok(ReadProgress::More);
        };

        if let Some(len) = head.content_length
            && self.filled >= head.body_start + len
        {
            return Ok(ReadProgress::Done(head.body_start..head.body_start + len));
        }
        if self.filled == buf.len() {
            debug!(
                "http: buffer full, body cut at {} bytes",
                self.filled - head.body_start
            );
            return Ok(ReadProgress::Done(head.body_start..self.filled));
        }
        Ok(ReadProgress::More)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::ApiSource;

    #[test]
    fn parses_host_port_and_base() {
        assert_eq!(
            parse_http_url("http://kibble.local").unwrap(),
            HttpUrl {
                host: "kibble.local",
                port: 80,
                base_path: "",
                tls: false,
            }
        );
        assert_eq!(
            parse_http_url("HTTP://10.0.0.5:8080/kibble/").unwrap(),
            HttpUrl {
                host: "10.0.0.5",
                port: 8080,
                base_path: "/kibble",
                tls: false,
            }
        );
    }

    #[test]
    fn https_urls_default_to_443_over_tls() {
        assert_eq!(
            parse_http_url("https://your-kibble-instance.com").unwrap(),
            HttpUrl {
                host: "your-kibble-instance.com",
                port: 443,
                base_path: "",
                tls: true,
            }
        );
        assert_eq!(
            parse_http_url("HTTPS://kibble.example.com:8443/v1/").unwrap(),
            HttpUrl {
                host: "kibble.example.com",
                port: 8443,
                base_path: "/v1",
                tls: true,
            }
        );
    }

    #[test]
    fn host_header_omits_the_scheme_default_port() {
        let mut request = RequestBuffer::new();

        let url = parse_http_url("https://kibble.example.com").unwrap();
        write_get_request(&mut request, &url, "/api/facts", "").unwrap();
        assert!(request.contains("Host: kibble.example.com\r\n"));

        let url = parse_http_url("https://kibble.example.com:80").unwrap();
        write_get_request(&mut request, &url, "/api/facts", "").unwrap();
        assert!(request.contains("Host: kibble.example.com:80\r\n"));
    }

    #[test]
    fn rejects_unsupported_urls() {
        for url in [
            "ftp://kibble.example.com",
            "kibble.local",
            "https://",
            "http://",
            "http://:8080/",
            "http://host:notaport",
            "http://host:0",
        ] {
            assert_eq!(parse_http_url(url), Err(FetchError::InvalidUrl), "{url}");
        }
    }

    #[test]
    fn request_carries_auth_and_accept() {
        let url = parse_http_url("http://10.0.0.5:8080/kibble").unwrap();
        let mut request = RequestBuffer::new();
        write_get_request(&mut request, &url, ApiSource::Recent.path(), "kbl_123").unwrap();

        assert_eq!(
            request.as_str(),
            "GET /kibble/api/facts/recent HTTP/1.0\r\n\
             Host: 10.0.0.5:8080\r\n\
             Authorization: Bearer kbl_123\r\n\
             Accept: application/json\r\n\
             User-Agent: kibble-badge/0.1\r\n\
             Connection: close\r\n\r\n"
        );
    }

    #[test]
    fn request_without_key_omits_auth() {
        let url = parse_http_url("http://kibble.local").unwrap();
        let mut request = RequestBuffer::new();
        write_get_request(&mut request, &url, ApiSource::All.path(), "").unwrap();

        assert!(request.starts_with("GET /api/facts HTTP/1.0\r\nHost: kibble.local\r\n"));
        assert!(!request.contains("Authorization"));
    }

    #[test]
    fn request_overflow_is_reported() {
        let url = parse_http_url("http://kibble.local").unwrap();
        let mut request = String::<32>::new();
        assert!(write_get_request(&mut request, &url, "/api/facts", "key").is_err());
    }

    #[test]
    fn head_parsing_finds_status_and_body() {
        let response = b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\ncontent-length: 2\r\n\r\n{}";
        let head = parse_response_head(response).unwrap().unwrap();
        assert_eq!(head.status, 200);
        assert_eq!(head.content_length, Some(2));
        assert_eq!(&response[head.body_start..], b"{}");
    }

    #[test]
    fn incomplete_head_waits_for_more() {
        assert_eq!(parse_response_head(b"HTTP/1.0 200 OK\r\nServer: x\r\n"), Ok(None));
    }

    #[test]
    fn error_status_and_garbage() {
        let head = parse_response_head(b"HTTP/1.0 401 Unauthorized\r\n\r\n")
            .unwrap()
            .unwrap();
        assert_eq!(head.status, 401);
        assert_eq!(head.content_length, None);

        assert_eq!(
            parse_response_head(b"SSH-2.0-OpenSSH\r\n\r\n"),
            Err(FetchError::MalformedResponse)
        );
        assert_eq!(
            parse_response_head(b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n"),
            Err(FetchError::MalformedResponse)
        );
    }

    /// Feeds `response` to a reader in `chunk`-sized reads through a
    /// `capacity`-byte buffer, the way the socket loop does.
    fn read_through(
        response: &[u8],
        capacity: usize,
        chunk: usize,
    ) -> (std::vec::Vec<u8>, Result<Range<usize>, FetchError>) {
        let mut buf = std::vec![0u8; capacity];
        let mut reader = ResponseReader::new();
        let mut sent = 0;
        loop {
            let filled = reader.filled();
            let room = &mut buf[filled..];
            let read = chunk.min(room.len()).min(response.len() - sent);
            room[..read].copy_from_slice(&response[sent..sent + read]);
            sent += read;
            match reader.advance(&buf, read) {
                Ok(ReadProgress::More) => {}
                Ok(ReadProgress::Done(body)) => return (buf, Ok(body)),
                Err(err) => return (buf, Err(err)),
            }
        }
    }

    #[test]
    fn reader_stops_at_content_length() {
        let response = b"HTTP/1.0 200 OK\r\nContent-Length: 5\r\n\r\nhello trailing";
        let (buf, body) = read_through(response, 128, 7);
        assert_eq!(&buf[body.unwrap()], b"hello");
    }

    #[test]
    fn reader_runs_to_end_of_stream_without_length() {
        let response = b"HTTP/1.0 200 OK\r\n\r\n{\"topics\":[]}";
        let (buf, body) = read_through(response, 128, 3);
        assert_eq!(&buf[body.unwrap()], b"{\"topics\":[]}");
    }

    #[test]
    fn oversized_body_is_cut_at_capacity() {
        let mut response = std::vec::Vec::from(&b"HTTP/1.0 200 OK\r\n\r\n"[..]);
        response.extend(std::iter::repeat_n(b'x', 500));

        let (buf, body) = read_through(&response, 100, 16);
        let body = body.unwrap();
        assert_eq!(body.end, 100);
        assert_eq!(&buf[body.clone()], &response[body]);
    }

    #[test]
    fn head_that_does_not_fit_is_too_large() {
        let mut response = std::vec::Vec::from(&b"HTTP/1.0 200 OK\r\nX-Pad: "[..]);
        response.extend(std::iter::repeat_n(b'p', 200));
        response.extend(b"\r\n\r\n{}");

        let (_, body) = read_through(&response, 64, 10);
        assert_eq!(body, Err(FetchError::ResponseTooLarge));
    }

    #[test]
    fn reader_rejects_error_status_and_headless_close() {
        let (_, body) = read_through(b"HTTP/1.1 404 Not Found\r\n\r\nnope", 64, 64);
        assert_eq!(body, Err(FetchError::Http(404)));

        let (_, body) = read_through(b"HTTP/1.1 200 OK\r\n", 64, 64);
        assert_eq!(body, Err(FetchError::MalformedResponse));
    }
}
