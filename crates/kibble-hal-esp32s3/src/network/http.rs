//! Fact API client over an embassy-net TCP socket, optionally wrapped in an
//! mbedtls session for `https://` endpoints.

use core::{ffi::CStr, net::Ipv4Addr, ops::Range};

use embassy_net::{IpAddress, IpEndpoint, Stack, dns::DnsQueryType, tcp::TcpSocket};
use embassy_time::{Duration, WithTimeout};
use embedded_io_async::{Read, Write};
use heapless::String;
use kibble_core::{
    facts::{FactList, FetchError, extract_facts},
    http::{ReadProgress, RequestBuffer, ResponseReader, parse_http_url, write_get_request},
    settings::ApiSource,
};
use log::info;
use mbedtls_rs::{Certificates, Mode, TlsVersion, asynch::Session};

pub use mbedtls_rs::{Tls, TlsReference};

const SOCKET_RX_BYTES: usize = 2048;
const SOCKET_TX_BYTES: usize = 1024;
const CONNECT_TIMEOUT_SECS: u64 = 10;
const IO_TIMEOUT_SECS: u64 = 15;
const SERVER_NAME_BYTES: usize = 128;

#[derive(Clone, Copy, Debug)]
pub struct FactRequest<'a> {
    pub base_url: &'a str,
    pub source: ApiSource,
    pub api_key: &'a str,
}

/// Fetches and parses the fact list.
///
/// `response` receives the raw HTTP response; a body longer than the buffer
/// is parsed up to the cut. Server certificates are not checked, the badge
/// carries no CA bundle.
pub async fn fetch_facts(
    stack: Stack<'_>,
    tls: TlsReference<'_>,
    request: &FactRequest<'_>,
    response: &mut [u8],
) -> Result<FactList, FetchError> {
    let url = parse_http_url(request.base_url)?;
    let mut head = RequestBuffer::new();
    write_get_request(&mut head, &url, request.source.path(), request.api_key)?;

    let address = resolve(stack, url.host).await?;

    let mut rx_buffer = [0u8; SOCKET_RX_BYTES];
    let mut tx_buffer = [0u8; SOCKET_TX_BYTES];
    let mut socket = TcpSocket::new(stack, &mut rx_buffer, &mut tx_buffer);
    socket.set_timeout(Some(Duration::from_secs(IO_TIMEOUT_SECS)));

    match socket
        .connect(IpEndpoint::new(address, url.port))
        .with_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .await
    {
        Ok(Ok(())) => {}
        Ok(Err(err)) => {
            info!("http: connect to {}:{} failed: {:?}", url.host, url.port, err);
            return Err(FetchError::Network);
        }
        Err(_) => {
            info!("http: connect to {}:{} timed out", url.host, url.port);
            return Err(FetchError::Network);
        }
    }

    let body = if url.tls {
        exchange_tls(&mut socket, url.host, tls, head.as_bytes(), response).await
    } else {
        exchange(&mut socket, head.as_bytes(), response).await
    };
    socket.close();
    let body = body?;

    info!(
        "http: {} returned {} body bytes",
        request.source.path(),
        body.len()
    );
    extract_facts(&response[body])
}

async fn resolve(stack: Stack<'_>, host: &str) -> Result<IpAddress, FetchError> {
    if let Ok(ip) = host.parse::<Ipv4Addr>() {
        let [a, b, c, d] = ip.octets();
        return Ok(IpAddress::v4(a, b, c, d));
    }

    let addresses = stack
        .dns_query(host, DnsQueryType::A)
        .await
        .map_err(|err| {
            info!("http: dns lookup for {} failed: {:?}", host, err);
            FetchError::Network
        })?;
    addresses.first().copied().ok_or(FetchError::Network)
}

async fn exchange_tls<T>(
    stream: T,
    host: &str,
    tls: TlsReference<'_>,
    request: &[u8],
    response: &mut [u8],
) -> Result<Range<usize>, FetchError>
where
    T: Read + Write,
{
    let mut name = String::<SERVER_NAME_BYTES>::new();
    name.push_str(host).map_err(|()| FetchError::InvalidUrl)?;
    name.push('\0').map_err(|()| FetchError::InvalidUrl)?;
    let server_name =
        CStr::from_bytes_with_nul(name.as_bytes()).map_err(|_| FetchError::InvalidUrl)?;

    let mut session = Session::new(
        stream,
        Mode::Client {
            servername: server_name,
        },
        TlsVersion::Tls1_2,
        Certificates::default(),
        tls,
    )
    .map_err(|err| {
        info!("https: session setup failed: {:?}", err);
        FetchError::Network
    })?;

    session.connect().await.map_err(|err| {
        info!("https: handshake with {} failed: {:?}", host, err);
        FetchError::Network
    })?;

    exchange(&mut session, request, response).await
}

/// Sends `request` and reads the response; returns the body range.
async fn exchange<T>(
    stream: &mut T,
    request: &[u8],
    response: &mut [u8],
) -> Result<Range<usize>, FetchError>
where
    T: Read + Write,
{
    stream.write_all(request).await.map_err(|err| {
        info!("http: write failed: {:?}", err);
        FetchError::Network
    })?;
    stream.flush().await.map_err(|err| {
        info!("http: flush failed: {:?}", err);
        FetchError::Network
    })?;

    let mut reader = ResponseReader::new();
    loop {
        let filled = reader.filled();
        let read = stream
            .read(&mut response[filled..])
            .await
            .map_err(|err| {
                info!("http: read failed after {} bytes: {:?}", filled, err);
                FetchError::Network
            })?;

        if let ReadProgress::Done(body) = reader.advance(response, read)? {
            return Ok(body);
        }
    }
}
