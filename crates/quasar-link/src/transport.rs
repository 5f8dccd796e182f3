//! Datagram transport.

use std::io;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::time::Duration;

/// Fire-and-forget datagram link.
///
/// One call to [`Transport::send`] is one datagram. Delivery, ordering and
/// deduplication are not guaranteed.
pub trait Transport {
    fn send(&self, frame: &[u8], destination: SocketAddr) -> io::Result<()>;

    /// Receive one datagram into `buf`.
    ///
    /// Returns `Ok(None)` when nothing arrived within the transport's poll
    /// interval, so callers can check for shutdown between calls.
    fn recv(&self, buf: &mut [u8]) -> io::Result<Option<usize>>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send(&self, frame: &[u8], destination: SocketAddr) -> io::Result<()> {
        (**self).send(frame, destination)
    }

    fn recv(&self, buf: &mut [u8]) -> io::Result<Option<usize>> {
        (**self).recv(buf)
    }
}

/// Settings for [`UdpTransport`].
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Longest a single receive call blocks.
    pub poll_interval: Duration,
    /// Attempts per datagram before a send is reported as failed.
    pub send_attempts: u32,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(200),
            send_attempts: 3,
        }
    }
}

/// [`Transport`] over a blocking UDP socket.
#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
    config: TransportConfig,
}

impl UdpTransport {
    /// Bind a socket. Use port 0 for an ephemeral sending socket.
    pub fn bind(addr: impl ToSocketAddrs, config: TransportConfig) -> io::Result<Self> {
        let socket = UdpSocket::bind(addr)?;
        socket.set_read_timeout(Some(config.poll_interval.max(Duration::from_millis(1))))?;
        tracing::debug!("Bound UDP transport on {}", socket.local_addr()?);
        Ok(Self { socket, config })
    }

    /// Bind an ephemeral socket suitable for sending to `destination`.
    pub fn sender_for(destination: SocketAddr, config: TransportConfig) -> io::Result<Self> {
        let local: SocketAddr = if destination.is_ipv4() {
            (std::net::Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (std::net::Ipv6Addr::UNSPECIFIED, 0).into()
        };
        Self::bind(local, config)
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }
}

impl Transport for UdpTransport {
    fn send(&self, frame: &[u8], destination: SocketAddr) -> io::Result<()> {
        send_with_retry(self.config.send_attempts, frame.len(), destination, || {
            self.socket.send_to(frame, destination)
        })
    }

    fn recv(&self, buf: &mut [u8]) -> io::Result<Option<usize>> {
        match self.socket.recv_from(buf) {
            Ok((len, _from)) => Ok(Some(len)),
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

/// Run `send_once` until it succeeds, fails permanently, or `attempts` run out.
fn send_with_retry(
    attempts: u32,
    len: usize,
    destination: SocketAddr,
    mut send_once: impl FnMut() -> io::Result<usize>,
) -> io::Result<()> {
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match send_once() {
            Ok(sent) if sent == len => return Ok(()),
            Ok(sent) => {
                return Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    format!("sent {sent} of {len} bytes"),
                ));
            }
            Err(e) if attempt < attempts && is_transient(&e) => {
                tracing::warn!("Send to {destination} failed (attempt {attempt}/{attempts}): {e}");
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

fn is_transient(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::WouldBlock
            | io::ErrorKind::Interrupted
            | io::ErrorKind::TimedOut
            | io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
    )
}
