use anyhow::{Context, Result, anyhow};
use std::io;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::time::Duration;

/// Read timeout on the socket, so the worker can poll its stop flag.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Longest datagram accepted; anything longer is treated as unrecognized.
pub const MAX_DATAGRAM: usize = 1024;

/// Datagram transport to one remote endpoint.
pub trait Transport {
    fn send(&self, payload: &[u8]) -> io::Result<usize>;
    fn recv(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)>;
}

/// True for the "nothing arrived yet" results of a socket with a read timeout.
pub fn is_timeout(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
    remote: SocketAddr,
}

impl UdpTransport {
    pub fn open(bind: &str, remote: SocketAddr) -> Result<Self> {
        let socket = UdpSocket::bind(bind).with_context(|| format!("bind {}", bind))?;
        socket
            .set_read_timeout(Some(POLL_INTERVAL))
            .context("set read timeout")?;
        log::info!(
            "[udp] bound {} -> {}",
            socket.local_addr().context("local addr")?,
            remote
        );
        Ok(Self { socket, remote })
    }

    /// Second handle on the same socket, for the receive worker.
    pub fn try_clone(&self) -> Result<Self> {
        Ok(Self {
            socket: self.socket.try_clone().context("clone socket")?,
            remote: self.remote,
        })
    }
}

impl Transport for UdpTransport {
    fn send(&self, payload: &[u8]) -> io::Result<usize> {
        self.socket.send_to(payload, self.remote)
    }

    fn recv(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        self.socket.recv_from(buf)
    }
}

pub fn resolve_remote(host: &str, port: u16) -> Result<SocketAddr> {
    (host, port)
        .to_socket_addrs()
        .with_context(|| format!("resolve {}:{}", host, port))?
        .next()
        .ok_or_else(|| anyhow!("no address for {}:{}", host, port))
}
