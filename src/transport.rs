//! Socket capability used by the probe engine.
//!
//! The engine only needs to open a socket, send a datagram, wait for the
//! socket to become readable and read one frame. [`RawTransport`] does this
//! with a raw ICMPv4 socket; tests plug in an in-memory implementation.

use std::io::{self, Read};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};

use crate::error::ProbeError;

/// Something that hands out one fresh socket per probe attempt.
pub trait Transport {
    type Socket: ProbeSocket;

    /// Open a socket. A failure here is fatal for the run.
    fn open(&mut self) -> Result<Self::Socket, ProbeError>;
}

/// A socket owned by a single attempt. It is closed when dropped.
pub trait ProbeSocket {
    /// Send `packet` to `destination`.
    fn send_to(&mut self, packet: &[u8], destination: IpAddr) -> io::Result<usize>;

    /// Block until the socket is readable or `timeout` elapses.
    ///
    /// Returns `Ok(false)` on timeout.
    fn wait_readable(&mut self, timeout: Duration) -> io::Result<bool>;

    /// Read one captured frame into `buf`.
    fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// Raw ICMPv4 sockets. Needs root or `CAP_NET_RAW`.
#[derive(Debug, Clone, Default)]
pub struct RawTransport {
    pub ttl: Option<u32>,
    pub tos: Option<u32>,
}

impl RawTransport {
    pub fn new(ttl: Option<u32>, tos: Option<u32>) -> Self {
        RawTransport { ttl, tos }
    }
}

impl Transport for RawTransport {
    type Socket = RawSocket;

    fn open(&mut self) -> Result<RawSocket, ProbeError> {
        let socket = Socket::new(Domain::IPV4, Type::RAW, Some(Protocol::ICMPV4))
            .map_err(ProbeError::SocketCreation)?;
        socket.set_broadcast(true).map_err(ProbeError::SocketCreation)?;
        if let Some(ttl) = self.ttl {
            socket.set_ttl(ttl).map_err(ProbeError::SocketCreation)?;
        }
        if let Some(tos) = self.tos {
            socket.set_tos(tos).map_err(ProbeError::SocketCreation)?;
        }

        Ok(RawSocket { socket })
    }
}

pub struct RawSocket {
    socket: Socket,
}

impl ProbeSocket for RawSocket {
    fn send_to(&mut self, packet: &[u8], destination: IpAddr) -> io::Result<usize> {
        // ICMP has no ports
        let dest = SocketAddr::new(destination, 0);
        self.socket.send_to(packet, &dest.into())
    }

    fn wait_readable(&mut self, timeout: Duration) -> io::Result<bool> {
        wait_readable(&self.socket, timeout)
    }

    fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.socket.read(buf)
    }
}

cfg_if::cfg_if! {
    if #[cfg(unix)] {
        fn wait_readable(socket: &Socket, timeout: Duration) -> io::Result<bool> {
            use std::os::unix::io::AsRawFd;

            let mut fds = libc::pollfd {
                fd: socket.as_raw_fd(),
                events: libc::POLLIN,
                revents: 0,
            };
            // round up so sub-millisecond timeouts still wait
            let millis = ((timeout.as_micros() + 999) / 1000).min(libc::c_int::MAX as u128) as libc::c_int;

            loop {
                let ret = unsafe { libc::poll(&mut fds, 1, millis) };
                if ret == -1 {
                    let err = io::Error::last_os_error();
                    if err.kind() == io::ErrorKind::Interrupted {
                        continue;
                    }
                    return Err(err);
                }
                return Ok(ret > 0);
            }
        }
    } else {
        fn wait_readable(socket: &Socket, timeout: Duration) -> io::Result<bool> {
            use std::mem::MaybeUninit;

            socket.set_read_timeout(Some(timeout.max(Duration::from_millis(1))))?;
            let mut probe = [MaybeUninit::<u8>::uninit(); 1];
            match socket.peek(&mut probe) {
                Ok(_) => Ok(true),
                Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => Ok(false),
                Err(e) => Err(e),
            }
        }
    }
}
