//! TCP reachability check run before the ICMP probe.

use std::net::{IpAddr, Shutdown, SocketAddr, TcpStream};
use std::time::Duration;

use log::debug;

/// How long a connect attempt may take.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// Return true when a TCP connection to `addr:port` can be established.
///
/// The connection is shut down straight away; any failure counts as closed.
pub fn is_port_open(addr: IpAddr, port: u16, timeout: Duration) -> bool {
    let target = SocketAddr::new(addr, port);
    match TcpStream::connect_timeout(&target, timeout) {
        Ok(stream) => {
            let _ = stream.shutdown(Shutdown::Both);
            true
        }
        Err(e) => {
            debug!("connect to {} failed: {}", target, e);
            false
        }
    }
}
