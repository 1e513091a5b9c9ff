//! An ICMP echo probe.
//!
//! [`Pinger`] sends a bounded number of Echo Requests to one IPv4
//! destination, one at a time, waits for each correlated Echo Reply and
//! folds the round-trip times into a [`PingReport`]. Sockets come from a
//! [`Transport`]; [`RawTransport`] uses raw ICMP sockets and therefore needs
//! root or `CAP_NET_RAW`.
//!
//! ```no_run
//! use std::time::Duration;
//! use echoprobe::{ping, PingOption};
//!
//! let popt = PingOption {
//!     timeout: Duration::from_secs(5),
//!     ..Default::default()
//! };
//! let report = ping("127.0.0.1".parse().unwrap(), popt, 3).unwrap();
//! println!("{}", report);
//! ```

use std::net::IpAddr;

pub mod checksum;
pub mod error;
pub mod packet;
pub mod ping;
pub mod port;
pub mod stat;
pub mod transport;

pub use error::{FrameError, ProbeError};
pub use ping::{receive, Outcome, PingOption, Pinger, DEFAULT_COUNT};
pub use stat::{PingReport, Statistics};
pub use transport::{ProbeSocket, RawTransport, Transport};

/// Ping `destination` `count` times over raw ICMP sockets.
pub fn ping(destination: IpAddr, popt: PingOption, count: usize) -> Result<PingReport, ProbeError> {
    let mut pinger = Pinger::new(destination, popt, RawTransport::default())?;
    pinger.run(count)
}
