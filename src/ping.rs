use std::fmt;
use std::net::IpAddr;
use std::thread;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use log::{debug, error, info, warn};
use pnet_packet::icmp::IcmpTypes;

use crate::error::{FrameError, ProbeError};
use crate::packet::{build_echo_request, parse_echo_frame, DEFAULT_PAYLOAD_LEN, MAX_RECV};
use crate::stat::{PingReport, Statistics};
use crate::transport::{ProbeSocket, Transport};

/// Attempts issued by a run when the caller has no preference.
pub const DEFAULT_COUNT: usize = 3;

#[derive(Debug, Clone)]
pub struct PingOption {
    /// Wait for each reply, and also the budget of the whole run.
    pub timeout: Duration,
    /// Pause between two attempts.
    pub interval: Option<Duration>,
    /// Echo identifier; a random one is drawn when absent.
    pub ident: Option<u16>,
    /// Payload length, timestamp included.
    pub len: usize,
}

impl Default for PingOption {
    fn default() -> Self {
        PingOption {
            timeout: Duration::from_secs(100),
            interval: None,
            ident: None,
            len: DEFAULT_PAYLOAD_LEN,
        }
    }
}

/// What happened to one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A correlated reply arrived after this round-trip time.
    Matched(Duration),
    /// The request could not be sent.
    SendFailed,
    /// Nothing became readable before the timeout.
    TimedOut,
    /// A reply-class packet arrived for somebody else.
    WrongIdentifier { expected: u16, actual: u16 },
    /// The captured packet was an echo request, not a reply.
    NotAReply(u8),
    /// The captured frame could not be decoded.
    MalformedFrame(FrameError),
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Matched(rtt) => write!(f, "reply in {:.3}ms", rtt.as_secs_f64() * 1000.0),
            Outcome::SendFailed => write!(f, "send failed"),
            Outcome::TimedOut => write!(f, "receive attempt timed out"),
            Outcome::WrongIdentifier { expected, actual } => {
                write!(f, "identifier mismatch (expected {}, got {})", expected, actual)
            }
            Outcome::NotAReply(icmp_type) => write!(f, "not an echo reply (type {})", icmp_type),
            Outcome::MalformedFrame(e) => write!(f, "malformed frame: {}", e),
        }
    }
}

/// Pinger probes one destination, one attempt at a time, and keeps the
/// running statistics of those attempts.
pub struct Pinger<T: Transport> {
    destination: IpAddr,
    ident: u16,
    timeout: Duration,
    interval: Option<Duration>,
    len: usize,
    sequence: u16,
    stat: Statistics,
    transport: T,
}

impl<T: Transport> Pinger<T> {
    pub fn new(destination: IpAddr, popt: PingOption, transport: T) -> Result<Self, ProbeError> {
        if !destination.is_ipv4() {
            return Err(ProbeError::UnsupportedAddress(destination));
        }

        Ok(Pinger {
            destination,
            ident: popt.ident.unwrap_or_else(rand::random),
            timeout: popt.timeout,
            interval: popt.interval,
            len: popt.len,
            sequence: 0,
            stat: Statistics::new(),
            transport,
        })
    }

    pub fn destination(&self) -> IpAddr {
        self.destination
    }

    pub fn ident(&self) -> u16 {
        self.ident
    }

    /// Sequence number the next request will carry.
    pub fn sequence(&self) -> u16 {
        self.sequence
    }

    pub fn statistics(&self) -> &Statistics {
        &self.stat
    }

    /// Run up to `max_count` attempts.
    ///
    /// Stops early once the time since the start exceeds the timeout; the
    /// report is then flagged `timed_out`. Only a socket that cannot be
    /// opened or read ends the run with an error.
    pub fn run(&mut self, max_count: usize) -> Result<PingReport, ProbeError> {
        info!(
            "PING {} ident={} payload={} bytes count={}",
            self.destination, self.ident, self.len, max_count
        );

        let start = Instant::now();
        let mut count = 0;

        while count < max_count && start.elapsed() < self.timeout {
            let outcome = self.attempt()?;
            self.stat.add_sent();

            match &outcome {
                Outcome::Matched(rtt) => {
                    self.stat.add_reply(*rtt);
                    debug!("{}: attempt {} {}", self.destination, count, outcome);
                }
                other => warn!("Failed to receive ping from {}: {}", self.destination, other),
            }

            count += 1;
            if count < max_count {
                if let Some(interval) = self.interval {
                    thread::sleep(interval);
                }
            }
        }

        let timed_out = count < max_count;
        if timed_out {
            info!("{}: timed out after {} of {} attempts", self.destination, count, max_count);
        }

        Ok(self.stat.report(timed_out))
    }

    /// Send a request on `socket` and return when it left.
    ///
    /// On failure the error is logged and `None` is returned; the caller
    /// drops the socket and scores the attempt as lost. The sequence number
    /// only advances on success.
    pub fn send(&mut self, socket: &mut T::Socket) -> Option<Instant> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or_default();
        let packet = build_echo_request(self.ident, self.sequence, self.len, timestamp);

        let sent_at = Instant::now();
        match socket.send_to(&packet, self.destination) {
            Ok(_) => {
                debug!(
                    "sent {} bytes to {} ident={} seq={}",
                    packet.len(),
                    self.destination,
                    self.ident,
                    self.sequence
                );
                self.sequence = self.sequence.wrapping_add(1);
                Some(sent_at)
            }
            Err(e) => {
                error!("Ping to {} failed with error: {}", self.destination, e);
                None
            }
        }
    }

    // One send and one receive on a socket of its own, closed on return.
    fn attempt(&mut self) -> Result<Outcome, ProbeError> {
        let mut socket = self.transport.open()?;

        match self.send(&mut socket) {
            Some(sent_at) => receive(&mut socket, self.ident, sent_at, self.timeout),
            None => Ok(Outcome::SendFailed),
        }
    }
}

/// Wait up to `timeout` for one frame on `socket` and correlate it.
///
/// The reply is accepted when its identifier is `ident` and it is not an
/// echo request. The round-trip time is measured up to the moment the
/// socket became readable. Only socket errors are returned as `Err`.
pub fn receive<S: ProbeSocket>(
    socket: &mut S,
    ident: u16,
    sent_at: Instant,
    timeout: Duration,
) -> Result<Outcome, ProbeError> {
    if !socket.wait_readable(timeout).map_err(ProbeError::Receive)? {
        return Ok(Outcome::TimedOut);
    }
    let received_at = Instant::now();

    let mut buf = [0u8; MAX_RECV];
    let n = socket.recv(&mut buf).map_err(ProbeError::Receive)?;

    let header = match parse_echo_frame(&buf[..n]) {
        Ok(header) => header,
        Err(e) => return Ok(Outcome::MalformedFrame(e)),
    };
    debug!(
        "received type={} code={} ident={} seq={}",
        header.icmp_type, header.code, header.identifier, header.sequence
    );

    if header.icmp_type == IcmpTypes::EchoRequest.0 {
        return Ok(Outcome::NotAReply(header.icmp_type));
    }
    if header.identifier != ident {
        return Ok(Outcome::WrongIdentifier {
            expected: ident,
            actual: header.identifier,
        });
    }

    Ok(Outcome::Matched(received_at.saturating_duration_since(sent_at)))
}
