//! Error types for probe runs.

use std::io;
use std::net::IpAddr;

use thiserror::Error;

/// Fatal errors. These stop a run and are never folded into statistics.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("failed to create raw ICMP socket (are you root?): {0}")]
    SocketCreation(#[source] io::Error),

    #[error("destination {0} is not an IPv4 address, ICMPv6 is not supported")]
    UnsupportedAddress(IpAddr),

    #[error("failed to receive from socket: {0}")]
    Receive(#[source] io::Error),
}

/// Reasons a captured frame could not be decoded into an ICMP header.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("frame too short: expected at least {expected} bytes, got {actual}")]
    TooShort { expected: usize, actual: usize },

    #[error("not an IPv4 frame (version {0})")]
    NotIpv4(u8),

    #[error("invalid IPv4 header length {0}")]
    BadHeaderLength(u8),
}
