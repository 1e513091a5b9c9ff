//! ICMP echo packet encoding and captured frame decoding (RFC 792).

use pnet_packet::icmp::echo_reply::EchoReplyPacket;
use pnet_packet::icmp::echo_request::MutableEchoRequestPacket;
use pnet_packet::icmp::{IcmpCode, IcmpType, IcmpTypes};
use pnet_packet::ipv4::Ipv4Packet;

use crate::checksum::internet_checksum;
use crate::error::FrameError;

/// Size of the ICMP echo header: type, code, checksum, identifier, sequence.
pub const ICMP_HEADER_LEN: usize = 8;
/// Size of the send timestamp that opens every payload.
pub const TIMESTAMP_LEN: usize = 8;
/// Payload length used when none is configured.
pub const DEFAULT_PAYLOAD_LEN: usize = 56;
/// Filler written after the timestamp.
pub const PADDING_BYTE: u8 = b'Q';
/// Largest frame read from the socket in one go.
pub const MAX_RECV: usize = 2048;

const IPV4_MIN_HEADER_LEN: usize = 20;

/// The decoded ICMP echo header of a captured frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EchoHeader {
    pub icmp_type: u8,
    pub code: u8,
    pub checksum: u16,
    pub identifier: u16,
    pub sequence: u16,
}

/// Build an Echo Request whose payload is `timestamp` (seconds, big-endian
/// `f64`) followed by padding up to `payload_len` bytes.
///
/// `payload_len` is raised to [`TIMESTAMP_LEN`] if smaller.
pub fn build_echo_request(identifier: u16, sequence: u16, payload_len: usize, timestamp: f64) -> Vec<u8> {
    let payload_len = payload_len.max(TIMESTAMP_LEN);
    let mut payload = vec![PADDING_BYTE; payload_len];
    payload[..TIMESTAMP_LEN].copy_from_slice(&timestamp.to_be_bytes());

    encode_echo(IcmpTypes::EchoRequest, identifier, sequence, &payload)
}

/// Encode an echo-class ICMP message and fill in its checksum.
///
/// The checksum is computed over the header with a zeroed checksum field
/// followed by the payload, then stored so the wire bytes carry it in
/// network order.
pub fn encode_echo(icmp_type: IcmpType, identifier: u16, sequence: u16, payload: &[u8]) -> Vec<u8> {
    let mut buf = vec![0u8; ICMP_HEADER_LEN + payload.len()];

    {
        // the buffer is never shorter than the echo header
        let mut packet = MutableEchoRequestPacket::new(&mut buf[..])
            .unwrap_or_else(|| unreachable!("echo buffer shorter than header"));
        packet.set_icmp_type(icmp_type);
        packet.set_icmp_code(IcmpCode::new(0));
        packet.set_checksum(0);
        packet.set_identifier(identifier);
        packet.set_sequence_number(sequence);
        packet.set_payload(payload);
    }

    let sum = internet_checksum(&buf);
    buf[2..4].copy_from_slice(&sum.to_le_bytes());

    buf
}

/// Decode the ICMP header of a frame captured on a raw IPv4 socket.
///
/// The IPv4 header length is taken from the IHL field, so frames carrying
/// IP options are handled.
pub fn parse_echo_frame(frame: &[u8]) -> Result<EchoHeader, FrameError> {
    let ip = Ipv4Packet::new(frame).ok_or(FrameError::TooShort {
        expected: IPV4_MIN_HEADER_LEN,
        actual: frame.len(),
    })?;

    let version = ip.get_version();
    if version != 4 {
        return Err(FrameError::NotIpv4(version));
    }

    let ihl = ip.get_header_length();
    let offset = ihl as usize * 4;
    if offset < IPV4_MIN_HEADER_LEN {
        return Err(FrameError::BadHeaderLength(ihl));
    }

    let expected = offset + ICMP_HEADER_LEN;
    let icmp = frame
        .get(offset..)
        .and_then(EchoReplyPacket::new)
        .ok_or(FrameError::TooShort {
            expected,
            actual: frame.len(),
        })?;

    Ok(EchoHeader {
        icmp_type: icmp.get_icmp_type().0,
        code: icmp.get_icmp_code().0,
        checksum: icmp.get_checksum(),
        identifier: icmp.get_identifier(),
        sequence: icmp.get_sequence_number(),
    })
}
