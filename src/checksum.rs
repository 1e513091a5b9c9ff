//! Internet checksum (RFC 1071).

/// Calculate the Internet checksum of `data`.
///
/// The bytes are summed as consecutive 16-bit little-endian words with
/// end-around carry; an odd trailing byte is padded with a zero octet. The
/// result is the one's complement of that sum.
///
/// Because the words are read little-endian, the value must be written to
/// the wire with [`u16::to_le_bytes`] (equivalently, stored byte-swapped in a
/// big-endian header field). A buffer that already carries its checksum
/// sums to zero.
pub fn internet_checksum(data: &[u8]) -> u16 {
    let mut sum: u32 = 0;

    for word in data.chunks(2) {
        let lo = word[0] as u32;
        let hi = word.get(1).copied().unwrap_or(0) as u32;
        sum = ones_complement_add(sum, (hi << 8) | lo);
    }

    !(sum as u16)
}

/// Verify a buffer whose checksum field is already filled in.
pub fn verify_checksum(data: &[u8]) -> bool {
    internet_checksum(data) == 0
}

fn ones_complement_add(a: u32, b: u32) -> u32 {
    let sum = a + b;
    if sum > 0xFFFF {
        sum - 0x10000 + 1
    } else {
        sum
    }
}
