//! Checksum and frame check sequence routines.
//!
//! The Internet checksum is handled in its uncomplemented form internally so that partial sums of
//! a pseudo header, a header and its payload can be combined before the final complement.
use byteorder::{ByteOrder, NetworkEndian};

use super::ip::Protocol;
use super::ipv4::Address as Ipv4Address;
use super::ipv6::Address as Ipv6Address;

fn propagate_carries(word: u32) -> u16 {
    let sum = (word >> 16) + (word & 0xffff);
    ((sum >> 16) as u16) + (sum as u16)
}

fn fold(word: u64) -> u32 {
    let sum = (word >> 32) + (word & 0xffff_ffff);
    ((sum >> 32) + (sum & 0xffff_ffff)) as u32
}

/// Compute an RFC 1071 compliant checksum (without the final complement).
pub fn data(mut data: &[u8]) -> u16 {
    // Wide enough for any slice that fits into memory.
    let mut accum: u64 = 0;

    // For each 32-byte chunk...
    const CHUNK_SIZE: usize = 32;
    while data.len() >= CHUNK_SIZE {
        let mut d = &data[..CHUNK_SIZE];
        // ... take by 2 bytes and sum them.
        while d.len() >= 2 {
            accum += NetworkEndian::read_u16(d) as u64;
            d = &d[2..];
        }

        data = &data[CHUNK_SIZE..];
    }

    // Sum the rest that does not fit the last 32-byte chunk,
    // taking by 2 bytes.
    while data.len() >= 2 {
        accum += NetworkEndian::read_u16(data) as u64;
        data = &data[2..];
    }

    // Add the last remaining odd byte, if any.
    if let Some(&value) = data.first() {
        accum += (value as u64) << 8;
    }

    propagate_carries(fold(accum))
}

/// Combine several RFC 1071 compliant checksums.
pub fn combine(checksums: &[u16]) -> u16 {
    let mut accum: u32 = 0;
    for &word in checksums {
        accum += word as u32;
    }
    propagate_carries(accum)
}

/// The value to store in a checksum field covering `data`.
///
/// The checksum field itself must be zeroed in `data`.
pub fn compute(data: &[u8]) -> u16 {
    !self::data(data)
}

/// Check bytes that include their own checksum field.
pub fn verify(data: &[u8]) -> bool {
    self::data(data) == !0
}

/// The addresses of an enclosing IP header, needed for transport checksums.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PseudoHeader {
    Ipv4 {
        src_addr: Ipv4Address,
        dst_addr: Ipv4Address,
    },
    Ipv6 {
        src_addr: Ipv6Address,
        dst_addr: Ipv6Address,
    },
}

impl PseudoHeader {
    /// Compute the uncomplemented sum of the pseudo header.
    ///
    /// The `length` is the length of the upper layer packet, header and payload.
    pub fn checksum(&self, protocol: Protocol, length: u32) -> u16 {
        match self {
            PseudoHeader::Ipv4 { src_addr, dst_addr } => {
                let mut proto_len = [0u8; 4];
                proto_len[1] = protocol.into();
                NetworkEndian::write_u16(&mut proto_len[2..4], length as u16);

                combine(&[
                    data(src_addr.as_bytes()),
                    data(dst_addr.as_bytes()),
                    data(&proto_len[..])
                ])
            },
            PseudoHeader::Ipv6 { src_addr, dst_addr } => {
                let mut proto_len = [0u8; 8];
                proto_len[7] = protocol.into();
                NetworkEndian::write_u32(&mut proto_len[0..4], length);

                combine(&[
                    data(src_addr.as_bytes()),
                    data(dst_addr.as_bytes()),
                    data(&proto_len[..])
                ])
            },
        }
    }
}

/// Sum a transport header and its payload, including the pseudo header if there is one.
///
/// The header and payload are summed separately, so the header must have an even length. This
/// holds for every header with a checksum of this kind.
pub(crate) fn upper_layer(
    pseudo: Option<&PseudoHeader>,
    protocol: Protocol,
    header: &[u8],
    payload: &[u8],
) -> u16 {
    let length = (header.len() + payload.len()) as u32;
    let pseudo = pseudo.map_or(0, |pseudo| pseudo.checksum(protocol, length));
    combine(&[pseudo, data(header), data(payload)])
}

/// Compute a CRC-32 frame check sequence as used by Ethernet and IEEE 802.11.
///
/// The value is stored least significant byte first in the trailing four bytes of the frame.
pub fn crc32(frame: &[u8]) -> u32 {
    crc32fast::hash(frame)
}
