//! BSD loopback encapsulation.
//!
//! A four byte address family in the byte order of the capturing host, which is little endian
//! for all captures this crate expects.
use byteorder::{ByteOrder, LittleEndian};

use crate::packet::{Discriminant, Layer, LayerKind, Packet};
use super::{Error, Result, View, ViewMut};

/// Address family values of the loopback header.
pub mod family {
    pub const IPV4: u32 = 2;
    /// IPv6 as used by NetBSD and OpenBSD.
    pub const IPV6: u32 = 24;
    /// IPv6 as used by FreeBSD.
    pub const IPV6_FREEBSD: u32 = 28;
    /// IPv6 as used by Darwin.
    pub const IPV6_DARWIN: u32 = 30;
}

/// The length of the loopback header.
pub const HEADER_LEN: usize = 4;

/// A high-level representation of a loopback header.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Repr {
    pub family: u32,
}

impl Repr {
    pub fn parse(header: &[u8]) -> Result<Repr> {
        let family = View::new(header).read_u32::<LittleEndian>(0)
            .map_err(|_| Error::Truncated)?;
        Ok(Repr { family })
    }

    pub fn header_len(&self) -> usize {
        HEADER_LEN
    }

    /// Write the family into the first four bytes of `header`.
    pub fn emit(&self, header: &mut [u8]) -> Result<()> {
        ViewMut::new(header).write_u32::<LittleEndian>(0, self.family)
            .map_err(|_| Error::Truncated)
    }

    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut header = [0; HEADER_LEN];
        LittleEndian::write_u32(&mut header, self.family);
        header
    }

    /// Create a standalone loopback layer with this header.
    pub fn to_packet(&self) -> Packet {
        Packet::from_header(&Dissector, self.to_bytes().to_vec())
    }
}

/// The loopback link layer.
///
/// Every address family is a candidate payload. Families other than IPv4 and IPv6 are not
/// implemented and fail the decoding of a packet.
#[derive(Debug, Clone, Copy, Default)]
pub struct Dissector;

impl Layer for Dissector {
    fn kind(&self) -> LayerKind {
        LayerKind::Null
    }

    fn header_len(&self, data: &[u8]) -> Result<usize> {
        Repr::parse(data)?;
        Ok(HEADER_LEN)
    }

    fn next(&self, header: &[u8], _: &[u8]) -> Option<Discriminant> {
        let repr = Repr::parse(header).ok()?;
        Some(Discriminant::NullFamily(repr.family))
    }

    fn discriminant_of(&self, payload: LayerKind) -> Option<Discriminant> {
        match payload {
            LayerKind::Ipv4 => Some(Discriminant::NullFamily(family::IPV4)),
            LayerKind::Ipv6 => Some(Discriminant::NullFamily(family::IPV6)),
            _ => None,
        }
    }

    fn set_next(&self, header: &mut [u8], next: Discriminant) {
        let field = header.get_mut(..HEADER_LEN);
        if let (Discriminant::NullFamily(family), Some(field)) = (next, field) {
            field.copy_from_slice(&Repr { family }.to_bytes());
        }
    }

    fn default_header(&self) -> Vec<u8> {
        Repr { family: family::IPV4 }.to_bytes().to_vec()
    }

    fn required_header_len(&self, _: &[u8]) -> Option<usize> {
        Some(HEADER_LEN)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_family() {
        let bytes = [0x02, 0x00, 0x00, 0x00];
        assert_eq!(Repr::parse(&bytes), Ok(Repr { family: family::IPV4 }));
        assert_eq!(Dissector.next(&bytes, &[]), Some(Discriminant::NullFamily(2)));

        let mut header = [0; 4];
        Dissector.set_next(&mut header, Discriminant::NullFamily(family::IPV6_DARWIN));
        assert_eq!(header, [30, 0, 0, 0]);
        assert_eq!(Repr { family: family::IPV6 }.emit(&mut header), Ok(()));
        assert_eq!(header, [24, 0, 0, 0]);
    }

    #[test]
    fn test_short_header_untouched() {
        let mut header = [0x02, 0x00, 0x00];
        Dissector.set_next(&mut header, Discriminant::NullFamily(family::IPV6_FREEBSD));
        assert_eq!(header, [0x02, 0x00, 0x00]);
        assert_eq!(Repr { family: family::IPV6 }.emit(&mut header), Err(Error::Truncated));
        assert_eq!(Dissector.default_header(), [0x02, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn test_truncated() {
        assert_eq!(Dissector.header_len(&[0x02]), Err(Error::Truncated));
        assert_eq!(Dissector.header_len(&[]), Err(Error::Truncated));
    }
}
