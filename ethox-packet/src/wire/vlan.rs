//! The IEEE 802.1Q tag.
//!
//! The tag follows the addresses of an Ethernet frame whose type field is `0x8100` (or `0x88a8`
//! for an outer service tag) and carries the actual type of the payload.
use core::fmt;
use byteorder::{ByteOrder, NetworkEndian};

use crate::packet::{Discriminant, Layer, LayerKind, Packet};
use super::{EtherType, Error, Result};

byte_wrapper! {
    /// A byte sequence representing an 802.1Q tag.
    #[derive(Debug, PartialEq, Eq)]
    pub struct vlan([u8]);
}

header_wrapper!(vlan, LayerKind::Vlan);

mod field {
    use crate::wire::field::Field;

    pub(crate) const TCI:       Field = 0..2;
    pub(crate) const ETHERTYPE: Field = 2..4;
}

/// The length of the tag.
pub const HEADER_LEN: usize = field::ETHERTYPE.end;

impl vlan {
    pub fn new_unchecked(data: &[u8]) -> &Self {
        Self::__from_macro_new_unchecked(data)
    }

    pub fn new_unchecked_mut(data: &mut [u8]) -> &mut Self {
        Self::__from_macro_new_unchecked_mut(data)
    }

    pub fn new_checked(data: &[u8]) -> Result<&Self> {
        Self::new_unchecked(data).check_len()?;
        Ok(Self::new_unchecked(data))
    }

    pub fn new_checked_mut(data: &mut [u8]) -> Result<&mut Self> {
        Self::new_checked(&data[..])?;
        Ok(Self::new_unchecked_mut(data))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn check_len(&self) -> Result<()> {
        if self.0.len() < HEADER_LEN {
            Err(Error::Truncated)
        } else {
            Ok(())
        }
    }

    /// The priority code point, three bits.
    pub fn priority(&self) -> u8 {
        self.0[field::TCI.start] >> 5
    }

    /// The drop eligible indicator.
    pub fn drop_eligible(&self) -> bool {
        self.0[field::TCI.start] & 0x10 != 0
    }

    /// The twelve bit VLAN identifier.
    pub fn vlan_id(&self) -> u16 {
        NetworkEndian::read_u16(&self.0[field::TCI]) & 0x0fff
    }

    /// The type of the encapsulated payload.
    pub fn ethertype(&self) -> EtherType {
        NetworkEndian::read_u16(&self.0[field::ETHERTYPE]).into()
    }

    pub fn set_priority(&mut self, value: u8) {
        let byte = &mut self.0[field::TCI.start];
        *byte = (*byte & 0x1f) | (value << 5);
    }

    pub fn set_drop_eligible(&mut self, value: bool) {
        let byte = &mut self.0[field::TCI.start];
        *byte = (*byte & !0x10) | if value { 0x10 } else { 0 };
    }

    /// Set the VLAN identifier, the upper four bits of `value` are ignored.
    pub fn set_vlan_id(&mut self, value: u16) {
        let tci = NetworkEndian::read_u16(&self.0[field::TCI]);
        NetworkEndian::write_u16(&mut self.0[field::TCI], (tci & 0xf000) | (value & 0x0fff));
    }

    pub fn set_ethertype(&mut self, value: EtherType) {
        NetworkEndian::write_u16(&mut self.0[field::ETHERTYPE], value.into())
    }
}

impl AsRef<[u8]> for vlan {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// A high-level representation of an 802.1Q tag.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Repr {
    pub priority: u8,
    pub drop_eligible: bool,
    pub vlan_id: u16,
    pub ethertype: EtherType,
}

impl Repr {
    pub fn parse(tag: &vlan) -> Result<Repr> {
        tag.check_len()?;
        Ok(Repr {
            priority: tag.priority(),
            drop_eligible: tag.drop_eligible(),
            vlan_id: tag.vlan_id(),
            ethertype: tag.ethertype(),
        })
    }

    pub fn header_len(&self) -> usize {
        HEADER_LEN
    }

    pub fn emit(&self, tag: &mut vlan) {
        tag.set_priority(self.priority);
        tag.set_drop_eligible(self.drop_eligible);
        tag.set_vlan_id(self.vlan_id);
        tag.set_ethertype(self.ethertype);
    }

    /// Create a standalone tag layer.
    pub fn to_packet(&self) -> Packet {
        let mut header = vec![0; self.header_len()];
        self.emit(vlan::new_unchecked_mut(&mut header));
        Packet::from_header(&Dissector, header)
    }
}

impl fmt::Display for Repr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "802.1Q vid={} pcp={} type={}", self.vlan_id, self.priority, self.ethertype)
    }
}

/// The 802.1Q tag layer.
#[derive(Debug, Clone, Copy, Default)]
pub struct Dissector;

impl Layer for Dissector {
    fn kind(&self) -> LayerKind {
        LayerKind::Vlan
    }

    fn header_len(&self, data: &[u8]) -> Result<usize> {
        vlan::new_checked(data)?;
        Ok(HEADER_LEN)
    }

    fn next(&self, header: &[u8], _: &[u8]) -> Option<Discriminant> {
        let tag = vlan::new_checked(header).ok()?;
        Some(Discriminant::EtherType(tag.ethertype()))
    }

    fn discriminant_of(&self, payload: LayerKind) -> Option<Discriminant> {
        EtherType::of_layer(payload).map(Discriminant::EtherType)
    }

    fn set_next(&self, header: &mut [u8], next: Discriminant) {
        if let (Discriminant::EtherType(ethertype), Ok(tag)) = (next, vlan::new_checked_mut(header)) {
            tag.set_ethertype(ethertype);
        }
    }

    fn default_header(&self) -> Vec<u8> {
        vec![0; HEADER_LEN]
    }

    fn required_header_len(&self, _: &[u8]) -> Option<usize> {
        Some(HEADER_LEN)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    static TAG_BYTES: [u8; 4] = [0xa0, 0x2a, 0x86, 0xdd];

    #[test]
    fn test_deconstruct() {
        let tag = vlan::new_checked(&TAG_BYTES[..]).unwrap();
        assert_eq!(tag.priority(), 5);
        assert!(!tag.drop_eligible());
        assert_eq!(tag.vlan_id(), 42);
        assert_eq!(tag.ethertype(), EtherType::Ipv6);
        assert_eq!(Dissector.next(&TAG_BYTES, &[]), Some(Discriminant::EtherType(EtherType::Ipv6)));
    }

    #[test]
    fn test_emit() {
        let repr = Repr {
            priority: 5,
            drop_eligible: false,
            vlan_id: 42,
            ethertype: EtherType::Ipv6,
        };
        let mut bytes = [0xff; 4];
        repr.emit(vlan::new_unchecked_mut(&mut bytes));
        assert_eq!(bytes, TAG_BYTES);
        assert_eq!(Repr::parse(vlan::new_unchecked(&bytes)), Ok(repr));
    }

    #[test]
    fn test_truncated() {
        assert_eq!(Dissector.header_len(&TAG_BYTES[..1]), Err(Error::Truncated));
    }
}
