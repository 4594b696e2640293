use core::{fmt, str::FromStr};
use byteorder::{ByteOrder, NetworkEndian};

use crate::packet::{Context, Discriminant, Layer, LayerKind, Packet};
use crate::wire::{Error, Result};

enum_with_unknown! {
    /// Ethernet protocol type.
    pub enum EtherType(u16) {
        Ipv4 = 0x0800,
        Arp  = 0x0806,
        Vlan = 0x8100,
        Ipv6 = 0x86DD,
        ServiceVlan = 0x88A8,
    }
}

impl EtherType {
    /// The largest value of the type field that is an IEEE 802.3 length instead.
    pub const MAX_LENGTH: u16 = 1500;

    /// The ethertype announcing a payload layer.
    pub fn of_layer(kind: LayerKind) -> Option<EtherType> {
        match kind {
            LayerKind::Ipv4 => Some(EtherType::Ipv4),
            LayerKind::Arp => Some(EtherType::Arp),
            LayerKind::Vlan => Some(EtherType::Vlan),
            LayerKind::Ipv6 => Some(EtherType::Ipv6),
            _ => None,
        }
    }

    /// Check if the value is an IEEE 802.3 payload length.
    pub fn is_length(self) -> bool {
        u16::from(self) <= Self::MAX_LENGTH
    }
}

impl fmt::Display for EtherType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EtherType::Ipv4 => write!(f, "IPv4"),
            EtherType::Ipv6 => write!(f, "IPv6"),
            EtherType::Arp  => write!(f, "ARP"),
            EtherType::Vlan => write!(f, "802.1Q"),
            EtherType::ServiceVlan => write!(f, "802.1ad"),
            EtherType::Unknown(id) => write!(f, "0x{:04x}", id)
        }
    }
}

/// A six-octet Ethernet II address.
#[derive(Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Default)]
pub struct Address(pub [u8; 6]);

impl Address {
    /// The broadcast address.
    pub const BROADCAST: Address = Address([0xff; 6]);

    /// Construct an Ethernet address from a sequence of octets, in big-endian.
    ///
    /// # Panics
    /// The function panics if `data` is not six octets long.
    pub fn from_bytes(data: &[u8]) -> Address {
        let mut bytes = [0; 6];
        bytes.copy_from_slice(data);
        Address(bytes)
    }

    /// Return an Ethernet address as a sequence of octets, in big-endian.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Query whether the address is an unicast address.
    pub fn is_unicast(&self) -> bool {
        !(self.is_broadcast() ||
          self.is_multicast())
    }

    /// Query whether this address is the broadcast address.
    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }

    /// Query whether the "multicast" bit in the OUI is set.
    pub fn is_multicast(&self) -> bool {
        self.0[0] & 0x01 != 0
    }

    /// Query whether the "locally administered" bit in the OUI is set.
    pub fn is_local(&self) -> bool {
        self.0[0] & 0x02 != 0
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseAddressError {
    kind: ParseAddressErrorKind,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ParseAddressErrorKind {
    ComponentError,
    SeparatorError,
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let bytes = self.0;
        write!(f, "{:02x}-{:02x}-{:02x}-{:02x}-{:02x}-{:02x}",
               bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5])
    }
}

impl fmt::Display for ParseAddressError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self.kind {
            ParseAddressErrorKind::ComponentError => "invalid ethernet component",
            ParseAddressErrorKind::SeparatorError => "unexpected number of ethernet address components (should be 6)",
        })
    }
}

impl std::error::Error for ParseAddressError {}

impl FromStr for Address {
    type Err = ParseAddressError;

    fn from_str(src: &str) -> core::result::Result<Self, ParseAddressError> {
        let mut parsed = [0; 6];
        let mut components = src.split(':');
        for c in parsed.iter_mut() {
            let part = components
                .next()
                .ok_or(ParseAddressError {
                    kind: ParseAddressErrorKind::SeparatorError,
                })?;
            *c = u8::from_str_radix(part, 16)
                .map_err(|_| ParseAddressError {
                    kind: ParseAddressErrorKind::ComponentError,
                })?;
        }

        if let Some(_) = components.next() {
            Err(ParseAddressError {
                kind: ParseAddressErrorKind::SeparatorError,
            })
        } else {
            Ok(Address(parsed))
        }
    }
}

byte_wrapper! {
    /// A byte sequence representing an Ethernet II header.
    #[derive(Debug, PartialEq, Eq)]
    pub struct ethernet([u8]);
}

header_wrapper!(ethernet, LayerKind::Ethernet);

mod field {
    use crate::wire::field::*;

    pub(crate) const DESTINATION: Field =  0..6;
    pub(crate) const SOURCE:      Field =  6..12;
    pub(crate) const ETHERTYPE:   Field = 12..14;
    pub(crate) const PAYLOAD:     Rest  = 14..;
}

/// The length of the Ethernet II header.
pub const HEADER_LEN: usize = field::PAYLOAD.start;

impl ethernet {
    /// Imbue a raw octet buffer with Ethernet header structure.
    pub fn new_unchecked(data: &[u8]) -> &Self {
        Self::__from_macro_new_unchecked(data)
    }

    /// Imbue a mutable octet buffer with Ethernet header structure.
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

    /// Unwrap the header as a raw byte slice.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Unwrap the header as a mutable raw byte slice.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }

    /// Ensure that no accessor method will panic if called.
    /// Returns `Err(Error::Truncated)` if the buffer is too short.
    pub fn check_len(&self) -> Result<()> {
        let len = self.0.len();
        if len < field::PAYLOAD.start {
            Err(Error::Truncated)
        } else {
            Ok(())
        }
    }

    /// Return the destination address field.
    pub fn dst_addr(&self) -> Address {
        Address::from_bytes(&self.0[field::DESTINATION])
    }

    /// Return the source address field.
    pub fn src_addr(&self) -> Address {
        Address::from_bytes(&self.0[field::SOURCE])
    }

    /// Return the EtherType field, without checking for 802.1Q.
    pub fn ethertype(&self) -> EtherType {
        let raw = NetworkEndian::read_u16(&self.0[field::ETHERTYPE]);
        EtherType::from(raw)
    }

    /// Set the destination address field.
    pub fn set_dst_addr(&mut self, value: Address) {
        self.0[field::DESTINATION].copy_from_slice(value.as_bytes())
    }

    /// Set the source address field.
    pub fn set_src_addr(&mut self, value: Address) {
        self.0[field::SOURCE].copy_from_slice(value.as_bytes())
    }

    /// Set the EtherType field.
    pub fn set_ethertype(&mut self, value: EtherType) {
        NetworkEndian::write_u16(&mut self.0[field::ETHERTYPE], value.into())
    }
}

impl AsRef<[u8]> for ethernet {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl AsMut<[u8]> for ethernet {
    fn as_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }
}

/// A high-level representation of an Ethernet II header.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Repr {
    pub src_addr:    Address,
    pub dst_addr:    Address,
    pub ethertype:   EtherType,
}

impl Repr {
    /// Parse an Ethernet II header and return a high-level representation.
    pub fn parse(frame: &ethernet) -> Result<Repr> {
        frame.check_len()?;
        Ok(Repr {
            src_addr: frame.src_addr(),
            dst_addr: frame.dst_addr(),
            ethertype: frame.ethertype(),
        })
    }

    /// Return the length of a header that will be emitted from this high-level representation.
    pub fn header_len(&self) -> usize {
        HEADER_LEN
    }

    /// Emit a high-level representation into an Ethernet II header.
    pub fn emit(&self, frame: &mut ethernet) {
        frame.set_src_addr(self.src_addr);
        frame.set_dst_addr(self.dst_addr);
        frame.set_ethertype(self.ethertype);
    }

    /// Create a standalone Ethernet layer with this header.
    pub fn to_packet(&self) -> Packet {
        let mut header = vec![0; self.header_len()];
        self.emit(ethernet::new_unchecked_mut(&mut header));
        Packet::from_header(&Dissector, header)
    }
}

impl fmt::Display for Repr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "EthernetII src={} dst={} type={}",
               self.src_addr, self.dst_addr, self.ethertype)
    }
}

/// The Ethernet II layer.
///
/// A type field no larger than 1500 is an IEEE 802.3 length. Such frames carry their payload as
/// opaque bytes and any bytes beyond the length are padding.
#[derive(Debug, Clone, Copy, Default)]
pub struct Dissector;

impl Layer for Dissector {
    fn kind(&self) -> LayerKind {
        LayerKind::Ethernet
    }

    fn header_len(&self, data: &[u8]) -> Result<usize> {
        ethernet::new_checked(data)?;
        Ok(HEADER_LEN)
    }

    fn payload_len(&self, header: &[u8], available: usize) -> usize {
        match ethernet::new_checked(header).map(ethernet::ethertype) {
            Ok(length) if length.is_length() => usize::from(u16::from(length)),
            _ => available,
        }
    }

    fn next(&self, header: &[u8], _: &[u8]) -> Option<Discriminant> {
        let ethertype = ethernet::new_checked(header).ok()?.ethertype();
        if ethertype.is_length() {
            return None;
        }
        Some(Discriminant::EtherType(ethertype))
    }

    fn discriminant_of(&self, payload: LayerKind) -> Option<Discriminant> {
        EtherType::of_layer(payload).map(Discriminant::EtherType)
    }

    fn set_next(&self, header: &mut [u8], next: Discriminant) {
        if let (Discriminant::EtherType(ethertype), Ok(frame)) = (next, ethernet::new_checked_mut(header)) {
            frame.set_ethertype(ethertype);
        }
    }

    fn default_header(&self) -> Vec<u8> {
        vec![0; HEADER_LEN]
    }

    fn required_header_len(&self, _: &[u8]) -> Option<usize> {
        Some(HEADER_LEN)
    }

    fn recompute(&self, header: &mut [u8], cx: &Context) {
        if let Ok(frame) = ethernet::new_checked_mut(header) {
            if frame.ethertype().is_length() && cx.payload.len() <= usize::from(EtherType::MAX_LENGTH) {
                frame.set_ethertype(EtherType::from(cx.payload.len() as u16));
            }
        }
    }
}
