use core::fmt;
use byteorder::{ByteOrder, NetworkEndian};

use crate::packet::{Context, Discriminant, Layer, LayerKind, LayerMut, Packet};
use super::{checksum, Error, Checksum, PseudoHeader, Result};

pub use super::IpProtocol as Protocol;

/// Minimum MTU required of all links supporting IPv4. See [RFC 791 § 3.1].
///
/// [RFC 791 § 3.1]: https://tools.ietf.org/html/rfc791#section-3.1
pub const MIN_MTU: usize = 576;

/// A four-octet IPv4 address.
#[derive(Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Default)]
pub struct Address(pub [u8; 4]);

impl Address {
    /// An unspecified address.
    pub const UNSPECIFIED: Address = Address([0x00; 4]);

    /// The broadcast address.
    pub const BROADCAST:   Address = Address([0xff; 4]);

    /// Construct an IPv4 address from parts.
    pub const fn new(a0: u8, a1: u8, a2: u8, a3: u8) -> Address {
        Address([a0, a1, a2, a3])
    }

    /// Construct an IPv4 address from a sequence of octets, in big-endian.
    ///
    /// # Panics
    /// The function panics if `data` is not four octets long.
    pub fn from_bytes(data: &[u8]) -> Address {
        let mut bytes = [0; 4];
        bytes.copy_from_slice(data);
        Address(bytes)
    }

    /// Return an IPv4 address as a sequence of octets, in big-endian.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Encode the address into a `u32` in network endian byte order.
    pub fn to_network_integer(self) -> u32 {
        u32::from_be_bytes(self.0)
    }

    /// Decode a network endian `u32` into an address.
    pub fn from_network_integer(num: u32) -> Self {
        Address(num.to_be_bytes())
    }

    /// Query whether the address is an unicast address.
    pub fn is_unicast(&self) -> bool {
        !(self.is_broadcast() ||
          self.is_multicast() ||
          self.is_unspecified())
    }

    /// Query whether the address is the broadcast address.
    pub fn is_broadcast(&self) -> bool {
        self.0[0..4] == [255; 4]
    }

    /// Query whether the address is a multicast address.
    pub fn is_multicast(&self) -> bool {
        self.0[0] & 0xf0 == 224
    }

    /// Query whether the address falls into the "unspecified" range.
    pub fn is_unspecified(&self) -> bool {
        self.0[0] == 0
    }
}

impl From<::std::net::Ipv4Addr> for Address {
    fn from(x: ::std::net::Ipv4Addr) -> Address {
        Address(x.octets())
    }
}

impl From<Address> for ::std::net::Ipv4Addr {
    fn from(Address(x): Address) -> ::std::net::Ipv4Addr {
        x.into()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let bytes = self.0;
        write!(f, "{}.{}.{}.{}", bytes[0], bytes[1], bytes[2], bytes[3])
    }
}

byte_wrapper! {
    /// A byte sequence representing an IPv4 header, including its options.
    #[derive(Debug, PartialEq, Eq)]
    pub struct ipv4([u8]);
}

header_wrapper!(ipv4, LayerKind::Ipv4);

mod field {
    use crate::wire::field::{Field, Rest};

    pub(crate) const VER_IHL:  usize = 0;
    pub(crate) const DSCP_ECN: usize = 1;
    pub(crate) const LENGTH:   Field = 2..4;
    pub(crate) const IDENT:    Field = 4..6;
    pub(crate) const FLG_OFF:  Field = 6..8;
    pub(crate) const TTL:      usize = 8;
    pub(crate) const PROTOCOL: usize = 9;
    pub(crate) const CHECKSUM: Field = 10..12;
    pub(crate) const SRC_ADDR: Field = 12..16;
    pub(crate) const DST_ADDR: Field = 16..20;
    pub(crate) const OPTIONS:  Rest  = 20..;
}

/// The largest header the four bit header length field can describe.
pub const MAX_HEADER_LEN: usize = 60;

impl ipv4 {
    /// Imbue a raw octet buffer with IPv4 header structure.
    pub fn new_unchecked(buffer: &[u8]) -> &ipv4 {
        Self::__from_macro_new_unchecked(buffer)
    }

    /// Imbue a mutable octet buffer with IPv4 header structure.
    pub fn new_unchecked_mut(buffer: &mut [u8]) -> &mut ipv4 {
        Self::__from_macro_new_unchecked_mut(buffer)
    }

    /// Shorthand for a combination of [new_unchecked] and [check_len].
    ///
    /// [new_unchecked]: #method.new_unchecked
    /// [check_len]: #method.check_len
    pub fn new_checked(data: &[u8]) -> Result<&ipv4> {
        let packet = Self::new_unchecked(data);
        packet.check_len()?;
        Ok(packet)
    }

    /// Shorthand for a combination of [new_unchecked_mut] and [check_len].
    ///
    /// [new_unchecked_mut]: #method.new_unchecked_mut
    /// [check_len]: #method.check_len
    pub fn new_checked_mut(data: &mut [u8]) -> Result<&mut ipv4> {
        Self::new_checked(&data[..])?;
        Ok(Self::new_unchecked_mut(data))
    }

    /// View the header as a raw byte slice.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// View the header as a mutable raw byte slice.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }

    /// Ensure that no accessor method will panic if called.
    /// Returns `Err(Error::Truncated)` if the buffer is too short.
    /// Returns `Err(Error::Malformed)` if the header length is shorter
    /// than the fixed fields.
    ///
    /// The result of this check is invalidated by calling [set_header_len].
    ///
    /// [set_header_len]: #method.set_header_len
    pub fn check_len(&self) -> Result<()> {
        let len = self.0.len();
        if len < field::DST_ADDR.end {
            Err(Error::Truncated)
        } else if usize::from(self.header_len()) < field::DST_ADDR.end {
            Err(Error::Malformed)
        } else if len < usize::from(self.header_len()) {
            Err(Error::Truncated)
        } else {
            Ok(())
        }
    }

    /// Return the version field.
    #[inline]
    pub fn version(&self) -> u8 {
        self.0[field::VER_IHL] >> 4
    }

    /// Return the header length, in octets.
    #[inline]
    pub fn header_len(&self) -> u8 {
        (self.0[field::VER_IHL] & 0x0f) * 4
    }

    /// Return the Differential Services Code Point field.
    pub fn dscp(&self) -> u8 {
        self.0[field::DSCP_ECN] >> 2
    }

    /// Return the Explicit Congestion Notification field.
    pub fn ecn(&self) -> u8 {
        self.0[field::DSCP_ECN] & 0x03
    }

    /// Return the total length field.
    #[inline]
    pub fn total_len(&self) -> u16 {
        NetworkEndian::read_u16(&self.0[field::LENGTH])
    }

    /// Return the fragment identification field.
    #[inline]
    pub fn ident(&self) -> u16 {
        NetworkEndian::read_u16(&self.0[field::IDENT])
    }

    /// Return the "don't fragment" flag.
    #[inline]
    pub fn dont_frag(&self) -> bool {
        NetworkEndian::read_u16(&self.0[field::FLG_OFF]) & 0x4000 != 0
    }

    /// Return the "more fragments" flag.
    #[inline]
    pub fn more_frags(&self) -> bool {
        NetworkEndian::read_u16(&self.0[field::FLG_OFF]) & 0x2000 != 0
    }

    /// Return the fragment offset, in octets.
    #[inline]
    pub fn frag_offset(&self) -> u16 {
        NetworkEndian::read_u16(&self.0[field::FLG_OFF]) << 3
    }

    /// Return the time to live field.
    #[inline]
    pub fn hop_limit(&self) -> u8 {
        self.0[field::TTL]
    }

    /// Return the protocol field.
    #[inline]
    pub fn protocol(&self) -> Protocol {
        Protocol::from(self.0[field::PROTOCOL])
    }

    /// Return the header checksum field.
    #[inline]
    pub fn checksum(&self) -> u16 {
        NetworkEndian::read_u16(&self.0[field::CHECKSUM])
    }

    /// Return the source address field.
    #[inline]
    pub fn src_addr(&self) -> Address {
        Address::from_bytes(&self.0[field::SRC_ADDR])
    }

    /// Return the destination address field.
    #[inline]
    pub fn dst_addr(&self) -> Address {
        Address::from_bytes(&self.0[field::DST_ADDR])
    }

    /// Return the option bytes, including their padding.
    pub fn options(&self) -> &[u8] {
        let end = usize::from(self.header_len());
        &self.0[field::OPTIONS.start..end]
    }

    /// Validate the header checksum.
    ///
    /// # Fuzzing
    /// This function always returns `true` when fuzzing.
    pub fn verify_checksum(&self) -> bool {
        if cfg!(fuzzing) { return true }

        checksum::verify(&self.0[..self.header_len() as usize])
    }

    /// Set the version field.
    #[inline]
    pub fn set_version(&mut self, value: u8) {
        self.0[field::VER_IHL] = (self.0[field::VER_IHL] & !0xf0) | (value << 4);
    }

    /// Set the header length, in octets.
    #[inline]
    pub fn set_header_len(&mut self, value: u8) {
        self.0[field::VER_IHL] = (self.0[field::VER_IHL] & !0x0f) | ((value / 4) & 0x0f);
    }

    /// Set the Differential Services Code Point field.
    pub fn set_dscp(&mut self, value: u8) {
        self.0[field::DSCP_ECN] = (self.0[field::DSCP_ECN] & !0xfc) | (value << 2)
    }

    /// Set the Explicit Congestion Notification field.
    pub fn set_ecn(&mut self, value: u8) {
        self.0[field::DSCP_ECN] = (self.0[field::DSCP_ECN] & !0x03) | (value & 0x03)
    }

    /// Set the total length field.
    #[inline]
    pub fn set_total_len(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.0[field::LENGTH], value)
    }

    /// Set the fragment identification field.
    #[inline]
    pub fn set_ident(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.0[field::IDENT], value)
    }

    /// Clear the entire flags field.
    #[inline]
    pub fn clear_flags(&mut self) {
        let raw = NetworkEndian::read_u16(&self.0[field::FLG_OFF]);
        let raw = raw & !0xe000;
        NetworkEndian::write_u16(&mut self.0[field::FLG_OFF], raw);
    }

    /// Set the "don't fragment" flag.
    #[inline]
    pub fn set_dont_frag(&mut self, value: bool) {
        let raw = NetworkEndian::read_u16(&self.0[field::FLG_OFF]);
        let raw = if value { raw | 0x4000 } else { raw & !0x4000 };
        NetworkEndian::write_u16(&mut self.0[field::FLG_OFF], raw);
    }

    /// Set the "more fragments" flag.
    #[inline]
    pub fn set_more_frags(&mut self, value: bool) {
        let raw = NetworkEndian::read_u16(&self.0[field::FLG_OFF]);
        let raw = if value { raw | 0x2000 } else { raw & !0x2000 };
        NetworkEndian::write_u16(&mut self.0[field::FLG_OFF], raw);
    }

    /// Set the fragment offset, in octets.
    #[inline]
    pub fn set_frag_offset(&mut self, value: u16) {
        let raw = NetworkEndian::read_u16(&self.0[field::FLG_OFF]);
        let raw = (raw & 0xe000) | (value >> 3);
        NetworkEndian::write_u16(&mut self.0[field::FLG_OFF], raw);
    }

    /// Set the time to live field.
    #[inline]
    pub fn set_hop_limit(&mut self, value: u8) {
        self.0[field::TTL] = value
    }

    /// Set the protocol field.
    #[inline]
    pub fn set_protocol(&mut self, value: Protocol) {
        self.0[field::PROTOCOL] = value.into()
    }

    /// Set the header checksum field.
    #[inline]
    pub fn set_checksum(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.0[field::CHECKSUM], value)
    }

    /// Set the source address field.
    #[inline]
    pub fn set_src_addr(&mut self, value: Address) {
        self.0[field::SRC_ADDR].copy_from_slice(value.as_bytes())
    }

    /// Set the destination address field.
    #[inline]
    pub fn set_dst_addr(&mut self, value: Address) {
        self.0[field::DST_ADDR].copy_from_slice(value.as_bytes())
    }

    /// Return the option bytes as a mutable slice.
    pub fn options_mut(&mut self) -> &mut [u8] {
        let end = usize::from(self.header_len());
        &mut self.0[field::OPTIONS.start..end]
    }

    /// Compute and fill in the header checksum.
    pub fn fill_checksum(&mut self) {
        self.set_checksum(0);
        let checksum = {
            checksum::compute(&self.0[..self.header_len() as usize])
        };
        self.set_checksum(checksum)
    }
}

impl AsRef<[u8]> for ipv4 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl AsMut<[u8]> for ipv4 {
    fn as_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }
}

/// Replace the options of an IPv4 layer.
///
/// The options are padded with end-of-option-list bytes to a multiple of four octets. The header
/// is reallocated to the new length and its header length field adjusted, the total length and
/// checksum follow when the packet is next recomputed.
pub fn set_options(layer: &mut LayerMut, options: &[u8]) -> Result<()> {
    if layer.kind() != LayerKind::Ipv4 {
        return Err(Error::Unsupported);
    }

    let padded = (options.len() + 3) / 4 * 4;
    let header_len = field::OPTIONS.start + padded;
    if header_len > MAX_HEADER_LEN {
        return Err(Error::Malformed);
    }

    layer.resize_header(header_len);
    let header = ipv4::new_unchecked_mut(layer.header_mut());
    header.set_header_len(header_len as u8);
    let (content, pad) = header.options_mut().split_at_mut(options.len());
    content.copy_from_slice(options);
    pad.iter_mut().for_each(|byte| *byte = 0);
    Ok(())
}

/// A high-level representation of an Internet Protocol version 4 packet header.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Repr {
    /// The source of the packet.
    pub src_addr:    Address,
    /// The destination of the packet.
    pub dst_addr:    Address,
    /// The encapsulated protocol identifier.
    pub protocol:    Protocol,
    /// The length of the payload.
    pub payload_len: usize,
    /// The remaining hop limit of the packet.
    pub hop_limit:   u8,
}

impl Repr {
    /// Parse an Internet Protocol version 4 header and return a high-level representation.
    ///
    /// The checksum is not validated, a mismatch is reported by the packet tree instead.
    pub fn parse(packet: &ipv4) -> Result<Repr> {
        packet.check_len()?;
        // Version 4 is expected.
        if packet.version() != 4 { return Err(Error::Malformed) }
        let payload_len = usize::from(packet.total_len())
            .checked_sub(usize::from(packet.header_len()))
            .ok_or(Error::Malformed)?;

        Ok(Repr {
            src_addr:    packet.src_addr(),
            dst_addr:    packet.dst_addr(),
            protocol:    packet.protocol(),
            payload_len,
            hop_limit:   packet.hop_limit()
        })
    }

    /// Return the length of a header that will be emitted from this high-level representation.
    pub fn header_len(&self) -> usize {
        // We never emit any options.
        field::DST_ADDR.end
    }

    /// Emit a high-level representation into an Internet Protocol version 4 header.
    pub fn emit(&self, packet: &mut ipv4, checksum: Checksum) {
        packet.set_version(4);
        packet.set_header_len(field::DST_ADDR.end as u8);
        packet.set_dscp(0);
        packet.set_ecn(0);
        let total_len = packet.header_len() as u16 + self.payload_len as u16;
        packet.set_total_len(total_len);
        packet.set_ident(0);
        packet.clear_flags();
        packet.set_more_frags(false);
        packet.set_dont_frag(true);
        packet.set_frag_offset(0);
        packet.set_hop_limit(self.hop_limit);
        packet.set_protocol(self.protocol);
        packet.set_src_addr(self.src_addr);
        packet.set_dst_addr(self.dst_addr);

        if checksum.manual() {
            packet.fill_checksum();
        } else {
            // make sure we get a consistently zeroed checksum,
            // since implementations might rely on it
            packet.set_checksum(0);
        }
    }

    /// Create a standalone IPv4 layer with this header.
    pub fn to_packet(&self) -> Packet {
        let mut header = vec![0; self.header_len()];
        self.emit(ipv4::new_unchecked_mut(&mut header), Checksum::Manual);
        Packet::from_header(&Dissector, header)
    }
}

impl fmt::Display for Repr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "IPv4 src={} dst={} proto={}",
               self.src_addr, self.dst_addr, self.protocol)
    }
}

/// The IPv4 layer.
///
/// A packet with a non-zero fragment offset keeps its payload opaque since only the first
/// fragment carries the header of the encapsulated protocol. A total length of zero, as seen in
/// captures of segmentation offloaded packets, extends the payload to all available bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Dissector;

impl Layer for Dissector {
    fn kind(&self) -> LayerKind {
        LayerKind::Ipv4
    }

    fn header_len(&self, data: &[u8]) -> Result<usize> {
        let packet = ipv4::new_checked(data)?;
        Ok(packet.header_len().into())
    }

    fn payload_len(&self, header: &[u8], available: usize) -> usize {
        let packet = match ipv4::new_checked(header) {
            Ok(packet) => packet,
            Err(_) => return available,
        };

        match packet.total_len() {
            0 => available,
            total => usize::from(total).saturating_sub(header.len()),
        }
    }

    fn next(&self, header: &[u8], _: &[u8]) -> Option<Discriminant> {
        let packet = ipv4::new_checked(header).ok()?;
        Some(Discriminant::Ip(packet.protocol()))
    }

    fn opaque_payload(&self, header: &[u8]) -> bool {
        match ipv4::new_checked(header) {
            Ok(packet) => packet.frag_offset() != 0,
            Err(_) => true,
        }
    }

    fn discriminant_of(&self, payload: LayerKind) -> Option<Discriminant> {
        Protocol::of_layer(payload).map(Discriminant::Ip)
    }

    fn set_next(&self, header: &mut [u8], next: Discriminant) {
        if let (Discriminant::Ip(protocol), true) = (next, header.len() > field::PROTOCOL) {
            ipv4::new_unchecked_mut(header).set_protocol(protocol);
        }
    }

    fn default_header(&self) -> Vec<u8> {
        let repr = Repr {
            src_addr: Address::UNSPECIFIED,
            dst_addr: Address::UNSPECIFIED,
            protocol: Protocol::Unknown(0xff),
            payload_len: 0,
            hop_limit: 64,
        };
        let mut header = vec![0; repr.header_len()];
        repr.emit(ipv4::new_unchecked_mut(&mut header), Checksum::Manual);
        header
    }

    fn pseudo_header(&self, header: &[u8]) -> Option<PseudoHeader> {
        let packet = ipv4::new_checked(header).ok()?;
        Some(PseudoHeader::Ipv4 {
            src_addr: packet.src_addr(),
            dst_addr: packet.dst_addr(),
        })
    }

    fn required_header_len(&self, header: &[u8]) -> Option<usize> {
        match header.get(field::VER_IHL) {
            Some(ver_ihl) => Some(usize::from(ver_ihl & 0x0f).max(5) * 4),
            None => Some(field::DST_ADDR.end),
        }
    }

    fn recompute(&self, header: &mut [u8], cx: &Context) {
        if header.len() < field::DST_ADDR.end {
            return;
        }

        let header_len = header.len();
        let packet = ipv4::new_unchecked_mut(header);
        packet.set_header_len(header_len as u8);
        // Too long for the field, as in segmentation offload captures.
        let total_len = header_len + cx.payload.len();
        packet.set_total_len(if total_len > usize::from(u16::max_value()) { 0 } else { total_len as u16 });
        if cx.checksum.manual() {
            packet.fill_checksum();
        }
    }

    fn checksum_valid(&self, header: &[u8], _: &Context) -> Option<bool> {
        let packet = ipv4::new_checked(header).ok()?;
        Some(packet.verify_checksum())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    static HEADER_BYTES: [u8; 20] =
        [0x45, 0x00, 0x00, 0x1e,
         0x01, 0x02, 0x62, 0x03,
         0x1a, 0x01, 0xd5, 0x6e,
         0x11, 0x12, 0x13, 0x14,
         0x21, 0x22, 0x23, 0x24];

    #[test]
    fn test_deconstruct() {
        let packet = ipv4::new_unchecked(&HEADER_BYTES[..]);
        assert_eq!(packet.version(), 4);
        assert_eq!(packet.header_len(), 20);
        assert_eq!(packet.dscp(), 0);
        assert_eq!(packet.ecn(), 0);
        assert_eq!(packet.total_len(), 30);
        assert_eq!(packet.ident(), 0x102);
        assert_eq!(packet.more_frags(), true);
        assert_eq!(packet.dont_frag(), true);
        assert_eq!(packet.frag_offset(), 0x203 * 8);
        assert_eq!(packet.hop_limit(), 0x1a);
        assert_eq!(packet.protocol(), Protocol::Icmp);
        assert_eq!(packet.checksum(), 0xd56e);
        assert_eq!(packet.src_addr(), Address([0x11, 0x12, 0x13, 0x14]));
        assert_eq!(packet.dst_addr(), Address([0x21, 0x22, 0x23, 0x24]));
        assert_eq!(packet.verify_checksum(), true);
        assert!(packet.options().is_empty());
    }

    #[test]
    fn test_construct() {
        let mut bytes = vec![0xa5; 20];
        let packet = ipv4::new_unchecked_mut(&mut bytes);
        packet.set_version(4);
        packet.set_header_len(20);
        packet.clear_flags();
        packet.set_dscp(0);
        packet.set_ecn(0);
        packet.set_total_len(30);
        packet.set_ident(0x102);
        packet.set_more_frags(true);
        packet.set_dont_frag(true);
        packet.set_frag_offset(0x203 * 8);
        packet.set_hop_limit(0x1a);
        packet.set_protocol(Protocol::Icmp);
        packet.set_src_addr(Address([0x11, 0x12, 0x13, 0x14]));
        packet.set_dst_addr(Address([0x21, 0x22, 0x23, 0x24]));
        packet.fill_checksum();
        assert_eq!(packet.as_bytes(), &HEADER_BYTES[..]);
    }

    #[test]
    fn test_check_len() {
        assert_eq!(ipv4::new_checked(&HEADER_BYTES[..19]).unwrap_err(), Error::Truncated);

        let mut bytes = HEADER_BYTES;
        bytes[0] = 0x44;
        assert_eq!(ipv4::new_checked(&bytes[..]).unwrap_err(), Error::Malformed);
        bytes[0] = 0x46;
        assert_eq!(ipv4::new_checked(&bytes[..]).unwrap_err(), Error::Truncated);
    }

    static REPR_HEADER_BYTES: [u8; 20] =
        [0x45, 0x00, 0x00, 0x18,
         0x00, 0x00, 0x40, 0x00,
         0x40, 0x01, 0xd2, 0x79,
         0x11, 0x12, 0x13, 0x14,
         0x21, 0x22, 0x23, 0x24];

    fn packet_repr() -> Repr {
        Repr {
            src_addr:    Address([0x11, 0x12, 0x13, 0x14]),
            dst_addr:    Address([0x21, 0x22, 0x23, 0x24]),
            protocol:    Protocol::Icmp,
            payload_len: 4,
            hop_limit:   64
        }
    }

    #[test]
    fn test_parse() {
        let packet = ipv4::new_unchecked(&REPR_HEADER_BYTES[..]);
        let repr = Repr::parse(&packet).unwrap();
        assert_eq!(repr, packet_repr());
    }

    #[test]
    fn test_parse_bad_version() {
        let mut bytes = REPR_HEADER_BYTES;
        let packet = ipv4::new_unchecked_mut(&mut bytes);
        packet.set_version(6);
        packet.fill_checksum();
        assert_eq!(Repr::parse(packet), Err(Error::Malformed));
    }

    #[test]
    fn test_parse_total_len_less_than_header_len() {
        let mut bytes = REPR_HEADER_BYTES;
        ipv4::new_unchecked_mut(&mut bytes).set_total_len(8);
        assert_eq!(Repr::parse(ipv4::new_unchecked(&bytes)), Err(Error::Malformed));
    }

    #[test]
    fn test_emit() {
        let repr = packet_repr();
        let mut bytes = vec![0xa5; repr.header_len()];
        let packet = ipv4::new_unchecked_mut(&mut bytes);
        repr.emit(packet, Checksum::Manual);
        assert_eq!(packet.as_bytes(), &REPR_HEADER_BYTES[..]);
    }

    #[test]
    fn test_payload_len() {
        let header = &REPR_HEADER_BYTES[..];
        assert_eq!(Dissector.header_len(header), Ok(20));
        // Ethernet padding after the payload is not part of it.
        assert_eq!(Dissector.payload_len(header, 26), 4);

        let mut offloaded = REPR_HEADER_BYTES;
        ipv4::new_unchecked_mut(&mut offloaded).set_total_len(0);
        assert_eq!(Dissector.payload_len(&offloaded, 1400), 1400);
    }

    #[test]
    fn test_fragment_is_opaque() {
        let mut bytes = REPR_HEADER_BYTES;
        assert!(!Dissector.opaque_payload(&bytes));
        ipv4::new_unchecked_mut(&mut bytes).set_frag_offset(1480);
        assert!(Dissector.opaque_payload(&bytes));
        assert_eq!(Dissector.next(&bytes, &[]), Some(Discriminant::Ip(Protocol::Icmp)));
    }

    #[test]
    fn test_unspecified() {
        assert!(Address::UNSPECIFIED.is_unspecified());
        assert!(!Address::UNSPECIFIED.is_broadcast());
        assert!(!Address::UNSPECIFIED.is_multicast());
        assert!(Address::BROADCAST.is_broadcast());
        assert!(Address::new(224, 0, 0, 1).is_multicast());
        assert!(Address::new(10, 0, 0, 1).is_unicast());
    }
}
