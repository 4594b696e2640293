use core::fmt;
use byteorder::{ByteOrder, NetworkEndian};

use crate::packet::{Context, Layer, LayerKind, Packet};
use super::{checksum, Error, IpProtocol, PseudoHeader, Result};

byte_wrapper! {
    /// A byte sequence representing a User Datagram Protocol header.
    #[derive(Debug, PartialEq, Eq)]
    pub struct udp([u8]);
}

header_wrapper!(udp, LayerKind::Udp);

mod field {
    use crate::wire::field::Field;

    pub(crate) const SRC_PORT: Field = 0..2;
    pub(crate) const DST_PORT: Field = 2..4;
    pub(crate) const LENGTH:   Field = 4..6;
    pub(crate) const CHECKSUM: Field = 6..8;
}

/// The length of the UDP header.
pub const HEADER_LEN: usize = field::CHECKSUM.end;

impl udp {
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

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }

    /// Ensure that no accessor method will panic if called.
    /// Returns `Err(Error::Truncated)` if the buffer is too short.
    /// Returns `Err(Error::Malformed)` if the length field has a value smaller
    /// than the header length but is not zero, the value of jumbograms.
    ///
    /// The result of this check is invalidated by calling [set_len].
    ///
    /// [set_len]: #method.set_len
    pub fn check_len(&self) -> Result<()> {
        if self.0.len() < HEADER_LEN {
            return Err(Error::Truncated);
        }

        match usize::from(self.len()) {
            0 => Ok(()),
            len if len < HEADER_LEN => Err(Error::Malformed),
            _ => Ok(()),
        }
    }

    /// Return the source port field.
    #[inline]
    pub fn src_port(&self) -> u16 {
        NetworkEndian::read_u16(&self.0[field::SRC_PORT])
    }

    /// Return the destination port field.
    #[inline]
    pub fn dst_port(&self) -> u16 {
        NetworkEndian::read_u16(&self.0[field::DST_PORT])
    }

    /// Return the length field, covering header and payload.
    #[inline]
    pub fn len(&self) -> u16 {
        NetworkEndian::read_u16(&self.0[field::LENGTH])
    }

    /// Return the checksum field.
    #[inline]
    pub fn checksum(&self) -> u16 {
        NetworkEndian::read_u16(&self.0[field::CHECKSUM])
    }

    /// Set the source port field.
    #[inline]
    pub fn set_src_port(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.0[field::SRC_PORT], value)
    }

    /// Set the destination port field.
    #[inline]
    pub fn set_dst_port(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.0[field::DST_PORT], value)
    }

    /// Set the length field.
    #[inline]
    pub fn set_len(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.0[field::LENGTH], value)
    }

    /// Set the checksum field.
    #[inline]
    pub fn set_checksum(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.0[field::CHECKSUM], value)
    }

    /// Compute and fill in the checksum over this header and `payload`.
    pub fn fill_checksum(&mut self, pseudo: &PseudoHeader, payload: &[u8]) {
        self.set_checksum(0);
        let checksum = !checksum::upper_layer(Some(pseudo), IpProtocol::Udp, &self.0, payload);
        // A zero checksum means no checksum, all-ones is arithmetically equivalent.
        self.set_checksum(if checksum == 0 { 0xffff } else { checksum })
    }

    /// Validate the checksum over this header and `payload`.
    ///
    /// An absent checksum is valid in IPv4 but not in IPv6.
    pub fn verify_checksum(&self, pseudo: &PseudoHeader, payload: &[u8]) -> bool {
        if let (PseudoHeader::Ipv4 { .. }, 0) = (pseudo, self.checksum()) {
            return true;
        }

        checksum::upper_layer(Some(pseudo), IpProtocol::Udp, &self.0, payload) == !0
    }
}

impl AsRef<[u8]> for udp {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl AsMut<[u8]> for udp {
    fn as_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }
}

/// A high-level representation of a User Datagram Protocol header.
///
/// The length and checksum are derived values and left to the calculated-value pass.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Repr {
    pub src_port: u16,
    pub dst_port: u16,
}

impl Repr {
    /// Parse a User Datagram Protocol header and return a high-level representation.
    pub fn parse(packet: &udp) -> Result<Repr> {
        packet.check_len()?;

        // Destination port cannot be omitted (but source port can be).
        if packet.dst_port() == 0 { return Err(Error::Malformed) }

        Ok(Repr {
            src_port: packet.src_port(),
            dst_port: packet.dst_port(),
        })
    }

    /// Return the length of a header that will be emitted from this high-level representation.
    pub fn header_len(&self) -> usize {
        HEADER_LEN
    }

    /// Emit a high-level representation into a User Datagram Protocol header.
    ///
    /// The length covers the header alone and the checksum is zeroed until recomputed.
    pub fn emit(&self, packet: &mut udp) {
        packet.set_src_port(self.src_port);
        packet.set_dst_port(self.dst_port);
        packet.set_len(HEADER_LEN as u16);
        packet.set_checksum(0);
    }

    /// Create a standalone UDP layer with this header.
    pub fn to_packet(&self) -> Packet {
        let mut header = vec![0; self.header_len()];
        self.emit(udp::new_unchecked_mut(&mut header));
        Packet::from_header(&Dissector, header)
    }
}

impl fmt::Display for Repr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "UDP src={} dst={}", self.src_port, self.dst_port)
    }
}

/// The UDP layer.
///
/// The checksum needs the pseudo header of an enclosing IP layer. Without one the checksum is
/// written as zero and can not be validated.
#[derive(Debug, Clone, Copy, Default)]
pub struct Dissector;

impl Layer for Dissector {
    fn kind(&self) -> LayerKind {
        LayerKind::Udp
    }

    fn header_len(&self, data: &[u8]) -> Result<usize> {
        udp::new_checked(data)?;
        Ok(HEADER_LEN)
    }

    fn payload_len(&self, header: &[u8], available: usize) -> usize {
        match udp::new_checked(header).map(udp::len) {
            Ok(0) | Err(_) => available,
            Ok(len) => usize::from(len) - HEADER_LEN,
        }
    }

    fn default_header(&self) -> Vec<u8> {
        let mut header = vec![0; HEADER_LEN];
        udp::new_unchecked_mut(&mut header).set_len(HEADER_LEN as u16);
        header
    }

    fn required_header_len(&self, _: &[u8]) -> Option<usize> {
        Some(HEADER_LEN)
    }

    fn recompute(&self, header: &mut [u8], cx: &Context) {
        let packet = match udp::new_checked_mut(header) {
            Ok(packet) => packet,
            Err(_) => return,
        };

        let length = HEADER_LEN + cx.payload.len();
        packet.set_len(if length > usize::from(u16::max_value()) { 0 } else { length as u16 });
        if !cx.checksum.manual() {
            return;
        }

        match &cx.pseudo {
            Some(pseudo) => packet.fill_checksum(pseudo, cx.payload),
            None => packet.set_checksum(0),
        }
    }

    fn checksum_valid(&self, header: &[u8], cx: &Context) -> Option<bool> {
        let packet = udp::new_checked(header).ok()?;
        let pseudo = cx.pseudo.as_ref()?;
        Some(packet.verify_checksum(pseudo, cx.payload))
    }
}
