use core::fmt;
use byteorder::{ByteOrder, NetworkEndian};

use crate::packet::{Context, Layer, LayerKind, Packet};
use super::{checksum, Error, IpProtocol, PseudoHeader, Result};

enum_with_unknown! {
    /// Internet protocol control message type for IPv6.
    pub doc enum Message(u8) {
        /// Destination unreachable
        DstUnreachable  = 0x01,
        /// Packet too big
        PktTooBig       = 0x02,
        /// Time exceeded
        TimeExceeded    = 0x03,
        /// Parameter problem
        ParamProblem    = 0x04,
        /// Echo request
        EchoRequest     = 0x80,
        /// Echo reply
        EchoReply       = 0x81,
        /// Multicast listener query
        MldQuery        = 0x82,
        /// Multicast listener report
        MldReport       = 0x83,
        /// Router solicitation
        RouterSolicit   = 0x85,
        /// Router advertisement
        RouterAdvert    = 0x86,
        /// Neighbor solicitation
        NeighborSolicit = 0x87,
        /// Neighbor advertisement
        NeighborAdvert  = 0x88,
        /// Redirect
        Redirect        = 0x89,
    }
}

impl Message {
    /// Error messages quote the offending packet in their body.
    pub fn is_error(self) -> bool {
        u8::from(self) & 0x80 == 0
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Message::DstUnreachable  => write!(f, "destination unreachable"),
            Message::PktTooBig       => write!(f, "packet too big"),
            Message::TimeExceeded    => write!(f, "time exceeded"),
            Message::ParamProblem    => write!(f, "parameter problem"),
            Message::EchoRequest     => write!(f, "echo request"),
            Message::EchoReply       => write!(f, "echo reply"),
            Message::MldQuery        => write!(f, "multicast listener query"),
            Message::MldReport       => write!(f, "multicast listener report"),
            Message::RouterSolicit   => write!(f, "router solicitation"),
            Message::RouterAdvert    => write!(f, "router advertisement"),
            Message::NeighborSolicit => write!(f, "neighbor solicitation"),
            Message::NeighborAdvert  => write!(f, "neighbor advertisement"),
            Message::Redirect        => write!(f, "redirect"),
            Message::Unknown(id)     => write!(f, "{}", id),
        }
    }
}

byte_wrapper! {
    /// A byte sequence representing the fixed header of an ICMPv6 message.
    ///
    /// Everything after the first eight bytes, such as neighbor discovery targets and options,
    /// is the payload.
    #[derive(Debug, PartialEq, Eq)]
    pub struct icmpv6([u8]);
}

header_wrapper!(icmpv6, LayerKind::Icmpv6);

mod field {
    use crate::wire::field::Field;

    pub(crate) const TYPE:       usize = 0;
    pub(crate) const CODE:       usize = 1;
    pub(crate) const CHECKSUM:   Field = 2..4;

    pub(crate) const DATA:       Field = 4..8;

    pub(crate) const ECHO_IDENT: Field = 4..6;
    pub(crate) const ECHO_SEQNO: Field = 6..8;
}

/// The length of the fixed header.
pub const HEADER_LEN: usize = field::DATA.end;

impl icmpv6 {
    /// Imbue a raw octet buffer with ICMPv6 header structure.
    pub fn new_unchecked(buffer: &[u8]) -> &icmpv6 {
        Self::__from_macro_new_unchecked(buffer)
    }

    /// Imbue a mutable octet buffer with ICMPv6 header structure.
    pub fn new_unchecked_mut(buffer: &mut [u8]) -> &mut icmpv6 {
        Self::__from_macro_new_unchecked_mut(buffer)
    }

    /// Shorthand for a combination of [new_unchecked] and [check_len].
    ///
    /// [new_unchecked]: #method.new_unchecked
    /// [check_len]: #method.check_len
    pub fn new_checked(data: &[u8]) -> Result<&icmpv6> {
        let packet = Self::new_unchecked(data);
        packet.check_len()?;
        Ok(packet)
    }

    pub fn new_checked_mut(data: &mut [u8]) -> Result<&mut icmpv6> {
        Self::new_checked(&data[..])?;
        Ok(Self::new_unchecked_mut(data))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Ensure that no accessor method will panic if called.
    /// Returns `Err(Error::Truncated)` if the buffer is too short.
    pub fn check_len(&self) -> Result<()> {
        if self.0.len() < HEADER_LEN {
            Err(Error::Truncated)
        } else {
            Ok(())
        }
    }

    #[inline]
    pub fn msg_type(&self) -> Message {
        Message::from(self.0[field::TYPE])
    }

    #[inline]
    pub fn msg_code(&self) -> u8 {
        self.0[field::CODE]
    }

    #[inline]
    pub fn checksum(&self) -> u16 {
        NetworkEndian::read_u16(&self.0[field::CHECKSUM])
    }

    #[inline]
    pub fn echo_ident(&self) -> u16 {
        NetworkEndian::read_u16(&self.0[field::ECHO_IDENT])
    }

    #[inline]
    pub fn echo_seq_no(&self) -> u16 {
        NetworkEndian::read_u16(&self.0[field::ECHO_SEQNO])
    }

    /// The MTU of a packet too big message, or the pointer of a parameter problem.
    #[inline]
    pub fn data(&self) -> u32 {
        NetworkEndian::read_u32(&self.0[field::DATA])
    }

    /// Validate the checksum over the pseudo header, this header and `payload`.
    pub fn verify_checksum(&self, pseudo: &PseudoHeader, payload: &[u8]) -> bool {
        checksum::upper_layer(Some(pseudo), IpProtocol::Icmpv6, &self.0, payload) == !0
    }

    #[inline]
    pub fn set_msg_type(&mut self, value: Message) {
        self.0[field::TYPE] = value.into();
    }

    #[inline]
    pub fn set_msg_code(&mut self, value: u8) {
        self.0[field::CODE] = value;
    }

    #[inline]
    pub fn set_checksum(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.0[field::CHECKSUM], value);
    }

    #[inline]
    pub fn set_echo_ident(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.0[field::ECHO_IDENT], value);
    }

    #[inline]
    pub fn set_echo_seq_no(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.0[field::ECHO_SEQNO], value);
    }

    #[inline]
    pub fn set_data(&mut self, value: u32) {
        NetworkEndian::write_u32(&mut self.0[field::DATA], value);
    }

    /// Compute and fill in the checksum over the pseudo header, this header and `payload`.
    pub fn fill_checksum(&mut self, pseudo: &PseudoHeader, payload: &[u8]) {
        self.set_checksum(0);
        let checksum = !checksum::upper_layer(Some(pseudo), IpProtocol::Icmpv6, &self.0, payload);
        self.set_checksum(checksum);
    }
}

/// A high-level representation of an ICMPv6 header.
///
/// Neighbor discovery and multicast listener messages are not represented, their headers can be
/// accessed through [`icmpv6`] directly.
///
/// [`icmpv6`]: struct.icmpv6.html
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Repr {
    EchoRequest {
        ident:  u16,
        seq_no: u16,
    },
    EchoReply {
        ident:  u16,
        seq_no: u16,
    },
    DstUnreachable {
        code: u8,
    },
    PktTooBig {
        mtu: u32,
    },
    TimeExceeded {
        code: u8,
    },
    ParamProblem {
        code: u8,
        pointer: u32,
    },
}

impl Repr {
    pub fn parse(packet: &icmpv6) -> Result<Repr> {
        packet.check_len()?;
        match (packet.msg_type(), packet.msg_code()) {
            (Message::EchoRequest, 0) => Ok(Repr::EchoRequest {
                ident:  packet.echo_ident(),
                seq_no: packet.echo_seq_no(),
            }),
            (Message::EchoReply, 0) => Ok(Repr::EchoReply {
                ident:  packet.echo_ident(),
                seq_no: packet.echo_seq_no(),
            }),
            (Message::DstUnreachable, code) => Ok(Repr::DstUnreachable { code }),
            (Message::PktTooBig, 0) => Ok(Repr::PktTooBig { mtu: packet.data() }),
            (Message::TimeExceeded, code) => Ok(Repr::TimeExceeded { code }),
            (Message::ParamProblem, code) => Ok(Repr::ParamProblem {
                code,
                pointer: packet.data(),
            }),
            (Message::Unknown(_), _) => Err(Error::Unrecognized),
            _ => Err(Error::Unsupported),
        }
    }

    pub fn header_len(&self) -> usize {
        HEADER_LEN
    }

    /// Emit the header, the checksum is zeroed until recomputed with the pseudo header.
    pub fn emit(&self, packet: &mut icmpv6) {
        let (message, code, data) = match *self {
            Repr::EchoRequest { ident, seq_no } =>
                (Message::EchoRequest, 0, u32::from(ident) << 16 | u32::from(seq_no)),
            Repr::EchoReply { ident, seq_no } =>
                (Message::EchoReply, 0, u32::from(ident) << 16 | u32::from(seq_no)),
            Repr::DstUnreachable { code } => (Message::DstUnreachable, code, 0),
            Repr::PktTooBig { mtu } => (Message::PktTooBig, 0, mtu),
            Repr::TimeExceeded { code } => (Message::TimeExceeded, code, 0),
            Repr::ParamProblem { code, pointer } => (Message::ParamProblem, code, pointer),
        };

        packet.set_msg_type(message);
        packet.set_msg_code(code);
        packet.set_data(data);
        packet.set_checksum(0);
    }

    /// Create a standalone ICMPv6 layer with this header.
    pub fn to_packet(&self) -> Packet {
        let mut header = vec![0; self.header_len()];
        self.emit(icmpv6::new_unchecked_mut(&mut header));
        Packet::from_header(&Dissector, header)
    }
}

impl fmt::Display for Repr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Repr::EchoRequest { ident, seq_no } =>
                write!(f, "ICMPv6 echo request id={} seq={}", ident, seq_no),
            Repr::EchoReply { ident, seq_no } =>
                write!(f, "ICMPv6 echo reply id={} seq={}", ident, seq_no),
            Repr::DstUnreachable { code } =>
                write!(f, "ICMPv6 destination unreachable code={}", code),
            Repr::PktTooBig { mtu } =>
                write!(f, "ICMPv6 packet too big mtu={}", mtu),
            Repr::TimeExceeded { code } =>
                write!(f, "ICMPv6 time exceeded code={}", code),
            Repr::ParamProblem { code, pointer } =>
                write!(f, "ICMPv6 parameter problem code={} pointer={}", code, pointer),
        }
    }
}

/// The ICMPv6 layer.
///
/// Unlike ICMPv4 the checksum includes the IPv6 pseudo header, it can only be filled and checked
/// beneath an IP layer.
#[derive(Debug, Clone, Copy, Default)]
pub struct Dissector;

impl Layer for Dissector {
    fn kind(&self) -> LayerKind {
        LayerKind::Icmpv6
    }

    fn header_len(&self, data: &[u8]) -> Result<usize> {
        icmpv6::new_checked(data)?;
        Ok(HEADER_LEN)
    }

    fn default_header(&self) -> Vec<u8> {
        let mut header = vec![0; HEADER_LEN];
        Repr::EchoRequest { ident: 0, seq_no: 0 }.emit(icmpv6::new_unchecked_mut(&mut header));
        header
    }

    fn required_header_len(&self, _: &[u8]) -> Option<usize> {
        Some(HEADER_LEN)
    }

    fn recompute(&self, header: &mut [u8], cx: &Context) {
        let packet = match icmpv6::new_checked_mut(header) {
            Ok(packet) => packet,
            Err(_) => return,
        };

        if let (true, Some(pseudo)) = (cx.checksum.manual(), &cx.pseudo) {
            packet.fill_checksum(pseudo, cx.payload);
        }
    }

    fn checksum_valid(&self, header: &[u8], cx: &Context) -> Option<bool> {
        let packet = icmpv6::new_checked(header).ok()?;
        let pseudo = cx.pseudo.as_ref()?;
        Some(packet.verify_checksum(pseudo, cx.payload))
    }
}

#[cfg(test)]
mod test {
    use crate::wire::{Checksum, Ipv6Address};
    use super::*;

    static ECHO_HEADER_BYTES: [u8; 8] =
        [0x80, 0x00, 0x91, 0xae,
         0x12, 0x34, 0x00, 0x01];

    static ECHO_DATA_BYTES: [u8; 4] = [b'p', b'i', b'n', b'g'];

    fn pseudo() -> PseudoHeader {
        PseudoHeader::Ipv6 {
            src_addr: Ipv6Address::new(0xfe80, 0, 0, 0, 0, 0, 0, 1),
            dst_addr: Ipv6Address::new(0xfe80, 0, 0, 0, 0, 0, 0, 2),
        }
    }

    #[test]
    fn test_echo_deconstruct() {
        let packet = icmpv6::new_checked(&ECHO_HEADER_BYTES[..]).unwrap();
        assert_eq!(packet.msg_type(), Message::EchoRequest);
        assert!(!packet.msg_type().is_error());
        assert_eq!(packet.checksum(), 0x91ae);
        assert_eq!(packet.echo_ident(), 0x1234);
        assert_eq!(packet.echo_seq_no(), 1);
        assert!(packet.verify_checksum(&pseudo(), &ECHO_DATA_BYTES));
        assert!(!packet.verify_checksum(&pseudo(), b"pong"));
    }

    #[test]
    fn test_echo_emit() {
        let repr = Repr::EchoRequest { ident: 0x1234, seq_no: 1 };
        let mut bytes = vec![0xa5; repr.header_len()];
        repr.emit(icmpv6::new_unchecked_mut(&mut bytes));
        let cx = Context {
            payload: &ECHO_DATA_BYTES,
            pseudo: Some(pseudo()),
            checksum: Checksum::Manual,
        };
        Dissector.recompute(&mut bytes, &cx);
        assert_eq!(&bytes[..], &ECHO_HEADER_BYTES[..]);
        assert_eq!(Dissector.checksum_valid(&bytes, &cx), Some(true));

        let standalone = Context { pseudo: None, ..cx };
        assert_eq!(Dissector.checksum_valid(&bytes, &standalone), None);
    }

    #[test]
    fn test_errors() {
        let bytes = [0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x05, 0x00];
        let packet = icmpv6::new_unchecked(&bytes);
        assert!(packet.msg_type().is_error());
        assert_eq!(Repr::parse(packet), Ok(Repr::PktTooBig { mtu: 1280 }));

        let solicit = [0x87, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
        assert_eq!(Repr::parse(icmpv6::new_unchecked(&solicit)), Err(Error::Unsupported));
        let unknown = [0x90, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
        assert_eq!(Repr::parse(icmpv6::new_unchecked(&unknown)), Err(Error::Unrecognized));
        assert_eq!(Dissector.header_len(&bytes[..4]), Err(Error::Truncated));
    }
}
