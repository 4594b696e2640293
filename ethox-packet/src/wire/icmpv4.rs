use core::fmt;
use byteorder::{ByteOrder, NetworkEndian};

use crate::packet::{Context, Layer, LayerKind, Packet};
use super::{checksum, Error, IpProtocol, Result};

enum_with_unknown! {
    /// Internet protocol control message type.
    pub doc enum Message(u8) {
        /// Echo reply
        EchoReply      =  0,
        /// Destination unreachable
        DstUnreachable =  3,
        /// Message redirect
        Redirect       =  5,
        /// Echo request
        EchoRequest    =  8,
        /// Router advertisement
        RouterAdvert   =  9,
        /// Router solicitation
        RouterSolicit  = 10,
        /// Time exceeded
        TimeExceeded   = 11,
        /// Parameter problem
        ParamProblem   = 12,
        /// Timestamp
        Timestamp      = 13,
        /// Timestamp reply
        TimestampReply = 14,
        /// Extended Echo Request
        ExtendedEcho   = 42,
        /// Extended Echo Reply
        ExtendedReply  = 43,
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Message::EchoReply      => write!(f, "echo reply"),
            Message::DstUnreachable => write!(f, "destination unreachable"),
            Message::Redirect       => write!(f, "message redirect"),
            Message::EchoRequest    => write!(f, "echo request"),
            Message::RouterAdvert   => write!(f, "router advertisement"),
            Message::RouterSolicit  => write!(f, "router solicitation"),
            Message::TimeExceeded   => write!(f, "time exceeded"),
            Message::ParamProblem   => write!(f, "parameter problem"),
            Message::Timestamp      => write!(f, "timestamp"),
            Message::TimestampReply => write!(f, "timestamp reply"),
            Message::ExtendedEcho   => write!(f, "extended echo request"),
            Message::ExtendedReply  => write!(f, "extended echo reply"),
            Message::Unknown(id)    => write!(f, "{}", id)
        }
    }
}

enum_with_unknown! {
    /// Internet protocol control message subtype for type "Destination Unreachable".
    pub doc enum DstUnreachable(u8) {
        /// Destination network unreachable
        NetUnreachable   =  0,
        /// Destination host unreachable
        HostUnreachable  =  1,
        /// Destination protocol unreachable
        ProtoUnreachable =  2,
        /// Destination port unreachable
        PortUnreachable  =  3,
        /// Fragmentation required, and DF flag set
        FragRequired     =  4,
        /// Source route failed
        SrcRouteFailed   =  5,
        /// Destination network unknown
        DstNetUnknown    =  6,
        /// Destination host unknown
        DstHostUnknown   =  7,
        /// Source host isolated
        SrcHostIsolated  =  8,
        /// Network administratively prohibited
        NetProhibited    =  9,
        /// Host administratively prohibited
        HostProhibited   = 10,
        /// Network unreachable for ToS
        NetUnreachToS    = 11,
        /// Host unreachable for ToS
        HostUnreachToS   = 12,
        /// Communication administratively prohibited
        CommProhibited   = 13,
        /// Host precedence violation
        HostPrecedViol   = 14,
        /// Precedence cutoff in effect
        PrecedCutoff     = 15
    }
}

impl fmt::Display for DstUnreachable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DstUnreachable::NetUnreachable =>
                write!(f, "destination network unreachable"),
            DstUnreachable::HostUnreachable =>
                write!(f, "destination host unreachable"),
            DstUnreachable::ProtoUnreachable =>
                write!(f, "destination protocol unreachable"),
            DstUnreachable::PortUnreachable =>
                write!(f, "destination port unreachable"),
            DstUnreachable::FragRequired =>
                write!(f, "fragmentation required, and DF flag set"),
            DstUnreachable::SrcRouteFailed =>
                write!(f, "source route failed"),
            DstUnreachable::DstNetUnknown =>
                write!(f, "destination network unknown"),
            DstUnreachable::DstHostUnknown =>
                write!(f, "destination host unknown"),
            DstUnreachable::SrcHostIsolated =>
                write!(f, "source host isolated"),
            DstUnreachable::NetProhibited =>
                write!(f, "network administratively prohibited"),
            DstUnreachable::HostProhibited =>
                write!(f, "host administratively prohibited"),
            DstUnreachable::NetUnreachToS =>
                write!(f, "network unreachable for ToS"),
            DstUnreachable::HostUnreachToS =>
                write!(f, "host unreachable for ToS"),
            DstUnreachable::CommProhibited =>
                write!(f, "communication administratively prohibited"),
            DstUnreachable::HostPrecedViol =>
                write!(f, "host precedence violation"),
            DstUnreachable::PrecedCutoff =>
                write!(f, "precedence cutoff in effect"),
            DstUnreachable::Unknown(id) =>
                write!(f, "{}", id)
        }
    }
}

enum_with_unknown! {
    /// Internet protocol control message subtype for type "Redirect Message".
    pub doc enum Redirect(u8) {
        /// Redirect Datagram for the Network
        Net     = 0,
        /// Redirect Datagram for the Host
        Host    = 1,
        /// Redirect Datagram for the ToS & network
        NetToS  = 2,
        /// Redirect Datagram for the ToS & host
        HostToS = 3
    }
}

enum_with_unknown! {
    /// Internet protocol control message subtype for type "Time Exceeded".
    pub doc enum TimeExceeded(u8) {
        /// TTL expired in transit
        TtlExpired  = 0,
        /// Fragment reassembly time exceeded
        FragExpired = 1
    }
}

enum_with_unknown! {
    /// Internet protocol control message subtype for type "Parameter Problem".
    pub doc enum ParamProblem(u8) {
        /// Pointer indicates the error
        AtPointer     = 0,
        /// Missing a required option
        MissingOption = 1,
        /// Bad length
        BadLength     = 2
    }
}

byte_wrapper! {
    /// A byte sequence representing the fixed header of an ICMPv4 message.
    ///
    /// The message body, such as echo data or the quoted datagram of an error, is the payload.
    #[derive(Debug, PartialEq, Eq)]
    pub struct icmpv4([u8]);
}

header_wrapper!(icmpv4, LayerKind::Icmpv4);

mod field {
    use crate::wire::field::Field;

    pub(crate) const TYPE:       usize = 0;
    pub(crate) const CODE:       usize = 1;
    pub(crate) const CHECKSUM:   Field = 2..4;

    pub(crate) const UNUSED:     Field = 4..8;

    pub(crate) const ECHO_IDENT: Field = 4..6;
    pub(crate) const ECHO_SEQNO: Field = 6..8;

    pub(crate) const HEADER_END: usize = 8;
}

/// The length of the fixed header.
pub const HEADER_LEN: usize = field::HEADER_END;

impl icmpv4 {
    /// Imbue a raw octet buffer with ICMPv4 header structure.
    pub fn new_unchecked(buffer: &[u8]) -> &icmpv4 {
        Self::__from_macro_new_unchecked(buffer)
    }

    /// Imbue a mutable octet buffer with ICMPv4 header structure.
    pub fn new_unchecked_mut(buffer: &mut [u8]) -> &mut icmpv4 {
        Self::__from_macro_new_unchecked_mut(buffer)
    }

    /// Shorthand for a combination of [new_unchecked] and [check_len].
    ///
    /// [new_unchecked]: #method.new_unchecked
    /// [check_len]: #method.check_len
    pub fn new_checked(data: &[u8]) -> Result<&icmpv4> {
        let packet = Self::new_unchecked(data);
        packet.check_len()?;
        Ok(packet)
    }

    pub fn new_checked_mut(data: &mut [u8]) -> Result<&mut icmpv4> {
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
        if self.0.len() < field::HEADER_END {
            Err(Error::Truncated)
        } else {
            Ok(())
        }
    }

    /// Return the message type field.
    #[inline]
    pub fn msg_type(&self) -> Message {
        Message::from(self.0[field::TYPE])
    }

    /// Return the message code field.
    #[inline]
    pub fn msg_code(&self) -> u8 {
        self.0[field::CODE]
    }

    /// Return the checksum field.
    #[inline]
    pub fn checksum(&self) -> u16 {
        NetworkEndian::read_u16(&self.0[field::CHECKSUM])
    }

    /// Return the identifier field (for echo request and reply packets).
    #[inline]
    pub fn echo_ident(&self) -> u16 {
        NetworkEndian::read_u16(&self.0[field::ECHO_IDENT])
    }

    /// Return the sequence number field (for echo request and reply packets).
    #[inline]
    pub fn echo_seq_no(&self) -> u16 {
        NetworkEndian::read_u16(&self.0[field::ECHO_SEQNO])
    }

    /// Return the rest of the header, unused by most error messages.
    #[inline]
    pub fn rest_of_header(&self) -> &[u8] {
        &self.0[field::UNUSED]
    }

    /// Validate the checksum over this header and `payload`.
    pub fn verify_checksum(&self, payload: &[u8]) -> bool {
        checksum::upper_layer(None, IpProtocol::Icmp, &self.0, payload) == !0
    }

    /// Set the message type field.
    #[inline]
    pub fn set_msg_type(&mut self, value: Message) {
        self.0[field::TYPE] = value.into();
    }

    /// Set the message code field.
    #[inline]
    pub fn set_msg_code(&mut self, value: u8) {
        self.0[field::CODE] = value;
    }

    /// Set the checksum field.
    #[inline]
    pub fn set_checksum(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.0[field::CHECKSUM], value);
    }

    /// Set the identifier field (for echo request and reply packets).
    #[inline]
    pub fn set_echo_ident(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.0[field::ECHO_IDENT], value);
    }

    /// Set the sequence number field (for echo request and reply packets).
    #[inline]
    pub fn set_echo_seq_no(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.0[field::ECHO_SEQNO], value);
    }

    /// Compute and fill in the checksum over this header and `payload`.
    pub fn fill_checksum(&mut self, payload: &[u8]) {
        self.set_checksum(0);
        let checksum = !checksum::upper_layer(None, IpProtocol::Icmp, &self.0, payload);
        self.set_checksum(checksum);
    }
}

impl AsRef<[u8]> for icmpv4 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl AsMut<[u8]> for icmpv4 {
    fn as_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }
}

/// A high-level representation of an Internet Control Message Protocol version 4 header.
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
        reason: DstUnreachable,
    },
    TimeExceeded {
        reason: TimeExceeded,
    },
}

impl Repr {
    /// Get the echo reply request if this is an echo request.
    pub fn echo_reply(self) -> Option<Repr> {
        match self {
            Repr::EchoRequest { ident, seq_no, } =>
                Some(Repr::EchoReply { ident, seq_no, }),
            _ => None,
        }
    }

    /// Parse an Internet Control Message Protocol version 4 header and return
    /// a high-level representation.
    pub fn parse(packet: &icmpv4) -> Result<Repr> {
        packet.check_len()?;
        match (packet.msg_type(), packet.msg_code()) {
            (Message::EchoRequest, 0) => {
                Ok(Repr::EchoRequest {
                    ident:  packet.echo_ident(),
                    seq_no: packet.echo_seq_no(),
                })
            },

            (Message::EchoReply, 0) => {
                Ok(Repr::EchoReply {
                    ident:  packet.echo_ident(),
                    seq_no: packet.echo_seq_no(),
                })
            },

            (Message::DstUnreachable, code) => {
                Ok(Repr::DstUnreachable { reason: DstUnreachable::from(code) })
            },

            (Message::TimeExceeded, code) => {
                Ok(Repr::TimeExceeded { reason: TimeExceeded::from(code) })
            },

            // Unknown types are not as specified in the standard and iana registry.
            (Message::Unknown(_), _) => Err(Error::Unrecognized),
            _ => Err(Error::Unsupported),
        }
    }

    /// Return the length of a header that will be emitted from this high-level representation.
    pub fn header_len(&self) -> usize {
        HEADER_LEN
    }

    /// Emit a high-level representation into an ICMPv4 header.
    ///
    /// The checksum is zeroed until recomputed together with the payload.
    pub fn emit(&self, packet: &mut icmpv4) {
        match *self {
            Repr::EchoRequest { ident, seq_no } => {
                packet.set_msg_type(Message::EchoRequest);
                packet.set_msg_code(0);
                packet.set_echo_ident(ident);
                packet.set_echo_seq_no(seq_no);
            },

            Repr::EchoReply { ident, seq_no } => {
                packet.set_msg_type(Message::EchoReply);
                packet.set_msg_code(0);
                packet.set_echo_ident(ident);
                packet.set_echo_seq_no(seq_no);
            },

            Repr::DstUnreachable { reason } => {
                packet.set_msg_type(Message::DstUnreachable);
                packet.set_msg_code(reason.into());
                packet.as_bytes_mut()[field::UNUSED].iter_mut().for_each(|b| *b = 0);
            },

            Repr::TimeExceeded { reason } => {
                packet.set_msg_type(Message::TimeExceeded);
                packet.set_msg_code(reason.into());
                packet.as_bytes_mut()[field::UNUSED].iter_mut().for_each(|b| *b = 0);
            },
        }

        packet.set_checksum(0);
    }

    /// Create a standalone ICMPv4 layer with this header.
    pub fn to_packet(&self) -> Packet {
        let mut header = vec![0; self.header_len()];
        self.emit(icmpv4::new_unchecked_mut(&mut header));
        Packet::from_header(&Dissector, header)
    }
}

impl fmt::Display for Repr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Repr::EchoRequest { ident, seq_no } =>
                write!(f, "ICMPv4 echo request id={} seq={}", ident, seq_no),
            Repr::EchoReply { ident, seq_no } =>
                write!(f, "ICMPv4 echo reply id={} seq={}", ident, seq_no),
            Repr::DstUnreachable { reason } =>
                write!(f, "ICMPv4 destination unreachable ({})", reason),
            Repr::TimeExceeded { reason } =>
                write!(f, "ICMPv4 time exceeded ({:?})", reason),
        }
    }
}

/// The ICMPv4 layer.
///
/// The body is kept as opaque bytes, including the datagram quoted by error messages. The
/// checksum covers header and body but no pseudo header.
#[derive(Debug, Clone, Copy, Default)]
pub struct Dissector;

impl Layer for Dissector {
    fn kind(&self) -> LayerKind {
        LayerKind::Icmpv4
    }

    fn header_len(&self, data: &[u8]) -> Result<usize> {
        icmpv4::new_checked(data)?;
        Ok(HEADER_LEN)
    }

    fn default_header(&self) -> Vec<u8> {
        let mut header = vec![0; HEADER_LEN];
        Repr::EchoRequest { ident: 0, seq_no: 0 }.emit(icmpv4::new_unchecked_mut(&mut header));
        header
    }

    fn required_header_len(&self, _: &[u8]) -> Option<usize> {
        Some(HEADER_LEN)
    }

    fn recompute(&self, header: &mut [u8], cx: &Context) {
        if let (true, Ok(packet)) = (cx.checksum.manual(), icmpv4::new_checked_mut(header)) {
            packet.fill_checksum(cx.payload);
        }
    }

    fn checksum_valid(&self, header: &[u8], cx: &Context) -> Option<bool> {
        let packet = icmpv4::new_checked(header).ok()?;
        Some(packet.verify_checksum(cx.payload))
    }
}
