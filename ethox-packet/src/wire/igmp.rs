use core::fmt;
use byteorder::{ByteOrder, NetworkEndian};

use crate::packet::{Context, Layer, LayerKind, Packet};
use super::{checksum, Error, IpProtocol, Ipv4Address, Result};

enum_with_unknown! {
    /// Internet group management message type.
    pub doc enum Message(u8) {
        /// Membership query, general or group specific
        MembershipQuery    = 0x11,
        /// Version 1 membership report
        MembershipReportV1 = 0x12,
        /// Version 2 membership report
        MembershipReportV2 = 0x16,
        /// Leave group
        LeaveGroup         = 0x17,
        /// Version 3 membership report
        MembershipReportV3 = 0x22,
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Message::MembershipQuery    => write!(f, "membership query"),
            Message::MembershipReportV1 => write!(f, "version 1 membership report"),
            Message::MembershipReportV2 => write!(f, "version 2 membership report"),
            Message::LeaveGroup         => write!(f, "leave group"),
            Message::MembershipReportV3 => write!(f, "version 3 membership report"),
            Message::Unknown(id)        => write!(f, "{}", id),
        }
    }
}

byte_wrapper! {
    /// A byte sequence representing an IGMPv2 message.
    ///
    /// Longer messages, such as version 3 queries, carry their additional fields as payload.
    #[derive(Debug, PartialEq, Eq)]
    pub struct igmp([u8]);
}

header_wrapper!(igmp, LayerKind::Igmp);

mod field {
    use crate::wire::field::Field;

    pub(crate) const TYPE:          usize = 0;
    pub(crate) const MAX_RESP_TIME: usize = 1;
    pub(crate) const CHECKSUM:      Field = 2..4;
    pub(crate) const GROUP_ADDR:    Field = 4..8;
}

/// The length of an IGMPv2 message.
pub const HEADER_LEN: usize = field::GROUP_ADDR.end;

impl igmp {
    /// Imbue a raw octet buffer with IGMP message structure.
    pub fn new_unchecked(buffer: &[u8]) -> &igmp {
        Self::__from_macro_new_unchecked(buffer)
    }

    /// Imbue a mutable octet buffer with IGMP message structure.
    pub fn new_unchecked_mut(buffer: &mut [u8]) -> &mut igmp {
        Self::__from_macro_new_unchecked_mut(buffer)
    }

    /// Shorthand for a combination of [new_unchecked] and [check_len].
    ///
    /// [new_unchecked]: #method.new_unchecked
    /// [check_len]: #method.check_len
    pub fn new_checked(data: &[u8]) -> Result<&igmp> {
        let packet = Self::new_unchecked(data);
        packet.check_len()?;
        Ok(packet)
    }

    pub fn new_checked_mut(data: &mut [u8]) -> Result<&mut igmp> {
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

    /// The maximum response time of a query, in tenths of a second.
    #[inline]
    pub fn max_resp_time(&self) -> u8 {
        self.0[field::MAX_RESP_TIME]
    }

    #[inline]
    pub fn checksum(&self) -> u16 {
        NetworkEndian::read_u16(&self.0[field::CHECKSUM])
    }

    #[inline]
    pub fn group_addr(&self) -> Ipv4Address {
        Ipv4Address::from_bytes(&self.0[field::GROUP_ADDR])
    }

    /// Validate the checksum over this message and any trailing `payload`.
    pub fn verify_checksum(&self, payload: &[u8]) -> bool {
        checksum::upper_layer(None, IpProtocol::Igmp, &self.0, payload) == !0
    }

    #[inline]
    pub fn set_msg_type(&mut self, value: Message) {
        self.0[field::TYPE] = value.into();
    }

    #[inline]
    pub fn set_max_resp_time(&mut self, value: u8) {
        self.0[field::MAX_RESP_TIME] = value;
    }

    #[inline]
    pub fn set_checksum(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.0[field::CHECKSUM], value);
    }

    #[inline]
    pub fn set_group_addr(&mut self, value: Ipv4Address) {
        self.0[field::GROUP_ADDR].copy_from_slice(value.as_bytes());
    }

    /// Compute and fill in the checksum over this message and `payload`.
    pub fn fill_checksum(&mut self, payload: &[u8]) {
        self.set_checksum(0);
        let checksum = !checksum::upper_layer(None, IpProtocol::Igmp, &self.0, payload);
        self.set_checksum(checksum);
    }
}

/// The version of a membership report.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Version {
    V1,
    V2,
}

/// A high-level representation of an IGMPv1 or IGMPv2 message.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Repr {
    MembershipQuery {
        /// In tenths of a second, zero for version 1 queries.
        max_resp_time: u8,
        /// Unspecified for a general query.
        group_addr: Ipv4Address,
    },
    MembershipReport {
        group_addr: Ipv4Address,
        version: Version,
    },
    LeaveGroup {
        group_addr: Ipv4Address,
    },
}

impl Repr {
    pub fn parse(packet: &igmp) -> Result<Repr> {
        packet.check_len()?;
        let group_addr = packet.group_addr();
        match packet.msg_type() {
            Message::MembershipQuery => Ok(Repr::MembershipQuery {
                max_resp_time: packet.max_resp_time(),
                group_addr,
            }),
            Message::MembershipReportV1 => Ok(Repr::MembershipReport {
                group_addr,
                version: Version::V1,
            }),
            Message::MembershipReportV2 => Ok(Repr::MembershipReport {
                group_addr,
                version: Version::V2,
            }),
            Message::LeaveGroup => Ok(Repr::LeaveGroup { group_addr }),
            Message::MembershipReportV3 => Err(Error::Unsupported),
            Message::Unknown(_) => Err(Error::Unrecognized),
        }
    }

    pub fn header_len(&self) -> usize {
        HEADER_LEN
    }

    /// Emit the message, the checksum is zeroed until recomputed.
    pub fn emit(&self, packet: &mut igmp) {
        match *self {
            Repr::MembershipQuery { max_resp_time, group_addr } => {
                packet.set_msg_type(Message::MembershipQuery);
                packet.set_max_resp_time(max_resp_time);
                packet.set_group_addr(group_addr);
            },
            Repr::MembershipReport { group_addr, version } => {
                packet.set_msg_type(match version {
                    Version::V1 => Message::MembershipReportV1,
                    Version::V2 => Message::MembershipReportV2,
                });
                packet.set_max_resp_time(0);
                packet.set_group_addr(group_addr);
            },
            Repr::LeaveGroup { group_addr } => {
                packet.set_msg_type(Message::LeaveGroup);
                packet.set_max_resp_time(0);
                packet.set_group_addr(group_addr);
            },
        }

        packet.set_checksum(0);
    }

    /// Create a standalone IGMP layer with this message.
    pub fn to_packet(&self) -> Packet {
        let mut header = vec![0; self.header_len()];
        self.emit(igmp::new_unchecked_mut(&mut header));
        Packet::from_header(&Dissector, header)
    }
}

impl fmt::Display for Repr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Repr::MembershipQuery { max_resp_time, group_addr } =>
                write!(f, "IGMP membership query group={} max_resp={}", group_addr, max_resp_time),
            Repr::MembershipReport { group_addr, version } =>
                write!(f, "IGMP membership report group={} {:?}", group_addr, version),
            Repr::LeaveGroup { group_addr } =>
                write!(f, "IGMP leave group={}", group_addr),
        }
    }
}

/// The IGMP layer.
///
/// Bytes after the eight byte message are kept opaque but covered by the checksum.
#[derive(Debug, Clone, Copy, Default)]
pub struct Dissector;

impl Layer for Dissector {
    fn kind(&self) -> LayerKind {
        LayerKind::Igmp
    }

    fn header_len(&self, data: &[u8]) -> Result<usize> {
        igmp::new_checked(data)?;
        Ok(HEADER_LEN)
    }

    fn default_header(&self) -> Vec<u8> {
        let mut header = vec![0; HEADER_LEN];
        let repr = Repr::MembershipQuery {
            max_resp_time: 100,
            group_addr: Ipv4Address::UNSPECIFIED,
        };
        repr.emit(igmp::new_unchecked_mut(&mut header));
        header
    }

    fn required_header_len(&self, _: &[u8]) -> Option<usize> {
        Some(HEADER_LEN)
    }

    fn recompute(&self, header: &mut [u8], cx: &Context) {
        if let (true, Ok(packet)) = (cx.checksum.manual(), igmp::new_checked_mut(header)) {
            packet.fill_checksum(cx.payload);
        }
    }

    fn checksum_valid(&self, header: &[u8], cx: &Context) -> Option<bool> {
        let packet = igmp::new_checked(header).ok()?;
        Some(packet.verify_checksum(cx.payload))
    }
}

#[cfg(test)]
mod test {
    use crate::wire::Checksum;
    use super::*;

    static REPORT_BYTES: [u8; 8] =
        [0x16, 0x00, 0x09, 0x04,
         0xe0, 0x00, 0x00, 0xfb];

    static QUERY_BYTES: [u8; 8] =
        [0x11, 0x64, 0xee, 0x9b,
         0x00, 0x00, 0x00, 0x00];

    #[test]
    fn test_report_deconstruct() {
        let packet = igmp::new_checked(&REPORT_BYTES[..]).unwrap();
        assert_eq!(packet.msg_type(), Message::MembershipReportV2);
        assert_eq!(packet.max_resp_time(), 0);
        assert_eq!(packet.checksum(), 0x0904);
        assert_eq!(packet.group_addr(), Ipv4Address::new(224, 0, 0, 251));
        assert!(packet.verify_checksum(&[]));
        assert!(!packet.verify_checksum(&[0x00, 0x01]));
    }

    #[test]
    fn test_query_parse() {
        let repr = Repr::parse(igmp::new_unchecked(&QUERY_BYTES)).unwrap();
        assert_eq!(repr, Repr::MembershipQuery {
            max_resp_time: 100,
            group_addr: Ipv4Address::UNSPECIFIED,
        });
        assert_eq!(Dissector.default_header()[..2], QUERY_BYTES[..2]);
    }

    #[test]
    fn test_report_emit() {
        let repr = Repr::MembershipReport {
            group_addr: Ipv4Address::new(224, 0, 0, 251),
            version: Version::V2,
        };
        let mut bytes = vec![0xa5; repr.header_len()];
        repr.emit(igmp::new_unchecked_mut(&mut bytes));
        let cx = Context {
            payload: &[],
            pseudo: None,
            checksum: Checksum::Manual,
        };
        Dissector.recompute(&mut bytes, &cx);
        assert_eq!(&bytes[..], &REPORT_BYTES[..]);
        assert_eq!(Dissector.checksum_valid(&bytes, &cx), Some(true));
    }

    #[test]
    fn test_unknown_type() {
        let mut bytes = REPORT_BYTES;
        bytes[0] = 0x22;
        assert_eq!(Repr::parse(igmp::new_unchecked(&bytes)), Err(Error::Unsupported));
        bytes[0] = 0x30;
        assert_eq!(Repr::parse(igmp::new_unchecked(&bytes)), Err(Error::Unrecognized));
        assert_eq!(Dissector.header_len(&bytes[..7]), Err(Error::Truncated));
    }
}
