//! IEEE 802.11 MAC frames.
//!
//! Only the MAC header is dissected. Its length depends on the frame type and on the flags of
//! the frame control field. Unlike the rest of the crate, the multi-byte fields of the MAC
//! header are little endian. The frame check sequence is not part of the header but handled by
//! the packet, see [`Fcs`].
//!
//! [`Fcs`]: ../../packet/enum.Fcs.html
use core::fmt;
use byteorder::{ByteOrder, LittleEndian};

use crate::packet::{Discriminant, Layer, LayerKind, Packet};
use super::{EthernetAddress, Error, Result};

enum_with_unknown! {
    /// The two bit frame type.
    pub enum FrameType(u8) {
        Management = 0,
        Control = 1,
        Data = 2,
        Extension = 3,
    }
}

/// Subtype values of control frames.
pub mod control {
    pub const BLOCK_ACK_REQUEST: u8 = 0x8;
    pub const BLOCK_ACK: u8 = 0x9;
    pub const PS_POLL: u8 = 0xa;
    pub const RTS: u8 = 0xb;
    pub const CTS: u8 = 0xc;
    pub const ACK: u8 = 0xd;
    pub const CF_END: u8 = 0xe;
    pub const CF_END_ACK: u8 = 0xf;
}

/// Subtype values of data frames.
pub mod data {
    pub const DATA: u8 = 0x0;
    pub const NULL: u8 = 0x4;
    pub const QOS_DATA: u8 = 0x8;
    pub const QOS_NULL: u8 = 0xc;

    /// The subtype bit marking a frame without a body.
    pub const NO_BODY: u8 = 0x4;
    /// The subtype bit marking frames with a QoS control field.
    pub const QOS: u8 = 0x8;
}

/// The flags of the second frame control byte.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Flags(pub u8);

impl Flags {
    pub const TO_DS: u8 = 0x01;
    pub const FROM_DS: u8 = 0x02;
    pub const MORE_FRAGMENTS: u8 = 0x04;
    pub const RETRY: u8 = 0x08;
    pub const POWER_MANAGEMENT: u8 = 0x10;
    pub const MORE_DATA: u8 = 0x20;
    pub const PROTECTED: u8 = 0x40;
    pub const ORDER: u8 = 0x80;

    pub fn to_ds(self) -> bool {
        self.0 & Self::TO_DS != 0
    }

    pub fn from_ds(self) -> bool {
        self.0 & Self::FROM_DS != 0
    }

    pub fn more_fragments(self) -> bool {
        self.0 & Self::MORE_FRAGMENTS != 0
    }

    pub fn retry(self) -> bool {
        self.0 & Self::RETRY != 0
    }

    pub fn power_management(self) -> bool {
        self.0 & Self::POWER_MANAGEMENT != 0
    }

    pub fn more_data(self) -> bool {
        self.0 & Self::MORE_DATA != 0
    }

    /// The body is encrypted.
    pub fn protected(self) -> bool {
        self.0 & Self::PROTECTED != 0
    }

    /// A HT control field is present in QoS data and management frames.
    pub fn order(self) -> bool {
        self.0 & Self::ORDER != 0
    }
}

byte_wrapper! {
    /// A byte sequence representing an IEEE 802.11 MAC header.
    #[derive(Debug, PartialEq, Eq)]
    pub struct ieee80211([u8]);
}

header_wrapper!(ieee80211, LayerKind::Ieee80211);

mod field {
    use crate::wire::field::Field;

    pub(crate) const FRAME_CONTROL: Field = 0..2;
    pub(crate) const DURATION:      Field = 2..4;
    pub(crate) const ADDR1:         Field = 4..10;
    pub(crate) const ADDR2:         Field = 10..16;
    pub(crate) const ADDR3:         Field = 16..22;
    pub(crate) const SEQ_CTRL:      Field = 22..24;
    pub(crate) const ADDR4:         Field = 24..30;

    pub(crate) const QOS_LEN: usize = 2;
    pub(crate) const HT_LEN:  usize = 4;
}

/// The shortest MAC header, of CTS and ACK frames.
pub const MIN_HEADER_LEN: usize = field::ADDR1.end;

/// The length of a header described by the two frame control bytes.
pub fn header_len_of(frame_control: [u8; 2]) -> usize {
    let frame_type = FrameType::from((frame_control[0] >> 2) & 0x3);
    let subtype = frame_control[0] >> 4;
    let flags = Flags(frame_control[1]);

    match frame_type {
        FrameType::Control => match subtype {
            control::CTS | control::ACK => field::ADDR1.end,
            _ => field::ADDR2.end,
        },
        FrameType::Management => {
            let ht = if flags.order() { field::HT_LEN } else { 0 };
            field::SEQ_CTRL.end + ht
        },
        FrameType::Data => {
            let mut len = field::SEQ_CTRL.end;
            if flags.to_ds() && flags.from_ds() {
                len = field::ADDR4.end;
            }
            if subtype & data::QOS != 0 {
                len += field::QOS_LEN;
                if flags.order() {
                    len += field::HT_LEN;
                }
            }
            len
        },
        _ => field::ADDR1.end,
    }
}

impl ieee80211 {
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

    /// Ensure that no accessor method will panic if called.
    ///
    /// The check is invalidated by changes to the frame control field.
    pub fn check_len(&self) -> Result<()> {
        if self.0.len() < field::FRAME_CONTROL.end {
            Err(Error::Truncated)
        } else if self.0.len() < self.header_len() {
            Err(Error::Truncated)
        } else {
            Ok(())
        }
    }

    /// The header length implied by the frame control field.
    pub fn header_len(&self) -> usize {
        header_len_of([self.0[0], self.0[1]])
    }

    /// The protocol version, the lowest two bits.
    pub fn version(&self) -> u8 {
        self.0[0] & 0x3
    }

    pub fn frame_type(&self) -> FrameType {
        FrameType::from((self.0[0] >> 2) & 0x3)
    }

    pub fn subtype(&self) -> u8 {
        self.0[0] >> 4
    }

    /// Type and subtype as used to select the payload protocol.
    pub fn type_subtype(&self) -> u8 {
        (u8::from(self.frame_type()) << 4) | self.subtype()
    }

    pub fn flags(&self) -> Flags {
        Flags(self.0[1])
    }

    /// The duration or association identifier, little endian.
    pub fn duration(&self) -> u16 {
        LittleEndian::read_u16(&self.0[field::DURATION])
    }

    /// The receiver address, present in every frame.
    pub fn addr1(&self) -> EthernetAddress {
        EthernetAddress::from_bytes(&self.0[field::ADDR1])
    }

    /// The transmitter address, absent in CTS and ACK frames.
    pub fn addr2(&self) -> Option<EthernetAddress> {
        self.address(field::ADDR2.start)
    }

    pub fn addr3(&self) -> Option<EthernetAddress> {
        if self.frame_type() == FrameType::Control {
            return None;
        }
        self.address(field::ADDR3.start)
    }

    /// The sequence control field, little endian.
    pub fn sequence_control(&self) -> Option<u16> {
        if self.frame_type() == FrameType::Control {
            return None;
        }
        self.0.get(field::SEQ_CTRL).map(LittleEndian::read_u16)
    }

    /// The fourth address of frames between distribution systems.
    pub fn addr4(&self) -> Option<EthernetAddress> {
        let flags = self.flags();
        if self.frame_type() != FrameType::Data || !(flags.to_ds() && flags.from_ds()) {
            return None;
        }
        self.address(field::ADDR4.start)
    }

    /// The QoS control field of QoS data frames, little endian.
    pub fn qos_control(&self) -> Option<u16> {
        let at = self.qos_offset()?;
        self.0.get(at..at + field::QOS_LEN).map(LittleEndian::read_u16)
    }

    fn qos_offset(&self) -> Option<usize> {
        if self.frame_type() != FrameType::Data || self.subtype() & data::QOS == 0 {
            return None;
        }
        Some(if self.addr4().is_some() { field::ADDR4.end } else { field::SEQ_CTRL.end })
    }

    fn address(&self, at: usize) -> Option<EthernetAddress> {
        if header_len_of([self.0[0], self.0[1]]) < at + 6 {
            return None;
        }
        self.0.get(at..at + 6).map(EthernetAddress::from_bytes)
    }

    /// Set type and subtype, leaving the version unchanged.
    pub fn set_type_subtype(&mut self, frame_type: FrameType, subtype: u8) {
        self.0[0] = (subtype << 4) | ((u8::from(frame_type) & 0x3) << 2) | self.version();
    }

    pub fn set_flags(&mut self, flags: Flags) {
        self.0[1] = flags.0;
    }

    pub fn set_duration(&mut self, value: u16) {
        LittleEndian::write_u16(&mut self.0[field::DURATION], value)
    }

    pub fn set_addr1(&mut self, value: EthernetAddress) {
        self.0[field::ADDR1].copy_from_slice(value.as_bytes())
    }

    pub fn set_addr2(&mut self, value: EthernetAddress) {
        self.0[field::ADDR2].copy_from_slice(value.as_bytes())
    }

    pub fn set_addr3(&mut self, value: EthernetAddress) {
        self.0[field::ADDR3].copy_from_slice(value.as_bytes())
    }

    pub fn set_sequence_control(&mut self, value: u16) {
        LittleEndian::write_u16(&mut self.0[field::SEQ_CTRL], value)
    }

    pub fn set_addr4(&mut self, value: EthernetAddress) {
        self.0[field::ADDR4].copy_from_slice(value.as_bytes())
    }

    /// Set the QoS control field, ignored for frames without one.
    pub fn set_qos_control(&mut self, value: u16) {
        if let Some(at) = self.qos_offset() {
            LittleEndian::write_u16(&mut self.0[at..at + field::QOS_LEN], value)
        }
    }
}

impl AsRef<[u8]> for ieee80211 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// A high-level representation of an IEEE 802.11 MAC header.
///
/// Fields that the frame type does not carry are `None`.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Repr {
    pub frame_type: FrameType,
    pub subtype: u8,
    pub flags: Flags,
    pub duration: u16,
    pub addr1: EthernetAddress,
    pub addr2: Option<EthernetAddress>,
    pub addr3: Option<EthernetAddress>,
    pub sequence_control: Option<u16>,
    pub addr4: Option<EthernetAddress>,
    pub qos_control: Option<u16>,
}

impl Repr {
    pub fn parse(frame: &ieee80211) -> Result<Repr> {
        frame.check_len()?;
        if frame.version() != 0 {
            return Err(Error::Unrecognized);
        }

        Ok(Repr {
            frame_type: frame.frame_type(),
            subtype: frame.subtype(),
            flags: frame.flags(),
            duration: frame.duration(),
            addr1: frame.addr1(),
            addr2: frame.addr2(),
            addr3: frame.addr3(),
            sequence_control: frame.sequence_control(),
            addr4: frame.addr4(),
            qos_control: frame.qos_control(),
        })
    }

    pub fn header_len(&self) -> usize {
        let subtype = (self.subtype << 4) | ((u8::from(self.frame_type) & 0x3) << 2);
        header_len_of([subtype, self.flags.0])
    }

    /// Emit the header, the buffer must be `header_len()` long.
    pub fn emit(&self, frame: &mut ieee80211) {
        frame.0[0] = 0;
        frame.set_type_subtype(self.frame_type, self.subtype);
        frame.set_flags(self.flags);
        frame.set_duration(self.duration);
        frame.set_addr1(self.addr1);
        if let (Some(addr), true) = (self.addr2, frame.0.len() >= field::ADDR2.end) {
            frame.set_addr2(addr);
        }
        if frame.0.len() >= field::SEQ_CTRL.end && self.frame_type != FrameType::Control {
            frame.set_addr3(self.addr3.unwrap_or_default());
            frame.set_sequence_control(self.sequence_control.unwrap_or(0));
        }
        if frame.addr4().is_some() {
            frame.set_addr4(self.addr4.unwrap_or_default());
        }
        frame.set_qos_control(self.qos_control.unwrap_or(0));
    }

    /// Create a standalone MAC layer with this header.
    pub fn to_packet(&self) -> Packet {
        let mut header = vec![0; self.header_len()];
        self.emit(ieee80211::new_unchecked_mut(&mut header));
        Packet::from_header(&Dissector, header)
    }
}

impl fmt::Display for Repr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "802.11 type={:?} subtype={} ra={}", self.frame_type, self.subtype, self.addr1)?;
        if let Some(addr2) = self.addr2 {
            write!(f, " ta={}", addr2)?;
        }
        Ok(())
    }
}

/// The IEEE 802.11 MAC layer.
///
/// Bodies of data frames are announced by type and subtype, bodies of other frames and of
/// protected frames are kept as opaque bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Dissector;

impl Layer for Dissector {
    fn kind(&self) -> LayerKind {
        LayerKind::Ieee80211
    }

    fn header_len(&self, data: &[u8]) -> Result<usize> {
        Ok(ieee80211::new_checked(data)?.header_len())
    }

    fn next(&self, header: &[u8], _: &[u8]) -> Option<Discriminant> {
        let frame = ieee80211::new_checked(header).ok()?;
        if frame.frame_type() != FrameType::Data || frame.subtype() & data::NO_BODY != 0 {
            return None;
        }
        Some(Discriminant::Dot11(frame.type_subtype()))
    }

    fn opaque_payload(&self, header: &[u8]) -> bool {
        match ieee80211::new_checked(header) {
            Ok(frame) => frame.flags().protected(),
            Err(_) => true,
        }
    }

    fn discriminant_of(&self, payload: LayerKind) -> Option<Discriminant> {
        match payload {
            LayerKind::Llc => Some(Discriminant::Dot11((2 << 4) | data::DATA)),
            _ => None,
        }
    }

    fn set_next(&self, header: &mut [u8], next: Discriminant) {
        if let (Discriminant::Dot11(value), true) = (next, header.len() >= 2) {
            let frame = ieee80211::new_unchecked_mut(header);
            let frame_type = FrameType::from(value >> 4);
            let mut subtype = value & 0xf;
            // A QoS data frame keeps its QoS control field.
            if frame.frame_type() == FrameType::Data && frame_type == FrameType::Data {
                subtype |= frame.subtype() & data::QOS;
            }
            frame.set_type_subtype(frame_type, subtype);
        }
    }

    fn default_header(&self) -> Vec<u8> {
        let mut header = vec![0; field::SEQ_CTRL.end];
        ieee80211::new_unchecked_mut(&mut header).set_type_subtype(FrameType::Data, data::DATA);
        header
    }

    fn required_header_len(&self, header: &[u8]) -> Option<usize> {
        match header {
            [first, second, ..] => Some(header_len_of([*first, *second])),
            _ => Some(field::SEQ_CTRL.end),
        }
    }
}
