//! Generic Routing Encapsulation.
//!
//! The fixed part names the payload by its Ethernet type. Optional checksum, key and sequence
//! number words follow when their flag is set, in that order.
use core::fmt;
use byteorder::{ByteOrder, NetworkEndian};

use crate::packet::{Context, Discriminant, Layer, LayerKind, Packet};
use super::{checksum, EtherType, Error, IpProtocol, Result};

byte_wrapper! {
    /// A byte sequence representing a GRE header.
    #[derive(Debug, PartialEq, Eq)]
    pub struct gre([u8]);
}

header_wrapper!(gre, LayerKind::Gre);

mod field {
    use crate::wire::field::Field;

    pub(crate) const FLAGS:    usize = 0;
    pub(crate) const VERSION:  usize = 1;
    pub(crate) const PROTOCOL: Field = 2..4;

    pub(crate) const FLG_CHECKSUM: u8 = 0x80;
    pub(crate) const FLG_KEY:      u8 = 0x20;
    pub(crate) const FLG_SEQUENCE: u8 = 0x10;
}

/// The length of the header without any optional words.
pub const MIN_HEADER_LEN: usize = field::PROTOCOL.end;

/// The header length implied by the flags in the first header byte.
fn implied_len(flags: u8) -> usize {
    let mut len = MIN_HEADER_LEN;
    if flags & field::FLG_CHECKSUM != 0 {
        len += 4;
    }
    if flags & field::FLG_KEY != 0 {
        len += 4;
    }
    if flags & field::FLG_SEQUENCE != 0 {
        len += 4;
    }
    len
}

impl gre {
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
    /// The check is invalidated by changing any of the flags.
    pub fn check_len(&self) -> Result<()> {
        if self.0.len() < MIN_HEADER_LEN {
            Err(Error::Truncated)
        } else if self.0.len() < self.header_len() {
            Err(Error::Truncated)
        } else {
            Ok(())
        }
    }

    /// The header length implied by the flags.
    pub fn header_len(&self) -> usize {
        implied_len(self.0[field::FLAGS])
    }

    pub fn has_checksum(&self) -> bool {
        self.0[field::FLAGS] & field::FLG_CHECKSUM != 0
    }

    pub fn has_key(&self) -> bool {
        self.0[field::FLAGS] & field::FLG_KEY != 0
    }

    pub fn has_sequence(&self) -> bool {
        self.0[field::FLAGS] & field::FLG_SEQUENCE != 0
    }

    /// The version, the low three bits of the second byte.
    pub fn version(&self) -> u8 {
        self.0[field::VERSION] & 0x07
    }

    /// The protocol type of the payload.
    pub fn protocol(&self) -> EtherType {
        NetworkEndian::read_u16(&self.0[field::PROTOCOL]).into()
    }

    fn optional_at(&self, flag: u8) -> Option<usize> {
        let flags = self.0[field::FLAGS];
        if flags & flag == 0 {
            return None;
        }
        // Words of higher flags come first.
        let preceding = flags & !(flag | (flag - 1)) & !0x40;
        Some(implied_len(preceding))
    }

    /// The checksum word, if present.
    pub fn checksum(&self) -> Option<u16> {
        let at = self.optional_at(field::FLG_CHECKSUM)?;
        Some(NetworkEndian::read_u16(&self.0[at..at + 2]))
    }

    /// The key word, if present.
    pub fn key(&self) -> Option<u32> {
        let at = self.optional_at(field::FLG_KEY)?;
        Some(NetworkEndian::read_u32(&self.0[at..at + 4]))
    }

    /// The sequence number word, if present.
    pub fn sequence(&self) -> Option<u32> {
        let at = self.optional_at(field::FLG_SEQUENCE)?;
        Some(NetworkEndian::read_u32(&self.0[at..at + 4]))
    }

    /// Set the flags of the optional words.
    ///
    /// The header must be resized to the new `header_len` afterwards.
    pub fn set_present(&mut self, checksum: bool, key: bool, sequence: bool) {
        let mut flags = 0;
        if checksum { flags |= field::FLG_CHECKSUM }
        if key { flags |= field::FLG_KEY }
        if sequence { flags |= field::FLG_SEQUENCE }
        self.0[field::FLAGS] = flags;
    }

    pub fn set_version(&mut self, value: u8) {
        self.0[field::VERSION] = value & 0x07;
    }

    pub fn set_protocol(&mut self, value: EtherType) {
        NetworkEndian::write_u16(&mut self.0[field::PROTOCOL], value.into())
    }

    /// Set the checksum word, ignored if the header has none.
    pub fn set_checksum(&mut self, value: u16) {
        if let Some(at) = self.optional_at(field::FLG_CHECKSUM) {
            NetworkEndian::write_u16(&mut self.0[at..at + 2], value);
        }
    }

    /// Set the key word, ignored if the header has none.
    pub fn set_key(&mut self, value: u32) {
        if let Some(at) = self.optional_at(field::FLG_KEY) {
            NetworkEndian::write_u32(&mut self.0[at..at + 4], value);
        }
    }

    /// Set the sequence number word, ignored if the header has none.
    pub fn set_sequence(&mut self, value: u32) {
        if let Some(at) = self.optional_at(field::FLG_SEQUENCE) {
            NetworkEndian::write_u32(&mut self.0[at..at + 4], value);
        }
    }
}

impl AsRef<[u8]> for gre {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// A high-level representation of a GRE header.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Repr {
    pub protocol: EtherType,
    /// Whether a checksum word is present, its value is derived.
    pub checksum: bool,
    pub key: Option<u32>,
    pub sequence: Option<u32>,
}

impl Repr {
    pub fn parse(header: &gre) -> Result<Repr> {
        header.check_len()?;
        if header.version() != 0 {
            return Err(Error::Unrecognized);
        }

        Ok(Repr {
            protocol: header.protocol(),
            checksum: header.has_checksum(),
            key: header.key(),
            sequence: header.sequence(),
        })
    }

    pub fn header_len(&self) -> usize {
        let mut len = MIN_HEADER_LEN;
        if self.checksum { len += 4 }
        if self.key.is_some() { len += 4 }
        if self.sequence.is_some() { len += 4 }
        len
    }

    pub fn emit(&self, header: &mut gre) {
        header.set_present(self.checksum, self.key.is_some(), self.sequence.is_some());
        header.set_version(0);
        header.set_protocol(self.protocol);
        if self.checksum {
            // Also zeroes the reserved word following the checksum.
            let at = MIN_HEADER_LEN;
            NetworkEndian::write_u32(&mut header.0[at..at + 4], 0);
        }
        if let Some(key) = self.key {
            header.set_key(key);
        }
        if let Some(sequence) = self.sequence {
            header.set_sequence(sequence);
        }
    }

    /// Create a standalone GRE layer with this header.
    pub fn to_packet(&self) -> Packet {
        let mut header = vec![0; self.header_len()];
        self.emit(gre::new_unchecked_mut(&mut header));
        Packet::from_header(&Dissector, header)
    }
}

impl fmt::Display for Repr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "GRE type={}", self.protocol)?;
        if let Some(key) = self.key {
            write!(f, " key={}", key)?;
        }
        if let Some(sequence) = self.sequence {
            write!(f, " seq={}", sequence)?;
        }
        Ok(())
    }
}

/// The GRE layer.
#[derive(Debug, Clone, Copy, Default)]
pub struct Dissector;

impl Layer for Dissector {
    fn kind(&self) -> LayerKind {
        LayerKind::Gre
    }

    fn header_len(&self, data: &[u8]) -> Result<usize> {
        Ok(gre::new_checked(data)?.header_len())
    }

    fn next(&self, header: &[u8], _: &[u8]) -> Option<Discriminant> {
        let header = gre::new_checked(header).ok()?;
        Some(Discriminant::EtherType(header.protocol()))
    }

    fn discriminant_of(&self, payload: LayerKind) -> Option<Discriminant> {
        EtherType::of_layer(payload).map(Discriminant::EtherType)
    }

    fn set_next(&self, header: &mut [u8], next: Discriminant) {
        if let (Discriminant::EtherType(protocol), Ok(header)) = (next, gre::new_checked_mut(header)) {
            header.set_protocol(protocol);
        }
    }

    fn default_header(&self) -> Vec<u8> {
        vec![0; MIN_HEADER_LEN]
    }

    fn required_header_len(&self, header: &[u8]) -> Option<usize> {
        Some(header.first().map_or(MIN_HEADER_LEN, |&flags| implied_len(flags)))
    }

    fn recompute(&self, header: &mut [u8], cx: &Context) {
        let header = match gre::new_checked_mut(header) {
            Ok(header) => header,
            Err(_) => return,
        };

        if cx.checksum.manual() && header.has_checksum() {
            header.set_checksum(0);
            let sum = checksum::upper_layer(None, IpProtocol::Gre, &header.0, cx.payload);
            header.set_checksum(!sum);
        }
    }

    fn checksum_valid(&self, header: &[u8], cx: &Context) -> Option<bool> {
        let header = gre::new_checked(header).ok()?;
        if !header.has_checksum() {
            return None;
        }
        Some(checksum::upper_layer(None, IpProtocol::Gre, &header.0, cx.payload) == !0)
    }
}
