//! IEEE 802.2 logical link control, with the SNAP extension.
//!
//! 802.11 data frames carry their payload behind an LLC header. With the service access points
//! both set to `0xaa` and an unnumbered information control byte the header is followed by an
//! organization code and an Ethernet type, which then identifies the payload protocol.
use core::fmt;
use byteorder::{ByteOrder, NetworkEndian};

use crate::packet::{Discriminant, Layer, LayerKind, Packet};
use super::{EtherType, Error, Result};

byte_wrapper! {
    /// A byte sequence representing an LLC header, with or without SNAP extension.
    #[derive(Debug, PartialEq, Eq)]
    pub struct llc([u8]);
}

header_wrapper!(llc, LayerKind::Llc);

mod field {
    use crate::wire::field::Field;

    pub(crate) const DSAP:      usize = 0;
    pub(crate) const SSAP:      usize = 1;
    pub(crate) const CONTROL:   usize = 2;
    pub(crate) const OUI:       Field = 3..6;
    pub(crate) const ETHERTYPE: Field = 6..8;
}

/// The service access point announcing a SNAP header.
pub const SAP_SNAP: u8 = 0xaa;

/// The control value of unnumbered information frames.
pub const CONTROL_UI: u8 = 0x03;

/// The length of a SNAP encapsulation header.
pub const SNAP_LEN: usize = field::ETHERTYPE.end;

impl llc {
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
        if self.0.len() <= field::CONTROL {
            Err(Error::Truncated)
        } else if self.0.len() < self.header_len() {
            Err(Error::Truncated)
        } else {
            Ok(())
        }
    }

    /// The header length as announced by the first three bytes.
    pub fn header_len(&self) -> usize {
        if self.is_snap() {
            SNAP_LEN
        } else if self.0[field::CONTROL] & 0x3 != 0x3 {
            // Information and supervisory frames use a two byte control field.
            field::CONTROL + 2
        } else {
            field::CONTROL + 1
        }
    }

    pub fn dsap(&self) -> u8 {
        self.0[field::DSAP]
    }

    pub fn ssap(&self) -> u8 {
        self.0[field::SSAP]
    }

    /// The control field, one or two bytes.
    pub fn control(&self) -> u16 {
        match self.header_len() {
            4 => NetworkEndian::read_u16(&self.0[field::CONTROL..field::CONTROL + 2]),
            _ => self.0[field::CONTROL].into(),
        }
    }

    pub fn is_snap(&self) -> bool {
        self.0[field::DSAP] == SAP_SNAP
            && self.0[field::SSAP] == SAP_SNAP
            && self.0[field::CONTROL] == CONTROL_UI
    }

    /// The organization code of a SNAP header.
    pub fn oui(&self) -> Option<[u8; 3]> {
        if !self.is_snap() {
            return None;
        }
        let mut oui = [0; 3];
        oui.copy_from_slice(self.0.get(field::OUI)?);
        Some(oui)
    }

    /// The payload type of a SNAP header.
    pub fn ethertype(&self) -> Option<EtherType> {
        if !self.is_snap() {
            return None;
        }
        self.0.get(field::ETHERTYPE).map(|raw| NetworkEndian::read_u16(raw).into())
    }

    pub fn set_dsap(&mut self, value: u8) {
        self.0[field::DSAP] = value
    }

    pub fn set_ssap(&mut self, value: u8) {
        self.0[field::SSAP] = value
    }

    pub fn set_oui(&mut self, value: [u8; 3]) {
        self.0[field::OUI].copy_from_slice(&value)
    }

    pub fn set_ethertype(&mut self, value: EtherType) {
        NetworkEndian::write_u16(&mut self.0[field::ETHERTYPE], value.into())
    }
}

impl AsRef<[u8]> for llc {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// A high-level representation of an LLC header.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Repr {
    /// Plain LLC with service access points and a control field.
    Llc {
        dsap: u8,
        ssap: u8,
        control: u16,
    },
    /// SNAP encapsulation of an Ethernet type.
    Snap {
        oui: [u8; 3],
        ethertype: EtherType,
    },
}

impl Repr {
    pub fn parse(header: &llc) -> Result<Repr> {
        header.check_len()?;
        match (header.oui(), header.ethertype()) {
            (Some(oui), Some(ethertype)) => Ok(Repr::Snap { oui, ethertype }),
            _ => Ok(Repr::Llc {
                dsap: header.dsap(),
                ssap: header.ssap(),
                control: header.control(),
            }),
        }
    }

    pub fn header_len(&self) -> usize {
        match self {
            Repr::Snap { .. } => SNAP_LEN,
            Repr::Llc { control, .. } if control & 0x3 != 0x3 => field::CONTROL + 2,
            Repr::Llc { .. } => field::CONTROL + 1,
        }
    }

    pub fn emit(&self, header: &mut llc) {
        match *self {
            Repr::Snap { oui, ethertype } => {
                header.set_dsap(SAP_SNAP);
                header.set_ssap(SAP_SNAP);
                header.0[field::CONTROL] = CONTROL_UI;
                header.set_oui(oui);
                header.set_ethertype(ethertype);
            },
            Repr::Llc { dsap, ssap, control } => {
                header.set_dsap(dsap);
                header.set_ssap(ssap);
                if self.header_len() == 4 {
                    NetworkEndian::write_u16(&mut header.0[field::CONTROL..field::CONTROL + 2], control);
                } else {
                    header.0[field::CONTROL] = control as u8;
                }
            },
        }
    }

    /// Create a standalone LLC layer.
    pub fn to_packet(&self) -> Packet {
        let mut header = vec![0; self.header_len()];
        self.emit(llc::new_unchecked_mut(&mut header));
        Packet::from_header(&Dissector, header)
    }
}

impl fmt::Display for Repr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Repr::Snap { oui, ethertype } => write!(f, "SNAP oui={:02x}{:02x}{:02x} type={}",
                oui[0], oui[1], oui[2], ethertype),
            Repr::Llc { dsap, ssap, control } => write!(f, "LLC dsap={:02x} ssap={:02x} ctrl={:x}",
                dsap, ssap, control),
        }
    }
}

/// The LLC layer.
///
/// Only SNAP headers identify their payload, plain LLC payloads stay opaque.
#[derive(Debug, Clone, Copy, Default)]
pub struct Dissector;

impl Layer for Dissector {
    fn kind(&self) -> LayerKind {
        LayerKind::Llc
    }

    fn header_len(&self, data: &[u8]) -> Result<usize> {
        Ok(llc::new_checked(data)?.header_len())
    }

    fn next(&self, header: &[u8], _: &[u8]) -> Option<Discriminant> {
        let header = llc::new_checked(header).ok()?;
        header.ethertype().map(Discriminant::EtherType)
    }

    fn discriminant_of(&self, payload: LayerKind) -> Option<Discriminant> {
        EtherType::of_layer(payload).map(Discriminant::EtherType)
    }

    fn set_next(&self, header: &mut [u8], next: Discriminant) {
        let ethertype = match next {
            Discriminant::EtherType(ethertype) => ethertype,
            _ => return,
        };
        if header.len() < SNAP_LEN {
            return;
        }
        let header = llc::new_unchecked_mut(header);
        if header.is_snap() {
            header.set_ethertype(ethertype);
        }
    }

    fn default_header(&self) -> Vec<u8> {
        vec![SAP_SNAP, SAP_SNAP, CONTROL_UI, 0, 0, 0, 0, 0]
    }

    fn required_header_len(&self, header: &[u8]) -> Option<usize> {
        match llc::new_checked(header) {
            Ok(header) => Some(header.header_len()),
            Err(_) if header.len() > field::CONTROL => Some(llc::new_unchecked(header).header_len()),
            Err(_) => Some(SNAP_LEN),
        }
    }
}
