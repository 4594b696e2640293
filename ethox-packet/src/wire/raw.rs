//! Raw IP link layer.
//!
//! The captured buffer starts directly with an IP header. The layer has no header bytes of its
//! own and selects the payload protocol by the version nibble of the first byte.
use crate::packet::{Discriminant, Layer, LayerKind};
use super::{Error, IpVersion, Result};

/// The raw IP link layer.
///
/// Versions other than 4 and 6 are not implemented and fail the decoding of a packet.
#[derive(Debug, Clone, Copy, Default)]
pub struct Dissector;

impl Layer for Dissector {
    fn kind(&self) -> LayerKind {
        LayerKind::RawIp
    }

    fn header_len(&self, data: &[u8]) -> Result<usize> {
        if data.is_empty() {
            return Err(Error::Truncated);
        }
        Ok(0)
    }

    fn next(&self, _: &[u8], payload: &[u8]) -> Option<Discriminant> {
        payload.first().map(|byte| Discriminant::IpVersion(byte >> 4))
    }

    fn discriminant_of(&self, payload: LayerKind) -> Option<Discriminant> {
        match payload {
            LayerKind::Ipv4 => Some(Discriminant::IpVersion(IpVersion::Ipv4.number())),
            LayerKind::Ipv6 => Some(Discriminant::IpVersion(IpVersion::Ipv6.number())),
            _ => None,
        }
    }

    fn default_header(&self) -> Vec<u8> {
        Vec::new()
    }

    fn required_header_len(&self, _: &[u8]) -> Option<usize> {
        Some(0)
    }
}
