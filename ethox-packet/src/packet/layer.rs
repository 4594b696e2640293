//! The capability set a protocol provides to the packet engine.
use core::fmt;

use crate::wire::{Checksum, EtherType, IpProtocol, LinkType, PseudoHeader, Result};

/// The protocol of one layer in a packet tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerKind {
    Ethernet,
    Vlan,
    Arp,
    Ipv4,
    Ipv6,
    Tcp,
    Udp,
    Icmpv4,
    Icmpv6,
    Igmp,
    Gre,
    /// BSD loopback encapsulation.
    Null,
    /// Raw IP link layer without any header bytes.
    RawIp,
    Ieee80211,
    Llc,
    /// A protocol supplied outside of this crate.
    Custom(&'static str),
}

/// A protocol identifying value, used to select the dissector of a payload.
///
/// Each variant is one namespace of identifiers. The same number has unrelated meaning in
/// different namespaces, e.g. `6` is TCP as an IP protocol but a link type as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Discriminant {
    /// The link type of a whole captured buffer.
    Link(LinkType),
    /// An Ethernet type field, also used by VLAN tags, GRE and SNAP.
    EtherType(EtherType),
    /// The protocol or next header field of IPv4 and IPv6.
    Ip(IpProtocol),
    /// The address family of the BSD loopback header.
    NullFamily(u32),
    /// The version nibble of a raw IP packet.
    IpVersion(u8),
    /// IEEE 802.11 frame type and subtype, as `type << 4 | subtype`.
    Dot11(u8),
}

/// The namespace of a [`Discriminant`].
///
/// [`Discriminant`]: enum.Discriminant.html
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Link,
    EtherType,
    Ip,
    NullFamily,
    IpVersion,
    Dot11,
}

impl Discriminant {
    pub fn namespace(&self) -> Namespace {
        match self {
            Discriminant::Link(_) => Namespace::Link,
            Discriminant::EtherType(_) => Namespace::EtherType,
            Discriminant::Ip(_) => Namespace::Ip,
            Discriminant::NullFamily(_) => Namespace::NullFamily,
            Discriminant::IpVersion(_) => Namespace::IpVersion,
            Discriminant::Dot11(_) => Namespace::Dot11,
        }
    }
}

/// What a layer knows about its surroundings when derived fields are computed or checked.
#[derive(Debug, Clone, Copy)]
pub struct Context<'a> {
    /// The serialized payload of the layer, without trailing padding.
    pub payload: &'a [u8],
    /// The pseudo header offered by the directly enclosing layer.
    pub pseudo: Option<PseudoHeader>,
    /// Whether checksum fields are to be filled.
    pub checksum: Checksum,
}

/// Per-protocol behaviour of the packet engine.
///
/// Implementations are stateless and live in statics, one unit `Dissector` per protocol module in
/// [`wire`]. All methods receive the header bytes of the layer they are asked about. Apart from
/// `header_len` they may assume the header was previously accepted by `header_len`, but must not
/// panic when a user has resized the header to something shorter.
///
/// [`wire`]: ../wire/index.html
pub trait Layer: Sync {
    /// The protocol of this layer.
    fn kind(&self) -> LayerKind;

    /// The length of the header at the start of `data`.
    ///
    /// Fails with `Truncated` when `data` is shorter than the header, and with `Malformed` when
    /// the header describes itself inconsistently.
    fn header_len(&self, data: &[u8]) -> Result<usize>;

    /// The number of payload bytes following the header.
    ///
    /// The remaining `available` bytes after that are padding. The result is clamped to
    /// `available` by the caller.
    fn payload_len(&self, _header: &[u8], available: usize) -> usize {
        available
    }

    /// The discriminant identifying the protocol of the payload.
    ///
    /// `payload` holds the first bytes of the payload, for layers that have no header field of
    /// their own to look at.
    fn next(&self, _header: &[u8], _payload: &[u8]) -> Option<Discriminant> {
        None
    }

    /// Check if the payload must be kept as opaque bytes regardless of its protocol.
    fn opaque_payload(&self, _header: &[u8]) -> bool {
        false
    }

    /// The discriminant this layer uses to announce a payload of the given protocol.
    fn discriminant_of(&self, _payload: LayerKind) -> Option<Discriminant> {
        None
    }

    /// Write a discriminant into the header, as returned by `discriminant_of`.
    fn set_next(&self, _header: &mut [u8], _next: Discriminant) {}

    /// A header with default field values for construction from scratch.
    fn default_header(&self) -> Vec<u8>;

    /// The pseudo header this layer offers to its payload for checksums.
    fn pseudo_header(&self, _header: &[u8]) -> Option<PseudoHeader> {
        None
    }

    /// The header length dictated by the header fields, if it differs from the buffer size.
    fn required_header_len(&self, _header: &[u8]) -> Option<usize> {
        None
    }

    /// Recompute length and checksum fields of the header.
    fn recompute(&self, _header: &mut [u8], _cx: &Context) {}

    /// Check the checksum covering this layer, `None` if it has none.
    fn checksum_valid(&self, _header: &[u8], _cx: &Context) -> Option<bool> {
        None
    }
}

impl fmt::Debug for dyn Layer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self.kind())
    }
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LayerKind::Ethernet => write!(f, "Ethernet"),
            LayerKind::Vlan => write!(f, "802.1Q"),
            LayerKind::Arp => write!(f, "ARP"),
            LayerKind::Ipv4 => write!(f, "IPv4"),
            LayerKind::Ipv6 => write!(f, "IPv6"),
            LayerKind::Tcp => write!(f, "TCP"),
            LayerKind::Udp => write!(f, "UDP"),
            LayerKind::Icmpv4 => write!(f, "ICMPv4"),
            LayerKind::Icmpv6 => write!(f, "ICMPv6"),
            LayerKind::Igmp => write!(f, "IGMP"),
            LayerKind::Gre => write!(f, "GRE"),
            LayerKind::Null => write!(f, "Null"),
            LayerKind::RawIp => write!(f, "Raw IP"),
            LayerKind::Ieee80211 => write!(f, "802.11"),
            LayerKind::Llc => write!(f, "LLC"),
            LayerKind::Custom(name) => write!(f, "{}", name),
        }
    }
}
