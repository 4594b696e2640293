use core::fmt;
use core::convert::From;

use crate::packet::LayerKind;
use crate::wire::{Error, Result};
use super::{Ipv4Address, Ipv6Address};

/// Internet protocol version.
#[derive(Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
pub enum Version {
    Ipv4,
    Ipv6,
}

impl Version {
    /// Return the version of an IP packet stored in the provided buffer.
    ///
    /// Unknown versions result in `Err(Error::Unrecognized)` and an empty buffer in
    /// `Err(Error::Truncated)`.
    pub fn of_packet(data: &[u8]) -> Result<Version> {
        match data.first().map(|byte| byte >> 4) {
            Some(4) => Ok(Version::Ipv4),
            Some(6) => Ok(Version::Ipv6),
            Some(_) => Err(Error::Unrecognized),
            None => Err(Error::Truncated),
        }
    }

    /// The value of the version nibble.
    pub fn number(self) -> u8 {
        match self {
            Version::Ipv4 => 4,
            Version::Ipv6 => 6,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Version::Ipv4 => write!(f, "IPv4"),
            Version::Ipv6 => write!(f, "IPv6"),
        }
    }
}

enum_with_unknown! {
    /// IP datagram encapsulated protocol.
    pub enum Protocol(u8) {
        HopByHop  = 0x00,
        Icmp      = 0x01,
        Igmp      = 0x02,
        IpIp      = 0x04,
        Tcp       = 0x06,
        Udp       = 0x11,
        Ipv6      = 0x29,
        Ipv6Route = 0x2b,
        Ipv6Frag  = 0x2c,
        Gre       = 0x2f,
        Icmpv6    = 0x3a,
        Ipv6NoNxt = 0x3b,
        Ipv6Opts  = 0x3c
    }
}

impl Protocol {
    /// The protocol number announcing a payload layer.
    pub fn of_layer(kind: LayerKind) -> Option<Protocol> {
        match kind {
            LayerKind::Tcp => Some(Protocol::Tcp),
            LayerKind::Udp => Some(Protocol::Udp),
            LayerKind::Icmpv4 => Some(Protocol::Icmp),
            LayerKind::Icmpv6 => Some(Protocol::Icmpv6),
            LayerKind::Igmp => Some(Protocol::Igmp),
            LayerKind::Ipv4 => Some(Protocol::IpIp),
            LayerKind::Ipv6 => Some(Protocol::Ipv6),
            LayerKind::Gre => Some(Protocol::Gre),
            _ => None,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Protocol::HopByHop    => write!(f, "Hop-by-Hop"),
            Protocol::Icmp        => write!(f, "ICMP"),
            Protocol::Igmp        => write!(f, "IGMP"),
            Protocol::IpIp        => write!(f, "IP-in-IP"),
            Protocol::Tcp         => write!(f, "TCP"),
            Protocol::Udp         => write!(f, "UDP"),
            Protocol::Ipv6        => write!(f, "IPv6"),
            Protocol::Ipv6Route   => write!(f, "IPv6-Route"),
            Protocol::Ipv6Frag    => write!(f, "IPv6-Frag"),
            Protocol::Gre         => write!(f, "GRE"),
            Protocol::Icmpv6      => write!(f, "ICMPv6"),
            Protocol::Ipv6NoNxt   => write!(f, "IPv6-NoNxt"),
            Protocol::Ipv6Opts    => write!(f, "IPv6-Opts"),
            Protocol::Unknown(id) => write!(f, "0x{:02x}", id)
        }
    }
}

/// An internetworking address.
#[derive(Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
pub enum Address {
    /// An IPv4 address.
    Ipv4(Ipv4Address),

    /// An IPv6 address.
    Ipv6(Ipv6Address),
}

impl Address {
    /// Create an address wrapping an IPv4 address with the given octets.
    pub const fn v4(a0: u8, a1: u8, a2: u8, a3: u8) -> Address {
        Address::Ipv4(Ipv4Address::new(a0, a1, a2, a3))
    }

    /// Create an address wrapping an IPv6 address with the given words.
    pub fn v6(
        a0: u16, a1: u16, a2: u16, a3: u16,
        a4: u16, a5: u16, a6: u16, a7: u16,
    ) -> Address {
        Address::Ipv6(Ipv6Address::new(a0, a1, a2, a3, a4, a5, a6, a7))
    }

    /// The version of the protocol this address belongs to.
    pub fn version(&self) -> Version {
        match self {
            Address::Ipv4(_) => Version::Ipv4,
            Address::Ipv6(_) => Version::Ipv6,
        }
    }

    /// Return an address as a sequence of octets, in big-endian.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Address::Ipv4(addr) => addr.as_bytes(),
            Address::Ipv6(addr) => addr.as_bytes(),
        }
    }
}

impl From<Ipv4Address> for Address {
    fn from(addr: Ipv4Address) -> Self {
        Address::Ipv4(addr)
    }
}

impl From<Ipv6Address> for Address {
    fn from(addr: Ipv6Address) -> Self {
        Address::Ipv6(addr)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Address::Ipv4(addr) => write!(f, "{}", addr),
            Address::Ipv6(addr) => write!(f, "{}", addr),
        }
    }
}
