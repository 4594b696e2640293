/*! Low-level packet access and construction.

# An overview over packet representations

The `wire` module deals with the byte level *representation* of every protocol layer that the
[`packet`] tree can dissect. It provides three levels of functionality.

 * First, it provides bounds checked windows into shared byte buffers, the [`View`] and
   [`ViewMut`]. Sub-slicing a view never copies; the headers of all layers of a packet alias one
   buffer.
 * Second, it provides functions to extract fields from a header's octets, and to insert fields
   into them. This happens in the lowercase structures e.g. [`ipv4::ipv4`] or [`udp::udp`]. These
   wrap exactly the header bytes of one layer, never its payload.
 * Third, it provides a compact, high-level representation of header data that can be created
   from parsing and emitted into a sequence of octets. This happens through the `Repr` family of
   structs and enums, e.g. [`arp::Repr`] or [`ipv4::Repr`].

Each protocol module also defines a unit `Dissector` that describes the layer to the generic
[`packet`] engine: how long the header is, which protocol the payload carries and how derived
fields such as lengths and checksums are recomputed.

The lowercase wrappers guarantee that, if `check_len()` returned `Ok(())`, then no field accessor
or setter method will panic; however, the guarantee only holds while the length-describing fields
are not mutated. In the `Repr` family of data structures, the `Repr::parse()` method never panics
and the `Repr::emit()` method never panics as long as the underlying buffer is at least
`Repr::header_len()` octets long.

# Examples

To emit an IP packet header into an octet buffer, and then parse it back:

```rust
use ethox_packet::wire::{Checksum, ipv4, IpProtocol, Ipv4Address};
let repr = ipv4::Repr {
    src_addr:    Ipv4Address::new(10, 0, 0, 1),
    dst_addr:    Ipv4Address::new(10, 0, 0, 2),
    protocol:    IpProtocol::Tcp,
    payload_len: 10,
    hop_limit:   64
};
let mut buffer = vec![0; repr.header_len()];
{ // emission
    let header = ipv4::ipv4::new_unchecked_mut(&mut buffer);
    repr.emit(header, Checksum::Manual);
}
{ // parsing
    let header = ipv4::ipv4::new_checked(&buffer)
        .expect("truncated packet");
    let parsed = ipv4::Repr::parse(header)
        .expect("malformed packet");
    assert_eq!(repr, parsed);
}
```

[`packet`]: ../packet/index.html
*/
// Copyright (C) 2016 whitequark@whitequark.org
// Copyright (C) 2019 Andreas Molzer <andreas.molzer@tum.de>
//
// in large parts from `smoltcp` originally distributed under 0-clause BSD
//
// Applies to files in this folder unless otherwise noted. These are:
// * `arp.rs`
// * `error.rs`
// * `ethernet.rs`
// * `icmpv4.rs`
// * `ip.rs`
// * `ipv4.rs`
// * `ipv6.rs`
// * `mod.rs` (this file)
// * `tcp.rs`
// * `udp.rs`

mod field {
    pub(crate) type Field = ::core::ops::Range<usize>;
    pub(crate) type Rest  = ::core::ops::RangeFrom<usize>;
}

mod error;
pub mod view;
pub mod checksum;

pub mod ethernet;
pub mod vlan;
pub mod arp;
pub mod ip;
pub mod ipv4;
pub mod ipv6;
pub mod icmpv4;
pub mod icmpv6;
pub mod igmp;
pub mod udp;
pub mod tcp;
pub mod gre;
pub mod null;
pub mod raw;
pub mod ieee80211;
pub mod llc;

/// Describes how to handle checksums.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Checksum {
    /// Checksum must be computed or checked manually.
    Manual,

    /// The checksum field is filled or checked elsewhere, e.g. offloaded to the NIC.
    Ignored,
}

impl Checksum {
    /// Check if checksum fields are to be filled.
    pub fn manual(self) -> bool {
        self == Checksum::Manual
    }
}

impl Default for Checksum {
    fn default() -> Self {
        Checksum::Manual
    }
}

enum_with_unknown! {
    /// The link layer type of a captured buffer, as numbered by the pcap file format.
    pub doc enum LinkType(u32) {
        /// BSD loopback encapsulation, a four byte host order address family.
        Null = 0,
        /// Ethernet II.
        Ethernet = 1,
        /// Raw IP, the version is determined from the first nibble.
        Raw = 101,
        /// IEEE 802.11 wireless frames without radio information.
        Ieee80211 = 105,
        /// Raw IPv4.
        Ipv4 = 228,
        /// Raw IPv6.
        Ipv6 = 229,
    }
}

pub use self::error::{Error, Result};
pub use self::view::{Span, View, ViewMut};
pub use self::checksum::PseudoHeader;

pub use self::ethernet::{
    Address as EthernetAddress,
    EtherType};

pub use self::ip::{
    Address as IpAddress,
    Protocol as IpProtocol,
    Version as IpVersion};

pub use self::ipv4::Address as Ipv4Address;
pub use self::ipv6::Address as Ipv6Address;
