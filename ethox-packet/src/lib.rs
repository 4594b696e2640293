//! Zero-copy decoding, mutation and construction of layered network packets.
//!
//! ## Table of contents
//!
//! 1. [Highlights](#highlights)
//! 2. [Design](#design-and-relevant-core-concepts)
//! 3. [The wire module](wire/index.html)
//!    1. [Overview of packet representations](wire/index.html#an-overview-over-packet-representations)
//!    1. [Buffer views](wire/view/index.html)
//!    1. [Checksums](wire/checksum/index.html)
//! 4. [Packet trees](packet/index.html)
//!    1. [Dissectors](packet/trait.Layer.html)
//!    1. [The registry](packet/struct.Registry.html)
//!
//! ## Highlights
//!
//! * Decoding a captured buffer never copies it, all layers refer into one arena
//! * Serializing an unmodified packet hands out that same arena
//! * Lengths, protocol fields, checksums and the 802.11 frame check sequence are recomputed in one
//!   pass after mutation
//!
//! Many of the byte level `wire` representations follow whitequark's [`smoltcp`], as did the
//! `ethox` network stack this crate was split from.
//!
//! [`smoltcp`]: https://github.com/m-labs/smoltcp
//!
//! ## Design and relevant core concepts
//!
//! A [`Packet`] is a chain of layers, outermost first. Each layer consists of a header, a payload
//! and trailing padding. The payload is either the next layer, opaque bytes or absent. Which
//! dissector decodes a payload is chosen by a [`Registry`] from the discriminant the enclosing
//! header announces, for example the EtherType of an Ethernet frame.
//!
//! Protocols are described to the engine by implementations of [`Layer`]. These are stateless
//! units, one per protocol in [`wire`], and never own bytes. All bytes stay in the packet.
//!
//! ```
//! use ethox_packet::packet::{LayerKind, Packet};
//! use ethox_packet::wire::{ipv4, udp, EthernetAddress, Ipv4Address, IpProtocol, EtherType};
//!
//! let mut packet = ethox_packet::wire::ethernet::Repr {
//!     src_addr: EthernetAddress([0x02, 0, 0, 0, 0, 1]),
//!     dst_addr: EthernetAddress::BROADCAST,
//!     ethertype: EtherType::Unknown(0),
//! }.to_packet();
//! packet.push(ipv4::Repr {
//!     src_addr: Ipv4Address::new(10, 0, 0, 1),
//!     dst_addr: Ipv4Address::new(10, 0, 0, 255),
//!     protocol: IpProtocol::Unknown(0),
//!     payload_len: 0,
//!     hop_limit: 64,
//! }.to_packet()).unwrap();
//! packet.push(udp::Repr { src_port: 68, dst_port: 67 }.to_packet()).unwrap();
//! packet.push(vec![0u8; 16]).unwrap();
//!
//! let bytes = packet.into_bytes();
//! assert_eq!(bytes.len(), 14 + 20 + 8 + 16);
//!
//! let parsed = Packet::parse(ethox_packet::wire::LinkType::Ethernet, bytes).unwrap();
//! assert!(parsed.layer(LayerKind::Udp).is_some());
//! assert!(parsed.checksum_valid());
//! ```
//!
//! [`Packet`]: packet/struct.Packet.html
//! [`Registry`]: packet/struct.Registry.html
//! [`Layer`]: packet/trait.Layer.html
//! [`wire`]: wire/index.html
#![warn(unreachable_pub)]

#[macro_use] mod macros;
pub mod packet;
pub mod wire;
