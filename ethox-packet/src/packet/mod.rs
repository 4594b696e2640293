//! Packet trees over a single byte arena.
//!
//! A [`Packet`] owns the captured or constructed bytes and a chain of [`Node`]s describing the
//! encapsulated protocols. Decoding never copies, each node refers to its header, payload and
//! padding by position in the arena. Mutation goes through a [`LayerMut`]; it writes into the
//! arena while the size of a header is unchanged and gives the header its own buffer otherwise.
//!
//! Derived fields, that is lengths, payload discriminants, checksums and the frame check
//! sequence, are not maintained on each mutation. They are fixed by [`Packet::recompute`], which
//! [`Packet::serialize`] invokes for packets that were mutated or constructed.
//!
//! ```
//! use ethox_packet::packet::Packet;
//! use ethox_packet::wire::{udp, LinkType};
//!
//! let frame: Vec<u8> = vec![
//!     0x02, 0x00, 0x00, 0x00, 0x00, 0x02, 0x02, 0x00, 0x00, 0x00, 0x00, 0x01, 0x08, 0x00,
//!     0x45, 0x00, 0x00, 0x20, 0x00, 0x01, 0x00, 0x00, 0x40, 0x11, 0x66, 0xca,
//!     0x0a, 0x00, 0x00, 0x01, 0x0a, 0x00, 0x00, 0x02,
//!     0x30, 0x39, 0x00, 0x35, 0x00, 0x0c, 0x1d, 0xc8, 0xde, 0xad, 0xbe, 0xef,
//! ];
//! let packet = Packet::parse(LinkType::Ethernet, frame).unwrap();
//! let datagram = packet.extract::<udp::udp>().unwrap();
//! assert_eq!(datagram.dst_port(), 53);
//! assert!(packet.checksum_valid());
//! ```
//!
//! [`Packet`]: struct.Packet.html
//! [`Node`]: struct.Node.html
//! [`LayerMut`]: struct.LayerMut.html
//! [`Packet::recompute`]: struct.Packet.html#method.recompute
//! [`Packet::serialize`]: struct.Packet.html#method.serialize
use core::{fmt, mem};
use std::borrow::Cow;

use byteorder::{ByteOrder, LittleEndian};

use crate::wire::{checksum, Checksum, Error, LinkType, Result};

mod emit;
mod layer;
mod node;
mod registry;

pub use self::layer::{Context, Discriminant, Layer, LayerKind, Namespace};
pub use self::node::{Node, Payload, Region};
pub use self::registry::{ParseError, Registry, MAX_DEPTH};

/// Whether a captured frame ends in a frame check sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Fcs {
    /// The frame ends with its last layer.
    Absent,
    /// A CRC-32 follows the frame, stored least significant byte first.
    Present,
}

impl Default for Fcs {
    fn default() -> Self {
        Fcs::Absent
    }
}

/// Typed access to the header bytes of a layer.
///
/// Implemented by the byte wrappers of [`wire`].
///
/// [`wire`]: ../wire/index.html
pub trait Header {
    /// The layer whose header this type describes.
    const KIND: LayerKind;

    /// Interpret header bytes, checking their length.
    fn from_header(bytes: &[u8]) -> Result<&Self>;

    /// Interpret mutable header bytes, checking their length.
    fn from_header_mut(bytes: &mut [u8]) -> Result<&mut Self>;
}

/// A decoded or constructed packet.
#[derive(Clone)]
pub struct Packet {
    arena: Vec<u8>,
    root: Node,
    fcs: Option<Region>,
    /// Derived fields may be stale.
    dirty: bool,
}

/// A shared view of one layer.
#[derive(Clone, Copy)]
pub struct LayerRef<'a> {
    packet: &'a Packet,
    node: &'a Node,
    depth: usize,
}

/// The payload of a layer.
#[derive(Clone, Copy, Debug)]
pub enum PayloadRef<'a> {
    Node(LayerRef<'a>),
    Raw(&'a [u8]),
    Empty,
}

/// A mutable view of one layer.
pub struct LayerMut<'a> {
    arena: &'a mut Vec<u8>,
    node: &'a mut Node,
}

impl Packet {
    /// Decode a captured buffer with the standard dissectors.
    pub fn parse(link: LinkType, data: impl Into<Vec<u8>>) -> core::result::Result<Self, ParseError> {
        Packet::parse_with_fcs(link, data, Fcs::Absent)
    }

    /// Decode a captured buffer that may end in a frame check sequence.
    pub fn parse_with_fcs(link: LinkType, data: impl Into<Vec<u8>>, fcs: Fcs)
        -> core::result::Result<Self, ParseError>
    {
        Registry::standard().decode(link, data.into(), fcs)
    }

    /// Decode a buffer starting with the header of a specific layer.
    pub fn parse_layer(layer: &'static dyn Layer, data: impl Into<Vec<u8>>)
        -> core::result::Result<Self, ParseError>
    {
        Registry::standard().decode_layer(layer, data.into(), Fcs::Absent)
    }

    /// A single layer with the default header of its dissector.
    pub fn new(layer: &'static dyn Layer) -> Self {
        Packet::from_header(layer, layer.default_header())
    }

    /// A single layer with the given header bytes.
    pub fn from_header(layer: &'static dyn Layer, header: Vec<u8>) -> Self {
        let span = crate::wire::Span::new(0, header.len());
        Packet {
            arena: header,
            root: Node::new(layer, Region::shared(span)),
            fcs: None,
            dirty: true,
        }
    }

    pub(crate) fn from_parts(arena: Vec<u8>, root: Node, fcs: Option<Region>) -> Self {
        Packet {
            arena,
            root,
            fcs,
            dirty: false,
        }
    }

    pub(crate) fn into_parts(self) -> (Vec<u8>, Node) {
        (self.arena, self.root)
    }

    /// The outermost layer.
    pub fn root(&self) -> LayerRef<'_> {
        LayerRef {
            packet: self,
            node: &self.root,
            depth: 0,
        }
    }

    /// Mutable access to the outermost layer.
    pub fn root_mut(&mut self) -> LayerMut<'_> {
        self.dirty = true;
        LayerMut {
            arena: &mut self.arena,
            node: &mut self.root,
        }
    }

    /// All layers, outermost first.
    pub fn layers(&self) -> impl Iterator<Item=LayerRef<'_>> {
        self.root.chain()
            .enumerate()
            .map(move |(depth, node)| LayerRef { packet: self, node, depth })
    }

    /// The outermost layer of a protocol.
    pub fn layer(&self, kind: LayerKind) -> Option<LayerRef<'_>> {
        self.layers().find(|layer| layer.kind() == kind)
    }

    /// Mutable access to the outermost layer of a protocol.
    pub fn layer_mut(&mut self, kind: LayerKind) -> Option<LayerMut<'_>> {
        let node = self.root.find_mut(kind)?;
        self.dirty = true;
        Some(LayerMut {
            arena: &mut self.arena,
            node,
        })
    }

    /// Mutable access to the innermost layer.
    pub fn innermost_mut(&mut self) -> LayerMut<'_> {
        self.dirty = true;
        LayerMut {
            arena: &mut self.arena,
            node: self.root.last_mut(),
        }
    }

    /// The typed header of the outermost layer of a protocol.
    ///
    /// `None` if there is no such layer or its header is too short for the type.
    pub fn extract<H: Header + ?Sized>(&self) -> Option<&H> {
        let layer = self.layer(H::KIND)?;
        H::from_header(layer.header()).ok()
    }

    /// The mutable typed header of the outermost layer of a protocol.
    pub fn extract_mut<H: Header + ?Sized>(&mut self) -> Option<&mut H> {
        let node = self.root.find_mut(H::KIND)?;
        self.dirty = true;
        H::from_header_mut(node.header.bytes_mut(&mut self.arena)).ok()
    }

    /// Attach a payload to the innermost layer.
    ///
    /// This is the way of stacking standalone layers into a packet, the payload discriminant of
    /// the innermost layer is set to announce the new payload.
    pub fn push(&mut self, payload: impl Into<Payload>) -> Result<()> {
        self.innermost_mut().set_payload(payload)
    }

    /// Recompute all derived fields, filling checksums.
    pub fn recompute(&mut self) {
        self.recompute_with(Checksum::Manual)
    }

    /// Recompute all derived fields.
    ///
    /// With `Checksum::Ignored` checksum fields and the frame check sequence are left as they
    /// are, for example to be filled by offloading hardware.
    pub fn recompute_with(&mut self, checksum: Checksum) {
        emit::recompute(&mut self.arena, &mut self.root, None, checksum);
        if checksum.manual() {
            self.update_fcs();
        }
        self.dirty = false;
    }

    /// The bytes of the packet, recomputing derived fields first if it was modified.
    ///
    /// If all layers still lie in order in the arena, as they do after decoding, this does not
    /// copy. Otherwise the arena is rebuilt from all layers once.
    pub fn serialize(&mut self) -> &[u8] {
        self.serialize_with(Checksum::Manual)
    }

    /// The bytes of the packet, with a choice of checksum treatment.
    pub fn serialize_with(&mut self, checksum: Checksum) -> &[u8] {
        if self.dirty {
            self.recompute_with(checksum);
        }

        if emit::is_flush(&self.arena, &self.root, self.fcs.as_ref()) {
            net_trace!("serialized {} bytes in place", self.arena.len());
        } else {
            net_debug!("rebuilding packet of {} layers", self.layers().count());
            self.arena = emit::rebuild(&self.arena, &mut self.root, self.fcs.as_mut());
        }

        &self.arena
    }

    /// Serialize into an owned buffer.
    ///
    /// The arena is handed out directly, there is no copy beyond those of `serialize`.
    pub fn into_bytes(mut self) -> Vec<u8> {
        self.serialize();
        self.arena
    }

    /// The length of all layers, including the frame check sequence.
    pub fn total_len(&self) -> usize {
        self.root.total_len() + self.fcs.as_ref().map_or(0, Region::len)
    }

    /// Check all checksums of all layers.
    ///
    /// Layers without a checksum, or with a checksum that can not be checked standalone, do not
    /// count. The frame check sequence is checked separately by `fcs_valid`.
    pub fn checksum_valid(&self) -> bool {
        self.layers().all(|layer| layer.checksum_valid() != Some(false))
    }

    /// The stored frame check sequence.
    pub fn fcs(&self) -> Option<u32> {
        let bytes = self.fcs.as_ref()?.bytes(&self.arena);
        if bytes.len() < registry::FCS_LEN {
            return None;
        }
        Some(LittleEndian::read_u32(bytes))
    }

    /// Check the frame check sequence, a missing one is valid.
    pub fn fcs_valid(&self) -> bool {
        match self.fcs() {
            None => true,
            Some(stored) => stored == self.compute_fcs(),
        }
    }

    /// Write the frame check sequence for the current bytes of all layers.
    pub fn update_fcs(&mut self) {
        let value = self.compute_fcs();
        if let Some(fcs) = &mut self.fcs {
            fcs.resize(&self.arena, registry::FCS_LEN);
            LittleEndian::write_u32(fcs.bytes_mut(&mut self.arena), value);
        }
    }

    /// Add or remove the frame check sequence.
    pub fn set_fcs(&mut self, fcs: Fcs) {
        match (fcs, self.fcs.is_some()) {
            (Fcs::Present, false) => {
                self.fcs = Some(Region::owned(vec![0; registry::FCS_LEN]));
                self.dirty = true;
            },
            (Fcs::Absent, true) => self.fcs = None,
            _ => {},
        }
    }

    fn compute_fcs(&self) -> u32 {
        checksum::crc32(&emit::frame_bytes(&self.arena, &self.root))
    }

    fn layer_at(&self, depth: usize) -> Option<LayerRef<'_>> {
        self.layers().nth(depth)
    }
}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Packet")
            .field("layers", &self.layers().map(|layer| layer.kind()).collect::<Vec<_>>())
            .field("len", &self.total_len())
            .field("fcs", &self.fcs())
            .finish()
    }
}

impl<'a> LayerRef<'a> {
    pub fn kind(&self) -> LayerKind {
        self.node.layer.kind()
    }

    /// The dissector of the layer.
    pub fn dissector(&self) -> &'static dyn Layer {
        self.node.layer
    }

    /// The number of enclosing layers.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn header(&self) -> &'a [u8] {
        self.node.header.bytes(&self.packet.arena)
    }

    /// The header as a typed wrapper, if the protocol matches.
    pub fn header_as<H: Header + ?Sized>(&self) -> Option<&'a H> {
        if H::KIND != self.kind() {
            return None;
        }
        H::from_header(self.header()).ok()
    }

    pub fn payload(&self) -> PayloadRef<'a> {
        match &self.node.payload {
            Payload::Node(child) => PayloadRef::Node(LayerRef {
                packet: self.packet,
                node: child,
                depth: self.depth + 1,
            }),
            Payload::Raw(raw) => PayloadRef::Raw(raw.bytes(&self.packet.arena)),
            Payload::Empty => PayloadRef::Empty,
        }
    }

    /// The bytes of the payload, including nested layers but not padding.
    pub fn payload_bytes(&self) -> Cow<'a, [u8]> {
        emit::payload_bytes(&self.packet.arena, self.node)
    }

    /// Bytes following the payload that belong to no layer.
    pub fn padding(&self) -> &'a [u8] {
        self.node.padding.bytes(&self.packet.arena)
    }

    /// The length of header, payload and padding.
    pub fn total_len(&self) -> usize {
        self.node.total_len()
    }

    /// The enclosing layer.
    pub fn parent(&self) -> Option<LayerRef<'a>> {
        let depth = self.depth.checked_sub(1)?;
        self.packet.layer_at(depth)
    }

    /// Check the checksum of this layer, `None` if it has none.
    pub fn checksum_valid(&self) -> Option<bool> {
        let pseudo = self.parent()
            .and_then(|parent| parent.node.layer.pseudo_header(parent.header()));
        let payload = self.payload_bytes();
        let cx = Context {
            payload: &payload,
            pseudo,
            checksum: Checksum::Manual,
        };
        self.node.layer.checksum_valid(self.header(), &cx)
    }
}

impl fmt::Debug for LayerRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("LayerRef")
            .field("kind", &self.kind())
            .field("depth", &self.depth)
            .field("header_len", &self.node.header.len())
            .field("total_len", &self.total_len())
            .finish()
    }
}

impl<'a> LayerMut<'a> {
    pub fn kind(&self) -> LayerKind {
        self.node.layer.kind()
    }

    pub fn header(&self) -> &[u8] {
        self.node.header.bytes(self.arena)
    }

    pub fn header_mut(&mut self) -> &mut [u8] {
        self.node.header.bytes_mut(self.arena)
    }

    /// The header as a mutable typed wrapper, if the protocol matches.
    pub fn header_as_mut<H: Header + ?Sized>(&mut self) -> Option<&mut H> {
        if H::KIND != self.kind() {
            return None;
        }
        H::from_header_mut(self.header_mut()).ok()
    }

    /// Change the size of the header, keeping its leading bytes.
    ///
    /// New bytes are zero. The header gets a buffer of its own so the packet is rebuilt on the
    /// next serialization.
    pub fn resize_header(&mut self, len: usize) {
        self.node.header.resize(self.arena, len);
    }

    /// The payload bytes, if the payload is opaque.
    pub fn payload_mut(&mut self) -> Option<&mut [u8]> {
        match &mut self.node.payload {
            Payload::Raw(raw) => Some(raw.bytes_mut(self.arena)),
            _ => None,
        }
    }

    /// The nested layer, if any.
    pub fn child(&mut self) -> Option<LayerMut<'_>> {
        match &mut self.node.payload {
            Payload::Node(child) => Some(LayerMut {
                arena: &mut *self.arena,
                node: child.as_mut(),
            }),
            _ => None,
        }
    }

    /// Replace the payload.
    ///
    /// A nested packet has its layers moved into this packet, and the header field announcing
    /// the payload protocol is set accordingly. Fails with `Unsupported` if this layer can not
    /// announce the protocol of the new payload; the payload is unchanged in that case.
    pub fn set_payload(&mut self, payload: impl Into<Payload>) -> Result<()> {
        let mut payload = payload.into();
        if let Payload::Node(child) = &mut payload {
            let layer = self.node.layer;
            let discriminant = layer.discriminant_of(child.layer.kind())
                .ok_or(Error::Unsupported)?;
            layer.set_next(self.node.header.bytes_mut(self.arena), discriminant);
            child.origin = Some(discriminant);
        }

        self.node.payload = payload;
        Ok(())
    }

    /// Remove the payload and return it.
    ///
    /// The layer is left without a payload. The returned payload no longer refers to this packet
    /// and can be attached elsewhere, for example a transport layer under a new network layer.
    pub fn take_payload(&mut self) -> Payload {
        let mut payload = mem::replace(&mut self.node.payload, Payload::Empty);
        payload.detach(self.arena);
        payload
    }

    /// Remove bytes after the payload.
    pub fn clear_padding(&mut self) {
        self.node.padding = Region::owned(Vec::new());
    }
}

#[cfg(test)]
mod tests;
