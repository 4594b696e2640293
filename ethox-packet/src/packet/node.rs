//! The layers of a packet tree.
//!
//! A node does not borrow the bytes it describes. Its regions are either spans into the arena
//! owned by the enclosing [`Packet`] or buffers of their own, after a resize or when attached
//! from another packet. Every access to bytes thus goes through the arena.
//!
//! [`Packet`]: struct.Packet.html
use std::borrow::Cow;

use crate::wire::{Span, View, ViewMut};
use super::{Discriminant, Layer, Packet};

/// A run of bytes of a packet, shared with the arena or owned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    backing: Backing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Backing {
    Shared(Span),
    Owned(Vec<u8>),
}

/// One decoded or constructed protocol layer.
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) layer: &'static dyn Layer,
    /// The discriminant under which the enclosing layer announces this one.
    pub(crate) origin: Option<Discriminant>,
    pub(crate) header: Region,
    pub(crate) payload: Payload,
    pub(crate) padding: Region,
}

/// The content following a header.
#[derive(Debug, Clone)]
pub enum Payload {
    /// A nested protocol layer.
    Node(Box<Node>),
    /// Bytes without further structure.
    Raw(Region),
    /// Nothing follows the header.
    Empty,
}

impl Region {
    pub(crate) fn shared(span: Span) -> Self {
        Region { backing: Backing::Shared(span) }
    }

    pub(crate) fn owned(bytes: Vec<u8>) -> Self {
        Region { backing: Backing::Owned(bytes) }
    }

    pub(crate) fn empty() -> Self {
        Region::owned(Vec::new())
    }

    pub fn len(&self) -> usize {
        match &self.backing {
            Backing::Shared(span) => span.len,
            Backing::Owned(bytes) => bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The location in the arena, if the region still aliases it.
    pub(crate) fn span(&self) -> Option<Span> {
        match &self.backing {
            Backing::Shared(span) => Some(*span),
            Backing::Owned(_) => None,
        }
    }

    pub(crate) fn bytes<'a>(&'a self, arena: &'a [u8]) -> &'a [u8] {
        match &self.backing {
            Backing::Shared(span) => View::with_span(arena, *span)
                .map(|view| view.as_slice())
                .unwrap_or_default(),
            Backing::Owned(bytes) => bytes,
        }
    }

    pub(crate) fn bytes_mut<'a>(&'a mut self, arena: &'a mut [u8]) -> &'a mut [u8] {
        match &mut self.backing {
            Backing::Shared(span) => ViewMut::with_span(arena, *span)
                .map(ViewMut::into_mut_slice)
                .unwrap_or_default(),
            Backing::Owned(bytes) => bytes,
        }
    }

    /// Change the length, zero filling new bytes at the end.
    ///
    /// The region no longer aliases the arena afterwards.
    pub(crate) fn resize(&mut self, arena: &[u8], len: usize) {
        if len == self.len() {
            return;
        }
        self.detach(arena);
        if let Backing::Owned(bytes) = &mut self.backing {
            bytes.resize(len, 0);
        }
    }

    /// Copy the bytes out of the arena.
    pub(crate) fn detach(&mut self, arena: &[u8]) {
        if let Backing::Shared(_) = self.backing {
            let bytes = self.bytes(arena).to_vec();
            self.backing = Backing::Owned(bytes);
        }
    }

    /// Point the region at a new location of its bytes.
    pub(crate) fn rehome(&mut self, span: Span) {
        self.backing = Backing::Shared(span);
    }
}

impl Node {
    pub(crate) fn new(layer: &'static dyn Layer, header: Region) -> Self {
        Node {
            layer,
            origin: None,
            header,
            payload: Payload::Empty,
            padding: Region::empty(),
        }
    }

    pub(crate) fn child(&self) -> Option<&Node> {
        match &self.payload {
            Payload::Node(child) => Some(child.as_ref()),
            _ => None,
        }
    }

    pub(crate) fn child_mut(&mut self) -> Option<&mut Node> {
        match &mut self.payload {
            Payload::Node(child) => Some(child.as_mut()),
            _ => None,
        }
    }

    /// This node and all nested ones, outermost first.
    pub(crate) fn chain(&self) -> impl Iterator<Item=&Node> {
        core::iter::successors(Some(self), |&node| node.child())
    }

    /// The outermost node of the given kind.
    pub(crate) fn find_mut(&mut self, kind: super::LayerKind) -> Option<&mut Node> {
        if self.layer.kind() == kind {
            return Some(self);
        }
        self.child_mut()?.find_mut(kind)
    }

    /// The innermost node.
    pub(crate) fn last_mut(&mut self) -> &mut Node {
        match self.payload {
            Payload::Node(ref mut child) => child.last_mut(),
            _ => self,
        }
    }

    /// The length of header, payload and padding.
    pub(crate) fn total_len(&self) -> usize {
        self.header.len() + self.payload_len() + self.padding.len()
    }

    pub(crate) fn payload_len(&self) -> usize {
        match &self.payload {
            Payload::Node(child) => child.total_len(),
            Payload::Raw(raw) => raw.len(),
            Payload::Empty => 0,
        }
    }

    /// All regions in wire order.
    pub(crate) fn regions(&self) -> Vec<&Region> {
        let mut regions = Vec::new();
        self.collect(&mut regions);
        regions
    }

    /// The regions of the payload in wire order.
    pub(crate) fn payload_regions(&self) -> Vec<&Region> {
        let mut regions = Vec::new();
        match &self.payload {
            Payload::Node(child) => child.collect(&mut regions),
            Payload::Raw(raw) => regions.push(raw),
            Payload::Empty => {},
        }
        regions
    }

    pub(crate) fn regions_mut(&mut self) -> Vec<&mut Region> {
        let mut regions = Vec::new();
        self.collect_mut(&mut regions);
        regions
    }

    fn collect<'a>(&'a self, out: &mut Vec<&'a Region>) {
        out.push(&self.header);
        match &self.payload {
            Payload::Node(child) => child.collect(out),
            Payload::Raw(raw) => out.push(raw),
            Payload::Empty => {},
        }
        out.push(&self.padding);
    }

    fn collect_mut<'a>(&'a mut self, out: &mut Vec<&'a mut Region>) {
        let Node { header, payload, padding, .. } = self;
        out.push(header);
        match payload {
            Payload::Node(child) => child.collect_mut(out),
            Payload::Raw(raw) => out.push(raw),
            Payload::Empty => {},
        }
        out.push(padding);
    }

    /// Make the node independent of the arena it was decoded from.
    pub(crate) fn detach(&mut self, arena: &[u8]) {
        for region in self.regions_mut() {
            region.detach(arena);
        }
    }
}

/// The bytes of consecutive regions.
///
/// Borrows from the arena when the regions alias one contiguous run of it.
pub(crate) fn join<'a>(arena: &'a [u8], regions: &[&'a Region]) -> Cow<'a, [u8]> {
    if let Some(span) = contiguous(regions) {
        let view = View::with_span(arena, span).map(|view| view.as_slice());
        return Cow::Borrowed(view.unwrap_or_default());
    }

    let len = regions.iter().map(|region| region.len()).sum();
    let mut bytes = Vec::with_capacity(len);
    for region in regions {
        bytes.extend_from_slice(region.bytes(arena));
    }
    Cow::Owned(bytes)
}

/// The arena span covered by regions, if they alias it without gaps.
pub(crate) fn contiguous(regions: &[&Region]) -> Option<Span> {
    let mut covered: Option<Span> = None;
    for region in regions.iter().filter(|region| !region.is_empty()) {
        let span = region.span()?;
        covered = match covered {
            None => Some(span),
            Some(prev) if prev.end() == span.offset => Some(Span::new(prev.offset, prev.len + span.len)),
            Some(_) => return None,
        };
    }
    Some(covered.unwrap_or_default())
}

impl Payload {
    /// Opaque payload bytes.
    pub fn bytes(bytes: Vec<u8>) -> Self {
        if bytes.is_empty() {
            Payload::Empty
        } else {
            Payload::Raw(Region::owned(bytes))
        }
    }

    /// The nested layers as a packet of their own.
    ///
    /// `None` if the payload is not a protocol layer.
    pub fn into_packet(self) -> Option<Packet> {
        match self {
            Payload::Node(mut root) => {
                root.origin = None;
                Some(Packet::from_parts(Vec::new(), *root, None))
            },
            _ => None,
        }
    }

    pub(crate) fn detach(&mut self, arena: &[u8]) {
        match self {
            Payload::Node(node) => node.detach(arena),
            Payload::Raw(raw) => raw.detach(arena),
            Payload::Empty => {},
        }
    }
}

impl From<Packet> for Payload {
    /// Use all layers of a packet as a payload.
    ///
    /// The frame check sequence of the packet, if any, is dropped.
    fn from(packet: Packet) -> Self {
        let (arena, mut root) = packet.into_parts();
        root.detach(&arena);
        Payload::Node(Box::new(root))
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Payload::bytes(bytes)
    }
}

impl From<&'_ [u8]> for Payload {
    fn from(bytes: &[u8]) -> Self {
        Payload::bytes(bytes.to_vec())
    }
}
