//! Recomputation of derived fields and materialization of bytes.
use std::borrow::Cow;

use crate::wire::{Checksum, PseudoHeader, Span};
use super::node::{self, Node, Payload, Region};
use super::Context;

/// Make lengths, discriminants and checksums of a layer and everything nested consistent.
///
/// Nested layers are handled first so that a layer sees the final bytes of its payload. Headers
/// whose size is dictated by their own fields are resized to that size.
pub(crate) fn recompute(
    arena: &mut [u8],
    node: &mut Node,
    pseudo: Option<PseudoHeader>,
    checksum: Checksum,
) {
    let layer = node.layer;

    if let Payload::Node(child) = &node.payload {
        if let Some(origin) = child.origin {
            let current = layer.next(node.header.bytes(arena), child.header.bytes(arena));
            if current != Some(origin) {
                net_trace!("{} announces {:?}", layer.kind(), origin);
                layer.set_next(node.header.bytes_mut(arena), origin);
            }
        }
    }

    if let Some(len) = layer.required_header_len(node.header.bytes(arena)) {
        if len != node.header.len() {
            net_debug!("{} header resized from {} to {}", layer.kind(), node.header.len(), len);
            node.header.resize(arena, len);
        }
    }

    let offered = layer.pseudo_header(node.header.bytes(arena));
    if let Payload::Node(child) = &mut node.payload {
        recompute(arena, child, offered, checksum);
    }

    let mut header = node.header.bytes(arena).to_vec();
    {
        let payload = payload_bytes(arena, node);
        let cx = Context {
            payload: &payload,
            pseudo,
            checksum,
        };
        layer.recompute(&mut header, &cx);
    }
    node.header.bytes_mut(arena).copy_from_slice(&header);
}

/// The bytes of the payload, without the padding of the node.
pub(crate) fn payload_bytes<'a>(arena: &'a [u8], node: &'a Node) -> Cow<'a, [u8]> {
    node::join(arena, &node.payload_regions())
}

/// The bytes of the node, header to padding.
pub(crate) fn frame_bytes<'a>(arena: &'a [u8], node: &'a Node) -> Cow<'a, [u8]> {
    node::join(arena, &node.regions())
}

/// Check if the packet can be emitted by handing out the arena as is.
///
/// This holds as long as no region was resized or attached since decoding, or since the last
/// rebuild.
pub(crate) fn is_flush(arena: &[u8], root: &Node, fcs: Option<&Region>) -> bool {
    let mut regions = root.regions();
    regions.extend(fcs);
    match node::contiguous(&regions) {
        Some(span) => span.offset == 0 && span.len == arena.len(),
        None => false,
    }
}

/// Concatenate all regions into a fresh arena and point the regions at it.
pub(crate) fn rebuild(arena: &[u8], root: &mut Node, fcs: Option<&mut Region>) -> Vec<u8> {
    let mut regions = root.regions_mut();
    regions.extend(fcs);

    let len = regions.iter().map(|region| region.len()).sum();
    let mut bytes = Vec::with_capacity(len);
    for region in regions {
        let offset = bytes.len();
        bytes.extend_from_slice(region.bytes(arena));
        region.rehome(Span::new(offset, region.len()));
    }

    bytes
}
