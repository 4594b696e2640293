//! Selection of the dissector of each payload.
//!
//! Decoding starts with the dissector of the link type and then repeatedly asks the current
//! layer for the discriminant of its payload. A registered discriminant decodes the payload as
//! a nested node, anything else keeps it as opaque bytes. A few namespaces are strict: there an
//! unknown discriminant fails the decoding with `NotImplemented`, but the layers decoded so far
//! are still handed back to the caller.
use core::fmt;
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use crate::wire::{self, Error, EtherType, IpProtocol, LinkType, Span, View};
use crate::wire::{arp, ethernet, gre, icmpv4, icmpv6, igmp, ieee80211, ipv4, ipv6, llc};
use crate::wire::{null, raw, tcp, udp, vlan};
use super::{Discriminant, Fcs, Layer, Namespace, Node, Packet, Payload, Region};

/// The deepest nesting that is decoded, further layers are kept as bytes.
pub const MAX_DEPTH: usize = 32;

/// The length of a trailing frame check sequence.
pub(crate) const FCS_LEN: usize = 4;

/// Dispatch table from discriminants to dissectors.
#[derive(Clone, Debug, Default)]
pub struct Registry {
    layers: HashMap<Discriminant, &'static dyn Layer>,
    unimplemented: HashSet<Discriminant>,
    strict: HashSet<Namespace>,
}

/// What to do with a payload announced by some discriminant.
#[derive(Clone, Copy, Debug)]
enum Lookup {
    Layer(&'static dyn Layer),
    Unimplemented,
    Opaque,
}

/// A decoding failure, with the layers that could be decoded before it.
#[derive(Debug)]
pub struct ParseError {
    error: Error,
    partial: Option<Packet>,
}

impl Registry {
    /// An empty table, all payloads are kept opaque.
    pub fn new() -> Self {
        Registry::default()
    }

    /// The table of all dissectors in this crate.
    pub fn standard() -> &'static Registry {
        static STANDARD: OnceLock<Registry> = OnceLock::new();
        STANDARD.get_or_init(Registry::with_standard_layers)
    }

    /// A copy of the standard table that can be extended.
    pub fn with_standard_layers() -> Self {
        let mut registry = Registry::new();

        registry
            .register(Discriminant::Link(LinkType::Null), &null::Dissector)
            .register(Discriminant::Link(LinkType::Ethernet), &ethernet::Dissector)
            .register(Discriminant::Link(LinkType::Raw), &raw::Dissector)
            .register(Discriminant::Link(LinkType::Ieee80211), &ieee80211::Dissector)
            .register(Discriminant::Link(LinkType::Ipv4), &ipv4::Dissector)
            .register(Discriminant::Link(LinkType::Ipv6), &ipv6::Dissector);

        registry
            .register(Discriminant::NullFamily(null::family::IPV4), &ipv4::Dissector)
            .register(Discriminant::NullFamily(null::family::IPV6), &ipv6::Dissector)
            .register(Discriminant::NullFamily(null::family::IPV6_FREEBSD), &ipv6::Dissector)
            .register(Discriminant::NullFamily(null::family::IPV6_DARWIN), &ipv6::Dissector)
            .register(Discriminant::IpVersion(4), &ipv4::Dissector)
            .register(Discriminant::IpVersion(6), &ipv6::Dissector);

        registry
            .register(Discriminant::EtherType(EtherType::Ipv4), &ipv4::Dissector)
            .register(Discriminant::EtherType(EtherType::Arp), &arp::Dissector)
            .register(Discriminant::EtherType(EtherType::Ipv6), &ipv6::Dissector)
            .register(Discriminant::EtherType(EtherType::Vlan), &vlan::Dissector)
            .register(Discriminant::EtherType(EtherType::ServiceVlan), &vlan::Dissector);

        registry
            .register(Discriminant::Ip(IpProtocol::Tcp), &tcp::Dissector)
            .register(Discriminant::Ip(IpProtocol::Udp), &udp::Dissector)
            .register(Discriminant::Ip(IpProtocol::Icmp), &icmpv4::Dissector)
            .register(Discriminant::Ip(IpProtocol::Icmpv6), &icmpv6::Dissector)
            .register(Discriminant::Ip(IpProtocol::Igmp), &igmp::Dissector)
            .register(Discriminant::Ip(IpProtocol::IpIp), &ipv4::Dissector)
            .register(Discriminant::Ip(IpProtocol::Ipv6), &ipv6::Dissector)
            .register(Discriminant::Ip(IpProtocol::Gre), &gre::Dissector);

        // Data frames with a body, with and without QoS control.
        for subtype in (0x20..=0x23).chain(0x28..=0x2b) {
            registry.register(Discriminant::Dot11(subtype), &llc::Dissector);
        }

        registry
            .require_known(Namespace::Link)
            .require_known(Namespace::NullFamily)
            .require_known(Namespace::IpVersion);

        registry
    }

    /// Decode payloads announced by `discriminant` with `layer`.
    pub fn register(&mut self, discriminant: Discriminant, layer: &'static dyn Layer) -> &mut Self {
        self.unimplemented.remove(&discriminant);
        self.layers.insert(discriminant, layer);
        self
    }

    /// Fail decoding of payloads announced by `discriminant` with `NotImplemented`.
    pub fn mark_unimplemented(&mut self, discriminant: Discriminant) -> &mut Self {
        self.layers.remove(&discriminant);
        self.unimplemented.insert(discriminant);
        self
    }

    /// Treat every unregistered discriminant of a namespace as unimplemented.
    pub fn require_known(&mut self, namespace: Namespace) -> &mut Self {
        self.strict.insert(namespace);
        self
    }

    /// The dissector registered for a discriminant.
    pub fn lookup(&self, discriminant: Discriminant) -> Option<&'static dyn Layer> {
        self.layers.get(&discriminant).copied()
    }

    fn resolve(&self, discriminant: Discriminant) -> Lookup {
        if let Some(layer) = self.lookup(discriminant) {
            Lookup::Layer(layer)
        } else if self.unimplemented.contains(&discriminant)
            || self.strict.contains(&discriminant.namespace())
        {
            Lookup::Unimplemented
        } else {
            Lookup::Opaque
        }
    }

    /// Decode a captured buffer of the given link type.
    ///
    /// The buffer becomes the arena of the packet, no bytes are copied.
    pub fn decode(&self, link: LinkType, data: Vec<u8>, fcs: Fcs) -> Result<Packet, ParseError> {
        let discriminant = Discriminant::Link(link);
        match self.resolve(discriminant) {
            Lookup::Layer(layer) => self.decode_from(layer, Some(discriminant), data, fcs),
            _ => {
                net_debug!("no dissector for link type {:?}", link);
                Err(ParseError::new(Error::NotImplemented, None))
            },
        }
    }

    /// Decode a buffer starting with the header of `layer`.
    pub fn decode_layer(&self, layer: &'static dyn Layer, data: Vec<u8>, fcs: Fcs)
        -> Result<Packet, ParseError>
    {
        self.decode_from(layer, None, data, fcs)
    }

    fn decode_from(
        &self,
        layer: &'static dyn Layer,
        origin: Option<Discriminant>,
        data: Vec<u8>,
        fcs: Fcs,
    ) -> Result<Packet, ParseError> {
        let whole = Span::new(0, data.len());
        let (frame, fcs) = match fcs {
            Fcs::Absent => (whole, None),
            Fcs::Present => {
                let frame_len = data.len().checked_sub(FCS_LEN)
                    .ok_or_else(|| ParseError::new(Error::Truncated, None))?;
                let trailer = Region::shared(Span::new(frame_len, FCS_LEN));
                (Span::new(0, frame_len), Some(trailer))
            },
        };

        let mut decoder = Decoder {
            registry: self,
            arena: &data,
            failure: None,
        };

        let root = decoder.node(layer, origin, frame, 0)
            .map_err(|err| ParseError::new(err, None))?;
        let failure = decoder.failure;

        let packet = Packet::from_parts(data, root, fcs);
        match failure {
            None => Ok(packet),
            Some(err) => Err(ParseError::new(err, Some(packet))),
        }
    }
}

struct Decoder<'a> {
    registry: &'a Registry,
    arena: &'a [u8],
    failure: Option<Error>,
}

impl Decoder<'_> {
    /// Decode one layer and, recursively, its payload.
    ///
    /// Only the header of this layer can fail, failures of nested layers are recorded and the
    /// affected payload kept as bytes.
    fn node(
        &mut self,
        layer: &'static dyn Layer,
        origin: Option<Discriminant>,
        span: Span,
        depth: usize,
    ) -> wire::Result<Node> {
        let data = View::with_span(self.arena, span)?.as_slice();
        let header_len = layer.header_len(data)?;
        let header = span.slice(0, header_len).map_err(|_| Error::Truncated)?;
        let rest = span.tail(header_len)?;

        let header_bytes = &data[..header_len];
        let payload_len = layer.payload_len(header_bytes, rest.len).min(rest.len);
        let body = rest.slice(0, payload_len)?;
        let padding = rest.tail(payload_len)?;

        let payload = self.payload(layer, header_bytes, body, depth);
        Ok(Node {
            layer,
            origin,
            header: Region::shared(header),
            payload,
            padding: Region::shared(padding),
        })
    }

    fn payload(&mut self, layer: &'static dyn Layer, header: &[u8], body: Span, depth: usize) -> Payload {
        let bytes = match View::with_span(self.arena, body) {
            Ok(view) if !view.is_empty() => view.as_slice(),
            _ => return Payload::Empty,
        };

        if layer.opaque_payload(header) {
            return Payload::Raw(Region::shared(body));
        }

        let discriminant = match layer.next(header, bytes) {
            Some(discriminant) => discriminant,
            None => return Payload::Raw(Region::shared(body)),
        };

        if depth + 1 >= MAX_DEPTH {
            net_debug!("nesting limit reached at {:?}", discriminant);
            return Payload::Raw(Region::shared(body));
        }

        match self.registry.resolve(discriminant) {
            Lookup::Layer(next) => {
                net_trace!("{} payload as {} via {:?}", layer.kind(), next.kind(), discriminant);
                match self.node(next, Some(discriminant), body, depth + 1) {
                    Ok(node) => Payload::Node(Box::new(node)),
                    Err(err) => {
                        self.fail(err);
                        Payload::Raw(Region::shared(body))
                    },
                }
            },
            Lookup::Unimplemented => {
                self.fail(Error::NotImplemented);
                Payload::Raw(Region::shared(body))
            },
            Lookup::Opaque => {
                net_trace!("{} payload {:?} kept opaque", layer.kind(), discriminant);
                Payload::Raw(Region::shared(body))
            },
        }
    }

    fn fail(&mut self, error: Error) {
        net_debug!("decoding stopped: {}", error);
        self.failure.get_or_insert(error);
    }
}

impl ParseError {
    fn new(error: Error, partial: Option<Packet>) -> Self {
        ParseError { error, partial }
    }

    /// The reason decoding stopped.
    pub fn error(&self) -> Error {
        self.error
    }

    /// The outer layers decoded before the failure.
    ///
    /// The failing layer is included as opaque payload bytes. `None` if the outermost layer
    /// could not be decoded.
    pub fn partial(&self) -> Option<&Packet> {
        self.partial.as_ref()
    }

    pub fn into_partial(self) -> Option<Packet> {
        self.partial
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.partial {
            Some(packet) => write!(f, "{} after {} layers", self.error, packet.layers().count()),
            None => write!(f, "{}", self.error),
        }
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::packet::LayerKind;

    #[test]
    fn strict_namespaces() {
        let registry = Registry::standard();
        assert!(matches!(registry.resolve(Discriminant::NullFamily(0x99)), Lookup::Unimplemented));
        assert!(matches!(registry.resolve(Discriminant::IpVersion(5)), Lookup::Unimplemented));
        assert!(matches!(registry.resolve(Discriminant::Link(LinkType::Unknown(147))), Lookup::Unimplemented));
        assert!(matches!(registry.resolve(Discriminant::Ip(IpProtocol::Unknown(253))), Lookup::Opaque));
        assert!(matches!(registry.resolve(Discriminant::EtherType(EtherType::Unknown(0x88cc))), Lookup::Opaque));
    }

    #[test]
    fn register_and_mark() {
        let mut registry = Registry::with_standard_layers();
        let experimental = Discriminant::Ip(IpProtocol::Unknown(253));
        registry.mark_unimplemented(experimental);
        assert!(matches!(registry.resolve(experimental), Lookup::Unimplemented));

        registry.register(experimental, &udp::Dissector);
        assert_eq!(registry.lookup(experimental).map(|layer| layer.kind()), Some(LayerKind::Udp));

        let tcp = Discriminant::Ip(IpProtocol::Tcp);
        registry.mark_unimplemented(tcp);
        assert!(registry.lookup(tcp).is_none());
        assert_eq!(Registry::standard().lookup(tcp).map(|layer| layer.kind()), Some(LayerKind::Tcp));
    }

    #[test]
    fn unknown_link() {
        let err = Registry::standard()
            .decode(LinkType::Unknown(147), vec![0; 20], Fcs::Absent)
            .unwrap_err();
        assert_eq!(err.error(), Error::NotImplemented);
        assert!(err.partial().is_none());
    }

    #[test]
    fn empty_registry_keeps_bytes() {
        let mut registry = Registry::new();
        registry.register(Discriminant::Link(LinkType::Ethernet), &ethernet::Dissector);
        let mut frame = vec![0; 14];
        frame[12] = 0x08;
        frame.extend_from_slice(&[0x45; 20]);
        let packet = registry.decode(LinkType::Ethernet, frame, Fcs::Absent).unwrap();
        assert_eq!(packet.layers().count(), 1);
        assert_eq!(packet.root().payload_bytes().len(), 20);
    }
}
