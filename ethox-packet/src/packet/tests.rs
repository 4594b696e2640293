use super::*;
use crate::wire::{arp, ethernet, gre, icmpv4, icmpv6, igmp, ieee80211, ipv4, ipv6, llc, tcp, udp, vlan};
use crate::wire::{EthernetAddress, EtherType, IpProtocol, Ipv4Address, Ipv6Address};

/// Ethernet, IPv4 and a TCP SYN from 192.168.1.10:49152 to 93.184.216.34:80.
static SYN_FRAME: [u8; 54] =
    [0x00, 0x1b, 0x21, 0xaa, 0xbb, 0xcc, 0x3c, 0x97,
     0x0e, 0x11, 0x22, 0x33, 0x08, 0x00, 0x45, 0x00,
     0x00, 0x28, 0x1c, 0x46, 0x40, 0x00, 0x40, 0x06,
     0x26, 0xfd, 0xc0, 0xa8, 0x01, 0x0a, 0x5d, 0xb8,
     0xd8, 0x22, 0xc0, 0x00, 0x00, 0x50, 0x12, 0x34,
     0x56, 0x78, 0x00, 0x00, 0x00, 0x00, 0x50, 0x02,
     0xfa, 0xf0, 0x94, 0x67, 0x00, 0x00];

/// A minimum size Ethernet frame with a short UDP datagram and 14 bytes of padding.
static PADDED_FRAME: [u8; 60] =
    [0x02, 0x00, 0x00, 0x00, 0x00, 0x02, 0x02, 0x00,
     0x00, 0x00, 0x00, 0x01, 0x08, 0x00, 0x45, 0x00,
     0x00, 0x20, 0x00, 0x01, 0x00, 0x00, 0x40, 0x11,
     0x66, 0xca, 0x0a, 0x00, 0x00, 0x01, 0x0a, 0x00,
     0x00, 0x02, 0x30, 0x39, 0x00, 0x35, 0x00, 0x0c,
     0x1d, 0xc8, 0xde, 0xad, 0xbe, 0xef, 0x00, 0x00,
     0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
     0x00, 0x00, 0x00, 0x00];

/// A non-first IPv4 fragment claiming to carry TCP.
static FRAGMENT_FRAME: [u8; 42] =
    [0x02, 0x00, 0x00, 0x00, 0x00, 0x02, 0x02, 0x00,
     0x00, 0x00, 0x00, 0x01, 0x08, 0x00, 0x45, 0x00,
     0x00, 0x1c, 0x00, 0x07, 0x00, 0xb9, 0x40, 0x06,
     0x66, 0x1a, 0x0a, 0x00, 0x00, 0x01, 0x0a, 0x00,
     0x00, 0x02, 0x00, 0x01, 0x02, 0x03, 0x04, 0x05,
     0x06, 0x07];

/// An 802.11 clear to send frame with its frame check sequence.
static CTS_FRAME: [u8; 14] =
    [0xc4, 0x00, 0x2c, 0x01, 0x00, 0x11, 0x22, 0x33,
     0x44, 0x55, 0x34, 0x17, 0xf2, 0x64];

/// An 802.11 QoS data frame with SNAP, IPv4, UDP and frame check sequence.
static QOS_DATA_FRAME: [u8; 70] =
    [0x88, 0x01, 0x2c, 0x00, 0x00, 0x11, 0x22, 0x33,
     0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xaa, 0xbb,
     0x00, 0x11, 0x22, 0x33, 0x44, 0x56, 0x10, 0x00,
     0x05, 0x00, 0xaa, 0xaa, 0x03, 0x00, 0x00, 0x00,
     0x08, 0x00, 0x45, 0x00, 0x00, 0x20, 0x00, 0x01,
     0x00, 0x00, 0x40, 0x11, 0x66, 0xca, 0x0a, 0x00,
     0x00, 0x01, 0x0a, 0x00, 0x00, 0x02, 0x30, 0x39,
     0x00, 0x35, 0x00, 0x0c, 0x1d, 0xc8, 0xde, 0xad,
     0xbe, 0xef, 0xbd, 0x59, 0x91, 0xe2];

/// BSD loopback, IPv4 and an ICMP echo request.
static LOOPBACK_FRAME: [u8; 36] =
    [0x02, 0x00, 0x00, 0x00, 0x45, 0x00, 0x00, 0x20,
     0x00, 0x42, 0x40, 0x00, 0x40, 0x01, 0x3c, 0x99,
     0x7f, 0x00, 0x00, 0x01, 0x7f, 0x00, 0x00, 0x01,
     0x08, 0x00, 0x8e, 0xfe, 0x12, 0x34, 0xab, 0xcd,
     0xaa, 0x00, 0x00, 0xff];

const SRC_MAC: EthernetAddress = EthernetAddress([0x02, 0x00, 0x00, 0x00, 0x00, 0x01]);
const DST_MAC: EthernetAddress = EthernetAddress([0x02, 0x00, 0x00, 0x00, 0x00, 0x02]);

fn kinds(packet: &Packet) -> Vec<LayerKind> {
    packet.layers().map(|layer| layer.kind()).collect()
}

fn udp_stack(payload: &[u8]) -> Packet {
    let mut packet = ethernet::Repr {
        src_addr: SRC_MAC,
        dst_addr: DST_MAC,
        ethertype: EtherType::Unknown(0),
    }.to_packet();
    packet.push(ipv4::Repr {
        src_addr: Ipv4Address::new(10, 0, 0, 1),
        dst_addr: Ipv4Address::new(10, 0, 0, 2),
        protocol: IpProtocol::Unknown(0),
        payload_len: 0,
        hop_limit: 64,
    }.to_packet()).unwrap();
    packet.push(udp::Repr { src_port: 12345, dst_port: 53 }.to_packet()).unwrap();
    packet.push(payload).unwrap();
    packet
}

#[test]
fn decode_syn() {
    let packet = Packet::parse(LinkType::Ethernet, &SYN_FRAME[..]).unwrap();
    assert_eq!(kinds(&packet), [LayerKind::Ethernet, LayerKind::Ipv4, LayerKind::Tcp]);
    assert_eq!(packet.total_len(), 54);

    let ip = packet.layer(LayerKind::Ipv4).unwrap();
    assert_eq!(ip.checksum_valid(), Some(true));
    assert_eq!(ip.depth(), 1);
    assert_eq!(ip.parent().map(|layer| layer.kind()), Some(LayerKind::Ethernet));

    let segment = packet.extract::<tcp::tcp>().unwrap();
    assert_eq!(segment.src_port(), 49152);
    assert_eq!(segment.dst_port(), 80);
    assert!(segment.flags().syn());

    let tcp = packet.layer(LayerKind::Tcp).unwrap();
    assert_eq!(tcp.checksum_valid(), Some(true));
    assert!(matches!(tcp.payload(), PayloadRef::Empty));
    assert!(matches!(packet.root().payload(), PayloadRef::Node(layer) if layer.kind() == LayerKind::Ipv4));
    assert!(packet.root().parent().is_none());
    assert!(packet.checksum_valid());
    assert!(packet.fcs_valid());
    assert_eq!(packet.fcs(), None);
}

#[test]
fn round_trip_without_copy() {
    let data = SYN_FRAME.to_vec();
    let address = data.as_ptr();
    let mut packet = Packet::parse(LinkType::Ethernet, data).unwrap();
    assert_eq!(packet.serialize(), &SYN_FRAME[..]);

    let bytes = packet.into_bytes();
    assert_eq!(bytes.as_ptr(), address);
    assert_eq!(bytes, &SYN_FRAME[..]);
}

#[test]
fn payload_byte_breaks_checksum() {
    let mut frame = PADDED_FRAME;
    frame[45] ^= 0x01;
    let packet = Packet::parse(LinkType::Ethernet, &frame[..]).unwrap();
    assert_eq!(packet.layer(LayerKind::Ipv4).unwrap().checksum_valid(), Some(true));
    assert_eq!(packet.layer(LayerKind::Udp).unwrap().checksum_valid(), Some(false));
    assert!(!packet.checksum_valid());
}

#[test]
fn grow_tcp_payload() {
    let mut packet = Packet::parse(LinkType::Ethernet, &SYN_FRAME[..]).unwrap();
    let before = packet.extract::<ipv4::ipv4>().unwrap().total_len();

    packet.layer_mut(LayerKind::Tcp).unwrap()
        .set_payload(vec![1u8, 2, 3, 4, 5])
        .unwrap();
    packet.recompute();

    let after = packet.extract::<ipv4::ipv4>().unwrap().total_len();
    assert_eq!(after, before + 5);
    assert_eq!(packet.total_len(), 59);
    assert!(packet.checksum_valid());

    let bytes = packet.serialize().to_vec();
    assert_eq!(bytes.len(), 59);
    assert_eq!(&bytes[..14], &SYN_FRAME[..14]);
    assert_eq!(&bytes[26..34], &SYN_FRAME[26..34]);
    assert_eq!(&bytes[54..], &[1, 2, 3, 4, 5]);

    let reparsed = Packet::parse(LinkType::Ethernet, bytes).unwrap();
    assert!(reparsed.checksum_valid());
    assert_eq!(&*reparsed.layer(LayerKind::Tcp).unwrap().payload_bytes(), &[1, 2, 3, 4, 5]);
}

#[test]
fn offloaded_jumbo_segment() {
    let mut frame = SYN_FRAME.to_vec();
    // A zero total length extends the IPv4 payload to the end of the capture.
    frame[16] = 0;
    frame[17] = 0;
    frame.resize(SYN_FRAME.len() + 140_000, 0xa5);

    let mut packet = Packet::parse(LinkType::Ethernet, frame).unwrap();
    let tcp = packet.layer(LayerKind::Tcp).unwrap();
    assert_eq!(tcp.payload_bytes().len(), 140_000);
    assert_eq!(tcp.checksum_valid(), Some(false));

    packet.recompute();
    assert_eq!(packet.extract::<ipv4::ipv4>().unwrap().total_len(), 0);
    assert_eq!(packet.layer(LayerKind::Tcp).unwrap().checksum_valid(), Some(true));
    assert!(packet.checksum_valid());
}

#[test]
fn oversized_ipv4_payload() {
    let mut packet = Packet::parse(LinkType::Ethernet, &SYN_FRAME[..]).unwrap();
    packet.layer_mut(LayerKind::Tcp).unwrap()
        .set_payload(vec![0u8; 70_000])
        .unwrap();
    packet.recompute();
    assert_eq!(packet.extract::<ipv4::ipv4>().unwrap().total_len(), 0);

    let reparsed = Packet::parse(LinkType::Ethernet, packet.into_bytes()).unwrap();
    assert_eq!(reparsed.total_len(), SYN_FRAME.len() + 70_000);
    let tcp = reparsed.layer(LayerKind::Tcp).unwrap();
    assert_eq!(tcp.payload_bytes().len(), 70_000);
    assert!(tcp.padding().is_empty());
    assert!(reparsed.checksum_valid());
}

#[test]
fn oversized_ipv6_payload() {
    let mut packet = Packet::new(&ipv6::Dissector);
    packet.push(udp::Repr { src_port: 4789, dst_port: 4789 }.to_packet()).unwrap();
    packet.push(vec![0x5au8; 70_000]).unwrap();
    packet.recompute();
    assert_eq!(packet.extract::<ipv6::ipv6>().unwrap().payload_len(), 0);
    assert_eq!(packet.extract::<udp::udp>().unwrap().len(), 0);

    let reparsed = Packet::parse(LinkType::Ipv6, packet.into_bytes()).unwrap();
    assert_eq!(kinds(&reparsed), [LayerKind::Ipv6, LayerKind::Udp]);
    let udp = reparsed.layer(LayerKind::Udp).unwrap();
    assert_eq!(udp.payload_bytes().len(), 70_000);
    assert_eq!(udp.checksum_valid(), Some(true));
}

#[test]
fn fragment_stays_opaque() {
    let packet = Packet::parse(LinkType::Ethernet, &FRAGMENT_FRAME[..]).unwrap();
    assert_eq!(kinds(&packet), [LayerKind::Ethernet, LayerKind::Ipv4]);
    let ip = packet.layer(LayerKind::Ipv4).unwrap();
    assert_eq!(ip.header_as::<ipv4::ipv4>().unwrap().protocol(), IpProtocol::Tcp);
    match ip.payload() {
        PayloadRef::Raw(bytes) => assert_eq!(bytes, &FRAGMENT_FRAME[34..]),
        other => panic!("fragment payload decoded: {:?}", other),
    }
}

#[test]
fn single_byte_is_truncated() {
    let links = [
        LinkType::Null,
        LinkType::Ethernet,
        LinkType::Raw,
        LinkType::Ieee80211,
        LinkType::Ipv4,
        LinkType::Ipv6,
    ];
    for &link in links.iter() {
        let err = Packet::parse(link, vec![0x45u8]).unwrap_err();
        assert_eq!(err.error(), Error::Truncated, "{:?}", link);
    }

    let layers: [&'static dyn Layer; 14] = [
        &ethernet::Dissector,
        &vlan::Dissector,
        &arp::Dissector,
        &ipv4::Dissector,
        &ipv6::Dissector,
        &tcp::Dissector,
        &udp::Dissector,
        &icmpv4::Dissector,
        &icmpv6::Dissector,
        &igmp::Dissector,
        &gre::Dissector,
        &crate::wire::null::Dissector,
        &ieee80211::Dissector,
        &llc::Dissector,
    ];
    for layer in layers.iter() {
        assert_eq!(layer.header_len(&[0x45]), Err(Error::Truncated), "{:?}", layer.kind());
    }
}

#[test]
fn truncated_inner_layer_keeps_outer() {
    let err = Packet::parse(LinkType::Ethernet, &SYN_FRAME[..40]).unwrap_err();
    assert_eq!(err.error(), Error::Truncated);
    let partial = err.into_partial().unwrap();
    assert_eq!(kinds(&partial), [LayerKind::Ethernet, LayerKind::Ipv4]);
    assert_eq!(partial.layer(LayerKind::Ipv4).unwrap().payload_bytes().len(), 6);
}

#[test]
fn build_arp_request() {
    let request = arp::Repr::EthernetIpv4 {
        operation: arp::Operation::Request,
        source_hardware_addr: SRC_MAC,
        source_protocol_addr: Ipv4Address::new(10, 0, 0, 1),
        target_hardware_addr: EthernetAddress::default(),
        target_protocol_addr: Ipv4Address::new(10, 0, 0, 2),
    };

    let mut packet = ethernet::Repr {
        src_addr: SRC_MAC,
        dst_addr: EthernetAddress::BROADCAST,
        ethertype: EtherType::Ipv4,
    }.to_packet();
    packet.push(request.to_packet()).unwrap();
    assert_eq!(packet.extract::<ethernet::ethernet>().unwrap().ethertype(), EtherType::Arp);

    let bytes = packet.into_bytes();
    assert_eq!(bytes.len(), 42);

    let reparsed = Packet::parse(LinkType::Ethernet, bytes).unwrap();
    assert_eq!(kinds(&reparsed), [LayerKind::Ethernet, LayerKind::Arp]);
    let arp = reparsed.extract::<arp::arp>().unwrap();
    assert_eq!(arp::Repr::parse(arp), Ok(request));
}

#[test]
fn cts_frame_check_sequence() {
    let packet = Packet::parse_with_fcs(LinkType::Ieee80211, &CTS_FRAME[..], Fcs::Present).unwrap();
    assert_eq!(kinds(&packet), [LayerKind::Ieee80211]);
    assert_eq!(packet.fcs(), Some(0x64f2_1734));
    assert!(packet.fcs_valid());
    assert_eq!(packet.root().total_len(), 10);
    assert_eq!(packet.total_len(), 14);

    let mut frame = CTS_FRAME;
    frame[1] ^= 0x08;
    let mut packet = Packet::parse_with_fcs(LinkType::Ieee80211, &frame[..], Fcs::Present).unwrap();
    assert!(packet.extract::<ieee80211::ieee80211>().unwrap().flags().retry());
    assert!(!packet.fcs_valid());

    packet.update_fcs();
    assert!(packet.fcs_valid());
    assert_ne!(packet.serialize(), &CTS_FRAME[..]);
}

#[test]
fn missing_frame_check_sequence() {
    let err = Packet::parse_with_fcs(LinkType::Ieee80211, &CTS_FRAME[..3], Fcs::Present).unwrap_err();
    assert_eq!(err.error(), Error::Truncated);

    let mut packet = Packet::parse(LinkType::Ieee80211, &CTS_FRAME[..10]).unwrap();
    assert!(packet.fcs_valid());
    packet.set_fcs(Fcs::Present);
    let bytes = packet.serialize().to_vec();
    assert_eq!(bytes, &CTS_FRAME[..]);
}

#[test]
fn wireless_data_frame() {
    let mut packet = Packet::parse_with_fcs(LinkType::Ieee80211, &QOS_DATA_FRAME[..], Fcs::Present)
        .unwrap();
    assert_eq!(kinds(&packet), [
        LayerKind::Ieee80211,
        LayerKind::Llc,
        LayerKind::Ipv4,
        LayerKind::Udp,
    ]);
    assert!(packet.fcs_valid());
    assert!(packet.checksum_valid());
    assert_eq!(packet.serialize(), &QOS_DATA_FRAME[..]);

    packet.extract_mut::<udp::udp>().unwrap().set_dst_port(5353);
    let bytes = packet.serialize().to_vec();
    assert_eq!(bytes.len(), QOS_DATA_FRAME.len());
    assert_eq!(&bytes[..26], &QOS_DATA_FRAME[..26]);

    let reparsed = Packet::parse_with_fcs(LinkType::Ieee80211, bytes, Fcs::Present).unwrap();
    assert!(reparsed.fcs_valid());
    assert!(reparsed.checksum_valid());
    assert_eq!(reparsed.extract::<udp::udp>().unwrap().dst_port(), 5353);
}

#[test]
fn llc_under_qos_data() {
    let mut packet = ieee80211::Repr {
        frame_type: ieee80211::FrameType::Data,
        subtype: ieee80211::data::QOS_DATA,
        flags: ieee80211::Flags(ieee80211::Flags::TO_DS),
        duration: 0,
        addr1: DST_MAC,
        addr2: Some(SRC_MAC),
        addr3: Some(DST_MAC),
        sequence_control: Some(0x0010),
        addr4: None,
        qos_control: Some(5),
    }.to_packet();
    packet.push(Packet::new(&llc::Dissector)).unwrap();

    let bytes = packet.into_bytes();
    let reparsed = Packet::parse(LinkType::Ieee80211, bytes).unwrap();
    assert_eq!(kinds(&reparsed), [LayerKind::Ieee80211, LayerKind::Llc]);

    let frame = reparsed.extract::<ieee80211::ieee80211>().unwrap();
    assert_eq!(frame.subtype(), ieee80211::data::QOS_DATA);
    assert_eq!(frame.header_len(), 26);
    assert_eq!(frame.qos_control(), Some(5));
}

#[test]
fn loopback_families() {
    let packet = Packet::parse(LinkType::Null, &LOOPBACK_FRAME[..]).unwrap();
    assert_eq!(kinds(&packet), [LayerKind::Null, LayerKind::Ipv4, LayerKind::Icmpv4]);
    assert!(packet.checksum_valid());

    let mut frame = LOOPBACK_FRAME;
    frame[0] = 0x99;
    let err = Packet::parse(LinkType::Null, &frame[..]).unwrap_err();
    assert_eq!(err.error(), Error::NotImplemented);
    let partial = err.partial().unwrap();
    assert_eq!(kinds(partial), [LayerKind::Null]);
    assert!(matches!(partial.root().payload(), PayloadRef::Raw(bytes) if bytes.len() == 32));
}

#[test]
fn raw_ip_versions() {
    let packet = Packet::parse(LinkType::Raw, &LOOPBACK_FRAME[4..]).unwrap();
    assert_eq!(kinds(&packet), [LayerKind::RawIp, LayerKind::Ipv4, LayerKind::Icmpv4]);
    assert_eq!(packet.root().header().len(), 0);

    let mut datagram = LOOPBACK_FRAME[4..].to_vec();
    datagram[0] = 0x55;
    let err = Packet::parse(LinkType::Raw, datagram).unwrap_err();
    assert_eq!(err.error(), Error::NotImplemented);
    assert_eq!(kinds(err.partial().unwrap()), [LayerKind::RawIp]);
}

#[test]
fn recompute_is_idempotent() {
    let mut packet = udp_stack(b"idempotent");
    packet.recompute();
    let first = packet.serialize().to_vec();
    packet.recompute();
    let second = packet.serialize().to_vec();
    assert_eq!(first, second);
    assert_eq!(first.len(), 14 + 20 + 8 + 10);

    let reparsed = Packet::parse(LinkType::Ethernet, first).unwrap();
    assert_eq!(kinds(&reparsed), [LayerKind::Ethernet, LayerKind::Ipv4, LayerKind::Udp]);
    assert!(reparsed.checksum_valid());
}

#[test]
fn padding_survives_mutation() {
    let mut packet = Packet::parse(LinkType::Ethernet, &PADDED_FRAME[..]).unwrap();
    let ip = packet.layer(LayerKind::Ipv4).unwrap();
    assert_eq!(ip.padding(), &[0; 14]);
    assert_eq!(ip.total_len(), 46);
    assert_eq!(packet.serialize(), &PADDED_FRAME[..]);

    packet.extract_mut::<udp::udp>().unwrap().set_dst_port(5353);
    let bytes = packet.serialize().to_vec();
    assert_eq!(bytes.len(), 60);
    assert_eq!(&bytes[46..], &[0; 14]);
    assert_eq!(packet.extract::<ipv4::ipv4>().unwrap().total_len(), 32);
    assert!(packet.checksum_valid());
}

#[test]
fn set_payload_announces_protocol() {
    let mut packet = Packet::new(&ipv4::Dissector);
    packet.push(Packet::new(&udp::Dissector)).unwrap();
    assert_eq!(packet.extract::<ipv4::ipv4>().unwrap().protocol(), IpProtocol::Udp);

    let mut datagram = Packet::new(&udp::Dissector);
    assert_eq!(datagram.push(Packet::new(&tcp::Dissector)), Err(Error::Unsupported));
    assert_eq!(kinds(&datagram), [LayerKind::Udp]);
    assert!(matches!(datagram.root().payload(), PayloadRef::Empty));
}

#[test]
fn replace_tcp_options() {
    let mut packet = Packet::parse(LinkType::Ethernet, &SYN_FRAME[..]).unwrap();
    {
        let mut layer = packet.layer_mut(LayerKind::Tcp).unwrap();
        tcp::set_options(&mut layer, &[0x02, 0x04, 0x05, 0xb4]).unwrap();
        assert_eq!(tcp::set_options(&mut layer, &[0x01; 41]), Err(Error::Malformed));
    }
    {
        let mut layer = packet.layer_mut(LayerKind::Ipv4).unwrap();
        assert_eq!(tcp::set_options(&mut layer, &[]), Err(Error::Unsupported));
    }

    let bytes = packet.serialize().to_vec();
    assert_eq!(bytes.len(), 58);

    let reparsed = Packet::parse(LinkType::Ethernet, bytes).unwrap();
    assert!(reparsed.checksum_valid());
    assert_eq!(reparsed.extract::<ipv4::ipv4>().unwrap().total_len(), 44);
    let segment = tcp::Repr::parse(reparsed.extract::<tcp::tcp>().unwrap()).unwrap();
    assert_eq!(segment.max_seg_size, Some(1460));
    assert_eq!(segment.src_port, 49152);
}

#[test]
fn replace_ipv4_options() {
    let mut packet = Packet::parse(LinkType::Ethernet, &SYN_FRAME[..]).unwrap();
    let mut layer = packet.layer_mut(LayerKind::Ipv4).unwrap();
    ipv4::set_options(&mut layer, &[0x94, 0x04, 0x00, 0x00]).unwrap();

    let reparsed = Packet::parse(LinkType::Ethernet, packet.into_bytes()).unwrap();
    assert_eq!(kinds(&reparsed), [LayerKind::Ethernet, LayerKind::Ipv4, LayerKind::Tcp]);
    assert_eq!(reparsed.layer(LayerKind::Ipv4).unwrap().header().len(), 24);
    assert!(reparsed.checksum_valid());
}

#[test]
fn rehome_transport_layer() {
    let mut packet = Packet::parse(LinkType::Ethernet, &SYN_FRAME[..]).unwrap();
    let segment = packet.layer_mut(LayerKind::Ipv4).unwrap().take_payload();
    assert_eq!(kinds(&packet), [LayerKind::Ethernet, LayerKind::Ipv4]);
    assert!(matches!(segment, Payload::Node(_)));

    let mut moved = ipv4::Repr {
        src_addr: Ipv4Address::new(10, 0, 0, 1),
        dst_addr: Ipv4Address::new(10, 0, 0, 2),
        protocol: IpProtocol::Unknown(0),
        payload_len: 0,
        hop_limit: 64,
    }.to_packet();
    moved.push(segment).unwrap();

    let reparsed = Packet::parse(LinkType::Ipv4, moved.into_bytes()).unwrap();
    assert_eq!(kinds(&reparsed), [LayerKind::Ipv4, LayerKind::Tcp]);
    assert_eq!(reparsed.extract::<ipv4::ipv4>().unwrap().protocol(), IpProtocol::Tcp);
    let segment = reparsed.extract::<tcp::tcp>().unwrap();
    assert_eq!((segment.src_port(), segment.dst_port()), (49152, 80));
    assert!(segment.flags().syn());
    assert!(reparsed.checksum_valid());

    let outer = Packet::parse(LinkType::Ethernet, packet.into_bytes()).unwrap();
    assert_eq!(outer.total_len(), 34);
    assert_eq!(outer.extract::<ipv4::ipv4>().unwrap().total_len(), 20);
    assert_eq!(outer.layer(LayerKind::Ipv4).unwrap().checksum_valid(), Some(true));
}

#[test]
fn split_off_inner_layers() {
    let mut packet = Packet::parse(LinkType::Ethernet, &SYN_FRAME[..]).unwrap();
    let mut inner = packet.layer_mut(LayerKind::Ethernet).unwrap()
        .take_payload()
        .into_packet()
        .unwrap();
    assert_eq!(kinds(&inner), [LayerKind::Ipv4, LayerKind::Tcp]);
    assert!(inner.checksum_valid());
    assert_eq!(inner.serialize(), &SYN_FRAME[14..]);

    let raw = packet.root_mut().take_payload();
    assert!(matches!(raw, Payload::Empty));
    assert!(raw.into_packet().is_none());
}

#[test]
fn gre_tunnel() {
    let mut packet = ipv4::Repr {
        src_addr: Ipv4Address::new(192, 0, 2, 1),
        dst_addr: Ipv4Address::new(198, 51, 100, 1),
        protocol: IpProtocol::Unknown(0),
        payload_len: 0,
        hop_limit: 64,
    }.to_packet();
    packet.push(gre::Repr {
        protocol: EtherType::Unknown(0),
        checksum: true,
        key: Some(7),
        sequence: None,
    }.to_packet()).unwrap();
    packet.push(ipv4::Repr {
        src_addr: Ipv4Address::new(10, 0, 0, 1),
        dst_addr: Ipv4Address::new(10, 0, 0, 2),
        protocol: IpProtocol::Unknown(0),
        payload_len: 0,
        hop_limit: 64,
    }.to_packet()).unwrap();
    packet.push(icmpv4::Repr::EchoRequest { ident: 1, seq_no: 2 }.to_packet()).unwrap();
    packet.push(vec![0xaau8; 16]).unwrap();

    let reparsed = Packet::parse(LinkType::Ipv4, packet.into_bytes()).unwrap();
    assert_eq!(kinds(&reparsed), [
        LayerKind::Ipv4,
        LayerKind::Gre,
        LayerKind::Ipv4,
        LayerKind::Icmpv4,
    ]);
    assert_eq!(reparsed.layer(LayerKind::Gre).unwrap().checksum_valid(), Some(true));
    assert_eq!(reparsed.layer(LayerKind::Icmpv4).unwrap().checksum_valid(), Some(true));
    assert!(reparsed.checksum_valid());
    let tunnel = gre::Repr::parse(reparsed.extract::<gre::gre>().unwrap()).unwrap();
    assert_eq!(tunnel.protocol, EtherType::Ipv4);
    assert_eq!(tunnel.key, Some(7));
}

#[test]
fn tagged_ipv6() {
    let mut packet = ethernet::Repr {
        src_addr: SRC_MAC,
        dst_addr: DST_MAC,
        ethertype: EtherType::Unknown(0),
    }.to_packet();
    packet.push(vlan::Repr {
        priority: 5,
        drop_eligible: false,
        vlan_id: 42,
        ethertype: EtherType::Unknown(0),
    }.to_packet()).unwrap();
    packet.push(ipv6::Repr {
        src_addr: Ipv6Address::new(0xfe80, 0, 0, 0, 0, 0, 0, 1),
        dst_addr: Ipv6Address::new(0xfe80, 0, 0, 0, 0, 0, 0, 2),
        next_header: IpProtocol::Unknown(0xff),
        payload_len: 0,
        hop_limit: 64,
    }.to_packet()).unwrap();
    packet.push(udp::Repr { src_port: 5353, dst_port: 5353 }.to_packet()).unwrap();
    packet.push(&b"hello"[..]).unwrap();

    let reparsed = Packet::parse(LinkType::Ethernet, packet.into_bytes()).unwrap();
    assert_eq!(kinds(&reparsed), [
        LayerKind::Ethernet,
        LayerKind::Vlan,
        LayerKind::Ipv6,
        LayerKind::Udp,
    ]);
    assert_eq!(reparsed.extract::<vlan::vlan>().unwrap().vlan_id(), 42);
    assert_eq!(reparsed.extract::<ipv6::ipv6>().unwrap().payload_len(), 13);
    let udp = reparsed.layer(LayerKind::Udp).unwrap();
    assert_eq!(udp.checksum_valid(), Some(true));
    assert_eq!(&*udp.payload_bytes(), b"hello");
}

#[test]
fn group_membership_report() {
    let mut packet = ethernet::Repr {
        src_addr: SRC_MAC,
        dst_addr: EthernetAddress([0x01, 0x00, 0x5e, 0x00, 0x00, 0xfb]),
        ethertype: EtherType::Unknown(0),
    }.to_packet();
    packet.push(ipv4::Repr {
        src_addr: Ipv4Address::new(10, 0, 0, 1),
        dst_addr: Ipv4Address::new(224, 0, 0, 251),
        protocol: IpProtocol::Unknown(0),
        payload_len: 0,
        hop_limit: 1,
    }.to_packet()).unwrap();
    packet.push(igmp::Repr::MembershipReport {
        group_addr: Ipv4Address::new(224, 0, 0, 251),
        version: igmp::Version::V2,
    }.to_packet()).unwrap();

    let reparsed = Packet::parse(LinkType::Ethernet, packet.into_bytes()).unwrap();
    assert_eq!(kinds(&reparsed), [LayerKind::Ethernet, LayerKind::Ipv4, LayerKind::Igmp]);
    assert_eq!(reparsed.extract::<ipv4::ipv4>().unwrap().protocol(), IpProtocol::Igmp);
    let message = reparsed.extract::<igmp::igmp>().unwrap();
    assert_eq!(message.group_addr(), Ipv4Address::new(224, 0, 0, 251));
    assert_eq!(reparsed.layer(LayerKind::Igmp).unwrap().checksum_valid(), Some(true));
}

#[test]
fn icmpv6_echo() {
    let mut packet = Packet::new(&ipv6::Dissector);
    packet.push(icmpv6::Repr::EchoRequest { ident: 0x1234, seq_no: 1 }.to_packet()).unwrap();
    packet.push(&b"ping"[..]).unwrap();
    {
        let mut ip = packet.root_mut();
        let header = ip.header_as_mut::<ipv6::ipv6>().unwrap();
        header.set_src_addr(Ipv6Address::new(0xfe80, 0, 0, 0, 0, 0, 0, 1));
        header.set_dst_addr(Ipv6Address::new(0xfe80, 0, 0, 0, 0, 0, 0, 2));
    }

    let bytes = packet.into_bytes();
    let reparsed = Packet::parse(LinkType::Ipv6, &bytes[..]).unwrap();
    assert_eq!(kinds(&reparsed), [LayerKind::Ipv6, LayerKind::Icmpv6]);
    let echo = reparsed.extract::<icmpv6::icmpv6>().unwrap();
    assert_eq!(echo.checksum(), 0x91ae);
    assert!(reparsed.checksum_valid());

    let mut corrupted = bytes;
    corrupted[40] = 0x81;
    let reparsed = Packet::parse(LinkType::Ipv6, corrupted).unwrap();
    assert_eq!(reparsed.layer(LayerKind::Icmpv6).unwrap().checksum_valid(), Some(false));
}

#[test]
fn nesting_is_bounded() {
    let mut packet = Packet::new(&ipv4::Dissector);
    for _ in 1..40 {
        packet.push(Packet::new(&ipv4::Dissector)).unwrap();
    }
    let bytes = packet.into_bytes();
    assert_eq!(bytes.len(), 40 * 20);

    let reparsed = Packet::parse(LinkType::Ipv4, bytes).unwrap();
    assert_eq!(reparsed.layers().count(), MAX_DEPTH);
    let innermost = reparsed.layers().last().unwrap();
    assert!(matches!(innermost.payload(), PayloadRef::Raw(bytes) if bytes.len() == 8 * 20));
    assert!(reparsed.checksum_valid());
}

#[test]
fn offloaded_checksums() {
    let mut packet = udp_stack(&[0; 4]);
    let bytes = packet.serialize_with(Checksum::Ignored).to_vec();
    let reparsed = Packet::parse(LinkType::Ethernet, bytes).unwrap();
    let datagram = reparsed.extract::<udp::udp>().unwrap();
    assert_eq!(datagram.len(), 12);
    assert_eq!(datagram.checksum(), 0);
    assert_eq!(reparsed.extract::<ipv4::ipv4>().unwrap().total_len(), 32);
}

#[test]
fn custom_registry() {
    let mut registry = Registry::with_standard_layers();
    registry.mark_unimplemented(Discriminant::Ip(IpProtocol::Udp));
    let err = registry.decode(LinkType::Ethernet, PADDED_FRAME.to_vec(), Fcs::Absent).unwrap_err();
    assert_eq!(err.error(), Error::NotImplemented);
    let partial = err.into_partial().unwrap();
    assert_eq!(kinds(&partial), [LayerKind::Ethernet, LayerKind::Ipv4]);

    let packet = Packet::parse_layer(&ipv4::Dissector, &PADDED_FRAME[14..]).unwrap();
    assert_eq!(kinds(&packet), [LayerKind::Ipv4, LayerKind::Udp]);
    assert_eq!(packet.root().padding().len(), 14);
}
