use core::{fmt, ops};
use byteorder::{ByteOrder, NetworkEndian};

use crate::packet::{Context, Layer, LayerKind, LayerMut, Packet};
use super::{checksum, Error, IpProtocol, PseudoHeader, Result};

/// A TCP sequence number.
///
/// A sequence number is a monotonically advancing integer modulo 2<sup>32</sup>.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Hash)]
pub struct SeqNumber(pub i32);

impl fmt::Display for SeqNumber {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0 as u32)
    }
}

impl ops::Add<u32> for SeqNumber {
    type Output = SeqNumber;

    fn add(self, rhs: u32) -> SeqNumber {
        SeqNumber(self.0.wrapping_add(rhs as i32))
    }
}

/// A set of tcp flags.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Flags(pub u16);

byte_wrapper! {
    /// A byte sequence representing a Transmission Control Protocol header with its options.
    #[derive(Debug, PartialEq, Eq)]
    pub struct tcp([u8]);
}

header_wrapper!(tcp, LayerKind::Tcp);

mod field {
    #![allow(non_snake_case)]

    use crate::wire::field::Field;

    pub(crate) const SRC_PORT: Field = 0..2;
    pub(crate) const DST_PORT: Field = 2..4;
    pub(crate) const SEQ_NUM:  Field = 4..8;
    pub(crate) const ACK_NUM:  Field = 8..12;
    pub(crate) const FLAGS:    Field = 12..14;
    pub(crate) const WIN_SIZE: Field = 14..16;
    pub(crate) const CHECKSUM: Field = 16..18;
    pub(crate) const URGENT:   Field = 18..20;

    pub(crate) fn OPTIONS(length: usize) -> Field {
        URGENT.end..length
    }

    pub(crate) const FLG_FIN: u16 = 0x001;
    pub(crate) const FLG_SYN: u16 = 0x002;
    pub(crate) const FLG_RST: u16 = 0x004;
    pub(crate) const FLG_PSH: u16 = 0x008;
    pub(crate) const FLG_ACK: u16 = 0x010;
    pub(crate) const FLG_URG: u16 = 0x020;
    pub(crate) const FLG_ECE: u16 = 0x040;
    pub(crate) const FLG_CWR: u16 = 0x080;
    pub(crate) const FLG_NS:  u16 = 0x100;

    pub(crate) const OPT_END: u8 = 0x00;
    pub(crate) const OPT_NOP: u8 = 0x01;
    pub(crate) const OPT_MSS: u8 = 0x02;
    pub(crate) const OPT_WS:  u8 = 0x03;
    pub(crate) const OPT_SACKPERM: u8 = 0x04;
    pub(crate) const OPT_SACKRNG:  u8 = 0x05;
}

/// The length of a header without options.
pub const MIN_HEADER_LEN: usize = field::URGENT.end;

/// The length of a header with the maximum amount of options.
pub const MAX_HEADER_LEN: usize = 60;

impl tcp {
    /// Imbue a raw octet buffer with TCP header structure.
    pub fn new_unchecked(data: &[u8]) -> &Self {
        Self::__from_macro_new_unchecked(data)
    }

    /// Imbue a mutable octet buffer with TCP header structure.
    pub fn new_unchecked_mut(data: &mut [u8]) -> &mut Self {
        Self::__from_macro_new_unchecked_mut(data)
    }

    /// Shorthand for a combination of [new_unchecked] and [check_len].
    ///
    /// [new_unchecked]: #method.new_unchecked
    /// [check_len]: #method.check_len
    pub fn new_checked(data: &[u8]) -> Result<&Self> {
        Self::new_unchecked(data).check_len()?;
        Ok(Self::new_unchecked(data))
    }

    pub fn new_checked_mut(data: &mut [u8]) -> Result<&mut Self> {
        Self::new_checked(&data[..])?;
        Ok(Self::new_unchecked_mut(data))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }

    /// Ensure that no header accessor method will panic if called.
    /// Returns `Err(Error::Truncated)` if the buffer is too short.
    /// Returns `Err(Error::Malformed)` if the header length field has a value smaller
    /// than the minimal header length.
    ///
    /// The result of this check is invalidated by calling [set_header_len].
    ///
    /// [set_header_len]: #method.set_header_len
    pub fn check_len(&self) -> Result<()> {
        let len = self.0.len();
        if len < field::URGENT.end {
            Err(Error::Truncated)
        } else {
            let header_len = self.header_len() as usize;
            if header_len < field::URGENT.end {
                Err(Error::Malformed)
            } else if len < header_len {
                Err(Error::Truncated)
            } else {
                Ok(())
            }
        }
    }

    /// Return the source port field.
    #[inline]
    pub fn src_port(&self) -> u16 {
        NetworkEndian::read_u16(&self.0[field::SRC_PORT])
    }

    /// Return the destination port field.
    #[inline]
    pub fn dst_port(&self) -> u16 {
        NetworkEndian::read_u16(&self.0[field::DST_PORT])
    }

    /// Return the sequence number field.
    #[inline]
    pub fn seq_number(&self) -> SeqNumber {
        SeqNumber(NetworkEndian::read_i32(&self.0[field::SEQ_NUM]))
    }

    /// Return the acknowledgement number field.
    #[inline]
    pub fn ack_number(&self) -> SeqNumber {
        SeqNumber(NetworkEndian::read_i32(&self.0[field::ACK_NUM]))
    }

    /// Read all flags at once.
    pub fn flags(&self) -> Flags {
        Flags(NetworkEndian::read_u16(&self.0[field::FLAGS]) & 0x1ff)
    }

    /// Return the header length, in octets.
    #[inline]
    pub fn header_len(&self) -> u8 {
        let raw = NetworkEndian::read_u16(&self.0[field::FLAGS]);
        ((raw >> 12) * 4) as u8
    }

    /// Return the window size field.
    #[inline]
    pub fn window_len(&self) -> u16 {
        NetworkEndian::read_u16(&self.0[field::WIN_SIZE])
    }

    /// Return the checksum field.
    #[inline]
    pub fn checksum(&self) -> u16 {
        NetworkEndian::read_u16(&self.0[field::CHECKSUM])
    }

    /// Return the urgent pointer field.
    #[inline]
    pub fn urgent_at(&self) -> u16 {
        NetworkEndian::read_u16(&self.0[field::URGENT])
    }

    /// Return the option bytes, up to the header length.
    pub fn options(&self) -> &[u8] {
        let end = usize::from(self.header_len()).min(self.0.len());
        self.0.get(field::OPTIONS(end)).unwrap_or(&[])
    }

    /// Return the option bytes mutably, up to the header length.
    pub fn options_mut(&mut self) -> &mut [u8] {
        let end = usize::from(self.header_len()).min(self.0.len());
        match self.0.get_mut(field::OPTIONS(end)) {
            Some(options) => options,
            None => &mut [],
        }
    }

    /// Iterate over the parsed options, stopping at the end of list option.
    pub fn options_iter(&self) -> Options {
        Options { remaining: self.options() }
    }

    /// Set the source port field.
    #[inline]
    pub fn set_src_port(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.0[field::SRC_PORT], value)
    }

    /// Set the destination port field.
    #[inline]
    pub fn set_dst_port(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.0[field::DST_PORT], value)
    }

    /// Set the sequence number field.
    #[inline]
    pub fn set_seq_number(&mut self, value: SeqNumber) {
        NetworkEndian::write_i32(&mut self.0[field::SEQ_NUM], value.0)
    }

    /// Set the acknowledgement number field.
    #[inline]
    pub fn set_ack_number(&mut self, value: SeqNumber) {
        NetworkEndian::write_i32(&mut self.0[field::ACK_NUM], value.0)
    }

    /// Set a combination of flags.
    #[inline]
    pub fn set_flags(&mut self, Flags(flags): Flags) {
        let raw = NetworkEndian::read_u16(&self.0[field::FLAGS]) & !0xfff;
        NetworkEndian::write_u16(&mut self.0[field::FLAGS], raw | (flags & 0x1ff))
    }

    /// Set the header length, in octets.
    #[inline]
    pub fn set_header_len(&mut self, value: u8) {
        let raw = NetworkEndian::read_u16(&self.0[field::FLAGS]);
        let raw = (raw & !0xf000) | ((value as u16) / 4) << 12;
        NetworkEndian::write_u16(&mut self.0[field::FLAGS], raw)
    }

    /// Set the window size field.
    #[inline]
    pub fn set_window_len(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.0[field::WIN_SIZE], value)
    }

    /// Set the checksum field.
    #[inline]
    pub fn set_checksum(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.0[field::CHECKSUM], value)
    }

    /// Set the urgent pointer field.
    #[inline]
    pub fn set_urgent_at(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.0[field::URGENT], value)
    }

    /// Compute and fill in the checksum over this header and `payload`.
    pub fn fill_checksum(&mut self, pseudo: &PseudoHeader, payload: &[u8]) {
        self.set_checksum(0);
        let checksum = !checksum::upper_layer(Some(pseudo), IpProtocol::Tcp, &self.0, payload);
        self.set_checksum(checksum)
    }

    /// Validate the checksum over this header and `payload`.
    pub fn verify_checksum(&self, pseudo: &PseudoHeader, payload: &[u8]) -> bool {
        checksum::upper_layer(Some(pseudo), IpProtocol::Tcp, &self.0, payload) == !0
    }
}

impl AsRef<[u8]> for tcp {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl AsMut<[u8]> for tcp {
    fn as_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }
}

impl Flags {
    /// Return the FIN flag.
    #[inline]
    pub fn fin(&self) -> bool {
        self.0 & field::FLG_FIN != 0
    }

    /// Return the SYN flag.
    #[inline]
    pub fn syn(&self) -> bool {
        self.0 & field::FLG_SYN != 0
    }

    /// Return the RST flag.
    #[inline]
    pub fn rst(&self) -> bool {
        self.0 & field::FLG_RST != 0
    }

    /// Return the PSH flag.
    #[inline]
    pub fn psh(&self) -> bool {
        self.0 & field::FLG_PSH != 0
    }

    /// Return the ACK flag.
    #[inline]
    pub fn ack(&self) -> bool {
        self.0 & field::FLG_ACK != 0
    }

    /// Return the URG flag.
    #[inline]
    pub fn urg(&self) -> bool {
        self.0 & field::FLG_URG != 0
    }

    /// Return the ECE flag.
    #[inline]
    pub fn ece(&self) -> bool {
        self.0 & field::FLG_ECE != 0
    }

    /// Return the CWR flag.
    #[inline]
    pub fn cwr(&self) -> bool {
        self.0 & field::FLG_CWR != 0
    }

    /// Return the NS flag.
    #[inline]
    pub fn ns(&self) -> bool {
        self.0 & field::FLG_NS != 0
    }

    fn set(&mut self, flag: u16, value: bool) {
        if value {
            self.0 |= flag
        } else {
            self.0 &= !flag
        }
    }

    /// Set the FIN flag.
    pub fn set_fin(&mut self, value: bool) {
        self.set(field::FLG_FIN, value)
    }

    /// Set the SYN flag.
    pub fn set_syn(&mut self, value: bool) {
        self.set(field::FLG_SYN, value)
    }

    /// Set the RST flag.
    pub fn set_rst(&mut self, value: bool) {
        self.set(field::FLG_RST, value)
    }

    /// Set the PSH flag.
    pub fn set_psh(&mut self, value: bool) {
        self.set(field::FLG_PSH, value)
    }

    /// Set the ACK flag.
    pub fn set_ack(&mut self, value: bool) {
        self.set(field::FLG_ACK, value)
    }

    /// Set the URG flag.
    pub fn set_urg(&mut self, value: bool) {
        self.set(field::FLG_URG, value)
    }

    /// Set the ECE flag.
    pub fn set_ece(&mut self, value: bool) {
        self.set(field::FLG_ECE, value)
    }

    /// Set the CWR flag.
    pub fn set_cwr(&mut self, value: bool) {
        self.set(field::FLG_CWR, value)
    }

    /// Set the NS flag.
    pub fn set_ns(&mut self, value: bool) {
        self.set(field::FLG_NS, value)
    }
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.syn() { write!(f, " syn")? }
        if self.fin() { write!(f, " fin")? }
        if self.rst() { write!(f, " rst")? }
        if self.psh() { write!(f, " psh")? }
        if self.ack() { write!(f, " ack")? }
        if self.urg() { write!(f, " urg")? }
        if self.ece() { write!(f, " ece")? }
        if self.cwr() { write!(f, " cwr")? }
        if self.ns()  { write!(f, " ns" )? }
        Ok(())
    }
}

/// A representation of a single TCP option.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum TcpOption<'a> {
    EndOfList,
    NoOperation,
    MaxSegmentSize(u16),
    WindowScale(u8),
    SackPermitted,
    SackRange([Option<(u32, u32)>; 3]),
    Unknown { kind: u8, data: &'a [u8] }
}

impl<'a> TcpOption<'a> {
    pub fn parse(buffer: &'a [u8]) -> Result<(&'a [u8], TcpOption<'a>)> {
        let kind = *buffer.first().ok_or(Error::Truncated)?;
        if kind == field::OPT_END {
            return Ok((&buffer[1..], TcpOption::EndOfList));
        }
        if kind == field::OPT_NOP {
            return Ok((&buffer[1..], TcpOption::NoOperation));
        }

        let length = *buffer.get(1).ok_or(Error::Truncated)? as usize;
        let data = buffer.get(2..length).ok_or(Error::Truncated)?;
        let option = match (kind, length) {
            (field::OPT_MSS, 4) =>
                TcpOption::MaxSegmentSize(NetworkEndian::read_u16(data)),
            (field::OPT_MSS, _) =>
                return Err(Error::Malformed),
            (field::OPT_WS, 3) =>
                TcpOption::WindowScale(data[0]),
            (field::OPT_WS, _) =>
                return Err(Error::Malformed),
            (field::OPT_SACKPERM, 2) =>
                TcpOption::SackPermitted,
            (field::OPT_SACKPERM, _) =>
                return Err(Error::Malformed),
            (field::OPT_SACKRNG, n) => {
                if n < 10 || (n - 2) % 8 != 0 {
                    return Err(Error::Malformed)
                }
                if n > 26 {
                    net_debug!("sACK with >3 blocks, truncating to 3");
                }

                let mut sack_ranges: [Option<(u32, u32)>; 3] = [None; 3];
                for (block, range) in data.chunks_exact(8).zip(sack_ranges.iter_mut()) {
                    let left = NetworkEndian::read_u32(&block[0..4]);
                    let right = NetworkEndian::read_u32(&block[4..8]);
                    *range = Some((left, right));
                }
                TcpOption::SackRange(sack_ranges)
            },
            (_, _) =>
                TcpOption::Unknown { kind, data },
        };
        Ok((&buffer[length..], option))
    }

    pub fn buffer_len(&self) -> usize {
        match self {
            TcpOption::EndOfList => 1,
            TcpOption::NoOperation => 1,
            TcpOption::MaxSegmentSize(_) => 4,
            TcpOption::WindowScale(_) => 3,
            TcpOption::SackPermitted => 2,
            TcpOption::SackRange(s) => s.iter().filter(|s| s.is_some()).count() * 8 + 2,
            TcpOption::Unknown { data, .. } => 2 + data.len()
        }
    }

    /// Write the option to the start of `buffer`, returning the rest.
    ///
    /// # Panics
    /// This function panics if `buffer` is shorter than `buffer_len()`.
    pub fn emit<'b>(&self, buffer: &'b mut [u8]) -> &'b mut [u8] {
        let length = self.buffer_len();
        match *self {
            TcpOption::EndOfList => {
                // There may be padding space which also should be initialized.
                for p in buffer.iter_mut() {
                    *p = field::OPT_END;
                }
            }
            TcpOption::NoOperation => {
                buffer[0] = field::OPT_NOP;
            }
            TcpOption::MaxSegmentSize(value) => {
                buffer[0] = field::OPT_MSS;
                NetworkEndian::write_u16(&mut buffer[2..4], value)
            }
            TcpOption::WindowScale(value) => {
                buffer[0] = field::OPT_WS;
                buffer[2] = value;
            }
            TcpOption::SackPermitted => {
                buffer[0] = field::OPT_SACKPERM;
            }
            TcpOption::SackRange(slice) => {
                buffer[0] = field::OPT_SACKRNG;
                for (i, (first, second)) in slice.iter().filter_map(|s| *s).enumerate() {
                    let pos = i * 8 + 2;
                    NetworkEndian::write_u32(&mut buffer[pos..pos + 4], first);
                    NetworkEndian::write_u32(&mut buffer[pos + 4..pos + 8], second);
                }
            }
            TcpOption::Unknown { kind, data: provided } => {
                buffer[0] = kind;
                buffer[2..length].copy_from_slice(provided)
            }
        }
        if length > 1 {
            buffer[1] = length as u8;
        }
        let at = length.min(buffer.len());
        &mut buffer[at..]
    }
}

/// An iterator over the options of a TCP header.
#[derive(Debug, Clone)]
pub struct Options<'a> {
    remaining: &'a [u8],
}

impl<'a> Iterator for Options<'a> {
    type Item = Result<TcpOption<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining.is_empty() {
            return None;
        }

        match TcpOption::parse(self.remaining) {
            Ok((_, TcpOption::EndOfList)) => {
                self.remaining = &[];
                None
            },
            Ok((rest, option)) => {
                self.remaining = rest;
                Some(Ok(option))
            },
            Err(err) => {
                self.remaining = &[];
                Some(Err(err))
            },
        }
    }
}

/// A high-level representation of a Transmission Control Protocol header.
///
/// Checksum and header length are derived values and left to the calculated-value pass.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Repr {
    pub src_port:     u16,
    pub dst_port:     u16,
    pub flags:        Flags,
    pub seq_number:   SeqNumber,
    pub ack_number:   Option<SeqNumber>,
    pub window_len:   u16,
    pub window_scale: Option<u8>,
    pub max_seg_size: Option<u16>,
    pub sack_permitted: bool,
}

impl Repr {
    /// Parse a Transmission Control Protocol header and return a high-level representation.
    pub fn parse(packet: &tcp) -> Result<Repr> {
        packet.check_len()?;
        // Source and destination ports must be present.
        if packet.src_port() == 0 { return Err(Error::Malformed) }
        if packet.dst_port() == 0 { return Err(Error::Malformed) }

        let flags = packet.flags();
        let ack_number = if flags.ack() {
            Some(packet.ack_number())
        } else {
            None
        };

        let mut max_seg_size = None;
        let mut window_scale = None;
        let mut sack_permitted = false;
        for option in packet.options_iter() {
            match option? {
                TcpOption::MaxSegmentSize(value) =>
                    max_seg_size = Some(value),
                TcpOption::WindowScale(value) => {
                    // RFC 1323: the shift count must be limited to 14.
                    window_scale = if value > 14 {
                        net_debug!("parsed window scaling factor {} >14, setting to 14", value);
                        Some(14)
                    } else {
                        Some(value)
                    };
                },
                TcpOption::SackPermitted =>
                    sack_permitted = true,
                _ => (),
            }
        }

        Ok(Repr {
            src_port:     packet.src_port(),
            dst_port:     packet.dst_port(),
            flags,
            seq_number:   packet.seq_number(),
            ack_number,
            window_len:   packet.window_len(),
            window_scale,
            max_seg_size,
            sack_permitted,
        })
    }

    /// Return the length of a header that will be emitted from this high-level representation.
    ///
    /// The TCP header length is a multiple of 4.
    pub fn header_len(&self) -> usize {
        let mut length = field::URGENT.end;
        if self.max_seg_size.is_some() {
            length += 4
        }
        if self.window_scale.is_some() {
            length += 3
        }
        if self.sack_permitted {
            length += 2;
        }
        if length % 4 != 0 {
            length += 4 - length % 4;
        }
        length
    }

    /// Emit a high-level representation into a Transmission Control Protocol header.
    ///
    /// The header must be `header_len()` long. The checksum is zeroed until recomputed.
    pub fn emit(&self, packet: &mut tcp) {
        packet.set_src_port(self.src_port);
        packet.set_dst_port(self.dst_port);
        packet.set_seq_number(self.seq_number);
        packet.set_ack_number(self.ack_number.unwrap_or(SeqNumber(0)));
        packet.set_window_len(self.window_len);
        packet.set_header_len(self.header_len() as u8);
        let mut flags = self.flags;
        flags.set_ack(self.ack_number.is_some());
        packet.set_flags(flags);
        packet.set_checksum(0);
        packet.set_urgent_at(0);

        let mut options = packet.options_mut();
        if let Some(value) = self.window_scale {
            let tmp = options; options = TcpOption::WindowScale(value).emit(tmp);
        }
        if let Some(value) = self.max_seg_size {
            let tmp = options; options = TcpOption::MaxSegmentSize(value).emit(tmp);
        }
        if self.sack_permitted {
            let tmp = options; options = TcpOption::SackPermitted.emit(tmp);
        }
        if !options.is_empty() {
            TcpOption::EndOfList.emit(options);
        }
    }

    /// Create a standalone TCP layer with this header.
    pub fn to_packet(&self) -> Packet {
        let mut header = vec![0; self.header_len()];
        self.emit(tcp::new_unchecked_mut(&mut header));
        Packet::from_header(&Dissector, header)
    }
}

impl fmt::Display for Repr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "TCP src={} dst={}{}", self.src_port, self.dst_port, self.flags)?;
        write!(f, " seq={}", self.seq_number)?;
        if let Some(ack_number) = self.ack_number {
            write!(f, " ack={}", ack_number)?;
        }
        write!(f, " win={}", self.window_len)?;
        if let Some(max_seg_size) = self.max_seg_size {
            write!(f, " mss={}", max_seg_size)?;
        }
        Ok(())
    }
}

/// Replace the options of a TCP layer.
///
/// The options are padded with end of list options to a multiple of four bytes. The header is
/// resized accordingly, its length field is set when the packet is recomputed.
pub fn set_options(layer: &mut LayerMut, options: &[u8]) -> Result<()> {
    if layer.kind() != LayerKind::Tcp {
        return Err(Error::Unsupported);
    }

    let padded = (options.len() + 3) / 4 * 4;
    let header_len = MIN_HEADER_LEN + padded;
    if header_len > MAX_HEADER_LEN {
        return Err(Error::Malformed);
    }

    layer.resize_header(header_len);
    let header = layer.header_mut();
    let (content, pad) = header[MIN_HEADER_LEN..].split_at_mut(options.len());
    content.copy_from_slice(options);
    pad.iter_mut().for_each(|byte| *byte = field::OPT_END);
    tcp::new_unchecked_mut(header).set_header_len(header_len as u8);
    Ok(())
}

/// The TCP layer.
#[derive(Debug, Clone, Copy, Default)]
pub struct Dissector;

impl Layer for Dissector {
    fn kind(&self) -> LayerKind {
        LayerKind::Tcp
    }

    fn header_len(&self, data: &[u8]) -> Result<usize> {
        let packet = tcp::new_checked(data)?;
        Ok(packet.header_len().into())
    }

    fn default_header(&self) -> Vec<u8> {
        let mut header = vec![0; MIN_HEADER_LEN];
        tcp::new_unchecked_mut(&mut header).set_header_len(MIN_HEADER_LEN as u8);
        header
    }

    fn required_header_len(&self, header: &[u8]) -> Option<usize> {
        if header.len() < MIN_HEADER_LEN {
            return Some(MIN_HEADER_LEN);
        }
        Some(usize::from(tcp::new_unchecked(header).header_len()).max(MIN_HEADER_LEN))
    }

    fn recompute(&self, header: &mut [u8], cx: &Context) {
        if header.len() < MIN_HEADER_LEN {
            return;
        }

        let header_len = header.len();
        let packet = tcp::new_unchecked_mut(header);
        packet.set_header_len(header_len as u8);
        if let (true, Some(pseudo)) = (cx.checksum.manual(), &cx.pseudo) {
            packet.fill_checksum(pseudo, cx.payload);
        }
    }

    fn checksum_valid(&self, header: &[u8], cx: &Context) -> Option<bool> {
        let packet = tcp::new_checked(header).ok()?;
        let pseudo = cx.pseudo.as_ref()?;
        Some(packet.verify_checksum(pseudo, cx.payload))
    }
}

#[cfg(test)]
mod test {
    use crate::wire::{Checksum, Ipv4Address};
    use super::*;

    const SRC_ADDR: Ipv4Address = Ipv4Address([192, 168, 1, 1]);
    const DST_ADDR: Ipv4Address = Ipv4Address([192, 168, 1, 2]);

    static HEADER_BYTES: [u8; 24] =
        [0xbf, 0x00, 0x00, 0x50,
         0x01, 0x23, 0x45, 0x67,
         0x89, 0xab, 0xcd, 0xef,
         0x60, 0x35, 0x01, 0x23,
         0x01, 0xb6, 0x02, 0x01,
         0x03, 0x03, 0x0c, 0x01];

    static OPTION_BYTES: [u8; 4] =
        [0x03, 0x03, 0x0c, 0x01];

    static PAYLOAD_BYTES: [u8; 4] =
        [0xaa, 0x00, 0x00, 0xff];

    static SYN_HEADER_BYTES: [u8; 20] =
        [0xbf, 0x00, 0x00, 0x50,
         0x01, 0x23, 0x45, 0x67,
         0x00, 0x00, 0x00, 0x00,
         0x50, 0x02, 0x01, 0x23,
         0x7a, 0x8d, 0x00, 0x00];

    fn pseudo() -> PseudoHeader {
        PseudoHeader::Ipv4 { src_addr: SRC_ADDR, dst_addr: DST_ADDR }
    }

    #[test]
    fn test_deconstruct() {
        let packet = tcp::new_checked(&HEADER_BYTES[..]).unwrap();
        assert_eq!(packet.src_port(), 48896);
        assert_eq!(packet.dst_port(), 80);
        assert_eq!(packet.seq_number(), SeqNumber(0x01234567));
        assert_eq!(packet.ack_number(), SeqNumber(0x89abcdefu32 as i32));
        assert_eq!(packet.header_len(), 24);
        assert_eq!(packet.flags().fin(), true);
        assert_eq!(packet.flags().syn(), false);
        assert_eq!(packet.flags().rst(), true);
        assert_eq!(packet.flags().psh(), false);
        assert_eq!(packet.flags().ack(), true);
        assert_eq!(packet.flags().urg(), true);
        assert_eq!(packet.window_len(), 0x0123);
        assert_eq!(packet.urgent_at(), 0x0201);
        assert_eq!(packet.checksum(), 0x01b6);
        assert_eq!(packet.options(), &OPTION_BYTES[..]);
        assert_eq!(packet.verify_checksum(&pseudo(), &PAYLOAD_BYTES), true);
    }

    #[test]
    fn test_construct() {
        let mut bytes = vec![0xa5; HEADER_BYTES.len()];
        let packet = tcp::new_unchecked_mut(&mut bytes);
        packet.set_src_port(48896);
        packet.set_dst_port(80);
        packet.set_seq_number(SeqNumber(0x01234567));
        packet.set_ack_number(SeqNumber(0x89abcdefu32 as i32));
        packet.set_header_len(24);
        let mut flags = Flags::default();
        flags.set_fin(true);
        flags.set_syn(false);
        flags.set_rst(true);
        flags.set_psh(false);
        flags.set_ack(true);
        flags.set_urg(true);
        packet.set_flags(flags);
        packet.set_window_len(0x0123);
        packet.set_urgent_at(0x0201);
        packet.set_checksum(0xEEEE);
        packet.options_mut().copy_from_slice(&OPTION_BYTES[..]);
        packet.fill_checksum(&pseudo(), &PAYLOAD_BYTES);
        assert_eq!(packet.as_bytes(), &HEADER_BYTES[..]);
    }

    #[test]
    fn test_truncated() {
        assert_eq!(tcp::new_checked(&HEADER_BYTES[..23]), Err(Error::Truncated));
        assert_eq!(Dissector.header_len(&HEADER_BYTES[..1]), Err(Error::Truncated));
    }

    #[test]
    fn test_impossible_len() {
        let mut bytes = vec![0; 20];
        let packet = tcp::new_unchecked_mut(&mut bytes);
        packet.set_header_len(10);
        assert_eq!(packet.check_len(), Err(Error::Malformed));
    }

    fn packet_repr() -> Repr {
        Repr {
            src_port:     48896,
            dst_port:     80,
            seq_number:   SeqNumber(0x01234567),
            ack_number:   None,
            window_len:   0x0123,
            window_scale: None,
            flags:        Flags(field::FLG_SYN),
            max_seg_size: None,
            sack_permitted: false,
        }
    }

    #[test]
    fn test_parse() {
        let packet = tcp::new_checked(&SYN_HEADER_BYTES[..]).unwrap();
        assert_eq!(Repr::parse(packet), Ok(packet_repr()));
        assert!(packet.verify_checksum(&pseudo(), &PAYLOAD_BYTES));
    }

    #[test]
    fn test_emit() {
        let repr = packet_repr();
        let mut bytes = vec![0xa5; repr.header_len()];
        repr.emit(tcp::new_unchecked_mut(&mut bytes));
        let cx = Context {
            payload: &PAYLOAD_BYTES,
            pseudo: Some(pseudo()),
            checksum: Checksum::Manual,
        };
        Dissector.recompute(&mut bytes, &cx);
        assert_eq!(&bytes[..], &SYN_HEADER_BYTES[..]);
        assert_eq!(Dissector.checksum_valid(&bytes, &cx), Some(true));
    }

    #[test]
    fn test_header_len_multiple_of_4() {
        let mut repr = packet_repr();
        repr.window_scale = Some(0); // This TCP Option needs 3 bytes.
        assert_eq!(repr.header_len(), 24);

        let mut bytes = vec![0xa5; repr.header_len()];
        repr.emit(tcp::new_unchecked_mut(&mut bytes));
        assert_eq!(&bytes[20..], &[0x03, 0x03, 0x00, 0x00]);
        assert_eq!(Repr::parse(tcp::new_unchecked(&bytes)), Ok(repr));
    }

    macro_rules! assert_option_parses {
        ($opt:expr, $data:expr) => ({
            assert_eq!(TcpOption::parse($data), Ok((&[][..], $opt)));
            let buffer = &mut [0; 40][..$opt.buffer_len()];
            assert_eq!($opt.emit(buffer), &mut []);
            assert_eq!(&*buffer, $data);
        })
    }

    #[test]
    fn test_tcp_options() {
        assert_option_parses!(TcpOption::EndOfList,
                              &[0x00]);
        assert_option_parses!(TcpOption::NoOperation,
                              &[0x01]);
        assert_option_parses!(TcpOption::MaxSegmentSize(1500),
                              &[0x02, 0x04, 0x05, 0xdc]);
        assert_option_parses!(TcpOption::WindowScale(12),
                              &[0x03, 0x03, 0x0c]);
        assert_option_parses!(TcpOption::SackPermitted,
                              &[0x4, 0x02]);
        assert_option_parses!(TcpOption::SackRange([Some((500, 1500)), None, None]),
                              &[0x05, 0x0a,
                                0x00, 0x00, 0x01, 0xf4, 0x00, 0x00, 0x05, 0xdc]);
        assert_option_parses!(TcpOption::SackRange([Some((875, 1225)), Some((1500, 2500)), None]),
                              &[0x05, 0x12,
                                0x00, 0x00, 0x03, 0x6b, 0x00, 0x00, 0x04, 0xc9,
                                0x00, 0x00, 0x05, 0xdc, 0x00, 0x00, 0x09, 0xc4]);
        assert_option_parses!(TcpOption::Unknown { kind: 12, data: &[1, 2, 3][..] },
                              &[0x0c, 0x05, 0x01, 0x02, 0x03])
    }

    #[test]
    fn test_malformed_tcp_options() {
        assert_eq!(TcpOption::parse(&[]),
                   Err(Error::Truncated));
        assert_eq!(TcpOption::parse(&[0xc]),
                   Err(Error::Truncated));
        assert_eq!(TcpOption::parse(&[0xc, 0x05, 0x01, 0x02]),
                   Err(Error::Truncated));
        assert_eq!(TcpOption::parse(&[0xc, 0x01]),
                   Err(Error::Truncated));
        assert_eq!(TcpOption::parse(&[0x2, 0x02]),
                   Err(Error::Malformed));
        assert_eq!(TcpOption::parse(&[0x3, 0x02]),
                   Err(Error::Malformed));
    }

    #[test]
    fn test_options_iter() {
        let options = [0x01, 0x02, 0x04, 0x05, 0xb4, 0x00, 0xff];
        let mut iter = Options { remaining: &options };
        assert_eq!(iter.next(), Some(Ok(TcpOption::NoOperation)));
        assert_eq!(iter.next(), Some(Ok(TcpOption::MaxSegmentSize(1460))));
        assert_eq!(iter.next(), None);
    }
}
