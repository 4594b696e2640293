//! Dissects a hex encoded frame and prints its layers.
use std::process;

use ethox_packet::packet::{Fcs, Packet, PayloadRef};
use ethox_packet::wire::LinkType;
use structopt::StructOpt;

#[derive(StructOpt)]
struct Options {
    /// The pcap link type number of the frame.
    #[structopt(short = "l", long = "link", default_value = "1")]
    link: u32,

    /// The frame ends in a frame check sequence.
    #[structopt(long = "fcs")]
    fcs: bool,

    /// The frame as hex digits, whitespace is ignored.
    frame: Vec<String>,
}

fn main() {
    let options = Options::from_args();
    let frame = parse_hex(&options.frame.concat())
        .unwrap_or_else(|| usage_and_exit("invalid hex digits"));
    let fcs = if options.fcs { Fcs::Present } else { Fcs::Absent };

    let packet = match Packet::parse_with_fcs(LinkType::from(options.link), frame, fcs) {
        Ok(packet) => packet,
        Err(err) => {
            eprintln!("Decoding stopped: {}", err);
            match err.into_partial() {
                Some(partial) => partial,
                None => process::exit(1),
            }
        },
    };

    for layer in packet.layers() {
        let checksum = match layer.checksum_valid() {
            Some(true) => "valid",
            Some(false) => "INVALID",
            None => "-",
        };
        println!("{:indent$}{} header={} checksum={}",
            "", layer.kind(), layer.header().len(), checksum, indent = 2*layer.depth());

        if let PayloadRef::Raw(bytes) = layer.payload() {
            println!("{:indent$}  {} opaque bytes", "", bytes.len(), indent = 2*layer.depth());
        }
        if !layer.padding().is_empty() {
            println!("{:indent$}  {} padding bytes", "", layer.padding().len(), indent = 2*layer.depth());
        }
    }

    if let Some(fcs) = packet.fcs() {
        let state = if packet.fcs_valid() { "valid" } else { "INVALID" };
        println!("FCS {:08x} {}", fcs, state);
    }
}

fn parse_hex(text: &str) -> Option<Vec<u8>> {
    let digits = text.chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| c.to_digit(16).map(|d| d as u8))
        .collect::<Option<Vec<_>>>()?;
    if digits.len() % 2 != 0 {
        return None;
    }
    Some(digits.chunks(2).map(|pair| pair[0] << 4 | pair[1]).collect())
}

fn usage_and_exit<T>(reason: &str) -> T {
    eprintln!("{}", reason);
    eprintln!("Usage: dissect [--link <type>] [--fcs] <hex>...");
    process::exit(1);
}
