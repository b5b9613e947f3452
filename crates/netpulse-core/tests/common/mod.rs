#![allow(dead_code)]

use std::fs;
use std::path::Path;

use etherparse::PacketBuilder;

pub const LINKTYPE_ETHERNET: u32 = 1;
pub const LINKTYPE_RAW: u32 = 101;

/// One frame to be written into a capture file.
pub struct Frame {
    pub ts_us: u64,
    pub data: Vec<u8>,
    /// Original length on the wire; at least `data.len()`.
    pub orig_len: u32,
}

impl Frame {
    pub fn new(ts_us: u64, data: Vec<u8>) -> Self {
        let orig_len = data.len() as u32;
        Self {
            ts_us,
            data,
            orig_len,
        }
    }

    pub fn truncated(ts_us: u64, data: Vec<u8>, orig_len: u32) -> Self {
        Self {
            ts_us,
            data,
            orig_len,
        }
    }
}

macro_rules! build_frame {
    ($builder:expr, $payload_len:expr) => {{
        let builder = $builder;
        let payload = vec![0u8; $payload_len];
        let mut packet = Vec::<u8>::with_capacity(builder.size(payload.len()));
        builder.write(&mut packet, &payload).expect("frame");
        packet
    }};
}

pub fn tcp_frame(src: [u8; 4], dst: [u8; 4], src_port: u16, dst_port: u16, payload_len: usize) -> Vec<u8> {
    build_frame!(
        PacketBuilder::ethernet2([0x02, 0, 0, 0, 0, 1], [0x02, 0, 0, 0, 0, 2])
            .ipv4(src, dst, 64)
            .tcp(src_port, dst_port, 1, 1024),
        payload_len
    )
}

pub fn udp_frame(src: [u8; 4], dst: [u8; 4], src_port: u16, dst_port: u16, payload_len: usize) -> Vec<u8> {
    build_frame!(
        PacketBuilder::ethernet2([0x02, 0, 0, 0, 0, 1], [0x02, 0, 0, 0, 0, 2])
            .ipv4(src, dst, 64)
            .udp(src_port, dst_port),
        payload_len
    )
}

pub fn raw_udp_frame(src: [u8; 4], dst: [u8; 4], src_port: u16, dst_port: u16) -> Vec<u8> {
    build_frame!(PacketBuilder::ipv4(src, dst, 64).udp(src_port, dst_port), 4)
}

/// Client 10.0.0.1 talking HTTP and DNS, plus one HTTPS packet to a second
/// server.
pub fn sample_frames() -> Vec<Frame> {
    vec![
        Frame::new(1_000_000, tcp_frame([10, 0, 0, 1], [10, 0, 0, 2], 1234, 80, 20)),
        Frame::new(1_250_000, udp_frame([10, 0, 0, 2], [10, 0, 0, 1], 53, 40000, 12)),
        Frame::new(2_500_000, tcp_frame([10, 0, 0, 1], [10, 0, 0, 3], 51000, 443, 0)),
    ]
}

/// Little-endian legacy PCAP with microsecond timestamps.
pub fn write_pcap(path: &Path, linktype: u32, frames: &[Frame]) {
    let mut output = Vec::new();
    output.extend_from_slice(&0xA1B2_C3D4u32.to_le_bytes());
    output.extend_from_slice(&2u16.to_le_bytes());
    output.extend_from_slice(&4u16.to_le_bytes());
    output.extend_from_slice(&0i32.to_le_bytes());
    output.extend_from_slice(&0u32.to_le_bytes());
    output.extend_from_slice(&65535u32.to_le_bytes());
    output.extend_from_slice(&linktype.to_le_bytes());

    for frame in frames {
        let ts_sec = (frame.ts_us / 1_000_000) as u32;
        let ts_usec = (frame.ts_us % 1_000_000) as u32;
        output.extend_from_slice(&ts_sec.to_le_bytes());
        output.extend_from_slice(&ts_usec.to_le_bytes());
        output.extend_from_slice(&(frame.data.len() as u32).to_le_bytes());
        output.extend_from_slice(&frame.orig_len.to_le_bytes());
        output.extend_from_slice(&frame.data);
    }

    fs::write(path, output).expect("write pcap");
}

/// Big-endian PCAPNG with one Ethernet interface and the default
/// microsecond timestamps.
pub fn write_pcapng(path: &Path, frames: &[Frame]) {
    write_pcapng_with(path, None, 1, frames);
}

/// Same as [`write_pcapng`], but the interface declares `if_tsresol = 9`
/// and timestamps are stored in nanoseconds.
pub fn write_pcapng_nanosecond(path: &Path, frames: &[Frame]) {
    write_pcapng_with(path, Some(9), 1_000, frames);
}

fn write_pcapng_with(path: &Path, tsresol: Option<u8>, ticks_per_us: u64, frames: &[Frame]) {
    let mut output = Vec::new();
    output.extend_from_slice(&pcapng_block(0x0A0D_0D0A, &section_header_body()));
    output.extend_from_slice(&pcapng_block(1, &interface_desc_body(tsresol)));
    for frame in frames {
        let ticks = frame.ts_us * ticks_per_us;
        output.extend_from_slice(&pcapng_block(6, &enhanced_packet_body(ticks, frame)));
    }
    fs::write(path, output).expect("write pcapng");
}

fn pcapng_block(block_type: u32, body: &[u8]) -> Vec<u8> {
    let total_len = (8 + body.len() + 4) as u32;
    let mut block = Vec::with_capacity(total_len as usize);
    block.extend_from_slice(&block_type.to_be_bytes());
    block.extend_from_slice(&total_len.to_be_bytes());
    block.extend_from_slice(body);
    block.extend_from_slice(&total_len.to_be_bytes());
    block
}

fn section_header_body() -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&0x1A2B_3C4Du32.to_be_bytes());
    body.extend_from_slice(&1u16.to_be_bytes());
    body.extend_from_slice(&0u16.to_be_bytes());
    body.extend_from_slice(&(-1i64).to_be_bytes());
    body
}

fn interface_desc_body(tsresol: Option<u8>) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&(LINKTYPE_ETHERNET as u16).to_be_bytes());
    body.extend_from_slice(&0u16.to_be_bytes());
    body.extend_from_slice(&65535u32.to_be_bytes());
    if let Some(tsresol) = tsresol {
        // if_tsresol (code 9), padded to 32 bits, then opt_endofopt.
        body.extend_from_slice(&9u16.to_be_bytes());
        body.extend_from_slice(&1u16.to_be_bytes());
        body.extend_from_slice(&[tsresol, 0, 0, 0]);
        body.extend_from_slice(&0u16.to_be_bytes());
        body.extend_from_slice(&0u16.to_be_bytes());
    }
    body
}

fn enhanced_packet_body(ticks: u64, frame: &Frame) -> Vec<u8> {
    let ts_high = (ticks >> 32) as u32;
    let ts_low = (ticks & 0xFFFF_FFFF) as u32;
    let mut body = Vec::new();
    body.extend_from_slice(&0u32.to_be_bytes());
    body.extend_from_slice(&ts_high.to_be_bytes());
    body.extend_from_slice(&ts_low.to_be_bytes());
    body.extend_from_slice(&(frame.data.len() as u32).to_be_bytes());
    body.extend_from_slice(&frame.orig_len.to_be_bytes());
    body.extend_from_slice(&frame.data);
    let pad_len = (4 - (frame.data.len() % 4)) % 4;
    body.extend(std::iter::repeat_n(0u8, pad_len));
    body
}
