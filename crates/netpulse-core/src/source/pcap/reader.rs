use std::io::{Read, Seek, SeekFrom};

use super::error::PcapSourceError;
use super::layout;
use pcap_parser::Linktype;

/// Read the magic bytes and rewind the reader to the start.
///
/// # Errors
/// Returns `PcapSourceError::Io` when fewer than four bytes are available or
/// the reader cannot be rewound.
pub fn read_magic_and_rewind<R: Read + Seek>(reader: &mut R) -> Result<[u8; 4], PcapSourceError> {
    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    reader.seek(SeekFrom::Start(0))?;
    Ok(magic)
}

pub fn is_pcapng_magic(magic: &[u8; 4]) -> bool {
    magic == &layout::PCAPNG_MAGIC
}

/// What a PCAPNG Interface Description Block says about its packets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterfaceInfo {
    pub linktype: Linktype,
    /// Timestamp ticks per second, from `if_tsresol`.
    pub ts_units_per_second: u64,
    /// Seconds added to every timestamp, from `if_tsoffset`.
    pub ts_offset_s: i64,
}

impl InterfaceInfo {
    pub fn new(linktype: Linktype, if_tsresol: u8, if_tsoffset: i64) -> Self {
        Self {
            linktype,
            ts_units_per_second: ts_units_per_second(if_tsresol),
            ts_offset_s: if_tsoffset,
        }
    }
}

impl Default for InterfaceInfo {
    fn default() -> Self {
        Self {
            linktype: Linktype::ETHERNET,
            ts_units_per_second: layout::PCAPNG_DEFAULT_TS_UNITS,
            ts_offset_s: 0,
        }
    }
}

/// Look up a PCAPNG interface by id; unknown ids get Ethernet with
/// microsecond timestamps.
pub fn interface_for(interfaces: &[InterfaceInfo], if_id: u32) -> InterfaceInfo {
    interfaces
        .get(if_id as usize)
        .copied()
        .unwrap_or_default()
}

/// Ticks per second for an `if_tsresol` value: a power of ten, or a power
/// of two when the high bit is set. Unrepresentable values fall back to
/// microseconds.
pub fn ts_units_per_second(if_tsresol: u8) -> u64 {
    let exponent = u32::from(if_tsresol & 0x7f);
    let units = if if_tsresol & 0x80 == 0 {
        10u64.checked_pow(exponent)
    } else {
        2u64.checked_pow(exponent)
    };
    units.unwrap_or(layout::PCAPNG_DEFAULT_TS_UNITS)
}

/// Convert a PCAPNG high/low timestamp to seconds in the interface's
/// resolution and offset.
pub fn pcapng_ts_to_seconds(ts_high: u32, ts_low: u32, interface: &InterfaceInfo) -> f64 {
    let ticks = (u64::from(ts_high) << 32) | u64::from(ts_low);
    let units = interface.ts_units_per_second.max(1);
    let whole = (ticks / units) as f64;
    let fraction = (ticks % units) as f64 / units as f64;
    whole + fraction + interface.ts_offset_s as f64
}

/// Convert a legacy PCAP second/fraction pair to seconds. The fraction is
/// in microseconds, or nanoseconds for files with the nanosecond magic.
pub fn legacy_ts_to_seconds(ts_sec: u32, ts_frac: u32, nanosecond: bool) -> f64 {
    let scale = if nanosecond { 1e-9 } else { 1e-6 };
    f64::from(ts_sec) + f64::from(ts_frac) * scale
}
