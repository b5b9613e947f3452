pub const PCAPNG_MAGIC: [u8; 4] = [0x0a, 0x0d, 0x0d, 0x0a];

pub const PCAP_READER_BUFFER_SIZE: usize = 64 * 1024;

/// PCAPNG timestamp ticks per second when an interface has no `if_tsresol`.
pub const PCAPNG_DEFAULT_TS_UNITS: u64 = 1_000_000;
