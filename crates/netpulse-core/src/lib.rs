//! netpulse core library: traffic aggregation and enrichment.
//!
//! Packet sources feed raw frames to a capture session, which decodes them
//! into [`PacketRecord`]s, labels each one with a service name, folds it into
//! running [`TrafficStats`] and renders a fixed-width line per packet. At the
//! end of the session the frozen statistics render as a summary block or
//! serialize as a [`CaptureReport`].
//!
//! Invariants:
//! - Each lookup cache calls its resolver at most once per distinct key.
//! - Counters are `u64` and only move through `TrafficStats::update`.
//! - Rankings are deterministic: count descending, then key ascending.
//! - Zero denominators produce `0.0`, never a panic or NaN.
//!
//! # Examples
//! ```no_run
//! use std::path::Path;
//!
//! use netpulse_core::{CaptureSession, PcapFileSource, PortTable, ServiceCache, SessionConfig};
//!
//! let mut source = PcapFileSource::open(Path::new("capture.pcap"))?;
//! let services = ServiceCache::new(PortTable::load_or_empty(Path::new("data/ports.json")));
//! let mut session = CaptureSession::new(SessionConfig::default(), services);
//! session.run(&mut source, &mut std::io::stdout())?;
//! let stats = session.finish();
//! print!("{}", netpulse_core::render_summary(&stats, 3));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

mod cache;
mod classify;
mod decode;
mod filter;
mod render;
mod report;
mod session;
mod source;
mod stats;

pub use cache::{
    HostnameCache, LookupCache, PortTable, PortTableError, Resolve, ServiceCache,
    SystemDnsResolver, UNKNOWN_SERVICE,
};
pub use classify::classify;
pub use decode::decode_frame;
pub use filter::{FilterSpec, build_filter};
pub use render::{Columns, format_length, render_header, render_line, render_summary};
pub use report::build_report;
pub use session::{CaptureSession, DEFAULT_DURATION_S, DEFAULT_TOP, SessionConfig, SessionError};
#[cfg(feature = "live")]
pub use source::LiveSource;
pub use source::{PacketEvent, PacketSource, PcapFileSource, SourceError, SourcePoll};
pub use stats::{
    FrequencyTable, TrafficStats, format_byte_size, most_active, percent_of, top_n,
};

/// Current JSON report schema version.
pub const REPORT_VERSION: u32 = 1;
/// Address placeholder for frames without a network-layer header.
pub const NO_ADDRESS: &str = "N/A";

/// Protocol class of a decoded packet.
///
/// # Examples
/// ```
/// use netpulse_core::Protocol;
///
/// assert_eq!(Protocol::Tcp.to_string(), "TCP");
/// assert_eq!(Protocol::Other(1).to_string(), "ICMP");
/// assert!(Protocol::Udp.has_ports());
/// assert!(!Protocol::Unknown.has_ports());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Protocol {
    Tcp,
    Udp,
    /// Any other IP payload, tagged with its IP protocol number.
    Other(u8),
    /// No network layer could be decoded.
    Unknown,
}

impl Protocol {
    /// Whether source/destination ports carry meaning for this class.
    pub fn has_ports(self) -> bool {
        matches!(self, Protocol::Tcp | Protocol::Udp)
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Tcp => f.write_str("TCP"),
            Protocol::Udp => f.write_str("UDP"),
            Protocol::Other(number) => match decode::ip_protocol_name(*number) {
                Some(name) => f.write_str(name),
                None => write!(f, "IP-{number}"),
            },
            Protocol::Unknown => f.write_str("Unknown"),
        }
    }
}

/// One decoded packet as seen at the capture boundary.
///
/// # Examples
/// ```
/// use netpulse_core::{PacketRecord, Protocol};
///
/// let record = PacketRecord {
///     src_addr: "10.0.0.1".to_string(),
///     dst_addr: "10.0.0.2".to_string(),
///     protocol: Protocol::Tcp,
///     src_port: 51000,
///     dst_port: 443,
///     length: 60,
/// };
/// assert_eq!(record.length, 60);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketRecord {
    /// Source address, or [`NO_ADDRESS`].
    pub src_addr: String,
    /// Destination address, or [`NO_ADDRESS`].
    pub dst_addr: String,
    pub protocol: Protocol,
    /// Zero unless the protocol is TCP or UDP.
    pub src_port: u16,
    /// Zero unless the protocol is TCP or UDP.
    pub dst_port: u16,
    /// Original frame length on the wire, in bytes.
    pub length: u64,
}

/// A packet record enriched with its service label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedRecord {
    pub record: PacketRecord,
    /// Service name, or [`UNKNOWN_SERVICE`].
    pub service: String,
    /// Reverse-DNS names for source and destination, when enabled.
    pub hostnames: Option<(String, String)>,
}

/// An `(identifier, count)` pair used for rankings.
///
/// # Examples
/// ```
/// use netpulse_core::KeyCount;
///
/// let entry = KeyCount::new("10.0.0.1", 4);
/// assert_eq!(entry.key, "10.0.0.1");
/// assert_eq!(entry.count, 4);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyCount {
    pub key: String,
    pub count: u64,
}

impl KeyCount {
    pub fn new(key: impl Into<String>, count: u64) -> Self {
        Self {
            key: key.into(),
            count,
        }
    }
}

/// Machine-readable snapshot of a finished capture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureReport {
    /// Report schema version (not the binary version).
    pub report_version: u32,
    pub tool: ToolInfo,
    /// BPF expression handed to the source; empty when nothing was filtered.
    pub filter: String,
    /// Configured capture duration in seconds.
    pub duration_s: u64,
    /// Wall-clock seconds the session actually ran.
    pub elapsed_s: f64,
    /// RFC3339 timestamp of the first packet, when the source provides one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_start: Option<String>,
    /// RFC3339 timestamp of the last packet, when the source provides one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_end: Option<String>,
    pub packets_total: u64,
    pub bytes_total: u64,
    /// `bytes_total` in the largest binary unit, e.g. `"1.50 KiB"`.
    pub bytes_human: String,
    /// Packets per second against the configured duration.
    pub average_rate: f64,
    pub unique_sources: usize,
    pub unique_destinations: usize,
    pub protocols: Vec<ProtocolShare>,
    pub top_sources: Vec<KeyCount>,
    pub top_destinations: Vec<KeyCount>,
}

/// Tool metadata embedded in reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub version: String,
}

/// Packet count and share for one protocol class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolShare {
    /// `"tcp"`, `"udp"` or `"other"`.
    pub protocol: String,
    pub packets: u64,
    /// Share of all packets, 0.0 to 100.0.
    pub percent: f64,
}
