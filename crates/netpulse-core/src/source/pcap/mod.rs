//! PCAP/PCAPNG file source.
//!
//! Reads legacy PCAP and PCAPNG captures from disk and emits one
//! `PacketEvent` per packet record, carrying the original wire length so
//! byte totals match what the capture saw even when frames were truncated.

pub mod error;
pub mod layout;
pub mod parser;
pub mod reader;

pub use parser::PcapFileSource;
