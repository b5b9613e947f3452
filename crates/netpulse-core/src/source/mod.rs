//! Packet sources feeding a capture session.
//!
//! A source yields raw link-layer frames one at a time and signals
//! end-of-stream with `Ok(None)`. Decoding frames into records is the
//! `decode` module's job; sources only deal with I/O.

#[cfg(feature = "live")]
mod live;
mod pcap;

#[cfg(feature = "live")]
pub use live::LiveSource;
pub use self::pcap::PcapFileSource;

use pcap_parser::Linktype;
use thiserror::Error;

/// One captured frame as handed over by a source.
#[derive(Debug, Clone)]
pub struct PacketEvent {
    /// Capture timestamp in seconds since the Unix epoch, when known.
    pub ts: Option<f64>,
    pub linktype: Linktype,
    /// Captured bytes (possibly truncated by the snapshot length).
    pub data: Vec<u8>,
    /// Original length of the frame on the wire.
    pub wire_len: u32,
}

/// Outcome of a non-blocking read.
#[derive(Debug)]
pub enum SourcePoll {
    Packet(PacketEvent),
    /// Nothing arrived within the source's read timeout.
    Idle,
    End,
}

pub trait PacketSource {
    /// Pull the next frame. `Ok(None)` means the stream is exhausted.
    fn next_packet(&mut self) -> Result<Option<PacketEvent>, SourceError>;

    /// Read without waiting indefinitely. Sources that never stall keep the
    /// default, which never reports `Idle`.
    fn poll_packet(&mut self) -> Result<SourcePoll, SourceError> {
        Ok(match self.next_packet()? {
            Some(event) => SourcePoll::Packet(event),
            None => SourcePoll::End,
        })
    }

    /// Hand a BPF expression to the source. Sources that cannot filter
    /// return `SourceError::FilterUnsupported`.
    fn apply_filter(&mut self, expression: &str) -> Result<(), SourceError> {
        let _ = expression;
        Err(SourceError::FilterUnsupported)
    }
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PCAP parse error: {0}")]
    Pcap(String),
    #[error("live capture error: {0}")]
    Live(String),
    #[error("this source cannot apply packet filters")]
    FilterUnsupported,
}

impl From<pcap::error::PcapSourceError> for SourceError {
    fn from(value: pcap::error::PcapSourceError) -> Self {
        match value {
            pcap::error::PcapSourceError::Io(err) => SourceError::Io(err),
            pcap::error::PcapSourceError::Pcap { context, message } => {
                SourceError::Pcap(format!("{context}: {message}"))
            }
        }
    }
}
