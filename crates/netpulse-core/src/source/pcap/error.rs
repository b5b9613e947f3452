use thiserror::Error;

/// Failures raised while opening or walking a capture file.
#[derive(Debug, Error)]
pub enum PcapSourceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PCAP parse error ({context}): {message}")]
    Pcap {
        context: &'static str,
        message: String,
    },
}

impl PcapSourceError {
    pub(crate) fn pcap(context: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Pcap {
            context,
            message: err.to_string(),
        }
    }
}
