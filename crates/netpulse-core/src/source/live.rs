use pcap::{Active, Capture};
use pcap_parser::Linktype;
use tracing::{debug, info};

use super::{PacketEvent, PacketSource, SourceError, SourcePoll};

const SNAPSHOT_LEN: i32 = 1024;
const READ_TIMEOUT_MS: i32 = 10;

/// Live capture on a network device through libpcap.
///
/// Reads time out quickly; a timeout surfaces as `SourcePoll::Idle` so the
/// session can keep checking its duration on an idle interface.
pub struct LiveSource {
    capture: Capture<Active>,
    linktype: Linktype,
}

impl LiveSource {
    pub fn open(device: &str) -> Result<Self, SourceError> {
        let capture = Capture::from_device(device)
            .map_err(live_error)?
            .promisc(true)
            .snaplen(SNAPSHOT_LEN)
            .timeout(READ_TIMEOUT_MS)
            .open()
            .map_err(live_error)?;
        let linktype = Linktype(capture.get_datalink().0);
        info!(device, linktype = linktype.0, "opened live capture");
        Ok(Self { capture, linktype })
    }
}

impl PacketSource for LiveSource {
    fn next_packet(&mut self) -> Result<Option<PacketEvent>, SourceError> {
        loop {
            match self.poll_packet()? {
                SourcePoll::Packet(event) => return Ok(Some(event)),
                SourcePoll::Idle => continue,
                SourcePoll::End => return Ok(None),
            }
        }
    }

    fn poll_packet(&mut self) -> Result<SourcePoll, SourceError> {
        match self.capture.next_packet() {
            Ok(packet) => {
                let ts = packet.header.ts.tv_sec as f64 + packet.header.ts.tv_usec as f64 * 1e-6;
                Ok(SourcePoll::Packet(PacketEvent {
                    ts: Some(ts),
                    linktype: self.linktype,
                    data: packet.data.to_vec(),
                    wire_len: packet.header.len,
                }))
            }
            Err(pcap::Error::TimeoutExpired) => Ok(SourcePoll::Idle),
            Err(pcap::Error::NoMorePackets) => Ok(SourcePoll::End),
            Err(err) => Err(live_error(err)),
        }
    }

    fn apply_filter(&mut self, expression: &str) -> Result<(), SourceError> {
        self.capture.filter(expression, true).map_err(live_error)?;
        debug!(expression, "installed capture filter");
        Ok(())
    }
}

fn live_error(err: pcap::Error) -> SourceError {
    SourceError::Live(err.to_string())
}
