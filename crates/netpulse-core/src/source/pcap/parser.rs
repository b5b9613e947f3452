use std::fs::File;
use std::path::Path;

use pcap_parser::{
    Block, LegacyPcapReader, Linktype, PcapBlockOwned, PcapError, PcapNGReader,
    traits::PcapReaderIterator,
};
use tracing::debug;

use crate::source::{PacketEvent, PacketSource, SourceError};

use super::error::PcapSourceError;
use super::layout;
use super::reader::{
    InterfaceInfo, interface_for, is_pcapng_magic, legacy_ts_to_seconds, pcapng_ts_to_seconds,
    read_magic_and_rewind,
};

/// Offline source reading a legacy PCAP or PCAPNG file.
///
/// The format is picked from the file magic. Filters cannot be applied to an
/// offline file, so `apply_filter` keeps the default `FilterUnsupported`.
pub struct PcapFileSource {
    inner: PcapReader,
}

enum PcapReader {
    Legacy {
        reader: LegacyPcapReader<File>,
        linktype: Option<Linktype>,
        /// Set by the nanosecond magic; `ts_usec` then holds nanoseconds.
        nanosecond: bool,
    },
    Ng {
        reader: PcapNGReader<File>,
        interfaces: Vec<InterfaceInfo>,
    },
}

impl PcapFileSource {
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let file = File::open(path)?;
        let inner = create_reader(file)?;
        debug!(path = %path.display(), "opened capture file");
        Ok(Self { inner })
    }
}

impl PacketSource for PcapFileSource {
    fn next_packet(&mut self) -> Result<Option<PacketEvent>, SourceError> {
        next_packet(&mut self.inner).map_err(SourceError::from)
    }
}

fn create_reader(mut file: File) -> Result<PcapReader, PcapSourceError> {
    let magic = read_magic_and_rewind(&mut file)?;

    if is_pcapng_magic(&magic) {
        let reader = PcapNGReader::new(layout::PCAP_READER_BUFFER_SIZE, file)
            .map_err(|e| PcapSourceError::pcap("pcapng reader init", e))?;
        Ok(PcapReader::Ng {
            reader,
            interfaces: Vec::new(),
        })
    } else {
        let reader = LegacyPcapReader::new(layout::PCAP_READER_BUFFER_SIZE, file)
            .map_err(|e| PcapSourceError::pcap("pcap reader init", e))?;
        Ok(PcapReader::Legacy {
            reader,
            linktype: None,
            nanosecond: false,
        })
    }
}

fn next_packet(reader: &mut PcapReader) -> Result<Option<PacketEvent>, PcapSourceError> {
    loop {
        match reader {
            PcapReader::Legacy {
                reader,
                linktype,
                nanosecond,
            } => match reader.next() {
                Ok((offset, block)) => {
                    let event = match block {
                        PcapBlockOwned::LegacyHeader(header) => {
                            *linktype = Some(header.network);
                            *nanosecond = header.is_nanosecond_precision();
                            None
                        }
                        PcapBlockOwned::Legacy(packet) => Some(PacketEvent {
                            ts: Some(legacy_ts_to_seconds(
                                packet.ts_sec,
                                packet.ts_usec,
                                *nanosecond,
                            )),
                            linktype: linktype.unwrap_or(Linktype::ETHERNET),
                            data: packet.data.to_vec(),
                            wire_len: packet.origlen,
                        }),
                        _ => None,
                    };
                    reader.consume(offset);
                    if event.is_some() {
                        return Ok(event);
                    }
                }
                Err(PcapError::Eof) => return Ok(None),
                Err(PcapError::Incomplete(_)) => {
                    reader
                        .refill()
                        .map_err(|e| PcapSourceError::pcap("pcap reader refill", e))?;
                }
                Err(e) => return Err(PcapSourceError::pcap("pcap reader next", e)),
            },
            PcapReader::Ng { reader, interfaces } => match reader.next() {
                Ok((offset, block)) => {
                    let event = match block {
                        PcapBlockOwned::NG(Block::SectionHeader(_)) => {
                            // Interface ids restart with every section.
                            interfaces.clear();
                            None
                        }
                        PcapBlockOwned::NG(Block::InterfaceDescription(intf)) => {
                            interfaces.push(InterfaceInfo::new(
                                intf.linktype,
                                intf.if_tsresol,
                                intf.if_tsoffset,
                            ));
                            None
                        }
                        PcapBlockOwned::NG(Block::EnhancedPacket(packet)) => {
                            let interface = interface_for(interfaces, packet.if_id);
                            Some(PacketEvent {
                                ts: Some(pcapng_ts_to_seconds(
                                    packet.ts_high,
                                    packet.ts_low,
                                    &interface,
                                )),
                                linktype: interface.linktype,
                                data: packet.data.to_vec(),
                                wire_len: packet.origlen,
                            })
                        }
                        PcapBlockOwned::NG(Block::SimplePacket(packet)) => Some(PacketEvent {
                            ts: None,
                            linktype: interface_for(interfaces, 0).linktype,
                            data: packet.data.to_vec(),
                            wire_len: packet.origlen,
                        }),
                        _ => None,
                    };
                    reader.consume(offset);
                    if event.is_some() {
                        return Ok(event);
                    }
                }
                Err(PcapError::Eof) => return Ok(None),
                Err(PcapError::Incomplete(_)) => {
                    reader
                        .refill()
                        .map_err(|e| PcapSourceError::pcap("pcapng reader refill", e))?;
                }
                Err(e) => return Err(PcapSourceError::pcap("pcapng reader next", e)),
            },
        }
    }
}
