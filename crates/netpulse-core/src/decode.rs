use etherparse::{IpNumber, NetSlice, SlicedPacket, TransportSlice};
use pcap_parser::Linktype;
use tracing::debug;

use crate::{NO_ADDRESS, PacketRecord, Protocol};

/// Decode a captured frame into a packet record.
///
/// Only addresses, the IP protocol number and TCP/UDP ports are extracted.
/// Frames without a decodable network layer (ARP, unsupported link types,
/// truncated headers) still produce a record, with [`NO_ADDRESS`] addresses
/// and [`Protocol::Unknown`], so every captured frame is counted.
pub fn decode_frame(linktype: Linktype, data: &[u8], wire_len: u32) -> PacketRecord {
    let mut record = PacketRecord {
        src_addr: NO_ADDRESS.to_string(),
        dst_addr: NO_ADDRESS.to_string(),
        protocol: Protocol::Unknown,
        src_port: 0,
        dst_port: 0,
        length: u64::from(wire_len),
    };

    let sliced = match linktype {
        Linktype::ETHERNET => SlicedPacket::from_ethernet(data),
        Linktype::RAW | Linktype::IPV4 | Linktype::IPV6 => SlicedPacket::from_ip(data),
        other => {
            debug!(linktype = other.0, "unsupported link type");
            return record;
        }
    };
    let sliced = match sliced {
        Ok(sliced) => sliced,
        Err(err) => {
            debug!(%err, "frame could not be sliced");
            return record;
        }
    };
    let Some(net) = sliced.net.as_ref() else {
        return record;
    };

    let (src_addr, dst_addr) = match net {
        NetSlice::Ipv4(ipv4) => (
            ipv4.header().source_addr().to_string(),
            ipv4.header().destination_addr().to_string(),
        ),
        NetSlice::Ipv6(ipv6) => (
            ipv6.header().source_addr().to_string(),
            ipv6.header().destination_addr().to_string(),
        ),
    };
    record.src_addr = src_addr;
    record.dst_addr = dst_addr;

    let ip_number = net.ip_payload_ref().map(|payload| payload.ip_number);
    record.protocol = match ip_number {
        Some(IpNumber::TCP) => Protocol::Tcp,
        Some(IpNumber::UDP) => Protocol::Udp,
        Some(number) => Protocol::Other(number.0),
        None => Protocol::Unknown,
    };

    match sliced.transport {
        Some(TransportSlice::Tcp(tcp)) => {
            record.src_port = tcp.source_port();
            record.dst_port = tcp.destination_port();
        }
        Some(TransportSlice::Udp(udp)) => {
            record.src_port = udp.source_port();
            record.dst_port = udp.destination_port();
        }
        _ => {}
    }

    record
}

/// Short names for the IP protocols that commonly show up next to TCP and
/// UDP.
pub(crate) fn ip_protocol_name(number: u8) -> Option<&'static str> {
    let name = match number {
        1 => "ICMP",
        2 => "IGMP",
        4 => "IPIP",
        6 => "TCP",
        17 => "UDP",
        41 => "IPv6",
        47 => "GRE",
        50 => "ESP",
        51 => "AH",
        58 => "ICMPv6",
        89 => "OSPF",
        103 => "PIM",
        112 => "VRRP",
        132 => "SCTP",
        _ => return None,
    };
    Some(name)
}
