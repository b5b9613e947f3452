use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::stats::{TrafficStats, format_byte_size, percent_of, top_n};
use crate::{CaptureReport, ProtocolShare, REPORT_VERSION, ToolInfo};

/// Snapshot final statistics into a serializable report.
///
/// `filter` is the expression that was handed to the source (empty when
/// nothing was filtered); `top` bounds the ranked address lists.
///
/// # Examples
/// ```
/// use netpulse_core::{TrafficStats, build_report};
///
/// let report = build_report(&TrafficStats::new(30), "", 3);
/// assert_eq!(report.packets_total, 0);
/// assert_eq!(report.protocols[0].percent, 0.0);
/// ```
pub fn build_report(stats: &TrafficStats, filter: &str, top: usize) -> CaptureReport {
    let total = stats.total_packets();
    let protocols = [
        ("tcp", stats.tcp_packets()),
        ("udp", stats.udp_packets()),
        ("other", stats.other_packets()),
    ]
    .into_iter()
    .map(|(protocol, packets)| ProtocolShare {
        protocol: protocol.to_string(),
        packets,
        percent: percent_of(packets, total),
    })
    .collect();

    CaptureReport {
        report_version: REPORT_VERSION,
        tool: ToolInfo {
            name: "netpulse".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        filter: filter.to_string(),
        duration_s: stats.duration_s(),
        elapsed_s: stats.elapsed_s(),
        time_start: ts_to_rfc3339(stats.first_ts()),
        time_end: ts_to_rfc3339(stats.last_ts()),
        packets_total: total,
        bytes_total: stats.total_bytes(),
        bytes_human: format_byte_size(stats.total_bytes()),
        average_rate: stats.average_rate(stats.duration_s()),
        unique_sources: stats.unique_sources(),
        unique_destinations: stats.unique_destinations(),
        protocols,
        top_sources: top_n(stats.source_counts(), top),
        top_destinations: top_n(stats.destination_counts(), top),
    }
}

fn ts_to_rfc3339(ts: Option<f64>) -> Option<String> {
    let ts = ts?;
    let nanos = (ts * 1_000_000_000.0) as i128;
    OffsetDateTime::from_unix_timestamp_nanos(nanos)
        .ok()
        .and_then(|dt| dt.format(&Rfc3339).ok())
}
