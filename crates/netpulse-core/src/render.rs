//! Text rendering for the console report.
//!
//! Everything here is a pure projection of records and statistics into
//! strings: no I/O, no mutation. Column order is fixed (source, destination,
//! protocol, source port, destination port, then the optional size, service
//! and hostname columns); widths are cosmetic.

use std::fmt::Write;

use crate::stats::{TrafficStats, format_byte_size, percent_of, top_n};
use crate::{ClassifiedRecord, KeyCount};

/// Optional columns of the per-packet line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Columns {
    pub size: bool,
    pub service: bool,
    pub hostnames: bool,
}

const ADDR_WIDTH: usize = 15;
const PROTO_WIDTH: usize = 8;
const PORT_WIDTH: usize = 10;
const SIZE_WIDTH: usize = 8;
const SERVICE_WIDTH: usize = 12;
const HOST_WIDTH: usize = 30;

pub fn render_header(columns: Columns) -> String {
    let mut line = format!(
        "{:<ADDR_WIDTH$}  {:<ADDR_WIDTH$}  {:<PROTO_WIDTH$}  {:<PORT_WIDTH$}  {:<PORT_WIDTH$}",
        "src IP", "dest IP", "protocol", "src port", "dest port"
    );
    if columns.size {
        let _ = write!(line, "  {:<SIZE_WIDTH$}", "size");
    }
    if columns.service {
        let _ = write!(line, "  {:<SERVICE_WIDTH$}", "service");
    }
    if columns.hostnames {
        let _ = write!(line, "  {:<HOST_WIDTH$}  {:<HOST_WIDTH$}", "src host", "dest host");
    }
    line.trim_end().to_string()
}

pub fn render_line(classified: &ClassifiedRecord, columns: Columns) -> String {
    let record = &classified.record;
    let mut line = format!(
        "{:<ADDR_WIDTH$}  {:<ADDR_WIDTH$}  {:<PROTO_WIDTH$}  {:<PORT_WIDTH$}  {:<PORT_WIDTH$}",
        record.src_addr,
        record.dst_addr,
        record.protocol.to_string(),
        record.src_port,
        record.dst_port
    );
    if columns.size {
        let _ = write!(line, "  {:<SIZE_WIDTH$}", format_length(record.length));
    }
    if columns.service {
        let _ = write!(line, "  {:<SERVICE_WIDTH$}", classified.service);
    }
    if columns.hostnames {
        let (src_host, dst_host) = match &classified.hostnames {
            Some((src, dst)) => (src.as_str(), dst.as_str()),
            None => (record.src_addr.as_str(), record.dst_addr.as_str()),
        };
        let _ = write!(line, "  {src_host:<HOST_WIDTH$}  {dst_host:<HOST_WIDTH$}");
    }
    line.trim_end().to_string()
}

/// Compact a frame length for the size column: the raw byte count below
/// 1024, kibibytes with one decimal and a `K` suffix from 1024 up.
///
/// # Examples
/// ```
/// use netpulse_core::format_length;
///
/// assert_eq!(format_length(1023), "1023");
/// assert_eq!(format_length(1536), "1.5K");
/// ```
pub fn format_length(length: u64) -> String {
    if length < 1024 {
        length.to_string()
    } else {
        format!("{:.1}K", length as f64 / 1024.0)
    }
}

/// Multi-line end-of-capture summary.
///
/// `top` controls the ranked source/destination lists; zero leaves them out
/// and only the most active entries are shown.
pub fn render_summary(stats: &TrafficStats, top: usize) -> String {
    let total = stats.total_packets();
    let mut out = String::new();

    let _ = writeln!(out);
    let _ = writeln!(out, "=== Capture Summary ===");
    let _ = writeln!(out, "Total packets captured  : {total}");
    let _ = writeln!(out, "Capture duration        : {}s", stats.duration_s());
    let _ = writeln!(
        out,
        "Average rate            : {:.1} packets/s",
        stats.average_rate(stats.duration_s())
    );
    let _ = writeln!(out, "Unique source IPs       : {}", stats.unique_sources());
    let _ = writeln!(out, "Unique destination IPs  : {}", stats.unique_destinations());
    let _ = writeln!(out, "Protocol breakdown");
    for (label, count) in [
        ("TCP  ", stats.tcp_packets()),
        ("UDP  ", stats.udp_packets()),
        ("other", stats.other_packets()),
    ] {
        let _ = writeln!(
            out,
            "   {label} : {count} packets ({:.1}%)",
            percent_of(count, total)
        );
    }
    let _ = writeln!(
        out,
        "Most active source      : {}",
        describe(stats.most_active_source())
    );
    let _ = writeln!(
        out,
        "Most active destination : {}",
        describe(stats.most_active_destination())
    );
    if top > 0 {
        write_ranking(&mut out, "Top sources", &top_n(stats.source_counts(), top));
        write_ranking(
            &mut out,
            "Top destinations",
            &top_n(stats.destination_counts(), top),
        );
    }
    let _ = writeln!(
        out,
        "Total traffic           : {}",
        format_byte_size(stats.total_bytes())
    );
    out
}

fn describe(entry: Option<KeyCount>) -> String {
    match entry {
        Some(entry) => format!("{} ({} packets)", entry.key, entry.count),
        None => "none".to_string(),
    }
}

fn write_ranking(out: &mut String, title: &str, entries: &[KeyCount]) {
    let _ = writeln!(out, "{title}");
    if entries.is_empty() {
        let _ = writeln!(out, "   none");
    }
    for (rank, entry) in entries.iter().enumerate() {
        let _ = writeln!(out, "   {}. {} ({} packets)", rank + 1, entry.key, entry.count);
    }
}

#[cfg(test)]
mod tests {
    use super::{Columns, format_length, render_header, render_line, render_summary};
    use crate::stats::TrafficStats;
    use crate::{ClassifiedRecord, PacketRecord, Protocol};

    fn classified(src: &str, dst: &str, protocol: Protocol, length: u64) -> ClassifiedRecord {
        ClassifiedRecord {
            record: PacketRecord {
                src_addr: src.to_string(),
                dst_addr: dst.to_string(),
                protocol,
                src_port: 51000,
                dst_port: 80,
                length,
            },
            service: "http".to_string(),
            hostnames: None,
        }
    }

    #[test]
    fn header_lists_enabled_columns_in_order() {
        let plain = render_header(Columns::default());
        assert!(plain.starts_with("src IP"));
        assert!(plain.ends_with("dest port"));

        let full = render_header(Columns {
            size: true,
            service: true,
            hostnames: true,
        });
        let size = full.find("size").unwrap();
        let service = full.find("service").unwrap();
        let host = full.find("src host").unwrap();
        assert!(full.find("dest port").unwrap() < size);
        assert!(size < service && service < host);
    }

    #[test]
    fn line_renders_fields_in_column_order() {
        let record = classified("10.0.0.1", "10.0.0.2", Protocol::Tcp, 2048);
        let line = render_line(
            &record,
            Columns {
                size: true,
                service: true,
                hostnames: false,
            },
        );
        let fields: Vec<&str> = line.split_whitespace().collect();
        assert_eq!(
            fields,
            vec!["10.0.0.1", "10.0.0.2", "TCP", "51000", "80", "2.0K", "http"]
        );
    }

    #[test]
    fn hostnames_fall_back_to_addresses() {
        let mut record = classified("10.0.0.1", "10.0.0.2", Protocol::Udp, 10);
        let columns = Columns {
            hostnames: true,
            ..Columns::default()
        };
        let fields: Vec<String> = render_line(&record, columns)
            .split_whitespace()
            .map(str::to_string)
            .collect();
        assert_eq!(fields[5..], ["10.0.0.1", "10.0.0.2"]);

        record.hostnames = Some(("gw.lan".to_string(), "10.0.0.2".to_string()));
        let fields: Vec<String> = render_line(&record, columns)
            .split_whitespace()
            .map(str::to_string)
            .collect();
        assert_eq!(fields[5], "gw.lan");
    }

    #[test]
    fn length_compaction_threshold() {
        assert_eq!(format_length(0), "0");
        assert_eq!(format_length(1023), "1023");
        assert_eq!(format_length(1024), "1.0K");
        assert_eq!(format_length(9000), "8.8K");
    }

    #[test]
    fn summary_of_empty_capture_does_not_divide_by_zero() {
        let stats = TrafficStats::new(30);
        let summary = render_summary(&stats, 3);
        assert!(summary.contains("Total packets captured  : 0"));
        assert!(summary.contains("TCP   : 0 packets (0.0%)"));
        assert!(summary.contains("Most active source      : none"));
        assert!(summary.contains("Top sources\n   none"));
        assert!(summary.contains("Total traffic           : 0 B"));
        assert!(!summary.contains("NaN"));
    }

    #[test]
    fn summary_reports_breakdown_and_rankings() {
        let mut stats = TrafficStats::new(30);
        stats.update(&classified("A", "B", Protocol::Tcp, 100));
        stats.update(&classified("A", "C", Protocol::Udp, 50));
        stats.update(&classified("B", "A", Protocol::Tcp, 200));

        let summary = render_summary(&stats, 2);
        assert!(summary.contains("Total packets captured  : 3"));
        assert!(summary.contains("Average rate            : 0.1 packets/s"));
        assert!(summary.contains("TCP   : 2 packets (66.7%)"));
        assert!(summary.contains("UDP   : 1 packets (33.3%)"));
        assert!(summary.contains("Most active source      : A (2 packets)"));
        assert!(summary.contains("Top sources\n   1. A (2 packets)\n   2. B (1 packets)"));
        assert!(summary.contains("Total traffic           : 350 B"));

        let without_top = render_summary(&stats, 0);
        assert!(!without_top.contains("Top sources"));
    }
}
