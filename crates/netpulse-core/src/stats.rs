//! Running traffic statistics.
//!
//! [`TrafficStats`] is the single-writer aggregate for one capture session.
//! It only changes through [`TrafficStats::update`]; everything else is a
//! read-only projection. Rankings break ties on the key so output is stable
//! across runs regardless of hash map iteration order.

use std::collections::HashMap;

use crate::{ClassifiedRecord, KeyCount, Protocol};

/// Address → packet count.
pub type FrequencyTable = HashMap<String, u64>;

const KIB: f64 = 1024.0;
const BYTE_UNITS: [&str; 3] = ["KiB", "MiB", "GiB"];

#[derive(Debug, Clone, Default)]
pub struct TrafficStats {
    total_packets: u64,
    total_bytes: u64,
    tcp_packets: u64,
    udp_packets: u64,
    other_packets: u64,
    src_counts: FrequencyTable,
    dst_counts: FrequencyTable,
    duration_s: u64,
    elapsed_s: f64,
    first_ts: Option<f64>,
    last_ts: Option<f64>,
}

impl TrafficStats {
    /// Empty statistics for a session configured to run `duration_s` seconds.
    pub fn new(duration_s: u64) -> Self {
        Self {
            duration_s,
            ..Self::default()
        }
    }

    /// Fold one packet into the counters and frequency tables.
    pub fn update(&mut self, classified: &ClassifiedRecord) {
        let record = &classified.record;
        self.total_packets += 1;
        self.total_bytes += record.length;
        match record.protocol {
            Protocol::Tcp => self.tcp_packets += 1,
            Protocol::Udp => self.udp_packets += 1,
            Protocol::Other(_) | Protocol::Unknown => self.other_packets += 1,
        }
        *self.src_counts.entry(record.src_addr.clone()).or_insert(0) += 1;
        *self.dst_counts.entry(record.dst_addr.clone()).or_insert(0) += 1;
    }

    /// Track the capture timestamps of the first and last packet.
    pub(crate) fn observe_timestamp(&mut self, ts: Option<f64>) {
        let Some(ts) = ts else {
            return;
        };
        if self.first_ts.is_none_or(|first| ts < first) {
            self.first_ts = Some(ts);
        }
        if self.last_ts.is_none_or(|last| ts > last) {
            self.last_ts = Some(ts);
        }
    }

    pub(crate) fn set_elapsed(&mut self, elapsed_s: f64) {
        self.elapsed_s = elapsed_s;
    }

    pub fn total_packets(&self) -> u64 {
        self.total_packets
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn tcp_packets(&self) -> u64 {
        self.tcp_packets
    }

    pub fn udp_packets(&self) -> u64 {
        self.udp_packets
    }

    /// Packets that were neither TCP nor UDP, including undecodable frames.
    pub fn other_packets(&self) -> u64 {
        self.other_packets
    }

    pub fn source_counts(&self) -> &FrequencyTable {
        &self.src_counts
    }

    pub fn destination_counts(&self) -> &FrequencyTable {
        &self.dst_counts
    }

    pub fn unique_sources(&self) -> usize {
        self.src_counts.len()
    }

    pub fn unique_destinations(&self) -> usize {
        self.dst_counts.len()
    }

    /// Configured capture duration in seconds.
    pub fn duration_s(&self) -> u64 {
        self.duration_s
    }

    /// Wall-clock seconds the session ran; zero until it finishes.
    pub fn elapsed_s(&self) -> f64 {
        self.elapsed_s
    }

    pub fn first_ts(&self) -> Option<f64> {
        self.first_ts
    }

    pub fn last_ts(&self) -> Option<f64> {
        self.last_ts
    }

    /// Packets per second over `duration_s`, or 0.0 for a zero duration.
    pub fn average_rate(&self, duration_s: u64) -> f64 {
        if duration_s == 0 {
            return 0.0;
        }
        self.total_packets as f64 / duration_s as f64
    }

    pub fn most_active_source(&self) -> Option<KeyCount> {
        most_active(&self.src_counts)
    }

    pub fn most_active_destination(&self) -> Option<KeyCount> {
        most_active(&self.dst_counts)
    }
}

/// `100 * count / total`, defined as 0.0 when `total` is zero.
///
/// # Examples
/// ```
/// use netpulse_core::percent_of;
///
/// assert_eq!(percent_of(1, 4), 25.0);
/// assert_eq!(percent_of(7, 0), 0.0);
/// ```
pub fn percent_of(count: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    100.0 * count as f64 / total as f64
}

/// The entry with the highest count; ties go to the smallest key.
pub fn most_active(table: &FrequencyTable) -> Option<KeyCount> {
    table
        .iter()
        .min_by(|(a_key, a_count), (b_key, b_count)| {
            b_count.cmp(a_count).then_with(|| a_key.cmp(b_key))
        })
        .map(|(key, count)| KeyCount::new(key.clone(), *count))
}

/// Up to `n` entries ordered by count descending, then key ascending.
pub fn top_n(table: &FrequencyTable, n: usize) -> Vec<KeyCount> {
    if n == 0 {
        return Vec::new();
    }
    let mut entries: Vec<KeyCount> = table
        .iter()
        .map(|(key, count)| KeyCount::new(key.clone(), *count))
        .collect();
    entries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key)));
    entries.truncate(n);
    entries
}

/// Render a byte total in the largest binary unit where it is at least 1.
///
/// The unit is picked on the value as printed, so a total just short of
/// 1 MiB reads `1.00 MiB` rather than `1024.00 KiB`.
///
/// # Examples
/// ```
/// use netpulse_core::format_byte_size;
///
/// assert_eq!(format_byte_size(1023), "1023 B");
/// assert_eq!(format_byte_size(1536), "1.50 KiB");
/// assert_eq!(format_byte_size(1024 * 1024 - 1), "1.00 MiB");
/// ```
pub fn format_byte_size(total: u64) -> String {
    if total < 1024 {
        return format!("{total} B");
    }
    let mut value = total as f64 / KIB;
    let mut unit = BYTE_UNITS[0];
    for next in &BYTE_UNITS[1..] {
        if round_to_hundredths(value) < KIB {
            break;
        }
        value /= KIB;
        unit = next;
    }
    format!("{value:.2} {unit}")
}

fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
