use crate::cache::{Resolve, ServiceCache, UNKNOWN_SERVICE};
use crate::{ClassifiedRecord, PacketRecord};

/// Attach a service label to a decoded record.
///
/// The source port wins when it maps to a known service; otherwise the
/// destination port is tried. This is a plain heuristic, not protocol aware:
/// an ephemeral source port that happens to be in the table beats a
/// well-known destination port.
pub fn classify<R>(record: PacketRecord, services: &mut ServiceCache<R>) -> ClassifiedRecord
where
    R: Resolve<u16, String>,
{
    let service = [record.src_port, record.dst_port]
        .into_iter()
        .map(|port| services.get(port).clone())
        .find(|service| service != UNKNOWN_SERVICE)
        .unwrap_or_else(|| UNKNOWN_SERVICE.to_string());

    ClassifiedRecord {
        record,
        service,
        hostnames: None,
    }
}

#[cfg(test)]
mod tests {
    use super::classify;
    use crate::cache::{PortTable, ServiceCache, UNKNOWN_SERVICE};
    use crate::{PacketRecord, Protocol};

    fn record(src_port: u16, dst_port: u16) -> PacketRecord {
        PacketRecord {
            src_addr: "10.0.0.1".to_string(),
            dst_addr: "10.0.0.2".to_string(),
            protocol: Protocol::Tcp,
            src_port,
            dst_port,
            length: 60,
        }
    }

    fn services() -> ServiceCache {
        ServiceCache::new(PortTable::from_iter([
            (22, "ssh".to_string()),
            (80, "http".to_string()),
        ]))
    }

    #[test]
    fn falls_back_to_destination_port() {
        let mut cache = services();
        let classified = classify(record(1234, 80), &mut cache);
        assert_eq!(classified.service, "http");
        assert_eq!(classified.record.dst_port, 80);
    }

    #[test]
    fn source_port_takes_precedence() {
        let mut cache = services();
        assert_eq!(classify(record(22, 80), &mut cache).service, "ssh");
    }

    #[test]
    fn unmapped_ports_are_unknown() {
        let mut cache = services();
        assert_eq!(classify(record(40000, 40001), &mut cache).service, UNKNOWN_SERVICE);
    }

    #[test]
    fn lookups_are_memoized_across_records() {
        let mut cache = services();
        for _ in 0..5 {
            classify(record(1234, 80), &mut cache);
        }
        assert_eq!(cache.len(), 2);
    }
}
