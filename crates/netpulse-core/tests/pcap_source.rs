mod common;

use std::fs;

use common::{
    Frame, LINKTYPE_ETHERNET, LINKTYPE_RAW, raw_udp_frame, sample_frames, write_pcap, write_pcapng,
    write_pcapng_nanosecond,
};
use netpulse_core::{
    PacketEvent, PacketSource, PcapFileSource, Protocol, SourceError, SourcePoll, decode_frame,
};
use pcap_parser::Linktype;
use tempfile::TempDir;

fn drain(source: &mut PcapFileSource) -> Vec<PacketEvent> {
    let mut events = Vec::new();
    while let Some(event) = source.next_packet().expect("next packet") {
        events.push(event);
    }
    events
}

#[test]
fn legacy_pcap_yields_every_frame_in_order() {
    let temp = TempDir::new().expect("tempdir");
    let path = temp.path().join("capture.pcap");
    let frames = sample_frames();
    write_pcap(&path, LINKTYPE_ETHERNET, &frames);

    let mut source = PcapFileSource::open(&path).expect("open pcap");
    let events = drain(&mut source);

    assert_eq!(events.len(), frames.len());
    for (event, frame) in events.iter().zip(&frames) {
        assert_eq!(event.linktype, Linktype::ETHERNET);
        assert_eq!(event.data, frame.data);
        assert_eq!(event.wire_len, frame.orig_len);
    }
    assert_eq!(events[0].ts, Some(1.0));
    assert_eq!(events[2].ts, Some(2.5));
}

#[test]
fn pcapng_yields_every_frame() {
    let temp = TempDir::new().expect("tempdir");
    let path = temp.path().join("capture.pcapng");
    let frames = sample_frames();
    write_pcapng(&path, &frames);

    let mut source = PcapFileSource::open(&path).expect("open pcapng");
    let events = drain(&mut source);

    assert_eq!(events.len(), frames.len());
    let record = decode_frame(events[1].linktype, &events[1].data, events[1].wire_len);
    assert_eq!(record.src_addr, "10.0.0.2");
    assert_eq!(record.protocol, Protocol::Udp);
    assert_eq!(record.src_port, 53);
    assert!(events[0].ts.is_some_and(|ts| (ts - 1.0).abs() < 1e-9));
}

#[test]
fn pcapng_honours_interface_timestamp_resolution() {
    let temp = TempDir::new().expect("tempdir");
    let path = temp.path().join("nanos.pcapng");
    write_pcapng_nanosecond(&path, &sample_frames());

    let mut source = PcapFileSource::open(&path).expect("open pcapng");
    let stamps: Vec<f64> = drain(&mut source)
        .iter()
        .map(|event| event.ts.expect("timestamp"))
        .collect();

    assert_eq!(stamps.len(), 3);
    for (ts, expected) in stamps.iter().zip([1.0, 1.25, 2.5]) {
        assert!((ts - expected).abs() < 1e-9, "{ts} != {expected}");
    }
}

#[test]
fn wire_length_comes_from_original_length() {
    let temp = TempDir::new().expect("tempdir");
    let path = temp.path().join("snapped.pcap");
    let data = raw_udp_frame([192, 168, 1, 10], [192, 168, 1, 1], 5000, 53);
    write_pcap(&path, LINKTYPE_RAW, &[Frame::truncated(0, data, 1400)]);

    let mut source = PcapFileSource::open(&path).expect("open pcap");
    let events = drain(&mut source);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].linktype, Linktype::RAW);

    let record = decode_frame(events[0].linktype, &events[0].data, events[0].wire_len);
    assert_eq!(record.length, 1400);
    assert_eq!(record.dst_addr, "192.168.1.1");
    assert_eq!(record.dst_port, 53);
}

#[test]
fn exhausted_source_polls_end() {
    let temp = TempDir::new().expect("tempdir");
    let path = temp.path().join("empty.pcap");
    write_pcap(&path, LINKTYPE_ETHERNET, &[]);

    let mut source = PcapFileSource::open(&path).expect("open pcap");
    assert!(matches!(source.poll_packet(), Ok(SourcePoll::End)));
}

#[test]
fn offline_source_rejects_filters() {
    let temp = TempDir::new().expect("tempdir");
    let path = temp.path().join("capture.pcap");
    write_pcap(&path, LINKTYPE_ETHERNET, &sample_frames());

    let mut source = PcapFileSource::open(&path).expect("open pcap");
    assert!(matches!(
        source.apply_filter("tcp and port 80"),
        Err(SourceError::FilterUnsupported)
    ));
    assert_eq!(drain(&mut source).len(), 3);
}

#[test]
fn truncated_file_is_rejected() {
    let temp = TempDir::new().expect("tempdir");
    let path = temp.path().join("truncated.pcapng");
    fs::write(&path, [0x0a, 0x0d, 0x0d]).expect("write");

    let err = match PcapFileSource::open(&path) {
        Ok(_) => panic!("expected truncated file to be rejected"),
        Err(err) => err,
    };
    assert!(matches!(err, SourceError::Io(_)));
}

#[test]
fn missing_file_is_an_io_error() {
    let temp = TempDir::new().expect("tempdir");
    let result = PcapFileSource::open(&temp.path().join("absent.pcap"));
    assert!(matches!(result, Err(SourceError::Io(_))));
}
