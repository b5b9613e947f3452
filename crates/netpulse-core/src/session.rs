//! Capture session: the single owner of statistics and caches.
//!
//! A session pulls frames from a [`PacketSource`], decodes and classifies
//! them, folds them into [`TrafficStats`] and writes one rendered line per
//! packet. It stops when the source is exhausted or when the configured
//! duration has elapsed, checked after every packet (and on every idle poll
//! of a live source). [`CaptureSession::finish`] consumes the session, so no
//! update can follow the final report.

use std::io::Write;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::cache::{HostnameCache, Resolve, ServiceCache, SystemDnsResolver};
use crate::classify::classify;
use crate::decode::decode_frame;
use crate::filter::FilterSpec;
use crate::render::{Columns, render_header, render_line};
use crate::source::{PacketSource, SourceError, SourcePoll};
use crate::stats::TrafficStats;
use crate::{ClassifiedRecord, PacketRecord};

/// Default capture duration in seconds.
pub const DEFAULT_DURATION_S: u64 = 30;
/// Default length of the ranked source/destination lists.
pub const DEFAULT_TOP: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Capture duration in seconds; the session stops once it is exceeded.
    pub duration_s: u64,
    pub filter: FilterSpec,
    pub columns: Columns,
    /// Suppress the header and per-packet lines.
    pub quiet_packets: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            duration_s: DEFAULT_DURATION_S,
            filter: FilterSpec::default(),
            columns: Columns::default(),
            quiet_packets: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("capture source failed: {0}")]
    Source(#[from] SourceError),
    #[error("cannot write packet line: {0}")]
    Output(#[from] std::io::Error),
}

pub struct CaptureSession<SR, DR = SystemDnsResolver> {
    config: SessionConfig,
    services: ServiceCache<SR>,
    hostnames: Option<HostnameCache<DR>>,
    stats: TrafficStats,
    started: Instant,
}

impl<SR> CaptureSession<SR, SystemDnsResolver>
where
    SR: Resolve<u16, String>,
{
    pub fn new(config: SessionConfig, services: ServiceCache<SR>) -> Self {
        let stats = TrafficStats::new(config.duration_s);
        Self {
            config,
            services,
            hostnames: None,
            stats,
            started: Instant::now(),
        }
    }
}

impl<SR, DR> CaptureSession<SR, DR>
where
    SR: Resolve<u16, String>,
    DR: Resolve<String, String>,
{
    /// Enable reverse-DNS enrichment of both addresses.
    pub fn with_hostnames<R>(self, hostnames: HostnameCache<R>) -> CaptureSession<SR, R>
    where
        R: Resolve<String, String>,
    {
        CaptureSession {
            config: self.config,
            services: self.services,
            hostnames: Some(hostnames),
            stats: self.stats,
            started: self.started,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Read-only view of the running statistics.
    pub fn stats(&self) -> &TrafficStats {
        &self.stats
    }

    pub fn services(&self) -> &ServiceCache<SR> {
        &self.services
    }

    pub fn hostnames(&self) -> Option<&HostnameCache<DR>> {
        self.hostnames.as_ref()
    }

    /// Classify one record, enrich it and fold it into the statistics.
    pub fn process(&mut self, record: PacketRecord) -> ClassifiedRecord {
        let mut classified = classify(record, &mut self.services);
        if let Some(cache) = self.hostnames.as_mut() {
            let src = cache.get(classified.record.src_addr.clone()).clone();
            let dst = cache.get(classified.record.dst_addr.clone()).clone();
            classified.hostnames = Some((src, dst));
        }
        self.stats.update(&classified);
        classified
    }

    /// Install the configured filter on the source. A source that cannot
    /// filter is not fatal; the capture then sees all traffic.
    pub fn install_filter<S: PacketSource>(&self, source: &mut S) -> Result<(), SessionError> {
        let expression = self.config.filter.expression();
        if expression.is_empty() {
            return Ok(());
        }
        match source.apply_filter(&expression) {
            Ok(()) => {
                info!(filter = %expression, "capture filter installed");
                Ok(())
            }
            Err(SourceError::FilterUnsupported) => {
                warn!(filter = %expression, "source cannot apply filters, capturing everything");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Drive the source until it ends or the duration elapses, writing the
    /// header and one line per packet to `out`.
    pub fn run<S, W>(&mut self, source: &mut S, out: &mut W) -> Result<(), SessionError>
    where
        S: PacketSource,
        W: Write,
    {
        self.install_filter(source)?;
        let limit = Duration::from_secs(self.config.duration_s);
        self.started = Instant::now();
        info!(duration_s = self.config.duration_s, "capture started");

        if !self.config.quiet_packets {
            writeln!(out, "{}", render_header(self.config.columns))?;
        }

        loop {
            match source.poll_packet()? {
                SourcePoll::Packet(event) => {
                    self.stats.observe_timestamp(event.ts);
                    let record = decode_frame(event.linktype, &event.data, event.wire_len);
                    let classified = self.process(record);
                    if !self.config.quiet_packets {
                        writeln!(out, "{}", render_line(&classified, self.config.columns))?;
                    }
                }
                SourcePoll::Idle => {}
                SourcePoll::End => {
                    debug!("capture source exhausted");
                    break;
                }
            }
            if self.started.elapsed() > limit {
                debug!("capture duration elapsed");
                break;
            }
        }

        out.flush()?;
        info!(
            packets = self.stats.total_packets(),
            bytes = self.stats.total_bytes(),
            "capture stopped"
        );
        Ok(())
    }

    /// Freeze the session and hand back its final statistics.
    pub fn finish(mut self) -> TrafficStats {
        self.stats.set_elapsed(self.started.elapsed().as_secs_f64());
        debug!(
            services = self.services.len(),
            hostnames = self.hostnames.as_ref().map_or(0, |cache| cache.len()),
            "lookup caches at session end"
        );
        self.stats
    }
}
