use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use glob::glob;
use netpulse_core::{
    CaptureSession, Columns, DEFAULT_DURATION_S, DEFAULT_TOP, FilterSpec, HostnameCache,
    PacketSource, PcapFileSource, PortTable, Resolve, ServiceCache, SessionConfig,
    SystemDnsResolver, TrafficStats, build_filter, build_report, render_summary,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("NETPULSE_BUILD_COMMIT"),
    " ",
    env!("NETPULSE_BUILD_DATE"),
    ")"
);

const EXAMPLES: &str = "Examples:\n  netpulse pcap analyse capture.pcapng --size --service\n  netpulse pcap analyze 'dumps/*.pcap' --ip 10.0.0.1 --json report.json\n  netpulse live --device eth0 --time 60 --protocol tcp --port 443\n  netpulse filter --ip 10.0.0.1 --protocol tcp --port 80";

#[derive(Parser, Debug)]
#[command(name = "netpulse")]
#[command(version, long_version = LONG_VERSION)]
#[command(
    about = "Per-packet traffic listing with an end-of-capture summary.",
    long_about = None,
    after_help = EXAMPLES
)]
struct Cli {
    /// Enable debug logging on stderr (RUST_LOG overrides the default level)
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Operations on PCAP/PCAPNG inputs.
    Pcap {
        #[command(subcommand)]
        command: PcapCommands,
    },
    /// Capture from a network interface (requires the `live` feature).
    Live {
        /// Interface to capture on
        #[arg(short = 'd', long, default_value = "wlan0")]
        device: String,

        #[command(flatten)]
        capture: CaptureArgs,
    },
    /// Print the capture filter expression built from the given criteria.
    Filter {
        #[command(flatten)]
        filter: FilterArgs,
    },
}

#[derive(Subcommand, Debug)]
enum PcapCommands {
    /// Replay a capture file through the analyzer.
    #[command(alias = "analyze")]
    Analyse {
        /// Path (or glob matching exactly one file) to a .pcap or .pcapng capture
        input: PathBuf,

        #[command(flatten)]
        capture: CaptureArgs,
    },
}

#[derive(Args, Debug, Clone, Default)]
struct FilterArgs {
    /// Only traffic to or from this host
    #[arg(long)]
    ip: Option<String>,

    /// Only this protocol (tcp, udp, icmp, ...)
    #[arg(long)]
    protocol: Option<String>,

    /// Only traffic on this port (number or service name, e.g. 80 or http)
    #[arg(long)]
    port: Option<String>,
}

impl FilterArgs {
    fn spec(&self) -> FilterSpec {
        FilterSpec {
            host: self.ip.clone(),
            protocol: self.protocol.clone(),
            port: self.port.clone(),
        }
    }
}

#[derive(Args, Debug, Clone)]
struct CaptureArgs {
    #[command(flatten)]
    filter: FilterArgs,

    /// Capture duration in seconds
    #[arg(long = "time", default_value_t = DEFAULT_DURATION_S, value_parser = clap::value_parser!(u64).range(1..))]
    duration: u64,

    /// Port → service table (JSON object keyed by port number)
    #[arg(long, default_value = "data/ports.json")]
    ports: PathBuf,

    /// Show the frame size column
    #[arg(long)]
    size: bool,

    /// Show the service column
    #[arg(long)]
    service: bool,

    /// Resolve addresses to hostnames via reverse DNS
    #[arg(long)]
    resolve: bool,

    /// Length of the ranked source/destination lists in the summary
    #[arg(long, default_value_t = DEFAULT_TOP)]
    top: usize,

    /// Also write the summary as a JSON report to this path
    #[arg(long)]
    json: Option<PathBuf>,

    /// Write packet lines to this file instead of stdout
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Only print the summary
    #[arg(long)]
    quiet_packets: bool,
}

impl CaptureArgs {
    fn session_config(&self) -> SessionConfig {
        SessionConfig {
            duration_s: self.duration,
            filter: self.filter.spec(),
            columns: Columns {
                size: self.size,
                service: self.service,
                hostnames: self.resolve,
            },
            quiet_packets: self.quiet_packets,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Pcap { command } => match command {
            PcapCommands::Analyse { input, capture } => cmd_pcap_analyse(&input, &capture),
        },
        Commands::Live { device, capture } => cmd_live(&device, &capture),
        Commands::Filter { filter } => cmd_filter(&filter),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err.message);
            if let Some(hint) = err.hint {
                eprintln!("hint: {hint}");
            }
            ExitCode::from(2)
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(false),
        )
        .init();
}

#[derive(Debug)]
struct CliError {
    message: String,
    hint: Option<String>,
}

impl CliError {
    fn new(message: impl Into<String>, hint: Option<String>) -> Self {
        Self {
            message: message.into(),
            hint,
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        CliError::new(format!("{err:#}"), None)
    }
}

fn cmd_pcap_analyse(input: &Path, capture: &CaptureArgs) -> Result<(), CliError> {
    let resolved = resolve_input_path(input)?;
    validate_input_file(&resolved)?;
    check_output_paths(&resolved, capture)?;

    let mut source = PcapFileSource::open(&resolved)
        .with_context(|| format!("Failed to open capture: {}", resolved.display()))?;
    info!(input = %resolved.display(), "replaying capture file");
    run_capture(&mut source, capture)
}

#[cfg(feature = "live")]
fn cmd_live(device: &str, capture: &CaptureArgs) -> Result<(), CliError> {
    let mut source = netpulse_core::LiveSource::open(device).map_err(|err| {
        CliError::new(
            format!("cannot open device '{device}': {err}"),
            Some("check the interface name and capture permissions (root or CAP_NET_RAW)".to_string()),
        )
    })?;
    info!(device, "capturing live traffic");
    run_capture(&mut source, capture)
}

#[cfg(not(feature = "live"))]
fn cmd_live(device: &str, _capture: &CaptureArgs) -> Result<(), CliError> {
    Err(CliError::new(
        format!("live capture on '{device}' is not available in this build"),
        Some("rebuild with --features live (requires libpcap)".to_string()),
    ))
}

fn cmd_filter(filter: &FilterArgs) -> Result<(), CliError> {
    println!(
        "{}",
        build_filter(
            filter.ip.as_deref().unwrap_or(""),
            filter.protocol.as_deref().unwrap_or(""),
            filter.port.as_deref().unwrap_or(""),
        )
    );
    Ok(())
}

fn run_capture<S: PacketSource>(source: &mut S, capture: &CaptureArgs) -> Result<(), CliError> {
    let config = capture.session_config();
    let expression = config.filter.expression();
    let services = ServiceCache::new(PortTable::load_or_empty(&capture.ports));

    let stats = if capture.resolve {
        let hostnames = HostnameCache::new(SystemDnsResolver::from_system_conf());
        let session = CaptureSession::new(config, services).with_hostnames(hostnames);
        drive(session, source, capture.output.as_deref())?
    } else {
        drive(
            CaptureSession::new(config, services),
            source,
            capture.output.as_deref(),
        )?
    };

    print!("{}", render_summary(&stats, capture.top));

    if let Some(path) = capture.json.as_ref() {
        write_report(path, &stats, &expression, capture.top)?;
    }
    Ok(())
}

fn drive<SR, DR, S>(
    mut session: CaptureSession<SR, DR>,
    source: &mut S,
    output: Option<&Path>,
) -> Result<TrafficStats, CliError>
where
    SR: Resolve<u16, String>,
    DR: Resolve<String, String>,
    S: PacketSource,
{
    match output {
        Some(path) => {
            create_parent_dir(path)?;
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            let mut out = BufWriter::new(file);
            session.run(source, &mut out).context("capture failed")?;
            debug!(output = %path.display(), "packet lines written");
        }
        None => {
            let mut out = io::stdout().lock();
            session.run(source, &mut out).context("capture failed")?;
        }
    }
    Ok(session.finish())
}

fn write_report(path: &Path, stats: &TrafficStats, filter: &str, top: usize) -> Result<(), CliError> {
    let report = build_report(stats, filter, top);
    let json = serde_json::to_string_pretty(&report).context("JSON serialization failed")?;
    create_parent_dir(path)?;
    fs::write(path, json)
        .with_context(|| format!("Failed to write report: {}", path.display()))?;
    info!(report = %path.display(), "report written");
    Ok(())
}

fn create_parent_dir(path: &Path) -> Result<(), CliError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create output directory: {}", parent.display())
            })?;
        }
    }
    Ok(())
}

/// Reject output paths that would overwrite the capture being read.
fn check_output_paths(input: &Path, capture: &CaptureArgs) -> Result<(), CliError> {
    let input_abs = fs::canonicalize(input)
        .with_context(|| format!("Failed to resolve input path: {}", input.display()))?;
    for path in [capture.output.as_ref(), capture.json.as_ref()]
        .into_iter()
        .flatten()
    {
        if fs::canonicalize(path).is_ok_and(|target| target == input_abs) {
            return Err(CliError::new(
                format!("output path must differ from input: {}", path.display()),
                Some("choose a different output path".to_string()),
            ));
        }
    }
    Ok(())
}

fn validate_input_file(input: &Path) -> Result<(), CliError> {
    if !input.exists() {
        return Err(CliError::new(
            format!("input file not found: {}", input.display()),
            Some("use a .pcap or .pcapng file".to_string()),
        ));
    }
    if !input.is_file() {
        return Err(CliError::new(
            format!("input is not a file: {}", input.display()),
            Some("use a .pcap or .pcapng file".to_string()),
        ));
    }
    let ext = input
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    if ext != "pcap" && ext != "pcapng" {
        return Err(CliError::new(
            format!("unsupported input format '{}'", input.display()),
            Some("expected a .pcap or .pcapng file".to_string()),
        ));
    }
    Ok(())
}

fn resolve_input_path(input: &Path) -> Result<PathBuf, CliError> {
    let pattern = input.to_string_lossy();
    if !is_glob_pattern(&pattern) {
        return Ok(input.to_path_buf());
    }

    let paths = glob(&pattern).map_err(|err| {
        CliError::new(
            format!("invalid input pattern '{pattern}'"),
            Some(format!("pattern error: {}", err.msg)),
        )
    })?;
    let mut matches = Vec::new();
    for entry in paths {
        let path = entry.map_err(|err| {
            CliError::new(
                format!("invalid input pattern '{pattern}'"),
                Some(format!("pattern error: {err}")),
            )
        })?;
        if path.is_file() {
            matches.push(path);
        }
    }

    match matches.len() {
        0 => Err(CliError::new(
            format!("no files match pattern '{pattern}'"),
            Some("check the path or quote the pattern; expected .pcap or .pcapng".to_string()),
        )),
        1 => Ok(matches.remove(0)),
        count => {
            let mut listed = matches
                .iter()
                .take(3)
                .map(|path| path.display().to_string())
                .collect::<Vec<_>>()
                .join(", ");
            if count > 3 {
                listed.push_str(", ...");
            }
            Err(CliError::new(
                format!("multiple files match pattern '{pattern}' ({count} matches); matches: {listed}"),
                Some("pass a single capture file, or run once per file".to_string()),
            ))
        }
    }
}

fn is_glob_pattern(input: &str) -> bool {
    input.contains('*') || input.contains('?') || input.contains('[')
}
