use std::io;
use std::path::PathBuf;

/// Startup failures. Anything here ends the process before capture begins.
#[derive(Debug, thiserror::Error)]
pub enum RadarError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("cannot enumerate capture devices: {0}")]
    DeviceLookup(#[source] pcap::Error),
    #[error("cannot open capture on {device}: {source}")]
    CaptureOpen {
        device: String,
        #[source]
        source: pcap::Error,
    },
    #[error("unsupported link type {linktype} on {device}")]
    UnsupportedLinkType { device: String, linktype: i32 },
    #[error("cannot install filter \"{filter}\": {source}")]
    Filter {
        filter: &'static str,
        #[source]
        source: pcap::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("probe size must be greater than zero")]
    ZeroProbeSize,
    #[error("reporting threshold must be a finite number >= 0, got {0}")]
    InvalidThreshold(f64),
    #[error("channel capacity must be greater than zero")]
    ZeroChannelCapacity,
    #[error("interface {0} not found")]
    UnknownDevice(String),
    #[error("no suitable network interface found")]
    NoDevice,
    #[error("cannot open result file {}: {source}", path.display())]
    OutputFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot read fingerprint file {}: {source}", path.display())]
    FingerprintFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{}:{line}: {detail}", path.display())]
    FingerprintEntry {
        path: PathBuf,
        line: usize,
        detail: String,
    },
}
