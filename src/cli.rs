use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "dns-amp-radar")]
#[command(about = "Detect amplifying DNS resolvers by watching replies to sent probes", long_about = None)]
pub struct Args {
    /// Capture interface; picks the first active one when omitted
    #[arg(short, long)]
    pub interface: Option<String>,

    /// Append the address of every matching resolver to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Minimum amplification ratio before a response is correlated
    #[arg(short, long, default_value_t = 0.0)]
    pub threshold: f64,

    /// Size in bytes of the probe frames that were sent
    #[arg(short, long, required_unless_present = "list_interfaces")]
    pub probe_size: Option<u32>,

    /// File of outstanding probes, one "<port> <txid>" per line
    #[arg(short, long)]
    pub fingerprints: Option<PathBuf>,

    #[arg(short, long, default_value = "info")]
    pub log_level: String,

    /// Shorthand for --log-level debug
    #[arg(short, long)]
    pub verbose: bool,

    #[arg(long, default_value_t = 10000)]
    pub channel_capacity: usize,

    #[arg(long)]
    pub list_interfaces: bool,
}

impl Args {
    pub fn log_filter(&self) -> &str {
        if self.verbose {
            "debug"
        } else {
            self.log_level.as_str()
        }
    }
}
