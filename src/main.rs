use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use dns_amp_radar::cli::Args;
use dns_amp_radar::config::RadarConfig;
use dns_amp_radar::fingerprint::MemoryRegistry;
use dns_amp_radar::pcap::{CaptureLoader, DNS_RESPONSE_FILTER};
use dns_amp_radar::radar::Classifier;
use dns_amp_radar::report::Reporter;
use log::{info, warn};
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.list_interfaces {
        let interfaces = CaptureLoader::list_interfaces()?;
        println!("Available network interfaces:");
        for device in interfaces {
            let status = if device.flags.is_up() { "UP" } else { "DOWN" };
            let running = if device.flags.is_running() {
                "RUNNING"
            } else {
                ""
            };
            let loopback = if device.flags.is_loopback() {
                "LOOPBACK"
            } else {
                ""
            };

            println!("  {} [{}] {} {}", device.name, status, running, loopback);

            if let Some(desc) = device.desc {
                println!("    Description: {desc}");
            }
        }
        return Ok(());
    }

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(args.log_filter()))
        .init();

    let config = RadarConfig::from_args(&args)?;

    let registry = Arc::new(MemoryRegistry::new());
    if let Some(ref path) = config.fingerprints {
        registry.load_file(path)?;
    }
    if registry.is_empty() {
        warn!("No outstanding probes registered; nothing can match");
    }

    info!("Starting DNS amplification radar");
    info!(
        "Probe size: {} bytes, reporting threshold: {}",
        config.probe_size, config.reporting_threshold
    );

    let session = CaptureLoader::open(config.device.as_deref())
        .context("Failed to set up packet capture")?;
    info!(
        "Capture started on interface: {} (filter \"{}\")",
        session.interface(),
        DNS_RESPONSE_FILTER
    );

    let classifier = Classifier::new(
        config.amplification(),
        registry,
        session.link_header_len(),
    );

    let (tx, rx) = mpsc::channel(config.channel_capacity);
    let reporter = Reporter::new(rx, config.output_file.as_deref())?;
    let reporter_handle = tokio::task::spawn_blocking(move || reporter.run());

    let (mut capture_handle, cancel_token) = session.spawn(classifier, tx);

    // The capture worker owns the only sender; once it exits the reporter
    // drains the channel and returns.
    let stats = tokio::select! {
        res = tokio::signal::ctrl_c() => {
            res.context("Failed to listen for ctrl-c")?;
            info!("Interrupted, stopping capture...");
            cancel_token.cancel();
            capture_handle.await.context("Capture task panicked")?
        }
        res = &mut capture_handle => res.context("Capture task panicked")?,
    };
    let summary = reporter_handle.await.context("Reporter task panicked")?;

    info!(
        "DNS amplification radar stopped: {} frames seen, {} matches",
        stats.frames, summary.matches
    );
    Ok(())
}
