use crate::error::{ConfigError, RadarError};
use crate::radar::{CapturedFrame, Classifier, ETH_HLEN, RadarEvent};
use log::{debug, error, info, warn};
use pcap::{Active, Capture, Device, Error, Linktype};
use std::ops::ControlFlow;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// DNS responses come from port 53; the probes went out from ephemeral ports.
/// `udp` alone would also let IPv6 through.
pub const DNS_RESPONSE_FILTER: &str = "ip and udp and src port 53";

const SNAPLEN: i32 = 8192;
const READ_TIMEOUT_MS: i32 = 100;
const LINUX_SLL_HLEN: usize = 16;
// Some platforms report raw IP with its DLT value instead of LINKTYPE_RAW.
const DLT_RAW: i32 = 12;
/// A handle that fails this many reads in a row is treated as dead.
const MAX_CONSECUTIVE_READ_ERRORS: u32 = 10;
const READ_ERROR_BACKOFF: Duration = Duration::from_millis(100);

pub struct CaptureLoader;

impl CaptureLoader {
    pub fn list_interfaces() -> Result<Vec<Device>, RadarError> {
        Device::list().map_err(RadarError::DeviceLookup)
    }

    pub fn select_default_interface() -> Result<String, RadarError> {
        let devices = Self::list_interfaces()?;

        for device in &devices {
            if device.name == "any" {
                continue;
            }
            if !device.flags.is_loopback() && device.flags.is_up() && device.flags.is_running() {
                return Ok(device.name.clone());
            }
        }

        for device in &devices {
            if device.name != "any" && device.flags.is_up() {
                return Ok(device.name.clone());
            }
        }

        Err(ConfigError::NoDevice.into())
    }

    /// Open a live capture restricted to DNS responses. `None` picks the
    /// first usable interface.
    pub fn open(interface: Option<&str>) -> Result<CaptureSession, RadarError> {
        let interface = match interface {
            Some(name) => name.to_string(),
            None => Self::select_default_interface()?,
        };
        info!("Opening capture on interface: {interface}");

        let device = if interface == "any" {
            Device::from("any")
        } else {
            Self::list_interfaces()?
                .into_iter()
                .find(|d| d.name == interface)
                .ok_or_else(|| ConfigError::UnknownDevice(interface.clone()))?
        };

        let open_err = |source| RadarError::CaptureOpen {
            device: interface.clone(),
            source,
        };
        let mut cap = Capture::from_device(device)
            .map_err(open_err)?
            .promisc(true)
            .snaplen(SNAPLEN)
            .immediate_mode(true)
            .timeout(READ_TIMEOUT_MS)
            .open()
            .map_err(open_err)?;

        cap.filter(DNS_RESPONSE_FILTER, true)
            .map_err(|source| RadarError::Filter {
                filter: DNS_RESPONSE_FILTER,
                source,
            })?;

        let linktype = cap.get_datalink();
        let link_hlen =
            link_header_len(linktype).ok_or_else(|| RadarError::UnsupportedLinkType {
                device: interface.clone(),
                linktype: linktype.0,
            })?;
        debug!("Working on {interface} (link header {link_hlen} bytes)");

        Ok(CaptureSession {
            cap,
            interface,
            link_hlen,
        })
    }
}

fn link_header_len(linktype: Linktype) -> Option<usize> {
    if linktype == Linktype::ETHERNET {
        Some(ETH_HLEN)
    } else if linktype == Linktype::LINUX_SLL {
        Some(LINUX_SLL_HLEN)
    } else if linktype == Linktype::RAW || linktype.0 == DLT_RAW {
        Some(0)
    } else {
        None
    }
}

/// Frame counters of one capture loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureStats {
    pub frames: u64,
    pub decode_errors: u64,
    pub dropped_diagnostics: u64,
    pub read_errors: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadAction {
    Continue,
    Backoff,
    Stop,
}

/// Decides what the capture loop does after `next_packet` fails.
///
/// Timeouts are the normal idle case. Anything else counts toward the
/// consecutive error limit, which a successful read resets.
#[derive(Debug, Default)]
struct ReadErrors {
    consecutive: u32,
}

impl ReadErrors {
    fn on_packet(&mut self) {
        self.consecutive = 0;
    }

    fn on_error(&mut self, err: &Error) -> ReadAction {
        match err {
            Error::TimeoutExpired => ReadAction::Continue,
            Error::NoMorePackets => ReadAction::Stop,
            _ => {
                self.consecutive += 1;
                if self.consecutive >= MAX_CONSECUTIVE_READ_ERRORS {
                    ReadAction::Stop
                } else {
                    ReadAction::Backoff
                }
            }
        }
    }
}

pub struct CaptureSession {
    cap: Capture<Active>,
    interface: String,
    link_hlen: usize,
}

impl CaptureSession {
    pub fn interface(&self) -> &str {
        &self.interface
    }

    /// Bytes preceding the IPv4 header on this interface.
    pub fn link_header_len(&self) -> usize {
        self.link_hlen
    }

    /// Move the capture onto a blocking worker. Frames are classified one at
    /// a time in capture order and the results sent to `tx`.
    pub fn spawn(
        self,
        classifier: Classifier,
        tx: mpsc::Sender<RadarEvent>,
    ) -> (JoinHandle<CaptureStats>, CancellationToken) {
        let cancel_token = CancellationToken::new();
        let token_clone = cancel_token.clone();

        // The blocking reader can only poll a flag between reads.
        let should_stop = Arc::new(AtomicBool::new(false));
        let should_stop_clone = should_stop.clone();

        let mut cap = self.cap;
        let interface = self.interface;
        let handle = tokio::task::spawn_blocking(move || {
            let mut stats = CaptureStats::default();
            let mut read_errors = ReadErrors::default();
            while !should_stop_clone.load(Ordering::Relaxed) {
                match cap.next_packet() {
                    Ok(packet) => {
                        read_errors.on_packet();
                        let frame = CapturedFrame::new(packet.data, packet.header.len);
                        if dispatch(&classifier, &frame, &tx, &mut stats).is_break() {
                            info!("Channel closed, stopping capture");
                            break;
                        }
                    }
                    Err(Error::NoMorePackets) => {
                        info!("Capture on {interface} ended");
                        break;
                    }
                    Err(e) => match read_errors.on_error(&e) {
                        ReadAction::Continue => {}
                        ReadAction::Backoff => {
                            stats.read_errors += 1;
                            warn!("Error reading packet: {e}");
                            std::thread::sleep(READ_ERROR_BACKOFF);
                        }
                        ReadAction::Stop => {
                            stats.read_errors += 1;
                            error!(
                                "Giving up on {interface} after {MAX_CONSECUTIVE_READ_ERRORS} consecutive read errors: {e}"
                            );
                            break;
                        }
                    },
                }
            }
            info!(
                "Packet capture task terminated: {} frames, {} undecodable, {} diagnostics dropped, {} read errors",
                stats.frames, stats.decode_errors, stats.dropped_diagnostics, stats.read_errors
            );
            stats
        });

        let stop_handle = should_stop.clone();
        tokio::spawn(async move {
            token_clone.cancelled().await;
            stop_handle.store(true, Ordering::Relaxed);
        });

        (handle, cancel_token)
    }
}

/// Classify one frame and forward the result.
///
/// Matches wait for channel space; diagnostics are dropped when the reporter
/// falls behind. Breaks only once the receiver is gone.
fn dispatch(
    classifier: &Classifier,
    frame: &CapturedFrame<'_>,
    tx: &mpsc::Sender<RadarEvent>,
    stats: &mut CaptureStats,
) -> ControlFlow<()> {
    stats.frames += 1;

    let verdict = match classifier.process(frame) {
        Ok(verdict) => verdict,
        Err(e) => {
            stats.decode_errors += 1;
            debug!("Dropping frame: {e}");
            return ControlFlow::Continue(());
        }
    };

    match verdict.into_event() {
        event @ RadarEvent::Match(_) => {
            if tx.blocking_send(event).is_err() {
                return ControlFlow::Break(());
            }
        }
        event => match tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => stats.dropped_diagnostics += 1,
            Err(TrySendError::Closed(_)) => return ControlFlow::Break(()),
        },
    }

    ControlFlow::Continue(())
}
