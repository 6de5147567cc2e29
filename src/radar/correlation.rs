use log::debug;

use super::frame::{DnsHeaderPrefixView, UdpHeaderView};
use crate::fingerprint::{FingerprintRegistry, ProbeKey};

/// Outcome of matching a response to the probes we sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Correlation {
    Outstanding,
    Unknown,
    /// The registry could not answer; handled as a non-match.
    LookupFailed,
}

/// The response's destination port is the source port the probe left from.
pub fn probe_key(udp: &UdpHeaderView<'_>, dns: &DnsHeaderPrefixView<'_>) -> ProbeKey {
    ProbeKey::new(udp.dest_port(), dns.transaction_id())
}

pub fn correlate<R>(registry: &R, key: ProbeKey) -> Correlation
where
    R: FingerprintRegistry + ?Sized,
{
    match registry.is_outstanding_probe(key) {
        Ok(true) => Correlation::Outstanding,
        Ok(false) => Correlation::Unknown,
        Err(e) => {
            debug!("Fingerprint lookup for {key} failed: {e}");
            Correlation::LookupFailed
        }
    }
}
