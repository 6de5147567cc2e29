use chrono::Local;
use std::net::Ipv4Addr;
use std::sync::Arc;

use super::amplification::AmplificationClassifier;
use super::correlation::{self, Correlation};
use super::event::{DiagnosticKind, MatchEvent, Miss, RadarEvent};
use super::fragment::{self, FragmentState};
use super::frame::{CapturedFrame, DecodeError, decode};
use crate::fingerprint::FingerprintRegistry;

/// Per-frame classification result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Verdict {
    /// First/middle or last fragment. No ratio, no lookup.
    Fragment {
        state: FragmentState,
        source: Ipv4Addr,
    },
    Match {
        source: Ipv4Addr,
        ratio: f64,
    },
    NonMatching {
        source: Ipv4Addr,
        ratio: f64,
        miss: Miss,
    },
}

impl Verdict {
    pub fn ratio(&self) -> Option<f64> {
        match *self {
            Self::Fragment { .. } => None,
            Self::Match { ratio, .. } | Self::NonMatching { ratio, .. } => Some(ratio),
        }
    }

    pub fn into_event(self) -> RadarEvent {
        match self {
            Self::Fragment { state, source } => {
                let kind = match state {
                    FragmentState::LastFragment => DiagnosticKind::LastFragment,
                    _ => DiagnosticKind::Fragment,
                };
                RadarEvent::Diagnostic { kind, source }
            }
            Self::Match { source, ratio } => RadarEvent::Match(MatchEvent {
                source,
                ratio,
                observed_at: Local::now(),
            }),
            Self::NonMatching { source, miss, .. } => RadarEvent::Diagnostic {
                kind: DiagnosticKind::NonMatching(miss),
                source,
            },
        }
    }
}

/// Runs decode, fragment check, ratio and correlation for one frame.
///
/// Holds no per-frame state; the same bytes always produce the same verdict
/// for a given registry content.
#[derive(Clone)]
pub struct Classifier {
    amplification: AmplificationClassifier,
    registry: Arc<dyn FingerprintRegistry>,
    link_hlen: usize,
}

impl Classifier {
    pub fn new(
        amplification: AmplificationClassifier,
        registry: Arc<dyn FingerprintRegistry>,
        link_hlen: usize,
    ) -> Self {
        Self {
            amplification,
            registry,
            link_hlen,
        }
    }

    pub fn process(&self, frame: &CapturedFrame<'_>) -> Result<Verdict, DecodeError> {
        let decoded = decode(frame, self.link_hlen)?;
        let source = decoded.ip.source();

        let state = fragment::classify(&decoded.ip);
        if state.is_fragment() {
            return Ok(Verdict::Fragment { state, source });
        }

        let verdict = self.amplification.classify(frame.wire_len);
        if !verdict.meets_threshold {
            return Ok(Verdict::NonMatching {
                source,
                ratio: verdict.ratio,
                miss: Miss::BelowThreshold,
            });
        }

        let key = correlation::probe_key(&decoded.udp, &decoded.dns);
        let ratio = verdict.ratio;
        Ok(match correlation::correlate(self.registry.as_ref(), key) {
            Correlation::Outstanding => Verdict::Match { source, ratio },
            Correlation::Unknown => Verdict::NonMatching {
                source,
                ratio,
                miss: Miss::UnknownProbe,
            },
            Correlation::LookupFailed => Verdict::NonMatching {
                source,
                ratio,
                miss: Miss::LookupFailed,
            },
        })
    }
}
