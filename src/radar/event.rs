use chrono::{DateTime, Local};
use std::fmt;
use std::net::Ipv4Addr;

/// Why a complete response did not produce a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Miss {
    BelowThreshold,
    UnknownProbe,
    LookupFailed,
}

impl fmt::Display for Miss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::BelowThreshold => "ratio below threshold",
            Self::UnknownProbe => "no outstanding probe",
            Self::LookupFailed => "fingerprint lookup failed",
        };
        f.write_str(reason)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    Fragment,
    LastFragment,
    NonMatching(Miss),
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fragment => f.write_str("fragment observed"),
            Self::LastFragment => f.write_str("last fragment observed"),
            Self::NonMatching(miss) => write!(f, "non-matching response ({miss})"),
        }
    }
}

/// A response that qualified on size and answered one of our probes.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchEvent {
    pub source: Ipv4Addr,
    pub ratio: f64,
    pub observed_at: DateTime<Local>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RadarEvent {
    Match(MatchEvent),
    Diagnostic {
        kind: DiagnosticKind,
        source: Ipv4Addr,
    },
}
