pub mod amplification;
pub mod correlation;
mod event;
pub mod fragment;
pub mod frame;
mod pipeline;

pub use amplification::{AmplificationClassifier, AmplificationVerdict};
pub use event::{DiagnosticKind, MatchEvent, Miss, RadarEvent};
pub use fragment::FragmentState;
pub use frame::{CapturedFrame, DecodeError, ETH_HLEN};
pub use pipeline::{Classifier, Verdict};
