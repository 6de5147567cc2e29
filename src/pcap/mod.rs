mod capture;

pub use capture::{CaptureLoader, CaptureSession, CaptureStats, DNS_RESPONSE_FILTER};
