use std::num::NonZeroU32;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmplificationVerdict {
    pub ratio: f64,
    pub meets_threshold: bool,
}

/// Compares response wire sizes against the size of the probe that was sent.
///
/// Both values come from validated configuration; a zero probe size cannot
/// be expressed here.
#[derive(Debug, Clone, Copy)]
pub struct AmplificationClassifier {
    probe_size: NonZeroU32,
    threshold: f64,
}

impl AmplificationClassifier {
    pub fn new(probe_size: NonZeroU32, threshold: f64) -> Self {
        Self {
            probe_size,
            threshold,
        }
    }

    pub fn ratio(&self, wire_len: u32) -> f64 {
        f64::from(wire_len) / f64::from(self.probe_size.get())
    }

    pub fn classify(&self, wire_len: u32) -> AmplificationVerdict {
        let ratio = self.ratio(wire_len);
        AmplificationVerdict {
            ratio,
            meets_threshold: ratio >= self.threshold,
        }
    }
}
