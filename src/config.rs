use crate::cli::Args;
use crate::error::ConfigError;
use crate::radar::AmplificationClassifier;
use std::num::NonZeroU32;
use std::path::PathBuf;

/// Validated runtime settings. Built once before capture starts.
#[derive(Debug, Clone, PartialEq)]
pub struct RadarConfig {
    pub device: Option<String>,
    pub output_file: Option<PathBuf>,
    pub reporting_threshold: f64,
    pub probe_size: NonZeroU32,
    pub fingerprints: Option<PathBuf>,
    pub channel_capacity: usize,
}

impl RadarConfig {
    pub fn from_args(args: &Args) -> Result<Self, ConfigError> {
        let probe_size = args
            .probe_size
            .and_then(NonZeroU32::new)
            .ok_or(ConfigError::ZeroProbeSize)?;

        // Rejects NaN as well.
        if !(args.threshold.is_finite() && args.threshold >= 0.0) {
            return Err(ConfigError::InvalidThreshold(args.threshold));
        }

        if args.channel_capacity == 0 {
            return Err(ConfigError::ZeroChannelCapacity);
        }

        Ok(Self {
            device: args.interface.clone(),
            output_file: args.output.clone(),
            reporting_threshold: args.threshold,
            probe_size,
            fingerprints: args.fingerprints.clone(),
            channel_capacity: args.channel_capacity,
        })
    }

    pub fn amplification(&self) -> AmplificationClassifier {
        AmplificationClassifier::new(self.probe_size, self.reporting_threshold)
    }
}
