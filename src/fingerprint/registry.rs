use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::sync::RwLock;

use log::{debug, info};

use crate::error::ConfigError;

/// Identity of a probe: the UDP source port it was sent from and the DNS
/// transaction id a genuine reply will echo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProbeKey {
    pub port: u16,
    pub transaction_id: u16,
}

impl ProbeKey {
    pub fn new(port: u16, transaction_id: u16) -> Self {
        Self {
            port,
            transaction_id,
        }
    }
}

impl fmt::Display for ProbeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "port {} txid {:#06x}", self.port, self.transaction_id)
    }
}

/// Parses `"<port> <txid>"`; the txid may be decimal or `0x`-prefixed hex.
impl FromStr for ProbeKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut fields = s.split_whitespace();
        let (Some(port), Some(txid), None) = (fields.next(), fields.next(), fields.next()) else {
            return Err(format!("expected \"<port> <txid>\", got \"{s}\""));
        };

        let port = port
            .parse::<u16>()
            .map_err(|e| format!("invalid port \"{port}\": {e}"))?;
        let transaction_id = match txid
            .strip_prefix("0x")
            .or_else(|| txid.strip_prefix("0X"))
        {
            Some(hex) => u16::from_str_radix(hex, 16),
            None => txid.parse::<u16>(),
        }
        .map_err(|e| format!("invalid transaction id \"{txid}\": {e}"))?;

        Ok(Self::new(port, transaction_id))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("fingerprint registry unavailable: {0}")]
    Unavailable(String),
}

/// Read side of the probe registry, as seen by the classifier.
///
/// Implementations must tolerate lookups running concurrently with
/// whatever registers new probes.
pub trait FingerprintRegistry: Send + Sync {
    fn is_outstanding_probe(&self, key: ProbeKey) -> Result<bool, LookupError>;
}

#[derive(Debug, Default)]
pub struct MemoryRegistry {
    probes: RwLock<HashSet<ProbeKey>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if the probe was already registered.
    pub fn register(&self, key: ProbeKey) -> bool {
        let mut probes = match self.probes.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        probes.insert(key)
    }

    /// Forget a probe once it has been answered or has expired.
    pub fn retire(&self, key: ProbeKey) -> bool {
        let mut probes = match self.probes.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        probes.remove(&key)
    }

    pub fn len(&self) -> usize {
        let probes = match self.probes.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        probes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Load one `<port> <txid>` pair per line. Blank lines and `#` comments
    /// are skipped. Returns the number of newly registered probes.
    pub fn load_file(&self, path: &Path) -> Result<usize, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::FingerprintFile {
            path: path.to_path_buf(),
            source,
        })?;

        let mut added = 0;
        for (idx, raw) in contents.lines().enumerate() {
            let line = raw.split('#').next().unwrap_or_default().trim();
            if line.is_empty() {
                continue;
            }

            let key = line
                .parse::<ProbeKey>()
                .map_err(|detail| ConfigError::FingerprintEntry {
                    path: path.to_path_buf(),
                    line: idx + 1,
                    detail,
                })?;

            if self.register(key) {
                added += 1;
            } else {
                debug!("Duplicate fingerprint {key} at line {}", idx + 1);
            }
        }

        info!("Loaded {added} fingerprints from {}", path.display());
        Ok(added)
    }
}

impl FingerprintRegistry for MemoryRegistry {
    fn is_outstanding_probe(&self, key: ProbeKey) -> Result<bool, LookupError> {
        let probes = match self.probes.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        Ok(probes.contains(&key))
    }
}
