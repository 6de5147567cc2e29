mod registry;

pub use registry::{FingerprintRegistry, LookupError, MemoryRegistry, ProbeKey};
