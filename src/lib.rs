//! Passive detection of DNS resolvers that amplify replies to our probes.
//!
//! Frames captured from source port 53 are classified one at a time: IPv4
//! fragments are reported and skipped, complete responses are sized against
//! the probe that was sent, and qualifying ones are correlated with the
//! outstanding probes held by a [`fingerprint::FingerprintRegistry`].

pub mod cli;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod pcap;
pub mod radar;
pub mod report;
