//! Per-profile SSH plumbing: key pairs, host-alias blocks and the login probe.

pub mod config;
pub mod keys;
pub mod probe;

pub use config::{BlockWrite, ManagedBlock, SshConfigDocument, SshConfigEditor};
pub use keys::{FileRemoval, KeyPairs, KeyRemoval, SshKeygen};
pub use probe::{ConnectionProbe, ProbeOutcome, SshProbe};
