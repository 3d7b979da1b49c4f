//! `HostError` (§7): I/O failure, option inconsistency, unsupported
//! combination. Fatal to the operation that raised it — unlike a
//! `RuntimeAbort`, which the simulated machine handles itself.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    /// A debug-side memory access landed on an address no device claims.
    BusFault(String),
    /// Two mapped regions overlap, or a region's bounds are misaligned.
    MapConflict { base_addr: u32, size: u32 },
    /// The requested combination of options isn't buildable (e.g. a
    /// coprocessor extension without a handler wired in).
    InvalidOptions(String),
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BusFault(msg) => write!(f, "host error: {msg}"),
            Self::MapConflict { base_addr, size } => {
                write!(f, "host error: region at {base_addr:#010x} (size {size:#x}) overlaps an existing mapping")
            }
            Self::InvalidOptions(msg) => write!(f, "host error: invalid options: {msg}"),
        }
    }
}

impl std::error::Error for HostError {}
