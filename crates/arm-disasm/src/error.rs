//! §7 `DisassembleMiss`: a bit pattern that doesn't decode in the selected
//! model. `arm_cpu::decode` is total (it never refuses a word), so the
//! miss only fires for the handful of patterns the architecture itself
//! reserves as undefined — the caller gets raw bytes back instead of a
//! misleading mnemonic.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisassembleMiss {
    pub word: u32,
}

impl fmt::Display for DisassembleMiss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x} does not decode to a defined instruction", self.word)
    }
}

impl std::error::Error for DisassembleMiss {}
