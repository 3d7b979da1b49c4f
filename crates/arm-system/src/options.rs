//! Build-time machine configuration (§4.H `installOption`): a plain config
//! struct with a `Default` impl, no `serde`.

use arm_cpu::AddressMode;

/// Instruction-set variant the host decodes against. `arm-cpu`'s decoder
/// itself is variant-agnostic (it accepts the union of ARM2 through ARMv4
/// encodings), so this is advisory metadata a front end can use to reject
/// instructions outside the selected variant rather than a second decode
/// path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchVariant {
    Armv2,
    Armv2a,
    Armv3,
    Armv3g,
    Armv4,
}

/// Coprocessor extensions a host may wire in before running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Extensions {
    pub fpa: bool,
    pub vfp_v1: bool,
    pub thumb_decode_hint: bool,
}

/// Configuration for constructing a [`crate::Host`].
#[derive(Debug, Clone, Copy)]
pub struct Options {
    pub variant: ArchVariant,
    pub address_mode: AddressMode,
    pub extensions: Extensions,
    /// Reject CPU-visible unaligned halfword/word accesses instead of the
    /// ARM2/ARM3-class rotate-on-read behaviour. Recorded here as part of
    /// the configuration surface; `arm-cpu`'s data transfer path is
    /// currently always ARM2/ARM3-style rotate-on-read, so this flag is
    /// not yet consulted by [`crate::Host::step`].
    pub strict_alignment: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            variant: ArchVariant::Armv2,
            address_mode: AddressMode::Bit26,
            extensions: Extensions::default(),
            strict_alignment: false,
        }
    }
}
