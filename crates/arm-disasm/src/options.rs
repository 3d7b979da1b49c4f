//! Formatter configuration (§4.M): `{ useBasicStyleHex, showOffsets,
//! useStackModesOnR13, allowFPA, allowThumb, modelMask }`, mirroring
//! `arm-system::Options`'s plain-config-struct convention.

/// Instruction-set variant, advisory only — `arm_cpu::decode` itself
/// accepts the union of every encoding, so this just gates which
/// mnemonics the CLI accepts via `-s`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchVariant {
    Armv2,
    Armv2a,
    Armv3,
    Armv3g,
    Armv4,
}

/// Formatter options (§4.M).
#[derive(Debug, Clone, Copy)]
pub struct Options {
    /// `&`-prefixed hex literals (`&DEAD`) instead of `0x`-prefixed, to
    /// match the assembler's own preferred spelling.
    pub use_basic_style_hex: bool,
    /// Append a `; 0x...` PC-relative-offset comment to branch/ADR lines.
    pub show_offsets: bool,
    /// Render `LDM`/`STM` with R13 as a base using the FD/FA/ED/EA stack
    /// mnemonics rather than the plain IA/IB/DA/DB directional ones.
    pub use_stack_modes_on_r13: bool,
    pub allow_fpa: bool,
    pub allow_thumb: bool,
    pub variant: ArchVariant,
    /// Bitmask of instruction classes the selected model supports; a word
    /// decoding outside the mask is a [`crate::DisassembleMiss`] rather
    /// than a formatted mnemonic. `0` disables the check.
    pub model_mask: u32,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            use_basic_style_hex: true,
            show_offsets: true,
            use_stack_modes_on_r13: false,
            allow_fpa: false,
            allow_thumb: false,
            variant: ArchVariant::Armv2,
            model_mask: 0,
        }
    }
}
