//! The banked register file (§4.D).
//!
//! Modelled as a flat array of physical registers plus a per-mode index
//! table, per the Design Notes: `read(i, mode)` becomes an index lookup,
//! never a class hierarchy per mode.

/// Processor mode. The four legacy values (`User`, `Fiq`, `Irq`,
/// `Supervisor`) exist in both 26-bit and 32-bit architectures; `Abort`,
/// `Undefined` and `System` only exist from ARMv3/v4 in 32-bit mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    User,
    Fiq,
    Irq,
    Supervisor,
    Abort,
    Undefined,
    System,
}

impl Mode {
    /// The 5-bit mode field used in the 32-bit CPSR.
    #[must_use]
    pub const fn psr32_bits(self) -> u32 {
        match self {
            Self::User => 0b10000,
            Self::Fiq => 0b10001,
            Self::Irq => 0b10010,
            Self::Supervisor => 0b10011,
            Self::Abort => 0b10111,
            Self::Undefined => 0b11011,
            Self::System => 0b11111,
        }
    }

    /// Decode a 5-bit CPSR mode field. Unrecognised patterns map to
    /// `Undefined`, which is how real ARMs treat a reserved mode value.
    #[must_use]
    pub const fn from_psr32_bits(bits: u32) -> Self {
        match bits & 0x1F {
            0b10000 => Self::User,
            0b10001 => Self::Fiq,
            0b10010 => Self::Irq,
            0b10011 => Self::Supervisor,
            0b10111 => Self::Abort,
            0b11111 => Self::System,
            _ => Self::Undefined,
        }
    }

    /// The 2-bit mode field used in a 26-bit-mode R15. Only the four
    /// legacy modes are representable.
    #[must_use]
    pub const fn psr26_bits(self) -> Option<u32> {
        match self {
            Self::User => Some(0b00),
            Self::Fiq => Some(0b01),
            Self::Irq => Some(0b10),
            Self::Supervisor => Some(0b11),
            Self::Abort | Self::Undefined | Self::System => None,
        }
    }

    #[must_use]
    pub const fn from_psr26_bits(bits: u32) -> Self {
        match bits & 0b11 {
            0b00 => Self::User,
            0b01 => Self::Fiq,
            0b10 => Self::Irq,
            _ => Self::Supervisor,
        }
    }

    /// Does this mode have its own banked R13/R14 (and, for FIQ, R8-R12)?
    #[must_use]
    pub const fn is_privileged(self) -> bool {
        !matches!(self, Self::User)
    }

    /// Does this mode own an SPSR? User and System share CPSR only.
    #[must_use]
    pub const fn has_spsr(self) -> bool {
        !matches!(self, Self::User | Self::System)
    }

    const fn r13_r14_bank(self) -> usize {
        match self {
            Self::User | Self::System => 0,
            Self::Fiq => 1,
            Self::Irq => 2,
            Self::Supervisor => 3,
            Self::Abort => 4,
            Self::Undefined => 5,
        }
    }

    const fn spsr_bank(self) -> Option<usize> {
        match self {
            Self::Fiq => Some(0),
            Self::Irq => Some(1),
            Self::Supervisor => Some(2),
            Self::Abort => Some(3),
            Self::Undefined => Some(4),
            Self::User | Self::System => None,
        }
    }
}

/// The condition-code flags plus interrupt masks and mode that make up a
/// full PSR. Kept unpacked; `to_bits`/`from_bits` handle the 32-bit layout,
/// `registers::pack_psr26`/`unpack_psr26` the 26-bit one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Psr {
    pub n: bool,
    pub z: bool,
    pub c: bool,
    pub v: bool,
    pub i: bool,
    pub f: bool,
    pub t: bool,
    pub mode: Mode,
}

impl Psr {
    #[must_use]
    pub const fn reset() -> Self {
        Self { n: false, z: false, c: false, v: false, i: true, f: true, t: false, mode: Mode::Supervisor }
    }

    #[must_use]
    pub const fn to_bits(self) -> u32 {
        let mut v = self.mode.psr32_bits();
        if self.t {
            v |= 1 << 5;
        }
        if self.f {
            v |= 1 << 6;
        }
        if self.i {
            v |= 1 << 7;
        }
        if self.v {
            v |= 1 << 28;
        }
        if self.c {
            v |= 1 << 29;
        }
        if self.z {
            v |= 1 << 30;
        }
        if self.n {
            v |= 1 << 31;
        }
        v
    }

    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self {
            n: bits & (1 << 31) != 0,
            z: bits & (1 << 30) != 0,
            c: bits & (1 << 29) != 0,
            v: bits & (1 << 28) != 0,
            i: bits & (1 << 7) != 0,
            f: bits & (1 << 6) != 0,
            t: bits & (1 << 5) != 0,
            mode: Mode::from_psr32_bits(bits),
        }
    }

    /// Replace only the bits selected by a PSR transfer field mask
    /// (§4.F `MoveToPSR`'s `{flags, status, extension, control}`).
    #[must_use]
    pub fn with_masked_bits(self, bits: u32, mask: u32) -> Self {
        Self::from_bits((self.to_bits() & !mask) | (bits & mask))
    }
}

/// Field masks for `MSR`/`MRS`-style PSR transfers.
pub mod psr_field {
    /// Bits 31-24: condition flags (N Z C V + reserved).
    pub const FLAGS: u32 = 0xFF00_0000;
    /// Bits 7-0: control (mode, T, I, F) — the only writable field pre-v4
    /// without the extension/status split, kept for completeness.
    pub const CONTROL: u32 = 0x0000_00FF;
    pub const STATUS: u32 = 0x0000_FF00;
    pub const EXTENSION: u32 = 0x00FF_0000;
    pub const ALL: u32 = 0xFFFF_FFFF;
}

/// Pack flags + mode + a 26-bit word-aligned PC into the legacy R15 layout:
/// `N Z C V I F [PC 25:2] M1 M0`.
#[must_use]
pub fn pack_psr26(psr: Psr, pc: u32) -> u32 {
    let mut v = (pc & 0x03FF_FFFC) | psr.mode.psr26_bits().unwrap_or(0);
    if psr.i {
        v |= 1 << 27;
    }
    if psr.f {
        v |= 1 << 26;
    }
    if psr.v {
        v |= 1 << 28;
    }
    if psr.c {
        v |= 1 << 29;
    }
    if psr.z {
        v |= 1 << 30;
    }
    if psr.n {
        v |= 1 << 31;
    }
    v
}

/// Unpack a legacy R15 value into its flag/mode component and its 26-bit
/// word-aligned PC component.
#[must_use]
pub fn unpack_psr26(value: u32) -> (Psr, u32) {
    let psr = Psr {
        n: value & (1 << 31) != 0,
        z: value & (1 << 30) != 0,
        c: value & (1 << 29) != 0,
        v: value & (1 << 28) != 0,
        i: value & (1 << 27) != 0,
        f: value & (1 << 26) != 0,
        t: false,
        mode: Mode::from_psr26_bits(value),
    };
    (psr, value & 0x03FF_FFFC)
}

/// Whether the system is operating in 26-bit or 32-bit address mode
/// (§3 Register file: "26-bit vs 32-bit PC semantics").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressMode {
    Bit26,
    Bit32,
}

/// The banked ARM register file: 16 GPRs per mode view, banked FIQ R8-R12,
/// banked R13/R14 per privileged mode, one SPSR per privileged mode.
pub struct RegisterFile {
    r0_7: [u32; 8],
    r8_12_common: [u32; 5],
    r8_12_fiq: [u32; 5],
    r13_14: [[u32; 2]; 6],
    spsr: [Psr; 5],
    pc: u32,
    cpsr: Psr,
    pub address_mode: AddressMode,
}

impl RegisterFile {
    #[must_use]
    pub fn new(address_mode: AddressMode) -> Self {
        Self {
            r0_7: [0; 8],
            r8_12_common: [0; 5],
            r8_12_fiq: [0; 5],
            r13_14: [[0; 2]; 6],
            spsr: [Psr::reset(); 5],
            pc: 0,
            cpsr: Psr::reset(),
            address_mode,
        }
    }

    #[must_use]
    pub const fn cpsr(&self) -> Psr {
        self.cpsr
    }

    pub fn set_cpsr(&mut self, psr: Psr) {
        self.cpsr = psr;
    }

    #[must_use]
    pub fn spsr(&self, mode: Mode) -> Option<Psr> {
        mode.spsr_bank().map(|b| self.spsr[b])
    }

    pub fn set_spsr(&mut self, mode: Mode, psr: Psr) {
        if let Some(b) = mode.spsr_bank() {
            self.spsr[b] = psr;
        }
    }

    /// Raw fetch address: the real PC, word-aligned, with no prefetch
    /// offset applied. Used by the run loop to know what to fetch next.
    #[must_use]
    pub const fn fetch_pc(&self) -> u32 {
        self.pc
    }

    /// Set the raw fetch address directly (reset, exception vector entry,
    /// taken branch target).
    pub fn set_fetch_pc(&mut self, addr: u32) {
        self.pc = addr & !0b11;
    }

    /// Read a register for the *current* mode recorded in the CPSR.
    #[must_use]
    pub fn read(&self, reg: u8) -> u32 {
        self.read_in(reg, self.cpsr.mode)
    }

    /// Read a register as it is banked for `mode`. Reading R15 returns the
    /// architectural PC — current instruction address + 8, reflecting the
    /// ARM prefetch — packed with flags/mode in 26-bit address mode.
    #[must_use]
    pub fn read_in(&self, reg: u8, mode: Mode) -> u32 {
        match reg {
            0..=7 => self.r0_7[reg as usize],
            8..=12 => {
                if mode == Mode::Fiq {
                    self.r8_12_fiq[reg as usize - 8]
                } else {
                    self.r8_12_common[reg as usize - 8]
                }
            }
            13 | 14 => self.r13_14[mode.r13_r14_bank()][reg as usize - 13],
            15 => {
                let pc_plus_prefetch = self.pc.wrapping_add(8);
                match self.address_mode {
                    AddressMode::Bit32 => pc_plus_prefetch,
                    AddressMode::Bit26 => pack_psr26(self.cpsr, pc_plus_prefetch),
                }
            }
            _ => unreachable!("register index out of range: {reg}"),
        }
    }

    /// Write a register banked for the current mode. Writing R15 this way
    /// is address-only: in 26-bit mode the flag/mode bits of the CPSR are
    /// left untouched even if `value` carries different bits in that
    /// position, per the invariant in §3.
    pub fn write(&mut self, reg: u8, value: u32) {
        self.write_in(reg, self.cpsr.mode, value);
    }

    pub fn write_in(&mut self, reg: u8, mode: Mode, value: u32) {
        match reg {
            0..=7 => self.r0_7[reg as usize] = value,
            8..=12 => {
                if mode == Mode::Fiq {
                    self.r8_12_fiq[reg as usize - 8] = value;
                } else {
                    self.r8_12_common[reg as usize - 8] = value;
                }
            }
            13 | 14 => self.r13_14[mode.r13_r14_bank()][reg as usize - 13] = value,
            15 => self.pc = value & !0b11,
            _ => unreachable!("register index out of range: {reg}"),
        }
    }

    /// A PSR-transferring write to R15 (the pre-v4 behaviour of an S-bit
    /// ALU op writing Rd==R15 in 26-bit mode): unpacks both the new PC and
    /// the new flags/mode from one packed value.
    pub fn write_pc_with_psr26(&mut self, value: u32) {
        let (psr, pc) = unpack_psr26(value);
        self.cpsr = psr;
        self.pc = pc;
    }

    /// Bank R13/R14 (and R8-R12 if entering FIQ) and copy CPSR into the
    /// new mode's SPSR, for exception entry (§4.D `enterMode`).
    pub fn enter_mode(&mut self, new_mode: Mode, return_addr: u32) {
        let old_cpsr = self.cpsr;
        self.cpsr.mode = new_mode;
        self.set_spsr(new_mode, old_cpsr);
        self.write_in(14, new_mode, return_addr);
    }

    /// Restore CPSR from the current mode's SPSR and return to whatever
    /// mode that represents (§4.D `returnFromException`).
    pub fn return_from_exception(&mut self) {
        if let Some(spsr) = self.spsr(self.cpsr.mode) {
            self.cpsr = spsr;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn psr26_round_trips() {
        let psr = Psr { n: true, z: false, c: true, v: false, i: true, f: false, t: false, mode: Mode::Irq };
        let packed = pack_psr26(psr, 0x0000_1234);
        let (unpacked, pc) = unpack_psr26(packed);
        assert_eq!(pc, 0x0000_1234);
        assert_eq!(unpacked.mode, Mode::Irq);
        assert!(unpacked.n && unpacked.c && unpacked.i && !unpacked.z && !unpacked.f);
    }

    #[test]
    fn psr32_round_trips() {
        let psr = Psr { n: false, z: true, c: true, v: true, i: false, f: true, t: true, mode: Mode::Abort };
        assert_eq!(Psr::from_bits(psr.to_bits()), psr);
    }

    #[test]
    fn fiq_banks_r8_to_r12() {
        let mut regs = RegisterFile::new(AddressMode::Bit32);
        regs.write_in(8, Mode::User, 0x1111_1111);
        regs.write_in(8, Mode::Fiq, 0x2222_2222);
        assert_eq!(regs.read_in(8, Mode::User), 0x1111_1111);
        assert_eq!(regs.read_in(8, Mode::Fiq), 0x2222_2222);
    }

    #[test]
    fn pc_read_reflects_prefetch_offset() {
        let mut regs = RegisterFile::new(AddressMode::Bit32);
        regs.set_fetch_pc(0x8000);
        assert_eq!(regs.read(15), 0x8008);
    }

    #[test]
    fn entering_and_leaving_a_mode_restores_registers_bit_exactly() {
        let mut regs = RegisterFile::new(AddressMode::Bit32);
        regs.write_in(13, Mode::Supervisor, 0xAAAA_AAAA);
        let snapshot_r13 = regs.read_in(13, Mode::Supervisor);

        regs.enter_mode(Mode::Irq, 0x1000);
        regs.write_in(0, Mode::Irq, 0xDEAD_BEEF); // common register, visible everywhere
        regs.return_from_exception();

        // Supervisor's own banked R13 is untouched by the IRQ excursion.
        assert_eq!(regs.read_in(13, Mode::Supervisor), snapshot_r13);
    }

    #[test]
    fn mode_bank_indices_are_distinct() {
        let modes = [Mode::User, Mode::Fiq, Mode::Irq, Mode::Supervisor, Mode::Abort, Mode::Undefined];
        let banks: Vec<usize> = modes.iter().map(|m| m.r13_r14_bank()).collect();
        let mut sorted = banks.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), banks.len());
    }
}
