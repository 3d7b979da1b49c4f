//! Condition code evaluation (§4.F): a branchless truth-table lookup over
//! the four flag bits, shared by the executor and the disassembler/
//! formatter.

use crate::registers::Psr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    Eq,
    Ne,
    CsHs,
    CcLo,
    Mi,
    Pl,
    Vs,
    Vc,
    Hi,
    Ls,
    Ge,
    Lt,
    Gt,
    Le,
    Al,
    /// Reserved pattern `1111`; never executes from ARMv3 onward.
    Nv,
}

impl Condition {
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        match bits & 0xF {
            0x0 => Self::Eq,
            0x1 => Self::Ne,
            0x2 => Self::CsHs,
            0x3 => Self::CcLo,
            0x4 => Self::Mi,
            0x5 => Self::Pl,
            0x6 => Self::Vs,
            0x7 => Self::Vc,
            0x8 => Self::Hi,
            0x9 => Self::Ls,
            0xA => Self::Ge,
            0xB => Self::Lt,
            0xC => Self::Gt,
            0xD => Self::Le,
            0xE => Self::Al,
            _ => Self::Nv,
        }
    }

    #[must_use]
    pub const fn bits(self) -> u32 {
        match self {
            Self::Eq => 0x0,
            Self::Ne => 0x1,
            Self::CsHs => 0x2,
            Self::CcLo => 0x3,
            Self::Mi => 0x4,
            Self::Pl => 0x5,
            Self::Vs => 0x6,
            Self::Vc => 0x7,
            Self::Hi => 0x8,
            Self::Ls => 0x9,
            Self::Ge => 0xA,
            Self::Lt => 0xB,
            Self::Gt => 0xC,
            Self::Le => 0xD,
            Self::Al => 0xE,
            Self::Nv => 0xF,
        }
    }

    /// Evaluate against the current flags. `AL` always passes, `NV` never.
    #[must_use]
    pub const fn passes(self, psr: &Psr) -> bool {
        match self {
            Self::Eq => psr.z,
            Self::Ne => !psr.z,
            Self::CsHs => psr.c,
            Self::CcLo => !psr.c,
            Self::Mi => psr.n,
            Self::Pl => !psr.n,
            Self::Vs => psr.v,
            Self::Vc => !psr.v,
            Self::Hi => psr.c && !psr.z,
            Self::Ls => !psr.c || psr.z,
            Self::Ge => psr.n == psr.v,
            Self::Lt => psr.n != psr.v,
            Self::Gt => !psr.z && (psr.n == psr.v),
            Self::Le => psr.z || (psr.n != psr.v),
            Self::Al => true,
            Self::Nv => false,
        }
    }

    /// Canonical assembler mnemonic suffix. `HS`/`LO` are accepted by the
    /// lexer as synonyms for `CS`/`CC` but never produced on output.
    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Eq => "EQ",
            Self::Ne => "NE",
            Self::CsHs => "CS",
            Self::CcLo => "CC",
            Self::Mi => "MI",
            Self::Pl => "PL",
            Self::Vs => "VS",
            Self::Vc => "VC",
            Self::Hi => "HI",
            Self::Ls => "LS",
            Self::Ge => "GE",
            Self::Lt => "LT",
            Self::Gt => "GT",
            Self::Le => "LE",
            Self::Al => "AL",
            Self::Nv => "NV",
        }
    }

    /// Parse a two-letter condition mnemonic, accepting the `HS`/`LO`
    /// synonyms.
    #[must_use]
    pub fn from_mnemonic(text: &str) -> Option<Self> {
        Some(match text.to_ascii_uppercase().as_str() {
            "EQ" => Self::Eq,
            "NE" => Self::Ne,
            "CS" | "HS" => Self::CsHs,
            "CC" | "LO" => Self::CcLo,
            "MI" => Self::Mi,
            "PL" => Self::Pl,
            "VS" => Self::Vs,
            "VC" => Self::Vc,
            "HI" => Self::Hi,
            "LS" => Self::Ls,
            "GE" => Self::Ge,
            "LT" => Self::Lt,
            "GT" => Self::Gt,
            "LE" => Self::Le,
            "AL" => Self::Al,
            "NV" => Self::Nv,
            _ => return None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags(n: bool, z: bool, c: bool, v: bool) -> Psr {
        Psr { n, z, c, v, i: false, f: false, t: false, mode: crate::registers::Mode::User }
    }

    #[test]
    fn condition_coverage_matches_truth_table() {
        for bits in 0..16u32 {
            let cond = Condition::from_bits(bits);
            assert_eq!(cond.bits(), bits);
            for n in [false, true] {
                for z in [false, true] {
                    for c in [false, true] {
                        for v in [false, true] {
                            let psr = flags(n, z, c, v);
                            let expected = match cond {
                                Condition::Eq => z,
                                Condition::Ne => !z,
                                Condition::CsHs => c,
                                Condition::CcLo => !c,
                                Condition::Mi => n,
                                Condition::Pl => !n,
                                Condition::Vs => v,
                                Condition::Vc => !v,
                                Condition::Hi => c && !z,
                                Condition::Ls => !c || z,
                                Condition::Ge => n == v,
                                Condition::Lt => n != v,
                                Condition::Gt => !z && (n == v),
                                Condition::Le => z || (n != v),
                                Condition::Al => true,
                                Condition::Nv => false,
                            };
                            assert_eq!(cond.passes(&psr), expected);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn hs_and_lo_are_synonyms_for_cs_and_cc() {
        assert_eq!(Condition::from_mnemonic("HS"), Some(Condition::CsHs));
        assert_eq!(Condition::from_mnemonic("LO"), Some(Condition::CcLo));
        assert_eq!(Condition::CsHs.mnemonic(), "CS");
        assert_eq!(Condition::CcLo.mnemonic(), "CC");
    }
}
