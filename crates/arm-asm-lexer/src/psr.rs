//! The *PSR name* lexical context (§4.I): recognises `CPSR`/`SPSR`,
//! optionally suffixed `_fsxc` (any subset, in any order, of the four
//! field letters), for `MRS`/`MSR` operands.

use crate::token::PsrSuffix;

/// Parses a PSR operand token's text (`CPSR`, `SPSR_fc`, `CPSR_all`, ...)
/// into `(is_spsr, suffix)`. `_all` is accepted as a synonym for `_fsxc`
/// (every field). No suffix at all means "whole register" (`None`), which
/// the encoder treats as the full field mask per the original grammar.
#[must_use]
pub fn parse_psr_name(word: &str) -> Option<(bool, Option<PsrSuffix>)> {
    let upper = word.to_ascii_uppercase();
    let (base, rest) = if let Some(rest) = upper.strip_prefix("CPSR") {
        (false, rest)
    } else if let Some(rest) = upper.strip_prefix("SPSR") {
        (true, rest)
    } else {
        return None;
    };

    if rest.is_empty() {
        return Some((base, None));
    }
    let suffix = rest.strip_prefix('_')?;
    if suffix == "ALL" {
        return Some((base, Some(PsrSuffix { flags: true, status: true, extension: true, control: true })));
    }
    if suffix.is_empty() || !suffix.chars().all(|c| matches!(c, 'F' | 'S' | 'X' | 'C')) {
        return None;
    }
    Some((
        base,
        Some(PsrSuffix {
            flags: suffix.contains('F'),
            status: suffix.contains('S'),
            extension: suffix.contains('X'),
            control: suffix.contains('C'),
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_cpsr_has_no_suffix() {
        assert_eq!(parse_psr_name("CPSR"), Some((false, None)));
    }

    #[test]
    fn spsr_with_flags_and_control() {
        let (is_spsr, suffix) = parse_psr_name("SPSR_fc").unwrap();
        assert!(is_spsr);
        let suffix = suffix.unwrap();
        assert!(suffix.flags && suffix.control && !suffix.status && !suffix.extension);
    }

    #[test]
    fn all_means_every_field() {
        let (_, suffix) = parse_psr_name("CPSR_all").unwrap();
        let suffix = suffix.unwrap();
        assert!(suffix.flags && suffix.status && suffix.extension && suffix.control);
    }

    #[test]
    fn unrecognised_prefix_is_none() {
        assert_eq!(parse_psr_name("FOO"), None);
    }

    #[test]
    fn invalid_suffix_letter_is_none() {
        assert_eq!(parse_psr_name("CPSR_q"), None);
    }
}
