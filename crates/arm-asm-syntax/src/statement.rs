//! Operand syntax (§4.J): the shapes instruction mnemonics accept, each
//! parsed from a shared expression-context token stream. Unlike
//! [`crate::expr`], these parsers consume only part of a longer operand
//! list — a shifted-register operand's own trailing `, LSL #2` is *not* a
//! new operand boundary — so every parser reports how many tokens it ate
//! and the caller (the as-yet-unbuilt assembler driver) decides whether
//! what follows is a comma before the next operand or the statement end.

use crate::error::ParseError;
use crate::expr::{ExprNode, parse_expression};
use arm_asm_lexer::{Location, Token, TokenKind, parse_register_list};
use arm_cpu::{PsrFieldMask, ShiftType};

/// One parsed instruction operand. Expressions are left unresolved
/// (`ExprNode`, not `Value`) — a forward-referenced label can only be
/// folded once the whole source has been scanned for symbols (§4.L pass 1).
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Register(u8),
    ShiftedRegister { rm: u8, shift: ShiftOperand },
    Immediate(ExprNode),
    Address(MemoryOperand),
    RegisterList { mask: u16, user_bank: bool },
    Psr { is_spsr: bool, mask: Option<PsrFieldMask> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ShiftOperand {
    ByConstant { shift: ShiftType, amount: ExprNode },
    ByRegister { shift: ShiftType, rs: u8 },
    Rrx,
}

/// `[Rn]`, `[Rn, #expr]`, `[Rn, #expr]!`, `[Rn], #expr`, and the register-
/// offset forms of each.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryOperand {
    pub rn: u8,
    pub offset: Option<Offset>,
    pub pre_indexed: bool,
    pub writeback: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Offset {
    Immediate { negative: bool, value: ExprNode },
    Register { negative: bool, rm: u8, shift: Option<(ShiftType, ExprNode)> },
}

fn location_of(tokens: &[Token]) -> Location {
    tokens.first().map_or(Location::default(), |t| t.location)
}

fn expect<'a>(tokens: &'a [Token], pos: usize, kind: &TokenKind) -> Result<&'a Token, ParseError> {
    match tokens.get(pos) {
        Some(tok) if &tok.kind == kind => Ok(tok),
        Some(tok) => Err(ParseError::new(tok.location, format!("expected {kind:?}, found {:?}", tok.kind))),
        None => Err(ParseError::new(location_of(tokens), format!("expected {kind:?}, found end of input"))),
    }
}

fn expect_register(tokens: &[Token], pos: usize) -> Result<u8, ParseError> {
    match tokens.get(pos) {
        Some(Token { kind: TokenKind::Register(r), .. }) => Ok(*r),
        Some(tok) => Err(ParseError::new(tok.location, "expected a register".to_string())),
        None => Err(ParseError::new(location_of(tokens), "expected a register, found end of input".to_string())),
    }
}

fn shift_mnemonic(word: &str) -> Option<ShiftType> {
    match word.to_ascii_uppercase().as_str() {
        "LSL" => Some(ShiftType::Lsl),
        "LSR" => Some(ShiftType::Lsr),
        "ASR" => Some(ShiftType::Asr),
        "ROR" => Some(ShiftType::Ror),
        "RRX" => Some(ShiftType::Rrx),
        _ => None,
    }
}

/// `Rm, LSL #amount` / `Rm, LSL Rs` / `Rm, RRX`, starting right after the
/// comma and shift keyword (`tokens[0]` is the shift mnemonic).
fn parse_shift_suffix(tokens: &[Token]) -> Result<(ShiftOperand, usize), ParseError> {
    let Some(tok) = tokens.first() else {
        return Err(ParseError::new(location_of(tokens), "expected a shift mnemonic".to_string()));
    };
    let TokenKind::Identifier(word) = &tok.kind else {
        return Err(ParseError::new(tok.location, "expected a shift mnemonic".to_string()));
    };
    let Some(shift) = shift_mnemonic(word) else {
        return Err(ParseError::new(tok.location, format!("'{word}' is not a shift mnemonic")));
    };
    if shift == ShiftType::Rrx {
        return Ok((ShiftOperand::Rrx, 1));
    }
    match tokens.get(1).map(|t| &t.kind) {
        Some(TokenKind::Hash) => {
            let (amount, consumed) = parse_expression(&tokens[2..])?;
            Ok((ShiftOperand::ByConstant { shift, amount }, 2 + consumed))
        }
        Some(TokenKind::Register(rs)) => Ok((ShiftOperand::ByRegister { shift, rs: *rs }, 2)),
        _ => Err(ParseError::new(tok.location, "expected '#amount' or a register after the shift mnemonic".to_string())),
    }
}

/// The `Operand2` of a data-processing instruction: `#expr`, a bare
/// register, or a register with a shift suffix.
pub fn parse_shifter_operand(tokens: &[Token]) -> Result<(Operand, usize), ParseError> {
    let Some(first) = tokens.first() else {
        return Err(ParseError::new(location_of(tokens), "expected an operand, found end of input".to_string()));
    };
    if first.kind == TokenKind::Hash {
        let (expr, consumed) = parse_expression(&tokens[1..])?;
        return Ok((Operand::Immediate(expr), 1 + consumed));
    }
    let TokenKind::Register(rm) = first.kind else {
        return Err(ParseError::new(first.location, "expected a register or '#' immediate".to_string()));
    };
    if tokens.get(1).map(|t| &t.kind) != Some(&TokenKind::Comma) {
        return Ok((Operand::Register(rm), 1));
    }
    let (shift, consumed) = parse_shift_suffix(&tokens[2..])?;
    Ok((Operand::ShiftedRegister { rm, shift }, 2 + consumed))
}

/// `#expr` / `Rm` / `-Rm` / `Rm, LSL #expr`, used inside `[...]` and after
/// a post-indexed `],`.
fn parse_offset(tokens: &[Token]) -> Result<(Offset, usize), ParseError> {
    let mut pos = 0;
    let negative = tokens.first().map(|t| &t.kind) == Some(&TokenKind::Minus);
    if negative {
        pos += 1;
    }
    match tokens.get(pos).map(|t| &t.kind) {
        Some(TokenKind::Hash) => {
            let (value, consumed) = parse_expression(&tokens[pos + 1..])?;
            Ok((Offset::Immediate { negative, value }, pos + 1 + consumed))
        }
        Some(TokenKind::Register(rm)) => {
            let rm = *rm;
            let mut end = pos + 1;
            let shift = if tokens.get(end).map(|t| &t.kind) == Some(&TokenKind::Comma) {
                let (op, consumed) = parse_shift_suffix(&tokens[end + 1..])?;
                end += 1 + consumed;
                match op {
                    ShiftOperand::ByConstant { shift, amount } => Some((shift, amount)),
                    ShiftOperand::Rrx | ShiftOperand::ByRegister { .. } => {
                        return Err(ParseError::new(location_of(tokens), "an address offset shift must be by a constant".to_string()));
                    }
                }
            } else {
                None
            };
            Ok((Offset::Register { negative, rm, shift }, end))
        }
        _ => Err(ParseError::new(location_of(&tokens[pos..]), "expected '#' or a register offset".to_string())),
    }
}

/// `[Rn]`, `[Rn, #expr]`, `[Rn, #expr]!`, `[Rn, Rm]`, or `[Rn], #expr`
/// (post-indexed, implicit writeback).
pub fn parse_address_operand(tokens: &[Token]) -> Result<(Operand, usize), ParseError> {
    let mut pos = 0;
    expect(tokens, pos, &TokenKind::OpenBracket)?;
    pos += 1;
    let rn = expect_register(tokens, pos)?;
    pos += 1;

    if tokens.get(pos).map(|t| &t.kind) == Some(&TokenKind::CloseBracket) {
        pos += 1;
        if tokens.get(pos).map(|t| &t.kind) == Some(&TokenKind::Comma) {
            let (offset, consumed) = parse_offset(&tokens[pos + 1..])?;
            pos += 1 + consumed;
            let memory = MemoryOperand { rn, offset: Some(offset), pre_indexed: false, writeback: true };
            return Ok((Operand::Address(memory), pos));
        }
        let memory = MemoryOperand { rn, offset: None, pre_indexed: true, writeback: false };
        return Ok((Operand::Address(memory), pos));
    }

    expect(tokens, pos, &TokenKind::Comma)?;
    pos += 1;
    let (offset, consumed) = parse_offset(&tokens[pos..])?;
    pos += consumed;
    expect(tokens, pos, &TokenKind::CloseBracket)?;
    pos += 1;
    let writeback = tokens.get(pos).map(|t| &t.kind) == Some(&TokenKind::Bang);
    if writeback {
        pos += 1;
    }
    let memory = MemoryOperand { rn, offset: Some(offset), pre_indexed: true, writeback };
    Ok((Operand::Address(memory), pos))
}

/// `{R0, R4-R9, LR}` / `{R0-R15}^`, delegating the mask arithmetic to the
/// lexer-level helper and re-lexing the bracketed text directly — a
/// register list is always one whole operand, never split by the caller.
pub fn parse_register_list_operand(text: &str) -> Result<Operand, ParseError> {
    parse_register_list(text)
        .map(|(mask, user_bank)| Operand::RegisterList { mask, user_bank })
        .map_err(|message| ParseError::new(Location::default(), message))
}

/// `CPSR` / `SPSR_fc` / ..., for `MRS`/`MSR`.
pub fn parse_psr_operand(tokens: &[Token]) -> Result<(Operand, usize), ParseError> {
    let Some(tok) = tokens.first() else {
        return Err(ParseError::new(location_of(tokens), "expected a PSR name, found end of input".to_string()));
    };
    let TokenKind::Identifier(word) = &tok.kind else {
        return Err(ParseError::new(tok.location, "expected a PSR name".to_string()));
    };
    let Some((is_spsr, suffix)) = arm_asm_lexer::parse_psr_name(word) else {
        return Err(ParseError::new(tok.location, format!("'{word}' is not a valid PSR name")));
    };
    let mask = suffix.map(|s| PsrFieldMask { flags: s.flags, status: s.status, extension: s.extension, control: s.control });
    Ok((Operand::Psr { is_spsr, mask }, 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use arm_asm_lexer::{Cursor, ExpressionContext, LexicalContext};

    fn lex(text: &str) -> Vec<Token> {
        let mut cursor = Cursor::new(text);
        let ctx = ExpressionContext;
        let mut out = Vec::new();
        while let Some(tok) = ctx.try_next_token(&mut cursor) {
            if tok.kind == TokenKind::StatementTerminator {
                break;
            }
            out.push(tok);
        }
        out
    }

    #[test]
    fn bare_register_operand() {
        let tokens = lex("R3\n");
        let (operand, consumed) = parse_shifter_operand(&tokens).unwrap();
        assert_eq!(operand, Operand::Register(3));
        assert_eq!(consumed, 1);
    }

    #[test]
    fn immediate_operand() {
        let tokens = lex("#42\n");
        let (operand, consumed) = parse_shifter_operand(&tokens).unwrap();
        assert!(matches!(operand, Operand::Immediate(_)));
        assert_eq!(consumed, tokens.len());
    }

    #[test]
    fn register_shifted_by_constant() {
        let tokens = lex("R1, LSL #2\n");
        let (operand, consumed) = parse_shifter_operand(&tokens).unwrap();
        assert_eq!(consumed, tokens.len());
        match operand {
            Operand::ShiftedRegister { rm: 1, shift: ShiftOperand::ByConstant { shift: ShiftType::Lsl, .. } } => {}
            other => panic!("unexpected shape: {other:?}"),
        }
    }

    #[test]
    fn register_shifted_by_register() {
        let tokens = lex("R1, ROR R2\n");
        let (operand, _) = parse_shifter_operand(&tokens).unwrap();
        match operand {
            Operand::ShiftedRegister { rm: 1, shift: ShiftOperand::ByRegister { shift: ShiftType::Ror, rs: 2 } } => {}
            other => panic!("unexpected shape: {other:?}"),
        }
    }

    #[test]
    fn register_with_rrx() {
        let tokens = lex("R1, RRX\n");
        let (operand, consumed) = parse_shifter_operand(&tokens).unwrap();
        assert_eq!(consumed, tokens.len());
        assert_eq!(operand, Operand::ShiftedRegister { rm: 1, shift: ShiftOperand::Rrx });
    }

    #[test]
    fn pre_indexed_no_offset() {
        let tokens = lex("[R0]\n");
        let (operand, consumed) = parse_address_operand(&tokens).unwrap();
        assert_eq!(consumed, tokens.len());
        match operand {
            Operand::Address(MemoryOperand { rn: 0, offset: None, pre_indexed: true, writeback: false }) => {}
            other => panic!("unexpected shape: {other:?}"),
        }
    }

    #[test]
    fn pre_indexed_with_writeback() {
        let tokens = lex("[R0, #4]!\n");
        let (operand, consumed) = parse_address_operand(&tokens).unwrap();
        assert_eq!(consumed, tokens.len());
        match operand {
            Operand::Address(MemoryOperand { rn: 0, offset: Some(Offset::Immediate { negative: false, .. }), pre_indexed: true, writeback: true }) => {}
            other => panic!("unexpected shape: {other:?}"),
        }
    }

    #[test]
    fn post_indexed_implies_writeback() {
        let tokens = lex("[R0], #-4\n");
        let (operand, consumed) = parse_address_operand(&tokens).unwrap();
        assert_eq!(consumed, tokens.len());
        match operand {
            Operand::Address(MemoryOperand { rn: 0, offset: Some(Offset::Immediate { .. }), pre_indexed: false, writeback: true }) => {}
            other => panic!("unexpected shape: {other:?}"),
        }
    }

    #[test]
    fn negative_register_offset() {
        let tokens = lex("[R0, -R1]\n");
        let (operand, _) = parse_address_operand(&tokens).unwrap();
        match operand {
            Operand::Address(MemoryOperand { offset: Some(Offset::Register { negative: true, rm: 1, shift: None }), .. }) => {}
            other => panic!("unexpected shape: {other:?}"),
        }
    }

    #[test]
    fn register_offset_with_shift() {
        let tokens = lex("[R0, R1, LSL #2]\n");
        let (operand, consumed) = parse_address_operand(&tokens).unwrap();
        assert_eq!(consumed, tokens.len());
        match operand {
            Operand::Address(MemoryOperand { offset: Some(Offset::Register { rm: 1, shift: Some((ShiftType::Lsl, _)), .. }), .. }) => {}
            other => panic!("unexpected shape: {other:?}"),
        }
    }

    #[test]
    fn register_list_operand_parses_ranges() {
        let operand = parse_register_list_operand("{R0, R4-R6}").unwrap();
        assert_eq!(operand, Operand::RegisterList { mask: 0b0111_0001, user_bank: false });
    }

    #[test]
    fn psr_operand_with_suffix() {
        let tokens = lex("CPSR_fc\n");
        let (operand, consumed) = parse_psr_operand(&tokens).unwrap();
        assert_eq!(consumed, 1);
        match operand {
            Operand::Psr { is_spsr: false, mask: Some(mask) } => {
                assert!(mask.flags && mask.control && !mask.status && !mask.extension);
            }
            other => panic!("unexpected shape: {other:?}"),
        }
    }
}
