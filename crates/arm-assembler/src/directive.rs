//! Data and control directives (§4.L): `EQUB`/`EQUW`/`EQUD`/`EQUS`, `ALIGN`,
//! the `%ARMvN`/`%FPA`/`%26Bit`/`%32Bit`/`%ARM`/`%Thumb` architecture
//! markers, and `%INCLUDE`.

use arm_asm_lexer::{Token, TokenKind};
use arm_asm_syntax::{ExprNode, parse_expression};

use crate::diagnostic::Diagnostic;
use crate::parser::StatementBody;

fn location_of(tokens: &[Token]) -> arm_asm_lexer::Location {
    tokens.first().map_or(arm_asm_lexer::Location::default(), |t| t.location)
}

fn split_commas(tokens: &[Token]) -> Vec<Vec<Token>> {
    let mut groups = Vec::new();
    let mut current = Vec::new();
    for tok in tokens {
        if tok.kind == TokenKind::Comma {
            groups.push(std::mem::take(&mut current));
        } else {
            current.push(tok.clone());
        }
    }
    if !current.is_empty() || !groups.is_empty() {
        groups.push(current);
    }
    groups
}

fn parse_expr_list(tokens: &[Token]) -> Result<Vec<ExprNode>, Diagnostic> {
    split_commas(tokens)
        .into_iter()
        .map(|group| {
            let start = if group.first().map(|t| &t.kind) == Some(&TokenKind::Hash) { 1 } else { 0 };
            let (node, _) = parse_expression(&group[start..]).map_err(Diagnostic::from)?;
            Ok(node)
        })
        .collect()
}

/// The architecture directives this assembler recognises but doesn't act
/// on: they're accepted (and emit zero bytes) so source written against the
/// full directive set assembles, but instruction selection doesn't
/// currently vary with declared architecture.
const ARCH_DIRECTIVES: &[&str] =
    &["ARMv2", "ARMv2a", "ARMv3", "ARMv3g", "ARMv4", "FPA", "VFPv1", "26Bit", "32Bit", "ARM", "Thumb"];

pub fn parse_directive(name: &str, operands: &[Token]) -> Result<StatementBody, Diagnostic> {
    match name {
        "EQUB" => Ok(StatementBody::EquB(parse_expr_list(operands)?)),
        "EQUW" => Ok(StatementBody::EquW(parse_expr_list(operands)?)),
        "EQUD" => Ok(StatementBody::EquD(parse_expr_list(operands)?)),
        "EQUS" => parse_equs(operands),
        "ALIGN" => {
            if operands.is_empty() {
                Ok(StatementBody::Align(None))
            } else {
                let (node, _) = parse_expression(operands).map_err(Diagnostic::from)?;
                Ok(StatementBody::Align(Some(node)))
            }
        }
        "INCLUDE" => match operands.first() {
            Some(Token { kind: TokenKind::StringLiteral(path), .. }) => Ok(StatementBody::Include(path.clone())),
            _ => Err(Diagnostic::Driver { location: location_of(operands), message: "%INCLUDE expects a quoted file name".to_string() }),
        },
        other if ARCH_DIRECTIVES.contains(&other) => Ok(StatementBody::Arch(other.to_string())),
        other => Err(Diagnostic::Driver { location: location_of(operands), message: format!("unknown directive '%{other}'") }),
    }
}

fn parse_equs(operands: &[Token]) -> Result<StatementBody, Diagnostic> {
    let groups = split_commas(operands);
    let Some(first) = groups.first() else {
        return Err(Diagnostic::Driver { location: location_of(operands), message: "EQUS expects a string".to_string() });
    };
    let literal = match first.first() {
        Some(Token { kind: TokenKind::StringLiteral(text), .. }) => text.clone(),
        _ => return Err(Diagnostic::Driver { location: location_of(operands), message: "EQUS expects a string".to_string() }),
    };
    let trailing = groups[1..]
        .iter()
        .map(|g| parse_expression(g).map(|(node, _)| node).map_err(Diagnostic::from))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(StatementBody::EquS { literal, trailing })
}
