//! The two-pass driver (§4.L): collects every statement and its tentative
//! address (resolving `%INCLUDE` recursively as it goes), then resolves
//! every expression and emits final bytes.

use std::path::{Path, PathBuf};

use arm_asm_lexer::{Cursor, Location, Token, TokenKind, lex_statement};
use arm_asm_syntax::{ConstantSet, SymbolTable};
use arm_value::Value;

use crate::adr;
use crate::builder::build_instruction;
use crate::diagnostic::{Diagnostic, Diagnostics};
use crate::eval_helpers::eval_bits32;
use crate::mnemonic::Stem;
use crate::object_code::{ObjectCode, ResolvedSymbol};
use crate::parser::{StatementBody, parse_statement_body};

/// Resolves the text of a `%INCLUDE`d file. The CLI binary supplies
/// [`FsIncludeLoader`]; library callers assembling from memory (tests)
/// get [`NullIncludeLoader`] unless they provide their own.
pub trait IncludeLoader {
    fn load(&self, name: &str) -> Result<String, String>;
}

/// Searches each `-i` directory in order, then the current directory.
pub struct FsIncludeLoader {
    pub dirs: Vec<PathBuf>,
}

impl IncludeLoader for FsIncludeLoader {
    fn load(&self, name: &str) -> Result<String, String> {
        for dir in &self.dirs {
            let candidate = dir.join(name);
            if candidate.is_file() {
                return std::fs::read_to_string(&candidate).map_err(|e| e.to_string());
            }
        }
        std::fs::read_to_string(Path::new(name)).map_err(|e| e.to_string())
    }
}

pub struct NullIncludeLoader;

impl IncludeLoader for NullIncludeLoader {
    fn load(&self, name: &str) -> Result<String, String> {
        Err(format!("no include loader configured to resolve '{name}'"))
    }
}

#[derive(Debug, Clone, Default)]
pub struct Options {
    /// Absence means position-independent: pass 1 runs from address 0 and
    /// the emitted image is meant to be relocated by the caller.
    pub load_address: Option<u32>,
}

struct Statement {
    location: Location,
    address: u32,
    size: usize,
    body: Option<StatementBody>,
}

/// Splits one lexed statement (terminator already stripped) into its
/// optional leading label and the remaining body tokens.
fn split_label(mut tokens: Vec<Token>) -> (Option<(String, Location)>, Vec<Token>) {
    match tokens.first() {
        Some(Token { kind: TokenKind::Label(name), location }) => {
            let label = (name.clone(), *location);
            tokens.remove(0);
            (Some(label), tokens)
        }
        _ => (None, tokens),
    }
}

fn equs_size(literal: &str, trailing: &[arm_asm_syntax::ExprNode]) -> usize {
    literal.len() + trailing.len()
}

/// Evaluates `%ALIGN`'s argument (default 4) against the symbols visible
/// so far. A forward-referenced alignment argument isn't supported — the
/// value has to be known during pass 1, since it changes every address
/// that follows it.
fn align_padding(expr: &Option<arm_asm_syntax::ExprNode>, symbols: &SymbolTable, address: u32, location: Location) -> Result<usize, Diagnostic> {
    let align = match expr {
        None => 4,
        Some(node) => {
            let constants = ConstantSet::new(symbols, address);
            eval_bits32(node, &constants)?
        }
    };
    if align == 0 || !align.is_power_of_two() {
        return Err(Diagnostic::Driver { location, message: format!("ALIGN argument must be a power of two, found {align}") });
    }
    let remainder = address % align;
    Ok(if remainder == 0 { 0 } else { (align - remainder) as usize })
}

fn statement_size(body: &StatementBody, symbols: &SymbolTable, address: u32, location: Location) -> Result<usize, Diagnostic> {
    Ok(match body {
        StatementBody::Instruction { mnemonic, .. } => {
            let _ = mnemonic;
            4
        }
        StatementBody::Adr { form, .. } => 4 * form.max_words(),
        StatementBody::EquB(items) => items.len(),
        StatementBody::EquW(items) => items.len() * 2,
        StatementBody::EquD(items) => items.len() * 4,
        StatementBody::EquS { literal, trailing } => equs_size(literal, trailing),
        StatementBody::Align(expr) => align_padding(expr, symbols, address, location)?,
        StatementBody::Arch(_) => 0,
        StatementBody::Include(_) => 0,
    })
}

#[allow(clippy::too_many_arguments)]
fn collect(
    source: &str,
    loader: &dyn IncludeLoader,
    stack: &mut Vec<String>,
    symbols: &mut SymbolTable,
    address: &mut u32,
    statements: &mut Vec<Statement>,
    diagnostics: &mut Diagnostics,
) {
    let mut cursor = Cursor::new(source);
    while !cursor.is_at_end() {
        let mut tokens = lex_statement(&mut cursor);
        if tokens.last().map(|t| &t.kind) == Some(&TokenKind::StatementTerminator) {
            tokens.pop();
        }
        tokens.retain(|t| match &t.kind {
            TokenKind::Warning(message) => {
                diagnostics.push(Diagnostic::Driver { location: t.location, message: message.clone() });
                false
            }
            _ => true,
        });
        let (label, rest) = split_label(tokens);
        let location = label.as_ref().map(|(_, loc)| *loc).or_else(|| rest.first().map(|t| t.location)).unwrap_or_else(|| cursor.location());

        let body = match parse_statement_body(&rest) {
            Ok(body) => body,
            Err(diagnostic) => {
                diagnostics.push(diagnostic);
                if let Some((name, loc)) = label {
                    define_label(symbols, diagnostics, &name, *address, loc);
                }
                continue;
            }
        };

        if let Some((name, loc)) = &label {
            define_label(symbols, diagnostics, name, *address, *loc);
        }

        if let Some(StatementBody::Include(path)) = &body {
            include_file(path, loader, stack, symbols, address, statements, diagnostics, location);
            continue;
        }

        let Some(body) = body else { continue };
        let size = match statement_size(&body, symbols, *address, location) {
            Ok(size) => size,
            Err(diagnostic) => {
                diagnostics.push(diagnostic);
                continue;
            }
        };
        statements.push(Statement { location, address: *address, size, body: Some(body) });
        *address = address.wrapping_add(size as u32);
    }
}

fn define_label(symbols: &mut SymbolTable, diagnostics: &mut Diagnostics, name: &str, address: u32, location: Location) {
    if symbols.is_defined(name) {
        diagnostics.push(Diagnostic::Driver { location, message: format!("label '{name}' is already defined") });
        return;
    }
    symbols.define(name, Value::U32(address), location);
}

#[allow(clippy::too_many_arguments)]
fn include_file(
    path: &str,
    loader: &dyn IncludeLoader,
    stack: &mut Vec<String>,
    symbols: &mut SymbolTable,
    address: &mut u32,
    statements: &mut Vec<Statement>,
    diagnostics: &mut Diagnostics,
    location: Location,
) {
    if stack.iter().any(|open| open == path) {
        diagnostics.push(Diagnostic::Driver { location, message: format!("include cycle detected at '{path}'") });
        return;
    }
    match loader.load(path) {
        Ok(text) => {
            stack.push(path.to_string());
            collect(&text, loader, stack, symbols, address, statements, diagnostics);
            stack.pop();
        }
        Err(message) => diagnostics.push(Diagnostic::Driver { location, message: format!("cannot include '{path}': {message}") }),
    }
}

fn push_le_bytes(out: &mut Vec<u8>, value: u32, width: usize) {
    out.extend_from_slice(&value.to_le_bytes()[..width]);
}

fn encode_or_diagnose(instr: arm_cpu::Instruction, location: Location, out: &mut Vec<u8>, diagnostics: &mut Diagnostics) {
    match arm_cpu::encode(instr) {
        Some(word) => push_le_bytes(out, word, 4),
        None => diagnostics.push(Diagnostic::Driver { location, message: format!("{instr:?} has no valid encoding") }),
    }
}

fn emit(statement: &Statement, symbols: &SymbolTable, out: &mut Vec<u8>, diagnostics: &mut Diagnostics) {
    let Some(body) = &statement.body else { return };
    let constants = ConstantSet::new(symbols, statement.address);
    let location = statement.location;
    let before = out.len();

    match body {
        StatementBody::Instruction { mnemonic, operands } => {
            if mnemonic.stem == Stem::Adr {
                unreachable!("ADR is parsed as StatementBody::Adr, never as an Instruction body");
            }
            match build_instruction(mnemonic, operands, &constants, location) {
                Ok(instr) => encode_or_diagnose(instr, location, out, diagnostics),
                Err(diagnostic) => diagnostics.push(diagnostic),
            }
        }
        StatementBody::Adr { rd, cond, form, target } => match eval_bits32(target, &constants) {
            Ok(target_value) => match adr::build_adr(*rd, *cond, *form, statement.address, target_value) {
                Ok(instrs) => {
                    for instr in instrs {
                        encode_or_diagnose(instr, location, out, diagnostics);
                    }
                }
                Err(message) => diagnostics.push(Diagnostic::Driver { location, message }),
            },
            Err(diagnostic) => diagnostics.push(diagnostic),
        },
        StatementBody::EquB(items) => {
            for expr in items {
                match eval_bits32(expr, &constants) {
                    Ok(value) => push_le_bytes(out, value, 1),
                    Err(diagnostic) => diagnostics.push(diagnostic),
                }
            }
        }
        StatementBody::EquW(items) => {
            for expr in items {
                match eval_bits32(expr, &constants) {
                    Ok(value) => push_le_bytes(out, value, 2),
                    Err(diagnostic) => diagnostics.push(diagnostic),
                }
            }
        }
        StatementBody::EquD(items) => {
            for expr in items {
                match eval_bits32(expr, &constants) {
                    Ok(value) => push_le_bytes(out, value, 4),
                    Err(diagnostic) => diagnostics.push(diagnostic),
                }
            }
        }
        StatementBody::EquS { literal, trailing } => {
            out.extend_from_slice(literal.as_bytes());
            for expr in trailing {
                match eval_bits32(expr, &constants) {
                    Ok(value) => push_le_bytes(out, value, 1),
                    Err(diagnostic) => diagnostics.push(diagnostic),
                }
            }
        }
        StatementBody::Align(_) => out.resize(out.len() + statement.size, 0),
        StatementBody::Arch(_) | StatementBody::Include(_) => {}
    }

    // A diagnosed statement may have pushed fewer bytes than its reserved
    // size; pad back out to it so later statements' addresses stay valid.
    let written = out.len() - before;
    if written < statement.size {
        out.resize(before + statement.size, 0);
    }
}

/// Assembles `source`, resolving `%INCLUDE` through `loader`. Diagnostics
/// accumulate across the whole run; an empty [`Diagnostics`] on `Err`
/// never happens — `Err` is only returned once at least one diagnostic
/// was raised.
pub fn assemble_with_loader(source: &str, options: &Options, loader: &dyn IncludeLoader) -> Result<ObjectCode, Diagnostics> {
    let mut symbols = SymbolTable::new();
    let mut statements = Vec::new();
    let mut diagnostics = Diagnostics::new();
    let load_address = options.load_address.unwrap_or(0);
    let mut address = load_address;
    let mut stack = Vec::new();

    collect(source, loader, &mut stack, &mut symbols, &mut address, &mut statements, &mut diagnostics);

    let mut bytes = Vec::new();
    for statement in &statements {
        emit(statement, &symbols, &mut bytes, &mut diagnostics);
    }

    if !diagnostics.is_empty() {
        return Err(diagnostics);
    }

    let resolved_symbols = symbols.iter().map(|(name, symbol)| ResolvedSymbol { name: name.clone(), value: symbol.value.clone() }).collect();
    Ok(ObjectCode::new(load_address, bytes, resolved_symbols))
}

/// Convenience entry point for assembling source with no `%INCLUDE`
/// support (in-memory source, tests).
pub fn assemble(source: &str, options: &Options) -> Result<ObjectCode, Diagnostics> {
    assemble_with_loader(source, options, &NullIncludeLoader)
}
