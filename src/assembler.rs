//! Two-pass assembler for ByteForge source text.
//!
//! Pass 1 ([`collect`]) walks normalized lines, assigns every instruction its
//! byte offset and binds labels. Pass 2 ([`encode`]) emits the final bytes,
//! resolving address operands against the complete label table. Widths only
//! depend on the mnemonic, so forward references land where pass 1 put them.

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use tracing::{debug, trace};

use crate::error::AsmError;
use crate::instructions::{lookup, InstrDesc, OperandKind};
use crate::literal::parse_value;

/// One source line after comment stripping and label extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine<'a> {
    pub number: usize,
    pub label: Option<&'a str>,
    pub mnemonic: Option<&'a str>,
    pub operands: Vec<&'a str>,
}

/// Output of a successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Program {
    pub code: Vec<u8>,
    /// Start offset of each instruction, in source order.
    pub offsets: Vec<usize>,
    pub labels: BTreeMap<String, usize>,
}

#[derive(Debug, Clone)]
pub(crate) struct Pending<'a> {
    pub line: usize,
    pub offset: usize,
    pub desc: &'static InstrDesc,
    pub operands: Vec<&'a str>,
}

impl<'a> Pending<'a> {
    fn operand(&self) -> Result<&'a str, AsmError> {
        self.operands
            .first()
            .copied()
            .ok_or_else(|| AsmError::MissingOperand {
                line: self.line,
                mnemonic: self.desc.mnemonic.to_string(),
            })
    }

    fn literal(&self, token: &str) -> Result<u64, AsmError> {
        parse_value(token).ok_or_else(|| AsmError::InvalidLiteral {
            line: self.line,
            token: token.to_string(),
        })
    }
}

pub(crate) type Labels<'a> = HashMap<&'a str, usize>;

/// Split one raw line into an optional label and an optional instruction.
/// Returns `None` for blank and comment-only lines.
pub fn normalize_line(number: usize, raw: &str) -> Option<SourceLine<'_>> {
    let text = raw.find(';').map_or(raw, |p| &raw[..p]).trim();
    if text.is_empty() {
        return None;
    }
    let (label, rest) = match text.split_once(':') {
        Some((name, rest)) => (Some(name.trim()), rest),
        None => (None, text),
    };
    let mut tokens = rest.split_whitespace();
    let mnemonic = tokens.next();
    Some(SourceLine {
        number,
        label,
        mnemonic,
        operands: tokens.collect(),
    })
}

/// Pass 1: offsets and labels. Operand tokens are carried verbatim.
pub(crate) fn collect<'a, I>(lines: I) -> Result<(Vec<Pending<'a>>, Labels<'a>), AsmError>
where
    I: IntoIterator<Item = SourceLine<'a>>,
{
    let mut offset = 0usize;
    let mut labels = Labels::new();
    let mut pending = Vec::new();

    for line in lines {
        if let Some(name) = line.label {
            match labels.entry(name) {
                Entry::Occupied(_) => {
                    return Err(AsmError::DuplicateLabel {
                        line: line.number,
                        label: name.to_string(),
                    })
                }
                Entry::Vacant(slot) => {
                    slot.insert(offset);
                }
            }
            trace!(label = name, offset, "label bound");
        }

        let Some(mnemonic) = line.mnemonic else { continue };
        let desc = lookup(mnemonic).ok_or_else(|| AsmError::UnknownOpcode {
            line: line.number,
            token: mnemonic.to_string(),
        })?;
        pending.push(Pending {
            line: line.number,
            offset,
            desc,
            operands: line.operands,
        });
        offset += desc.width();
    }

    debug!(
        instructions = pending.len(),
        labels = labels.len(),
        size = offset,
        "pass 1 complete"
    );
    Ok((pending, labels))
}

/// Pass 2: emit bytes in pending order.
pub(crate) fn encode(pending: &[Pending<'_>], labels: &Labels<'_>) -> Result<Vec<u8>, AsmError> {
    let size = pending.last().map_or(0, |p| p.offset + p.desc.width());
    let mut out = Vec::with_capacity(size);

    for p in pending {
        debug_assert_eq!(out.len(), p.offset, "pass 2 drifted from pass 1 at line {}", p.line);
        out.push(p.desc.opcode);
        match p.desc.kind {
            OperandKind::None => {}
            OperandKind::Imm64 => {
                let value = p.literal(p.operand()?)?;
                out.extend_from_slice(&value.to_le_bytes());
            }
            OperandKind::Addr16 => {
                let token = p.operand()?;
                let addr = match labels.get(token) {
                    Some(&off) => off as u64,
                    None => p.literal(token)?,
                };
                // 16-bit field; wider addresses wrap
                out.extend_from_slice(&(addr as u16).to_le_bytes());
            }
        }
        trace!(offset = p.offset, mnemonic = p.desc.mnemonic, "encoded");
    }

    debug!(bytes = out.len(), "pass 2 complete");
    Ok(out)
}

/// Assemble a full source unit, keeping the symbol table and instruction offsets.
pub fn assemble_program(source: &str) -> Result<Program, AsmError> {
    let lines = source
        .lines()
        .enumerate()
        .filter_map(|(i, raw)| normalize_line(i + 1, raw));
    let (pending, labels) = collect(lines)?;
    let code = encode(&pending, &labels)?;
    Ok(Program {
        code,
        offsets: pending.iter().map(|p| p.offset).collect(),
        labels: labels
            .into_iter()
            .map(|(name, off)| (name.to_string(), off))
            .collect(),
    })
}

/// Assemble a full source unit into raw bytecode.
pub fn assemble(source: &str) -> Result<Vec<u8>, AsmError> {
    assemble_program(source).map(|p| p.code)
}
