use serde::Serialize;

use crate::error::DecodeError;
use crate::instructions::{by_opcode, OperandKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Decoded {
    pub offset: usize,
    pub opcode: u8,
    pub mnemonic: &'static str,
    pub kind: OperandKind,
    pub operand: Option<u64>,
    pub width: u8,
}

impl Decoded {
    /// Offset of the instruction that follows this one.
    pub fn next(&self) -> usize {
        self.offset.wrapping_add(self.width as usize)
    }
}

pub fn decode_at(code: &[u8], offset: usize) -> Result<Decoded, DecodeError> {
    let opcode = *code
        .get(offset)
        .ok_or(DecodeError::OutOfRange { offset })?;
    let desc = by_opcode(opcode).ok_or(DecodeError::UnknownOpcode { offset, opcode })?;
    let start = offset + 1;
    let field = code
        .get(start..start + desc.kind.operand_width())
        .ok_or(DecodeError::Truncated { offset, mnemonic: desc.mnemonic })?;
    let operand = match desc.kind {
        OperandKind::None => None,
        OperandKind::Imm64 => {
            let mut b = [0u8; 8];
            b.copy_from_slice(field);
            Some(u64::from_le_bytes(b))
        }
        OperandKind::Addr16 => Some(u16::from_le_bytes([field[0], field[1]]) as u64),
    };
    Ok(Decoded {
        offset,
        opcode,
        mnemonic: desc.mnemonic,
        kind: desc.kind,
        operand,
        width: desc.width() as u8,
    })
}

/// Linear sweep over the whole buffer.
pub fn decode_all(code: &[u8]) -> Result<Vec<Decoded>, DecodeError> {
    let mut out = Vec::new();
    let mut pc = 0usize;
    while pc < code.len() {
        let d = decode_at(code, pc)?;
        pc = d.next();
        out.push(d);
    }
    Ok(out)
}

/// Render as assembler input; feeding the text back reproduces the bytes.
pub fn fmt_decoded(d: &Decoded) -> String {
    match (d.kind, d.operand) {
        (OperandKind::Imm64, Some(v)) => format!("{} {v:#x}", d.mnemonic),
        (OperandKind::Addr16, Some(a)) => format!("{} {a:#06x}", d.mnemonic),
        _ => d.mnemonic.to_string(),
    }
}
