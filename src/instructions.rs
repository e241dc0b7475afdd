use serde::Serialize;

/// Shape of the argument that follows an opcode byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OperandKind {
    None,
    /// 8-byte little-endian unsigned immediate.
    Imm64,
    /// 2-byte little-endian absolute address.
    Addr16,
}

impl OperandKind {
    /// Encoded size of the operand alone, without the opcode byte.
    pub const fn operand_width(self) -> usize {
        match self {
            OperandKind::None => 0,
            OperandKind::Imm64 => 8,
            OperandKind::Addr16 => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct InstrDesc {
    pub mnemonic: &'static str,
    pub opcode: u8,
    pub kind: OperandKind,
}

impl InstrDesc {
    /// Total encoded width: opcode byte plus operand field.
    pub const fn width(&self) -> usize {
        1 + self.kind.operand_width()
    }
}

const fn desc(mnemonic: &'static str, opcode: u8, kind: OperandKind) -> InstrDesc {
    InstrDesc { mnemonic, opcode, kind }
}

pub const TABLE: &[InstrDesc] = &[
    desc("PUSH", 0x01, OperandKind::Imm64),
    desc("POP", 0x02, OperandKind::None),
    desc("DUP", 0x03, OperandKind::None),
    desc("ADD", 0x10, OperandKind::None),
    desc("SUB", 0x11, OperandKind::None),
    desc("MUL", 0x12, OperandKind::None),
    desc("LOAD", 0x20, OperandKind::Addr16),
    desc("STORE", 0x21, OperandKind::Addr16),
    desc("JMP", 0x30, OperandKind::Addr16),
    desc("JZ", 0x31, OperandKind::Addr16),
    desc("CALL", 0x32, OperandKind::Addr16),
    desc("RET", 0x33, OperandKind::None),
    desc("PRINT", 0x40, OperandKind::None),
    desc("GETINT", 0x41, OperandKind::None),
    desc("DUMP_REGS", 0xE0, OperandKind::None),
    desc("DUMP_STACK", 0xE1, OperandKind::None),
    desc("TRIGGER_ERROR", 0xF0, OperandKind::None),
    desc("HALT", 0xFF, OperandKind::None),
];

/// Case-insensitive mnemonic lookup.
pub fn lookup(mnemonic: &str) -> Option<&'static InstrDesc> {
    TABLE
        .iter()
        .find(|d| d.mnemonic.eq_ignore_ascii_case(mnemonic))
}

pub fn by_opcode(opcode: u8) -> Option<&'static InstrDesc> {
    TABLE.iter().find(|d| d.opcode == opcode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn opcodes_and_mnemonics_are_unique() {
        let ops: HashSet<u8> = TABLE.iter().map(|d| d.opcode).collect();
        let names: HashSet<&str> = TABLE.iter().map(|d| d.mnemonic).collect();
        assert_eq!(ops.len(), TABLE.len());
        assert_eq!(names.len(), TABLE.len());
    }

    #[test]
    fn widths_follow_operand_kind() {
        assert_eq!(lookup("push").unwrap().width(), 9);
        assert_eq!(lookup("Jz").unwrap().width(), 3);
        assert_eq!(lookup("HALT").unwrap().width(), 1);
        assert!(lookup("NOP").is_none());
    }

    #[test]
    fn opcode_lookup_matches_mnemonic_lookup() {
        for d in TABLE {
            assert_eq!(by_opcode(d.opcode).unwrap().mnemonic, d.mnemonic);
        }
        assert!(by_opcode(0x00).is_none());
    }
}
