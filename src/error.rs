/// Assembly failures. Every variant carries the 1-based source line and the
/// token that caused it; any of them aborts the whole unit.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AsmError {
    #[error("line {line}: unknown opcode '{token}'")]
    UnknownOpcode { line: usize, token: String },
    #[error("line {line}: {mnemonic} requires an operand")]
    MissingOperand { line: usize, mnemonic: String },
    #[error("line {line}: invalid literal '{token}'")]
    InvalidLiteral { line: usize, token: String },
    #[error("line {line}: duplicate label '{label}'")]
    DuplicateLabel { line: usize, label: String },
}

impl AsmError {
    pub fn line(&self) -> usize {
        match self {
            AsmError::UnknownOpcode { line, .. }
            | AsmError::MissingOperand { line, .. }
            | AsmError::InvalidLiteral { line, .. }
            | AsmError::DuplicateLabel { line, .. } => *line,
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unknown opcode {opcode:#04x} at {offset:#06x}")]
    UnknownOpcode { offset: usize, opcode: u8 },
    #[error("offset {offset:#06x} is past end of bytecode")]
    OutOfRange { offset: usize },
    #[error("{mnemonic} at {offset:#06x} runs past end of bytecode")]
    Truncated { offset: usize, mnemonic: &'static str },
}
