pub mod assembler;
pub mod disasm;
pub mod error;
pub mod instructions;
pub mod literal;

pub use assembler::{assemble, assemble_program, normalize_line, Program, SourceLine};
pub use error::{AsmError, DecodeError};
pub use instructions::{InstrDesc, OperandKind};
