use thiserror::Error;
use crate::class_parser::types::U2;
use crate::vm::value::Value;

pub mod frame;
pub mod thread;

/// Failure of one execution. It ends that execution only; loaded classes are unaffected.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExecError {
    #[error("unsupported opcode 0x{opcode:02X} at pc {pc}")]
    UnsupportedOpcode { opcode: u8, pc: usize },
    #[error("operand stack {reason} at pc {pc}")]
    OperandStackViolation { pc: usize, reason: &'static str },
    #[error("constant pool entry #{index} cannot be loaded")]
    InvalidConstantPoolIndex { index: U2 },
    #[error("local variable {index} is out of range or holds no value")]
    InvalidLocalIndex { index: usize },
    #[error("expected {expected} operand, found {found}")]
    InvalidOperandType { expected: &'static str, found: Value },
    #[error("instruction at pc {pc} runs past the end of the code")]
    TruncatedInstruction { pc: usize },
    #[error("branch at pc {pc} targets {target}, outside of the code")]
    InvalidBranchTarget { pc: usize, target: i64 },
    #[error("class {0} is not loaded")]
    ClassNotLoaded(String),
    #[error("method {class}.{name}{descriptor} not found")]
    MethodNotFound { class: String, name: String, descriptor: String },
    #[error("method {0} has no code")]
    MissingCode(String),
}
