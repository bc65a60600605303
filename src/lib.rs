//! A small Java virtual machine: a validating class file parser, a registry of
//! loaded classes and an interpreter for a subset of the JVM instruction set.

pub mod class_parser;
pub mod vm;

pub use class_parser::{parse_class, ParseError, ParseErrorType};
pub use class_parser::types::JavaClass;
pub use vm::class_loader::{ClassSource, DirectoryClassSource, LoadError};
pub use vm::thread::ExecError;
pub use vm::value::{Reference, Value};
pub use vm::vm::JavaVirtualMachine;
