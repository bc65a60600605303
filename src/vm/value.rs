use std::fmt::{Display, Formatter};
use crate::class_parser::types::U2;

/// Object references. Only the kinds `ldc` and `aconst_null` can produce exist;
/// constants stay unresolved and are identified by their constant pool index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reference {
    Null,
    String(U2),
    Class(U2),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Reference(Reference),
}

impl Value {
    pub const NULL: Value = Value::Reference(Reference::Null);

    /// Operand stack slots taken by the value (long and double count twice).
    pub const fn slots(&self) -> usize {
        match self {
            Value::Long(_) | Value::Double(_) => 2,
            _ => 1,
        }
    }

    pub const fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub const fn is_reference(&self) -> bool {
        matches!(self, Value::Reference(_))
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Long(v) => write!(f, "{}L", v),
            Value::Float(v) => write!(f, "{}F", v),
            Value::Double(v) => write!(f, "{}D", v),
            Value::Reference(Reference::Null) => write!(f, "null"),
            Value::Reference(Reference::String(index)) => write!(f, "String#{}", index),
            Value::Reference(Reference::Class(index)) => write!(f, "Class#{}", index),
        }
    }
}
