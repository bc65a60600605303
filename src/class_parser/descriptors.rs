use std::fmt::{Display, Formatter};
use crate::class_parser::validity::is_valid_java_identifier;

const MAX_ARRAY_DIMENSIONS: usize = 255;

#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum FieldType {
    B,
    C,
    D,
    F,
    I,
    J,
    L(String),
    S,
    Z,
    A(Box<FieldType>), // [
    V
}

impl FieldType {
    /// Number of local variable / operand stack slots a value of this type takes.
    pub fn slots(&self) -> usize {
        match self {
            FieldType::J | FieldType::D => 2,
            FieldType::V => 0,
            _ => 1,
        }
    }

    fn parse_prefix(str: &str, is_parameter: bool) -> Option<(FieldType, &str)> {
        let mut dimensions = 0;
        let mut rest = str;
        while let Some(stripped) = rest.strip_prefix('[') {
            dimensions += 1;
            rest = stripped;
        }

        if dimensions > MAX_ARRAY_DIMENSIONS || (dimensions > 0 && rest.starts_with('V')) {
            return None;
        }

        let mut chars = rest.chars();
        let (component, rest) = match chars.next()? {
            'B' => (FieldType::B, chars.as_str()),
            'C' => (FieldType::C, chars.as_str()),
            'D' => (FieldType::D, chars.as_str()),
            'F' => (FieldType::F, chars.as_str()),
            'I' => (FieldType::I, chars.as_str()),
            'J' => (FieldType::J, chars.as_str()),
            'S' => (FieldType::S, chars.as_str()),
            'Z' => (FieldType::Z, chars.as_str()),
            'V' if !is_parameter => (FieldType::V, chars.as_str()),
            'L' => {
                let body = chars.as_str();
                let end = body.find(';')?;
                let name = &body[..end];
                if is_valid_java_identifier(name.as_bytes(), true).is_err() {
                    return None;
                }
                (FieldType::L(name.to_string()), &body[end + 1..])
            }
            _ => return None,
        };

        let mut field_type = component;
        for _ in 0..dimensions {
            field_type = FieldType::A(Box::new(field_type));
        }

        Some((field_type, rest))
    }

    /// Parses a complete field descriptor such as `[Ljava/lang/String;`.
    pub fn parse(str: &str) -> Option<Self> {
        match Self::parse_prefix(str, true) {
            Some((field_type, rest)) if rest.is_empty() => Some(field_type),
            _ => None,
        }
    }
}

impl Display for FieldType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldType::L(name) => write!(f, "L{};", name),
            FieldType::A(component) => write!(f, "[{}", component),
            other => write!(f, "{:?}", other),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct MethodDescriptor {
    pub parameters: Vec<FieldType>,
    pub ret: FieldType
}

impl MethodDescriptor {
    pub fn parse(str: &str) -> Option<Self> {
        let mut str = str.strip_prefix('(')?;

        let mut parameters = vec![];
        while let Some((arg, rest)) = FieldType::parse_prefix(str, true) {
            parameters.push(arg);
            str = rest;
        }

        str = str.strip_prefix(')')?;

        match FieldType::parse_prefix(str, false) {
            Some((ret, rest)) if rest.is_empty() => Some(MethodDescriptor {
                parameters,
                ret,
            }),
            _ => None
        }
    }

    /// Local variable slots taken by the parameters (not counting `this`).
    pub fn parameter_slots(&self) -> usize {
        self.parameters.iter().map(FieldType::slots).sum()
    }
}
