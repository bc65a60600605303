//! Identifier and index checks shared by every structure of the class file.
//!
//! The primitives here report what is wrong with a payload (`InvalidUtf8Bytes`,
//! `InvalidJavaIdentifier`) or with an index (`InvalidConstantPoolIndex`). Callers
//! that know which field they are checking rename index failures to the kind for
//! that field with [`referencing`]; payload failures keep their own kind.

use crate::class_parser::constants::{ConstantPool, CPInfo, CPTag};
use crate::class_parser::descriptors::{FieldType, MethodDescriptor};
use crate::class_parser::mutf8;
use crate::class_parser::types::U2;
use crate::class_parser::{ParseError, ParseErrorType};

/// Maps an `InvalidConstantPoolIndex` failure to the kind naming the field being checked.
pub fn referencing(kind: ParseErrorType) -> impl Fn(ParseError) -> ParseError {
    move |e| {
        if e.kind == ParseErrorType::InvalidConstantPoolIndex {
            e.with_kind(kind)
        } else {
            e
        }
    }
}

/// Parameter slots a method may take, `this` included.
pub const MAX_PARAMETER_SLOTS: usize = 255;

fn bad_index(index: U2, expected: &str) -> ParseError {
    ParseError::new(ParseErrorType::InvalidConstantPoolIndex,
                    format!("#{} is not a valid {} entry", index, expected))
}

/// True if `index` names a usable slot: in `1..count` and not the upper half of a Long/Double.
pub fn is_valid_constant_pool_index(pool: &ConstantPool, index: U2) -> bool {
    pool.get(index).is_some()
}

/// Checks that `index` is a `Utf8` entry holding well-formed modified UTF-8.
pub fn is_valid_utf8_index(pool: &ConstantPool, index: U2) -> Result<(), ParseError> {
    let bytes = pool.get_utf8(index).ok_or_else(|| bad_index(index, "Utf8"))?;

    mutf8::validate(bytes).map_err(|at| {
        ParseError::new(ParseErrorType::InvalidUtf8Bytes,
                        format!("#{} has malformed modified UTF-8 at byte {}", index, at))
    })
}

fn is_identifier_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_identifier_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

fn is_plain_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) if is_identifier_start(first) => chars.all(is_identifier_part),
        _ => false,
    }
}

/// Checks a modified UTF-8 payload as a Java identifier. Class identifiers are
/// `/`-separated sequences of plain identifiers (`java/lang/Object`).
pub fn is_valid_java_identifier(bytes: &[u8], is_class_identifier: bool) -> Result<(), ParseError> {
    let str = mutf8::decode(bytes).ok_or_else(|| {
        ParseError::new(ParseErrorType::InvalidUtf8Bytes, "identifier is not modified UTF-8")
    })?;

    let valid = if is_class_identifier {
        str.split('/').all(is_plain_identifier)
    } else {
        is_plain_identifier(&str)
    };

    if valid {
        Ok(())
    } else {
        Err(ParseError::new(ParseErrorType::InvalidJavaIdentifier,
                            format!("'{}' is not a valid identifier", str)))
    }
}

/// Checks that `name_index` is a valid `Utf8` entry holding an identifier.
pub fn is_valid_name_index(pool: &ConstantPool, name_index: U2, is_class_identifier: bool)
    -> Result<(), ParseError> {
    is_valid_utf8_index(pool, name_index).map_err(referencing(ParseErrorType::InvalidNameIndex))?;

    let bytes = pool.get_utf8(name_index).unwrap_or_default();
    is_valid_java_identifier(bytes, is_class_identifier)
}

/// Like [`is_valid_name_index`] for methods, which may also be named `<init>` or `<clinit>`.
pub fn is_valid_method_name_index(pool: &ConstantPool, name_index: U2) -> Result<(), ParseError> {
    is_valid_utf8_index(pool, name_index).map_err(referencing(ParseErrorType::InvalidNameIndex))?;

    match pool.get_utf8(name_index).unwrap_or_default() {
        b"<init>" | b"<clinit>" => Ok(()),
        bytes => is_valid_java_identifier(bytes, false),
    }
}

pub fn is_valid_field_descriptor_index(pool: &ConstantPool, descriptor_index: U2)
    -> Result<FieldType, ParseError> {
    is_valid_utf8_index(pool, descriptor_index)
        .map_err(referencing(ParseErrorType::InvalidFieldDescriptorIndex))?;

    pool.get_string(descriptor_index)
        .and_then(|s| FieldType::parse(&s))
        .ok_or_else(|| ParseError::new(ParseErrorType::InvalidFieldDescriptorIndex,
                                       format!("#{} is not a field descriptor", descriptor_index)))
}

pub fn is_valid_method_descriptor_index(pool: &ConstantPool, descriptor_index: U2)
    -> Result<MethodDescriptor, ParseError> {
    is_valid_utf8_index(pool, descriptor_index)
        .map_err(referencing(ParseErrorType::InvalidMethodDescriptorIndex))?;

    let descriptor = pool.get_string(descriptor_index)
        .and_then(|s| MethodDescriptor::parse(&s))
        .ok_or_else(|| ParseError::new(ParseErrorType::InvalidMethodDescriptorIndex,
                                       format!("#{} is not a method descriptor", descriptor_index)))?;

    if descriptor.parameter_slots() > MAX_PARAMETER_SLOTS {
        return Err(ParseError::new(ParseErrorType::InvalidMethodDescriptorIndex,
                                   format!("#{} takes {} parameter slots", descriptor_index,
                                           descriptor.parameter_slots())));
    }
    Ok(descriptor)
}

/// Checks that `index` is a `Class` entry naming a class or an array type and
/// returns the name.
pub fn is_valid_class_index(pool: &ConstantPool, index: U2) -> Result<String, ParseError> {
    let name_index = match pool.get(index) {
        Some(CPInfo::Class(name_index)) => *name_index,
        _ => return Err(bad_index(index, "Class").with_kind(ParseErrorType::InvalidClassIndex)),
    };

    is_valid_utf8_index(pool, name_index).map_err(referencing(ParseErrorType::InvalidClassIndex))?;
    let name = pool.get_string(name_index).unwrap_or_default();

    if name.starts_with('[') {
        return match FieldType::parse(&name) {
            Some(FieldType::A(_)) => Ok(name),
            _ => Err(ParseError::new(ParseErrorType::InvalidClassIndex,
                                     format!("'{}' is not an array descriptor", name))),
        };
    }

    is_valid_java_identifier(name.as_bytes(), true)?;
    Ok(name)
}

fn check_member_ref(pool: &ConstantPool, tag: CPTag, class_index: U2, name_and_type_index: U2)
    -> Result<(), ParseError> {
    is_valid_class_index(pool, class_index).map_err(referencing(ParseErrorType::InvalidClassIndex))?;

    let (name_index, descriptor_index) = match pool.get(name_and_type_index) {
        Some(CPInfo::NameAndType(name, descriptor)) => (*name, *descriptor),
        _ => return Err(ParseError::new(ParseErrorType::InvalidNameAndTypeIndex,
                                        format!("#{} is not a NameAndType entry", name_and_type_index))),
    };

    if tag == CPTag::Fieldref {
        is_valid_name_index(pool, name_index, false)?;
        is_valid_field_descriptor_index(pool, descriptor_index)?;
    } else {
        is_valid_method_name_index(pool, name_index)?;
        let descriptor = is_valid_method_descriptor_index(pool, descriptor_index)?;

        match pool.get_utf8(name_index).unwrap_or_default() {
            b"<clinit>" => return Err(ParseError::new(ParseErrorType::InvalidNameIndex,
                                                      "<clinit> cannot be referenced".to_string())),
            b"<init>" if descriptor.ret != FieldType::V => {
                return Err(ParseError::new(ParseErrorType::InvalidMethodDescriptorIndex,
                                           format!("#{} must return void for <init>", descriptor_index)));
            }
            _ => {}
        }
    }

    Ok(())
}

/// Checks the cross references of every entry of a fully read pool.
pub fn validate_constant_pool(pool: &ConstantPool) -> Result<(), ParseError> {
    for (index, entry) in pool.iter() {
        let result = match entry {
            CPInfo::Utf8(_) => is_valid_utf8_index(pool, index),
            CPInfo::Integer(_) | CPInfo::Float(_) | CPInfo::Long(_) | CPInfo::Double(_) => Ok(()),
            CPInfo::Class(_) => is_valid_class_index(pool, index).map(|_| ()),
            CPInfo::String(string_index) => is_valid_utf8_index(pool, *string_index)
                .map_err(referencing(ParseErrorType::InvalidStringIndex)),
            CPInfo::Fieldref(class_index, nat_index) =>
                check_member_ref(pool, CPTag::Fieldref, *class_index, *nat_index),
            CPInfo::Methodref(class_index, nat_index) =>
                check_member_ref(pool, CPTag::Methodref, *class_index, *nat_index),
            CPInfo::InterfaceMethodref(class_index, nat_index) =>
                check_member_ref(pool, CPTag::InterfaceMethodref, *class_index, *nat_index),
            CPInfo::NameAndType(name_index, descriptor_index) => {
                is_valid_method_name_index(pool, *name_index).and_then(|_| {
                    if pool.get_utf8(*descriptor_index).map_or(false, |d| d.starts_with(b"(")) {
                        is_valid_method_descriptor_index(pool, *descriptor_index).map(|_| ())
                    } else {
                        is_valid_field_descriptor_index(pool, *descriptor_index).map(|_| ())
                    }
                })
            }
            CPInfo::Hole => Ok(()),
        };

        result.map_err(|e| e.context(format!("constant pool entry #{}", index)))?;
    }

    Ok(())
}
