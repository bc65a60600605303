//! Class file parsing. [`parse_class`] turns the bytes of a class file into a
//! fully validated [`JavaClass`]; nothing partially parsed ever escapes.

use strum_macros::Display;
use thiserror::Error;
use crate::class_parser::access_flags::{check_class_flags, check_field_flags, check_method_flags, ClassAccessFlags, MethodAccessFlags};
use crate::class_parser::attributes::parse_attributes;
use crate::class_parser::be_reader::ByteCursor;
use crate::class_parser::constants::{ConstantPool, parse_constant_pool};
use crate::class_parser::descriptors::FieldType;
use crate::class_parser::types::{FieldInfo, JavaClass, MethodInfo, U2};
use crate::class_parser::validity::{is_valid_field_descriptor_index, is_valid_method_descriptor_index, is_valid_method_name_index, is_valid_name_index, validate_constant_pool, MAX_PARAMETER_SLOTS};

pub mod access_flags;
pub mod attributes;
pub mod be_reader;
pub mod constants;
pub mod descriptors;
pub mod mutf8;
pub mod types;
pub mod validity;

pub const MAGIC: u32 = 0xCAFEBABE;
pub const MIN_SUPPORTED_MAJOR: u16 = 45;
pub const MAX_SUPPORTED_MAJOR: u16 = 65;

pub const JAVA_LANG_OBJECT: &str = "java/lang/Object";

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorType {
    // structural
    UnexpectedEndOfData,
    InvalidMagic,
    UnsupportedVersion,
    TrailingData,
    AttributeLengthMismatch,
    // referential
    InvalidConstantPoolIndex,
    InvalidClassIndex,
    InvalidSuperClassIndex,
    InvalidThisClassIndex,
    InvalidInterfaceIndex,
    InvalidNameIndex,
    InvalidNameAndTypeIndex,
    InvalidFieldDescriptorIndex,
    InvalidMethodDescriptorIndex,
    InvalidStringIndex,
    InvalidAttributeIndex,
    InvalidInnerClassIndex,
    // lexical
    InvalidUtf8Bytes,
    InvalidJavaIdentifier,
    // semantic
    InvalidAccessFlags,
    InvalidConstantPoolCount,
    InvalidConstantPoolTag,
    InvalidCodeLength,
    InvalidExceptionTableEntry,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{kind}: {message}{}", location(.offset))]
pub struct ParseError {
    pub kind: ParseErrorType,
    pub message: String,
    /// Offset in the class file where the failing item started
    pub offset: Option<usize>,
}

fn location(offset: &Option<usize>) -> String {
    match offset {
        Some(offset) => format!(" (at byte {})", offset),
        None => String::new(),
    }
}

impl ParseError {
    pub fn new(kind: ParseErrorType, message: impl Into<String>) -> Self {
        ParseError {
            kind,
            message: message.into(),
            offset: None,
        }
    }

    pub fn at(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn with_kind(mut self, kind: ParseErrorType) -> Self {
        self.kind = kind;
        self
    }

    pub fn context(mut self, context: impl AsRef<str>) -> Self {
        self.message = format!("{}: {}", context.as_ref(), self.message);
        self
    }
}

fn parse_field_info(cursor: &mut ByteCursor, pool: &ConstantPool, class_flags: ClassAccessFlags)
    -> Result<FieldInfo, ParseError> {
    let access_flags = cursor.read_u2()?;
    let name_index = cursor.read_u2()?;
    let descriptor_index = cursor.read_u2()?;

    let access_flags = check_field_flags(access_flags, class_flags)?;
    is_valid_name_index(pool, name_index, false)?;
    let descriptor = is_valid_field_descriptor_index(pool, descriptor_index)?;

    let attributes = parse_attributes(cursor, pool)?;

    Ok(FieldInfo {
        access_flags,
        name_index,
        descriptor_index,
        descriptor,
        attributes,
    })
}

fn parse_method_info(cursor: &mut ByteCursor, pool: &ConstantPool, class_flags: ClassAccessFlags,
                     major_version: U2) -> Result<MethodInfo, ParseError> {
    let access_flags = cursor.read_u2()?;
    let name_index = cursor.read_u2()?;
    let descriptor_index = cursor.read_u2()?;

    is_valid_method_name_index(pool, name_index)?;
    let name = pool.get_utf8(name_index).unwrap_or_default();
    let access_flags = check_method_flags(access_flags, class_flags, name, major_version)?;

    let descriptor = is_valid_method_descriptor_index(pool, descriptor_index)?;
    if name.starts_with(b"<") && descriptor.ret != FieldType::V {
        return Err(ParseError::new(ParseErrorType::InvalidMethodDescriptorIndex,
                                   format!("{} must return void", String::from_utf8_lossy(name))));
    }
    let this_slot = usize::from(!access_flags.contains(MethodAccessFlags::STATIC));
    if descriptor.parameter_slots() + this_slot > MAX_PARAMETER_SLOTS {
        return Err(ParseError::new(ParseErrorType::InvalidMethodDescriptorIndex,
                                   format!("{} takes more than {} parameter slots",
                                           String::from_utf8_lossy(name), MAX_PARAMETER_SLOTS)));
    }

    let attributes = parse_attributes(cursor, pool)?;

    Ok(MethodInfo {
        access_flags,
        name_index,
        descriptor_index,
        descriptor,
        attributes,
    })
}

/// Reads an index that must name a non-array `Class` entry.
fn read_class_index(cursor: &mut ByteCursor, pool: &ConstantPool, kind: ParseErrorType)
    -> Result<(U2, String), ParseError> {
    let offset = cursor.position();
    let index = cursor.read_u2()?;

    match pool.get_class_name(index) {
        Some(name) if !name.starts_with('[') => Ok((index, name)),
        _ => Err(ParseError::new(kind, format!("#{} is not a class", index)).at(offset)),
    }
}

pub fn parse_class(buf: &[u8]) -> Result<JavaClass, ParseError> {
    let mut cursor = ByteCursor::new(buf);

    let magic = cursor.read_u4()?;
    if magic != MAGIC {
        return Err(ParseError::new(ParseErrorType::InvalidMagic,
                                   format!("Not a class file (magic 0x{:08X})", magic)).at(0));
    }

    let minor_version = cursor.read_u2()?;
    let major_version = cursor.read_u2()?;
    if !(MIN_SUPPORTED_MAJOR..=MAX_SUPPORTED_MAJOR).contains(&major_version) {
        return Err(ParseError::new(ParseErrorType::UnsupportedVersion,
                                   format!("class file version {}.{}", major_version, minor_version))
            .at(4));
    }

    let constant_pool = parse_constant_pool(&mut cursor)?;
    validate_constant_pool(&constant_pool)?;

    let flags_offset = cursor.position();
    let access_flags = check_class_flags(cursor.read_u2()?).map_err(|e| e.at(flags_offset))?;

    let (this_class, this_name) = read_class_index(&mut cursor, &constant_pool,
                                                   ParseErrorType::InvalidThisClassIndex)?;

    let super_offset = cursor.position();
    let super_class = cursor.read_u2()?;
    let super_error = |message: String| {
        ParseError::new(ParseErrorType::InvalidSuperClassIndex, message).at(super_offset)
    };
    if this_name == JAVA_LANG_OBJECT {
        if super_class != 0 {
            return Err(super_error(format!("{} cannot have a super class", JAVA_LANG_OBJECT)));
        }
    } else if super_class == 0 {
        return Err(super_error(format!("{} has no super class", this_name)));
    } else {
        match constant_pool.get_class_name(super_class) {
            Some(name) if !name.starts_with('[') => {}
            _ => return Err(super_error(format!("#{} is not a class", super_class))),
        }
    }

    let interfaces_count = cursor.read_u2()?;
    let mut interfaces = Vec::with_capacity(interfaces_count as usize);
    for _ in 0..interfaces_count {
        interfaces.push(read_class_index(&mut cursor, &constant_pool,
                                         ParseErrorType::InvalidInterfaceIndex)?.0);
    }

    let fields_count = cursor.read_u2()?;
    let mut fields = Vec::with_capacity(fields_count as usize);
    for i in 0..fields_count {
        let start = cursor.position();
        let field = parse_field_info(&mut cursor, &constant_pool, access_flags)
            .map_err(|e| e.context(format!("field #{}", i)))
            .map_err(|e| if e.offset.is_none() { e.at(start) } else { e })?;
        fields.push(field);
    }

    let methods_count = cursor.read_u2()?;
    let mut methods = Vec::with_capacity(methods_count as usize);
    for i in 0..methods_count {
        let start = cursor.position();
        let method = parse_method_info(&mut cursor, &constant_pool, access_flags, major_version)
            .map_err(|e| e.context(format!("method #{}", i)))
            .map_err(|e| if e.offset.is_none() { e.at(start) } else { e })?;
        methods.push(method);
    }

    let attributes = parse_attributes(&mut cursor, &constant_pool)?;

    if !cursor.is_empty() {
        return Err(ParseError::new(ParseErrorType::TrailingData,
                                   format!("Class file is longer than expected by {} bytes",
                                           cursor.remaining()))
            .at(cursor.position()));
    }

    log::debug!("parsed class {} (version {}.{}, {} fields, {} methods)", this_name, major_version,
                minor_version, fields.len(), methods.len());

    Ok(JavaClass {
        minor_version,
        major_version,
        constant_pool,
        access_flags,
        this_class,
        super_class,
        interfaces,
        fields,
        methods,
        attributes,
    })
}
