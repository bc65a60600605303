use std::collections::HashSet;
use crate::class_parser::access_flags::InnerClassAccessFlags;
use crate::class_parser::be_reader::ByteCursor;
use crate::class_parser::constants::{ConstantPool, CPInfo, CPTag};
use crate::class_parser::types::{AttributeInfo, Code, ExceptionTableEntry, InnerClassInfo, LineNumberEntry, U2};
use crate::class_parser::validity::{is_valid_name_index, is_valid_utf8_index, referencing};
use crate::class_parser::{ParseError, ParseErrorType};

const MAX_CODE_LENGTH: usize = 65536;

pub fn parse_attributes(cursor: &mut ByteCursor, pool: &ConstantPool) -> Result<Vec<AttributeInfo>, ParseError> {
    let attributes_count = cursor.read_u2()?;

    let mut attributes = Vec::with_capacity(attributes_count as usize);
    for _ in 0..attributes_count {
        attributes.push(parse_attribute(cursor, pool)?);
    }

    Ok(attributes)
}

pub fn parse_attribute(cursor: &mut ByteCursor, pool: &ConstantPool) -> Result<AttributeInfo, ParseError> {
    let start = cursor.position();
    let name_index = cursor.read_u2()?;
    let attribute_length = cursor.read_u4()? as usize;

    is_valid_utf8_index(pool, name_index)
        .map_err(referencing(ParseErrorType::InvalidNameIndex))
        .map_err(|e| e.at(start))?;

    // Attribute bodies are read from their own window so a body can never run
    // past its declared length into the next structure.
    let body_start = cursor.position();
    let body = cursor.read_bytes(attribute_length)?;
    let mut reader = ByteCursor::new(body);

    let name = pool.get_utf8(name_index).unwrap_or_default();
    let attribute = match name {
        b"ConstantValue" => parse_constant_value(&mut reader, pool),
        b"Code" => parse_code(&mut reader, pool),
        b"Exceptions" => parse_exceptions(&mut reader, pool),
        b"InnerClasses" => parse_inner_classes(&mut reader, pool),
        b"SourceFile" => parse_source_file(&mut reader, pool),
        b"LineNumberTable" => parse_line_number_table(&mut reader),
        b"Deprecated" => Ok(AttributeInfo::Deprecated),
        _ => {
            log::trace!("keeping unknown attribute '{}'", String::from_utf8_lossy(name));
            return Ok(AttributeInfo::Unknown { name_index, info: body.to_vec() });
        }
    };

    let attribute = attribute.map_err(|e| {
        let e = if e.kind == ParseErrorType::UnexpectedEndOfData {
            e.with_kind(ParseErrorType::AttributeLengthMismatch)
        } else {
            e
        };
        e.at(start).context(format!("attribute '{}'", String::from_utf8_lossy(name)))
    })?;

    if !reader.is_empty() {
        return Err(ParseError::new(ParseErrorType::AttributeLengthMismatch,
                                   format!("attribute '{}' declares {} bytes but uses {}",
                                           String::from_utf8_lossy(name), attribute_length,
                                           attribute_length - reader.remaining()))
            .at(body_start));
    }

    Ok(attribute)
}

fn invalid_attribute_index(what: &str, index: U2) -> ParseError {
    ParseError::new(ParseErrorType::InvalidAttributeIndex, format!("{} #{} is invalid", what, index))
}

fn parse_constant_value(reader: &mut ByteCursor, pool: &ConstantPool) -> Result<AttributeInfo, ParseError> {
    let constant_value_index = reader.read_u2()?;

    match pool.get(constant_value_index) {
        Some(CPInfo::Integer(_) | CPInfo::Float(_) | CPInfo::Long(_) | CPInfo::Double(_) | CPInfo::String(_)) =>
            Ok(AttributeInfo::ConstantValue { constant_value_index }),
        _ => Err(invalid_attribute_index("constantvalue_index", constant_value_index)),
    }
}

fn parse_source_file(reader: &mut ByteCursor, pool: &ConstantPool) -> Result<AttributeInfo, ParseError> {
    let sourcefile_index = reader.read_u2()?;

    is_valid_utf8_index(pool, sourcefile_index)
        .map_err(|_| invalid_attribute_index("sourcefile_index", sourcefile_index))?;

    Ok(AttributeInfo::SourceFile { sourcefile_index })
}

fn parse_exceptions(reader: &mut ByteCursor, pool: &ConstantPool) -> Result<AttributeInfo, ParseError> {
    let number_of_exceptions = reader.read_u2()?;

    let mut exception_index_table = Vec::with_capacity(number_of_exceptions as usize);
    for _ in 0..number_of_exceptions {
        let index = reader.read_u2()?;
        if pool.get_tagged(index, CPTag::Class).is_none() {
            return Err(invalid_attribute_index("exception class", index));
        }
        exception_index_table.push(index);
    }

    Ok(AttributeInfo::Exceptions { exception_index_table })
}

fn parse_line_number_table(reader: &mut ByteCursor) -> Result<AttributeInfo, ParseError> {
    let line_number_table_length = reader.read_u2()?;

    let mut table = Vec::with_capacity(line_number_table_length as usize);
    for _ in 0..line_number_table_length {
        table.push(LineNumberEntry {
            start_pc: reader.read_u2()?,
            line_number: reader.read_u2()?,
        });
    }

    Ok(AttributeInfo::LineNumberTable(table))
}

fn parse_inner_classes(reader: &mut ByteCursor, pool: &ConstantPool) -> Result<AttributeInfo, ParseError> {
    let number_of_classes = reader.read_u2()?;

    let mut classes = Vec::with_capacity(number_of_classes as usize);
    let mut seen = HashSet::new();
    for _ in 0..number_of_classes {
        let inner_class_index = reader.read_u2()?;
        let outer_class_index = reader.read_u2()?;
        let inner_class_name_index = reader.read_u2()?;
        let inner_class_access_flags = InnerClassAccessFlags::from_bits_truncate(reader.read_u2()?);

        // Class entries themselves were checked with the rest of the pool
        if pool.get_tagged(inner_class_index, CPTag::Class).is_none() {
            return Err(ParseError::new(ParseErrorType::InvalidInnerClassIndex,
                                       format!("inner_class_info_index #{} is not a Class", inner_class_index)));
        }

        if outer_class_index != 0 && pool.get_tagged(outer_class_index, CPTag::Class).is_none() {
            return Err(ParseError::new(ParseErrorType::InvalidInnerClassIndex,
                                       format!("outer_class_info_index #{} is not a Class", outer_class_index)));
        }

        if inner_class_name_index != 0 {
            is_valid_name_index(pool, inner_class_name_index, false)
                .map_err(|e| match e.kind {
                    ParseErrorType::InvalidNameIndex => e.with_kind(ParseErrorType::InvalidInnerClassIndex),
                    _ => e,
                })?;
        }

        if !seen.insert(inner_class_index) {
            log::warn!("inner class #{} is listed more than once", inner_class_index);
        }

        classes.push(InnerClassInfo {
            inner_class_index,
            outer_class_index,
            inner_class_name_index,
            inner_class_access_flags,
        });
    }

    Ok(AttributeInfo::InnerClasses(classes))
}

fn parse_code(reader: &mut ByteCursor, pool: &ConstantPool) -> Result<AttributeInfo, ParseError> {
    let max_stack = reader.read_u2()?;
    let max_locals = reader.read_u2()?;
    let code_length = reader.read_u4()? as usize;

    if code_length == 0 || code_length >= MAX_CODE_LENGTH {
        return Err(ParseError::new(ParseErrorType::InvalidCodeLength,
                                   format!("code_length {} is out of range", code_length)));
    }
    let code = reader.read_bytes(code_length)?.to_vec();

    let exception_table_length = reader.read_u2()?;
    let mut exception_table = Vec::with_capacity(exception_table_length as usize);
    for _ in 0..exception_table_length {
        let entry = ExceptionTableEntry {
            start_pc: reader.read_u2()?,
            end_pc: reader.read_u2()?,
            handler_pc: reader.read_u2()?,
            catch_type: reader.read_u2()?,
        };

        if entry.start_pc >= entry.end_pc || entry.end_pc as usize > code_length
            || entry.handler_pc as usize >= code_length {
            return Err(ParseError::new(ParseErrorType::InvalidExceptionTableEntry,
                                       format!("handler [{}, {}) -> {} does not fit in {} bytes of code",
                                               entry.start_pc, entry.end_pc, entry.handler_pc, code_length)));
        }
        if entry.catch_type != 0 && pool.get_tagged(entry.catch_type, CPTag::Class).is_none() {
            return Err(invalid_attribute_index("catch_type", entry.catch_type));
        }
        exception_table.push(entry);
    }

    let attributes = parse_attributes(reader, pool)?;

    Ok(AttributeInfo::Code(Code {
        max_stack,
        max_locals,
        code,
        exception_table,
        attributes,
    }))
}
