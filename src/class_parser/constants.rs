use num_enum::TryFromPrimitive;
use crate::class_parser::be_reader::{BEReader, ByteCursor};
use crate::class_parser::mutf8;
use crate::class_parser::types::U2;
use crate::class_parser::{ParseError, ParseErrorType};

#[derive(TryFromPrimitive, Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum CPTag {
    Utf8 = 1,
    Integer = 3,        // START loadable
    Float = 4,
    Long = 5,
    Double = 6,
    Class = 7,
    String = 8,         // END
    Fieldref = 9,
    Methodref = 10,
    InterfaceMethodref = 11,
    NameAndType = 12,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CPInfo {
    Utf8(Vec<u8>),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    Class(U2),
    String(U2),
    Fieldref(U2, U2),
    Methodref(U2, U2),
    InterfaceMethodref(U2, U2),
    NameAndType(U2, U2),
    Hole, // Used for marking an empty slot in the constant pool (for long, double)
}

impl CPInfo {
    pub const fn tag(&self) -> Option<CPTag> {
        match self {
            CPInfo::Utf8(_) => Some(CPTag::Utf8),
            CPInfo::Integer(_) => Some(CPTag::Integer),
            CPInfo::Float(_) => Some(CPTag::Float),
            CPInfo::Long(_) => Some(CPTag::Long),
            CPInfo::Double(_) => Some(CPTag::Double),
            CPInfo::Class(_) => Some(CPTag::Class),
            CPInfo::String(_) => Some(CPTag::String),
            CPInfo::Fieldref(_, _) => Some(CPTag::Fieldref),
            CPInfo::Methodref(_, _) => Some(CPTag::Methodref),
            CPInfo::InterfaceMethodref(_, _) => Some(CPTag::InterfaceMethodref),
            CPInfo::NameAndType(_, _) => Some(CPTag::NameAndType),
            CPInfo::Hole => None,
        }
    }

    /// Long and Double take up their own slot and the one after it.
    pub const fn is_wide(&self) -> bool {
        matches!(self, CPInfo::Long(_) | CPInfo::Double(_))
    }
}

/// The constant pool of one class. Indices are 1-based as in the class file; index 0
/// and the slot after a Long/Double never resolve.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConstantPool {
    entries: Vec<CPInfo>,
}

impl ConstantPool {
    /// Builds a pool from entries in slot order. Wide entries must already be
    /// followed by a [`CPInfo::Hole`].
    pub fn from_entries(entries: Vec<CPInfo>) -> Self {
        ConstantPool { entries }
    }

    /// The `constant_pool_count` value of the class file, one more than the number of slots.
    pub fn count(&self) -> usize {
        self.entries.len() + 1
    }

    pub fn get(&self, index: U2) -> Option<&CPInfo> {
        if index == 0 {
            return None;
        }

        match self.entries.get(index as usize - 1)? {
            CPInfo::Hole => None,
            entry => Some(entry),
        }
    }

    pub fn get_tagged(&self, index: U2, tag: CPTag) -> Option<&CPInfo> {
        self.get(index).filter(|entry| entry.tag() == Some(tag))
    }

    pub fn get_utf8(&self, index: U2) -> Option<&[u8]> {
        match self.get(index)? {
            CPInfo::Utf8(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn get_string(&self, index: U2) -> Option<String> {
        mutf8::decode(self.get_utf8(index)?)
    }

    /// Name of the `Class` entry at `index`, in internal form (`java/lang/Object`).
    pub fn get_class_name(&self, index: U2) -> Option<String> {
        match self.get(index)? {
            CPInfo::Class(name_index) => self.get_string(*name_index),
            _ => None,
        }
    }

    /// Iterates over every usable slot together with its index.
    pub fn iter(&self) -> impl Iterator<Item = (U2, &CPInfo)> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| !matches!(entry, CPInfo::Hole))
            .map(|(i, entry)| ((i + 1) as U2, entry))
    }
}

fn parse_cp_info(cursor: &mut ByteCursor, constant_pool: &mut Vec<CPInfo>) -> Result<(), ParseError> {
    use CPTag::*;

    let tag = cursor.read_u1()?;
    let tag = CPTag::try_from(tag)
        .map_err(|_| ParseError::new(ParseErrorType::InvalidConstantPoolTag,
                                     format!("unknown tag {}", tag)))?;

    match tag {
        Utf8 => {
            let length = cursor.read_u2()? as usize;
            let bytes = cursor.read_bytes(length)?;
            if let Err(at) = mutf8::validate(bytes) {
                return Err(ParseError::new(ParseErrorType::InvalidUtf8Bytes,
                                           format!("malformed modified UTF-8 at byte {}", at)));
            }
            constant_pool.push(CPInfo::Utf8(bytes.to_vec()));
        }
        Integer => constant_pool.push(CPInfo::Integer(cursor.read_u4()? as i32)),
        Float => constant_pool.push(CPInfo::Float(f32::from_bits(cursor.read_u4()?))),
        Long | Double => {
            let bits = u64::read(cursor)?;
            constant_pool.push(if tag == Long {
                CPInfo::Long(bits as i64)
            } else {
                CPInfo::Double(f64::from_bits(bits))
            });
            constant_pool.push(CPInfo::Hole);
        }
        Class => constant_pool.push(CPInfo::Class(cursor.read_u2()?)),
        String => constant_pool.push(CPInfo::String(cursor.read_u2()?)),
        Fieldref | Methodref | InterfaceMethodref | NameAndType => {
            let first = cursor.read_u2()?;
            let second = cursor.read_u2()?;
            constant_pool.push(match tag {
                Fieldref => CPInfo::Fieldref(first, second),
                Methodref => CPInfo::Methodref(first, second),
                InterfaceMethodref => CPInfo::InterfaceMethodref(first, second),
                _ => CPInfo::NameAndType(first, second),
            });
        }
    }

    Ok(())
}

/// Reads `constant_pool_count` and the entries that follow it. Cross references
/// between entries are checked separately, once the whole pool is known.
pub fn parse_constant_pool(cursor: &mut ByteCursor) -> Result<ConstantPool, ParseError> {
    let count_offset = cursor.position();
    let constant_pool_count = cursor.read_u2()?;
    if constant_pool_count == 0 {
        return Err(ParseError::new(ParseErrorType::InvalidConstantPoolCount,
                                   "constant_pool_count must be at least 1")
            .at(count_offset));
    }

    let slots = constant_pool_count as usize - 1;
    let mut constant_pool = Vec::with_capacity(slots);
    while constant_pool.len() < slots {
        let start = cursor.position();
        let index = constant_pool.len() + 1;

        parse_cp_info(cursor, &mut constant_pool)
            .map_err(|e| e.at(start).context(format!("constant pool entry #{}", index)))?;

        if constant_pool[index - 1].is_wide() && index == slots {
            return Err(ParseError::new(ParseErrorType::InvalidConstantPoolCount,
                                       format!("8-byte constant #{} overruns the pool", index))
                .at(start));
        }
        log::trace!("#{} = {:?}", index, constant_pool[index - 1]);
    }

    Ok(ConstantPool::from_entries(constant_pool))
}
