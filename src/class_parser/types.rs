use crate::class_parser::access_flags::{ClassAccessFlags, FieldAccessFlags, InnerClassAccessFlags, MethodAccessFlags};
use crate::class_parser::constants::ConstantPool;
use crate::class_parser::descriptors::{FieldType, MethodDescriptor};

pub type U2 = u16;

#[derive(Debug, Clone, PartialEq)]
pub struct FieldInfo {
    pub access_flags: FieldAccessFlags,
    pub name_index: U2,
    pub descriptor_index: U2,
    pub descriptor: FieldType,
    pub attributes: Vec<AttributeInfo>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodInfo {
    pub access_flags: MethodAccessFlags,
    pub name_index: U2,
    pub descriptor_index: U2,
    pub descriptor: MethodDescriptor,
    pub attributes: Vec<AttributeInfo>,
}

impl MethodInfo {
    pub fn is_static(&self) -> bool {
        self.access_flags.contains(MethodAccessFlags::STATIC)
    }

    pub fn code(&self) -> Option<&Code> {
        self.attributes.iter().find_map(|attribute| match attribute {
            AttributeInfo::Code(code) => Some(code),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionTableEntry {
    pub start_pc: U2,
    pub end_pc: U2,
    pub handler_pc: U2,
    pub catch_type: U2, // 0 for finally blocks
}

#[derive(Debug, Clone, PartialEq)]
pub struct Code {
    pub max_stack: U2,
    pub max_locals: U2,
    pub code: Vec<u8>,
    pub exception_table: Vec<ExceptionTableEntry>,
    pub attributes: Vec<AttributeInfo>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineNumberEntry {
    pub start_pc: U2,
    pub line_number: U2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InnerClassInfo {
    pub inner_class_index: U2,
    pub outer_class_index: U2,      // 0 if not a member
    pub inner_class_name_index: U2, // 0 if anonymous
    pub inner_class_access_flags: InnerClassAccessFlags,
}

/// A decoded attribute, selected by the `Utf8` name its `attribute_name_index` points at.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeInfo {
    ConstantValue { constant_value_index: U2 },
    Code(Code),
    Exceptions { exception_index_table: Vec<U2> },
    InnerClasses(Vec<InnerClassInfo>),
    SourceFile { sourcefile_index: U2 },
    LineNumberTable(Vec<LineNumberEntry>),
    Deprecated,
    /// Any attribute this parser does not interpret, kept as is.
    Unknown { name_index: U2, info: Vec<u8> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct JavaClass {
    pub minor_version: U2,
    pub major_version: U2,
    pub constant_pool: ConstantPool,
    pub access_flags: ClassAccessFlags,
    pub this_class: U2,
    pub super_class: U2, // 0 only for java/lang/Object
    pub interfaces: Vec<U2>,
    pub fields: Vec<FieldInfo>,
    pub methods: Vec<MethodInfo>,
    pub attributes: Vec<AttributeInfo>,
}

impl JavaClass {
    /// Name of this class in internal form. Validated during parsing, so only a
    /// hand-built `JavaClass` can make this empty.
    pub fn name(&self) -> String {
        self.constant_pool.get_class_name(self.this_class).unwrap_or_default()
    }

    pub fn super_class_name(&self) -> Option<String> {
        self.constant_pool.get_class_name(self.super_class)
    }

    pub fn interface_names(&self) -> Vec<String> {
        self.interfaces.iter()
            .filter_map(|&index| self.constant_pool.get_class_name(index))
            .collect()
    }

    pub fn is_interface(&self) -> bool {
        self.access_flags.contains(ClassAccessFlags::INTERFACE)
    }

    pub fn method_name(&self, method: &MethodInfo) -> String {
        self.constant_pool.get_string(method.name_index).unwrap_or_default()
    }

    pub fn field_name(&self, field: &FieldInfo) -> String {
        self.constant_pool.get_string(field.name_index).unwrap_or_default()
    }

    pub fn get_method(&self, name: &str, descriptor: &str) -> Option<&MethodInfo> {
        let name = name.as_bytes();
        let descriptor = descriptor.as_bytes();

        self.methods.iter().find(|m| {
            self.constant_pool.get_utf8(m.name_index) == Some(name)
                && self.constant_pool.get_utf8(m.descriptor_index) == Some(descriptor)
        })
    }

    /// First method called `name`, regardless of its descriptor.
    pub fn find_method(&self, name: &str) -> Option<&MethodInfo> {
        self.methods.iter()
            .find(|m| self.constant_pool.get_utf8(m.name_index) == Some(name.as_bytes()))
    }

    pub fn source_file(&self) -> Option<String> {
        self.attributes.iter().find_map(|attribute| match attribute {
            AttributeInfo::SourceFile { sourcefile_index } => self.constant_pool.get_string(*sourcefile_index),
            _ => None,
        })
    }

    pub fn inner_classes(&self) -> &[InnerClassInfo] {
        self.attributes.iter()
            .find_map(|attribute| match attribute {
                AttributeInfo::InnerClasses(classes) => Some(classes.as_slice()),
                _ => None,
            })
            .unwrap_or(&[])
    }
}
