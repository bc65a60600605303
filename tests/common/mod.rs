#![allow(dead_code)]

//! Assembles class files byte by byte for the integration tests.

pub const ACC_PUBLIC: u16 = 0x0001;
pub const ACC_STATIC: u16 = 0x0008;
pub const ACC_FINAL: u16 = 0x0010;
pub const ACC_SUPER: u16 = 0x0020;
pub const ACC_INTERFACE: u16 = 0x0200;
pub const ACC_ABSTRACT: u16 = 0x0400;

pub struct ClassBuilder {
    pool: Vec<u8>,
    next_index: u16,
    pub major_version: u16,
    pub access_flags: u16,
    pub this_class: u16,
    pub super_class: u16,
    interfaces: Vec<u16>,
    fields: Vec<u8>,
    field_count: u16,
    methods: Vec<u8>,
    method_count: u16,
    attributes: Vec<u8>,
    attribute_count: u16,
}

impl ClassBuilder {
    /// A public class `name` extending `java/lang/Object`.
    pub fn new(name: &str) -> Self {
        let mut builder = Self::with_super(name, None);
        builder.super_class = builder.class("java/lang/Object");
        builder
    }

    pub fn with_super(name: &str, super_name: Option<&str>) -> Self {
        let mut builder = ClassBuilder {
            pool: vec![],
            next_index: 1,
            major_version: 52,
            access_flags: ACC_PUBLIC | ACC_SUPER,
            this_class: 0,
            super_class: 0,
            interfaces: vec![],
            fields: vec![],
            field_count: 0,
            methods: vec![],
            method_count: 0,
            attributes: vec![],
            attribute_count: 0,
        };
        builder.this_class = builder.class(name);
        if let Some(super_name) = super_name {
            builder.super_class = builder.class(super_name);
        }
        builder
    }

    /// Appends a raw constant pool entry taking `slots` indices and returns its index.
    pub fn raw_entry(&mut self, bytes: &[u8], slots: u16) -> u16 {
        let index = self.next_index;
        self.pool.extend_from_slice(bytes);
        self.next_index += slots;
        index
    }

    pub fn utf8(&mut self, s: &str) -> u16 {
        self.utf8_bytes(s.as_bytes())
    }

    pub fn utf8_bytes(&mut self, bytes: &[u8]) -> u16 {
        let mut entry = vec![1];
        entry.extend_from_slice(&(bytes.len() as u16).to_be_bytes());
        entry.extend_from_slice(bytes);
        self.raw_entry(&entry, 1)
    }

    pub fn class(&mut self, name: &str) -> u16 {
        let name_index = self.utf8(name);
        self.raw_entry(&[&[7u8][..], &name_index.to_be_bytes()[..]].concat(), 1)
    }

    pub fn integer(&mut self, value: i32) -> u16 {
        self.raw_entry(&[&[3u8][..], &value.to_be_bytes()[..]].concat(), 1)
    }

    pub fn long(&mut self, value: i64) -> u16 {
        self.raw_entry(&[&[5u8][..], &value.to_be_bytes()[..]].concat(), 2)
    }

    pub fn string(&mut self, s: &str) -> u16 {
        let utf8_index = self.utf8(s);
        self.raw_entry(&[&[8u8][..], &utf8_index.to_be_bytes()[..]].concat(), 1)
    }

    pub fn name_and_type(&mut self, name: &str, descriptor: &str) -> u16 {
        let name_index = self.utf8(name);
        let descriptor_index = self.utf8(descriptor);
        self.raw_entry(&[&[12u8][..], &name_index.to_be_bytes()[..], &descriptor_index.to_be_bytes()[..]].concat(), 1)
    }

    pub fn method_ref(&mut self, class: &str, name: &str, descriptor: &str) -> u16 {
        let class_index = self.class(class);
        let nat_index = self.name_and_type(name, descriptor);
        self.raw_entry(&[&[10u8][..], &class_index.to_be_bytes()[..], &nat_index.to_be_bytes()[..]].concat(), 1)
    }

    pub fn interface(&mut self, name: &str) {
        let index = self.class(name);
        self.interfaces.push(index);
    }

    pub fn interface_index(&mut self, index: u16) {
        self.interfaces.push(index);
    }

    pub fn field(&mut self, access_flags: u16, name: &str, descriptor: &str) {
        let name_index = self.utf8(name);
        let descriptor_index = self.utf8(descriptor);
        self.fields.extend_from_slice(&access_flags.to_be_bytes());
        self.fields.extend_from_slice(&name_index.to_be_bytes());
        self.fields.extend_from_slice(&descriptor_index.to_be_bytes());
        self.fields.extend_from_slice(&0u16.to_be_bytes());
        self.field_count += 1;
    }

    /// Adds a method with a `Code` attribute and an empty exception table.
    pub fn method(&mut self, access_flags: u16, name: &str, descriptor: &str,
                  max_stack: u16, max_locals: u16, code: &[u8]) {
        let name_index = self.utf8(name);
        let descriptor_index = self.utf8(descriptor);
        let code_name = self.utf8("Code");

        self.methods.extend_from_slice(&access_flags.to_be_bytes());
        self.methods.extend_from_slice(&name_index.to_be_bytes());
        self.methods.extend_from_slice(&descriptor_index.to_be_bytes());
        self.methods.extend_from_slice(&1u16.to_be_bytes());

        let mut body = vec![];
        body.extend_from_slice(&max_stack.to_be_bytes());
        body.extend_from_slice(&max_locals.to_be_bytes());
        body.extend_from_slice(&(code.len() as u32).to_be_bytes());
        body.extend_from_slice(code);
        body.extend_from_slice(&[0, 0, 0, 0]);

        self.methods.extend_from_slice(&code_name.to_be_bytes());
        self.methods.extend_from_slice(&(body.len() as u32).to_be_bytes());
        self.methods.extend_from_slice(&body);
        self.method_count += 1;
    }

    /// Adds a method without attributes (abstract or native).
    pub fn method_without_code(&mut self, access_flags: u16, name: &str, descriptor: &str) {
        let name_index = self.utf8(name);
        let descriptor_index = self.utf8(descriptor);
        self.methods.extend_from_slice(&access_flags.to_be_bytes());
        self.methods.extend_from_slice(&name_index.to_be_bytes());
        self.methods.extend_from_slice(&descriptor_index.to_be_bytes());
        self.methods.extend_from_slice(&0u16.to_be_bytes());
        self.method_count += 1;
    }

    /// Adds a class attribute whose declared length is the length of `body`.
    pub fn attribute(&mut self, name: &str, body: &[u8]) {
        let length = body.len() as u32;
        self.attribute_with_length(name, body, length);
    }

    pub fn attribute_with_length(&mut self, name: &str, body: &[u8], length: u32) {
        let name_index = self.utf8(name);
        self.attributes.extend_from_slice(&name_index.to_be_bytes());
        self.attributes.extend_from_slice(&length.to_be_bytes());
        self.attributes.extend_from_slice(body);
        self.attribute_count += 1;
    }

    pub fn build(&self) -> Vec<u8> {
        let mut buf = vec![0xCA, 0xFE, 0xBA, 0xBE];
        buf.extend_from_slice(&0u16.to_be_bytes());
        buf.extend_from_slice(&self.major_version.to_be_bytes());

        buf.extend_from_slice(&self.next_index.to_be_bytes());
        buf.extend_from_slice(&self.pool);

        buf.extend_from_slice(&self.access_flags.to_be_bytes());
        buf.extend_from_slice(&self.this_class.to_be_bytes());
        buf.extend_from_slice(&self.super_class.to_be_bytes());

        buf.extend_from_slice(&(self.interfaces.len() as u16).to_be_bytes());
        for interface in &self.interfaces {
            buf.extend_from_slice(&interface.to_be_bytes());
        }

        buf.extend_from_slice(&self.field_count.to_be_bytes());
        buf.extend_from_slice(&self.fields);
        buf.extend_from_slice(&self.method_count.to_be_bytes());
        buf.extend_from_slice(&self.methods);
        buf.extend_from_slice(&self.attribute_count.to_be_bytes());
        buf.extend_from_slice(&self.attributes);
        buf
    }
}
