use bitflags::bitflags;
use crate::class_parser::{ParseError, ParseErrorType};

bitflags! {
    /// Access flags on classes
    pub struct ClassAccessFlags: u16 {
        const PUBLIC = 0x0001;
        const FINAL = 0x0010;
        const SUPER = 0x0020;
        const INTERFACE = 0x0200;
        const ABSTRACT = 0x0400;
        const SYNTHETIC = 0x1000;
        const ANNOTATION = 0x2000;
        const ENUM = 0x4000;
    }
}

bitflags! {
    /// Access flags on fields
    pub struct FieldAccessFlags: u16 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const VOLATILE = 0x0040;
        const TRANSIENT = 0x0080;
        const SYNTHETIC = 0x1000;
        const ENUM = 0x4000;
    }
}

bitflags! {
    /// Access flags on methods
    pub struct MethodAccessFlags: u16 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const SYNCHRONIZED = 0x0020;
        const BRIDGE = 0x0040;
        const VARARGS = 0x0080;
        const NATIVE = 0x0100;
        const ABSTRACT = 0x0400;
        const STRICT = 0x0800;
        const SYNTHETIC = 0x1000;
    }
}

bitflags! {
    /// Access flags on inner classes
    pub struct InnerClassAccessFlags: u16 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const INTERFACE = 0x0200;
        const ABSTRACT = 0x0400;
        const SYNTHETIC = 0x1000;
        const ANNOTATION = 0x2000;
        const ENUM = 0x4000;
    }
}

/// First class file version in which interfaces may declare non-abstract methods.
const JAVA_8: u16 = 52;

fn invalid(what: &str, flags: u16) -> ParseError {
    ParseError::new(ParseErrorType::InvalidAccessFlags, format!("{} (flags 0x{:04X})", what, flags))
}

fn at_most_one_visibility(bits: u16) -> bool {
    (bits & 0x0007).count_ones() <= 1
}

pub fn check_class_flags(raw: u16) -> Result<ClassAccessFlags, ParseError> {
    let flags = ClassAccessFlags::from_bits_truncate(raw);

    if flags.contains(ClassAccessFlags::INTERFACE) {
        if !flags.contains(ClassAccessFlags::ABSTRACT) {
            return Err(invalid("interface must be abstract", raw));
        }
        if flags.intersects(ClassAccessFlags::FINAL | ClassAccessFlags::SUPER | ClassAccessFlags::ENUM) {
            return Err(invalid("interface cannot be final, super or enum", raw));
        }
    } else {
        if flags.contains(ClassAccessFlags::ANNOTATION) {
            return Err(invalid("annotation must be an interface", raw));
        }
        if flags.contains(ClassAccessFlags::FINAL | ClassAccessFlags::ABSTRACT) {
            return Err(invalid("class cannot be both final and abstract", raw));
        }
    }

    Ok(flags)
}

pub fn check_field_flags(raw: u16, class_flags: ClassAccessFlags) -> Result<FieldAccessFlags, ParseError> {
    let flags = FieldAccessFlags::from_bits_truncate(raw);

    if !at_most_one_visibility(flags.bits()) {
        return Err(invalid("field has more than one visibility", raw));
    }
    if flags.contains(FieldAccessFlags::FINAL | FieldAccessFlags::VOLATILE) {
        return Err(invalid("field cannot be both final and volatile", raw));
    }

    if class_flags.contains(ClassAccessFlags::INTERFACE) {
        let required = FieldAccessFlags::PUBLIC | FieldAccessFlags::STATIC | FieldAccessFlags::FINAL;
        if !flags.contains(required) || !(required | FieldAccessFlags::SYNTHETIC).contains(flags) {
            return Err(invalid("interface field must be public static final", raw));
        }
    }

    Ok(flags)
}

pub fn check_method_flags(raw: u16, class_flags: ClassAccessFlags, name: &[u8], major_version: u16)
    -> Result<MethodAccessFlags, ParseError> {
    use MethodAccessFlags as M;

    let flags = M::from_bits_truncate(raw);

    if name == b"<clinit>" {
        // Everything but ACC_STATIC is ignored on class initializers
        return Ok(flags);
    }

    if !at_most_one_visibility(flags.bits()) {
        return Err(invalid("method has more than one visibility", raw));
    }

    if class_flags.contains(ClassAccessFlags::INTERFACE) {
        if flags.intersects(M::PROTECTED | M::FINAL | M::SYNCHRONIZED | M::NATIVE) {
            return Err(invalid("interface method cannot be protected, final, synchronized or native", raw));
        }
        if major_version < JAVA_8 && !flags.contains(M::PUBLIC | M::ABSTRACT) {
            return Err(invalid("interface method must be public abstract", raw));
        }
        if major_version >= JAVA_8 && !flags.intersects(M::PUBLIC | M::PRIVATE) {
            return Err(invalid("interface method must be public or private", raw));
        }
    }

    if flags.contains(M::ABSTRACT)
        && flags.intersects(M::PRIVATE | M::STATIC | M::FINAL | M::SYNCHRONIZED | M::NATIVE | M::STRICT) {
        return Err(invalid("illegal combination with abstract", raw));
    }

    if name == b"<init>" {
        let allowed = M::PUBLIC | M::PRIVATE | M::PROTECTED | M::VARARGS | M::STRICT | M::SYNTHETIC;
        if !allowed.contains(flags) {
            return Err(invalid("illegal flags on instance initializer", raw));
        }
    }

    Ok(flags)
}
