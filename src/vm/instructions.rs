#![allow(non_camel_case_types)]

use num_enum::TryFromPrimitive;
use once_cell::sync::Lazy;
use strum_macros::{Display, EnumCount};
use crate::class_parser::constants::CPInfo;
use crate::class_parser::types::{Code, U2};
use crate::vm::thread::frame::Frame;
use crate::vm::thread::ExecError;
use crate::vm::value::{Reference, Value};

pub enum InstructionResult {
    Continue,
    /// Jump relative to the address of the current instruction
    Branch(i32),
    Return(Option<Value>),
}

pub type InstructionFn = fn(&mut Frame) -> Result<InstructionResult, ExecError>;

#[derive(TryFromPrimitive, Display, EnumCount, Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum Instruction {
    nop = 0,
    aconst_null = 1,
    iconst_m1 = 2,
    iconst_0 = 3,
    iconst_1 = 4,
    iconst_2 = 5,
    iconst_3 = 6,
    iconst_4 = 7,
    iconst_5 = 8,
    lconst_0 = 9,
    lconst_1 = 10,
    fconst_0 = 11,
    fconst_1 = 12,
    fconst_2 = 13,
    dconst_0 = 14,
    dconst_1 = 15,
    bipush = 16,
    sipush = 17,
    ldc = 18,
    ldc_w = 19,
    ldc2_w = 20,
    iload = 21,
    iload_0 = 26,
    iload_1 = 27,
    iload_2 = 28,
    iload_3 = 29,
    istore = 54,
    istore_0 = 59,
    istore_1 = 60,
    istore_2 = 61,
    istore_3 = 62,
    pop = 87,
    dup = 89,
    iadd = 96,
    isub = 100,
    imul = 104,
    ineg = 116,
    iinc = 132,
    if_icmpeq = 159,
    if_icmpne = 160,
    if_icmplt = 161,
    if_icmpge = 162,
    if_icmpgt = 163,
    if_icmple = 164,
    goto = 167,
    ireturn = 172,
    areturn = 176,
    #[strum(serialize = "return")]
    _return = 177,
}

/// Encoded length of `instr` including its operands.
pub const fn instruction_length(instr: Instruction) -> usize {
    use Instruction as I;

    match instr {
        I::bipush | I::ldc | I::iload | I::istore => 2,
        I::sipush | I::ldc_w | I::ldc2_w | I::iinc | I::goto => 3,
        I::if_icmpeq | I::if_icmpne | I::if_icmplt | I::if_icmpge | I::if_icmpgt | I::if_icmple => 3,
        _ => 1,
    }
}

/// Handler table indexed by opcode. Opcodes without an entry are unsupported.
pub static DISPATCH: Lazy<[Option<InstructionFn>; 256]> = Lazy::new(|| {
    use Instruction as I;

    let mut table: [Option<InstructionFn>; 256] = [None; 256];
    let mut set = |instr: Instruction, f: InstructionFn| table[instr as usize] = Some(f);

    set(I::nop, |_| Ok(InstructionResult::Continue));
    set(I::aconst_null, aconstnull);
    for instr in [I::iconst_m1, I::iconst_0, I::iconst_1, I::iconst_2, I::iconst_3, I::iconst_4, I::iconst_5] {
        set(instr, iconst);
    }
    set(I::lconst_0, lconst);
    set(I::lconst_1, lconst);
    for instr in [I::fconst_0, I::fconst_1, I::fconst_2] {
        set(instr, fconst);
    }
    set(I::dconst_0, dconst);
    set(I::dconst_1, dconst);
    set(I::bipush, bipush);
    set(I::sipush, sipush);
    set(I::ldc, ldc);
    set(I::ldc_w, ldc_w);
    set(I::ldc2_w, ldc2_w);
    set(I::iload, iload);
    for instr in [I::iload_0, I::iload_1, I::iload_2, I::iload_3] {
        set(instr, iload_n);
    }
    set(I::istore, istore);
    for instr in [I::istore_0, I::istore_1, I::istore_2, I::istore_3] {
        set(instr, istore_n);
    }
    set(I::pop, pop);
    set(I::dup, dup);
    set(I::iadd, |frame| int_binary(frame, i32::wrapping_add));
    set(I::isub, |frame| int_binary(frame, i32::wrapping_sub));
    set(I::imul, |frame| int_binary(frame, i32::wrapping_mul));
    set(I::ineg, ineg);
    set(I::iinc, iinc);
    for instr in [I::if_icmpeq, I::if_icmpne, I::if_icmplt, I::if_icmpge, I::if_icmpgt, I::if_icmple] {
        set(instr, if_icmp);
    }
    set(I::goto, goto);
    set(I::ireturn, ireturn);
    set(I::areturn, areturn);
    set(I::_return, |_| Ok(InstructionResult::Return(None)));

    table
});

#[inline]
pub fn handler(opcode: u8) -> Option<InstructionFn> {
    DISPATCH[opcode as usize]
}

fn aconstnull(frame: &mut Frame) -> Result<InstructionResult, ExecError> {
    frame.push(Value::NULL)?;
    Ok(InstructionResult::Continue)
}

fn iconst(frame: &mut Frame) -> Result<InstructionResult, ExecError> {
    let value = frame.opcode() as i32 - Instruction::iconst_0 as i32;
    frame.push(Value::Int(value))?;
    Ok(InstructionResult::Continue)
}

fn lconst(frame: &mut Frame) -> Result<InstructionResult, ExecError> {
    let value = frame.opcode() - Instruction::lconst_0 as u8;
    frame.push(Value::Long(value as i64))?;
    Ok(InstructionResult::Continue)
}

fn fconst(frame: &mut Frame) -> Result<InstructionResult, ExecError> {
    let value = frame.opcode() - Instruction::fconst_0 as u8;
    frame.push(Value::Float(value as f32))?;
    Ok(InstructionResult::Continue)
}

fn dconst(frame: &mut Frame) -> Result<InstructionResult, ExecError> {
    let value = frame.opcode() - Instruction::dconst_0 as u8;
    frame.push(Value::Double(value as f64))?;
    Ok(InstructionResult::Continue)
}

fn bipush(frame: &mut Frame) -> Result<InstructionResult, ExecError> {
    let value = frame.read_i1()?;
    frame.push(Value::Int(value as i32))?;
    Ok(InstructionResult::Continue)
}

fn sipush(frame: &mut Frame) -> Result<InstructionResult, ExecError> {
    let value = frame.read_i2()?;
    frame.push(Value::Int(value as i32))?;
    Ok(InstructionResult::Continue)
}

/// Pushes a single-slot loadable constant. String and Class constants stay
/// unresolved and are pushed as references to their pool entry.
fn load_constant(frame: &mut Frame, index: U2) -> Result<InstructionResult, ExecError> {
    let value = match frame.constant_pool().get(index) {
        Some(CPInfo::Integer(i)) => Value::Int(*i),
        Some(CPInfo::Float(f)) => Value::Float(*f),
        Some(CPInfo::String(_)) => Value::Reference(Reference::String(index)),
        Some(CPInfo::Class(_)) => Value::Reference(Reference::Class(index)),
        _ => return Err(ExecError::InvalidConstantPoolIndex { index }),
    };

    frame.push(value)?;
    Ok(InstructionResult::Continue)
}

fn ldc(frame: &mut Frame) -> Result<InstructionResult, ExecError> {
    let index = frame.read_u1()?;
    load_constant(frame, index as U2)
}

fn ldc_w(frame: &mut Frame) -> Result<InstructionResult, ExecError> {
    let index = frame.read_u2()?;
    load_constant(frame, index)
}

fn ldc2_w(frame: &mut Frame) -> Result<InstructionResult, ExecError> {
    let index = frame.read_u2()?;
    let value = match frame.constant_pool().get(index) {
        Some(CPInfo::Long(l)) => Value::Long(*l),
        Some(CPInfo::Double(d)) => Value::Double(*d),
        _ => return Err(ExecError::InvalidConstantPoolIndex { index }),
    };

    frame.push(value)?;
    Ok(InstructionResult::Continue)
}

fn load_int(frame: &mut Frame, index: usize) -> Result<InstructionResult, ExecError> {
    let value = frame.get_local(index)?;
    if value.as_int().is_none() {
        return Err(ExecError::InvalidOperandType { expected: "int", found: value });
    }

    frame.push(value)?;
    Ok(InstructionResult::Continue)
}

fn iload(frame: &mut Frame) -> Result<InstructionResult, ExecError> {
    let index = frame.read_u1()?;
    load_int(frame, index as usize)
}

fn iload_n(frame: &mut Frame) -> Result<InstructionResult, ExecError> {
    let index = frame.opcode() - Instruction::iload_0 as u8;
    load_int(frame, index as usize)
}

fn istore(frame: &mut Frame) -> Result<InstructionResult, ExecError> {
    let index = frame.read_u1()?;
    let value = frame.pop_int()?;
    frame.set_local(index as usize, Value::Int(value))?;
    Ok(InstructionResult::Continue)
}

fn istore_n(frame: &mut Frame) -> Result<InstructionResult, ExecError> {
    let index = frame.opcode() - Instruction::istore_0 as u8;
    let value = frame.pop_int()?;
    frame.set_local(index as usize, Value::Int(value))?;
    Ok(InstructionResult::Continue)
}

fn pop(frame: &mut Frame) -> Result<InstructionResult, ExecError> {
    let value = frame.pop()?;
    if value.slots() != 1 {
        return Err(ExecError::InvalidOperandType { expected: "category 1", found: value });
    }
    Ok(InstructionResult::Continue)
}

fn dup(frame: &mut Frame) -> Result<InstructionResult, ExecError> {
    let value = frame.peek()?;
    if value.slots() != 1 {
        return Err(ExecError::InvalidOperandType { expected: "category 1", found: value });
    }

    frame.push(value)?;
    Ok(InstructionResult::Continue)
}

fn int_binary(frame: &mut Frame, op: fn(i32, i32) -> i32) -> Result<InstructionResult, ExecError> {
    let b = frame.pop_int()?;
    let a = frame.pop_int()?;
    frame.push(Value::Int(op(a, b)))?;
    Ok(InstructionResult::Continue)
}

fn ineg(frame: &mut Frame) -> Result<InstructionResult, ExecError> {
    let value = frame.pop_int()?;
    frame.push(Value::Int(value.wrapping_neg()))?;
    Ok(InstructionResult::Continue)
}

fn iinc(frame: &mut Frame) -> Result<InstructionResult, ExecError> {
    let index = frame.read_u1()? as usize;
    let delta = frame.read_i1()?;

    let value = frame.get_local(index)?;
    let current = value.as_int()
        .ok_or(ExecError::InvalidOperandType { expected: "int", found: value })?;
    frame.set_local(index, Value::Int(current.wrapping_add(delta as i32)))?;
    Ok(InstructionResult::Continue)
}

fn if_icmp(frame: &mut Frame) -> Result<InstructionResult, ExecError> {
    use Instruction as I;

    let offset = frame.read_i2()?;
    let b = frame.pop_int()?;
    let a = frame.pop_int()?;

    let taken = match Instruction::try_from(frame.opcode()) {
        Ok(I::if_icmpeq) => a == b,
        Ok(I::if_icmpne) => a != b,
        Ok(I::if_icmplt) => a < b,
        Ok(I::if_icmpge) => a >= b,
        Ok(I::if_icmpgt) => a > b,
        Ok(I::if_icmple) => a <= b,
        _ => return Err(ExecError::UnsupportedOpcode { opcode: frame.opcode(), pc: frame.opcode_pc }),
    };

    Ok(if taken {
        InstructionResult::Branch(offset as i32)
    } else {
        InstructionResult::Continue
    })
}

fn goto(frame: &mut Frame) -> Result<InstructionResult, ExecError> {
    let offset = frame.read_i2()?;
    Ok(InstructionResult::Branch(offset as i32))
}

fn ireturn(frame: &mut Frame) -> Result<InstructionResult, ExecError> {
    let value = frame.pop_int()?;
    Ok(InstructionResult::Return(Some(Value::Int(value))))
}

fn areturn(frame: &mut Frame) -> Result<InstructionResult, ExecError> {
    let value = frame.pop()?;
    if !value.is_reference() {
        return Err(ExecError::InvalidOperandType { expected: "reference", found: value });
    }
    Ok(InstructionResult::Return(Some(value)))
}

impl Code {
    /// One line per instruction: address, mnemonic and decoded operands. Stops at the
    /// first opcode this interpreter does not know, since its length is unknown.
    pub fn disassemble(&self) -> Vec<String> {
        let mut lines = vec![];
        let mut pc = 0;

        while pc < self.code.len() {
            let opcode = self.code[pc];
            let instr = match Instruction::try_from(opcode) {
                Ok(instr) => instr,
                Err(_) => {
                    lines.push(format!("{:>5}: <unknown opcode 0x{:02X}>", pc, opcode));
                    break;
                }
            };

            let len = instruction_length(instr);
            let operands = match self.code.get(pc + 1..pc + len) {
                Some(operands) => operands,
                None => {
                    lines.push(format!("{:>5}: {} <truncated>", pc, instr));
                    break;
                }
            };

            let text = match (instr, operands) {
                (Instruction::bipush, [b]) => format!("{} {}", instr, *b as i8),
                (Instruction::sipush, [h, l]) => format!("{} {}", instr, i16::from_be_bytes([*h, *l])),
                (Instruction::ldc, [i]) => format!("{} #{}", instr, i),
                (Instruction::iinc, [i, d]) => format!("{} {} {}", instr, i, *d as i8),
                (_, [i]) => format!("{} {}", instr, i),
                (Instruction::ldc_w | Instruction::ldc2_w, [h, l]) =>
                    format!("{} #{}", instr, u16::from_be_bytes([*h, *l])),
                (_, [h, l]) => {
                    let target = pc as i64 + i16::from_be_bytes([*h, *l]) as i64;
                    format!("{} {}", instr, target)
                }
                _ => instr.to_string(),
            };

            lines.push(format!("{:>5}: {}", pc, text));
            pc += len;
        }

        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class_parser::constants::ConstantPool;

    fn code(bytes: &[u8]) -> Code {
        Code {
            max_stack: 4,
            max_locals: 2,
            code: bytes.to_vec(),
            exception_table: vec![],
            attributes: vec![],
        }
    }

    /// Executes the first instruction of `bytes` and returns the resulting operand stack.
    fn step(bytes: &[u8], pool: &ConstantPool) -> Result<Vec<Value>, ExecError> {
        let code = code(bytes);
        let mut frame = Frame::new(&code, pool, &[])?;
        frame.opcode_pc = 0;
        frame.pc = 1;
        let f = handler(bytes[0]).ok_or(ExecError::UnsupportedOpcode { opcode: bytes[0], pc: 0 })?;
        f(&mut frame)?;
        Ok(frame.operands().to_vec())
    }

    #[test]
    fn push_constants() {
        let pool = ConstantPool::default();
        assert_eq!(step(&[0x01], &pool).unwrap(), vec![Value::NULL]);
        assert_eq!(step(&[0x02], &pool).unwrap(), vec![Value::Int(-1)]);
        assert_eq!(step(&[0x08], &pool).unwrap(), vec![Value::Int(5)]);
        assert_eq!(step(&[0x0A], &pool).unwrap(), vec![Value::Long(1)]);
        assert_eq!(step(&[0x0D], &pool).unwrap(), vec![Value::Float(2.0)]);
        assert_eq!(step(&[0x00], &pool).unwrap(), vec![]);
    }

    #[test]
    fn bipush_sign_extends() {
        let pool = ConstantPool::default();
        assert_eq!(step(&[0x10, 0x80], &pool).unwrap(), vec![Value::Int(-128)]);
        assert_eq!(step(&[0x10, 0x7F], &pool).unwrap(), vec![Value::Int(127)]);
    }

    #[test]
    fn sipush_sign_extends() {
        let pool = ConstantPool::default();
        assert_eq!(step(&[0x11, 0xFF, 0x00], &pool).unwrap(), vec![Value::Int(-256)]);
        assert_eq!(step(&[0x11, 0x01, 0x00], &pool).unwrap(), vec![Value::Int(256)]);
        assert!(matches!(step(&[0x11, 0xFF], &pool), Err(ExecError::TruncatedInstruction { pc: 0 })));
    }

    #[test]
    fn ldc_loads_only_loadable_constants() {
        let pool = ConstantPool::from_entries(vec![
            CPInfo::Integer(42),                    // 1
            CPInfo::Utf8(b"Main".to_vec()),         // 2
            CPInfo::Class(2),                       // 3
            CPInfo::String(2),                      // 4
            CPInfo::Methodref(3, 6),                // 5
            CPInfo::NameAndType(2, 2),              // 6
            CPInfo::Float(1.5),                     // 7
            CPInfo::Long(9),                        // 8
            CPInfo::Hole,                           // 9
        ]);

        assert_eq!(step(&[0x12, 1], &pool).unwrap(), vec![Value::Int(42)]);
        assert_eq!(step(&[0x12, 3], &pool).unwrap(), vec![Value::Reference(Reference::Class(3))]);
        assert_eq!(step(&[0x12, 4], &pool).unwrap(), vec![Value::Reference(Reference::String(4))]);
        assert_eq!(step(&[0x12, 7], &pool).unwrap(), vec![Value::Float(1.5)]);
        assert_eq!(step(&[0x12, 5], &pool).unwrap_err(), ExecError::InvalidConstantPoolIndex { index: 5 });
        assert_eq!(step(&[0x12, 8], &pool).unwrap_err(), ExecError::InvalidConstantPoolIndex { index: 8 });
        assert_eq!(step(&[0x12, 0], &pool).unwrap_err(), ExecError::InvalidConstantPoolIndex { index: 0 });
        assert_eq!(step(&[0x13, 0, 1], &pool).unwrap(), vec![Value::Int(42)]);
        assert_eq!(step(&[0x14, 0, 8], &pool).unwrap(), vec![Value::Long(9)]);
        assert_eq!(step(&[0x14, 0, 1], &pool).unwrap_err(), ExecError::InvalidConstantPoolIndex { index: 1 });
    }

    #[test]
    fn arithmetic_underflow_is_reported() {
        let pool = ConstantPool::default();
        assert!(matches!(step(&[0x60], &pool), Err(ExecError::OperandStackViolation { .. })));
    }

    #[test]
    fn every_instruction_has_a_handler() {
        use strum::EnumCount;

        assert_eq!(DISPATCH.iter().filter(|h| h.is_some()).count(), Instruction::COUNT);
        for opcode in 0..=255u8 {
            assert_eq!(handler(opcode).is_some(), Instruction::try_from(opcode).is_ok());
        }
    }

    #[test]
    fn unknown_opcodes_have_no_handler() {
        assert!(handler(0xCA).is_none());
        assert!(handler(0xB6).is_none());
        assert!(handler(0x00).is_some());
    }

    #[test]
    fn mnemonics() {
        assert_eq!(Instruction::_return.to_string(), "return");
        assert_eq!(Instruction::aconst_null.to_string(), "aconst_null");
        assert_eq!(instruction_length(Instruction::sipush), 3);
        assert_eq!(instruction_length(Instruction::nop), 1);
    }

    #[test]
    fn disassembly() {
        let listing = code(&[0x10, 0xFE, 0x3C, 0x1B, 0x11, 0x01, 0x00, 0xA2, 0xFF, 0xFC, 0xB1, 0xCA]).disassemble();
        assert_eq!(listing, vec![
            "    0: bipush -2",
            "    2: istore_1",
            "    3: iload_1",
            "    4: sipush 256",
            "    7: if_icmpge 3",
            "   10: return",
            "   11: <unknown opcode 0xCA>",
        ]);
    }
}
