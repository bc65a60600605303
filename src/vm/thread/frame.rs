use std::fmt::{Debug, Formatter};
use smallvec::SmallVec;
use crate::class_parser::constants::ConstantPool;
use crate::class_parser::types::Code;
use crate::vm::thread::ExecError;
use crate::vm::value::Value;

/// Activation record of one method invocation: program counter, local variables
/// and operand stack, plus a borrowed view of the owning class's constant pool.
pub struct Frame<'a> {
    pub pc: usize,
    /// Address of the instruction currently executing
    pub opcode_pc: usize,
    code: &'a [u8],
    constant_pool: &'a ConstantPool,
    locals: SmallVec<[Option<Value>; 16]>,
    stack: SmallVec<[Value; 16]>,
    stack_slots: usize,
    max_stack: usize,
}

impl Debug for Frame<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[(")?;
        for local in &self.locals {
            match local {
                Some(value) => write!(f, "{}, ", value)?,
                None => write!(f, "_, ")?,
            }
        }
        write!(f, ") op: (")?;
        for value in &self.stack {
            write!(f, "{}, ", value)?;
        }
        write!(f, ")]")
    }
}

impl<'a> Frame<'a> {
    /// Creates a frame for `code`, placing `args` in the first local variable slots.
    pub fn new(code: &'a Code, constant_pool: &'a ConstantPool, args: &[Value]) -> Result<Self, ExecError> {
        let mut frame = Frame {
            pc: 0,
            opcode_pc: 0,
            code: &code.code,
            constant_pool,
            locals: SmallVec::from_elem(None, code.max_locals as usize),
            stack: SmallVec::new(),
            stack_slots: 0,
            max_stack: code.max_stack as usize,
        };

        let mut slot = 0;
        for arg in args {
            frame.set_local(slot, *arg)?;
            slot += arg.slots();
        }

        Ok(frame)
    }

    pub fn constant_pool(&self) -> &'a ConstantPool {
        self.constant_pool
    }

    pub fn code_len(&self) -> usize {
        self.code.len()
    }

    /// Opcode of the instruction currently executing.
    pub fn opcode(&self) -> u8 {
        self.code[self.opcode_pc]
    }

    // Instruction operands
    fn operand_bytes<const N: usize>(&mut self) -> Result<[u8; N], ExecError> {
        let bytes = self.code.get(self.pc..self.pc + N)
            .ok_or(ExecError::TruncatedInstruction { pc: self.opcode_pc })?;
        self.pc += N;

        let mut buf = [0u8; N];
        buf.copy_from_slice(bytes);
        Ok(buf)
    }

    pub fn read_u1(&mut self) -> Result<u8, ExecError> {
        Ok(self.operand_bytes::<1>()?[0])
    }

    pub fn read_i1(&mut self) -> Result<i8, ExecError> {
        Ok(self.read_u1()? as i8)
    }

    pub fn read_u2(&mut self) -> Result<u16, ExecError> {
        Ok(u16::from_be_bytes(self.operand_bytes()?))
    }

    pub fn read_i2(&mut self) -> Result<i16, ExecError> {
        Ok(i16::from_be_bytes(self.operand_bytes()?))
    }

    // Local array
    pub fn get_local(&self, index: usize) -> Result<Value, ExecError> {
        self.locals.get(index)
            .copied()
            .flatten()
            .ok_or(ExecError::InvalidLocalIndex { index })
    }

    pub fn set_local(&mut self, index: usize, value: Value) -> Result<(), ExecError> {
        if index + value.slots() > self.locals.len() {
            return Err(ExecError::InvalidLocalIndex { index });
        }

        // Overwriting either half of a long/double invalidates it
        if index > 0 && matches!(self.locals[index - 1], Some(prev) if prev.slots() == 2) {
            self.locals[index - 1] = None;
        }

        self.locals[index] = Some(value);
        if value.slots() == 2 {
            self.locals[index + 1] = None;
        }

        Ok(())
    }

    // Operand stack
    pub fn push(&mut self, value: Value) -> Result<(), ExecError> {
        if self.stack_slots + value.slots() > self.max_stack {
            return Err(ExecError::OperandStackViolation {
                pc: self.opcode_pc,
                reason: "overflow",
            });
        }

        self.stack_slots += value.slots();
        self.stack.push(value);
        Ok(())
    }

    pub fn pop(&mut self) -> Result<Value, ExecError> {
        let value = self.stack.pop().ok_or(ExecError::OperandStackViolation {
            pc: self.opcode_pc,
            reason: "underflow",
        })?;

        self.stack_slots -= value.slots();
        Ok(value)
    }

    pub fn pop_int(&mut self) -> Result<i32, ExecError> {
        let value = self.pop()?;
        value.as_int().ok_or(ExecError::InvalidOperandType { expected: "int", found: value })
    }

    pub fn peek(&self) -> Result<Value, ExecError> {
        self.stack.last().copied().ok_or(ExecError::OperandStackViolation {
            pc: self.opcode_pc,
            reason: "underflow",
        })
    }

    /// Operand stack depth in slots.
    pub fn stack_depth(&self) -> usize {
        self.stack_slots
    }

    pub fn operands(&self) -> &[Value] {
        &self.stack
    }
}
