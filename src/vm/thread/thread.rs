use crate::class_parser::types::{JavaClass, MethodInfo};
use crate::vm::instructions::{handler, Instruction, InstructionResult};
use crate::vm::thread::frame::Frame;
use crate::vm::thread::ExecError;
use crate::vm::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum ThreadStatus {
    STOPPED,
    RUNNING,
    FINISHED(Option<Value>),
    FAILED(ExecError),
}

/// Runs one method at a time to completion on the calling OS thread.
pub struct VMThread {
    pub status: ThreadStatus,
    #[cfg(feature = "statistics")]
    instruction_counts: Box<[u64; 256]>,
}

impl Default for VMThread {
    fn default() -> Self {
        Self::new()
    }
}

impl VMThread {
    pub fn new() -> VMThread {
        VMThread {
            status: ThreadStatus::STOPPED,
            #[cfg(feature = "statistics")]
            instruction_counts: Box::new([0; 256]),
        }
    }

    pub fn start(&mut self, class: &JavaClass, method: &MethodInfo, args: &[Value]) {
        self.status = ThreadStatus::RUNNING;
        self.status = match self.run(class, method, args) {
            Ok(result) => ThreadStatus::FINISHED(result),
            Err(e) => ThreadStatus::FAILED(e),
        };

        #[cfg(feature = "statistics")]
        self.log_statistics();
    }

    /// Interprets `method` with `args` as its initial locals and returns what it returned.
    pub fn run(&mut self, class: &JavaClass, method: &MethodInfo, args: &[Value])
        -> Result<Option<Value>, ExecError> {
        let code = method.code()
            .ok_or_else(|| ExecError::MissingCode(format!("{}.{}", class.name(), class.method_name(method))))?;

        log::debug!("executing {}.{}", class.name(), class.method_name(method));

        let mut frame = Frame::new(code, &class.constant_pool, args)?;
        let len = frame.code_len();

        // Falling off the end of the code is a void return
        while frame.pc < len {
            frame.opcode_pc = frame.pc;
            let opcode = code.code[frame.pc];
            frame.pc += 1;

            let instruction = handler(opcode)
                .ok_or(ExecError::UnsupportedOpcode { opcode, pc: frame.opcode_pc })?;

            #[cfg(feature = "statistics")]
            {
                self.instruction_counts[opcode as usize] += 1;
            }

            match instruction(&mut frame)? {
                InstructionResult::Continue => {}
                InstructionResult::Branch(offset) => {
                    let target = frame.opcode_pc as i64 + offset as i64;
                    if target < 0 || target >= len as i64 {
                        return Err(ExecError::InvalidBranchTarget { pc: frame.opcode_pc, target });
                    }
                    frame.pc = target as usize;
                }
                InstructionResult::Return(value) => return Ok(value),
            }

            if log::log_enabled!(log::Level::Trace) {
                let mnemonic = Instruction::try_from(opcode).map(|i| i.to_string()).unwrap_or_default();
                log::trace!("{:>5} {:<12} {:?}", frame.opcode_pc, mnemonic, frame);
            }
        }

        Ok(None)
    }

    #[cfg(feature = "statistics")]
    fn log_statistics(&self) {
        let mut counts: Vec<(usize, u64)> = self.instruction_counts.iter().copied().enumerate()
            .filter(|(_, count)| *count > 0)
            .collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1));

        for (opcode, count) in counts {
            let mnemonic = Instruction::try_from(opcode as u8).map(|i| i.to_string()).unwrap_or_default();
            log::debug!("{:<12} {}", mnemonic, count);
        }
    }
}
