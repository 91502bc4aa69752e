//! Interpreter for generated modules.
//!
//! Executes the instruction subset the code generator emits on a simulated
//! register file and word-addressed stack. Calls to names without a block in
//! the module go to a [`Runtime`], which provides `print`, `read` and the
//! other intrinsics.
//!
//! The machine enforces the calling convention the generated code relies
//! on: `%rsp` must be 16-byte aligned at every `call`, and every `retq` must
//! pop the return address its `call` pushed.

use std::collections::VecDeque;
use std::fmt::Write as _;
use std::io::{self, BufRead, Write};

use log::{debug, trace};
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::x64::abi::{ARGUMENT_REGISTERS, STACK_ALIGNMENT, WORD_SIZE};
use crate::x64::module::{Instruction, Module, Opcode};

/// Initial `%rsp`, 16-byte aligned.
pub const STACK_TOP: u64 = 0x7fff_0000;

/// Stack size in words (1 MiB).
pub const STACK_WORDS: usize = 1 << 17;

pub const DEFAULT_STEP_LIMIT: u64 = 10_000_000;

/// Return address pushed by the initial call into the entry function.
const HALT: i64 = -1;

#[derive(Debug, Error)]
pub enum MachineError {
    #[error("Jump to unknown label '{0}'")]
    UnknownLabel(String),

    #[error("Call to unknown function '{0}'")]
    UnknownFunction(String),

    #[error("Call to '{function}' with misaligned stack pointer {rsp:#x}")]
    MisalignedCall { function: String, rsp: u64 },

    #[error("Stack overflow")]
    StackOverflow,

    #[error("Invalid memory access at {address:#x}")]
    InvalidAddress { address: u64 },

    #[error("Invalid operand '{operand}' for {opcode}")]
    InvalidOperand { opcode: Opcode, operand: String },

    #[error("{0} executed before any comparison")]
    FlagsUnset(Opcode),

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Quotient does not fit in 64 bits")]
    DivisionOverflow,

    #[error("Step limit of {0} instructions exceeded")]
    StepLimitExceeded(u64),

    #[error("Return address on the stack was overwritten")]
    CorruptReturnAddress,

    #[error("Execution ran past the end of the module")]
    RanOffEnd,

    #[error("No more input available for 'read'")]
    InputExhausted,

    #[error("Invalid integer input '{0}'")]
    InvalidInput(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

// ============================================================================
// Runtime hooks
// ============================================================================

/// Functions callable from generated code without a block in the module.
pub trait Runtime {
    /// Number of integer arguments `name` takes, or `None` if unknown.
    fn arity(&self, name: &str) -> Option<usize>;

    /// Call `name`; the result lands in `%rax`.
    fn call(&mut self, name: &str, args: &[i64]) -> Result<i64, MachineError>;
}

/// Arity of the integer runtime intrinsics.
fn intrinsic_arity(name: &str) -> Option<usize> {
    match name {
        "print" => Some(1),
        "read" => Some(0),
        "print8" | "sum8" => Some(8),
        _ => None,
    }
}

fn first(args: &[i64]) -> i64 {
    args.first().copied().unwrap_or_default()
}

fn print8_line(args: &[i64]) -> String {
    let values: Vec<String> = args.iter().map(i64::to_string).collect();
    values.join(" ")
}

/// Runtime with scripted input and captured output.
///
/// ```
/// use microc_compiler::x64::{BufferedRuntime, Runtime};
///
/// let mut runtime = BufferedRuntime::with_input([4]);
/// let value = runtime.call("read", &[]).unwrap();
/// runtime.call("print", &[value * 2]).unwrap();
/// assert_eq!(runtime.output(), "8\n");
/// ```
#[derive(Debug, Clone, Default)]
pub struct BufferedRuntime {
    input: VecDeque<i64>,
    output: String,
}

impl BufferedRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_input(input: impl IntoIterator<Item = i64>) -> Self {
        Self {
            input: input.into_iter().collect(),
            output: String::new(),
        }
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn into_output(self) -> String {
        self.output
    }
}

impl Runtime for BufferedRuntime {
    fn arity(&self, name: &str) -> Option<usize> {
        intrinsic_arity(name)
    }

    fn call(&mut self, name: &str, args: &[i64]) -> Result<i64, MachineError> {
        match name {
            "print" => {
                let _ = writeln!(self.output, "{}", first(args));
                Ok(0)
            }
            "read" => self.input.pop_front().ok_or(MachineError::InputExhausted),
            "print8" => {
                let _ = writeln!(self.output, "{}", print8_line(args));
                Ok(0)
            }
            "sum8" => Ok(args.iter().fold(0i64, |acc, v| acc.wrapping_add(*v))),
            _ => Err(MachineError::UnknownFunction(name.to_string())),
        }
    }
}

/// Runtime on the process's standard streams. `read` prompts with `> `.
#[derive(Debug, Default)]
pub struct StdRuntime;

impl Runtime for StdRuntime {
    fn arity(&self, name: &str) -> Option<usize> {
        intrinsic_arity(name)
    }

    fn call(&mut self, name: &str, args: &[i64]) -> Result<i64, MachineError> {
        let mut stdout = io::stdout().lock();
        match name {
            "print" => {
                writeln!(stdout, "{}", first(args))?;
                Ok(0)
            }
            "read" => {
                write!(stdout, "> ")?;
                stdout.flush()?;
                let mut line = String::new();
                if io::stdin().lock().read_line(&mut line)? == 0 {
                    return Err(MachineError::InputExhausted);
                }
                let line = line.trim();
                line.parse()
                    .map_err(|_| MachineError::InvalidInput(line.to_string()))
            }
            "print8" => {
                writeln!(stdout, "{}", print8_line(args))?;
                Ok(0)
            }
            "sum8" => Ok(args.iter().fold(0i64, |acc, v| acc.wrapping_add(*v))),
            _ => Err(MachineError::UnknownFunction(name.to_string())),
        }
    }
}

// ============================================================================
// Decoded program
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
enum Register {
    Rax,
    Rbx,
    Rcx,
    Rdx,
    Rsi,
    Rdi,
    Rbp,
    Rsp,
    R8,
    R9,
    R10,
    R11,
    R12,
    R13,
    R14,
    R15,
}

impl Register {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name.strip_prefix('%')? {
            "rax" => Self::Rax,
            "rbx" => Self::Rbx,
            "rcx" => Self::Rcx,
            "rdx" => Self::Rdx,
            "rsi" => Self::Rsi,
            "rdi" => Self::Rdi,
            "rbp" => Self::Rbp,
            "rsp" => Self::Rsp,
            "r8" => Self::R8,
            "r9" => Self::R9,
            "r10" => Self::R10,
            "r11" => Self::R11,
            "r12" => Self::R12,
            "r13" => Self::R13,
            "r14" => Self::R14,
            "r15" => Self::R15,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Operand {
    Immediate(i64),
    Register(Register),
    Memory { base: Register, displacement: i64 },
    /// Block in this module and the index of its first instruction.
    Label { name: String, target: usize },
    /// Function provided by the runtime.
    Symbol(String),
}

#[derive(Debug, Clone)]
struct Decoded {
    opcode: Opcode,
    operands: Vec<Operand>,
}

impl Decoded {
    fn operand(&self, index: usize) -> Result<&Operand, MachineError> {
        self.operands
            .get(index)
            .ok_or_else(|| MachineError::InvalidOperand {
                opcode: self.opcode,
                operand: String::new(),
            })
    }
}

fn decode_operand(
    ins: &Instruction,
    text: &str,
    labels: &FxHashMap<String, usize>,
) -> Result<Operand, MachineError> {
    let invalid = || MachineError::InvalidOperand {
        opcode: ins.opcode,
        operand: text.to_string(),
    };

    if ins.opcode.is_jump() {
        return labels
            .get(text)
            .map(|&target| Operand::Label {
                name: text.to_string(),
                target,
            })
            .ok_or_else(|| MachineError::UnknownLabel(text.to_string()));
    }
    if ins.opcode == Opcode::Call {
        return Ok(match labels.get(text) {
            Some(&target) => Operand::Label {
                name: text.to_string(),
                target,
            },
            None => Operand::Symbol(text.to_string()),
        });
    }

    if let Some(value) = text.strip_prefix('$') {
        return value.parse().map(Operand::Immediate).map_err(|_| invalid());
    }
    if let Some(register) = Register::from_name(text) {
        return Ok(Operand::Register(register));
    }
    if let Some((displacement, rest)) = text.split_once('(') {
        let base = rest
            .strip_suffix(')')
            .and_then(Register::from_name)
            .ok_or_else(invalid)?;
        let displacement = if displacement.is_empty() {
            0
        } else {
            displacement.parse().map_err(|_| invalid())?
        };
        return Ok(Operand::Memory { base, displacement });
    }
    Err(invalid())
}

// ============================================================================
// Processor state
// ============================================================================

/// Control flow after one instruction.
enum Step {
    Next,
    Jump(usize),
    Halt(i64),
}

#[derive(Debug)]
struct Cpu {
    registers: [i64; 16],
    stack: Vec<i64>,
    /// `(destination, source)` of the last `cmpq`.
    flags: Option<(i64, i64)>,
    /// Return addresses pushed by `call`, checked by `retq`.
    returns: Vec<i64>,
}

impl Cpu {
    fn new() -> Self {
        Self {
            registers: [0; 16],
            stack: vec![0; STACK_WORDS],
            flags: None,
            returns: Vec::new(),
        }
    }

    fn reset(&mut self) {
        self.registers = [0; 16];
        self.registers[Register::Rsp as usize] = STACK_TOP as i64;
        self.flags = None;
        self.returns.clear();
    }

    #[inline]
    fn get(&self, register: Register) -> i64 {
        self.registers[register as usize]
    }

    #[inline]
    fn set(&mut self, register: Register, value: i64) {
        self.registers[register as usize] = value;
    }

    fn rsp(&self) -> u64 {
        self.get(Register::Rsp) as u64
    }

    fn slot(&self, address: u64) -> Result<usize, MachineError> {
        let bottom = STACK_TOP - (STACK_WORDS as u64) * WORD_SIZE as u64;
        if address < bottom || address >= STACK_TOP || address % WORD_SIZE as u64 != 0 {
            return Err(MachineError::InvalidAddress { address });
        }
        Ok(((address - bottom) / WORD_SIZE as u64) as usize)
    }

    fn load(&self, address: u64) -> Result<i64, MachineError> {
        Ok(self.stack[self.slot(address)?])
    }

    fn store(&mut self, address: u64, value: i64) -> Result<(), MachineError> {
        let slot = self.slot(address)?;
        self.stack[slot] = value;
        Ok(())
    }

    fn push(&mut self, value: i64) -> Result<(), MachineError> {
        let rsp = self.rsp().wrapping_sub(WORD_SIZE as u64);
        let bottom = STACK_TOP - (STACK_WORDS as u64) * WORD_SIZE as u64;
        if rsp < bottom {
            return Err(MachineError::StackOverflow);
        }
        self.store(rsp, value)?;
        self.set(Register::Rsp, rsp as i64);
        Ok(())
    }

    fn pop(&mut self) -> Result<i64, MachineError> {
        let rsp = self.rsp();
        let value = self.load(rsp)?;
        self.set(Register::Rsp, rsp.wrapping_add(WORD_SIZE as u64) as i64);
        Ok(value)
    }

    fn address(&self, base: Register, displacement: i64) -> u64 {
        self.get(base).wrapping_add(displacement) as u64
    }

    fn read(&self, opcode: Opcode, operand: &Operand) -> Result<i64, MachineError> {
        match operand {
            Operand::Immediate(value) => Ok(*value),
            Operand::Register(register) => Ok(self.get(*register)),
            Operand::Memory { base, displacement } => self.load(self.address(*base, *displacement)),
            Operand::Label { .. } | Operand::Symbol(_) => Err(MachineError::InvalidOperand {
                opcode,
                operand: format!("{operand:?}"),
            }),
        }
    }

    fn write(&mut self, opcode: Opcode, operand: &Operand, value: i64) -> Result<(), MachineError> {
        match operand {
            Operand::Register(register) => {
                self.set(*register, value);
                Ok(())
            }
            Operand::Memory { base, displacement } => {
                self.store(self.address(*base, *displacement), value)
            }
            _ => Err(MachineError::InvalidOperand {
                opcode,
                operand: format!("{operand:?}"),
            }),
        }
    }

    /// Whether the condition of a `cmov`/`j` opcode holds.
    fn condition(&self, opcode: Opcode) -> Result<bool, MachineError> {
        let (dst, src) = self.flags.ok_or(MachineError::FlagsUnset(opcode))?;
        Ok(match opcode {
            Opcode::Cmove | Opcode::Je => dst == src,
            Opcode::Cmovne | Opcode::Jne => dst != src,
            Opcode::Cmovl => dst < src,
            Opcode::Cmovle | Opcode::Jle => dst <= src,
            Opcode::Cmovg => dst > src,
            Opcode::Cmovge => dst >= src,
            _ => true,
        })
    }

    fn check_alignment(&self, function: &str) -> Result<(), MachineError> {
        let rsp = self.rsp();
        if rsp % STACK_ALIGNMENT as u64 != 0 {
            return Err(MachineError::MisalignedCall {
                function: function.to_string(),
                rsp,
            });
        }
        Ok(())
    }
}

// ============================================================================
// Machine
// ============================================================================

/// Executes a [`Module`] against a [`Runtime`].
///
/// ```
/// use bumpalo::Bump;
/// use microc_compiler::sema::SemanticAnalyzer;
/// use microc_compiler::x64::{BufferedRuntime, CodeGenerator, Machine};
/// use microc_parser::Parser;
///
/// let arena = Bump::new();
/// let program = Parser::parse("int main() { print(6 * 7); return 0; }", &arena).unwrap();
/// let analysis = SemanticAnalyzer::new().analyze(&program).unwrap();
/// let module = CodeGenerator::from_analysis(&analysis).generate(&program).unwrap();
///
/// let mut machine = Machine::new(&module, BufferedRuntime::new()).unwrap();
/// assert_eq!(machine.run("main").unwrap(), 0);
/// assert_eq!(machine.runtime().output(), "42\n");
/// ```
#[derive(Debug)]
pub struct Machine<R: Runtime> {
    program: Vec<Decoded>,
    labels: FxHashMap<String, usize>,
    cpu: Cpu,
    runtime: R,
    step_limit: u64,
    steps: u64,
}

impl<R: Runtime> Machine<R> {
    /// Decode `module`, resolving every label.
    pub fn new(module: &Module, runtime: R) -> Result<Self, MachineError> {
        let mut labels = FxHashMap::default();
        let mut index = 0;
        for block in &module.blocks {
            if !block.name.is_empty() {
                labels.insert(block.name.clone(), index);
            }
            index += block.instructions.len();
        }

        let mut program = Vec::with_capacity(index);
        for ins in module.instructions() {
            let operands = ins
                .operands
                .iter()
                .map(|text| decode_operand(ins, text, &labels))
                .collect::<Result<Vec<_>, _>>()?;
            program.push(Decoded {
                opcode: ins.opcode,
                operands,
            });
        }

        Ok(Self {
            program,
            labels,
            cpu: Cpu::new(),
            runtime,
            step_limit: DEFAULT_STEP_LIMIT,
            steps: 0,
        })
    }

    pub fn with_step_limit(mut self, limit: u64) -> Self {
        self.step_limit = limit;
        self
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    pub fn into_runtime(self) -> R {
        self.runtime
    }

    /// Instructions executed by the last [`run`](Self::run).
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Call `entry` with an aligned stack and return its `%rax`.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn run(&mut self, entry: &str) -> Result<i64, MachineError> {
        let mut pc = *self
            .labels
            .get(entry)
            .ok_or_else(|| MachineError::UnknownFunction(entry.to_string()))?;

        self.cpu.reset();
        self.steps = 0;
        self.cpu.push(HALT)?;
        self.cpu.returns.push(HALT);

        loop {
            if self.steps >= self.step_limit {
                return Err(MachineError::StepLimitExceeded(self.step_limit));
            }
            self.steps += 1;

            let ins = self.program.get(pc).ok_or(MachineError::RanOffEnd)?;
            match execute(&mut self.cpu, &mut self.runtime, ins, pc)? {
                Step::Next => pc += 1,
                Step::Jump(target) => pc = target,
                Step::Halt(value) => {
                    debug!("'{entry}' returned {value} after {} steps", self.steps);
                    return Ok(value);
                }
            }
        }
    }
}

fn execute<R: Runtime>(
    cpu: &mut Cpu,
    runtime: &mut R,
    ins: &Decoded,
    pc: usize,
) -> Result<Step, MachineError> {
    let opcode = ins.opcode;
    match opcode {
        Opcode::Nop => {}
        Opcode::Pushq => {
            let value = cpu.read(opcode, ins.operand(0)?)?;
            cpu.push(value)?;
        }
        Opcode::Popq => {
            let value = cpu.pop()?;
            cpu.write(opcode, ins.operand(0)?, value)?;
        }
        Opcode::Movq => {
            let value = cpu.read(opcode, ins.operand(0)?)?;
            cpu.write(opcode, ins.operand(1)?, value)?;
        }
        Opcode::Addq | Opcode::Subq | Opcode::Imulq => {
            let src = cpu.read(opcode, ins.operand(0)?)?;
            let dst = ins.operand(1)?;
            let lhs = cpu.read(opcode, dst)?;
            let value = match opcode {
                Opcode::Addq => lhs.wrapping_add(src),
                Opcode::Subq => lhs.wrapping_sub(src),
                _ => lhs.wrapping_mul(src),
            };
            cpu.write(opcode, dst, value)?;
        }
        Opcode::Negq => {
            let dst = ins.operand(0)?;
            let value = cpu.read(opcode, dst)?.wrapping_neg();
            cpu.write(opcode, dst, value)?;
        }
        Opcode::Cqto => {
            let sign = if cpu.get(Register::Rax) < 0 { -1 } else { 0 };
            cpu.set(Register::Rdx, sign);
        }
        Opcode::Idivq => {
            let divisor = i128::from(cpu.read(opcode, ins.operand(0)?)?);
            if divisor == 0 {
                return Err(MachineError::DivisionByZero);
            }
            let high = i128::from(cpu.get(Register::Rdx));
            let low = i128::from(cpu.get(Register::Rax) as u64);
            let dividend = (high << 64) | low;
            let quotient =
                i64::try_from(dividend / divisor).map_err(|_| MachineError::DivisionOverflow)?;
            cpu.set(Register::Rax, quotient);
            cpu.set(Register::Rdx, (dividend % divisor) as i64);
        }
        Opcode::Cmpq => {
            let src = cpu.read(opcode, ins.operand(0)?)?;
            let dst = cpu.read(opcode, ins.operand(1)?)?;
            cpu.flags = Some((dst, src));
        }
        op if op.is_cmov() => {
            if cpu.condition(op)? {
                let value = cpu.read(opcode, ins.operand(0)?)?;
                cpu.write(opcode, ins.operand(1)?, value)?;
            }
        }
        Opcode::Jmp | Opcode::Je | Opcode::Jne | Opcode::Jle => {
            if opcode == Opcode::Jmp || cpu.condition(opcode)? {
                if let Operand::Label { target, .. } = ins.operand(0)? {
                    return Ok(Step::Jump(*target));
                }
            }
        }
        Opcode::Call => match ins.operand(0)? {
            Operand::Label { name, target } => {
                cpu.check_alignment(name)?;
                let address = (pc + 1) as i64;
                cpu.push(address)?;
                cpu.returns.push(address);
                return Ok(Step::Jump(*target));
            }
            Operand::Symbol(name) => {
                let arity = runtime
                    .arity(name)
                    .ok_or_else(|| MachineError::UnknownFunction(name.clone()))?;
                cpu.check_alignment(name)?;
                let args = call_arguments(cpu, arity)?;
                trace!("runtime call {name}{args:?}");
                let result = runtime.call(name, &args)?;
                cpu.set(Register::Rax, result);
            }
            other => {
                return Err(MachineError::InvalidOperand {
                    opcode,
                    operand: format!("{other:?}"),
                });
            }
        },
        Opcode::Retq => {
            let address = cpu.pop()?;
            if cpu.returns.pop() != Some(address) {
                return Err(MachineError::CorruptReturnAddress);
            }
            if address == HALT {
                return Ok(Step::Halt(cpu.get(Register::Rax)));
            }
            return Ok(Step::Jump(address as usize));
        }
        _ => {}
    }
    Ok(Step::Next)
}

/// Arguments of a runtime call: registers first, then stack words upwards
/// from `%rsp`.
fn call_arguments(cpu: &Cpu, arity: usize) -> Result<Vec<i64>, MachineError> {
    let mut args = Vec::with_capacity(arity);
    for index in 0..arity {
        let value = match ARGUMENT_REGISTERS.get(index) {
            Some(name) => Register::from_name(name).map_or(0, |register| cpu.get(register)),
            None => {
                let offset = (index - ARGUMENT_REGISTERS.len()) as u64 * WORD_SIZE as u64;
                cpu.load(cpu.rsp() + offset)?
            }
        };
        args.push(value);
    }
    Ok(args)
}
