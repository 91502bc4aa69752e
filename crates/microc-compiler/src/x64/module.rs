//! Assembly module: ordered basic blocks of x86-64 instructions.
//!
//! A [`Module`] grows by appending one block or one instruction to the last
//! block. Only the optimiser rewrites instructions in place.
//!
//! `Display` renders GNU assembler text in AT&T syntax with fixed columns:
//!
//! ```text
//!
//! .global main
//! main:                                   # Entry point of function 'main'
//!     pushq       %r15                    # Save callee-saved register
//! ```

use std::fmt::{self, Write as _};

/// Column where instruction mnemonics start.
const OPCODE_COLUMN: usize = 4;
/// Column where operands start.
const OPERAND_COLUMN: usize = 16;
/// Column where comments start.
const COMMENT_COLUMN: usize = 40;

// ============================================================================
// Opcodes
// ============================================================================

/// The instructions the code generator emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Pushq,
    Popq,
    Movq,
    Addq,
    Subq,
    Imulq,
    Idivq,
    Cqto,
    Negq,
    Cmpq,
    Cmove,
    Cmovne,
    Cmovl,
    Cmovle,
    Cmovg,
    Cmovge,
    Jmp,
    Je,
    Jne,
    Jle,
    Call,
    Retq,
    /// Inert placeholder left behind by optimiser rewrites.
    Nop,
}

impl Opcode {
    pub fn as_str(self) -> &'static str {
        match self {
            Opcode::Pushq => "pushq",
            Opcode::Popq => "popq",
            Opcode::Movq => "movq",
            Opcode::Addq => "addq",
            Opcode::Subq => "subq",
            Opcode::Imulq => "imulq",
            Opcode::Idivq => "idivq",
            Opcode::Cqto => "cqto",
            Opcode::Negq => "negq",
            Opcode::Cmpq => "cmpq",
            Opcode::Cmove => "cmove",
            Opcode::Cmovne => "cmovne",
            Opcode::Cmovl => "cmovl",
            Opcode::Cmovle => "cmovle",
            Opcode::Cmovg => "cmovg",
            Opcode::Cmovge => "cmovge",
            Opcode::Jmp => "jmp",
            Opcode::Je => "je",
            Opcode::Jne => "jne",
            Opcode::Jle => "jle",
            Opcode::Call => "call",
            Opcode::Retq => "retq",
            Opcode::Nop => "nop",
        }
    }

    /// Conditional moves.
    pub fn is_cmov(self) -> bool {
        matches!(
            self,
            Opcode::Cmove
                | Opcode::Cmovne
                | Opcode::Cmovl
                | Opcode::Cmovle
                | Opcode::Cmovg
                | Opcode::Cmovge
        )
    }

    /// Jumps, conditional or not.
    pub fn is_jump(self) -> bool {
        matches!(self, Opcode::Jmp | Opcode::Je | Opcode::Jne | Opcode::Jle)
    }

    /// Instructions after which execution may continue somewhere else.
    pub fn transfers_control(self) -> bool {
        self.is_jump() || matches!(self, Opcode::Call | Opcode::Retq)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Instructions and blocks
// ============================================================================

/// One instruction with AT&T ordered operands (source first).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: Opcode,
    pub operands: Vec<String>,
    pub comment: Option<String>,
}

impl Instruction {
    pub fn new<I, S>(opcode: Opcode, operands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            opcode,
            operands: operands.into_iter().map(Into::into).collect(),
            comment: None,
        }
    }

    /// An instruction without operands.
    pub fn bare(opcode: Opcode) -> Self {
        Self {
            opcode,
            operands: Vec::new(),
            comment: None,
        }
    }

    pub fn nop() -> Self {
        Self::bare(Opcode::Nop)
    }

    /// Attach a listing comment; an empty comment is dropped.
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        let comment = comment.into();
        self.comment = (!comment.is_empty()).then_some(comment);
        self
    }

    #[inline]
    pub fn is_nop(&self) -> bool {
        self.opcode == Opcode::Nop
    }

    /// Turn this instruction into an inert `nop`.
    pub fn make_nop(&mut self) {
        self.opcode = Opcode::Nop;
        self.operands.clear();
        self.comment = None;
    }

    /// Operand `index`, or the empty string.
    pub fn operand(&self, index: usize) -> &str {
        self.operands.get(index).map(String::as_str).unwrap_or("")
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut line = String::new();
        pad_to(&mut line, OPCODE_COLUMN);
        line.push_str(self.opcode.as_str());

        if !self.operands.is_empty() {
            pad_to(&mut line, OPERAND_COLUMN);
            line.push_str(&self.operands.join(", "));
        }

        if let Some(comment) = &self.comment {
            pad_to(&mut line, COMMENT_COLUMN);
            let _ = write!(line, "# {comment}");
        }

        f.write_str(&line)
    }
}

/// A labelled, straight-line run of instructions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicBlock {
    pub name: String,
    pub comment: Option<String>,
    /// Emit a `.global` directive for the label.
    pub is_global: bool,
    pub instructions: Vec<Instruction>,
}

impl BasicBlock {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            comment: None,
            is_global: false,
            instructions: Vec::new(),
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn global(mut self) -> Self {
        self.is_global = true;
        self
    }
}

impl fmt::Display for BasicBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f)?;
        if self.is_global {
            writeln!(f, ".global {}", self.name)?;
        }

        if !self.name.is_empty() {
            let mut label = format!("{}:", self.name);
            if let Some(comment) = &self.comment {
                pad_to(&mut label, COMMENT_COLUMN);
                let _ = write!(label, "# {comment}");
            }
            writeln!(f, "{label}")?;
        }

        for instruction in &self.instructions {
            writeln!(f, "{instruction}")?;
        }
        Ok(())
    }
}

/// Pad `line` with spaces up to `column`, always adding at least one space
/// after existing text.
fn pad_to(line: &mut String, column: usize) {
    let width = if line.len() < column {
        column - line.len()
    } else if line.is_empty() {
        0
    } else {
        1
    };
    line.extend(std::iter::repeat_n(' ', width));
}

// ============================================================================
// Module
// ============================================================================

/// An ordered sequence of basic blocks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Module {
    pub blocks: Vec<BasicBlock>,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new block; subsequent instructions go into it.
    pub fn push_block(&mut self, block: BasicBlock) {
        self.blocks.push(block);
    }

    /// Append an instruction to the last block. Instructions pushed before
    /// any block land in an unnamed block.
    pub fn push(&mut self, instruction: Instruction) {
        match self.blocks.last_mut() {
            Some(block) => block.instructions.push(instruction),
            None => {
                let mut block = BasicBlock::new("");
                block.instructions.push(instruction);
                self.blocks.push(block);
            }
        }
    }

    /// Find a block by label.
    pub fn block(&self, name: &str) -> Option<&BasicBlock> {
        self.blocks.iter().find(|b| b.name == name)
    }

    /// Total number of instructions across all blocks, `nop`s included.
    pub fn instruction_count(&self) -> usize {
        self.blocks.iter().map(|b| b.instructions.len()).sum()
    }

    /// Every instruction in layout order.
    pub fn instructions(&self) -> impl Iterator<Item = &Instruction> {
        self.blocks.iter().flat_map(|b| b.instructions.iter())
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for block in &self.blocks {
            write!(f, "{block}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instruction_columns() {
        let ins = Instruction::new(Opcode::Movq, ["%rsp", "%rbp"]).with_comment("Set up frame");
        assert_eq!(
            ins.to_string(),
            "    movq        %rsp, %rbp              # Set up frame"
        );
        assert_eq!(Instruction::bare(Opcode::Retq).to_string(), "    retq");
        assert_eq!(Instruction::bare(Opcode::Cqto).with_comment("x").to_string().find('#'), Some(40));
    }

    #[test]
    fn long_operands_keep_a_space_before_comment() {
        let ins = Instruction::new(Opcode::Movq, ["$123456789012345", "-1024(%rbp)"]).with_comment("c");
        let text = ins.to_string();
        assert!(text.contains("-1024(%rbp) # c"), "{text}");
    }

    #[test]
    fn block_rendering() {
        let mut module = Module::new();
        module.push_block(BasicBlock::new("main").with_comment("Entry").global());
        module.push(Instruction::new(Opcode::Pushq, ["$1"]));
        module.push_block(BasicBlock::new(".main.exit"));
        module.push(Instruction::bare(Opcode::Retq));

        let expected = "\n.global main\nmain:                                   # Entry\n    pushq       $1\n\n.main.exit:\n    retq\n";
        assert_eq!(module.to_string(), expected);
        assert_eq!(module.instruction_count(), 2);
        assert!(module.block(".main.exit").is_some());
    }

    #[test]
    fn push_without_block_creates_unnamed_block() {
        let mut module = Module::new();
        module.push(Instruction::nop());
        assert_eq!(module.blocks.len(), 1);
        assert_eq!(module.to_string(), "\n    nop\n");
    }

    #[test]
    fn make_nop_clears_operands() {
        let mut ins = Instruction::new(Opcode::Pushq, ["%rax"]).with_comment("c");
        ins.make_nop();
        assert!(ins.is_nop());
        assert!(ins.operands.is_empty());
        assert_eq!(ins.operand(0), "");
    }

    #[test]
    fn control_transfer_classification() {
        assert!(Opcode::Jle.is_jump());
        assert!(Opcode::Call.transfers_control());
        assert!(!Opcode::Cmovge.transfers_control());
        assert!(Opcode::Cmovge.is_cmov());
    }
}
