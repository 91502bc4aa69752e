//! Operand classification and register data flow of instructions.
//!
//! Operands are kept as AT&T text (`$5`, `%rax`, `-16(%rbp)`, `.L3_else`).
//! The helpers here answer the questions the optimiser asks about them.

use crate::x64::abi::{
    ARGUMENT_REGISTERS, CALLER_SAVED_REGISTERS, RETURN_REGISTER, STACK_POINTER,
};
use crate::x64::module::{Instruction, Opcode};

/// `%reg`
pub fn is_register(operand: &str) -> bool {
    operand.starts_with('%') && !operand.contains('(')
}

/// `disp(%reg)`
pub fn is_memory(operand: &str) -> bool {
    operand.contains('(')
}

/// Value of an immediate operand.
pub fn immediate(operand: &str) -> Option<i64> {
    operand.strip_prefix('$')?.parse().ok()
}

/// Whether `value` fits the sign-extended 32-bit immediate of arithmetic
/// instructions.
pub fn fits_imm32(value: i64) -> bool {
    i32::try_from(value).is_ok()
}

/// Every register named in an operand, including address registers.
pub fn registers(operand: &str) -> impl Iterator<Item = &str> {
    operand.match_indices('%').map(move |(start, _)| {
        let len = operand[start + 1..]
            .find(|c: char| !c.is_ascii_alphanumeric())
            .unwrap_or(operand.len() - start - 1);
        &operand[start..start + 1 + len]
    })
}

impl Instruction {
    /// Registers whose value this instruction reads.
    pub fn reads(&self) -> Vec<&str> {
        let mut reads: Vec<&str> = Vec::new();
        let src = self.operand(0);
        let dst = self.operand(1);

        match self.opcode {
            Opcode::Pushq => {
                reads.extend(registers(src));
                reads.push(STACK_POINTER);
            }
            Opcode::Popq => {
                reads.push(STACK_POINTER);
                if is_memory(src) {
                    reads.extend(registers(src));
                }
            }
            Opcode::Movq => {
                reads.extend(registers(src));
                if is_memory(dst) {
                    reads.extend(registers(dst));
                }
            }
            Opcode::Addq | Opcode::Subq | Opcode::Imulq | Opcode::Cmpq => {
                reads.extend(registers(src));
                reads.extend(registers(dst));
            }
            op if op.is_cmov() => {
                reads.extend(registers(src));
                reads.extend(registers(dst));
            }
            Opcode::Negq => reads.extend(registers(src)),
            Opcode::Idivq => {
                reads.extend(registers(src));
                reads.extend(["%rax", "%rdx"]);
            }
            Opcode::Cqto => reads.push("%rax"),
            Opcode::Call => {
                reads.extend(ARGUMENT_REGISTERS);
                reads.push(STACK_POINTER);
            }
            Opcode::Retq => reads.extend([RETURN_REGISTER, STACK_POINTER]),
            _ => {}
        }
        reads
    }

    /// Registers this instruction overwrites.
    pub fn writes(&self) -> Vec<&str> {
        let src = self.operand(0);
        let dst = self.operand(1);

        match self.opcode {
            Opcode::Pushq => vec![STACK_POINTER],
            Opcode::Popq => {
                let mut writes = vec![STACK_POINTER];
                if is_register(src) {
                    writes.push(src);
                }
                writes
            }
            Opcode::Movq | Opcode::Addq | Opcode::Subq | Opcode::Imulq if is_register(dst) => {
                vec![dst]
            }
            op if op.is_cmov() && is_register(dst) => vec![dst],
            Opcode::Negq if is_register(src) => vec![src],
            Opcode::Idivq => vec!["%rax", "%rdx"],
            Opcode::Cqto => vec!["%rdx"],
            Opcode::Call => {
                let mut writes = CALLER_SAVED_REGISTERS.to_vec();
                writes.push(STACK_POINTER);
                writes
            }
            Opcode::Retq => vec![STACK_POINTER],
            _ => Vec::new(),
        }
    }

    /// Whether this instruction stores to memory (pushes excluded).
    pub fn writes_memory(&self) -> bool {
        match self.opcode {
            Opcode::Popq | Opcode::Negq => is_memory(self.operand(0)),
            Opcode::Movq | Opcode::Addq | Opcode::Subq | Opcode::Imulq => {
                is_memory(self.operand(1))
            }
            _ => false,
        }
    }

    /// Whether any operand names `register`.
    pub fn mentions(&self, register: &str) -> bool {
        self.operands
            .iter()
            .any(|operand| registers(operand).any(|r| r == register))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        assert!(is_register("%r13"));
        assert!(!is_register("-8(%rbp)"));
        assert!(is_memory("(%rsp)"));
        assert_eq!(immediate("$-4"), Some(-4));
        assert_eq!(immediate("%rax"), None);
        assert!(fits_imm32(-2_147_483_648));
        assert!(!fits_imm32(1 << 40));
    }

    #[test]
    fn registers_in_operands() {
        assert_eq!(registers("-8(%rbp)").collect::<Vec<_>>(), ["%rbp"]);
        assert_eq!(registers("%r8").collect::<Vec<_>>(), ["%r8"]);
        assert_eq!(registers("$3").count(), 0);
    }

    #[test]
    fn data_flow() {
        let add = Instruction::new(Opcode::Addq, ["%r13", "%r15"]);
        assert_eq!(add.reads(), ["%r13", "%r15"]);
        assert_eq!(add.writes(), ["%r15"]);

        let store = Instruction::new(Opcode::Movq, ["%rax", "-16(%rbp)"]);
        assert_eq!(store.reads(), ["%rax", "%rbp"]);
        assert!(store.writes().is_empty());
        assert!(store.writes_memory());

        let pop = Instruction::new(Opcode::Popq, ["%rdi"]);
        assert_eq!(pop.writes(), ["%rsp", "%rdi"]);

        let div = Instruction::new(Opcode::Idivq, ["%r13"]);
        assert!(div.reads().contains(&"%rdx"));
        assert!(div.writes().contains(&"%rax"));

        let cmov = Instruction::new(Opcode::Cmovl, ["%r13", "%r12"]);
        assert_eq!(cmov.reads(), ["%r13", "%r12"]);
        assert!(cmov.mentions("%r12"));
    }
}
