//! Peephole optimiser for generated modules.
//!
//! The rewrites run in a fixed order and repeat until an iteration changes
//! nothing. Every rewrite stays inside one basic block.
//!
//! ```
//! use microc_compiler::x64::{Instruction, Module, Opcode, Optimiser};
//!
//! let mut module = Module::new();
//! module.push(Instruction::new(Opcode::Pushq, ["$1"]));
//! module.push(Instruction::new(Opcode::Popq, ["%rdi"]));
//!
//! let stats = Optimiser::default().optimise(&mut module);
//! assert_eq!(stats.push_pops_combined, 1);
//! assert_eq!(module.to_string().trim(), "movq        $1, %rdi");
//! ```

use bitflags::bitflags;
use log::{debug, trace};

use crate::x64::abi::{CALLEE_SAVED_REGISTERS, SCRATCH_REGISTERS, STACK_POINTER};
use crate::x64::module::{BasicBlock, Instruction, Module, Opcode};
use crate::x64::operand::{fits_imm32, immediate, is_memory, is_register, registers};

bitflags! {
    /// Individual rewrites of the [`Optimiser`].
    ///
    /// ```
    /// use microc_compiler::x64::Optimisations;
    ///
    /// let only_moves = Optimisations::PUSH_POP | Optimisations::NOP_ELIMINATION;
    /// assert!(!only_moves.contains(Optimisations::CONSTANT_FOLDING));
    /// assert_eq!(Optimisations::default(), Optimisations::all());
    /// ```
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Optimisations: u8 {
        /// Drop `nop` placeholders left by the other rewrites.
        const NOP_ELIMINATION = 1 << 0;
        /// Turn `pushq X ... popq Y` into `movq X, Y`.
        const PUSH_POP = 1 << 1;
        /// Fold register-held constants into `addq`/`subq` sources.
        const CONSTANT_FOLDING = 1 << 2;
        /// Drop `movq R, R`.
        const SELF_MOVE = 1 << 3;
    }
}

impl Default for Optimisations {
    fn default() -> Self {
        Self::all()
    }
}

/// What an [`Optimiser::optimise`] run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OptimiserStats {
    /// Iterations of the rewrite loop, including the final one that changed
    /// nothing.
    pub iterations: u32,
    pub nops_removed: usize,
    pub push_pops_combined: usize,
    pub constants_folded: usize,
    pub self_moves_removed: usize,
}

impl OptimiserStats {
    pub fn total(&self) -> usize {
        self.nops_removed + self.push_pops_combined + self.constants_folded + self.self_moves_removed
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Optimiser {
    enabled: Optimisations,
}

impl Optimiser {
    pub fn new(enabled: Optimisations) -> Self {
        Self { enabled }
    }

    pub fn enabled(&self) -> Optimisations {
        self.enabled
    }

    /// Rewrite `module` in place until no enabled rewrite applies.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn optimise(&self, module: &mut Module) -> OptimiserStats {
        let mut stats = OptimiserStats::default();
        let before = module.instruction_count();

        loop {
            stats.iterations += 1;
            let mut changed = 0;

            for block in &mut module.blocks {
                if self.enabled.contains(Optimisations::NOP_ELIMINATION) {
                    let removed = remove_nops(block);
                    stats.nops_removed += removed;
                    changed += removed;
                }
                if self.enabled.contains(Optimisations::PUSH_POP) {
                    let combined = combine_push_pop(block);
                    stats.push_pops_combined += combined;
                    changed += combined;
                }
                if self.enabled.contains(Optimisations::CONSTANT_FOLDING) {
                    let folded = fold_constants(block);
                    stats.constants_folded += folded;
                    changed += folded;
                }
                if self.enabled.contains(Optimisations::SELF_MOVE) {
                    let removed = remove_self_moves(block);
                    stats.self_moves_removed += removed;
                    changed += removed;
                }
            }

            trace!("optimiser iteration {}: {changed} rewrites", stats.iterations);
            if changed == 0 {
                break;
            }
        }

        debug!(
            "optimised {} -> {} instructions in {} iterations",
            before,
            module.instruction_count(),
            stats.iterations
        );
        stats
    }
}

// ============================================================================
// Rewrites
// ============================================================================

fn remove_nops(block: &mut BasicBlock) -> usize {
    let before = block.instructions.len();
    block.instructions.retain(|ins| !ins.is_nop());
    before - block.instructions.len()
}

/// `pushq X; <window>; popq Y` becomes `<window>; movq X, Y`.
///
/// The window may only hold `nop`s and `movq`s that leave `%rsp` alone and
/// cannot change the value of `X`.
fn combine_push_pop(block: &mut BasicBlock) -> usize {
    let mut combined = 0;

    for pop in 0..block.instructions.len() {
        if block.instructions[pop].opcode != Opcode::Popq {
            continue;
        }
        let Some(push) = matching_push(&block.instructions, pop) else {
            continue;
        };

        let src = block.instructions[push].operand(0).to_string();
        let dst = block.instructions[pop].operand(0).to_string();
        if is_memory(&src) && is_memory(&dst) {
            continue;
        }

        trace!("push/pop: {src} -> {dst}");
        let comment = block.instructions[push].comment.clone();
        let mut mov = Instruction::new(Opcode::Movq, [src, dst]);
        mov.comment = comment;
        block.instructions[pop] = mov;
        block.instructions[push].make_nop();
        combined += 1;
    }
    combined
}

/// Index of the `pushq` feeding the `popq` at `pop`, if only movable
/// instructions sit between them.
fn matching_push(instructions: &[Instruction], pop: usize) -> Option<usize> {
    for index in (0..pop).rev() {
        let ins = &instructions[index];
        match ins.opcode {
            Opcode::Nop => continue,
            Opcode::Pushq => {
                let operand = ins.operand(0);
                return window_preserves(&instructions[index + 1..pop], operand)
                    .then_some(index);
            }
            Opcode::Movq if !ins.mentions(STACK_POINTER) => {}
            _ => return None,
        }
    }
    None
}

/// Whether the value of `operand` is the same after `window` as before.
fn window_preserves(window: &[Instruction], operand: &str) -> bool {
    let memory = is_memory(operand);
    window.iter().filter(|ins| !ins.is_nop()).all(|ins| {
        let writes = ins.writes();
        let clobbers_register = registers(operand).any(|r| writes.contains(&r));
        !clobbers_register && !(memory && ins.writes_memory())
    })
}

/// Fold `movq $imm, R` into later `addq R, D` / `subq R, D` and drop the
/// load once `R` is provably dead.
fn fold_constants(block: &mut BasicBlock) -> usize {
    let mut folded_total = 0;

    for load in 0..block.instructions.len() {
        let ins = &block.instructions[load];
        if ins.opcode != Opcode::Movq || !is_register(ins.operand(1)) {
            continue;
        }
        let Some(value) = immediate(ins.operand(0)).filter(|v| fits_imm32(*v)) else {
            continue;
        };
        let register = ins.operand(1).to_string();
        let constant = ins.operand(0).to_string();

        let mut folded = 0;
        let mut still_used = false;
        let mut dead = SCRATCH_REGISTERS.contains(&register.as_str());

        for index in load + 1..block.instructions.len() {
            let ins = &mut block.instructions[index];
            if ins.is_nop() {
                continue;
            }

            let foldable = matches!(ins.opcode, Opcode::Addq | Opcode::Subq)
                && ins.operand(0) == register
                && ins.operand(1) != register;
            if foldable {
                ins.operands[0] = constant.clone();
                folded += 1;
                continue;
            }

            if ins.reads().contains(&register.as_str()) {
                still_used = true;
            }
            match ins.opcode {
                Opcode::Call => {
                    dead = false;
                    break;
                }
                Opcode::Retq => {
                    dead = !CALLEE_SAVED_REGISTERS.contains(&register.as_str());
                    break;
                }
                op if op.is_jump() => {
                    dead = SCRATCH_REGISTERS.contains(&register.as_str());
                    break;
                }
                _ => {}
            }
            if ins.writes().contains(&register.as_str()) {
                dead = true;
                break;
            }
        }

        if folded > 0 {
            trace!("folded {value} into {folded} instructions");
            folded_total += folded;
            if dead && !still_used {
                block.instructions[load].make_nop();
            }
        }
    }
    folded_total
}

fn remove_self_moves(block: &mut BasicBlock) -> usize {
    let mut removed = 0;
    for ins in &mut block.instructions {
        if ins.opcode == Opcode::Movq && ins.operand(0) == ins.operand(1) {
            ins.make_nop();
            removed += 1;
        }
    }
    removed
}
