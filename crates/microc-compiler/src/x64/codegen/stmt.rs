//! Statement lowering.
//!
//! Statements leave the stack depth unchanged. Locals declared inside a
//! block are released with one `addq` when the block ends.

use microc_core::{CodegenError, Type};
use microc_parser::ast::{ArrayDecl, CompoundStmt, Expr, IfStmt, Stmt, VarDecl, WhileStmt};

use super::{CodeGenerator, unsupported};
use crate::x64::abi::{RETURN_REGISTER, STACK_POINTER, WORD_SIZE};
use crate::x64::module::Opcode;

impl CodeGenerator<'_> {
    pub(super) fn visit_stmt(&mut self, stmt: &Stmt<'_>) -> Result<(), CodegenError> {
        match stmt {
            Stmt::Empty(_) => Ok(()),
            Stmt::If(if_stmt) => self.visit_if(if_stmt),
            Stmt::While(while_stmt) => self.visit_while(while_stmt),
            Stmt::Return(ret) => {
                if let Some(value) = &ret.value {
                    self.visit_expr(value)?;
                    self.pop(RETURN_REGISTER, "Pop return value");
                }
                let exit = self.function_exit.clone();
                self.emit(Opcode::Jmp, [exit], "Jump to function exit");
                Ok(())
            }
            Stmt::Expr(expr_stmt) => {
                self.visit_expr(&expr_stmt.expr)?;
                self.pop(RETURN_REGISTER, "Discard expression value");
                Ok(())
            }
            Stmt::VarDecl(decl) => self.visit_var_decl(decl),
            Stmt::ArrayDecl(decl) => self.visit_array_decl(decl),
            Stmt::Compound(block) => self.visit_compound(block),
        }
    }

    pub(super) fn visit_compound(&mut self, block: &CompoundStmt<'_>) -> Result<(), CodegenError> {
        self.scoped(|this| {
            for stmt in block.body {
                this.visit_stmt(stmt)?;
            }
            Ok(())
        })
    }

    /// Run `f` and release whatever stack slots it declared.
    fn scoped(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<(), CodegenError>,
    ) -> Result<(), CodegenError> {
        let mark = self.frame.mark();
        f(self)?;
        let words = self.frame.release(mark);
        self.adjust_stack(i64::from(words), "Release block locals");
        Ok(())
    }

    // ==========================================================================
    // Declarations
    // ==========================================================================

    fn visit_var_decl(&mut self, decl: &VarDecl<'_>) -> Result<(), CodegenError> {
        self.expect_int_declaration(decl.id, &decl.name, "variables")?;

        match &decl.init {
            Some(init) => {
                if self.frame.is_padded() {
                    self.adjust_stack(1, "Reclaim frame padding");
                    self.frame.set_padded(false);
                }
                // The initializer's value becomes the variable's slot.
                self.visit_expr(init)?;
                self.frame.pop_temps(1);
            }
            None if self.frame.is_padded() => self.frame.set_padded(false),
            None => self.emit(
                Opcode::Subq,
                [format!("${WORD_SIZE}"), STACK_POINTER.to_string()],
                format!("Allocate variable '{}'", decl.name),
            ),
        }

        self.frame.declare(decl.id);
        self.align_frame();
        Ok(())
    }

    fn visit_array_decl(&mut self, decl: &ArrayDecl<'_>) -> Result<(), CodegenError> {
        Err(unsupported("array declarations", decl.span))
    }

    // ==========================================================================
    // Control flow
    // ==========================================================================

    /// Pop the condition and branch to `target` unless it equals 1.
    fn branch_unless_true(&mut self, target: &str) {
        self.pop(RETURN_REGISTER, "Pop condition");
        self.emit(Opcode::Cmpq, ["$1", RETURN_REGISTER], "Test condition");
        self.emit(Opcode::Jne, [target], "Skip when false");
    }

    fn visit_if(&mut self, if_stmt: &IfStmt<'_>) -> Result<(), CodegenError> {
        self.expect_condition(&if_stmt.condition)?;
        self.visit_expr(&if_stmt.condition)?;

        let then_label = self.label("then");
        let else_label = if_stmt.else_branch.is_some().then(|| self.label("else"));
        let end_label = self.label("endif");

        self.branch_unless_true(else_label.as_deref().unwrap_or(&end_label));

        self.start_block(&then_label, "Then branch");
        self.scoped(|this| this.visit_stmt(&if_stmt.then_branch))?;

        if let (Some(else_branch), Some(else_label)) = (&if_stmt.else_branch, &else_label) {
            self.emit(Opcode::Jmp, [end_label.as_str()], "Skip else branch");
            self.start_block(else_label, "Else branch");
            self.scoped(|this| this.visit_stmt(else_branch))?;
        }

        self.start_block(&end_label, "End of if statement");
        Ok(())
    }

    fn visit_while(&mut self, while_stmt: &WhileStmt<'_>) -> Result<(), CodegenError> {
        self.expect_condition(&while_stmt.condition)?;

        let cond_label = self.label("while_cond");
        let body_label = self.label("while_body");
        let end_label = self.label("while_end");

        self.start_block(&cond_label, "Loop condition");
        self.visit_expr(&while_stmt.condition)?;
        self.branch_unless_true(&end_label);

        self.start_block(&body_label, "Loop body");
        self.scoped(|this| this.visit_stmt(&while_stmt.body))?;
        self.emit(Opcode::Jmp, [cond_label.as_str()], "Re-test loop condition");

        self.start_block(&end_label, "End of loop");
        Ok(())
    }

    /// Conditions are integer truth values.
    fn expect_condition(&self, condition: &Expr<'_>) -> Result<(), CodegenError> {
        match self.type_of(condition.id())? {
            Type::Int => Ok(()),
            other => Err(unsupported(format!("{other} conditions"), condition.span())),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::x64::codegen::tests::generate;
    use crate::x64::module::{Module, Opcode};

    /// Net stack effect of a block in words, `movq %rbp, %rsp` excluded.
    fn stack_words(module: &Module, block: &str) -> i64 {
        module
            .block(block)
            .unwrap()
            .instructions
            .iter()
            .map(|ins| match (ins.opcode, ins.operand(1)) {
                (Opcode::Pushq, _) => 1,
                (Opcode::Popq, _) => -1,
                (Opcode::Subq, "%rsp") => ins.operand(0)[1..].parse::<i64>().unwrap() / 8,
                (Opcode::Addq, "%rsp") => -ins.operand(0)[1..].parse::<i64>().unwrap() / 8,
                _ => 0,
            })
            .sum()
    }

    #[test]
    fn if_else_uses_three_blocks() {
        let module = generate("int main() { int x = 1; if (x == 1) x = 2; else x = 3; return x; }").unwrap();
        let entry = module.block("main").unwrap();
        let branch = &entry.instructions[entry.instructions.len() - 1];
        assert_eq!(branch.opcode, Opcode::Jne);
        assert_eq!(branch.operands, [".L1_else"]);

        let then = module.block(".L0_then").unwrap();
        assert_eq!(then.instructions.last().unwrap().operands, [".L2_endif"]);
        assert!(module.block(".L1_else").is_some());
        assert!(module.block(".L2_endif").is_some());
    }

    #[test]
    fn while_loop_retests_condition() {
        let module = generate("int main() { int i = 0; while (i < 3) i = i + 1; return i; }").unwrap();
        let body = module.block(".L1_while_body").unwrap();
        let last = body.instructions.last().unwrap();
        assert_eq!(last.opcode, Opcode::Jmp);
        assert_eq!(last.operands, [".L0_while_cond"]);

        let cond = module.block(".L0_while_cond").unwrap();
        assert_eq!(cond.instructions.last().unwrap().operands, [".L2_while_end"]);
        assert_eq!(stack_words(&module, ".L1_while_body"), 0);
    }

    #[test]
    fn block_locals_are_released() {
        let module = generate(
            "int main() { int i = 0; while (i < 3) { int a = i; int b; int c = a; i = i + 1; } return i; }",
        )
        .unwrap();
        assert_eq!(stack_words(&module, ".L1_while_body"), 0);
    }

    #[test]
    fn declarations_keep_the_frame_aligned() {
        let module = generate("int main() { int a = 1; int b = 2; int c; return a + b + c; }").unwrap();
        let text = module.to_string();
        // a: value + pad, b: reclaim pad + value, c: allocate + pad
        assert_eq!(text.matches("Pad frame to 16 bytes").count(), 2);
        assert_eq!(text.matches("Reclaim frame padding").count(), 1);
        assert!(text.contains("pushq       -24(%rbp)"));
    }

    #[test]
    fn return_pops_into_rax_and_jumps_to_exit() {
        let module = generate("int f() { return 7; }").unwrap();
        let entry = module.block("f").unwrap();
        let ops: Vec<(Opcode, Vec<String>)> = entry
            .instructions
            .iter()
            .skip(8)
            .map(|i| (i.opcode, i.operands.clone()))
            .collect();
        assert_eq!(
            ops,
            [
                (Opcode::Pushq, vec!["$7".to_string()]),
                (Opcode::Popq, vec!["%rax".to_string()]),
                (Opcode::Jmp, vec![".f.exit".to_string()]),
                (Opcode::Movq, vec!["$0".to_string(), "%rax".to_string()]),
            ]
        );
    }
}
